//! Shellkeep - offline asset cache manager
//!
//! Keeps an offline copy of a single-page web app in named cache
//! partitions: installs the app shell, reconciles the cache with each new
//! resource manifest, and serves requests cache-first (or network-first
//! for the root document).

pub mod cli;
pub mod config;
pub mod error;
pub mod journal;
pub mod key;
pub mod manifest;
pub mod net;
pub mod store;
pub mod ui;
pub mod worker;

pub use error::{ShellkeepError, ShellkeepResult};
