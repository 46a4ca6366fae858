//! Command-line interface

pub mod args;
pub mod commands;
mod manager;

pub use args::{Cli, Commands};
pub use manager::{build_manager, DiskManager, Overrides};
