//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use std::path::PathBuf;

/// Shellkeep - offline asset cache manager
///
/// Installs, upgrades and serves the offline copy of a single-page web
/// app from its resource manifest.
#[derive(Parser, Debug)]
#[command(name = "shellkeep")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Configuration file path
    #[arg(short, long, global = true, env = "SHELLKEEP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Skip local .shellkeep.toml discovery
    #[arg(long, global = true)]
    pub no_local: bool,

    /// Origin the app is served from (overrides app.origin)
    #[arg(long, global = true)]
    pub origin: Option<String>,

    /// Manifest JSON or generated worker script (overrides app.manifest)
    #[arg(short, long, global = true)]
    pub manifest: Option<PathBuf>,

    /// Cache root directory (overrides cache.dir)
    #[arg(long, global = true)]
    pub cache_dir: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Download the core assets into the staging partition
    Install(InstallArgs),

    /// Reconcile the offline cache with the current manifest
    Activate,

    /// Install and activate in one step
    Update(UpdateArgs),

    /// Serve one request through the cache
    Fetch(FetchArgs),

    /// Send a control message (skipWaiting, downloadOffline)
    Message(MessageArgs),

    /// Show the state of the offline cache
    Status(StatusArgs),

    /// Delete every cache partition of the app
    Clear(ClearArgs),

    /// Show or edit configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Arguments for the install command
#[derive(Parser, Debug)]
pub struct InstallArgs {
    /// Stage only; wait for `activate` or a skipWaiting message
    #[arg(long)]
    pub no_activate: bool,
}

/// Arguments for the update command
#[derive(Parser, Debug)]
pub struct UpdateArgs {
    /// Also download every resource not yet cached
    #[arg(long)]
    pub offline: bool,
}

/// Arguments for the fetch command
#[derive(Parser, Debug)]
pub struct FetchArgs {
    /// URL or origin-relative path (e.g. `main.dart.js?v=12`)
    pub target: String,

    /// Request method
    #[arg(short = 'X', long, default_value = "GET", value_parser = parse_method)]
    pub method: crate::net::Method,

    /// Write the body to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Arguments for the message command
#[derive(Parser, Debug)]
pub struct MessageArgs {
    /// Message text
    pub text: String,
}

/// Arguments for the status command
#[derive(Parser, Debug)]
pub struct StatusArgs {
    /// Output format
    #[arg(short, long, default_value = "table")]
    pub format: OutputFormat,
}

/// Arguments for the clear command
#[derive(Parser, Debug)]
pub struct ClearArgs {
    /// Skip confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Subcommand for config
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Initialize default configuration
    Init {
        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., app.origin)
        key: String,
        /// Value to set
        value: String,
        /// Write to project-local .shellkeep.toml instead of global config
        #[arg(long)]
        local: bool,
    },
}

/// Arguments for the completions command
#[derive(Parser, Debug)]
pub struct CompletionsArgs {
    /// Target shell
    pub shell: Shell,
}

/// Output format for status
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// JSON output
    Json,
    /// Simple text (one key per line)
    Plain,
}

fn parse_method(s: &str) -> Result<crate::net::Method, String> {
    crate::net::Method::parse(s).ok_or_else(|| format!("unknown HTTP method '{s}'"))
}
