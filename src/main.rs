//! Shellkeep - offline asset cache manager
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use shellkeep::cli::{commands, Cli, Commands, Overrides};
use shellkeep::config::ConfigManager;
use shellkeep::error::{ShellkeepError, ShellkeepResult};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> ShellkeepResult<()> {
    let cli = Cli::parse();

    // Completions don't need config or logging
    if let Commands::Completions(args) = cli.command {
        return commands::completions(args);
    }

    let config_manager = match cli.config {
        Some(ref path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };

    let local_config_path = if cli.no_local {
        None
    } else {
        let cwd = std::env::current_dir()
            .map_err(|e| ShellkeepError::io("getting current directory", e))?;
        ConfigManager::find_local_config(&cwd)
    };

    let config = config_manager
        .load_merged(local_config_path.as_deref())
        .await?;

    init_logging(cli.verbose, cli.log_json || config.general.log_format == "json");
    log_config_source(&config_manager, cli.no_local, local_config_path);

    if config.general.journal {
        ConfigManager::ensure_state_dirs().await?;
    }

    let overrides = Overrides::from_cli(&cli);

    match cli.command {
        Commands::Completions(_) => unreachable!("Completions handled above"),
        Commands::Install(args) => commands::install(args, &config, &overrides).await,
        Commands::Activate => commands::activate(&config, &overrides).await,
        Commands::Update(args) => commands::update(args, &config, &overrides).await,
        Commands::Fetch(args) => commands::fetch(args, &config, &overrides).await,
        Commands::Message(args) => commands::message(args, &config, &overrides).await,
        Commands::Status(args) => commands::status(args, &config, &overrides).await,
        Commands::Clear(args) => commands::clear(args, &config, &overrides).await,
        Commands::Config(args) => commands::config(args, &config, &config_manager).await,
    }
}

/// 0 = warn, 1 = info, 2+ = debug
fn init_logging(verbose: u8, json: bool) {
    let filter = match verbose {
        0 => EnvFilter::new("shellkeep=warn"),
        1 => EnvFilter::new("shellkeep=info"),
        _ => EnvFilter::new("shellkeep=debug"),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    if json {
        builder.json().init();
    } else {
        builder.without_time().init();
    }
}

fn log_config_source(manager: &ConfigManager, no_local: bool, local: Option<PathBuf>) {
    debug!("Global config: {}", manager.path().display());
    match local {
        Some(path) => debug!("Found local config: {}", path.display()),
        None if no_local => debug!("Local config discovery disabled (--no-local)"),
        None => {}
    }
}
