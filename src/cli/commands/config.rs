//! Config command - show or edit configuration

use crate::cli::args::{ConfigAction, ConfigArgs};
use crate::config::{Config, ConfigManager, LOCAL_CONFIG_FILE};
use crate::error::{ShellkeepError, ShellkeepResult};
use crate::key::Origin;
use crate::ui::{self, Tone, UiContext};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Every key accepted by `config set`
const VALID_KEYS: &[&str] = &[
    "general.log_format",
    "general.journal",
    "app.name",
    "app.origin",
    "app.manifest",
    "cache.dir",
    "network.user_agent",
    "network.concurrency",
    "worker.skip_waiting_on_install",
];

/// Execute the config command
pub async fn execute(
    args: ConfigArgs,
    config: &Config,
    manager: &ConfigManager,
) -> ShellkeepResult<()> {
    match args.action {
        None | Some(ConfigAction::Show) => show_config(config)?,
        Some(ConfigAction::Path) => println!("{}", manager.path().display()),
        Some(ConfigAction::Init { force }) => init_config(manager, force).await?,
        Some(ConfigAction::Set { key, value, local }) => {
            if local {
                set_local_value(&key, &value).await?
            } else {
                set_value(manager, &key, &value).await?
            }
        }
    }

    Ok(())
}

fn show_config(config: &Config) -> ShellkeepResult<()> {
    println!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

async fn init_config(manager: &ConfigManager, force: bool) -> ShellkeepResult<()> {
    let ctx = UiContext::detect();
    let path = manager.path();

    if path.exists() && !force {
        ui::report_with(
            &ctx,
            Tone::Warn,
            &format!("Config already exists at {}", path.display()),
            "Use --force to overwrite",
        );
        return Ok(());
    }

    manager.save(&Config::default()).await?;
    ui::report_with(&ctx, Tone::Done, "Configuration initialized", &path.display().to_string());

    Ok(())
}

/// Set a key in the global config file.
///
/// Only the global file is rewritten, so values coming from a local
/// `.shellkeep.toml` are not copied into it.
async fn set_value(manager: &ConfigManager, key: &str, value: &str) -> ShellkeepResult<()> {
    let ctx = UiContext::detect();
    let mut config = manager.load().await?;

    if let Err(e) = apply(&mut config, key, value) {
        ui::report_with(&ctx, Tone::Fail, "Cannot set config key", &e.to_string());
        ui::suggest(&ctx, &format!("Valid keys: {}", VALID_KEYS.join(", ")));
        return Err(e);
    }

    manager.save(&config).await?;
    ui::report(&ctx, Tone::Done, &format!("Set {} = {}", key, value));

    Ok(())
}

/// Apply one dotted key to a config
fn apply(config: &mut Config, key: &str, value: &str) -> ShellkeepResult<()> {
    match key {
        "general.log_format" => config.general.log_format = parse_log_format(value)?,
        "general.journal" => config.general.journal = parse_bool(value)?,
        "app.name" => config.app.name = value.to_string(),
        "app.origin" => config.app.origin = Some(Origin::parse(value)?.to_string()),
        "app.manifest" => config.app.manifest = Some(PathBuf::from(value)),
        "cache.dir" => config.cache.dir = Some(PathBuf::from(value)),
        "network.user_agent" => config.network.user_agent = value.to_string(),
        "network.concurrency" => config.network.concurrency = parse_concurrency(value)?,
        "worker.skip_waiting_on_install" => {
            config.worker.skip_waiting_on_install = parse_bool(value)?
        }
        _ => return Err(ShellkeepError::User(format!("Unknown config key: {}", key))),
    }
    Ok(())
}

async fn set_local_value(key: &str, value: &str) -> ShellkeepResult<()> {
    let ctx = UiContext::detect();

    let cwd = std::env::current_dir()
        .map_err(|e| ShellkeepError::io("getting current directory", e))?;
    let local_path = cwd.join(LOCAL_CONFIG_FILE);

    // Validate against a scratch config before touching the file
    apply(&mut Config::default(), key, value)?;

    let mut doc = read_local(&local_path).await?;
    set_toml_value(&mut doc, key, value)?;

    // Only the keys set explicitly are written back
    let content = toml::to_string_pretty(&doc)?;
    fs::write(&local_path, content)
        .await
        .map_err(|e| ShellkeepError::io(format!("writing {}", local_path.display()), e))?;

    ui::report(
        &ctx,
        Tone::Done,
        &format!("Set {} = {} in {}", key, value, local_path.display()),
    );

    Ok(())
}

async fn read_local(path: &Path) -> ShellkeepResult<toml::Value> {
    if !path.exists() {
        return Ok(toml::Value::Table(toml::map::Map::new()));
    }

    let content = fs::read_to_string(path)
        .await
        .map_err(|e| ShellkeepError::io(format!("reading {}", path.display()), e))?;
    content
        .parse()
        .map_err(|e: toml::de::Error| ShellkeepError::ConfigInvalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
}

/// Set a dot-separated key in a TOML value tree, creating intermediate tables as needed.
fn set_toml_value(doc: &mut toml::Value, key: &str, value: &str) -> ShellkeepResult<()> {
    let (parents, leaf) = match key.rsplit_once('.') {
        Some((parents, leaf)) => (parents.split('.').collect::<Vec<_>>(), leaf),
        None => (Vec::new(), key),
    };

    let mut current = doc;
    for part in parents {
        current = current
            .as_table_mut()
            .ok_or_else(|| ShellkeepError::User(format!("Expected table at key: {}", part)))?
            .entry(part)
            .or_insert_with(|| toml::Value::Table(toml::map::Map::new()));
    }

    let table = current
        .as_table_mut()
        .ok_or_else(|| ShellkeepError::User(format!("Expected table for key: {}", key)))?;

    let toml_value = match value {
        "true" => toml::Value::Boolean(true),
        "false" => toml::Value::Boolean(false),
        _ => match value.parse::<i64>() {
            Ok(n) => toml::Value::Integer(n),
            Err(_) => toml::Value::String(value.to_string()),
        },
    };

    table.insert(leaf.to_string(), toml_value);
    Ok(())
}

fn parse_bool(value: &str) -> ShellkeepResult<bool> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ShellkeepError::User(format!(
            "Invalid boolean value: {}. Use true/false",
            value
        ))),
    }
}

fn parse_concurrency(value: &str) -> ShellkeepResult<usize> {
    match value.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ShellkeepError::User(format!(
            "Invalid concurrency: {}. Use a positive number",
            value
        ))),
    }
}

fn parse_log_format(value: &str) -> ShellkeepResult<String> {
    match value {
        "text" | "json" => Ok(value.to_string()),
        _ => Err(ShellkeepError::User(format!(
            "Invalid log format: {}. Use text or json",
            value
        ))),
    }
}
