//! Status command - show the state of the offline cache

use crate::cli::args::{OutputFormat, StatusArgs};
use crate::cli::{build_manager, Overrides};
use crate::config::Config;
use crate::error::ShellkeepResult;
use crate::ui::{self, Tone, UiContext};
use crate::worker::CacheStatus;

/// Execute the status command
pub async fn execute(args: StatusArgs, config: &Config, overrides: &Overrides) -> ShellkeepResult<()> {
    let manager = build_manager(config, overrides).await?;
    let status = manager.status().await?;

    match args.format {
        OutputFormat::Table => print_table(&status),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&status)?),
        OutputFormat::Plain => print_plain(&status),
    }

    Ok(())
}

fn print_table(status: &CacheStatus) {
    let ctx = UiContext::detect();
    ui::banner(&ctx, "Offline cache");

    ui::field(&ctx, "Origin", &status.origin);
    ui::field(
        &ctx,
        "Resources",
        &format!("{} ({} core)", status.resources, status.core),
    );

    ui::heading(&ctx, "Partitions");
    ui::field(
        &ctx,
        &status.partitions.content,
        &format!("{} entries", status.content_entries),
    );
    ui::field(
        &ctx,
        &status.partitions.staging,
        &format!("{} entries", status.staged_entries),
    );
    ui::gauge(
        &ctx,
        &status.partitions.manifest,
        if status.has_stored_manifest {
            "stored"
        } else {
            "empty"
        },
        status.has_stored_manifest,
    );

    if let Some(diff) = &status.diff {
        ui::heading(&ctx, "Manifest changes since last activation");
        if diff.is_empty() {
            ui::report(&ctx, Tone::Done, "None");
        } else {
            ui::field(&ctx, "Added", &diff.added.len().to_string());
            ui::field(&ctx, "Changed", &diff.changed.len().to_string());
            ui::field(&ctx, "Removed", &diff.removed.len().to_string());
        }
    }

    ui::heading(&ctx, "Offline coverage");
    ui::gauge(
        &ctx,
        "Missing",
        &status.missing.len().to_string(),
        status.missing.is_empty(),
    );
    if !status.missing.is_empty() {
        ui::suggest(&ctx, "Run `shellkeep message downloadOffline` to fetch them");
    }
}

/// One missing resource key per line
fn print_plain(status: &CacheStatus) {
    for key in &status.missing {
        println!("{}", key);
    }
}
