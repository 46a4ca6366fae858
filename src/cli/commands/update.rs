//! Update command - install, activate and optionally fill the cache

use super::activate::report_activation;
use crate::cli::args::UpdateArgs;
use crate::cli::{build_manager, Overrides};
use crate::config::Config;
use crate::error::{ShellkeepError, ShellkeepResult};
use crate::ui::{self, DownloadProgress, TaskSpinner, Tone, UiContext};
use crate::worker::{EventDispatcher, EventOutcome, WorkerEvent};

/// Execute the update command
pub async fn execute(args: UpdateArgs, config: &Config, overrides: &Overrides) -> ShellkeepResult<()> {
    let ctx = UiContext::detect();
    let manager = build_manager(config, overrides).await?;
    ui::banner(&ctx, &format!("Updating {}", manager.config().origin));

    let mut dispatcher = EventDispatcher::new(manager);

    let mut spinner = TaskSpinner::new(&ctx);
    spinner.start("Installing core assets");
    let activation = match dispatcher.dispatch(WorkerEvent::Install).await {
        Ok(EventOutcome::Installed { report, activation }) => {
            spinner.stop(&format!("Staged {} core assets", report.staged.len()));
            activation
        }
        Ok(_) => None,
        Err(e) => {
            spinner.stop_error("Install failed");
            return Err(e);
        }
    };

    let activation = match activation {
        Some(activation) => activation,
        None => match dispatcher.dispatch(WorkerEvent::Activate).await? {
            EventOutcome::Activated(activation) => activation,
            other => {
                return Err(ShellkeepError::Internal(format!(
                    "unexpected activate outcome {:?}",
                    other
                )))
            }
        },
    };
    report_activation(&ctx, &activation);

    if args.offline {
        let manager = dispatcher.handler();
        let missing = manager.missing_keys().await?;
        if missing.is_empty() {
            ui::report(&ctx, Tone::Note, "Every resource is already cached");
        } else {
            let progress = DownloadProgress::new(&ctx, missing.len());
            let result = manager
                .download_offline_with(&|url| progress.on_fetched(url))
                .await;
            progress.finish();
            let fetched = result?;
            ui::report_with(
                &ctx,
                Tone::Done,
                "Downloaded for offline use",
                &format!("{} resources", fetched.len()),
            );
        }
    }

    ui::finished(&ctx, "Offline cache is up to date");
    Ok(())
}
