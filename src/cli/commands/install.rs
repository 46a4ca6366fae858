//! Install command - stage the core assets

use super::activate::report_activation;
use crate::cli::args::InstallArgs;
use crate::cli::{build_manager, Overrides};
use crate::config::Config;
use crate::error::ShellkeepResult;
use crate::ui::{self, TaskSpinner, UiContext};
use crate::worker::{EventDispatcher, EventOutcome, WorkerEvent};

/// Execute the install command
pub async fn execute(args: InstallArgs, config: &Config, overrides: &Overrides) -> ShellkeepResult<()> {
    let ctx = UiContext::detect();
    let manager = build_manager(config, overrides).await?;

    let mut spinner = TaskSpinner::new(&ctx);
    spinner.start(&format!(
        "Installing {} core assets from {}",
        manager.config().manifest.core.len(),
        manager.config().origin
    ));

    if args.no_activate {
        let mut manager = manager;
        let report = match manager.install().await {
            Ok(report) => report,
            Err(e) => {
                spinner.stop_error("Install failed");
                return Err(e);
            }
        };
        spinner.stop(&format!("Staged {} core assets", report.staged.len()));
        ui::suggest(
            &ctx,
            "Run `shellkeep activate` or `shellkeep message skipWaiting` to switch over",
        );
        return Ok(());
    }

    let mut dispatcher = EventDispatcher::new(manager);
    let outcome = match dispatcher.dispatch(WorkerEvent::Install).await {
        Ok(outcome) => outcome,
        Err(e) => {
            spinner.stop_error("Install failed");
            return Err(e);
        }
    };

    if let EventOutcome::Installed { report, activation } = outcome {
        spinner.stop(&format!("Staged {} core assets", report.staged.len()));
        match activation {
            Some(activation) => report_activation(&ctx, &activation),
            None => ui::suggest(&ctx, "Waiting for `shellkeep activate`"),
        }
    }

    Ok(())
}
