//! Activate command - reconcile the offline cache with the manifest

use crate::cli::{build_manager, Overrides};
use crate::config::Config;
use crate::error::ShellkeepResult;
use crate::ui::{self, TaskSpinner, Tone, UiContext};
use crate::worker::ActivationOutcome;

/// Execute the activate command
pub async fn execute(config: &Config, overrides: &Overrides) -> ShellkeepResult<()> {
    let ctx = UiContext::detect();
    let mut manager = build_manager(config, overrides).await?;

    if !manager.is_waiting() {
        ui::report(&ctx, Tone::Note, "No staged install found; reconciling existing content only");
    }

    let mut spinner = TaskSpinner::new(&ctx);
    spinner.start(&format!("Activating {}", manager.partition_names().content));

    let outcome = match manager.activate().await {
        Ok(outcome) => outcome,
        Err(e) => {
            spinner.stop_error("Activation failed and the cache could not be reset");
            return Err(e);
        }
    };

    spinner.stop("Activation finished");
    report_activation(&ctx, &outcome);
    Ok(())
}

/// Describe an activation outcome
pub(crate) fn report_activation(ctx: &UiContext, outcome: &ActivationOutcome) {
    match outcome {
        ActivationOutcome::FirstInstall(report) => ui::report_with(
            ctx,
            Tone::Done,
            "Offline cache created",
            &format!("{} entries", report.staged.len()),
        ),
        ActivationOutcome::Upgraded(report) => {
            ui::report_with(
                ctx,
                Tone::Done,
                "Offline cache upgraded",
                &format!(
                    "{} evicted, {} retained, {} staged",
                    report.evicted.len(),
                    report.retained.len(),
                    report.staged.len()
                ),
            );
            for key in &report.evicted {
                ui::suggest(ctx, &format!("evicted {}", key));
            }
        }
        ActivationOutcome::Reset { reason } => {
            ui::report_with(ctx, Tone::Warn, "Offline cache was reset", reason);
            ui::suggest(ctx, "Run `shellkeep update` to rebuild it");
        }
    }
}
