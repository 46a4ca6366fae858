//! Message command - deliver a control message to the worker

use super::activate::report_activation;
use crate::cli::args::MessageArgs;
use crate::cli::{build_manager, Overrides};
use crate::config::Config;
use crate::error::ShellkeepResult;
use crate::ui::{self, TaskSpinner, Tone, UiContext};
use crate::worker::{
    ControlMessage, EventDispatcher, EventOutcome, MessageOutcome, WorkerEvent,
};

/// Execute the message command
pub async fn execute(args: MessageArgs, config: &Config, overrides: &Overrides) -> ShellkeepResult<()> {
    let ctx = UiContext::detect();
    let mut dispatcher = EventDispatcher::new(build_manager(config, overrides).await?);

    let mut spinner = TaskSpinner::new(&ctx);
    let downloading = ControlMessage::parse(&args.text) == Some(ControlMessage::DownloadOffline);
    if downloading {
        spinner.start("Downloading missing resources");
    }

    let outcome = match dispatcher.dispatch(WorkerEvent::Message(args.text.clone())).await {
        Ok(outcome) => outcome,
        Err(e) => {
            if downloading {
                spinner.stop_error("Download failed");
            }
            return Err(e);
        }
    };

    let EventOutcome::Message {
        outcome,
        activation,
    } = outcome
    else {
        return Ok(());
    };

    match outcome {
        MessageOutcome::SkipWaiting => match activation {
            Some(activation) => {
                ui::report(&ctx, Tone::Done, "Skipped waiting");
                report_activation(&ctx, &activation);
            }
            None => ui::report(&ctx, Tone::Note, "No install is waiting for activation"),
        },
        MessageOutcome::Downloaded(keys) if keys.is_empty() => {
            spinner.stop("Every resource is already cached");
        }
        MessageOutcome::Downloaded(keys) => {
            spinner.stop(&format!("Downloaded {} resources for offline use", keys.len()));
        }
        MessageOutcome::Ignored => ui::report_with(
            &ctx,
            Tone::Warn,
            &format!("Ignored message '{}'", args.text),
            &format!(
                "known messages: {}, {}",
                ControlMessage::SkipWaiting,
                ControlMessage::DownloadOffline
            ),
        ),
    }

    Ok(())
}
