//! Confirmation before destructive cache operations

use super::context::UiContext;
use crate::error::{ShellkeepError, ShellkeepResult};

/// Ask before deleting `target`.
///
/// `--yes` approves without asking. Without a terminal the answer is no,
/// so scripts have to opt in explicitly.
pub async fn confirm_delete(ctx: &UiContext, target: &str) -> ShellkeepResult<bool> {
    if ctx.auto_yes() {
        return Ok(true);
    }
    if !ctx.is_interactive() {
        return Ok(false);
    }

    // cliclack blocks on stdin
    let question = format!("Delete {}?", target);
    tokio::task::spawn_blocking(move || cliclack::confirm(question).initial_value(false).interact())
        .await
        .map_err(|e| ShellkeepError::Internal(format!("prompt task failed: {}", e)))?
        .map_err(|e| ShellkeepError::io("reading confirmation", e))
}
