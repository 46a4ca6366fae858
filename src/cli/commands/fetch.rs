//! Fetch command - serve one request through the cache

use crate::cli::args::FetchArgs;
use crate::cli::{build_manager, Overrides};
use crate::config::Config;
use crate::error::{ShellkeepError, ShellkeepResult};
use crate::key::Origin;
use crate::net::FetchRequest;
use crate::ui::{self, Tone, UiContext};
use crate::worker::FetchOutcome;
use std::io::Write;
use tracing::info;

/// Execute the fetch command
pub async fn execute(args: FetchArgs, config: &Config, overrides: &Overrides) -> ShellkeepResult<()> {
    let ctx = UiContext::detect();
    let manager = build_manager(config, overrides).await?;

    let request = FetchRequest {
        method: args.method,
        ..FetchRequest::get(resolve_target(&manager.config().origin, &args.target))
    };

    let (key, response, source) = match manager.handle_fetch(&request).await? {
        FetchOutcome::Responded {
            key,
            response,
            source,
        } => (key, response, source),
        FetchOutcome::Passthrough => {
            ui::report_with(
                &ctx,
                Tone::Warn,
                &format!("{} {} is not intercepted", request.method, request.url),
                "only GET requests for manifest resources of this origin are served",
            );
            return Ok(());
        }
    };

    info!("{} served from {} with status {}", key, source, response.status);

    match args.output {
        Some(path) => {
            tokio::fs::write(&path, &response.body)
                .await
                .map_err(|e| ShellkeepError::io(format!("writing {}", path.display()), e))?;
            ui::report_with(
                &ctx,
                Tone::Done,
                &format!("Saved {} bytes to {}", response.body.len(), path.display()),
                &format!("HTTP {} from {}", response.status, source),
            );
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout
                .write_all(&response.body)
                .and_then(|()| stdout.flush())
                .map_err(|e| ShellkeepError::io("writing response body", e))?;
        }
    }

    Ok(())
}

/// Absolute URL for a command-line target
fn resolve_target(origin: &Origin, target: &str) -> String {
    if target.contains("://") {
        target.to_string()
    } else {
        format!("{}/{}", origin, target.trim_start_matches('/'))
    }
}
