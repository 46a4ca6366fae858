//! Progress indicators with CI fallback

use super::context::UiContext;
use super::output::{report, Tone};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Spinner around one long cache operation
///
/// Without a terminal only the final line is printed, tagged like any
/// other report.
pub struct TaskSpinner {
    ctx: UiContext,
    active: Option<cliclack::ProgressBar>,
}

impl TaskSpinner {
    pub fn new(ctx: &UiContext) -> Self {
        Self {
            ctx: ctx.clone(),
            active: None,
        }
    }

    pub fn start(&mut self, message: &str) {
        if self.ctx.use_fancy_output() {
            let spinner = cliclack::spinner();
            spinner.start(message);
            self.active = Some(spinner);
        }
    }

    pub fn stop(&mut self, message: &str) {
        self.finish(Tone::Done, message);
    }

    pub fn stop_error(&mut self, message: &str) {
        self.finish(Tone::Fail, message);
    }

    fn finish(&mut self, tone: Tone, message: &str) {
        match self.active.take() {
            Some(spinner) if tone == Tone::Fail => spinner.error(message),
            Some(spinner) => spinner.stop(message),
            None => report(&self.ctx, tone, message),
        }
    }
}

/// Progress bar for bulk resource downloads.
///
/// Shows an indicatif bar in interactive mode and one line per fetched
/// URL otherwise. Safe to tick from concurrent fetches.
pub struct DownloadProgress {
    bar: Option<ProgressBar>,
}

impl DownloadProgress {
    pub fn new(ctx: &UiContext, total: usize) -> Self {
        let bar = if ctx.use_fancy_output() {
            let bar = ProgressBar::new(total as u64);
            let style = ProgressStyle::default_bar()
                .template("  {spinner:.green} Downloading {bar:20.green/dim} {pos}/{len} {msg:.dim}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ")
                .progress_chars("━╸─");
            bar.set_style(style);
            bar.enable_steady_tick(Duration::from_millis(120));
            Some(bar)
        } else {
            println!("Downloading {} resources...", total);
            None
        };
        Self { bar }
    }

    /// Record one fetched URL
    pub fn on_fetched(&self, url: &str) {
        match self.bar {
            Some(ref bar) => {
                bar.inc(1);
                bar.set_message(short_name(url).to_string());
            }
            None => println!("  fetched {}", url),
        }
    }

    /// Finish and clear the progress bar
    pub fn finish(&self) {
        if let Some(ref bar) = self.bar {
            bar.disable_steady_tick();
            bar.finish_and_clear();
        }
    }
}

/// Last path segment of a URL, for compact progress messages
fn short_name(url: &str) -> &str {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    if path.ends_with('/') {
        return path;
    }
    path.rsplit_once('/').map_or(path, |(_, last)| last)
}
