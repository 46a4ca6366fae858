//! Terminal output for the CLI
//!
//! Uses `cliclack` for framed output and prompts, `indicatif` for the bulk
//! download bar, and falls back to tagged lines in CI or when output is
//! piped.
//!
//! ```rust,ignore
//! use shellkeep::ui::{self, Tone, UiContext, TaskSpinner};
//!
//! let ctx = UiContext::detect().with_auto_yes(args.yes);
//!
//! let mut spinner = TaskSpinner::new(&ctx);
//! spinner.start("Installing core assets");
//! spinner.stop("Staged 12 core assets");
//!
//! if ui::confirm_delete(&ctx, "the offline cache").await? {
//!     ui::report(&ctx, Tone::Done, "Deleted");
//! }
//! ```

mod context;
mod output;
mod progress;
mod prompts;

pub use context::UiContext;
pub use output::{banner, field, finished, gauge, heading, report, report_with, suggest, Tone};
pub use progress::{DownloadProgress, TaskSpinner};
pub use prompts::confirm_delete;
