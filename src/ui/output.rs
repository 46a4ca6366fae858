//! Line-oriented command output
//!
//! Interactive terminals get cliclack framing. Everywhere else each line
//! carries a bracketed tag so CI logs stay greppable.

use super::context::UiContext;
use console::{style, Style, StyledObject};

/// Kind of a reported line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Done,
    Note,
    Warn,
    Fail,
}

impl Tone {
    fn tag(self) -> StyledObject<&'static str> {
        match self {
            Self::Done => style("[OK]").green(),
            Self::Note => style("[INFO]").cyan(),
            Self::Warn => style("[WARN]").yellow(),
            Self::Fail => style("[FAIL]").red(),
        }
    }
}

/// Report one outcome line
pub fn report(ctx: &UiContext, tone: Tone, message: &str) {
    emit(ctx, tone, message.to_string());
}

/// Report one outcome line with a parenthesised detail
pub fn report_with(ctx: &UiContext, tone: Tone, message: &str, detail: &str) {
    let text = if ctx.use_fancy_output() {
        format!("{} {}", message, style(format!("({})", detail)).dim())
    } else {
        format!("{} ({})", message, detail)
    };
    emit(ctx, tone, text);
}

fn emit(ctx: &UiContext, tone: Tone, text: String) {
    if !ctx.use_fancy_output() {
        println!("  {} {}", tone.tag(), text);
        return;
    }

    let _ = match tone {
        Tone::Done => cliclack::log::success(text),
        Tone::Note => cliclack::log::info(text),
        Tone::Warn => cliclack::log::warning(text),
        Tone::Fail => cliclack::log::error(text),
    };
}

/// Title opening a command's output
pub fn banner(ctx: &UiContext, title: &str) {
    if ctx.use_fancy_output() {
        let _ = cliclack::intro(style(title).green().bold());
    } else {
        println!("{}", style(title).bold());
    }
}

/// Closing line once every step succeeded
pub fn finished(ctx: &UiContext, message: &str) {
    if ctx.use_fancy_output() {
        let _ = cliclack::outro(style(message).green());
    } else {
        report(ctx, Tone::Done, message);
    }
}

/// Start a group of fields
pub fn heading(ctx: &UiContext, title: &str) {
    if ctx.use_fancy_output() {
        let _ = cliclack::log::step(style(title).bold());
    } else {
        println!();
        println!("{}", style(title).bold().underlined());
    }
}

/// One `name: value` field
pub fn field(ctx: &UiContext, name: &str, value: &str) {
    if ctx.use_fancy_output() {
        println!("  {:<24} {}", style(name).dim(), value);
    } else {
        println!("  {}: {}", name, value);
    }
}

/// A field whose value is either healthy or needs attention
pub fn gauge(ctx: &UiContext, name: &str, value: &str, healthy: bool) {
    if ctx.use_fancy_output() {
        let color = if healthy {
            Style::new().green()
        } else {
            Style::new().yellow()
        };
        println!("  {:<24} {}", style(name).dim(), color.apply_to(value));
    } else {
        let tone = if healthy { Tone::Done } else { Tone::Warn };
        println!("  {} {}: {}", tone.tag(), name, value);
    }
}

/// Follow-up the user may want, usually the next command to run
pub fn suggest(ctx: &UiContext, message: &str) {
    if ctx.use_fancy_output() {
        let _ = cliclack::log::remark(message);
    } else {
        println!("  {}", style(message).dim());
    }
}
