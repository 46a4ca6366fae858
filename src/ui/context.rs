//! Terminal detection for command output

use std::io::IsTerminal;

/// How much terminal the current command has to work with
#[derive(Debug, Clone)]
pub struct UiContext {
    interactive: bool,
    /// Set by --yes: destructive operations need no prompt
    auto_yes: bool,
}

impl UiContext {
    /// Inspect stdout, stdin and the environment.
    ///
    /// Framing and spinners need an attended terminal on both ends; any CI
    /// runner (`CI` is set by all common providers) gets tagged lines.
    pub fn detect() -> Self {
        let interactive = console::user_attended()
            && std::io::stdin().is_terminal()
            && std::env::var_os("CI").is_none();
        Self {
            interactive,
            auto_yes: false,
        }
    }

    /// Plain tagged output with no prompts
    pub fn non_interactive() -> Self {
        Self {
            interactive: false,
            auto_yes: false,
        }
    }

    pub fn with_auto_yes(mut self, yes: bool) -> Self {
        self.auto_yes = yes;
        self
    }

    pub fn is_interactive(&self) -> bool {
        self.interactive
    }

    pub fn auto_yes(&self) -> bool {
        self.auto_yes
    }

    /// Whether to use cliclack framing, spinners and the download bar
    pub fn use_fancy_output(&self) -> bool {
        self.interactive
    }
}
