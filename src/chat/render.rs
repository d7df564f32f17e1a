//! Output rendering for the chat application.
//!
//! The renderer subscribes to the conversation store and prints assistant turns
//! as they are appended.  User turns are not echoed; the terminal already shows
//! what was typed.

use std::io::{self, Stdout, Write};

use crate::store::StoreListener;
use crate::types::{Role, Turn};

/// ANSI escape code for dim text (used for sources and info).
const ANSI_DIM: &str = "\x1b[2m";

/// ANSI escape code to reset all styling.
const ANSI_RESET: &str = "\x1b[0m";

/// ANSI escape code for green text (used for the assistant label).
const ANSI_GREEN: &str = "\x1b[32m";

/// ANSI escape code for red text (used for errors).
const ANSI_RED: &str = "\x1b[31m";

/// Label printed before assistant turns.
const ASSISTANT_LABEL: &str = "EcoBot";

/// Label printed before user turns when replaying history.
const USER_LABEL: &str = "You";

/// Plain text renderer with optional ANSI styling.
pub struct PlainTextRenderer {
    stdout: Stdout,
    use_color: bool,
}

impl PlainTextRenderer {
    /// Creates a new PlainTextRenderer with ANSI colors enabled.
    pub fn new() -> Self {
        Self::with_color(true)
    }

    /// Creates a new PlainTextRenderer with specified color setting.
    pub fn with_color(use_color: bool) -> Self {
        Self {
            stdout: io::stdout(),
            use_color,
        }
    }

    fn flush(&mut self) {
        let _ = self.stdout.flush();
    }

    /// Format one turn the way it is printed.
    pub fn format_turn(&self, turn: &Turn) -> String {
        let label = match turn.role() {
            Role::User => USER_LABEL,
            Role::Assistant => ASSISTANT_LABEL,
        };
        let is_error = turn.is_assistant() && turn.content().starts_with("Error:");
        match (self.use_color, turn.role(), is_error) {
            (false, _, _) => format!("{label}: {}", turn.content()),
            (true, Role::User, _) => format!("{ANSI_DIM}{label}:{ANSI_RESET} {}", turn.content()),
            (true, Role::Assistant, false) => {
                format!("{ANSI_GREEN}{label}:{ANSI_RESET} {}", turn.content())
            }
            (true, Role::Assistant, true) => format!(
                "{ANSI_GREEN}{label}:{ANSI_RESET} {ANSI_RED}{}{ANSI_RESET}",
                turn.content()
            ),
        }
    }

    /// Format a list of cited sources, or `None` if there are none.
    pub fn format_sources(&self, sources: &[String]) -> Option<String> {
        if sources.is_empty() {
            return None;
        }
        let list = sources.join(", ");
        if self.use_color {
            Some(format!("{ANSI_DIM}  sources: {list}{ANSI_RESET}"))
        } else {
            Some(format!("  sources: {list}"))
        }
    }

    /// Print a turn regardless of its role.
    pub fn print_turn(&mut self, turn: &Turn) {
        println!("{}", self.format_turn(turn));
        self.flush();
    }

    /// Print the sources cited by a reply.
    pub fn print_sources(&mut self, sources: &[String]) {
        if let Some(line) = self.format_sources(sources) {
            println!("{line}");
            self.flush();
        }
    }

    /// Print an error message.
    pub fn print_error(&mut self, error: &str) {
        if self.use_color {
            eprintln!("{ANSI_RED}Error: {error}{ANSI_RESET}");
        } else {
            eprintln!("Error: {error}");
        }
    }

    /// Print an informational message.
    pub fn print_info(&mut self, info: &str) {
        if self.use_color {
            println!("{ANSI_DIM}{info}{ANSI_RESET}");
        } else {
            println!("{info}");
        }
        self.flush();
    }
}

impl Default for PlainTextRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl StoreListener for PlainTextRenderer {
    fn turn_appended(&mut self, _index: usize, turn: &Turn) {
        if turn.is_assistant() {
            self.print_turn(turn);
        }
    }
}
