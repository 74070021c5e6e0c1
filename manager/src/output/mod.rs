//! Terminal and JSON output.
//!
//! Commands print through [`OutputContext`] in human mode and through
//! [`json`] with `--json`; nothing else writes to stdout.

pub mod human;
pub mod json;
pub mod progress;
pub mod reporter;
pub mod styles;

use console::Term;
use owo_colors::OwoColorize as _;
pub use human::HumanRenderer;
pub use reporter::{QuietReporter, Reporter, TerminalReporter};
pub use styles::Styles;

pub struct OutputContext {
    pub styles: Styles,
    /// stdout is a terminal.
    pub interactive: bool,
    /// Only errors are printed.
    pub quiet: bool,
}

impl OutputContext {
    /// Colors are used only on a terminal, without `--no-color` or `NO_COLOR`.
    #[must_use]
    pub fn new(no_color: bool, quiet: bool) -> Self {
        let interactive = Term::stdout().is_term();
        let colored = interactive && !no_color && std::env::var_os("NO_COLOR").is_none();
        Self {
            styles: if colored { Styles::colored() } else { Styles::default() },
            interactive,
            quiet,
        }
    }

    /// Spinners only make sense on an interactive, non-quiet terminal.
    #[must_use]
    pub fn spinners(&self) -> bool {
        self.interactive && !self.quiet
    }

    fn line(&self, mark: &str, style: owo_colors::Style, msg: &str) {
        if !self.quiet {
            println!("  {} {msg}", mark.style(style));
        }
    }

    pub fn ok(&self, msg: &str) {
        self.line("✓", self.styles.ok, msg);
    }

    pub fn drift(&self, msg: &str) {
        self.line("!", self.styles.drift, msg);
    }

    pub fn hint(&self, msg: &str) {
        self.line("→", self.styles.step, msg);
    }

    /// Goes to stderr and ignores `quiet`.
    pub fn failure(&self, msg: &str) {
        eprintln!("  {} {msg}", "✗".style(self.styles.failure));
    }

    pub fn title(&self, msg: &str) {
        if !self.quiet {
            println!("  {}", msg.style(self.styles.title));
        }
    }

    /// An aligned `label value` line.
    pub fn field(&self, label: &str, value: &str) {
        if !self.quiet {
            println!("  {:<14} {value}", label.style(self.styles.muted));
        }
    }
}
