//! `ProgressReporter` implementations for the presentation layer.

use crate::application::ports::ProgressReporter;
use crate::output::OutputContext;

/// Prints service progress as `→`, `✓` and `!` lines; silent when quiet.
pub struct TerminalReporter<'a> {
    ctx: &'a OutputContext,
}

impl<'a> TerminalReporter<'a> {
    #[must_use]
    pub fn new(ctx: &'a OutputContext) -> Self {
        Self { ctx }
    }
}

impl ProgressReporter for TerminalReporter<'_> {
    fn step(&self, message: &str) {
        self.ctx.hint(message);
    }

    fn success(&self, message: &str) {
        self.ctx.ok(message);
    }

    fn warn(&self, message: &str) {
        self.ctx.drift(message);
    }
}

/// Discards progress; used in `--json` mode so stdout stays parseable.
/// Warnings still reach the log.
pub struct QuietReporter;

impl ProgressReporter for QuietReporter {
    fn step(&self, _: &str) {}

    fn success(&self, _: &str) {}

    fn warn(&self, message: &str) {
        tracing::warn!("{message}");
    }
}

/// The reporter a command hands to application services.
pub enum Reporter<'a> {
    Terminal(TerminalReporter<'a>),
    Quiet(QuietReporter),
}

impl ProgressReporter for Reporter<'_> {
    fn step(&self, message: &str) {
        match self {
            Self::Terminal(r) => r.step(message),
            Self::Quiet(r) => r.step(message),
        }
    }

    fn success(&self, message: &str) {
        match self {
            Self::Terminal(r) => r.success(message),
            Self::Quiet(r) => r.success(message),
        }
    }

    fn warn(&self, message: &str) {
        match self {
            Self::Terminal(r) => r.warn(message),
            Self::Quiet(r) => r.warn(message),
        }
    }
}
