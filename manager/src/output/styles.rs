//! owo-colors stylesheet for terminal output.

use owo_colors::Style;

/// Styles are plain (no-op) until [`Styles::colored`] is used.
#[derive(Default, Clone)]
pub struct Styles {
    /// Completed actions and consistent state.
    pub ok: Style,
    /// Drift between ledger and agent, degraded clusters.
    pub drift: Style,
    pub failure: Style,
    /// In-flight steps and hints.
    pub step: Style,
    pub muted: Style,
    pub label: Style,
    /// Cluster names and section titles.
    pub title: Style,
}

impl Styles {
    #[must_use]
    pub fn colored() -> Self {
        Self {
            ok: Style::new().green(),
            drift: Style::new().yellow(),
            failure: Style::new().red(),
            step: Style::new().blue(),
            muted: Style::new().dimmed(),
            label: Style::new().bold(),
            title: Style::new().bold().cyan(),
        }
    }
}
