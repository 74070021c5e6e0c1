//! `kwarden config`: show the effective configuration.

use std::process::ExitCode;

use anyhow::Result;
use clap::Subcommand;

use crate::app::AppContext;
use crate::application::ports::ConfigStore;
use crate::infra::config::database_path;
use crate::output::json;

/// Config subcommands.
#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show,
}

/// Run the config command.
///
/// # Errors
///
/// Returns an error if the config or database path cannot be resolved.
pub fn run(app: &AppContext, cmd: ConfigCommand) -> Result<ExitCode> {
    match cmd {
        ConfigCommand::Show => {
            let path = app.config_store.path()?;
            let database = database_path(&app.config)?;
            if app.is_json() {
                json::print(&serde_json::json!({
                    "path": path,
                    "database": database,
                    "config": app.config,
                }))?;
            } else {
                app.renderer().render_config(&app.config, &path, &database);
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}
