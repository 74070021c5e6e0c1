//! `kwarden template`: manage the policy template catalog.

use std::process::ExitCode;

use anyhow::Result;
use clap::Subcommand;

use crate::app::AppContext;
use crate::application::services::catalog::{self, NewTemplate};
use crate::output::json;

#[derive(Subcommand)]
pub enum TemplateCommand {
    /// Add a template to the catalog
    Add {
        /// Short human title, e.g. "deny all ingress"
        #[arg(long)]
        title: String,
        /// Template file, relative to the agent's template directory
        #[arg(long)]
        file: String,
        #[arg(long, default_value = "")]
        description: String,
        /// Policy kind, e.g. `NetworkPolicy`
        #[arg(long = "type", default_value = "NetworkPolicy")]
        policy_type: String,
    },
    /// List catalog templates
    List,
}

/// Run the template command.
///
/// # Errors
///
/// Propagates validation and store errors.
pub async fn run(app: &AppContext, cmd: TemplateCommand) -> Result<ExitCode> {
    let store = app.store()?;
    match cmd {
        TemplateCommand::Add {
            title,
            file,
            description,
            policy_type,
        } => {
            let template = catalog::add_template(
                &store,
                NewTemplate {
                    title,
                    description,
                    policy_type,
                    template_file_path: file,
                },
            )
            .await?;
            if app.is_json() {
                json::print(&template)?;
            } else {
                app.output
                    .ok(&format!("added template '{}' as {}", template.title, template.id));
            }
        }
        TemplateCommand::List => {
            let templates = catalog::list_templates(&store).await?;
            if app.is_json() {
                json::print(&templates)?;
            } else {
                app.renderer().render_templates(&templates);
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}
