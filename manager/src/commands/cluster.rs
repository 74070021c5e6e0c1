//! `kwarden cluster`: register and inspect clusters.

use std::process::ExitCode;

use anyhow::Result;
use clap::Subcommand;

use crate::app::AppContext;
use crate::application::services::cluster_registry;
use crate::domain::NewCluster;
use crate::domain::config::DEFAULT_AGENT_PORT;
use crate::output::json;

#[derive(Subcommand)]
pub enum ClusterCommand {
    /// Register a cluster by contacting its agent
    Add {
        /// Address of the cluster's master node, where the agent runs
        master_ip: String,
        /// Agent HTTP port
        #[arg(long, default_value_t = u32::from(DEFAULT_AGENT_PORT))]
        port: u32,
        /// Free-form description
        #[arg(long, default_value = "")]
        description: String,
    },
    /// List registered clusters
    List,
    /// Show one cluster
    Show {
        /// Cluster id
        id: String,
    },
}

/// Run the cluster command.
///
/// # Errors
///
/// Propagates registry and store errors.
pub async fn run(app: &AppContext, cmd: ClusterCommand) -> Result<ExitCode> {
    let store = app.store()?;
    match cmd {
        ClusterCommand::Add {
            master_ip,
            port,
            description,
        } => {
            let gateway = app.gateway()?;
            let new = NewCluster {
                master_ip,
                agent_port: port,
                description,
            };
            let cluster = cluster_registry::add_new_cluster(
                &gateway,
                &store,
                &app.reporter(),
                app.operator(),
                &new,
            )
            .await?;
            if app.is_json() {
                json::print(&cluster)?;
            }
        }
        ClusterCommand::List => {
            let clusters = cluster_registry::list_clusters(&store).await?;
            if app.is_json() {
                json::print(&clusters)?;
            } else {
                app.renderer().render_clusters(&clusters);
            }
        }
        ClusterCommand::Show { id } => {
            let cluster = cluster_registry::get_cluster(&store, &id).await?;
            if app.is_json() {
                json::print(&cluster)?;
            } else {
                app.renderer().render_cluster(&cluster);
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}
