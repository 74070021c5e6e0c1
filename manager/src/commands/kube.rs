//! `kwarden kube`: read-only cluster views through the agent.

use std::process::ExitCode;

use anyhow::Result;
use clap::Subcommand;

use crate::app::AppContext;
use crate::application::services::cluster_info;
use crate::commands::with_spinner;
use crate::output::json;

#[derive(Subcommand)]
pub enum KubeCommand {
    /// List namespaces
    Namespaces {
        #[arg(long)]
        cluster: String,
    },
    /// Show workloads of one namespace, or of every namespace
    Resources {
        #[arg(long)]
        cluster: String,
        /// Restrict to one namespace
        #[arg(long, short)]
        namespace: Option<String>,
    },
    /// List worker nodes and their addresses
    Nodes {
        #[arg(long)]
        cluster: String,
    },
    /// Count running pods
    Pods {
        #[arg(long)]
        cluster: String,
    },
    /// Running pods and recorded policies
    Stats {
        #[arg(long)]
        cluster: String,
    },
}

/// Run the kube command.
///
/// # Errors
///
/// Propagates registry and agent errors.
pub async fn run(app: &AppContext, cmd: KubeCommand) -> Result<ExitCode> {
    let store = app.store()?;
    let gateway = app.gateway()?;
    match cmd {
        KubeCommand::Namespaces { cluster } => {
            let names = with_spinner(
                app,
                "querying agent...",
                cluster_info::namespaces(&gateway, &store, &cluster),
            )
            .await?;
            if app.is_json() {
                json::print(&names)?;
            } else {
                app.renderer().render_namespaces(&names);
            }
        }
        KubeCommand::Resources {
            cluster,
            namespace: Some(namespace),
        } => {
            let resources = with_spinner(
                app,
                "querying agent...",
                cluster_info::namespace_resources(&gateway, &store, &cluster, &namespace),
            )
            .await?;
            if app.is_json() {
                json::print(&resources)?;
            } else {
                app.renderer().render_resources(&namespace, &resources);
            }
        }
        KubeCommand::Resources {
            cluster,
            namespace: None,
        } => {
            let snapshots = with_spinner(
                app,
                "querying agent...",
                cluster_info::all_resources(&gateway, &store, &cluster),
            )
            .await?;
            if app.is_json() {
                json::print(&snapshots)?;
            } else {
                app.renderer().render_snapshots(&snapshots);
            }
        }
        KubeCommand::Nodes { cluster } => {
            let nodes = with_spinner(
                app,
                "querying agent...",
                cluster_info::nodes(&gateway, &store, &cluster),
            )
            .await?;
            if app.is_json() {
                json::print(&nodes)?;
            } else {
                app.renderer().render_nodes(&nodes);
            }
        }
        KubeCommand::Pods { cluster } => {
            let running_pods = with_spinner(
                app,
                "querying agent...",
                cluster_info::running_pods(&gateway, &store, &cluster),
            )
            .await?;
            if app.is_json() {
                json::print(&serde_json::json!({ "running_pods": running_pods }))?;
            } else {
                app.output.field("running pods:", &running_pods.to_string());
            }
        }
        KubeCommand::Stats { cluster } => {
            let stats = with_spinner(
                app,
                "querying agent...",
                cluster_info::stats(&gateway, &store, &cluster),
            )
            .await?;
            if app.is_json() {
                json::print(&stats)?;
            } else {
                app.renderer().render_stats(&stats);
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}
