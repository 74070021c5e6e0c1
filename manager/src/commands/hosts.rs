//! `kwarden hosts`: host inventory and liveness.

use std::process::ExitCode;

use anyhow::Result;
use clap::Subcommand;

use crate::app::AppContext;
use crate::application::services::{cluster_info, liveness};
use crate::commands::with_spinner;
use crate::domain::HostRecord;
use crate::output::json;

#[derive(Subcommand)]
pub enum HostsCommand {
    /// Add a host to the inventory
    Add {
        ip_address: String,
        hostname: String,
    },
    /// Add the worker nodes of a registered cluster to the inventory
    Import {
        #[arg(long)]
        cluster: String,
    },
    /// List inventory hosts
    List,
    /// List hosts whose health endpoint answers
    Live {
        /// Maximum probes in flight (defaults to the configured value)
        #[arg(long)]
        concurrency: Option<usize>,
    },
}

/// Run the hosts command.
///
/// # Errors
///
/// Propagates store errors.
pub async fn run(app: &AppContext, cmd: HostsCommand) -> Result<ExitCode> {
    let store = app.store()?;
    match cmd {
        HostsCommand::Add {
            ip_address,
            hostname,
        } => {
            let host = HostRecord::new(ip_address, hostname);
            liveness::add_host(&store, &host).await?;
            if app.is_json() {
                json::print(&host)?;
            } else {
                app.output.ok(&format!("added {}", host.ip_address));
            }
        }
        HostsCommand::Import { cluster } => {
            let gateway = app.gateway()?;
            let added = with_spinner(
                app,
                "querying agent...",
                cluster_info::import_worker_hosts(&gateway, &store, &cluster),
            )
            .await?;
            if app.is_json() {
                json::print(&added)?;
            } else if added.is_empty() {
                app.output.hint("no new worker nodes to import");
            } else {
                app.renderer().render_hosts(&added, "Imported hosts");
            }
        }
        HostsCommand::List => {
            let hosts = liveness::list_hosts(&store).await?;
            if app.is_json() {
                json::print(&hosts)?;
            } else {
                app.renderer().render_hosts(&hosts, "Hosts");
            }
        }
        HostsCommand::Live { concurrency } => {
            let probe = app.probe()?;
            let concurrency = concurrency.unwrap_or(app.config.liveness.concurrency);
            let live = with_spinner(
                app,
                "probing hosts...",
                liveness::get_live_hosts(&store, &probe, concurrency),
            )
            .await?;
            if app.is_json() {
                json::print(&live)?;
            } else {
                app.renderer().render_hosts(&live, "Live hosts");
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}
