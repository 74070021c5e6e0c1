//! `kwarden policy`: deploy, delete and reconcile policies.

use std::process::ExitCode;
use std::time::Duration;

use anyhow::Result;
use clap::Subcommand;

use crate::app::AppContext;
use crate::application::services::policy_lifecycle::{self, DeployRequest, ReconcileMode};
use crate::domain::ReconcileReport;
use crate::infra::http_client::ReqwestAgentGateway;
use crate::infra::store::SqliteStore;
use crate::output::json;

/// Exit code of `reconcile` when drift was found and left in place.
const EXIT_DRIFT: u8 = 2;

#[derive(Subcommand)]
pub enum PolicyCommand {
    /// Render a template on the cluster's agent and record it
    Deploy {
        #[arg(long)]
        cluster: String,
        /// Template id (see `kwarden template list`)
        #[arg(long)]
        template: String,
        #[arg(long, short)]
        namespace: String,
        /// Value substituted for the app label in the template
        #[arg(long)]
        app_label: String,
    },
    /// Remove a deployed policy from its cluster
    Delete {
        /// Policy id (see `kwarden policy list`)
        id: String,
    },
    /// List recorded policies
    List {
        /// Only policies of this cluster
        #[arg(long)]
        cluster: Option<String>,
    },
    /// Compare recorded policies with what the agent has applied.
    ///
    /// Exits with status 2 when drift is found and not fully pruned.
    Reconcile {
        #[arg(long)]
        cluster: String,
        /// Drop stale records and remove unrecorded manifests
        #[arg(long)]
        prune: bool,
        /// With --prune, leave unrecorded manifests younger than this alone
        /// [default: reconcile.prune_grace_secs from the config file]
        #[arg(long, value_name = "SECS", requires = "prune")]
        grace: Option<u64>,
        /// Repeat every N seconds until interrupted
        #[arg(long, value_name = "SECS")]
        interval: Option<u64>,
    },
}

/// Run the policy command.
///
/// # Errors
///
/// Propagates lifecycle errors.
pub async fn run(app: &AppContext, cmd: PolicyCommand) -> Result<ExitCode> {
    let store = app.store()?;
    match cmd {
        PolicyCommand::Deploy {
            cluster,
            template,
            namespace,
            app_label,
        } => {
            let gateway = app.gateway()?;
            let req = DeployRequest {
                cluster_id: cluster,
                template_id: template,
                namespace,
                app_label,
            };
            let policy =
                policy_lifecycle::deploy(&gateway, &store, &app.reporter(), app.operator(), &req)
                    .await?;
            if app.is_json() {
                json::print(&policy)?;
            } else {
                app.renderer().render_policy(&policy);
            }
        }
        PolicyCommand::Delete { id } => {
            let gateway = app.gateway()?;
            let policy = policy_lifecycle::delete(&gateway, &store, &app.reporter(), &id).await?;
            if app.is_json() {
                json::print(&policy)?;
            }
        }
        PolicyCommand::List { cluster } => {
            let policies = policy_lifecycle::list(&store, cluster.as_deref()).await?;
            if app.is_json() {
                json::print(&policies)?;
            } else {
                app.renderer().render_policies(&policies);
            }
        }
        PolicyCommand::Reconcile {
            cluster,
            prune,
            grace,
            interval,
        } => {
            let gateway = app.gateway()?;
            let mode = if prune {
                ReconcileMode::Prune {
                    grace_secs: grace.unwrap_or(app.config.reconcile.prune_grace_secs),
                }
            } else {
                ReconcileMode::ReportOnly
            };
            return match interval {
                None => {
                    let report = reconcile_once(app, &gateway, &store, &cluster, mode).await?;
                    Ok(drift_exit(&report))
                }
                Some(secs) => {
                    reconcile_every(app, &gateway, &store, &cluster, mode, secs).await?;
                    Ok(ExitCode::SUCCESS)
                }
            };
        }
    }
    Ok(ExitCode::SUCCESS)
}

async fn reconcile_once(
    app: &AppContext,
    gateway: &ReqwestAgentGateway,
    store: &SqliteStore,
    cluster: &str,
    mode: ReconcileMode,
) -> Result<ReconcileReport> {
    let report =
        policy_lifecycle::reconcile(gateway, store, &app.reporter(), cluster, mode).await?;
    if app.is_json() {
        json::print(&report)?;
    } else {
        app.renderer().render_reconcile(&report);
    }
    Ok(report)
}

/// Periodic reconciliation. A failed pass is reported and retried on the
/// next tick; only Ctrl-C ends the loop.
async fn reconcile_every(
    app: &AppContext,
    gateway: &ReqwestAgentGateway,
    store: &SqliteStore,
    cluster: &str,
    mode: ReconcileMode,
    secs: u64,
) -> Result<()> {
    let mut ticker = tokio::time::interval(Duration::from_secs(secs.max(1)));
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(e) = reconcile_once(app, gateway, store, cluster, mode).await {
                    tracing::warn!(cluster_id = %cluster, error = %e, "reconcile pass failed");
                    app.output.failure(&format!("{e:#}"));
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("reconcile loop interrupted");
                return Ok(());
            }
        }
    }
}

/// Success when nothing drifted, or when pruning removed all of it.
fn drift_exit(report: &ReconcileReport) -> ExitCode {
    if report.is_consistent() || report.pruned.as_ref().is_some_and(|p| p.is_complete()) {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(EXIT_DRIFT)
    }
}
