//! Application service: deploy and delete policies on a cluster while keeping
//! the manager-side ledger in step with what the agent has applied.
//!
//! Ordering is always "mutate the agent, then the ledger". A failure between
//! the two is surfaced as its own error variant and left for `reconcile`.
//! So is a mutation whose answer never arrived.

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use kwarden_common::{
    AppliedPolicies, DeletePolicyResponse, DeployPolicyRequest, DeployPolicyResponse,
    delete_policy_path, paths,
};
use uuid::Uuid;

use crate::application::ports::{AgentGateway, ClusterStore, PolicyLedger, ProgressReporter, TemplateCatalog};
use crate::domain::reconcile::{self, PruneSummary};
use crate::domain::{
    Audit, Cluster, GatewayError, ImplementedPolicy, LifecycleError, ReconcileReport,
};

/// What `reconcile` does about the drift it finds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileMode {
    ReportOnly,
    /// Delete stale rows, and sweep unrecorded manifests at least
    /// `grace_secs` old as reported by the agent.
    Prune { grace_secs: u64 },
}

/// Everything needed to apply one template to one workload.
#[derive(Debug, Clone)]
pub struct DeployRequest {
    pub cluster_id: String,
    pub template_id: String,
    pub namespace: String,
    pub app_label: String,
}

/// Classify a failed mutation. Only a failure that proves the agent did
/// nothing is `AgentUnreachable`; anything else leaves the cluster in an
/// unknown state and points the operator at `reconcile`.
fn mutation_error(
    reporter: &impl ProgressReporter,
    cluster: &Cluster,
    action: &str,
    err: GatewayError,
) -> LifecycleError {
    if err.is_definitely_not_applied() {
        return LifecycleError::AgentUnreachable(err);
    }
    tracing::warn!(cluster_id = %cluster.id, action, error = %err, "agent outcome unknown");
    reporter.warn(&format!(
        "{action} outcome unknown; run kwarden policy reconcile --cluster {}",
        cluster.id
    ));
    LifecycleError::OutcomeUnknown {
        cluster_id: cluster.id.clone(),
        source: err,
    }
}

async fn load_cluster(store: &impl ClusterStore, id: &str) -> Result<Cluster, LifecycleError> {
    store
        .get_cluster(id)
        .await?
        .ok_or_else(|| LifecycleError::ClusterNotFound(id.to_string()))
}

/// Render and apply a template on the named cluster, then record it.
///
/// # Errors
///
/// - `ClusterNotFound` / `TemplateNotFound` before anything is sent.
/// - `AgentUnreachable` when the agent certainly did not apply anything
///   (connection refused, non-2xx answer); the ledger is untouched.
/// - `OutcomeUnknown` on a timeout or broken exchange; the ledger is
///   untouched and `reconcile` shows whether the policy landed.
/// - `InvalidAgentResponse` when the agent's answer cannot be decoded.
/// - `Unrecorded` when the agent applied the policy but the ledger insert
///   failed. The manifest stays applied and `reconcile` will report it.
pub async fn deploy(
    gateway: &impl AgentGateway,
    store: &(impl ClusterStore + TemplateCatalog + PolicyLedger),
    reporter: &impl ProgressReporter,
    operator: &str,
    req: &DeployRequest,
) -> Result<ImplementedPolicy, LifecycleError> {
    let cluster = load_cluster(store, &req.cluster_id).await?;
    let template = store
        .get_template(&req.template_id)
        .await?
        .ok_or_else(|| LifecycleError::TemplateNotFound(req.template_id.clone()))?;

    reporter.step(&format!(
        "applying '{}' to {}/{} on {}...",
        template.title, req.namespace, req.app_label, cluster.cluster_name
    ));

    let body = DeployPolicyRequest {
        namespace: req.namespace.clone(),
        app_label: req.app_label.clone(),
        path: template.template_file_path.clone(),
    };
    let body = serde_json::to_value(&body)
        .map_err(|e| LifecycleError::InvalidAgentResponse(e.to_string()))?;
    let resp = gateway
        .post(&cluster.agent_url(paths::DEPLOY_POLICY), &body, &[])
        .await
        .map_err(|e| mutation_error(reporter, &cluster, "deploy", e))?;
    let DeployPolicyResponse { policy_path } = resp
        .json()
        .map_err(|e| LifecycleError::InvalidAgentResponse(e.to_string()))?;

    let now = Utc::now();
    let policy = ImplementedPolicy {
        id: Uuid::new_v4().to_string(),
        cluster_id: cluster.id.clone(),
        title: template.title,
        description: template.description,
        app_label: req.app_label.clone(),
        namespace: req.namespace.clone(),
        policy_file_path: policy_path,
        audit: Audit::created(operator, now),
    };

    if let Err(source) = store.insert_policy(&policy).await {
        tracing::error!(
            cluster_id = %cluster.id,
            policy_path = %policy.policy_file_path,
            error = %source,
            "policy applied on agent but not recorded",
        );
        return Err(LifecycleError::Unrecorded {
            policy_path: policy.policy_file_path,
            source,
        });
    }

    tracing::info!(
        cluster_id = %cluster.id,
        policy_id = %policy.id,
        policy_path = %policy.policy_file_path,
        "policy deployed",
    );
    reporter.success(&format!("policy {} applied", policy.id));
    Ok(policy)
}

/// Remove a recorded policy from its cluster, then drop the ledger row.
///
/// # Errors
///
/// - `NotFound` when no row has `policy_id`; the agent is not contacted.
/// - `ClusterNotFound` when the row's cluster is no longer registered.
/// - `AgentUnreachable` when the agent refused or was never reached; the row
///   is kept.
/// - `OutcomeUnknown` on a timeout or broken exchange; the row is kept.
/// - `CleanupRequired` when the agent removed the manifest but the row
///   could not be deleted.
pub async fn delete(
    gateway: &impl AgentGateway,
    store: &(impl ClusterStore + PolicyLedger),
    reporter: &impl ProgressReporter,
    policy_id: &str,
) -> Result<ImplementedPolicy, LifecycleError> {
    let policy = store
        .get_policy(policy_id)
        .await?
        .ok_or_else(|| LifecycleError::NotFound(policy_id.to_string()))?;
    let cluster = load_cluster(store, &policy.cluster_id).await?;

    reporter.step(&format!(
        "removing {} from {}...",
        policy.policy_file_path, cluster.cluster_name
    ));
    let url = cluster.agent_url(&delete_policy_path(&policy.policy_file_path));
    let resp = gateway
        .get(&url, &[])
        .await
        .map_err(|e| mutation_error(reporter, &cluster, "delete", e))?;
    match resp.json::<DeletePolicyResponse>() {
        Ok(deleted) => tracing::debug!(output = %deleted.output, "agent delete output"),
        Err(e) => tracing::warn!(error = %e, "agent delete answer not understood"),
    }

    if let Err(source) = store.delete_policy(&policy.id).await {
        tracing::error!(
            cluster_id = %cluster.id,
            policy_id = %policy.id,
            error = %source,
            "policy removed on agent but ledger row remains",
        );
        return Err(LifecycleError::CleanupRequired {
            id: policy.id,
            source,
        });
    }

    tracing::info!(cluster_id = %cluster.id, policy_id = %policy.id, "policy deleted");
    reporter.success(&format!("policy {} removed", policy.id));
    Ok(policy)
}

/// Ledger rows, optionally restricted to one cluster.
///
/// # Errors
///
/// Returns `Persistence` if the ledger cannot be read.
pub async fn list(
    store: &impl PolicyLedger,
    cluster_id: Option<&str>,
) -> Result<Vec<ImplementedPolicy>, LifecycleError> {
    Ok(store.list_policies(cluster_id).await?)
}

/// Compare the ledger for `cluster_id` with the manifests its agent reports.
///
/// With `ReconcileMode::Prune`, rows whose manifest is gone are deleted from
/// the ledger and manifests nothing recorded are deleted on the agent.
/// Manifests younger than the grace period are deferred, and the ledger is
/// read again right before sweeping, so a deploy still between its agent
/// call and its ledger write is left alone. Individual repair failures are
/// collected in the report instead of aborting the pass.
///
/// # Errors
///
/// `ClusterNotFound`, `AgentUnreachable` / `InvalidAgentResponse` for the
/// listing call, or `Persistence` if the ledger cannot be read.
pub async fn reconcile(
    gateway: &impl AgentGateway,
    store: &(impl ClusterStore + PolicyLedger),
    reporter: &impl ProgressReporter,
    cluster_id: &str,
    mode: ReconcileMode,
) -> Result<ReconcileReport, LifecycleError> {
    let cluster = load_cluster(store, cluster_id).await?;
    let resp = gateway
        .get(&cluster.agent_url(paths::APPLIED_POLICIES), &[])
        .await
        .map_err(LifecycleError::AgentUnreachable)?;
    let applied: AppliedPolicies = resp
        .json()
        .map_err(|e| LifecycleError::InvalidAgentResponse(e.to_string()))?;

    let rows = store.list_policies(Some(&cluster.id)).await?;
    let mut report = reconcile::diff(&cluster.id, rows, &applied.names());
    tracing::info!(
        cluster_id = %cluster.id,
        confirmed = report.confirmed.len(),
        unrecorded = report.unrecorded.len(),
        missing = report.missing.len(),
        "reconciled",
    );

    let ReconcileMode::Prune { grace_secs } = mode else {
        return Ok(report);
    };
    if !report.is_consistent() {
        let ages: HashMap<&str, u64> = applied
            .policies
            .iter()
            .map(|m| (m.name.as_str(), m.age_secs))
            .collect();
        let summary = prune_drift(gateway, store, reporter, &cluster, &report, &ages, grace_secs).await;
        report.pruned = Some(summary);
    }
    Ok(report)
}

async fn prune_drift(
    gateway: &impl AgentGateway,
    store: &impl PolicyLedger,
    reporter: &impl ProgressReporter,
    cluster: &Cluster,
    report: &ReconcileReport,
    ages: &HashMap<&str, u64>,
    grace_secs: u64,
) -> PruneSummary {
    let mut summary = PruneSummary::default();

    for row in &report.missing {
        match store.delete_policy(&row.id).await {
            Ok(_) => {
                reporter.step(&format!("dropped record {} ({})", row.id, row.policy_file_path));
                summary.removed_rows.push(row.id.clone());
            }
            Err(e) => {
                let msg = format!("cannot drop record {}: {e}", row.id);
                reporter.warn(&msg);
                summary.failures.push(msg);
            }
        }
    }

    let (old, young): (Vec<&String>, Vec<&String>) = report
        .unrecorded
        .iter()
        .partition(|name| ages.get(name.as_str()).copied().unwrap_or(0) >= grace_secs);
    for name in young {
        reporter.step(&format!("left {name} alone: younger than {grace_secs}s"));
        summary.deferred.push(name.clone());
    }

    // A deploy may have recorded its manifest since the listing was taken.
    let recorded: HashSet<String> = if old.is_empty() {
        HashSet::new()
    } else {
        match store.list_policies(Some(&cluster.id)).await {
            Ok(rows) => rows.into_iter().map(|r| r.policy_file_path).collect(),
            Err(e) => {
                let msg = format!("cannot re-read records before sweeping: {e}");
                reporter.warn(&msg);
                summary.failures.push(msg);
                return summary;
            }
        }
    };

    for name in old {
        if recorded.contains(name) {
            tracing::debug!(cluster_id = %cluster.id, manifest = %name, "recorded during reconcile");
            continue;
        }
        let url = cluster.agent_url(&delete_policy_path(name));
        match gateway.get(&url, &[]).await {
            Ok(_) => {
                reporter.step(&format!("removed unrecorded manifest {name}"));
                summary.swept_manifests.push(name.clone());
            }
            Err(e) => {
                let msg = format!("cannot remove {name}: {e}");
                reporter.warn(&msg);
                summary.failures.push(msg);
            }
        }
    }

    tracing::info!(
        cluster_id = %cluster.id,
        removed_rows = summary.removed_rows.len(),
        swept = summary.swept_manifests.len(),
        deferred = summary.deferred.len(),
        failures = summary.failures.len(),
        "pruned drift",
    );
    summary
}
