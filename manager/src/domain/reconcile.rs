//! Ledger/agent consistency check.
//!
//! The ledger and the agent's applied directory can drift apart when a
//! remote mutation succeeds but the local write that should follow it does
//! not. `diff` classifies every entry on both sides.

use std::collections::HashSet;

use serde::Serialize;

use crate::domain::policy::ImplementedPolicy;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub cluster_id: String,
    /// Rows whose manifest is applied on the agent.
    pub confirmed: Vec<ImplementedPolicy>,
    /// Manifests applied on the agent with no ledger row.
    pub unrecorded: Vec<String>,
    /// Rows whose manifest the agent no longer has.
    pub missing: Vec<ImplementedPolicy>,
    /// Set when the pass also repaired the drift.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pruned: Option<PruneSummary>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PruneSummary {
    /// Ids of ledger rows deleted because their manifest was gone.
    pub removed_rows: Vec<String>,
    /// Manifests deleted from the agent because nothing recorded them.
    pub swept_manifests: Vec<String>,
    /// Unrecorded manifests left in place because they are younger than the
    /// grace period; a deploy may still be about to record them.
    pub deferred: Vec<String>,
    /// One message per repair that failed.
    pub failures: Vec<String>,
}

impl ReconcileReport {
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.unrecorded.is_empty() && self.missing.is_empty()
    }
}

impl PruneSummary {
    /// Every drift the pass found is gone.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty() && self.deferred.is_empty()
    }
}

/// Classify `rows` (the ledger for one cluster) against `applied` (the
/// manifest names the agent reports). Unrecorded names keep agent order.
#[must_use]
pub fn diff(cluster_id: &str, rows: Vec<ImplementedPolicy>, applied: &[String]) -> ReconcileReport {
    let on_agent: HashSet<&str> = applied.iter().map(String::as_str).collect();
    let recorded: HashSet<&str> = rows.iter().map(|r| r.policy_file_path.as_str()).collect();

    let mut seen = HashSet::new();
    let unrecorded = applied
        .iter()
        .filter(|name| !recorded.contains(name.as_str()))
        .filter(|name| seen.insert(name.as_str()))
        .cloned()
        .collect();

    let (confirmed, missing) = rows
        .into_iter()
        .partition(|r| on_agent.contains(r.policy_file_path.as_str()));

    ReconcileReport {
        cluster_id: cluster_id.to_string(),
        confirmed,
        unrecorded,
        missing,
        pruned: None,
    }
}
