//! Policy catalog entries and ledger rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who created and last touched a row, and when.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Audit {
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_by: String,
    pub updated_at: DateTime<Utc>,
}

impl Audit {
    /// Fresh audit fields for a row created now by `operator`.
    #[must_use]
    pub fn created(operator: &str, at: DateTime<Utc>) -> Self {
        Self {
            created_by: operator.to_string(),
            created_at: at,
            updated_by: operator.to_string(),
            updated_at: at,
        }
    }
}

/// Catalog entry. `template_file_path` is resolved by the agent against its
/// own template directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyTemplate {
    pub id: String,
    pub title: String,
    pub description: String,
    pub policy_type: String,
    pub template_file_path: String,
}

/// Ledger row: present iff the manager believes the manifest is applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImplementedPolicy {
    pub id: String,
    pub cluster_id: String,
    pub title: String,
    pub description: String,
    pub app_label: String,
    pub namespace: String,
    /// Manifest file name on the agent, e.g. `<uuid>.yaml`.
    pub policy_file_path: String,
    pub audit: Audit,
}
