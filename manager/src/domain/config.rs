//! Manager configuration schema.
//!
//! Pure types only; loading lives in `infra::config`.

use std::path::PathBuf;

use kwarden_common::liveness;
use serde::{Deserialize, Serialize};

pub const DEFAULT_AGENT_PORT: u16 = 8990;
pub const DEFAULT_AGENT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_PRUNE_GRACE_SECS: u64 = 300;

/// Top-level configuration stored in `~/.kwarden/config.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// SQLite database file. Defaults to `~/.kwarden/kwarden.db`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<PathBuf>,

    /// Recorded as `created_by`/`updated_by` on every row this manager writes.
    pub operator: String,

    pub agent: AgentClientConfig,

    pub liveness: LivenessConfig,

    pub reconcile: ReconcileConfig,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            database: None,
            operator: default_operator(),
            agent: AgentClientConfig::default(),
            liveness: LivenessConfig::default(),
            reconcile: ReconcileConfig::default(),
        }
    }
}

fn default_operator() -> String {
    "kwarden".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentClientConfig {
    /// Per-request timeout. Zero means the default.
    pub timeout_secs: u64,
}

impl Default for AgentClientConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_AGENT_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LivenessConfig {
    pub port: u16,
    pub path: String,
    pub timeout_secs: u64,
    /// Upper bound on probes in flight.
    pub concurrency: usize,
}

impl Default for LivenessConfig {
    fn default() -> Self {
        Self {
            port: liveness::DEFAULT_PORT,
            path: liveness::DEFAULT_PATH.to_string(),
            timeout_secs: liveness::DEFAULT_TIMEOUT_SECS,
            concurrency: liveness::DEFAULT_CONCURRENCY,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    /// `--prune` leaves unrecorded manifests younger than this alone; they
    /// may belong to a deploy whose ledger write has not landed yet.
    pub prune_grace_secs: u64,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            prune_grace_secs: DEFAULT_PRUNE_GRACE_SECS,
        }
    }
}
