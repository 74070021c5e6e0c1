//! Typed domain error enums.
//!
//! This module has zero imports from `crate::infra`, `crate::commands` or
//! `crate::application`. Every error implements `thiserror::Error` and
//! converts into `anyhow::Error` at the command edge via `?`.

use std::path::PathBuf;

use thiserror::Error;

// ── Agent transport ───────────────────────────────────────────────────────────

/// Failure of a single request to a cluster agent.
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    /// The connection could not be established. Nothing reached the agent.
    #[error("agent at {url} is unreachable: {message}")]
    Unreachable { url: String, message: String },

    /// No complete response within the deadline. The agent may or may not
    /// have acted on the request.
    #[error("agent at {url} did not answer within {secs}s")]
    Timeout { url: String, secs: u64 },

    /// The agent answered with a non-2xx status.
    #[error("agent at {url} rejected the request with HTTP {status}: {body}")]
    Rejected { url: String, status: u16, body: String },

    #[error("invalid agent url {url}: {message}")]
    InvalidUrl { url: String, message: String },

    /// The request was sent but the exchange broke off before a response
    /// was read.
    #[error("request to {url} was interrupted: {message}")]
    Interrupted { url: String, message: String },
}

impl GatewayError {
    /// `true` when the agent certainly did not apply the requested change.
    ///
    /// A `Rejected` answer counts: the agent removes whatever it rendered
    /// before reporting a failed apply.
    #[must_use]
    pub fn is_definitely_not_applied(&self) -> bool {
        matches!(
            self,
            Self::Unreachable { .. } | Self::InvalidUrl { .. } | Self::Rejected { .. }
        )
    }

    /// HTTP status of a rejected request.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }
}

// ── Persistence ───────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store backend error: {0}")]
    Backend(String),

    /// A uniqueness constraint was violated.
    #[error("store conflict: {0}")]
    Conflict(String),

    /// A stored row could not be decoded.
    #[error("corrupt store row: {0}")]
    Corrupt(String),
}

// ── Policy lifecycle ──────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Policy '{0}' not found. List policies with: kwarden policy list")]
    NotFound(String),

    #[error("Policy template '{0}' not found. List templates with: kwarden template list")]
    TemplateNotFound(String),

    #[error("Cluster '{0}' not found. List clusters with: kwarden cluster list")]
    ClusterNotFound(String),

    #[error(transparent)]
    AgentUnreachable(GatewayError),

    #[error("unexpected agent response: {0}")]
    InvalidAgentResponse(String),

    /// The request may have reached the agent but no answer came back, so
    /// whether the change happened is unknown. The ledger is untouched.
    #[error(
        "no answer from the agent of cluster {cluster_id}; the change may or may not have been \
         applied (check with: kwarden policy reconcile --cluster {cluster_id})"
    )]
    OutcomeUnknown {
        cluster_id: String,
        #[source]
        source: GatewayError,
    },

    /// The agent applied the policy but the ledger row could not be written.
    #[error("policy {policy_path} was applied but could not be recorded")]
    Unrecorded {
        policy_path: String,
        #[source]
        source: StoreError,
    },

    /// The agent removed the policy but its ledger row is still present.
    #[error(
        "policy {id} was removed from the cluster but its record could not be deleted \
         (repair with: kwarden policy reconcile --prune)"
    )]
    CleanupRequired {
        id: String,
        #[source]
        source: StoreError,
    },

    #[error(transparent)]
    Persistence(#[from] StoreError),
}

// ── Cluster registry ──────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("A cluster with master ip {0} is already registered.")]
    AlreadyRegistered(String),

    #[error("Invalid cluster registration: {0}")]
    InvalidRegistration(String),

    #[error("Cluster '{0}' not found. List clusters with: kwarden cluster list")]
    NotFound(String),

    #[error(transparent)]
    AgentUnreachable(GatewayError),

    #[error("unexpected agent response: {0}")]
    InvalidAgentResponse(String),

    #[error(transparent)]
    Persistence(#[from] StoreError),
}

// ── Config ────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot determine home directory")]
    NoHome,

    #[error("cannot read {}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse {}", path.display())]
    Invalid {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}
