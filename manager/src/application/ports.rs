//! Port trait definitions for the Application layer.
//!
//! Ports are the interfaces (contracts) that infrastructure must fulfill.
//! This file imports only from `crate::domain`. Never from `crate::infra`,
//! `crate::commands`, or `crate::output`.

use std::path::PathBuf;

use serde::de::DeserializeOwned;

use crate::domain::config::ManagerConfig;
use crate::domain::{
    Cluster, ConfigError, GatewayError, HostRecord, ImplementedPolicy, PolicyTemplate, StoreError,
};

// ── Agent transport ───────────────────────────────────────────────────────────

/// A successful (2xx) answer from an agent.
#[derive(Debug, Clone, Default)]
pub struct AgentResponse {
    pub status: u16,
    pub body: Vec<u8>,
    pub headers: Vec<(String, String)>,
}

impl AgentResponse {
    /// Decode the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns the decoder error when the body is not a valid `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}

/// HTTP transport to cluster agents. Non-2xx answers are errors
/// (`GatewayError::Rejected`), so an `Ok` response is always a success.
#[allow(async_fn_in_trait)]
pub trait AgentGateway {
    async fn get(&self, url: &str, headers: &[(&str, &str)]) -> Result<AgentResponse, GatewayError>;

    async fn post(
        &self,
        url: &str,
        body: &serde_json::Value,
        headers: &[(&str, &str)],
    ) -> Result<AgentResponse, GatewayError>;
}

// ── Persistence ───────────────────────────────────────────────────────────────

/// Registered clusters. `master_ip` is unique; a second insert with the
/// same ip fails with `StoreError::Conflict`.
#[allow(async_fn_in_trait)]
pub trait ClusterStore {
    async fn master_ip_exists(&self, master_ip: &str) -> Result<bool, StoreError>;
    async fn insert_cluster(&self, cluster: &Cluster) -> Result<(), StoreError>;
    async fn get_cluster(&self, id: &str) -> Result<Option<Cluster>, StoreError>;
    async fn list_clusters(&self) -> Result<Vec<Cluster>, StoreError>;
}

/// Read-mostly catalog of policy templates.
#[allow(async_fn_in_trait)]
pub trait TemplateCatalog {
    async fn insert_template(&self, template: &PolicyTemplate) -> Result<(), StoreError>;
    async fn get_template(&self, id: &str) -> Result<Option<PolicyTemplate>, StoreError>;
    async fn list_templates(&self) -> Result<Vec<PolicyTemplate>, StoreError>;
}

/// Ledger of policies the manager believes are applied.
#[allow(async_fn_in_trait)]
pub trait PolicyLedger {
    async fn insert_policy(&self, policy: &ImplementedPolicy) -> Result<(), StoreError>;
    async fn get_policy(&self, id: &str) -> Result<Option<ImplementedPolicy>, StoreError>;
    /// Returns `false` when no row had that id.
    async fn delete_policy(&self, id: &str) -> Result<bool, StoreError>;
    async fn list_policies(&self, cluster_id: Option<&str>)
    -> Result<Vec<ImplementedPolicy>, StoreError>;
}

/// Hosts probed by the liveness aggregator.
#[allow(async_fn_in_trait)]
pub trait HostInventory {
    async fn add_host(&self, host: &HostRecord) -> Result<(), StoreError>;
    /// All hosts in insertion order.
    async fn list_hosts(&self) -> Result<Vec<HostRecord>, StoreError>;
}

// ── Liveness ──────────────────────────────────────────────────────────────────

/// Single-host liveness check. Any failure is reported as "not live".
#[allow(async_fn_in_trait)]
pub trait HealthProbe {
    async fn is_live(&self, host: &HostRecord) -> bool;
}

// ── Configuration ─────────────────────────────────────────────────────────────

/// Abstracts manager configuration persistence.
pub trait ConfigStore {
    /// Load the configuration, or defaults when no file exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    fn load(&self) -> Result<ManagerConfig, ConfigError>;

    /// Location of the configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined.
    fn path(&self) -> Result<PathBuf, ConfigError>;
}

// ── Progress Reporting Port ───────────────────────────────────────────────────

/// Abstracts progress reporting so services can emit events without
/// depending on the Presentation layer. Sync trait, no async needed.
pub trait ProgressReporter {
    /// Emit an in-progress step message.
    fn step(&self, message: &str);
    /// Emit a success message.
    fn success(&self, message: &str);
    /// Emit a warning message.
    fn warn(&self, message: &str);
}
