//! Shared fakes for service tests.
//!
//! `FakeAgent` behaves like a real agent backed by a temp directory: a
//! deploy writes `<uuid>.yaml`, a delete removes it, and the applied list
//! reads the directory back. Manifests planted behind the manager's back
//! report an age of an hour; deployed ones report zero.

#![allow(clippy::expect_used)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use kwarden_common::{
    AppliedManifest, AppliedPolicies, DeletePolicyResponse, DeployPolicyRequest,
    DeployPolicyResponse, HealthResponse, K8sHealth, NamespaceResources, PodInfo, RunningPods,
    SystemHealth, WorkerNodeInfo, paths,
};
use kwarden_manager::application::ports::{
    AgentGateway, AgentResponse, ClusterStore, HostInventory, PolicyLedger, ProgressReporter,
    TemplateCatalog,
};
use kwarden_manager::domain::{
    Audit, Cluster, GatewayError, HostRecord, ImplementedPolicy, PolicyTemplate, StoreError,
};
use serde::Serialize;
use tempfile::TempDir;
use tokio::sync::oneshot;

// ── Reporter ──────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingReporter {
    pub warnings: Mutex<Vec<String>>,
}

impl RecordingReporter {
    pub fn warnings(&self) -> Vec<String> {
        self.warnings.lock().expect("lock").clone()
    }
}

impl ProgressReporter for RecordingReporter {
    fn step(&self, _: &str) {}
    fn success(&self, _: &str) {}
    fn warn(&self, message: &str) {
        self.warnings.lock().expect("lock").push(message.to_string());
    }
}

// ── Store ─────────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryStore {
    clusters: Mutex<Vec<Cluster>>,
    templates: Mutex<Vec<PolicyTemplate>>,
    policies: Mutex<Vec<ImplementedPolicy>>,
    hosts: Mutex<Vec<HostRecord>>,
    /// `insert_cluster` reports a uniqueness conflict.
    pub lose_insert_race: AtomicBool,
    pub fail_policy_insert: AtomicBool,
    pub fail_policy_delete: AtomicBool,
    /// When set, the next `insert_policy` waits for this signal first.
    insert_gate: Mutex<Option<oneshot::Receiver<()>>>,
    /// Row that appears right after the next `list_policies` answers.
    late_row: Mutex<Option<ImplementedPolicy>>,
}

impl MemoryStore {
    pub fn with_cluster(self, cluster: Cluster) -> Self {
        self.clusters.lock().expect("lock").push(cluster);
        self
    }

    pub fn with_template(self, template: PolicyTemplate) -> Self {
        self.templates.lock().expect("lock").push(template);
        self
    }

    pub fn with_policy(self, policy: ImplementedPolicy) -> Self {
        self.policies.lock().expect("lock").push(policy);
        self
    }

    /// Hold the next policy insert until the returned sender fires.
    pub fn gate_policy_insert(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.insert_gate.lock().expect("lock") = Some(rx);
        tx
    }

    /// Simulate a concurrent deploy whose ledger write lands just after
    /// the next listing.
    pub fn record_after_first_list(&self, policy: ImplementedPolicy) {
        *self.late_row.lock().expect("lock") = Some(policy);
    }

    pub fn policies(&self) -> Vec<ImplementedPolicy> {
        self.policies.lock().expect("lock").clone()
    }

    pub fn cluster_count(&self) -> usize {
        self.clusters.lock().expect("lock").len()
    }
}

impl ClusterStore for MemoryStore {
    async fn master_ip_exists(&self, master_ip: &str) -> Result<bool, StoreError> {
        Ok(self
            .clusters
            .lock()
            .expect("lock")
            .iter()
            .any(|c| c.master_ip == master_ip))
    }

    async fn insert_cluster(&self, cluster: &Cluster) -> Result<(), StoreError> {
        if self.lose_insert_race.load(Ordering::SeqCst) {
            return Err(StoreError::Conflict("UNIQUE constraint failed".to_string()));
        }
        self.clusters.lock().expect("lock").push(cluster.clone());
        Ok(())
    }

    async fn get_cluster(&self, id: &str) -> Result<Option<Cluster>, StoreError> {
        Ok(self
            .clusters
            .lock()
            .expect("lock")
            .iter()
            .find(|c| c.id == id)
            .cloned())
    }

    async fn list_clusters(&self) -> Result<Vec<Cluster>, StoreError> {
        Ok(self.clusters.lock().expect("lock").clone())
    }
}

impl TemplateCatalog for MemoryStore {
    async fn insert_template(&self, template: &PolicyTemplate) -> Result<(), StoreError> {
        self.templates.lock().expect("lock").push(template.clone());
        Ok(())
    }

    async fn get_template(&self, id: &str) -> Result<Option<PolicyTemplate>, StoreError> {
        Ok(self
            .templates
            .lock()
            .expect("lock")
            .iter()
            .find(|t| t.id == id)
            .cloned())
    }

    async fn list_templates(&self) -> Result<Vec<PolicyTemplate>, StoreError> {
        Ok(self.templates.lock().expect("lock").clone())
    }
}

impl PolicyLedger for MemoryStore {
    async fn insert_policy(&self, policy: &ImplementedPolicy) -> Result<(), StoreError> {
        let gate = self.insert_gate.lock().expect("lock").take();
        if let Some(gate) = gate {
            gate.await.expect("gate sender dropped");
        }
        if self.fail_policy_insert.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("disk I/O error".to_string()));
        }
        self.policies.lock().expect("lock").push(policy.clone());
        Ok(())
    }

    async fn get_policy(&self, id: &str) -> Result<Option<ImplementedPolicy>, StoreError> {
        Ok(self
            .policies
            .lock()
            .expect("lock")
            .iter()
            .find(|p| p.id == id)
            .cloned())
    }

    async fn delete_policy(&self, id: &str) -> Result<bool, StoreError> {
        if self.fail_policy_delete.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("database is locked".to_string()));
        }
        let mut rows = self.policies.lock().expect("lock");
        let before = rows.len();
        rows.retain(|p| p.id != id);
        Ok(rows.len() != before)
    }

    async fn list_policies(
        &self,
        cluster_id: Option<&str>,
    ) -> Result<Vec<ImplementedPolicy>, StoreError> {
        let mut rows = self.policies.lock().expect("lock");
        let listed = rows
            .iter()
            .filter(|p| cluster_id.is_none_or(|id| p.cluster_id == id))
            .cloned()
            .collect();
        if let Some(late) = self.late_row.lock().expect("lock").take() {
            rows.push(late);
        }
        Ok(listed)
    }
}

impl HostInventory for MemoryStore {
    async fn add_host(&self, host: &HostRecord) -> Result<(), StoreError> {
        self.hosts.lock().expect("lock").push(host.clone());
        Ok(())
    }

    async fn list_hosts(&self) -> Result<Vec<HostRecord>, StoreError> {
        Ok(self.hosts.lock().expect("lock").clone())
    }
}

// ── Agent ─────────────────────────────────────────────────────────────────────

pub struct FakeAgent {
    dir: TempDir,
    /// Reported age per manifest; anything absent is brand new.
    ages: Mutex<HashMap<String, u64>>,
    calls: Mutex<Vec<String>>,
    health: Mutex<HealthResponse>,
    /// Returned (once) instead of handling the next request.
    next_error: Mutex<Option<GatewayError>>,
}

impl Default for FakeAgent {
    fn default() -> Self {
        Self {
            dir: tempfile::tempdir().expect("tempdir"),
            ages: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            health: Mutex::new(health("prod-eu", 3)),
            next_error: Mutex::new(None),
        }
    }
}

pub fn health(cluster_name: &str, healthy_nodes: u32) -> HealthResponse {
    HealthResponse {
        k8s: K8sHealth {
            cluster_name: cluster_name.to_string(),
            kubernetes_status: healthy_nodes > 0,
            healthy_nodes,
        },
        system: SystemHealth {
            status: true,
            message: "kwarden agent is running".to_string(),
        },
    }
}

pub fn rejected(status: u16) -> GatewayError {
    GatewayError::Rejected {
        url: "http://fake".to_string(),
        status,
        body: r#"{"error":"apply failed","kind":"apply_failed"}"#.to_string(),
    }
}

pub fn timed_out() -> GatewayError {
    GatewayError::Timeout {
        url: "http://fake".to_string(),
        secs: 30,
    }
}

pub fn worker(name: &str, internal_ip: &str) -> WorkerNodeInfo {
    WorkerNodeInfo {
        name: name.to_string(),
        hostname: format!("{name}.internal"),
        internal_ip: internal_ip.to_string(),
        external_ip: String::new(),
    }
}

pub fn unreachable() -> GatewayError {
    GatewayError::Unreachable {
        url: "http://fake".to_string(),
        message: "connection refused".to_string(),
    }
}

fn ok<T: Serialize>(value: &T) -> AgentResponse {
    AgentResponse {
        status: 200,
        body: serde_json::to_vec(value).expect("serialize"),
        headers: Vec::new(),
    }
}

impl FakeAgent {
    pub fn with_health(self, health: HealthResponse) -> Self {
        *self.health.lock().expect("lock") = health;
        self
    }

    pub fn fail_next(&self, err: GatewayError) {
        *self.next_error.lock().expect("lock") = Some(err);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("lock").clone()
    }

    /// Manifest file names currently "applied".
    pub fn applied(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(self.dir.path())
            .expect("read dir")
            .map(|e| e.expect("entry").file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    fn applied_manifests(&self) -> Vec<AppliedManifest> {
        let ages = self.ages.lock().expect("lock");
        self.applied()
            .into_iter()
            .map(|name| {
                let age = ages.get(&name).copied().unwrap_or(0);
                AppliedManifest::new(name, age)
            })
            .collect()
    }

    /// Drop an hour-old manifest onto the agent behind the manager's back.
    pub fn plant(&self, name: &str) {
        self.plant_aged(name, 3600);
    }

    pub fn plant_aged(&self, name: &str, age_secs: u64) {
        std::fs::write(self.dir.path().join(name), "kind: NetworkPolicy").expect("write");
        self.ages.lock().expect("lock").insert(name.to_string(), age_secs);
    }

    fn record(&self, method: &str, url: &str) -> Result<String, GatewayError> {
        self.calls.lock().expect("lock").push(format!("{method} {url}"));
        if let Some(err) = self.next_error.lock().expect("lock").take() {
            return Err(err);
        }
        let path = url
            .splitn(4, '/')
            .nth(3)
            .map(|p| format!("/{p}"))
            .unwrap_or_default();
        Ok(path)
    }
}

impl AgentGateway for FakeAgent {
    async fn get(&self, url: &str, _: &[(&str, &str)]) -> Result<AgentResponse, GatewayError> {
        let path = self.record("GET", url)?;
        if path == paths::HEALTH_GET {
            return Ok(ok(&*self.health.lock().expect("lock")));
        }
        if path == paths::APPLIED_POLICIES {
            return Ok(ok(&AppliedPolicies {
                policies: self.applied_manifests(),
            }));
        }
        if path == paths::NAMESPACES_ALL {
            return Ok(ok(&["default", "shop"]));
        }
        if path == paths::WORKER_NODES {
            return Ok(ok(&[worker("worker-1", "10.1.0.11"), worker("worker-2", "10.1.0.12")]));
        }
        if path == paths::COUNT_PODS {
            return Ok(ok(&RunningPods { running_pods: 7 }));
        }
        if let Some(name) = path.strip_prefix("/api/policies/delete/") {
            let file = self.dir.path().join(name);
            if !file.exists() {
                return Err(rejected(404));
            }
            std::fs::remove_file(file).expect("remove");
            return Ok(ok(&DeletePolicyResponse {
                deleted: name.to_string(),
                output: "networkpolicy deleted".to_string(),
            }));
        }
        if let Some(rest) = path.strip_prefix("/api/kubernetes/namespaces/") {
            let namespace = rest.trim_end_matches("/resources");
            let resources = NamespaceResources {
                pods: vec![PodInfo {
                    name: format!("{namespace}-pod"),
                    phase: "Running".to_string(),
                    containers: Vec::new(),
                }],
                ..NamespaceResources::default()
            };
            return Ok(ok(&resources));
        }
        Err(rejected(404))
    }

    async fn post(
        &self,
        url: &str,
        body: &serde_json::Value,
        _: &[(&str, &str)],
    ) -> Result<AgentResponse, GatewayError> {
        let path = self.record("POST", url)?;
        if path != paths::DEPLOY_POLICY {
            return Err(rejected(404));
        }
        let req: DeployPolicyRequest = serde_json::from_value(body.clone()).expect("deploy body");
        let name = format!("{}.yaml", uuid::Uuid::new_v4());
        let manifest = format!(
            "# from {}\nnamespace: {}\napp: {}\n",
            req.path, req.namespace, req.app_label
        );
        std::fs::write(self.dir.path().join(&name), manifest).expect("write manifest");
        Ok(ok(&DeployPolicyResponse { policy_path: name }))
    }
}

// ── Fixtures ──────────────────────────────────────────────────────────────────

pub fn cluster(id: &str) -> Cluster {
    Cluster {
        id: id.to_string(),
        cluster_name: format!("cluster-{id}"),
        master_ip: format!("10.0.0.{}", id.len()),
        agent_port: 8990,
        description: String::new(),
        audit: Audit::created("ops", Utc::now()),
    }
}

pub fn template(id: &str) -> PolicyTemplate {
    PolicyTemplate {
        id: id.to_string(),
        title: "deny all".to_string(),
        description: "block all ingress".to_string(),
        policy_type: "NetworkPolicy".to_string(),
        template_file_path: "deny-all.yaml".to_string(),
    }
}

pub fn policy(id: &str, cluster_id: &str, file: &str) -> ImplementedPolicy {
    ImplementedPolicy {
        id: id.to_string(),
        cluster_id: cluster_id.to_string(),
        title: "deny all".to_string(),
        description: String::new(),
        app_label: "web".to_string(),
        namespace: "shop".to_string(),
        policy_file_path: file.to_string(),
        audit: Audit::created("ops", Utc::now()),
    }
}
