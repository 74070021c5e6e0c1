use serde::{Deserialize, Serialize};

/// Kubernetes half of the agent health payload
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct K8sHealth {
    pub cluster_name: String,
    /// True when at least one node reports `Ready=True`.
    pub kubernetes_status: bool,
    pub healthy_nodes: u32,
}

/// Agent process half of the health payload
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SystemHealth {
    pub status: bool,
    pub message: String,
}

/// Body of `GET /api/health/get`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthResponse {
    pub k8s: K8sHealth,
    pub system: SystemHealth,
}

/// Snapshot of workloads running in one namespace
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct NamespaceResources {
    pub pods: Vec<PodInfo>,
    pub deployments: Vec<DeploymentInfo>,
    pub services: Vec<ServiceInfo>,
    pub stateful_sets: Vec<StatefulSetInfo>,
    pub daemon_sets: Vec<DaemonSetInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PodInfo {
    pub name: String,
    pub phase: String,
    #[serde(default)]
    pub containers: Vec<ContainerInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContainerInfo {
    pub name: String,
    pub image: String,
    /// `Running`, `Waiting (<reason>)`, `Terminated (<reason>)` or `Unknown`.
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeploymentInfo {
    pub name: String,
    pub replicas: i32,
    pub available_replicas: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServiceInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub service_type: String,
    pub cluster_ip: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatefulSetInfo {
    pub name: String,
    pub replicas: i32,
    pub available_replicas: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DaemonSetInfo {
    pub name: String,
    pub desired_number_scheduled: i32,
    pub number_ready: i32,
}

/// Body of `GET /api/kubernetes/count/pods`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunningPods {
    pub running_pods: u64,
}

/// Body of `POST /api/policies/deplye/policy`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeployPolicyRequest {
    pub namespace: String,
    pub app_label: String,
    /// Template reference, relative to the agent's template directory.
    #[serde(alias = "template_file_path")]
    pub path: String,
}

/// Successful deploy: the rendered manifest's file name on the agent
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeployPolicyResponse {
    pub policy_path: String,
}

/// Successful delete
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeletePolicyResponse {
    pub deleted: String,
    /// Combined kubectl output.
    #[serde(default)]
    pub output: String,
}

/// One manifest the agent has applied.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppliedManifest {
    pub name: String,
    /// Seconds since the manifest was rendered, measured on the agent.
    /// Missing means unknown and is treated as brand new.
    #[serde(default)]
    pub age_secs: u64,
}

impl AppliedManifest {
    pub fn new(name: impl Into<String>, age_secs: u64) -> Self {
        Self {
            name: name.into(),
            age_secs,
        }
    }
}

/// Body of `GET /api/policies/applied`, sorted by name
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppliedPolicies {
    pub policies: Vec<AppliedManifest>,
}

impl AppliedPolicies {
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.policies.iter().map(|m| m.name.clone()).collect()
    }
}

/// A schedulable (non control-plane) node, from
/// `GET /api/kubernetes/workers/nodes/all`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkerNodeInfo {
    pub name: String,
    /// Falls back to `name` when the node reports no `Hostname` address.
    pub hostname: String,
    pub internal_ip: String,
    pub external_ip: String,
}

/// Error body returned by every failing agent route
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AgentErrorBody {
    pub error: String,
    /// Stable snake_case error kind, e.g. `template_not_found`.
    pub kind: String,
    /// Combined command output, for apply/delete failures.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}
