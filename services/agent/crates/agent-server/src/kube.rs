//! Read-only cluster queries, answered from `kubectl ... -o json`.
//!
//! Parsing is kept in pure functions over the kubectl JSON so it can be
//! tested without a cluster.

use std::collections::HashMap;
use std::sync::Arc;

use kwarden_common::{
    ContainerInfo, DaemonSetInfo, DeploymentInfo, HealthResponse, K8sHealth, NamespaceResources,
    PodInfo, ServiceInfo, StatefulSetInfo, SystemHealth, WorkerNodeInfo,
};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::runner::{CommandRunner, combined_output};

#[derive(Debug, Error)]
pub enum KubeError {
    #[error("kubectl {command} failed: {output}")]
    CommandFailed { command: String, output: String },

    #[error("unexpected kubectl output for {command}: {source}")]
    Parse {
        command: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to run kubectl: {0:#}")]
    Spawn(anyhow::Error),
}

// ── kubectl JSON shapes (only the fields we read) ─────────────────────────────

#[derive(Debug, Deserialize)]
struct List<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
}

#[derive(Debug, Default, Deserialize)]
struct Meta {
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind")]
enum Workload {
    Pod(Pod),
    Deployment(ReplicatedSet),
    Service(Service),
    StatefulSet(ReplicatedSet),
    DaemonSet(DaemonSet),
    #[serde(other)]
    Other,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Named {
    metadata: Meta,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Pod {
    metadata: Meta,
    spec: PodSpec,
    status: PodStatus,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PodSpec {
    containers: Vec<Container>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Container {
    name: String,
    image: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct PodStatus {
    phase: String,
    container_statuses: Vec<ContainerStatus>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ContainerStatus {
    name: String,
    state: ContainerState,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ContainerState {
    running: Option<serde_json::Value>,
    waiting: Option<StateReason>,
    terminated: Option<StateReason>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct StateReason {
    reason: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ReplicatedSet {
    metadata: Meta,
    spec: ReplicaSpec,
    status: ReplicaStatus,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ReplicaSpec {
    /// Kubernetes defaults an unset replica count to 1.
    replicas: Option<i32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ReplicaStatus {
    available_replicas: i32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Service {
    metadata: Meta,
    spec: ServiceSpec,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ServiceSpec {
    #[serde(rename = "type")]
    service_type: String,
    #[serde(rename = "clusterIP")]
    cluster_ip: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DaemonSet {
    metadata: Meta,
    status: DaemonSetStatus,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct DaemonSetStatus {
    desired_number_scheduled: i32,
    number_ready: i32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Node {
    metadata: NodeMeta,
    status: NodeStatus,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct NodeMeta {
    name: String,
    labels: HashMap<String, String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct NodeStatus {
    conditions: Vec<NodeCondition>,
    addresses: Vec<NodeAddress>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct NodeAddress {
    #[serde(rename = "type")]
    kind: String,
    address: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct NodeCondition {
    #[serde(rename = "type")]
    kind: String,
    status: String,
}

// ── Pure parsers ──────────────────────────────────────────────────────────────

fn parse<T: DeserializeOwned>(command: &str, raw: &[u8]) -> Result<T, KubeError> {
    serde_json::from_slice(raw).map_err(|e| KubeError::Parse {
        command: command.to_string(),
        source: e,
    })
}

fn parse_namespaces(raw: &[u8]) -> Result<Vec<String>, KubeError> {
    let list: List<Named> = parse("get namespaces", raw)?;
    Ok(list.items.into_iter().map(|ns| ns.metadata.name).collect())
}

fn container_status(state: &ContainerState) -> String {
    if state.running.is_some() {
        "Running".to_string()
    } else if let Some(w) = &state.waiting {
        format!("Waiting ({})", w.reason)
    } else if let Some(t) = &state.terminated {
        format!("Terminated ({})", t.reason)
    } else {
        "Unknown".to_string()
    }
}

fn pod_info(pod: Pod) -> PodInfo {
    let statuses: HashMap<&str, &ContainerState> = pod
        .status
        .container_statuses
        .iter()
        .map(|s| (s.name.as_str(), &s.state))
        .collect();
    let containers = pod
        .spec
        .containers
        .iter()
        .map(|c| ContainerInfo {
            name: c.name.clone(),
            image: c.image.clone(),
            status: statuses
                .get(c.name.as_str())
                .map_or_else(|| "Unknown".to_string(), |s| container_status(s)),
        })
        .collect();
    PodInfo {
        name: pod.metadata.name,
        phase: pod.status.phase,
        containers,
    }
}

fn parse_resources(raw: &[u8]) -> Result<NamespaceResources, KubeError> {
    let list: List<Workload> = parse("get workloads", raw)?;
    let mut resources = NamespaceResources::default();
    for item in list.items {
        match item {
            Workload::Pod(pod) => resources.pods.push(pod_info(pod)),
            Workload::Deployment(d) => resources.deployments.push(DeploymentInfo {
                name: d.metadata.name,
                replicas: d.spec.replicas.unwrap_or(1),
                available_replicas: d.status.available_replicas,
            }),
            Workload::Service(s) => resources.services.push(ServiceInfo {
                name: s.metadata.name,
                service_type: s.spec.service_type,
                cluster_ip: s.spec.cluster_ip,
            }),
            Workload::StatefulSet(s) => resources.stateful_sets.push(StatefulSetInfo {
                name: s.metadata.name,
                replicas: s.spec.replicas.unwrap_or(1),
                available_replicas: s.status.available_replicas,
            }),
            Workload::DaemonSet(d) => resources.daemon_sets.push(DaemonSetInfo {
                name: d.metadata.name,
                desired_number_scheduled: d.status.desired_number_scheduled,
                number_ready: d.status.number_ready,
            }),
            Workload::Other => {}
        }
    }
    Ok(resources)
}

fn count_running(raw: &[u8]) -> Result<u64, KubeError> {
    let list: List<Pod> = parse("get pods", raw)?;
    Ok(list
        .items
        .iter()
        .filter(|p| p.status.phase == "Running")
        .count() as u64)
}

fn count_ready_nodes(raw: &[u8]) -> Result<u32, KubeError> {
    let list: List<Node> = parse("get nodes", raw)?;
    let ready = list
        .items
        .iter()
        .filter(|n| {
            n.status
                .conditions
                .iter()
                .any(|c| c.kind == "Ready" && c.status == "True")
        })
        .count();
    Ok(u32::try_from(ready).unwrap_or(u32::MAX))
}

/// Labels that mark a control-plane node; both spellings are still in use.
const CONTROL_PLANE_LABELS: [&str; 2] = [
    "node-role.kubernetes.io/control-plane",
    "node-role.kubernetes.io/master",
];

fn parse_worker_nodes(raw: &[u8]) -> Result<Vec<WorkerNodeInfo>, KubeError> {
    let list: List<Node> = parse("get nodes", raw)?;
    Ok(list
        .items
        .into_iter()
        .filter(|n| {
            !CONTROL_PLANE_LABELS
                .iter()
                .any(|label| n.metadata.labels.get(*label).is_some_and(String::is_empty))
        })
        .map(|n| {
            let address = |kind: &str| {
                n.status
                    .addresses
                    .iter()
                    .find(|a| a.kind == kind)
                    .map(|a| a.address.clone())
            };
            WorkerNodeInfo {
                hostname: address("Hostname").unwrap_or_else(|| n.metadata.name.clone()),
                internal_ip: address("InternalIP").unwrap_or_default(),
                external_ip: address("ExternalIP").unwrap_or_default(),
                name: n.metadata.name.clone(),
            }
        })
        .collect())
}

// ── Client ────────────────────────────────────────────────────────────────────

pub struct KubeClient<R> {
    runner: Arc<R>,
    kubectl: String,
}

impl<R: CommandRunner> KubeClient<R> {
    pub fn new(runner: Arc<R>, kubectl: impl Into<String>) -> Self {
        Self {
            runner,
            kubectl: kubectl.into(),
        }
    }

    async fn get_json(&self, args: &[&str]) -> Result<Vec<u8>, KubeError> {
        let out = self
            .runner
            .run(&self.kubectl, args)
            .await
            .map_err(KubeError::Spawn)?;
        if !out.status.success() {
            return Err(KubeError::CommandFailed {
                command: args.join(" "),
                output: combined_output(&out),
            });
        }
        Ok(out.stdout)
    }

    pub async fn namespaces(&self) -> Result<Vec<String>, KubeError> {
        let raw = self.get_json(&["get", "namespaces", "-o", "json"]).await?;
        parse_namespaces(&raw)
    }

    pub async fn namespace_resources(&self, namespace: &str) -> Result<NamespaceResources, KubeError> {
        let raw = self
            .get_json(&[
                "get",
                "pods,deployments,services,statefulsets,daemonsets",
                "-n",
                namespace,
                "-o",
                "json",
            ])
            .await?;
        parse_resources(&raw)
    }

    pub async fn running_pods(&self) -> Result<u64, KubeError> {
        let raw = self
            .get_json(&[
                "get",
                "pods",
                "--all-namespaces",
                "--field-selector=status.phase=Running",
                "-o",
                "json",
            ])
            .await?;
        count_running(&raw)
    }

    pub async fn worker_nodes(&self) -> Result<Vec<WorkerNodeInfo>, KubeError> {
        let raw = self.get_json(&["get", "nodes", "-o", "json"]).await?;
        parse_worker_nodes(&raw)
    }

    async fn cluster_name(&self) -> String {
        match self
            .get_json(&["config", "view", "--minify", "-o", "jsonpath={.clusters[0].name}"])
            .await
        {
            Ok(raw) => {
                let name = String::from_utf8_lossy(&raw).trim().to_string();
                if name.is_empty() { "unknown".to_string() } else { name }
            }
            Err(e) => {
                tracing::warn!(error = %e, "cannot determine cluster name");
                "unknown".to_string()
            }
        }
    }

    /// Agent health. A cluster that cannot be queried is reported as
    /// unhealthy rather than failing the request: the agent itself is up.
    pub async fn health(&self) -> HealthResponse {
        let cluster_name = self.cluster_name().await;
        let nodes = match self.get_json(&["get", "nodes", "-o", "json"]).await {
            Ok(raw) => count_ready_nodes(&raw),
            Err(e) => Err(e),
        };
        match nodes {
            Ok(healthy_nodes) => HealthResponse {
                k8s: K8sHealth {
                    cluster_name,
                    kubernetes_status: healthy_nodes > 0,
                    healthy_nodes,
                },
                system: SystemHealth {
                    status: true,
                    message: "kwarden agent is running".to_string(),
                },
            },
            Err(e) => {
                tracing::warn!(error = %e, "kubernetes API not reachable");
                HealthResponse {
                    k8s: K8sHealth {
                        cluster_name,
                        kubernetes_status: false,
                        healthy_nodes: 0,
                    },
                    system: SystemHealth {
                        status: true,
                        message: format!("kwarden agent is running; kubernetes unreachable: {e}"),
                    },
                }
            }
        }
    }
}
