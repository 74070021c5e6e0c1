//! Application service: read-only views of a registered cluster, proxied
//! through its agent.

use std::collections::HashSet;

use kwarden_common::{
    NamespaceResources, RunningPods, WorkerNodeInfo, namespace_resources_path, paths,
};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::application::ports::{AgentGateway, ClusterStore, HostInventory, PolicyLedger};
use crate::application::services::cluster_registry::get_cluster;
use crate::domain::{Cluster, HostRecord, RegistryError};

/// Resources of one namespace, as part of a whole-cluster snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct NamespaceSnapshot {
    pub namespace: String,
    pub resources: NamespaceResources,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClusterStats {
    pub cluster_id: String,
    pub cluster_name: String,
    pub running_pods: u64,
    pub implemented_policies: usize,
}

async fn fetch<T: DeserializeOwned>(
    gateway: &impl AgentGateway,
    cluster: &Cluster,
    path: &str,
) -> Result<T, RegistryError> {
    let resp = gateway
        .get(&cluster.agent_url(path), &[])
        .await
        .map_err(RegistryError::AgentUnreachable)?;
    resp.json()
        .map_err(|e| RegistryError::InvalidAgentResponse(e.to_string()))
}

/// # Errors
///
/// `NotFound` for an unknown cluster, or the agent call's failure.
pub async fn namespaces(
    gateway: &impl AgentGateway,
    store: &impl ClusterStore,
    cluster_id: &str,
) -> Result<Vec<String>, RegistryError> {
    let cluster = get_cluster(store, cluster_id).await?;
    fetch(gateway, &cluster, paths::NAMESPACES_ALL).await
}

/// # Errors
///
/// `NotFound` for an unknown cluster, or the agent call's failure.
pub async fn namespace_resources(
    gateway: &impl AgentGateway,
    store: &impl ClusterStore,
    cluster_id: &str,
    namespace: &str,
) -> Result<NamespaceResources, RegistryError> {
    let cluster = get_cluster(store, cluster_id).await?;
    fetch(gateway, &cluster, &namespace_resources_path(namespace)).await
}

/// Every namespace with its resources, in the agent's namespace order.
///
/// # Errors
///
/// Fails on the first agent call that fails.
pub async fn all_resources(
    gateway: &impl AgentGateway,
    store: &impl ClusterStore,
    cluster_id: &str,
) -> Result<Vec<NamespaceSnapshot>, RegistryError> {
    let cluster = get_cluster(store, cluster_id).await?;
    let names: Vec<String> = fetch(gateway, &cluster, paths::NAMESPACES_ALL).await?;

    let mut snapshots = Vec::with_capacity(names.len());
    for namespace in names {
        let resources = fetch(gateway, &cluster, &namespace_resources_path(&namespace)).await?;
        snapshots.push(NamespaceSnapshot {
            namespace,
            resources,
        });
    }
    Ok(snapshots)
}

/// # Errors
///
/// `NotFound` for an unknown cluster, or the agent call's failure.
pub async fn running_pods(
    gateway: &impl AgentGateway,
    store: &impl ClusterStore,
    cluster_id: &str,
) -> Result<u64, RegistryError> {
    let cluster = get_cluster(store, cluster_id).await?;
    let RunningPods { running_pods } = fetch(gateway, &cluster, paths::COUNT_PODS).await?;
    Ok(running_pods)
}

/// Worker nodes of the cluster; control-plane nodes are filtered out by the
/// agent.
///
/// # Errors
///
/// `NotFound` for an unknown cluster, or the agent call's failure.
pub async fn nodes(
    gateway: &impl AgentGateway,
    store: &impl ClusterStore,
    cluster_id: &str,
) -> Result<Vec<WorkerNodeInfo>, RegistryError> {
    let cluster = get_cluster(store, cluster_id).await?;
    fetch(gateway, &cluster, paths::WORKER_NODES).await
}

/// Add every worker node's internal address to the host inventory, keyed
/// by its hostname. Nodes without an internal address and addresses already
/// in the inventory are skipped. Returns the hosts that were added.
///
/// # Errors
///
/// `NotFound` for an unknown cluster, the agent call's failure, or
/// `Persistence` when the inventory cannot be read or written.
pub async fn import_worker_hosts(
    gateway: &impl AgentGateway,
    store: &(impl ClusterStore + HostInventory),
    cluster_id: &str,
) -> Result<Vec<HostRecord>, RegistryError> {
    let workers = nodes(gateway, store, cluster_id).await?;
    let mut known: HashSet<String> = store
        .list_hosts()
        .await?
        .into_iter()
        .map(|h| h.ip_address)
        .collect();

    let mut added = Vec::new();
    for node in workers {
        if node.internal_ip.is_empty() || !known.insert(node.internal_ip.clone()) {
            continue;
        }
        let host = HostRecord::new(node.internal_ip, node.hostname);
        store.add_host(&host).await?;
        added.push(host);
    }
    tracing::info!(cluster_id, added = added.len(), "imported worker nodes");
    Ok(added)
}

/// Running pods plus the number of policies recorded for the cluster.
///
/// # Errors
///
/// `NotFound` for an unknown cluster, the agent call's failure, or
/// `Persistence` when the ledger cannot be read.
pub async fn stats(
    gateway: &impl AgentGateway,
    store: &(impl ClusterStore + PolicyLedger),
    cluster_id: &str,
) -> Result<ClusterStats, RegistryError> {
    let cluster = get_cluster(store, cluster_id).await?;
    let RunningPods { running_pods } = fetch(gateway, &cluster, paths::COUNT_PODS).await?;
    let implemented_policies = store.list_policies(Some(&cluster.id)).await?.len();
    Ok(ClusterStats {
        cluster_id: cluster.id,
        cluster_name: cluster.cluster_name,
        running_pods,
        implemented_policies,
    })
}
