//! Application service: register clusters by probing their agent.

use chrono::Utc;
use kwarden_common::{HealthResponse, agent_url, paths};
use uuid::Uuid;

use crate::application::ports::{AgentGateway, ClusterStore, ProgressReporter};
use crate::domain::{Audit, Cluster, NewCluster, RegistryError, StoreError};

/// # Errors
///
/// Returns `Persistence` if the store cannot be queried.
pub async fn check_master_ip_exists(
    store: &impl ClusterStore,
    master_ip: &str,
) -> Result<bool, RegistryError> {
    Ok(store.master_ip_exists(master_ip.trim()).await?)
}

/// Register the cluster whose agent listens at `new.master_ip:new.agent_port`.
///
/// The agent is asked for its health and the cluster takes the name it
/// reports. An agent that answers but sees no healthy nodes is still
/// registered; the condition is logged and reported as a warning.
///
/// # Errors
///
/// - `InvalidRegistration` for an empty ip or out-of-range port.
/// - `AlreadyRegistered` when the ip is known; the agent is not contacted.
///   A concurrent registration that wins the insert race also yields this.
/// - `AgentUnreachable` / `InvalidAgentResponse` when the probe fails.
pub async fn add_new_cluster(
    gateway: &impl AgentGateway,
    store: &impl ClusterStore,
    reporter: &impl ProgressReporter,
    operator: &str,
    new: &NewCluster,
) -> Result<Cluster, RegistryError> {
    let (master_ip, agent_port) = new.validate()?;

    if store.master_ip_exists(master_ip).await? {
        return Err(RegistryError::AlreadyRegistered(master_ip.to_string()));
    }

    reporter.step(&format!("contacting agent at {master_ip}:{agent_port}..."));
    let resp = gateway
        .get(&agent_url(master_ip, agent_port, paths::HEALTH_GET), &[])
        .await
        .map_err(RegistryError::AgentUnreachable)?;
    let health: HealthResponse = resp
        .json()
        .map_err(|e| RegistryError::InvalidAgentResponse(e.to_string()))?;

    if !health.k8s.kubernetes_status {
        tracing::warn!(
            master_ip,
            cluster_name = %health.k8s.cluster_name,
            "agent reports no healthy kubernetes nodes",
        );
        reporter.warn(&format!(
            "agent reports no healthy nodes in '{}'",
            health.k8s.cluster_name
        ));
    }

    let cluster = Cluster {
        id: Uuid::new_v4().to_string(),
        cluster_name: health.k8s.cluster_name,
        master_ip: master_ip.to_string(),
        agent_port,
        description: new.description.clone(),
        audit: Audit::created(operator, Utc::now()),
    };

    match store.insert_cluster(&cluster).await {
        Ok(()) => {}
        Err(StoreError::Conflict(_)) => {
            return Err(RegistryError::AlreadyRegistered(cluster.master_ip));
        }
        Err(e) => return Err(e.into()),
    }

    tracing::info!(
        cluster_id = %cluster.id,
        cluster_name = %cluster.cluster_name,
        master_ip = %cluster.master_ip,
        "cluster registered",
    );
    reporter.success(&format!(
        "registered '{}' as {}",
        cluster.cluster_name, cluster.id
    ));
    Ok(cluster)
}

/// # Errors
///
/// Returns `Persistence` if the store cannot be read.
pub async fn list_clusters(store: &impl ClusterStore) -> Result<Vec<Cluster>, RegistryError> {
    Ok(store.list_clusters().await?)
}

/// # Errors
///
/// Returns `NotFound` for an unknown id, `Persistence` if the store fails.
pub async fn get_cluster(store: &impl ClusterStore, id: &str) -> Result<Cluster, RegistryError> {
    store
        .get_cluster(id)
        .await?
        .ok_or_else(|| RegistryError::NotFound(id.to_string()))
}
