//! Read-only cluster queries proxied through the agent.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use kwarden_manager::application::ports::HostInventory;
use kwarden_manager::application::services::cluster_info;
use kwarden_manager::domain::{HostRecord, RegistryError};

use crate::fakes::{FakeAgent, MemoryStore, cluster, policy, rejected};

fn store() -> MemoryStore {
    MemoryStore::default()
        .with_cluster(cluster("c1"))
        .with_policy(policy("p1", "c1", "a.yaml"))
        .with_policy(policy("p2", "c1", "b.yaml"))
        .with_policy(policy("p3", "c2", "c.yaml"))
}

#[tokio::test]
async fn namespaces_come_from_the_agent() {
    let names = cluster_info::namespaces(&FakeAgent::default(), &store(), "c1")
        .await
        .expect("namespaces");
    assert_eq!(names, ["default", "shop"]);
}

#[tokio::test]
async fn namespace_resources_targets_the_named_namespace() {
    let agent = FakeAgent::default();
    let resources = cluster_info::namespace_resources(&agent, &store(), "c1", "shop")
        .await
        .expect("resources");

    assert_eq!(resources.pods[0].name, "shop-pod");
    assert!(agent.calls()[0].ends_with("/api/kubernetes/namespaces/shop/resources"));
}

#[tokio::test]
async fn all_resources_keeps_namespace_order() {
    let snapshots = cluster_info::all_resources(&FakeAgent::default(), &store(), "c1")
        .await
        .expect("all resources");

    let names: Vec<&str> = snapshots.iter().map(|s| s.namespace.as_str()).collect();
    assert_eq!(names, ["default", "shop"]);
    assert_eq!(snapshots[1].resources.pods[0].name, "shop-pod");
}

#[tokio::test]
async fn nodes_come_from_the_worker_route() {
    let agent = FakeAgent::default();
    let nodes = cluster_info::nodes(&agent, &store(), "c1").await.expect("nodes");

    let names: Vec<&str> = nodes.iter().map(|n| n.name.as_str()).collect();
    assert_eq!(names, ["worker-1", "worker-2"]);
    assert!(agent.calls()[0].ends_with("/api/kubernetes/workers/nodes/all"));
}

#[tokio::test]
async fn import_adds_worker_nodes_once() {
    let agent = FakeAgent::default();
    let store = store();
    store
        .add_host(&HostRecord::new("10.1.0.11", "worker-1.internal"))
        .await
        .expect("seed");

    let added = cluster_info::import_worker_hosts(&agent, &store, "c1")
        .await
        .expect("import");
    assert_eq!(added, [HostRecord::new("10.1.0.12", "worker-2.internal")]);

    let again = cluster_info::import_worker_hosts(&agent, &store, "c1")
        .await
        .expect("import again");
    assert!(again.is_empty());
    assert_eq!(store.list_hosts().await.expect("hosts").len(), 2);
}

#[tokio::test]
async fn stats_counts_only_this_clusters_policies() {
    let stats = cluster_info::stats(&FakeAgent::default(), &store(), "c1")
        .await
        .expect("stats");

    assert_eq!(stats.cluster_id, "c1");
    assert_eq!(stats.running_pods, 7);
    assert_eq!(stats.implemented_policies, 2);
}

#[tokio::test]
async fn agent_failure_surfaces_as_unreachable() {
    let agent = FakeAgent::default();
    agent.fail_next(rejected(502));

    let err = cluster_info::running_pods(&agent, &store(), "c1").await.unwrap_err();

    assert!(matches!(err, RegistryError::AgentUnreachable(_)));
}

#[tokio::test]
async fn unknown_cluster_is_not_found() {
    let agent = FakeAgent::default();
    let err = cluster_info::namespaces(&agent, &store(), "zz").await.unwrap_err();

    assert!(matches!(err, RegistryError::NotFound(_)));
    assert!(agent.calls().is_empty());
}
