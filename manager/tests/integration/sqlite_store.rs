//! `SqliteStore` against a database file on disk.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use chrono::{TimeZone, Utc};
use kwarden_manager::application::ports::{ClusterStore, HostInventory, PolicyLedger, TemplateCatalog};
use kwarden_manager::domain::{
    Audit, Cluster, HostRecord, ImplementedPolicy, PolicyTemplate, StoreError,
};
use kwarden_manager::infra::store::SqliteStore;

fn cluster() -> Cluster {
    Cluster {
        id: "c1".to_string(),
        cluster_name: "prod-eu".to_string(),
        master_ip: "10.1.0.5".to_string(),
        agent_port: 8990,
        description: "eu production".to_string(),
        audit: Audit::created("ops", Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()),
    }
}

fn policy(id: &str) -> ImplementedPolicy {
    ImplementedPolicy {
        id: id.to_string(),
        cluster_id: "c1".to_string(),
        title: "deny all".to_string(),
        description: String::new(),
        app_label: "web".to_string(),
        namespace: "shop".to_string(),
        policy_file_path: format!("{id}.yaml"),
        audit: Audit::created("ops", Utc.with_ymd_and_hms(2026, 3, 2, 8, 30, 0).unwrap()),
    }
}

#[tokio::test]
async fn records_survive_reopen() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("nested").join("kwarden.db");

    {
        let store = SqliteStore::open(&path).expect("open");
        store.insert_cluster(&cluster()).await.expect("cluster");
        store
            .insert_template(&PolicyTemplate {
                id: "t1".to_string(),
                title: "deny all".to_string(),
                description: String::new(),
                policy_type: "NetworkPolicy".to_string(),
                template_file_path: "deny-all.yaml".to_string(),
            })
            .await
            .expect("template");
        store.insert_policy(&policy("p1")).await.expect("policy");
        store
            .add_host(&HostRecord::new("10.1.0.7", "worker-1"))
            .await
            .expect("host");
    }

    let store = SqliteStore::open(&path).expect("reopen");
    assert_eq!(store.get_cluster("c1").await.expect("get"), Some(cluster()));
    assert!(store.master_ip_exists("10.1.0.5").await.expect("exists"));
    assert_eq!(store.list_templates().await.expect("templates").len(), 1);
    assert_eq!(store.get_policy("p1").await.expect("policy"), Some(policy("p1")));
    assert_eq!(
        store.list_hosts().await.expect("hosts"),
        vec![HostRecord::new("10.1.0.7", "worker-1")]
    );
}

#[tokio::test]
async fn duplicate_host_is_a_conflict() {
    let store = SqliteStore::open_in_memory().expect("open");
    let host = HostRecord::new("10.1.0.7", "worker-1");
    store.add_host(&host).await.expect("first");

    let err = store.add_host(&host).await.expect_err("duplicate");

    assert!(matches!(err, StoreError::Conflict(_)));
}

#[tokio::test]
async fn policies_are_listed_per_cluster_and_deleted_once() {
    let store = SqliteStore::open_in_memory().expect("open");
    store.insert_cluster(&cluster()).await.expect("cluster");
    store.insert_policy(&policy("p1")).await.expect("p1");
    store.insert_policy(&policy("p2")).await.expect("p2");

    assert_eq!(store.list_policies(Some("c1")).await.expect("list").len(), 2);
    assert!(store.list_policies(Some("other")).await.expect("list").is_empty());

    assert!(store.delete_policy("p1").await.expect("delete"));
    assert!(!store.delete_policy("p1").await.expect("delete again"));
    assert_eq!(store.list_policies(None).await.expect("list").len(), 1);
}
