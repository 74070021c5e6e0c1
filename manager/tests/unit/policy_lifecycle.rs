//! Policy deploy/delete/reconcile against the in-memory store and fake agent.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::atomic::Ordering;

use kwarden_manager::application::services::policy_lifecycle::{
    self, DeployRequest, ReconcileMode,
};
use kwarden_manager::domain::{GatewayError, LifecycleError};

use crate::fakes::{
    FakeAgent, MemoryStore, RecordingReporter, cluster, policy, rejected, template, timed_out,
    unreachable,
};

const PRUNE_NOW: ReconcileMode = ReconcileMode::Prune { grace_secs: 0 };
const PRUNE_WITH_GRACE: ReconcileMode = ReconcileMode::Prune { grace_secs: 300 };

fn store() -> MemoryStore {
    MemoryStore::default()
        .with_cluster(cluster("c1"))
        .with_template(template("t1"))
}

fn request() -> DeployRequest {
    DeployRequest {
        cluster_id: "c1".to_string(),
        template_id: "t1".to_string(),
        namespace: "shop".to_string(),
        app_label: "web".to_string(),
    }
}

#[tokio::test]
async fn deploy_records_the_manifest_the_agent_wrote() {
    let agent = FakeAgent::default();
    let store = store();

    let deployed = policy_lifecycle::deploy(&agent, &store, &RecordingReporter::default(), "ops", &request())
        .await
        .expect("deploy");

    assert_eq!(agent.applied(), vec![deployed.policy_file_path.clone()]);
    let rows = store.policies();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, deployed.id);
    assert_eq!(rows[0].namespace, "shop");
    assert_eq!(rows[0].app_label, "web");
    assert_eq!(rows[0].title, "deny all");
    assert_eq!(rows[0].audit.created_by, "ops");
}

#[tokio::test]
async fn deploy_then_delete_leaves_nothing_behind() {
    let agent = FakeAgent::default();
    let store = store();
    let reporter = RecordingReporter::default();

    let deployed = policy_lifecycle::deploy(&agent, &store, &reporter, "ops", &request())
        .await
        .expect("deploy");
    let removed = policy_lifecycle::delete(&agent, &store, &reporter, &deployed.id)
        .await
        .expect("delete");

    assert_eq!(removed.id, deployed.id);
    assert!(store.policies().is_empty());
    assert!(agent.applied().is_empty());
}

#[tokio::test]
async fn rejected_deploy_records_nothing() {
    let agent = FakeAgent::default();
    agent.fail_next(rejected(502));
    let store = store();

    let err = policy_lifecycle::deploy(&agent, &store, &RecordingReporter::default(), "ops", &request())
        .await
        .unwrap_err();

    assert!(matches!(err, LifecycleError::AgentUnreachable(ref e) if e.status() == Some(502)));
    assert!(store.policies().is_empty());
}

#[tokio::test]
async fn unreachable_agent_records_nothing() {
    let agent = FakeAgent::default();
    agent.fail_next(unreachable());
    let store = store();

    let err = policy_lifecycle::deploy(&agent, &store, &RecordingReporter::default(), "ops", &request())
        .await
        .unwrap_err();

    assert!(matches!(err, LifecycleError::AgentUnreachable(_)));
    assert!(store.policies().is_empty());
}

#[tokio::test]
async fn deploy_to_unknown_cluster_sends_nothing() {
    let agent = FakeAgent::default();
    let store = store();
    let req = DeployRequest {
        cluster_id: "nope".to_string(),
        ..request()
    };

    let err = policy_lifecycle::deploy(&agent, &store, &RecordingReporter::default(), "ops", &req)
        .await
        .unwrap_err();

    assert!(matches!(err, LifecycleError::ClusterNotFound(id) if id == "nope"));
    assert!(agent.calls().is_empty());
}

#[tokio::test]
async fn deploy_of_unknown_template_sends_nothing() {
    let agent = FakeAgent::default();
    let store = store();
    let req = DeployRequest {
        template_id: "missing".to_string(),
        ..request()
    };

    let err = policy_lifecycle::deploy(&agent, &store, &RecordingReporter::default(), "ops", &req)
        .await
        .unwrap_err();

    assert!(matches!(err, LifecycleError::TemplateNotFound(_)));
    assert!(agent.calls().is_empty());
}

#[tokio::test]
async fn failed_ledger_insert_is_reported_as_unrecorded() {
    let agent = FakeAgent::default();
    let store = store();
    store.fail_policy_insert.store(true, Ordering::SeqCst);

    let err = policy_lifecycle::deploy(&agent, &store, &RecordingReporter::default(), "ops", &request())
        .await
        .unwrap_err();

    let LifecycleError::Unrecorded { policy_path, .. } = err else {
        panic!("expected Unrecorded");
    };
    assert_eq!(agent.applied(), vec![policy_path.clone()]);

    let report = policy_lifecycle::reconcile(&agent, &store, &RecordingReporter::default(), "c1", ReconcileMode::ReportOnly)
        .await
        .expect("reconcile");
    assert_eq!(report.unrecorded, vec![policy_path]);
}

#[tokio::test]
async fn timed_out_deploy_is_outcome_unknown() {
    let agent = FakeAgent::default();
    agent.fail_next(timed_out());
    let store = store();
    let reporter = RecordingReporter::default();

    let err = policy_lifecycle::deploy(&agent, &store, &reporter, "ops", &request())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        LifecycleError::OutcomeUnknown { ref cluster_id, source: GatewayError::Timeout { .. } }
            if cluster_id == "c1"
    ));
    assert!(store.policies().is_empty());
    let warnings = reporter.warnings();
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].contains("kwarden policy reconcile --cluster c1"));
}

#[tokio::test]
async fn timed_out_delete_is_outcome_unknown_and_keeps_the_row() {
    let agent = FakeAgent::default();
    let store = store();
    let reporter = RecordingReporter::default();
    let deployed = policy_lifecycle::deploy(&agent, &store, &reporter, "ops", &request())
        .await
        .expect("deploy");

    agent.fail_next(timed_out());
    let err = policy_lifecycle::delete(&agent, &store, &reporter, &deployed.id)
        .await
        .unwrap_err();

    assert!(matches!(err, LifecycleError::OutcomeUnknown { .. }));
    assert_eq!(store.policies().len(), 1);
    assert!(reporter.warnings()[0].contains("reconcile --cluster c1"));
}

#[tokio::test]
async fn refused_deploy_warns_nothing() {
    let agent = FakeAgent::default();
    agent.fail_next(unreachable());
    let reporter = RecordingReporter::default();

    policy_lifecycle::deploy(&agent, &store(), &reporter, "ops", &request())
        .await
        .unwrap_err();

    assert!(reporter.warnings().is_empty());
}

#[tokio::test]
async fn delete_of_unknown_id_does_not_call_the_agent() {
    let agent = FakeAgent::default();
    let store = store();

    let err = policy_lifecycle::delete(&agent, &store, &RecordingReporter::default(), "ghost")
        .await
        .unwrap_err();

    assert!(matches!(err, LifecycleError::NotFound(id) if id == "ghost"));
    assert!(agent.calls().is_empty());
}

#[tokio::test]
async fn failed_agent_delete_keeps_the_row() {
    let agent = FakeAgent::default();
    let store = store();
    let reporter = RecordingReporter::default();
    let deployed = policy_lifecycle::deploy(&agent, &store, &reporter, "ops", &request())
        .await
        .expect("deploy");

    agent.fail_next(unreachable());
    let err = policy_lifecycle::delete(&agent, &store, &reporter, &deployed.id)
        .await
        .unwrap_err();

    assert!(matches!(err, LifecycleError::AgentUnreachable(_)));
    assert_eq!(store.policies().len(), 1);
    assert_eq!(agent.applied().len(), 1);
}

#[tokio::test]
async fn failed_row_delete_requires_cleanup_and_prune_repairs_it() {
    let agent = FakeAgent::default();
    let store = store();
    let reporter = RecordingReporter::default();
    let deployed = policy_lifecycle::deploy(&agent, &store, &reporter, "ops", &request())
        .await
        .expect("deploy");

    store.fail_policy_delete.store(true, Ordering::SeqCst);
    let err = policy_lifecycle::delete(&agent, &store, &reporter, &deployed.id)
        .await
        .unwrap_err();
    assert!(matches!(err, LifecycleError::CleanupRequired { ref id, .. } if *id == deployed.id));
    assert!(agent.applied().is_empty());

    store.fail_policy_delete.store(false, Ordering::SeqCst);
    let report = policy_lifecycle::reconcile(&agent, &store, &reporter, "c1", PRUNE_NOW)
        .await
        .expect("reconcile");
    assert_eq!(report.missing.len(), 1);
    let pruned = report.pruned.expect("prune ran");
    assert_eq!(pruned.removed_rows, vec![deployed.id]);
    assert!(store.policies().is_empty());
}

#[tokio::test]
async fn reconcile_without_prune_only_reports() {
    let agent = FakeAgent::default();
    agent.plant("stray.yaml");
    agent.plant("kept.yaml");
    let store = store()
        .with_policy(policy("p-kept", "c1", "kept.yaml"))
        .with_policy(policy("p-gone", "c1", "gone.yaml"))
        .with_policy(policy("p-other", "c2", "other.yaml"));

    let report = policy_lifecycle::reconcile(&agent, &store, &RecordingReporter::default(), "c1", ReconcileMode::ReportOnly)
        .await
        .expect("reconcile");

    assert_eq!(report.cluster_id, "c1");
    assert_eq!(report.confirmed.iter().map(|p| p.id.as_str()).collect::<Vec<_>>(), ["p-kept"]);
    assert_eq!(report.missing.iter().map(|p| p.id.as_str()).collect::<Vec<_>>(), ["p-gone"]);
    assert_eq!(report.unrecorded, vec!["stray.yaml".to_string()]);
    assert!(report.pruned.is_none());
    assert!(!report.is_consistent());
    assert_eq!(store.policies().len(), 3);
    assert_eq!(agent.applied().len(), 2);
}

#[tokio::test]
async fn prune_sweeps_unrecorded_manifests() {
    let agent = FakeAgent::default();
    agent.plant("stray.yaml");
    let store = store();
    let reporter = RecordingReporter::default();

    let report = policy_lifecycle::reconcile(&agent, &store, &reporter, "c1", PRUNE_WITH_GRACE)
        .await
        .expect("reconcile");

    let pruned = report.pruned.expect("prune ran");
    assert_eq!(pruned.swept_manifests, vec!["stray.yaml".to_string()]);
    assert!(pruned.failures.is_empty());
    assert!(pruned.is_complete());
    assert!(agent.applied().is_empty());
}

#[tokio::test]
async fn prune_defers_manifests_younger_than_the_grace_period() {
    let agent = FakeAgent::default();
    agent.plant("old.yaml");
    agent.plant_aged("fresh.yaml", 10);
    let store = store();
    let reporter = RecordingReporter::default();

    let report = policy_lifecycle::reconcile(&agent, &store, &reporter, "c1", PRUNE_WITH_GRACE)
        .await
        .expect("reconcile");

    let pruned = report.pruned.expect("prune ran");
    assert_eq!(pruned.swept_manifests, vec!["old.yaml".to_string()]);
    assert_eq!(pruned.deferred, vec!["fresh.yaml".to_string()]);
    assert!(!pruned.is_complete());
    assert_eq!(agent.applied(), vec!["fresh.yaml".to_string()]);
}

#[tokio::test]
async fn prune_leaves_a_deploy_in_flight_alone() {
    let agent = FakeAgent::default();
    let store = store();
    let reporter = RecordingReporter::default();
    let release = store.gate_policy_insert();

    let req = request();
    let deploying = policy_lifecycle::deploy(&agent, &store, &reporter, "ops", &req);
    let reconciling = async {
        // The agent has applied the manifest; the ledger write is held.
        while agent.applied().is_empty() {
            tokio::task::yield_now().await;
        }
        let report = policy_lifecycle::reconcile(&agent, &store, &reporter, "c1", PRUNE_WITH_GRACE)
            .await
            .expect("reconcile");
        release.send(()).expect("deploy still waiting");
        report
    };
    let (deployed, report) = tokio::join!(deploying, reconciling);

    let deployed = deployed.expect("deploy");
    let pruned = report.pruned.expect("prune ran");
    assert_eq!(report.unrecorded, vec![deployed.policy_file_path.clone()]);
    assert_eq!(pruned.deferred, vec![deployed.policy_file_path.clone()]);
    assert!(pruned.swept_manifests.is_empty());
    assert_eq!(agent.applied(), vec![deployed.policy_file_path.clone()]);
    assert_eq!(store.policies().len(), 1);
}

#[tokio::test]
async fn prune_skips_manifests_recorded_after_the_listing() {
    let agent = FakeAgent::default();
    agent.plant("late.yaml");
    let store = store();
    store.record_after_first_list(policy("p-late", "c1", "late.yaml"));

    // No grace: only the second look at the ledger keeps the manifest.
    let report = policy_lifecycle::reconcile(&agent, &store, &RecordingReporter::default(), "c1", PRUNE_NOW)
        .await
        .expect("reconcile");

    assert_eq!(report.unrecorded, vec!["late.yaml".to_string()]);
    let pruned = report.pruned.expect("prune ran");
    assert!(pruned.swept_manifests.is_empty());
    assert!(pruned.failures.is_empty());
    assert_eq!(agent.applied(), vec!["late.yaml".to_string()]);
}

#[tokio::test]
async fn consistent_cluster_skips_prune() {
    let agent = FakeAgent::default();
    let store = store();
    policy_lifecycle::deploy(&agent, &store, &RecordingReporter::default(), "ops", &request())
        .await
        .expect("deploy");

    let report = policy_lifecycle::reconcile(&agent, &store, &RecordingReporter::default(), "c1", PRUNE_NOW)
        .await
        .expect("reconcile");

    assert!(report.is_consistent());
    assert!(report.pruned.is_none());
    assert_eq!(report.confirmed.len(), 1);
}

#[tokio::test]
async fn list_filters_by_cluster() {
    let store = store()
        .with_policy(policy("a", "c1", "a.yaml"))
        .with_policy(policy("b", "c2", "b.yaml"));

    assert_eq!(policy_lifecycle::list(&store, None).await.expect("list").len(), 2);
    let only = policy_lifecycle::list(&store, Some("c2")).await.expect("list");
    assert_eq!(only.len(), 1);
    assert_eq!(only[0].id, "b");
}
