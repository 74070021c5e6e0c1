//! `ReqwestAgentGateway` against a live HTTP server.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::time::Duration;

use kwarden_common::{HealthResponse, agent_url, paths};
use kwarden_manager::application::ports::AgentGateway;
use kwarden_manager::domain::GatewayError;
use kwarden_manager::infra::http_client::ReqwestAgentGateway;

use crate::agent_stub::{self, closed_port};

#[tokio::test]
async fn success_returns_status_and_body() {
    let stub = agent_stub::spawn().await;
    let gateway = ReqwestAgentGateway::new(5).expect("client");

    let resp = gateway
        .get(&agent_url("127.0.0.1", stub.port(), paths::HEALTH_GET), &[])
        .await
        .expect("health");

    assert_eq!(resp.status, 200);
    let health: HealthResponse = resp.json().expect("decode");
    assert_eq!(health.k8s.cluster_name, "stub");
}

#[tokio::test]
async fn server_error_is_rejected_with_body() {
    let stub = agent_stub::spawn().await;
    let gateway = ReqwestAgentGateway::new(5).expect("client");

    let err = gateway
        .get(&agent_url("127.0.0.1", stub.port(), "/broken"), &[])
        .await
        .unwrap_err();

    let GatewayError::Rejected { status, body, .. } = &err else {
        panic!("expected Rejected");
    };
    assert_eq!(*status, 500);
    assert!(body.contains("kubectl exploded"));
    assert!(err.is_definitely_not_applied());
}

#[tokio::test]
async fn slow_agent_times_out() {
    let stub = agent_stub::spawn().await;
    let gateway = ReqwestAgentGateway::with_timeout(Duration::from_millis(200)).expect("client");

    let err = gateway
        .get(&agent_url("127.0.0.1", stub.port(), "/slow"), &[])
        .await
        .unwrap_err();

    assert!(matches!(err, GatewayError::Timeout { .. }), "got {err}");
    assert!(!err.is_definitely_not_applied());
}

#[tokio::test]
async fn closed_port_is_unreachable() {
    let port = closed_port().await;
    let gateway = ReqwestAgentGateway::new(5).expect("client");

    let err = gateway
        .post(
            &agent_url("127.0.0.1", port, paths::DEPLOY_POLICY),
            &serde_json::json!({}),
            &[],
        )
        .await
        .unwrap_err();

    assert!(matches!(err, GatewayError::Unreachable { .. }), "got {err}");
    assert!(err.is_definitely_not_applied());
}
