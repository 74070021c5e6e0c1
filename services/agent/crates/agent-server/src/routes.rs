//! HTTP surface of the agent.
//!
//! Read routes shell out to `kubectl` through `KubeClient`; the policy
//! routes combine the renderer and the executor. Deploys render into the
//! staging directory and the executor promotes the manifest only after a
//! successful apply, so the applied listing never shows an apply in flight.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use kwarden_common::{
    AppliedPolicies, DeletePolicyResponse, DeployPolicyRequest, DeployPolicyResponse,
    HealthResponse, NamespaceResources, RunningPods, WorkerNodeInfo, paths,
};
use serde_json::{Value, json};

use crate::error::ApiError;
use crate::runner::CommandRunner;
use crate::state::AppState;

type Shared<R> = State<Arc<AppState<R>>>;

pub fn router<R: CommandRunner + 'static>(state: Arc<AppState<R>>) -> Router {
    Router::new()
        .route(paths::HEALTH_GET, get(health_get::<R>))
        .route(paths::HEALTH_BEAT, get(health_beat))
        .route(paths::NAMESPACES_ALL, get(namespaces_all::<R>))
        .route(paths::NAMESPACE_RESOURCES, get(namespace_resources::<R>))
        .route(paths::WORKER_NODES, get(worker_nodes::<R>))
        .route(paths::COUNT_PODS, get(count_pods::<R>))
        .route(paths::DEPLOY_POLICY, post(deploy_policy::<R>))
        .route(paths::DELETE_POLICY, get(delete_policy::<R>))
        .route(paths::APPLIED_POLICIES, get(applied_policies::<R>))
        .with_state(state)
}

// ── Health ────────────────────────────────────────────────────────────────────

async fn health_get<R: CommandRunner>(State(state): Shared<R>) -> Json<HealthResponse> {
    Json(state.kube.health().await)
}

async fn health_beat() -> Json<Value> {
    Json(json!({}))
}

// ── Cluster reads ─────────────────────────────────────────────────────────────

async fn namespaces_all<R: CommandRunner>(
    State(state): Shared<R>,
) -> Result<Json<Vec<String>>, ApiError> {
    Ok(Json(state.kube.namespaces().await?))
}

async fn namespace_resources<R: CommandRunner>(
    State(state): Shared<R>,
    Path(namespace): Path<String>,
) -> Result<Json<NamespaceResources>, ApiError> {
    Ok(Json(state.kube.namespace_resources(&namespace).await?))
}

async fn worker_nodes<R: CommandRunner>(
    State(state): Shared<R>,
) -> Result<Json<Vec<WorkerNodeInfo>>, ApiError> {
    Ok(Json(state.kube.worker_nodes().await?))
}

async fn count_pods<R: CommandRunner>(State(state): Shared<R>) -> Result<Json<RunningPods>, ApiError> {
    let running_pods = state.kube.running_pods().await?;
    Ok(Json(RunningPods { running_pods }))
}

// ── Policies ──────────────────────────────────────────────────────────────────

async fn deploy_policy<R: CommandRunner>(
    State(state): Shared<R>,
    Json(req): Json<DeployPolicyRequest>,
) -> Result<Json<DeployPolicyResponse>, ApiError> {
    let renderer = state.renderer.clone();
    let rendered = tokio::task::spawn_blocking(move || {
        renderer.render(&req.path, &req.namespace, &req.app_label)
    })
    .await
    .map_err(|e| ApiError::Task(e.to_string()))??;

    state.executor.deploy(&rendered.path).await?;

    tracing::info!(
        id = %rendered.id,
        namespace = %rendered.namespace,
        app_label = %rendered.app_label,
        "policy deployed",
    );
    Ok(Json(DeployPolicyResponse {
        policy_path: rendered.file_name(),
    }))
}

async fn delete_policy<R: CommandRunner>(
    State(state): Shared<R>,
    Path(name): Path<String>,
) -> Result<Json<DeletePolicyResponse>, ApiError> {
    let output = state.executor.delete(&name).await?;
    Ok(Json(DeletePolicyResponse {
        deleted: name,
        output,
    }))
}

async fn applied_policies<R: CommandRunner>(
    State(state): Shared<R>,
) -> Result<Json<AppliedPolicies>, ApiError> {
    Ok(Json(AppliedPolicies {
        policies: state.executor.applied().await?,
    }))
}
