//! Maps agent failures onto HTTP responses with an `AgentErrorBody`.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use kwarden_common::AgentErrorBody;
use thiserror::Error;

use crate::executor::ExecError;
use crate::kube::KubeError;
use crate::render::RenderError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Exec(#[from] ExecError),

    #[error(transparent)]
    Kube(#[from] KubeError),

    #[error("internal task failed: {0}")]
    Task(String),
}

impl ApiError {
    fn parts(&self) -> (StatusCode, &'static str, Option<String>) {
        match self {
            Self::Render(RenderError::TemplateNotFound(_)) => {
                (StatusCode::NOT_FOUND, "template_not_found", None)
            }
            Self::Render(RenderError::TemplateUnreadable { .. }) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "template_unreadable", None)
            }
            Self::Render(RenderError::EmptyField(_)) => {
                (StatusCode::BAD_REQUEST, "invalid_request", None)
            }
            Self::Render(RenderError::OutputDirUnavailable { .. }) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "output_dir_unavailable", None)
            }
            Self::Exec(ExecError::ApplyFailed { output }) => {
                (StatusCode::BAD_GATEWAY, "apply_failed", Some(output.clone()))
            }
            Self::Exec(ExecError::DeleteFailed { output }) => {
                (StatusCode::BAD_GATEWAY, "delete_failed", Some(output.clone()))
            }
            Self::Exec(ExecError::LocalCleanupFailed { .. }) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "local_cleanup_failed", None)
            }
            Self::Exec(ExecError::InvalidManifestName { .. }) => {
                (StatusCode::BAD_REQUEST, "invalid_manifest_name", None)
            }
            Self::Exec(ExecError::ManifestNotFound(_)) => {
                (StatusCode::NOT_FOUND, "manifest_not_found", None)
            }
            Self::Exec(ExecError::PromoteFailed { .. }) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "promote_failed", None)
            }
            Self::Exec(ExecError::ListFailed { .. }) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "list_failed", None)
            }
            Self::Exec(ExecError::Spawn(_)) | Self::Kube(KubeError::Spawn(_)) => {
                (StatusCode::BAD_GATEWAY, "kubectl_unavailable", None)
            }
            Self::Kube(KubeError::CommandFailed { output, .. }) => {
                (StatusCode::BAD_GATEWAY, "kubectl_failed", Some(output.clone()))
            }
            Self::Kube(KubeError::Parse { .. }) => (StatusCode::BAD_GATEWAY, "kubectl_output", None),
            Self::Task(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal", None),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind, output) = self.parts();
        if status.is_server_error() {
            tracing::error!(kind, error = %self, "request failed");
        } else {
            tracing::debug!(kind, error = %self, "request rejected");
        }
        let body = AgentErrorBody {
            error: self.to_string(),
            kind: kind.to_string(),
            output,
        };
        (status, Json(body)).into_response()
    }
}
