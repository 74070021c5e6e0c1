//! JSON output helpers for `--json` mode.

use anyhow::{Context, Result};
use serde::Serialize;

use crate::domain::{ConfigError, GatewayError, LifecycleError, RegistryError, StoreError};

/// Pretty-print any serialisable value to stdout.
///
/// # Errors
///
/// Returns an error if serialisation fails.
pub fn print<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("JSON serialization failed")?
    );
    Ok(())
}

/// Format a JSON error object.
///
/// ```json
/// { "error": true, "message": "...", "code": "..." }
/// ```
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn format_error(message: &str, code: &str) -> Result<String> {
    let obj = serde_json::json!({
        "error": true,
        "message": message,
        "code": code,
    });
    serde_json::to_string_pretty(&obj).context("JSON serialization failed")
}

fn gateway_code(err: &GatewayError) -> &'static str {
    match err {
        GatewayError::Unreachable { .. } => "agent_unreachable",
        GatewayError::Timeout { .. } => "agent_timeout",
        GatewayError::Rejected { .. } => "agent_rejected",
        GatewayError::InvalidUrl { .. } => "invalid_agent_url",
        GatewayError::Interrupted { .. } => "agent_interrupted",
    }
}

/// Stable machine-readable code for a command failure.
#[must_use]
pub fn error_code(err: &anyhow::Error) -> &'static str {
    if let Some(e) = err.downcast_ref::<LifecycleError>() {
        return match e {
            LifecycleError::NotFound(_) => "policy_not_found",
            LifecycleError::TemplateNotFound(_) => "template_not_found",
            LifecycleError::ClusterNotFound(_) => "cluster_not_found",
            LifecycleError::AgentUnreachable(g) => gateway_code(g),
            LifecycleError::InvalidAgentResponse(_) => "invalid_agent_response",
            LifecycleError::OutcomeUnknown { .. } => "outcome_unknown",
            LifecycleError::Unrecorded { .. } => "unrecorded",
            LifecycleError::CleanupRequired { .. } => "cleanup_required",
            LifecycleError::Persistence(_) => "store_error",
        };
    }
    if let Some(e) = err.downcast_ref::<RegistryError>() {
        return match e {
            RegistryError::AlreadyRegistered(_) => "already_registered",
            RegistryError::InvalidRegistration(_) => "invalid_registration",
            RegistryError::NotFound(_) => "cluster_not_found",
            RegistryError::AgentUnreachable(g) => gateway_code(g),
            RegistryError::InvalidAgentResponse(_) => "invalid_agent_response",
            RegistryError::Persistence(_) => "store_error",
        };
    }
    if let Some(e) = err.downcast_ref::<StoreError>() {
        return match e {
            StoreError::Conflict(_) => "conflict",
            StoreError::Backend(_) | StoreError::Corrupt(_) => "store_error",
        };
    }
    if err.downcast_ref::<ConfigError>().is_some() {
        return "config_error";
    }
    "error"
}
