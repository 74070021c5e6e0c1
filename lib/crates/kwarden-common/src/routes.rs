use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

/// Fixed agent HTTP surface. Paths use axum's `{param}` capture syntax so
/// the agent router and the manager's URL builders share one table.
pub mod paths {
    /// Liveness plus cluster identity (`HealthResponse`).
    pub const HEALTH_GET: &str = "/api/health/get";

    /// Bare heartbeat, always `{}` while the process is up.
    pub const HEALTH_BEAT: &str = "/api/health/beat";

    /// Ordered namespace names.
    pub const NAMESPACES_ALL: &str = "/api/kubernetes/namespaces/all";

    /// Workload snapshot for one namespace.
    pub const NAMESPACE_RESOURCES: &str = "/api/kubernetes/namespaces/{namespace}/resources";

    /// Worker nodes with their addresses; control-plane nodes are left out.
    pub const WORKER_NODES: &str = "/api/kubernetes/workers/nodes/all";

    /// Running pod count across all namespaces.
    pub const COUNT_PODS: &str = "/api/kubernetes/count/pods";

    /// Render + apply a policy template.
    /// The misspelling is part of the deployed wire contract.
    pub const DEPLOY_POLICY: &str = "/api/policies/deplye/policy";

    /// Delete an applied manifest by file name.
    pub const DELETE_POLICY: &str = "/api/policies/delete/{path}";

    /// Manifests currently applied by the agent, with their age.
    pub const APPLIED_POLICIES: &str = "/api/policies/applied";
}

/// Tokens substituted into policy templates at render time.
pub mod placeholders {
    pub const NAMESPACE: &str = "{{.Namespace}}";
    pub const APP_LABEL: &str = "{{.AppLabel}}";
    pub const POLICY_ID: &str = "{{.PolicyID}}";

    /// All tokens, in substitution order.
    pub const ALL: [&str; 3] = [POLICY_ID, NAMESPACE, APP_LABEL];
}

/// Inventory liveness probe defaults.
pub mod liveness {
    pub const DEFAULT_PORT: u16 = 45667;
    pub const DEFAULT_PATH: &str = "/health/check";
    pub const DEFAULT_TIMEOUT_SECS: u64 = 2;
    pub const DEFAULT_CONCURRENCY: usize = 16;
}

/// Everything except unreserved characters is escaped inside a path segment.
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.').remove(b'~');

fn encode_segment(raw: &str) -> String {
    utf8_percent_encode(raw, SEGMENT).to_string()
}

/// Base URL of an agent, e.g. `http://10.0.0.4:8990` or `http://[::1]:8990`.
pub fn agent_url(host: &str, port: u16, path: &str) -> String {
    if host.contains(':') && !host.starts_with('[') {
        format!("http://[{host}]:{port}{path}")
    } else {
        format!("http://{host}:{port}{path}")
    }
}

pub fn namespace_resources_path(namespace: &str) -> String {
    paths::NAMESPACE_RESOURCES.replace("{namespace}", &encode_segment(namespace))
}

pub fn delete_policy_path(manifest: &str) -> String {
    paths::DELETE_POLICY.replace("{path}", &encode_segment(manifest))
}

/// Validate that a manifest reference is a bare file name.
/// SECURITY: the agent joins this onto its applied directory, so separators
/// and parent references must never reach the filesystem.
pub fn validate_manifest_name(name: &str) -> Result<(), &'static str> {
    if name.is_empty() {
        return Err("manifest name must not be empty");
    }
    if name.contains('/') || name.contains('\\') {
        return Err("manifest name must not contain path separators");
    }
    if name == "." || name == ".." || name.contains("..") {
        return Err("manifest name must not contain '..'");
    }
    if name.chars().any(char::is_control) {
        return Err("manifest name must not contain control characters");
    }
    Ok(())
}
