//! Agent configuration, loaded from `KWARDEN_AGENT_*` environment variables.

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

pub const ENV_PREFIX: &str = "KWARDEN_AGENT_";

/// Each field maps to `KWARDEN_AGENT_<FIELD>`:
///   - `KWARDEN_AGENT_LISTEN_ADDR`          (default `0.0.0.0:8990`)
///   - `KWARDEN_AGENT_TEMPLATES_DIR`        (required)
///   - `KWARDEN_AGENT_APPLIED_DIR`          (required)
///   - `KWARDEN_AGENT_KUBECTL`              (default `kubectl`)
///   - `KWARDEN_AGENT_COMMAND_TIMEOUT_SECS` (default `20`)
#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Directory holding policy templates.
    pub templates_dir: PathBuf,

    /// Directory holding every applied manifest. Renders are staged in its
    /// `.staging` subdirectory until `kubectl apply` succeeds.
    pub applied_dir: PathBuf,

    #[serde(default = "default_kubectl")]
    pub kubectl: String,

    #[serde(default = "default_command_timeout_secs")]
    pub command_timeout_secs: u64,
}

impl Config {
    #[must_use]
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }
}

fn default_listen_addr() -> String {
    "0.0.0.0:8990".to_string()
}

fn default_kubectl() -> String {
    "kubectl".to_string()
}

/// Below the manager's 30 s request timeout, so a slow `kubectl` surfaces as
/// an agent error instead of a manager-side timeout.
fn default_command_timeout_secs() -> u64 {
    20
}
