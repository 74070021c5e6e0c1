//! Cluster registrations and their validation.

use kwarden_common::agent_url;
use serde::{Deserialize, Serialize};

use crate::domain::error::RegistryError;
use crate::domain::policy::Audit;

/// A registered cluster, reached through the agent at `master_ip:agent_port`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cluster {
    pub id: String,
    pub cluster_name: String,
    pub master_ip: String,
    pub agent_port: u16,
    pub description: String,
    pub audit: Audit,
}

impl Cluster {
    /// Absolute URL of `path` on this cluster's agent.
    #[must_use]
    pub fn agent_url(&self, path: &str) -> String {
        agent_url(&self.master_ip, self.agent_port, path)
    }
}

/// Registration request. `agent_port` is wider than `u16` so that an
/// out-of-range value from the outside is rejected rather than truncated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCluster {
    pub master_ip: String,
    pub agent_port: u32,
    pub description: String,
}

impl NewCluster {
    /// Validate and return the trimmed ip and the port.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRegistration` for an empty ip or a port outside
    /// `1..=65535`.
    pub fn validate(&self) -> Result<(&str, u16), RegistryError> {
        let ip = self.master_ip.trim();
        if ip.is_empty() {
            return Err(RegistryError::InvalidRegistration(
                "master ip must not be empty".to_string(),
            ));
        }
        if ip.contains(char::is_whitespace) || ip.contains('/') {
            return Err(RegistryError::InvalidRegistration(format!(
                "'{ip}' is not a host or ip address"
            )));
        }
        let port = u16::try_from(self.agent_port)
            .ok()
            .filter(|p| *p != 0)
            .ok_or_else(|| {
                RegistryError::InvalidRegistration(format!(
                    "agent port {} is outside 1..=65535",
                    self.agent_port
                ))
            })?;
        Ok((ip, port))
    }
}
