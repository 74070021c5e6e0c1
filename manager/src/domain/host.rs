//! Inventory hosts probed by the liveness aggregator.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostRecord {
    pub ip_address: String,
    pub hostname: String,
}

impl HostRecord {
    #[must_use]
    pub fn new(ip_address: impl Into<String>, hostname: impl Into<String>) -> Self {
        Self {
            ip_address: ip_address.into(),
            hostname: hostname.into(),
        }
    }
}
