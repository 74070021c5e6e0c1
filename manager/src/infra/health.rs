//! `HealthProbe` over HTTP: a host is live iff its health path answers 2xx.

use std::time::Duration;

use anyhow::{Context, Result};
use kwarden_common::agent_url;
use reqwest::Client;

use crate::application::ports::HealthProbe;
use crate::domain::HostRecord;
use crate::domain::config::LivenessConfig;

pub struct HttpHealthProbe {
    client: Client,
    port: u16,
    path: String,
}

impl HttpHealthProbe {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &LivenessConfig) -> Result<Self> {
        let secs = if config.timeout_secs == 0 {
            kwarden_common::liveness::DEFAULT_TIMEOUT_SECS
        } else {
            config.timeout_secs
        };
        let client = Client::builder()
            .timeout(Duration::from_secs(secs))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            client,
            port: config.port,
            path: config.path.clone(),
        })
    }
}

impl HealthProbe for HttpHealthProbe {
    async fn is_live(&self, host: &HostRecord) -> bool {
        let url = agent_url(&host.ip_address, self.port, &self.path);
        match self.client.get(&url).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                tracing::debug!(url = %url, error = %e, "host not live");
                false
            }
        }
    }
}
