//! `AgentGateway` over HTTP with `reqwest`.

use std::error::Error as _;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{Client, RequestBuilder, Url};

use crate::application::ports::{AgentGateway, AgentResponse};
use crate::domain::GatewayError;
use crate::domain::config::DEFAULT_AGENT_TIMEOUT_SECS;

/// One pooled client shared by every agent request.
#[derive(Debug, Clone)]
pub struct ReqwestAgentGateway {
    client: Client,
    timeout: Duration,
}

impl ReqwestAgentGateway {
    /// Build a gateway with a per-request timeout. Zero means the default
    /// of 30 seconds.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialised.
    pub fn new(timeout_secs: u64) -> Result<Self> {
        let secs = if timeout_secs == 0 {
            DEFAULT_AGENT_TIMEOUT_SECS
        } else {
            timeout_secs
        };
        Self::with_timeout(Duration::from_secs(secs))
    }

    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialised.
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("kwarden/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { client, timeout })
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn parse(url: &str) -> Result<Url, GatewayError> {
        Url::parse(url).map_err(|e| GatewayError::InvalidUrl {
            url: url.to_string(),
            message: e.to_string(),
        })
    }

    async fn execute(&self, url: &str, req: RequestBuilder) -> Result<AgentResponse, GatewayError> {
        tracing::debug!(url, "agent request");
        let resp = req.send().await.map_err(|e| self.classify(url, &e))?;

        let status = resp.status();
        let headers = resp
            .headers()
            .iter()
            .filter_map(|(k, v)| Some((k.to_string(), v.to_str().ok()?.to_string())))
            .collect();
        let body = resp.bytes().await.map_err(|e| self.classify(url, &e))?;

        if !status.is_success() {
            tracing::debug!(url, status = status.as_u16(), "agent rejected request");
            return Err(GatewayError::Rejected {
                url: url.to_string(),
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }
        Ok(AgentResponse {
            status: status.as_u16(),
            body: body.to_vec(),
            headers,
        })
    }

    fn classify(&self, url: &str, err: &reqwest::Error) -> GatewayError {
        let url = url.to_string();
        if err.is_timeout() {
            GatewayError::Timeout {
                url,
                secs: self.timeout.as_secs(),
            }
        } else if err.is_connect() {
            GatewayError::Unreachable {
                url,
                message: error_chain(err),
            }
        } else if err.is_builder() {
            GatewayError::InvalidUrl {
                url,
                message: error_chain(err),
            }
        } else {
            GatewayError::Interrupted {
                url,
                message: error_chain(err),
            }
        }
    }
}

/// `reqwest` errors keep the interesting part (e.g. "connection refused")
/// in their source chain.
fn error_chain(err: &reqwest::Error) -> String {
    let mut msg = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        msg.push_str(": ");
        msg.push_str(&cause.to_string());
        source = cause.source();
    }
    msg
}

impl AgentGateway for ReqwestAgentGateway {
    async fn get(&self, url: &str, headers: &[(&str, &str)]) -> Result<AgentResponse, GatewayError> {
        let parsed = Self::parse(url)?;
        let mut req = self.client.get(parsed);
        for (name, value) in headers {
            req = req.header(*name, *value);
        }
        self.execute(url, req).await
    }

    async fn post(
        &self,
        url: &str,
        body: &serde_json::Value,
        headers: &[(&str, &str)],
    ) -> Result<AgentResponse, GatewayError> {
        let parsed = Self::parse(url)?;
        let mut req = self.client.post(parsed).json(body);
        for (name, value) in headers {
            req = req.header(*name, *value);
        }
        self.execute(url, req).await
    }
}
