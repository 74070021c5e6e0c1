//! Application context: unified state passed to every command handler.
//!
//! Configuration is loaded once; the database, agent gateway and liveness
//! probe are built on demand so that commands which do not need them (for
//! example `config show`) never touch the database.

use anyhow::{Context, Result};

use crate::application::ports::ConfigStore;
use crate::domain::config::ManagerConfig;
use crate::infra::config::{YamlConfigStore, database_path};
use crate::infra::health::HttpHealthProbe;
use crate::infra::http_client::ReqwestAgentGateway;
use crate::infra::store::SqliteStore;
use crate::output::{HumanRenderer, OutputContext, QuietReporter, Reporter, TerminalReporter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Human,
    /// `--json`: one JSON document on stdout, progress suppressed.
    Json,
}

/// Global presentation flags from the command line.
pub struct OutputFlags {
    pub no_color: bool,
    pub quiet: bool,
    pub json: bool,
}

pub struct AppContext {
    pub output: OutputContext,
    pub mode: OutputMode,
    pub config_store: YamlConfigStore,
    /// Defaults when no config file exists.
    pub config: ManagerConfig,
}

impl AppContext {
    /// # Errors
    ///
    /// Returns an error if the configuration file exists but is invalid.
    pub fn new(flags: &OutputFlags) -> Result<Self> {
        let config_store = YamlConfigStore;
        let config = config_store.load()?;
        let mode = if flags.json {
            OutputMode::Json
        } else {
            OutputMode::Human
        };
        Ok(Self {
            output: OutputContext::new(flags.no_color, flags.quiet),
            mode,
            config_store,
            config,
        })
    }

    #[must_use]
    pub fn is_json(&self) -> bool {
        self.mode == OutputMode::Json
    }

    #[must_use]
    pub fn renderer(&self) -> HumanRenderer<'_> {
        HumanRenderer::new(&self.output)
    }

    /// Progress sink for services: silent in JSON mode.
    #[must_use]
    pub fn reporter(&self) -> Reporter<'_> {
        match self.mode {
            OutputMode::Human => Reporter::Terminal(TerminalReporter::new(&self.output)),
            OutputMode::Json => Reporter::Quiet(QuietReporter),
        }
    }

    #[must_use]
    pub fn operator(&self) -> &str {
        &self.config.operator
    }

    /// Open the ledger database.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be located or opened.
    pub fn store(&self) -> Result<SqliteStore> {
        let path = database_path(&self.config)?;
        tracing::debug!(path = %path.display(), "opening database");
        SqliteStore::open(&path).with_context(|| format!("cannot open database {}", path.display()))
    }

    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn gateway(&self) -> Result<ReqwestAgentGateway> {
        ReqwestAgentGateway::new(self.config.agent.timeout_secs)
    }

    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn probe(&self) -> Result<HttpHealthProbe> {
        HttpHealthProbe::new(&self.config.liveness)
    }
}
