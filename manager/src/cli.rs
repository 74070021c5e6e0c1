//! CLI argument parsing with clap derive

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::app::{AppContext, OutputFlags};
use crate::commands;

/// Manage Kubernetes clusters and their network policies through kwarden agents
#[derive(Parser)]
#[command(
    name = "kwarden",
    version,
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Log diagnostics to stderr (repeat for more detail)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Register and inspect clusters
    #[command(subcommand)]
    Cluster(commands::cluster::ClusterCommand),

    /// Manage the policy template catalog
    #[command(subcommand)]
    Template(commands::template::TemplateCommand),

    /// Deploy, delete and reconcile policies
    #[command(subcommand)]
    Policy(commands::policy::PolicyCommand),

    /// Read-only views of a cluster
    #[command(subcommand)]
    Kube(commands::kube::KubeCommand),

    /// Host inventory and liveness
    #[command(subcommand)]
    Hosts(commands::hosts::HostsCommand),

    /// Manage configuration
    #[command(subcommand)]
    Config(commands::config::ConfigCommand),
}

impl Cli {
    /// Execute the CLI command.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails.
    pub async fn run(self) -> Result<ExitCode> {
        let Cli {
            json,
            quiet,
            no_color,
            verbose: _,
            command,
        } = self;
        let app = AppContext::new(&OutputFlags {
            no_color,
            quiet,
            json,
        })?;

        match command {
            Command::Cluster(cmd) => commands::cluster::run(&app, cmd).await,
            Command::Template(cmd) => commands::template::run(&app, cmd).await,
            Command::Policy(cmd) => commands::policy::run(&app, cmd).await,
            Command::Kube(cmd) => commands::kube::run(&app, cmd).await,
            Command::Hosts(cmd) => commands::hosts::run(&app, cmd).await,
            Command::Config(cmd) => commands::config::run(&app, cmd),
        }
    }
}
