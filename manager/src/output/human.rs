//! Human-readable terminal renderer.

use std::path::Path;

use kwarden_common::{NamespaceResources, WorkerNodeInfo};
use owo_colors::OwoColorize as _;

use crate::application::services::cluster_info::{ClusterStats, NamespaceSnapshot};
use crate::domain::config::ManagerConfig;
use crate::domain::{Cluster, HostRecord, ImplementedPolicy, PolicyTemplate, ReconcileReport};
use crate::output::OutputContext;

/// Renders domain types as human-readable terminal output using `OutputContext`.
pub struct HumanRenderer<'a> {
    ctx: &'a OutputContext,
}

impl<'a> HumanRenderer<'a> {
    #[must_use]
    pub fn new(ctx: &'a OutputContext) -> Self {
        Self { ctx }
    }

    fn empty(&self, msg: &str) {
        if !self.ctx.quiet {
            println!("{msg}");
        }
    }

    pub fn render_clusters(&self, clusters: &[Cluster]) {
        if clusters.is_empty() {
            self.empty("No clusters registered. Add one: kwarden cluster add <master-ip>");
            return;
        }
        println!("  {:<36}  {:<20}  {:<22}  DESCRIPTION", "ID", "NAME", "AGENT");
        for c in clusters {
            let agent = format!("{}:{}", c.master_ip, c.agent_port);
            println!(
                "  {:<36}  {:<20}  {agent:<22}  {}",
                c.id,
                c.cluster_name,
                c.description.style(self.ctx.styles.muted)
            );
        }
    }

    pub fn render_cluster(&self, c: &Cluster) {
        self.ctx.title(&c.cluster_name);
        self.ctx.field("id:", &c.id);
        self.ctx.field("agent:", &format!("{}:{}", c.master_ip, c.agent_port));
        if !c.description.is_empty() {
            self.ctx.field("description:", &c.description);
        }
        self.ctx.field(
            "registered:",
            &format!("{} by {}", c.audit.created_at.to_rfc3339(), c.audit.created_by),
        );
    }

    pub fn render_templates(&self, templates: &[PolicyTemplate]) {
        if templates.is_empty() {
            self.empty("No policy templates. Add one: kwarden template add --title <t> --file <path>");
            return;
        }
        println!("  {:<36}  {:<24}  {:<14}  FILE", "ID", "TITLE", "TYPE");
        for t in templates {
            println!(
                "  {:<36}  {:<24}  {:<14}  {}",
                t.id, t.title, t.policy_type, t.template_file_path
            );
        }
    }

    pub fn render_policies(&self, policies: &[ImplementedPolicy]) {
        if policies.is_empty() {
            self.empty("No policies deployed.");
            return;
        }
        println!(
            "  {:<36}  {:<24}  {:<16}  {:<16}  MANIFEST",
            "ID", "TITLE", "NAMESPACE", "APP"
        );
        for p in policies {
            println!(
                "  {:<36}  {:<24}  {:<16}  {:<16}  {}",
                p.id,
                p.title,
                p.namespace,
                p.app_label,
                p.policy_file_path.style(self.ctx.styles.muted)
            );
        }
    }

    pub fn render_policy(&self, p: &ImplementedPolicy) {
        self.ctx.field("id:", &p.id);
        self.ctx.field("cluster:", &p.cluster_id);
        self.ctx.field("title:", &p.title);
        self.ctx.field("target:", &format!("{}/{}", p.namespace, p.app_label));
        self.ctx.field("manifest:", &p.policy_file_path);
    }

    pub fn render_reconcile(&self, report: &ReconcileReport) {
        self.ctx.title(&format!("Reconcile {}", report.cluster_id));
        self.ctx.field("confirmed:", &report.confirmed.len().to_string());
        if report.is_consistent() {
            self.ctx.ok("ledger matches the agent");
        }
        for name in &report.unrecorded {
            self.ctx.drift(&format!("unrecorded manifest on agent: {name}"));
        }
        for row in &report.missing {
            self.ctx.drift(&format!(
                "recorded policy {} has no manifest ({})",
                row.id, row.policy_file_path
            ));
        }
        if let Some(pruned) = &report.pruned {
            self.ctx.hint(&format!(
                "pruned {} record(s), swept {} manifest(s)",
                pruned.removed_rows.len(),
                pruned.swept_manifests.len()
            ));
            for name in &pruned.deferred {
                self.ctx.drift(&format!("{name} is too recent to sweep; check again later"));
            }
            for failure in &pruned.failures {
                self.ctx.failure(failure);
            }
        } else if !report.is_consistent() {
            self.ctx.hint("Repair with: kwarden policy reconcile --prune");
        }
    }

    pub fn render_hosts(&self, hosts: &[HostRecord], heading: &str) {
        if hosts.is_empty() {
            self.empty(&format!("{heading}: none"));
            return;
        }
        self.ctx.title(heading);
        for h in hosts {
            println!("  {:<40}  {}", h.ip_address, h.hostname);
        }
    }

    pub fn render_namespaces(&self, namespaces: &[String]) {
        for ns in namespaces {
            println!("  {ns}");
        }
    }

    pub fn render_nodes(&self, nodes: &[WorkerNodeInfo]) {
        if nodes.is_empty() {
            self.empty("No worker nodes.");
            return;
        }
        self.ctx.title("Worker nodes");
        for n in nodes {
            let external = if n.external_ip.is_empty() { "-" } else { &n.external_ip };
            println!(
                "  {:<30}  {:<30}  {:<16}  {external}",
                n.name, n.hostname, n.internal_ip
            );
        }
    }

    pub fn render_resources(&self, namespace: &str, r: &NamespaceResources) {
        self.ctx.title(namespace);
        for pod in &r.pods {
            let ready = pod.containers.iter().filter(|c| c.status == "Running").count();
            println!(
                "    pod          {:<40}  {:<10}  {ready}/{}",
                pod.name,
                pod.phase,
                pod.containers.len()
            );
        }
        for d in &r.deployments {
            println!(
                "    deployment   {:<40}  {}/{}",
                d.name, d.available_replicas, d.replicas
            );
        }
        for s in &r.stateful_sets {
            println!(
                "    statefulset  {:<40}  {}/{}",
                s.name, s.available_replicas, s.replicas
            );
        }
        for d in &r.daemon_sets {
            println!(
                "    daemonset    {:<40}  {}/{}",
                d.name, d.number_ready, d.desired_number_scheduled
            );
        }
        for s in &r.services {
            println!(
                "    service      {:<40}  {:<10}  {}",
                s.name, s.service_type, s.cluster_ip
            );
        }
    }

    pub fn render_snapshots(&self, snapshots: &[NamespaceSnapshot]) {
        for snap in snapshots {
            self.render_resources(&snap.namespace, &snap.resources);
        }
    }

    pub fn render_stats(&self, stats: &ClusterStats) {
        self.ctx.title(&stats.cluster_name);
        self.ctx.field("running pods:", &stats.running_pods.to_string());
        self.ctx
            .field("policies:", &stats.implemented_policies.to_string());
    }

    pub fn render_config(&self, config: &ManagerConfig, path: &Path, database: &Path) {
        println!();
        println!(
            "  {}",
            format!("Configuration ({})", path.display()).style(self.ctx.styles.title)
        );
        println!();
        println!("  {:<24} {}", "database:", database.display());
        println!("  {:<24} {}", "operator:", config.operator);
        println!("  {:<24} {}s", "agent.timeout_secs:", config.agent.timeout_secs);
        println!("  {:<24} {}", "liveness.port:", config.liveness.port);
        println!("  {:<24} {}", "liveness.path:", config.liveness.path);
        println!("  {:<24} {}s", "liveness.timeout_secs:", config.liveness.timeout_secs);
        println!("  {:<24} {}", "liveness.concurrency:", config.liveness.concurrency);
        println!(
            "  {:<24} {}s",
            "reconcile.prune_grace_secs:", config.reconcile.prune_grace_secs
        );
        println!();
        println!("  {}", "Environment:".style(self.ctx.styles.label));
        for var in ["KWARDEN_CONFIG", "RUST_LOG", "NO_COLOR"] {
            println!(
                "    {:<22} {}",
                format!("{var}:"),
                std::env::var(var).unwrap_or_else(|_| "(not set)".to_string())
            );
        }
        println!();
    }
}
