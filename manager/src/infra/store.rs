//! SQLite-backed implementation of the persistence ports.
//!
//! One connection behind `Arc<Mutex<_>>`; every call runs on the blocking
//! pool so the async runtime is never stalled by disk I/O.

use std::path::Path;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use rusqlite::{Connection, ErrorCode, OptionalExtension, Row, params};

use crate::application::ports::{ClusterStore, HostInventory, PolicyLedger, TemplateCatalog};
use crate::domain::{Audit, Cluster, HostRecord, ImplementedPolicy, PolicyTemplate, StoreError};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS clusters (
    id            TEXT PRIMARY KEY,
    cluster_name  TEXT NOT NULL,
    master_ip     TEXT NOT NULL UNIQUE,
    agent_port    INTEGER NOT NULL,
    description   TEXT NOT NULL DEFAULT '',
    created_by    TEXT NOT NULL,
    created_at    TEXT NOT NULL,
    updated_by    TEXT NOT NULL,
    updated_at    TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS policy_templates (
    id                  TEXT PRIMARY KEY,
    title               TEXT NOT NULL,
    description         TEXT NOT NULL DEFAULT '',
    policy_type         TEXT NOT NULL DEFAULT '',
    template_file_path  TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS implemented_policies (
    id                TEXT PRIMARY KEY,
    cluster_id        TEXT NOT NULL,
    title             TEXT NOT NULL,
    description       TEXT NOT NULL DEFAULT '',
    app_label         TEXT NOT NULL,
    namespace         TEXT NOT NULL,
    policy_file_path  TEXT NOT NULL,
    created_by        TEXT NOT NULL,
    created_at        TEXT NOT NULL,
    updated_by        TEXT NOT NULL,
    updated_at        TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS implemented_policies_cluster ON implemented_policies (cluster_id);
CREATE TABLE IF NOT EXISTS hosts (
    seq         INTEGER PRIMARY KEY AUTOINCREMENT,
    ip_address  TEXT NOT NULL UNIQUE,
    hostname    TEXT NOT NULL
);
";

const CLUSTER_COLUMNS: &str = "id, cluster_name, master_ip, agent_port, description, \
                               created_by, created_at, updated_by, updated_at";
const POLICY_COLUMNS: &str = "id, cluster_id, title, description, app_label, namespace, \
                              policy_file_path, created_by, created_at, updated_by, updated_at";

#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open (creating if needed) the database at `path` and apply the schema.
    ///
    /// # Errors
    ///
    /// Returns `Backend` if the file or its directory cannot be created, or
    /// the schema cannot be applied.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::Backend(format!("cannot create {}: {e}", parent.display()))
            })?;
        }
        let conn = Connection::open(path).map_err(backend)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")
            .map_err(backend)?;
        Self::init(conn)
    }

    /// # Errors
    ///
    /// Returns `Backend` if the schema cannot be applied.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory().map_err(backend)?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA).map_err(backend)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn call<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| StoreError::Backend("connection mutex poisoned".to_string()))?;
            f(&guard)
        })
        .await
        .map_err(|e| StoreError::Backend(format!("store task failed: {e}")))?
    }
}

// ── Error and row mapping ─────────────────────────────────────────────────────

#[allow(clippy::needless_pass_by_value)]
fn backend(err: rusqlite::Error) -> StoreError {
    match err.sqlite_error_code() {
        Some(ErrorCode::ConstraintViolation) => StoreError::Conflict(err.to_string()),
        _ => StoreError::Backend(err.to_string()),
    }
}

fn timestamp(raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt(format!("bad timestamp '{raw}': {e}")))
}

/// Columns as stored. Decoding into domain types happens after the row
/// callback so that a bad value surfaces as `Corrupt`.
struct ClusterRow {
    id: String,
    cluster_name: String,
    master_ip: String,
    agent_port: i64,
    description: String,
    audit: [String; 4],
}

struct PolicyRow {
    fields: [String; 7],
    audit: [String; 4],
}

fn audit_columns(row: &Row<'_>, first: usize) -> rusqlite::Result<[String; 4]> {
    Ok([
        row.get(first)?,
        row.get(first + 1)?,
        row.get(first + 2)?,
        row.get(first + 3)?,
    ])
}

fn decode_audit([created_by, created_at, updated_by, updated_at]: [String; 4]) -> Result<Audit, StoreError> {
    Ok(Audit {
        created_by,
        created_at: timestamp(&created_at)?,
        updated_by,
        updated_at: timestamp(&updated_at)?,
    })
}

fn read_cluster(row: &Row<'_>) -> rusqlite::Result<ClusterRow> {
    Ok(ClusterRow {
        id: row.get(0)?,
        cluster_name: row.get(1)?,
        master_ip: row.get(2)?,
        agent_port: row.get(3)?,
        description: row.get(4)?,
        audit: audit_columns(row, 5)?,
    })
}

impl TryFrom<ClusterRow> for Cluster {
    type Error = StoreError;

    fn try_from(row: ClusterRow) -> Result<Self, StoreError> {
        let agent_port = u16::try_from(row.agent_port).map_err(|_| {
            StoreError::Corrupt(format!("cluster {} has agent port {}", row.id, row.agent_port))
        })?;
        Ok(Self {
            id: row.id,
            cluster_name: row.cluster_name,
            master_ip: row.master_ip,
            agent_port,
            description: row.description,
            audit: decode_audit(row.audit)?,
        })
    }
}

fn read_policy(row: &Row<'_>) -> rusqlite::Result<PolicyRow> {
    Ok(PolicyRow {
        fields: [
            row.get(0)?,
            row.get(1)?,
            row.get(2)?,
            row.get(3)?,
            row.get(4)?,
            row.get(5)?,
            row.get(6)?,
        ],
        audit: audit_columns(row, 7)?,
    })
}

impl TryFrom<PolicyRow> for ImplementedPolicy {
    type Error = StoreError;

    fn try_from(row: PolicyRow) -> Result<Self, StoreError> {
        let [id, cluster_id, title, description, app_label, namespace, policy_file_path] =
            row.fields;
        Ok(Self {
            id,
            cluster_id,
            title,
            description,
            app_label,
            namespace,
            policy_file_path,
            audit: decode_audit(row.audit)?,
        })
    }
}

fn read_template(row: &Row<'_>) -> rusqlite::Result<PolicyTemplate> {
    Ok(PolicyTemplate {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        policy_type: row.get(3)?,
        template_file_path: row.get(4)?,
    })
}

// ── Port implementations ──────────────────────────────────────────────────────

impl ClusterStore for SqliteStore {
    async fn master_ip_exists(&self, master_ip: &str) -> Result<bool, StoreError> {
        let ip = master_ip.to_string();
        self.call(move |conn| {
            conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM clusters WHERE master_ip = ?1)",
                params![ip],
                |row| row.get(0),
            )
            .map_err(backend)
        })
        .await
    }

    async fn insert_cluster(&self, cluster: &Cluster) -> Result<(), StoreError> {
        let c = cluster.clone();
        self.call(move |conn| {
            conn.execute(
                &format!("INSERT INTO clusters ({CLUSTER_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"),
                params![
                    c.id,
                    c.cluster_name,
                    c.master_ip,
                    i64::from(c.agent_port),
                    c.description,
                    c.audit.created_by,
                    c.audit.created_at.to_rfc3339(),
                    c.audit.updated_by,
                    c.audit.updated_at.to_rfc3339(),
                ],
            )
            .map_err(backend)?;
            Ok(())
        })
        .await
    }

    async fn get_cluster(&self, id: &str) -> Result<Option<Cluster>, StoreError> {
        let id = id.to_string();
        self.call(move |conn| {
            conn.query_row(
                &format!("SELECT {CLUSTER_COLUMNS} FROM clusters WHERE id = ?1"),
                params![id],
                read_cluster,
            )
            .optional()
            .map_err(backend)?
            .map(Cluster::try_from)
            .transpose()
        })
        .await
    }

    async fn list_clusters(&self) -> Result<Vec<Cluster>, StoreError> {
        self.call(|conn| {
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT {CLUSTER_COLUMNS} FROM clusters ORDER BY created_at, cluster_name"
                ))
                .map_err(backend)?;
            let rows = stmt
                .query_map([], read_cluster)
                .map_err(backend)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(backend)?;
            rows.into_iter().map(Cluster::try_from).collect()
        })
        .await
    }
}

impl TemplateCatalog for SqliteStore {
    async fn insert_template(&self, template: &PolicyTemplate) -> Result<(), StoreError> {
        let t = template.clone();
        self.call(move |conn| {
            conn.execute(
                "INSERT INTO policy_templates (id, title, description, policy_type, template_file_path)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![t.id, t.title, t.description, t.policy_type, t.template_file_path],
            )
            .map_err(backend)?;
            Ok(())
        })
        .await
    }

    async fn get_template(&self, id: &str) -> Result<Option<PolicyTemplate>, StoreError> {
        let id = id.to_string();
        self.call(move |conn| {
            conn.query_row(
                "SELECT id, title, description, policy_type, template_file_path
                 FROM policy_templates WHERE id = ?1",
                params![id],
                read_template,
            )
            .optional()
            .map_err(backend)
        })
        .await
    }

    async fn list_templates(&self) -> Result<Vec<PolicyTemplate>, StoreError> {
        self.call(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id, title, description, policy_type, template_file_path
                     FROM policy_templates ORDER BY title, id",
                )
                .map_err(backend)?;
            stmt.query_map([], read_template)
                .map_err(backend)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(backend)
        })
        .await
    }
}

impl PolicyLedger for SqliteStore {
    async fn insert_policy(&self, policy: &ImplementedPolicy) -> Result<(), StoreError> {
        let p = policy.clone();
        self.call(move |conn| {
            conn.execute(
                &format!(
                    "INSERT INTO implemented_policies ({POLICY_COLUMNS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"
                ),
                params![
                    p.id,
                    p.cluster_id,
                    p.title,
                    p.description,
                    p.app_label,
                    p.namespace,
                    p.policy_file_path,
                    p.audit.created_by,
                    p.audit.created_at.to_rfc3339(),
                    p.audit.updated_by,
                    p.audit.updated_at.to_rfc3339(),
                ],
            )
            .map_err(backend)?;
            Ok(())
        })
        .await
    }

    async fn get_policy(&self, id: &str) -> Result<Option<ImplementedPolicy>, StoreError> {
        let id = id.to_string();
        self.call(move |conn| {
            conn.query_row(
                &format!("SELECT {POLICY_COLUMNS} FROM implemented_policies WHERE id = ?1"),
                params![id],
                read_policy,
            )
            .optional()
            .map_err(backend)?
            .map(ImplementedPolicy::try_from)
            .transpose()
        })
        .await
    }

    async fn delete_policy(&self, id: &str) -> Result<bool, StoreError> {
        let id = id.to_string();
        self.call(move |conn| {
            let n = conn
                .execute("DELETE FROM implemented_policies WHERE id = ?1", params![id])
                .map_err(backend)?;
            Ok(n > 0)
        })
        .await
    }

    async fn list_policies(
        &self,
        cluster_id: Option<&str>,
    ) -> Result<Vec<ImplementedPolicy>, StoreError> {
        let cluster_id = cluster_id.map(ToString::to_string);
        self.call(move |conn| {
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT {POLICY_COLUMNS} FROM implemented_policies
                     WHERE ?1 IS NULL OR cluster_id = ?1
                     ORDER BY created_at, id"
                ))
                .map_err(backend)?;
            let rows = stmt
                .query_map(params![cluster_id], read_policy)
                .map_err(backend)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(backend)?;
            rows.into_iter().map(ImplementedPolicy::try_from).collect()
        })
        .await
    }
}

impl HostInventory for SqliteStore {
    async fn add_host(&self, host: &HostRecord) -> Result<(), StoreError> {
        let h = host.clone();
        self.call(move |conn| {
            conn.execute(
                "INSERT INTO hosts (ip_address, hostname) VALUES (?1, ?2)",
                params![h.ip_address, h.hostname],
            )
            .map_err(backend)?;
            Ok(())
        })
        .await
    }

    async fn list_hosts(&self) -> Result<Vec<HostRecord>, StoreError> {
        self.call(|conn| {
            let mut stmt = conn
                .prepare("SELECT ip_address, hostname FROM hosts ORDER BY seq")
                .map_err(backend)?;
            stmt.query_map([], |row| Ok(HostRecord::new(row.get::<_, String>(0)?, row.get::<_, String>(1)?)))
                .map_err(backend)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(backend)
        })
        .await
    }
}
