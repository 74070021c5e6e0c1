//! Applies and removes rendered manifests against the cluster with `kubectl`,
//! using whatever credentials the agent host already has.
//!
//! Manifests are rendered into a staging directory and only renamed into the
//! applied directory once `kubectl apply` has succeeded, so the applied
//! listing never shows a manifest that is still being applied.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use kwarden_common::{AppliedManifest, validate_manifest_name};
use thiserror::Error;

use crate::runner::{CommandRunner, combined_output};

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("kubectl apply failed: {output}")]
    ApplyFailed { output: String },

    #[error("kubectl delete failed: {output}")]
    DeleteFailed { output: String },

    #[error("policy removed from the cluster but {} could not be deleted: {source}", path.display())]
    LocalCleanupFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid manifest name '{name}': {reason}")]
    InvalidManifestName { name: String, reason: &'static str },

    #[error("manifest {} is not applied by this agent", .0.display())]
    ManifestNotFound(PathBuf),

    #[error("policy applied but {} could not be moved into place; the apply was rolled back: {source}", path.display())]
    PromoteFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("unable to list {}: {source}", path.display())]
    ListFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to run kubectl: {0:#}")]
    Spawn(anyhow::Error),
}

/// Staging subdirectory of the applied directory. Same filesystem, so
/// promotion is a plain rename.
pub const STAGING_DIR: &str = ".staging";

pub struct Executor<R> {
    runner: Arc<R>,
    kubectl: String,
    applied_dir: PathBuf,
}

impl<R: CommandRunner> Executor<R> {
    pub fn new(runner: Arc<R>, kubectl: impl Into<String>, applied_dir: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            kubectl: kubectl.into(),
            applied_dir: applied_dir.into(),
        }
    }

    #[must_use]
    pub fn staging_dir(&self) -> PathBuf {
        self.applied_dir.join(STAGING_DIR)
    }

    /// Apply a staged manifest, then promote it into the applied directory.
    ///
    /// A rejected apply removes the staged file. A failed promotion deletes
    /// the policy from the cluster again before reporting the error, so no
    /// policy is left running without its manifest.
    pub async fn deploy(&self, staged: &Path) -> Result<PathBuf, ExecError> {
        if let Err(e) = self.apply(staged).await {
            discard(staged).await;
            return Err(e);
        }

        let file_name = staged.file_name().unwrap_or_default();
        let target = self.applied_dir.join(file_name);
        match tokio::fs::rename(staged, &target).await {
            Ok(()) => Ok(target),
            Err(source) => {
                tracing::error!(
                    manifest = %staged.display(),
                    error = %source,
                    "failed to promote applied manifest, rolling back",
                );
                self.rollback(staged).await;
                discard(staged).await;
                Err(ExecError::PromoteFailed {
                    path: target,
                    source,
                })
            }
        }
    }

    async fn rollback(&self, staged: &Path) {
        let path = staged.to_string_lossy();
        match self.runner.run(&self.kubectl, &["delete", "-f", &path]).await {
            Ok(out) if out.status.success() => {}
            Ok(out) => {
                tracing::error!(manifest = %path, output = %combined_output(&out), "rollback delete failed");
            }
            Err(e) => tracing::error!(manifest = %path, error = %e, "rollback delete failed"),
        }
    }

    /// `kubectl apply -f <manifest>`; returns the combined output.
    pub async fn apply(&self, manifest: &Path) -> Result<String, ExecError> {
        let path = manifest.to_string_lossy();
        let out = self
            .runner
            .run(&self.kubectl, &["apply", "-f", &path])
            .await
            .map_err(ExecError::Spawn)?;
        let text = combined_output(&out);
        if !out.status.success() {
            tracing::warn!(manifest = %path, output = %text, "kubectl apply failed");
            return Err(ExecError::ApplyFailed { output: text });
        }
        tracing::info!(manifest = %path, "policy applied");
        Ok(text)
    }

    /// `kubectl delete -f <manifest>`, then remove the file.
    ///
    /// A failed remote delete keeps the file so the removal can be retried.
    /// A successful remote delete whose file cannot be removed still fails.
    pub async fn delete(&self, name: &str) -> Result<String, ExecError> {
        let path = self.manifest_path(name)?;
        if !path.is_file() {
            return Err(ExecError::ManifestNotFound(path));
        }

        let path_str = path.to_string_lossy();
        let out = self
            .runner
            .run(&self.kubectl, &["delete", "-f", &path_str])
            .await
            .map_err(ExecError::Spawn)?;
        let text = combined_output(&out);
        if !out.status.success() {
            tracing::warn!(manifest = %path_str, output = %text, "kubectl delete failed");
            return Err(ExecError::DeleteFailed { output: text });
        }

        tokio::fs::remove_file(&path)
            .await
            .map_err(|e| ExecError::LocalCleanupFailed {
                path: path.clone(),
                source: e,
            })?;
        tracing::info!(manifest = %path_str, "policy deleted");
        Ok(text)
    }

    /// Resolve a bare manifest file name inside the applied directory.
    pub fn manifest_path(&self, name: &str) -> Result<PathBuf, ExecError> {
        validate_manifest_name(name).map_err(|reason| ExecError::InvalidManifestName {
            name: name.to_string(),
            reason,
        })?;
        Ok(self.applied_dir.join(name))
    }

    /// Every manifest currently in the applied directory with its age,
    /// sorted by name. A missing directory means nothing has been applied yet.
    pub async fn applied(&self) -> Result<Vec<AppliedManifest>, ExecError> {
        let mut entries = match tokio::fs::read_dir(&self.applied_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(ExecError::ListFailed {
                    path: self.applied_dir.clone(),
                    source: e,
                });
            }
        };

        let now = SystemTime::now();
        let mut manifests = Vec::new();
        loop {
            let entry = entries.next_entry().await.map_err(|e| ExecError::ListFailed {
                path: self.applied_dir.clone(),
                source: e,
            })?;
            let Some(entry) = entry else { break };
            let name = entry.file_name().to_string_lossy().into_owned();
            if !name.ends_with(".yaml") {
                continue;
            }
            // Unreadable mtime reads as age 0, which keeps the manifest out of any sweep.
            let age_secs = entry
                .metadata()
                .await
                .and_then(|m| m.modified())
                .ok()
                .and_then(|modified| now.duration_since(modified).ok())
                .map_or(0, |age| age.as_secs());
            manifests.push(AppliedManifest::new(name, age_secs));
        }
        manifests.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(manifests)
    }
}

async fn discard(staged: &Path) {
    if let Err(e) = tokio::fs::remove_file(staged).await {
        tracing::warn!(path = %staged.display(), error = %e, "failed to remove staged manifest");
    }
}
