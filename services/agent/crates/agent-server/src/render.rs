//! Policy template rendering.
//!
//! A template is a manifest with three placeholder tokens. Each render call
//! mints a fresh uuid, so identical inputs always produce distinct files.

use std::io;
use std::path::{Path, PathBuf};

use kwarden_common::placeholders;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("policy template {} does not exist", .0.display())]
    TemplateNotFound(PathBuf),

    #[error("unable to read policy template {}: {source}", path.display())]
    TemplateUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{0} must not be empty")]
    EmptyField(&'static str),

    #[error("unable to write rendered policy under {}: {source}", path.display())]
    OutputDirUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// One concrete, rendered application of a template.
#[derive(Debug, Clone)]
pub struct RenderedPolicy {
    pub id: Uuid,
    pub namespace: String,
    pub app_label: String,
    pub path: PathBuf,
}

impl RenderedPolicy {
    /// File name relative to the applied directory, e.g. `<uuid>.yaml`.
    #[must_use]
    pub fn file_name(&self) -> String {
        format!("{}.yaml", self.id)
    }
}

#[derive(Debug, Clone)]
pub struct Renderer {
    templates_dir: PathBuf,
    output_dir: PathBuf,
}

impl Renderer {
    #[must_use]
    pub fn new(templates_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            templates_dir: templates_dir.into(),
            output_dir: output_dir.into(),
        }
    }

    /// Resolve a template reference. Absolute references are used as-is.
    #[must_use]
    pub fn template_path(&self, template_ref: &str) -> PathBuf {
        let candidate = Path::new(template_ref);
        if candidate.is_absolute() {
            candidate.to_path_buf()
        } else {
            self.templates_dir.join(candidate)
        }
    }

    /// Render `template_ref` for `namespace`/`app_label` into a new file.
    ///
    /// Nothing written before a failure is cleaned up.
    pub fn render(
        &self,
        template_ref: &str,
        namespace: &str,
        app_label: &str,
    ) -> Result<RenderedPolicy, RenderError> {
        if namespace.is_empty() {
            return Err(RenderError::EmptyField("namespace"));
        }
        if app_label.is_empty() {
            return Err(RenderError::EmptyField("app_label"));
        }

        let source = self.template_path(template_ref);
        if !source.is_file() {
            return Err(RenderError::TemplateNotFound(source));
        }

        std::fs::create_dir_all(&self.output_dir).map_err(|e| {
            RenderError::OutputDirUnavailable {
                path: self.output_dir.clone(),
                source: e,
            }
        })?;

        let body = std::fs::read_to_string(&source).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => RenderError::TemplateNotFound(source.clone()),
            _ => RenderError::TemplateUnreadable {
                path: source.clone(),
                source: e,
            },
        })?;

        let id = Uuid::new_v4();
        let rendered = substitute(&body, &id_fragment(&id), namespace, app_label);

        let policy = RenderedPolicy {
            id,
            namespace: namespace.to_string(),
            app_label: app_label.to_string(),
            path: PathBuf::new(),
        };
        let path = self.output_dir.join(policy.file_name());
        std::fs::write(&path, rendered).map_err(|e| RenderError::OutputDirUnavailable {
            path: path.clone(),
            source: e,
        })?;

        tracing::debug!(id = %id, path = %path.display(), "rendered policy");
        Ok(RenderedPolicy { path, ..policy })
    }
}

/// Last group of the hyphenated uuid: 12 lowercase hex chars, usable inside
/// Kubernetes object names.
#[must_use]
pub fn id_fragment(id: &Uuid) -> String {
    let hyphenated = id.hyphenated().to_string();
    hyphenated
        .rsplit('-')
        .next()
        .unwrap_or(&hyphenated)
        .to_string()
}

/// Replace every placeholder token in `body`.
#[must_use]
pub fn substitute(body: &str, id: &str, namespace: &str, app_label: &str) -> String {
    body.replace(placeholders::POLICY_ID, id)
        .replace(placeholders::NAMESPACE, namespace)
        .replace(placeholders::APP_LABEL, app_label)
}
