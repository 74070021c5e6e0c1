//! Application service: the policy template catalog.

use uuid::Uuid;

use crate::application::ports::TemplateCatalog;
use crate::domain::{PolicyTemplate, StoreError};

/// Fields supplied when adding a template; the id is generated.
#[derive(Debug, Clone)]
pub struct NewTemplate {
    pub title: String,
    pub description: String,
    pub policy_type: String,
    pub template_file_path: String,
}

/// # Errors
///
/// Fails when the title or template path is blank, or the store rejects
/// the insert.
pub async fn add_template(
    catalog: &impl TemplateCatalog,
    new: NewTemplate,
) -> anyhow::Result<PolicyTemplate> {
    anyhow::ensure!(!new.title.trim().is_empty(), "template title must not be empty");
    anyhow::ensure!(
        !new.template_file_path.trim().is_empty(),
        "template file path must not be empty"
    );

    let template = PolicyTemplate {
        id: Uuid::new_v4().to_string(),
        title: new.title.trim().to_string(),
        description: new.description,
        policy_type: new.policy_type,
        template_file_path: new.template_file_path.trim().to_string(),
    };
    catalog.insert_template(&template).await?;
    tracing::info!(template_id = %template.id, title = %template.title, "template added");
    Ok(template)
}

/// # Errors
///
/// Returns an error if the catalog cannot be read.
pub async fn list_templates(catalog: &impl TemplateCatalog) -> Result<Vec<PolicyTemplate>, StoreError> {
    catalog.list_templates().await
}
