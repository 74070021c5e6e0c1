pub mod routes;
pub mod types;

pub use routes::{
    agent_url, delete_policy_path, liveness, namespace_resources_path, paths, placeholders,
    validate_manifest_name,
};
pub use types::*;
