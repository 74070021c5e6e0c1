//! Application services (use-cases).

pub mod catalog;
pub mod cluster_info;
pub mod cluster_registry;
pub mod liveness;
pub mod policy_lifecycle;
