//! Domain layer: pure types, validators and error enums.
//!
//! Nothing in here performs I/O. Infrastructure and application code depend
//! on this module, never the other way round.

pub mod cluster;
pub mod config;
pub mod error;
pub mod host;
pub mod policy;
pub mod reconcile;

pub use cluster::{Cluster, NewCluster};
pub use error::{ConfigError, GatewayError, LifecycleError, RegistryError, StoreError};
pub use host::HostRecord;
pub use policy::{Audit, ImplementedPolicy, PolicyTemplate};
pub use reconcile::ReconcileReport;
