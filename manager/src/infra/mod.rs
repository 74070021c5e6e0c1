//! Infrastructure layer: concrete port implementations.

pub mod config;
pub mod health;
pub mod http_client;
pub mod store;
