//! Application layer: port traits and use-case services.
//!
//! Services receive every dependency as an `&impl Port` argument; nothing in
//! here names an infrastructure type.

pub mod ports;
pub mod services;
