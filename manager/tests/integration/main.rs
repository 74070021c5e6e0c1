//! Integration tests for the kwarden manager
//!
//! These tests talk to real SQLite files, real HTTP servers bound to
//! loopback, and the compiled `kwarden` binary.

mod gateway;
mod sqlite_store;
