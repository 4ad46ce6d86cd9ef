//! CLI command implementations for the sqlmcp server.

pub mod serve;
pub mod tools;
