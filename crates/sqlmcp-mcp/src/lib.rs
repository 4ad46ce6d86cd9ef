//! # sqlmcp-mcp
//!
//! MCP (Model Context Protocol) server that exposes SQLite databases to AI
//! agents as a fixed set of ten tools, spoken as JSON-RPC 2.0 over HTTP.
//!
//! ## Architecture
//!
//! ```text
//! AI Agent (Claude, GPT, etc.)
//!       │
//!       │ POST / (initialize, tools/list, tools/call)
//!       ▼
//! ┌──────────────────────┐
//! │  http_transport      │  axum router, body limit, CORS
//! │  server (envelope)   │  init gate, stats, error codes
//! │  dispatcher          │  typed args → ToolResult
//! │  statement + safety  │  bind-only SQL plans
//! │  database            │  per-call handle, pragmas
//! │  engine              │  execute, truncate, watchdog
//! └──────────┬───────────┘
//!            │
//!            ▼
//!      SQLite database file
//! ```
//!
//! ## Tools
//!
//! | Tool | Description |
//! |------|-------------|
//! | `connect_database` | Bind a database file for later calls |
//! | `query` | Run freeform SQL, screened by [`safety::is_safe`] |
//! | `get_tables` | List tables and views |
//! | `get_schema` | Columns, foreign keys and indexes of a table |
//! | `create` / `read` / `update` / `delete` | Parameterized CRUD |
//! | `analyze_table` | Row count, sample rows, numeric column statistics |
//! | `search_data` | `LIKE` search across text columns |
//!
//! Every tool accepts an optional `db_path` that overrides the bound database
//! for that call only.
//!
//! ## Example Usage
//!
//! ```ignore
//! use sqlmcp_core::ServerConfig;
//! use sqlmcp_mcp::{HttpServer, McpServer};
//! use std::sync::Arc;
//!
//! let config = ServerConfig::default();
//! let server = Arc::new(McpServer::new(config.limits.clone()));
//! server.provider().bind("data/app.db")?;
//!
//! HttpServer::new(config.http.clone(), server).run().await?;
//! ```

pub mod catalog;
pub mod database;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod http_transport;
pub mod protocol;
pub mod safety;
pub mod server;
pub mod statement;
pub mod stats;

pub use catalog::ToolName;
pub use database::{DatabaseProvider, ScopedHandle};
pub use dispatcher::ToolDispatcher;
pub use error::{McpError, ToolError};
pub use http_transport::{HttpServer, create_router};
pub use protocol::{JsonRpcRequest, JsonRpcResponse, ToolDefinition, ToolResult};
pub use server::McpServer;
pub use stats::ServerStats;
