//! MCP server implementation.
//!
//! [`McpServer`] owns the per-instance state (initialization flag, request
//! counters, bound database) and routes JSON-RPC methods. It is shared
//! behind an `Arc` by the HTTP transport, so every method takes `&self`.

use crate::catalog::{self, ToolName};
use crate::database::DatabaseProvider;
use crate::dispatcher::ToolDispatcher;
use crate::error::McpError;
use crate::protocol::*;
use crate::stats::ServerStats;
use serde_json::{Value, json};
use sqlmcp_core::LimitsConfig;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// The MCP server.
#[derive(Debug)]
pub struct McpServer {
    dispatcher: ToolDispatcher,
    stats: ServerStats,
    initialized: AtomicBool,
}

impl McpServer {
    /// Create a server with no database bound.
    pub fn new(limits: LimitsConfig) -> Self {
        let provider = Arc::new(DatabaseProvider::new(limits.busy_timeout()));
        Self {
            dispatcher: ToolDispatcher::new(provider, limits),
            stats: ServerStats::new(),
            initialized: AtomicBool::new(false),
        }
    }

    /// The connection provider, e.g. to bind a database at startup.
    pub fn provider(&self) -> &Arc<DatabaseProvider> {
        self.dispatcher.provider()
    }

    /// Request counters.
    pub fn stats(&self) -> &ServerStats {
        &self.stats
    }

    /// Whether `initialize` has been received.
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    /// Handle a JSON-RPC request.
    pub async fn handle_request(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        self.stats.record_request();
        let id = request.id.clone();
        tracing::info!(method = %request.method, id = ?id, "MCP request");

        match self.route(request).await {
            Ok(result) => {
                self.stats.record_success();
                JsonRpcResponse::success(id, result)
            }
            Err(e) => {
                self.stats.record_failure();
                tracing::error!(code = e.code(), error = %e, "MCP error");
                JsonRpcResponse::from_error(id, &e)
            }
        }
    }

    async fn route(&self, request: JsonRpcRequest) -> Result<Value, McpError> {
        match request.method.as_str() {
            "initialize" => Ok(self.handle_initialize(request.params.as_ref())),
            "tools/list" => {
                self.require_initialized()?;
                Ok(self.handle_list_tools())
            }
            "tools/call" => {
                self.require_initialized()?;
                self.handle_call_tool(request.params).await
            }
            other => Err(McpError::MethodNotFound(other.to_string())),
        }
    }

    fn require_initialized(&self) -> Result<(), McpError> {
        if self.is_initialized() {
            Ok(())
        } else {
            Err(McpError::NotInitialized)
        }
    }

    fn handle_initialize(&self, params: Option<&Value>) -> Value {
        let client = params
            .and_then(|p| p.pointer("/clientInfo/name"))
            .and_then(Value::as_str)
            .unwrap_or("unknown");
        tracing::info!(client = %client, "Initializing MCP server");

        self.initialized.store(true, Ordering::SeqCst);

        json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {
                "tools": {
                    "listChanged": false
                }
            },
            "serverInfo": {
                "name": SERVER_NAME,
                "version": env!("CARGO_PKG_VERSION")
            }
        })
    }

    fn handle_list_tools(&self) -> Value {
        json!({ "tools": catalog::definitions() })
    }

    async fn handle_call_tool(&self, params: Option<Value>) -> Result<Value, McpError> {
        let params: CallToolParams = match params {
            Some(p) => serde_json::from_value(p)
                .map_err(|e| McpError::InvalidParams(format!("Invalid params: {}", e)))?,
            None => CallToolParams {
                name: None,
                arguments: None,
            },
        };

        let name = params
            .name
            .filter(|n| !n.is_empty())
            .ok_or_else(|| McpError::InvalidParams("Tool name is required".to_string()))?;
        let tool = ToolName::parse(&name).ok_or(McpError::UnknownTool(name))?;

        tracing::info!(tool = %tool, "Calling tool");
        let result = self
            .dispatcher
            .dispatch(tool, params.arguments.unwrap_or(Value::Null))
            .await;
        serde_json::to_value(result).map_err(|e| McpError::Internal(e.to_string()))
    }

    /// Health snapshot served at `GET /health`.
    pub fn health(&self) -> Value {
        json!({
            "success": true,
            "status": "healthy",
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "current_database": self.provider().current().map(|p| p.display().to_string()),
            "initialized": self.is_initialized(),
            "stats": self.stats.to_json(),
        })
    }
}
