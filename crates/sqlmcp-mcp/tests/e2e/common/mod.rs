//! Shared test infrastructure for sqlmcp end-to-end tests.
//!
//! This module provides:
//! - Temporary SQLite database fixtures
//! - A server wrapper that speaks JSON-RPC through the full envelope
//! - Helper functions for test assertions

use rusqlite::Connection;
use serde_json::{Value, json};
use sqlmcp_core::LimitsConfig;
use sqlmcp_mcp::{JsonRpcRequest, JsonRpcResponse, McpServer};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, Ordering};
use tempfile::TempDir;

// =============================================================================
// FIXTURES
// =============================================================================

/// Schema and seed rows for the shop fixture.
pub const SHOP_SCHEMA: &str = "
    CREATE TABLE customers (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL,
        email VARCHAR(120) UNIQUE,
        city TEXT
    );
    CREATE TABLE products (
        id INTEGER PRIMARY KEY,
        title TEXT NOT NULL,
        price REAL NOT NULL,
        stock INTEGER DEFAULT 0
    );
    CREATE TABLE orders (
        id INTEGER PRIMARY KEY,
        customer_id INTEGER NOT NULL REFERENCES customers(id),
        product_id INTEGER NOT NULL REFERENCES products(id),
        quantity INTEGER NOT NULL
    );
    INSERT INTO customers (name, email, city) VALUES
        ('Ada Lovelace', 'ada@example.com', 'London'),
        ('Grace Hopper', 'grace@example.com', 'New York'),
        ('Alan Turing', 'alan@example.org', 'London');
    INSERT INTO products (title, price, stock) VALUES
        ('Keyboard', 49.5, 10),
        ('Mouse', 19.99, 25),
        ('Monitor', 199.0, 3);
    INSERT INTO orders (customer_id, product_id, quantity) VALUES
        (1, 1, 1), (1, 2, 2), (2, 3, 1);
";

/// Create a database file in `dir` and run `schema` against it.
pub fn create_database(dir: &Path, name: &str, schema: &str) -> PathBuf {
    let path = dir.join(name);
    let conn = Connection::open(&path).expect("create database");
    conn.execute_batch(schema).expect("apply schema");
    path
}

// =============================================================================
// TEST CONTEXT
// =============================================================================

pub struct TestContext {
    pub dir: TempDir,
    pub shop: PathBuf,
    pub server: McpServer,
    next_id: AtomicI64,
}

impl TestContext {
    /// A server with default limits and an initialized session.
    pub async fn setup() -> Self {
        Self::setup_with(LimitsConfig::default()).await
    }

    pub async fn setup_with(limits: LimitsConfig) -> Self {
        let dir = TempDir::new().expect("temp dir");
        let shop = create_database(dir.path(), "shop.db", SHOP_SCHEMA);
        let ctx = Self {
            dir,
            shop,
            server: McpServer::new(limits),
            next_id: AtomicI64::new(1),
        };

        let response = ctx
            .rpc(
                "initialize",
                Some(json!({
                    "protocolVersion": "2025-03-26",
                    "clientInfo": {"name": "e2e", "version": "0"}
                })),
            )
            .await;
        assert!(!response.is_error(), "initialize failed: {:?}", response.error);
        ctx
    }

    pub fn shop_path(&self) -> String {
        self.shop.to_string_lossy().into_owned()
    }

    /// Send one JSON-RPC request.
    pub async fn rpc(&self, method: &str, params: Option<Value>) -> JsonRpcResponse {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.server
            .handle_request(JsonRpcRequest::new(id, method, params))
            .await
    }

    /// Call a tool and return the `tools/call` result object.
    pub async fn call(&self, tool: &str, arguments: Value) -> Value {
        let response = self
            .rpc(
                "tools/call",
                Some(json!({"name": tool, "arguments": arguments})),
            )
            .await;
        assert!(
            !response.is_error(),
            "tools/call {} returned protocol error: {:?}",
            tool,
            response.error
        );
        response.result.expect("result")
    }

    /// Call a tool against the shop database and parse its payload.
    pub async fn call_ok(&self, tool: &str, mut arguments: Value) -> Value {
        if let Some(map) = arguments.as_object_mut() {
            map.entry("db_path").or_insert_with(|| json!(self.shop_path()));
        }
        let result = self.call(tool, arguments).await;
        assert_success(&result, tool);
        payload(&result)
    }
}

// =============================================================================
// ASSERTIONS
// =============================================================================

/// Text of the first content item.
pub fn result_text(result: &Value) -> &str {
    result["content"][0]["text"].as_str().unwrap_or_default()
}

/// Parse the JSON payload of a successful tool result.
pub fn payload(result: &Value) -> Value {
    serde_json::from_str(result_text(result)).expect("tool payload is JSON")
}

pub fn assert_success(result: &Value, msg: &str) {
    assert_eq!(
        result["isError"], false,
        "{}: expected success, got: {}",
        msg,
        result_text(result)
    );
}

pub fn assert_failure(result: &Value, msg: &str) {
    assert_eq!(
        result["isError"], true,
        "{}: expected failure, got: {}",
        msg,
        result_text(result)
    );
}
