//! Protocol tests.
//!
//! Tests the initialization gate, JSON-RPC error codes and statistics.

use super::common::*;
use serde_json::json;
use sqlmcp_core::LimitsConfig;
use sqlmcp_mcp::{JsonRpcRequest, McpServer};

pub async fn test_not_initialized_gate(_ctx: &TestContext) {
    println!("  🧪 test_not_initialized_gate");

    let server = McpServer::new(LimitsConfig::default());
    let response = server
        .handle_request(JsonRpcRequest::new(1, "tools/list", None))
        .await;
    let error = response.error.expect("error");
    assert_eq!(error.code, -32002);

    let response = server
        .handle_request(JsonRpcRequest::new(2, "initialize", Some(json!({}))))
        .await;
    assert!(!response.is_error());

    let response = server
        .handle_request(JsonRpcRequest::new(3, "tools/list", None))
        .await;
    assert!(!response.is_error());

    println!("     ✓ tools/list refused until initialize");
}

pub async fn test_tool_call_gate(ctx: &TestContext) {
    println!("  🧪 test_tool_call_gate");

    let server = McpServer::new(LimitsConfig::default());
    let call = json!({
        "name": "get_tables",
        "arguments": {"db_path": ctx.shop_path()}
    });

    let response = server
        .handle_request(JsonRpcRequest::new(1, "tools/call", Some(call.clone())))
        .await;
    let error = response.error.expect("error");
    assert_eq!(error.code, -32002);
    assert_eq!(error.message, "Server not initialized");

    let response = server
        .handle_request(JsonRpcRequest::new(2, "initialize", Some(json!({}))))
        .await;
    assert!(!response.is_error());

    let response = server
        .handle_request(JsonRpcRequest::new(3, "tools/call", Some(call)))
        .await;
    let result = response.result.expect("result");
    assert_success(&result, "tools/call after initialize");
    assert_eq!(payload(&result)["count"], 3);

    println!("     ✓ tools/call refused until initialize, then succeeds");
}

pub async fn test_tool_catalog(ctx: &TestContext) {
    println!("  🧪 test_tool_catalog");

    let response = ctx.rpc("tools/list", None).await;
    let result = response.result.expect("result");
    let tools = result["tools"].as_array().unwrap();
    assert_eq!(tools.len(), 10);
    for tool in tools {
        assert!(tool["name"].is_string());
        assert_eq!(tool["inputSchema"]["type"], "object");
    }

    println!("     ✓ Ten tools with input schemas");
}

pub async fn test_error_codes(ctx: &TestContext) {
    println!("  🧪 test_error_codes");

    let unknown_method = ctx.rpc("prompts/list", None).await;
    assert_eq!(unknown_method.error.unwrap().code, -32601);

    let unknown_tool = ctx
        .rpc("tools/call", Some(json!({"name": "drop_all"})))
        .await;
    let error = unknown_tool.error.unwrap();
    assert_eq!(error.code, -32601);
    assert_eq!(error.message, "Unknown tool: drop_all");

    let missing_name = ctx
        .rpc("tools/call", Some(json!({"arguments": {}})))
        .await;
    let error = missing_name.error.unwrap();
    assert_eq!(error.code, -32602);
    assert_eq!(error.message, "Tool name is required");

    println!("     ✓ -32601 and -32602 at the protocol level");
}

pub async fn test_ids_are_echoed(ctx: &TestContext) {
    println!("  🧪 test_ids_are_echoed");

    let response = ctx
        .server
        .handle_request(JsonRpcRequest::new("req-abc", "tools/list", None))
        .await;
    assert_eq!(response.id, Some(json!("req-abc")));

    println!("     ✓ Request id returned unchanged");
}

pub async fn test_stats_add_up(ctx: &TestContext) {
    println!("  🧪 test_stats_add_up");

    let stats = ctx.server.stats();
    assert!(stats.total_requests() > 0);
    assert_eq!(
        stats.total_requests(),
        stats.successful_requests() + stats.failed_requests()
    );

    let health = ctx.server.health();
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["initialized"], true);
    assert!(
        health["current_database"]
            .as_str()
            .unwrap()
            .ends_with("t.db")
    );

    println!("     ✓ Every request counted once");
}

pub async fn run_all_tests(ctx: &TestContext) {
    println!("\n📡 Protocol Tests");
    test_not_initialized_gate(ctx).await;
    test_tool_call_gate(ctx).await;
    test_tool_catalog(ctx).await;
    test_error_codes(ctx).await;
    test_ids_are_echoed(ctx).await;
    test_stats_add_up(ctx).await;
}
