//! Limits tests.
//!
//! Tests row truncation, the query deadline, the safety screen and
//! per-call database selection.

use super::common::*;
use serde_json::json;
use sqlmcp_core::LimitsConfig;

const RUNAWAY_QUERY: &str = "SELECT COUNT(*) FROM (WITH RECURSIVE c(x) AS \
                             (SELECT 1 UNION ALL SELECT x + 1 FROM c) SELECT x FROM c)";

pub async fn test_truncation(_ctx: &TestContext) {
    println!("  🧪 test_truncation");

    let ctx = TestContext::setup_with(LimitsConfig {
        max_result_rows: 2,
        ..LimitsConfig::default()
    })
    .await;

    let rows = ctx
        .call_ok("query", json!({"sql": "SELECT * FROM customers"}))
        .await;
    assert_eq!(rows["row_count"], 2);
    assert_eq!(rows["truncated"], true);

    let read = ctx.call_ok("read", json!({"table": "products"})).await;
    assert_eq!(read["row_count"], 2);
    assert_eq!(read["truncated"], true);

    println!("     ✓ Results capped at max_result_rows");
}

pub async fn test_timeout_releases_handle(_ctx: &TestContext) {
    println!("  🧪 test_timeout_releases_handle");

    let ctx = TestContext::setup_with(LimitsConfig {
        max_query_time_secs: 1,
        ..LimitsConfig::default()
    })
    .await;

    let result = ctx
        .call(
            "query",
            json!({"sql": RUNAWAY_QUERY, "db_path": ctx.shop_path()}),
        )
        .await;
    assert_failure(&result, "runaway query");
    assert_eq!(
        result_text(&result),
        "Error executing tool query: Query timeout after 1 seconds"
    );

    // A write right after the timeout must not find the database locked.
    let created = ctx
        .call_ok(
            "create",
            json!({"table": "products", "data": {"title": "Cable", "price": 5.0}}),
        )
        .await;
    assert_eq!(created["affected_rows"], 1);

    println!("     ✓ Timed-out handle released, next write succeeds");
}

pub async fn test_safety_screen(ctx: &TestContext) {
    println!("  🧪 test_safety_screen");

    for sql in [
        "PRAGMA journal_mode",
        "SELECT * FROM customers;-- trailing",
        "SELECT name FROM customers UNION SELECT title FROM products",
        "SELECT /* comment */ 1",
    ] {
        let result = ctx
            .call("query", json!({"sql": sql, "db_path": ctx.shop_path()}))
            .await;
        assert_failure(&result, sql);
        assert_eq!(
            result_text(&result),
            "Error executing tool query: Potentially dangerous SQL query rejected"
        );
    }

    let allowed = ctx
        .call_ok(
            "query",
            json!({"sql": "SELECT name FROM customers WHERE city = ?", "params": ["New York"]}),
        )
        .await;
    assert_eq!(allowed["data"][0]["name"], "Grace Hopper");

    println!("     ✓ Blocked patterns rejected, plain SELECT allowed");
}

pub async fn test_db_path_override(ctx: &TestContext) {
    println!("  🧪 test_db_path_override");

    // The bound database is t.db; an explicit path wins for one call only.
    let tables = ctx.call_ok("get_tables", json!({})).await;
    assert_eq!(tables["count"], 3);

    let bound = payload(&ctx.call("get_tables", json!({})).await);
    assert_eq!(bound["tables"][0]["name"], "users");

    let missing = ctx
        .call("get_tables", json!({"db_path": "/definitely/not/here.db"}))
        .await;
    assert_failure(&missing, "missing file");
    assert!(result_text(&missing).contains("Database file not found"));

    println!("     ✓ Explicit db_path overrides the bound database");
}

pub async fn run_all_tests(ctx: &TestContext) {
    println!("\n⏱️  Limits Tests");
    test_truncation(ctx).await;
    test_timeout_releases_handle(ctx).await;
    test_safety_screen(ctx).await;
    test_db_path_override(ctx).await;
}
