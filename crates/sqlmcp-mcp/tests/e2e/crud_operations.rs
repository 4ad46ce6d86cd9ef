//! CRUD operations tests.
//!
//! Tests connect_database and the create/read/update/delete round trip.

use super::common::*;
use serde_json::json;

// =============================================================================
// FULL SCENARIO
// =============================================================================

pub async fn test_connect_and_crud_cycle(ctx: &TestContext) {
    println!("  🧪 test_connect_and_crud_cycle");

    let path = create_database(
        ctx.dir.path(),
        "t.db",
        "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT);",
    );
    let path = path.to_string_lossy().into_owned();

    let connected = payload(&ctx.call("connect_database", json!({"db_path": path})).await);
    assert_eq!(connected["success"], true);
    assert_eq!(connected["tables_found"], 1);
    assert_eq!(connected["tables"], json!(["users"]));

    // Bound database is used when db_path is omitted.
    let created = ctx
        .call("create", json!({"table": "users", "data": {"id": 1, "name": "a"}}))
        .await;
    assert_success(&created, "create");
    let created = payload(&created);
    assert_eq!(created["inserted_id"], 1);
    assert_eq!(created["affected_rows"], 1);

    let read = payload(
        &ctx.call("read", json!({"table": "users", "where": {"id": 1}}))
            .await,
    );
    assert_eq!(read["row_count"], 1);
    assert_eq!(read["data"], json!([{"id": 1, "name": "a"}]));

    let updated = payload(
        &ctx.call(
            "update",
            json!({"table": "users", "data": {"name": "b"}, "where": {"id": 1}}),
        )
        .await,
    );
    assert_eq!(updated["affected_rows"], 1);

    let deleted = payload(
        &ctx.call("delete", json!({"table": "users", "where": {"id": 1}}))
            .await,
    );
    assert_eq!(deleted["affected_rows"], 1);

    let read = payload(
        &ctx.call("read", json!({"table": "users", "where": {"id": 1}}))
            .await,
    );
    assert_eq!(read["row_count"], 0);

    println!("     ✓ connect → create → read → update → delete → read");
}

// =============================================================================
// EDGE CASES
// =============================================================================

pub async fn test_update_without_match(ctx: &TestContext) {
    println!("  🧪 test_update_without_match");

    let updated = ctx
        .call_ok(
            "update",
            json!({"table": "products", "data": {"stock": 0}, "where": {"id": 999}}),
        )
        .await;
    assert_eq!(updated["success"], true);
    assert_eq!(updated["affected_rows"], 0);

    println!("     ✓ Unmatched update reports zero rows");
}

pub async fn test_delete_requires_where(ctx: &TestContext) {
    println!("  🧪 test_delete_requires_where");

    let result = ctx
        .call(
            "delete",
            json!({"table": "orders", "where": {}, "db_path": ctx.shop_path()}),
        )
        .await;
    assert_failure(&result, "delete with empty where");
    assert_eq!(
        result_text(&result),
        "Error executing tool delete: table and where are required"
    );

    let count = ctx
        .call_ok("query", json!({"sql": "SELECT COUNT(*) AS n FROM orders"}))
        .await;
    assert_eq!(count["data"][0]["n"], 3);

    println!("     ✓ Empty where refused, no rows removed");
}

pub async fn test_values_never_reach_sql_text(ctx: &TestContext) {
    println!("  🧪 test_values_never_reach_sql_text");

    let hostile = "Robert'); DROP TABLE customers;--";
    let created = ctx
        .call_ok(
            "create",
            json!({"table": "customers", "data": {"name": hostile, "city": "Nowhere"}}),
        )
        .await;
    assert_eq!(created["affected_rows"], 1);

    let read = ctx
        .call_ok("read", json!({"table": "customers", "where": {"name": hostile}}))
        .await;
    assert_eq!(read["row_count"], 1);
    assert_eq!(read["data"][0]["name"], hostile);
    assert_eq!(read["query"], "SELECT * FROM customers WHERE name = ?");

    ctx.call_ok("delete", json!({"table": "customers", "where": {"name": hostile}}))
        .await;

    println!("     ✓ Hostile values stored and matched as plain data");
}

pub async fn test_constraint_violation_is_tool_error(ctx: &TestContext) {
    println!("  🧪 test_constraint_violation_is_tool_error");

    let result = ctx
        .call(
            "create",
            json!({
                "table": "orders",
                "data": {"customer_id": 404, "product_id": 1, "quantity": 1},
                "db_path": ctx.shop_path()
            }),
        )
        .await;
    assert_failure(&result, "foreign key violation");
    assert!(result_text(&result).contains("FOREIGN KEY constraint failed"));

    println!("     ✓ Foreign keys enforced on every handle");
}

pub async fn run_all_tests(ctx: &TestContext) {
    println!("\n📦 CRUD Operations Tests");
    test_connect_and_crud_cycle(ctx).await;
    test_update_without_match(ctx).await;
    test_delete_requires_where(ctx).await;
    test_values_never_reach_sql_text(ctx).await;
    test_constraint_violation_is_tool_error(ctx).await;
}
