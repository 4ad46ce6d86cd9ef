//! Introspection tests.
//!
//! Tests get_tables, get_schema, analyze_table and search_data.

use super::common::*;
use serde_json::json;

pub async fn test_get_tables(ctx: &TestContext) {
    println!("  🧪 test_get_tables");

    let tables = ctx.call_ok("get_tables", json!({})).await;
    assert_eq!(tables["count"], 3);

    let names: Vec<&str> = tables["tables"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["customers", "orders", "products"]);
    assert!(
        tables["tables"][0]["sql"]
            .as_str()
            .unwrap()
            .starts_with("CREATE TABLE customers")
    );

    println!("     ✓ Tables listed by name with DDL");
}

pub async fn test_get_schema_is_stable(ctx: &TestContext) {
    println!("  🧪 test_get_schema_is_stable");

    let first = ctx.call_ok("get_schema", json!({"table": "orders"})).await;
    let second = ctx.call_ok("get_schema", json!({"table": "orders"})).await;
    assert_eq!(first, second);

    let columns = first["columns"].as_array().unwrap();
    assert_eq!(columns.len(), 4);
    assert_eq!(columns[1]["name"], "customer_id");
    assert_eq!(columns[1]["notnull"], true);

    let fks = first["foreign_keys"].as_array().unwrap();
    assert_eq!(fks.len(), 2);
    let targets: Vec<&str> = fks.iter().map(|fk| fk["table"].as_str().unwrap()).collect();
    assert!(targets.contains(&"customers"));
    assert!(targets.contains(&"products"));

    let customers = ctx.call_ok("get_schema", json!({"table": "customers"})).await;
    let indexes = customers["indexes"].as_array().unwrap();
    assert_eq!(indexes.len(), 1);
    assert_eq!(indexes[0]["unique"], true);
    assert_eq!(indexes[0]["origin"], "u");

    println!("     ✓ Columns, foreign keys and indexes reported identically twice");
}

pub async fn test_get_schema_unknown_table(ctx: &TestContext) {
    println!("  🧪 test_get_schema_unknown_table");

    let schema = ctx.call_ok("get_schema", json!({"table": "nope"})).await;
    assert_eq!(schema["table"], "nope");
    assert_eq!(schema["columns"], json!([]));
    assert_eq!(schema["foreign_keys"], json!([]));
    assert_eq!(schema["indexes"], json!([]));

    println!("     ✓ Unknown table reports empty column lists");
}

pub async fn test_analyze_table(ctx: &TestContext) {
    println!("  🧪 test_analyze_table");

    let analysis = ctx
        .call_ok("analyze_table", json!({"table": "products"}))
        .await;
    assert_eq!(analysis["row_count"], 3);
    assert_eq!(analysis["sample_data"].as_array().unwrap().len(), 3);

    let stats = &analysis["column_statistics"];
    assert_eq!(stats["price"]["min"], 19.99);
    assert_eq!(stats["price"]["max"], 199.0);
    assert_eq!(stats["price"]["avg"], 89.5);
    assert_eq!(stats["stock"]["avg"], 12.67);
    assert!(stats.get("title").is_none());

    println!("     ✓ Counts, samples and numeric statistics");
}

pub async fn test_search_data(ctx: &TestContext) {
    println!("  🧪 test_search_data");

    let found = ctx
        .call_ok("search_data", json!({"search_term": "london"}))
        .await;
    assert_eq!(found["matches_found"], 2);
    assert_eq!(found["results"]["customers"].as_array().unwrap().len(), 2);

    let scoped = ctx
        .call_ok(
            "search_data",
            json!({"search_term": "o", "tables": ["products"]}),
        )
        .await;
    let titles: Vec<&str> = scoped["results"]["products"]
        .as_array()
        .unwrap()
        .iter()
        .map(|row| row["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["Keyboard", "Mouse", "Monitor"]);
    assert!(scoped["results"].get("customers").is_none());

    let none = ctx
        .call_ok("search_data", json!({"search_term": "zzz-no-match"}))
        .await;
    assert_eq!(none["matches_found"], 0);
    assert_eq!(none["results"], json!({}));

    println!("     ✓ Text columns searched per table");
}

pub async fn run_all_tests(ctx: &TestContext) {
    println!("\n🔎 Introspection Tests");
    test_get_tables(ctx).await;
    test_get_schema_is_stable(ctx).await;
    test_get_schema_unknown_table(ctx).await;
    test_analyze_table(ctx).await;
    test_search_data(ctx).await;
}
