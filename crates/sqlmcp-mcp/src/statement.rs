//! Parameterized statement construction.
//!
//! Every value that comes from the caller is pushed onto the bind list of a
//! [`StatementPlan`]; only identifiers (table and column names) and the raw
//! `order_by` clause of `read` are written into the SQL text. SQLite cannot
//! bind identifiers, so those remain the injection surface of this module.

use crate::error::ToolError;
use rusqlite::types::Value as SqlValue;
use serde_json::{Map, Value};

/// Rows returned per table by `search_data`.
pub const SEARCH_LIMIT_PER_TABLE: i64 = 10;

/// Rows sampled by `analyze_table`.
pub const ANALYZE_SAMPLE_ROWS: i64 = 5;

/// Declared column types treated as numeric by `analyze_table`.
const NUMERIC_TYPES: &[&str] = &["INTEGER", "REAL", "NUMERIC"];

/// Declared column types searched by `search_data`.
const TEXT_TYPES: &[&str] = &["TEXT", "VARCHAR", "CHAR"];

/// SQL text plus its ordered bind values.
#[derive(Debug, Clone, PartialEq)]
pub struct StatementPlan {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

impl StatementPlan {
    /// A plan with no bind values.
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    /// A plan with bind values.
    pub fn with_params(sql: impl Into<String>, params: Vec<SqlValue>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }
}

/// Convert a JSON value to an SQLite bind value.
pub fn to_sql_value(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => SqlValue::Real(n.as_f64().unwrap_or(f64::NAN)),
        },
        Value::String(s) => SqlValue::Text(s.clone()),
        Value::Array(_) | Value::Object(_) => SqlValue::Text(value.to_string()),
    }
}

/// `col1 = ? AND col2 = ?`, pushing one bind per condition.
fn equality_conditions(filter: &Map<String, Value>, params: &mut Vec<SqlValue>) -> String {
    let mut clauses = Vec::with_capacity(filter.len());
    for (column, value) in filter {
        clauses.push(format!("{} = ?", column));
        params.push(to_sql_value(value));
    }
    clauses.join(" AND ")
}

/// `SELECT * FROM <table>` with optional filter, ordering and paging.
pub fn select(
    table: &str,
    filter: &Map<String, Value>,
    order_by: Option<&str>,
    limit: Option<u64>,
    offset: Option<u64>,
) -> StatementPlan {
    let mut sql = format!("SELECT * FROM {}", table);
    let mut params = Vec::new();

    if !filter.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&equality_conditions(filter, &mut params));
    }

    if let Some(order_by) = order_by.filter(|o| !o.trim().is_empty()) {
        sql.push_str(" ORDER BY ");
        sql.push_str(order_by);
    }

    if let Some(limit) = limit.filter(|l| *l > 0) {
        sql.push_str(" LIMIT ?");
        params.push(SqlValue::Integer(clamp_i64(limit)));
        if let Some(offset) = offset.filter(|o| *o > 0) {
            sql.push_str(" OFFSET ?");
            params.push(SqlValue::Integer(clamp_i64(offset)));
        }
    }

    StatementPlan::with_params(sql, params)
}

/// `INSERT INTO <table> (<cols>) VALUES (?, ...)`.
pub fn insert(table: &str, data: &Map<String, Value>) -> Result<StatementPlan, ToolError> {
    if data.is_empty() {
        return Err(ToolError::invalid("table and data are required"));
    }

    let columns: Vec<&str> = data.keys().map(String::as_str).collect();
    let placeholders = vec!["?"; columns.len()];
    let params = data.values().map(to_sql_value).collect();

    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        table,
        columns.join(", "),
        placeholders.join(", ")
    );
    Ok(StatementPlan::with_params(sql, params))
}

/// `UPDATE <table> SET ... WHERE ...`. Binds set-values, then where-values.
pub fn update(
    table: &str,
    data: &Map<String, Value>,
    filter: &Map<String, Value>,
) -> Result<StatementPlan, ToolError> {
    if data.is_empty() || filter.is_empty() {
        return Err(ToolError::invalid("table, data, and where are required"));
    }

    let mut params = Vec::with_capacity(data.len() + filter.len());
    let set_clauses: Vec<String> = data
        .iter()
        .map(|(column, value)| {
            params.push(to_sql_value(value));
            format!("{} = ?", column)
        })
        .collect();
    let where_clause = equality_conditions(filter, &mut params);

    let sql = format!(
        "UPDATE {} SET {} WHERE {}",
        table,
        set_clauses.join(", "),
        where_clause
    );
    Ok(StatementPlan::with_params(sql, params))
}

/// `DELETE FROM <table> WHERE ...`. An empty filter is refused.
pub fn delete(table: &str, filter: &Map<String, Value>) -> Result<StatementPlan, ToolError> {
    if filter.is_empty() {
        return Err(ToolError::invalid("table and where are required"));
    }

    let mut params = Vec::with_capacity(filter.len());
    let where_clause = equality_conditions(filter, &mut params);
    let sql = format!("DELETE FROM {} WHERE {}", table, where_clause);
    Ok(StatementPlan::with_params(sql, params))
}

/// Names of all tables.
pub fn table_names() -> StatementPlan {
    StatementPlan::new("SELECT name FROM sqlite_master WHERE type = 'table'")
}

/// Tables and views with their DDL, ordered by name.
pub fn tables_and_views() -> StatementPlan {
    StatementPlan::new(
        "SELECT name, type, sql FROM sqlite_master WHERE type IN ('table', 'view') ORDER BY name",
    )
}

/// Column metadata: cid, name, type, notnull, dflt_value, pk.
pub fn table_info(table: &str) -> StatementPlan {
    StatementPlan::with_params(
        "SELECT cid, name, type, \"notnull\", dflt_value, pk FROM pragma_table_info(?)",
        vec![SqlValue::Text(table.to_string())],
    )
}

/// Foreign keys: id, seq, table, from, to, on_update, on_delete, match.
pub fn foreign_key_list(table: &str) -> StatementPlan {
    StatementPlan::with_params(
        "SELECT id, seq, \"table\", \"from\", \"to\", on_update, on_delete, \"match\" \
         FROM pragma_foreign_key_list(?)",
        vec![SqlValue::Text(table.to_string())],
    )
}

/// Indexes: seq, name, unique, origin, partial.
pub fn index_list(table: &str) -> StatementPlan {
    StatementPlan::with_params(
        "SELECT seq, name, \"unique\", origin, partial FROM pragma_index_list(?)",
        vec![SqlValue::Text(table.to_string())],
    )
}

/// `SELECT COUNT(*) FROM <table>`.
pub fn count(table: &str) -> StatementPlan {
    StatementPlan::new(format!("SELECT COUNT(*) FROM {}", table))
}

/// First few rows of a table.
pub fn sample(table: &str) -> StatementPlan {
    StatementPlan::with_params(
        format!("SELECT * FROM {} LIMIT ?", table),
        vec![SqlValue::Integer(ANALYZE_SAMPLE_ROWS)],
    )
}

/// Min, max and average of one column.
pub fn column_stats(table: &str, column: &str) -> StatementPlan {
    StatementPlan::new(format!(
        "SELECT MIN({col}), MAX({col}), AVG({col}) FROM {table}",
        col = column,
        table = table
    ))
}

/// OR-chain of `LIKE` conditions over the given text columns.
///
/// The term is wrapped in `%` wildcards and bound once per column.
pub fn search(table: &str, text_columns: &[String], term: &str) -> StatementPlan {
    let pattern = format!("%{}%", term);
    let conditions: Vec<String> = text_columns
        .iter()
        .map(|column| format!("{} LIKE ?", column))
        .collect();
    let mut params: Vec<SqlValue> = text_columns
        .iter()
        .map(|_| SqlValue::Text(pattern.clone()))
        .collect();
    params.push(SqlValue::Integer(SEARCH_LIMIT_PER_TABLE));

    let sql = format!(
        "SELECT * FROM {} WHERE {} LIMIT ?",
        table,
        conditions.join(" OR ")
    );
    StatementPlan::with_params(sql, params)
}

/// Whether a declared column type is numeric for `analyze_table`.
pub fn is_numeric_type(declared: &str) -> bool {
    NUMERIC_TYPES.contains(&declared.trim().to_uppercase().as_str())
}

/// Whether a declared column type is searchable text, e.g. `TEXT` or `VARCHAR(64)`.
pub fn is_text_type(declared: &str) -> bool {
    let upper = declared.trim().to_uppercase();
    let base = upper.split('(').next().unwrap_or("").trim();
    TEXT_TYPES.contains(&base)
}

fn clamp_i64(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}
