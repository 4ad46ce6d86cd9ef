//! Tool dispatch.
//!
//! [`ToolDispatcher::dispatch`] is the only place a [`ToolError`] becomes a
//! [`ToolResult`]. Each call parses its typed arguments, then runs on a
//! blocking worker with its own [`ScopedHandle`] and an armed [`Watchdog`].

use crate::catalog::ToolName;
use crate::database::{DatabaseProvider, ScopedHandle};
use crate::engine::{self, ExecutionOutcome, Watchdog};
use crate::error::ToolError;
use crate::protocol::ToolResult;
use crate::safety;
use crate::statement::{self, StatementPlan};
use rusqlite::Row;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use sqlmcp_core::LimitsConfig;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::runtime::Handle;

/// Tables listed in the `connect_database` payload.
const CONNECT_TABLE_PREVIEW: usize = 10;

#[derive(Debug, Deserialize)]
struct ConnectArgs {
    db_path: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QueryArgs {
    sql: Option<String>,
    #[serde(default)]
    params: Vec<Value>,
    db_path: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DbPathArgs {
    db_path: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TableArgs {
    table: Option<String>,
    db_path: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreateArgs {
    table: Option<String>,
    #[serde(default)]
    data: Map<String, Value>,
    db_path: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReadArgs {
    table: Option<String>,
    #[serde(default, rename = "where")]
    filter: Map<String, Value>,
    limit: Option<u64>,
    offset: Option<u64>,
    order_by: Option<String>,
    db_path: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UpdateArgs {
    table: Option<String>,
    #[serde(default)]
    data: Map<String, Value>,
    #[serde(default, rename = "where")]
    filter: Map<String, Value>,
    db_path: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DeleteArgs {
    table: Option<String>,
    #[serde(default, rename = "where")]
    filter: Map<String, Value>,
    db_path: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchArgs {
    search_term: Option<String>,
    tables: Option<Vec<String>>,
    db_path: Option<String>,
}

/// Parse tool arguments. A missing or `null` argument object is empty.
fn parse_args<T: DeserializeOwned>(arguments: Value) -> Result<T, ToolError> {
    let arguments = match arguments {
        Value::Null => Value::Object(Map::new()),
        other => other,
    };
    serde_json::from_value(arguments)
        .map_err(|e| ToolError::invalid(format!("Invalid arguments: {}", e)))
}

/// A required, non-empty string argument.
fn required(value: Option<String>, message: &str) -> Result<String, ToolError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ToolError::invalid(message))
}

/// Prefix failures from the database phase with the operation that hit them.
fn context(err: ToolError, what: impl FnOnce() -> String) -> ToolError {
    match err {
        ToolError::InvalidArguments(_) | ToolError::UnsafeSql => err,
        other => other.context(what()),
    }
}

/// Runs tools against the provider's databases.
#[derive(Debug, Clone)]
pub struct ToolDispatcher {
    provider: Arc<DatabaseProvider>,
    limits: LimitsConfig,
}

impl ToolDispatcher {
    /// Create a dispatcher.
    pub fn new(provider: Arc<DatabaseProvider>, limits: LimitsConfig) -> Self {
        Self { provider, limits }
    }

    /// The connection provider shared with the server.
    pub fn provider(&self) -> &Arc<DatabaseProvider> {
        &self.provider
    }

    /// Execute a tool. Never fails: errors become `isError: true` results.
    pub async fn dispatch(&self, tool: ToolName, arguments: Value) -> ToolResult {
        tracing::debug!(tool = %tool, "Executing tool");

        match self.run(tool, arguments).await {
            Ok(payload) => {
                let text = serde_json::to_string_pretty(&payload)
                    .unwrap_or_else(|_| payload.to_string());
                ToolResult::success(text)
            }
            Err(e) => {
                tracing::warn!(tool = %tool, error = %e, "Tool execution failed");
                ToolResult::failure(format!("Error executing tool {}: {}", tool, e))
            }
        }
    }

    async fn run(&self, tool: ToolName, arguments: Value) -> Result<Value, ToolError> {
        match tool {
            ToolName::ConnectDatabase => self.connect_database(parse_args(arguments)?).await,
            ToolName::Query => self.query(parse_args(arguments)?).await,
            ToolName::GetTables => self.get_tables(parse_args(arguments)?).await,
            ToolName::GetSchema => self.get_schema(parse_args(arguments)?).await,
            ToolName::Create => self.create(parse_args(arguments)?).await,
            ToolName::Read => self.read(parse_args(arguments)?).await,
            ToolName::Update => self.update(parse_args(arguments)?).await,
            ToolName::Delete => self.delete(parse_args(arguments)?).await,
            ToolName::AnalyzeTable => self.analyze_table(parse_args(arguments)?).await,
            ToolName::SearchData => self.search_data(parse_args(arguments)?).await,
        }
    }

    /// Run `op` on a blocking worker with a fresh handle under the deadline.
    async fn with_handle<T, F>(&self, db_path: Option<String>, op: F) -> Result<T, ToolError>
    where
        T: Send + 'static,
        F: FnOnce(&mut ScopedHandle) -> Result<T, ToolError> + Send + 'static,
    {
        let provider = Arc::clone(&self.provider);
        let budget = self.limits.max_query_time();

        tokio::task::spawn_blocking(move || {
            let mut handle = provider.acquire(db_path.as_deref())?;
            let watchdog = Watchdog::arm(&Handle::current(), handle.interrupt_handle(), budget);
            let result = op(&mut handle).map_err(|e| watchdog.classify(e));
            watchdog.disarm();
            if result.is_ok() && watchdog.fired() {
                tracing::debug!(path = %handle.path().display(), "Budget expired as the call finished");
            }
            result
        })
        .await
        .map_err(|e| ToolError::Storage(format!("Worker task failed: {}", e)))?
    }

    async fn connect_database(&self, args: ConnectArgs) -> Result<Value, ToolError> {
        let db_path = required(args.db_path, "db_path is required")?;

        let (resolved, tables) = self
            .bind_and_list(db_path.clone())
            .await
            .map_err(|e| context(e, || "Failed to connect to database".to_string()))?;

        Ok(json!({
            "success": true,
            "message": format!("Connected to database: {}", db_path),
            "database_path": resolved.display().to_string(),
            "tables_found": tables.len(),
            "tables": tables.iter().take(CONNECT_TABLE_PREVIEW).collect::<Vec<_>>(),
        }))
    }

    async fn bind_and_list(&self, db_path: String) -> Result<(PathBuf, Vec<String>), ToolError> {
        let provider = Arc::clone(&self.provider);
        let resolved: PathBuf = tokio::task::spawn_blocking(move || provider.bind(&db_path))
            .await
            .map_err(|e| ToolError::Storage(format!("Worker task failed: {}", e)))??;

        let explicit = resolved.to_string_lossy().into_owned();
        let tables = self
            .with_handle(Some(explicit), |handle| {
                engine::fetch_map(handle, &statement::table_names(), |row| {
                    row.get::<_, String>(0)
                })
            })
            .await?;
        Ok((resolved, tables))
    }

    async fn query(&self, args: QueryArgs) -> Result<Value, ToolError> {
        let sql = required(args.sql, "sql is required")?;
        if !safety::is_safe(&sql) {
            tracing::warn!(sql = %sql, "Rejected unsafe query");
            return Err(ToolError::UnsafeSql);
        }

        let params = args.params.iter().map(statement::to_sql_value).collect();
        let plan = StatementPlan::with_params(sql.clone(), params);
        let max_rows = self.limits.max_result_rows;

        let outcome = self
            .with_handle(args.db_path, move |handle| {
                engine::execute(handle, &plan, max_rows)
            })
            .await
            .map_err(|e| match e {
                ToolError::QueryTimeout(_) => e,
                ToolError::Storage(_) | ToolError::Interrupted => {
                    context(e, || "SQL execution failed".to_string())
                }
                other => context(other, || "Query execution failed".to_string()),
            })?;

        Ok(match outcome {
            ExecutionOutcome::Rows(rows) => json!({
                "success": true,
                "data": rows.data,
                "row_count": rows.count,
                "truncated": rows.truncated,
                "execution_time_seconds": rows.elapsed,
                "query": sql,
            }),
            ExecutionOutcome::Mutation(mutation) => json!({
                "success": true,
                "affected_rows": mutation.affected,
                "last_row_id": mutation.insert_id,
                "execution_time_seconds": mutation.elapsed,
                "query": sql,
            }),
        })
    }

    async fn get_tables(&self, args: DbPathArgs) -> Result<Value, ToolError> {
        let tables = self
            .with_handle(args.db_path, |handle| {
                engine::fetch_map(handle, &statement::tables_and_views(), |row| {
                    Ok(json!({
                        "name": row.get::<_, String>(0)?,
                        "type": row.get::<_, String>(1)?,
                        "sql": row.get::<_, Option<String>>(2)?,
                    }))
                })
            })
            .await
            .map_err(|e| context(e, || "Failed to get tables".to_string()))?;
        let count = tables.len();

        Ok(json!({
            "success": true,
            "tables": tables,
            "count": count,
        }))
    }

    async fn get_schema(&self, args: TableArgs) -> Result<Value, ToolError> {
        let table = required(args.table, "table is required")?;
        let name = table.clone();

        let (columns, foreign_keys, indexes) = self
            .with_handle(args.db_path, move |handle| {
                let columns = engine::fetch_map(handle, &statement::table_info(&name), column_json)?;
                let foreign_keys =
                    engine::fetch_map(handle, &statement::foreign_key_list(&name), |row| {
                        Ok(json!({
                            "id": row.get::<_, i64>(0)?,
                            "seq": row.get::<_, i64>(1)?,
                            "table": row.get::<_, String>(2)?,
                            "from": row.get::<_, String>(3)?,
                            "to": row.get::<_, Option<String>>(4)?,
                            "on_update": row.get::<_, String>(5)?,
                            "on_delete": row.get::<_, String>(6)?,
                            "match": row.get::<_, String>(7)?,
                        }))
                    })?;
                let indexes = engine::fetch_map(handle, &statement::index_list(&name), |row| {
                    Ok(json!({
                        "seq": row.get::<_, i64>(0)?,
                        "name": row.get::<_, String>(1)?,
                        "unique": row.get::<_, i64>(2)? != 0,
                        "origin": row.get::<_, String>(3)?,
                        "partial": row.get::<_, i64>(4)? != 0,
                    }))
                })?;
                Ok((columns, foreign_keys, indexes))
            })
            .await
            .map_err(|e| context(e, || format!("Failed to get schema for table {}", table)))?;

        Ok(json!({
            "success": true,
            "table": table,
            "columns": columns,
            "foreign_keys": foreign_keys,
            "indexes": indexes,
        }))
    }

    async fn create(&self, args: CreateArgs) -> Result<Value, ToolError> {
        let table = required(args.table, "table and data are required")?;
        let plan = statement::insert(&table, &args.data)?;

        let mutation = self
            .with_handle(args.db_path, move |handle| engine::mutate(handle, &plan))
            .await
            .map_err(|e| context(e, || format!("Failed to create record in {}", table)))?;

        Ok(json!({
            "success": true,
            "inserted_id": mutation.insert_id,
            "affected_rows": mutation.affected,
            "table": table,
            "data": args.data,
        }))
    }

    async fn read(&self, args: ReadArgs) -> Result<Value, ToolError> {
        let table = required(args.table, "table is required")?;
        let plan = statement::select(
            &table,
            &args.filter,
            args.order_by.as_deref(),
            args.limit,
            args.offset,
        );
        let sql = plan.sql.clone();
        let max_rows = self.limits.max_result_rows;

        let rows = self
            .with_handle(args.db_path, move |handle| {
                engine::fetch(handle, &plan, max_rows)
            })
            .await
            .map_err(|e| context(e, || format!("Failed to read from {}", table)))?;

        Ok(json!({
            "success": true,
            "data": rows.data,
            "row_count": rows.count,
            "truncated": rows.truncated,
            "table": table,
            "query": sql,
        }))
    }

    async fn update(&self, args: UpdateArgs) -> Result<Value, ToolError> {
        let table = required(args.table, "table, data, and where are required")?;
        let plan = statement::update(&table, &args.data, &args.filter)?;

        let mutation = self
            .with_handle(args.db_path, move |handle| engine::mutate(handle, &plan))
            .await
            .map_err(|e| context(e, || format!("Failed to update {}", table)))?;

        Ok(json!({
            "success": true,
            "affected_rows": mutation.affected,
            "table": table,
            "data": args.data,
            "where": args.filter,
        }))
    }

    async fn delete(&self, args: DeleteArgs) -> Result<Value, ToolError> {
        let table = required(args.table, "table and where are required")?;
        let plan = statement::delete(&table, &args.filter)?;

        let mutation = self
            .with_handle(args.db_path, move |handle| engine::mutate(handle, &plan))
            .await
            .map_err(|e| context(e, || format!("Failed to delete from {}", table)))?;

        Ok(json!({
            "success": true,
            "affected_rows": mutation.affected,
            "table": table,
            "where": args.filter,
        }))
    }

    async fn analyze_table(&self, args: TableArgs) -> Result<Value, ToolError> {
        let table = required(args.table, "table is required")?;
        let name = table.clone();
        let max_rows = self.limits.max_result_rows;

        let analysis = self
            .with_handle(args.db_path, move |handle| analyze(handle, &name, max_rows))
            .await
            .map_err(|e| context(e, || format!("Failed to analyze table {}", table)))?;

        let mut payload = json!({"success": true, "table": table});
        if let (Some(target), Value::Object(fields)) = (payload.as_object_mut(), analysis) {
            target.extend(fields);
        }
        Ok(payload)
    }

    async fn search_data(&self, args: SearchArgs) -> Result<Value, ToolError> {
        let term = required(args.search_term, "search_term is required")?;
        let requested = args.tables.unwrap_or_default();
        let needle = term.clone();
        let max_rows = self.limits.max_result_rows;

        let results = self
            .with_handle(args.db_path, move |handle| {
                search(handle, requested, &needle, max_rows)
            })
            .await
            .map_err(|e| context(e, || "Failed to search data".to_string()))?;

        let matches_found: usize = results
            .values()
            .filter_map(Value::as_array)
            .map(Vec::len)
            .sum();

        Ok(json!({
            "success": true,
            "search_term": term,
            "results": results,
            "matches_found": matches_found,
        }))
    }
}

/// One `pragma_table_info` row as JSON.
fn column_json(row: &Row<'_>) -> rusqlite::Result<Value> {
    Ok(json!({
        "cid": row.get::<_, i64>(0)?,
        "name": row.get::<_, String>(1)?,
        "type": row.get::<_, String>(2)?,
        "notnull": row.get::<_, i64>(3)? != 0,
        "default_value": engine::value_to_json(row.get_ref(4)?),
        "pk": row.get::<_, i64>(5)? != 0,
    }))
}

/// Row count, columns, a sample and numeric column statistics.
fn analyze(handle: &ScopedHandle, table: &str, max_rows: usize) -> Result<Value, ToolError> {
    let row_count = engine::fetch_map(handle, &statement::count(table), |row| {
        row.get::<_, i64>(0)
    })?
    .into_iter()
    .next()
    .unwrap_or(0);

    let columns = engine::fetch_map(handle, &statement::table_info(table), |row| {
        Ok((row.get::<_, String>(1)?, row.get::<_, String>(2)?))
    })?;

    let sample = engine::fetch(handle, &statement::sample(table), max_rows)?;

    let mut column_statistics = Map::new();
    for (name, declared) in columns.iter() {
        if !statement::is_numeric_type(declared) {
            continue;
        }
        let stats = engine::fetch_map(handle, &statement::column_stats(table, name), |row| {
            Ok(json!({
                "min": engine::value_to_json(row.get_ref(0)?),
                "max": engine::value_to_json(row.get_ref(1)?),
                "avg": row
                    .get::<_, Option<f64>>(2)?
                    .map(|avg| (avg * 100.0).round() / 100.0),
            }))
        })?;
        if let Some(stats) = stats.into_iter().next() {
            column_statistics.insert(name.clone(), stats);
        }
    }

    Ok(json!({
        "row_count": row_count,
        "columns": columns
            .iter()
            .map(|(name, declared)| json!({"name": name, "type": declared}))
            .collect::<Vec<_>>(),
        "sample_data": sample.data,
        "column_statistics": column_statistics,
    }))
}

/// Scan tables for `term`. Tables that fail are skipped.
fn search(
    handle: &ScopedHandle,
    requested: Vec<String>,
    term: &str,
    max_rows: usize,
) -> Result<Map<String, Value>, ToolError> {
    let tables = if requested.is_empty() {
        engine::fetch_map(handle, &statement::table_names(), |row| {
            row.get::<_, String>(0)
        })?
    } else {
        requested
    };

    let mut results = Map::new();
    for table in tables {
        match search_table(handle, &table, term, max_rows) {
            Ok(rows) if !rows.is_empty() => {
                results.insert(table, Value::Array(rows));
            }
            Ok(_) => {}
            Err(ToolError::Interrupted) => return Err(ToolError::Interrupted),
            Err(e) => {
                tracing::debug!(table = %table, error = %e, "Skipping table in search");
            }
        }
    }
    Ok(results)
}

fn search_table(
    handle: &ScopedHandle,
    table: &str,
    term: &str,
    max_rows: usize,
) -> Result<Vec<Value>, ToolError> {
    let text_columns: Vec<String> =
        engine::fetch_map(handle, &statement::table_info(table), |row| {
            Ok((row.get::<_, String>(1)?, row.get::<_, String>(2)?))
        })?
        .into_iter()
        .filter(|(_, declared)| statement::is_text_type(declared))
        .map(|(name, _)| name)
        .collect();

    if text_columns.is_empty() {
        return Ok(Vec::new());
    }

    let rows = engine::fetch(handle, &statement::search(table, &text_columns, term), max_rows)?;
    Ok(rows.data.into_iter().map(Value::Object).collect())
}
