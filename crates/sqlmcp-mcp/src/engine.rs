//! Statement execution.
//!
//! This module runs [`StatementPlan`]s on a connection and shapes the
//! results:
//! - Read statements (text starting with `SELECT`) return rows, truncated to
//!   the configured maximum
//! - `INSERT`/`UPDATE`/`DELETE`/`REPLACE` run in a transaction that is
//!   committed on success; other statements run in autocommit mode
//! - A [`Watchdog`] interrupts the connection when the call overruns its
//!   budget, and the interruption is reported as [`ToolError::QueryTimeout`]

use crate::error::ToolError;
use crate::statement::StatementPlan;
use rusqlite::types::ValueRef;
use rusqlite::{Connection, ErrorCode, InterruptHandle, Row, params_from_iter};
use serde_json::{Map, Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;

/// One result row, keyed by column name in select order.
pub type RowMap = Map<String, Value>;

/// Outcome of a row-producing statement.
#[derive(Debug, Clone)]
pub struct RowsOutcome {
    pub data: Vec<RowMap>,
    pub count: usize,
    pub truncated: bool,
    pub elapsed: f64,
}

/// Outcome of a mutating statement.
#[derive(Debug, Clone)]
pub struct MutationOutcome {
    pub affected: i64,
    pub insert_id: Option<i64>,
    pub elapsed: f64,
}

/// Result of [`execute`].
#[derive(Debug, Clone)]
pub enum ExecutionOutcome {
    Rows(RowsOutcome),
    Mutation(MutationOutcome),
}

/// Whether the statement text is a read.
pub fn is_read(sql: &str) -> bool {
    sql.trim().to_uppercase().starts_with("SELECT")
}

/// Run a plan, choosing the read or write path from its text.
pub fn execute(
    conn: &mut Connection,
    plan: &StatementPlan,
    max_rows: usize,
) -> Result<ExecutionOutcome, ToolError> {
    if is_read(&plan.sql) {
        fetch(conn, plan, max_rows).map(ExecutionOutcome::Rows)
    } else {
        mutate(conn, plan).map(ExecutionOutcome::Mutation)
    }
}

/// Run a row-producing plan, keeping at most `max_rows` rows.
pub fn fetch(
    conn: &Connection,
    plan: &StatementPlan,
    max_rows: usize,
) -> Result<RowsOutcome, ToolError> {
    let started = Instant::now();
    let mut stmt = conn.prepare(&plan.sql)?;
    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

    let mut data = Vec::new();
    let mut truncated = false;
    let mut rows = stmt.query(params_from_iter(plan.params.iter()))?;
    while let Some(row) = rows.next()? {
        if data.len() >= max_rows {
            truncated = true;
            break;
        }
        data.push(row_to_map(row, &columns)?);
    }

    if truncated {
        tracing::debug!(max_rows, "Result set truncated");
    }

    Ok(RowsOutcome {
        count: data.len(),
        data,
        truncated,
        elapsed: round_millis(started.elapsed()),
    })
}

/// Whether a statement is DML that runs inside its own transaction.
///
/// Everything else (DDL, `VACUUM`, `BEGIN`, ...) runs in autocommit mode,
/// since SQLite refuses some of it inside a transaction.
pub fn is_dml(sql: &str) -> bool {
    let keyword = sql
        .trim_start()
        .split(|c: char| !c.is_ascii_alphabetic())
        .next()
        .unwrap_or("")
        .to_ascii_uppercase();
    matches!(keyword.as_str(), "INSERT" | "UPDATE" | "DELETE" | "REPLACE")
}

/// Run a mutating plan. DML is committed as one transaction; other
/// statements run directly, and a transaction they leave open is committed.
pub fn mutate(conn: &mut Connection, plan: &StatementPlan) -> Result<MutationOutcome, ToolError> {
    let started = Instant::now();
    let (affected, last_id) = if is_dml(&plan.sql) {
        let tx = conn.transaction()?;
        drain(&tx, plan)?;
        let counts = (tx.changes() as i64, tx.last_insert_rowid());
        tx.commit()?;
        counts
    } else {
        drain(conn, plan)?;
        let counts = (conn.changes() as i64, conn.last_insert_rowid());
        if !conn.is_autocommit() {
            conn.execute_batch("COMMIT")?;
        }
        counts
    };

    Ok(MutationOutcome {
        affected,
        insert_id: (last_id != 0).then_some(last_id),
        elapsed: round_millis(started.elapsed()),
    })
}

/// Step a statement to completion, discarding any rows.
fn drain(conn: &Connection, plan: &StatementPlan) -> Result<(), ToolError> {
    let mut stmt = conn.prepare(&plan.sql)?;
    let mut rows = stmt.query(params_from_iter(plan.params.iter()))?;
    // Statements with RETURNING or a leading WITH still produce rows.
    while rows.next()?.is_some() {}
    Ok(())
}

/// Run a plan and collect one mapped value per row.
pub fn fetch_map<T, F>(conn: &Connection, plan: &StatementPlan, f: F) -> Result<Vec<T>, ToolError>
where
    F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
{
    let mut stmt = conn.prepare(&plan.sql)?;
    let rows = stmt.query_map(params_from_iter(plan.params.iter()), f)?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

/// Convert a row to a JSON object.
fn row_to_map(row: &Row<'_>, columns: &[String]) -> Result<RowMap, ToolError> {
    let mut map = Map::with_capacity(columns.len());
    for (i, name) in columns.iter().enumerate() {
        map.insert(name.clone(), value_to_json(row.get_ref(i)?));
    }
    Ok(map)
}

/// Convert an SQLite value to JSON.
pub fn value_to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => json!(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::String(format!("<blob {} bytes>", bytes.len())),
    }
}

/// Seconds, rounded to millisecond precision.
pub fn round_millis(elapsed: Duration) -> f64 {
    (elapsed.as_secs_f64() * 1000.0).round() / 1000.0
}

/// Whether an engine error is SQLite's interrupt signal.
pub fn is_interrupt(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error {
                code: ErrorCode::OperationInterrupted,
                ..
            },
            _
        )
    )
}

/// Interrupts a connection once its budget runs out.
///
/// The timer runs as a tokio task racing a [`CancellationToken`]. Dropping
/// the watchdog cancels the token, so the timer can never fire into a later
/// statement.
#[derive(Debug)]
pub struct Watchdog {
    token: CancellationToken,
    fired: Arc<AtomicBool>,
    budget: Duration,
}

impl Watchdog {
    /// Start the timer on `runtime`.
    pub fn arm(runtime: &Handle, interrupt: InterruptHandle, budget: Duration) -> Self {
        let token = CancellationToken::new();
        let fired = Arc::new(AtomicBool::new(false));
        let cancelled = token.clone();
        let flag = fired.clone();
        runtime.spawn(async move {
            tokio::select! {
                _ = cancelled.cancelled() => {}
                _ = tokio::time::sleep(budget) => {
                    tracing::warn!(budget_secs = budget.as_secs(), "Query budget exceeded, interrupting");
                    flag.store(true, Ordering::SeqCst);
                    interrupt.interrupt();
                }
            }
        });
        Self {
            token,
            fired,
            budget,
        }
    }

    /// Stop the timer. Calling it again is harmless.
    pub fn disarm(&self) {
        self.token.cancel();
    }

    /// Whether the budget ran out and the connection was interrupted.
    pub fn fired(&self) -> bool {
        self.fired.load(Ordering::SeqCst)
    }

    /// Rewrite an interruption as a timeout for this watchdog's budget.
    pub fn classify(&self, err: ToolError) -> ToolError {
        match err {
            ToolError::Interrupted => ToolError::QueryTimeout(self.budget.as_secs()),
            other => other,
        }
    }
}

impl Drop for Watchdog {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
