//! Database path binding and per-call connections.
//!
//! The provider remembers one "current database" per server instance and
//! opens a fresh [`ScopedHandle`] for every tool call. Handles are never
//! pooled or shared between calls.

use crate::error::ToolError;
use rusqlite::{Connection, InterruptHandle, OpenFlags};
use std::fs::File;
use std::io::ErrorKind;
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use std::time::Duration;

/// Files above this size get a warning when bound.
const LARGE_DATABASE_BYTES: u64 = 1000 * 1024 * 1024;

/// Resolves database paths and opens configured connections.
#[derive(Debug)]
pub struct DatabaseProvider {
    current: RwLock<Option<PathBuf>>,
    busy_timeout: Duration,
}

impl DatabaseProvider {
    /// Create a provider with nothing bound.
    pub fn new(busy_timeout: Duration) -> Self {
        Self {
            current: RwLock::new(None),
            busy_timeout,
        }
    }

    /// Validate `path` and make it the current database.
    ///
    /// Returns the resolved absolute path.
    pub fn bind(&self, path: impl AsRef<Path>) -> Result<PathBuf, ToolError> {
        let path = path.as_ref();
        let resolved = resolve_existing(path)?;

        if let Err(e) = File::open(&resolved) {
            return Err(match e.kind() {
                ErrorKind::PermissionDenied => {
                    ToolError::PermissionDenied(path.display().to_string())
                }
                ErrorKind::NotFound => ToolError::NotFound(path.display().to_string()),
                _ => ToolError::Storage(e.to_string()),
            });
        }

        if let Ok(meta) = std::fs::metadata(&resolved) {
            if meta.len() > LARGE_DATABASE_BYTES {
                tracing::warn!(
                    path = %resolved.display(),
                    size_mb = meta.len() / (1024 * 1024),
                    "Large database file detected"
                );
            }
        }

        let mut current = self
            .current
            .write()
            .map_err(|_| ToolError::Storage("database state lock poisoned".to_string()))?;
        *current = Some(resolved.clone());
        tracing::info!(path = %resolved.display(), "Database set");

        Ok(resolved)
    }

    /// The currently bound database, if any.
    pub fn current(&self) -> Option<PathBuf> {
        self.current.read().ok().and_then(|guard| guard.clone())
    }

    /// Open a connection for one call.
    ///
    /// An explicit path wins over the bound one.
    pub fn acquire(&self, explicit: Option<&str>) -> Result<ScopedHandle, ToolError> {
        let path = match explicit.filter(|p| !p.is_empty()) {
            Some(p) => resolve_existing(Path::new(p))?,
            None => {
                let current = self.current().ok_or(ToolError::NoDatabaseSelected)?;
                if !current.exists() {
                    return Err(ToolError::NotFound(current.display().to_string()));
                }
                current
            }
        };

        let conn = Connection::open_with_flags(
            &path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| {
            tracing::error!(path = %path.display(), error = %e, "Database error");
            ToolError::from(e)
        })?;

        configure(&conn, self.busy_timeout).map_err(|e| {
            tracing::error!(path = %path.display(), error = %e, "Database error");
            ToolError::from(e)
        })?;

        tracing::debug!(path = %path.display(), "Opened database handle");
        Ok(ScopedHandle { conn, path })
    }
}

/// Durability and concurrency settings applied to every connection.
fn configure(conn: &Connection, busy_timeout: Duration) -> rusqlite::Result<()> {
    conn.busy_timeout(busy_timeout)?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    let _mode: String =
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    conn.pragma_update(None, "cache_size", -64000)?;
    conn.pragma_update(None, "temp_store", "MEMORY")?;
    Ok(())
}

/// Absolute, symlink-free form of an existing path.
fn resolve_existing(path: &Path) -> Result<PathBuf, ToolError> {
    std::fs::canonicalize(path).map_err(|e| match e.kind() {
        ErrorKind::PermissionDenied => ToolError::PermissionDenied(path.display().to_string()),
        _ => ToolError::NotFound(path.display().to_string()),
    })
}

/// A connection owned by exactly one tool call.
///
/// Dropping the handle rolls back any transaction still open and closes the
/// connection, whichever way the call ended.
#[derive(Debug)]
pub struct ScopedHandle {
    conn: Connection,
    path: PathBuf,
}

impl ScopedHandle {
    /// The resolved database path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Handle used by the deadline watchdog to interrupt a running statement.
    pub fn interrupt_handle(&self) -> InterruptHandle {
        self.conn.get_interrupt_handle()
    }
}

impl Deref for ScopedHandle {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        &self.conn
    }
}

impl DerefMut for ScopedHandle {
    fn deref_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }
}

impl Drop for ScopedHandle {
    fn drop(&mut self) {
        if !self.conn.is_autocommit() {
            if let Err(e) = self.conn.execute_batch("ROLLBACK") {
                tracing::warn!(path = %self.path.display(), error = %e, "Rollback on release failed");
            }
        }
        tracing::debug!(path = %self.path.display(), "Closed database handle");
    }
}
