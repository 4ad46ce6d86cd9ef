//! Text screen for freeform SQL.
//!
//! A coarse substring check, not a parser. It only guards the `query` tool;
//! every structured tool binds caller values as parameters instead.

/// Statements that destroy schemas or reconfigure the engine.
const BLOCKED_KEYWORDS: &[&str] = &["DROP DATABASE", "DROP SCHEMA", "TRUNCATE", "PRAGMA"];

/// Classic injection and obfuscation markers.
const BLOCKED_PATTERNS: &[&str] = &[";--", "/*", "*/", "UNION SELECT", "EXEC(", "EXECUTE("];

/// Whether `sql` passes the screen. Matching is case-insensitive.
pub fn is_safe(sql: &str) -> bool {
    let upper = sql.trim().to_uppercase();
    !BLOCKED_KEYWORDS
        .iter()
        .chain(BLOCKED_PATTERNS)
        .any(|needle| upper.contains(needle))
}
