//! Error types for the MCP crate.
//!
//! Two layers of failure exist. [`ToolError`] covers everything that can go
//! wrong while running one tool; the dispatcher turns it into a tool result
//! with `isError: true`. [`McpError`] covers protocol violations and is
//! returned to the caller as a JSON-RPC error object.

use thiserror::Error;

/// JSON-RPC error codes used by the server.
pub mod codes {
    /// Method or tool not found.
    pub const METHOD_NOT_FOUND: i32 = -32601;
    /// Invalid method parameters.
    pub const INVALID_PARAMS: i32 = -32602;
    /// Internal or storage error.
    pub const INTERNAL_ERROR: i32 = -32603;
    /// A method other than `initialize` arrived first.
    pub const NOT_INITIALIZED: i32 = -32002;
}

/// Errors raised by a single tool call.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Missing or malformed tool input.
    #[error("{0}")]
    InvalidArguments(String),

    /// The database file does not exist.
    #[error("Database file not found: {0}")]
    NotFound(String),

    /// The database file exists but cannot be read.
    #[error("Database file is not readable: {0}")]
    PermissionDenied(String),

    /// No explicit path was given and none is bound.
    #[error("No database path specified")]
    NoDatabaseSelected,

    /// The call ran past its budget and was interrupted.
    #[error("Query timeout after {0} seconds")]
    QueryTimeout(u64),

    /// The statement was interrupted before it finished.
    #[error("Query interrupted")]
    Interrupted,

    /// The freeform query failed the safety screen.
    #[error("Potentially dangerous SQL query rejected")]
    UnsafeSql,

    /// Any other engine failure.
    #[error("{0}")]
    Storage(String),

    /// A failure annotated with the operation that hit it.
    #[error("{context}: {source}")]
    Context {
        context: String,
        source: Box<ToolError>,
    },
}

impl ToolError {
    /// Shorthand for [`ToolError::InvalidArguments`].
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArguments(message.into())
    }

    /// Prefix this error with the operation that failed.
    pub fn context(self, context: impl Into<String>) -> Self {
        Self::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// JSON-RPC code this error corresponds to.
    pub fn code(&self) -> i32 {
        match self {
            Self::InvalidArguments(_) => codes::INVALID_PARAMS,
            Self::Context { source, .. } => source.code(),
            _ => codes::INTERNAL_ERROR,
        }
    }
}

impl From<rusqlite::Error> for ToolError {
    fn from(err: rusqlite::Error) -> Self {
        if crate::engine::is_interrupt(&err) {
            return Self::Interrupted;
        }
        Self::Storage(err.to_string())
    }
}

/// Errors that can occur in the MCP server.
#[derive(Debug, Error)]
pub enum McpError {
    /// Failed to start the server.
    #[error("failed to start MCP server: {0}")]
    StartupFailed(String),

    /// Unknown JSON-RPC method.
    #[error("Method not found: {0}")]
    MethodNotFound(String),

    /// Unknown tool name in `tools/call`.
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// Invalid request parameters.
    #[error("{0}")]
    InvalidParams(String),

    /// `tools/list` or `tools/call` before `initialize`.
    #[error("Server not initialized")]
    NotInitialized,

    /// Unexpected failure; the message is reported as error data.
    #[error("Internal error")]
    Internal(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl McpError {
    /// JSON-RPC code for this error.
    pub fn code(&self) -> i32 {
        match self {
            Self::MethodNotFound(_) | Self::UnknownTool(_) => codes::METHOD_NOT_FOUND,
            Self::InvalidParams(_) => codes::INVALID_PARAMS,
            Self::NotInitialized => codes::NOT_INITIALIZED,
            Self::StartupFailed(_)
            | Self::Internal(_)
            | Self::Serialization(_)
            | Self::Io(_) => codes::INTERNAL_ERROR,
        }
    }

    /// Diagnostic payload for the `data` member of the error object.
    pub fn data(&self) -> Option<serde_json::Value> {
        match self {
            Self::Internal(detail) => Some(serde_json::Value::String(detail.clone())),
            _ => None,
        }
    }
}
