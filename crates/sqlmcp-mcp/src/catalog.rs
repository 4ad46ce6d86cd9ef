//! Tool catalog.
//!
//! The ten tools are a closed set: [`ToolName`] names them and
//! [`definitions`] describes them for `tools/list`.

use crate::protocol::ToolDefinition;
use serde_json::{Value, json};

const DB_PATH_DESCRIPTION: &str = "Optional: database path (uses connected DB if not specified)";
const TABLE_DESCRIPTION: &str = "Name of the table";
const WHERE_DESCRIPTION: &str = "WHERE conditions (column: value pairs)";

/// One of the tools this server exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolName {
    ConnectDatabase,
    Query,
    GetTables,
    GetSchema,
    Create,
    Read,
    Update,
    Delete,
    AnalyzeTable,
    SearchData,
}

impl ToolName {
    /// Every tool, in catalog order.
    pub const ALL: [ToolName; 10] = [
        ToolName::ConnectDatabase,
        ToolName::Query,
        ToolName::GetTables,
        ToolName::GetSchema,
        ToolName::Create,
        ToolName::Read,
        ToolName::Update,
        ToolName::Delete,
        ToolName::AnalyzeTable,
        ToolName::SearchData,
    ];

    /// Look a tool up by its wire name.
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tool| tool.as_str() == name)
    }

    /// The wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            ToolName::ConnectDatabase => "connect_database",
            ToolName::Query => "query",
            ToolName::GetTables => "get_tables",
            ToolName::GetSchema => "get_schema",
            ToolName::Create => "create",
            ToolName::Read => "read",
            ToolName::Update => "update",
            ToolName::Delete => "delete",
            ToolName::AnalyzeTable => "analyze_table",
            ToolName::SearchData => "search_data",
        }
    }

    /// The `tools/list` entry for this tool.
    pub fn definition(self) -> ToolDefinition {
        let (description, input_schema) = match self {
            ToolName::ConnectDatabase => (
                "Connect to a SQLite database file",
                object_schema(
                    json!({
                        "db_path": {
                            "type": "string",
                            "description": "Path to the SQLite database file"
                        }
                    }),
                    &["db_path"],
                ),
            ),
            ToolName::Query => (
                "Execute a SQL query on the connected database",
                object_schema(
                    json!({
                        "sql": {"type": "string", "description": "SQL query to execute"},
                        "params": {
                            "type": "array",
                            "description": "Parameters for the SQL query",
                            "items": {"type": "string"}
                        },
                        "db_path": db_path_property()
                    }),
                    &["sql"],
                ),
            ),
            ToolName::GetTables => (
                "Get list of all tables in the database",
                object_schema(json!({"db_path": db_path_property()}), &[]),
            ),
            ToolName::GetSchema => (
                "Get schema information for a specific table",
                table_only_schema(),
            ),
            ToolName::Create => (
                "Insert a new record into a table",
                object_schema(
                    json!({
                        "table": table_property(),
                        "data": {
                            "type": "object",
                            "description": "Data to insert (column: value pairs)"
                        },
                        "db_path": db_path_property()
                    }),
                    &["table", "data"],
                ),
            ),
            ToolName::Read => (
                "Read records from a table with optional filtering",
                object_schema(
                    json!({
                        "table": table_property(),
                        "where": where_property(),
                        "limit": {
                            "type": "integer",
                            "description": "Maximum number of records to return"
                        },
                        "offset": {
                            "type": "integer",
                            "description": "Number of records to skip"
                        },
                        "order_by": {"type": "string", "description": "ORDER BY clause"},
                        "db_path": db_path_property()
                    }),
                    &["table"],
                ),
            ),
            ToolName::Update => (
                "Update records in a table",
                object_schema(
                    json!({
                        "table": table_property(),
                        "data": {
                            "type": "object",
                            "description": "Data to update (column: value pairs)"
                        },
                        "where": where_property(),
                        "db_path": db_path_property()
                    }),
                    &["table", "data", "where"],
                ),
            ),
            ToolName::Delete => (
                "Delete records from a table",
                object_schema(
                    json!({
                        "table": table_property(),
                        "where": where_property(),
                        "db_path": db_path_property()
                    }),
                    &["table", "where"],
                ),
            ),
            ToolName::AnalyzeTable => (
                "Analyze table statistics and sample data",
                table_only_schema(),
            ),
            ToolName::SearchData => (
                "Search for data across multiple tables",
                object_schema(
                    json!({
                        "search_term": {"type": "string", "description": "Term to search for"},
                        "tables": {
                            "type": "array",
                            "description": "Optional: specific tables to search (searches all if not specified)",
                            "items": {"type": "string"}
                        },
                        "db_path": db_path_property()
                    }),
                    &["search_term"],
                ),
            ),
        };

        ToolDefinition {
            name: self.as_str().to_string(),
            description: description.to_string(),
            input_schema,
        }
    }
}

impl std::fmt::Display for ToolName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// All tool definitions, in catalog order.
pub fn definitions() -> Vec<ToolDefinition> {
    ToolName::ALL.into_iter().map(ToolName::definition).collect()
}

fn object_schema(properties: Value, required: &[&str]) -> Value {
    let mut schema = json!({
        "type": "object",
        "properties": properties,
    });
    if !required.is_empty() {
        schema["required"] = json!(required);
    }
    schema
}

fn table_only_schema() -> Value {
    object_schema(
        json!({"table": table_property(), "db_path": db_path_property()}),
        &["table"],
    )
}

fn db_path_property() -> Value {
    json!({"type": "string", "description": DB_PATH_DESCRIPTION})
}

fn table_property() -> Value {
    json!({"type": "string", "description": TABLE_DESCRIPTION})
}

fn where_property() -> Value {
    json!({"type": "object", "description": WHERE_DESCRIPTION})
}
