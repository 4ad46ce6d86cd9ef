//! Tools introspection command.
//!
//! `sqlmcp tools` - Print the tool catalog served by `tools/list`.

use anyhow::{Context, Result};
use sqlmcp_mcp::catalog;

/// Render the catalog as the `tools/list` result object, or one line per
/// tool when `summary` is set.
pub fn render(summary: bool) -> Result<String> {
    let tools = catalog::definitions();
    if !summary {
        let value = serde_json::json!({ "tools": tools });
        return serde_json::to_string_pretty(&value).context("Failed to serialize tool catalog");
    }

    let width = tools.iter().map(|t| t.name.len()).max().unwrap_or(0);
    Ok(tools
        .iter()
        .map(|t| format!("{:width$}  {}", t.name, t.description, width = width))
        .collect::<Vec<_>>()
        .join("\n"))
}

/// Print the catalog to stdout.
pub fn list(summary: bool) -> Result<()> {
    println!("{}", render(summary)?);
    Ok(())
}
