//! Serve command for starting the MCP HTTP server.
//!
//! `sqlmcp serve` - Load configuration, bind an optional database and serve
//! JSON-RPC until Ctrl-C or SIGTERM.

use anyhow::{Context, Result};
use clap::Args;
use sqlmcp_core::{ConfigOverrides, ServerConfig};
use sqlmcp_mcp::{HttpServer, McpServer};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Arguments for `sqlmcp serve`. Flags override values from `--config`.
#[derive(Debug, Args)]
pub struct ServeArgs {
    /// YAML configuration file.
    #[arg(short, long, env = "SQLMCP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Host to bind to.
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to.
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Maximum concurrent requests.
    #[arg(long)]
    pub max_connections: Option<usize>,

    /// Maximum query time in seconds.
    #[arg(long = "max-query-time")]
    pub max_query_time: Option<u64>,

    /// Maximum rows returned by a read.
    #[arg(long)]
    pub max_result_rows: Option<usize>,

    /// SQLite database to bind at startup.
    #[arg(short, long)]
    pub database: Option<PathBuf>,

    /// Run without the interactive banner hint.
    #[arg(long, default_value_t = false)]
    pub daemon: bool,
}

impl ServeArgs {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            host: self.host.clone(),
            port: self.port,
            log_level: self.log_level.clone(),
            max_connections: self.max_connections,
            max_query_time_secs: self.max_query_time,
            max_result_rows: self.max_result_rows,
            database: self.database.clone(),
            daemon: self.daemon,
        }
    }
}

/// Resolve the effective configuration: defaults, then the file, then flags.
pub fn load_config(args: &ServeArgs) -> Result<ServerConfig> {
    let config = match &args.config {
        Some(path) => ServerConfig::from_file(path)
            .with_context(|| format!("Failed to load config file: {}", path.display()))?,
        None => ServerConfig::default(),
    };
    config
        .apply(args.overrides())
        .context("Invalid server configuration")
}

/// Execute the serve command.
pub async fn execute(args: ServeArgs) -> Result<()> {
    let config = load_config(&args)?;
    init_tracing(&config.logging.level);

    let server = Arc::new(McpServer::new(config.limits.clone()));
    if let Some(database) = &config.database {
        let path = server
            .provider()
            .bind(database)
            .with_context(|| format!("Failed to open database: {}", database.display()))?;
        tracing::info!(database = %path.display(), "Database bound at startup");
    }

    println!("{}", banner(&config));

    HttpServer::new(config.http.clone(), server)
        .run()
        .await
        .context("Server error")?;

    println!("Server stopped.");
    Ok(())
}

/// `RUST_LOG` wins over the configured level.
fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}

fn banner(config: &ServerConfig) -> String {
    let url = config.http.url();
    let mut lines = vec![
        format!("SQLite MCP Server v{} starting...", env!("CARGO_PKG_VERSION")),
        format!("Server URL: {}", url),
        format!("Health check: {}/health", url),
        format!("Status page: {}/", url),
        format!("Log level: {}", config.logging.level),
        format!("Max connections: {}", config.http.max_connections),
        format!("Max query time: {}s", config.limits.max_query_time_secs),
        format!("Max result rows: {}", config.limits.max_result_rows),
    ];
    if let Some(database) = &config.database {
        lines.push(format!("Database: {}", database.display()));
    }
    lines.push(if config.daemon {
        "Running in daemon mode...".to_string()
    } else {
        "Press Ctrl+C to stop".to_string()
    });
    lines.join("\n")
}
