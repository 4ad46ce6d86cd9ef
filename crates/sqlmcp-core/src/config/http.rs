//! HTTP transport configuration.
//!
//! The MCP server speaks JSON-RPC over plain HTTP. These settings control
//! where it listens and how much work it accepts at once.

use serde::{Deserialize, Serialize};

/// Configuration for the HTTP listener.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HttpConfig {
    /// Host to bind (use 0.0.0.0 for all interfaces).
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Maximum number of requests served concurrently.
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,

    /// Largest accepted request body, in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_connections: default_max_connections(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl HttpConfig {
    /// The `host:port` pair to bind.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Base URL for banners and log lines.
    pub fn url(&self) -> String {
        format!("http://{}", self.bind_addr())
    }
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    9999
}

fn default_max_connections() -> usize {
    10
}

fn default_max_body_bytes() -> usize {
    10 * 1024 * 1024
}
