//! HTTP transport for MCP server.
//!
//! JSON-RPC requests arrive as `POST /`. `GET /health` returns the health
//! snapshot and `GET /` a small HTML status page. The server instance is
//! shared as router state, so requests are handled concurrently up to the
//! configured connection limit. A panic while handling a request is answered
//! with a JSON-RPC internal error instead of a dropped connection.

use crate::catalog::ToolName;
use crate::error::McpError;
use crate::protocol::{JsonRpcRequest, JsonRpcResponse};
use crate::server::McpServer;
use axum::{
    Json, Router,
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::{HeaderValue, Method, StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::get,
};
use serde_json::Value;
use sqlmcp_core::HttpConfig;
use std::any::Any;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower::limit::GlobalConcurrencyLimitLayer;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{self, CorsLayer};
use tower_http::trace::TraceLayer;

/// Requests slower than this are logged at warn.
const SLOW_REQUEST: Duration = Duration::from_secs(1);

/// CORS preflight cache lifetime.
const CORS_MAX_AGE: Duration = Duration::from_secs(86_400);

/// Create the HTTP router for MCP.
pub fn create_router(server: Arc<McpServer>, config: &HttpConfig) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(cors::Any)
        .allow_methods([Method::POST, Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
        .max_age(CORS_MAX_AGE);

    let routes = Router::new()
        .route("/", get(handle_status_page).post(handle_rpc))
        .route("/health", get(handle_health))
        .with_state(server);
    with_layers(routes, config, cors)
}

fn with_layers(router: Router, config: &HttpConfig, cors: CorsLayer) -> Router {
    router
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(DefaultBodyLimit::max(config.max_body_bytes))
        .layer(GlobalConcurrencyLimitLayer::new(config.max_connections))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Answer a panicked request with `-32603 Internal error`, the panic
/// message as `data`.
fn handle_panic(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else {
        "unknown panic".to_string()
    };
    tracing::error!(detail = %detail, "Request handler panicked");

    let body = JsonRpcResponse::from_error(None, &McpError::Internal(detail));
    (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
}

fn no_cache(mut response: Response) -> Response {
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    response
}

/// Handle `POST /` (JSON-RPC over HTTP).
async fn handle_rpc(State(server): State<Arc<McpServer>>, body: Bytes) -> Response {
    let started = Instant::now();

    if body.is_empty() {
        return (StatusCode::BAD_REQUEST, "Empty request body").into_response();
    }

    let value: Value = match serde_json::from_slice(&body) {
        Ok(value) => value,
        Err(e) => {
            return (StatusCode::BAD_REQUEST, format!("Invalid JSON: {}", e)).into_response();
        }
    };

    let has_method = value.as_object().is_some_and(|o| o.contains_key("method"));
    let request: JsonRpcRequest = match serde_json::from_value(value) {
        Ok(request) if has_method => request,
        _ => return (StatusCode::BAD_REQUEST, "Invalid JSON-RPC request").into_response(),
    };

    let method = request.method.clone();
    tracing::debug!(method = %method, id = ?request.id, "Received request");

    let response = server.handle_request(request).await;

    let elapsed = started.elapsed();
    if elapsed > SLOW_REQUEST {
        tracing::warn!(
            method = %method,
            elapsed_secs = elapsed.as_secs_f64(),
            "Slow request"
        );
    }

    no_cache(Json(response).into_response())
}

/// Handle `GET /health`.
async fn handle_health(State(server): State<Arc<McpServer>>) -> Response {
    no_cache(Json(server.health()).into_response())
}

/// Handle `GET /`.
async fn handle_status_page(State(server): State<Arc<McpServer>>) -> Html<String> {
    Html(render_status_page(&server))
}

fn render_status_page(server: &McpServer) -> String {
    let database = server
        .provider()
        .current()
        .map(|p| escape_html(&p.display().to_string()))
        .unwrap_or_else(|| "None".to_string());

    let tools: String = ToolName::ALL
        .iter()
        .map(|tool| {
            let definition = tool.definition();
            format!(
                "<li><strong>{}</strong> - {}</li>",
                definition.name,
                escape_html(&definition.description)
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"<!DOCTYPE html>
<html><head><title>SQLite MCP Server</title>
<style>
    body {{ font-family: Arial, sans-serif; margin: 40px; }}
    .status {{ background: #e8f5e8; padding: 10px; border-radius: 5px; }}
    .endpoints {{ background: #f5f5f5; padding: 15px; border-radius: 5px; }}
</style></head>
<body>
<h1>SQLite MCP Server v{version}</h1>
<div class="status">
<p><strong>Status:</strong> Running</p>
<p><strong>Initialized:</strong> {initialized}</p>
<p><strong>Current Database:</strong> {database}</p>
<p><strong>Requests Processed:</strong> {requests}</p>
</div>
<h3>API Endpoints</h3>
<div class="endpoints"><ul>
<li><strong>POST /</strong> - Main MCP JSON-RPC endpoint</li>
<li><strong>GET /health</strong> - Health check and statistics</li>
<li><strong>GET /</strong> - This status page</li>
</ul></div>
<h3>MCP Methods</h3>
<div class="endpoints"><ul>
<li><strong>initialize</strong> - Initialize MCP connection</li>
<li><strong>tools/list</strong> - List available tools</li>
<li><strong>tools/call</strong> - Execute a tool</li>
</ul></div>
<h3>Available Tools</h3>
<div class="endpoints"><ul>
{tools}
</ul></div>
</body></html>
"#,
        version = env!("CARGO_PKG_VERSION"),
        initialized = server.is_initialized(),
        database = database,
        requests = server.stats().total_requests(),
        tools = tools,
    )
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// HTTP server for MCP transport.
pub struct HttpServer {
    config: HttpConfig,
    server: Arc<McpServer>,
}

impl HttpServer {
    /// Create a new HTTP server.
    pub fn new(config: HttpConfig, server: Arc<McpServer>) -> Self {
        Self { config, server }
    }

    /// Run until Ctrl-C or SIGTERM.
    pub async fn run(self) -> Result<(), McpError> {
        let app = create_router(self.server, &self.config);
        let addr = self.config.bind_addr();

        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| McpError::StartupFailed(format!("Failed to bind to {}: {}", addr, e)))?;

        tracing::info!(addr = %addr, "MCP HTTP server listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("MCP HTTP server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}
