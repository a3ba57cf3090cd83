//! HTTP transport for the MCP tool surface.
//!
//! One route does the work: `POST /mcp` takes a `{name, arguments}` envelope
//! and answers with a single text content block. Command outcomes, including
//! errors, ride in the body with HTTP 200. The server holds no per-session
//! state; every request re-loads through the store, so concurrent requests
//! are safe.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use iteratr_core::{Journal, Store};
use serde_json::{json, Map, Value};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::tools;

/// MCP tool server bound to a single session.
pub struct McpServer<J> {
    store: Store<J>,
    session: String,
}

struct AppState<J> {
    store: Store<J>,
    session: String,
}

impl<J: Journal + 'static> McpServer<J> {
    pub fn new(store: Store<J>, session: impl Into<String>) -> Self {
        Self {
            store,
            session: session.into(),
        }
    }

    /// Bind the listener and start serving in a background task.
    ///
    /// Passing port 0 requests an ephemeral port; the bound port is captured
    /// from the listener before it is handed to the serve loop, so there is
    /// no window where the reported port differs from the served one.
    pub async fn start(self, listen_addr: &str, port: u16) -> Result<ServerHandle> {
        let listener = tokio::net::TcpListener::bind((listen_addr, port))
            .await
            .with_context(|| format!("Failed to bind {listen_addr}:{port}"))?;
        let port = listener
            .local_addr()
            .context("Failed to read bound address")?
            .port();

        let app = self.router();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            let serve = axum::serve(listener, app).with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            });
            if let Err(err) = serve.await {
                error!(error = %err, "MCP server terminated with error");
            }
        });

        info!(port, "MCP server listening");
        Ok(ServerHandle {
            port,
            shutdown: Some(shutdown_tx),
            task,
        })
    }

    fn router(self) -> Router {
        let state = Arc::new(AppState {
            store: self.store,
            session: self.session,
        });
        Router::new()
            .route("/mcp", post(mcp_handler::<J>))
            .route("/health", get(health_handler))
            .with_state(state)
    }
}

/// Handle to a running server; dropping it without `stop` leaves the serve
/// loop running until the process exits.
pub struct ServerHandle {
    port: u16,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl ServerHandle {
    /// Port the server is actually bound to.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Graceful shutdown: stop accepting, drain in-flight requests, and wait
    /// for the serve loop to finish. No deadline is imposed.
    pub async fn stop(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Err(err) = (&mut self.task).await {
            error!(error = %err, "MCP server task panicked");
        }
        info!("MCP server stopped");
    }
}

async fn mcp_handler<J: Journal + 'static>(
    State(state): State<Arc<AppState<J>>>,
    Json(request): Json<Value>,
) -> Json<Value> {
    let text = match request.get("name").and_then(Value::as_str) {
        Some(name) => {
            let empty = Map::new();
            let arguments = request
                .get("arguments")
                .and_then(Value::as_object)
                .unwrap_or(&empty);
            tools::dispatch(&state.store, &state.session, name, arguments).await
        }
        None => "error: Missing 'name' field in tool call".to_string(),
    };

    Json(json!({
        "content": [{"type": "text", "text": text}]
    }))
}

async fn health_handler() -> &'static str {
    "OK"
}
