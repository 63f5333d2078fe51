//! HTTP surface of the remote store, built on axum.

use std::net::SocketAddr;

use axum::{
    Router,
    extract::{Json as ExtractJson, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::{net::TcpListener, sync::oneshot, task::JoinHandle};

use super::{RemoteStore, ServerError};
use crate::Result;
use crate::sync::protocol::ErrorResponse;

/// Body of `GET /health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

/// Build the router serving `POST /sync` and `GET /health`.
pub fn router(store: RemoteStore) -> Router {
    Router::new()
        .route("/sync", post(handle_sync))
        .route("/health", get(handle_health))
        .with_state(store)
}

fn error_response(status: StatusCode, error: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
        }),
    )
        .into_response()
}

/// Handler for `/sync`: applies the `records` array and reports the outcome.
async fn handle_sync(
    State(store): State<RemoteStore>,
    body: std::result::Result<ExtractJson<Value>, JsonRejection>,
) -> Response {
    let ExtractJson(body) = match body {
        Ok(body) => body,
        Err(rejection) => {
            return error_response(StatusCode::BAD_REQUEST, rejection.body_text());
        }
    };

    let Some(records) = body.get("records").and_then(Value::as_array) else {
        return error_response(
            StatusCode::BAD_REQUEST,
            ServerError::BadRequest("Request must contain a records array".to_string())
                .to_string(),
        );
    };

    match store.apply_batch(records).await {
        Ok(response) => Json(response).into_response(),
        Err(e) => {
            tracing::error!("Batch failed: {e}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// A running (or stopped) HTTP server for a [`RemoteStore`].
pub struct SyncServer {
    store: RemoteStore,
    address: Option<SocketAddr>,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl SyncServer {
    pub fn new(store: RemoteStore) -> Self {
        Self {
            store,
            address: None,
            shutdown: None,
            task: None,
        }
    }

    /// Check if the server is currently running.
    pub fn is_running(&self) -> bool {
        self.task.is_some()
    }

    /// The bound address, which differs from the requested one for port 0.
    pub fn address(&self) -> Result<SocketAddr> {
        self.address.ok_or_else(|| ServerError::NotRunning.into())
    }

    /// Bind `addr` and start serving in a background task.
    pub async fn start(&mut self, addr: &str) -> Result<SocketAddr> {
        if let Some(address) = self.address {
            return Err(ServerError::AlreadyRunning {
                address: address.to_string(),
            }
            .into());
        }

        let socket_addr: SocketAddr = addr.parse().map_err(|e| ServerError::Bind {
            address: addr.to_string(),
            reason: format!("Invalid address: {e}"),
        })?;
        let listener = TcpListener::bind(socket_addr)
            .await
            .map_err(|e| ServerError::Bind {
                address: addr.to_string(),
                reason: e.to_string(),
            })?;
        // Get the actual bound address (important for port 0)
        let actual_addr = listener.local_addr()?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let app = router(self.store.clone());
        let task = tokio::spawn(async move {
            let served = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await;
            if let Err(e) = served {
                tracing::error!("Server failed: {e}");
            }
        });

        tracing::info!(address = %actual_addr, "Sync server listening");
        self.address = Some(actual_addr);
        self.shutdown = Some(shutdown_tx);
        self.task = Some(task);
        Ok(actual_addr)
    }

    /// Trigger graceful shutdown and wait for the server task to finish.
    pub async fn stop(&mut self) -> Result<()> {
        let Some(task) = self.task.take() else {
            return Err(ServerError::NotRunning.into());
        };
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        self.address = None;
        if let Err(e) = task.await {
            tracing::error!("Server task ended abnormally: {e}");
        }
        tracing::info!("Sync server stopped");
        Ok(())
    }
}
