//! HTTP health endpoint.

use axum::{Router, extract::State, response::Json, routing::get};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

/// Shared health state, fixed at startup.
#[derive(Debug, Clone)]
pub struct HealthState {
    pub pair_count: usize,
    pub exchange_names: Arc<Vec<String>>,
}

impl HealthState {
    pub fn new(pair_count: usize, exchange_names: Vec<String>) -> Self {
        Self {
            pair_count,
            exchange_names: Arc::new(exchange_names),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub pair_count: usize,
    pub exchange_names: Vec<String>,
}

/// Server error type.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("server error: {0}")]
    Serve(#[from] std::io::Error),
}

/// Create the health router.
pub fn create_router(state: HealthState) -> Router {
    Router::new()
        .route("/", get(health_check))
        .with_state(state)
}

async fn health_check(State(state): State<HealthState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "running".to_string(),
        pair_count: state.pair_count,
        exchange_names: state.exchange_names.as_ref().clone(),
    })
}

/// Binds `addr` and serves until the task is dropped.
pub async fn serve(addr: &str, state: HealthState) -> Result<(), ServerError> {
    let listener = TcpListener::bind(addr).await.map_err(|source| ServerError::Bind {
        addr: addr.to_string(),
        source,
    })?;
    serve_on(listener, state).await
}

/// Serves on an already bound listener.
pub async fn serve_on(listener: TcpListener, state: HealthState) -> Result<(), ServerError> {
    if let Ok(local) = listener.local_addr() {
        info!(addr = %local, "Health server listening");
    }
    axum::serve(listener, create_router(state)).await?;
    Ok(())
}
