//! HTTP and WebSocket server for the document explorer

pub mod routes;
pub mod state;
pub mod stream;

#[cfg(test)]
pub(crate) mod testing;

use axum::{
    http::{request::Parts, HeaderValue, Method},
    routing::get,
    Json, Router,
};
use regex::Regex;
use serde_json::{json, Value};
use std::net::SocketAddr;
use tower_http::{
    cors::{AllowHeaders, AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::config::{CorsConfig, ExplorerConfig};
use crate::error::{Error, Result};
use state::AppState;

/// Document explorer server
pub struct ExplorerServer {
    config: ExplorerConfig,
    state: AppState,
}

impl ExplorerServer {
    /// Create a server backed by the sandboxed RLM engine
    pub fn new(config: ExplorerConfig) -> Self {
        let state = AppState::new(config.clone());
        Self { config, state }
    }

    /// Start the server
    pub async fn start(self) -> Result<()> {
        let addr: SocketAddr = self
            .address()
            .parse()
            .map_err(|e| Error::Config(format!("Invalid address: {}", e)))?;

        let router = build_router(self.state)?;

        tracing::info!("Starting document explorer on http://{}", addr);
        tracing::info!("Streaming queries: ws://{}/ws/query", addr);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| Error::Config(format!("Failed to bind: {}", e)))?;

        axum::serve(listener, router)
            .await
            .map_err(|e| Error::Internal(format!("Server error: {}", e)))?;

        Ok(())
    }

    /// Get the server address
    pub fn address(&self) -> String {
        format!("{}:{}", self.config.server.host, self.config.server.port)
    }
}

/// Build the router with all routes
pub fn build_router(state: AppState) -> Result<Router> {
    let cors = cors_layer(&state.config().cors)?;
    let max_upload_size = state.config().server.max_upload_size;

    Ok(Router::new()
        .route("/health", get(health_check))
        .route("/ws/query", get(stream::query_ws))
        .nest("/api", routes::api_routes(max_upload_size))
        .with_state(state)
        // Middleware layers (applied bottom to top)
        .layer(TraceLayer::new_for_http())
        .layer(cors))
}

/// CORS policy: exact origins plus an optional full-match pattern
fn cors_layer(config: &CorsConfig) -> Result<CorsLayer> {
    let exact = config
        .allowed_origins
        .iter()
        .map(|origin| {
            HeaderValue::from_str(origin)
                .map_err(|_| Error::Config(format!("Invalid CORS origin: {}", origin)))
        })
        .collect::<Result<Vec<_>>>()?;

    let pattern = config
        .origin_pattern
        .as_deref()
        .map(|p| Regex::new(&format!("^(?:{})$", p)))
        .transpose()
        .map_err(|e| Error::Config(format!("Invalid CORS origin pattern: {}", e)))?;

    let allow_origin = AllowOrigin::predicate(move |origin: &HeaderValue, _: &Parts| {
        exact.contains(origin)
            || pattern.as_ref().is_some_and(|re| {
                origin.to_str().map(|o| re.is_match(o)).unwrap_or(false)
            })
    });

    Ok(CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(config.allow_credentials))
}

/// Health check endpoint
async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
