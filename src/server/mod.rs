//! HTTP server
//!
//! Routes:
//! - `POST /api/search/execute`: run a query
//! - `GET /api/health`: liveness and connection state
//! - `<base_path>/*`: built front-end, `index.html` for unknown paths
//!
//! Anything else also falls back to `index.html`.

pub mod handlers;
pub mod response;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use axum::Router;
use axum::http::header::{ACCEPT, CONTENT_TYPE};
use axum::http::{HeaderValue, Method};
use axum::routing::{get, post};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

pub use handlers::{ExecuteRequest, ExecuteResponse, HealthResponse};
pub use response::ApiError;

use crate::config::ServerConfig;
use crate::error::Result;
use crate::executor::QueryBackend;

/// State shared by all handlers
pub struct AppState {
    pub backend: Arc<dyn QueryBackend>,
    pub default_collection: String,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(backend: Arc<dyn QueryBackend>, default_collection: impl Into<String>) -> Self {
        Self {
            backend,
            default_collection: default_collection.into(),
        }
    }
}

/// Bind and serve until `shutdown` is cancelled
pub async fn serve(
    config: &ServerConfig,
    state: SharedState,
    shutdown: CancellationToken,
) -> Result<()> {
    let listener = TcpListener::bind((config.host.as_str(), config.port)).await?;
    let addr = listener.local_addr()?;
    let app = build_router(state, config);

    info!(
        %addr,
        static_dir = %config.static_dir.display(),
        base_path = %config.base_path,
        "Search lab server running on http://{}",
        addr
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    info!("Server stopped");
    Ok(())
}

/// Assemble routes, static assets and layers
pub fn build_router(state: SharedState, config: &ServerConfig) -> Router {
    let index = config.static_dir.join("index.html");
    let assets = ServeDir::new(&config.static_dir).fallback(ServeFile::new(&index));
    let base_path = config.base_path.trim_end_matches('/');

    let mut router = Router::new()
        .route("/api/search/execute", post(handlers::execute_handler))
        .route("/api/health", get(handlers::health_handler));

    if base_path.is_empty() {
        router = router.fallback_service(assets);
    } else {
        router = router
            .nest_service(base_path, assets)
            .fallback_service(ServeFile::new(&index));
    }

    router
        .layer(build_cors_layer(&config.allowed_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Any origin when `origins` is empty, otherwise only the listed ones
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::permissive();
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| {
            let normalized = origin.trim().trim_end_matches('/');
            match HeaderValue::from_str(normalized) {
                Ok(value) if !normalized.is_empty() => Some(value),
                _ => {
                    warn!(%origin, "Ignoring invalid CORS origin");
                    None
                }
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([ACCEPT, CONTENT_TYPE])
}
