//! Web server module.

mod handlers;
mod rss;

pub use handlers::*;

use crate::config::{AppConfig, ServerConfig};
use crate::db::RecordStore;

use axum::{routing::get, Router};
use std::future::Future;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn RecordStore>,
}

/// Web server for UpTrail.
pub struct Server {
    server_config: ServerConfig,
    state: AppState,
}

impl Server {
    /// Create a new server with the given dependencies.
    pub fn new(server_config: ServerConfig, config: Arc<AppConfig>, store: Arc<dyn RecordStore>) -> Self {
        Self {
            server_config,
            state: AppState { config, store },
        }
    }

    /// Build the router with all routes.
    fn routes(&self) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        Router::new()
            .route("/health", get(handlers::handle_health))
            .route("/version", get(handlers::handle_version))
            .route("/api/config", get(handlers::handle_get_config))
            .route("/api/heartbeat", get(handlers::handle_get_heartbeat))
            .route("/rss", get(handlers::handle_rss))
            .layer(cors)
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Serve until `shutdown` resolves.
    pub async fn start<F>(&self, shutdown: F) -> Result<(), Box<dyn std::error::Error + Send + Sync>>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = format!("{}:{}", self.server_config.http_host, self.server_config.http_port);
        let router = self.routes();

        let listener = tokio::net::TcpListener::bind(&addr).await?;
        tracing::info!("Web server listening on {}", listener.local_addr()?);

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await?;

        Ok(())
    }
}
