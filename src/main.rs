//! UpTrail - HTTP Uptime Monitoring
//!
//! Periodically checks configured HTTP endpoints, records every outcome,
//! posts webhook notifications on up/down transitions and serves aggregated
//! heartbeat history.

mod config;
mod db;
mod heartbeat;
mod notify;
mod probe;
mod scheduler;
mod web;

use config::{AppConfig, ServerConfig};
use db::Store;
use notify::WebhookNotifier;
use probe::Prober;
use scheduler::{Scheduler, StatusTracker};
use web::Server;

use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive("uptrail=info".parse()?))
        .init();

    // Load configuration
    let mut server_cfg = ServerConfig::load();
    let app_cfg = AppConfig::load(&server_cfg.config_path).map_err(|e| {
        tracing::error!("Configuration error in {}: {}", server_cfg.config_path, e);
        e
    })?;
    server_cfg.merge(&app_cfg.server);
    tracing::info!("Loaded {} monitors from {}", app_cfg.monitors.len(), server_cfg.config_path);
    tracing::info!("Using database at {}", server_cfg.db_path);

    // Initialize database
    let store = Arc::new(Store::new(&server_cfg.db_path)?);
    tracing::info!("Database initialized with {} stored records", store.count_records()?);

    // Create scheduler over a snapshot of the configured monitors
    let app_cfg = Arc::new(app_cfg);
    let scheduler = Arc::new(Scheduler::new(
        app_cfg.monitors.clone(),
        app_cfg.cycle_interval(),
        Prober::new()?,
        store.clone(),
        Arc::new(StatusTracker::new()),
        Arc::new(WebhookNotifier::new()?),
    ));
    scheduler.start();

    // Start web server
    tracing::info!(
        "Starting UpTrail on {}:{}...",
        server_cfg.http_host,
        server_cfg.http_port
    );
    let server = Server::new(server_cfg, app_cfg, store);
    let result = server.start(shutdown_signal()).await;

    scheduler.stop().await;
    result
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
