// Main entry point - Dependency injection and server setup
mod domain;
mod application;
mod infrastructure;
mod presentation;

use std::{net::SocketAddr, sync::Arc};
use anyhow::Context;
use axum::{
    routing::{get, post},
    Router,
};
use chrono::Utc;
use tokio::sync::mpsc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::application::commentary_service::CommentaryService;
use crate::application::connection_manager::ConnectionManager;
use crate::application::dashboard_service::DashboardService;
use crate::application::patient_monitor::PatientMonitor;
use crate::application::text_generator::TextGenerator;
use crate::infrastructure::config::load_client_config;
use crate::infrastructure::gemini_client::GeminiClient;
use crate::infrastructure::ws_transport::WsTransport;
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{
    delete_reconnect, get_dashboard, get_status, health_check, post_commentary, post_reconnect,
    post_stats, stream_dashboard,
};

const DASHBOARD_COMMAND_BUFFER: usize = 256;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load configuration
    let config = load_client_config()?;

    // Create adapters (infrastructure layer)
    let transport = Arc::new(WsTransport::new(
        config.connection.url.clone(),
        config.connection.connect_timeout(),
    ));
    let gemini = &config.providers.gemini;
    let generator: Option<Arc<dyn TextGenerator>> = if gemini.is_configured() {
        Some(Arc::new(GeminiClient::new(gemini)?) as Arc<dyn TextGenerator>)
    } else {
        None
    };

    // Create services (application layer)
    let dashboard_service = DashboardService::new();
    let (dashboard_tx, dashboard_rx) = mpsc::channel(DASHBOARD_COMMAND_BUFFER);
    let projector = dashboard_service.spawn_projector(dashboard_rx);

    let patients = PatientMonitor::from_entropy(Utc::now())
        .spawn(config.patient_period(), dashboard_tx.clone());

    let manager = ConnectionManager::new(transport, config.manager_settings(), dashboard_tx);
    let (manager_handle, manager_task) = manager.spawn();

    let commentary_service =
        CommentaryService::new(generator, gemini.rate_limit(), gemini.timeout());

    // Create application state
    let state = Arc::new(AppState {
        dashboard_service,
        commentary_service,
        manager: manager_handle.clone(),
    });

    // Build router (presentation layer)
    // Compression is handled in the response builders, so no CompressionLayer here.
    let router = Router::new()
        .route("/healthz", get(health_check))
        .route("/status", get(get_status))
        .route("/dashboard", get(get_dashboard))
        .route("/dashboard/stream", get(stream_dashboard))
        .route("/commentary", post(post_commentary))
        .route("/stats", post(post_stats))
        .route("/reconnect", post(post_reconnect).delete(delete_reconnect))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr: SocketAddr = config
        .server
        .bind
        .parse()
        .with_context(|| format!("Invalid bind address {}", config.server.bind))?;
    tracing::info!("Starting care-monitor on {} (live feed {})", addr, config.connection.url);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tokio::select! {
        result = axum::serve(listener, router).into_future() => result?,
        signal = tokio::signal::ctrl_c() => signal.context("Failed to listen for shutdown signal")?,
    }

    tracing::info!("Shutting down");
    if let Err(e) = manager_handle.shutdown().await {
        tracing::warn!("{}", e);
    }
    if let Err(e) = manager_task.await {
        tracing::warn!("Connection manager task ended abnormally: {}", e);
    }
    patients.abort();
    projector.abort();

    Ok(())
}
