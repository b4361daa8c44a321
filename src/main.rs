// Main entry point - Dependency injection and server setup
mod application;
mod domain;
mod infrastructure;
mod presentation;

use anyhow::Context;
use axum::{routing::get, Router};
use std::{net::SocketAddr, sync::Arc};
use tokio::sync::mpsc;
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::application::dashboard_service::DashboardService;
use crate::application::ingestion_service::IngestionService;
use crate::application::sample_store::SampleStore;
use crate::domain::aggregator::WindowAggregator;
use crate::infrastructure::config::{load_app_config, SensorSettings};
use crate::infrastructure::jsonl_store::JsonLinesStore;
use crate::infrastructure::simulation::SimulatedTap;
use crate::infrastructure::{serial_source, simulation};
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{dashboard, health_check, live_data, stream_dashboard};

const SENSOR_LINE_CAPACITY: usize = 64;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load configuration
    let app_config = load_app_config().context("Failed to load configuration")?;

    // Create store (infrastructure layer)
    let store: Arc<dyn SampleStore> = Arc::new(JsonLinesStore::new(&app_config.store.path));
    tracing::info!("Recording samples to {}", app_config.store.path.display());

    // Sensor source feeds ingestion
    let (line_tx, line_rx) = mpsc::channel(SENSOR_LINE_CAPACITY);
    tokio::spawn(IngestionService::new(store.clone(), app_config.sensor.max_flow).run(line_rx));
    start_sensor_source(&app_config.sensor, line_tx);

    // Create services (application layer)
    let aggregator = WindowAggregator::new(
        app_config.sensor.taps.clone(),
        app_config.aggregation.window_settings(),
    );
    let dashboard_service =
        DashboardService::new(store.clone(), aggregator, app_config.notifications.notifier());

    // Create application state
    let state = Arc::new(AppState {
        store,
        latest: dashboard_service.latest(),
        updates: dashboard_service.updates(),
    });
    tokio::spawn(dashboard_service.run(app_config.poll_interval()));

    // Build router (presentation layer)
    let router = Router::new()
        .route("/healthz", get(health_check))
        .route("/api/live-data", get(live_data))
        .route("/api/dashboard", get(dashboard))
        .route("/api/dashboard/stream", get(stream_dashboard))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr: SocketAddr = app_config
        .server
        .bind_addr
        .parse()
        .with_context(|| format!("Invalid bind address {}", app_config.server.bind_addr))?;
    tracing::info!("Starting water-usage-monitor on {}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router).await?;

    Ok(())
}

/// Read the serial board, falling back to generated readings when it
/// cannot be opened.
fn start_sensor_source(settings: &SensorSettings, tx: mpsc::Sender<String>) {
    let taps = SimulatedTap::for_sensors(&settings.taps);
    if settings.simulate {
        tokio::spawn(simulation::run(taps, simulation::READING_PERIOD, tx));
        return;
    }

    match serial_source::open(&settings.serial_port, settings.baud_rate) {
        Ok(port) => {
            tracing::info!(
                "Connected to sensor board on {} at {} baud",
                settings.serial_port.display(),
                settings.baud_rate
            );
            tokio::spawn(serial_source::forward_lines(port, tx));
        }
        Err(e) => {
            tracing::warn!(
                "Could not open {}: {}. Falling back to simulation",
                settings.serial_port.display(),
                e
            );
            tokio::spawn(simulation::run(taps, simulation::READING_PERIOD, tx));
        }
    }
}
