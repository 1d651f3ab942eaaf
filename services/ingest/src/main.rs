//! Reading ingest service for the vireo sensor telemetry rig.
//!
//! Accepts sensor readings posted by ESP32 field nodes over HTTP, stamps
//! them with the arrival wall-clock time, and appends them to the shared
//! JSON log that the embed tool later correlates against.
//!
//! # Architecture
//!
//! ```text
//! ESP32 node -> HTTP POST -> SensorReading -> ReadingStore -> sensor_data.json
//! ```
//!
//! # Configuration
//!
//! Configuration is loaded from:
//! 1. Configuration files (/etc/vireo/ingest.toml, config/ingest.toml)
//! 2. Environment variables (prefixed with VIREO_)
//!
//! See `config.rs` for detailed configuration options.

mod config;
mod server;

use anyhow::{Context, Result};
use config::IngestConfig;
use server::{AppState, IngestStats};
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use vireo_readings::ReadingStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = load_config()?;

    // Initialize logging
    init_logging(&config.logging)?;

    info!(
        service = "vireo-ingest",
        version = env!("CARGO_PKG_VERSION"),
        data_file = %config.store.data_file,
        "Starting reading ingest service"
    );

    // Validate configuration
    config.validate()?;

    // Initialize metrics
    if config.metrics.enabled {
        init_metrics(config.metrics.port)?;
    }

    // Create application state
    let state = AppState {
        store: Arc::new(ReadingStore::new(&config.store.data_file)),
        stats: Arc::new(IngestStats::default()),
    };

    // Bind the listener before spawning so startup failures are fatal
    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;

    info!(address = %addr, "Listening for sensor submissions");

    let router = server::create_router(state.clone());
    let server_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router).await {
            error!(error = %e, "HTTP server error");
        }
    });

    // Wait for shutdown signal
    shutdown_signal().await;

    info!("Shutting down ingest service");

    server_handle.abort();
    log_final_stats(&state.stats);

    info!("Ingest service stopped");

    Ok(())
}

/// Load configuration, falling back to environment-only sources.
fn load_config() -> Result<IngestConfig> {
    let config = IngestConfig::load().or_else(|e| {
        warn!(error = %e, "Failed to load config from files, trying environment");
        IngestConfig::from_env()
    })?;

    Ok(config)
}

/// Initialize the tracing/logging subsystem.
fn init_logging(config: &config::LoggingConfig) -> Result<()> {
    let level = match config.level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::from_default_env()
        .add_directive(format!("vireo_ingest={}", level).parse()?)
        .add_directive(format!("vireo_readings={}", level).parse()?)
        .add_directive("hyper=warn".parse()?)
        .add_directive("tower_http=info".parse()?);

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.format == "json" {
        subscriber.with(fmt::layer().json()).init();
    } else {
        subscriber.with(fmt::layer().pretty()).init();
    }

    Ok(())
}

/// Initialize Prometheus metrics exporter.
fn init_metrics(port: u16) -> Result<()> {
    let builder = metrics_exporter_prometheus::PrometheusBuilder::new();

    builder
        .with_http_listener(([0, 0, 0, 0], port))
        .install()
        .context("Failed to install Prometheus metrics exporter")?;

    info!(port = port, "Prometheus metrics exporter started");

    Ok(())
}

/// Wait for shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            info!("Received SIGTERM signal");
        }
    }
}

/// Log final statistics on shutdown.
fn log_final_stats(stats: &IngestStats) {
    let snapshot = stats.snapshot();

    info!("=== Final Statistics ===");
    info!(
        readings_accepted = snapshot.readings_accepted,
        readings_decoded = snapshot.readings_decoded,
        readings_fallback = snapshot.readings_fallback,
        store_errors = snapshot.store_errors,
        "Ingest final stats"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::Ordering;

    #[test]
    fn test_app_state_clones_share_counters() {
        let state = AppState {
            store: Arc::new(ReadingStore::new("sensor_data.json")),
            stats: Arc::new(IngestStats::default()),
        };

        let clone = state.clone();
        clone.stats.readings_accepted.fetch_add(1, Ordering::Relaxed);

        assert_eq!(state.stats.snapshot().readings_accepted, 1);
    }

    #[test]
    fn test_default_config_binds_any_interface() {
        let config = IngestConfig::default();
        assert_eq!(config.bind_addr(), "0.0.0.0:8080");
    }
}
