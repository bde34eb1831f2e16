//! Market Simulator Binary
//!
//! Runs the securities and indices simulations and serves them over HTTP.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin market-simulator
//! ```
//!
//! # Environment Variables
//!
//! - `SIM_HTTP_PORT`: HTTP port for API, SSE, health and metrics (default: 8083)
//! - `SIM_SECURITIES_INTERVAL_MS`: Securities tick period (default: 5000)
//! - `SIM_INDICES_INTERVAL_MS`: Indices tick period (default: 10000)
//! - `SIM_SECURITIES_BASE_VOLATILITY` / `SIM_INDICES_BASE_VOLATILITY`: Per-tick volatility
//! - `SIM_MARKET_HOURS_ENABLED`, `SIM_MARKET_OPEN`, `SIM_MARKET_CLOSE`,
//!   `SIM_EXCHANGE_UTC_OFFSET_MINUTES`, `SIM_MARKET_HOURS_MULTIPLIER`: Session boost
//! - `SIM_SECURITIES_SEED_PATH` / `SIM_INDICES_SEED_PATH`: JSON seed files
//! - `SIM_SECURITIES_CHANNEL_CAPACITY` / `SIM_INDICES_CHANNEL_CAPACITY`: Stream buffers
//! - `OTEL_ENABLED`: Enable OpenTelemetry (default: true)
//! - `OTEL_EXPORTER_OTLP_ENDPOINT`: OTLP endpoint (default: <http://localhost:4317>)
//! - `OTEL_SERVICE_NAME`: Service name (default: cream-market-simulator)
//! - `RUST_LOG`: Log filter (default: info)

use std::sync::Arc;

use anyhow::Context;
use market_simulator::infrastructure::broadcast::{BroadcastConfig, SnapshotBroadcastHub};
use market_simulator::infrastructure::http::{HttpServer, HttpServerState};
use market_simulator::infrastructure::quotes::FallbackQuoteSource;
use market_simulator::infrastructure::telemetry;
use market_simulator::{ProfileKind, SimulationService, SimulatorConfig, init_metrics};
use tokio::signal;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();

    let _telemetry_guard = telemetry::init().context("failed to initialize telemetry")?;

    tracing::info!("Starting market simulator");

    let _metrics_handle = init_metrics().context("failed to install Prometheus recorder")?;

    let config = SimulatorConfig::from_env().context("invalid configuration")?;
    log_config(&config);

    let securities = SimulationService::new(
        config.securities_settings(),
        &config.load_seeds(ProfileKind::Securities)?,
    )?;
    let indices = SimulationService::new(
        config.indices_settings(),
        &config.load_seeds(ProfileKind::Indices)?,
    )?;

    let hub = Arc::new(SnapshotBroadcastHub::new(BroadcastConfig::from(
        &config.broadcast,
    )));
    let _securities_feed = hub.attach(&securities)?;
    let _indices_feed = hub.attach(&indices)?;

    securities.start()?;
    indices.start()?;

    let quotes = Arc::new(FallbackQuoteSource::simulated_only(vec![
        securities.clone(),
        indices.clone(),
    ]));

    let shutdown_token = CancellationToken::new();

    let http_state = Arc::new(HttpServerState::new(
        env!("CARGO_PKG_VERSION").to_string(),
        securities.clone(),
        indices.clone(),
        Arc::clone(&hub),
        quotes,
        shutdown_token.clone(),
    ));
    let http_server = HttpServer::new(config.server.http_port, http_state, shutdown_token.clone());

    let server_task = tokio::spawn(async move {
        if let Err(e) = http_server.run().await {
            tracing::error!(error = %e, "HTTP server error");
        }
    });

    tracing::info!("Market simulator ready");

    await_shutdown(shutdown_token).await;

    securities.destroy();
    indices.destroy();
    if let Err(e) = server_task.await {
        tracing::warn!(error = %e, "HTTP server task did not finish cleanly");
    }

    tracing::info!("Market simulator stopped");
    Ok(())
}

/// Log the parsed configuration.
fn log_config(config: &SimulatorConfig) {
    tracing::info!(
        http_port = config.server.http_port,
        securities_interval_ms = config.simulation.securities_interval.as_millis(),
        indices_interval_ms = config.simulation.indices_interval.as_millis(),
        market_hours = config.market_hours.enabled,
        "Configuration loaded"
    );
    tracing::debug!(
        securities_seed = ?config.seeds.securities_path,
        indices_seed = ?config.seeds.indices_path,
        "Seed sources"
    );
}

/// Load .env file from current directory or any ancestor directory.
fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Wait for shutdown signal (SIGTERM or SIGINT), then cancel the token.
async fn await_shutdown(shutdown_token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }

    shutdown_token.cancel();
}
