//! HTTP Server
//!
//! Snapshot API, market-event trigger, quote lookup, Server-Sent Events,
//! health checks and Prometheus metrics on one port.
//!
//! # Endpoints
//!
//! - `GET /health` - JSON health status
//! - `GET /healthz` - Kubernetes liveness probe (simple OK)
//! - `GET /readyz` - Kubernetes readiness probe (both simulations running)
//! - `GET /metrics` - Prometheus metrics in text format
//! - `GET /api/securities`, `GET /api/securities/{symbol}` - Security snapshots
//! - `GET /api/indices`, `GET /api/indices/{symbol}` - Index snapshots
//! - `POST /api/events` - Apply a one-shot market event
//! - `GET /api/quotes?symbols=A,B` - Quotes with simulated fallback
//! - `GET /api/stream` - Server-Sent Events for every published list

mod api;
mod health;
mod sse;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::routing::{get, post};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::application::services::SimulationService;
use crate::domain::instrument::ProfileKind;
use crate::infrastructure::broadcast::SharedBroadcastHub;
use crate::infrastructure::quotes::FallbackQuoteSource;

pub use api::{ApiError, EventRequest, EventResponse, QuotesQuery};
pub use health::{HealthResponse, HealthStatus, ProfileInfo, QuoteSourceInfo};

// =============================================================================
// Server State
// =============================================================================

/// Shared state for the HTTP server.
pub struct HttpServerState {
    version: String,
    started_at: Instant,
    securities: SimulationService,
    indices: SimulationService,
    hub: SharedBroadcastHub,
    quotes: Arc<FallbackQuoteSource>,
    shutdown: CancellationToken,
}

impl HttpServerState {
    /// Create new server state.
    ///
    /// Open event streams end once `shutdown` is cancelled.
    #[must_use]
    pub fn new(
        version: String,
        securities: SimulationService,
        indices: SimulationService,
        hub: SharedBroadcastHub,
        quotes: Arc<FallbackQuoteSource>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            version,
            started_at: Instant::now(),
            securities,
            indices,
            hub,
            quotes,
            shutdown,
        }
    }

    const fn service(&self, profile: ProfileKind) -> &SimulationService {
        match profile {
            ProfileKind::Securities => &self.securities,
            ProfileKind::Indices => &self.indices,
        }
    }
}

/// Build the application router.
pub fn router(state: Arc<HttpServerState>) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/healthz", get(health::liveness_handler))
        .route("/readyz", get(health::readiness_handler))
        .route("/metrics", get(health::metrics_handler))
        .route("/api/securities", get(api::list_securities))
        .route("/api/securities/{symbol}", get(api::get_security))
        .route("/api/indices", get(api::list_indices))
        .route("/api/indices/{symbol}", get(api::get_index))
        .route("/api/events", post(api::post_event))
        .route("/api/quotes", get(api::get_quotes))
        .route("/api/stream", get(sse::stream_handler))
        .with_state(state)
}

// =============================================================================
// HTTP Server
// =============================================================================

/// HTTP server for the simulator.
pub struct HttpServer {
    port: u16,
    state: Arc<HttpServerState>,
    cancel: CancellationToken,
}

impl HttpServer {
    /// Create a new HTTP server.
    #[must_use]
    pub const fn new(port: u16, state: Arc<HttpServerState>, cancel: CancellationToken) -> Self {
        Self {
            port,
            state,
            cancel,
        }
    }

    /// Run the server until cancelled.
    ///
    /// # Errors
    ///
    /// Returns `HttpServerError` if binding fails or the HTTP server
    /// encounters a fatal error while running.
    pub async fn run(self) -> Result<(), HttpServerError> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| HttpServerError::BindFailed(self.port, e.to_string()))?;

        self.serve(listener).await
    }

    /// Serve on an already bound listener until cancelled.
    ///
    /// # Errors
    ///
    /// Returns `HttpServerError::ServerFailed` if the HTTP server
    /// encounters a fatal error while running.
    pub async fn serve(self, listener: TcpListener) -> Result<(), HttpServerError> {
        let app = router(self.state);

        match listener.local_addr() {
            Ok(addr) => tracing::info!(%addr, "HTTP server listening"),
            Err(_) => tracing::info!(port = self.port, "HTTP server listening"),
        }

        axum::serve(listener, app)
            .with_graceful_shutdown(self.cancel.cancelled_owned())
            .await
            .map_err(|e| HttpServerError::ServerFailed(e.to_string()))?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

// =============================================================================
// Errors
// =============================================================================

/// HTTP server errors.
#[derive(Debug, thiserror::Error)]
pub enum HttpServerError {
    /// Failed to bind to port.
    #[error("failed to bind to port {0}: {1}")]
    BindFailed(u16, String),

    /// Server error.
    #[error("server error: {0}")]
    ServerFailed(String),
}
