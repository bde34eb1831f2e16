//! Health check and metrics handlers.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::HttpServerState;
use crate::application::services::SimulationService;
use crate::infrastructure::broadcast::BroadcastStats;
use crate::infrastructure::metrics::get_metrics_handle;

// =============================================================================
// Health Response Types
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Overall status: "healthy", "degraded", or "unhealthy".
    pub status: HealthStatus,
    /// Simulator version.
    pub version: String,
    /// Server uptime in seconds.
    pub uptime_secs: u64,
    /// Current time.
    pub current_time: DateTime<Utc>,
    /// Securities simulation status.
    pub securities: ProfileInfo,
    /// Indices simulation status.
    pub indices: ProfileInfo,
    /// Streaming receivers per channel.
    pub streaming: BroadcastStats,
    /// External quote source status.
    pub quotes: QuoteSourceInfo,
}

/// Overall health status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Both simulations running.
    Healthy,
    /// One simulation stopped.
    Degraded,
    /// No simulation running.
    Unhealthy,
}

/// Status of one simulation service.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileInfo {
    /// Whether the timer is armed.
    pub running: bool,
    /// Tick period in milliseconds, if running.
    pub interval_ms: Option<u64>,
    /// Tracked instruments.
    pub instruments: usize,
    /// Registered subscribers.
    pub subscribers: usize,
}

/// External quote source status.
#[derive(Debug, Clone, Serialize)]
pub struct QuoteSourceInfo {
    /// Whether the external source is being skipped.
    pub holding_off: bool,
    /// Consecutive external failures.
    pub consecutive_failures: u32,
}

// =============================================================================
// HTTP Handlers
// =============================================================================

pub(super) async fn health_handler(
    State(state): State<Arc<HttpServerState>>,
) -> impl IntoResponse {
    let response = build_health_response(&state);
    let status_code = match response.status {
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };
    (status_code, Json(response))
}

pub(super) async fn liveness_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

pub(super) async fn readiness_handler(
    State(state): State<Arc<HttpServerState>>,
) -> impl IntoResponse {
    if state.securities.is_running() && state.indices.is_running() {
        (StatusCode::OK, "READY")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "NOT READY")
    }
}

pub(super) async fn metrics_handler() -> impl IntoResponse {
    get_metrics_handle().map_or_else(
        || {
            (
                StatusCode::SERVICE_UNAVAILABLE,
                [("content-type", "text/plain")],
                "Metrics not initialized".to_string(),
            )
        },
        |handle| {
            (
                StatusCode::OK,
                [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
                handle.render(),
            )
        },
    )
}

fn build_health_response(state: &HttpServerState) -> HealthResponse {
    let securities = profile_info(&state.securities);
    let indices = profile_info(&state.indices);
    let status = determine_health_status(&[securities.running, indices.running]);

    HealthResponse {
        status,
        version: state.version.clone(),
        uptime_secs: state.started_at.elapsed().as_secs(),
        current_time: Utc::now(),
        securities,
        indices,
        streaming: state.hub.stats(),
        quotes: QuoteSourceInfo {
            holding_off: state.quotes.is_holding_off(),
            consecutive_failures: state.quotes.consecutive_failures(),
        },
    }
}

fn profile_info(service: &SimulationService) -> ProfileInfo {
    ProfileInfo {
        running: service.is_running(),
        interval_ms: service
            .interval()
            .and_then(|interval| u64::try_from(interval.as_millis()).ok()),
        instruments: service.instrument_count(),
        subscribers: service.subscriber_count(),
    }
}

fn determine_health_status(running: &[bool]) -> HealthStatus {
    let running_count = running.iter().filter(|&&r| r).count();

    match running_count {
        0 => HealthStatus::Unhealthy,
        n if n == running.len() => HealthStatus::Healthy,
        _ => HealthStatus::Degraded,
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test]
    fn health_status_serialization() {
        assert_eq!(
            serde_json::to_string(&HealthStatus::Healthy).unwrap(),
            "\"healthy\""
        );
        assert_eq!(
            serde_json::to_string(&HealthStatus::Unhealthy).unwrap(),
            "\"unhealthy\""
        );
    }

    #[test_case(&[true, true], HealthStatus::Healthy ; "all running")]
    #[test_case(&[true, false], HealthStatus::Degraded ; "one running")]
    #[test_case(&[false, false], HealthStatus::Unhealthy ; "none running")]
    fn status_from_running_flags(running: &[bool], expected: HealthStatus) {
        assert_eq!(determine_health_status(running), expected);
    }
}
