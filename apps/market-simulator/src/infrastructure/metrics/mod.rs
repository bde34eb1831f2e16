//! Prometheus Metrics Module
//!
//! Exposes simulator metrics via Prometheus format for monitoring.
//!
//! # Metrics Categories
//!
//! - **Ticks**: Mutation passes and their processing time per profile
//! - **Events**: One-shot market events by direction
//! - **Subscribers**: Registered callbacks, deliveries and panics
//! - **Streaming**: Broadcast receivers attached to the SSE endpoint
//! - **Quotes**: External quote fetches and simulated fallbacks
//!
//! # Integration
//!
//! Metrics are exposed at `/metrics` on the HTTP server port.

use std::sync::OnceLock;
use std::time::Duration;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

use crate::domain::instrument::ProfileKind;
use crate::domain::volatility::MarketDirection;

// =============================================================================
// Global Metrics Handle
// =============================================================================

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize the Prometheus metrics recorder.
///
/// Subsequent calls return the handle installed by the first one.
///
/// # Errors
///
/// Returns `BuildError` if the recorder cannot be installed.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    if let Some(handle) = PROMETHEUS_HANDLE.get() {
        return Ok(handle.clone());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    register_metrics();
    Ok(PROMETHEUS_HANDLE.get_or_init(|| handle).clone())
}

/// Get the Prometheus handle for rendering metrics.
///
/// Returns `None` if metrics have not been initialized.
#[must_use]
pub fn get_metrics_handle() -> Option<PrometheusHandle> {
    PROMETHEUS_HANDLE.get().cloned()
}

// =============================================================================
// Metric Registration
// =============================================================================

fn register_metrics() {
    // Tick counters
    describe_counter!(
        "market_sim_ticks_total",
        "Total mutation passes applied by the simulation timer"
    );
    describe_counter!(
        "market_sim_events_total",
        "Total one-shot market events applied"
    );

    // Subscriber counters
    describe_counter!(
        "market_sim_notifications_total",
        "Total snapshot lists delivered to subscriber callbacks"
    );
    describe_counter!(
        "market_sim_subscriber_failures_total",
        "Total subscriber callbacks that panicked"
    );

    // State gauges
    describe_gauge!(
        "market_sim_subscribers",
        "Number of registered subscriber callbacks"
    );
    describe_gauge!(
        "market_sim_running",
        "Whether the simulation timer is armed (1) or not (0)"
    );
    describe_gauge!(
        "market_sim_broadcast_receivers",
        "Number of streaming clients attached to the broadcast hub"
    );

    // Quote counters
    describe_counter!(
        "market_sim_quote_requests_total",
        "Total quote requests by answering origin"
    );
    describe_counter!(
        "market_sim_quote_source_errors_total",
        "Total external quote source failures by type"
    );

    // Latency histograms
    describe_histogram!(
        "market_sim_tick_duration_seconds",
        "Time to mutate the snapshot list and notify subscribers"
    );
}

// =============================================================================
// Metric Recording Functions
// =============================================================================

/// Record one timer-driven mutation pass.
pub fn record_tick(profile: ProfileKind, duration: Duration) {
    counter!("market_sim_ticks_total", "profile" => profile.as_str()).increment(1);
    histogram!(
        "market_sim_tick_duration_seconds",
        "profile" => profile.as_str()
    )
    .record(duration.as_secs_f64());
}

/// Record a one-shot market event.
pub fn record_event(profile: ProfileKind, direction: MarketDirection) {
    counter!(
        "market_sim_events_total",
        "profile" => profile.as_str(),
        "direction" => direction.as_str()
    )
    .increment(1);
}

/// Record the outcome of one fan-out pass.
pub fn record_notifications(profile: ProfileKind, delivered: usize, failed: usize) {
    if delivered > 0 {
        counter!(
            "market_sim_notifications_total",
            "profile" => profile.as_str()
        )
        .increment(delivered as u64);
    }
    if failed > 0 {
        counter!(
            "market_sim_subscriber_failures_total",
            "profile" => profile.as_str()
        )
        .increment(failed as u64);
    }
}

/// Update the registered subscriber count.
#[allow(clippy::cast_precision_loss)]
pub fn set_subscribers(profile: ProfileKind, count: usize) {
    gauge!("market_sim_subscribers", "profile" => profile.as_str()).set(count as f64);
}

/// Update the running flag.
pub fn set_running(profile: ProfileKind, running: bool) {
    gauge!("market_sim_running", "profile" => profile.as_str())
        .set(if running { 1.0 } else { 0.0 });
}

/// Update the broadcast receiver count.
#[allow(clippy::cast_precision_loss)]
pub fn set_broadcast_receivers(profile: ProfileKind, count: usize) {
    gauge!(
        "market_sim_broadcast_receivers",
        "profile" => profile.as_str()
    )
    .set(count as f64);
}

/// Record which origin answered a quote request.
pub fn record_quote_request(origin: &'static str) {
    counter!("market_sim_quote_requests_total", "origin" => origin).increment(1);
}

/// Record an external quote source failure.
pub fn record_quote_source_error(error_type: &'static str) {
    counter!(
        "market_sim_quote_source_errors_total",
        "error_type" => error_type
    )
    .increment(1);
}

// =============================================================================
// Tests
// =============================================================================
