//! Infrastructure Layer - Adapters and external integrations.
//!
//! This layer contains the concrete implementations of the port interfaces
//! defined in the application layer, plus the process-level plumbing.

/// Broadcast channels that fan published snapshot lists out to streams.
pub mod broadcast;

/// Environment configuration and seed files.
pub mod config;

/// HTTP API, Server-Sent Events and health endpoints.
pub mod http;

/// Prometheus metrics instrumentation.
pub mod metrics;

/// Quote lookups with simulated fallback.
pub mod quotes;

/// Logging and OpenTelemetry tracing.
pub mod telemetry;
