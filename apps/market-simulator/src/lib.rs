#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::needless_pass_by_value,
        clippy::cast_precision_loss,
        clippy::items_after_statements
    )
)]

//! Market Simulator - Synthetic Securities and Index Feeds
//!
//! Keeps two in-memory lists of instrument snapshots (securities and market
//! indices), perturbs them on a timer with a bounded random walk, applies
//! on-demand bullish/bearish shocks, and pushes every new list to
//! subscribers.
//!
//! # Layers (inside → outside)
//!
//! - **Domain**: Pure simulation types
//!   - `instrument`: Seeds, snapshots, sectors
//!   - `volatility`: Price/volume step and market-event shocks
//!   - `store`: Atomically replaced snapshot list
//!   - `subscription`: Callback registry with isolated fan-out
//!
//! - **Application**: Use cases and port definitions
//!   - `ports`: Clock, random source, external quote source
//!   - `services`: Simulation service lifecycle and ticking
//!
//! - **Infrastructure**: Adapters and process plumbing
//!   - `broadcast`: Channel-based fan-out for async consumers
//!   - `http`: REST API, Server-Sent Events, health, metrics
//!   - `quotes`: Quote lookups with simulated fallback
//!   - `config`: Environment configuration and seed files
//!
//! # Data Flow
//!
//! ```text
//!  timer / POST /api/events
//!           │
//!           ▼
//!  ┌──────────────────┐  callbacks  ┌───────────────┐     ┌──────────┐
//!  │SimulationService │────────────►│ Broadcast Hub │────►│   SSE    │──► Client N
//!  │ (securities /    │             └───────────────┘     └──────────┘
//!  │  indices)        │◄──── GET /api/securities, /api/indices, /api/quotes
//!  └──────────────────┘
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Core simulation types with no I/O.
pub mod domain;

/// Application layer - Use cases and port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::instrument::{
    InstrumentSnapshot, ProfileKind, Sector, SeedError, SeedInstrument, SnapshotList, Symbol,
};
pub use domain::subscription::{NotifyReport, SubscriberId};
pub use domain::volatility::{MarketDirection, MarketHours, VolatilityModel};

// Application services and ports
pub use application::ports::{
    Clock, FixedClock, FixedRandom, QuoteSourceError, QuoteSourcePort, RandomSource,
    SeededRandom, SequenceRandom, SystemClock, ThreadRandom,
};
pub use application::services::{
    ServiceSettings, SimulationError, SimulationService, SubscriptionHandle,
};

// Infrastructure config
pub use infrastructure::config::{ConfigError, SimulatorConfig};

// HTTP server
pub use infrastructure::http::{HttpServer, HttpServerError, HttpServerState, router};

// Broadcast hub (for integration tests)
pub use infrastructure::broadcast::{
    BroadcastConfig, BroadcastStats, SharedBroadcastHub, SnapshotBroadcastHub,
};

// Metrics
pub use infrastructure::metrics::init_metrics;

// Telemetry
pub use infrastructure::telemetry::{TelemetryConfig, TelemetryGuard, init as init_telemetry};
