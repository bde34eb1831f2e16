//! Domain Layer - Instruments, snapshots and the volatility model.
//!
//! This layer contains the core simulation types with no I/O. Everything
//! here is pure Rust with serialization support; timers, randomness and
//! clocks are supplied from the outside.

/// Instrument seeds, snapshots and sector classification.
pub mod instrument;

/// Authoritative in-memory snapshot list.
pub mod store;

/// Subscriber callback registry with isolated fan-out.
pub mod subscription;

/// Price/volume step function and market-event shocks.
pub mod volatility;
