//! Application Layer - Use cases and port definitions.
//!
//! This layer contains the simulation service and the port interfaces
//! it depends on for time, randomness and external quotes.

/// Port interfaces for clocks, random sources and quote providers.
pub mod ports;

/// Application services driving the simulation lifecycle.
pub mod services;
