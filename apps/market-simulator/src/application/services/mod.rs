//! Application Services
//!
//! Services that orchestrate domain logic and coordinate between ports.
//!
//! - `SimulationService`: Timer-driven snapshot mutation, market events and
//!   subscriber fan-out for one instrument list

mod simulation;

pub use simulation::{
    DEFAULT_INDICES_INTERVAL, DEFAULT_SECURITIES_INTERVAL, ServiceSettings, SimulationError,
    SimulationService, SubscriptionHandle,
};
