//! Port Interfaces
//!
//! Defines the interfaces (ports) the simulation depends on, following
//! the Hexagonal Architecture pattern. Infrastructure adapters and tests
//! supply the implementations.
//!
//! ## Driven Ports (Outbound)
//!
//! - `Clock`: Wall-clock time used for market hours and timestamps
//! - `RandomSource`: Signed uniform draws feeding the volatility model
//! - `QuoteSourcePort`: External market-data provider with simulated fallback

mod clock_port;
mod quote_source_port;
mod random_port;

pub use clock_port::{Clock, FixedClock, SystemClock};
pub use quote_source_port::{QuoteSourceError, QuoteSourcePort};
pub use random_port::{FixedRandom, RandomSource, SeededRandom, SequenceRandom, ThreadRandom};

#[cfg(test)]
pub use quote_source_port::MockQuoteSourcePort;
