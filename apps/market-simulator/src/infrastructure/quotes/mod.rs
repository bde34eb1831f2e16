//! Quote Source Adapters
//!
//! Serves quote requests from an optional external provider, degrading to
//! the local simulators with an exponential hold-off whenever the provider
//! fails or is rate limited.

mod backoff;
mod fallback;

pub use backoff::{BackoffConfig, BackoffPolicy};
pub use fallback::{FallbackQuoteSource, QuoteOrigin, Quotes};
