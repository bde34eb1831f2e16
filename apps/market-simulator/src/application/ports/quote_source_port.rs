//! Quote Source Port (Driven Port)
//!
//! Interface for an external market-data provider. Failures at this port
//! never reach end users: the fallback adapter answers from the simulator
//! instead.

use std::time::Duration;

use async_trait::async_trait;

use crate::domain::instrument::InstrumentSnapshot;

/// Quote source error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QuoteSourceError {
    /// Provider refused the request for rate-limit reasons.
    #[error("Quote source rate limited")]
    RateLimited {
        /// Server-suggested wait before retrying.
        retry_after: Option<Duration>,
    },

    /// Provider could not be reached.
    #[error("Quote source unavailable: {0}")]
    Unavailable(String),

    /// Provider answered with something unusable.
    #[error("Invalid quote response: {0}")]
    InvalidResponse(String),
}

/// Port for fetching quotes from an external provider.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuoteSourcePort: Send + Sync {
    /// Fetch the latest quotes for `symbols`.
    ///
    /// # Errors
    ///
    /// Returns `QuoteSourceError` if the provider is unreachable, rate
    /// limited or returns malformed data.
    async fn fetch_quotes(
        &self,
        symbols: &[String],
    ) -> Result<Vec<InstrumentSnapshot>, QuoteSourceError>;
}

impl QuoteSourceError {
    /// Metric label for this error.
    #[must_use]
    pub const fn error_type(&self) -> &'static str {
        match self {
            Self::RateLimited { .. } => "rate_limited",
            Self::Unavailable(_) => "unavailable",
            Self::InvalidResponse(_) => "invalid_response",
        }
    }

    /// Server-suggested wait, if any.
    #[must_use]
    pub const fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after } => *retry_after,
            Self::Unavailable(_) | Self::InvalidResponse(_) => None,
        }
    }
}
