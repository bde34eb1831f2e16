//! Fallback Quote Source
//!
//! Answers quote requests from an optional external provider and degrades
//! to the simulators whenever that provider fails or is rate limited. The
//! caller always gets quotes; only the `origin` field tells them apart.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::time::Instant;

use super::backoff::{BackoffConfig, BackoffPolicy};
use crate::application::ports::{QuoteSourceError, QuoteSourcePort};
use crate::application::services::SimulationService;
use crate::domain::instrument::InstrumentSnapshot;
use crate::infrastructure::metrics;

/// Where a batch of quotes came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QuoteOrigin {
    /// The external provider.
    Primary,
    /// The local simulators.
    Simulated,
}

impl QuoteOrigin {
    /// Get the origin name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Simulated => "simulated",
        }
    }
}

/// A batch of quotes and their origin.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Quotes {
    /// Who answered.
    pub origin: QuoteOrigin,
    /// The quotes, in request order when served locally.
    pub quotes: Vec<InstrumentSnapshot>,
}

#[derive(Debug)]
struct HoldOff {
    policy: BackoffPolicy,
    until: Option<Instant>,
}

impl HoldOff {
    fn active(&self) -> bool {
        self.until.is_some_and(|until| Instant::now() < until)
    }

    fn record_success(&mut self) {
        self.policy.reset();
        self.until = None;
    }

    fn record_failure(&mut self, error: &QuoteSourceError) -> std::time::Duration {
        let backoff = self.policy.next_delay();
        let delay = error.retry_after().map_or(backoff, |hint| hint.max(backoff));
        self.until = Some(Instant::now() + delay);
        delay
    }
}

/// Quote source that falls back to simulated data.
pub struct FallbackQuoteSource {
    primary: Option<Arc<dyn QuoteSourcePort>>,
    simulators: Vec<SimulationService>,
    hold_off: Mutex<HoldOff>,
}

impl std::fmt::Debug for FallbackQuoteSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FallbackQuoteSource")
            .field("has_primary", &self.primary.is_some())
            .field("simulators", &self.simulators)
            .field("hold_off", &*self.hold_off.lock())
            .finish()
    }
}

impl FallbackQuoteSource {
    /// Create a fallback source over an optional external provider.
    #[must_use]
    pub fn new(
        primary: Option<Arc<dyn QuoteSourcePort>>,
        simulators: Vec<SimulationService>,
        backoff: BackoffConfig,
    ) -> Self {
        Self {
            primary,
            simulators,
            hold_off: Mutex::new(HoldOff {
                policy: BackoffPolicy::new(backoff),
                until: None,
            }),
        }
    }

    /// Create a source that always answers from the simulators.
    #[must_use]
    pub fn simulated_only(simulators: Vec<SimulationService>) -> Self {
        Self::new(None, simulators, BackoffConfig::default())
    }

    /// Whether the external provider is currently being skipped.
    #[must_use]
    pub fn is_holding_off(&self) -> bool {
        self.hold_off.lock().active()
    }

    /// Consecutive external failures since the last success.
    #[must_use]
    pub fn consecutive_failures(&self) -> u32 {
        self.hold_off.lock().policy.failures()
    }

    /// Fetch quotes for `symbols`; an empty slice means every tracked
    /// instrument.
    pub async fn fetch(&self, symbols: &[String]) -> Quotes {
        if let Some(primary) = &self.primary
            && !self.is_holding_off()
        {
            match primary.fetch_quotes(symbols).await {
                Ok(quotes) => {
                    self.hold_off.lock().record_success();
                    metrics::record_quote_request(QuoteOrigin::Primary.as_str());
                    return Quotes {
                        origin: QuoteOrigin::Primary,
                        quotes,
                    };
                }
                Err(error) => {
                    let delay = self.hold_off.lock().record_failure(&error);
                    metrics::record_quote_source_error(error.error_type());
                    tracing::warn!(
                        error = %error,
                        hold_off_ms = delay.as_millis(),
                        "Quote source failed, serving simulated quotes"
                    );
                }
            }
        }

        metrics::record_quote_request(QuoteOrigin::Simulated.as_str());
        Quotes {
            origin: QuoteOrigin::Simulated,
            quotes: self.simulated(symbols),
        }
    }

    fn simulated(&self, symbols: &[String]) -> Vec<InstrumentSnapshot> {
        if symbols.is_empty() {
            return self
                .simulators
                .iter()
                .flat_map(SimulationService::get_current_data)
                .collect();
        }

        symbols
            .iter()
            .filter_map(|symbol| {
                self.simulators
                    .iter()
                    .find_map(|simulator| simulator.get_one(symbol))
            })
            .collect()
    }
}
