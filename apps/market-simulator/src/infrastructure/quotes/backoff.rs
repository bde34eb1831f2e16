//! Hold-off Policy
//!
//! Exponential backoff with jitter for an external quote source that keeps
//! failing. Each consecutive failure lengthens the period during which the
//! source is skipped; the next success resets it.

use std::time::Duration;

use rand::Rng;

/// Configuration for the hold-off behavior.
#[derive(Debug, Clone, Copy)]
pub struct BackoffConfig {
    /// Hold-off after the first failure.
    pub initial_delay: Duration,
    /// Longest hold-off.
    pub max_delay: Duration,
    /// Growth factor per consecutive failure.
    pub multiplier: f64,
    /// Jitter as a fraction (0.1 = ±10%).
    pub jitter_factor: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(64),
            multiplier: 2.0,
            jitter_factor: 0.1,
        }
    }
}

impl BackoffConfig {
    /// Same config without jitter.
    #[must_use]
    pub const fn without_jitter(mut self) -> Self {
        self.jitter_factor = 0.0;
        self
    }
}

/// Hold-off policy implementing exponential backoff with jitter.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
///
/// use market_simulator::infrastructure::quotes::{BackoffConfig, BackoffPolicy};
///
/// let mut policy = BackoffPolicy::new(BackoffConfig::default().without_jitter());
///
/// assert_eq!(policy.next_delay(), Duration::from_secs(1));
/// assert_eq!(policy.next_delay(), Duration::from_secs(2));
///
/// // Source recovered
/// policy.reset();
/// assert_eq!(policy.failures(), 0);
/// ```
#[derive(Debug)]
pub struct BackoffPolicy {
    config: BackoffConfig,
    current_delay: Duration,
    failures: u32,
}

impl BackoffPolicy {
    /// Create a new hold-off policy.
    #[must_use]
    pub const fn new(config: BackoffConfig) -> Self {
        Self {
            current_delay: config.initial_delay,
            config,
            failures: 0,
        }
    }

    /// Record a failure and return how long to hold the source off.
    pub fn next_delay(&mut self) -> Duration {
        self.failures = self.failures.saturating_add(1);
        let delay = self.jittered(self.current_delay);

        let grown = Duration::try_from_secs_f64(
            self.current_delay.as_secs_f64() * self.config.multiplier.max(1.0),
        )
        .unwrap_or(self.config.max_delay);
        self.current_delay = grown.min(self.config.max_delay);

        delay
    }

    /// Reset after a successful request.
    pub const fn reset(&mut self) {
        self.current_delay = self.config.initial_delay;
        self.failures = 0;
    }

    /// Consecutive failures since the last reset.
    #[must_use]
    pub const fn failures(&self) -> u32 {
        self.failures
    }

    fn jittered(&self, delay: Duration) -> Duration {
        if self.config.jitter_factor <= 0.0 {
            return delay;
        }

        let factor = rand::rng()
            .random_range(-self.config.jitter_factor..=self.config.jitter_factor);
        Duration::try_from_secs_f64(delay.as_secs_f64() * (1.0 + factor)).unwrap_or(delay)
    }
}
