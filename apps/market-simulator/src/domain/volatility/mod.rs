//! Volatility Model
//!
//! Pure step functions that turn the current snapshot of an instrument into
//! the next one. Random draws and the current time are passed in by the
//! caller, so every function here is deterministic.
//!
//! # Tick Step
//!
//! ```text
//! volatility = base × market_hours × sector × beta
//! delta      = draw × volatility                 draw ∈ [-1, 1)
//! price'     = max(price × (1 + delta), 0.01)
//! volume'    = floor(volume × (1 + draw_v × volume_jitter))
//! ```
//!
//! # Market Event
//!
//! ```text
//! impact = 0.05 × intensity × |draw|   bullish
//!        = -0.05 × intensity × |draw|  bearish
//!        = 0.05 × intensity × draw     neutral
//! ```
//!
//! Price, change and percent change are rounded to cents on the way out.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use super::instrument::InstrumentSnapshot;

/// Lowest price any instrument can reach.
pub const PRICE_FLOOR: f64 = 0.01;

/// Fractional price impact of a market event at intensity 1.
pub const BASE_EVENT_IMPACT: f64 = 0.05;

/// Volume multiplier per unit of absolute event impact.
pub const EVENT_VOLUME_SURGE: f64 = 10.0;

/// Default per-tick volatility for securities (0.1% of price).
pub const DEFAULT_SECURITIES_VOLATILITY: f64 = 0.001;

/// Default per-tick volatility for indices (0.05% of price).
pub const DEFAULT_INDICES_VOLATILITY: f64 = 0.0005;

/// Largest configurable per-tick volatility (100% of price).
pub const MAX_BASE_VOLATILITY: f64 = 1.0;

/// Default volume jitter for securities (±20%).
pub const SECURITIES_VOLUME_JITTER: f64 = 0.2;

/// Default volume jitter for indices (±5%).
pub const INDICES_VOLUME_JITTER: f64 = 0.05;

const SECONDS_PER_DAY: i64 = 86_400;

// =============================================================================
// Market Hours
// =============================================================================

/// Trading window that boosts volatility while the exchange is open.
///
/// The window is evaluated in an explicit exchange UTC offset rather than
/// the host's local time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarketHours {
    /// Whether the boost is applied at all.
    pub enabled: bool,
    /// Opening time, minutes after exchange midnight.
    pub open_minute: u32,
    /// Closing time, minutes after exchange midnight (exclusive).
    pub close_minute: u32,
    /// Exchange offset from UTC in minutes (e.g. -300 for UTC-05:00).
    pub utc_offset_minutes: i32,
    /// Volatility multiplier inside the window.
    pub multiplier: f64,
}

impl Default for MarketHours {
    fn default() -> Self {
        Self {
            enabled: true,
            open_minute: 9 * 60 + 30,
            close_minute: 16 * 60,
            utc_offset_minutes: -5 * 60,
            multiplier: 2.0,
        }
    }
}

impl MarketHours {
    /// Market hours that never boost volatility.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Minutes after exchange midnight for a UTC instant.
    #[must_use]
    pub fn minute_of_day(&self, now: DateTime<Utc>) -> u32 {
        let local_secs = now.timestamp() + i64::from(self.utc_offset_minutes) * 60;
        let minute = local_secs.rem_euclid(SECONDS_PER_DAY) / 60;
        u32::try_from(minute).unwrap_or_default()
    }

    /// Whether the exchange is open at `now`.
    #[must_use]
    pub fn is_open(&self, now: DateTime<Utc>) -> bool {
        let minute = self.minute_of_day(now);
        if self.open_minute <= self.close_minute {
            (self.open_minute..self.close_minute).contains(&minute)
        } else {
            // Window wraps past exchange midnight.
            minute >= self.open_minute || minute < self.close_minute
        }
    }

    /// Volatility factor at `now`.
    #[must_use]
    pub fn factor_at(&self, now: DateTime<Utc>) -> f64 {
        if self.enabled && self.is_open(now) {
            self.multiplier
        } else {
            1.0
        }
    }
}

// =============================================================================
// Market Direction
// =============================================================================

/// Bias of a simulated market event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketDirection {
    /// Prices shocked upward.
    Bullish,
    /// Prices shocked downward.
    Bearish,
    /// Direction left to the random draw.
    Neutral,
}

impl MarketDirection {
    /// Direction sign: +1, -1 or 0.
    #[must_use]
    pub const fn sign(self) -> f64 {
        match self {
            Self::Bullish => 1.0,
            Self::Bearish => -1.0,
            Self::Neutral => 0.0,
        }
    }

    /// Get the direction name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bullish => "bullish",
            Self::Bearish => "bearish",
            Self::Neutral => "neutral",
        }
    }
}

impl fmt::Display for MarketDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MarketDirection {
    type Err = ParseDirectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "bullish" => Ok(Self::Bullish),
            "bearish" => Ok(Self::Bearish),
            "neutral" => Ok(Self::Neutral),
            _ => Err(ParseDirectionError(s.to_string())),
        }
    }
}

/// Unknown market direction name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown market direction: {0}")]
pub struct ParseDirectionError(pub String);

// =============================================================================
// Volatility Model
// =============================================================================

/// Parameters of the per-tick random walk.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolatilityModel {
    /// Base fractional volatility per tick.
    pub base_volatility: f64,
    /// Half-width of the uniform volume factor around 1.
    pub volume_jitter: f64,
    /// Trading-window boost.
    pub market_hours: MarketHours,
}

impl VolatilityModel {
    /// Model tuned for individual securities.
    #[must_use]
    pub fn securities() -> Self {
        Self {
            base_volatility: DEFAULT_SECURITIES_VOLATILITY,
            volume_jitter: SECURITIES_VOLUME_JITTER,
            market_hours: MarketHours::default(),
        }
    }

    /// Model tuned for market indices.
    #[must_use]
    pub fn indices() -> Self {
        Self {
            base_volatility: DEFAULT_INDICES_VOLATILITY,
            volume_jitter: INDICES_VOLUME_JITTER,
            market_hours: MarketHours::default(),
        }
    }

    /// Replace the market-hours window.
    #[must_use]
    pub const fn with_market_hours(mut self, market_hours: MarketHours) -> Self {
        self.market_hours = market_hours;
        self
    }

    /// Replace the base volatility.
    #[must_use]
    pub const fn with_base_volatility(mut self, base_volatility: f64) -> Self {
        self.base_volatility = base_volatility;
        self
    }

    /// Effective fractional volatility for one instrument at `now`.
    #[must_use]
    pub fn instrument_volatility(&self, snapshot: &InstrumentSnapshot, now: DateTime<Utc>) -> f64 {
        self.base_volatility * self.market_hours.factor_at(now) * snapshot.volatility_scale()
    }

    /// Compute the next snapshot of one instrument.
    ///
    /// `price_draw` and `volume_draw` are independent values in `[-1, 1)`.
    #[must_use]
    pub fn step(
        &self,
        previous: &InstrumentSnapshot,
        price_draw: f64,
        volume_draw: f64,
        now: DateTime<Utc>,
    ) -> InstrumentSnapshot {
        let delta = price_draw * self.instrument_volatility(previous, now);
        let volume_factor = volume_draw.mul_add(self.volume_jitter, 1.0);
        reprice(previous, delta, volume_factor, now)
    }
}

/// Fractional price impact of a market event.
#[must_use]
pub fn event_impact(direction: MarketDirection, intensity: f64, draw: f64) -> f64 {
    let magnitude = BASE_EVENT_IMPACT * intensity;
    match direction {
        MarketDirection::Bullish | MarketDirection::Bearish => {
            magnitude * direction.sign() * draw.abs()
        }
        MarketDirection::Neutral => magnitude * draw,
    }
}

/// Apply a one-shot market event to one instrument.
#[must_use]
pub fn apply_event(
    previous: &InstrumentSnapshot,
    direction: MarketDirection,
    intensity: f64,
    draw: f64,
    now: DateTime<Utc>,
) -> InstrumentSnapshot {
    let impact = event_impact(direction, intensity, draw);
    let volume_factor = impact.abs().mul_add(EVENT_VOLUME_SURGE, 1.0);
    reprice(previous, impact, volume_factor, now)
}

/// Round to two decimal places, midpoints away from zero.
#[must_use]
pub fn round_cents(value: f64) -> f64 {
    Decimal::from_f64(value)
        .map(|d| d.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
        .and_then(|d| d.to_f64())
        .unwrap_or(value)
}

fn reprice(
    previous: &InstrumentSnapshot,
    delta: f64,
    volume_factor: f64,
    now: DateTime<Utc>,
) -> InstrumentSnapshot {
    let previous_price = previous.price;
    let price = round_cents((previous_price * (1.0 + delta)).max(PRICE_FLOOR));
    let raw_change = price - previous_price;
    let change_percent = raw_change / previous_price * 100.0;

    // Overflowing moves leave price and volume where they were.
    if !(price.is_finite() && raw_change.is_finite() && change_percent.is_finite()) {
        return InstrumentSnapshot {
            change: 0.0,
            change_percent: 0.0,
            updated_at: now,
            ..previous.clone()
        };
    }

    InstrumentSnapshot {
        price,
        change: round_cents(raw_change),
        change_percent: round_cents(change_percent),
        volume: scale_volume(previous.volume, volume_factor),
        updated_at: now,
        ..previous.clone()
    }
}

#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn scale_volume(volume: u64, factor: f64) -> u64 {
    let scaled = (volume as f64 * factor).floor();
    if !scaled.is_finite() || scaled >= u64::MAX as f64 {
        volume
    } else if scaled > 0.0 {
        scaled as u64
    } else {
        0
    }
}

// =============================================================================
// Tests
// =============================================================================
