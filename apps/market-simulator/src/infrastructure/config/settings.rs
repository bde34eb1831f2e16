//! Simulator Configuration Settings
//!
//! Configuration types for the market simulator, loaded from environment
//! variables. Malformed numeric values fall back to their defaults; market
//! times and seed files are validated strictly.

use std::path::PathBuf;
use std::time::Duration;

use crate::application::services::{
    DEFAULT_INDICES_INTERVAL, DEFAULT_SECURITIES_INTERVAL, ServiceSettings,
};
use crate::domain::instrument::{ProfileKind, SeedInstrument, default_indices, default_securities};
use crate::domain::volatility::{
    DEFAULT_INDICES_VOLATILITY, DEFAULT_SECURITIES_VOLATILITY, MAX_BASE_VOLATILITY, MarketHours,
    VolatilityModel,
};

use super::seed_file::{SeedFileError, load_seed_file};

/// Server port settings.
#[derive(Debug, Clone)]
pub struct ServerSettings {
    /// HTTP API, health and metrics port.
    pub http_port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self { http_port: 8083 }
    }
}

/// Tick timing and volatility per profile.
#[derive(Debug, Clone)]
pub struct SimulationSettings {
    /// Tick period for securities.
    pub securities_interval: Duration,
    /// Tick period for indices.
    pub indices_interval: Duration,
    /// Base per-tick volatility for securities.
    pub securities_base_volatility: f64,
    /// Base per-tick volatility for indices.
    pub indices_base_volatility: f64,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            securities_interval: DEFAULT_SECURITIES_INTERVAL,
            indices_interval: DEFAULT_INDICES_INTERVAL,
            securities_base_volatility: DEFAULT_SECURITIES_VOLATILITY,
            indices_base_volatility: DEFAULT_INDICES_VOLATILITY,
        }
    }
}

/// Broadcast channel settings.
#[derive(Debug, Clone)]
pub struct BroadcastSettings {
    /// Capacity of the securities snapshot channel.
    pub securities_capacity: usize,
    /// Capacity of the indices snapshot channel.
    pub indices_capacity: usize,
}

impl Default for BroadcastSettings {
    fn default() -> Self {
        Self {
            securities_capacity: 64,
            indices_capacity: 64,
        }
    }
}

/// Optional seed file overrides.
#[derive(Debug, Clone, Default)]
pub struct SeedSettings {
    /// JSON seed list for securities.
    pub securities_path: Option<PathBuf>,
    /// JSON seed list for indices.
    pub indices_path: Option<PathBuf>,
}

/// Complete simulator configuration.
#[derive(Debug, Clone, Default)]
pub struct SimulatorConfig {
    /// Server port settings.
    pub server: ServerSettings,
    /// Tick timing and volatility.
    pub simulation: SimulationSettings,
    /// Trading-window volatility boost.
    pub market_hours: MarketHours,
    /// Broadcast channel settings.
    pub broadcast: BroadcastSettings,
    /// Seed file overrides.
    pub seeds: SeedSettings,
}

impl SimulatorConfig {
    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a market time cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if a market time cannot be parsed.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let server = ServerSettings {
            http_port: parse_var(&lookup, "SIM_HTTP_PORT", ServerSettings::default().http_port),
        };

        let defaults = SimulationSettings::default();
        let simulation = SimulationSettings {
            securities_interval: parse_interval_millis(
                &lookup,
                "SIM_SECURITIES_INTERVAL_MS",
                defaults.securities_interval,
            ),
            indices_interval: parse_interval_millis(
                &lookup,
                "SIM_INDICES_INTERVAL_MS",
                defaults.indices_interval,
            ),
            securities_base_volatility: parse_volatility(
                &lookup,
                "SIM_SECURITIES_BASE_VOLATILITY",
                defaults.securities_base_volatility,
            ),
            indices_base_volatility: parse_volatility(
                &lookup,
                "SIM_INDICES_BASE_VOLATILITY",
                defaults.indices_base_volatility,
            ),
        };

        let hours = MarketHours::default();
        let market_hours = MarketHours {
            enabled: parse_bool(&lookup, "SIM_MARKET_HOURS_ENABLED", hours.enabled),
            open_minute: parse_clock_var(&lookup, "SIM_MARKET_OPEN", hours.open_minute)?,
            close_minute: parse_clock_var(&lookup, "SIM_MARKET_CLOSE", hours.close_minute)?,
            utc_offset_minutes: parse_var(
                &lookup,
                "SIM_EXCHANGE_UTC_OFFSET_MINUTES",
                hours.utc_offset_minutes,
            ),
            multiplier: parse_non_negative(&lookup, "SIM_MARKET_HOURS_MULTIPLIER", hours.multiplier),
        };

        let broadcast = BroadcastSettings {
            securities_capacity: parse_capacity(
                &lookup,
                "SIM_SECURITIES_CHANNEL_CAPACITY",
                BroadcastSettings::default().securities_capacity,
            ),
            indices_capacity: parse_capacity(
                &lookup,
                "SIM_INDICES_CHANNEL_CAPACITY",
                BroadcastSettings::default().indices_capacity,
            ),
        };

        let seeds = SeedSettings {
            securities_path: parse_path(&lookup, "SIM_SECURITIES_SEED_PATH"),
            indices_path: parse_path(&lookup, "SIM_INDICES_SEED_PATH"),
        };

        Ok(Self {
            server,
            simulation,
            market_hours,
            broadcast,
            seeds,
        })
    }

    /// Service settings for the securities list.
    #[must_use]
    pub fn securities_settings(&self) -> ServiceSettings {
        ServiceSettings::securities()
            .with_model(
                VolatilityModel::securities()
                    .with_base_volatility(self.simulation.securities_base_volatility)
                    .with_market_hours(self.market_hours),
            )
            .with_interval(self.simulation.securities_interval)
    }

    /// Service settings for the indices list.
    #[must_use]
    pub fn indices_settings(&self) -> ServiceSettings {
        ServiceSettings::indices()
            .with_model(
                VolatilityModel::indices()
                    .with_base_volatility(self.simulation.indices_base_volatility)
                    .with_market_hours(self.market_hours),
            )
            .with_interval(self.simulation.indices_interval)
    }

    /// Seed list for a profile: the configured file, or the built-in list.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured file cannot be read, parsed or
    /// validated.
    pub fn load_seeds(&self, kind: ProfileKind) -> Result<Vec<SeedInstrument>, ConfigError> {
        let path = match kind {
            ProfileKind::Securities => self.seeds.securities_path.as_ref(),
            ProfileKind::Indices => self.seeds.indices_path.as_ref(),
        };

        match path {
            Some(path) => {
                let seeds = load_seed_file(path)?;
                tracing::info!(
                    profile = %kind,
                    path = %path.display(),
                    instruments = seeds.len(),
                    "Loaded seed file"
                );
                Ok(seeds)
            }
            None => Ok(match kind {
                ProfileKind::Securities => default_securities(),
                ProfileKind::Indices => default_indices(),
            }),
        }
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A market time is not `HH:MM`.
    #[error("environment variable {key} must be HH:MM, got {value:?}")]
    InvalidTime {
        /// Variable name.
        key: String,
        /// Offending value.
        value: String,
    },
    /// A seed file could not be loaded.
    #[error(transparent)]
    SeedFile(#[from] SeedFileError),
}

/// Parse `HH:MM` into minutes after midnight.
#[must_use]
pub fn parse_clock_time(value: &str) -> Option<u32> {
    let (hours, minutes) = value.trim().split_once(':')?;
    let hours: u32 = hours.parse().ok()?;
    let minutes: u32 = minutes.parse().ok()?;
    (hours < 24 && minutes < 60).then_some(hours * 60 + minutes)
}

fn parse_var<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn parse_interval_millis<F>(lookup: &F, key: &str, default: Duration) -> Duration
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|ms| *ms > 0)
        .map_or(default, Duration::from_millis)
}

fn parse_non_negative<F>(lookup: &F, key: &str, default: f64) -> f64
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite() && *v >= 0.0)
        .unwrap_or(default)
}

fn parse_volatility<F>(lookup: &F, key: &str, default: f64) -> f64
where
    F: Fn(&str) -> Option<String>,
{
    let value = parse_non_negative(lookup, key, default);
    if value > MAX_BASE_VOLATILITY {
        tracing::warn!(
            key,
            value,
            max = MAX_BASE_VOLATILITY,
            "Volatility out of range, using default"
        );
        return default;
    }
    value
}

fn parse_capacity<F>(lookup: &F, key: &str, default: usize) -> usize
where
    F: Fn(&str) -> Option<String>,
{
    parse_var(lookup, key, default).max(1)
}

fn parse_bool<F>(lookup: &F, key: &str, default: bool) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key).map(|v| v.trim().to_lowercase()).as_deref() {
        Some("true" | "1" | "yes" | "on") => true,
        Some("false" | "0" | "no" | "off") => false,
        _ => default,
    }
}

fn parse_clock_var<F>(lookup: &F, key: &str, default: u32) -> Result<u32, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(default),
        Some(value) => parse_clock_time(&value).ok_or(ConfigError::InvalidTime {
            key: key.to_string(),
            value,
        }),
    }
}

fn parse_path<F>(lookup: &F, key: &str) -> Option<PathBuf>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}
