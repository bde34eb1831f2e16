//! Instrument Types
//!
//! Seed definitions and point-in-time snapshots for tracked securities and
//! indices.
//!
//! # Design
//!
//! A seed list is supplied once at service construction and fixes the
//! symbol set for the lifetime of the store. Every tick produces a fresh
//! [`SnapshotList`]; snapshots are never mutated in place, so a reader
//! holding an older list is never invalidated.

mod seeds;

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::volatility::PRICE_FLOOR;

pub use seeds::{default_indices, default_securities};

// =============================================================================
// Types
// =============================================================================

/// A ticker symbol, unique within one store.
pub type Symbol = String;

/// Immutable, shareable list of snapshots produced by one mutation pass.
pub type SnapshotList = Arc<[InstrumentSnapshot]>;

/// Sector classification used to scale security volatility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sector {
    /// Technology.
    Technology,
    /// Banks, payments and insurers.
    Financials,
    /// Healthcare and pharma.
    Healthcare,
    /// Oil, gas and renewables.
    Energy,
    /// Consumer discretionary and staples.
    Consumer,
    /// Industrials.
    Industrials,
    /// Communication services.
    Communication,
    /// Utilities.
    Utilities,
    /// Real estate.
    RealEstate,
    /// Materials.
    Materials,
    /// Anything unclassified.
    #[serde(other)]
    Other,
}

impl Sector {
    /// Get all sectors.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Technology,
            Self::Financials,
            Self::Healthcare,
            Self::Energy,
            Self::Consumer,
            Self::Industrials,
            Self::Communication,
            Self::Utilities,
            Self::RealEstate,
            Self::Materials,
            Self::Other,
        ]
    }

    /// Volatility multiplier applied to instruments in this sector.
    #[must_use]
    pub const fn volatility_factor(self) -> f64 {
        match self {
            Self::Technology => 1.5,
            Self::Energy => 1.4,
            Self::Communication => 1.3,
            Self::Financials | Self::Materials => 1.2,
            Self::Healthcare | Self::Industrials => 1.1,
            Self::Consumer | Self::Other => 1.0,
            Self::RealEstate => 0.9,
            Self::Utilities => 0.7,
        }
    }

    /// Get the sector name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Technology => "technology",
            Self::Financials => "financials",
            Self::Healthcare => "healthcare",
            Self::Energy => "energy",
            Self::Consumer => "consumer",
            Self::Industrials => "industrials",
            Self::Communication => "communication",
            Self::Utilities => "utilities",
            Self::RealEstate => "real_estate",
            Self::Materials => "materials",
            Self::Other => "other",
        }
    }

    /// Parse a sector name, falling back to [`Sector::Other`].
    #[must_use]
    pub fn from_str_case_insensitive(s: &str) -> Self {
        let normalized = s.trim().to_lowercase().replace([' ', '-'], "_");
        Self::all()
            .iter()
            .copied()
            .find(|sector| sector.as_str() == normalized)
            .unwrap_or(Self::Other)
    }
}

/// Which simulated list a service maintains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileKind {
    /// Individual stocks with sector and beta metadata.
    Securities,
    /// Market indices.
    Indices,
}

impl ProfileKind {
    /// Get the profile name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Securities => "securities",
            Self::Indices => "indices",
        }
    }
}

impl std::fmt::Display for ProfileKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Seeds
// =============================================================================

/// Static description of one tracked instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedInstrument {
    /// Ticker symbol.
    pub symbol: Symbol,
    /// Display name.
    pub name: String,
    /// Starting price.
    pub price: f64,
    /// Starting volume.
    pub volume: u64,
    /// Sector, securities only.
    #[serde(default)]
    pub sector: Option<Sector>,
    /// Beta coefficient, securities only.
    #[serde(default)]
    pub beta: Option<f64>,
}

impl SeedInstrument {
    /// Seed for a security with sector and beta metadata.
    #[must_use]
    pub fn security(
        symbol: impl Into<Symbol>,
        name: impl Into<String>,
        price: f64,
        volume: u64,
        sector: Sector,
        beta: f64,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            name: name.into(),
            price,
            volume,
            sector: Some(sector),
            beta: Some(beta),
        }
    }

    /// Seed for an index (no sector, no beta).
    #[must_use]
    pub fn index(symbol: impl Into<Symbol>, name: impl Into<String>, price: f64, volume: u64) -> Self {
        Self {
            symbol: symbol.into(),
            name: name.into(),
            price,
            volume,
            sector: None,
            beta: None,
        }
    }
}

/// Validate a seed list.
///
/// # Errors
///
/// Returns `SeedError` if the list is empty, a symbol is blank or repeated
/// (ignoring ASCII case), a price is not finite or sits below the price
/// floor, or a beta is negative or non-finite.
pub fn validate_seeds(seeds: &[SeedInstrument]) -> Result<(), SeedError> {
    if seeds.is_empty() {
        return Err(SeedError::Empty);
    }

    let mut seen = HashSet::with_capacity(seeds.len());
    for seed in seeds {
        if seed.symbol.trim().is_empty() {
            return Err(SeedError::BlankSymbol);
        }
        if !seen.insert(seed.symbol.to_ascii_uppercase()) {
            return Err(SeedError::DuplicateSymbol(seed.symbol.clone()));
        }
        if !seed.price.is_finite() || seed.price < PRICE_FLOOR {
            return Err(SeedError::InvalidPrice {
                symbol: seed.symbol.clone(),
                price: seed.price,
            });
        }
        if let Some(beta) = seed.beta
            && (!beta.is_finite() || beta < 0.0)
        {
            return Err(SeedError::InvalidBeta {
                symbol: seed.symbol.clone(),
                beta,
            });
        }
    }

    Ok(())
}

/// Seed list validation error.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SeedError {
    /// No instruments were supplied.
    #[error("seed list is empty")]
    Empty,
    /// A symbol was empty or whitespace.
    #[error("seed symbol cannot be blank")]
    BlankSymbol,
    /// A symbol appears more than once.
    #[error("duplicate seed symbol: {0}")]
    DuplicateSymbol(Symbol),
    /// Starting price is not finite or is below the price floor.
    #[error("invalid seed price {price} for {symbol}")]
    InvalidPrice {
        /// Offending symbol.
        symbol: Symbol,
        /// Offending price.
        price: f64,
    },
    /// Beta is negative or not finite.
    #[error("invalid beta {beta} for {symbol}")]
    InvalidBeta {
        /// Offending symbol.
        symbol: Symbol,
        /// Offending beta.
        beta: f64,
    },
}

// =============================================================================
// Snapshots
// =============================================================================

/// One tracked instrument at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstrumentSnapshot {
    /// Ticker symbol.
    pub symbol: Symbol,
    /// Display name.
    pub name: String,
    /// Current price, always at or above the price floor.
    pub price: f64,
    /// Absolute change since the previous snapshot.
    pub change: f64,
    /// Percent change since the previous snapshot.
    pub change_percent: f64,
    /// Trading volume.
    pub volume: u64,
    /// Sector, securities only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sector: Option<Sector>,
    /// Beta coefficient, securities only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub beta: Option<f64>,
    /// Time of the pass that produced this snapshot.
    pub updated_at: DateTime<Utc>,
}

impl InstrumentSnapshot {
    /// Initial snapshot for a seed, with no change recorded.
    #[must_use]
    pub fn from_seed(seed: &SeedInstrument, at: DateTime<Utc>) -> Self {
        Self {
            symbol: seed.symbol.clone(),
            name: seed.name.clone(),
            price: seed.price,
            change: 0.0,
            change_percent: 0.0,
            volume: seed.volume,
            sector: seed.sector,
            beta: seed.beta,
            updated_at: at,
        }
    }

    /// Volatility scale from sector and beta metadata (1.0 for indices).
    #[must_use]
    pub fn volatility_scale(&self) -> f64 {
        let sector = self.sector.map_or(1.0, Sector::volatility_factor);
        let beta = self.beta.unwrap_or(1.0);
        sector * beta
    }
}

/// Build the initial snapshot list for a validated seed list.
#[must_use]
pub fn initial_snapshots(seeds: &[SeedInstrument], at: DateTime<Utc>) -> SnapshotList {
    seeds
        .iter()
        .map(|seed| InstrumentSnapshot::from_seed(seed, at))
        .collect()
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test_case(Sector::Technology, 1.5)]
    #[test_case(Sector::Utilities, 0.7)]
    #[test_case(Sector::Other, 1.0)]
    #[test_case(Sector::Energy, 1.4)]
    fn sector_factor(sector: Sector, expected: f64) {
        assert!((sector.volatility_factor() - expected).abs() < f64::EPSILON);
    }

    #[test_case("technology", Sector::Technology)]
    #[test_case("Technology", Sector::Technology)]
    #[test_case("real estate", Sector::RealEstate)]
    #[test_case("real-estate", Sector::RealEstate)]
    #[test_case("crypto", Sector::Other)]
    fn sector_parsing(input: &str, expected: Sector) {
        assert_eq!(Sector::from_str_case_insensitive(input), expected);
    }

    #[test]
    fn sector_deserializes_unknown_as_other() {
        let sector: Sector = serde_json::from_str("\"space_mining\"").unwrap();
        assert_eq!(sector, Sector::Other);
    }

    #[test]
    fn validate_accepts_defaults() {
        assert!(validate_seeds(&default_securities()).is_ok());
        assert!(validate_seeds(&default_indices()).is_ok());
    }

    #[test]
    fn validate_rejects_empty() {
        assert_eq!(validate_seeds(&[]), Err(SeedError::Empty));
    }

    #[test]
    fn validate_rejects_duplicate_symbol() {
        let seeds = vec![
            SeedInstrument::index("SPX", "S&P 500", 5000.0, 1),
            SeedInstrument::index("SPX", "S&P 500 again", 5000.0, 1),
        ];
        assert_eq!(
            validate_seeds(&seeds),
            Err(SeedError::DuplicateSymbol("SPX".to_string()))
        );
    }

    #[test_case(0.0)]
    #[test_case(0.001)]
    #[test_case(0.009_99)]
    #[test_case(-1.0)]
    #[test_case(f64::NAN)]
    #[test_case(f64::INFINITY)]
    fn validate_rejects_bad_price(price: f64) {
        let seeds = vec![SeedInstrument::index("X", "X", price, 1)];
        assert!(matches!(
            validate_seeds(&seeds),
            Err(SeedError::InvalidPrice { .. })
        ));
    }

    #[test]
    fn validate_accepts_price_at_floor() {
        let seeds = vec![SeedInstrument::index("PENNY", "Penny", PRICE_FLOOR, 1)];
        assert_eq!(validate_seeds(&seeds), Ok(()));
    }

    #[test]
    fn validate_rejects_symbols_differing_only_in_case() {
        let seeds = vec![
            SeedInstrument::index("spx", "S&P 500", 5000.0, 1),
            SeedInstrument::index("SPX", "S&P 500 again", 5000.0, 1),
        ];
        assert_eq!(
            validate_seeds(&seeds),
            Err(SeedError::DuplicateSymbol("SPX".to_string()))
        );
    }

    #[test]
    fn validate_rejects_negative_beta() {
        let seeds = vec![SeedInstrument::security(
            "X",
            "X",
            10.0,
            1,
            Sector::Technology,
            -0.5,
        )];
        assert!(matches!(
            validate_seeds(&seeds),
            Err(SeedError::InvalidBeta { .. })
        ));
    }

    #[test]
    fn validate_rejects_blank_symbol() {
        let seeds = vec![SeedInstrument::index("  ", "blank", 1.0, 1)];
        assert_eq!(validate_seeds(&seeds), Err(SeedError::BlankSymbol));
    }

    #[test]
    fn volatility_scale_combines_sector_and_beta() {
        let seed = SeedInstrument::security("T", "T", 100.0, 1, Sector::Technology, 2.0);
        let snapshot = InstrumentSnapshot::from_seed(&seed, Utc::now());
        assert!((snapshot.volatility_scale() - 3.0).abs() < 1e-12);

        let index = InstrumentSnapshot::from_seed(
            &SeedInstrument::index("SPX", "S&P 500", 5000.0, 1),
            Utc::now(),
        );
        assert!((index.volatility_scale() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn index_snapshot_omits_security_metadata() {
        let index = InstrumentSnapshot::from_seed(
            &SeedInstrument::index("SPX", "S&P 500", 5000.0, 10),
            Utc::now(),
        );
        let json = serde_json::to_value(&index).unwrap();
        assert!(json.get("sector").is_none());
        assert!(json.get("beta").is_none());
        assert_eq!(json["changePercent"], 0.0);
    }

    #[test]
    fn seed_deserializes_camel_case_without_metadata() {
        let seed: SeedInstrument =
            serde_json::from_str(r#"{"symbol":"DJI","name":"Dow","price":39000.5,"volume":5}"#)
                .unwrap();
        assert_eq!(seed.symbol, "DJI");
        assert!(seed.sector.is_none());
        assert!(seed.beta.is_none());
    }

    #[test]
    fn initial_snapshots_preserve_seed_order() {
        let seeds = default_securities();
        let list = initial_snapshots(&seeds, Utc::now());
        let symbols: Vec<_> = list.iter().map(|s| s.symbol.as_str()).collect();
        let expected: Vec<_> = seeds.iter().map(|s| s.symbol.as_str()).collect();
        assert_eq!(symbols, expected);
    }
}
