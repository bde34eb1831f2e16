//! Built-in seed lists.

use super::{SeedInstrument, Sector};

/// Default tracked securities.
#[must_use]
pub fn default_securities() -> Vec<SeedInstrument> {
    [
        ("AAPL", "Apple Inc.", 189.84, 52_000_000, Sector::Technology, 1.28),
        ("MSFT", "Microsoft Corporation", 415.50, 22_000_000, Sector::Technology, 0.90),
        ("NVDA", "NVIDIA Corporation", 875.28, 45_000_000, Sector::Technology, 1.75),
        ("GOOGL", "Alphabet Inc.", 152.30, 25_000_000, Sector::Communication, 1.05),
        ("META", "Meta Platforms Inc.", 502.30, 18_000_000, Sector::Communication, 1.22),
        ("AMZN", "Amazon.com Inc.", 178.25, 40_000_000, Sector::Consumer, 1.15),
        ("TSLA", "Tesla Inc.", 177.90, 95_000_000, Sector::Consumer, 2.05),
        ("JPM", "JPMorgan Chase & Co.", 198.50, 9_000_000, Sector::Financials, 1.10),
        ("V", "Visa Inc.", 279.80, 6_500_000, Sector::Financials, 0.95),
        ("JNJ", "Johnson & Johnson", 152.60, 7_000_000, Sector::Healthcare, 0.55),
        ("XOM", "Exxon Mobil Corporation", 118.40, 16_000_000, Sector::Energy, 0.85),
        ("CAT", "Caterpillar Inc.", 352.10, 2_800_000, Sector::Industrials, 1.05),
        ("NEE", "NextEra Energy Inc.", 67.20, 10_000_000, Sector::Utilities, 0.50),
        ("PLD", "Prologis Inc.", 112.70, 3_500_000, Sector::RealEstate, 0.95),
        ("LIN", "Linde plc", 463.90, 2_000_000, Sector::Materials, 0.85),
    ]
    .into_iter()
    .map(|(symbol, name, price, volume, sector, beta)| {
        SeedInstrument::security(symbol, name, price, volume, sector, beta)
    })
    .collect()
}

/// Default tracked indices.
#[must_use]
pub fn default_indices() -> Vec<SeedInstrument> {
    [
        ("SPX", "S&P 500", 5_234.18, 2_400_000_000),
        ("DJI", "Dow Jones Industrial Average", 39_475.90, 320_000_000),
        ("IXIC", "NASDAQ Composite", 16_379.46, 4_800_000_000),
        ("RUT", "Russell 2000", 2_084.50, 1_100_000_000),
        ("NYA", "NYSE Composite", 18_200.35, 3_600_000_000),
    ]
    .into_iter()
    .map(|(symbol, name, price, volume)| SeedInstrument::index(symbol, name, price, volume))
    .collect()
}
