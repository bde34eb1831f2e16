//! Seed file loading.
//!
//! A seed file is a JSON array of seed instruments:
//!
//! ```json
//! [
//!   { "symbol": "AAPL", "name": "Apple Inc.", "price": 189.84,
//!     "volume": 52000000, "sector": "technology", "beta": 1.28 }
//! ]
//! ```

use std::path::{Path, PathBuf};

use crate::domain::instrument::{SeedError, SeedInstrument, validate_seeds};

/// Seed file error.
#[derive(Debug, thiserror::Error)]
pub enum SeedFileError {
    /// File could not be read.
    #[error("failed to read seed file {path}: {source}")]
    Io {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },
    /// File is not a JSON seed list.
    #[error("failed to parse seed file {path}: {source}")]
    Parse {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        source: serde_json::Error,
    },
    /// File parsed but the seed list is invalid.
    #[error("invalid seed file {path}: {source}")]
    Invalid {
        /// File path.
        path: PathBuf,
        /// Validation failure.
        source: SeedError,
    },
}

/// Load and validate a JSON seed file.
///
/// # Errors
///
/// Returns `SeedFileError` if the file cannot be read, is not a JSON seed
/// list, or fails validation.
pub fn load_seed_file(path: &Path) -> Result<Vec<SeedInstrument>, SeedFileError> {
    let raw = std::fs::read_to_string(path).map_err(|source| SeedFileError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let seeds: Vec<SeedInstrument> =
        serde_json::from_str(&raw).map_err(|source| SeedFileError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

    validate_seeds(&seeds).map_err(|source| SeedFileError::Invalid {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(seeds)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;
    use crate::domain::instrument::Sector;

    fn write_temp(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn loads_valid_file() {
        let file = write_temp(
            r#"[
                {"symbol":"AAPL","name":"Apple","price":190.0,"volume":10,"sector":"technology","beta":1.2},
                {"symbol":"SPY","name":"SPDR","price":500.0,"volume":20}
            ]"#,
        );

        let seeds = load_seed_file(file.path()).unwrap();
        assert_eq!(seeds.len(), 2);
        assert_eq!(seeds[0].sector, Some(Sector::Technology));
        assert!(seeds[1].beta.is_none());
    }

    #[test]
    fn rejects_malformed_json() {
        let file = write_temp("{ not json");
        assert!(matches!(
            load_seed_file(file.path()),
            Err(SeedFileError::Parse { .. })
        ));
    }

    #[test]
    fn rejects_invalid_seeds() {
        let file = write_temp(r#"[{"symbol":"X","name":"X","price":0,"volume":1}]"#);
        assert!(matches!(
            load_seed_file(file.path()),
            Err(SeedFileError::Invalid {
                source: SeedError::InvalidPrice { .. },
                ..
            })
        ));
    }

    #[test]
    fn rejects_empty_list() {
        let file = write_temp("[]");
        assert!(matches!(
            load_seed_file(file.path()),
            Err(SeedFileError::Invalid {
                source: SeedError::Empty,
                ..
            })
        ));
    }
}
