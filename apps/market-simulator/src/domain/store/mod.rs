//! Snapshot Store
//!
//! Holds the authoritative current snapshot list. The list is replaced
//! wholesale on every pass; readers get either a shared immutable list or
//! an owned copy.

use parking_lot::RwLock;

use super::instrument::{InstrumentSnapshot, SnapshotList};

/// Authoritative snapshot list for one simulation service.
#[derive(Debug)]
pub struct SnapshotStore {
    current: RwLock<SnapshotList>,
}

impl SnapshotStore {
    /// Create a store holding the initial list.
    #[must_use]
    pub fn new(initial: SnapshotList) -> Self {
        Self {
            current: RwLock::new(initial),
        }
    }

    /// Shared handle to the current list.
    #[must_use]
    pub fn snapshot(&self) -> SnapshotList {
        self.current.read().clone()
    }

    /// Owned copy of the current list.
    #[must_use]
    pub fn to_vec(&self) -> Vec<InstrumentSnapshot> {
        self.current.read().to_vec()
    }

    /// Look up one instrument by symbol, ignoring ASCII case.
    #[must_use]
    pub fn get(&self, symbol: &str) -> Option<InstrumentSnapshot> {
        self.current
            .read()
            .iter()
            .find(|snapshot| snapshot.symbol.eq_ignore_ascii_case(symbol))
            .cloned()
    }

    /// Replace the current list.
    pub fn replace(&self, next: SnapshotList) {
        *self.current.write() = next;
    }

    /// Number of tracked instruments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.current.read().len()
    }

    /// Whether the store tracks no instruments.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.current.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::domain::instrument::{SeedInstrument, initial_snapshots};

    fn store() -> SnapshotStore {
        let seeds = vec![
            SeedInstrument::index("SPX", "S&P 500", 5000.0, 10),
            SeedInstrument::index("DJI", "Dow", 39000.0, 20),
        ];
        SnapshotStore::new(initial_snapshots(&seeds, Utc::now()))
    }

    #[test]
    fn get_finds_symbol() {
        let store = store();
        let dji = store.get("DJI").unwrap();
        assert!((dji.price - 39000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn get_ignores_ascii_case() {
        let seeds = vec![SeedInstrument::index("Nikkei", "Nikkei 225", 38000.0, 10)];
        let store = SnapshotStore::new(initial_snapshots(&seeds, Utc::now()));
        assert_eq!(store.get("NIKKEI").unwrap().symbol, "Nikkei");
        assert_eq!(store.get("nikkei").unwrap().symbol, "Nikkei");
    }

    #[test]
    fn get_missing_symbol_is_none() {
        assert!(store().get("NOPE").is_none());
    }

    #[test]
    fn copies_are_detached_from_store() {
        let store = store();
        let mut copy = store.to_vec();
        copy[0].price = 1.0;
        assert!((store.get("SPX").unwrap().price - 5000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn replace_does_not_invalidate_held_list() {
        let store = store();
        let held = store.snapshot();

        let mut next = store.to_vec();
        next[0].price = 4000.0;
        store.replace(next.into());

        assert!((held[0].price - 5000.0).abs() < f64::EPSILON);
        assert!((store.snapshot()[0].price - 4000.0).abs() < f64::EPSILON);
        assert_eq!(store.len(), 2);
        assert!(!store.is_empty());
    }
}
