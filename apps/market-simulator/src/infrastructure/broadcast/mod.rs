//! Broadcast Channel Adapters
//!
//! Bridges simulation services onto tokio broadcast channels so async
//! consumers (the SSE endpoint) can follow snapshot lists without
//! registering synchronous callbacks of their own.
//!
//! # Architecture
//!
//! The `SnapshotBroadcastHub` provides one channel per profile:
//! - Securities snapshot lists
//! - Indices snapshot lists
//!
//! Each channel supports multiple receivers with configurable capacity.
//! Slow receivers lag and skip older lists rather than blocking a tick.

use std::sync::Arc;

use tokio::sync::broadcast;

use crate::application::services::{SimulationError, SimulationService, SubscriptionHandle};
use crate::domain::instrument::{ProfileKind, SnapshotList};
use crate::infrastructure::config::BroadcastSettings;
use crate::infrastructure::metrics;

// =============================================================================
// Broadcast Messages
// =============================================================================

/// Snapshot list published by one simulation service.
#[derive(Debug, Clone)]
pub struct SnapshotBroadcast {
    /// Which service produced the list.
    pub profile: ProfileKind,
    /// The published list.
    pub snapshots: SnapshotList,
}

// =============================================================================
// Broadcast Hub
// =============================================================================

/// Configuration for broadcast channel capacities.
#[derive(Debug, Clone, Copy)]
pub struct BroadcastConfig {
    /// Capacity for the securities channel.
    pub securities_capacity: usize,
    /// Capacity for the indices channel.
    pub indices_capacity: usize,
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            securities_capacity: 64,
            indices_capacity: 64,
        }
    }
}

impl From<&BroadcastSettings> for BroadcastConfig {
    fn from(settings: &BroadcastSettings) -> Self {
        Self {
            securities_capacity: settings.securities_capacity,
            indices_capacity: settings.indices_capacity,
        }
    }
}

/// Central hub for snapshot broadcast channels.
///
/// # Example
///
/// ```rust
/// use market_simulator::domain::instrument::ProfileKind;
/// use market_simulator::infrastructure::broadcast::{BroadcastConfig, SnapshotBroadcastHub};
///
/// let hub = SnapshotBroadcastHub::new(BroadcastConfig::default());
///
/// // Get a receiver for index lists
/// let _rx = hub.receiver(ProfileKind::Indices);
/// assert_eq!(hub.receiver_count(ProfileKind::Indices), 1);
/// ```
#[derive(Debug)]
pub struct SnapshotBroadcastHub {
    securities_tx: broadcast::Sender<SnapshotBroadcast>,
    indices_tx: broadcast::Sender<SnapshotBroadcast>,
}

impl SnapshotBroadcastHub {
    /// Create a new broadcast hub with the given configuration.
    #[must_use]
    pub fn new(config: BroadcastConfig) -> Self {
        Self {
            securities_tx: broadcast::channel(config.securities_capacity.max(1)).0,
            indices_tx: broadcast::channel(config.indices_capacity.max(1)).0,
        }
    }

    /// Create a new broadcast hub with default configuration.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(BroadcastConfig::default())
    }

    const fn sender(&self, profile: ProfileKind) -> &broadcast::Sender<SnapshotBroadcast> {
        match profile {
            ProfileKind::Securities => &self.securities_tx,
            ProfileKind::Indices => &self.indices_tx,
        }
    }

    /// Publish a list to every receiver of its profile.
    ///
    /// Returns the number of receivers, or `None` if there are no active
    /// receivers.
    pub fn publish(&self, profile: ProfileKind, snapshots: SnapshotList) -> Option<usize> {
        self.sender(profile)
            .send(SnapshotBroadcast { profile, snapshots })
            .ok()
    }

    /// Get a new receiver for a profile.
    #[must_use]
    pub fn receiver(&self, profile: ProfileKind) -> broadcast::Receiver<SnapshotBroadcast> {
        let rx = self.sender(profile).subscribe();
        metrics::set_broadcast_receivers(profile, self.receiver_count(profile));
        rx
    }

    /// Get the number of active receivers for a profile.
    #[must_use]
    pub fn receiver_count(&self, profile: ProfileKind) -> usize {
        self.sender(profile).receiver_count()
    }

    /// Forward every list published by `service` into this hub.
    ///
    /// # Errors
    ///
    /// Returns `SimulationError::Destroyed` if the service was destroyed.
    pub fn attach(
        self: &Arc<Self>,
        service: &SimulationService,
    ) -> Result<SubscriptionHandle, SimulationError> {
        let hub = Arc::clone(self);
        let profile = service.kind();
        let handle = service.subscribe(move |snapshots| {
            let _ = hub.publish(profile, Arc::clone(snapshots));
        })?;

        tracing::debug!(profile = %profile, "Broadcast hub attached");
        Ok(handle)
    }

    // =========================================================================
    // Statistics
    // =========================================================================

    /// Get statistics about all channels.
    #[must_use]
    pub fn stats(&self) -> BroadcastStats {
        BroadcastStats {
            securities_receivers: self.receiver_count(ProfileKind::Securities),
            indices_receivers: self.receiver_count(ProfileKind::Indices),
        }
    }
}

/// Shared broadcast hub reference.
pub type SharedBroadcastHub = Arc<SnapshotBroadcastHub>;

/// Statistics about broadcast channels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct BroadcastStats {
    /// Number of securities receivers.
    pub securities_receivers: usize,
    /// Number of indices receivers.
    pub indices_receivers: usize,
}

impl BroadcastStats {
    /// Get total number of receivers across all channels.
    #[must_use]
    pub const fn total_receivers(&self) -> usize {
        self.securities_receivers + self.indices_receivers
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::application::services::ServiceSettings;
    use crate::domain::instrument::{SeedInstrument, initial_snapshots};
    use crate::domain::volatility::MarketDirection;

    fn test_list() -> SnapshotList {
        initial_snapshots(
            &[SeedInstrument::index("SPX", "S&P 500", 5000.0, 10)],
            Utc::now(),
        )
    }

    #[test]
    fn hub_creation() {
        let hub = SnapshotBroadcastHub::with_defaults();
        assert_eq!(hub.stats(), BroadcastStats::default());
    }

    #[test]
    fn receiver_count_tracks_drops() {
        let hub = SnapshotBroadcastHub::with_defaults();

        {
            let _rx1 = hub.receiver(ProfileKind::Securities);
            let _rx2 = hub.receiver(ProfileKind::Securities);
            assert_eq!(hub.receiver_count(ProfileKind::Securities), 2);
        }

        assert_eq!(hub.receiver_count(ProfileKind::Securities), 0);
    }

    #[test]
    fn publish_with_no_receivers_returns_none() {
        let hub = SnapshotBroadcastHub::with_defaults();
        assert!(hub.publish(ProfileKind::Indices, test_list()).is_none());
    }

    #[tokio::test]
    async fn channels_are_independent() {
        let hub = SnapshotBroadcastHub::with_defaults();
        let mut securities = hub.receiver(ProfileKind::Securities);
        let mut indices = hub.receiver(ProfileKind::Indices);

        assert_eq!(hub.publish(ProfileKind::Indices, test_list()), Some(1));

        let received = indices.recv().await.unwrap();
        assert_eq!(received.profile, ProfileKind::Indices);
        assert_eq!(received.snapshots[0].symbol, "SPX");
        assert!(securities.try_recv().is_err());
    }

    #[tokio::test]
    async fn lagging_receiver_skips_old_lists() {
        let hub = SnapshotBroadcastHub::new(BroadcastConfig {
            securities_capacity: 2,
            indices_capacity: 2,
        });
        let mut rx = hub.receiver(ProfileKind::Indices);

        for _ in 0..5 {
            let _ = hub.publish(ProfileKind::Indices, test_list());
        }

        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Lagged(3))
        ));
        assert!(rx.recv().await.is_ok());
    }

    #[tokio::test]
    async fn attach_forwards_service_lists() {
        let hub = Arc::new(SnapshotBroadcastHub::with_defaults());
        let mut rx = hub.receiver(ProfileKind::Indices);

        let service = SimulationService::new(
            ServiceSettings::indices(),
            &[SeedInstrument::index("SPX", "S&P 500", 5000.0, 10)],
        )
        .unwrap();
        let handle = hub.attach(&service).unwrap();

        // Replay on attach
        let replay = rx.recv().await.unwrap();
        assert!((replay.snapshots[0].price - 5000.0).abs() < f64::EPSILON);

        let published = service
            .simulate_event(MarketDirection::Bullish, 1.0)
            .unwrap();
        let event = rx.recv().await.unwrap();
        assert!(Arc::ptr_eq(&event.snapshots, &published));

        assert!(handle.dispose());
    }

    #[test]
    fn config_from_settings() {
        let config = BroadcastConfig::from(&BroadcastSettings {
            securities_capacity: 5,
            indices_capacity: 7,
        });
        assert_eq!(config.securities_capacity, 5);
        assert_eq!(config.indices_capacity, 7);
    }
}
