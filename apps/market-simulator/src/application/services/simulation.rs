//! Simulation Service
//!
//! Owns one snapshot store, arms the repeating timer that mutates it, and
//! fans every new list out to registered subscribers.
//!
//! # Lifecycle
//!
//! ```text
//! Stopped ──start──▶ Running ──stop──▶ Stopped
//!    │                 │  ▲
//!    │                 └──┘ start (restart)
//!    └──────destroy──────┴──────▶ Destroyed (terminal)
//! ```
//!
//! # Concurrency
//!
//! Ticks, market events, subscription replays and lifecycle transitions
//! serialize on a reentrant gate, so a subscriber callback may call back
//! into the service from the notifying thread. Every transition bumps a
//! generation counter; a tick re-checks its generation before each callback,
//! so once `stop` or `destroy` returns no further callback fires.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use parking_lot::{Mutex, ReentrantMutex};
use tokio::runtime::Handle;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::application::ports::{Clock, RandomSource, SystemClock, ThreadRandom};
use crate::domain::instrument::{
    InstrumentSnapshot, ProfileKind, SeedError, SeedInstrument, SnapshotList, initial_snapshots,
    validate_seeds,
};
use crate::domain::store::SnapshotStore;
use crate::domain::subscription::{SnapshotCallback, SubscriberId, SubscriberRegistry};
use crate::domain::volatility::{self, MarketDirection, VolatilityModel};
use crate::infrastructure::metrics;

/// Default tick period for securities.
pub const DEFAULT_SECURITIES_INTERVAL: Duration = Duration::from_secs(5);

/// Default tick period for indices.
pub const DEFAULT_INDICES_INTERVAL: Duration = Duration::from_secs(10);

// =============================================================================
// Settings
// =============================================================================

/// Static settings for one simulation service.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ServiceSettings {
    /// Which list this service maintains.
    pub kind: ProfileKind,
    /// Random-walk parameters.
    pub model: VolatilityModel,
    /// Tick period used by [`SimulationService::start`].
    pub default_interval: Duration,
}

impl ServiceSettings {
    /// Defaults for the securities list.
    #[must_use]
    pub fn securities() -> Self {
        Self {
            kind: ProfileKind::Securities,
            model: VolatilityModel::securities(),
            default_interval: DEFAULT_SECURITIES_INTERVAL,
        }
    }

    /// Defaults for the indices list.
    #[must_use]
    pub fn indices() -> Self {
        Self {
            kind: ProfileKind::Indices,
            model: VolatilityModel::indices(),
            default_interval: DEFAULT_INDICES_INTERVAL,
        }
    }

    /// Replace the volatility model.
    #[must_use]
    pub const fn with_model(mut self, model: VolatilityModel) -> Self {
        self.model = model;
        self
    }

    /// Replace the default tick period.
    #[must_use]
    pub const fn with_interval(mut self, interval: Duration) -> Self {
        self.default_interval = interval;
        self
    }
}

// =============================================================================
// Errors
// =============================================================================

/// Simulation service errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SimulationError {
    /// The service was destroyed and cannot be reused.
    #[error("simulation service has been destroyed")]
    Destroyed,

    /// `start` was called outside a tokio runtime.
    #[error("no tokio runtime available to drive the simulation timer")]
    NoRuntime,

    /// Tick period of zero.
    #[error("tick interval must be greater than zero")]
    InvalidInterval,

    /// Event intensity is negative or not finite.
    #[error("event intensity must be finite and non-negative, got {0}")]
    InvalidIntensity(f64),

    /// The seed list failed validation.
    #[error("invalid seed list: {0}")]
    InvalidSeeds(#[from] SeedError),
}

// =============================================================================
// Service
// =============================================================================

enum Lifecycle {
    Stopped,
    Running {
        cancel: CancellationToken,
        interval: Duration,
    },
    Destroyed,
}

struct Inner {
    kind: ProfileKind,
    model: VolatilityModel,
    default_interval: Duration,
    store: SnapshotStore,
    registry: SubscriberRegistry,
    random: Mutex<Box<dyn RandomSource>>,
    clock: Arc<dyn Clock>,
    gate: ReentrantMutex<()>,
    lifecycle: Mutex<Lifecycle>,
    generation: AtomicU64,
}

/// Periodic market-data simulation with pub/sub fan-out.
///
/// Cloning yields another handle to the same service.
///
/// # Example
///
/// ```rust,no_run
/// use market_simulator::application::services::{ServiceSettings, SimulationService};
/// use market_simulator::domain::instrument::default_indices;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let service = SimulationService::new(ServiceSettings::indices(), &default_indices())?;
///
/// let subscription = service.subscribe(|snapshots| {
///     println!("{} indices updated", snapshots.len());
/// })?;
///
/// service.start()?;
/// // ...
/// subscription.dispose();
/// service.destroy();
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct SimulationService {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for SimulationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulationService")
            .field("kind", &self.inner.kind)
            .field("instruments", &self.inner.store.len())
            .field("subscribers", &self.inner.registry.len())
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

impl SimulationService {
    /// Create a service driven by the system clock and thread RNG.
    ///
    /// # Errors
    ///
    /// Returns `SimulationError::InvalidSeeds` if the seed list is invalid.
    pub fn new(
        settings: ServiceSettings,
        seeds: &[SeedInstrument],
    ) -> Result<Self, SimulationError> {
        Self::with_parts(
            settings,
            seeds,
            Box::new(ThreadRandom),
            Arc::new(SystemClock),
        )
    }

    /// Create a service with injected random source and clock.
    ///
    /// # Errors
    ///
    /// Returns `SimulationError::InvalidSeeds` if the seed list is invalid.
    pub fn with_parts(
        settings: ServiceSettings,
        seeds: &[SeedInstrument],
        random: Box<dyn RandomSource>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, SimulationError> {
        validate_seeds(seeds)?;

        let initial = initial_snapshots(seeds, clock.now());
        tracing::debug!(
            profile = %settings.kind,
            instruments = initial.len(),
            "Simulation service created"
        );

        Ok(Self {
            inner: Arc::new(Inner {
                kind: settings.kind,
                model: settings.model,
                default_interval: settings.default_interval,
                store: SnapshotStore::new(initial),
                registry: SubscriberRegistry::new(),
                random: Mutex::new(random),
                clock,
                gate: ReentrantMutex::new(()),
                lifecycle: Mutex::new(Lifecycle::Stopped),
                generation: AtomicU64::new(0),
            }),
        })
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Start ticking at the configured default interval.
    ///
    /// # Errors
    ///
    /// See [`SimulationService::start_with_interval`].
    pub fn start(&self) -> Result<(), SimulationError> {
        self.start_with_interval(self.inner.default_interval)
    }

    /// Start ticking every `interval`, restarting if already running.
    ///
    /// The first tick fires one full interval after this call.
    ///
    /// # Errors
    ///
    /// - `SimulationError::InvalidInterval` for a zero interval
    /// - `SimulationError::Destroyed` after `destroy`
    /// - `SimulationError::NoRuntime` outside a tokio runtime
    pub fn start_with_interval(&self, interval: Duration) -> Result<(), SimulationError> {
        if interval.is_zero() {
            return Err(SimulationError::InvalidInterval);
        }

        let _gate = self.inner.gate.lock();
        let mut lifecycle = self.inner.lifecycle.lock();

        if matches!(*lifecycle, Lifecycle::Destroyed) {
            return Err(SimulationError::Destroyed);
        }
        let runtime = Handle::try_current().map_err(|_| SimulationError::NoRuntime)?;

        if let Lifecycle::Running { cancel, .. } = &*lifecycle {
            tracing::debug!(profile = %self.inner.kind, "Restarting simulation timer");
            cancel.cancel();
        }

        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let cancel = CancellationToken::new();
        *lifecycle = Lifecycle::Running {
            cancel: cancel.clone(),
            interval,
        };
        drop(lifecycle);

        runtime.spawn(run_ticker(
            Arc::downgrade(&self.inner),
            interval,
            generation,
            cancel,
        ));

        metrics::set_running(self.inner.kind, true);
        tracing::info!(
            profile = %self.inner.kind,
            interval_ms = interval.as_millis(),
            "Simulation started"
        );
        Ok(())
    }

    /// Stop ticking. No-op when not running.
    ///
    /// Waits for an in-flight tick on another thread to finish; no callback
    /// fires after this returns.
    pub fn stop(&self) {
        let _gate = self.inner.gate.lock();
        let mut lifecycle = self.inner.lifecycle.lock();

        let Lifecycle::Running { cancel, .. } = &*lifecycle else {
            return;
        };
        cancel.cancel();
        *lifecycle = Lifecycle::Stopped;
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        drop(lifecycle);

        metrics::set_running(self.inner.kind, false);
        tracing::info!(profile = %self.inner.kind, "Simulation stopped");
    }

    /// Stop ticking and drop every subscription. Terminal.
    pub fn destroy(&self) {
        let _gate = self.inner.gate.lock();
        let previous = std::mem::replace(&mut *self.inner.lifecycle.lock(), Lifecycle::Destroyed);

        match previous {
            Lifecycle::Destroyed => return,
            Lifecycle::Running { cancel, .. } => cancel.cancel(),
            Lifecycle::Stopped => {}
        }
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        let dropped = self.inner.registry.clear();

        metrics::set_running(self.inner.kind, false);
        metrics::set_subscribers(self.inner.kind, 0);
        tracing::info!(
            profile = %self.inner.kind,
            subscribers = dropped,
            "Simulation destroyed"
        );
    }

    // =========================================================================
    // Subscriptions
    // =========================================================================

    /// Register a callback for every published snapshot list.
    ///
    /// The callback is invoked once immediately with the current list, then
    /// after every tick and market event until disposed.
    ///
    /// # Errors
    ///
    /// Returns `SimulationError::Destroyed` after `destroy`.
    pub fn subscribe<F>(&self, callback: F) -> Result<SubscriptionHandle, SimulationError>
    where
        F: Fn(&SnapshotList) + Send + Sync + 'static,
    {
        let _gate = self.inner.gate.lock();
        if self.is_destroyed() {
            return Err(SimulationError::Destroyed);
        }

        let callback: SnapshotCallback = Arc::new(callback);
        let id = self.inner.registry.register(Arc::clone(&callback));
        metrics::set_subscribers(self.inner.kind, self.inner.registry.len());
        tracing::debug!(profile = %self.inner.kind, subscriber = id, "Subscriber registered");

        let current = self.inner.store.snapshot();
        if SubscriberRegistry::invoke(id, &callback, &current) {
            metrics::record_notifications(self.inner.kind, 1, 0);
        } else {
            metrics::record_notifications(self.inner.kind, 0, 1);
        }

        Ok(SubscriptionHandle {
            id,
            service: Arc::downgrade(&self.inner),
        })
    }

    // =========================================================================
    // Market Events
    // =========================================================================

    /// Apply a one-shot market shock to every instrument and notify
    /// subscribers immediately.
    ///
    /// Returns the resulting snapshot list. Works whether or not the timer
    /// is running.
    ///
    /// # Errors
    ///
    /// - `SimulationError::InvalidIntensity` for a negative or non-finite
    ///   intensity
    /// - `SimulationError::Destroyed` after `destroy`
    pub fn simulate_event(
        &self,
        direction: MarketDirection,
        intensity: f64,
    ) -> Result<SnapshotList, SimulationError> {
        if !intensity.is_finite() || intensity < 0.0 {
            return Err(SimulationError::InvalidIntensity(intensity));
        }

        let _gate = self.inner.gate.lock();
        if self.is_destroyed() {
            return Err(SimulationError::Destroyed);
        }

        let next = self.inner.apply_event(direction, intensity);
        self.inner.store.replace(Arc::clone(&next));
        let report = self
            .inner
            .registry
            .notify(&next, || !self.inner.is_destroyed());

        metrics::record_event(self.inner.kind, direction);
        metrics::record_notifications(self.inner.kind, report.delivered, report.failed);
        tracing::info!(
            profile = %self.inner.kind,
            direction = %direction,
            intensity,
            delivered = report.delivered,
            failed = report.failed,
            "Market event applied"
        );

        Ok(next)
    }

    // =========================================================================
    // Readers
    // =========================================================================

    /// Owned copy of the current snapshot list.
    #[must_use]
    pub fn get_current_data(&self) -> Vec<InstrumentSnapshot> {
        self.inner.store.to_vec()
    }

    /// Current snapshot for `symbol`, if tracked.
    #[must_use]
    pub fn get_one(&self, symbol: &str) -> Option<InstrumentSnapshot> {
        self.inner.store.get(symbol)
    }

    /// Shared handle to the current snapshot list.
    #[must_use]
    pub fn snapshot(&self) -> SnapshotList {
        self.inner.store.snapshot()
    }

    /// Which list this service maintains.
    #[must_use]
    pub fn kind(&self) -> ProfileKind {
        self.inner.kind
    }

    /// Whether the timer is armed.
    #[must_use]
    pub fn is_running(&self) -> bool {
        matches!(*self.inner.lifecycle.lock(), Lifecycle::Running { .. })
    }

    /// Whether `destroy` has been called.
    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.inner.is_destroyed()
    }

    /// Active tick period, if running.
    #[must_use]
    pub fn interval(&self) -> Option<Duration> {
        match &*self.inner.lifecycle.lock() {
            Lifecycle::Running { interval, .. } => Some(*interval),
            Lifecycle::Stopped | Lifecycle::Destroyed => None,
        }
    }

    /// Number of registered subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.registry.len()
    }

    /// Number of tracked instruments.
    #[must_use]
    pub fn instrument_count(&self) -> usize {
        self.inner.store.len()
    }
}

impl Inner {
    fn is_destroyed(&self) -> bool {
        matches!(*self.lifecycle.lock(), Lifecycle::Destroyed)
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    /// Run one timer pass. Returns `false` once the timer is stale.
    fn tick(&self, generation: u64) -> bool {
        let _gate = self.gate.lock();
        if !self.is_current(generation) {
            return false;
        }

        let started = Instant::now();
        let now = self.clock.now();
        let next: SnapshotList = {
            let previous = self.store.snapshot();
            let mut random = self.random.lock();
            previous
                .iter()
                .map(|snapshot| {
                    let price_draw = random.next_signed();
                    let volume_draw = random.next_signed();
                    self.model.step(snapshot, price_draw, volume_draw, now)
                })
                .collect()
        };

        self.store.replace(Arc::clone(&next));
        let report = self.registry.notify(&next, || self.is_current(generation));

        metrics::record_tick(self.kind, started.elapsed());
        metrics::record_notifications(self.kind, report.delivered, report.failed);
        tracing::trace!(
            profile = %self.kind,
            instruments = next.len(),
            delivered = report.delivered,
            failed = report.failed,
            "Tick applied"
        );

        self.is_current(generation)
    }

    fn apply_event(&self, direction: MarketDirection, intensity: f64) -> SnapshotList {
        let now = self.clock.now();
        let previous = self.store.snapshot();
        let mut random = self.random.lock();
        previous
            .iter()
            .map(|snapshot| {
                volatility::apply_event(snapshot, direction, intensity, random.next_signed(), now)
            })
            .collect()
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Lifecycle::Running { cancel, .. } = &*self.lifecycle.get_mut() {
            cancel.cancel();
        }
    }
}

async fn run_ticker(
    inner: Weak<Inner>,
    interval: Duration,
    generation: u64,
    cancel: CancellationToken,
) {
    let mut ticker = time::interval_at(time::Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = ticker.tick() => {
                let Some(inner) = inner.upgrade() else {
                    break;
                };
                if !inner.tick(generation) {
                    break;
                }
            }
        }
    }

    tracing::debug!(generation, "Simulation timer exited");
}

// =============================================================================
// Subscription Handle
// =============================================================================

/// Disposer returned by [`SimulationService::subscribe`].
///
/// Dropping the handle leaves the subscription registered; call
/// [`SubscriptionHandle::dispose`] to remove it.
#[derive(Debug)]
#[must_use = "call dispose() to remove the subscription"]
pub struct SubscriptionHandle {
    id: SubscriberId,
    service: Weak<Inner>,
}

impl SubscriptionHandle {
    /// Subscriber id.
    #[must_use]
    pub const fn id(&self) -> SubscriberId {
        self.id
    }

    /// Remove the subscription. Returns `false` if it was already gone.
    ///
    /// No callback for this subscription fires after this returns.
    pub fn dispose(self) -> bool {
        let Some(inner) = self.service.upgrade() else {
            return false;
        };
        let _gate = inner.gate.lock();
        let removed = inner.registry.remove(self.id);
        if removed {
            metrics::set_subscribers(inner.kind, inner.registry.len());
            tracing::debug!(profile = %inner.kind, subscriber = self.id, "Subscriber disposed");
        }
        removed
    }
}

// =============================================================================
// Tests
// =============================================================================
