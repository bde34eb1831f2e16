//! Subscriber Registry
//!
//! Tracks snapshot-list callbacks and fans each new list out to them.
//!
//! # Design
//!
//! The registry tracks:
//! - One callback per subscriber id, in registration order
//! - A monotonically increasing id used by disposers
//!
//! Fan-out clones the callback list and releases the lock before invoking
//! anything, so a callback may subscribe, dispose or read the store without
//! deadlocking. Each invocation is isolated: a panicking callback is logged
//! and counted, and the remaining subscribers are still notified.

use std::any::Any;
use std::collections::BTreeMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use super::instrument::SnapshotList;

// =============================================================================
// Types
// =============================================================================

/// Unique identifier for a subscriber.
pub type SubscriberId = u64;

/// Callback invoked with every published snapshot list.
pub type SnapshotCallback = Arc<dyn Fn(&SnapshotList) + Send + Sync>;

/// Outcome of one fan-out pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NotifyReport {
    /// Callbacks that returned normally.
    pub delivered: usize,
    /// Callbacks that panicked.
    pub failed: usize,
    /// Callbacks skipped because the pass was halted.
    pub skipped: usize,
}

impl NotifyReport {
    /// Total callbacks attempted.
    #[must_use]
    pub const fn attempted(&self) -> usize {
        self.delivered + self.failed
    }
}

// =============================================================================
// Subscriber Registry
// =============================================================================

/// Registry of snapshot subscribers.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicUsize, Ordering};
///
/// use market_simulator::domain::instrument::SnapshotList;
/// use market_simulator::domain::subscription::SubscriberRegistry;
///
/// let registry = SubscriberRegistry::new();
/// let seen = Arc::new(AtomicUsize::new(0));
///
/// let counter = Arc::clone(&seen);
/// let id = registry.register(Arc::new(move |_: &SnapshotList| {
///     counter.fetch_add(1, Ordering::SeqCst);
/// }));
///
/// let list: SnapshotList = Vec::new().into();
/// let report = registry.notify(&list, || true);
/// assert_eq!(report.delivered, 1);
///
/// assert!(registry.remove(id));
/// assert_eq!(seen.load(Ordering::SeqCst), 1);
/// ```
pub struct SubscriberRegistry {
    next_id: AtomicU64,
    subscribers: RwLock<BTreeMap<SubscriberId, SnapshotCallback>>,
}

impl Default for SubscriberRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SubscriberRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriberRegistry")
            .field("subscribers", &self.len())
            .finish_non_exhaustive()
    }
}

impl SubscriberRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            subscribers: RwLock::new(BTreeMap::new()),
        }
    }

    /// Register a callback and return its id.
    pub fn register(&self, callback: SnapshotCallback) -> SubscriberId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.subscribers.write().insert(id, callback);
        id
    }

    /// Remove a subscriber. Returns `false` if it was not registered.
    pub fn remove(&self, id: SubscriberId) -> bool {
        self.subscribers.write().remove(&id).is_some()
    }

    /// Remove every subscriber and return how many were registered.
    pub fn clear(&self) -> usize {
        let mut subscribers = self.subscribers.write();
        let count = subscribers.len();
        subscribers.clear();
        count
    }

    /// Whether a subscriber is still registered.
    #[must_use]
    pub fn contains(&self, id: SubscriberId) -> bool {
        self.subscribers.read().contains_key(&id)
    }

    /// Number of registered subscribers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.subscribers.read().len()
    }

    /// Whether no subscribers are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subscribers.read().is_empty()
    }

    /// Invoke a single callback with panic isolation.
    ///
    /// Returns `true` if the callback returned normally.
    pub fn invoke(id: SubscriberId, callback: &SnapshotCallback, snapshots: &SnapshotList) -> bool {
        match catch_unwind(AssertUnwindSafe(|| callback(snapshots))) {
            Ok(()) => true,
            Err(payload) => {
                tracing::error!(
                    subscriber = id,
                    panic = %panic_message(payload.as_ref()),
                    "Subscriber callback panicked"
                );
                false
            }
        }
    }

    /// Notify every subscriber in registration order.
    ///
    /// `keep_going` is checked before each callback; once it returns `false`
    /// the rest of the pass is skipped. Subscribers removed while the pass is
    /// running are not invoked.
    pub fn notify(
        &self,
        snapshots: &SnapshotList,
        mut keep_going: impl FnMut() -> bool,
    ) -> NotifyReport {
        let callbacks: Vec<(SubscriberId, SnapshotCallback)> = self
            .subscribers
            .read()
            .iter()
            .map(|(id, callback)| (*id, Arc::clone(callback)))
            .collect();

        let mut report = NotifyReport::default();
        for (index, (id, callback)) in callbacks.iter().enumerate() {
            if !keep_going() {
                report.skipped = callbacks.len() - index;
                break;
            }
            if !self.contains(*id) {
                continue;
            }
            if Self::invoke(*id, callback, snapshots) {
                report.delivered += 1;
            } else {
                report.failed += 1;
            }
        }

        report
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use parking_lot::Mutex;

    use super::*;

    fn empty_list() -> SnapshotList {
        Vec::new().into()
    }

    fn counting(counter: &Arc<AtomicUsize>) -> SnapshotCallback {
        let counter = Arc::clone(counter);
        Arc::new(move |_: &SnapshotList| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn register_assigns_unique_ids() {
        let registry = SubscriberRegistry::new();
        let counter = Arc::new(AtomicUsize::new(0));

        let a = registry.register(counting(&counter));
        let b = registry.register(counting(&counter));

        assert_ne!(a, b);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn notify_calls_every_subscriber_once() {
        let registry = SubscriberRegistry::new();
        let counter = Arc::new(AtomicUsize::new(0));
        for _ in 0..3 {
            registry.register(counting(&counter));
        }

        let report = registry.notify(&empty_list(), || true);

        assert_eq!(report.delivered, 3);
        assert_eq!(report.failed, 0);
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn notify_follows_registration_order() {
        let registry = SubscriberRegistry::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        for tag in ["first", "second", "third"] {
            let order = Arc::clone(&order);
            registry.register(Arc::new(move |_: &SnapshotList| order.lock().push(tag)));
        }

        registry.notify(&empty_list(), || true);

        assert_eq!(*order.lock(), vec!["first", "second", "third"]);
    }

    #[test]
    fn panicking_subscriber_is_isolated() {
        let registry = SubscriberRegistry::new();
        let counter = Arc::new(AtomicUsize::new(0));

        registry.register(Arc::new(|_: &SnapshotList| panic!("subscriber exploded")));
        registry.register(counting(&counter));

        let report = registry.notify(&empty_list(), || true);

        assert_eq!(report.failed, 1);
        assert_eq!(report.delivered, 1);
        assert_eq!(report.attempted(), 2);
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        // Still isolated on the next pass
        registry.notify(&empty_list(), || true);
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn removed_subscriber_not_notified() {
        let registry = SubscriberRegistry::new();
        let counter = Arc::new(AtomicUsize::new(0));

        let id = registry.register(counting(&counter));
        assert!(registry.remove(id));
        assert!(!registry.remove(id));

        registry.notify(&empty_list(), || true);
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn halted_pass_skips_remaining() {
        let registry = SubscriberRegistry::new();
        let counter = Arc::new(AtomicUsize::new(0));
        for _ in 0..4 {
            registry.register(counting(&counter));
        }

        let mut budget = 2;
        let report = registry.notify(&empty_list(), || {
            budget -= 1;
            budget >= 0
        });

        assert_eq!(report.delivered, 2);
        assert_eq!(report.skipped, 2);
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn subscriber_removed_mid_pass_is_skipped() {
        let registry = Arc::new(SubscriberRegistry::new());
        let counter = Arc::new(AtomicUsize::new(0));
        let victim = Arc::new(AtomicU64::new(0));

        let registry_ref = Arc::clone(&registry);
        let victim_ref = Arc::clone(&victim);
        registry.register(Arc::new(move |_: &SnapshotList| {
            registry_ref.remove(victim_ref.load(Ordering::SeqCst));
        }));
        let id = registry.register(counting(&counter));
        victim.store(id, Ordering::SeqCst);

        registry.notify(&empty_list(), || true);

        assert_eq!(counter.load(Ordering::SeqCst), 0);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn callback_may_register_during_pass() {
        let registry = Arc::new(SubscriberRegistry::new());
        let counter = Arc::new(AtomicUsize::new(0));

        let registry_ref = Arc::clone(&registry);
        let counter_ref = Arc::clone(&counter);
        registry.register(Arc::new(move |_: &SnapshotList| {
            registry_ref.register(counting(&counter_ref));
        }));

        registry.notify(&empty_list(), || true);

        assert_eq!(registry.len(), 2);
        // Late registrations join on the next pass
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn clear_removes_everything() {
        let registry = SubscriberRegistry::new();
        let counter = Arc::new(AtomicUsize::new(0));
        registry.register(counting(&counter));
        registry.register(counting(&counter));

        assert_eq!(registry.clear(), 2);
        assert!(registry.is_empty());
    }

    #[test]
    fn panic_message_extracts_strings() {
        let owned: Box<dyn Any + Send> = Box::new("boom".to_string());
        let borrowed: Box<dyn Any + Send> = Box::new("bang");
        let other: Box<dyn Any + Send> = Box::new(42_u8);

        assert_eq!(panic_message(owned.as_ref()), "boom");
        assert_eq!(panic_message(borrowed.as_ref()), "bang");
        assert_eq!(panic_message(other.as_ref()), "non-string panic payload");
    }

    #[test]
    fn thread_safety_concurrent_registration() {
        use std::thread;

        let registry = Arc::new(SubscriberRegistry::new());
        let counter = Arc::new(AtomicUsize::new(0));
        let mut handles = vec![];

        for _ in 0..10 {
            let registry = Arc::clone(&registry);
            let callback = counting(&counter);
            handles.push(thread::spawn(move || registry.register(callback)));
        }

        let mut ids: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        ids.sort_unstable();
        ids.dedup();

        assert_eq!(ids.len(), 10);
        registry.notify(&empty_list(), || true);
        assert_eq!(counter.load(Ordering::SeqCst), 10);
    }
}
