//! Simulation Service Lifecycle Integration Tests
//!
//! Drives the real timer on a paused tokio clock: replay on subscribe,
//! tick cadence, restart, stop, destroy, and subscriber isolation.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use chrono::{TimeZone, Utc};
use parking_lot::Mutex;
use tokio::time::sleep;

use market_simulator::infrastructure::broadcast::SnapshotBroadcastHub;
use market_simulator::{
    FixedClock, FixedRandom, MarketDirection, MarketHours, ProfileKind, RandomSource, Sector,
    SeedInstrument, ServiceSettings, SimulationError, SimulationService, VolatilityModel,
};

const INTERVAL: Duration = Duration::from_secs(1);

fn service_with(random: Box<dyn RandomSource>) -> SimulationService {
    let settings = ServiceSettings::securities()
        .with_model(VolatilityModel::securities().with_market_hours(MarketHours::disabled()))
        .with_interval(INTERVAL);
    let seeds = [SeedInstrument::security(
        "TEST",
        "Test Corp",
        100.0,
        1_000,
        Sector::Technology,
        1.0,
    )];
    let clock = Arc::new(FixedClock::new(
        Utc.with_ymd_and_hms(2024, 3, 12, 12, 0, 0).unwrap(),
    ));
    SimulationService::with_parts(settings, &seeds, random, clock).unwrap()
}

fn counting_subscriber(service: &SimulationService) -> Arc<AtomicUsize> {
    let count = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&count);
    let _handle = service
        .subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
    count
}

#[tokio::test(start_paused = true)]
async fn subscriber_gets_replay_then_one_call_per_tick() {
    let service = service_with(Box::new(FixedRandom(0.0)));
    let count = counting_subscriber(&service);
    assert_eq!(count.load(Ordering::SeqCst), 1);

    service.start().unwrap();
    sleep(Duration::from_millis(3_500)).await;

    assert_eq!(count.load(Ordering::SeqCst), 4);
    service.destroy();
}

#[tokio::test(start_paused = true)]
async fn first_tick_waits_a_full_interval() {
    let service = service_with(Box::new(FixedRandom(0.0)));
    let count = counting_subscriber(&service);

    service.start().unwrap();
    sleep(Duration::from_millis(999)).await;
    assert_eq!(count.load(Ordering::SeqCst), 1);

    sleep(Duration::from_millis(2)).await;
    assert_eq!(count.load(Ordering::SeqCst), 2);
    service.destroy();
}

#[tokio::test(start_paused = true)]
async fn full_draw_tick_moves_price_by_fifteen_basis_points() {
    let service = service_with(Box::new(FixedRandom(1.0)));
    service.start().unwrap();

    sleep(Duration::from_millis(1_001)).await;

    let test = service.get_one("TEST").unwrap();
    assert!((test.price - 100.15).abs() < 1e-9);
    assert!((test.change - 0.15).abs() < 1e-9);
    service.destroy();
}

#[tokio::test(start_paused = true)]
async fn restart_replaces_the_timer() {
    let service = service_with(Box::new(FixedRandom(0.0)));
    let count = counting_subscriber(&service);

    service.start().unwrap();
    sleep(Duration::from_millis(600)).await;

    // Old timer would fire at 1.0s; the new one first fires at 1.6s.
    service.start().unwrap();
    sleep(Duration::from_millis(600)).await;
    assert_eq!(count.load(Ordering::SeqCst), 1);

    sleep(Duration::from_millis(500)).await;
    assert_eq!(count.load(Ordering::SeqCst), 2);
    service.destroy();
}

#[tokio::test(start_paused = true)]
async fn stop_halts_ticks_and_is_idempotent() {
    let service = service_with(Box::new(FixedRandom(0.0)));
    let count = counting_subscriber(&service);

    service.start().unwrap();
    sleep(Duration::from_millis(1_500)).await;
    assert_eq!(count.load(Ordering::SeqCst), 2);

    service.stop();
    service.stop();
    assert!(!service.is_running());

    sleep(Duration::from_secs(5)).await;
    assert_eq!(count.load(Ordering::SeqCst), 2);

    // Restartable after stop
    service.start().unwrap();
    sleep(Duration::from_millis(1_001)).await;
    assert_eq!(count.load(Ordering::SeqCst), 3);
    service.destroy();
}

#[tokio::test(start_paused = true)]
async fn panicking_subscriber_does_not_starve_others() {
    let service = service_with(Box::new(FixedRandom(0.0)));
    let _bad = service.subscribe(|_| panic!("subscriber failure")).unwrap();
    let count = counting_subscriber(&service);

    service.start().unwrap();
    sleep(Duration::from_millis(2_001)).await;

    assert_eq!(count.load(Ordering::SeqCst), 3);
    assert!(service.is_running());
    assert_eq!(service.subscriber_count(), 2);
    service.destroy();
}

#[tokio::test(start_paused = true)]
async fn disposed_subscriber_stops_receiving() {
    let service = service_with(Box::new(FixedRandom(0.0)));
    let count = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&count);
    let handle = service
        .subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

    service.start().unwrap();
    sleep(Duration::from_millis(1_001)).await;
    assert_eq!(count.load(Ordering::SeqCst), 2);

    assert!(handle.dispose());
    sleep(Duration::from_secs(3)).await;
    assert_eq!(count.load(Ordering::SeqCst), 2);
    service.destroy();
}

#[tokio::test(start_paused = true)]
async fn stop_from_callback_skips_remaining_subscribers() {
    let service = service_with(Box::new(FixedRandom(0.0)));

    let calls = Arc::new(AtomicUsize::new(0));
    let stopper = service.clone();
    let stopper_calls = Arc::clone(&calls);
    let _first = service
        .subscribe(move |_| {
            // Replay is call one; stop on the first tick.
            if stopper_calls.fetch_add(1, Ordering::SeqCst) == 1 {
                stopper.stop();
            }
        })
        .unwrap();
    let later = counting_subscriber(&service);

    service.start().unwrap();
    sleep(Duration::from_secs(3)).await;

    assert!(!service.is_running());
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(later.load(Ordering::SeqCst), 1);

    // Breaks the service <-> callback cycle
    service.destroy();
}

#[tokio::test(start_paused = true)]
async fn destroy_silences_everything() {
    let service = service_with(Box::new(FixedRandom(0.0)));
    let count = counting_subscriber(&service);

    service.start().unwrap();
    service.destroy();
    sleep(Duration::from_secs(5)).await;

    assert_eq!(count.load(Ordering::SeqCst), 1);
    assert!(service.is_destroyed());
    assert!(!service.is_running());
    assert_eq!(service.start(), Err(SimulationError::Destroyed));
    assert_eq!(
        service.simulate_event(MarketDirection::Bullish, 1.0),
        Err(SimulationError::Destroyed)
    );
    assert!(service.subscribe(|_| {}).is_err());

    // Snapshot reads keep working
    assert_eq!(service.instrument_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn market_event_notifies_while_stopped() {
    let service = service_with(Box::new(FixedRandom(1.0)));
    let prices = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&prices);
    let _handle = service
        .subscribe(move |list| sink.lock().push(list[0].price))
        .unwrap();

    let list = service
        .simulate_event(MarketDirection::Bullish, 1.0)
        .unwrap();

    assert!(!service.is_running());
    assert!((list[0].price - 105.0).abs() < 1e-9);
    let seen = prices.lock().clone();
    assert_eq!(seen.len(), 2);
    assert!((seen[0] - 100.0).abs() < 1e-9);
    assert!((seen[1] - 105.0).abs() < 1e-9);
}

#[tokio::test(start_paused = true)]
async fn broadcast_hub_receives_ticks() {
    let service = service_with(Box::new(FixedRandom(1.0)));
    let hub = Arc::new(SnapshotBroadcastHub::with_defaults());
    let mut rx = hub.receiver(ProfileKind::Securities);
    let _feed = hub.attach(&service).unwrap();

    // Replay on attach
    let replay = rx.recv().await.unwrap();
    assert_eq!(replay.profile, ProfileKind::Securities);
    assert!((replay.snapshots[0].price - 100.0).abs() < 1e-9);

    service.start().unwrap();
    let ticked = rx.recv().await.unwrap();
    assert!((ticked.snapshots[0].price - 100.15).abs() < 1e-9);
    service.destroy();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn stop_from_another_thread_silences_later_ticks() {
    let settings = ServiceSettings::securities()
        .with_model(VolatilityModel::securities().with_market_hours(MarketHours::disabled()))
        .with_interval(Duration::from_millis(1));
    let seeds = [SeedInstrument::security(
        "TEST",
        "Test Corp",
        100.0,
        1_000,
        Sector::Technology,
        1.0,
    )];
    let service = SimulationService::with_parts(
        settings,
        &seeds,
        Box::new(FixedRandom(0.5)),
        Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2024, 3, 12, 12, 0, 0).unwrap(),
        )),
    )
    .unwrap();
    let count = counting_subscriber(&service);

    for _ in 0..20 {
        service.start().unwrap();
        sleep(Duration::from_millis(5)).await;

        let stopper = service.clone();
        std::thread::spawn(move || stopper.stop()).join().unwrap();

        let after_stop = count.load(Ordering::SeqCst);
        sleep(Duration::from_millis(10)).await;
        assert_eq!(count.load(Ordering::SeqCst), after_stop);
        assert!(!service.is_running());
    }

    service.destroy();
}
