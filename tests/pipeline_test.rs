//! End-to-end pipeline tests: scripted bar source → signal machine →
//! execution backends, driven by the polling scheduler.

mod common;

use common::*;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use tradewind::adapters::live_executor::LiveExecutor;
use tradewind::adapters::sim_executor::SimExecutor;
use tradewind::domain::error::TradewindError;
use tradewind::domain::order::{OrderSide, OrderStatus};
use tradewind::domain::poller::Poller;
use tradewind::domain::signal::Direction;

/// Closes that dip and recover: the 2-bar average first exceeds the 4-bar
/// average at the 11 close (index 7).
const CROSSOVER_CLOSES: [f64; 12] = [
    10.0, 10.0, 10.0, 9.0, 8.0, 7.0, 6.0, 11.0, 12.0, 13.0, 14.0, 15.0,
];

fn fetch_error() -> TradewindError {
    TradewindError::Fetch {
        reason: "connection reset".into(),
    }
}

/// One scripted window per cycle: each prefix of the close series, as a
/// live session would see the history grow bar by bar.
fn growing_windows(closes: &[f64]) -> Vec<Result<Vec<tradewind::domain::bar::Bar>, TradewindError>>
{
    (1..=closes.len())
        .map(|len| Ok(bars_from_closes("BTCUSDT", &closes[..len])))
        .collect()
}

#[tokio::test(start_paused = true)]
async fn long_fires_exactly_once_across_growing_windows() {
    let (stop_tx, stop_rx) = watch::channel(false);
    let source =
        ScriptedBarSource::new(growing_windows(&CROSSOVER_CLOSES)).stop_when_exhausted(stop_tx);
    let notifier = RecordingNotifier::new();
    let executor = SimExecutor::new(10_000.0);

    let mut poller = Poller::new(test_session(2, 4), source, executor, notifier.clone(), stop_rx);
    poller.run().await;

    // One entry, no exit: the trend never crosses back down.
    assert_eq!(notifier.count_containing("Signal: LONG"), 1);
    assert_eq!(notifier.count_containing("Signal: FLAT"), 0);

    let ledger = poller.executor().ledger();
    assert_eq!(ledger.trades().len(), 1);
    assert_eq!(ledger.trades()[0].side, OrderSide::Buy);
    assert!((ledger.trades()[0].price - 11.0).abs() < f64::EPSILON);
    // Entry cost is sizing_fraction × balance = 2000.
    assert!((ledger.balance() - 8_000.0).abs() < 1e-9);
    assert!(ledger.open_position().is_some());
    assert_eq!(poller.machine().current(), Direction::Long);
}

#[tokio::test(start_paused = true)]
async fn round_trip_enters_and_exits() {
    // Recovery, then a collapse that pulls the short average back under.
    let closes = [
        10.0, 10.0, 10.0, 9.0, 8.0, 7.0, 6.0, 11.0, 12.0, 13.0, 5.0,
    ];
    let (stop_tx, stop_rx) = watch::channel(false);
    let source = ScriptedBarSource::new(growing_windows(&closes)).stop_when_exhausted(stop_tx);
    let notifier = RecordingNotifier::new();
    let executor = SimExecutor::new(10_000.0);

    let mut poller = Poller::new(test_session(2, 4), source, executor, notifier.clone(), stop_rx);
    poller.run().await;

    assert_eq!(notifier.count_containing("Signal: LONG"), 1);
    assert_eq!(notifier.count_containing("Signal: FLAT"), 1);
    assert_eq!(notifier.count_containing("Executed BUY"), 1);
    assert_eq!(notifier.count_containing("Executed SELL"), 1);

    let ledger = poller.executor().ledger();
    assert!(ledger.open_position().is_none());
    assert_eq!(ledger.closed_positions().len(), 1);

    // Entry: 2000 / 11 units at 11; exit at 5.
    let amount = 2_000.0 / 11.0;
    let expected_balance = 8_000.0 + amount * 5.0;
    assert!((ledger.balance() - expected_balance).abs() < 1e-6);
    assert!(ledger.closed_positions()[0].profit.unwrap() < 0.0);
    assert_eq!(poller.machine().current(), Direction::Flat);
}

#[tokio::test(start_paused = true)]
async fn fetch_error_skips_cycle_without_touching_state() {
    // Cycle N fails; cycle N+1 must see exactly the state from before N.
    let mut script = vec![Err(fetch_error())];
    script.extend(growing_windows(&CROSSOVER_CLOSES));

    let (stop_tx, stop_rx) = watch::channel(false);
    let source = ScriptedBarSource::new(script).stop_when_exhausted(stop_tx);
    let notifier = RecordingNotifier::new();
    let executor = SimExecutor::new(10_000.0);

    let mut poller = Poller::new(test_session(2, 4), source, executor, notifier.clone(), stop_rx);
    poller.run().await;

    assert_eq!(notifier.count_containing("Cycle skipped"), 1);
    assert_eq!(notifier.count_containing("connection reset"), 1);

    // The degraded cycle neither advanced nor corrupted anything: the
    // later crossover still entered with the full starting balance.
    let ledger = poller.executor().ledger();
    assert_eq!(ledger.trades().len(), 1);
    assert!((ledger.balance() - 8_000.0).abs() < 1e-9);
}

#[tokio::test(start_paused = true)]
async fn fetch_error_alone_leaves_ledger_pristine() {
    let script = vec![Err(fetch_error()), Ok(bars_from_closes("BTCUSDT", &[10.0; 8]))];
    let (stop_tx, stop_rx) = watch::channel(false);
    let source = ScriptedBarSource::new(script).stop_when_exhausted(stop_tx);
    let notifier = RecordingNotifier::new();
    let executor = SimExecutor::new(10_000.0);

    let mut poller = Poller::new(test_session(2, 4), source, executor, notifier.clone(), stop_rx);
    poller.run().await;

    let ledger = poller.executor().ledger();
    assert!((ledger.balance() - 10_000.0).abs() < f64::EPSILON);
    assert!(ledger.trades().is_empty());
    assert!(ledger.open_position().is_none());
    assert_eq!(poller.machine().current(), Direction::Flat);
}

#[tokio::test(start_paused = true)]
async fn empty_window_is_a_degraded_cycle() {
    let script = vec![Ok(Vec::new())];
    let (stop_tx, stop_rx) = watch::channel(false);
    let source = ScriptedBarSource::new(script).stop_when_exhausted(stop_tx);
    let notifier = RecordingNotifier::new();
    let executor = SimExecutor::new(10_000.0);

    let mut poller = Poller::new(test_session(2, 4), source, executor, notifier.clone(), stop_rx);
    poller.run().await;

    assert_eq!(notifier.count_containing("empty bar window"), 1);
    assert!(poller.executor().ledger().trades().is_empty());
}

#[tokio::test(start_paused = true)]
async fn stop_before_first_cycle_fetches_nothing() {
    let (stop_tx, stop_rx) = watch::channel(false);
    stop_tx.send(true).unwrap();

    let source = ScriptedBarSource::new(growing_windows(&CROSSOVER_CLOSES));
    let notifier = RecordingNotifier::new();
    let executor = SimExecutor::new(10_000.0);

    let mut poller = Poller::new(test_session(2, 4), source, executor, notifier.clone(), stop_rx);
    poller.run().await;

    assert_eq!(notifier.count_containing("Polling started"), 1);
    assert_eq!(notifier.count_containing("Polling stopped"), 1);
    assert_eq!(notifier.count_containing("Signal"), 0);
    assert!(poller.executor().ledger().trades().is_empty());
}

#[tokio::test(start_paused = true)]
async fn live_backend_never_has_two_outstanding_orders() {
    // Entry crossover, then an exit crossover, against a venue that never
    // fills: the exit signal must be dropped, not submitted.
    let closes = [
        10.0, 10.0, 10.0, 9.0, 8.0, 7.0, 6.0, 11.0, 12.0, 13.0, 5.0,
    ];
    let (stop_tx, stop_rx) = watch::channel(false);
    let source = ScriptedBarSource::new(growing_windows(&closes)).stop_when_exhausted(stop_tx);
    let notifier = RecordingNotifier::new();

    let venue = Arc::new(MockVenue::new(&[OrderStatus::Pending]));
    let executor = LiveExecutor::connect(Arc::clone(&venue), "BTCUSDT".into(), 10_000.0)
        .await
        .unwrap()
        .with_status_poll(Duration::from_millis(1))
        .with_status_timeout(Duration::from_millis(5));

    let mut poller = Poller::new(test_session(2, 4), source, executor, notifier.clone(), stop_rx);
    poller.run().await;

    // Entry timed out pending, exit was dropped on the pending slot.
    assert_eq!(venue.submitted().len(), 1);
    assert_eq!(venue.submitted()[0].side, OrderSide::Buy);
    assert_eq!(notifier.count_containing("Execution failed"), 2);
    assert_eq!(notifier.count_containing("not settled within timeout"), 1);
    assert_eq!(notifier.count_containing("still pending"), 1);
    assert!(poller.executor().slot().is_pending());
}

#[tokio::test(start_paused = true)]
async fn live_backend_round_trip_fills() {
    let closes = [
        10.0, 10.0, 10.0, 9.0, 8.0, 7.0, 6.0, 11.0, 12.0, 13.0, 5.0,
    ];
    let (stop_tx, stop_rx) = watch::channel(false);
    let source = ScriptedBarSource::new(growing_windows(&closes)).stop_when_exhausted(stop_tx);
    let notifier = RecordingNotifier::new();

    let venue = Arc::new(MockVenue::new(&[OrderStatus::Filled]));
    let executor = LiveExecutor::connect(Arc::clone(&venue), "BTCUSDT".into(), 10_000.0)
        .await
        .unwrap()
        .with_status_poll(Duration::from_millis(1))
        .with_status_timeout(Duration::from_millis(5));

    let mut poller = Poller::new(test_session(2, 4), source, executor, notifier.clone(), stop_rx);
    poller.run().await;

    let orders = venue.submitted();
    assert_eq!(orders.len(), 2);
    assert_eq!(orders[0].side, OrderSide::Buy);
    assert_eq!(orders[1].side, OrderSide::Sell);

    let executor = poller.executor();
    assert!((executor.position_size() - 0.0).abs() < 1e-9);
    // Bought 2000/11 units at 11, sold at 5.
    let amount = 2_000.0 / 11.0;
    assert!((executor.cash() - (8_000.0 + amount * 5.0)).abs() < 1e-6);
    assert_eq!(notifier.count_containing("Executed BUY"), 1);
    assert_eq!(notifier.count_containing("Executed SELL"), 1);
}
