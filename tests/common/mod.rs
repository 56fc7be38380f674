#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

use tradewind::domain::bar::Bar;
use tradewind::domain::error::{TradewindError, VenueError};
use tradewind::domain::indicator::IndicatorParams;
use tradewind::domain::order::{Order, OrderSide, OrderStatus};
use tradewind::domain::session::{Interval, SessionConfig};
use tradewind::ports::bar_source::BarSourcePort;
use tradewind::ports::notifier::NotifierPort;
use tradewind::ports::venue::VenuePort;

pub fn make_bar(symbol: &str, offset_hours: i64, close: f64) -> Bar {
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    Bar {
        symbol: symbol.to_string(),
        timestamp: start + Duration::hours(offset_hours),
        open: close,
        high: close,
        low: close,
        close,
        volume: 1000.0,
    }
}

pub fn bars_from_closes(symbol: &str, closes: &[f64]) -> Vec<Bar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| make_bar(symbol, i as i64, close))
        .collect()
}

/// Short-window session over a one-second cadence so paused-clock tests
/// tick through cycles instantly.
pub fn test_session(short: usize, long: usize) -> SessionConfig {
    SessionConfig {
        symbol: "BTCUSDT".into(),
        interval: Interval::parse("1s").unwrap(),
        initial_capital: 10_000.0,
        sizing_fraction: 0.2,
        indicators: IndicatorParams {
            short_window: short,
            long_window: long,
            rsi_period: 3,
            macd_fast: 2,
            macd_slow: 3,
            macd_signal: 2,
        },
    }
}

/// Bar source that serves one scripted result per cycle. When the script
/// runs out it flips the session's stop flag and parks, so the poller
/// observes the stop at its fetch suspension point.
pub struct ScriptedBarSource {
    script: Mutex<VecDeque<Result<Vec<Bar>, TradewindError>>>,
    stop_tx: Mutex<Option<watch::Sender<bool>>>,
}

impl ScriptedBarSource {
    pub fn new(script: Vec<Result<Vec<Bar>, TradewindError>>) -> Self {
        ScriptedBarSource {
            script: Mutex::new(script.into_iter().collect()),
            stop_tx: Mutex::new(None),
        }
    }

    pub fn stop_when_exhausted(self, tx: watch::Sender<bool>) -> Self {
        *self.stop_tx.lock().unwrap() = Some(tx);
        self
    }

    fn next(&self) -> Option<Result<Vec<Bar>, TradewindError>> {
        self.script.lock().unwrap().pop_front()
    }
}

#[async_trait]
impl BarSourcePort for ScriptedBarSource {
    async fn fetch_bars(
        &self,
        _symbol: &str,
        _interval: &Interval,
        _since: DateTime<Utc>,
        _until: DateTime<Utc>,
    ) -> Result<Vec<Bar>, TradewindError> {
        self.next().unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn fetch_latest(
        &self,
        _symbol: &str,
        _interval: &Interval,
    ) -> Result<Vec<Bar>, TradewindError> {
        match self.next() {
            Some(result) => result,
            None => {
                if let Some(tx) = self.stop_tx.lock().unwrap().as_ref() {
                    let _ = tx.send(true);
                }
                std::future::pending().await
            }
        }
    }
}

/// Notifier that records every delivered message.
#[derive(Clone)]
pub struct RecordingNotifier {
    messages: Arc<Mutex<Vec<String>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        RecordingNotifier {
            messages: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }

    pub fn count_containing(&self, needle: &str) -> usize {
        self.messages()
            .iter()
            .filter(|m| m.contains(needle))
            .count()
    }
}

#[async_trait]
impl NotifierPort for RecordingNotifier {
    async fn send(&self, message: &str) {
        self.messages.lock().unwrap().push(message.to_string());
    }
}

/// Venue whose `order_status` answers follow a script; the last entry
/// repeats once the script runs out.
pub struct MockVenue {
    statuses: Mutex<VecDeque<OrderStatus>>,
    submitted: Arc<Mutex<Vec<Order>>>,
    next_id: AtomicU64,
}

impl MockVenue {
    pub fn new(statuses: &[OrderStatus]) -> Self {
        MockVenue {
            statuses: Mutex::new(statuses.iter().copied().collect()),
            submitted: Arc::new(Mutex::new(Vec::new())),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn submitted(&self) -> Vec<Order> {
        self.submitted.lock().unwrap().clone()
    }
}

#[async_trait]
impl VenuePort for MockVenue {
    async fn submit_order(
        &self,
        symbol: &str,
        side: OrderSide,
        amount: f64,
    ) -> Result<Order, VenueError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let order = Order {
            id: format!("ord-{id}"),
            symbol: symbol.to_string(),
            side,
            requested_amount: amount,
            status: OrderStatus::Pending,
        };
        self.submitted.lock().unwrap().push(order.clone());
        Ok(order)
    }

    async fn order_status(&self, _order_id: &str) -> Result<OrderStatus, VenueError> {
        let mut statuses = self.statuses.lock().unwrap();
        if statuses.len() > 1 {
            Ok(statuses.pop_front().unwrap())
        } else {
            Ok(*statuses.front().expect("status script must not be empty"))
        }
    }

    async fn open_orders(&self, _symbol: Option<&str>) -> Result<Vec<Order>, VenueError> {
        Ok(Vec::new())
    }
}
