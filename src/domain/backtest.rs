//! Backtest engine: replay a bar series through the signal machine and the
//! simulated ledger.
//!
//! The replay is the same COMPUTE → DECIDE → EXECUTE pipeline the live
//! scheduler drives, minus the I/O: indicators are derived once for the
//! whole series and the machine walks it bar by bar.

use tracing::{debug, warn};

use crate::domain::bar::Bar;
use crate::domain::indicator::compute_indicator_sets;
use crate::domain::ledger::{Ledger, LedgerSnapshot};
use crate::domain::session::SessionConfig;
use crate::domain::signal::{Signal, SignalStateMachine};

#[derive(Debug, Clone)]
pub struct BacktestReport {
    pub symbol: String,
    pub interval: String,
    pub initial_balance: f64,
    pub ending_balance: f64,
    pub profit_pct: f64,
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub signals: Vec<Signal>,
}

impl BacktestReport {
    /// Operator-facing summary, printed and pushed through the notifier.
    pub fn summary(&self) -> String {
        format!(
            "Backtest completed for {symbol} ({interval}).\n\
             Initial Balance: ${initial:.2}\n\
             Ending Balance: ${ending:.2}\n\
             Profit: {profit:.2}%\n\
             Signals: {signals}\n\
             Closed Trades: {total} ({won} won, {lost} lost)",
            symbol = self.symbol,
            interval = self.interval,
            initial = self.initial_balance,
            ending = self.ending_balance,
            profit = self.profit_pct,
            signals = self.signals.len(),
            total = self.total_trades,
            won = self.winning_trades,
            lost = self.losing_trades,
        )
    }
}

/// Run the full replay. Rejected trades are logged and skipped; the ledger
/// is left consistent either way.
pub fn run_backtest(bars: &[Bar], session: &SessionConfig) -> (BacktestReport, LedgerSnapshot) {
    let sets = compute_indicator_sets(bars, &session.indicators);
    let mut machine = SignalStateMachine::new();
    let mut ledger = Ledger::new(session.initial_capital);
    let mut signals = Vec::new();

    for (bar, set) in bars.iter().zip(&sets) {
        let Some(signal) = machine.evaluate(bar, set) else {
            continue;
        };

        debug!(
            direction = %signal.direction,
            price = signal.reference_price,
            timestamp = %signal.timestamp,
            "crossover signal"
        );

        match ledger.apply_signal(&signal, session.sizing_fraction) {
            Ok(fill) => {
                debug!(side = %fill.side, amount = fill.amount, price = fill.price, "simulated fill");
            }
            Err(e) => {
                warn!(error = %e, "trade dropped during replay");
            }
        }
        signals.push(signal);
    }

    let ending_balance = match bars.last() {
        Some(last) => ledger.equity(last.close),
        None => ledger.balance(),
    };
    let profit_pct = if session.initial_capital > 0.0 {
        (ending_balance - session.initial_capital) / session.initial_capital * 100.0
    } else {
        0.0
    };

    let winning_trades = ledger
        .closed_positions()
        .iter()
        .filter(|p| p.profit.unwrap_or(0.0) > 0.0)
        .count();
    let losing_trades = ledger
        .closed_positions()
        .iter()
        .filter(|p| p.profit.unwrap_or(0.0) < 0.0)
        .count();

    let report = BacktestReport {
        symbol: session.symbol.clone(),
        interval: session.interval.label().to_string(),
        initial_balance: session.initial_capital,
        ending_balance,
        profit_pct,
        total_trades: ledger.closed_positions().len(),
        winning_trades,
        losing_trades,
        signals,
    };

    (report, ledger.snapshot())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::IndicatorParams;
    use crate::domain::session::Interval;
    use crate::domain::signal::Direction;
    use chrono::{Duration, TimeZone, Utc};

    fn make_bars(prices: &[f64]) -> Vec<Bar> {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        prices
            .iter()
            .enumerate()
            .map(|(i, &close)| Bar {
                symbol: "BTCUSDT".into(),
                timestamp: start + Duration::hours(i as i64),
                open: close,
                high: close,
                low: close,
                close,
                volume: 1000.0,
            })
            .collect()
    }

    fn session(short: usize, long: usize) -> SessionConfig {
        SessionConfig {
            symbol: "BTCUSDT".into(),
            interval: Interval::parse("1h").unwrap(),
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

    #[test]
    fn downtrend_then_recovery_goes_long_once() {
        // The 2-bar average first exceeds the 4-bar average at the 11 close.
        let bars = make_bars(&[10.0, 10.0, 10.0, 9.0, 8.0, 7.0, 6.0, 11.0, 12.0, 13.0, 14.0, 15.0]);
        let (report, snapshot) = run_backtest(&bars, &session(2, 4));

        assert_eq!(report.signals.len(), 1);
        assert_eq!(report.signals[0].direction, Direction::Long);
        assert_eq!(report.signals[0].timestamp, bars[7].timestamp);
        assert!((report.signals[0].reference_price - 11.0).abs() < f64::EPSILON);
        assert!(snapshot.open_position.is_some());
    }

    #[test]
    fn cross_back_down_exits() {
        let bars = make_bars(&[
            10.0, 10.0, 10.0, 9.0, 8.0, 7.0, 6.0, 11.0, 12.0, 13.0, 5.0, 4.0, 3.0,
        ]);
        let (report, snapshot) = run_backtest(&bars, &session(2, 4));

        assert_eq!(report.signals.len(), 2);
        assert_eq!(report.signals[0].direction, Direction::Long);
        assert_eq!(report.signals[1].direction, Direction::Flat);
        assert!(snapshot.open_position.is_none());
        assert_eq!(report.total_trades, 1);
    }

    #[test]
    fn flat_series_trades_nothing() {
        let bars = make_bars(&[10.0; 20]);
        let (report, snapshot) = run_backtest(&bars, &session(2, 4));

        assert!(report.signals.is_empty());
        assert_eq!(report.total_trades, 0);
        assert!((snapshot.balance - 10_000.0).abs() < f64::EPSILON);
        assert!((report.ending_balance - 10_000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn too_few_bars_for_warmup_trades_nothing() {
        let bars = make_bars(&[10.0, 11.0, 12.0]);
        let (report, _) = run_backtest(&bars, &session(5, 10));
        assert!(report.signals.is_empty());
    }

    #[test]
    fn empty_series_reports_initial_balance() {
        let (report, _) = run_backtest(&[], &session(2, 4));
        assert!((report.ending_balance - 10_000.0).abs() < f64::EPSILON);
        assert!((report.profit_pct - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn winning_trade_counted() {
        let bars = make_bars(&[
            10.0, 10.0, 10.0, 9.0, 8.0, 7.0, 6.0, 11.0, 12.0, 13.0, 5.0, 4.0, 3.0,
        ]);
        let (report, _) = run_backtest(&bars, &session(2, 4));

        // Entry at 11, exit at the 5 close: a losing round trip.
        assert_eq!(report.total_trades, 1);
        assert_eq!(report.winning_trades, 0);
        assert_eq!(report.losing_trades, 1);
        assert!(report.ending_balance < report.initial_balance);
    }

    #[test]
    fn summary_mentions_balances() {
        let bars = make_bars(&[10.0; 10]);
        let (report, _) = run_backtest(&bars, &session(2, 4));
        let summary = report.summary();

        assert!(summary.contains("Initial Balance: $10000.00"));
        assert!(summary.contains("Ending Balance: $10000.00"));
        assert!(summary.contains("BTCUSDT"));
    }
}
