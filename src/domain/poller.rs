//! Polling scheduler: the outer loop of a live trading session.
//!
//! One cycle is FETCH → COMPUTE → DECIDE → EXECUTE → NOTIFY → SLEEP, driven
//! sequentially so a cycle never overlaps the previous one and EXECUTE
//! always sees a fully decided signal. A failed or empty fetch skips the
//! rest of the cycle, notifies a degraded-cycle warning and sleeps the
//! same fixed interval; failures are expected to be transient and tied to
//! the bar cadence, so there is no faster retry that could duplicate
//! signals.
//!
//! The stop signal is a `watch` channel observed at every suspension point
//! (fetch, execute, sleep), not just between cycles.

use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::domain::error::ExecutionError;
use crate::domain::indicator::{IndicatorSet, compute_indicator_sets};
use crate::domain::order::Fill;
use crate::domain::session::SessionConfig;
use crate::domain::signal::{Signal, SignalStateMachine};
use crate::ports::bar_source::BarSourcePort;
use crate::ports::execution::ExecutionPort;
use crate::ports::notifier::NotifierPort;

pub struct Poller<S, E, N> {
    session: SessionConfig,
    source: S,
    executor: E,
    notifier: N,
    machine: SignalStateMachine,
    stop: watch::Receiver<bool>,
}

impl<S, E, N> Poller<S, E, N>
where
    S: BarSourcePort,
    E: ExecutionPort,
    N: NotifierPort,
{
    pub fn new(
        session: SessionConfig,
        source: S,
        executor: E,
        notifier: N,
        stop: watch::Receiver<bool>,
    ) -> Self {
        Poller {
            session,
            source,
            executor,
            notifier,
            machine: SignalStateMachine::new(),
            stop,
        }
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub fn machine(&self) -> &SignalStateMachine {
        &self.machine
    }

    /// Run cycles until the stop signal fires. Per-cycle errors are
    /// notified and absorbed; nothing short of the stop signal ends the
    /// loop.
    pub async fn run(&mut self) {
        let symbol = self.session.symbol.clone();
        let interval = self.session.interval.clone();

        info!(symbol = %symbol, interval = %interval, backend = self.executor.backend_name(), "polling started");
        self.notifier
            .send(&format!(
                "Polling started for {symbol} every {interval} [{backend}].",
                backend = self.executor.backend_name()
            ))
            .await;

        let mut stop = self.stop.clone();

        loop {
            if *stop.borrow() {
                break;
            }

            // FETCH
            let fetched = tokio::select! {
                _ = wait_for_stop(&mut stop) => break,
                result = self.source.fetch_latest(&symbol, &interval) => result,
            };

            let bars = match fetched {
                Ok(bars) if !bars.is_empty() => bars,
                Ok(_) => {
                    self.degraded_cycle(&symbol, "empty bar window").await;
                    if !sleep_or_stop(&mut stop, &self.session).await {
                        break;
                    }
                    continue;
                }
                Err(e) => {
                    self.degraded_cycle(&symbol, &e.to_string()).await;
                    if !sleep_or_stop(&mut stop, &self.session).await {
                        break;
                    }
                    continue;
                }
            };

            // COMPUTE + DECIDE
            let sets = compute_indicator_sets(&bars, &self.session.indicators);
            let last = bars.len() - 1;
            let signal = self.machine.evaluate(&bars[last], &sets[last]);

            match signal {
                None => {
                    debug!(
                        bars = bars.len(),
                        direction = %self.machine.current(),
                        "no transition this cycle"
                    );
                }
                Some(signal) => {
                    info!(direction = %signal.direction, price = signal.reference_price, "signal");
                    self.notifier.send(&signal_message(&signal, &sets[last])).await;

                    // EXECUTE
                    let executed = tokio::select! {
                        _ = wait_for_stop(&mut stop) => break,
                        result = self
                            .executor
                            .execute_signal(&signal, self.session.sizing_fraction) => result,
                    };

                    match executed {
                        Ok(fill) => {
                            info!(side = %fill.side, amount = fill.amount, price = fill.price, "executed");
                            self.notifier
                                .send(&fill_message(&fill, self.executor.backend_name()))
                                .await;
                        }
                        Err(e) => {
                            warn!(error = %e, direction = %signal.direction, "trade dropped");
                            self.notifier.send(&execution_failed_message(&signal, &e)).await;
                        }
                    }
                }
            }

            // SLEEP
            if !sleep_or_stop(&mut stop, &self.session).await {
                break;
            }
        }

        info!(symbol = %symbol, "polling stopped");
        self.notifier
            .send(&format!("Polling stopped for {symbol}."))
            .await;
    }

    async fn degraded_cycle(&self, symbol: &str, reason: &str) {
        warn!(symbol = %symbol, reason = %reason, "degraded cycle, skipping evaluation");
        self.notifier
            .send(&format!("Cycle skipped for {symbol}: {reason}"))
            .await;
    }
}

/// Resolve once the stop flag flips to true (or the sender is gone).
async fn wait_for_stop(stop: &mut watch::Receiver<bool>) {
    while !*stop.borrow() {
        if stop.changed().await.is_err() {
            return;
        }
    }
}

/// Sleep one interval, stop-aware. Returns false when the loop should end.
async fn sleep_or_stop(stop: &mut watch::Receiver<bool>, session: &SessionConfig) -> bool {
    tokio::select! {
        _ = wait_for_stop(stop) => false,
        _ = sleep(session.interval.duration()) => true,
    }
}

fn signal_message(signal: &Signal, indicators: &IndicatorSet) -> String {
    let mut message = format!(
        "Signal: {direction} {symbol} at {price:.2}",
        direction = signal.direction,
        symbol = signal.symbol,
        price = signal.reference_price,
    );
    if let (Some(short), Some(long)) = (indicators.short_ma, indicators.long_ma) {
        message.push_str(&format!(" (short MA {short:.2}, long MA {long:.2}"));
        if let Some(rsi) = indicators.rsi {
            message.push_str(&format!(", RSI {rsi:.1}"));
        }
        if let (Some(line), Some(sig)) = (indicators.macd_line, indicators.macd_signal) {
            message.push_str(&format!(", MACD {line:.2}/{sig:.2}"));
        }
        message.push(')');
    }
    message
}

fn fill_message(fill: &Fill, backend: &str) -> String {
    format!(
        "Executed {side} {amount:.6} {symbol} at {price:.2} [{backend}]",
        side = fill.side,
        amount = fill.amount,
        symbol = fill.symbol,
        price = fill.price,
    )
}

fn execution_failed_message(signal: &Signal, error: &ExecutionError) -> String {
    format!(
        "Execution failed for {direction} {symbol}: {error}",
        direction = signal.direction,
        symbol = signal.symbol,
    )
}
