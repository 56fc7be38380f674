//! Simulated trade ledger: virtual balance and position bookkeeping.
//!
//! The dry-run counterpart of the live venue. Trades apply instantly to
//! in-memory state with no external calls, so it never fails for transient
//! reasons; the only rejections are insufficient balance for a BUY and a
//! missing/mismatched open quantity for a SELL. A rejected trade leaves the
//! ledger untouched.
//!
//! Single-instrument, single-lot model: at most one position is open at a
//! time, an opposing signal closes it whole.

use chrono::{DateTime, Utc};

use crate::domain::error::ExecutionError;
use crate::domain::order::{Fill, OrderSide};
use crate::domain::signal::{Direction, Signal};

const QUANTITY_EPSILON: f64 = 1e-9;

/// One executed (simulated) trade, recorded for reporting.
#[derive(Debug, Clone, PartialEq)]
pub struct Trade {
    pub symbol: String,
    pub side: OrderSide,
    pub amount: f64,
    pub price: f64,
    pub timestamp: DateTime<Utc>,
}

/// A held lot. `close_*` and `profit` stay `None` until the position is
/// closed by an opposing trade.
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub symbol: String,
    pub open_timestamp: DateTime<Utc>,
    pub open_price: f64,
    pub size: f64,
    pub close_timestamp: Option<DateTime<Utc>>,
    pub close_price: Option<f64>,
    pub profit: Option<f64>,
}

/// Consistent point-in-time view of the ledger for reporting. Never
/// observes a partially applied trade.
#[derive(Debug, Clone)]
pub struct LedgerSnapshot {
    pub balance: f64,
    pub open_position: Option<Position>,
    pub closed_positions: Vec<Position>,
    pub trades: Vec<Trade>,
}

#[derive(Debug, Clone)]
pub struct Ledger {
    balance: f64,
    initial_balance: f64,
    open_position: Option<Position>,
    closed_positions: Vec<Position>,
    trades: Vec<Trade>,
    fill_seq: u64,
}

impl Ledger {
    pub fn new(initial_balance: f64) -> Self {
        Ledger {
            balance: initial_balance,
            initial_balance,
            open_position: None,
            closed_positions: Vec::new(),
            trades: Vec::new(),
            fill_seq: 0,
        }
    }

    pub fn balance(&self) -> f64 {
        self.balance
    }

    pub fn initial_balance(&self) -> f64 {
        self.initial_balance
    }

    pub fn open_position(&self) -> Option<&Position> {
        self.open_position.as_ref()
    }

    pub fn closed_positions(&self) -> &[Position] {
        &self.closed_positions
    }

    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    /// Cash plus the open position marked at `mark_price`.
    pub fn equity(&self, mark_price: f64) -> f64 {
        let position_value = self
            .open_position
            .as_ref()
            .map(|p| p.size * mark_price)
            .unwrap_or(0.0);
        self.balance + position_value
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            balance: self.balance,
            open_position: self.open_position.clone(),
            closed_positions: self.closed_positions.clone(),
            trades: self.trades.clone(),
        }
    }

    /// Translate a signal into a trade and apply it.
    ///
    /// Entry is sized as `sizing_fraction × balance / reference_price`;
    /// an exit sells the whole open position.
    pub fn apply_signal(
        &mut self,
        signal: &Signal,
        sizing_fraction: f64,
    ) -> Result<Fill, ExecutionError> {
        match signal.direction {
            Direction::Long => {
                let amount = sizing_fraction * self.balance / signal.reference_price;
                self.execute_trade(
                    &signal.symbol,
                    OrderSide::Buy,
                    amount,
                    signal.reference_price,
                    signal.timestamp,
                )
            }
            Direction::Flat | Direction::Short => {
                let amount = match &self.open_position {
                    Some(pos) => pos.size,
                    None => {
                        return Err(ExecutionError::InsufficientPosition {
                            symbol: signal.symbol.clone(),
                        });
                    }
                };
                self.execute_trade(
                    &signal.symbol,
                    OrderSide::Sell,
                    amount,
                    signal.reference_price,
                    signal.timestamp,
                )
            }
        }
    }

    /// Apply one trade to the ledger, all-or-nothing.
    pub fn execute_trade(
        &mut self,
        symbol: &str,
        side: OrderSide,
        amount: f64,
        price: f64,
        timestamp: DateTime<Utc>,
    ) -> Result<Fill, ExecutionError> {
        match side {
            OrderSide::Buy => {
                let cost = amount * price;
                if cost > self.balance {
                    return Err(ExecutionError::InsufficientBalance {
                        needed: cost,
                        available: self.balance,
                    });
                }
                if self.open_position.is_some() {
                    return Err(ExecutionError::SubmitRejected {
                        reason: format!("position already open for {symbol}"),
                    });
                }

                self.balance -= cost;
                self.open_position = Some(Position {
                    symbol: symbol.to_string(),
                    open_timestamp: timestamp,
                    open_price: price,
                    size: amount,
                    close_timestamp: None,
                    close_price: None,
                    profit: None,
                });
            }
            OrderSide::Sell => {
                let matches_open = self
                    .open_position
                    .as_ref()
                    .is_some_and(|pos| (pos.size - amount).abs() <= QUANTITY_EPSILON);
                if !matches_open {
                    return Err(ExecutionError::InsufficientPosition {
                        symbol: symbol.to_string(),
                    });
                }

                let mut position = self.open_position.take().expect("checked above");
                self.balance += amount * price;
                position.close_timestamp = Some(timestamp);
                position.close_price = Some(price);
                position.profit = Some((price - position.open_price) * position.size);
                self.closed_positions.push(position);
            }
        }

        self.trades.push(Trade {
            symbol: symbol.to_string(),
            side,
            amount,
            price,
            timestamp,
        });

        self.fill_seq += 1;
        Ok(Fill {
            order_id: format!("sim-{}", self.fill_seq),
            symbol: symbol.to_string(),
            side,
            amount,
            price,
            timestamp,
        })
    }
}
