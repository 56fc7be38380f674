//! Crossover signal state machine.
//!
//! Tracks one piece of state across evaluations: the current direction.
//! A `Signal` is emitted only when the short/long moving-average relation
//! changes the direction, never on every bar where the condition holds,
//! so consecutive signals always alternate. Exact ties are hysteresis:
//! they trigger nothing. The machine restarts cleanly from `Flat` with no
//! history replay; the direction captures all decision-relevant state.

use chrono::{DateTime, Utc};
use std::fmt;

use crate::domain::bar::Bar;
use crate::domain::indicator::IndicatorSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Flat,
    Long,
    Short,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Flat => write!(f, "FLAT"),
            Direction::Long => write!(f, "LONG"),
            Direction::Short => write!(f, "SHORT"),
        }
    }
}

/// A position-intent transition at one bar.
#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub direction: Direction,
    pub reference_price: f64,
}

#[derive(Debug, Clone)]
pub struct SignalStateMachine {
    current: Direction,
}

impl SignalStateMachine {
    pub fn new() -> Self {
        SignalStateMachine {
            current: Direction::Flat,
        }
    }

    pub fn current(&self) -> Direction {
        self.current
    }

    /// Evaluate one bar against its indicator set.
    ///
    /// Returns at most one signal: entry when the short average moves above
    /// the long one, exit when it moves back below while long. Bars inside
    /// the warm-up window (either average undefined) never transition.
    pub fn evaluate(&mut self, bar: &Bar, indicators: &IndicatorSet) -> Option<Signal> {
        let short = indicators.short_ma?;
        let long = indicators.long_ma?;

        if short > long && self.current != Direction::Long {
            self.current = Direction::Long;
            return Some(Signal {
                symbol: bar.symbol.clone(),
                timestamp: bar.timestamp,
                direction: Direction::Long,
                reference_price: bar.close,
            });
        }

        if short < long && self.current == Direction::Long {
            self.current = Direction::Flat;
            return Some(Signal {
                symbol: bar.symbol.clone(),
                timestamp: bar.timestamp,
                direction: Direction::Flat,
                reference_price: bar.close,
            });
        }

        None
    }
}

impl Default for SignalStateMachine {
    fn default() -> Self {
        Self::new()
    }
}
