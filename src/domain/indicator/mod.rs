//! Technical indicator implementations.
//!
//! This module provides types for representing indicator values and series:
//! - `IndicatorPoint`: A single point in an indicator time series
//! - `IndicatorValue`: Enum for different indicator output shapes
//! - `IndicatorType`: Enum for indicator identity + parameters
//! - `IndicatorSeries`: A time series of indicator values
//! - `IndicatorSet`: All per-bar values the signal pipeline consumes,
//!   aligned with the bar sequence
//!
//! Every series has the same length as its input bar sequence. Warm-up
//! entries are present but carry `valid: false`; they are never computed
//! from a partial window.

pub mod macd;
pub mod rsi;
pub mod sma;

pub use macd::calculate_macd;
pub use rsi::calculate_rsi;
pub use sma::calculate_sma;

use chrono::{DateTime, Utc};
use std::fmt;

use crate::domain::bar::Bar;

#[derive(Debug, Clone)]
pub struct IndicatorPoint {
    pub timestamp: DateTime<Utc>,
    pub valid: bool,
    pub value: IndicatorValue,
}

#[derive(Debug, Clone)]
pub enum IndicatorValue {
    Simple(f64),
    Macd { line: f64, signal: f64 },
}

impl IndicatorValue {
    pub fn simple(&self) -> Option<f64> {
        match self {
            IndicatorValue::Simple(v) => Some(*v),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IndicatorType {
    Sma(usize),
    Rsi(usize),
    Macd {
        fast: usize,
        slow: usize,
        signal: usize,
    },
}

#[derive(Debug, Clone)]
pub struct IndicatorSeries {
    pub indicator_type: IndicatorType,
    pub values: Vec<IndicatorPoint>,
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorType::Sma(period) => write!(f, "SMA({})", period),
            IndicatorType::Rsi(period) => write!(f, "RSI({})", period),
            IndicatorType::Macd { fast, slow, signal } => {
                write!(f, "MACD({},{},{})", fast, slow, signal)
            }
        }
    }
}

/// Window lengths for everything the pipeline derives from a bar series.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorParams {
    pub short_window: usize,
    pub long_window: usize,
    pub rsi_period: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
}

impl Default for IndicatorParams {
    fn default() -> Self {
        IndicatorParams {
            short_window: 20,
            long_window: 50,
            rsi_period: 14,
            macd_fast: macd::DEFAULT_FAST,
            macd_slow: macd::DEFAULT_SLOW,
            macd_signal: macd::DEFAULT_SIGNAL,
        }
    }
}

/// Per-bar indicator values, `None` until the respective warm-up elapses.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSet {
    pub short_ma: Option<f64>,
    pub long_ma: Option<f64>,
    pub rsi: Option<f64>,
    pub macd_line: Option<f64>,
    pub macd_signal: Option<f64>,
}

/// Compute one `IndicatorSet` per input bar, aligned by index.
pub fn compute_indicator_sets(bars: &[Bar], params: &IndicatorParams) -> Vec<IndicatorSet> {
    let short = calculate_sma(bars, params.short_window);
    let long = calculate_sma(bars, params.long_window);
    let rsi = calculate_rsi(bars, params.rsi_period);
    let macd = calculate_macd(bars, params.macd_fast, params.macd_slow, params.macd_signal);

    let simple_at = |series: &IndicatorSeries, i: usize| -> Option<f64> {
        series
            .values
            .get(i)
            .filter(|p| p.valid)
            .and_then(|p| p.value.simple())
    };

    (0..bars.len())
        .map(|i| {
            let (macd_line, macd_signal) = match macd.values.get(i) {
                Some(point) if point.valid => match point.value {
                    IndicatorValue::Macd { line, signal } => (Some(line), Some(signal)),
                    _ => (None, None),
                },
                _ => (None, None),
            };
            IndicatorSet {
                short_ma: simple_at(&short, i),
                long_ma: simple_at(&long, i),
                rsi: simple_at(&rsi, i),
                macd_line,
                macd_signal,
            }
        })
        .collect()
}
