//! RSI (Relative Strength Index) indicator.
//!
//! Plain window averages of gains and losses over the last n close-deltas
//! (loss taken as its absolute value):
//!
//! Formula: RSI = 100 - (100 / (1 + avg_gain / avg_loss))
//! If avg_loss == 0: RSI = 100
//!
//! Warmup: first n bars are invalid (need n price changes to fill the window).

use crate::domain::bar::Bar;
use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};

pub fn calculate_rsi(bars: &[Bar], period: usize) -> IndicatorSeries {
    if period == 0 || bars.is_empty() {
        return IndicatorSeries {
            indicator_type: IndicatorType::Rsi(period),
            values: Vec::new(),
        };
    }

    let mut gains: Vec<f64> = Vec::with_capacity(bars.len().saturating_sub(1));
    let mut losses: Vec<f64> = Vec::with_capacity(bars.len().saturating_sub(1));

    for i in 1..bars.len() {
        let change = bars[i].close - bars[i - 1].close;
        gains.push(if change > 0.0 { change } else { 0.0 });
        losses.push(if change < 0.0 { -change } else { 0.0 });
    }

    let mut values = Vec::with_capacity(bars.len());
    let mut gain_sum = 0.0;
    let mut loss_sum = 0.0;

    for (i, bar) in bars.iter().enumerate() {
        if i >= 1 {
            let delta_idx = i - 1;
            gain_sum += gains[delta_idx];
            loss_sum += losses[delta_idx];
            if delta_idx >= period {
                gain_sum -= gains[delta_idx - period];
                loss_sum -= losses[delta_idx - period];
            }
        }

        // A full window needs `period` deltas, i.e. bar index >= period.
        if i < period {
            values.push(IndicatorPoint {
                timestamp: bar.timestamp,
                valid: false,
                value: IndicatorValue::Simple(0.0),
            });
            continue;
        }

        let avg_gain = gain_sum / period as f64;
        let avg_loss = loss_sum / period as f64;

        let rsi = if avg_loss == 0.0 {
            100.0
        } else {
            100.0 - (100.0 / (1.0 + avg_gain / avg_loss))
        };

        values.push(IndicatorPoint {
            timestamp: bar.timestamp,
            valid: true,
            value: IndicatorValue::Simple(rsi),
        });
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Rsi(period),
        values,
    }
}
