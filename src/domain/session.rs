//! Trading session configuration.
//!
//! One immutable value built at startup and handed to the scheduler and
//! execution backends; nothing reads global state after that.

use std::fmt;
use std::time::Duration;

use crate::domain::indicator::IndicatorParams;

/// A bar interval such as `15m`, `1h` or `1d`.
///
/// Keeps the original label for venue API calls and dataset keys alongside
/// the parsed duration used for sleeping between cycles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interval {
    label: String,
    duration: Duration,
}

impl Interval {
    /// Parse `<count><unit>` with unit one of `s`, `m`, `h`, `d`.
    ///
    /// Unknown units or a zero count are rejected; a bad interval is a
    /// startup configuration error, not something to paper over with a
    /// default cadence.
    pub fn parse(label: &str) -> Result<Self, String> {
        let label = label.trim();
        if label.len() < 2 {
            return Err(format!("invalid interval '{label}'"));
        }

        let (count_str, unit) = label.split_at(label.len() - 1);
        let count: u64 = count_str
            .parse()
            .map_err(|_| format!("invalid interval count '{count_str}'"))?;
        if count == 0 {
            return Err("interval count must be positive".to_string());
        }

        let unit_seconds = match unit {
            "s" => 1,
            "m" => 60,
            "h" => 3_600,
            "d" => 86_400,
            other => return Err(format!("unknown interval unit '{other}'")),
        };

        Ok(Interval {
            label: label.to_string(),
            duration: Duration::from_secs(count * unit_seconds),
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label)
    }
}

/// Everything a trading session needs to run, fixed at construction.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub symbol: String,
    pub interval: Interval,
    pub initial_capital: f64,
    pub sizing_fraction: f64,
    pub indicators: IndicatorParams,
}
