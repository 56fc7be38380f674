//! Configuration validation.
//!
//! Validates every config field a session needs before any cycle runs;
//! a bad value aborts startup with a non-zero exit instead of surfacing
//! mid-session.

use crate::domain::error::TradewindError;
use crate::domain::session::Interval;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;

pub fn validate_session_config(config: &dyn ConfigPort) -> Result<(), TradewindError> {
    validate_symbol(config)?;
    validate_interval(config)?;
    validate_capital(config)?;
    validate_sizing_fraction(config)?;
    validate_windows(config)?;
    Ok(())
}

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), TradewindError> {
    validate_dates(config)?;
    Ok(())
}

pub fn validate_live_config(config: &dyn ConfigPort) -> Result<(), TradewindError> {
    for key in ["base_url", "api_key"] {
        if config
            .get_string("venue", key)
            .filter(|v| !v.trim().is_empty())
            .is_none()
        {
            return Err(TradewindError::ConfigMissing {
                section: "venue".to_string(),
                key: key.to_string(),
            });
        }
    }
    Ok(())
}

fn validate_symbol(config: &dyn ConfigPort) -> Result<(), TradewindError> {
    match config.get_string("market", "symbol") {
        Some(s) if !s.trim().is_empty() => Ok(()),
        Some(_) => Err(TradewindError::ConfigInvalid {
            section: "market".to_string(),
            key: "symbol".to_string(),
            reason: "symbol must not be empty".to_string(),
        }),
        None => Err(TradewindError::ConfigMissing {
            section: "market".to_string(),
            key: "symbol".to_string(),
        }),
    }
}

fn validate_interval(config: &dyn ConfigPort) -> Result<(), TradewindError> {
    let value = config
        .get_string("market", "interval")
        .ok_or_else(|| TradewindError::ConfigMissing {
            section: "market".to_string(),
            key: "interval".to_string(),
        })?;

    Interval::parse(&value).map_err(|reason| TradewindError::ConfigInvalid {
        section: "market".to_string(),
        key: "interval".to_string(),
        reason,
    })?;
    Ok(())
}

fn validate_capital(config: &dyn ConfigPort) -> Result<(), TradewindError> {
    let value = config.get_double("trading", "initial_capital", 0.0);
    if value <= 0.0 {
        return Err(TradewindError::ConfigInvalid {
            section: "trading".to_string(),
            key: "initial_capital".to_string(),
            reason: "initial_capital must be positive".to_string(),
        });
    }
    Ok(())
}

fn validate_sizing_fraction(config: &dyn ConfigPort) -> Result<(), TradewindError> {
    let value = config.get_double("trading", "sizing_fraction", 0.0);
    if value <= 0.0 || value > 1.0 {
        return Err(TradewindError::ConfigInvalid {
            section: "trading".to_string(),
            key: "sizing_fraction".to_string(),
            reason: "sizing_fraction must be in (0, 1]".to_string(),
        });
    }
    Ok(())
}

fn validate_windows(config: &dyn ConfigPort) -> Result<(), TradewindError> {
    let short = config.get_int("indicators", "short_window", 20);
    let long = config.get_int("indicators", "long_window", 50);
    let rsi = config.get_int("indicators", "rsi_period", 14);

    if short <= 0 || long <= 0 || rsi <= 0 {
        return Err(TradewindError::ConfigInvalid {
            section: "indicators".to_string(),
            key: "short_window".to_string(),
            reason: "indicator windows must be positive".to_string(),
        });
    }
    if short >= long {
        return Err(TradewindError::ConfigInvalid {
            section: "indicators".to_string(),
            key: "long_window".to_string(),
            reason: "long_window must exceed short_window".to_string(),
        });
    }
    Ok(())
}

fn validate_dates(config: &dyn ConfigPort) -> Result<(), TradewindError> {
    let mut dates = Vec::new();
    for key in ["start_date", "end_date"] {
        let value =
            config
                .get_string("backtest", key)
                .ok_or_else(|| TradewindError::ConfigMissing {
                    section: "backtest".to_string(),
                    key: key.to_string(),
                })?;
        let date = NaiveDate::parse_from_str(&value, "%Y-%m-%d").map_err(|_| {
            TradewindError::ConfigInvalid {
                section: "backtest".to_string(),
                key: key.to_string(),
                reason: "invalid date format (expected YYYY-MM-DD)".to_string(),
            }
        })?;
        dates.push(date);
    }

    if dates[0] >= dates[1] {
        return Err(TradewindError::ConfigInvalid {
            section: "backtest".to_string(),
            key: "end_date".to_string(),
            reason: "end_date must be after start_date".to_string(),
        });
    }
    Ok(())
}
