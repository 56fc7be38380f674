//! REST market-data source adapter (venue klines endpoint).
//!
//! History fetches page through the klines endpoint in venue-capped
//! batches, advancing past the last returned timestamp until the range is
//! exhausted. All transport and decoding failures surface as the transient
//! fetch error; callers decide whether that skips a cycle or aborts a
//! backtest.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::domain::bar::Bar;
use crate::domain::error::TradewindError;
use crate::domain::session::Interval;
use crate::ports::bar_source::BarSourcePort;

/// Venue-side cap on klines rows per request.
const MAX_BATCH: usize = 1000;

pub struct RestBarSource {
    client: reqwest::Client,
    base_url: String,
    latest_limit: usize,
}

impl RestBarSource {
    /// `latest_limit` is the evaluation window size for `fetch_latest`;
    /// it must cover the longest indicator warm-up.
    pub fn new(base_url: impl Into<String>, latest_limit: usize) -> Self {
        RestBarSource {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            latest_limit,
        }
    }

    async fn fetch_klines(
        &self,
        symbol: &str,
        interval: &Interval,
        since: Option<i64>,
        until: Option<i64>,
        limit: usize,
    ) -> Result<Vec<Bar>, TradewindError> {
        let url = format!("{}/api/v3/klines", self.base_url);
        let mut params: Vec<(&str, String)> = vec![
            ("symbol", symbol.to_string()),
            ("interval", interval.label().to_string()),
            ("limit", limit.to_string()),
        ];
        if let Some(since) = since {
            params.push(("startTime", since.to_string()));
        }
        if let Some(until) = until {
            params.push(("endTime", until.to_string()));
        }

        let response = self
            .client
            .get(&url)
            .query(&params)
            .send()
            .await
            .map_err(|e| TradewindError::Fetch {
                reason: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(TradewindError::Fetch {
                reason: format!("klines request returned {}", response.status()),
            });
        }

        let rows: Vec<Vec<Value>> = response.json().await.map_err(|e| TradewindError::Fetch {
            reason: format!("malformed klines payload: {e}"),
        })?;

        parse_klines(symbol, &rows)
    }
}

#[async_trait]
impl BarSourcePort for RestBarSource {
    async fn fetch_bars(
        &self,
        symbol: &str,
        interval: &Interval,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<Bar>, TradewindError> {
        let until_ms = until.timestamp_millis();
        let mut cursor = since.timestamp_millis();
        let mut all = Vec::new();

        while cursor < until_ms {
            let batch = self
                .fetch_klines(symbol, interval, Some(cursor), Some(until_ms), MAX_BATCH)
                .await?;
            let Some(last) = batch.last() else {
                break;
            };

            cursor = last.timestamp.timestamp_millis() + 1;
            let batch_len = batch.len();
            all.extend(batch);

            if batch_len < MAX_BATCH {
                break;
            }
        }

        Ok(all)
    }

    async fn fetch_latest(
        &self,
        symbol: &str,
        interval: &Interval,
    ) -> Result<Vec<Bar>, TradewindError> {
        self.fetch_klines(symbol, interval, None, None, self.latest_limit)
            .await
    }
}

/// Decode klines rows: `[open_time, open, high, low, close, volume, ...]`
/// with prices quoted as strings.
fn parse_klines(symbol: &str, rows: &[Vec<Value>]) -> Result<Vec<Bar>, TradewindError> {
    rows.iter()
        .map(|row| {
            if row.len() < 6 {
                return Err(TradewindError::Fetch {
                    reason: format!("klines row has {} fields, expected at least 6", row.len()),
                });
            }

            let open_time = row[0].as_i64().ok_or_else(|| TradewindError::Fetch {
                reason: "klines open time is not an integer".to_string(),
            })?;
            let timestamp =
                DateTime::from_timestamp_millis(open_time).ok_or_else(|| TradewindError::Fetch {
                    reason: format!("klines open time {open_time} out of range"),
                })?;

            Ok(Bar {
                symbol: symbol.to_string(),
                timestamp,
                open: number_field(&row[1], "open")?,
                high: number_field(&row[2], "high")?,
                low: number_field(&row[3], "low")?,
                close: number_field(&row[4], "close")?,
                volume: number_field(&row[5], "volume")?,
            })
        })
        .collect()
}

fn number_field(value: &Value, name: &str) -> Result<f64, TradewindError> {
    value
        .as_f64()
        .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
        .ok_or_else(|| TradewindError::Fetch {
            reason: format!("klines {name} field is not numeric"),
        })
}
