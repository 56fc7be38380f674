//! Market-data source port trait.
//!
//! Fetch failures are transient by contract: callers recover by skipping
//! the cycle (live) or surfacing a fatal no-data error at startup
//! (backtest), never by retrying faster than the bar interval.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::bar::Bar;
use crate::domain::error::TradewindError;
use crate::domain::session::Interval;

#[async_trait]
pub trait BarSourcePort: Send + Sync {
    /// Fetch history for `[since, until)`, ordered by timestamp.
    async fn fetch_bars(
        &self,
        symbol: &str,
        interval: &Interval,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<Bar>, TradewindError>;

    /// Fetch the most recent evaluation window, ordered by timestamp.
    async fn fetch_latest(
        &self,
        symbol: &str,
        interval: &Interval,
    ) -> Result<Vec<Bar>, TradewindError>;
}
