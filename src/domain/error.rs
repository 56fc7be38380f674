//! Domain error types.
//!
//! Two taxonomies with different propagation rules:
//!
//! - [`TradewindError`] covers configuration, market-data and storage
//!   failures. Configuration errors are fatal at startup and map to a
//!   distinct process exit code; fetch errors are transient and the
//!   polling loop recovers by skipping the cycle.
//! - [`ExecutionError`] covers everything the execution gateway can
//!   report. The scheduler drops the intended trade, notifies, and
//!   continues; these never abort a session.

/// Top-level error type for tradewind.
#[derive(Debug, thiserror::Error)]
pub enum TradewindError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("market data fetch failed: {reason}")]
    Fetch { reason: String },

    #[error("bar store error: {reason}")]
    Store { reason: String },

    #[error("no data for {symbol} at interval {interval}")]
    NoData { symbol: String, interval: String },

    #[error("insufficient data for {symbol}: have {bars} bars, need {minimum}")]
    InsufficientData {
        symbol: String,
        bars: usize,
        minimum: usize,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&TradewindError> for std::process::ExitCode {
    fn from(err: &TradewindError) -> Self {
        let code: u8 = match err {
            TradewindError::Io(_) => 1,
            TradewindError::ConfigParse { .. }
            | TradewindError::ConfigMissing { .. }
            | TradewindError::ConfigInvalid { .. } => 2,
            TradewindError::Store { .. } => 3,
            TradewindError::Fetch { .. } => 4,
            TradewindError::NoData { .. } | TradewindError::InsufficientData { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}

/// Errors the execution gateway reports back to the scheduler.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ExecutionError {
    #[error("insufficient balance: need {needed:.2}, have {available:.2}")]
    InsufficientBalance { needed: f64, available: f64 },

    #[error("no open position for {symbol} to close")]
    InsufficientPosition { symbol: String },

    #[error("order {order_id} still pending, dropping signal")]
    OrderPending { order_id: String },

    #[error("order submission rejected: {reason}")]
    SubmitRejected { reason: String },

    #[error("order {order_id} not settled within timeout")]
    Timeout { order_id: String },

    #[error("venue transport failure: {reason}")]
    Transport { reason: String },
}

/// Errors the live venue port reports; the live adapter converts these
/// into [`ExecutionError`] at its boundary.
#[derive(Debug, Clone, thiserror::Error)]
pub enum VenueError {
    #[error("venue rejected request: {reason}")]
    Rejected { reason: String },

    #[error("venue transport failure: {reason}")]
    Transport { reason: String },
}
