//! Execution gateway port trait.
//!
//! One interface over both backends: the live venue adapter and the
//! simulated ledger. The scheduler and signal machine are written once
//! against this trait and tested deterministically against the simulated
//! side; production risk stays isolated in the live adapter.

use async_trait::async_trait;

use crate::domain::error::ExecutionError;
use crate::domain::order::Fill;
use crate::domain::signal::Signal;

#[async_trait]
pub trait ExecutionPort: Send {
    /// Turn an accepted signal into a trade.
    ///
    /// Entries are sized as `sizing_fraction × available cash / reference
    /// price`; exits close the open position. A failed execution leaves the
    /// backend's bookkeeping exactly as it was.
    async fn execute_signal(
        &mut self,
        signal: &Signal,
        sizing_fraction: f64,
    ) -> Result<Fill, ExecutionError>;

    /// Short backend label for operator messages ("live", "simulated").
    fn backend_name(&self) -> &'static str;
}
