//! Execution gateway backed by the simulated ledger (dry run).

use async_trait::async_trait;

use crate::domain::error::ExecutionError;
use crate::domain::ledger::Ledger;
use crate::domain::order::Fill;
use crate::domain::signal::Signal;
use crate::ports::execution::ExecutionPort;

pub struct SimExecutor {
    ledger: Ledger,
}

impl SimExecutor {
    pub fn new(initial_balance: f64) -> Self {
        SimExecutor {
            ledger: Ledger::new(initial_balance),
        }
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }
}

#[async_trait]
impl ExecutionPort for SimExecutor {
    async fn execute_signal(
        &mut self,
        signal: &Signal,
        sizing_fraction: f64,
    ) -> Result<Fill, ExecutionError> {
        self.ledger.apply_signal(signal, sizing_fraction)
    }

    fn backend_name(&self) -> &'static str {
        "simulated"
    }
}
