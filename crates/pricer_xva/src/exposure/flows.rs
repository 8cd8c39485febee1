//! Per-path cashflow schedules supplied by payoff collaborators.

use pricer_core::types::{Currency, Date};

/// One simulated cashflow.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CashFlow {
    /// Payment date.
    pub settle_date: Date,
    /// Currency of the payment.
    pub currency: Currency,
    /// Value discounted to the valuation date.
    pub present_value: f64,
    /// Amount paid on `settle_date`.
    pub future_value: f64,
}

impl CashFlow {
    /// A cashflow of `future_value` paid on `settle_date`, with no present
    /// value attached.
    pub fn new(settle_date: Date, currency: Currency, future_value: f64) -> Self {
        Self {
            settle_date,
            currency,
            present_value: 0.0,
            future_value,
        }
    }

    /// Sets the present value.
    pub fn with_present_value(mut self, present_value: f64) -> Self {
        self.present_value = present_value;
        self
    }
}

/// Source of the simulated cashflows exposures are regressed against.
///
/// Implemented by payoff processes once the engine run that fills them has
/// completed.
pub trait ExpectedFlows: Send + Sync {
    /// One schedule per simulated path, in path order.
    fn expected_flows_by_path(&self) -> Vec<Vec<CashFlow>>;
}

impl ExpectedFlows for Vec<Vec<CashFlow>> {
    fn expected_flows_by_path(&self) -> Vec<Vec<CashFlow>> {
        self.clone()
    }
}
