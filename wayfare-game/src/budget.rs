//! Spend bookkeeping against the fixed budget.
use serde::{Deserialize, Serialize};

use crate::quote::Quote;

/// Per-leg spend with the authoritative running total.
///
/// `spend[i]` is the cost of the leg arriving at `itinerary[i + 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetTracker {
    limit: f64,
    spend: Vec<f64>,
}

impl BudgetTracker {
    #[must_use]
    pub const fn new(limit: f64) -> Self {
        Self {
            limit,
            spend: Vec::new(),
        }
    }

    /// Rebuild a tracker from recorded legs.
    #[must_use]
    pub const fn with_spend(limit: f64, spend: Vec<f64>) -> Self {
        Self { limit, spend }
    }

    /// Charge a quote's raw price (0 when unpriced) and return the new total.
    pub fn accept(&mut self, quote: &Quote) -> f64 {
        self.record(quote.price.amount())
    }

    /// Charge a raw amount. Negative or non-finite prices are charged as 0 so
    /// the running total never decreases.
    pub fn record(&mut self, amount: f64) -> f64 {
        let amount = if amount.is_finite() && amount > 0.0 {
            amount
        } else {
            0.0
        };
        self.spend.push(amount);
        self.total()
    }

    #[must_use]
    pub fn total(&self) -> f64 {
        self.spend.iter().sum()
    }

    #[must_use]
    pub fn remaining(&self) -> f64 {
        self.limit - self.total()
    }

    #[must_use]
    pub fn is_over_budget(&self) -> bool {
        self.total() > self.limit
    }

    #[must_use]
    pub const fn limit(&self) -> f64 {
        self.limit
    }

    #[must_use]
    pub fn spend(&self) -> &[f64] {
        &self.spend
    }

    pub fn reset(&mut self) {
        self.spend.clear();
    }
}
