//! PortfolioState: cash plus a single whole-share position.

use serde::{Deserialize, Serialize};

/// Cash and shares for one instrument's simulation.
///
/// Owned exclusively by one simulation; never shared across instruments.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PortfolioState {
    pub cash: f64,
    pub shares_held: u64,
}

impl PortfolioState {
    pub fn new(cash: f64) -> Self {
        Self {
            cash,
            shares_held: 0,
        }
    }

    /// Convert all available cash into whole shares at `price` (floor division).
    ///
    /// Returns the number of shares bought. Nothing is bought when cash is not
    /// positive or the price is unusable.
    pub fn buy_all(&mut self, price: f64) -> u64 {
        if self.cash <= 0.0 || !(price.is_finite() && price > 0.0) {
            return 0;
        }
        let shares = (self.cash / price).floor() as u64;
        self.cash -= shares as f64 * price;
        self.shares_held += shares;
        shares
    }

    /// Sell the entire position at `price`. Returns the shares sold.
    pub fn liquidate(&mut self, price: f64) -> u64 {
        let shares = self.shares_held;
        self.cash += shares as f64 * price;
        self.shares_held = 0;
        shares
    }
}
