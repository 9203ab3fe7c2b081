//! TradeRecord: append-only ledger entries produced by the portfolio simulator.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::event::Outcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeAction {
    Buy,
    SellRecovered,
    SellStoppedOut,
    SellUnresolved,
}

impl TradeAction {
    /// Sell action matching an outcome.
    pub fn sell_for(outcome: &Outcome) -> Self {
        match outcome {
            Outcome::Recovered { .. } => Self::SellRecovered,
            Outcome::StoppedOut { .. } => Self::SellStoppedOut,
            Outcome::Unresolved { .. } => Self::SellUnresolved,
        }
    }

    pub fn is_buy(&self) -> bool {
        matches!(self, Self::Buy)
    }

    /// Label used in trade logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Buy => "BUY",
            Self::SellRecovered => "SELL (Recovered)",
            Self::SellStoppedOut => "SELL (Stop Loss)",
            Self::SellUnresolved => "SELL (Not Recovered)",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub instrument: String,
    pub action: TradeAction,
    pub timestamp: NaiveDateTime,
    pub price: f64,
    pub shares: u64,
}

impl TradeRecord {
    /// Signed cash flow of this entry: negative for buys, positive for sells.
    pub fn cash_flow(&self) -> f64 {
        let notional = self.shares as f64 * self.price;
        if self.action.is_buy() {
            -notional
        } else {
            notional
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record(action: TradeAction) -> TradeRecord {
        TradeRecord {
            instrument: "NU".into(),
            action,
            timestamp: NaiveDate::from_ymd_opt(2024, 8, 2)
                .unwrap()
                .and_hms_opt(10, 15, 0)
                .unwrap(),
            price: 12.5,
            shares: 800,
        }
    }

    #[test]
    fn cash_flow_signs() {
        assert_eq!(record(TradeAction::Buy).cash_flow(), -10_000.0);
        assert_eq!(record(TradeAction::SellStoppedOut).cash_flow(), 10_000.0);
    }

    #[test]
    fn labels_match_trade_log() {
        assert_eq!(TradeAction::SellUnresolved.label(), "SELL (Not Recovered)");
        assert_eq!(TradeAction::Buy.label(), "BUY");
    }
}
