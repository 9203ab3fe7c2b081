//! Portfolio simulation: cash and whole-share bookkeeping around the resolver.
//!
//! Events are processed one at a time in chronological order against a single
//! `PortfolioState`: buy with all cash at the event low, resolve, liquidate the
//! whole position at the outcome's exit price. Positions never overlap.

use serde::{Deserialize, Serialize};

use crate::domain::{
    PortfolioState, PriceSeries, ResolvedEvent, RuleParameters, TradeAction, TradeRecord,
};
use crate::evaluate::{evaluate, EvaluationSettings};

/// Default starting cash.
pub const DEFAULT_INITIAL_CASH: f64 = 10_000.0;

/// Result of simulating one instrument.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Simulation {
    pub instrument: String,
    pub initial_cash: f64,
    pub final_state: PortfolioState,
    pub resolved: Vec<ResolvedEvent>,
    /// One Buy and one matching Sell per event, in processing order.
    pub trades: Vec<TradeRecord>,
}

impl Simulation {
    /// Final cash minus initial cash.
    pub fn profit_loss(&self) -> f64 {
        self.final_state.cash - self.initial_cash
    }

    pub fn return_pct(&self) -> f64 {
        if self.initial_cash == 0.0 {
            return 0.0;
        }
        self.profit_loss() / self.initial_cash
    }
}

/// Detect, resolve and trade every event in the series.
pub fn simulate(
    series: &PriceSeries,
    params: &RuleParameters,
    settings: &EvaluationSettings,
    initial_cash: f64,
) -> Simulation {
    let resolved = evaluate(series, params, settings);
    simulate_resolved(&series.instrument, resolved, initial_cash)
}

/// Trade an already-resolved event sequence.
pub fn simulate_resolved(
    instrument: &str,
    resolved: Vec<ResolvedEvent>,
    initial_cash: f64,
) -> Simulation {
    let mut state = PortfolioState::new(initial_cash);
    let mut trades = Vec::with_capacity(resolved.len() * 2);

    for r in &resolved {
        let entry_price = r.event.event_low;
        let bought = state.buy_all(entry_price);
        trades.push(TradeRecord {
            instrument: instrument.to_string(),
            action: TradeAction::Buy,
            timestamp: r.event.detected_at,
            price: entry_price,
            shares: bought,
        });

        let exit_price = r.outcome.exit_price();
        let sold = state.liquidate(exit_price);
        trades.push(TradeRecord {
            instrument: instrument.to_string(),
            action: TradeAction::sell_for(&r.outcome),
            timestamp: r.outcome.exit_time(),
            price: exit_price,
            shares: sold,
        });
    }

    Simulation {
        instrument: instrument.to_string(),
        initial_cash,
        final_state: state,
        resolved,
        trades,
    }
}
