//! Walk-forward validation: fit on a training window, replay on the next one.
//!
//! For each instrument independently:
//! 1. Load `[train_start, train_end]` (plus forward extension) and search it.
//! 2. Validation runs from `train_end + 1 day` for `validation_days` days.
//! 3. Replay the winning parameters there through the portfolio simulator.
//!
//! Instruments are independent pipelines and may run in parallel. Results are
//! always reported in input order.

use chrono::{Duration, NaiveDate};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use reboundlab_core::data::{DataError, DataProvider};
use reboundlab_core::domain::{Interval, ParamError, TradeRecord};
use reboundlab_core::universe::UniverseFilter;
use reboundlab_core::{
    simulate, EvaluationSettings, ForwardWindow, OutcomeSummary, ReferenceOpenPolicy, Simulation,
    DEFAULT_INITIAL_CASH,
};

use crate::data_loader::load_window;
use crate::search::{search, BestParameters, SearchConfig, SearchError, SearchSpace};

// ─── Configuration ───────────────────────────────────────────────────

/// How one window is sampled and read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowSpec {
    pub interval: Interval,
    pub reference: ReferenceOpenPolicy,
    pub window: ForwardWindow,
}

impl WindowSpec {
    pub fn settings(&self, detect_until: NaiveDate) -> EvaluationSettings {
        EvaluationSettings {
            reference: self.reference,
            window: self.window,
            detect_until: Some(detect_until),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalkForwardConfig {
    pub trials: usize,
    pub seed: u64,
    pub threads: usize,
    pub space: SearchSpace,
    pub training: WindowSpec,
    pub validation: WindowSpec,
    /// Length of the validation window after `train_end + 1`.
    pub validation_days: i64,
    pub initial_cash: f64,
    /// Run instrument pipelines on the rayon pool.
    pub parallel_instruments: bool,
    /// Applied to the training series before searching.
    pub universe: Option<UniverseFilter>,
}

impl Default for WalkForwardConfig {
    fn default() -> Self {
        Self {
            trials: 1000,
            seed: 42,
            threads: 0,
            space: SearchSpace::default(),
            training: WindowSpec::default(),
            validation: WindowSpec::default(),
            validation_days: 30,
            initial_cash: DEFAULT_INITIAL_CASH,
            parallel_instruments: true,
            universe: None,
        }
    }
}

impl WalkForwardConfig {
    fn search_config(&self, train_end: NaiveDate) -> SearchConfig {
        SearchConfig {
            trials: self.trials,
            seed: self.seed,
            threads: self.threads,
            space: self.space,
            settings: self.training.settings(train_end),
        }
    }

    pub fn validate(&self) -> Result<(), ParamError> {
        if self.trials == 0 {
            return Err(ParamError::ZeroTrials);
        }
        self.space.validate()
    }
}

// ─── Errors ──────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum WalkForwardError {
    #[error(transparent)]
    Search(#[from] SearchError),

    #[error("failed to load {symbol}: {source}")]
    Data {
        symbol: String,
        #[source]
        source: DataError,
    },

    #[error("no instruments given")]
    NoInstruments,

    #[error("training window is inverted: {start} > {end}")]
    InvertedWindow { start: NaiveDate, end: NaiveDate },

    #[error("validation window must span at least one day (got {0})")]
    InvalidValidationDays(i64),
}

impl From<ParamError> for WalkForwardError {
    fn from(e: ParamError) -> Self {
        WalkForwardError::Search(SearchError::InvalidParameters(e))
    }
}

// ─── Results ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub bars: usize,
    pub summary: OutcomeSummary,
    pub simulation: Simulation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstrumentResult {
    pub instrument: String,
    pub training_bars: usize,
    pub best: BestParameters,
    pub validation: ValidationResult,
}

/// Totals over every validated instrument.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateSummary {
    pub instruments: usize,
    pub events: usize,
    pub recovered: usize,
    pub stopped_out: usize,
    pub unresolved: usize,
    pub trades: usize,
    pub initial_cash: f64,
    pub profit_loss: f64,
}

impl AggregateSummary {
    pub fn from_results(results: &[InstrumentResult]) -> Self {
        results.iter().fold(Self::default(), |mut acc, r| {
            let s = &r.validation.summary;
            acc.instruments += 1;
            acc.events += s.event_count();
            acc.recovered += s.recovered;
            acc.stopped_out += s.stopped_out;
            acc.unresolved += s.unresolved;
            acc.trades += r.validation.simulation.trades.len();
            acc.initial_cash += r.validation.simulation.initial_cash;
            acc.profit_loss += r.validation.simulation.profit_loss();
            acc
        })
    }

    pub fn return_pct(&self) -> f64 {
        if self.initial_cash == 0.0 {
            0.0
        } else {
            self.profit_loss / self.initial_cash
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalkForwardReport {
    pub train_start: NaiveDate,
    pub train_end: NaiveDate,
    pub validation_start: NaiveDate,
    pub validation_end: NaiveDate,
    pub config: WalkForwardConfig,
    pub results: Vec<InstrumentResult>,
    /// Instruments rejected by the universe filter.
    pub filtered_out: Vec<String>,
    pub aggregate: AggregateSummary,
}

impl WalkForwardReport {
    pub fn best_parameters(&self) -> impl Iterator<Item = &BestParameters> {
        self.results.iter().map(|r| &r.best)
    }

    /// Every validation trade across instruments, ordered by timestamp.
    pub fn trade_log(&self) -> Vec<&TradeRecord> {
        let mut trades: Vec<&TradeRecord> = self
            .results
            .iter()
            .flat_map(|r| r.validation.simulation.trades.iter())
            .collect();
        trades.sort_by_key(|t| t.timestamp);
        trades
    }
}

// ─── Controller ──────────────────────────────────────────────────────

/// Validation window for a training end date.
pub fn validation_window(train_end: NaiveDate, validation_days: i64) -> (NaiveDate, NaiveDate) {
    let start = train_end + Duration::days(1);
    (start, start + Duration::days(validation_days))
}

enum Pipeline {
    Validated(Box<InstrumentResult>),
    Filtered(String),
}

fn run_instrument(
    provider: &dyn DataProvider,
    symbol: &str,
    train_start: NaiveDate,
    train_end: NaiveDate,
    config: &WalkForwardConfig,
) -> Result<Pipeline, WalkForwardError> {
    let horizon = config.space.horizon;
    let data_err = |source| WalkForwardError::Data {
        symbol: symbol.to_string(),
        source,
    };

    let training = load_window(
        provider,
        symbol,
        train_start,
        train_end,
        config.training.interval,
        horizon,
    )
    .map_err(data_err)?;

    if let Some(filter) = &config.universe {
        let in_window = training.series.between(train_start, train_end);
        if !filter.passes(&in_window) {
            tracing::info!(symbol, "rejected by universe filter");
            return Ok(Pipeline::Filtered(symbol.to_string()));
        }
    }

    let best = search(&training.series, &config.search_config(train_end))?;

    let (val_start, val_end) = validation_window(train_end, config.validation_days);
    let validation = load_window(
        provider,
        symbol,
        val_start,
        val_end,
        config.validation.interval,
        horizon,
    )
    .map_err(data_err)?;

    let settings = config.validation.settings(val_end);
    let simulation = simulate(&validation.series, &best.params, &settings, config.initial_cash);
    let summary = OutcomeSummary::from_resolved(symbol, &simulation.resolved, &best.params);

    tracing::info!(
        symbol,
        train_score = best.score,
        validation_events = summary.event_count(),
        profit_loss = simulation.profit_loss(),
        "walk-forward instrument complete"
    );

    Ok(Pipeline::Validated(Box::new(InstrumentResult {
        instrument: symbol.to_string(),
        training_bars: training.series.len(),
        best,
        validation: ValidationResult {
            start: val_start,
            end: val_end,
            bars: validation.series.between(val_start, val_end).len(),
            summary,
            simulation,
        },
    })))
}

/// Run the walk-forward pipeline over `instruments`.
///
/// Configuration is validated before any data is fetched or any trial runs.
pub fn run_walk_forward(
    provider: &dyn DataProvider,
    instruments: &[String],
    train_start: NaiveDate,
    train_end: NaiveDate,
    config: &WalkForwardConfig,
) -> Result<WalkForwardReport, WalkForwardError> {
    if instruments.is_empty() {
        return Err(WalkForwardError::NoInstruments);
    }
    if train_start > train_end {
        return Err(WalkForwardError::InvertedWindow {
            start: train_start,
            end: train_end,
        });
    }
    if config.validation_days < 1 {
        return Err(WalkForwardError::InvalidValidationDays(
            config.validation_days,
        ));
    }
    config.validate()?;

    tracing::info!(
        instruments = instruments.len(),
        %train_start,
        %train_end,
        trials = config.trials,
        seed = config.seed,
        "starting walk-forward"
    );

    let run = |symbol: &String| run_instrument(provider, symbol, train_start, train_end, config);
    let pipelines: Vec<Pipeline> = if config.parallel_instruments {
        instruments.par_iter().map(run).collect::<Result<_, _>>()?
    } else {
        instruments.iter().map(run).collect::<Result<_, _>>()?
    };

    let mut results = Vec::with_capacity(pipelines.len());
    let mut filtered_out = Vec::new();
    for p in pipelines {
        match p {
            Pipeline::Validated(r) => results.push(*r),
            Pipeline::Filtered(s) => filtered_out.push(s),
        }
    }

    let (validation_start, validation_end) = validation_window(train_end, config.validation_days);
    let aggregate = AggregateSummary::from_results(&results);
    Ok(WalkForwardReport {
        train_start,
        train_end,
        validation_start,
        validation_end,
        config: config.clone(),
        results,
        filtered_out,
        aggregate,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_starts_the_day_after_training() {
        let end = NaiveDate::from_ymd_opt(2024, 2, 28).unwrap();
        let (start, stop) = validation_window(end, 30);
        assert_eq!(start, NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
        assert_eq!(stop, NaiveDate::from_ymd_opt(2024, 3, 30).unwrap());
    }

    #[test]
    fn empty_aggregate_has_zero_return() {
        let agg = AggregateSummary::from_results(&[]);
        assert_eq!(agg.instruments, 0);
        assert_eq!(agg.return_pct(), 0.0);
    }
}
