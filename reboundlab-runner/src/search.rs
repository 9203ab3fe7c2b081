//! Monte Carlo parameter search.
//!
//! Each trial draws drop, gain and stop-loss thresholds uniformly from the
//! configured ranges, evaluates the training series, and scores the outcomes.
//! Trials are independent: each one seeds its own RNG from
//! `(seed, instrument, trial)`, so any thread count reproduces the same draws.
//! Scores are collected first and reduced afterwards; the highest score wins
//! and ties go to the lowest trial index.

use rand::Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use reboundlab_core::domain::params::{check_positive, check_unit_open};
use reboundlab_core::domain::{ParamError, PriceSeries, RuleParameters};
use reboundlab_core::rng::RngHierarchy;
use reboundlab_core::{summarize, EvaluationSettings, OutcomeSummary};

/// RNG scope for trial sampling.
const SAMPLER_SCOPE: &str = "sampler";

#[derive(Debug, Error)]
pub enum SearchError {
    #[error(transparent)]
    InvalidParameters(#[from] ParamError),

    #[error("failed to build search thread pool: {0}")]
    ThreadPool(String),
}

// ─── Ranges ──────────────────────────────────────────────────────────

/// Closed interval `[min, max]` sampled uniformly.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParamRange {
    pub min: f64,
    pub max: f64,
}

impl ParamRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Degenerate range that always samples `value`.
    pub fn fixed(value: f64) -> Self {
        Self::new(value, value)
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        if self.min == self.max {
            self.min
        } else {
            rng.gen_range(self.min..=self.max)
        }
    }

    fn check_order(&self, field: &'static str) -> Result<(), ParamError> {
        if self.min > self.max || self.min.is_nan() || self.max.is_nan() {
            return Err(ParamError::InvertedRange {
                field,
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }

    fn validate_unit(&self, field: &'static str) -> Result<(), ParamError> {
        self.check_order(field)?;
        check_unit_open(field, self.min)?;
        check_unit_open(field, self.max)
    }

    fn validate_positive(&self, field: &'static str) -> Result<(), ParamError> {
        self.check_order(field)?;
        check_positive(field, self.min)?;
        check_positive(field, self.max)
    }
}

/// The sampled parameter space. Horizon is fixed per search.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSpace {
    pub drop_threshold: ParamRange,
    pub gain_threshold: ParamRange,
    /// `None` searches the rule without a stop-loss.
    pub stop_loss_threshold: Option<ParamRange>,
    pub horizon: usize,
}

impl Default for SearchSpace {
    fn default() -> Self {
        Self {
            drop_threshold: ParamRange::new(0.01, 0.10),
            gain_threshold: ParamRange::new(0.01, 0.10),
            stop_loss_threshold: Some(ParamRange::new(0.01, 0.10)),
            horizon: 10,
        }
    }
}

impl SearchSpace {
    pub fn validate(&self) -> Result<(), ParamError> {
        self.drop_threshold.validate_unit("drop_threshold")?;
        self.gain_threshold.validate_positive("gain_threshold")?;
        if let Some(stop) = &self.stop_loss_threshold {
            stop.validate_unit("stop_loss_threshold")?;
        }
        if self.horizon == 0 {
            return Err(ParamError::ZeroHorizon);
        }
        Ok(())
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> RuleParameters {
        RuleParameters {
            drop_threshold: self.drop_threshold.sample(rng),
            gain_threshold: self.gain_threshold.sample(rng),
            stop_loss_threshold: self.stop_loss_threshold.map(|r| r.sample(rng)),
            horizon: self.horizon,
        }
    }
}

// ─── Configuration ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    pub trials: usize,
    pub seed: u64,
    /// Worker threads. 0 uses the global rayon pool, 1 runs inline.
    pub threads: usize,
    pub space: SearchSpace,
    pub settings: EvaluationSettings,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            trials: 1000,
            seed: 42,
            threads: 0,
            space: SearchSpace::default(),
            settings: EvaluationSettings::default(),
        }
    }
}

impl SearchConfig {
    pub fn validate(&self) -> Result<(), ParamError> {
        if self.trials == 0 {
            return Err(ParamError::ZeroTrials);
        }
        self.space.validate()
    }
}

// ─── Results ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchTrial {
    pub trial: u64,
    pub params: RuleParameters,
    pub score: f64,
}

/// The winning trial for one instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestParameters {
    pub instrument: String,
    pub params: RuleParameters,
    pub score: f64,
    pub trial: u64,
    pub trials_run: usize,
    /// Training-window outcomes under the winning parameters.
    pub summary: OutcomeSummary,
}

/// Sample and score a single trial.
pub fn run_trial(
    series: &PriceSeries,
    space: &SearchSpace,
    settings: &EvaluationSettings,
    rng: &RngHierarchy,
    trial: u64,
) -> SearchTrial {
    let mut trial_rng = rng.rng_for(SAMPLER_SCOPE, &series.instrument, trial);
    let params = space.sample(&mut trial_rng);
    let score = summarize(series, &params, settings).score;
    SearchTrial {
        trial,
        params,
        score,
    }
}

/// Run every trial and return them in trial order.
pub fn run_trials(
    series: &PriceSeries,
    config: &SearchConfig,
) -> Result<Vec<SearchTrial>, SearchError> {
    config.validate()?;
    let rng = RngHierarchy::new(config.seed);
    let run = |t: u64| run_trial(series, &config.space, &config.settings, &rng, t);
    let n = config.trials as u64;

    let trials: Vec<SearchTrial> = match config.threads {
        1 => (0..n).map(run).collect(),
        0 => (0..n).into_par_iter().map(run).collect(),
        threads => rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .map_err(|e| SearchError::ThreadPool(e.to_string()))?
            .install(|| (0..n).into_par_iter().map(run).collect()),
    };
    Ok(trials)
}

/// Highest score, first trial on ties. `None` only for an empty slice.
pub fn best_trial(trials: &[SearchTrial]) -> Option<&SearchTrial> {
    trials.iter().fold(None, |best: Option<&SearchTrial>, t| match best {
        Some(b) if t.score <= b.score || t.score.is_nan() => Some(b),
        _ => Some(t),
    })
}

/// Search `series` for the highest-scoring parameters.
///
/// Fails with `InvalidParameters` before any trial runs when the trial count is
/// zero, a range is inverted, or a bound lies outside its valid interval.
pub fn search(series: &PriceSeries, config: &SearchConfig) -> Result<BestParameters, SearchError> {
    let trials = run_trials(series, config)?;
    let best = best_trial(&trials).copied().ok_or(ParamError::ZeroTrials)?;
    let summary = summarize(series, &best.params, &config.settings);

    tracing::info!(
        instrument = %series.instrument,
        trials = trials.len(),
        best_trial = best.trial,
        score = best.score,
        drop = best.params.drop_threshold,
        gain = best.params.gain_threshold,
        stop = ?best.params.stop_loss_threshold,
        "search complete"
    );

    Ok(BestParameters {
        instrument: series.instrument.clone(),
        params: best.params,
        score: best.score,
        trial: best.trial,
        trials_run: trials.len(),
        summary,
    })
}
