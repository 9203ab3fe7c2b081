//! TOML run configuration.
//!
//! ```toml
//! instruments = ["AMD", "NVDA"]
//! train_start = "2024-01-02"
//! train_end = "2024-06-28"
//!
//! [search]
//! trials = 1000
//! seed = 42
//! threads = 0
//!
//! [space]
//! horizon = 10
//! drop_threshold = { min = 0.01, max = 0.10 }
//! gain_threshold = { min = 0.01, max = 0.10 }
//! stop_loss_threshold = { min = 0.01, max = 0.10 }
//!
//! [validation]
//! interval = "minute"
//! reference = "session_open"
//! ```

use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use reboundlab_core::domain::ParamError;
use reboundlab_core::universe::UniverseFilter;
use reboundlab_core::DEFAULT_INITIAL_CASH;

use crate::search::SearchSpace;
use crate::walk_forward::{WalkForwardConfig, WindowSpec};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error(transparent)]
    InvalidParameters(#[from] ParamError),

    #[error("config lists no instruments")]
    NoInstruments,

    #[error("train_start {start} is after train_end {end}")]
    InvertedDates { start: NaiveDate, end: NaiveDate },

    #[error("validation_days must be at least 1 (got {0})")]
    ValidationDays(i64),

    #[error("initial_cash must be positive (got {0})")]
    InitialCash(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSection {
    pub trials: usize,
    pub seed: u64,
    pub threads: usize,
    /// Search the rule without a stop-loss.
    pub disable_stop_loss: bool,
}

impl Default for SearchSection {
    fn default() -> Self {
        Self {
            trials: 1000,
            seed: 42,
            threads: 0,
            disable_stop_loss: false,
        }
    }
}

fn default_validation_days() -> i64 {
    30
}

fn default_initial_cash() -> f64 {
    DEFAULT_INITIAL_CASH
}

fn default_true() -> bool {
    true
}

/// A complete walk-forward run as read from disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub instruments: Vec<String>,
    pub train_start: NaiveDate,
    pub train_end: NaiveDate,
    #[serde(default)]
    pub search: SearchSection,
    #[serde(default)]
    pub space: SearchSpace,
    #[serde(default)]
    pub training: WindowSpec,
    #[serde(default)]
    pub validation: WindowSpec,
    #[serde(default = "default_validation_days")]
    pub validation_days: i64,
    #[serde(default = "default_initial_cash")]
    pub initial_cash: f64,
    #[serde(default = "default_true")]
    pub parallel_instruments: bool,
    #[serde(default)]
    pub universe: Option<UniverseFilter>,
}

impl RunConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let config = Self::parse_file(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config = Self::parse_toml(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse without validating, for callers that layer overrides
    /// on top and call [`RunConfig::validate`] afterwards.
    pub fn parse_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse_toml(&content)
    }

    pub fn parse_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.instruments.is_empty() {
            return Err(ConfigError::NoInstruments);
        }
        if self.train_start > self.train_end {
            return Err(ConfigError::InvertedDates {
                start: self.train_start,
                end: self.train_end,
            });
        }
        if self.validation_days < 1 {
            return Err(ConfigError::ValidationDays(self.validation_days));
        }
        if !(self.initial_cash.is_finite() && self.initial_cash > 0.0) {
            return Err(ConfigError::InitialCash(self.initial_cash));
        }
        self.walk_forward().validate()?;
        Ok(())
    }

    pub fn walk_forward(&self) -> WalkForwardConfig {
        let mut space = self.space;
        if self.search.disable_stop_loss {
            space.stop_loss_threshold = None;
        }
        WalkForwardConfig {
            trials: self.search.trials,
            seed: self.search.seed,
            threads: self.search.threads,
            space,
            training: self.training,
            validation: self.validation,
            validation_days: self.validation_days,
            initial_cash: self.initial_cash,
            parallel_instruments: self.parallel_instruments,
            universe: self.universe,
        }
    }
}
