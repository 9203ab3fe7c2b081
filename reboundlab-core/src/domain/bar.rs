//! PriceBar: the fundamental market data unit.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Longest forward extension of a fetch window, in calendar days.
pub const MAX_LOOKAHEAD_DAYS: i64 = 36_525;

/// Sampling interval of a price series.
///
/// The resolver is unit-agnostic; the interval only matters for the
/// elapsed-time forward window and for sizing fetch windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interval {
    #[default]
    Day,
    Minute,
}

impl Interval {
    /// Length of one interval step.
    pub fn unit(&self) -> Duration {
        match self {
            Self::Day => Duration::days(1),
            Self::Minute => Duration::minutes(1),
        }
    }

    /// Calendar days to fetch past a window end so that `horizon` forward
    /// bars are normally available.
    ///
    /// Daily bars skip weekends and holidays, so the span is doubled. Minute
    /// bars cover roughly 390 per regular session. Capped at
    /// [`MAX_LOOKAHEAD_DAYS`].
    pub fn lookahead_days(&self, horizon: usize) -> i64 {
        let horizon = i64::try_from(horizon).unwrap_or(i64::MAX);
        let days = match self {
            Self::Day => horizon.saturating_mul(2).saturating_add(3),
            Self::Minute => horizon.saturating_add(389) / 390 + 3,
        };
        days.min(MAX_LOOKAHEAD_DAYS)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Day => "1d",
            Self::Minute => "1m",
        }
    }
}

impl std::fmt::Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Interval {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1d" | "day" | "daily" => Ok(Self::Day),
            "1m" | "minute" => Ok(Self::Minute),
            other => Err(format!("unknown interval '{other}' (expected 1d or 1m)")),
        }
    }
}

/// OHLCV bar for a single instrument over one sampling interval.
///
/// Daily bars carry a midnight timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl PriceBar {
    /// Calendar day the bar belongs to.
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date()
    }

    /// Returns true if any OHLC field is NaN (void bar).
    pub fn is_void(&self) -> bool {
        self.open.is_nan() || self.high.is_nan() || self.low.is_nan() || self.close.is_nan()
    }

    /// Basic OHLC sanity check: high >= low, high >= open, high >= close, etc.
    pub fn is_sane(&self) -> bool {
        if self.is_void() {
            return false;
        }
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.open > 0.0
            && self.close > 0.0
    }
}
