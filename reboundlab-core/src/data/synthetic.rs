//! Deterministic synthetic bars for offline runs and tests.
//!
//! The daily path is a seeded random walk anchored at a fixed epoch, so any
//! sub-window of the same instrument sees identical prices. Occasional shock
//! days push the low well below the open to produce drop events. Minute bars
//! are generated per trading day starting at that day's open.

use chrono::{Datelike, NaiveDate, NaiveTime, Weekday};
use rand::Rng;

use super::provider::{DataError, DataProvider, DataSource, FetchResult};
use crate::domain::{Interval, PriceBar, PriceSeries};
use crate::rng::RngHierarchy;

/// Minutes in a regular US equity session (09:30 to 16:00).
pub const SESSION_MINUTES: u32 = 390;

#[derive(Debug, Clone, Copy)]
pub struct SyntheticProvider {
    rng: RngHierarchy,
    pub daily_volatility: f64,
    pub shock_probability: f64,
}

impl SyntheticProvider {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: RngHierarchy::new(seed),
            daily_volatility: 0.02,
            shock_probability: 0.05,
        }
    }

    fn epoch() -> NaiveDate {
        NaiveDate::from_ymd_opt(2000, 1, 3).unwrap_or(NaiveDate::MIN)
    }

    fn is_trading_day(day: NaiveDate) -> bool {
        !matches!(day.weekday(), Weekday::Sat | Weekday::Sun)
    }

    /// Daily bars from the epoch through `end`.
    fn daily_path(&self, symbol: &str, end: NaiveDate) -> Vec<PriceBar> {
        let mut rng = self.rng.rng_for("synthetic", symbol, 0);
        let mut bars = Vec::new();
        let mut price = rng.gen_range(20.0..200.0_f64);
        let mut day = Self::epoch();
        let vol = self.daily_volatility.abs().max(1e-6);

        while day <= end {
            if Self::is_trading_day(day) {
                let open = price * (1.0 + rng.gen_range(-vol / 2.0..vol / 2.0));
                let close = open * (1.0 + rng.gen_range(-vol..vol));
                let high = open.max(close) * (1.0 + rng.gen_range(0.0..vol / 2.0));
                let mut low = open.min(close) * (1.0 - rng.gen_range(0.0..vol / 2.0));
                if rng.gen_bool(self.shock_probability.clamp(0.0, 1.0)) {
                    low = low.min(open * (1.0 - rng.gen_range(0.04..0.12)));
                }
                bars.push(PriceBar {
                    timestamp: day.and_time(NaiveTime::MIN),
                    open,
                    high,
                    low,
                    close,
                    volume: rng.gen_range(500_000..5_000_000u64),
                });
                price = close;
            }
            match day.succ_opt() {
                Some(next) => day = next,
                None => break,
            }
        }
        bars
    }

    fn minute_session(&self, symbol: &str, daily: &PriceBar) -> Vec<PriceBar> {
        let day = daily.date();
        let mut rng = self
            .rng
            .rng_for("synthetic-minute", symbol, day.num_days_from_ce() as u64);
        let step = self.daily_volatility.abs().max(1e-6) / (SESSION_MINUTES as f64).sqrt();
        let shock_at = rng
            .gen_bool(self.shock_probability.clamp(0.0, 1.0))
            .then(|| rng.gen_range(30..SESSION_MINUTES - 60));

        let session_start = day.and_time(NaiveTime::from_hms_opt(9, 30, 0).unwrap_or(NaiveTime::MIN));
        let mut price = daily.open;
        (0..SESSION_MINUTES)
            .map(|m| {
                let open = price;
                let mut close = open * (1.0 + rng.gen_range(-step..step));
                if shock_at == Some(m) {
                    close = open * (1.0 - rng.gen_range(0.04..0.10));
                }
                let high = open.max(close) * (1.0 + rng.gen_range(0.0..step / 2.0));
                let low = open.min(close) * (1.0 - rng.gen_range(0.0..step / 2.0));
                price = close;
                PriceBar {
                    timestamp: session_start + chrono::Duration::minutes(m as i64),
                    open,
                    high,
                    low,
                    close,
                    volume: rng.gen_range(1_000..50_000u64),
                }
            })
            .collect()
    }
}

impl DataProvider for SyntheticProvider {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
        interval: Interval,
    ) -> Result<FetchResult, DataError> {
        let daily = PriceSeries::new(symbol, Interval::Day, self.daily_path(symbol, end))
            .between(start, end);
        let series = match interval {
            Interval::Day => daily,
            Interval::Minute => PriceSeries::new(
                symbol,
                Interval::Minute,
                daily
                    .bars()
                    .iter()
                    .flat_map(|b| self.minute_session(symbol, b))
                    .collect(),
            ),
        };
        if series.is_empty() {
            return Err(DataError::no_data(symbol, interval, start, end));
        }
        tracing::debug!(symbol, %interval, bars = series.len(), "generated synthetic bars");
        Ok(FetchResult {
            series,
            source: DataSource::Synthetic,
        })
    }
}
