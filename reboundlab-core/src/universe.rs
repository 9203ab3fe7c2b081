//! Universe screening by liquidity, price and volatility.

use serde::{Deserialize, Serialize};

use crate::domain::PriceSeries;

/// Instrument screen applied before searching.
///
/// An instrument passes when at least one bar trades above both the volume and
/// price thresholds, and the sample standard deviation of its close-to-close
/// returns exceeds the volatility threshold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UniverseFilter {
    pub min_volume: u64,
    pub min_price: f64,
    pub min_volatility: f64,
}

impl Default for UniverseFilter {
    fn default() -> Self {
        Self {
            min_volume: 500_000,
            min_price: 10.0,
            min_volatility: 0.0,
        }
    }
}

impl UniverseFilter {
    pub fn passes(&self, series: &PriceSeries) -> bool {
        let liquid = series
            .bars()
            .iter()
            .any(|b| b.volume > self.min_volume && b.close > self.min_price);
        liquid && return_volatility(series) > self.min_volatility
    }

    /// Instruments of `universe` that pass, in input order.
    pub fn apply<'a>(&self, universe: impl IntoIterator<Item = &'a PriceSeries>) -> Vec<String> {
        universe
            .into_iter()
            .filter(|s| self.passes(s))
            .map(|s| s.instrument.clone())
            .collect()
    }
}

/// Sample standard deviation of close-to-close returns (0 with fewer than two returns).
pub fn return_volatility(series: &PriceSeries) -> f64 {
    let returns: Vec<f64> = series
        .bars()
        .windows(2)
        .filter(|w| w[0].close > 0.0)
        .map(|w| w[1].close / w[0].close - 1.0)
        .collect();
    if returns.len() < 2 {
        return 0.0;
    }
    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let var = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);
    var.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Interval, PriceBar};
    use chrono::NaiveDate;

    fn series(symbol: &str, closes: &[f64], volume: u64) -> PriceSeries {
        let bars = closes
            .iter()
            .enumerate()
            .map(|(i, &c)| PriceBar {
                timestamp: NaiveDate::from_ymd_opt(2022, 1, 3 + i as u32)
                    .unwrap()
                    .and_hms_opt(0, 0, 0)
                    .unwrap(),
                open: c,
                high: c,
                low: c,
                close: c,
                volume,
            })
            .collect();
        PriceSeries::new(symbol, Interval::Day, bars)
    }

    #[test]
    fn flat_series_has_zero_volatility() {
        let s = series("FLAT", &[20.0, 20.0, 20.0, 20.0], 1_000_000);
        assert_eq!(return_volatility(&s), 0.0);
    }

    #[test]
    fn filter_rejects_illiquid_and_cheap() {
        let filter = UniverseFilter {
            min_volume: 100_000,
            min_price: 5.0,
            min_volatility: 0.001,
        };
        let good = series("AAPL", &[100.0, 102.0, 99.0, 101.0], 1_000_000);
        let thin = series("THIN", &[100.0, 102.0, 99.0, 101.0], 10);
        let cheap = series("PENNY", &[1.0, 1.2, 0.9, 1.1], 1_000_000);
        let calm = series("CALM", &[50.0, 50.0, 50.0, 50.0], 1_000_000);

        let kept = filter.apply([&good, &thin, &cheap, &calm]);
        assert_eq!(kept, vec!["AAPL".to_string()]);
    }
}
