//! Window loading with forward extension.
//!
//! A detection window `[start, end]` is fetched as
//! `[start, end + interval.lookahead_days(horizon)]` so events near `end` still
//! see forward bars. An empty provider answer becomes an empty series (zero
//! events); every other provider error propagates.

use chrono::{Days, NaiveDate};

use reboundlab_core::data::{DataError, DataProvider, DataSource};
use reboundlab_core::domain::{Interval, PriceSeries};

/// A loaded detection window.
#[derive(Debug, Clone)]
pub struct LoadedWindow {
    pub series: PriceSeries,
    /// Last day on which events may be detected.
    pub detect_until: NaiveDate,
    /// `None` when the provider had no data for the window.
    pub source: Option<DataSource>,
}

impl LoadedWindow {
    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

/// Fetch `[start, end]` plus enough trailing days to resolve `horizon` bars.
pub fn load_window(
    provider: &dyn DataProvider,
    symbol: &str,
    start: NaiveDate,
    end: NaiveDate,
    interval: Interval,
    horizon: usize,
) -> Result<LoadedWindow, DataError> {
    let fetch_end = u64::try_from(interval.lookahead_days(horizon))
        .ok()
        .and_then(|days| end.checked_add_days(Days::new(days)))
        .unwrap_or(NaiveDate::MAX);
    tracing::debug!(
        symbol,
        provider = provider.name(),
        %start,
        %end,
        %fetch_end,
        %interval,
        "loading window"
    );

    match provider.fetch(symbol, start, fetch_end, interval) {
        Ok(fetched) => Ok(LoadedWindow {
            series: fetched.series,
            detect_until: end,
            source: Some(fetched.source),
        }),
        Err(e) if e.is_no_data() => {
            tracing::warn!(symbol, %start, %end, %interval, "no data available, treating as zero events");
            Ok(LoadedWindow {
                series: PriceSeries::empty(symbol, interval),
                detect_until: end,
                source: None,
            })
        }
        Err(e) => Err(e),
    }
}

/// Fetch `[start, end]` exactly, mapping an empty answer to an empty series.
pub fn load_exact(
    provider: &dyn DataProvider,
    symbol: &str,
    start: NaiveDate,
    end: NaiveDate,
    interval: Interval,
) -> Result<PriceSeries, DataError> {
    match provider.fetch(symbol, start, end, interval) {
        Ok(fetched) => Ok(fetched.series),
        Err(e) if e.is_no_data() => {
            tracing::warn!(symbol, %start, %end, %interval, "no data available");
            Ok(PriceSeries::empty(symbol, interval))
        }
        Err(e) => Err(e),
    }
}
