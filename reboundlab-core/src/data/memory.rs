//! In-memory provider over pre-built series.

use std::collections::HashMap;

use chrono::NaiveDate;

use super::provider::{DataError, DataProvider, DataSource, FetchResult};
use crate::domain::{Interval, PriceSeries};

#[derive(Debug, Clone, Default)]
pub struct InMemoryProvider {
    series: HashMap<(String, Interval), PriceSeries>,
}

impl InMemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a series under its own instrument and interval.
    pub fn insert(&mut self, series: PriceSeries) {
        self.series
            .insert((series.instrument.clone(), series.interval), series);
    }

    pub fn with(mut self, series: PriceSeries) -> Self {
        self.insert(series);
        self
    }
}

impl DataProvider for InMemoryProvider {
    fn name(&self) -> &str {
        "memory"
    }

    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
        interval: Interval,
    ) -> Result<FetchResult, DataError> {
        let stored = self
            .series
            .get(&(symbol.to_string(), interval))
            .ok_or_else(|| DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            })?;
        let series = stored.between(start, end);
        if series.is_empty() {
            return Err(DataError::no_data(symbol, interval, start, end));
        }
        Ok(FetchResult {
            series,
            source: DataSource::InMemory,
        })
    }
}
