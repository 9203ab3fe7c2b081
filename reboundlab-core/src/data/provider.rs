//! Data provider trait and structured error types.
//!
//! Providers return a `PriceSeries` covering `[start, end]` inclusive by
//! calendar day. Callers decide how to treat `NoDataAvailable`; every other
//! error is a real failure.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{Interval, PriceSeries};

#[derive(Debug, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("authentication required: {0}")]
    AuthenticationRequired(String),

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("no {interval} data for {symbol} between {start} and {end}")]
    NoDataAvailable {
        symbol: String,
        interval: Interval,
        start: NaiveDate,
        end: NaiveDate,
    },

    #[error("provider blocked: circuit breaker tripped")]
    CircuitBreakerTripped,

    #[error("failed to build HTTP client: {0}")]
    ClientInit(String),

    #[error("I/O error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed CSV in {path}: {reason}")]
    Csv { path: String, reason: String },

    #[error("data error: {0}")]
    Other(String),
}

impl DataError {
    pub fn no_data(symbol: &str, interval: Interval, start: NaiveDate, end: NaiveDate) -> Self {
        DataError::NoDataAvailable {
            symbol: symbol.to_string(),
            interval,
            start,
            end,
        }
    }

    /// True for "the provider answered, but there is nothing in that window".
    pub fn is_no_data(&self) -> bool {
        matches!(self, DataError::NoDataAvailable { .. })
    }
}

/// Where the data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    YahooFinance,
    CsvImport,
    Synthetic,
    InMemory,
}

/// Result of a successful fetch for a single instrument.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub series: PriceSeries,
    pub source: DataSource,
}

/// Source of price bars (Yahoo Finance, CSV files, synthetic, in-memory).
pub trait DataProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Fetch bars for `symbol` at `interval` over `[start, end]`.
    ///
    /// Returns `DataError::NoDataAvailable` when the window is empty.
    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
        interval: Interval,
    ) -> Result<FetchResult, DataError>;

    /// Whether the provider is currently accepting requests.
    fn is_available(&self) -> bool {
        true
    }
}

impl<P: DataProvider + ?Sized> DataProvider for Box<P> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
        interval: Interval,
    ) -> Result<FetchResult, DataError> {
        (**self).fetch(symbol, start, end, interval)
    }

    fn is_available(&self) -> bool {
        (**self).is_available()
    }
}
