//! CSV file provider.
//!
//! Reads `<dir>/<SYMBOL>.csv` for daily bars and `<dir>/<SYMBOL>_1m.csv` for
//! minute bars. Columns: `timestamp,open,high,low,close,volume`, where the
//! timestamp is `YYYY-MM-DD` or `YYYY-MM-DD HH:MM[:SS]`.

use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::Deserialize;

use super::provider::{DataError, DataProvider, DataSource, FetchResult};
use crate::domain::{Interval, PriceBar, PriceSeries};

#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(alias = "date", alias = "Date", alias = "Datetime", alias = "Timestamp")]
    timestamp: String,
    #[serde(alias = "Open")]
    open: f64,
    #[serde(alias = "High")]
    high: f64,
    #[serde(alias = "Low")]
    low: f64,
    #[serde(alias = "Close")]
    close: f64,
    #[serde(alias = "Volume", default)]
    volume: f64,
}

pub struct CsvProvider {
    dir: PathBuf,
}

impl CsvProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, symbol: &str, interval: Interval) -> PathBuf {
        match interval {
            Interval::Day => self.dir.join(format!("{symbol}.csv")),
            Interval::Minute => self.dir.join(format!("{symbol}_1m.csv")),
        }
    }
}

pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    // Offsets such as "-04:00" are dropped; the wall-clock time is kept.
    let raw = raw.get(..19).filter(|_| raw.len() > 19).unwrap_or(raw);
    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .map(|d| d.and_time(NaiveTime::MIN))
        })
}

/// Read every bar in a CSV file.
pub fn read_bars(path: &Path) -> Result<Vec<PriceBar>, DataError> {
    let display = path.display().to_string();
    let file = std::fs::File::open(path).map_err(|source| DataError::Io {
        path: display.clone(),
        source,
    })?;
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(file);

    let mut bars = Vec::new();
    for (line, row) in reader.deserialize::<CsvRow>().enumerate() {
        let row = row.map_err(|e| DataError::Csv {
            path: display.clone(),
            reason: e.to_string(),
        })?;
        let timestamp = parse_timestamp(&row.timestamp).ok_or_else(|| DataError::Csv {
            path: display.clone(),
            reason: format!("row {}: bad timestamp '{}'", line + 1, row.timestamp),
        })?;
        bars.push(PriceBar {
            timestamp,
            open: row.open,
            high: row.high,
            low: row.low,
            close: row.close,
            volume: row.volume.max(0.0) as u64,
        });
    }
    Ok(bars)
}

impl DataProvider for CsvProvider {
    fn name(&self) -> &str {
        "csv"
    }

    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
        interval: Interval,
    ) -> Result<FetchResult, DataError> {
        let path = self.path_for(symbol, interval);
        if !path.exists() {
            return Err(DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            });
        }
        let bars = read_bars(&path)?;
        let series = PriceSeries::new(symbol, interval, bars).between(start, end);
        if series.is_empty() {
            return Err(DataError::no_data(symbol, interval, start, end));
        }
        tracing::debug!(symbol, path = %path.display(), bars = series.len(), "loaded CSV");
        Ok(FetchResult {
            series,
            source: DataSource::CsvImport,
        })
    }

    fn is_available(&self) -> bool {
        self.dir.is_dir()
    }
}
