//! PriceSeries: ordered bars for one instrument.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::bar::{Interval, PriceBar};

/// Ordered sequence of bars for one instrument over a date range.
///
/// Bars are kept sorted by timestamp. Missing intervals are simply absent;
/// nothing is inferred or forward-filled for tradable prices.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceSeries {
    pub instrument: String,
    pub interval: Interval,
    bars: Vec<PriceBar>,
}

impl PriceSeries {
    /// Build a series, sorting bars by timestamp and dropping duplicate timestamps
    /// (first occurrence wins).
    pub fn new(instrument: impl Into<String>, interval: Interval, mut bars: Vec<PriceBar>) -> Self {
        bars.sort_by_key(|b| b.timestamp);
        bars.dedup_by_key(|b| b.timestamp);
        Self {
            instrument: instrument.into(),
            interval,
            bars,
        }
    }

    /// A series with no bars (the "no data available" case).
    pub fn empty(instrument: impl Into<String>, interval: Interval) -> Self {
        Self::new(instrument, interval, Vec::new())
    }

    pub fn bars(&self) -> &[PriceBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.bars.first().map(PriceBar::date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.bars.last().map(PriceBar::date)
    }

    /// Session-anchored open for every bar.
    ///
    /// The first bar's open within each calendar day is held constant across
    /// all bars of that day. Output is aligned index-for-index with `bars()`.
    pub fn session_opens(&self) -> Vec<f64> {
        let mut opens = Vec::with_capacity(self.bars.len());
        let mut current: Option<(NaiveDate, f64)> = None;
        for bar in &self.bars {
            let day = bar.date();
            let open = match current {
                Some((d, open)) if d == day => open,
                _ => {
                    current = Some((day, bar.open));
                    bar.open
                }
            };
            opens.push(open);
        }
        opens
    }

    /// Bars of a single calendar day.
    pub fn session(&self, day: NaiveDate) -> &[PriceBar] {
        let start = self.bars.partition_point(|b| b.date() < day);
        let end = self.bars.partition_point(|b| b.date() <= day);
        &self.bars[start..end]
    }

    /// Copy of the bars whose calendar date lies in `[start, end]`.
    pub fn between(&self, start: NaiveDate, end: NaiveDate) -> Self {
        let lo = self.bars.partition_point(|b| b.date() < start);
        let hi = self.bars.partition_point(|b| b.date() <= end).max(lo);
        Self {
            instrument: self.instrument.clone(),
            interval: self.interval,
            bars: self.bars[lo..hi].to_vec(),
        }
    }

    /// Index one past the last bar dated on or before `end`.
    pub fn end_index(&self, end: NaiveDate) -> usize {
        self.bars.partition_point(|b| b.date() <= end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn ts(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, day)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    fn bar(timestamp: NaiveDateTime, open: f64) -> PriceBar {
        PriceBar {
            timestamp,
            open,
            high: open + 1.0,
            low: open - 1.0,
            close: open,
            volume: 100,
        }
    }

    #[test]
    fn new_sorts_and_dedups() {
        let series = PriceSeries::new(
            "NVDA",
            Interval::Minute,
            vec![bar(ts(5, 9, 32), 3.0), bar(ts(5, 9, 30), 1.0), bar(ts(5, 9, 30), 9.0)],
        );
        assert_eq!(series.len(), 2);
        assert_eq!(series.bars()[0].open, 1.0);
        assert_eq!(series.bars()[1].open, 3.0);
    }

    #[test]
    fn session_opens_forward_fill_within_day() {
        let series = PriceSeries::new(
            "NVDA",
            Interval::Minute,
            vec![
                bar(ts(5, 9, 30), 100.0),
                bar(ts(5, 9, 31), 97.0),
                bar(ts(5, 15, 59), 95.0),
                bar(ts(6, 9, 30), 110.0),
                bar(ts(6, 9, 31), 111.0),
            ],
        );
        assert_eq!(series.session_opens(), vec![100.0, 100.0, 100.0, 110.0, 110.0]);
    }

    #[test]
    fn between_is_inclusive_by_date() {
        let series = PriceSeries::new(
            "SPY",
            Interval::Day,
            (3..=7).map(|d| bar(ts(d, 0, 0), d as f64)).collect(),
        );
        let d = |day| NaiveDate::from_ymd_opt(2024, 6, day).unwrap();
        let sliced = series.between(d(4), d(6));
        assert_eq!(sliced.len(), 3);
        assert_eq!(sliced.first_date(), Some(d(4)));
        assert_eq!(sliced.last_date(), Some(d(6)));
        assert!(series.between(d(20), d(10)).is_empty());
    }

    #[test]
    fn session_returns_single_day() {
        let series = PriceSeries::new(
            "NVDA",
            Interval::Minute,
            vec![bar(ts(4, 15, 59), 1.0), bar(ts(5, 9, 30), 2.0), bar(ts(5, 9, 31), 3.0)],
        );
        let day = NaiveDate::from_ymd_opt(2024, 6, 5).unwrap();
        assert_eq!(series.session(day).len(), 2);
        assert_eq!(series.end_index(day), 3);
    }
}
