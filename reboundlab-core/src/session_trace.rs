//! Single-session trace for intraday bars.
//!
//! Replays one trading day and records the first bar that breaches the drop
//! level, the first bar after it that reaches the gain level, and the first bar
//! after the drop (and before the gain) that reaches the stop-loss level. All
//! levels here are measured from the session open.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::domain::{PriceSeries, RuleParameters};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TracePoint {
    pub timestamp: NaiveDateTime,
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionTrace {
    pub instrument: String,
    pub day: NaiveDate,
    pub session_open: f64,
    pub drop_level: f64,
    pub gain_level: f64,
    pub stop_loss_level: Option<f64>,
    pub drop: Option<TracePoint>,
    pub gain: Option<TracePoint>,
    pub stop_loss: Option<TracePoint>,
}

/// Trace one session. `None` when the series has no bars on `day`.
pub fn trace_session(
    series: &PriceSeries,
    day: NaiveDate,
    params: &RuleParameters,
) -> Option<SessionTrace> {
    let bars = series.session(day);
    let session_open = bars.first()?.open;

    let drop_level = session_open * (1.0 - params.drop_threshold);
    let gain_level = session_open * (1.0 + params.gain_threshold);
    let stop_loss_level = params.stop_loss_threshold.map(|s| session_open * (1.0 - s));

    let mut drop = None;
    let mut gain = None;
    let mut stop_loss = None;

    for bar in bars {
        if drop.is_none() && bar.low <= drop_level {
            drop = Some(TracePoint {
                timestamp: bar.timestamp,
                price: bar.low,
            });
        }
        if drop.is_none() {
            continue;
        }
        if gain.is_none() && bar.high >= gain_level {
            gain = Some(TracePoint {
                timestamp: bar.timestamp,
                price: bar.high,
            });
        }
        if let Some(level) = stop_loss_level {
            if gain.is_none() && stop_loss.is_none() && bar.low <= level {
                stop_loss = Some(TracePoint {
                    timestamp: bar.timestamp,
                    price: bar.low,
                });
            }
        }
        if gain.is_some() && (stop_loss.is_some() || stop_loss_level.is_none()) {
            break;
        }
    }

    Some(SessionTrace {
        instrument: series.instrument.clone(),
        day,
        session_open,
        drop_level,
        gain_level,
        stop_loss_level,
        drop,
        gain,
        stop_loss,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Interval, PriceBar};

    fn minute(m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 5)
            .unwrap()
            .and_hms_opt(9, 30 + m, 0)
            .unwrap()
    }

    fn bar(m: u32, high: f64, low: f64) -> PriceBar {
        PriceBar {
            timestamp: minute(m),
            open: if m == 0 { 100.0 } else { (high + low) / 2.0 },
            high,
            low,
            close: (high + low) / 2.0,
            volume: 500,
        }
    }

    fn params() -> RuleParameters {
        RuleParameters {
            drop_threshold: 0.05,
            gain_threshold: 0.02,
            stop_loss_threshold: Some(0.08),
            horizon: 390,
        }
    }

    #[test]
    fn records_drop_then_stop_then_gain() {
        let series = PriceSeries::new(
            "NVDA",
            Interval::Minute,
            vec![
                bar(0, 100.5, 99.0),
                bar(1, 99.0, 94.0),  // drop
                bar(2, 95.0, 91.5),  // stop (<= 92)
                bar(3, 102.5, 96.0), // gain (>= 102)
            ],
        );
        let day = NaiveDate::from_ymd_opt(2024, 6, 5).unwrap();
        let trace = trace_session(&series, day, &params()).unwrap();

        assert_eq!(trace.session_open, 100.0);
        assert_eq!(trace.drop.unwrap().timestamp, minute(1));
        assert_eq!(trace.stop_loss.unwrap().timestamp, minute(2));
        assert_eq!(trace.gain.unwrap().timestamp, minute(3));
    }

    #[test]
    fn gain_without_drop_is_ignored() {
        let series = PriceSeries::new(
            "NVDA",
            Interval::Minute,
            vec![bar(0, 103.0, 99.0), bar(1, 101.0, 99.5)],
        );
        let day = NaiveDate::from_ymd_opt(2024, 6, 5).unwrap();
        let trace = trace_session(&series, day, &params()).unwrap();
        assert!(trace.drop.is_none());
        assert!(trace.gain.is_none());
        assert!(trace.stop_loss.is_none());
    }

    #[test]
    fn stop_after_gain_is_not_recorded() {
        let series = PriceSeries::new(
            "NVDA",
            Interval::Minute,
            vec![
                bar(0, 100.5, 99.0),
                bar(1, 99.0, 94.0),
                bar(2, 102.5, 96.0),
                bar(3, 95.0, 90.0),
            ],
        );
        let day = NaiveDate::from_ymd_opt(2024, 6, 5).unwrap();
        let trace = trace_session(&series, day, &params()).unwrap();
        assert!(trace.gain.is_some());
        assert!(trace.stop_loss.is_none());
    }

    #[test]
    fn missing_day_yields_none() {
        let series = PriceSeries::empty("NVDA", Interval::Minute);
        let day = NaiveDate::from_ymd_opt(2024, 6, 5).unwrap();
        assert!(trace_session(&series, day, &params()).is_none());
    }
}
