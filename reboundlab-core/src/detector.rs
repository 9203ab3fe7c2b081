//! Drop event detection.
//!
//! A pure O(n) scan: every bar whose low sits at least `drop_threshold` below
//! its reference open yields one event. Adjacent qualifying bars are not merged.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::{DropEvent, PriceSeries};

/// Which open price a bar's drop is measured against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceOpenPolicy {
    /// The bar's own open (coarse daily mode).
    #[default]
    BarOpen,
    /// The first open of the bar's calendar day, held for the whole session.
    SessionOpen,
}

impl std::str::FromStr for ReferenceOpenPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bar_open" | "bar" => Ok(Self::BarOpen),
            "session_open" | "session" => Ok(Self::SessionOpen),
            other => Err(format!(
                "unknown reference open '{other}' (expected bar_open or session_open)"
            )),
        }
    }
}

/// Detect drop events over the whole series, in chronological order.
pub fn detect(
    series: &PriceSeries,
    policy: ReferenceOpenPolicy,
    drop_threshold: f64,
) -> Vec<DropEvent> {
    scan(series, policy, drop_threshold, series.len())
}

/// Detect drop events on bars dated on or before `end`.
///
/// Bars after `end` are still part of the series and remain visible to the
/// resolver as forward data.
pub fn detect_until(
    series: &PriceSeries,
    policy: ReferenceOpenPolicy,
    drop_threshold: f64,
    end: NaiveDate,
) -> Vec<DropEvent> {
    scan(series, policy, drop_threshold, series.end_index(end))
}

fn scan(
    series: &PriceSeries,
    policy: ReferenceOpenPolicy,
    drop_threshold: f64,
    limit: usize,
) -> Vec<DropEvent> {
    let bars = &series.bars()[..limit.min(series.len())];
    let session_opens = match policy {
        ReferenceOpenPolicy::SessionOpen => Some(series.session_opens()),
        ReferenceOpenPolicy::BarOpen => None,
    };

    let mut events = Vec::new();
    for (i, bar) in bars.iter().enumerate() {
        let reference_open = match &session_opens {
            Some(opens) => opens[i],
            None => bar.open,
        };
        if !(reference_open.is_finite() && reference_open > 0.0) || bar.is_void() {
            continue;
        }
        let drop_fraction = (bar.low - reference_open) / reference_open;
        if drop_fraction <= -drop_threshold {
            events.push(DropEvent {
                instrument: series.instrument.clone(),
                detected_at: bar.timestamp,
                bar_index: i,
                reference_open,
                event_low: bar.low,
                drop_fraction,
            });
        }
    }
    events
}
