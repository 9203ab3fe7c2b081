//! Outcome resolution: the drop event state machine.
//!
//! From an event, walk forward bar by bar:
//! `AwaitingResolution → {Recovered, StoppedOut, Unresolved}`.
//!
//! Targets are measured from the event low (the trough), not the reference
//! open. On each present bar the stop-loss is checked first, then the gain
//! target; the first crossing wins. If the horizon runs out the event is
//! `Unresolved` at the close of the last examined bar. Missing forward data is
//! a valid terminal state, never an error.
//!
//! The walk is unit-agnostic: daily and minute series resolve identically.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::domain::{DropEvent, Outcome, PriceBar, PriceSeries, ResolvedEvent, RuleParameters};

/// How the horizon is counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForwardWindow {
    /// The next `horizon` bars present in the series. Gaps consume nothing.
    #[default]
    PresentBars,
    /// Bars timestamped within `horizon` interval units of the detection time.
    /// Gaps consume horizon.
    Elapsed,
}

impl std::str::FromStr for ForwardWindow {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "present_bars" | "bars" => Ok(Self::PresentBars),
            "elapsed" | "calendar" => Ok(Self::Elapsed),
            other => Err(format!(
                "unknown forward window '{other}' (expected present_bars or elapsed)"
            )),
        }
    }
}

/// Price levels derived from the event low.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExitLevels {
    pub gain_fraction: f64,
    pub gain_price: f64,
    pub stop_loss_price: Option<f64>,
}

impl ExitLevels {
    pub fn from_event(event: &DropEvent, params: &RuleParameters) -> Self {
        let base = event.event_low;
        Self {
            gain_fraction: params.gain_threshold,
            gain_price: base * (1.0 + params.gain_threshold),
            stop_loss_price: params.stop_loss_threshold.map(|s| base * (1.0 - s)),
        }
    }
}

/// Classify one event. Deterministic, never fails.
pub fn resolve(
    series: &PriceSeries,
    event: &DropEvent,
    params: &RuleParameters,
    window: ForwardWindow,
) -> Outcome {
    let levels = ExitLevels::from_event(event, params);
    let forward = series.bars().get(event.bar_index + 1..).unwrap_or(&[]);
    let present = forward.iter().filter(|b| !b.is_void());

    match window {
        ForwardWindow::PresentBars => walk(event, &levels, present.take(params.horizon)),
        ForwardWindow::Elapsed => match elapsed_deadline(series, event, params.horizon) {
            Some(deadline) => walk(
                event,
                &levels,
                present.take_while(|b| b.timestamp <= deadline),
            ),
            // Beyond the representable calendar: every forward bar is in range.
            None => walk(event, &levels, present),
        },
    }
}

/// Last timestamp inside an elapsed-time horizon, `None` on overflow.
fn elapsed_deadline(
    series: &PriceSeries,
    event: &DropEvent,
    horizon: usize,
) -> Option<NaiveDateTime> {
    let steps = i32::try_from(horizon).ok()?;
    let span = series.interval.unit().checked_mul(steps)?;
    event.detected_at.checked_add_signed(span)
}

fn walk<'a>(
    event: &DropEvent,
    levels: &ExitLevels,
    bars: impl Iterator<Item = &'a PriceBar>,
) -> Outcome {
    let mut last_observed_price = event.event_low;
    let mut last_observed_at: NaiveDateTime = event.detected_at;
    let mut bars_observed = 0;

    for bar in bars {
        last_observed_price = bar.close;
        last_observed_at = bar.timestamp;
        bars_observed += 1;

        if let Some(stop) = levels.stop_loss_price {
            if bar.low <= stop {
                return Outcome::StoppedOut {
                    resolved_at: bar.timestamp,
                    resolution_price: stop,
                };
            }
        }
        if bar.high >= levels.gain_price {
            return Outcome::Recovered {
                resolved_at: bar.timestamp,
                resolution_price: levels.gain_price,
                realized_gain: levels.gain_fraction,
            };
        }
    }

    Outcome::Unresolved {
        last_observed_price,
        last_observed_at,
        bars_observed,
    }
}

/// Resolve every event, preserving order. One outcome per event.
pub fn resolve_all(
    series: &PriceSeries,
    events: Vec<DropEvent>,
    params: &RuleParameters,
    window: ForwardWindow,
) -> Vec<ResolvedEvent> {
    events
        .into_iter()
        .map(|event| {
            let outcome = resolve(series, &event, params, window);
            ResolvedEvent { event, outcome }
        })
        .collect()
}
