//! DropEvent and Outcome: what the detector finds and how it resolves.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A bar whose low breached the drop threshold below its reference open.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DropEvent {
    pub instrument: String,
    pub detected_at: NaiveDateTime,
    /// Position of the detecting bar within its series.
    pub bar_index: usize,
    pub reference_open: f64,
    pub event_low: f64,
    /// `(event_low - reference_open) / reference_open`, always negative for an event.
    pub drop_fraction: f64,
}

/// Terminal classification of a drop event. Never mutated once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    Recovered {
        resolved_at: NaiveDateTime,
        resolution_price: f64,
        realized_gain: f64,
    },
    StoppedOut {
        resolved_at: NaiveDateTime,
        resolution_price: f64,
    },
    Unresolved {
        last_observed_price: f64,
        /// Timestamp of the last examined bar, or the detection time when none.
        last_observed_at: NaiveDateTime,
        /// Present bars examined; fewer than the horizon means forward data ran out.
        bars_observed: usize,
    },
}

impl Outcome {
    /// Resolution (or last observation) time.
    pub fn exit_time(&self) -> NaiveDateTime {
        match self {
            Self::Recovered { resolved_at, .. } | Self::StoppedOut { resolved_at, .. } => {
                *resolved_at
            }
            Self::Unresolved {
                last_observed_at, ..
            } => *last_observed_at,
        }
    }

    /// Price at which a held position is liquidated.
    pub fn exit_price(&self) -> f64 {
        match self {
            Self::Recovered {
                resolution_price, ..
            }
            | Self::StoppedOut {
                resolution_price, ..
            } => *resolution_price,
            Self::Unresolved {
                last_observed_price,
                ..
            } => *last_observed_price,
        }
    }

    /// True when fewer than `horizon` forward bars were available.
    pub fn is_truncated(&self, horizon: usize) -> bool {
        matches!(self, Self::Unresolved { bars_observed, .. } if *bars_observed < horizon)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Recovered { .. } => "recovered",
            Self::StoppedOut { .. } => "stopped_out",
            Self::Unresolved { .. } => "unresolved",
        }
    }
}

/// An event paired with its outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedEvent {
    pub event: DropEvent,
    pub outcome: Outcome,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 4, day)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    #[test]
    fn exit_price_per_variant() {
        let recovered = Outcome::Recovered {
            resolved_at: at(3),
            resolution_price: 95.88,
            realized_gain: 0.02,
        };
        let unresolved = Outcome::Unresolved {
            last_observed_price: 93.0,
            last_observed_at: at(9),
            bars_observed: 5,
        };
        assert_eq!(recovered.exit_price(), 95.88);
        assert_eq!(recovered.exit_time(), at(3));
        assert_eq!(unresolved.exit_price(), 93.0);
        assert_eq!(unresolved.label(), "unresolved");
    }

    #[test]
    fn truncation_only_for_short_unresolved() {
        let short = Outcome::Unresolved {
            last_observed_price: 93.0,
            last_observed_at: at(2),
            bars_observed: 1,
        };
        let stopped = Outcome::StoppedOut {
            resolved_at: at(2),
            resolution_price: 91.18,
        };
        assert!(short.is_truncated(5));
        assert!(!short.is_truncated(1));
        assert!(!stopped.is_truncated(5));
    }

    #[test]
    fn outcome_serializes_with_kind_tag() {
        let outcome = Outcome::StoppedOut {
            resolved_at: at(2),
            resolution_price: 91.18,
        };
        let json = serde_json::to_string(&outcome).unwrap();
        assert!(json.contains("\"kind\":\"stopped_out\""));
        let back: Outcome = serde_json::from_str(&json).unwrap();
        assert_eq!(outcome, back);
    }
}
