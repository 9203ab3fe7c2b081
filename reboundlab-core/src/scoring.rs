//! Outcome summary and the search objective.
//!
//! `score = recovered × gain − stopped_out × stop_loss − unresolved × mean|drift|`
//! where drift is `(last_observed_price − event_low) / event_low` over the
//! unresolved outcomes (0 when there are none).

use serde::{Deserialize, Serialize};

use crate::domain::{Outcome, ResolvedEvent, RuleParameters};

/// Outcome counts and score for one instrument under one parameter set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeSummary {
    pub instrument: String,
    pub recovered: usize,
    pub stopped_out: usize,
    pub unresolved: usize,
    /// Signed mean drift of unresolved outcomes, as a fraction.
    pub avg_unresolved_change: f64,
    /// Mean absolute drift of unresolved outcomes, as a fraction.
    pub avg_abs_unresolved_drift: f64,
    pub score: f64,
}

impl OutcomeSummary {
    pub fn from_resolved(
        instrument: &str,
        resolved: &[ResolvedEvent],
        params: &RuleParameters,
    ) -> Self {
        let mut recovered = 0;
        let mut stopped_out = 0;
        let mut drifts = Vec::new();

        for r in resolved {
            match &r.outcome {
                Outcome::Recovered { .. } => recovered += 1,
                Outcome::StoppedOut { .. } => stopped_out += 1,
                Outcome::Unresolved {
                    last_observed_price,
                    ..
                } => {
                    let low = r.event.event_low;
                    drifts.push((last_observed_price - low) / low);
                }
            }
        }

        let unresolved = drifts.len();
        let (avg_unresolved_change, avg_abs_unresolved_drift) = if unresolved == 0 {
            (0.0, 0.0)
        } else {
            let n = unresolved as f64;
            (
                drifts.iter().sum::<f64>() / n,
                drifts.iter().map(|d| d.abs()).sum::<f64>() / n,
            )
        };

        let stop_loss = params.stop_loss_threshold.unwrap_or(0.0);
        let score = recovered as f64 * params.gain_threshold
            - stopped_out as f64 * stop_loss
            - unresolved as f64 * avg_abs_unresolved_drift;

        Self {
            instrument: instrument.to_string(),
            recovered,
            stopped_out,
            unresolved,
            avg_unresolved_change,
            avg_abs_unresolved_drift,
            score,
        }
    }

    pub fn event_count(&self) -> usize {
        self.recovered + self.stopped_out + self.unresolved
    }

    /// Fraction of events that recovered (0 when there were none).
    pub fn recovery_rate(&self) -> f64 {
        match self.event_count() {
            0 => 0.0,
            n => self.recovered as f64 / n as f64,
        }
    }
}

/// Score a set of resolved events.
pub fn score(resolved: &[ResolvedEvent], params: &RuleParameters) -> f64 {
    OutcomeSummary::from_resolved("", resolved, params).score
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DropEvent;
    use chrono::{NaiveDate, NaiveDateTime};

    fn at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn resolved(outcome: Outcome) -> ResolvedEvent {
        ResolvedEvent {
            event: DropEvent {
                instrument: "TSLA".into(),
                detected_at: at(),
                bar_index: 0,
                reference_open: 100.0,
                event_low: 100.0,
                drop_fraction: -0.05,
            },
            outcome,
        }
    }

    fn unresolved(price: f64) -> ResolvedEvent {
        resolved(Outcome::Unresolved {
            last_observed_price: price,
            last_observed_at: at(),
            bars_observed: 10,
        })
    }

    fn params() -> RuleParameters {
        RuleParameters {
            drop_threshold: 0.05,
            gain_threshold: 0.04,
            stop_loss_threshold: Some(0.03),
            horizon: 10,
        }
    }

    #[test]
    fn score_combines_all_outcomes() {
        let events = vec![
            resolved(Outcome::Recovered {
                resolved_at: at(),
                resolution_price: 104.0,
                realized_gain: 0.04,
            }),
            resolved(Outcome::Recovered {
                resolved_at: at(),
                resolution_price: 104.0,
                realized_gain: 0.04,
            }),
            resolved(Outcome::StoppedOut {
                resolved_at: at(),
                resolution_price: 97.0,
            }),
            unresolved(102.0),
            unresolved(96.0),
        ];
        let summary = OutcomeSummary::from_resolved("TSLA", &events, &params());

        assert_eq!(summary.recovered, 2);
        assert_eq!(summary.stopped_out, 1);
        assert_eq!(summary.unresolved, 2);
        // drifts: +0.02, -0.04 → signed mean -0.01, absolute mean 0.03
        assert!((summary.avg_unresolved_change + 0.01).abs() < 1e-12);
        assert!((summary.avg_abs_unresolved_drift - 0.03).abs() < 1e-12);
        let expected = 2.0 * 0.04 - 0.03 - 2.0 * 0.03;
        assert!((summary.score - expected).abs() < 1e-12);
    }

    #[test]
    fn no_events_scores_zero() {
        let summary = OutcomeSummary::from_resolved("TSLA", &[], &params());
        assert_eq!(summary.score, 0.0);
        assert_eq!(summary.recovery_rate(), 0.0);
    }

    #[test]
    fn score_helper_matches_summary() {
        let events = vec![unresolved(95.0)];
        assert!((score(&events, &params()) + 0.05).abs() < 1e-12);
    }
}
