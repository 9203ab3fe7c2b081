//! Detection + resolution over one series under one parameter set.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::detector::{detect, detect_until, ReferenceOpenPolicy};
use crate::domain::{PriceSeries, ResolvedEvent, RuleParameters};
use crate::resolver::{resolve_all, ForwardWindow};
use crate::scoring::OutcomeSummary;

/// How a series is read: reference open, horizon counting, detection cutoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EvaluationSettings {
    pub reference: ReferenceOpenPolicy,
    pub window: ForwardWindow,
    /// Last calendar day on which events may be detected. Later bars only
    /// serve as forward data.
    pub detect_until: Option<NaiveDate>,
}

impl EvaluationSettings {
    pub fn until(self, end: NaiveDate) -> Self {
        Self {
            detect_until: Some(end),
            ..self
        }
    }
}

/// Detect events and resolve each one, in chronological order.
pub fn evaluate(
    series: &PriceSeries,
    params: &RuleParameters,
    settings: &EvaluationSettings,
) -> Vec<ResolvedEvent> {
    let events = match settings.detect_until {
        Some(end) => detect_until(series, settings.reference, params.drop_threshold, end),
        None => detect(series, settings.reference, params.drop_threshold),
    };
    resolve_all(series, events, params, settings.window)
}

/// Evaluate and summarize in one step.
pub fn summarize(
    series: &PriceSeries,
    params: &RuleParameters,
    settings: &EvaluationSettings,
) -> OutcomeSummary {
    let resolved = evaluate(series, params, settings);
    OutcomeSummary::from_resolved(&series.instrument, &resolved, params)
}
