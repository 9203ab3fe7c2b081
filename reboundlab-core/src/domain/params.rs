//! Rule parameters and their validation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration errors. Fatal, raised before any simulation or trial runs.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParamError {
    #[error("invalid parameters: {field} = {value} must lie in {expected}")]
    OutOfRange {
        field: &'static str,
        value: f64,
        expected: &'static str,
    },
    #[error("invalid parameters: horizon must be at least 1 bar")]
    ZeroHorizon,
    #[error("invalid parameters: trial count must be at least 1")]
    ZeroTrials,
    #[error("invalid parameters: range for {field} is inverted ({min} > {max})")]
    InvertedRange {
        field: &'static str,
        min: f64,
        max: f64,
    },
}

/// Parameters of the drawdown/recovery rule. Immutable per simulation run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RuleParameters {
    /// Fraction below the reference open that qualifies as a drop, in (0, 1).
    pub drop_threshold: f64,
    /// Gain above the event low that counts as recovery, in (0, ∞).
    pub gain_threshold: f64,
    /// Loss below the event low that stops the position out, in (0, 1).
    /// `None` disables the stop-loss.
    pub stop_loss_threshold: Option<f64>,
    /// Number of forward bars examined after an event.
    pub horizon: usize,
}

impl RuleParameters {
    pub fn validate(&self) -> Result<(), ParamError> {
        check_unit_open("drop_threshold", self.drop_threshold)?;
        check_positive("gain_threshold", self.gain_threshold)?;
        if let Some(stop) = self.stop_loss_threshold {
            check_unit_open("stop_loss_threshold", stop)?;
        }
        if self.horizon == 0 {
            return Err(ParamError::ZeroHorizon);
        }
        Ok(())
    }
}

/// Reject anything outside the open interval (0, 1), NaN included.
pub fn check_unit_open(field: &'static str, value: f64) -> Result<(), ParamError> {
    if value > 0.0 && value < 1.0 {
        Ok(())
    } else {
        Err(ParamError::OutOfRange {
            field,
            value,
            expected: "(0, 1)",
        })
    }
}

/// Reject anything that is not a finite positive number.
pub fn check_positive(field: &'static str, value: f64) -> Result<(), ParamError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ParamError::OutOfRange {
            field,
            value,
            expected: "(0, inf)",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> RuleParameters {
        RuleParameters {
            drop_threshold: 0.05,
            gain_threshold: 0.02,
            stop_loss_threshold: Some(0.03),
            horizon: 5,
        }
    }

    #[test]
    fn valid_parameters_pass() {
        assert!(params().validate().is_ok());
    }

    #[test]
    fn gain_above_one_is_allowed() {
        let p = RuleParameters {
            gain_threshold: 1.5,
            ..params()
        };
        assert!(p.validate().is_ok());
    }

    #[test]
    fn drop_outside_unit_interval_rejected() {
        for bad in [0.0, 1.0, -0.1, f64::NAN] {
            let p = RuleParameters {
                drop_threshold: bad,
                ..params()
            };
            assert!(matches!(
                p.validate(),
                Err(ParamError::OutOfRange { field: "drop_threshold", .. })
            ));
        }
    }

    #[test]
    fn disabled_stop_loss_is_valid() {
        let p = RuleParameters {
            stop_loss_threshold: None,
            ..params()
        };
        assert!(p.validate().is_ok());
    }

    #[test]
    fn zero_horizon_rejected() {
        let p = RuleParameters {
            horizon: 0,
            ..params()
        };
        assert_eq!(p.validate(), Err(ParamError::ZeroHorizon));
    }
}
