use serde::Serialize;

use crate::error::EngineError;

/// Severity of an odometer decision. `Warn` is advisory and never blocks;
/// `Block` is reserved for the one physically impossible case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Ok,
    Warn,
    Block,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Decision {
    pub severity: Severity,
    pub message: Option<String>,
}

impl Decision {
    fn ok() -> Self {
        Self {
            severity: Severity::Ok,
            message: None,
        }
    }

    fn warn(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warn,
            message: Some(message.into()),
        }
    }

    fn block(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Block,
            message: Some(message.into()),
        }
    }
}

/// Pure validation of kilometre readings.
///
/// Coherence is soft almost everywhere: a start below the last known
/// reading only warns, because meter replacements and manual corrections
/// are legitimate. The single hard rule is that a trip can never end below
/// the reading it started at.
#[derive(Debug, Clone, Copy, Default)]
pub struct OdometerPolicy;

impl OdometerPolicy {
    /// `reference_last` is the vehicle's last known reading; zero means
    /// unknown and disables the plausibility warning.
    pub fn validate_start(
        &self,
        candidate: f64,
        reference_last: f64,
    ) -> Result<Decision, EngineError> {
        require_positive(candidate, "start odometer")?;
        if reference_last > 0.0 && candidate < reference_last {
            return Ok(Decision::warn(format!(
                "start odometer {candidate} is below the last known reading {reference_last}"
            )));
        }
        Ok(Decision::ok())
    }

    pub fn validate_end(&self, candidate: f64, start: f64) -> Result<Decision, EngineError> {
        require_positive(candidate, "end odometer")?;
        if candidate < start {
            return Ok(Decision::block(format!(
                "end odometer {candidate} is below start odometer {start}"
            )));
        }
        Ok(Decision::ok())
    }
}

fn require_positive(candidate: f64, what: &str) -> Result<(), EngineError> {
    if !candidate.is_finite() {
        return Err(EngineError::InvalidInput(format!(
            "{what} must be a finite number"
        )));
    }
    if candidate <= 0.0 {
        return Err(EngineError::InvalidInput(format!(
            "{what} must be greater than zero, got {candidate}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_below_last_reading_warns_but_does_not_block() {
        let policy = OdometerPolicy;
        let decision = policy.validate_start(100.0, 500.0).unwrap();
        assert_eq!(decision.severity, Severity::Warn);
        assert!(decision.message.unwrap().contains("500"));
    }

    #[test]
    fn start_with_unknown_reference_is_ok() {
        let policy = OdometerPolicy;
        let decision = policy.validate_start(100.0, 0.0).unwrap();
        assert_eq!(decision.severity, Severity::Ok);
    }

    #[test]
    fn start_at_or_above_reference_is_ok() {
        let policy = OdometerPolicy;
        assert_eq!(
            policy.validate_start(500.0, 500.0).unwrap().severity,
            Severity::Ok
        );
        assert_eq!(
            policy.validate_start(501.0, 500.0).unwrap().severity,
            Severity::Ok
        );
    }

    #[test]
    fn nonpositive_or_nonfinite_start_is_rejected() {
        let policy = OdometerPolicy;
        assert!(matches!(
            policy.validate_start(0.0, 0.0),
            Err(EngineError::InvalidInput(_))
        ));
        assert!(matches!(
            policy.validate_start(-5.0, 0.0),
            Err(EngineError::InvalidInput(_))
        ));
        assert!(matches!(
            policy.validate_start(f64::NAN, 0.0),
            Err(EngineError::InvalidInput(_))
        ));
    }

    #[test]
    fn end_below_start_is_the_only_block() {
        let policy = OdometerPolicy;
        let decision = policy.validate_end(50.0, 100.0).unwrap();
        assert_eq!(decision.severity, Severity::Block);
        assert_eq!(
            policy.validate_end(100.0, 100.0).unwrap().severity,
            Severity::Ok
        );
        assert_eq!(
            policy.validate_end(150.0, 100.0).unwrap().severity,
            Severity::Ok
        );
    }

    #[test]
    fn nonpositive_end_is_rejected_before_the_block_rule() {
        let policy = OdometerPolicy;
        assert!(matches!(
            policy.validate_end(0.0, 100.0),
            Err(EngineError::InvalidInput(_))
        ));
    }
}
