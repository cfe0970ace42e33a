//! # Errors
//!
//! $$
//! \text{call} \mapsto \text{Ok}(\text{paths}) \mid \text{Err}(\text{contract violation})
//! $$
//!
//! Every failure is a caller contract violation detected at call time. Nothing is retried.

use thiserror::Error;

/// Errors raised by the simulators, the noise generators and the fitters.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimError {
  /// The time grid cannot be resolved, or mutually exclusive options disagree.
  #[error("Configuration error: {0}")]
  Configuration(String),

  /// An array axis does not match the step, simulation or asset count.
  #[error("Shape mismatch for `{name}`: expected {expected}, got {got}")]
  Shape {
    /// Name of the offending input
    name: String,
    /// Expected shape
    expected: String,
    /// Actual shape
    got: String,
  },

  /// A scalar input lies outside its domain.
  #[error("Invalid value for `{name}`: {reason}")]
  InvalidValue {
    /// Name of the offending input
    name: String,
    /// Why the value was rejected
    reason: String,
  },

  /// Not enough observations to fit a model.
  #[error("Insufficient data: need at least {required} observations, got {provided}")]
  InsufficientData {
    /// Minimum number of observations
    required: usize,
    /// Number of usable observations
    provided: usize,
  },

  /// An estimator produced a degenerate quantity.
  #[error("Numerical error: {0}")]
  Numerical(String),
}

impl SimError {
  pub(crate) fn shape(name: &str, expected: impl ToString, got: impl ToString) -> Self {
    SimError::Shape {
      name: name.to_string(),
      expected: expected.to_string(),
      got: got.to_string(),
    }
  }

  pub(crate) fn invalid(name: &str, reason: impl ToString) -> Self {
    SimError::InvalidValue {
      name: name.to_string(),
      reason: reason.to_string(),
    }
  }
}

pub type Result<T> = std::result::Result<T, SimError>;
