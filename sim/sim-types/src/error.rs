//! Error types for residual and cost evaluation.

use thiserror::Error;

use crate::FrameId;

/// Errors that can occur while evaluating residuals, activations and costs.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SimError {
    /// A vector or matrix did not have the dimension the model was built for.
    #[error("dimension mismatch for {what}: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Which quantity was malformed (e.g. "control", "state").
        what: &'static str,
        /// Dimension the model was configured with.
        expected: usize,
        /// Dimension that was supplied.
        actual: usize,
    },

    /// The normal contact force is too small to locate a centre of pressure.
    #[error("degenerate contact: normal force {normal_force} below threshold {threshold}")]
    DegenerateContact {
        /// Vertical component of the world-frame contact force.
        normal_force: f64,
        /// Threshold configured on the residual.
        threshold: f64,
    },

    /// Derivatives were requested before the data was evaluated.
    #[error("{what} has not been evaluated; call calc before calc_diff")]
    NotEvaluated {
        /// Which data object was stale.
        what: &'static str,
    },

    /// The data collector does not provide the contact a model needs.
    #[error("no contact registered for {0}")]
    ContactNotFound(FrameId),

    /// A shared collector lock was poisoned by a panicking writer.
    #[error("contact collector lock poisoned")]
    CollectorPoisoned,

    /// Invalid configuration.
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// Description of the configuration error.
        reason: String,
    },

    /// Invalid contact or footprint geometry.
    #[error("invalid geometry: {reason}")]
    InvalidGeometry {
        /// Description of what's wrong.
        reason: String,
    },

    /// A cost term with this name already exists.
    #[error("duplicate cost term: {name}")]
    DuplicateCost {
        /// Name of the existing term.
        name: String,
    },

    /// No cost term with this name exists.
    #[error("cost term not found: {name}")]
    CostNotFound {
        /// Name that was looked up.
        name: String,
    },
}

impl SimError {
    /// Create a dimension mismatch error.
    #[must_use]
    pub fn dimension(what: &'static str, expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch {
            what,
            expected,
            actual,
        }
    }

    /// Create an invalid configuration error.
    #[must_use]
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Create an invalid geometry error.
    #[must_use]
    pub fn invalid_geometry(reason: impl Into<String>) -> Self {
        Self::InvalidGeometry {
            reason: reason.into(),
        }
    }

    /// Check if this is a precondition (dimension) violation.
    #[must_use]
    pub fn is_dimension_mismatch(&self) -> bool {
        matches!(self, Self::DimensionMismatch { .. })
    }

    /// Check if this is a configuration error.
    #[must_use]
    pub fn is_config_error(&self) -> bool {
        matches!(self, Self::InvalidConfig { .. })
    }
}

/// Check that a slice-like quantity has the expected length.
///
/// # Errors
///
/// Returns [`SimError::DimensionMismatch`] when `actual != expected`.
pub fn ensure_dimension(what: &'static str, expected: usize, actual: usize) -> crate::Result<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(SimError::dimension(what, expected, actual))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SimError::dimension("control", 3, 2);
        let msg = err.to_string();
        assert!(msg.contains("control"));
        assert!(msg.contains('3'));
        assert!(msg.contains('2'));

        let err = SimError::ContactNotFound(FrameId::new(7));
        assert!(err.to_string().contains('7'));

        let err = SimError::DegenerateContact {
            normal_force: 1e-9,
            threshold: 1e-6,
        };
        assert!(err.to_string().contains("degenerate"));
    }

    #[test]
    fn test_error_predicates() {
        let err = SimError::dimension("state", 4, 5);
        assert!(err.is_dimension_mismatch());
        assert!(!err.is_config_error());

        let err = SimError::invalid_config("eps must be positive");
        assert!(err.is_config_error());
        assert!(!err.is_dimension_mismatch());
    }

    #[test]
    fn test_ensure_dimension() {
        assert!(ensure_dimension("residual", 3, 3).is_ok());
        assert_eq!(
            ensure_dimension("residual", 3, 2),
            Err(SimError::dimension("residual", 3, 2))
        );
    }
}
