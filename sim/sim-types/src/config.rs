//! Configuration types for residual evaluation.
//!
//! This module provides the knobs that control numerically delicate parts of
//! cost evaluation: how a centre of pressure is handled when the contact is
//! unloaded, and how finite-difference verification perturbs its inputs.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Configuration for centre-of-pressure residuals.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CopConfig {
    /// Normal forces with `|f_z|` strictly below this are treated as unloaded (N).
    pub min_normal_force: f64,
    /// What to do when the contact is unloaded.
    pub degenerate_policy: DegenerateCopPolicy,
}

impl Default for CopConfig {
    fn default() -> Self {
        Self {
            min_normal_force: 1e-6,
            degenerate_policy: DegenerateCopPolicy::FootOrigin,
        }
    }
}

impl CopConfig {
    /// Create a configuration with the given normal-force threshold.
    #[must_use]
    pub fn with_min_normal_force(min_normal_force: f64) -> Self {
        Self {
            min_normal_force,
            ..Default::default()
        }
    }

    /// Configuration that refuses to evaluate unloaded contacts.
    #[must_use]
    pub fn strict() -> Self {
        Self {
            degenerate_policy: DegenerateCopPolicy::Error,
            ..Default::default()
        }
    }

    /// Set the degenerate-contact policy.
    #[must_use]
    pub fn degenerate_policy(mut self, policy: DegenerateCopPolicy) -> Self {
        self.degenerate_policy = policy;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> crate::Result<()> {
        if !self.min_normal_force.is_finite() || self.min_normal_force < 0.0 {
            return Err(crate::SimError::invalid_config(
                "min_normal_force must be finite and non-negative",
            ));
        }
        Ok(())
    }

    /// Whether a world-frame normal force is too small to locate a CoP.
    ///
    /// An exactly zero force is always degenerate, even with a zero threshold.
    #[must_use]
    pub fn is_degenerate(&self, normal_force: f64) -> bool {
        let magnitude = normal_force.abs();
        !magnitude.is_finite() || magnitude == 0.0 || magnitude < self.min_normal_force
    }
}

/// Handling of a centre of pressure when the normal force vanishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum DegenerateCopPolicy {
    /// Place the CoP at the foot frame origin and zero its derivatives.
    #[default]
    FootOrigin,
    /// Fail with [`crate::SimError::DegenerateContact`].
    Error,
}

impl std::fmt::Display for DegenerateCopPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FootOrigin => write!(f, "foot origin"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Axes and origin a centre-of-pressure residual is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum CopFrame {
    /// `r = foot position − CoP offset`, world-aligned axes.
    #[default]
    World,
    /// `r = Rᵀ (foot − CoP)` with the CoP as a world point and `R` the
    /// contact frame rotation: the CoP offset from the foot in sole axes.
    Sole,
}

impl std::fmt::Display for CopFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::World => write!(f, "world"),
            Self::Sole => write!(f, "sole"),
        }
    }
}

/// Configuration for finite-difference derivative checks.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FiniteDiffConfig {
    /// Perturbation size.
    pub eps: f64,
    /// Use centred differences (`O(eps²)`) instead of forward (`O(eps)`).
    pub centered: bool,
}

impl Default for FiniteDiffConfig {
    fn default() -> Self {
        Self {
            eps: 1e-6,
            centered: true,
        }
    }
}

impl FiniteDiffConfig {
    /// Largest perturbation accepted by [`FiniteDiffConfig::validate`].
    pub const MAX_EPS: f64 = 1e-2;

    /// Forward differences, one evaluation per column.
    #[must_use]
    pub fn forward() -> Self {
        Self {
            eps: 1e-7,
            centered: false,
        }
    }

    /// Set the perturbation size.
    #[must_use]
    pub fn eps(mut self, eps: f64) -> Self {
        self.eps = eps;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> crate::Result<()> {
        if !self.eps.is_finite() || self.eps <= 0.0 {
            return Err(crate::SimError::invalid_config("eps must be positive"));
        }
        if self.eps > Self::MAX_EPS {
            return Err(crate::SimError::invalid_config(format!(
                "eps {} exceeds {}",
                self.eps,
                Self::MAX_EPS
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_default_cop_config() {
        let config = CopConfig::default();
        assert!(config.validate().is_ok());
        assert_relative_eq!(config.min_normal_force, 1e-6);
        assert_eq!(config.degenerate_policy, DegenerateCopPolicy::FootOrigin);
    }

    #[test]
    fn test_cop_config_presets() {
        let strict = CopConfig::strict();
        assert_eq!(strict.degenerate_policy, DegenerateCopPolicy::Error);

        let loose =
            CopConfig::with_min_normal_force(0.5).degenerate_policy(DegenerateCopPolicy::Error);
        assert_relative_eq!(loose.min_normal_force, 0.5);
        assert_eq!(loose.degenerate_policy, DegenerateCopPolicy::Error);
    }

    #[test]
    fn test_cop_config_validation() {
        let mut config = CopConfig::default();
        config.min_normal_force = -1.0;
        assert!(config.validate().is_err());
        config.min_normal_force = f64::NAN;
        assert!(config.validate().is_err());
        config.min_normal_force = 0.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_is_degenerate() {
        let config = CopConfig::default();
        assert!(config.is_degenerate(0.0));
        assert!(config.is_degenerate(-1e-9));
        assert!(config.is_degenerate(f64::NAN));
        assert!(!config.is_degenerate(10.0));
        assert!(!config.is_degenerate(-10.0));

        let zero_threshold = CopConfig::with_min_normal_force(0.0);
        assert!(zero_threshold.is_degenerate(0.0));
        assert!(!zero_threshold.is_degenerate(1e-12));
    }

    #[test]
    fn test_cop_frame_default_and_display() {
        assert_eq!(CopFrame::default(), CopFrame::World);
        assert_eq!(CopFrame::Sole.to_string(), "sole");
    }

    #[test]
    fn test_finite_diff_validation() {
        assert!(FiniteDiffConfig::default().validate().is_ok());
        assert!(FiniteDiffConfig::forward().validate().is_ok());
        assert!(FiniteDiffConfig::default().eps(0.0).validate().is_err());
        assert!(FiniteDiffConfig::default().eps(-1e-6).validate().is_err());
        assert!(FiniteDiffConfig::default().eps(0.1).validate().is_err());
        assert!(FiniteDiffConfig::default().eps(1e-2).validate().is_ok());
    }
}
