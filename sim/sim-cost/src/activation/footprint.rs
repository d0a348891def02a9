//! Rectangular footprint activation.
//!
//! Penalises how far the first two residual components leave the rectangle
//! `[-hx, hx] × [-hy, hy]`. Each side of the rectangle is a one-sided hinge
//! `s(m)` on the margin `m` by which the point crosses it:
//!
//! ```text
//! a(r) = ½ Σ_{i ∈ {x, y}} [ s(rᵢ − hᵢ)² + s(−rᵢ − hᵢ)² ]
//! s(m) = ½ (m + sqrt(m² + δ²))
//! ```
//!
//! With `δ = 0` the hinge is exactly `max(m, 0)`, so the activation is zero
//! on the footprint and `½ (dx² + dy²)` outside it, where `d` is the distance
//! past the edge. A positive `δ` rounds the corners of the hinge so the
//! Hessian is continuous; the price is a small non-zero value near the edges.
//! Residual components past the first two are ignored, so the residual must
//! put its point in the rectangle's own axes, like a CoP residual in the sole
//! frame.

use nalgebra::{DVector, Vector2};
use sim_contact::FootGeometry;
use sim_types::{Result, SimError};

use super::{check_inputs, Activation, ActivationData};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Smoothed penalty on leaving a centred rectangle.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Footprint {
    nr: usize,
    half_extents: Vector2<f64>,
    smoothing: f64,
}

impl Footprint {
    /// Create a footprint activation with half extents `(hx, hy)` and hinge
    /// smoothing `δ ≥ 0`.
    pub fn new(nr: usize, hx: f64, hy: f64, smoothing: f64) -> Result<Self> {
        if nr < 2 {
            return Err(SimError::invalid_config(format!(
                "footprint activation needs at least 2 residual components, got {nr}"
            )));
        }
        if !hx.is_finite() || !hy.is_finite() || hx < 0.0 || hy < 0.0 {
            return Err(SimError::invalid_geometry(format!(
                "footprint half extents must be finite and non-negative, got ({hx}, {hy})"
            )));
        }
        if !smoothing.is_finite() || smoothing < 0.0 {
            return Err(SimError::invalid_config(format!(
                "footprint smoothing must be finite and non-negative, got {smoothing}"
            )));
        }
        Ok(Self {
            nr,
            half_extents: Vector2::new(hx, hy),
            smoothing,
        })
    }

    /// Footprint of a foot sole for a 3D centre-of-pressure residual.
    pub fn from_foot(foot: &FootGeometry, smoothing: f64) -> Result<Self> {
        foot.validate()?;
        let half = foot.half_extents();
        Self::new(3, half.x, half.y, smoothing)
    }

    /// Half extents `(hx, hy)`.
    #[must_use]
    pub fn half_extents(&self) -> Vector2<f64> {
        self.half_extents
    }

    /// Hinge smoothing `δ`.
    #[must_use]
    pub fn smoothing(&self) -> f64 {
        self.smoothing
    }

    /// `(s, s', s'')` of the smooth hinge at margin `m`.
    fn hinge(&self, m: f64) -> (f64, f64, f64) {
        if self.smoothing == 0.0 {
            return if m > 0.0 { (m, 1.0, 0.0) } else { (0.0, 0.0, 0.0) };
        }
        let d2 = self.smoothing * self.smoothing;
        let root = (m * m + d2).sqrt();
        let s = 0.5 * (m + root);
        let ds = 0.5 * (1.0 + m / root);
        let dds = 0.5 * d2 / (root * root * root);
        (s, ds, dds)
    }

    /// `(g, g', g'')` of one side's penalty `g(m) = s(m)² / 2`.
    fn side(&self, m: f64) -> (f64, f64, f64) {
        let (s, ds, dds) = self.hinge(m);
        (0.5 * s * s, s * ds, ds * ds + s * dds)
    }
}

impl Activation for Footprint {
    fn nr(&self) -> usize {
        self.nr
    }

    fn calc(&self, data: &mut ActivationData, r: &DVector<f64>) -> Result<()> {
        check_inputs(self.nr, data, r)?;
        data.value = (0..2)
            .map(|i| {
                let h = self.half_extents[i];
                self.side(r[i] - h).0 + self.side(-r[i] - h).0
            })
            .sum();
        Ok(())
    }

    fn calc_diff(&self, data: &mut ActivationData, r: &DVector<f64>) -> Result<()> {
        check_inputs(self.nr, data, r)?;
        data.gradient.fill(0.0);
        data.hessian.fill(0.0);
        for i in 0..2 {
            let h = self.half_extents[i];
            let (_, dp, ddp) = self.side(r[i] - h);
            let (_, dm, ddm) = self.side(-r[i] - h);
            data.gradient[i] = dp - dm;
            data.hessian[(i, i)] = ddp + ddm;
        }
        Ok(())
    }
}
