//! # Radius Curves
//!
//! Named profile curves mapping a normalized position along a stem to a
//! normalized radius. Curves are cubic splines over `x ∈ [0, 1]`.

use crate::error::PlantError;
use crate::spline::Spline;
use glam::DVec3;
use serde::{Deserialize, Serialize};

/// A named radius profile.
///
/// # Example
///
/// ```rust
/// use plant_tree::Curve;
///
/// let curve = Curve::falloff("default");
/// assert!((curve.evaluate(0.0) - 1.0).abs() < 1e-12);
/// assert!((curve.evaluate(0.5) - 0.5).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Curve {
    name: String,
    spline: Spline,
}

impl Curve {
    /// Creates a curve from a cubic spline whose control x coordinates
    /// increase along the chain.
    pub fn new(name: impl Into<String>, spline: Spline) -> Result<Self, PlantError> {
        if spline.degree() != 3 || spline.curve_count() == 0 {
            return Err(PlantError::invalid_spline(
                "radius curves must be non-empty cubic splines",
            ));
        }
        Ok(Self {
            name: name.into(),
            spline,
        })
    }

    /// Straight falloff from 1 at the base to 0 at the tip.
    pub fn falloff(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            spline: straight(1.0, 0.0),
        }
    }

    /// Constant profile at full radius.
    pub fn constant(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            spline: straight(1.0, 1.0),
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    #[inline]
    pub fn spline(&self) -> &Spline {
        &self.spline
    }

    /// Evaluates the profile at `x`, clamped to `[0, 1]`.
    ///
    /// The cubic segment whose control x-range contains `x` is interpolated
    /// with a parameter proportional to the x offset inside that range.
    pub fn evaluate(&self, x: f64) -> f64 {
        let x = x.clamp(0.0, 1.0);
        let controls = self.spline.controls();
        let count = self.spline.curve_count();
        for curve in 0..count {
            let start = controls[curve * 3].x;
            let end = controls[curve * 3 + 3].x;
            if x <= end || curve + 1 == count {
                let span = end - start;
                let t = if span > 0.0 {
                    ((x - start) / span).clamp(0.0, 1.0)
                } else {
                    0.0
                };
                return self.spline.point(curve, t).y.clamp(0.0, 1.0);
            }
        }
        0.0
    }
}

fn straight(from: f64, to: f64) -> Spline {
    let controls = (0..4)
        .map(|i| {
            let t = i as f64 / 3.0;
            DVec3::new(t, from + (to - from) * t, 0.0)
        })
        .collect();
    Spline::cubic(controls).unwrap_or_default()
}
