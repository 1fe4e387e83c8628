//! # Spline
//!
//! Piecewise linear or cubic Bezier curves described by control points.
//! A degree-3 spline stores its curves back to back: controls
//! `3k..=3k+3` describe curve `k`, sharing end points with neighbours.

use crate::error::PlantError;
use crate::math::{cubic_bezier, linear_bezier};
use glam::DVec3;
use serde::{Deserialize, Serialize};

/// An ordered sequence of control points of degree 1 or 3.
///
/// # Example
///
/// ```rust
/// use glam::DVec3;
/// use plant_tree::Spline;
///
/// let spline = Spline::linear(vec![DVec3::ZERO, DVec3::X, DVec3::new(1.0, 1.0, 0.0)]).unwrap();
/// assert_eq!(spline.curve_count(), 2);
/// assert_eq!(spline.point(1, 0.5), DVec3::new(1.0, 0.5, 0.0));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spline {
    controls: Vec<DVec3>,
    degree: usize,
}

impl Default for Spline {
    fn default() -> Self {
        Self {
            controls: Vec::new(),
            degree: 1,
        }
    }
}

impl Spline {
    /// Creates a spline, validating the degree and control count.
    ///
    /// # Arguments
    ///
    /// * `degree` - 1 (polyline) or 3 (cubic Bezier chain)
    /// * `controls` - control points; a cubic chain needs `3n + 1` of them
    pub fn new(degree: usize, controls: Vec<DVec3>) -> Result<Self, PlantError> {
        validate(degree, &controls)?;
        Ok(Self { controls, degree })
    }

    /// Creates a polyline spline.
    pub fn linear(controls: Vec<DVec3>) -> Result<Self, PlantError> {
        Self::new(1, controls)
    }

    /// Creates a cubic Bezier chain.
    pub fn cubic(controls: Vec<DVec3>) -> Result<Self, PlantError> {
        Self::new(3, controls)
    }

    /// Replaces the control points, keeping the degree.
    pub fn set_controls(&mut self, controls: Vec<DVec3>) -> Result<(), PlantError> {
        validate(self.degree, &controls)?;
        self.controls = controls;
        Ok(())
    }

    /// Appends a control point to a polyline.
    pub fn add_control(&mut self, control: DVec3) -> Result<(), PlantError> {
        if self.degree != 1 {
            return Err(PlantError::invalid_spline(
                "single controls can only be appended to linear splines",
            ));
        }
        self.controls.push(control);
        Ok(())
    }

    #[inline]
    pub fn controls(&self) -> &[DVec3] {
        &self.controls
    }

    #[inline]
    pub fn degree(&self) -> usize {
        self.degree
    }

    /// Number of curves described by the control points.
    pub fn curve_count(&self) -> usize {
        if self.controls.is_empty() {
            0
        } else {
            (self.controls.len() - 1) / self.degree
        }
    }

    /// Evaluates curve `curve` at parameter `t` in `[0, 1]`.
    ///
    /// Curves past the end are clamped to the last one. An empty spline
    /// evaluates to the origin and a single control to itself.
    pub fn point(&self, curve: usize, t: f64) -> DVec3 {
        match self.controls.len() {
            0 => return DVec3::ZERO,
            1 => return self.controls[0],
            _ => {}
        }
        let curve = curve.min(self.curve_count().saturating_sub(1));
        let c = &self.controls[curve * self.degree..];
        match self.degree {
            3 => cubic_bezier(t, c[0], c[1], c[2], c[3]),
            _ => linear_bezier(t, c[0], c[1]),
        }
    }

    /// Evaluates the spline at `t` in `[0, curve_count]`, where the integer
    /// part selects the curve.
    pub fn point_at(&self, t: f64) -> DVec3 {
        let count = self.curve_count();
        if count == 0 {
            return self.point(0, 0.0);
        }
        let t = t.clamp(0.0, count as f64);
        let curve = (t.floor() as usize).min(count - 1);
        self.point(curve, t - curve as f64)
    }

    /// Tangent at the end of the first curve, or zero for polylines.
    pub fn first_curve_end_tangent(&self) -> DVec3 {
        if self.degree == 3 && self.controls.len() >= 4 {
            self.controls[3] - self.controls[2]
        } else {
            DVec3::ZERO
        }
    }
}

fn validate(degree: usize, controls: &[DVec3]) -> Result<(), PlantError> {
    match degree {
        1 => Ok(()),
        3 if controls.is_empty() || controls.len() % 3 == 1 => Ok(()),
        3 => Err(PlantError::invalid_spline(format!(
            "a cubic spline needs 3n + 1 controls, got {}",
            controls.len()
        ))),
        _ => Err(PlantError::invalid_spline(format!(
            "unsupported degree {degree}"
        ))),
    }
}
