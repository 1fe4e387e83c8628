//! # Math Helpers
//!
//! Bezier evaluation and rotation helpers shared by paths, curves and the
//! mesh generator.

use glam::{DQuat, DVec3};

/// Linear Bezier between `a` and `b`.
#[inline]
pub fn linear_bezier(t: f64, a: DVec3, b: DVec3) -> DVec3 {
    a + (b - a) * t
}

/// Quadratic Bezier through control points `a`, `b`, `c`.
#[inline]
pub fn quadratic_bezier(t: f64, a: DVec3, b: DVec3, c: DVec3) -> DVec3 {
    let s = 1.0 - t;
    a * (s * s) + b * (2.0 * s * t) + c * (t * t)
}

/// Cubic Bezier through control points `a`, `b`, `c`, `d`.
#[inline]
pub fn cubic_bezier(t: f64, a: DVec3, b: DVec3, c: DVec3, d: DVec3) -> DVec3 {
    let s = 1.0 - t;
    a * (s * s * s) + b * (3.0 * s * s * t) + c * (3.0 * s * t * t) + d * (t * t * t)
}

/// Minimal rotation that turns direction `from` into direction `to`.
///
/// Inputs need not be normalized. Zero-length input yields the identity.
/// Opposite directions rotate half a turn around an arbitrary perpendicular
/// axis.
///
/// # Example
///
/// ```rust
/// use glam::DVec3;
/// use plant_tree::math::rotate_into;
///
/// let q = rotate_into(DVec3::Z, DVec3::X);
/// assert!((q * DVec3::Z).abs_diff_eq(DVec3::X, 1e-12));
/// ```
pub fn rotate_into(from: DVec3, to: DVec3) -> DQuat {
    match (from.try_normalize(), to.try_normalize()) {
        (Some(from), Some(to)) => DQuat::from_rotation_arc(from, to),
        _ => DQuat::IDENTITY,
    }
}

/// Removes the component of `vector` along the unit `normal`.
#[inline]
pub fn project_onto_plane(vector: DVec3, normal: DVec3) -> DVec3 {
    vector - normal * vector.dot(normal)
}
