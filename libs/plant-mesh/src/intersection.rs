//! # Intersection
//!
//! Ray casts used to project collar rings onto parent surfaces and to
//! flatten fork seams onto their bisecting planes.

use glam::DVec3;

/// A half-line from `origin` along `direction`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: DVec3,
    pub direction: DVec3,
}

impl Ray {
    pub fn new(origin: DVec3, direction: DVec3) -> Self {
        Self { origin, direction }
    }

    #[inline]
    pub fn at(&self, t: f64) -> DVec3 {
        self.origin + self.direction * t
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    pub point: DVec3,
    pub normal: DVec3,
}

impl Plane {
    pub fn new(point: DVec3, normal: DVec3) -> Self {
        Self { point, normal }
    }
}

/// A ray/triangle hit: distance along the ray and the barycentric
/// weights of the second and third corners.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    pub t: f64,
    pub u: f64,
    pub v: f64,
}

impl Hit {
    /// Blends three per-corner values with the hit's barycentric weights.
    pub fn blend(&self, a: DVec3, b: DVec3, c: DVec3) -> DVec3 {
        a * (1.0 - self.u - self.v) + b * self.u + c * self.v
    }
}

/// Intersects a ray with the front face of the counterclockwise triangle
/// `(a, b, c)`.
///
/// Back faces, grazing rays and hits closer than `tolerance` miss.
pub fn intersect_front_triangle(
    ray: &Ray,
    a: DVec3,
    b: DVec3,
    c: DVec3,
    tolerance: f64,
) -> Option<Hit> {
    let edge1 = b - a;
    let edge2 = c - a;
    let p = ray.direction.cross(edge2);
    let det = edge1.dot(p);
    if det <= tolerance {
        return None;
    }
    let inv = 1.0 / det;
    let s = ray.origin - a;
    let u = s.dot(p) * inv;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }
    let q = s.cross(edge1);
    let v = ray.direction.dot(q) * inv;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }
    let t = edge2.dot(q) * inv;
    (t > tolerance).then_some(Hit { t, u, v })
}

/// Signed distance along the ray to the plane, or `None` when the ray is
/// parallel to it.
pub fn intersect_plane(ray: &Ray, plane: &Plane) -> Option<f64> {
    let denominator = plane.normal.dot(ray.direction);
    if denominator.abs() <= f64::EPSILON {
        return None;
    }
    Some((plane.point - ray.origin).dot(plane.normal) / denominator)
}
