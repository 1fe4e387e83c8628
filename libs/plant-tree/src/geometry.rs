//! # Leaf Geometry
//!
//! Small indexed meshes instanced at every leaf placement.

use crate::vertex::Vertex;
use glam::{DQuat, DVec2, DVec3};
use serde::{Deserialize, Serialize};

/// An indexed triangle mesh in leaf space, growing along +Z from the origin.
///
/// # Example
///
/// ```rust
/// use plant_tree::Geometry;
///
/// let leaf = Geometry::plane("leaf");
/// assert_eq!(leaf.points().len(), 4);
/// assert_eq!(leaf.indices().len(), 6);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    name: String,
    points: Vec<Vertex>,
    indices: Vec<u32>,
}

impl Geometry {
    pub fn new(name: impl Into<String>, points: Vec<Vertex>, indices: Vec<u32>) -> Self {
        Self {
            name: name.into(),
            points,
            indices,
        }
    }

    /// Unit quad in the XZ plane facing +Y.
    pub fn plane(name: impl Into<String>) -> Self {
        let mut geometry = Self::new(name, Vec::new(), Vec::new());
        geometry.append_plane(DQuat::IDENTITY);
        geometry
    }

    /// Two unit quads crossing along the Z axis.
    pub fn perpendicular_planes(name: impl Into<String>) -> Self {
        let mut geometry = Self::new(name, Vec::new(), Vec::new());
        geometry.append_plane(DQuat::IDENTITY);
        geometry.append_plane(DQuat::from_rotation_z(std::f64::consts::FRAC_PI_2));
        geometry
    }

    fn append_plane(&mut self, rotation: DQuat) {
        let start = self.points.len() as u32;
        let corners = [
            (DVec3::new(-0.5, 0.0, 0.0), DVec2::new(0.0, 0.0)),
            (DVec3::new(0.5, 0.0, 0.0), DVec2::new(1.0, 0.0)),
            (DVec3::new(0.5, 0.0, 1.0), DVec2::new(1.0, 1.0)),
            (DVec3::new(-0.5, 0.0, 1.0), DVec2::new(0.0, 1.0)),
        ];
        for (position, uv) in corners {
            self.points.push(Vertex {
                position: rotation * position,
                normal: rotation * DVec3::Y,
                tangent: rotation * DVec3::X,
                uv,
                ..Vertex::default()
            });
        }
        self.indices
            .extend([start, start + 2, start + 1, start, start + 3, start + 2]);
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn points(&self) -> &[Vertex] {
        &self.points
    }

    #[inline]
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Scales, rotates, then translates every point.
    pub fn transform(&mut self, rotation: DQuat, scale: DVec3, translation: DVec3) {
        for point in &mut self.points {
            point.position = rotation * (point.position * scale) + translation;
            point.normal = (rotation * point.normal).normalize_or_zero();
            point.tangent = (rotation * point.tangent).normalize_or_zero();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plane_faces_its_normal() {
        let plane = Geometry::plane("leaf");
        let p = plane.points();
        for triangle in plane.indices().chunks(3) {
            let a = p[triangle[0] as usize].position;
            let b = p[triangle[1] as usize].position;
            let c = p[triangle[2] as usize].position;
            let face = (b - a).cross(c - a).normalize();
            assert!(face.abs_diff_eq(DVec3::Y, 1e-12));
        }
    }

    #[test]
    fn test_perpendicular_planes() {
        let planes = Geometry::perpendicular_planes("cross");
        assert_eq!(planes.points().len(), 8);
        assert_eq!(planes.indices()[6], 4);
        assert!(planes.points()[4].normal.abs_diff_eq(DVec3::NEG_X, 1e-12));
    }

    #[test]
    fn test_transform() {
        let mut plane = Geometry::plane("leaf");
        plane.transform(
            DQuat::from_rotation_x(std::f64::consts::FRAC_PI_2),
            DVec3::splat(2.0),
            DVec3::new(0.0, 0.0, 5.0),
        );
        // The tip corner at (0.5, 0, 1) scales to (1, 0, 2) and turns onto -Y.
        let tip = plane.points()[2].position;
        assert!(tip.abs_diff_eq(DVec3::new(1.0, -2.0, 5.0), 1e-12));
        assert!(plane.points()[0].normal.abs_diff_eq(DVec3::Z, 1e-12));
    }
}
