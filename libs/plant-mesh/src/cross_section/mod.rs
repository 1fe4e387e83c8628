//! # Cross Section
//!
//! Ring template extruded along every stem path. The ring lies in the XY
//! plane with the stem running along +Z, and holds `resolution + 1`
//! vertices so the last one can close the texture seam.

use glam::{DVec2, DVec3};
use plant_tree::Spline;
use std::f64::consts::TAU;

/// One template vertex.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SectionVertex {
    pub position: DVec3,
    pub normal: DVec3,
    pub uv: DVec2,
}

/// Unit circle, or a custom profile sampled from a closed spline.
///
/// # Example
///
/// ```rust
/// use plant_mesh::CrossSection;
///
/// let mut section = CrossSection::new();
/// section.generate(6);
/// assert_eq!(section.vertices().len(), 7);
/// assert_eq!(section.vertices()[0].uv.x, 1.0);
/// assert_eq!(section.vertices()[6].uv.x, 0.0);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CrossSection {
    resolution: usize,
    profile: Option<Spline>,
    vertices: Vec<SectionVertex>,
}

impl CrossSection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of ring segments of the cached template.
    #[inline]
    pub fn resolution(&self) -> usize {
        self.resolution
    }

    #[inline]
    pub fn vertices(&self) -> &[SectionVertex] {
        &self.vertices
    }

    #[inline]
    pub fn profile(&self) -> Option<&Spline> {
        self.profile.as_ref()
    }

    /// Replaces the profile. The cached ring is discarded.
    pub fn set_profile(&mut self, profile: Option<Spline>) {
        self.profile = profile.filter(|spline| !spline.controls().is_empty());
        self.resolution = 0;
        self.vertices.clear();
    }

    /// Builds the template for `resolution` segments unless it is cached.
    pub fn generate(&mut self, resolution: usize) {
        if resolution == self.resolution && !self.vertices.is_empty() {
            return;
        }
        self.resolution = resolution;
        self.vertices.clear();
        if resolution == 0 {
            return;
        }
        match self.profile.take() {
            Some(spline) => {
                self.generate_profile(&spline);
                self.profile = Some(spline);
            }
            None => self.generate_circle(),
        }
    }

    fn generate_circle(&mut self) {
        let r = self.resolution as f64;
        for i in 0..self.resolution {
            let angle = TAU * i as f64 / r;
            let position = DVec3::new(angle.cos(), angle.sin(), 0.0);
            self.vertices.push(SectionVertex {
                position,
                normal: position,
                uv: DVec2::new(1.0 - i as f64 / r, 0.0),
            });
        }
        let first = self.vertices[0];
        self.vertices.push(SectionVertex {
            uv: DVec2::ZERO,
            ..first
        });
    }

    fn generate_profile(&mut self, spline: &Spline) {
        let r = self.resolution as f64;
        let curves = spline.curve_count().max(1) as f64;
        for i in 0..=self.resolution {
            self.vertices.push(SectionVertex {
                position: spline.point_at(curves * i as f64 / r),
                normal: DVec3::ZERO,
                uv: DVec2::new(1.0 - i as f64 / r, 0.0),
            });
        }
        let n = self.resolution;
        self.vertices[n].position = self.vertices[0].position;

        // The seam vertices share the normal of the wrapped corner.
        let edge_normal = |a: DVec3, b: DVec3| {
            let edge = b - a;
            DVec3::new(edge.y, -edge.x, 0.0).normalize_or_zero()
        };
        let positions: Vec<DVec3> = self.vertices.iter().map(|v| v.position).collect();
        for i in 0..=n {
            let prev = if i == 0 { positions[n - 1] } else { positions[i - 1] };
            let next = if i == n { positions[1] } else { positions[i + 1] };
            let normal = edge_normal(prev, positions[i]) + edge_normal(positions[i], next);
            self.vertices[i].normal = normal.try_normalize().unwrap_or(DVec3::X);
        }
    }
}
