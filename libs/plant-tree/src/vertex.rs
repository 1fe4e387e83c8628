//! # Vertex
//!
//! Renderer-facing vertex layout shared by stem rings, caps and leaves.

use glam::{DVec2, DVec3};
use serde::{Deserialize, Serialize};

/// A skinned, textured vertex.
///
/// Geometry is stored in f64. The flat f32 views are produced by the mesh
/// export accessors.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    pub position: DVec3,
    pub normal: DVec3,
    pub tangent: DVec3,
    /// Handedness of the bitangent, packed with the tangent on export.
    pub tangent_scale: f64,
    pub uv: DVec2,
    /// Skin joints influencing the vertex.
    pub joints: [u32; 2],
    /// Weights of `joints`, summing to one.
    pub weights: DVec2,
}

impl Default for Vertex {
    fn default() -> Self {
        Self {
            position: DVec3::ZERO,
            normal: DVec3::Z,
            tangent: DVec3::X,
            tangent_scale: 1.0,
            uv: DVec2::ZERO,
            joints: [0, 0],
            weights: DVec2::new(1.0, 0.0),
        }
    }
}

impl Vertex {
    /// Creates a vertex at `position` with default shading attributes.
    pub fn at(position: DVec3) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }
}
