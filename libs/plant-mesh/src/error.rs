//! # Mesh Errors
//!
//! Error types for mesh generation. Geometric degeneracies never surface
//! here: collars roll back and invalid forks downgrade silently. Only
//! broken references into the plant's tables are reported.

use plant_tree::{PlantError, StemId};
use thiserror::Error;

/// Errors that can occur during mesh generation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MeshError {
    /// Error from the stem tree
    #[error("Plant error: {0}")]
    Plant(#[from] PlantError),

    /// A stem or leaf names a material the plant does not have
    #[error("Unknown material {material} on {stem:?} (materials: {count})")]
    UnknownMaterial {
        stem: StemId,
        material: usize,
        count: usize,
    },

    /// A stem names a radius curve the plant does not have
    #[error("Unknown radius curve {curve} on {stem:?} (curves: {count})")]
    UnknownCurve {
        stem: StemId,
        curve: usize,
        count: usize,
    },

    /// A leaf names a leaf mesh the plant does not have
    #[error("Unknown leaf mesh {mesh} on {stem:?} (leaf meshes: {count})")]
    UnknownLeafMesh {
        stem: StemId,
        mesh: usize,
        count: usize,
    },

    /// An index points past the end of the vertex stream
    #[error("Dangling index {index} (vertices: {vertex_count})")]
    DanglingIndex { index: u32, vertex_count: usize },

    /// Rejected generator settings
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },
}

impl MeshError {
    /// Creates an invalid configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }
}
