//! # Leaf
//!
//! Leaf placements attached to a stem.

use glam::{DQuat, DVec3};
use serde::{Deserialize, Serialize};

/// A leaf instance placed along its stem's path.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Leaf {
    /// Arc length along the path. Negative values, and values past the end
    /// of the path, place the leaf at the tip.
    pub position: f64,
    pub scale: DVec3,
    pub rotation: DQuat,
    /// Index into the plant's leaf mesh table.
    pub mesh: usize,
    /// Index into the plant's material table.
    pub material: usize,
}

impl Default for Leaf {
    fn default() -> Self {
        Self {
            position: -1.0,
            scale: DVec3::ONE,
            rotation: DQuat::IDENTITY,
            mesh: 0,
            material: 0,
        }
    }
}

impl Leaf {
    /// Creates a leaf at arc length `position`.
    pub fn at(position: f64) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }
}
