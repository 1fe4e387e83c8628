//! # Joint
//!
//! Skinning markers placed along a stem path.

use serde::{Deserialize, Serialize};

/// A skeleton bone anchored at a path sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Joint {
    /// Bone identifier written into vertex joint indices.
    pub id: u32,
    /// Bone of the enclosing joint.
    pub parent_id: u32,
    /// Path sample the joint sits on.
    pub path_index: usize,
}

impl Joint {
    pub fn new(id: u32, parent_id: u32, path_index: usize) -> Self {
        Self {
            id,
            parent_id,
            path_index,
        }
    }
}
