//! # Material
//!
//! Entries of the plant's material table. Only the parts the mesh
//! generator needs are kept here: a name for lookups and the texture
//! aspect ratio.

use serde::{Deserialize, Serialize};

/// A surface material referenced by index from stems and leaves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub name: String,
    /// Texture height over width. Scales how fast the V coordinate grows
    /// along a stem.
    pub ratio: f64,
}

impl Material {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ratio: 1.0,
        }
    }

    pub fn with_ratio(mut self, ratio: f64) -> Self {
        self.ratio = ratio;
        self
    }
}

impl Default for Material {
    fn default() -> Self {
        Self::new("default")
    }
}
