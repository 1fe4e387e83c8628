//! # Plant Tree
//!
//! Data model for a branching plant skeleton. A [`Plant`] owns every
//! [`Stem`] through a pooled arena ([`StemPool`]) and hands out
//! generational [`StemId`] handles instead of references.
//!
//! ## Architecture
//!
//! ```text
//! Spline → Path (samples, directions, radii)
//!             ↓
//!           Stem (path, radii, materials, leaves, joints)
//!             ↓
//!        StemPool (arena) → Plant (tree links, shared tables)
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use glam::DVec3;
//! use plant_tree::{Path, Plant, Spline};
//!
//! let mut plant = Plant::with_defaults();
//! let root = plant.create_root();
//! let spline = Spline::linear(vec![
//!     DVec3::ZERO,
//!     DVec3::new(0.0, 1.0, 0.0),
//!     DVec3::new(0.0, 10.0, 0.0),
//! ])
//! .unwrap();
//! plant.stem_mut(root).unwrap().set_path(Path::new(spline));
//!
//! // One interval on the first curve, four on the second, plus the end point.
//! assert_eq!(plant.stem(root).unwrap().path().len(), 6);
//! ```

pub mod curve;
pub mod error;
pub mod geometry;
pub mod joint;
pub mod leaf;
pub mod material;
pub mod math;
pub mod path;
pub mod plant;
pub mod pool;
pub mod spline;
pub mod stem;
pub mod vertex;

pub use curve::Curve;
pub use error::PlantError;
pub use geometry::Geometry;
pub use joint::Joint;
pub use leaf::Leaf;
pub use material::Material;
pub use path::Path;
pub use plant::{Children, Extraction, Plant};
pub use pool::{StemId, StemPool};
pub use spline::Spline;
pub use stem::{Stem, Surface};
pub use vertex::Vertex;
