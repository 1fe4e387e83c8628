//! # Plant Mesh
//!
//! Turns a [`plant_tree::Plant`] into one indexed triangle mesh per
//! material, ready to be concatenated into a single renderer buffer.
//!
//! ## Architecture
//!
//! ```text
//! Plant (stem tree) → MeshGenerator (depth-first walk)
//!                        ├── CrossSection (ring template)
//!                        ├── Collar (child fillets on parent surfaces)
//!                        └── Fork (Y-branch stitching)
//!                              ↓
//!                        Mesh (per-material buffers + segments)
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use glam::DVec3;
//! use plant_mesh::{GeneratorConfig, MeshGenerator};
//! use plant_tree::{Path, Plant, Spline};
//!
//! let mut plant = Plant::with_defaults();
//! let root = plant.create_root();
//! let spline = Spline::linear(vec![DVec3::ZERO, DVec3::new(0.0, 10.0, 0.0)]).unwrap();
//! plant.stem_mut(root).unwrap().set_path(Path::new(spline));
//!
//! let mut generator = MeshGenerator::new(GeneratorConfig::default());
//! let mesh = generator.generate(&plant).unwrap();
//! assert!(mesh.validate().is_ok());
//! assert!(mesh.find_stem(root).vertex_count > 0);
//! ```

pub mod collar;
pub mod config;
pub mod cross_section;
pub mod error;
pub mod fork;
pub mod generator;
pub mod intersection;
pub mod mesh;

pub use collar::Collar;
pub use config::GeneratorConfig;
pub use cross_section::{CrossSection, SectionVertex};
pub use error::MeshError;
pub use fork::{Fork, ForkReservation, Middle};
pub use generator::MeshGenerator;
pub use mesh::{Buffer, LeafId, Mesh, Segment, State};
