//! # Config Crate
//!
//! Centralized configuration constants for the plant mesh pipeline.
//! Pool sizing, default stem resolutions and numeric tolerances are
//! defined here so the tree and mesh crates agree on them.
//!
//! ## Usage
//!
//! ```rust
//! use config::constants::{EPSILON, DEFAULT_SECTION_DIVISIONS, MIN_SECTION_DIVISIONS};
//!
//! // Use EPSILON for floating-point comparisons
//! let value: f64 = 1.0e-12;
//! assert!(value.abs() < EPSILON);
//!
//! // Ring resolution defaults
//! assert!(DEFAULT_SECTION_DIVISIONS >= MIN_SECTION_DIVISIONS);
//! ```
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: All constants defined once, used everywhere
//! - **No Dependencies**: Leaf crate of the workspace
//! - **Well-Documented**: Every constant has clear documentation

pub mod constants;
