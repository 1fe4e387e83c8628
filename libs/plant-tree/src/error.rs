//! # Plant Errors
//!
//! Error types for stem tree editing.

use crate::pool::StemId;
use thiserror::Error;

/// Errors that can occur while editing a plant.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlantError {
    /// Handle whose slot has been freed or reused
    #[error("Stale stem handle: {0:?}")]
    StaleStem(StemId),

    /// The plant already owns a root stem
    #[error("Plant already has a root stem")]
    RootExists,

    /// Control points do not describe a spline of the given degree
    #[error("Invalid spline: {message}")]
    InvalidSpline { message: String },

    /// Resolution too small to be sampled
    #[error("Invalid divisions: {divisions} (min: {min})")]
    InvalidDivisions { divisions: usize, min: usize },

    /// The remembered sibling of an extraction no longer shares its parent
    #[error("Extraction sibling {0:?} is no longer attached to the extraction parent")]
    DetachedSibling(StemId),

    /// Table index out of bounds
    #[error("Index out of range: {index} (len: {len})")]
    IndexOutOfRange { index: usize, len: usize },
}

impl PlantError {
    /// Creates an invalid spline error.
    pub fn invalid_spline(message: impl Into<String>) -> Self {
        Self::InvalidSpline {
            message: message.into(),
        }
    }

    /// Creates an index out of range error.
    pub fn out_of_range(index: usize, len: usize) -> Self {
        Self::IndexOutOfRange { index, len }
    }
}
