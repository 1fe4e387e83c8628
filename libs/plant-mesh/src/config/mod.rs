//! Generator-level configuration building on the shared `config` crate.

use crate::error::MeshError;
use config::constants::{ConfigError, GlobalConfig, EPSILON_TOLERANCE};

/// Mesh generator configuration.
///
/// # Examples
/// ```
/// use plant_mesh::config::GeneratorConfig;
/// let cfg = GeneratorConfig::default().with_collars(false);
/// assert!(!cfg.collars);
/// assert!(cfg.forks);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeneratorConfig {
    /// Smallest ray distance accepted as a surface hit.
    pub tolerance: f64,
    /// Build branch collars for stems with a swelling of at least one.
    pub collars: bool,
    /// Stitch valid fork pairs into a shared ring.
    pub forks: bool,
    /// Emit leaf geometry.
    pub leaves: bool,
}

impl GeneratorConfig {
    /// Creates a configuration with every feature enabled.
    ///
    /// # Examples
    /// ```
    /// use plant_mesh::config::GeneratorConfig;
    /// assert!(GeneratorConfig::new(1.0e-6).is_ok());
    /// assert!(GeneratorConfig::new(-1.0).is_err());
    /// ```
    pub fn new(tolerance: f64) -> Result<Self, GeneratorConfigError> {
        GlobalConfig::new(tolerance, GlobalConfig::default().pool_size)
            .map(|cfg| Self {
                tolerance: cfg.tolerance,
                ..Self::default()
            })
            .map_err(GeneratorConfigError)
    }

    pub fn with_collars(mut self, enabled: bool) -> Self {
        self.collars = enabled;
        self
    }

    pub fn with_forks(mut self, enabled: bool) -> Self {
        self.forks = enabled;
        self
    }

    pub fn with_leaves(mut self, enabled: bool) -> Self {
        self.leaves = enabled;
        self
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            tolerance: EPSILON_TOLERANCE,
            collars: true,
            forks: true,
            leaves: true,
        }
    }
}

/// Error wrapper for invalid generator configuration.
#[derive(Debug, PartialEq)]
pub struct GeneratorConfigError(ConfigError);

impl std::fmt::Display for GeneratorConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::error::Error for GeneratorConfigError {}

impl From<GeneratorConfigError> for MeshError {
    fn from(error: GeneratorConfigError) -> Self {
        MeshError::invalid_config(error.to_string())
    }
}
