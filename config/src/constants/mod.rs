//! Centralized configuration values shared across the plant mesh pipeline.
//!
//! Each public item in this module documents its purpose and provides a minimal
//! usage example so that downstream crates can remain declarative and avoid
//! scattering literals.

use std::fmt;

/// Numerical tolerance used by geometry kernels.
///
/// # Examples
/// ```
/// use config::constants::EPSILON_TOLERANCE;
/// assert!(EPSILON_TOLERANCE < 1.0e-6);
/// ```
pub const EPSILON_TOLERANCE: f64 = 1.0e-9;

/// Threshold below which two floating point values are considered equal.
pub const EPSILON: f64 = 1.0e-10;

/// Number of stem slots in one block of the stem pool.
///
/// # Examples
/// ```
/// use config::constants::POOL_SIZE;
/// assert!(POOL_SIZE > 0);
/// ```
pub const POOL_SIZE: usize = 100;

/// Default number of ring vertices (minus the closing vertex) around a stem.
///
/// Even, so that freshly created stems can be stitched as forks.
///
/// # Examples
/// ```
/// use config::constants::DEFAULT_SECTION_DIVISIONS;
/// assert_eq!(DEFAULT_SECTION_DIVISIONS % 2, 0);
/// ```
pub const DEFAULT_SECTION_DIVISIONS: usize = 8;

/// Smallest ring resolution that still forms a polygon.
pub const MIN_SECTION_DIVISIONS: usize = 3;

/// Default number of path samples per spline curve.
pub const DEFAULT_PATH_DIVISIONS: usize = 4;

/// Default number of collar rings reserved at the start of a path.
pub const DEFAULT_INITIAL_DIVISIONS: usize = 0;

/// Default radius at the tip of a stem.
pub const DEFAULT_MIN_RADIUS: f64 = 0.015;

/// Default radius at the base of a stem.
pub const DEFAULT_MAX_RADIUS: f64 = 0.2;

/// Immutable snapshot of global configuration settings that can be shared
/// between crates.
///
/// # Examples
/// ```
/// use config::constants::GlobalConfig;
/// let config = GlobalConfig::default();
/// assert!(config.tolerance > 0.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlobalConfig {
    /// Numeric tolerance propagated into geometry kernels.
    pub tolerance: f64,
    /// Number of stem slots allocated per pool block.
    pub pool_size: usize,
}

impl GlobalConfig {
    /// Builds a configuration enforcing strict validation of the supplied
    /// tolerance and pool size.
    ///
    /// # Examples
    /// ```
    /// use config::constants::GlobalConfig;
    /// let cfg = GlobalConfig::new(1.0e-6, 16).expect("valid config");
    /// assert_eq!(cfg.pool_size, 16);
    /// ```
    pub fn new(tolerance: f64, pool_size: usize) -> Result<Self, ConfigError> {
        if !(tolerance > 0.0) {
            return Err(ConfigError::InvalidTolerance(tolerance));
        }
        if pool_size == 0 {
            return Err(ConfigError::InvalidPoolSize(pool_size));
        }
        Ok(Self {
            tolerance,
            pool_size,
        })
    }
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            tolerance: EPSILON_TOLERANCE,
            pool_size: POOL_SIZE,
        }
    }
}

/// Error returned when invalid configuration values are provided.
#[derive(Debug, PartialEq)]
pub enum ConfigError {
    /// Raised when tolerance is zero, negative or NaN.
    InvalidTolerance(f64),
    /// Raised when a pool block could not hold a single stem.
    InvalidPoolSize(usize),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidTolerance(value) => {
                write!(f, "tolerance must be positive: {value}")
            }
            ConfigError::InvalidPoolSize(value) => {
                write!(f, "pool_size must be >= 1: {value}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}
