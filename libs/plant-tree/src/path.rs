//! # Path
//!
//! Discrete samples of a stem's centerline spline plus the direction,
//! distance and radius queries the mesh generator walks.
//!
//! ## Sampling
//!
//! The first spline curve is sampled with `initial_divisions + 1`
//! intervals and every other curve with `divisions` intervals. The last
//! control point closes the sequence, so sample `initial_divisions + 1`
//! always sits at the end of the first curve. The samples in between are
//! the rings reserved for a branch collar or a fork transition.

use crate::curve::Curve;
use crate::error::PlantError;
use crate::spline::Spline;
use config::constants::{DEFAULT_INITIAL_DIVISIONS, DEFAULT_PATH_DIVISIONS, EPSILON};
use glam::DVec3;
use serde::{Deserialize, Serialize};

/// Sampled centerline of a stem, relative to the stem's location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Path {
    spline: Spline,
    divisions: usize,
    initial_divisions: usize,
    samples: Vec<DVec3>,
}

impl Default for Path {
    fn default() -> Self {
        Self::new(Spline::default())
    }
}

impl Path {
    /// Creates a path sampled with the default resolution.
    pub fn new(spline: Spline) -> Self {
        let mut path = Self {
            spline,
            divisions: DEFAULT_PATH_DIVISIONS,
            initial_divisions: DEFAULT_INITIAL_DIVISIONS,
            samples: Vec::new(),
        };
        path.generate();
        path
    }

    /// Replaces the spline and resamples.
    pub fn set_spline(&mut self, spline: Spline) {
        self.spline = spline;
        self.generate();
    }

    #[inline]
    pub fn spline(&self) -> &Spline {
        &self.spline
    }

    /// Sets the number of samples per curve and resamples.
    pub fn set_divisions(&mut self, divisions: usize) -> Result<(), PlantError> {
        if divisions == 0 {
            return Err(PlantError::InvalidDivisions { divisions, min: 1 });
        }
        self.divisions = divisions;
        self.generate();
        Ok(())
    }

    #[inline]
    pub fn divisions(&self) -> usize {
        self.divisions
    }

    /// Sets the number of reserved rings on the first curve and resamples.
    pub fn set_initial_divisions(&mut self, divisions: usize) {
        self.initial_divisions = divisions;
        self.generate();
    }

    #[inline]
    pub fn initial_divisions(&self) -> usize {
        self.initial_divisions
    }

    fn generate(&mut self) {
        self.samples.clear();
        let controls = self.spline.controls();
        match controls.len() {
            0 => return,
            1 => {
                self.samples.push(controls[0]);
                return;
            }
            _ => {}
        }
        for curve in 0..self.spline.curve_count() {
            let intervals = if curve == 0 {
                self.initial_divisions + 1
            } else {
                self.divisions
            };
            for i in 0..intervals {
                let t = i as f64 / intervals as f64;
                self.samples.push(self.spline.point(curve, t));
            }
        }
        if let Some(last) = controls.last() {
            self.samples.push(*last);
        }
    }

    #[inline]
    pub fn samples(&self) -> &[DVec3] {
        &self.samples
    }

    /// Number of samples.
    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Sample `index`, clamped to the last sample. Empty paths yield the origin.
    pub fn get(&self, index: usize) -> DVec3 {
        match self.samples.len() {
            0 => DVec3::ZERO,
            len => self.samples[index.min(len - 1)],
        }
    }

    /// Direction of the segment leaving sample `index`.
    ///
    /// The last sample reuses the direction of the segment entering it.
    /// Degenerate segments fall back to +Z.
    pub fn direction(&self, index: usize) -> DVec3 {
        let len = self.samples.len();
        if len < 2 {
            return DVec3::Z;
        }
        let index = index.min(len - 2);
        (self.samples[index + 1] - self.samples[index])
            .try_normalize()
            .unwrap_or(DVec3::Z)
    }

    /// Average of the directions entering and leaving sample `index`.
    pub fn average_direction(&self, index: usize) -> DVec3 {
        if index == 0 || index + 1 >= self.samples.len() {
            return self.direction(index);
        }
        (self.direction(index - 1) + self.direction(index))
            .try_normalize()
            .unwrap_or_else(|| self.direction(index))
    }

    /// Total arc length of the sampled polyline.
    pub fn length(&self) -> f64 {
        self.samples
            .windows(2)
            .map(|pair| pair[0].distance(pair[1]))
            .sum()
    }

    /// Length of the segment entering sample `index`.
    pub fn segment_length(&self, index: usize) -> f64 {
        if index == 0 || index >= self.samples.len() {
            0.0
        } else {
            self.samples[index].distance(self.samples[index - 1])
        }
    }

    /// Arc length from the first sample to sample `index`.
    pub fn distance(&self, index: usize) -> f64 {
        self.distance_between(0, index)
    }

    /// Arc length between two samples, in either order.
    pub fn distance_between(&self, start: usize, end: usize) -> f64 {
        let (start, end) = if start <= end { (start, end) } else { (end, start) };
        let end = end.min(self.samples.len().saturating_sub(1));
        (start + 1..=end).map(|i| self.segment_length(i)).sum()
    }

    /// Index of the last sample at or before `distance`.
    pub fn index_at(&self, distance: f64) -> usize {
        let mut travelled = 0.0;
        for i in 1..self.samples.len() {
            travelled += self.segment_length(i);
            if travelled > distance + EPSILON {
                return i - 1;
            }
        }
        self.samples.len().saturating_sub(1)
    }

    /// Point at arc length `distance`, clamped to the ends of the path.
    pub fn intermediate(&self, distance: f64) -> DVec3 {
        if self.samples.len() < 2 || distance <= 0.0 {
            return self.get(0);
        }
        let mut travelled = 0.0;
        for i in 1..self.samples.len() {
            let length = self.segment_length(i);
            if travelled + length >= distance && length > 0.0 {
                let t = (distance - travelled) / length;
                return self.samples[i - 1].lerp(self.samples[i], t);
            }
            travelled += length;
        }
        self.get(self.samples.len() - 1)
    }

    /// Direction of the segment containing arc length `distance`.
    pub fn intermediate_direction(&self, distance: f64) -> DVec3 {
        self.direction(self.index_at(distance.max(0.0)))
    }

    /// Radius at sample `index`, mapped from `[0, 1]` onto `[min, max]` by
    /// the profile curve.
    pub fn radius(&self, index: usize, curve: &Curve, min: f64, max: f64) -> f64 {
        let t = match self.samples.len() {
            0 | 1 => 0.0,
            len => index.min(len - 1) as f64 / (len - 1) as f64,
        };
        min + (max - min) * curve.evaluate(t)
    }

    /// Radius at arc length `distance`, interpolated between samples.
    pub fn intermediate_radius(&self, distance: f64, curve: &Curve, min: f64, max: f64) -> f64 {
        let index = self.index_at(distance.max(0.0));
        let length = self.segment_length(index + 1);
        let r1 = self.radius(index, curve, min, max);
        if length <= 0.0 {
            return r1;
        }
        let r2 = self.radius(index + 1, curve, min, max);
        let t = ((distance - self.distance(index)) / length).clamp(0.0, 1.0);
        r1 + (r2 - r1) * t
    }
}
