//! # Stem
//!
//! One node of the branching skeleton. Tree links are maintained by
//! [`Plant`](crate::Plant); everything else is plain data set by the
//! planner before mesh generation.

use crate::error::PlantError;
use crate::joint::Joint;
use crate::leaf::Leaf;
use crate::path::Path;
use crate::pool::StemId;
use config::constants::{
    DEFAULT_MAX_RADIUS, DEFAULT_MIN_RADIUS, DEFAULT_SECTION_DIVISIONS, MIN_SECTION_DIVISIONS,
};
use glam::{DVec2, DVec3};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Which side of a stem a material applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Surface {
    /// The bark, wrapped around every ring.
    Outer,
    /// The cut face capping the tip.
    Inner,
}

/// A trunk or branch segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stem {
    pub(crate) parent: Option<StemId>,
    pub(crate) child: Option<StemId>,
    pub(crate) next_sibling: Option<StemId>,
    pub(crate) prev_sibling: Option<StemId>,
    pub(crate) depth: usize,
    distance: f64,
    path: Path,
    max_radius: f64,
    min_radius: f64,
    radius_curve: usize,
    section_divisions: usize,
    swelling: DVec2,
    materials: [usize; 2],
    leaves: BTreeMap<usize, Leaf>,
    next_leaf: usize,
    joints: Vec<Joint>,
}

impl Default for Stem {
    fn default() -> Self {
        Self {
            parent: None,
            child: None,
            next_sibling: None,
            prev_sibling: None,
            depth: 0,
            distance: 0.0,
            path: Path::default(),
            max_radius: DEFAULT_MAX_RADIUS,
            min_radius: DEFAULT_MIN_RADIUS,
            radius_curve: 0,
            section_divisions: DEFAULT_SECTION_DIVISIONS,
            swelling: DVec2::ZERO,
            materials: [0, 0],
            leaves: BTreeMap::new(),
            next_leaf: 0,
            joints: Vec::new(),
        }
    }
}

impl Stem {
    pub fn new() -> Self {
        Self::default()
    }

    // ---------------------------------------------------------------------
    // Tree links (read only, edited through Plant)
    // ---------------------------------------------------------------------

    #[inline]
    pub fn parent(&self) -> Option<StemId> {
        self.parent
    }

    #[inline]
    pub fn child(&self) -> Option<StemId> {
        self.child
    }

    #[inline]
    pub fn next_sibling(&self) -> Option<StemId> {
        self.next_sibling
    }

    #[inline]
    pub fn prev_sibling(&self) -> Option<StemId> {
        self.prev_sibling
    }

    /// Number of ancestors.
    #[inline]
    pub fn depth(&self) -> usize {
        self.depth
    }

    // ---------------------------------------------------------------------
    // Placement
    // ---------------------------------------------------------------------

    /// Arc length along the parent's path where this stem starts.
    #[inline]
    pub fn distance(&self) -> f64 {
        self.distance
    }

    pub fn set_distance(&mut self, distance: f64) {
        self.distance = distance;
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[inline]
    pub fn path_mut(&mut self) -> &mut Path {
        &mut self.path
    }

    pub fn set_path(&mut self, path: Path) {
        self.path = path;
    }

    /// Direction of the first path segment.
    pub fn direction(&self) -> DVec3 {
        self.path.direction(0)
    }

    // ---------------------------------------------------------------------
    // Cross sections
    // ---------------------------------------------------------------------

    #[inline]
    pub fn max_radius(&self) -> f64 {
        self.max_radius
    }

    pub fn set_max_radius(&mut self, radius: f64) {
        self.max_radius = radius;
    }

    #[inline]
    pub fn min_radius(&self) -> f64 {
        self.min_radius
    }

    pub fn set_min_radius(&mut self, radius: f64) {
        self.min_radius = radius;
    }

    /// Index into the plant's radius curve table.
    #[inline]
    pub fn radius_curve(&self) -> usize {
        self.radius_curve
    }

    pub fn set_radius_curve(&mut self, curve: usize) {
        self.radius_curve = curve;
    }

    /// Ring vertices minus the closing vertex.
    #[inline]
    pub fn section_divisions(&self) -> usize {
        self.section_divisions
    }

    pub fn set_section_divisions(&mut self, divisions: usize) -> Result<(), PlantError> {
        if divisions < MIN_SECTION_DIVISIONS {
            return Err(PlantError::InvalidDivisions {
                divisions,
                min: MIN_SECTION_DIVISIONS,
            });
        }
        self.section_divisions = divisions;
        Ok(())
    }

    /// Collar flare across and along the parent surface.
    #[inline]
    pub fn swelling(&self) -> DVec2 {
        self.swelling
    }

    pub fn set_swelling(&mut self, swelling: DVec2) {
        self.swelling = swelling;
    }

    /// True when the stem starts with a branch collar.
    pub fn has_collar(&self) -> bool {
        self.swelling.x >= 1.0 && self.swelling.y >= 1.0
    }

    #[inline]
    pub fn material(&self, surface: Surface) -> usize {
        match surface {
            Surface::Outer => self.materials[0],
            Surface::Inner => self.materials[1],
        }
    }

    pub fn set_material(&mut self, surface: Surface, material: usize) {
        match surface {
            Surface::Outer => self.materials[0] = material,
            Surface::Inner => self.materials[1] = material,
        }
    }

    pub(crate) fn materials_mut(&mut self) -> &mut [usize; 2] {
        &mut self.materials
    }

    // ---------------------------------------------------------------------
    // Leaves
    // ---------------------------------------------------------------------

    #[inline]
    pub fn leaves(&self) -> &BTreeMap<usize, Leaf> {
        &self.leaves
    }

    pub fn leaf(&self, index: usize) -> Option<&Leaf> {
        self.leaves.get(&index)
    }

    pub fn leaf_mut(&mut self, index: usize) -> Option<&mut Leaf> {
        self.leaves.get_mut(&index)
    }

    /// Adds a leaf and returns its index.
    pub fn add_leaf(&mut self, leaf: Leaf) -> usize {
        let index = self.next_leaf;
        self.leaves.insert(index, leaf);
        self.next_leaf += 1;
        index
    }

    /// Puts a leaf back under a known index, returning the leaf it replaced.
    pub fn insert_leaf(&mut self, index: usize, leaf: Leaf) -> Option<Leaf> {
        self.next_leaf = self.next_leaf.max(index + 1);
        self.leaves.insert(index, leaf)
    }

    pub fn remove_leaf(&mut self, index: usize) -> Option<Leaf> {
        self.leaves.remove(&index)
    }

    pub(crate) fn leaves_mut(&mut self) -> impl Iterator<Item = &mut Leaf> {
        self.leaves.values_mut()
    }

    // ---------------------------------------------------------------------
    // Joints
    // ---------------------------------------------------------------------

    #[inline]
    pub fn joints(&self) -> &[Joint] {
        &self.joints
    }

    /// Adds a joint, keeping joints ordered by path index.
    pub fn add_joint(&mut self, joint: Joint) {
        let at = self
            .joints
            .partition_point(|j| j.path_index <= joint.path_index);
        self.joints.insert(at, joint);
    }

    pub fn clear_joints(&mut self) {
        self.joints.clear();
    }

    #[inline]
    pub fn has_joints(&self) -> bool {
        !self.joints.is_empty()
    }
}
