//! # Plant
//!
//! Owner of a stem tree and of the tables its stems reference (radius
//! curves, materials and leaf meshes).
//!
//! Children are kept as a doubly linked sibling list hanging off the
//! parent's `child` link. New stems are pushed at the front of that list.
//! Subtrees can be detached with [`Plant::extract`] and put back exactly
//! where they were with [`Plant::reinsert`].

use crate::curve::Curve;
use crate::error::PlantError;
use crate::geometry::Geometry;
use crate::material::Material;
use crate::pool::{StemId, StemPool};
use crate::stem::Stem;
use config::constants::EPSILON;
use glam::DVec3;

/// A detached subtree and the position it was detached from.
///
/// Consumed by [`Plant::reinsert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use = "an extracted subtree stays detached until it is reinserted"]
pub struct Extraction {
    root: StemId,
    parent: Option<StemId>,
    next_sibling: Option<StemId>,
}

impl Extraction {
    /// Root of the detached subtree.
    pub fn root(&self) -> StemId {
        self.root
    }

    pub fn parent(&self) -> Option<StemId> {
        self.parent
    }

    pub fn next_sibling(&self) -> Option<StemId> {
        self.next_sibling
    }
}

/// Iterator over the children of a stem, in sibling order.
pub struct Children<'a> {
    plant: &'a Plant,
    next: Option<StemId>,
}

impl Iterator for Children<'_> {
    type Item = StemId;

    fn next(&mut self) -> Option<StemId> {
        let id = self.next?;
        self.next = self.plant.stem(id).and_then(Stem::next_sibling);
        Some(id)
    }
}

/// A stem tree with its shared tables.
///
/// # Example
///
/// ```rust
/// use plant_tree::Plant;
///
/// let mut plant = Plant::with_defaults();
/// let root = plant.create_root();
/// let a = plant.add_stem(root).unwrap();
/// let b = plant.add_stem(root).unwrap();
///
/// // Newer children come first.
/// assert_eq!(plant.children(root).collect::<Vec<_>>(), vec![b, a]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Plant {
    root: Option<StemId>,
    pool: StemPool,
    curves: Vec<Curve>,
    materials: Vec<Material>,
    leaf_meshes: Vec<Geometry>,
}

impl Plant {
    /// Creates a plant without stems or table entries.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a plant with one default material, radius curve and leaf mesh.
    pub fn with_defaults() -> Self {
        let mut plant = Self::new();
        plant.set_defaults();
        plant
    }

    /// Adds the default table entries to any empty table.
    pub fn set_defaults(&mut self) {
        if self.materials.is_empty() {
            self.materials.push(Material::default());
        }
        if self.curves.is_empty() {
            self.curves.push(Curve::falloff("default"));
        }
        if self.leaf_meshes.is_empty() {
            self.leaf_meshes.push(Geometry::plane("default"));
        }
    }

    // =========================================================================
    // STEM ACCESS
    // =========================================================================

    #[inline]
    pub fn root(&self) -> Option<StemId> {
        self.root
    }

    #[inline]
    pub fn pool(&self) -> &StemPool {
        &self.pool
    }

    pub fn stem(&self, id: StemId) -> Option<&Stem> {
        self.pool.get(id)
    }

    pub fn stem_mut(&mut self, id: StemId) -> Option<&mut Stem> {
        self.pool.get_mut(id)
    }

    fn live(&self, id: StemId) -> Result<&Stem, PlantError> {
        self.pool.get(id).ok_or(PlantError::StaleStem(id))
    }

    fn live_mut(&mut self, id: StemId) -> Result<&mut Stem, PlantError> {
        self.pool.get_mut(id).ok_or(PlantError::StaleStem(id))
    }

    /// Children of `id` in sibling order. Stale handles have no children.
    pub fn children(&self, id: StemId) -> Children<'_> {
        Children {
            plant: self,
            next: self.stem(id).and_then(Stem::child),
        }
    }

    // =========================================================================
    // TREE EDITING
    // =========================================================================

    /// Replaces the root (and its whole tree) with a fresh stem.
    pub fn create_root(&mut self) -> StemId {
        self.remove_root();
        let id = self.pool.allocate(Stem::new());
        self.root = Some(id);
        id
    }

    /// Deletes the root and every stem under it.
    pub fn remove_root(&mut self) {
        if let Some(root) = self.root.take() {
            self.deallocate_subtree(root);
        }
    }

    /// Adds a new stem as the first child of `parent`.
    pub fn add_stem(&mut self, parent: StemId) -> Result<StemId, PlantError> {
        let (depth, first) = {
            let stem = self.live(parent)?;
            (stem.depth + 1, stem.child)
        };
        let mut stem = Stem::new();
        stem.parent = Some(parent);
        stem.depth = depth;
        stem.next_sibling = first;
        let id = self.pool.allocate(stem);
        if let Some(first) = first {
            self.live_mut(first)?.prev_sibling = Some(id);
        }
        self.live_mut(parent)?.child = Some(id);
        Ok(id)
    }

    /// Unlinks `id` and frees it with all of its descendants.
    ///
    /// Descendants are freed before their ancestors, so re-adding the same
    /// shape top-down reuses the same slots.
    pub fn delete_stem(&mut self, id: StemId) -> Result<(), PlantError> {
        self.decouple(id)?;
        self.deallocate_subtree(id);
        Ok(())
    }

    /// Detaches the subtree rooted at `id` without freeing it.
    pub fn extract(&mut self, id: StemId) -> Result<Extraction, PlantError> {
        let (parent, next_sibling) = {
            let stem = self.live(id)?;
            (stem.parent, stem.next_sibling)
        };
        self.decouple(id)?;
        Ok(Extraction {
            root: id,
            parent,
            next_sibling,
        })
    }

    /// Puts an extracted subtree back in front of its former next sibling,
    /// or at the end of its former parent's children.
    pub fn reinsert(&mut self, extraction: Extraction) -> Result<(), PlantError> {
        let id = extraction.root;
        self.live(id)?;
        let Some(parent) = extraction.parent else {
            if self.root.is_some() {
                return Err(PlantError::RootExists);
            }
            self.root = Some(id);
            return Ok(());
        };
        self.live(parent)?;

        let (prev, next) = match extraction.next_sibling {
            Some(next) => {
                let sibling = self.live(next)?;
                if sibling.parent != Some(parent) {
                    return Err(PlantError::DetachedSibling(next));
                }
                (sibling.prev_sibling, Some(next))
            }
            None => (self.children(parent).last(), None),
        };

        {
            let stem = self.live_mut(id)?;
            stem.parent = Some(parent);
            stem.prev_sibling = prev;
            stem.next_sibling = next;
        }
        match prev {
            Some(prev) => self.live_mut(prev)?.next_sibling = Some(id),
            None => self.live_mut(parent)?.child = Some(id),
        }
        if let Some(next) = next {
            self.live_mut(next)?.prev_sibling = Some(id);
        }
        Ok(())
    }

    /// Reinserts a batch of extractions in the reverse order they were taken.
    pub fn reinsert_all(
        &mut self,
        extractions: impl IntoIterator<Item = Extraction>,
    ) -> Result<(), PlantError> {
        let extractions: Vec<Extraction> = extractions.into_iter().collect();
        for extraction in extractions.into_iter().rev() {
            self.reinsert(extraction)?;
        }
        Ok(())
    }

    fn decouple(&mut self, id: StemId) -> Result<(), PlantError> {
        let (parent, prev, next) = {
            let stem = self.live(id)?;
            (stem.parent, stem.prev_sibling, stem.next_sibling)
        };
        match (prev, parent) {
            (Some(prev), _) => self.live_mut(prev)?.next_sibling = next,
            (None, Some(parent)) => self.live_mut(parent)?.child = next,
            (None, None) => {}
        }
        if let Some(next) = next {
            self.live_mut(next)?.prev_sibling = prev;
        }
        if self.root == Some(id) {
            self.root = None;
        }
        let stem = self.live_mut(id)?;
        stem.parent = None;
        stem.prev_sibling = None;
        stem.next_sibling = None;
        Ok(())
    }

    fn deallocate_subtree(&mut self, id: StemId) {
        let children: Vec<StemId> = self.children(id).collect();
        for child in children {
            self.deallocate_subtree(child);
        }
        if let Err(error) = self.pool.deallocate(id) {
            tracing::debug!(%error, "stem already freed");
        }
    }

    // =========================================================================
    // GEOMETRY QUERIES
    // =========================================================================

    /// World position of the first sample frame of `id`: the sum of each
    /// ancestor's path point at the distance its child is attached.
    ///
    /// Stale handles are placed at the origin.
    pub fn location(&self, id: StemId) -> DVec3 {
        let mut location = DVec3::ZERO;
        let mut current = self.stem(id);
        while let Some(stem) = current {
            let parent = stem.parent.and_then(|p| self.stem(p));
            if let Some(parent) = parent {
                let path = parent.path();
                location += path.intermediate(stem.distance().clamp(0.0, path.length()));
            }
            current = parent;
        }
        location
    }

    /// Radius of `id` at path sample `index`.
    ///
    /// A missing radius curve leaves the stem at its maximum radius.
    pub fn radius(&self, id: StemId, index: usize) -> f64 {
        let Some(stem) = self.stem(id) else {
            return 0.0;
        };
        match self.curves.get(stem.radius_curve()) {
            Some(curve) => stem
                .path()
                .radius(index, curve, stem.min_radius(), stem.max_radius()),
            None => stem.max_radius(),
        }
    }

    /// Radius of `id` at arc length `distance`.
    pub fn intermediate_radius(&self, id: StemId, distance: f64) -> f64 {
        let Some(stem) = self.stem(id) else {
            return 0.0;
        };
        match self.curves.get(stem.radius_curve()) {
            Some(curve) => stem.path().intermediate_radius(
                distance,
                curve,
                stem.min_radius(),
                stem.max_radius(),
            ),
            None => stem.max_radius(),
        }
    }

    /// The two children attached at the very end of `id`, if there are
    /// exactly two of them.
    pub fn fork(&self, id: StemId) -> Option<[StemId; 2]> {
        let length = self.stem(id)?.path().length();
        let mut fork = self
            .children(id)
            .filter(|&child| {
                self.stem(child)
                    .is_some_and(|stem| stem.distance() >= length - EPSILON)
            });
        let pair = [fork.next()?, fork.next()?];
        fork.next().is_none().then_some(pair)
    }

    // =========================================================================
    // TABLES
    // =========================================================================

    pub fn curves(&self) -> &[Curve] {
        &self.curves
    }

    pub fn curve(&self, index: usize) -> Option<&Curve> {
        self.curves.get(index)
    }

    pub fn add_curve(&mut self, curve: Curve) -> usize {
        self.curves.push(curve);
        self.curves.len() - 1
    }

    pub fn update_curve(&mut self, index: usize, curve: Curve) -> Result<(), PlantError> {
        let len = self.curves.len();
        let slot = self
            .curves
            .get_mut(index)
            .ok_or(PlantError::out_of_range(index, len))?;
        *slot = curve;
        Ok(())
    }

    /// Removes a curve. Stems using it fall back to curve 0; later indices
    /// shift down.
    pub fn remove_curve(&mut self, index: usize) -> Result<Curve, PlantError> {
        if index >= self.curves.len() {
            return Err(PlantError::out_of_range(index, self.curves.len()));
        }
        for stem in self.pool.iter_mut() {
            let curve = stem.radius_curve();
            stem.set_radius_curve(remap(curve, index));
        }
        Ok(self.curves.remove(index))
    }

    pub fn materials(&self) -> &[Material] {
        &self.materials
    }

    pub fn material(&self, index: usize) -> Option<&Material> {
        self.materials.get(index)
    }

    pub fn add_material(&mut self, material: Material) -> usize {
        self.materials.push(material);
        self.materials.len() - 1
    }

    pub fn update_material(&mut self, index: usize, material: Material) -> Result<(), PlantError> {
        let len = self.materials.len();
        let slot = self
            .materials
            .get_mut(index)
            .ok_or(PlantError::out_of_range(index, len))?;
        *slot = material;
        Ok(())
    }

    /// Removes a material. Stems and leaves using it fall back to material
    /// 0; later indices shift down.
    pub fn remove_material(&mut self, index: usize) -> Result<Material, PlantError> {
        if index >= self.materials.len() {
            return Err(PlantError::out_of_range(index, self.materials.len()));
        }
        for stem in self.pool.iter_mut() {
            for material in stem.materials_mut().iter_mut() {
                *material = remap(*material, index);
            }
            for leaf in stem.leaves_mut() {
                leaf.material = remap(leaf.material, index);
            }
        }
        Ok(self.materials.remove(index))
    }

    pub fn leaf_meshes(&self) -> &[Geometry] {
        &self.leaf_meshes
    }

    pub fn leaf_mesh(&self, index: usize) -> Option<&Geometry> {
        self.leaf_meshes.get(index)
    }

    pub fn add_leaf_mesh(&mut self, geometry: Geometry) -> usize {
        self.leaf_meshes.push(geometry);
        self.leaf_meshes.len() - 1
    }

    pub fn update_leaf_mesh(&mut self, index: usize, geometry: Geometry) -> Result<(), PlantError> {
        let len = self.leaf_meshes.len();
        let slot = self
            .leaf_meshes
            .get_mut(index)
            .ok_or(PlantError::out_of_range(index, len))?;
        *slot = geometry;
        Ok(())
    }

    /// Removes a leaf mesh. Leaves using it fall back to mesh 0; later
    /// indices shift down.
    pub fn remove_leaf_mesh(&mut self, index: usize) -> Result<Geometry, PlantError> {
        if index >= self.leaf_meshes.len() {
            return Err(PlantError::out_of_range(index, self.leaf_meshes.len()));
        }
        for stem in self.pool.iter_mut() {
            for leaf in stem.leaves_mut() {
                leaf.mesh = remap(leaf.mesh, index);
            }
        }
        Ok(self.leaf_meshes.remove(index))
    }
}

fn remap(value: usize, removed: usize) -> usize {
    use std::cmp::Ordering;
    match value.cmp(&removed) {
        Ordering::Less => value,
        Ordering::Equal => 0,
        Ordering::Greater => value - 1,
    }
}
