//! # Mesh
//!
//! Output container of the generator: one [`Buffer`] per material plus
//! the [`Segment`] ranges owned by every stem and leaf.
//!
//! Materials are generated into separate buffers and concatenated for
//! rendering. [`Mesh::update_segments`] rebases indices and segment
//! starts onto that concatenated layout.

mod buffer;

pub use buffer::Buffer;

use crate::error::MeshError;
use glam::{DQuat, DVec3};
use plant_tree::{StemId, Vertex};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::Range;

/// A vertex and index range within one material buffer.
///
/// Lookups for stems or leaves that produced no geometry return the
/// default, zero-length segment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub stem: Option<StemId>,
    pub leaf: Option<usize>,
    pub vertex_start: usize,
    pub vertex_count: usize,
    pub index_start: usize,
    pub index_count: usize,
}

impl Segment {
    pub fn vertex_range(&self) -> Range<usize> {
        self.vertex_start..self.vertex_start + self.vertex_count
    }

    pub fn index_range(&self) -> Range<usize> {
        self.index_start..self.index_start + self.index_count
    }
}

/// Identifies a leaf instance by its stem and its key in the stem's leaf map.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct LeafId {
    pub stem: StemId,
    pub leaf: usize,
}

impl LeafId {
    pub fn new(stem: StemId, leaf: usize) -> Self {
        Self { stem, leaf }
    }
}

/// Walk state carried from one stem to the next.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct State {
    pub segment: Segment,
    /// Direction of the last emitted ring.
    pub prev_direction: DVec3,
    /// Accumulated frame of the last emitted ring.
    pub prev_rotation: DQuat,
    /// First vertex of the last emitted ring.
    pub prev_index: usize,
    /// Path sample of the next ring.
    pub section: usize,
    pub joint_id: u32,
    pub joint_index: usize,
    pub joint_offset: f64,
    /// Material buffer receiving the stem's rings.
    pub mesh: usize,
    pub tex_offset: f64,
}

impl Default for State {
    fn default() -> Self {
        Self {
            segment: Segment::default(),
            prev_direction: DVec3::Z,
            prev_rotation: DQuat::IDENTITY,
            prev_index: 0,
            section: 0,
            joint_id: 0,
            joint_index: 0,
            joint_offset: 0.0,
            mesh: 0,
            tex_offset: 0.0,
        }
    }
}

/// Per-material triangle buffers with stem and leaf segments.
///
/// # Example
///
/// ```rust
/// use plant_mesh::Mesh;
/// use plant_tree::Vertex;
///
/// let mut mesh = Mesh::new();
/// mesh.init_buffer(1);
/// for _ in 0..8 {
///     mesh.push_vertex(0, Vertex::default());
/// }
/// mesh.add_triangle_ring(0, 4, 3, 0);
/// assert_eq!(mesh.indices(0).len(), 18);
/// assert!(mesh.validate().is_ok());
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    buffers: Vec<Buffer>,
    stems: Vec<BTreeMap<StemId, Segment>>,
    leaves: Vec<BTreeMap<LeafId, Segment>>,
}

impl Mesh {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears every buffer and resizes the set to `materials` buffers.
    pub fn init_buffer(&mut self, materials: usize) {
        self.buffers.clear();
        self.buffers.resize_with(materials, Buffer::new);
        self.stems.clear();
        self.stems.resize_with(materials, BTreeMap::new);
        self.leaves.clear();
        self.leaves.resize_with(materials, BTreeMap::new);
    }

    /// Number of material buffers.
    #[inline]
    pub fn material_count(&self) -> usize {
        self.buffers.len()
    }

    pub fn buffer(&self, material: usize) -> Option<&Buffer> {
        self.buffers.get(material)
    }

    /// Buffer for `material`, growing the set if needed.
    pub fn buffer_mut(&mut self, material: usize) -> &mut Buffer {
        if material >= self.buffers.len() {
            let materials = material + 1;
            self.buffers.resize_with(materials, Buffer::new);
            self.stems.resize_with(materials, BTreeMap::new);
            self.leaves.resize_with(materials, BTreeMap::new);
        }
        &mut self.buffers[material]
    }

    pub fn vertices(&self, material: usize) -> &[Vertex] {
        self.buffer(material).map_or(&[], Buffer::vertices)
    }

    pub fn indices(&self, material: usize) -> &[u32] {
        self.buffer(material).map_or(&[], Buffer::indices)
    }

    /// `(vertex count, index count)` of every material buffer.
    pub fn buffer_sizes(&self) -> Vec<(usize, usize)> {
        self.buffers
            .iter()
            .map(|b| (b.vertex_count(), b.index_count()))
            .collect()
    }

    pub fn vertex_count(&self) -> usize {
        self.buffers.iter().map(Buffer::vertex_count).sum()
    }

    pub fn index_count(&self) -> usize {
        self.buffers.iter().map(Buffer::index_count).sum()
    }

    // =========================================================================
    // BUILDING
    // =========================================================================

    pub fn push_vertex(&mut self, material: usize, vertex: Vertex) -> usize {
        self.buffer_mut(material).push_vertex(vertex)
    }

    pub fn add_triangle(&mut self, material: usize, a: usize, b: usize, c: usize) {
        self.buffer_mut(material).push_triangle(a, b, c);
    }

    /// Connects the ring starting at `i1` to the ring starting at `i2`.
    ///
    /// Both rings hold `divisions + 1` vertices. Triangles wind
    /// counterclockwise when viewed from outside the tube.
    pub fn add_triangle_ring(&mut self, i1: usize, i2: usize, divisions: usize, material: usize) {
        let buffer = self.buffer_mut(material);
        for i in 0..divisions {
            buffer.push_triangle(i1 + i, i2 + i + 1, i2 + i);
            buffer.push_triangle(i1 + i, i1 + i + 1, i2 + i + 1);
        }
    }

    /// Writes the triangles of [`Mesh::add_triangle_ring`] into a reserved
    /// index range starting at `at`, returning the position after them.
    ///
    /// Returns `None` without writing when the triangles run past the end
    /// of the index buffer.
    pub fn write_triangle_ring(
        &mut self,
        material: usize,
        at: usize,
        i1: usize,
        i2: usize,
        divisions: usize,
    ) -> Option<usize> {
        let end = at + divisions * 6;
        let buffer = self.buffer_mut(material);
        if end > buffer.index_count() {
            return None;
        }
        for (i, at) in (at..end).step_by(6).enumerate() {
            buffer.set_triangle(at, i1 + i, i2 + i + 1, i2 + i);
            buffer.set_triangle(at + 3, i1 + i, i1 + i + 1, i2 + i + 1);
        }
        Some(end)
    }

    pub fn reserve_vertices(&mut self, material: usize, count: usize) -> Range<usize> {
        self.buffer_mut(material).reserve_vertices(count)
    }

    pub fn reserve_indices(&mut self, material: usize, count: usize) -> Range<usize> {
        self.buffer_mut(material).reserve_indices(count)
    }

    /// Rolls a material buffer back to earlier lengths.
    pub fn truncate(&mut self, material: usize, vertices: usize, indices: usize) {
        if let Some(buffer) = self.buffers.get_mut(material) {
            buffer.truncate(vertices, indices);
        }
    }

    // =========================================================================
    // SEGMENTS
    // =========================================================================

    /// Records the segment of a stem. The first registration wins.
    pub fn insert_stem(&mut self, material: usize, stem: StemId, segment: Segment) {
        self.buffer_mut(material);
        self.stems[material].entry(stem).or_insert(segment);
    }

    pub fn insert_leaf(&mut self, material: usize, leaf: LeafId, segment: Segment) {
        self.buffer_mut(material);
        self.leaves[material].insert(leaf, segment);
    }

    pub fn stems(&self, material: usize) -> Option<&BTreeMap<StemId, Segment>> {
        self.stems.get(material)
    }

    pub fn leaves(&self, material: usize) -> Option<&BTreeMap<LeafId, Segment>> {
        self.leaves.get(material)
    }

    pub fn leaf_count(&self, material: usize) -> usize {
        self.leaves.get(material).map_or(0, BTreeMap::len)
    }

    /// Segment of `stem` in whichever material holds it.
    pub fn find_stem(&self, stem: StemId) -> Segment {
        self.stems
            .iter()
            .find_map(|segments| segments.get(&stem).copied())
            .unwrap_or_default()
    }

    pub fn find_leaf(&self, leaf: LeafId) -> Segment {
        self.leaves
            .iter()
            .find_map(|segments| segments.get(&leaf).copied())
            .unwrap_or_default()
    }

    /// Rebases every material after the first onto the concatenated
    /// vertex and index streams.
    pub fn update_segments(&mut self) {
        let Some(first) = self.buffers.first() else {
            return;
        };
        let mut vertex_offset = first.vertex_count();
        let mut index_offset = first.index_count();
        for material in 1..self.buffers.len() {
            let buffer = &mut self.buffers[material];
            buffer.offset_indices(vertex_offset as u32);
            let segments = self.stems[material]
                .values_mut()
                .chain(self.leaves[material].values_mut());
            for segment in segments {
                segment.vertex_start += vertex_offset;
                segment.index_start += index_offset;
            }
            vertex_offset += buffer.vertex_count();
            index_offset += buffer.index_count();
        }
    }

    // =========================================================================
    // EXPORT
    // =========================================================================

    /// Every material's vertices, concatenated.
    pub fn all_vertices(&self) -> Vec<Vertex> {
        self.buffers
            .iter()
            .flat_map(|b| b.vertices().iter().copied())
            .collect()
    }

    /// Every material's indices, concatenated.
    pub fn all_indices(&self) -> Vec<u32> {
        self.buffers
            .iter()
            .flat_map(|b| b.indices().iter().copied())
            .collect()
    }

    fn flat_f32<const N: usize>(&self, f: impl Fn(&Vertex) -> [f64; N]) -> Vec<f32> {
        self.buffers
            .iter()
            .flat_map(|b| b.vertices().iter())
            .flat_map(|v| f(v).map(|x| x as f32))
            .collect()
    }

    /// Flat xyz positions for GPU upload.
    pub fn positions_f32(&self) -> Vec<f32> {
        self.flat_f32(|v| v.position.to_array())
    }

    pub fn normals_f32(&self) -> Vec<f32> {
        self.flat_f32(|v| v.normal.to_array())
    }

    /// Flat xyzw tangents, with the bitangent sign in w.
    pub fn tangents_f32(&self) -> Vec<f32> {
        self.flat_f32(|v| v.tangent.extend(v.tangent_scale).to_array())
    }

    pub fn uvs_f32(&self) -> Vec<f32> {
        self.flat_f32(|v| v.uv.to_array())
    }

    pub fn joint_weights_f32(&self) -> Vec<f32> {
        self.flat_f32(|v| v.weights.to_array())
    }

    pub fn joint_indices_u32(&self) -> Vec<u32> {
        self.buffers
            .iter()
            .flat_map(|b| b.vertices().iter())
            .flat_map(|v| v.joints)
            .collect()
    }

    pub fn indices_u32(&self) -> Vec<u32> {
        self.all_indices()
    }

    /// Checks that every index refers to an existing vertex of the
    /// concatenated stream.
    pub fn validate(&self) -> Result<(), MeshError> {
        let vertex_count = self.vertex_count();
        match self
            .buffers
            .iter()
            .flat_map(|b| b.indices().iter())
            .find(|&&index| index as usize >= vertex_count)
        {
            Some(&index) => Err(MeshError::DanglingIndex {
                index,
                vertex_count,
            }),
            None => Ok(()),
        }
    }
}
