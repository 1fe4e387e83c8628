//! Per-material vertex and index storage.

use plant_tree::Vertex;
use std::ops::Range;

/// Vertices and triangle indices sharing one material.
///
/// Indices are local to the buffer until [`Mesh::update_segments`]
/// rebases them onto the concatenated vertex stream.
///
/// [`Mesh::update_segments`]: super::Mesh::update_segments
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Buffer {
    vertices: Vec<Vertex>,
    indices: Vec<u32>,
}

impl Buffer {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    #[inline]
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    #[inline]
    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    #[inline]
    pub fn vertex(&self, index: usize) -> Option<&Vertex> {
        self.vertices.get(index)
    }

    #[inline]
    pub fn vertex_mut(&mut self, index: usize) -> Option<&mut Vertex> {
        self.vertices.get_mut(index)
    }

    #[inline]
    pub fn index(&self, at: usize) -> Option<u32> {
        self.indices.get(at).copied()
    }

    /// Appends a vertex and returns its index.
    pub fn push_vertex(&mut self, vertex: Vertex) -> usize {
        self.vertices.push(vertex);
        self.vertices.len() - 1
    }

    pub fn push_triangle(&mut self, a: usize, b: usize, c: usize) {
        self.indices.extend([a as u32, b as u32, c as u32]);
    }

    /// Appends `count` default vertices to be filled in later.
    pub fn reserve_vertices(&mut self, count: usize) -> Range<usize> {
        let start = self.vertices.len();
        self.vertices.resize(start + count, Vertex::default());
        start..start + count
    }

    /// Appends `count` zero indices to be filled in later.
    pub fn reserve_indices(&mut self, count: usize) -> Range<usize> {
        let start = self.indices.len();
        self.indices.resize(start + count, 0);
        start..start + count
    }

    /// Overwrites one triangle inside a reserved index range.
    ///
    /// Writes past the end are dropped and reported as `false`.
    pub fn set_triangle(&mut self, at: usize, a: usize, b: usize, c: usize) -> bool {
        match self.indices.get_mut(at..at + 3) {
            Some(slot) => {
                slot.copy_from_slice(&[a as u32, b as u32, c as u32]);
                true
            }
            None => false,
        }
    }

    /// Shrinks both streams back to the given lengths.
    pub fn truncate(&mut self, vertices: usize, indices: usize) {
        self.vertices.truncate(vertices);
        self.indices.truncate(indices);
    }

    pub fn clear(&mut self) {
        self.vertices.clear();
        self.indices.clear();
    }

    pub(super) fn offset_indices(&mut self, offset: u32) {
        for index in &mut self.indices {
            *index += offset;
        }
    }
}
