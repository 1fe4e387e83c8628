//! Leaf instancing.

use super::joints;
use crate::mesh::{LeafId, Mesh, Segment, State};
use glam::DVec3;
use plant_tree::{Leaf, Plant, Stem, StemId};

/// Emits every leaf of `id` into its material buffer.
pub(crate) fn add_leaves(plant: &Plant, mesh: &mut Mesh, id: StemId, state: &State) {
    let Some(stem) = plant.stem(id) else {
        return;
    };
    let location = plant.location(id);
    for (&key, leaf) in stem.leaves() {
        add_leaf(plant, mesh, stem, LeafId::new(id, key), leaf, location, state);
    }
}

fn add_leaf(
    plant: &Plant,
    mesh: &mut Mesh,
    stem: &Stem,
    leaf_id: LeafId,
    leaf: &Leaf,
    location: DVec3,
    state: &State,
) {
    let Some(geometry) = plant.leaf_mesh(leaf.mesh) else {
        return;
    };
    let path = stem.path();
    let anchor = if leaf.position >= 0.0 && leaf.position < path.length() {
        path.intermediate(leaf.position)
    } else {
        path.get(path.len().saturating_sub(1))
    };
    let mut geometry = geometry.clone();
    geometry.transform(leaf.rotation, leaf.scale, location + anchor);

    let (joints, weights) = joints::leaf_binding(stem, leaf.position, state);
    let buffer = mesh.buffer_mut(leaf.material);
    let vertex_start = buffer.vertex_count();
    let index_start = buffer.index_count();
    for point in geometry.points() {
        buffer.push_vertex(plant_tree::Vertex {
            joints,
            weights,
            ..*point
        });
    }
    for triangle in geometry.indices().chunks_exact(3) {
        let [a, b, c] = [triangle[0], triangle[1], triangle[2]].map(|i| i as usize + vertex_start);
        buffer.push_triangle(a, b, c);
    }
    let segment = Segment {
        stem: Some(leaf_id.stem),
        leaf: Some(leaf_id.leaf),
        vertex_start,
        vertex_count: buffer.vertex_count() - vertex_start,
        index_start,
        index_count: buffer.index_count() - index_start,
    };
    mesh.insert_leaf(leaf.material, leaf_id, segment);
}
