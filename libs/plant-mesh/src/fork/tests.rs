//! Tests for fork validation, ring splitting and stitching.

use super::*;
use crate::config::GeneratorConfig;
use crate::generator::MeshGenerator;
use plant_tree::{Path, Spline};

fn line(points: &[DVec3], initial_divisions: usize) -> Path {
    let mut path = Path::new(Spline::linear(points.to_vec()).unwrap());
    path.set_initial_divisions(initial_divisions);
    path
}

/// A vertical trunk splitting into two symmetric children leaning
/// towards +X and -X. Returns the trunk and the children in that order.
fn y_plant(divisions: usize) -> (Plant, StemId, [StemId; 2]) {
    let mut plant = Plant::with_defaults();
    let root = plant.create_root();
    plant.stem_mut(root).unwrap().set_path(line(
        &[DVec3::ZERO, DVec3::new(0.0, 5.0, 0.0), DVec3::new(0.0, 10.0, 0.0)],
        0,
    ));
    let right = plant.add_stem(root).unwrap();
    let left = plant.add_stem(root).unwrap();
    for (id, end) in [
        (right, DVec3::new(3.0, 3.0, 0.0)),
        (left, DVec3::new(-3.0, 3.0, 0.0)),
    ] {
        let stem = plant.stem_mut(id).unwrap();
        stem.set_path(line(&[DVec3::ZERO, end], divisions));
        stem.set_distance(10.0);
        stem.set_max_radius(0.1);
        stem.set_min_radius(0.0);
    }
    (plant, root, [right, left])
}

#[test]
fn test_symmetric_fork_is_valid() {
    let (plant, root, pair) = y_plant(0);
    assert!(Fork::is_valid(&plant, root, pair));
    let (plant, root, pair) = y_plant(2);
    assert!(Fork::is_valid(&plant, root, pair));
}

#[test]
fn test_odd_divisions_are_rejected() {
    let (mut plant, root, pair) = y_plant(0);
    for id in [root, pair[0], pair[1]] {
        plant.stem_mut(id).unwrap().set_section_divisions(7).unwrap();
    }
    assert!(!Fork::is_valid(&plant, root, pair));
}

#[test]
fn test_mismatched_divisions_are_rejected() {
    let (mut plant, root, pair) = y_plant(0);
    plant
        .stem_mut(pair[1])
        .unwrap()
        .set_section_divisions(6)
        .unwrap();
    assert!(!Fork::is_valid(&plant, root, pair));
}

#[test]
fn test_mismatched_materials_are_rejected() {
    let (mut plant, root, pair) = y_plant(0);
    let bark = plant.add_material(plant_tree::Material::new("bark"));
    plant
        .stem_mut(pair[0])
        .unwrap()
        .set_material(Surface::Outer, bark);
    assert!(!Fork::is_valid(&plant, root, pair));
}

#[test]
fn test_degenerate_child_is_rejected() {
    let (mut plant, root, pair) = y_plant(0);
    plant
        .stem_mut(pair[0])
        .unwrap()
        .set_path(line(&[DVec3::ZERO, DVec3::ZERO], 0));
    assert!(!Fork::is_valid(&plant, root, pair));
}

#[test]
fn test_short_parent_is_rejected() {
    let (mut plant, root, pair) = y_plant(0);
    plant
        .stem_mut(root)
        .unwrap()
        .set_path(line(&[DVec3::ZERO, DVec3::new(0.0, 10.0, 0.0)], 0));
    assert!(!Fork::is_valid(&plant, root, pair));
}

#[test]
fn test_mismatched_initial_divisions_are_rejected() {
    let (mut plant, root, pair) = y_plant(1);
    plant
        .stem_mut(pair[1])
        .unwrap()
        .path_mut()
        .set_initial_divisions(2);
    assert!(!Fork::is_valid(&plant, root, pair));
}

#[test]
fn test_middle_faces_the_first_child() {
    let (plant, _, pair) = y_plant(0);
    let rotation = rotate_into(DVec3::Z, DVec3::Y);

    // Ring vertex zero points at +X, straight at the first child.
    let middle = Fork::middle(&plant, pair, DVec3::Y, rotation, 8);
    assert_eq!(
        middle,
        Middle {
            length: 4,
            edge1: 6,
            edge2: 2,
            offset: 1
        }
    );

    let swapped = Fork::middle(&plant, [pair[1], pair[0]], DVec3::Y, rotation, 8);
    assert_eq!(swapped.edge1, middle.edge2);
    assert_eq!(swapped.edge2, middle.edge1);
}

#[test]
fn test_middle_halves_the_ring() {
    let (plant, _, pair) = y_plant(0);
    let rotation = rotate_into(DVec3::Z, DVec3::Y) * DQuat::from_rotation_y(0.3);
    for divisions in [4, 6, 8, 10, 12] {
        let middle = Fork::middle(&plant, pair, DVec3::Y, rotation, divisions);
        assert!(middle.edge1 < divisions && middle.edge2 < divisions);
        assert_eq!(
            (middle.edge2 + divisions - middle.edge1) % divisions,
            divisions / 2,
            "{divisions} divisions: {middle:?}"
        );
        assert_eq!(middle.length + 1 - middle.offset, divisions / 2);
    }
}

fn assert_welded(divisions: usize) {
    let (plant, root, _) = y_plant(divisions);
    let mut generator = MeshGenerator::new(GeneratorConfig::default());
    let mesh = generator.generate(&plant).unwrap();
    mesh.validate().unwrap();

    // The generator stitches children in the plant's own fork order.
    let pair = plant.fork(root).unwrap();
    let s = plant.stem(root).unwrap().section_divisions() + 1;
    let parent = mesh.find_stem(root);
    let base = parent.vertex_start + parent.vertex_count - s;
    let rotation = rotate_into(DVec3::Z, DVec3::Y);
    let middle = Fork::middle(&plant, pair, DVec3::Y, rotation, 8);
    let vertices = mesh.vertices(0);

    let child = mesh.find_stem(pair[0]);
    for i in 0..=middle.length {
        let k = (middle.edge1 + i) % 8;
        let a = vertices[base + k].position;
        let b = vertices[child.vertex_start + k].position;
        assert!(a.abs_diff_eq(b, 1e-9), "first arc vertex {k}: {a} vs {b}");
    }
    let child = mesh.find_stem(pair[1]);
    for i in middle.offset..=middle.length - middle.offset {
        let k = (middle.edge2 + i) % 8;
        let a = vertices[base + k].position;
        let b = vertices[child.vertex_start + k].position;
        assert!(a.abs_diff_eq(b, 1e-9), "second arc vertex {k}: {a} vs {b}");
    }

    let empty = mesh
        .indices(0)
        .chunks_exact(3)
        .filter(|t| t[0] == t[1] && t[1] == t[2])
        .count();
    assert_eq!(empty, 0, "unfilled reserved triangles");
}

#[test]
fn test_connect_welds_arcs() {
    assert_welded(0);
}

#[test]
fn test_connect_welds_arcs_with_transition_rings() {
    assert_welded(2);
}

/// A trunk exactly `initial_divisions + 3` samples long, forking into
/// children with `child_divisions` transition rings each.
fn short_y_plant(initial_divisions: usize, child_divisions: usize) -> (Plant, StemId) {
    let (mut plant, root, _) = y_plant(child_divisions);
    let path = plant.stem_mut(root).unwrap().path_mut();
    path.set_initial_divisions(initial_divisions);
    path.set_divisions(1).unwrap();
    (plant, root)
}

fn generate(plant: &Plant, config: GeneratorConfig) -> Mesh {
    MeshGenerator::new(config).generate(plant).unwrap().clone()
}

/// Edges used by a single triangle, with vertices matched by position.
fn open_edges(mesh: &Mesh) -> usize {
    let vertices = mesh.all_vertices();
    let key = |i: u32| {
        vertices[i as usize]
            .position
            .to_array()
            .map(|x| (x * 1.0e6).round() as i64)
    };
    let mut edges = std::collections::HashMap::new();
    for t in mesh.all_indices().chunks_exact(3) {
        for (a, b) in [(t[0], t[1]), (t[1], t[2]), (t[2], t[0])] {
            let (a, b) = (key(a), key(b));
            if a != b {
                *edges.entry((a.min(b), a.max(b))).or_insert(0) += 1;
            }
        }
    }
    edges.values().filter(|&&count| count == 1).count()
}

fn degenerate_triangles(mesh: &Mesh) -> usize {
    mesh.all_indices()
        .chunks_exact(3)
        .filter(|t| t[0] == t[1] || t[1] == t[2] || t[0] == t[2])
        .count()
}

#[test]
fn test_shortest_parent_is_stitched() {
    for initial_divisions in 0..=2 {
        for child_divisions in 1..=3 {
            let (plant, root) = short_y_plant(initial_divisions, child_divisions);
            assert_eq!(
                plant.stem(root).unwrap().path().len(),
                initial_divisions + 3
            );
            let pair = plant.fork(root).unwrap();
            assert!(Fork::is_valid(&plant, root, pair));

            let stitched = generate(&plant, GeneratorConfig::default());
            let separate = generate(&plant, GeneratorConfig::default().with_forks(false));
            stitched.validate().unwrap();
            assert_eq!(degenerate_triangles(&stitched), 0);
            assert!(
                open_edges(&stitched) < open_edges(&separate),
                "trunk {initial_divisions}, children {child_divisions}: fork was not welded"
            );
        }
    }
}

#[test]
fn test_cross_material_fork_skips_seam_triangles() {
    let mut seams = 0;
    for divisions in [4, 6, 8, 10, 12] {
        let (mut plant, root, pair) = y_plant(0);
        let bark = plant.add_material(plant_tree::Material::new("bark"));
        for id in [root, pair[0], pair[1]] {
            plant
                .stem_mut(id)
                .unwrap()
                .set_section_divisions(divisions)
                .unwrap();
        }
        for id in pair {
            plant.stem_mut(id).unwrap().set_material(Surface::Outer, bark);
        }
        let rotation = rotate_into(DVec3::Z, DVec3::Y);
        let pair = plant.fork(root).unwrap();
        let middle = Fork::middle(&plant, pair, DVec3::Y, rotation, divisions);
        if middle.offset == 0 {
            seams += 1;
        }

        let mesh = generate(&plant, GeneratorConfig::default());
        mesh.validate().unwrap();
        assert_eq!(degenerate_triangles(&mesh), 0);
        // Five rings of quads up to the base ring, nothing more.
        assert_eq!(mesh.indices(0).len(), 5 * divisions * 6);
    }
    assert!(seams > 0);
}

#[test]
fn test_forks_can_be_disabled() {
    let (plant, root, pair) = y_plant(0);
    let mut generator = MeshGenerator::new(GeneratorConfig::default().with_forks(false));
    let mesh = generator.generate(&plant).unwrap();
    mesh.validate().unwrap();

    // Without stitching every stem keeps only its own rings.
    let sd = plant.stem(root).unwrap().section_divisions();
    let trunk = mesh.find_stem(root);
    assert_eq!(trunk.vertex_count, 6 * (sd + 1));
    for id in pair {
        assert_eq!(mesh.find_stem(id).vertex_count, 2 * (sd + 1));
    }
}
