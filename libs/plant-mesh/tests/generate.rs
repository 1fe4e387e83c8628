//! End-to-end mesh generation through the public API.

use glam::{DVec2, DVec3};
use plant_mesh::{GeneratorConfig, Mesh, MeshGenerator};
use plant_tree::{Curve, Joint, Leaf, Material, Path, Plant, Spline, StemId, Surface};

fn line(points: &[DVec3]) -> Path {
    Path::new(Spline::linear(points.to_vec()).unwrap())
}

fn stem(plant: &mut Plant, parent: StemId, distance: f64, path: Path, radius: f64) -> StemId {
    let id = plant.add_stem(parent).unwrap();
    let stem = plant.stem_mut(id).unwrap();
    stem.set_path(path);
    stem.set_distance(distance);
    stem.set_max_radius(radius);
    stem.set_min_radius(0.0);
    id
}

fn assert_indices_in_range(mesh: &Mesh) {
    let vertices = mesh.vertex_count() as u32;
    let indices = mesh.indices_u32();
    assert_eq!(indices.len() % 3, 0);
    assert!(indices.iter().all(|&i| i < vertices));
    mesh.validate().unwrap();
}

#[test]
fn test_trunk_with_one_branch() {
    let mut plant = Plant::with_defaults();
    let root = plant.create_root();
    {
        let trunk = plant.stem_mut(root).unwrap();
        trunk.set_path(line(&[DVec3::ZERO, DVec3::new(0.0, 10.0, 0.0)]));
        trunk.set_max_radius(1.0);
        trunk.set_min_radius(0.0);
    }
    stem(
        &mut plant,
        root,
        5.0,
        line(&[DVec3::ZERO, DVec3::new(4.0, 0.0, 0.0)]),
        0.1,
    );

    let mut generator = MeshGenerator::new(GeneratorConfig::default());
    let mesh = generator.generate(&plant).unwrap();
    assert!(mesh.vertex_count() > 0);
    assert!(mesh.index_count() > 0);
    let zeros = mesh.indices_u32().iter().filter(|&&i| i == 0).count();
    assert!(zeros < 3, "{zeros} zero indices");
    assert_indices_in_range(mesh);
}

/// A trunk that forks twice, with offset side branches, collars, leaves,
/// joints and three materials.
fn orchard_tree() -> Plant {
    let mut plant = Plant::with_defaults();
    let bark = plant.add_material(Material::new("bark").with_ratio(2.0));
    let leaf = plant.add_material(Material::new("leaf"));
    plant.add_curve(Curve::constant("flat"));

    let root = plant.create_root();
    {
        let trunk = plant.stem_mut(root).unwrap();
        let mut path = line(&[
            DVec3::ZERO,
            DVec3::new(0.0, 2.0, 0.0),
            DVec3::new(0.0, 6.0, 0.0),
        ]);
        path.set_initial_divisions(1);
        trunk.set_path(path);
        trunk.set_max_radius(0.8);
        trunk.set_min_radius(0.3);
        trunk.set_material(Surface::Outer, bark);
        trunk.set_swelling(DVec2::new(1.2, 1.2));
        trunk.add_joint(Joint::new(0, 0, 0));
        trunk.add_joint(Joint::new(1, 0, 3));
    }
    let length = plant.stem(root).unwrap().path().length();

    let mut forks = Vec::new();
    for end in [DVec3::new(2.0, 3.0, 0.5), DVec3::new(-2.0, 3.0, -0.5)] {
        let mut path = line(&[DVec3::ZERO, end * 0.5, end]);
        path.set_initial_divisions(1);
        let id = stem(&mut plant, root, length, path, 0.3);
        plant
            .stem_mut(id)
            .unwrap()
            .set_material(Surface::Outer, bark);
        forks.push(id);
    }

    for (i, &fork) in forks.iter().enumerate() {
        let fork_length = plant.stem(fork).unwrap().path().length();
        let direction = if i == 0 { 1.0 } else { -1.0 };
        for end in [
            DVec3::new(direction, 1.0, 1.0),
            DVec3::new(direction, 1.0, -1.0),
        ] {
            stem(&mut plant, fork, fork_length, line(&[DVec3::ZERO, end]), 0.3);
        }
        let side = stem(
            &mut plant,
            fork,
            fork_length * 0.4,
            line(&[DVec3::ZERO, DVec3::new(0.0, 0.5, 2.0 * direction)]),
            0.08,
        );
        let side_stem = plant.stem_mut(side).unwrap();
        side_stem.set_swelling(DVec2::new(1.5, 1.5));
        side_stem.path_mut().set_initial_divisions(2);
        side_stem.add_leaf(Leaf {
            material: leaf,
            ..Leaf::at(1.0)
        });
        side_stem.add_leaf(Leaf {
            material: leaf,
            ..Leaf::default()
        });
    }
    stem(
        &mut plant,
        root,
        1.0,
        line(&[DVec3::ZERO, DVec3::new(0.0, 0.3, 3.0)]),
        0.15,
    );
    plant
}

#[test]
fn test_complex_tree_indices_stay_in_range() {
    let plant = orchard_tree();
    for config in [
        GeneratorConfig::default(),
        GeneratorConfig::default().with_collars(false),
        GeneratorConfig::default().with_forks(false),
        GeneratorConfig::default().with_leaves(false),
    ] {
        let mut generator = MeshGenerator::new(config);
        let mesh = generator.generate(&plant).unwrap();
        assert_indices_in_range(mesh);
        assert_eq!(mesh.material_count(), 3);
    }
}

#[test]
fn test_every_stem_and_leaf_is_registered() {
    let plant = orchard_tree();
    let mut generator = MeshGenerator::new(GeneratorConfig::default());
    let mesh = generator.generate(&plant).unwrap();

    let mut pending = vec![plant.root().unwrap()];
    let mut leaves = 0;
    while let Some(id) = pending.pop() {
        let segment = mesh.find_stem(id);
        assert!(segment.vertex_count > 0, "{id:?} has no geometry");
        leaves += plant.stem(id).unwrap().leaves().len();
        pending.extend(plant.children(id));
    }
    assert_eq!(mesh.leaf_count(2), leaves);
    for segment in mesh.leaves(2).unwrap().values() {
        assert_eq!(segment.vertex_count, 4);
        assert!(segment.vertex_range().end <= mesh.vertex_count());
    }
}

#[test]
fn test_export_streams_line_up() {
    let plant = orchard_tree();
    let mut generator = MeshGenerator::new(GeneratorConfig::default());
    let mesh = generator.generate(&plant).unwrap();

    let n = mesh.vertex_count();
    assert_eq!(mesh.positions_f32().len(), 3 * n);
    assert_eq!(mesh.normals_f32().len(), 3 * n);
    assert_eq!(mesh.tangents_f32().len(), 4 * n);
    assert_eq!(mesh.uvs_f32().len(), 2 * n);
    assert_eq!(mesh.joint_indices_u32().len(), 2 * n);
    assert_eq!(mesh.joint_weights_f32().len(), 2 * n);
    assert_eq!(mesh.indices_u32().len(), mesh.index_count());
    assert!(mesh.positions_f32().iter().all(|v| v.is_finite()));

    for pair in mesh.joint_weights_f32().chunks_exact(2) {
        assert!((pair[0] + pair[1] - 1.0).abs() < 1e-5, "weights {pair:?}");
    }
}
