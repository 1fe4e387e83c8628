//! Tests for the depth-first mesh walk.

use super::*;
use crate::mesh::LeafId;
use plant_tree::{Joint, Leaf, Material, Path};

fn line(points: &[DVec3]) -> Path {
    Path::new(Spline::linear(points.to_vec()).unwrap())
}

fn trunk() -> (Plant, StemId) {
    let mut plant = Plant::with_defaults();
    let root = plant.create_root();
    plant
        .stem_mut(root)
        .unwrap()
        .set_path(line(&[DVec3::ZERO, DVec3::new(0.0, 10.0, 0.0)]));
    (plant, root)
}

fn add_branch(plant: &mut Plant, parent: StemId, distance: f64, end: DVec3) -> StemId {
    let id = plant.add_stem(parent).unwrap();
    let stem = plant.stem_mut(id).unwrap();
    stem.set_path(line(&[DVec3::ZERO, end]));
    stem.set_distance(distance);
    stem.set_max_radius(0.1);
    id
}

fn generate(plant: &Plant) -> Mesh {
    MeshGenerator::new(GeneratorConfig::default())
        .generate(plant)
        .unwrap()
        .clone()
}

#[test]
fn test_single_stem_is_capped() {
    let (plant, root) = trunk();
    let mesh = generate(&plant);
    mesh.validate().unwrap();

    // Two rings of nine, plus the eight cap vertices.
    let segment = mesh.find_stem(root);
    assert_eq!(segment.vertex_count, 26);
    // One ring of quads plus a six triangle cap.
    assert_eq!(segment.index_count, 48 + 18);
    assert_eq!(mesh.vertex_count(), 26);
}

#[test]
fn test_uncapped_when_min_radius_is_zero() {
    let (mut plant, root) = trunk();
    plant.stem_mut(root).unwrap().set_min_radius(0.0);
    let mesh = generate(&plant);
    assert_eq!(mesh.find_stem(root).vertex_count, 18);
    assert_eq!(mesh.find_stem(root).index_count, 48);
}

#[test]
fn test_first_ring_frame() {
    let (plant, _) = trunk();
    let mesh = generate(&plant);
    let vertices = mesh.vertices(0);

    // Z turns onto the trunk direction and leaves X in place.
    assert!(vertices[0].position.abs_diff_eq(DVec3::new(0.2, 0.0, 0.0), 1e-12));
    assert!(vertices[0].normal.abs_diff_eq(DVec3::X, 1e-12));
    assert!(vertices[0].tangent.abs_diff_eq(DVec3::Y, 1e-12));
    assert_eq!(vertices[0].uv, DVec2::new(1.0, 0.0));
    assert_eq!(vertices[8].uv, DVec2::new(0.0, 0.0));
    assert!(vertices[8].position.abs_diff_eq(vertices[0].position, 1e-12));
}

#[test]
fn test_texture_v_grows_along_the_stem() {
    let (mut plant, root) = trunk();
    plant.update_material(0, Material::new("bark").with_ratio(2.0)).unwrap();
    let mesh = generate(&plant);
    let vertices = mesh.vertices(0);
    let expected = 10.0 * 2.0 / (TAU * plant.radius(root, 0));
    assert!((vertices[9].uv.y - expected).abs() < 1e-9);
}

#[test]
fn test_child_ring_faces_parent() {
    let (mut plant, root) = trunk();
    let branch = add_branch(&mut plant, root, 5.0, DVec3::new(4.0, 0.0, 0.0));
    let mesh = generate(&plant);
    mesh.validate().unwrap();

    let segment = mesh.find_stem(branch);
    let first = mesh.vertices(0)[segment.vertex_start];
    assert!(first.position.abs_diff_eq(DVec3::new(0.0, 5.1, 0.0), 1e-9));
}

#[test]
fn test_nested_stems_all_generate() {
    let (mut plant, root) = trunk();
    let branch = add_branch(&mut plant, root, 5.0, DVec3::new(4.0, 0.0, 0.0));
    let twig = add_branch(&mut plant, branch, 2.0, DVec3::new(0.0, 0.0, 2.0));
    let other = add_branch(&mut plant, root, 8.0, DVec3::new(-3.0, 1.0, 0.0));
    let mesh = generate(&plant);
    mesh.validate().unwrap();

    let mut starts = Vec::new();
    for id in [root, branch, twig, other] {
        let segment = mesh.find_stem(id);
        assert!(segment.vertex_count > 0, "{id:?} produced no vertices");
        assert_eq!(segment.stem, Some(id));
        starts.push(segment.vertex_start);
    }
    // Children are walked after their parent.
    assert!(starts[0] < starts[1] && starts[1] < starts[2]);
    assert!(starts[0] < starts[3]);
}

#[test]
fn test_materials_are_rebased() {
    let (mut plant, root) = trunk();
    let bark = plant.add_material(Material::new("bark"));
    let branch = add_branch(&mut plant, root, 5.0, DVec3::new(4.0, 0.0, 0.0));
    {
        let stem = plant.stem_mut(branch).unwrap();
        stem.set_material(Surface::Outer, bark);
        stem.set_material(Surface::Inner, bark);
    }
    let mesh = generate(&plant);
    mesh.validate().unwrap();

    assert_eq!(mesh.material_count(), 2);
    let trunk_vertices = mesh.vertices(0).len();
    let segment = mesh.find_stem(branch);
    assert_eq!(segment.vertex_start, trunk_vertices);
    assert_eq!(segment.index_start, mesh.indices(0).len());
    assert_eq!(mesh.stems(bark).unwrap().len(), 1);
}

#[test]
fn test_separate_cap_material() {
    let (mut plant, root) = trunk();
    let wood = plant.add_material(Material::new("wood"));
    plant
        .stem_mut(root)
        .unwrap()
        .set_material(Surface::Inner, wood);
    let mesh = generate(&plant);
    mesh.validate().unwrap();

    assert_eq!(mesh.vertices(0).len(), 18);
    assert_eq!(mesh.vertices(wood).len(), 8);
    assert!(mesh
        .vertices(wood)
        .iter()
        .all(|v| v.normal.abs_diff_eq(DVec3::Y, 1e-12)));
}

#[test]
fn test_joint_binding() {
    let (mut plant, root) = trunk();
    plant.stem_mut(root).unwrap().add_joint(Joint::new(3, 0, 0));
    let branch = add_branch(&mut plant, root, 5.0, DVec3::new(4.0, 0.0, 0.0));
    let mesh = generate(&plant);

    // The branch has no joints of its own and inherits the trunk's.
    let segment = mesh.find_stem(branch);
    for vertex in mesh.all_vertices() {
        assert_eq!(vertex.joints[0], 3);
        assert_eq!(vertex.weights, DVec2::new(1.0, 0.0));
    }
    assert!(segment.vertex_count > 0);
}

#[test]
fn test_leaves_are_instanced() {
    let (mut plant, root) = trunk();
    plant.stem_mut(root).unwrap().set_min_radius(0.0);
    let key = plant.stem_mut(root).unwrap().add_leaf(Leaf::at(5.0));
    let mesh = generate(&plant);
    mesh.validate().unwrap();

    let segment = mesh.find_leaf(LeafId::new(root, key));
    assert_eq!(segment.vertex_start, 18);
    assert_eq!(segment.vertex_count, 4);
    assert_eq!(segment.index_count, 6);
    assert_eq!(segment.leaf, Some(key));
    let corner = mesh.vertices(0)[segment.vertex_start].position;
    assert!(corner.abs_diff_eq(DVec3::new(-0.5, 5.0, 0.0), 1e-12));

    let without = MeshGenerator::new(GeneratorConfig::default().with_leaves(false))
        .generate(&plant)
        .unwrap()
        .vertex_count();
    assert_eq!(without, 18);
}

#[test]
fn test_profile_replaces_circle() {
    let (plant, _) = trunk();
    let diamond = Spline::linear(vec![
        DVec3::X,
        DVec3::Y,
        DVec3::NEG_X,
        DVec3::NEG_Y,
        DVec3::X,
    ])
    .unwrap();
    let mut generator = MeshGenerator::new(GeneratorConfig::default());
    generator.set_profile(Some(diamond));
    let mesh = generator.generate(&plant).unwrap();
    mesh.validate().unwrap();

    // Halfway between the first two corners, scaled by the base radius.
    let second = mesh.vertices(0)[1].position;
    assert!(second.abs_diff_eq(DVec3::new(0.1, 0.0, -0.1), 1e-12));
}

#[test]
fn test_unknown_references_are_reported() {
    let (mut plant, root) = trunk();
    let mut generator = MeshGenerator::new(GeneratorConfig::default());
    let before = generator.generate(&plant).unwrap().vertex_count();

    plant
        .stem_mut(root)
        .unwrap()
        .set_material(Surface::Outer, 4);
    assert_eq!(
        generator.generate(&plant).unwrap_err(),
        MeshError::UnknownMaterial {
            stem: root,
            material: 4,
            count: 1
        }
    );
    assert_eq!(generator.mesh().vertex_count(), before);

    plant
        .stem_mut(root)
        .unwrap()
        .set_material(Surface::Outer, 0);
    plant.stem_mut(root).unwrap().set_radius_curve(7);
    assert!(matches!(
        generator.generate(&plant),
        Err(MeshError::UnknownCurve { curve: 7, .. })
    ));
}

#[test]
fn test_unknown_leaf_mesh() {
    let (mut plant, root) = trunk();
    plant.stem_mut(root).unwrap().add_leaf(Leaf {
        mesh: 3,
        ..Leaf::default()
    });
    let mut generator = MeshGenerator::new(GeneratorConfig::default());
    assert!(matches!(
        generator.generate(&plant),
        Err(MeshError::UnknownLeafMesh { mesh: 3, .. })
    ));

    let mut generator = MeshGenerator::new(GeneratorConfig::default().with_leaves(false));
    assert!(generator.generate(&plant).is_ok());
}

#[test]
fn test_curve_table_may_be_empty() {
    let mut plant = Plant::new();
    plant.add_material(Material::default());
    let root = plant.create_root();
    {
        let stem = plant.stem_mut(root).unwrap();
        stem.set_path(line(&[DVec3::ZERO, DVec3::new(0.0, 1.0, 0.0)]));
        stem.set_max_radius(0.5);
        stem.set_radius_curve(2);
    }
    let mesh = generate(&plant);
    assert!(mesh.vertices(0)[9].position.abs_diff_eq(DVec3::new(0.5, 1.0, 0.0), 1e-12));
}

#[test]
fn test_empty_plant() {
    let plant = Plant::with_defaults();
    let mesh = generate(&plant);
    assert_eq!(mesh.vertex_count(), 0);
    assert_eq!(mesh.material_count(), 1);
}

#[test]
fn test_regenerate_replaces_output() {
    let (plant, _) = trunk();
    let mut generator = MeshGenerator::new(GeneratorConfig::default());
    let first = generator.generate(&plant).unwrap().clone();
    assert_eq!(generator.generate(&plant).unwrap(), &first);

    let second = generator.take_mesh();
    assert_eq!(second, first);
    assert_eq!(generator.mesh().vertex_count(), 0);
}
