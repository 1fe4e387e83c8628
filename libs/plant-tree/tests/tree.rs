//! Tree editing through the public API.

use glam::DVec3;
use plant_tree::{Path, Plant, Spline, Stem, StemId, StemPool};

/// Every stem below `id` with its parent and children, depth first.
fn structure(plant: &Plant, id: StemId) -> Vec<(StemId, Option<StemId>, Vec<StemId>)> {
    let children: Vec<StemId> = plant.children(id).collect();
    let mut out = vec![(id, plant.stem(id).unwrap().parent(), children.clone())];
    for child in children {
        out.extend(structure(plant, child));
    }
    out
}

#[test]
fn test_lifo_reuse_returns_the_same_slots() {
    let mut pool = StemPool::with_block_size(4);
    let first: Vec<StemId> = (0..10).map(|_| pool.allocate(Stem::new())).collect();
    for &id in first.iter().rev() {
        pool.deallocate(id).unwrap();
    }
    let second: Vec<StemId> = (0..10).map(|_| pool.allocate(Stem::new())).collect();

    let slots = |ids: &[StemId]| ids.iter().map(|id| id.slot()).collect::<Vec<_>>();
    assert_eq!(slots(&first), slots(&second));
    assert!(first.iter().all(|&id| pool.get(id).is_none()));
    assert_eq!(pool.pool_count(), 3);
}

#[test]
fn test_extract_reinsert_any_subtree() {
    let mut plant = Plant::with_defaults();
    let root = plant.create_root();
    let mut stems = vec![root];
    // A small irregular tree: stem i hangs under stem i / 2.
    for i in 1..12 {
        let parent = stems[i / 2];
        stems.push(plant.add_stem(parent).unwrap());
    }
    let before = structure(&plant, root);

    for &id in &stems[1..] {
        let extraction = plant.extract(id).unwrap();
        assert!(plant.stem(id).unwrap().parent().is_none());
        plant.reinsert(extraction).unwrap();
        assert_eq!(structure(&plant, root), before, "after moving {id:?}");
    }
}

#[test]
fn test_stale_handles_after_delete() {
    let mut plant = Plant::new();
    let root = plant.create_root();
    let branch = plant.add_stem(root).unwrap();
    let twig = plant.add_stem(branch).unwrap();
    plant.delete_stem(branch).unwrap();

    assert!(plant.stem(twig).is_none());
    assert!(plant.add_stem(twig).is_err());
    let fresh = plant.add_stem(root).unwrap();
    assert_ne!(fresh, branch);
}

#[test]
fn test_branch_location_follows_parent_path() {
    let mut plant = Plant::with_defaults();
    let root = plant.create_root();
    let spline = Spline::cubic(vec![
        DVec3::ZERO,
        DVec3::new(0.0, 1.0, 0.0),
        DVec3::new(0.0, 2.0, 0.0),
        DVec3::new(0.0, 3.0, 0.0),
    ])
    .unwrap();
    plant.stem_mut(root).unwrap().set_path(Path::new(spline));
    let branch = plant.add_stem(root).unwrap();
    plant.stem_mut(branch).unwrap().set_distance(1.5);

    assert!(plant
        .location(branch)
        .abs_diff_eq(DVec3::new(0.0, 1.5, 0.0), 1e-9));
}
