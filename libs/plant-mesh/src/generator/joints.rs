//! Skin weights for ring and leaf vertices.
//!
//! Every vertex is bound to at most two joints. A stem without joints of
//! its own inherits the joint its parent has at the attach point.

use crate::mesh::State;
use config::constants::EPSILON;
use glam::DVec2;
use plant_tree::{Joint, Plant, Stem, StemId};

/// Joint indices and weights of one vertex.
pub(crate) type Binding = ([u32; 2], DVec2);

fn single(id: u32) -> Binding {
    ([id, id], DVec2::new(1.0, 0.0))
}

/// Picks the joint a stem starts with.
pub(crate) fn set_initial_state(plant: &Plant, id: StemId, state: &mut State, parent: &State) {
    state.joint_id = 0;
    state.joint_index = 0;
    state.joint_offset = 0.0;
    let Some(stem) = plant.stem(id) else {
        return;
    };
    if let Some(first) = stem.joints().first() {
        state.joint_id = first.id;
        return;
    }
    let parent_stem = stem.parent().and_then(|p| plant.stem(p));
    match parent_stem.and_then(|p| joint_at(p, stem.distance())) {
        Some((index, joint)) => {
            state.joint_id = joint.id;
            state.joint_index = index;
        }
        None => state.joint_id = parent.joint_id,
    }
}

/// The joint governing arc length `distance` along `stem`, with its
/// position in the stem's joint list.
pub(crate) fn joint_at(stem: &Stem, distance: f64) -> Option<(usize, Joint)> {
    let joints = stem.joints();
    let last = joints.len().checked_sub(1)?;
    let index = stem.path().index_at(distance.max(0.0));
    let next = joints.partition_point(|j| j.path_index <= index);
    let at = next.saturating_sub(1).min(last);
    Some((at, joints[at]))
}

/// Advances the walk to `state.section` and binds the ring emitted there.
pub(crate) fn ring_binding(stem: &Stem, state: &mut State) -> Binding {
    let joints = stem.joints();
    if joints.is_empty() {
        return ([state.joint_id, 0], DVec2::new(1.0, 0.0));
    }
    if let Some(next) = joints.get(state.joint_index + 1) {
        if next.path_index == state.section {
            state.joint_index += 1;
            state.joint_id = next.id;
            state.joint_offset = 0.0;
        }
    }
    let path = stem.path();
    let index = state.joint_index.min(joints.len() - 1);
    let joint = joints[index];
    let last_sample = path.len().saturating_sub(1);

    if index == 0 && state.section <= joint.path_index {
        single(state.joint_id)
    } else if state.section == 0 || state.section == last_sample {
        single(state.joint_id)
    } else if state.section == joint.path_index {
        ([state.joint_id, joints[index - 1].id], DVec2::new(0.5, 0.5))
    } else {
        state.joint_offset += path.segment_length(state.section);
        binding(stem, state.joint_offset, index)
    }
}

/// Binds a point `offset` past joint `index` along the stem.
///
/// The first half of a joint's span blends with the previous joint and
/// the second half with the next one.
pub(crate) fn binding(stem: &Stem, offset: f64, index: usize) -> Binding {
    let joints = stem.joints();
    let Some(joint) = joints.get(index) else {
        return single(0);
    };
    let path = stem.path();
    let end = joints
        .get(index + 1)
        .map_or(path.len().saturating_sub(1), |next| next.path_index);
    let span = path.distance_between(joint.path_index, end);
    if span <= EPSILON {
        return single(joint.id);
    }

    let ratio = offset / span;
    let last = index + 1 >= joints.len();
    if ratio == 0.5 || (ratio < 0.5 && index == 0) || (ratio > 0.5 && last) {
        single(joint.id)
    } else if ratio > 0.5 {
        let blend = ratio - 0.5;
        (
            [joint.id, joints[index + 1].id],
            DVec2::new(1.0 - blend, blend),
        )
    } else {
        (
            [joint.id, joints[index - 1].id],
            DVec2::new(0.5 + ratio, 0.5 - ratio),
        )
    }
}

/// Binds a leaf at arc length `position`, or the stem's current joint
/// when it has none.
pub(crate) fn leaf_binding(stem: &Stem, position: f64, state: &State) -> Binding {
    let path = stem.path();
    let position = if position < 0.0 || position >= path.length() {
        path.length()
    } else {
        position
    };
    match joint_at(stem, position) {
        Some((index, joint)) => {
            let offset = position - path.distance(joint.path_index);
            binding(stem, offset, index)
        }
        None => single(state.joint_id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DVec3;
    use plant_tree::{Path, Spline};

    /// Straight stem of nine unit samples with joints at samples 0 and 4.
    fn jointed() -> Stem {
        let mut path = Path::new(
            Spline::linear(vec![DVec3::ZERO, DVec3::new(0.0, 2.0, 0.0), DVec3::new(0.0, 8.0, 0.0)])
                .unwrap(),
        );
        path.set_initial_divisions(1);
        path.set_divisions(6).unwrap();
        let mut stem = Stem::new();
        stem.set_path(path);
        stem.add_joint(Joint::new(1, 0, 0));
        stem.add_joint(Joint::new(2, 1, 4));
        stem
    }

    fn walk(stem: &Stem) -> Vec<Binding> {
        let mut state = State {
            joint_id: stem.joints()[0].id,
            ..State::default()
        };
        (0..stem.path().len())
            .map(|section| {
                state.section = section;
                ring_binding(stem, &mut state)
            })
            .collect()
    }

    #[test]
    fn test_path_layout() {
        assert_eq!(jointed().path().len(), 9);
    }

    #[test]
    fn test_ring_weights_blend_between_joints() {
        let bindings = walk(&jointed());
        assert_eq!(bindings[0], single(1));
        // One sample past the first joint: a quarter of the span to the next.
        assert_eq!(bindings[1], single(1));
        assert_eq!(bindings[3].0, [1, 2]);
        assert!(bindings[3].1.abs_diff_eq(DVec2::new(0.75, 0.25), 1e-12));
        assert_eq!(bindings[4], ([2, 1], DVec2::new(0.5, 0.5)));
        assert_eq!(bindings[5].0, [2, 1]);
        assert!(bindings[5].1.abs_diff_eq(DVec2::new(0.75, 0.25), 1e-12));
        assert_eq!(bindings[8], single(2));
    }

    #[test]
    fn test_weights_sum_to_one() {
        for (_, weights) in walk(&jointed()) {
            assert!((weights.x + weights.y - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_joint_at() {
        let stem = jointed();
        assert_eq!(joint_at(&stem, 0.5).map(|(i, j)| (i, j.id)), Some((0, 1)));
        assert_eq!(joint_at(&stem, 4.0).map(|(i, j)| (i, j.id)), Some((1, 2)));
        assert_eq!(joint_at(&stem, 100.0).map(|(i, _)| i), Some(1));
        assert!(joint_at(&Stem::new(), 1.0).is_none());
    }

    #[test]
    fn test_inherits_parent_joint() {
        let mut plant = Plant::new();
        let root = plant.create_root();
        *plant.stem_mut(root).unwrap() = jointed();
        let child = plant.add_stem(root).unwrap();
        plant.stem_mut(child).unwrap().set_distance(6.0);

        let mut state = State::default();
        set_initial_state(&plant, child, &mut state, &State::default());
        assert_eq!((state.joint_id, state.joint_index), (2, 1));

        let orphan = plant.add_stem(child).unwrap();
        let parent_state = State {
            joint_id: 9,
            ..State::default()
        };
        set_initial_state(&plant, orphan, &mut state, &parent_state);
        assert_eq!(state.joint_id, 9);
    }

    #[test]
    fn test_leaf_binding_without_joints() {
        let state = State {
            joint_id: 3,
            ..State::default()
        };
        assert_eq!(leaf_binding(&Stem::new(), -1.0, &state), single(3));
    }
}
