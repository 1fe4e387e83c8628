//! # Mesh Generator
//!
//! Depth-first walk over a [`Plant`] that extrudes the cross-section
//! template along every stem path.
//!
//! ## Walk
//!
//! ```text
//! add_stem
//!   ├── add_sections   rings, collar, fork reservations, cap
//!   ├── add_leaves
//!   ├── create_fork    both fork children, then Fork::connect
//!   └── add_child_stems
//! ```
//!
//! Every ring is rotated from the previous one by the shortest arc between
//! their directions, so frames never twist along a stem. Children start
//! from a frame whose first ring vertex faces along the parent.

mod joints;
mod leaves;

use crate::collar::Collar;
use crate::config::GeneratorConfig;
use crate::cross_section::CrossSection;
use crate::error::MeshError;
use crate::fork::{self, Fork, ForkReservation};
use crate::mesh::{Mesh, Segment, State};
use config::constants::EPSILON;
use glam::{DQuat, DVec2, DVec3};
use plant_tree::math::{project_onto_plane, rotate_into};
use plant_tree::{Plant, Spline, Stem, StemId, Surface, Vertex};
use std::f64::consts::TAU;
use tracing::debug;

/// Builds per-material meshes from plants.
///
/// The generator keeps its output between runs. Each call to
/// [`MeshGenerator::generate`] replaces it.
#[derive(Debug, Default)]
pub struct MeshGenerator {
    config: GeneratorConfig,
    mesh: Mesh,
    section: CrossSection,
}

impl MeshGenerator {
    pub fn new(config: GeneratorConfig) -> Self {
        Self {
            config,
            mesh: Mesh::new(),
            section: CrossSection::new(),
        }
    }

    #[inline]
    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// The mesh of the last successful run.
    #[inline]
    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    /// Hands the generated mesh over, leaving an empty one behind.
    pub fn take_mesh(&mut self) -> Mesh {
        std::mem::take(&mut self.mesh)
    }

    #[inline]
    pub fn cross_section(&self) -> &CrossSection {
        &self.section
    }

    /// Uses `profile` instead of a circle for every ring.
    pub fn set_profile(&mut self, profile: Option<Spline>) {
        self.section.set_profile(profile);
    }

    // =========================================================================
    // GENERATION
    // =========================================================================

    /// Generates the whole plant.
    ///
    /// # Errors
    ///
    /// Fails before touching the previous output when a stem or leaf
    /// references a material, radius curve or leaf mesh the plant does not
    /// have.
    pub fn generate(&mut self, plant: &Plant) -> Result<&Mesh, MeshError> {
        let materials = self.check(plant)?;
        self.mesh.init_buffer(materials);
        if let Some(root) = plant.root() {
            let mut state = State::default();
            self.add_stem(plant, root, &mut state, &State::default(), false);
        }
        self.mesh.update_segments();
        debug!(
            materials,
            vertices = self.mesh.vertex_count(),
            indices = self.mesh.index_count(),
            "generated plant mesh"
        );
        Ok(&self.mesh)
    }

    /// Checks every reference of every reachable stem and returns the
    /// number of material buffers to create.
    fn check(&self, plant: &Plant) -> Result<usize, MeshError> {
        let count = plant.materials().len().max(1);
        let curves = plant.curves().len();
        let meshes = plant.leaf_meshes().len();
        let mut pending: Vec<StemId> = plant.root().into_iter().collect();

        while let Some(id) = pending.pop() {
            let Some(stem) = plant.stem(id) else {
                continue;
            };
            for surface in [Surface::Outer, Surface::Inner] {
                let material = stem.material(surface);
                if material >= count {
                    return Err(MeshError::UnknownMaterial {
                        stem: id,
                        material,
                        count,
                    });
                }
            }
            if curves > 0 && stem.radius_curve() >= curves {
                return Err(MeshError::UnknownCurve {
                    stem: id,
                    curve: stem.radius_curve(),
                    count: curves,
                });
            }
            if self.config.leaves {
                for leaf in stem.leaves().values() {
                    if leaf.mesh >= meshes {
                        return Err(MeshError::UnknownLeafMesh {
                            stem: id,
                            mesh: leaf.mesh,
                            count: meshes,
                        });
                    }
                    if leaf.material >= count {
                        return Err(MeshError::UnknownMaterial {
                            stem: id,
                            material: leaf.material,
                            count,
                        });
                    }
                }
            }
            pending.extend(plant.children(id));
        }
        Ok(count)
    }

    /// The fork pair of `id` when it is enabled and can be stitched.
    fn valid_fork(&self, plant: &Plant, id: StemId) -> Option<[StemId; 2]> {
        if !self.config.forks {
            return None;
        }
        let pair = plant.fork(id)?;
        if Fork::is_valid(plant, id, pair) {
            Some(pair)
        } else {
            debug!(stem = ?id, "fork cannot be stitched, building separate stems");
            None
        }
    }

    fn add_stem(
        &mut self,
        plant: &Plant,
        id: StemId,
        state: &mut State,
        parent: &State,
        in_fork: bool,
    ) {
        let Some(stem) = plant.stem(id) else {
            return;
        };
        let fork = self.valid_fork(plant, id);
        state.mesh = stem.material(Surface::Outer);
        let buffer = self.mesh.buffer_mut(state.mesh);
        state.segment = Segment {
            stem: Some(id),
            leaf: None,
            vertex_start: buffer.vertex_count(),
            vertex_count: 0,
            index_start: buffer.index_count(),
            index_count: 0,
        };
        joints::set_initial_state(plant, id, state, parent);

        let reservation = self.add_sections(plant, id, stem, state, parent, in_fork, fork);
        let buffer = self.mesh.buffer_mut(state.mesh);
        state.segment.vertex_count = buffer.vertex_count() - state.segment.vertex_start;
        state.segment.index_count = buffer.index_count() - state.segment.index_start;

        if self.config.leaves {
            leaves::add_leaves(plant, &mut self.mesh, id, state);
        }
        let fork = fork.zip(reservation);
        if let Some((pair, reservation)) = &fork {
            self.create_fork(plant, id, *pair, state, reservation);
        }
        if !in_fork {
            self.add_child_stems(plant, id, state, fork.map(|(pair, _)| pair));
        }
    }

    /// Emits every ring of `stem`. Returns the fork reservation when the
    /// stem ends in a fork.
    #[allow(clippy::too_many_arguments)]
    fn add_sections(
        &mut self,
        plant: &Plant,
        id: StemId,
        stem: &Stem,
        state: &mut State,
        parent: &State,
        in_fork: bool,
        fork: Option<[StemId; 2]>,
    ) -> Option<ForkReservation> {
        self.section.generate(stem.section_divisions());
        state.prev_index = self.mesh.vertices(state.mesh).len();
        let path = stem.path();
        if path.len() < 2 {
            return None;
        }
        let s = stem.section_divisions() + 1;
        let divisions = fork
            .and_then(|pair| plant.stem(pair[0]))
            .map(|child| child.path().initial_divisions());
        // A fork base grows out of at least one regular ring, which for a
        // fork child is the end of its first curve.
        let sections = match divisions {
            Some(divisions) => {
                let first = if in_fork { path.initial_divisions() + 2 } else { 1 };
                path.len().saturating_sub(divisions + 1).max(first)
            }
            None => path.len(),
        };

        if in_fork {
            self.add_fork_section(plant, id, stem, state);
        } else {
            state.section = 0;
            state.tex_offset = 0.0;
            let collar = self.config.collars
                && stem.has_collar()
                && path.len() > path.initial_divisions() + 1
                && self.create_branch_collar(plant, id, stem, state, &parent.segment);
            if collar && state.section > 0 && state.section < sections {
                self.mesh
                    .add_triangle_ring(state.prev_index, state.prev_index + s, s - 1, state.mesh);
            }
        }

        while state.section < sections {
            if state.section > 0 {
                state.tex_offset +=
                    texture_length(plant, id, state.section - 1, state.section);
            }
            let rotation = rotate_section(stem, state);
            state.prev_index = self.mesh.vertices(state.mesh).len();
            self.add_section(plant, id, stem, state, rotation);
            if state.section + 1 < sections {
                self.mesh
                    .add_triangle_ring(state.prev_index, state.prev_index + s, s - 1, state.mesh);
            }
            state.section += 1;
        }

        match fork.zip(divisions) {
            Some((pair, divisions)) => {
                Some(self.add_fork_base_section(plant, id, stem, state, pair, divisions))
            }
            None => {
                if stem.min_radius() > 0.0 && plant.children(id).next().is_none() {
                    self.cap_stem(plant, id, stem, state);
                }
                None
            }
        }
    }

    /// Emits one ring at `state.section`, rotated by `rotation`.
    fn add_section(
        &mut self,
        plant: &Plant,
        id: StemId,
        stem: &Stem,
        state: &mut State,
        rotation: DQuat,
    ) {
        let path = stem.path();
        let center = plant.location(id) + path.get(state.section);
        let radius = plant.radius(id, state.section);
        let tangent = path.average_direction(state.section);
        let (joints, weights) = joints::ring_binding(stem, state);
        for template in self.section.vertices() {
            self.mesh.push_vertex(
                state.mesh,
                Vertex {
                    position: rotation * (template.position * radius) + center,
                    normal: rotation * template.normal,
                    tangent,
                    tangent_scale: 1.0,
                    uv: DVec2::new(template.uv.x, state.tex_offset),
                    joints,
                    weights,
                },
            );
        }
    }

    // =========================================================================
    // COLLARS
    // =========================================================================

    /// Emits the first ring and the end of the first curve with the
    /// collar rings reserved in between, then projects them onto the
    /// parent. Restores `state` and returns `false` when the collar fails.
    fn create_branch_collar(
        &mut self,
        plant: &Plant,
        id: StemId,
        stem: &Stem,
        state: &mut State,
        parent: &Segment,
    ) -> bool {
        let saved = *state;
        let s = stem.section_divisions() + 1;
        let cd = stem.path().initial_divisions();

        let rotation = rotate_section(stem, state);
        self.add_section(plant, id, stem, state, rotation);
        let reserved = self.mesh.reserve_vertices(state.mesh, s * cd);

        state.tex_offset = 0.0;
        state.section = cd + 1;
        let rotation = rotate_section(stem, state);
        state.prev_index = self.mesh.vertices(state.mesh).len();
        self.add_section(plant, id, stem, state, rotation);

        let child = Segment {
            stem: Some(id),
            ..state.segment
        };
        let mut collar = Collar::new(plant, &mut self.mesh, self.config.tolerance);
        match collar.insert_collar(child, *parent, reserved.start) {
            Some(next) => {
                state.section = next;
                true
            }
            None => {
                debug!(stem = ?id, "dropping branch collar");
                *state = saved;
                false
            }
        }
    }

    // =========================================================================
    // FORKS
    // =========================================================================

    /// Emits a fork child's first ring with the frame inherited from the
    /// parent and reserves its transition rings.
    fn add_fork_section(&mut self, plant: &Plant, id: StemId, stem: &Stem, state: &mut State) {
        let sd = stem.section_divisions();
        let cd = stem.path().initial_divisions();
        state.section = 0;
        state.prev_index = self.mesh.vertices(state.mesh).len();
        let rotation = state.prev_rotation;
        self.add_section(plant, id, stem, state, rotation);
        state.tex_offset += texture_length(plant, id, 0, cd);
        if cd == 0 {
            self.mesh
                .add_triangle_ring(state.prev_index, state.prev_index + sd + 1, sd, state.mesh);
        } else {
            self.mesh.reserve_vertices(state.mesh, (sd + 1) * (cd - 1));
            self.mesh.reserve_indices(state.mesh, cd * sd * 6);
        }
        state.section = cd + 1;
    }

    /// Reserves the parent's transition rings and emits its base ring at
    /// the tip.
    fn add_fork_base_section(
        &mut self,
        plant: &Plant,
        id: StemId,
        stem: &Stem,
        state: &mut State,
        pair: [StemId; 2],
        divisions: usize,
    ) -> ForkReservation {
        let sd = stem.section_divisions();
        let s = sd + 1;
        let last_ring = state.prev_index;
        let last_section = state.section.saturating_sub(1);
        let (vertices, indices) = if divisions == 0 {
            self.mesh
                .add_triangle_ring(last_ring, last_ring + s, sd, state.mesh);
            let v = self.mesh.vertices(state.mesh).len();
            let i = self.mesh.indices(state.mesh).len();
            (v..v, i..i)
        } else {
            (
                self.mesh.reserve_vertices(state.mesh, s * (divisions - 1)),
                self.mesh.reserve_indices(state.mesh, divisions * sd * 6),
            )
        };

        let tip = stem.path().len() - 1;
        state.tex_offset += texture_length(plant, id, last_section, tip);
        state.section = tip;
        let rotation = rotate_section(stem, state);
        state.prev_index = self.mesh.vertices(state.mesh).len();
        let base = state.prev_index;
        self.add_section(plant, id, stem, state, rotation);

        let middle = Fork::middle(plant, pair, state.prev_direction, state.prev_rotation, sd);
        let same_material = plant
            .stem(pair[0])
            .is_some_and(|child| child.material(Surface::Outer) == state.mesh);
        let extra = if middle.offset == 0 && same_material {
            self.mesh.reserve_indices(state.mesh, 6)
        } else {
            let i = self.mesh.indices(state.mesh).len();
            i..i
        };
        ForkReservation {
            last_ring,
            last_section,
            base,
            vertices,
            indices,
            extra,
            middle,
            divisions,
        }
    }

    /// Builds both fork children from the parent's base frame and welds
    /// the three tubes together.
    fn create_fork(
        &mut self,
        plant: &Plant,
        id: StemId,
        pair: [StemId; 2],
        state: &State,
        reservation: &ForkReservation,
    ) {
        let mut children = [State::default(); 2];
        for (child, &child_id) in children.iter_mut().zip(pair.iter()) {
            let direction = fork::child_direction(plant, child_id, reservation.divisions);
            child.tex_offset = state.tex_offset;
            child.prev_rotation =
                (rotate_into(state.prev_direction, direction) * state.prev_rotation).normalize();
            child.prev_direction = direction;
            self.add_stem(plant, child_id, child, state, true);
        }

        self.mesh.insert_stem(state.mesh, id, state.segment);
        let connected =
            Fork::new(plant, &mut self.mesh).connect(id, pair, state, &children, reservation);
        if !connected {
            debug!(stem = ?id, "fork transition left unfilled");
        }
        for (child, &child_id) in children.iter().zip(pair.iter()) {
            let fork = self.valid_fork(plant, child_id);
            self.add_child_stems(plant, child_id, child, fork);
        }
    }

    // =========================================================================
    // CHILDREN AND CAPS
    // =========================================================================

    /// Registers the segment of `id` and builds every child outside `fork`.
    fn add_child_stems(
        &mut self,
        plant: &Plant,
        id: StemId,
        state: &State,
        fork: Option<[StemId; 2]>,
    ) {
        self.mesh.insert_stem(state.mesh, id, state.segment);
        for child in plant.children(id) {
            if fork.is_some_and(|pair| pair.contains(&child)) {
                continue;
            }
            let mut child_state = State::default();
            set_initial_rotation(plant, child, &mut child_state);
            self.add_stem(plant, child, &mut child_state, state, false);
        }
    }

    /// Closes the last ring with a fan of triangles in the inner material.
    fn cap_stem(&mut self, plant: &Plant, id: StemId, stem: &Stem, state: &State) {
        let sd = stem.section_divisions();
        let Some(ring) = self
            .mesh
            .vertices(state.mesh)
            .get(state.prev_index..state.prev_index + sd)
            .map(<[Vertex]>::to_vec)
        else {
            return;
        };
        let path = stem.path();
        let normal = path.direction(path.len().saturating_sub(1));
        let inner = stem.material(Surface::Inner);

        let buffer = self.mesh.buffer_mut(inner);
        let start = buffer.vertex_count();
        let index_start = buffer.index_count();
        for (i, vertex) in ring.iter().enumerate() {
            let angle = TAU * i as f64 / sd as f64;
            buffer.push_vertex(Vertex {
                normal,
                tangent: vertex.normal,
                uv: DVec2::new(angle.cos() * 0.5 + 0.5, angle.sin() * 0.5 + 0.5),
                ..*vertex
            });
        }
        let half = sd / 2;
        for i in 0..half.saturating_sub(1) {
            buffer.push_triangle(start + i, start + i + 1, start + sd - i - 1);
            buffer.push_triangle(start + i + 1, start + sd - i - 2, start + sd - i - 1);
        }
        if sd % 2 != 0 {
            let l = start + half - 1;
            buffer.push_triangle(l, l + 1, l + 2);
        }

        if inner != state.mesh {
            let segment = Segment {
                stem: Some(id),
                leaf: None,
                vertex_start: start,
                vertex_count: buffer.vertex_count() - start,
                index_start,
                index_count: buffer.index_count() - index_start,
            };
            self.mesh.insert_stem(inner, id, segment);
        }
        debug!(stem = ?id, radius = plant.radius(id, path.len() - 1), "capped stem");
    }
}

// =============================================================================
// FRAMES AND TEXTURES
// =============================================================================

/// Turns the previous frame onto the direction at `state.section`.
fn rotate_section(stem: &Stem, state: &mut State) -> DQuat {
    let direction = stem.path().average_direction(state.section);
    let rotation = (rotate_into(state.prev_direction, direction) * state.prev_rotation).normalize();
    state.prev_direction = direction;
    state.prev_rotation = rotation;
    rotation
}

/// Starting frame of a child: aligned with its first path segment and
/// twisted so ring vertex zero points along the parent.
fn set_initial_rotation(plant: &Plant, id: StemId, state: &mut State) {
    let Some(stem) = plant.stem(id) else {
        return;
    };
    let direction = stem.path().direction(0);
    let mut rotation = rotate_into(DVec3::Z, direction);
    let up = stem
        .parent()
        .and_then(|p| plant.stem(p))
        .map(|parent| parent.path().intermediate_direction(stem.distance()))
        .and_then(|up| project_onto_plane(up, direction).try_normalize());
    if let Some(up) = up {
        let side = rotation * DVec3::X;
        let angle = side.cross(up).dot(direction).atan2(side.dot(up));
        rotation = DQuat::from_axis_angle(direction, angle) * rotation;
    }
    state.prev_rotation = rotation;
    state.prev_direction = direction;
}

/// Texture V covered between two path samples, in texture widths of the
/// ring at `from`.
fn texture_length(plant: &Plant, id: StemId, from: usize, to: usize) -> f64 {
    let Some(stem) = plant.stem(id) else {
        return 0.0;
    };
    let radius = plant.radius(id, from);
    if radius <= EPSILON {
        return 0.0;
    }
    let ratio = plant
        .material(stem.material(Surface::Outer))
        .map_or(1.0, |m| m.ratio);
    stem.path().distance_between(from, to) * ratio / (TAU * radius)
}

#[cfg(test)]
mod tests;
