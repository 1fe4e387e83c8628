//! # Fork
//!
//! Stitches a stem and the two children attached at its tip into one
//! Y-shaped surface.
//!
//! ## Ring layout
//!
//! ```text
//! parent:  L ─ reserved (cd - 1 rings) ─ B
//! child:   B' ─ reserved (cd - 1 rings) ─ F
//! ```
//!
//! `L` is the parent's last regular ring and `B` its base ring at the tip.
//! Each child starts with a ring `B'` emitted with the parent's frame and
//! continues to its first regular ring `F`. The base ring is split into
//! two arcs, each welded to one child. The remaining halves of the two
//! child rings are welded to each other. The reserved rings are then
//! filled with quadratic curves running through the welded vertices.

use crate::intersection::{intersect_plane, Plane, Ray};
use crate::mesh::{Mesh, State};
use config::constants::EPSILON;
use glam::{DQuat, DVec3};
use plant_tree::math::{linear_bezier, project_onto_plane, quadratic_bezier, rotate_into};
use plant_tree::{Plant, StemId, Surface, Vertex};
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;
use std::ops::Range;
use tracing::debug;

/// How the parent's base ring is split between the two children.
///
/// `edge1..=edge1 + length` (wrapping) belongs to the first child and
/// `edge2..` to the second. With `offset == 1` the two edge vertices are
/// shared by all three tubes. With `offset == 0` no vertex is shared and
/// two extra triangles close the seams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Middle {
    pub length: usize,
    pub edge1: usize,
    pub edge2: usize,
    pub offset: usize,
}

/// Buffer space a fork parent set aside before its children were built.
#[derive(Debug, Clone, PartialEq)]
pub struct ForkReservation {
    /// First vertex of the parent's last regular ring.
    pub last_ring: usize,
    /// Path sample of that ring.
    pub last_section: usize,
    /// First vertex of the parent's base ring.
    pub base: usize,
    /// Transition rings between the two.
    pub vertices: Range<usize>,
    /// Transition triangles between the two.
    pub indices: Range<usize>,
    /// Seam triangles, empty when the children share edge vertices or
    /// are built in another material.
    pub extra: Range<usize>,
    pub middle: Middle,
    /// Initial divisions of the children.
    pub divisions: usize,
}

/// Direction from a fork child's origin to the end of its first curve.
pub(crate) fn child_direction(plant: &Plant, id: StemId, divisions: usize) -> DVec3 {
    plant.stem(id).map_or(DVec3::Z, |stem| {
        let path = stem.path();
        (path.get(divisions + 1) - path.get(0))
            .try_normalize()
            .unwrap_or_else(|| path.direction(0))
    })
}

pub struct Fork<'a> {
    plant: &'a Plant,
    mesh: &'a mut Mesh,
}

impl<'a> Fork<'a> {
    pub fn new(plant: &'a Plant, mesh: &'a mut Mesh) -> Self {
        Self { plant, mesh }
    }

    /// True when `pair` can share a ring with `id`.
    pub fn is_valid(plant: &Plant, id: StemId, pair: [StemId; 2]) -> bool {
        let (Some(stem), Some(a), Some(b)) =
            (plant.stem(id), plant.stem(pair[0]), plant.stem(pair[1]))
        else {
            return false;
        };
        let (p0, p1, p2) = (stem.path(), a.path(), b.path());
        if p0.len() < p0.initial_divisions() + 3 {
            return false;
        }
        if p1.len() < 2 || p2.len() < 2 {
            return false;
        }
        if p1.get(0) == p1.get(1) || p2.get(0) == p2.get(1) {
            return false;
        }
        let divisions = stem.section_divisions();
        if a.section_divisions() != b.section_divisions()
            || a.section_divisions() != divisions
            || divisions % 2 != 0
        {
            return false;
        }
        a.material(Surface::Outer) == b.material(Surface::Outer)
            && p1.initial_divisions() == p2.initial_divisions()
    }

    /// Splits a ring of `divisions` vertices, framed by `rotation` and
    /// facing `direction`, between the two children.
    pub fn middle(
        plant: &Plant,
        pair: [StemId; 2],
        direction: DVec3,
        rotation: DQuat,
        divisions: usize,
    ) -> Middle {
        let cd = plant
            .stem(pair[0])
            .map_or(0, |stem| stem.path().initial_divisions());
        let d1 = child_direction(plant, pair[0], cd);
        let d2 = child_direction(plant, pair[1], cd);
        let sd = divisions.max(2) as isize;
        let quad = sd % 4 == 0;
        let mut length = sd / 2;
        let midpoint = fork_midpoint(2 * sd, d1, d2, direction, rotation);

        let (edge1, edge2, offset) = if (quad && midpoint % 2 == 0) || (!quad && midpoint % 2 != 0)
        {
            let mid = midpoint / 2;
            let edge1 = mid - length / 2;
            (edge1, edge1 + length, 1)
        } else {
            let mid = midpoint / 2;
            let edge1 = mid - length / 2 + quad as isize;
            let edge2 = mid + length / 2 + 1;
            length -= 1;
            (edge1, edge2, 0)
        };
        Middle {
            length: length as usize,
            edge1: edge1.rem_euclid(sd) as usize,
            edge2: edge2.rem_euclid(sd) as usize,
            offset,
        }
    }

    /// Welds the parent's base ring to both children and fills every
    /// reserved ring and triangle.
    ///
    /// Returns `false`, leaving the buffers untouched, when the reserved
    /// layout cannot be found.
    pub fn connect(
        &mut self,
        parent: StemId,
        pair: [StemId; 2],
        state: &State,
        children: &[State; 2],
        reservation: &ForkReservation,
    ) -> bool {
        let Some(stem) = self.plant.stem(parent) else {
            return false;
        };
        let sd = stem.section_divisions();
        let s = sd + 1;
        let cd = reservation.divisions;
        let rings = cd.max(1) + 1;
        let last = rings - 1;
        let middle = reservation.middle;

        if reservation.base != reservation.last_ring + last * s {
            debug!(?parent, "fork layout mismatch");
            return false;
        }
        let Some(mut p) = self.read(state.mesh, reservation.last_ring, rings * s) else {
            return false;
        };
        let starts = [children[0].segment.vertex_start, children[1].segment.vertex_start];
        let (Some(mut c1), Some(mut c2)) = (
            self.read(children[0].mesh, starts[0], rings * s),
            self.read(children[1].mesh, starts[1], rings * s),
        ) else {
            debug!(?parent, "fork children missing their transition rings");
            return false;
        };

        let at = |ring: usize, k: usize| ring * s + k;
        let wrap = |k: isize| k.rem_euclid(sd as isize) as usize;
        let direction = state.prev_direction;
        let d1 = child_direction(self.plant, pair[0], cd);
        let d2 = child_direction(self.plant, pair[1], cd);
        let point1 = self.plant.location(pair[0]);
        let point2 = self.plant.location(pair[1]);
        let plane1 = Plane::new(point1, (direction + d1).normalize_or_zero());
        let plane2 = Plane::new(point2, (direction + d2).normalize_or_zero());
        let plane3 = {
            let n1 = d2.cross(d1);
            let n2 = n1.cross(d2).normalize_or_zero();
            let n3 = n1.cross(d1).normalize_or_zero();
            Plane::new(point1, (n2 + n3).normalize_or_zero())
        };
        let parent_scale = self.texture_scale(parent, reservation.last_section);
        let child_scales = pair.map(|id| self.texture_scale(id, 0));

        // Parent arcs onto each child.
        for i in 0..=middle.length {
            let k = (middle.edge1 + i) % sd;
            let t = weld(&mut p[at(last, k)], &mut c1[at(0, k)], direction, &plane1);
            p[at(last, k)].uv.y += t * parent_scale;
            c1[at(0, k)].uv.y = p[at(last, k)].uv.y;
            if cd > 0 {
                curve_into_child(&mut p, &mut c1, k, cd, s);
            }
        }
        for i in middle.offset..=middle.length - middle.offset {
            let k = (middle.edge2 + i) % sd;
            let t = weld(&mut p[at(last, k)], &mut c2[at(0, k)], direction, &plane2);
            p[at(last, k)].uv.y += t * parent_scale;
            c2[at(0, k)].uv.y = p[at(last, k)].uv.y;
            if cd > 0 {
                curve_into_child(&mut p, &mut c2, k, cd, s);
            }
        }
        if middle.offset > 0 {
            for k in [middle.edge1, middle.edge2] {
                let shared = c1[at(0, k)];
                let v = &mut c2[at(0, k)];
                v.position = shared.position;
                v.normal = shared.normal;
                v.tangent = shared.tangent;
            }
        }

        // Inner halves of the children onto each other.
        for i in middle.offset..=middle.length - middle.offset {
            let k1 = wrap(middle.edge1 as isize - 1 + middle.offset as isize - i as isize);
            let k2 = wrap((middle.edge1 + i) as isize);
            let t = weld(&mut c1[at(0, k1)], &mut c2[at(0, k2)], d1, &plane3);
            c1[at(0, k1)].uv.y += t * child_scales[0];
            c2[at(0, k2)].uv.y += t * child_scales[1];
            if cd > 0 {
                curve_between_children(&mut c1, &mut c2, k1, k2, cd, s);
            }
        }
        if middle.offset == 1 && cd > 1 {
            for k in [middle.edge2, middle.edge1] {
                curve_linear(&mut c2, p[at(last, k)], k, cd, s);
            }
        }

        // Close the texture seam of every rewritten ring.
        for ring in 1..rings {
            close_ring(&mut p, ring, sd);
        }
        for ring in 0..last {
            close_ring(&mut c1, ring, sd);
            close_ring(&mut c2, ring, sd);
        }

        if cd > 0 {
            self.set_base_uvs(parent, reservation.last_section, &mut p, s, cd, parent_scale);
            self.set_child_uvs(pair[0], &mut c1, s, cd, child_scales[0]);
            self.set_child_uvs(pair[1], &mut c2, s, cd, child_scales[1]);
        }

        self.write(state.mesh, reservation.last_ring, &p);
        self.write(children[0].mesh, starts[0], &c1);
        self.write(children[1].mesh, starts[1], &c2);

        if cd > 0 {
            let start = reservation.indices.start;
            let filled = self.fill_rings(state.mesh, start, reservation.last_ring, s, cd)
                && children.iter().all(|child| {
                    let segment = child.segment;
                    self.fill_rings(child.mesh, segment.index_start, segment.vertex_start, s, cd)
                });
            if !filled {
                debug!(?parent, "fork transition overran its reserved triangles");
                return false;
            }
        }
        if middle.offset == 0 {
            self.close_seams(state, children, reservation, sd);
        }
        true
    }

    /// Writes `cd` triangle rings from the ring at `vertex` into the
    /// reserved indices at `index`.
    fn fill_rings(
        &mut self,
        material: usize,
        index: usize,
        vertex: usize,
        s: usize,
        cd: usize,
    ) -> bool {
        (0..cd)
            .try_fold(index, |index, ring| {
                let i1 = vertex + ring * s;
                self.mesh.write_triangle_ring(material, index, i1, i1 + s, s - 1)
            })
            .is_some()
    }

    /// Fills the two seam triangles left between the arcs.
    fn close_seams(
        &mut self,
        state: &State,
        children: &[State; 2],
        reservation: &ForkReservation,
        sd: usize,
    ) {
        let Range { start, end } = reservation.extra;
        if end < start + 6 || children.iter().any(|c| c.mesh != state.mesh) {
            return;
        }
        let base = reservation.base;
        let middle = reservation.middle;
        let e1 = if middle.edge1 == 0 { sd } else { middle.edge1 };
        let e2 = if middle.edge2 == 0 { sd } else { middle.edge2 };
        let c1 = children[0].segment.vertex_start;
        let c2 = children[1].segment.vertex_start;
        let buffer = self.mesh.buffer_mut(state.mesh);
        buffer.set_triangle(start, base + e1, c2 + e1, base + e1 - 1);
        buffer.set_triangle(start + 3, base + e2, c1 + e2, base + e2 - 1);
    }

    fn texture_scale(&self, id: StemId, section: usize) -> f64 {
        let ratio = self
            .plant
            .stem(id)
            .and_then(|stem| self.plant.material(stem.material(Surface::Outer)))
            .map_or(1.0, |m| m.ratio);
        let radius = self.plant.radius(id, section);
        if radius > EPSILON {
            ratio / (TAU * radius)
        } else {
            0.0
        }
    }

    /// Texture V of the parent's transition rings, measured along the
    /// straight line from its last regular sample to its tip.
    fn set_base_uvs(
        &self,
        parent: StemId,
        last_section: usize,
        p: &mut [Vertex],
        s: usize,
        cd: usize,
        scale: f64,
    ) {
        let Some(stem) = self.plant.stem(parent) else {
            return;
        };
        let path = stem.path();
        let location = self.plant.location(parent);
        let from = location + path.get(last_section);
        let to = location + path.get(path.len().saturating_sub(1));
        let axis = (to - from).normalize_or_zero();
        for ring in 1..=cd {
            for j in 0..s {
                let reference = p[j].uv;
                let v = &mut p[ring * s + j];
                v.uv.x = reference.x;
                v.uv.y = reference.y + (v.position - from).dot(axis) * scale;
            }
        }
    }

    /// Texture V of a child's transition rings, measured backwards from
    /// its first regular ring.
    fn set_child_uvs(&self, id: StemId, c: &mut [Vertex], s: usize, cd: usize, scale: f64) {
        let Some(stem) = self.plant.stem(id) else {
            return;
        };
        let location = self.plant.location(id);
        let from = location + stem.path().get(0);
        let to = location + stem.path().get(cd + 1);
        let axis = (to - from).normalize_or_zero();
        for ring in 0..cd {
            for j in 0..s {
                let reference = c[cd * s + j].uv;
                let v = &mut c[ring * s + j];
                v.uv.x = reference.x;
                v.uv.y = reference.y - (to - v.position).dot(axis) * scale;
            }
        }
    }

    fn read(&self, material: usize, start: usize, count: usize) -> Option<Vec<Vertex>> {
        self.mesh
            .vertices(material)
            .get(start..start + count)
            .map(<[Vertex]>::to_vec)
    }

    fn write(&mut self, material: usize, start: usize, vertices: &[Vertex]) {
        let buffer = self.mesh.buffer_mut(material);
        for (i, vertex) in vertices.iter().enumerate() {
            if let Some(slot) = buffer.vertex_mut(start + i) {
                *slot = *vertex;
            }
        }
    }
}

/// Moves `a` along `direction` onto `plane`, snaps `b` onto it and merges
/// their shading. Returns the distance travelled.
fn weld(a: &mut Vertex, b: &mut Vertex, direction: DVec3, plane: &Plane) -> f64 {
    let ray = Ray::new(a.position, direction);
    let t = intersect_plane(&ray, plane).unwrap_or(0.0);
    a.position = ray.at(t);
    b.position = a.position;
    a.normal = (a.normal + b.normal).normalize_or_zero();
    b.normal = a.normal;
    a.tangent = (a.tangent + b.tangent).normalize_or_zero();
    b.tangent = a.tangent;
    t
}

/// Curve from the parent's last ring through the welded base vertex to
/// the child's first regular ring, split across both transitions.
fn curve_into_child(p: &mut [Vertex], c: &mut [Vertex], k: usize, cd: usize, s: usize) {
    let at = |ring: usize| ring * s + k;
    let (start, base, end) = (p[at(0)], p[at(cd)], c[at(cd)]);
    let step = 1.0 / cd as f64;
    for j in 0..cd {
        let t = 0.5 * (j + 1) as f64 * step;
        let v = &mut p[at(j + 1)];
        v.position = quadratic_bezier(t, start.position, base.position, end.position);
        v.normal = start.normal.lerp(end.normal, t).normalize_or_zero();
        v.tangent = start.tangent.lerp(end.tangent, t).normalize_or_zero();
        v.weights = start.weights.lerp(base.weights, (j + 1) as f64 * step);
        v.joints = start.joints;
    }
    let origin = c[at(0)];
    for j in 0..cd {
        let t = 0.5 + 0.5 * j as f64 * step;
        let v = &mut c[at(j)];
        v.position = quadratic_bezier(t, start.position, base.position, end.position);
        v.normal = start.normal.lerp(end.normal, t).normalize_or_zero();
        v.tangent = start.tangent.lerp(end.tangent, t).normalize_or_zero();
        v.weights = origin.weights.lerp(end.weights, j as f64 * step);
        v.joints = end.joints;
    }
}

/// Curve between the two children's first regular rings through their
/// shared inner vertex.
fn curve_between_children(
    c1: &mut [Vertex],
    c2: &mut [Vertex],
    k1: usize,
    k2: usize,
    cd: usize,
    s: usize,
) {
    let (a0, a_end) = (c1[k1], c1[cd * s + k1]);
    let (b0, b_end) = (c2[k2], c2[cd * s + k2]);
    let step = 1.0 / cd as f64;
    for j in 0..cd {
        let t = 0.5 - 0.5 * j as f64 * step;
        let v = &mut c1[j * s + k1];
        v.position = quadratic_bezier(t, a_end.position, a0.position, b_end.position);
        v.normal = a_end.normal.lerp(b_end.normal, t).normalize_or_zero();
        v.tangent = a_end.tangent.lerp(b_end.tangent, t).normalize_or_zero();
        v.weights = a0.weights.lerp(a_end.weights, j as f64 * step);
        v.joints = a0.joints;
    }
    for j in 0..cd {
        let t = 0.5 + 0.5 * j as f64 * step;
        let v = &mut c2[j * s + k2];
        v.position = quadratic_bezier(t, a_end.position, a0.position, b_end.position);
        v.normal = a_end.normal.lerp(b_end.normal, t).normalize_or_zero();
        v.tangent = a_end.tangent.lerp(b_end.tangent, t).normalize_or_zero();
        v.weights = b0.weights.lerp(b_end.weights, j as f64 * step);
        v.joints = b_end.joints;
    }
}

/// Straight transition for a vertex shared by all three tubes.
fn curve_linear(c: &mut [Vertex], base: Vertex, k: usize, cd: usize, s: usize) {
    let end = c[cd * s + k];
    for j in 0..cd {
        let t = j as f64 / cd as f64;
        let v = &mut c[j * s + k];
        v.position = linear_bezier(t, base.position, end.position);
        v.normal = base.normal.lerp(end.normal, t).normalize_or_zero();
        v.tangent = base.tangent.lerp(end.tangent, t).normalize_or_zero();
        v.weights = end.weights;
        v.joints = end.joints;
    }
}

fn close_ring(vertices: &mut [Vertex], ring: usize, sd: usize) {
    let s = sd + 1;
    let first = vertices[ring * s];
    vertices[ring * s + sd] = Vertex {
        uv: glam::DVec2::new(0.0, first.uv.y),
        ..first
    };
}

/// Ring position, in `divisions` steps, of the line separating the two
/// children as seen from the parent.
fn fork_midpoint(
    divisions: isize,
    direction1: DVec3,
    direction2: DVec3,
    direction: DVec3,
    rotation: DQuat,
) -> isize {
    let (mut d1, mut d2, mut direction, mut rotation) = (direction1, direction2, direction, rotation);
    let average = (-direction + d1 + d2).normalize_or_zero();
    let a0 = (-direction).dot(average);
    let a1 = d1.dot(average);
    let a2 = d2.dot(average);

    // Use the most reversed stem as the reference frame.
    if a1 < a0 && a1 < a2 {
        rotation = rotate_into(direction, d1) * rotation;
        let swap = -direction;
        direction = -d1;
        d1 = swap;
    } else if a2 < a0 && a2 < a1 {
        rotation = rotate_into(direction, d2) * rotation;
        let swap = -direction;
        direction = -d2;
        d2 = swap;
    }

    let point = rotation * DVec3::X;
    let children = (d1 + d2).normalize_or_zero();
    let d1 = rotate_into(children, direction) * d1;
    let projection1 = project_onto_plane(d1, direction).normalize_or_zero();
    let mut projection2 = projection1.cross(direction);
    if a0 > a1 || a0 > a2 {
        projection2 = -projection2;
    }

    let delta = TAU / divisions as f64;
    let mut theta = point.dot(projection1).clamp(-1.0, 1.0).acos();
    if point.dot(projection2) < 0.0 {
        theta = TAU - theta;
    }
    let steps = theta / delta;
    let steps = if divisions % 4 == 0 {
        steps.round()
    } else {
        steps.floor()
    };
    let midpoint = steps as isize;
    if midpoint >= divisions {
        midpoint - divisions
    } else {
        midpoint
    }
}

#[cfg(test)]
mod tests;
