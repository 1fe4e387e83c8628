//! # Collar
//!
//! Branch collars blend a child stem into its parent's surface. The
//! child's first ring is flared by its swelling factors and projected onto
//! the parent's triangles. Bezier curves from those surface points to the
//! child's first regular ring fill the rings reserved in between.
//!
//! A ray that misses the parent discards the whole collar: the child's
//! buffers are truncated to where the child started.

use crate::intersection::{intersect_front_triangle, intersect_plane, Plane, Ray};
use crate::mesh::{Mesh, Segment};
use glam::{DMat3, DVec3};
use plant_tree::math::{cubic_bezier, quadratic_bezier};
use plant_tree::{Plant, StemId, Surface, Vertex};
use std::f64::consts::TAU;
use std::ops::Range;

pub struct Collar<'a> {
    plant: &'a Plant,
    mesh: &'a mut Mesh,
    tolerance: f64,
}

impl<'a> Collar<'a> {
    pub fn new(plant: &'a Plant, mesh: &'a mut Mesh, tolerance: f64) -> Self {
        Self {
            plant,
            mesh,
            tolerance,
        }
    }

    /// Builds the collar of `child` onto `parent`.
    ///
    /// `child` must start with its first ring, followed by the reserved
    /// rings at `reserved_start` and the ring at the end of its first
    /// curve. Returns the path sample of the next ring to emit, or `None`
    /// after rolling the child's buffers back.
    pub fn insert_collar(
        &mut self,
        child: Segment,
        parent: Segment,
        reserved_start: usize,
    ) -> Option<usize> {
        let id = child.stem?;
        let stem = self.plant.stem(id)?;
        let material = stem.material(Surface::Outer);
        let path = stem.path();
        let sd = stem.section_divisions();
        let s = sd + 1;
        let cd = path.initial_divisions();
        let far_start = reserved_start + cd * s;

        if reserved_start != child.vertex_start + s
            || self.mesh.vertices(material).len() < far_start + s
        {
            self.rollback(material, &child);
            return None;
        }

        let scale = self.scale(id, parent.stem);
        let location = self.plant.location(id);
        let tangent = path.spline().first_curve_end_tangent();
        let cubic = path.spline().degree() == 3;
        let search = parent.stem.map(|p| self.search_start(p, &parent, id));

        for i in 0..s {
            let vertices = self.mesh.vertices(material);
            let v1 = vertices[child.vertex_start + i];
            let origin = vertices[far_start + i].position;
            let v2 = Vertex {
                position: scale * (v1.position - location) + location,
                ..v1
            };

            let surface = self
                .move_to_surface(id, v2, origin, &parent, search)
                .zip(self.move_to_surface(id, v1, origin, &parent, search));
            let Some((base, inner)) = surface else {
                tracing::debug!(stem = ?id, "collar ray missed the parent surface");
                self.rollback(material, &child);
                return None;
            };

            let curve = [base.position, inner.position, origin - tangent, origin];
            let buffer = self.mesh.buffer_mut(material);
            if let Some(slot) = buffer.vertex_mut(child.vertex_start + i) {
                *slot = base;
            }
            for j in 1..=cd {
                let t = j as f64 / (cd + 1) as f64;
                let position = if cubic {
                    cubic_bezier(t, curve[0], curve[1], curve[2], curve[3])
                } else {
                    quadratic_bezier(t, curve[0], curve[1], curve[3])
                };
                if let Some(slot) = buffer.vertex_mut(reserved_start + (j - 1) * s + i) {
                    *slot = Vertex { position, ..base };
                }
            }
        }

        for ring in 0..=cd {
            let i1 = child.vertex_start + ring * s;
            self.mesh.add_triangle_ring(i1, i1 + s, sd, material);
        }
        self.blend_normals(material, child.vertex_start, s, cd);
        self.set_uvs(id, material, child.vertex_start, s, cd);
        Some(cd + 2)
    }

    fn rollback(&mut self, material: usize, child: &Segment) {
        self.mesh
            .truncate(material, child.vertex_start, child.index_start);
    }

    /// Flare of the child's first ring: swelling `x` across the parent and
    /// `y` along it. Root stems flare within their base plane.
    fn scale(&self, id: StemId, parent: Option<StemId>) -> DMat3 {
        let Some(stem) = self.plant.stem(id) else {
            return DMat3::IDENTITY;
        };
        let swelling = stem.swelling();
        let direction = stem.path().direction(0);
        let (basis, diagonal) = match parent.and_then(|p| self.plant.stem(p)) {
            Some(parent) => {
                let z = parent.path().intermediate_direction(stem.distance());
                let x = z
                    .cross(direction)
                    .try_normalize()
                    .unwrap_or_else(|| z.any_orthonormal_vector());
                let y = x.cross(z);
                (
                    DMat3::from_cols(x, y, z),
                    DVec3::new(swelling.x, 1.0, swelling.y),
                )
            }
            None => {
                let x = direction.any_orthonormal_vector();
                let y = direction.cross(x);
                (
                    DMat3::from_cols(x, y, direction),
                    DVec3::new(swelling.x, swelling.y, 1.0),
                )
            }
        };
        basis * DMat3::from_diagonal(diagonal) * basis.transpose()
    }

    /// Estimated first index of the parent triangles around the child.
    fn search_start(&self, parent: StemId, segment: &Segment, child: StemId) -> usize {
        let (Some(parent_stem), Some(child_stem)) = (self.plant.stem(parent), self.plant.stem(child))
        else {
            return segment.index_start;
        };
        let index = parent_stem.path().index_at(child_stem.distance());
        let sd = parent_stem.section_divisions();
        let offset = (index * sd * 6 + sd * 3).min(segment.index_count.saturating_sub(3));
        segment.index_start + offset
    }

    /// Casts from `origin` through `vertex` onto the parent surface,
    /// taking the surface position and normal.
    fn move_to_surface(
        &self,
        id: StemId,
        vertex: Vertex,
        origin: DVec3,
        parent: &Segment,
        search: Option<usize>,
    ) -> Option<Vertex> {
        let direction = (vertex.position - origin).try_normalize()?;
        let ray = Ray::new(origin, direction);
        let (t, normal) = match (parent.stem, search) {
            (Some(parent_id), Some(start)) => {
                let material = self.plant.stem(parent_id)?.material(Surface::Outer);
                self.cast(material, parent.index_range(), start, &ray)
                    .or_else(|| self.cast_fork(parent_id, &ray))?
            }
            _ => {
                let stem = self.plant.stem(id)?;
                let ground = Plane::new(
                    self.plant.location(id) + stem.path().get(0),
                    stem.path().direction(0),
                );
                let t = intersect_plane(&ray, &ground).filter(|&t| t > self.tolerance)?;
                (t, vertex.normal)
            }
        };
        Some(Vertex {
            position: ray.at(t),
            normal,
            ..vertex
        })
    }

    /// Searches `range` outwards from `start`, alternating forwards and
    /// backwards one triangle at a time.
    fn cast(
        &self,
        material: usize,
        range: Range<usize>,
        start: usize,
        ray: &Ray,
    ) -> Option<(f64, DVec3)> {
        let fits = |at: usize| at >= range.start && at + 3 <= range.end;
        let mut offset = 0;
        while offset < range.len() {
            let forward = start + offset;
            if fits(forward) {
                if let Some(hit) = self.hit(material, forward, ray) {
                    return Some(hit);
                }
            }
            if let Some(backward) = start.checked_sub(offset).filter(|_| offset > 0) {
                if fits(backward) {
                    if let Some(hit) = self.hit(material, backward, ray) {
                        return Some(hit);
                    }
                }
            }
            offset += 3;
        }
        None
    }

    /// Falls back to the transition triangles of the parent's fork
    /// children, for stems attached right at a fork.
    fn cast_fork(&self, parent: StemId, ray: &Ray) -> Option<(f64, DVec3)> {
        let pair = self.plant.fork(parent)?;
        pair.iter().find_map(|&child| {
            let stem = self.plant.stem(child)?;
            let segment = self.mesh.find_stem(child);
            let count = stem.path().initial_divisions().max(1) * stem.section_divisions() * 6;
            let range = segment.index_start..segment.index_start + count.min(segment.index_count);
            self.cast(stem.material(Surface::Outer), range.clone(), range.start, ray)
        })
    }

    fn hit(&self, material: usize, at: usize, ray: &Ray) -> Option<(f64, DVec3)> {
        let buffer = self.mesh.buffer(material)?;
        let corner = |k: usize| -> Option<Vertex> {
            let index = buffer.index(at + k)? as usize;
            buffer.vertex(index).copied()
        };
        let (a, b, c) = (corner(0)?, corner(1)?, corner(2)?);
        let hit = intersect_front_triangle(ray, a.position, b.position, c.position, self.tolerance)?;
        let normal = hit
            .blend(a.normal, b.normal, c.normal)
            .try_normalize()
            .unwrap_or(a.normal);
        Some((hit.t, normal))
    }

    /// Eases shading from the surface ring into the first regular ring.
    fn blend_normals(&mut self, material: usize, start: usize, s: usize, cd: usize) {
        let buffer = self.mesh.buffer_mut(material);
        for i in 0..s {
            let (Some(&first), Some(&last)) = (
                buffer.vertex(start + i),
                buffer.vertex(start + (cd + 1) * s + i),
            ) else {
                continue;
            };
            for j in 1..=cd {
                let t = j as f64 / (cd + 1) as f64;
                let t = if t <= 0.5 {
                    2.0 * t * t
                } else {
                    -2.0 * t * t + 4.0 * t - 1.0
                };
                if let Some(v) = buffer.vertex_mut(start + j * s + i) {
                    v.normal = first.normal.lerp(last.normal, t).normalize_or_zero();
                    v.tangent = first.tangent.lerp(last.tangent, t).normalize_or_zero();
                }
            }
        }
    }

    /// Texture V runs backwards from the first regular ring, so the collar
    /// ends up with negative V.
    fn set_uvs(&mut self, id: StemId, material: usize, start: usize, s: usize, cd: usize) {
        let ratio = self
            .plant
            .material(material)
            .map_or(1.0, |m| m.ratio);
        let radius = self.plant.radius(id, cd + 1);
        let scale = if radius > config::constants::EPSILON {
            ratio / (TAU * radius)
        } else {
            0.0
        };
        let buffer = self.mesh.buffer_mut(material);
        for i in 0..s {
            let Some(&far) = buffer.vertex(start + (cd + 1) * s + i) else {
                continue;
            };
            let mut uv = far.uv;
            let mut previous = far.position;
            for ring in (0..=cd).rev() {
                let Some(v) = buffer.vertex_mut(start + ring * s + i) else {
                    break;
                };
                uv.y -= previous.distance(v.position) * scale;
                v.uv = uv;
                previous = v.position;
            }
        }
    }
}
