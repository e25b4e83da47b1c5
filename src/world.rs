//! A world: a population of bodies plus the substep driver that integrates,
//! clamps, and resolves them.

use std::collections::HashMap;

use log::{debug, trace};

use crate::body::{Body, BodyId, BodyType};
use crate::broadphase::BroadphaseIndex;
use crate::error::{Error, Result};
use crate::material::{MaterialId, MaterialRegistry};
use crate::math::{Aabb, Vec2};
use crate::narrowphase;
use crate::resolve::{self, CorrectionMode};
use crate::shape::Shape;

pub type WorldId = u32;

pub const DEFAULT_ITERATIONS: u32 = 4;

/// Result of a successful [`World::raycast`].
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct RayHit {
    pub body: BodyId,
    pub point: Vec2,
    pub distance: f64,
}

pub struct World {
    id: WorldId,
    iterations: u32,
    bodies: HashMap<BodyId, Body>,
    /// Body ids in insertion order; integration walks this list so results
    /// do not depend on map internals.
    order: Vec<BodyId>,
    next_body_id: BodyId,
    boundary: Option<Aabb>,
    broadphase: Option<Box<dyn BroadphaseIndex + Send>>,
    correction_mode: CorrectionMode,
}

impl World {
    pub fn new(id: WorldId) -> Self {
        Self {
            id,
            iterations: DEFAULT_ITERATIONS,
            bodies: HashMap::new(),
            order: Vec::new(),
            next_body_id: 1,
            boundary: None,
            broadphase: None,
            correction_mode: CorrectionMode::default(),
        }
    }

    pub fn id(&self) -> WorldId {
        self.id
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    /// Substep count per tick. Values at or below zero fall back to the
    /// default.
    pub fn set_iterations(&mut self, iterations: i32) {
        self.iterations = if iterations <= 0 {
            DEFAULT_ITERATIONS
        } else {
            iterations as u32
        };
    }

    pub fn boundary(&self) -> Option<Aabb> {
        self.boundary
    }

    pub fn set_boundary(&mut self, boundary: Option<Aabb>) {
        self.boundary = boundary;
    }

    pub fn correction_mode(&self) -> CorrectionMode {
        self.correction_mode
    }

    pub fn set_correction_mode(&mut self, mode: CorrectionMode) {
        self.correction_mode = mode;
    }

    /// Install or clear the broadphase index used for candidate pair
    /// enumeration.
    pub fn set_broadphase(&mut self, index: Option<Box<dyn BroadphaseIndex + Send>>) {
        self.broadphase = index;
    }

    // ---------------------------------------------------------------------
    // Body lifecycle
    // ---------------------------------------------------------------------

    pub fn create_body(&mut self, body_type: BodyType, material: MaterialId) -> BodyId {
        let id = self.next_body_id;
        self.next_body_id += 1;
        self.bodies.insert(id, Body::new(id, body_type, material));
        self.order.push(id);
        debug!("world {}: created {:?} body {}", self.id, body_type, id);
        id
    }

    pub fn destroy_body(&mut self, id: BodyId) -> Result<()> {
        if self.bodies.remove(&id).is_none() {
            // Ids below the issue watermark were handed out once: destroying
            // them again (id 0 included) is a double-destroy, not a miss.
            return Err(if id < self.next_body_id {
                Error::AlreadyDestroyed { what: "body", id }
            } else {
                Error::BodyNotFound {
                    body: id,
                    world: self.id,
                }
            });
        }
        self.order.retain(|&other| other != id);
        if let Some(index) = self.broadphase.as_deref_mut() {
            index.remove(id);
        }
        debug!("world {}: destroyed body {}", self.id, id);
        Ok(())
    }

    pub fn clear_bodies(&mut self) {
        if let Some(index) = self.broadphase.as_deref_mut() {
            for &id in &self.order {
                index.remove(id);
            }
        }
        self.bodies.clear();
        self.order.clear();
    }

    pub fn has_body(&self, id: BodyId) -> bool {
        self.bodies.contains_key(&id)
    }

    /// Body ids in insertion order.
    pub fn body_ids(&self) -> &[BodyId] {
        &self.order
    }

    pub fn body(&self, id: BodyId) -> Result<&Body> {
        self.bodies.get(&id).ok_or(Error::BodyNotFound {
            body: id,
            world: self.id,
        })
    }

    pub fn body_mut(&mut self, id: BodyId) -> Result<&mut Body> {
        self.bodies.get_mut(&id).ok_or(Error::BodyNotFound {
            body: id,
            world: self.id,
        })
    }

    pub(crate) fn latest_body_id(&self) -> BodyId {
        self.next_body_id - 1
    }

    pub(crate) fn force_latest_body_id(&mut self, latest: BodyId) {
        self.next_body_id = latest + 1;
    }

    pub(crate) fn restore_body(&mut self, body: Body) {
        let id = body.id();
        self.bodies.insert(id, body);
        self.order.push(id);
    }

    // ---------------------------------------------------------------------
    // Simulation
    // ---------------------------------------------------------------------

    /// Add a velocity delta to every non-static body.
    ///
    /// Note this is a raw delta, not an acceleration: callers wanting
    /// `gravity * dt` semantics multiply by their timestep themselves.
    pub fn apply_gravity(&mut self, delta: Vec2) {
        for body in self.bodies.values_mut() {
            if body.body_type() != BodyType::Static {
                body.add_velocity(delta);
            }
        }
    }

    /// Advance the world by `dt`, split into `iterations` substeps.
    /// Non-positive `dt` returns without advancing time.
    pub fn tick(&mut self, dt: f64, materials: &MaterialRegistry) {
        if !(dt > 0.0) {
            return;
        }
        trace!(
            "world {}: tick dt={} substeps={}",
            self.id, dt, self.iterations
        );
        let sub_dt = dt / f64::from(self.iterations);
        for _ in 0..self.iterations {
            self.substep(sub_dt, materials);
        }
    }

    fn substep(&mut self, dt: f64, materials: &MaterialRegistry) {
        // Integrate in insertion order, refreshing mass caches on the way so
        // the solver can rely on them.
        for i in 0..self.order.len() {
            let id = self.order[i];
            let Some(body) = self.bodies.get_mut(&id) else {
                continue;
            };
            let material = materials.resolve(body.material());
            body.refresh_mass(material);
            body.refresh_angular_mass(material);
            body.integrate(dt, material);
        }

        if let Some(bound) = self.boundary {
            for i in 0..self.order.len() {
                let id = self.order[i];
                if let Some(body) = self.bodies.get_mut(&id) {
                    clamp_to_boundary(body, &bound);
                }
            }
        }

        let mut ids: Vec<BodyId> = self.order.clone();
        ids.sort_unstable();

        if self.broadphase.is_some() {
            let mut pairs: Vec<(BodyId, BodyId)> = Vec::new();
            for &id in &ids {
                if let Some(body) = self.bodies.get_mut(&id) {
                    let aabb = body.aabb();
                    if let Some(index) = self.broadphase.as_deref_mut() {
                        index.update(id, aabb);
                    }
                }
            }
            if let Some(index) = self.broadphase.as_deref() {
                for &id in &ids {
                    let Some(body) = self.bodies.get(&id) else {
                        continue;
                    };
                    for other in index.query_overlaps(&body.cached_aabb()) {
                        if other > id {
                            pairs.push((id, other));
                        }
                    }
                }
            }
            for (id_a, id_b) in pairs {
                self.resolve_pair(id_a, id_b, materials);
            }
        } else {
            for i in 0..ids.len() {
                for j in (i + 1)..ids.len() {
                    self.resolve_pair(ids[i], ids[j], materials);
                }
            }
        }
    }

    /// Broad AABB test, narrowphase, then position correction and velocity
    /// impulses for one candidate pair.
    fn resolve_pair(&mut self, id_a: BodyId, id_b: BodyId, materials: &MaterialRegistry) {
        let [Some(a), Some(b)] = self.bodies.get_disjoint_mut([&id_a, &id_b]) else {
            return;
        };
        a.refresh_transform();
        b.refresh_transform();
        if !a.cached_aabb().overlaps(&b.cached_aabb()) {
            return;
        }
        let Some(hit) = narrowphase::intersect(a, b) else {
            return;
        };
        resolve::correct_positions(a, b, hit.normal, hit.depth, self.correction_mode);
        let contacts = narrowphase::contact_points(a, b);
        let mat_a = materials.resolve(a.material());
        let mat_b = materials.resolve(b.material());
        resolve::apply_impulses(a, b, hit.normal, &contacts, mat_a, mat_b);
    }

    // ---------------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------------

    /// Bodies whose AABB strictly overlaps `aabb`, in insertion order.
    pub fn query_aabb(&mut self, aabb: &Aabb) -> Vec<BodyId> {
        let mut hits = Vec::new();
        for i in 0..self.order.len() {
            let id = self.order[i];
            if let Some(body) = self.bodies.get_mut(&id) {
                if body.aabb().overlaps(aabb) {
                    hits.push(id);
                }
            }
        }
        hits
    }

    /// Closest body hit by a ray, if any within `max_distance`.
    pub fn raycast(&mut self, origin: Vec2, direction: Vec2, max_distance: f64) -> Option<RayHit> {
        let length = direction.length();
        if length < 1e-8 {
            return None;
        }
        let dir = direction / length;

        let mut closest: Option<RayHit> = None;
        for i in 0..self.order.len() {
            let id = self.order[i];
            let Some(body) = self.bodies.get_mut(&id) else {
                continue;
            };
            let t = if let Shape::Circle { radius } = *body.shape() {
                ray_vs_circle(origin, dir, body.position(), radius)
            } else if body.shape().has_vertices() {
                ray_vs_hull(origin, dir, body.transformed_vertices())
            } else {
                None
            };
            if let Some(t) = t {
                if t >= 0.0
                    && t <= max_distance
                    && closest.is_none_or(|hit| t < hit.distance)
                {
                    closest = Some(RayHit {
                        body: id,
                        point: origin + dir * t,
                        distance: t,
                    });
                }
            }
        }
        closest
    }
}

/// Push a non-static body back inside the boundary, zeroing the velocity on
/// each clamped axis. Bodies larger than the boundary get centered on the
/// oversized axis instead.
fn clamp_to_boundary(body: &mut Body, bound: &Aabb) {
    if body.body_type() == BodyType::Static {
        return;
    }
    let aabb = body.aabb();
    let mut shift = Vec2::ZERO;
    let mut clamp_x = false;
    let mut clamp_y = false;

    if aabb.width() > bound.width() {
        shift.x = bound.center().x - aabb.center().x;
        clamp_x = true;
    } else if aabb.min_x < bound.min_x {
        shift.x = bound.min_x - aabb.min_x;
        clamp_x = true;
    } else if aabb.max_x > bound.max_x {
        shift.x = bound.max_x - aabb.max_x;
        clamp_x = true;
    }

    if aabb.height() > bound.height() {
        shift.y = bound.center().y - aabb.center().y;
        clamp_y = true;
    } else if aabb.min_y < bound.min_y {
        shift.y = bound.min_y - aabb.min_y;
        clamp_y = true;
    } else if aabb.max_y > bound.max_y {
        shift.y = bound.max_y - aabb.max_y;
        clamp_y = true;
    }

    if clamp_x || clamp_y {
        let mut velocity = body.velocity();
        if clamp_x {
            velocity.x = 0.0;
        }
        if clamp_y {
            velocity.y = 0.0;
        }
        body.set_velocity(velocity);
        if shift != Vec2::ZERO {
            body.translate(shift);
        }
    }
}

fn ray_vs_circle(origin: Vec2, dir: Vec2, center: Vec2, radius: f64) -> Option<f64> {
    let f = origin - center;
    let b = 2.0 * f.dot(dir);
    let c = f.length_squared() - radius * radius;
    let discriminant = b * b - 4.0 * c;
    if discriminant < 0.0 {
        return None;
    }
    let sqrt_d = discriminant.sqrt();
    let t1 = (-b - sqrt_d) * 0.5;
    let t2 = (-b + sqrt_d) * 0.5;
    if t1 >= 0.0 {
        Some(t1)
    } else if t2 >= 0.0 {
        Some(t2)
    } else {
        None
    }
}

fn ray_vs_hull(origin: Vec2, dir: Vec2, verts: &[Vec2]) -> Option<f64> {
    if verts.len() < 3 {
        return None;
    }
    let mut closest: Option<f64> = None;
    for i in 0..verts.len() {
        let a = verts[i];
        let b = verts[(i + 1) % verts.len()];
        if let Some(t) = ray_vs_segment(origin, dir, a, b) {
            if closest.is_none_or(|best| t < best) {
                closest = Some(t);
            }
        }
    }
    closest
}

fn ray_vs_segment(origin: Vec2, dir: Vec2, a: Vec2, b: Vec2) -> Option<f64> {
    let edge = b - a;
    let denom = dir.cross(edge);
    if denom.abs() < 1e-12 {
        return None;
    }
    let to_a = a - origin;
    let t = to_a.cross(edge) / denom;
    let u = to_a.cross(dir) / denom;
    if t >= 0.0 && (0.0..=1.0).contains(&u) {
        Some(t)
    } else {
        None
    }
}
