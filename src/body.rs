//! Rigid body state plus the lazily maintained derived caches.
//!
//! A body carries three independent dirty bits: transform (world vertices and
//! AABB), mass, and angular mass. Writers invalidate exactly the caches their
//! change affects; readers recompute on demand. There is no global
//! invalidation sweep.

use smallvec::SmallVec;

use crate::material::{Material, MaterialId};
use crate::math::{Aabb, Vec2};
use crate::shape::Shape;

pub type BodyId = u32;

/// Derived angular mass below this magnitude is treated as zero.
const ANGULAR_MASS_EPSILON: f64 = 1e-9;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BodyType {
    /// Infinite mass and inertia; never integrated.
    Static,
    /// Has mass but its angular response is locked in the impulse solver.
    Kinematic,
    /// Full translational and rotational response.
    Dynamic,
}

#[derive(Debug, Clone)]
pub struct Body {
    id: BodyId,
    body_type: BodyType,
    position: Vec2,
    velocity: Vec2,
    rotation: f64,
    angular_velocity: f64,
    material: MaterialId,
    shape: Shape,

    transformed_vertices: SmallVec<[Vec2; 8]>,
    aabb: Aabb,
    mass: f64,
    inv_mass: f64,
    angular_mass: f64,
    inv_angular_mass: f64,

    transform_dirty: bool,
    mass_dirty: bool,
    angular_mass_dirty: bool,
}

impl Body {
    pub fn new(id: BodyId, body_type: BodyType, material: MaterialId) -> Self {
        Self {
            id,
            body_type,
            position: Vec2::ZERO,
            velocity: Vec2::ZERO,
            rotation: 0.0,
            angular_velocity: 0.0,
            material,
            shape: Shape::None,
            transformed_vertices: SmallVec::new(),
            aabb: Aabb::default(),
            mass: 0.0,
            inv_mass: 0.0,
            angular_mass: 0.0,
            inv_angular_mass: 0.0,
            transform_dirty: true,
            mass_dirty: true,
            angular_mass_dirty: true,
        }
    }

    pub fn id(&self) -> BodyId {
        self.id
    }

    pub fn body_type(&self) -> BodyType {
        self.body_type
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn set_position(&mut self, position: Vec2) {
        self.position = position;
        self.transform_dirty = true;
    }

    pub fn translate(&mut self, delta: Vec2) {
        self.position += delta;
        self.transform_dirty = true;
    }

    pub fn rotation(&self) -> f64 {
        self.rotation
    }

    pub fn set_rotation(&mut self, rotation: f64) {
        self.rotation = rotation;
        self.transform_dirty = true;
    }

    pub fn rotate(&mut self, delta: f64) {
        self.rotation += delta;
        self.transform_dirty = true;
    }

    pub fn velocity(&self) -> Vec2 {
        self.velocity
    }

    pub fn set_velocity(&mut self, velocity: Vec2) {
        self.velocity = velocity;
    }

    pub fn add_velocity(&mut self, delta: Vec2) {
        self.velocity += delta;
    }

    pub fn angular_velocity(&self) -> f64 {
        self.angular_velocity
    }

    pub fn set_angular_velocity(&mut self, omega: f64) {
        self.angular_velocity = omega;
    }

    pub fn add_angular_velocity(&mut self, delta: f64) {
        self.angular_velocity += delta;
    }

    pub fn material(&self) -> MaterialId {
        self.material
    }

    /// Changing the material invalidates mass and angular mass (density).
    pub fn set_material(&mut self, material: MaterialId) {
        self.material = material;
        self.mass_dirty = true;
        self.angular_mass_dirty = true;
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Changing the shape invalidates every derived cache.
    pub fn set_shape(&mut self, shape: Shape) {
        self.shape = shape;
        self.transform_dirty = true;
        self.mass_dirty = true;
        self.angular_mass_dirty = true;
    }

    /// Refresh all derived caches at once. Useful before driving the
    /// narrowphase or solver stages by hand.
    pub fn prepare(&mut self, material: &Material) {
        self.refresh_mass(material);
        self.refresh_angular_mass(material);
        self.refresh_transform();
    }

    // ---------------------------------------------------------------------
    // Transform cache
    // ---------------------------------------------------------------------

    pub(crate) fn refresh_transform(&mut self) {
        if !self.transform_dirty {
            return;
        }
        let Self {
            shape,
            transformed_vertices,
            aabb,
            position,
            rotation,
            ..
        } = self;
        match shape {
            Shape::None => {
                transformed_vertices.clear();
                *aabb = Aabb::point(*position);
            }
            Shape::Circle { radius } => {
                transformed_vertices.clear();
                *aabb = Aabb::new(
                    position.x - *radius,
                    position.y - *radius,
                    position.x + *radius,
                    position.y + *radius,
                );
            }
            Shape::Rectangle { width, height } => {
                let hw = *width * 0.5;
                let hh = *height * 0.5;
                transformed_vertices.clear();
                // Corner order: top-right, top-left, bottom-left, bottom-right
                // (counter-clockwise).
                for local in [
                    Vec2::new(hw, hh),
                    Vec2::new(-hw, hh),
                    Vec2::new(-hw, -hh),
                    Vec2::new(hw, -hh),
                ] {
                    transformed_vertices.push(*position + local.rotated(*rotation));
                }
                *aabb = Aabb::around(transformed_vertices);
            }
            Shape::Polygon { vertices } => {
                transformed_vertices.clear();
                for &local in vertices.iter() {
                    transformed_vertices.push(*position + local.rotated(*rotation));
                }
                *aabb = Aabb::around(transformed_vertices);
            }
        }
        self.transform_dirty = false;
    }

    /// World-space AABB, recomputed if stale.
    pub fn aabb(&mut self) -> Aabb {
        self.refresh_transform();
        self.aabb
    }

    /// World-space vertices, recomputed if stale. Empty for circles and
    /// shapeless bodies.
    pub fn transformed_vertices(&mut self) -> &[Vec2] {
        self.refresh_transform();
        &self.transformed_vertices
    }

    pub(crate) fn cached_aabb(&self) -> Aabb {
        debug_assert!(!self.transform_dirty);
        self.aabb
    }

    pub(crate) fn cached_vertices(&self) -> &[Vec2] {
        debug_assert!(!self.transform_dirty);
        &self.transformed_vertices
    }

    // ---------------------------------------------------------------------
    // Mass caches
    // ---------------------------------------------------------------------

    pub(crate) fn refresh_mass(&mut self, material: &Material) {
        if !self.mass_dirty {
            return;
        }
        let mass = if self.body_type == BodyType::Static {
            0.0
        } else {
            shape_mass(&self.shape, material.density)
        };
        self.mass = mass;
        self.inv_mass = if mass > 0.0 { 1.0 / mass } else { 0.0 };
        self.mass_dirty = false;
    }

    pub(crate) fn refresh_angular_mass(&mut self, material: &Material) {
        if !self.angular_mass_dirty {
            return;
        }
        let angular_mass = if self.body_type == BodyType::Static {
            0.0
        } else {
            shape_angular_mass(&self.shape, material.density)
        };
        self.angular_mass = angular_mass;
        self.inv_angular_mass = if angular_mass > 0.0 {
            1.0 / angular_mass
        } else {
            0.0
        };
        self.angular_mass_dirty = false;
    }

    pub fn mass(&mut self, material: &Material) -> f64 {
        self.refresh_mass(material);
        self.mass
    }

    pub fn inv_mass(&mut self, material: &Material) -> f64 {
        self.refresh_mass(material);
        self.inv_mass
    }

    pub fn angular_mass(&mut self, material: &Material) -> f64 {
        self.refresh_angular_mass(material);
        self.angular_mass
    }

    pub fn inv_angular_mass(&mut self, material: &Material) -> f64 {
        self.refresh_angular_mass(material);
        self.inv_angular_mass
    }

    pub(crate) fn cached_mass(&self) -> f64 {
        debug_assert!(!self.mass_dirty);
        self.mass
    }

    pub(crate) fn cached_inv_mass(&self) -> f64 {
        debug_assert!(!self.mass_dirty);
        self.inv_mass
    }

    pub(crate) fn cached_inv_angular_mass(&self) -> f64 {
        debug_assert!(!self.angular_mass_dirty);
        self.inv_angular_mass
    }

    // ---------------------------------------------------------------------
    // Motion
    // ---------------------------------------------------------------------

    /// One integration substep: exponential drag, then explicit Euler on the
    /// pose. Static bodies are left untouched.
    pub fn integrate(&mut self, dt: f64, material: &Material) {
        if self.body_type == BodyType::Static {
            return;
        }
        if self.velocity.length_squared() > 0.0 {
            let damping = (-material.linear_drag * dt).exp();
            self.velocity = self.velocity * damping;
            self.position += self.velocity * dt;
            self.transform_dirty = true;
        }
        if self.angular_velocity != 0.0 {
            let damping = (-material.angular_drag * dt).exp();
            self.angular_velocity *= damping;
            self.rotation += self.angular_velocity * dt;
            self.transform_dirty = true;
        }
    }

    /// Translation-only impulse. Used for kinematic participants.
    pub(crate) fn apply_impulse(&mut self, impulse: Vec2) {
        self.velocity += impulse * self.cached_inv_mass();
    }

    /// Translational plus rotational impulse at contact offset `r`.
    pub(crate) fn apply_impulse_at(&mut self, r: Vec2, impulse: Vec2) {
        self.velocity += impulse * self.cached_inv_mass();
        self.angular_velocity += r.cross(impulse) * self.cached_inv_angular_mass();
    }
}

fn shape_mass(shape: &Shape, density: f64) -> f64 {
    match shape {
        Shape::None => 0.0,
        Shape::Circle { radius } => std::f64::consts::PI * radius * radius * density,
        Shape::Rectangle { width, height } => width * height * density,
        Shape::Polygon { vertices } => polygon_area(vertices).abs() * density,
    }
}

fn shape_angular_mass(shape: &Shape, density: f64) -> f64 {
    match shape {
        Shape::None => 0.0,
        Shape::Circle { radius } => {
            let mass = std::f64::consts::PI * radius * radius * density;
            0.5 * mass * radius * radius
        }
        Shape::Rectangle { width, height } => {
            let mass = width * height * density;
            mass * (width * width + height * height) / 12.0
        }
        Shape::Polygon { vertices } => polygon_angular_mass(vertices, density),
    }
}

/// Signed shoelace area of a local-space vertex loop. Counter-clockwise
/// winding yields a positive value. Fewer than 3 vertices yield 0.
fn polygon_area(vertices: &[Vec2]) -> f64 {
    if vertices.len() < 3 {
        return 0.0;
    }
    let mut twice_area = 0.0;
    for (i, &v0) in vertices.iter().enumerate() {
        let v1 = vertices[(i + 1) % vertices.len()];
        twice_area += v0.cross(v1);
    }
    twice_area * 0.5
}

/// Rotational inertia of a convex polygon about its centroid.
///
/// The second moment is accumulated about the local origin, then shifted to
/// the centroid with the parallel axis theorem. Degenerate loops (zero area)
/// yield 0 instead of failing.
fn polygon_angular_mass(vertices: &[Vec2], density: f64) -> f64 {
    if vertices.len() < 3 {
        return 0.0;
    }
    let mut twice_area = 0.0;
    let mut centroid_x = 0.0;
    let mut centroid_y = 0.0;
    let mut second_moment = 0.0;
    for (i, &v0) in vertices.iter().enumerate() {
        let v1 = vertices[(i + 1) % vertices.len()];
        let cross = v0.cross(v1);
        twice_area += cross;
        centroid_x += (v0.x + v1.x) * cross;
        centroid_y += (v0.y + v1.y) * cross;
        second_moment += cross
            * (v0.x * v0.x + v0.x * v1.x + v1.x * v1.x + v0.y * v0.y + v0.y * v1.y + v1.y * v1.y);
    }
    let area = twice_area * 0.5;
    if area.abs() < ANGULAR_MASS_EPSILON {
        log::warn!("polygon with zero area has no rotational inertia");
        return 0.0;
    }
    let centroid = Vec2::new(centroid_x / (6.0 * area), centroid_y / (6.0 * area));
    let mass = area.abs() * density;
    let about_origin = density * second_moment / 12.0;
    let about_centroid = about_origin - mass * centroid.length_squared();
    if about_centroid.abs() < ANGULAR_MASS_EPSILON {
        0.0
    } else {
        // FP noise can push a thin shape slightly negative.
        about_centroid.abs()
    }
}
