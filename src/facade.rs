//! Scoped object facade over the handle API.
//!
//! The handle API is the canonical surface; these wrappers only own a handle
//! and give it Rust lifetime semantics: the underlying world or body is
//! destroyed when the wrapper drops. `release` is idempotent and reports
//! whether this call was the one that actually released.

use crate::body::BodyId;
use crate::engine;
use crate::error::Result;
use crate::math::{Aabb, Vec2};
use crate::shape::Shape;
use crate::world::WorldId;

pub struct WorldHandle {
    id: WorldId,
    released: bool,
}

impl WorldHandle {
    /// Acquire a fresh world.
    pub fn create() -> Self {
        Self {
            id: engine::create_world(),
            released: false,
        }
    }

    pub fn id(&self) -> WorldId {
        self.id
    }

    /// Destroy the underlying world. Returns false if already released.
    pub fn release(&mut self) -> bool {
        if self.released {
            return false;
        }
        self.released = true;
        engine::destroy_world(self.id).is_ok()
    }

    pub fn tick(&self, dt: f64) -> Result<()> {
        engine::tick(self.id, dt)
    }

    pub fn apply_gravity(&self, ax: f64, ay: f64) -> Result<()> {
        engine::apply_gravity(self.id, ax, ay)
    }

    pub fn set_iterations(&self, iterations: i32) -> Result<()> {
        engine::set_iterations(self.id, iterations)
    }

    pub fn set_boundary(&self, boundary: Option<Aabb>) -> Result<()> {
        engine::set_boundary(self.id, boundary)
    }

    pub fn body_ids(&self) -> Result<Vec<BodyId>> {
        engine::body_ids(self.id)
    }
}

impl Drop for WorldHandle {
    fn drop(&mut self) {
        self.release();
    }
}

pub struct BodyHandle {
    world: WorldId,
    id: BodyId,
    released: bool,
}

impl BodyHandle {
    pub fn new_static(world: &WorldHandle) -> Result<Self> {
        engine::create_static_body(world.id()).map(|id| Self::wrap(world.id(), id))
    }

    pub fn new_kinematic(world: &WorldHandle) -> Result<Self> {
        engine::create_kinematic_body(world.id()).map(|id| Self::wrap(world.id(), id))
    }

    pub fn new_dynamic(world: &WorldHandle) -> Result<Self> {
        engine::create_dynamic_body(world.id()).map(|id| Self::wrap(world.id(), id))
    }

    fn wrap(world: WorldId, id: BodyId) -> Self {
        Self {
            world,
            id,
            released: false,
        }
    }

    pub fn id(&self) -> BodyId {
        self.id
    }

    pub fn world_id(&self) -> WorldId {
        self.world
    }

    /// Destroy the underlying body. Returns false if already released.
    pub fn release(&mut self) -> bool {
        if self.released {
            return false;
        }
        self.released = true;
        engine::destroy_body(self.world, self.id).is_ok()
    }

    pub fn position(&self) -> Result<Vec2> {
        engine::position(self.world, self.id)
    }

    pub fn set_position(&self, x: f64, y: f64) -> Result<()> {
        engine::set_position(self.world, self.id, x, y)
    }

    pub fn velocity(&self) -> Result<Vec2> {
        engine::velocity(self.world, self.id)
    }

    pub fn set_velocity(&self, vx: f64, vy: f64) -> Result<()> {
        engine::set_velocity(self.world, self.id, vx, vy)
    }

    pub fn rotation(&self) -> Result<f64> {
        engine::rotation(self.world, self.id)
    }

    pub fn set_rotation(&self, rotation: f64) -> Result<()> {
        engine::set_rotation(self.world, self.id, rotation)
    }

    pub fn angular_velocity(&self) -> Result<f64> {
        engine::angular_velocity(self.world, self.id)
    }

    pub fn set_angular_velocity(&self, omega: f64) -> Result<()> {
        engine::set_angular_velocity(self.world, self.id, omega)
    }

    pub fn shape(&self) -> Result<Shape> {
        engine::shape(self.world, self.id)
    }

    pub fn set_circle_shape(&self, radius: f64) -> Result<()> {
        engine::set_circle_shape(self.world, self.id, radius)
    }

    pub fn set_rectangle_shape(&self, width: f64, height: f64) -> Result<()> {
        engine::set_rectangle_shape(self.world, self.id, width, height)
    }

    pub fn set_polygon_shape(&self, vertices: &[Vec2]) -> Result<()> {
        engine::set_polygon_shape(self.world, self.id, vertices)
    }

    pub fn set_material_by_name(&self, name: &str) -> Result<()> {
        engine::set_material_by_name(self.world, self.id, name)
    }
}

impl Drop for BodyHandle {
    fn drop(&mut self) {
        self.release();
    }
}
