//! Process-wide handle API.
//!
//! Worlds live in a global table keyed by numeric id; bodies are addressed as
//! `(world, body)` id pairs. Every operation validates its arguments before
//! mutating anything, so a returned error always means unchanged state.
//!
//! The world table lock is only held long enough to look up a world's own
//! mutex, so independent worlds can be ticked from separate threads as long
//! as no single world's handles are shared.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, LazyLock, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

use log::debug;

use crate::body::{Body, BodyId, BodyType};
use crate::broadphase::SpatialHash;
use crate::error::{Error, Result};
use crate::material::{CombineMode, Material, MaterialId, MaterialRegistry};
use crate::math::{Aabb, Vec2};
use crate::resolve::CorrectionMode;
use crate::serialize::WorldSnapshot;
use crate::shape::{PolygonCatalog, PolygonId, Shape};
use crate::world::{RayHit, World, WorldId};

static WORLDS: LazyLock<Mutex<HashMap<WorldId, Arc<Mutex<World>>>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));
static NEXT_WORLD_ID: AtomicU32 = AtomicU32::new(1);
static MATERIALS: LazyLock<RwLock<MaterialRegistry>> =
    LazyLock::new(|| RwLock::new(MaterialRegistry::new()));
static POLYGONS: LazyLock<RwLock<PolygonCatalog>> =
    LazyLock::new(|| RwLock::new(PolygonCatalog::new()));

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn with_world<T>(world: WorldId, f: impl FnOnce(&mut World) -> Result<T>) -> Result<T> {
    let handle = lock(&WORLDS)
        .get(&world)
        .cloned()
        .ok_or(Error::WorldNotFound(world))?;
    let mut guard = handle.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    f(&mut guard)
}

fn with_body<T>(world: WorldId, body: BodyId, f: impl FnOnce(&mut Body) -> T) -> Result<T> {
    with_world(world, |w| w.body_mut(body).map(f))
}

fn check_scalar(index: usize, name: &'static str, value: f64) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(Error::bad_argument(index, name, "must be a finite number"))
    }
}

// -------------------------------------------------------------------------
// World lifecycle
// -------------------------------------------------------------------------

pub fn create_world() -> WorldId {
    let id = NEXT_WORLD_ID.fetch_add(1, Ordering::Relaxed);
    lock(&WORLDS).insert(id, Arc::new(Mutex::new(World::new(id))));
    debug!("created world {id}");
    id
}

pub fn world_exists(world: WorldId) -> bool {
    lock(&WORLDS).contains_key(&world)
}

pub fn destroy_world(world: WorldId) -> Result<()> {
    if lock(&WORLDS).remove(&world).is_none() {
        // Ids below the issue watermark were handed out once: destroying
        // them again (id 0 included) is a double-destroy, not a miss.
        return Err(if world < NEXT_WORLD_ID.load(Ordering::Relaxed) {
            Error::AlreadyDestroyed {
                what: "world",
                id: world,
            }
        } else {
            Error::WorldNotFound(world)
        });
    }
    debug!("destroyed world {world}");
    Ok(())
}

pub fn clear_bodies(world: WorldId) -> Result<()> {
    with_world(world, |w| {
        w.clear_bodies();
        Ok(())
    })
}

pub fn has_body(world: WorldId, body: BodyId) -> Result<bool> {
    with_world(world, |w| Ok(w.has_body(body)))
}

pub fn body_ids(world: WorldId) -> Result<Vec<BodyId>> {
    with_world(world, |w| Ok(w.body_ids().to_vec()))
}

// -------------------------------------------------------------------------
// Body lifecycle
// -------------------------------------------------------------------------

fn create_body(world: WorldId, body_type: BodyType) -> Result<BodyId> {
    let material = read(&MATERIALS).default_id();
    with_world(world, |w| Ok(w.create_body(body_type, material)))
}

pub fn create_static_body(world: WorldId) -> Result<BodyId> {
    create_body(world, BodyType::Static)
}

pub fn create_kinematic_body(world: WorldId) -> Result<BodyId> {
    create_body(world, BodyType::Kinematic)
}

pub fn create_dynamic_body(world: WorldId) -> Result<BodyId> {
    create_body(world, BodyType::Dynamic)
}

pub fn destroy_body(world: WorldId, body: BodyId) -> Result<()> {
    with_world(world, |w| w.destroy_body(body))
}

pub fn body_type(world: WorldId, body: BodyId) -> Result<BodyType> {
    with_body(world, body, |b| b.body_type())
}

// -------------------------------------------------------------------------
// Body state
// -------------------------------------------------------------------------

pub fn position(world: WorldId, body: BodyId) -> Result<Vec2> {
    with_body(world, body, |b| b.position())
}

pub fn set_position(world: WorldId, body: BodyId, x: f64, y: f64) -> Result<()> {
    check_scalar(3, "x", x)?;
    check_scalar(4, "y", y)?;
    with_body(world, body, |b| b.set_position(Vec2::new(x, y)))
}

pub fn change_position(world: WorldId, body: BodyId, dx: f64, dy: f64) -> Result<()> {
    check_scalar(3, "dx", dx)?;
    check_scalar(4, "dy", dy)?;
    with_body(world, body, |b| b.translate(Vec2::new(dx, dy)))
}

pub fn rotation(world: WorldId, body: BodyId) -> Result<f64> {
    with_body(world, body, |b| b.rotation())
}

pub fn set_rotation(world: WorldId, body: BodyId, rotation: f64) -> Result<()> {
    check_scalar(3, "rotation", rotation)?;
    with_body(world, body, |b| b.set_rotation(rotation))
}

pub fn change_rotation(world: WorldId, body: BodyId, delta: f64) -> Result<()> {
    check_scalar(3, "delta", delta)?;
    with_body(world, body, |b| b.rotate(delta))
}

pub fn velocity(world: WorldId, body: BodyId) -> Result<Vec2> {
    with_body(world, body, |b| b.velocity())
}

pub fn set_velocity(world: WorldId, body: BodyId, vx: f64, vy: f64) -> Result<()> {
    check_scalar(3, "vx", vx)?;
    check_scalar(4, "vy", vy)?;
    with_body(world, body, |b| b.set_velocity(Vec2::new(vx, vy)))
}

pub fn change_velocity(world: WorldId, body: BodyId, dvx: f64, dvy: f64) -> Result<()> {
    check_scalar(3, "dvx", dvx)?;
    check_scalar(4, "dvy", dvy)?;
    with_body(world, body, |b| b.add_velocity(Vec2::new(dvx, dvy)))
}

pub fn angular_velocity(world: WorldId, body: BodyId) -> Result<f64> {
    with_body(world, body, |b| b.angular_velocity())
}

pub fn set_angular_velocity(world: WorldId, body: BodyId, omega: f64) -> Result<()> {
    check_scalar(3, "angularVelocity", omega)?;
    with_body(world, body, |b| b.set_angular_velocity(omega))
}

pub fn change_angular_velocity(world: WorldId, body: BodyId, delta: f64) -> Result<()> {
    check_scalar(3, "delta", delta)?;
    with_body(world, body, |b| b.add_angular_velocity(delta))
}

pub fn material(world: WorldId, body: BodyId) -> Result<MaterialId> {
    with_body(world, body, |b| b.material())
}

pub fn set_material(world: WorldId, body: BodyId, material: MaterialId) -> Result<()> {
    read(&MATERIALS).get(material)?;
    with_body(world, body, |b| b.set_material(material))
}

pub fn set_material_by_name(world: WorldId, body: BodyId, name: &str) -> Result<()> {
    let material = read(&MATERIALS).get_by_name(name)?.id;
    with_body(world, body, |b| b.set_material(material))
}

pub fn body_aabb(world: WorldId, body: BodyId) -> Result<Aabb> {
    with_body(world, body, |b| b.aabb())
}

pub fn body_mass(world: WorldId, body: BodyId) -> Result<f64> {
    with_world(world, |w| {
        let b = w.body_mut(body)?;
        let materials = read(&MATERIALS);
        Ok(b.mass(materials.resolve(b.material())))
    })
}

pub fn body_angular_mass(world: WorldId, body: BodyId) -> Result<f64> {
    with_world(world, |w| {
        let b = w.body_mut(body)?;
        let materials = read(&MATERIALS);
        Ok(b.angular_mass(materials.resolve(b.material())))
    })
}

pub fn apply_linear_impulse(world: WorldId, body: BodyId, jx: f64, jy: f64) -> Result<()> {
    check_scalar(3, "jx", jx)?;
    check_scalar(4, "jy", jy)?;
    with_world(world, |w| {
        let b = w.body_mut(body)?;
        let materials = read(&MATERIALS);
        let material = materials.resolve(b.material());
        b.refresh_mass(material);
        b.apply_impulse(Vec2::new(jx, jy));
        Ok(())
    })
}

// -------------------------------------------------------------------------
// Shapes
// -------------------------------------------------------------------------

pub fn shape(world: WorldId, body: BodyId) -> Result<Shape> {
    with_body(world, body, |b| b.shape().clone())
}

pub fn set_circle_shape(world: WorldId, body: BodyId, radius: f64) -> Result<()> {
    if !(radius.is_finite() && radius > 0.0) {
        return Err(Error::bad_argument(3, "radius", "must be greater than 0"));
    }
    with_body(world, body, |b| b.set_shape(Shape::Circle { radius }))
}

pub fn set_rectangle_shape(world: WorldId, body: BodyId, width: f64, height: f64) -> Result<()> {
    if !(width.is_finite() && width > 0.0) {
        return Err(Error::bad_argument(3, "width", "must be greater than 0"));
    }
    if !(height.is_finite() && height > 0.0) {
        return Err(Error::bad_argument(4, "height", "must be greater than 0"));
    }
    with_body(world, body, |b| b.set_shape(Shape::Rectangle { width, height }))
}

pub fn set_polygon_shape(world: WorldId, body: BodyId, vertices: &[Vec2]) -> Result<()> {
    validate_polygon(3, vertices)?;
    with_body(world, body, |b| {
        b.set_shape(Shape::Polygon {
            vertices: vertices.to_vec(),
        })
    })
}

pub fn set_predefined_polygon_shape(world: WorldId, body: BodyId, name: &str) -> Result<()> {
    let vertices = read(&POLYGONS).get_by_name(name)?.to_vec();
    with_body(world, body, |b| b.set_shape(Shape::Polygon { vertices }))
}

fn validate_polygon(index: usize, vertices: &[Vec2]) -> Result<()> {
    if vertices.len() < 3 {
        return Err(Error::bad_argument(
            index,
            "vertices",
            "polygon needs at least 3 vertices",
        ));
    }
    for v in vertices {
        if !(v.x.is_finite() && v.y.is_finite()) {
            return Err(Error::bad_argument(
                index,
                "vertices",
                "vertex coordinates must be finite numbers",
            ));
        }
    }
    Ok(())
}

// -------------------------------------------------------------------------
// World settings and simulation
// -------------------------------------------------------------------------

pub fn iterations(world: WorldId) -> Result<u32> {
    with_world(world, |w| Ok(w.iterations()))
}

pub fn set_iterations(world: WorldId, iterations: i32) -> Result<()> {
    with_world(world, |w| {
        w.set_iterations(iterations);
        Ok(())
    })
}

pub fn boundary(world: WorldId) -> Result<Option<Aabb>> {
    with_world(world, |w| Ok(w.boundary()))
}

pub fn set_boundary(world: WorldId, boundary: Option<Aabb>) -> Result<()> {
    if let Some(aabb) = &boundary {
        let finite = aabb.min_x.is_finite()
            && aabb.min_y.is_finite()
            && aabb.max_x.is_finite()
            && aabb.max_y.is_finite();
        if !finite || aabb.min_x > aabb.max_x || aabb.min_y > aabb.max_y {
            return Err(Error::bad_argument(2, "boundary", "min must not exceed max"));
        }
    }
    with_world(world, |w| {
        w.set_boundary(boundary);
        Ok(())
    })
}

pub fn correction_mode(world: WorldId) -> Result<CorrectionMode> {
    with_world(world, |w| Ok(w.correction_mode()))
}

pub fn set_correction_mode(world: WorldId, mode: CorrectionMode) -> Result<()> {
    with_world(world, |w| {
        w.set_correction_mode(mode);
        Ok(())
    })
}

/// Install a uniform-grid broadphase index for candidate pair enumeration.
pub fn enable_spatial_hash_broadphase(world: WorldId, cell_size: f64) -> Result<()> {
    if !(cell_size.is_finite() && cell_size > 0.0) {
        return Err(Error::bad_argument(2, "cellSize", "must be greater than 0"));
    }
    with_world(world, |w| {
        w.set_broadphase(Some(Box::new(SpatialHash::new(cell_size))));
        Ok(())
    })
}

/// Drop any installed broadphase index, returning to the O(n^2) sweep.
pub fn disable_broadphase(world: WorldId) -> Result<()> {
    with_world(world, |w| {
        w.set_broadphase(None);
        Ok(())
    })
}

/// Add `(ax, ay)` to the velocity of every non-static body. This is a raw
/// velocity delta, not an acceleration.
pub fn apply_gravity(world: WorldId, ax: f64, ay: f64) -> Result<()> {
    check_scalar(2, "ax", ax)?;
    check_scalar(3, "ay", ay)?;
    with_world(world, |w| {
        w.apply_gravity(Vec2::new(ax, ay));
        Ok(())
    })
}

pub fn tick(world: WorldId, dt: f64) -> Result<()> {
    if !dt.is_finite() {
        return Err(Error::bad_argument(2, "deltaTime", "must be a finite number"));
    }
    with_world(world, |w| {
        let materials = read(&MATERIALS);
        w.tick(dt, &materials);
        Ok(())
    })
}

pub fn query_aabb(world: WorldId, aabb: &Aabb) -> Result<Vec<BodyId>> {
    with_world(world, |w| Ok(w.query_aabb(aabb)))
}

pub fn raycast(
    world: WorldId,
    origin: Vec2,
    direction: Vec2,
    max_distance: f64,
) -> Result<Option<RayHit>> {
    with_world(world, |w| Ok(w.raycast(origin, direction, max_distance)))
}

// -------------------------------------------------------------------------
// Material registry
// -------------------------------------------------------------------------

#[allow(clippy::too_many_arguments)]
pub fn register_material(
    name: &str,
    density: f64,
    restitution: f64,
    static_friction: f64,
    dynamic_friction: f64,
    combine: CombineMode,
    linear_drag: f64,
    angular_drag: f64,
) -> Result<MaterialId> {
    write(&MATERIALS).register(
        name,
        density,
        restitution,
        static_friction,
        dynamic_friction,
        combine,
        linear_drag,
        angular_drag,
    )
}

pub fn material_info(id: MaterialId) -> Result<Material> {
    read(&MATERIALS).get(id).cloned()
}

pub fn material_info_by_name(name: &str) -> Result<Material> {
    read(&MATERIALS).get_by_name(name).cloned()
}

pub fn material_id(name: &str) -> Result<MaterialId> {
    read(&MATERIALS).get_by_name(name).map(|m| m.id)
}

pub fn contains_material(name: &str) -> bool {
    read(&MATERIALS).contains(name)
}

/// All registered materials in registration order.
pub fn materials() -> Vec<Material> {
    read(&MATERIALS).iter().cloned().collect()
}

pub fn default_material_id() -> MaterialId {
    read(&MATERIALS).default_id()
}

pub fn set_default_material(name: &str) -> Result<()> {
    write(&MATERIALS).set_default(name)
}

/// Drop user-registered materials and re-seed the builtins.
pub fn reset_materials() {
    write(&MATERIALS).reset();
}

// -------------------------------------------------------------------------
// Predefined polygon catalog
// -------------------------------------------------------------------------

pub fn register_polygon(name: &str, vertices: &[Vec2]) -> Result<PolygonId> {
    validate_polygon(2, vertices)?;
    write(&POLYGONS).register(name, vertices)
}

pub fn polygon(name: &str) -> Result<Vec<Vec2>> {
    read(&POLYGONS).get_by_name(name).map(<[Vec2]>::to_vec)
}

pub fn polygon_by_id(id: PolygonId) -> Result<Vec<Vec2>> {
    read(&POLYGONS).get(id).map(<[Vec2]>::to_vec)
}

pub fn contains_polygon(name: &str) -> bool {
    read(&POLYGONS).contains(name)
}

pub fn reset_polygons() {
    write(&POLYGONS).reset();
}

// -------------------------------------------------------------------------
// Serialization
// -------------------------------------------------------------------------

/// Canonical text encoding of a world's body population.
pub fn serialize_world(world: WorldId) -> Result<String> {
    with_world(world, |w| Ok(WorldSnapshot::take(w).to_text()))
}

/// Replace a world's body population from its canonical text encoding.
pub fn deserialize_world(world: WorldId, text: &str) -> Result<()> {
    let snapshot = WorldSnapshot::from_text(text)?;
    with_world(world, |w| {
        snapshot.restore_into(w);
        Ok(())
    })
}
