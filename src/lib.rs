//! rigid2d: impulse-based 2D rigid body physics for small scenes.
//!
//! A world holds static, kinematic, and dynamic bodies shaped as circles,
//! rectangles, or convex polygons. Each tick is split into substeps that
//! integrate motion under exponential drag, detect collisions with a
//! SAT narrowphase, and resolve them with position correction plus
//! sequential velocity impulses honoring restitution and Coulomb friction.
//!
//! Two surfaces are offered:
//!
//! - a handle API ([`engine`]) addressing worlds and bodies by numeric id,
//!   backed by process-wide registries for materials and named polygons;
//! - a scoped facade ([`facade`]) whose [`WorldHandle`] and [`BodyHandle`]
//!   release their handles on drop.
//!
//! Handle style:
//!
//! ```
//! use rigid2d::engine;
//!
//! let world = engine::create_world();
//! let ball = engine::create_dynamic_body(world).unwrap();
//! engine::set_circle_shape(world, ball, 0.5).unwrap();
//! engine::set_position(world, ball, 0.0, 10.0).unwrap();
//! engine::set_material_by_name(world, ball, "Rubber").unwrap();
//!
//! for _ in 0..60 {
//!     engine::apply_gravity(world, 0.0, -9.81 / 60.0).unwrap();
//!     engine::tick(world, 1.0 / 60.0).unwrap();
//! }
//! assert!(engine::position(world, ball).unwrap().y < 10.0);
//! engine::destroy_world(world).unwrap();
//! ```
//!
//! Facade style:
//!
//! ```
//! use rigid2d::{BodyHandle, WorldHandle};
//!
//! let world = WorldHandle::create();
//! let ground = BodyHandle::new_static(&world).unwrap();
//! ground.set_rectangle_shape(20.0, 1.0).unwrap();
//! world.tick(1.0 / 60.0).unwrap();
//! // world and ground release their handles when dropped
//! ```

pub mod body;
pub mod broadphase;
pub mod engine;
pub mod error;
pub mod facade;
pub mod material;
pub mod math;
pub mod narrowphase;
pub mod resolve;
pub mod serialize;
pub mod shape;
pub mod world;

pub use body::{Body, BodyId, BodyType};
pub use broadphase::{BroadphaseIndex, SpatialHash};
pub use error::{Error, Result};
pub use facade::{BodyHandle, WorldHandle};
pub use material::{CombineMode, Material, MaterialId, MaterialRegistry};
pub use math::{Aabb, Vec2};
pub use narrowphase::Intersection;
pub use resolve::CorrectionMode;
pub use serialize::{BodyRecord, WorldSnapshot};
pub use shape::{PolygonCatalog, PolygonId, Shape};
pub use world::{DEFAULT_ITERATIONS, RayHit, World, WorldId};
