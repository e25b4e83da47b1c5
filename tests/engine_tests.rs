//! Integration tests for the handle API, the process-wide registries, and
//! the scoped object facade.

use std::sync::Mutex;

use rigid2d::{Aabb, BodyHandle, BodyType, CombineMode, Error, Vec2, WorldHandle, engine};

/// Tests that mutate the process-wide material or polygon registries take
/// this lock and restore the seeded state before releasing it.
static REGISTRY_GUARD: Mutex<()> = Mutex::new(());

// =========================================================================
// World lifecycle
// =========================================================================

#[test]
fn test_world_create_exists_destroy() {
    let world = engine::create_world();
    assert!(engine::world_exists(world));
    engine::destroy_world(world).unwrap();
    assert!(!engine::world_exists(world));

    // A second destroy of a once-issued id is a double-destroy, not a miss.
    let err = engine::destroy_world(world).unwrap_err();
    assert_eq!(err.to_string(), format!("world {world} already destroyed"));
    assert_eq!(
        err,
        Error::AlreadyDestroyed {
            what: "world",
            id: world,
        },
    );
    // Lookups on the destroyed world still report it as unknown.
    assert_eq!(
        engine::body_ids(world).unwrap_err(),
        Error::WorldNotFound(world),
    );
}

#[test]
fn test_world_ids_are_unique() {
    let a = engine::create_world();
    let b = engine::create_world();
    assert_ne!(a, b);
    engine::destroy_world(a).unwrap();
    engine::destroy_world(b).unwrap();
}

#[test]
fn test_destroy_world_zero_is_already_destroyed() {
    let err = engine::destroy_world(0).unwrap_err();
    assert_eq!(err.to_string(), "world 0 already destroyed");
}

#[test]
fn test_operations_on_unknown_world_fail() {
    assert_eq!(
        engine::tick(999_999, 1.0 / 60.0).unwrap_err().to_string(),
        "world 999999 does not exist",
    );
    assert!(engine::create_dynamic_body(999_999).is_err());
    assert!(engine::body_ids(999_999).is_err());
}

// =========================================================================
// Body lifecycle and state
// =========================================================================

#[test]
fn test_body_lifecycle_and_lookup_errors() {
    let world = engine::create_world();
    let a = engine::create_static_body(world).unwrap();
    let b = engine::create_kinematic_body(world).unwrap();
    let c = engine::create_dynamic_body(world).unwrap();
    assert_eq!((a, b, c), (1, 2, 3));
    assert_eq!(engine::body_type(world, a).unwrap(), BodyType::Static);
    assert_eq!(engine::body_type(world, b).unwrap(), BodyType::Kinematic);
    assert_eq!(engine::body_type(world, c).unwrap(), BodyType::Dynamic);
    assert_eq!(engine::body_ids(world).unwrap(), vec![1, 2, 3]);
    assert!(engine::has_body(world, b).unwrap());

    engine::destroy_body(world, b).unwrap();
    assert!(!engine::has_body(world, b).unwrap());
    let err = engine::position(world, b).unwrap_err();
    assert_eq!(
        err.to_string(),
        format!("body 2 does not exist in world {world}"),
    );
    assert_eq!(
        engine::destroy_body(world, b).unwrap_err().to_string(),
        "body 2 already destroyed",
    );
    // An id that was never issued is a plain miss.
    assert_eq!(
        engine::destroy_body(world, 42).unwrap_err().to_string(),
        format!("body 42 does not exist in world {world}"),
    );

    engine::clear_bodies(world).unwrap();
    assert!(engine::body_ids(world).unwrap().is_empty());
    engine::destroy_world(world).unwrap();
}

#[test]
fn test_state_setters_round_trip() {
    let world = engine::create_world();
    let body = engine::create_dynamic_body(world).unwrap();

    engine::set_position(world, body, 1.5, -2.5).unwrap();
    assert_eq!(engine::position(world, body).unwrap(), Vec2::new(1.5, -2.5));
    engine::change_position(world, body, 0.5, 0.5).unwrap();
    assert_eq!(engine::position(world, body).unwrap(), Vec2::new(2.0, -2.0));

    engine::set_rotation(world, body, 0.25).unwrap();
    assert_eq!(engine::rotation(world, body).unwrap(), 0.25);
    engine::change_rotation(world, body, 0.25).unwrap();
    assert_eq!(engine::rotation(world, body).unwrap(), 0.5);

    engine::set_velocity(world, body, 3.0, 4.0).unwrap();
    assert_eq!(engine::velocity(world, body).unwrap(), Vec2::new(3.0, 4.0));
    engine::change_velocity(world, body, -1.0, -1.0).unwrap();
    assert_eq!(engine::velocity(world, body).unwrap(), Vec2::new(2.0, 3.0));

    engine::set_angular_velocity(world, body, 2.0).unwrap();
    engine::change_angular_velocity(world, body, -0.5).unwrap();
    assert_eq!(engine::angular_velocity(world, body).unwrap(), 1.5);

    engine::destroy_world(world).unwrap();
}

#[test]
fn test_setter_validation_leaves_state_unchanged() {
    let world = engine::create_world();
    let body = engine::create_dynamic_body(world).unwrap();
    engine::set_position(world, body, 1.0, 1.0).unwrap();

    let err = engine::set_position(world, body, f64::NAN, 0.0).unwrap_err();
    assert_eq!(
        err.to_string(),
        "bad argument to #3 'x': must be a finite number",
    );
    let err = engine::set_velocity(world, body, 0.0, f64::INFINITY).unwrap_err();
    assert_eq!(
        err.to_string(),
        "bad argument to #4 'vy': must be a finite number",
    );
    assert_eq!(engine::position(world, body).unwrap(), Vec2::new(1.0, 1.0));
    assert_eq!(engine::velocity(world, body).unwrap(), Vec2::ZERO);

    engine::destroy_world(world).unwrap();
}

#[test]
fn test_shape_setters_validate() {
    let world = engine::create_world();
    let body = engine::create_dynamic_body(world).unwrap();

    assert_eq!(
        engine::set_circle_shape(world, body, 0.0)
            .unwrap_err()
            .to_string(),
        "bad argument to #3 'radius': must be greater than 0",
    );
    assert_eq!(
        engine::set_rectangle_shape(world, body, 1.0, -2.0)
            .unwrap_err()
            .to_string(),
        "bad argument to #4 'height': must be greater than 0",
    );
    let two = [Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0)];
    assert_eq!(
        engine::set_polygon_shape(world, body, &two)
            .unwrap_err()
            .to_string(),
        "bad argument to #3 'vertices': polygon needs at least 3 vertices",
    );

    engine::set_circle_shape(world, body, 0.5).unwrap();
    assert_eq!(
        engine::shape(world, body).unwrap(),
        rigid2d::Shape::Circle { radius: 0.5 },
    );
    let aabb = engine::body_aabb(world, body).unwrap();
    assert_eq!(aabb, Aabb::new(-0.5, -0.5, 0.5, 0.5));

    engine::destroy_world(world).unwrap();
}

#[test]
fn test_tick_rejects_non_finite_dt_and_skips_non_positive() {
    let world = engine::create_world();
    let body = engine::create_dynamic_body(world).unwrap();
    engine::set_circle_shape(world, body, 1.0).unwrap();
    engine::set_velocity(world, body, 5.0, 0.0).unwrap();

    assert_eq!(
        engine::tick(world, f64::NAN).unwrap_err().to_string(),
        "bad argument to #2 'deltaTime': must be a finite number",
    );
    engine::tick(world, 0.0).unwrap();
    engine::tick(world, -0.5).unwrap();
    assert_eq!(engine::position(world, body).unwrap(), Vec2::ZERO);

    engine::tick(world, 1.0 / 60.0).unwrap();
    assert!(engine::position(world, body).unwrap().x > 0.0);

    engine::destroy_world(world).unwrap();
}

#[test]
fn test_iterations_and_boundary_settings() {
    let world = engine::create_world();
    assert_eq!(engine::iterations(world).unwrap(), 4);
    engine::set_iterations(world, 10).unwrap();
    assert_eq!(engine::iterations(world).unwrap(), 10);
    engine::set_iterations(world, -1).unwrap();
    assert_eq!(engine::iterations(world).unwrap(), 4);

    assert_eq!(engine::boundary(world).unwrap(), None);
    let bound = Aabb::new(-5.0, -5.0, 5.0, 5.0);
    engine::set_boundary(world, Some(bound)).unwrap();
    assert_eq!(engine::boundary(world).unwrap(), Some(bound));
    engine::set_boundary(world, None).unwrap();
    assert_eq!(engine::boundary(world).unwrap(), None);

    let err = engine::set_boundary(world, Some(Aabb::new(1.0, 0.0, -1.0, 0.0)));
    assert_eq!(
        err.unwrap_err().to_string(),
        "bad argument to #2 'boundary': min must not exceed max",
    );

    engine::destroy_world(world).unwrap();
}

#[test]
fn test_apply_linear_impulse_scales_by_inverse_mass() {
    // Depends on the default material being Wood.
    let _guard = REGISTRY_GUARD.lock().unwrap_or_else(|p| p.into_inner());
    let world = engine::create_world();
    let body = engine::create_dynamic_body(world).unwrap();
    engine::set_circle_shape(world, body, 1.0).unwrap();
    // Default material is Wood: mass = pi * 0.6.
    let mass = std::f64::consts::PI * 0.6;
    engine::apply_linear_impulse(world, body, mass * 3.0, 0.0).unwrap();
    let v = engine::velocity(world, body).unwrap();
    assert!((v.x - 3.0).abs() < 1e-12);
    engine::destroy_world(world).unwrap();
}

#[test]
fn test_gravity_and_simulation_through_handles() {
    let world = engine::create_world();
    let floor = engine::create_static_body(world).unwrap();
    engine::set_rectangle_shape(world, floor, 10.0, 1.0).unwrap();
    engine::set_material_by_name(world, floor, "Stone").unwrap();

    let ball = engine::create_dynamic_body(world).unwrap();
    engine::set_circle_shape(world, ball, 0.5).unwrap();
    engine::set_position(world, ball, 0.0, 3.0).unwrap();
    engine::set_material_by_name(world, ball, "Rubber").unwrap();

    for _ in 0..120 {
        engine::apply_gravity(world, 0.0, -0.5).unwrap();
        engine::tick(world, 1.0 / 60.0).unwrap();
    }
    let y = engine::position(world, ball).unwrap().y;
    assert!(y > 0.9 && y < 1.1, "ball should rest on the slab, y = {y}");

    engine::destroy_world(world).unwrap();
}

#[test]
fn test_query_and_raycast_through_handles() {
    let world = engine::create_world();
    let target = engine::create_static_body(world).unwrap();
    engine::set_circle_shape(world, target, 1.0).unwrap();
    engine::set_position(world, target, 5.0, 0.0).unwrap();

    let hits = engine::query_aabb(world, &Aabb::new(3.0, -1.0, 7.0, 1.0)).unwrap();
    assert_eq!(hits, vec![target]);

    let hit = engine::raycast(world, Vec2::ZERO, Vec2::new(1.0, 0.0), 100.0)
        .unwrap()
        .unwrap();
    assert_eq!(hit.body, target);
    assert!((hit.distance - 4.0).abs() < 1e-9);

    engine::destroy_world(world).unwrap();
}

#[test]
fn test_spatial_hash_broadphase_toggle() {
    let world = engine::create_world();
    assert_eq!(
        engine::enable_spatial_hash_broadphase(world, 0.0)
            .unwrap_err()
            .to_string(),
        "bad argument to #2 'cellSize': must be greater than 0",
    );
    engine::enable_spatial_hash_broadphase(world, 8.0).unwrap();

    let a = engine::create_dynamic_body(world).unwrap();
    engine::set_circle_shape(world, a, 1.0).unwrap();
    engine::set_position(world, a, -0.5, 0.0).unwrap();
    let b = engine::create_dynamic_body(world).unwrap();
    engine::set_circle_shape(world, b, 1.0).unwrap();
    engine::set_position(world, b, 0.5, 0.0).unwrap();

    engine::tick(world, 1e-9).unwrap();
    let pa = engine::position(world, a).unwrap();
    let pb = engine::position(world, b).unwrap();
    assert!((pa.distance(pb) - 2.0).abs() < 1e-9, "index path must resolve overlap");

    engine::disable_broadphase(world).unwrap();
    engine::tick(world, 1e-9).unwrap();

    engine::destroy_world(world).unwrap();
}

// =========================================================================
// Material registry
// =========================================================================

#[test]
fn test_material_registry_roundtrip() {
    let _guard = REGISTRY_GUARD.lock().unwrap_or_else(|p| p.into_inner());

    let names: Vec<String> = engine::materials().into_iter().map(|m| m.name).collect();
    assert_eq!(
        names,
        ["Glass", "Ice", "Lead", "Plastic", "Rubber", "Steel", "Stone", "Wood"],
    );
    assert_eq!(
        engine::default_material_id(),
        engine::material_id("Wood").unwrap(),
    );

    let clay = engine::register_material(
        "Clay",
        1.8,
        0.2,
        0.6,
        0.5,
        CombineMode::Minimum,
        0.2,
        0.1,
    )
    .unwrap();
    assert!(engine::contains_material("Clay"));
    assert_eq!(engine::material_info(clay).unwrap().density, 1.8);
    assert_eq!(engine::material_info_by_name("Clay").unwrap().id, clay);

    engine::set_default_material("Clay").unwrap();
    assert_eq!(engine::default_material_id(), clay);

    engine::reset_materials();
    assert!(!engine::contains_material("Clay"));
    assert_eq!(
        engine::default_material_id(),
        engine::material_id("Wood").unwrap(),
    );
    assert_eq!(
        engine::material_id("Clay").unwrap_err().to_string(),
        "material Clay does not exist",
    );
}

#[test]
fn test_unknown_material_assignment_fails() {
    let world = engine::create_world();
    let body = engine::create_dynamic_body(world).unwrap();
    assert_eq!(
        engine::set_material_by_name(world, body, "Slime")
            .unwrap_err()
            .to_string(),
        "material Slime does not exist",
    );
    assert_eq!(
        engine::set_material(world, body, 4096).unwrap_err(),
        Error::MaterialNotFound("4096".to_owned()),
    );
    engine::destroy_world(world).unwrap();
}

// =========================================================================
// Predefined polygon catalog
// =========================================================================

#[test]
fn test_polygon_catalog_through_handles() {
    let _guard = REGISTRY_GUARD.lock().unwrap_or_else(|p| p.into_inner());

    let triangle = [
        Vec2::new(-0.5, -0.5),
        Vec2::new(0.5, -0.5),
        Vec2::new(0.0, 0.5),
    ];
    let id = engine::register_polygon("wedge", &triangle).unwrap();
    assert!(engine::contains_polygon("wedge"));
    assert_eq!(engine::polygon("wedge").unwrap(), triangle);
    assert_eq!(engine::polygon_by_id(id).unwrap(), triangle);

    let world = engine::create_world();
    let body = engine::create_dynamic_body(world).unwrap();
    engine::set_predefined_polygon_shape(world, body, "wedge").unwrap();
    assert_eq!(
        engine::shape(world, body).unwrap(),
        rigid2d::Shape::Polygon {
            vertices: triangle.to_vec(),
        },
    );
    engine::destroy_world(world).unwrap();

    assert_eq!(
        engine::polygon("missing").unwrap_err().to_string(),
        "polygon missing does not exist",
    );

    engine::reset_polygons();
    assert!(!engine::contains_polygon("wedge"));
}

// =========================================================================
// Facade
// =========================================================================

#[test]
fn test_world_handle_releases_on_drop() {
    let id;
    {
        let world = WorldHandle::create();
        id = world.id();
        assert!(engine::world_exists(id));
    }
    assert!(!engine::world_exists(id));
}

#[test]
fn test_world_handle_release_is_idempotent() {
    let mut world = WorldHandle::create();
    let id = world.id();
    assert!(world.release());
    assert!(!world.release(), "second release must be a no-op");
    assert!(!engine::world_exists(id));
}

#[test]
fn test_body_handle_lifecycle() {
    let world = WorldHandle::create();
    let mut body = BodyHandle::new_dynamic(&world).unwrap();
    body.set_circle_shape(1.0).unwrap();
    body.set_position(2.0, 3.0).unwrap();
    body.set_velocity(1.0, 0.0).unwrap();
    body.set_material_by_name("Ice").unwrap();
    assert_eq!(body.position().unwrap(), Vec2::new(2.0, 3.0));
    assert_eq!(body.velocity().unwrap(), Vec2::new(1.0, 0.0));

    let id = body.id();
    assert!(engine::has_body(world.id(), id).unwrap());
    assert!(body.release());
    assert!(!body.release());
    assert!(!engine::has_body(world.id(), id).unwrap());
}

#[test]
fn test_body_handle_releases_on_drop() {
    let world = WorldHandle::create();
    let id;
    {
        let body = BodyHandle::new_static(&world).unwrap();
        id = body.id();
        assert!(engine::has_body(world.id(), id).unwrap());
    }
    assert!(!engine::has_body(world.id(), id).unwrap());
}

#[test]
fn test_facade_simulation_smoke() {
    let world = WorldHandle::create();
    world.set_iterations(4).unwrap();
    world.set_boundary(Some(Aabb::new(-100.0, -100.0, 100.0, 100.0))).unwrap();

    let ground = BodyHandle::new_static(&world).unwrap();
    ground.set_rectangle_shape(50.0, 2.0).unwrap();
    ground.set_position(0.0, -5.0).unwrap();

    let ball = BodyHandle::new_dynamic(&world).unwrap();
    ball.set_circle_shape(0.5).unwrap();
    ball.set_position(0.0, 0.0).unwrap();

    for _ in 0..180 {
        world.apply_gravity(0.0, -0.2).unwrap();
        world.tick(1.0 / 60.0).unwrap();
    }
    let y = ball.position().unwrap().y;
    assert!(y > -3.6 && y < -3.4, "ball should rest on the ground, y = {y}");
}

// =========================================================================
// Serialization through handles
// =========================================================================

#[test]
fn test_serialize_roundtrip_through_handles() {
    let world = engine::create_world();
    let a = engine::create_dynamic_body(world).unwrap();
    engine::set_circle_shape(world, a, 0.75).unwrap();
    engine::set_position(world, a, 1.25, -3.5).unwrap();
    engine::set_velocity(world, a, 0.5, 0.25).unwrap();
    let b = engine::create_static_body(world).unwrap();
    engine::set_rectangle_shape(world, b, 4.0, 2.0).unwrap();

    let text = engine::serialize_world(world).unwrap();

    let restored = engine::create_world();
    engine::deserialize_world(restored, &text).unwrap();
    assert_eq!(engine::serialize_world(restored).unwrap(), text);
    assert_eq!(engine::body_ids(restored).unwrap(), vec![a, b]);
    assert_eq!(
        engine::position(restored, a).unwrap(),
        Vec2::new(1.25, -3.5),
    );
    // Ids continue after the restored population.
    let next = engine::create_dynamic_body(restored).unwrap();
    assert_eq!(next, b + 1);

    engine::destroy_world(world).unwrap();
    engine::destroy_world(restored).unwrap();
}
