//! Wire-format tests: the canonical brace-literal codec and snapshot
//! restore semantics.

use rigid2d::{BodyType, MaterialRegistry, Shape, Vec2, World, WorldSnapshot};

fn wood_id(registry: &MaterialRegistry) -> u32 {
    registry.get_by_name("Wood").unwrap().id
}

#[test]
fn test_empty_world_encodes_to_stable_literal() {
    let world = World::new(1);
    let snapshot = WorldSnapshot::take(&world);
    assert_eq!(snapshot.to_text(), "{0,{}}");
}

#[test]
fn test_record_layout_is_stable() {
    let registry = MaterialRegistry::new();
    let mut world = World::new(1);
    let id = world.create_body(BodyType::Dynamic, wood_id(&registry));
    assert_eq!(id, 1);
    let text = WorldSnapshot::take(&world).to_text();
    // id, type, px, py, vx, vy, rotation, angular velocity, material,
    // shape tag, shape data.
    assert_eq!(text, "{1,{{1,2,0,0,0,0,0,0,8,0,0}}}");
}

#[test]
fn test_every_shape_encoding() {
    let registry = MaterialRegistry::new();
    let mut world = World::new(1);

    let circle = world.create_body(BodyType::Dynamic, wood_id(&registry));
    {
        let body = world.body_mut(circle).unwrap();
        body.set_shape(Shape::Circle { radius: 0.5 });
        body.set_position(Vec2::new(1.25, -3.5));
        body.set_velocity(Vec2::new(0.5, 0.25));
        body.set_rotation(0.75);
        body.set_angular_velocity(-0.125);
    }
    let rect = world.create_body(BodyType::Static, wood_id(&registry));
    world.body_mut(rect).unwrap().set_shape(Shape::Rectangle {
        width: 4.0,
        height: 2.0,
    });
    let poly = world.create_body(BodyType::Kinematic, wood_id(&registry));
    world.body_mut(poly).unwrap().set_shape(Shape::Polygon {
        vertices: vec![
            Vec2::new(-0.5, -0.5),
            Vec2::new(0.5, -0.5),
            Vec2::new(0.0, 0.5),
        ],
    });

    let text = WorldSnapshot::take(&world).to_text();
    assert_eq!(
        text,
        concat!(
            "{3,{",
            "{1,2,1.25,-3.5,0.5,0.25,0.75,-0.125,8,1,0.5},",
            "{2,0,0,0,0,0,0,0,8,2,{4,2}},",
            "{3,1,0,0,0,0,0,0,8,3,{{-0.5,-0.5},{0.5,-0.5},{0,0.5}}}",
            "}}",
        ),
    );
}

#[test]
fn test_roundtrip_is_byte_identical() {
    let registry = MaterialRegistry::new();
    let mut world = World::new(1);
    for i in 0..4 {
        let id = world.create_body(BodyType::Dynamic, wood_id(&registry));
        let body = world.body_mut(id).unwrap();
        body.set_shape(Shape::Circle {
            radius: 0.1 + i as f64 / 3.0,
        });
        body.set_position(Vec2::new(i as f64 * 1.7, -(i as f64) / 7.0));
        body.set_velocity(Vec2::new(0.123456789, 3e-7));
    }
    // Exercise the simulation so state holds arbitrary floats.
    world.apply_gravity(Vec2::new(0.01, -0.33));
    world.tick(1.0 / 60.0, &registry);

    let text = WorldSnapshot::take(&world).to_text();
    let parsed = WorldSnapshot::from_text(&text).unwrap();
    assert_eq!(parsed.to_text(), text);

    let mut restored = World::new(2);
    parsed.restore_into(&mut restored);
    assert_eq!(WorldSnapshot::take(&restored).to_text(), text);
}

#[test]
fn test_restore_replaces_population_and_latest_id() {
    let registry = MaterialRegistry::new();
    let mut source = World::new(1);
    let a = source.create_body(BodyType::Dynamic, wood_id(&registry));
    source.body_mut(a).unwrap().set_shape(Shape::Circle { radius: 1.0 });
    let snapshot = WorldSnapshot::take(&source);

    let mut target = World::new(2);
    for _ in 0..5 {
        target.create_body(BodyType::Static, wood_id(&registry));
    }
    snapshot.restore_into(&mut target);

    assert_eq!(target.body_ids(), &[a]);
    assert_eq!(
        target.body(a).unwrap().shape(),
        &Shape::Circle { radius: 1.0 },
    );
    // Fresh ids continue from the snapshot's latest id, not the old world's.
    assert_eq!(target.create_body(BodyType::Dynamic, wood_id(&registry)), a + 1);
}

#[test]
fn test_from_text_accepts_whitespace() {
    let parsed = WorldSnapshot::from_text(" { 1 , { { 1 , 2 , 0 , 0 , 0 , 0 , 0 , 0 , 8 , 1 , 2.5 } } } ").unwrap();
    assert_eq!(parsed.latest_body_id, 1);
    assert_eq!(parsed.bodies.len(), 1);
    assert_eq!(parsed.bodies[0].shape, Shape::Circle { radius: 2.5 });
    assert_eq!(parsed.bodies[0].body_type, BodyType::Dynamic);
}

#[test]
fn test_from_text_rejects_malformed_input() {
    let cases = [
        "",
        "{",
        "{1,{}",
        "{1,{}}}",
        "{1}",
        "{x,{}}",
        "{1,{{1,2,0,0}}}",
        "{1,{{1,7,0,0,0,0,0,0,8,0,0}}}",
        "{1,{{1,2,0,0,0,0,0,0,8,9,0}}}",
        "{1,{{1,2,0,0,0,0,0,0,8,2,0}}}",
        "{1,{{1,2,0,0,0,0,0,0,8,3,{{1},{2},{3}}}}}",
        "{1.5,{}}",
        "{-1,{}}",
    ];
    for case in cases {
        assert!(
            WorldSnapshot::from_text(case).is_err(),
            "expected parse failure for {case:?}",
        );
    }
}

#[test]
fn test_parse_error_is_domain_validation() {
    let err = WorldSnapshot::from_text("{x,{}}").unwrap_err();
    let message = err.to_string();
    assert!(
        message.starts_with("bad argument to #1 'data':"),
        "unexpected message {message:?}",
    );
}

#[cfg(feature = "serde")]
mod serde_support {
    use super::*;

    #[test]
    fn test_snapshot_serializes_through_serde() {
        let registry = MaterialRegistry::new();
        let mut world = World::new(1);
        let id = world.create_body(BodyType::Dynamic, wood_id(&registry));
        world.body_mut(id).unwrap().set_shape(Shape::Rectangle {
            width: 2.0,
            height: 1.0,
        });

        let snapshot = WorldSnapshot::take(&world);
        let json = serde_json::to_string(&snapshot).unwrap();
        let back: WorldSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, snapshot);
        assert_eq!(back.to_text(), snapshot.to_text());
    }
}
