//! Snapshots of a world's body population and the canonical text codec.
//!
//! The wire format is a nested list literal of numbers: braces group, commas
//! separate, nothing else. A serialized world is
//! `{latestBodyId,{record,...}}` and a record is
//! `{id,type,px,py,vx,vy,rotation,angularVelocity,material,shapeTag,shapeData}`
//! with body type 0/1/2 for static/kinematic/dynamic and shape tag 0/1/2/3
//! for none/circle/rectangle/polygon. Floats print in Rust's shortest
//! round-trip form, so encode -> decode -> encode is byte-identical.

use std::fmt::Write as _;

use crate::body::{Body, BodyId, BodyType};
use crate::error::{Error, Result};
use crate::material::MaterialId;
use crate::math::Vec2;
use crate::shape::Shape;
use crate::world::World;

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BodyRecord {
    pub id: BodyId,
    pub body_type: BodyType,
    pub px: f64,
    pub py: f64,
    pub vx: f64,
    pub vy: f64,
    pub rotation: f64,
    pub angular_velocity: f64,
    pub material: MaterialId,
    pub shape: Shape,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WorldSnapshot {
    pub latest_body_id: BodyId,
    pub bodies: Vec<BodyRecord>,
}

impl WorldSnapshot {
    /// Capture every body in insertion order.
    pub fn take(world: &World) -> Self {
        let bodies = world
            .body_ids()
            .iter()
            .filter_map(|&id| world.body(id).ok())
            .map(|body| BodyRecord {
                id: body.id(),
                body_type: body.body_type(),
                px: body.position().x,
                py: body.position().y,
                vx: body.velocity().x,
                vy: body.velocity().y,
                rotation: body.rotation(),
                angular_velocity: body.angular_velocity(),
                material: body.material(),
                shape: body.shape().clone(),
            })
            .collect();
        Self {
            latest_body_id: world.latest_body_id(),
            bodies,
        }
    }

    /// Replace `world`'s body population with this snapshot's.
    pub fn restore_into(&self, world: &mut World) {
        world.clear_bodies();
        let mut latest = self.latest_body_id;
        for record in &self.bodies {
            latest = latest.max(record.id);
            let mut body = Body::new(record.id, record.body_type, record.material);
            body.set_position(Vec2::new(record.px, record.py));
            body.set_velocity(Vec2::new(record.vx, record.vy));
            body.set_rotation(record.rotation);
            body.set_angular_velocity(record.angular_velocity);
            body.set_shape(record.shape.clone());
            world.restore_body(body);
        }
        world.force_latest_body_id(latest);
    }

    pub fn to_text(&self) -> String {
        let mut out = String::new();
        out.push('{');
        let _ = write!(out, "{}", self.latest_body_id);
        out.push_str(",{");
        for (i, record) in self.bodies.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            write_record(&mut out, record);
        }
        out.push_str("}}");
        out
    }

    pub fn from_text(text: &str) -> Result<Self> {
        let root = parse_root(text)?;
        let items = expect_list(&root, "a serialized world")?;
        if items.len() != 2 {
            return Err(malformed("a serialized world has 2 fields"));
        }
        let latest_body_id = expect_u32(&items[0], "latestBodyId")?;
        let records = expect_list(&items[1], "the body list")?;
        let mut bodies = Vec::with_capacity(records.len());
        for record in records {
            bodies.push(decode_record(record)?);
        }
        Ok(Self {
            latest_body_id,
            bodies,
        })
    }
}

fn write_record(out: &mut String, record: &BodyRecord) {
    let type_tag = match record.body_type {
        BodyType::Static => 0,
        BodyType::Kinematic => 1,
        BodyType::Dynamic => 2,
    };
    let _ = write!(
        out,
        "{{{},{},{},{},{},{},{},{},{},",
        record.id,
        type_tag,
        record.px,
        record.py,
        record.vx,
        record.vy,
        record.rotation,
        record.angular_velocity,
        record.material,
    );
    match &record.shape {
        Shape::None => out.push_str("0,0"),
        Shape::Circle { radius } => {
            let _ = write!(out, "1,{radius}");
        }
        Shape::Rectangle { width, height } => {
            let _ = write!(out, "2,{{{width},{height}}}");
        }
        Shape::Polygon { vertices } => {
            out.push_str("3,{");
            for (i, v) in vertices.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                let _ = write!(out, "{{{},{}}}", v.x, v.y);
            }
            out.push('}');
        }
    }
    out.push('}');
}

fn decode_record(node: &Node) -> Result<BodyRecord> {
    let fields = expect_list(node, "a body record")?;
    if fields.len() != 11 {
        return Err(malformed("a body record has 11 fields"));
    }
    let body_type = match expect_u32(&fields[1], "body type")? {
        0 => BodyType::Static,
        1 => BodyType::Kinematic,
        2 => BodyType::Dynamic,
        _ => return Err(malformed("body type must be 0, 1 or 2")),
    };
    let shape = decode_shape(&fields[9], &fields[10])?;
    Ok(BodyRecord {
        id: expect_u32(&fields[0], "body id")?,
        body_type,
        px: expect_num(&fields[2], "px")?,
        py: expect_num(&fields[3], "py")?,
        vx: expect_num(&fields[4], "vx")?,
        vy: expect_num(&fields[5], "vy")?,
        rotation: expect_num(&fields[6], "rotation")?,
        angular_velocity: expect_num(&fields[7], "angularVelocity")?,
        material: expect_u32(&fields[8], "material")?,
        shape,
    })
}

fn decode_shape(tag: &Node, data: &Node) -> Result<Shape> {
    match expect_u32(tag, "shape tag")? {
        0 => Ok(Shape::None),
        1 => Ok(Shape::Circle {
            radius: expect_num(data, "radius")?,
        }),
        2 => {
            let dims = expect_list(data, "rectangle dimensions")?;
            if dims.len() != 2 {
                return Err(malformed("rectangle data has 2 fields"));
            }
            Ok(Shape::Rectangle {
                width: expect_num(&dims[0], "width")?,
                height: expect_num(&dims[1], "height")?,
            })
        }
        3 => {
            let points = expect_list(data, "polygon vertices")?;
            let mut vertices = Vec::with_capacity(points.len());
            for point in points {
                let pair = expect_list(point, "a vertex")?;
                if pair.len() != 2 {
                    return Err(malformed("a vertex has 2 fields"));
                }
                vertices.push(Vec2::new(
                    expect_num(&pair[0], "x")?,
                    expect_num(&pair[1], "y")?,
                ));
            }
            Ok(Shape::Polygon { vertices })
        }
        _ => Err(malformed("shape tag must be 0, 1, 2 or 3")),
    }
}

// -------------------------------------------------------------------------
// Nested list reader
// -------------------------------------------------------------------------

#[derive(Debug)]
enum Node {
    Num(f64),
    List(Vec<Node>),
}

fn malformed(reason: impl Into<String>) -> Error {
    Error::bad_argument(1, "data", reason)
}

fn expect_num(node: &Node, what: &str) -> Result<f64> {
    match node {
        Node::Num(value) => Ok(*value),
        Node::List(_) => Err(malformed(format!("{what} must be a number"))),
    }
}

fn expect_u32(node: &Node, what: &str) -> Result<u32> {
    let value = expect_num(node, what)?;
    if value.fract() == 0.0 && (0.0..=f64::from(u32::MAX)).contains(&value) {
        Ok(value as u32)
    } else {
        Err(malformed(format!("{what} must be a non-negative integer")))
    }
}

fn expect_list<'a>(node: &'a Node, what: &str) -> Result<&'a [Node]> {
    match node {
        Node::List(items) => Ok(items),
        Node::Num(_) => Err(malformed(format!("{what} must be a list"))),
    }
}

fn parse_root(text: &str) -> Result<Node> {
    let mut reader = Reader {
        bytes: text.as_bytes(),
        pos: 0,
    };
    let node = reader.parse_node()?;
    reader.skip_whitespace();
    if reader.pos != reader.bytes.len() {
        return Err(malformed("trailing characters after value"));
    }
    Ok(node)
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl Reader<'_> {
    fn skip_whitespace(&mut self) {
        while self
            .bytes
            .get(self.pos)
            .is_some_and(|b| b.is_ascii_whitespace())
        {
            self.pos += 1;
        }
    }

    fn parse_node(&mut self) -> Result<Node> {
        self.skip_whitespace();
        match self.bytes.get(self.pos) {
            Some(b'{') => self.parse_list(),
            Some(_) => self.parse_number(),
            None => Err(malformed("unexpected end of input")),
        }
    }

    fn parse_list(&mut self) -> Result<Node> {
        self.pos += 1;
        let mut items = Vec::new();
        self.skip_whitespace();
        if self.bytes.get(self.pos) == Some(&b'}') {
            self.pos += 1;
            return Ok(Node::List(items));
        }
        loop {
            items.push(self.parse_node()?);
            self.skip_whitespace();
            match self.bytes.get(self.pos) {
                Some(b',') => self.pos += 1,
                Some(b'}') => {
                    self.pos += 1;
                    return Ok(Node::List(items));
                }
                Some(_) => return Err(malformed("expected ',' or '}'")),
                None => return Err(malformed("unexpected end of input")),
            }
        }
    }

    fn parse_number(&mut self) -> Result<Node> {
        let start = self.pos;
        while self
            .bytes
            .get(self.pos)
            .is_some_and(|&b| b != b',' && b != b'}' && b != b'{' && !b.is_ascii_whitespace())
        {
            self.pos += 1;
        }
        let span = std::str::from_utf8(&self.bytes[start..self.pos])
            .map_err(|_| malformed("invalid encoding"))?;
        span.parse::<f64>()
            .map(Node::Num)
            .map_err(|_| malformed(format!("'{span}' is not a number")))
    }
}
