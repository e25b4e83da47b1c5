//! Collision shape variants and the predefined polygon catalog.

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::math::Vec2;

pub type PolygonId = u32;

/// The collision geometry attached to a body.
///
/// Polygon vertices are body-local, convex, and wound counter-clockwise.
/// A freshly created body carries `Shape::None` and never collides.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Shape {
    #[default]
    None,
    Circle {
        radius: f64,
    },
    Rectangle {
        width: f64,
        height: f64,
    },
    Polygon {
        vertices: Vec<Vec2>,
    },
}

impl Shape {
    /// Whether the shape has a polygonal boundary (rectangles included).
    pub fn has_vertices(&self) -> bool {
        matches!(self, Shape::Rectangle { .. } | Shape::Polygon { .. })
    }
}

/// Named polygon templates, registered once and stamped onto bodies by id or
/// name. Vertex lists are deep-copied on registration.
#[derive(Debug, Default)]
pub struct PolygonCatalog {
    items: Vec<(String, Vec<Vec2>)>,
    by_name: HashMap<String, PolygonId>,
}

impl PolygonCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: &str, vertices: &[Vec2]) -> Result<PolygonId> {
        if name.is_empty() {
            return Err(Error::bad_argument(1, "name", "empty polygon name"));
        }
        if self.by_name.contains_key(name) {
            return Err(Error::bad_argument(
                1,
                "name",
                format!("polygon '{name}' already registered"),
            ));
        }
        if vertices.len() < 3 {
            return Err(Error::bad_argument(
                2,
                "vertices",
                "polygon needs at least 3 vertices",
            ));
        }
        let id = self.items.len() as PolygonId + 1;
        self.items.push((name.to_owned(), vertices.to_vec()));
        self.by_name.insert(name.to_owned(), id);
        Ok(id)
    }

    pub fn get(&self, id: PolygonId) -> Result<&[Vec2]> {
        if id == 0 {
            return Err(Error::PolygonNotFound(id.to_string()));
        }
        self.items
            .get(id as usize - 1)
            .map(|(_, vertices)| vertices.as_slice())
            .ok_or_else(|| Error::PolygonNotFound(id.to_string()))
    }

    pub fn get_by_name(&self, name: &str) -> Result<&[Vec2]> {
        let id = self
            .by_name
            .get(name)
            .ok_or_else(|| Error::PolygonNotFound(name.to_owned()))?;
        self.get(*id)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn reset(&mut self) {
        self.items.clear();
        self.by_name.clear();
    }
}
