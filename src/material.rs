//! Named surface materials and the rules for combining them at a contact.

use std::collections::HashMap;

use crate::error::{Error, Result};

pub type MaterialId = u32;

/// How the friction coefficients of two touching materials merge.
///
/// The first body's mode wins. Restitution always combines as the minimum of
/// both materials, independent of this mode.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CombineMode {
    Average,
    Minimum,
    Maximum,
    Multiply,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Material {
    pub id: MaterialId,
    pub name: String,
    pub density: f64,
    pub restitution: f64,
    pub static_friction: f64,
    pub dynamic_friction: f64,
    pub combine: CombineMode,
    pub linear_drag: f64,
    pub angular_drag: f64,
}

impl Material {
    /// Combined restitution of a contact: the minimum of both materials.
    #[inline]
    pub fn combined_restitution(&self, other: &Material) -> f64 {
        self.restitution.min(other.restitution)
    }

    /// Combined `(static, dynamic)` friction under `self`'s combine mode.
    pub fn combined_friction(&self, other: &Material) -> (f64, f64) {
        let (s1, d1) = (self.static_friction, self.dynamic_friction);
        let (s2, d2) = (other.static_friction, other.dynamic_friction);
        match self.combine {
            CombineMode::Average => ((s1 + s2) * 0.5, (d1 + d2) * 0.5),
            CombineMode::Minimum => (s1.min(s2), d1.min(d2)),
            CombineMode::Maximum => (s1.max(s2), d1.max(d2)),
            CombineMode::Multiply => (s1 * s2, d1 * d2),
        }
    }
}

/// Builtin materials seeded on construction and on every [`MaterialRegistry::reset`].
///
/// Fields: name, density, restitution, static friction, dynamic friction,
/// linear drag, angular drag. All builtins use `CombineMode::Average`.
const BUILTINS: [(&str, f64, f64, f64, f64, f64, f64); 8] = [
    ("Glass", 2.5, 0.1, 0.3, 0.25, 0.06, 0.02),
    ("Ice", 0.9, 0.05, 0.05, 0.01, 0.03, 0.01),
    ("Lead", 11.3, 0.05, 0.3, 0.28, 0.03, 0.05),
    ("Plastic", 1.2, 0.4, 0.4, 0.35, 0.12, 0.06),
    ("Rubber", 1.1, 0.8, 0.9, 0.75, 0.3, 0.2),
    ("Steel", 7.8, 0.03, 0.35, 0.30, 0.06, 0.03),
    ("Stone", 2.4, 0.1, 0.45, 0.40, 0.15, 0.04),
    ("Wood", 0.6, 0.3, 0.5, 0.45, 0.25, 0.08),
];

/// Append-only material table keyed by id and by name.
///
/// Ids are assigned in registration order starting at 1, so the builtins
/// always occupy 1..=8. `reset` drops user entries and re-seeds.
#[derive(Debug)]
pub struct MaterialRegistry {
    items: Vec<Material>,
    by_name: HashMap<String, MaterialId>,
    default_id: MaterialId,
}

impl Default for MaterialRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MaterialRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            items: Vec::new(),
            by_name: HashMap::new(),
            default_id: 0,
        };
        registry.reset();
        registry
    }

    /// Clear every entry and re-seed the builtins; default becomes "Wood".
    pub fn reset(&mut self) {
        self.items.clear();
        self.by_name.clear();
        for (name, density, restitution, s_fric, d_fric, lin_drag, ang_drag) in BUILTINS {
            self.register(
                name,
                density,
                restitution,
                s_fric,
                d_fric,
                CombineMode::Average,
                lin_drag,
                ang_drag,
            )
            .expect("builtin material parameters are valid");
        }
        self.default_id = self.by_name["Wood"];
    }

    #[allow(clippy::too_many_arguments)]
    pub fn register(
        &mut self,
        name: &str,
        density: f64,
        restitution: f64,
        static_friction: f64,
        dynamic_friction: f64,
        combine: CombineMode,
        linear_drag: f64,
        angular_drag: f64,
    ) -> Result<MaterialId> {
        if name.is_empty() {
            return Err(Error::bad_argument(1, "name", "empty material name"));
        }
        if self.by_name.contains_key(name) {
            return Err(Error::bad_argument(
                1,
                "name",
                format!("material '{name}' already registered"),
            ));
        }
        if !(density.is_finite() && density > 0.0) {
            return Err(Error::bad_argument(2, "density", "must be greater than 0"));
        }
        check_unit_range(3, "restitution", restitution)?;
        check_unit_range(4, "staticFriction", static_friction)?;
        check_unit_range(5, "dynamicFriction", dynamic_friction)?;
        if !(linear_drag.is_finite() && linear_drag >= 0.0) {
            return Err(Error::bad_argument(7, "linearDrag", "must be at least 0"));
        }
        if !(angular_drag.is_finite() && angular_drag >= 0.0) {
            return Err(Error::bad_argument(8, "angularDrag", "must be at least 0"));
        }

        let id = self.items.len() as MaterialId + 1;
        self.items.push(Material {
            id,
            name: name.to_owned(),
            density,
            restitution,
            static_friction,
            dynamic_friction,
            combine,
            linear_drag,
            angular_drag,
        });
        self.by_name.insert(name.to_owned(), id);
        Ok(id)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn get(&self, id: MaterialId) -> Result<&Material> {
        if id == 0 {
            return Err(Error::MaterialNotFound(id.to_string()));
        }
        self.items
            .get(id as usize - 1)
            .ok_or_else(|| Error::MaterialNotFound(id.to_string()))
    }

    pub fn get_by_name(&self, name: &str) -> Result<&Material> {
        let id = self
            .by_name
            .get(name)
            .ok_or_else(|| Error::MaterialNotFound(name.to_owned()))?;
        self.get(*id)
    }

    /// Material parameters for `id`, or the default material's when the id is
    /// stale. The simulation never fails mid-tick over a dangling material.
    pub fn resolve(&self, id: MaterialId) -> &Material {
        self.get(id).unwrap_or_else(|_| {
            &self.items[self.default_id as usize - 1]
        })
    }

    /// Entries in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Material> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn default_id(&self) -> MaterialId {
        self.default_id
    }

    pub fn set_default(&mut self, name: &str) -> Result<()> {
        let id = *self
            .by_name
            .get(name)
            .ok_or_else(|| Error::MaterialNotFound(name.to_owned()))?;
        self.default_id = id;
        Ok(())
    }
}

fn check_unit_range(index: usize, name: &'static str, value: f64) -> Result<()> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(Error::bad_argument(index, name, "must be in [0, 1]"))
    }
}
