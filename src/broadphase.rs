//! Pluggable broadphase index.
//!
//! The world's default candidate enumeration is a plain O(n^2) AABB sweep;
//! installing an index replaces that enumeration, nothing else. The
//! narrowphase re-validates every candidate pair, so an index only has to be
//! conservative, never exact.

use std::collections::HashMap;

use crate::body::BodyId;
use crate::math::Aabb;

/// Contract for a spatial index over body AABBs.
///
/// `query_overlaps` must return handles in ascending order so candidate pair
/// enumeration stays deterministic regardless of the index internals.
pub trait BroadphaseIndex {
    /// Insert `id` or move it to a new extent.
    fn update(&mut self, id: BodyId, aabb: Aabb);

    fn remove(&mut self, id: BodyId);

    /// Handles whose stored AABB strictly overlaps `aabb`, ascending.
    fn query_overlaps(&self, aabb: &Aabb) -> Vec<BodyId>;
}

/// Uniform grid index: each body is filed under every cell its AABB touches.
pub struct SpatialHash {
    inv_cell_size: f64,
    cells: HashMap<(i32, i32), Vec<BodyId>>,
    extents: HashMap<BodyId, Aabb>,
}

impl SpatialHash {
    pub fn new(cell_size: f64) -> Self {
        let cell_size = if cell_size > 0.0 { cell_size } else { 64.0 };
        Self {
            inv_cell_size: 1.0 / cell_size,
            cells: HashMap::new(),
            extents: HashMap::new(),
        }
    }

    fn cell_range(&self, aabb: &Aabb) -> (i32, i32, i32, i32) {
        (
            (aabb.min_x * self.inv_cell_size).floor() as i32,
            (aabb.min_y * self.inv_cell_size).floor() as i32,
            (aabb.max_x * self.inv_cell_size).floor() as i32,
            (aabb.max_y * self.inv_cell_size).floor() as i32,
        )
    }

    fn file_into_cells(&mut self, id: BodyId, aabb: &Aabb) {
        let (x0, y0, x1, y1) = self.cell_range(aabb);
        for cx in x0..=x1 {
            for cy in y0..=y1 {
                self.cells.entry((cx, cy)).or_default().push(id);
            }
        }
    }

    fn drop_from_cells(&mut self, id: BodyId, aabb: &Aabb) {
        let (x0, y0, x1, y1) = self.cell_range(aabb);
        for cx in x0..=x1 {
            for cy in y0..=y1 {
                let emptied = match self.cells.get_mut(&(cx, cy)) {
                    Some(ids) => {
                        ids.retain(|&other| other != id);
                        ids.is_empty()
                    }
                    None => false,
                };
                if emptied {
                    self.cells.remove(&(cx, cy));
                }
            }
        }
    }
}

impl BroadphaseIndex for SpatialHash {
    fn update(&mut self, id: BodyId, aabb: Aabb) {
        if let Some(old) = self.extents.insert(id, aabb) {
            self.drop_from_cells(id, &old);
        }
        self.file_into_cells(id, &aabb);
    }

    fn remove(&mut self, id: BodyId) {
        if let Some(old) = self.extents.remove(&id) {
            self.drop_from_cells(id, &old);
        }
    }

    fn query_overlaps(&self, aabb: &Aabb) -> Vec<BodyId> {
        let (x0, y0, x1, y1) = self.cell_range(aabb);
        let mut hits = Vec::new();
        for cx in x0..=x1 {
            for cy in y0..=y1 {
                if let Some(ids) = self.cells.get(&(cx, cy)) {
                    hits.extend_from_slice(ids);
                }
            }
        }
        hits.sort_unstable();
        hits.dedup();
        hits.retain(|id| {
            self.extents
                .get(id)
                .is_some_and(|extent| extent.overlaps(aabb))
        });
        hits
    }
}
