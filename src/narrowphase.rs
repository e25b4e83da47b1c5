//! Shape-pair intersection tests and contact manifold extraction.
//!
//! Convex-convex tests use the separating axis theorem. Intersection normals
//! always point from the first body toward the second, so the solver never
//! needs to care which shape ended up on which side of the dispatch.

use smallvec::SmallVec;

use crate::body::Body;
use crate::math::{Vec2, closest_point_on_segment};
use crate::shape::Shape;

/// Squared-distance band within which two candidate projections count as the
/// same contact depth.
const CONTACT_MERGE_TOLERANCE: f64 = 1e-6;

/// Result of a narrowphase test: the minimum translation to separate the
/// shapes. `normal` points from body 1 toward body 2.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Intersection {
    pub normal: Vec2,
    pub depth: f64,
}

/// Dispatch the pairwise intersection test on the two bodies' shapes.
///
/// Transforms are refreshed as needed. Bodies with `Shape::None` never
/// intersect anything.
pub fn intersect(a: &mut Body, b: &mut Body) -> Option<Intersection> {
    a.refresh_transform();
    b.refresh_transform();
    match (a.shape(), b.shape()) {
        (Shape::None, _) | (_, Shape::None) => None,
        (&Shape::Circle { radius: r1 }, &Shape::Circle { radius: r2 }) => {
            circle_circle(a.position(), r1, b.position(), r2)
        }
        (&Shape::Circle { radius }, _) => {
            // The polygon routine reports polygon -> circle; here the circle
            // is body 1, so flip to keep the 1 -> 2 convention.
            polygon_circle(b.cached_vertices(), b.position(), a.position(), radius)
                .map(|hit| Intersection {
                    normal: -hit.normal,
                    depth: hit.depth,
                })
        }
        (_, &Shape::Circle { radius }) => {
            polygon_circle(a.cached_vertices(), a.position(), b.position(), radius)
        }
        _ => polygon_polygon(
            a.cached_vertices(),
            a.position(),
            b.cached_vertices(),
            b.position(),
        ),
    }
}

pub fn circle_circle(c1: Vec2, r1: f64, c2: Vec2, r2: f64) -> Option<Intersection> {
    let distance = c1.distance(c2);
    let radii = r1 + r2;
    if distance >= radii {
        return None;
    }
    Some(Intersection {
        normal: (c2 - c1).normalized(),
        depth: radii - distance,
    })
}

/// SAT over both polygons' edge normals. Returns the axis of minimum overlap,
/// flipped so it points from the first polygon's reference point toward the
/// second's.
pub fn polygon_polygon(
    verts_a: &[Vec2],
    center_a: Vec2,
    verts_b: &[Vec2],
    center_b: Vec2,
) -> Option<Intersection> {
    if verts_a.len() < 3 || verts_b.len() < 3 {
        return None;
    }

    let mut depth = f64::MAX;
    let mut normal = Vec2::ZERO;

    for verts in [verts_a, verts_b] {
        for i in 0..verts.len() {
            let Some(axis) = edge_axis(verts, i) else {
                continue;
            };
            let (min_a, max_a) = project(verts_a, axis);
            let (min_b, max_b) = project(verts_b, axis);
            let overlap = max_a.min(max_b) - min_a.max(min_b);
            if overlap <= 0.0 {
                return None;
            }
            if overlap < depth {
                depth = overlap;
                normal = axis;
            }
        }
    }

    if (center_b - center_a).dot(normal) < 0.0 {
        normal = -normal;
    }
    Some(Intersection { normal, depth })
}

/// SAT for a polygon against a circle: every polygon edge axis plus the axis
/// from the polygon vertex nearest the circle center, which covers the corner
/// regions an edge sweep misses. The returned normal points polygon -> circle.
pub fn polygon_circle(
    verts: &[Vec2],
    poly_center: Vec2,
    circle_center: Vec2,
    radius: f64,
) -> Option<Intersection> {
    if verts.len() < 3 {
        return None;
    }

    let mut depth = f64::MAX;
    let mut normal = Vec2::ZERO;

    for i in 0..verts.len() {
        let Some(axis) = edge_axis(verts, i) else {
            continue;
        };
        if !test_circle_axis(verts, circle_center, radius, axis, &mut depth, &mut normal) {
            return None;
        }
    }

    let closest = verts
        .iter()
        .copied()
        .min_by(|p, q| {
            p.distance_squared(circle_center)
                .total_cmp(&q.distance_squared(circle_center))
        })
        .unwrap_or(circle_center);
    let corner_axis = (closest - circle_center).normalized();
    if !test_circle_axis(verts, circle_center, radius, corner_axis, &mut depth, &mut normal) {
        return None;
    }

    if (circle_center - poly_center).dot(normal) < 0.0 {
        normal = -normal;
    }
    Some(Intersection { normal, depth })
}

/// Project both shapes onto `axis` and fold the overlap into the running
/// minimum. Returns false when the axis separates them.
fn test_circle_axis(
    verts: &[Vec2],
    circle_center: Vec2,
    radius: f64,
    axis: Vec2,
    depth: &mut f64,
    normal: &mut Vec2,
) -> bool {
    let (min_p, max_p) = project(verts, axis);
    let center = circle_center.dot(axis);
    let (min_c, max_c) = (center - radius, center + radius);
    let overlap = max_p.min(max_c) - min_p.max(min_c);
    if overlap <= 0.0 {
        return false;
    }
    if overlap < *depth {
        *depth = overlap;
        *normal = axis;
    }
    true
}

/// Outward normal of edge `i` for a counter-clockwise vertex loop, or `None`
/// for a degenerate edge.
fn edge_axis(verts: &[Vec2], i: usize) -> Option<Vec2> {
    let edge = verts[(i + 1) % verts.len()] - verts[i];
    let len_sq = edge.length_squared();
    if len_sq < 1e-12 {
        return None;
    }
    Some(Vec2::new(edge.y, -edge.x) / len_sq.sqrt())
}

fn project(verts: &[Vec2], axis: Vec2) -> (f64, f64) {
    let mut min = f64::MAX;
    let mut max = f64::MIN;
    for v in verts {
        let p = v.dot(axis);
        min = min.min(p);
        max = max.max(p);
    }
    (min, max)
}

/// World-space contact points shared by two intersecting bodies: one point
/// for anything involving a circle, one or two for polygon-polygon.
pub fn contact_points(a: &mut Body, b: &mut Body) -> SmallVec<[Vec2; 2]> {
    a.refresh_transform();
    b.refresh_transform();
    let mut contacts = SmallVec::new();
    match (a.shape(), b.shape()) {
        (Shape::None, _) | (_, Shape::None) => {}
        (&Shape::Circle { radius }, Shape::Circle { .. }) => {
            let direction = (b.position() - a.position()).normalized();
            contacts.push(a.position() + direction * radius);
        }
        (Shape::Circle { .. }, _) => {
            contacts.push(closest_point_on_hull(b.cached_vertices(), a.position()));
        }
        (_, Shape::Circle { .. }) => {
            contacts.push(closest_point_on_hull(a.cached_vertices(), b.position()));
        }
        _ => {
            polygon_contacts(a.cached_vertices(), b.cached_vertices(), &mut contacts);
        }
    }
    contacts
}

/// Closest point on the boundary of a vertex loop to `p`.
fn closest_point_on_hull(verts: &[Vec2], p: Vec2) -> Vec2 {
    let mut best = p;
    let mut best_sq = f64::MAX;
    for i in 0..verts.len() {
        let (candidate, dist_sq) =
            closest_point_on_segment(p, verts[i], verts[(i + 1) % verts.len()]);
        if dist_sq < best_sq {
            best_sq = dist_sq;
            best = candidate;
        }
    }
    best
}

/// Project every vertex of each polygon onto every edge of the other,
/// tracking the closest projection. A second projection in the same depth
/// band that lands on a distinct point becomes the second contact, which is
/// what keeps edge-on-edge stacks from torquing around a single point.
fn polygon_contacts(verts_a: &[Vec2], verts_b: &[Vec2], contacts: &mut SmallVec<[Vec2; 2]>) {
    let mut min_sq = f64::MAX;
    let mut first = Vec2::ZERO;
    let mut second: Option<Vec2> = None;

    let mut scan = |points: &[Vec2], hull: &[Vec2]| {
        for &p in points {
            for i in 0..hull.len() {
                let (candidate, dist_sq) =
                    closest_point_on_segment(p, hull[i], hull[(i + 1) % hull.len()]);
                if (dist_sq - min_sq).abs() < CONTACT_MERGE_TOLERANCE {
                    if candidate.distance_squared(first) > CONTACT_MERGE_TOLERANCE {
                        second = Some(candidate);
                    }
                } else if dist_sq < min_sq {
                    min_sq = dist_sq;
                    first = candidate;
                    second = None;
                }
            }
        }
    };
    scan(verts_a, verts_b);
    scan(verts_b, verts_a);

    if min_sq < f64::MAX {
        contacts.push(first);
        if let Some(point) = second {
            contacts.push(point);
        }
    }
}
