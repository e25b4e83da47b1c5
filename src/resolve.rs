//! Contact resolution: position correction followed by sequential velocity
//! impulses with Coulomb friction.
//!
//! Every function here assumes both bodies' derived caches are fresh (the
//! world prepares them each substep; call [`Body::prepare`] when driving the
//! solver by hand). Normals point from the first body toward the second.

use smallvec::SmallVec;

use crate::body::{Body, BodyType};
use crate::material::Material;
use crate::math::Vec2;

/// Tangential relative speeds below this are treated as no sliding.
const TANGENT_EPSILON_SQ: f64 = 1e-12;

/// How penetration is split between two non-static bodies.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum CorrectionMode {
    /// Each body moves in proportion to its own mass, so the heavier body is
    /// displaced more. Historical behavior, kept as the default.
    #[default]
    MassProportional,
    /// Each body moves in proportion to the other's mass, the conventional
    /// rule.
    InverseMass,
}

/// Separate two penetrating bodies along `normal` by `depth`.
///
/// A static partner never moves: the other body absorbs the full depth. Two
/// non-static bodies split the depth by the mass ratio selected by `mode`.
pub fn correct_positions(
    a: &mut Body,
    b: &mut Body,
    normal: Vec2,
    depth: f64,
    mode: CorrectionMode,
) {
    match (a.body_type(), b.body_type()) {
        (BodyType::Static, BodyType::Static) => {}
        (BodyType::Static, _) => b.translate(normal * depth),
        (_, BodyType::Static) => a.translate(-(normal * depth)),
        _ => {
            let total = a.cached_mass() + b.cached_mass();
            if total <= 0.0 {
                return;
            }
            let ratio_a = match mode {
                CorrectionMode::MassProportional => a.cached_mass() / total,
                CorrectionMode::InverseMass => b.cached_mass() / total,
            };
            a.translate(-(normal * (depth * ratio_a)));
            b.translate(normal * (depth * (1.0 - ratio_a)));
        }
    }
}

/// Apply restitution and friction impulses for one resolved contact.
///
/// Dispatches on the body-type pair: dynamic pairs get the full
/// translational-plus-rotational treatment per contact point, a dynamic body
/// against a kinematic or static partner absorbs the whole impulse itself,
/// and kinematic-only pairs exchange translational impulses at their centers.
pub fn apply_impulses(
    a: &mut Body,
    b: &mut Body,
    normal: Vec2,
    contacts: &[Vec2],
    mat_a: &Material,
    mat_b: &Material,
) {
    let restitution = mat_a.combined_restitution(mat_b);
    let (static_friction, dynamic_friction) = mat_a.combined_friction(mat_b);

    match (a.body_type(), b.body_type()) {
        (BodyType::Static, BodyType::Static) => {}
        (BodyType::Dynamic, BodyType::Dynamic) => dynamic_pair(
            a,
            b,
            normal,
            contacts,
            restitution,
            static_friction,
            dynamic_friction,
        ),
        (BodyType::Dynamic, _) => dynamic_anchor(
            a,
            b,
            normal,
            contacts,
            restitution,
            static_friction,
            dynamic_friction,
            true,
        ),
        (_, BodyType::Dynamic) => dynamic_anchor(
            a,
            b,
            normal,
            contacts,
            restitution,
            static_friction,
            dynamic_friction,
            false,
        ),
        _ => translational_pair(
            a,
            b,
            normal,
            restitution,
            static_friction,
            dynamic_friction,
        ),
    }
}

/// Velocity of a body at a contact offset `r` from its reference point.
#[inline]
fn contact_velocity(body: &Body, r: Vec2) -> Vec2 {
    body.velocity() + r.perp() * body.angular_velocity()
}

fn dynamic_pair(
    a: &mut Body,
    b: &mut Body,
    normal: Vec2,
    contacts: &[Vec2],
    restitution: f64,
    static_friction: f64,
    dynamic_friction: f64,
) {
    let mut normal_impulses: SmallVec<[f64; 2]> = SmallVec::new();
    normal_impulses.resize(contacts.len(), 0.0);

    for (i, &contact) in contacts.iter().enumerate() {
        let ra = contact - a.position();
        let rb = contact - b.position();
        let v_rel = contact_velocity(b, rb) - contact_velocity(a, ra);
        let vn = v_rel.dot(normal);
        if vn > 0.0 {
            continue;
        }
        let ra_n = ra.cross(normal);
        let rb_n = rb.cross(normal);
        let denom = a.cached_inv_mass()
            + b.cached_inv_mass()
            + ra_n * ra_n * a.cached_inv_angular_mass()
            + rb_n * rb_n * b.cached_inv_angular_mass();
        if denom <= 0.0 {
            continue;
        }
        let j = -(1.0 + restitution) * vn / denom;
        a.apply_impulse_at(ra, -(normal * j));
        b.apply_impulse_at(rb, normal * j);
        normal_impulses[i] = j;
    }

    for (i, &contact) in contacts.iter().enumerate() {
        let j = normal_impulses[i];
        if j <= 0.0 {
            continue;
        }
        let ra = contact - a.position();
        let rb = contact - b.position();
        let v_rel = contact_velocity(b, rb) - contact_velocity(a, ra);
        let vn = v_rel.dot(normal);
        let tangential = v_rel - normal * vn;
        if tangential.length_squared() < TANGENT_EPSILON_SQ {
            continue;
        }
        let tangent = tangential.normalized();
        let ra_t = ra.cross(tangent);
        let rb_t = rb.cross(tangent);
        let denom = a.cached_inv_mass()
            + b.cached_inv_mass()
            + ra_t * ra_t * a.cached_inv_angular_mass()
            + rb_t * rb_t * b.cached_inv_angular_mass();
        if denom <= 0.0 {
            continue;
        }
        let jt = -v_rel.dot(tangent) / denom;
        let friction = if jt.abs() <= j * static_friction {
            tangent * jt
        } else {
            tangent * (-(j * dynamic_friction))
        };
        a.apply_impulse_at(ra, -friction);
        b.apply_impulse_at(rb, friction);
    }
}

/// Dynamic body against a kinematic or static partner. The dynamic side is
/// the only mass in the denominator and the only one that rotates; the
/// partner receives the opposite impulse translationally (a no-op for static
/// bodies, whose inverse mass is zero).
#[allow(clippy::too_many_arguments)]
fn dynamic_anchor(
    a: &mut Body,
    b: &mut Body,
    normal: Vec2,
    contacts: &[Vec2],
    restitution: f64,
    static_friction: f64,
    dynamic_friction: f64,
    dynamic_first: bool,
) {
    if contacts.is_empty() {
        return;
    }
    let count = contacts.len() as f64;
    let mut normal_impulses: SmallVec<[f64; 2]> = SmallVec::new();
    normal_impulses.resize(contacts.len(), 0.0);

    for (i, &contact) in contacts.iter().enumerate() {
        let ra = contact - a.position();
        let rb = contact - b.position();
        let v_rel = contact_velocity(b, rb) - contact_velocity(a, ra);
        let vn = v_rel.dot(normal);
        if vn > 0.0 {
            continue;
        }
        let (r_dyn, inv_mass, inv_angular) = if dynamic_first {
            (ra, a.cached_inv_mass(), a.cached_inv_angular_mass())
        } else {
            (rb, b.cached_inv_mass(), b.cached_inv_angular_mass())
        };
        let rn = r_dyn.cross(normal);
        let denom = inv_mass + rn * rn * inv_angular;
        if denom <= 0.0 {
            continue;
        }
        let j = -(1.0 + restitution) * vn / denom / count;
        let impulse = normal * j;
        if dynamic_first {
            a.apply_impulse_at(ra, -impulse);
            b.apply_impulse(impulse);
        } else {
            a.apply_impulse(-impulse);
            b.apply_impulse_at(rb, impulse);
        }
        normal_impulses[i] = j;
    }

    for (i, &contact) in contacts.iter().enumerate() {
        let j = normal_impulses[i];
        if j <= 0.0 {
            continue;
        }
        let ra = contact - a.position();
        let rb = contact - b.position();
        let v_rel = contact_velocity(b, rb) - contact_velocity(a, ra);
        let vn = v_rel.dot(normal);
        let tangential = v_rel - normal * vn;
        if tangential.length_squared() < TANGENT_EPSILON_SQ {
            continue;
        }
        let tangent = tangential.normalized();
        let (r_dyn, inv_mass, inv_angular) = if dynamic_first {
            (ra, a.cached_inv_mass(), a.cached_inv_angular_mass())
        } else {
            (rb, b.cached_inv_mass(), b.cached_inv_angular_mass())
        };
        let rt = r_dyn.cross(tangent);
        let denom = inv_mass + rt * rt * inv_angular;
        if denom <= 0.0 {
            continue;
        }
        let jt = -v_rel.dot(tangent) / denom / count;
        let friction = if jt.abs() <= j * static_friction {
            tangent * jt
        } else {
            tangent * (-(j * dynamic_friction))
        };
        if dynamic_first {
            a.apply_impulse_at(ra, -friction);
            b.apply_impulse(friction);
        } else {
            a.apply_impulse(-friction);
            b.apply_impulse_at(rb, friction);
        }
    }
}

/// Kinematic-kinematic or kinematic-static: one implicit contact between the
/// body centers, translational response only.
fn translational_pair(
    a: &mut Body,
    b: &mut Body,
    normal: Vec2,
    restitution: f64,
    static_friction: f64,
    dynamic_friction: f64,
) {
    let v_rel = b.velocity() - a.velocity();
    let vn = v_rel.dot(normal);
    if vn > 0.0 {
        return;
    }
    let denom = a.cached_inv_mass() + b.cached_inv_mass();
    if denom <= 0.0 {
        return;
    }
    let j = -(1.0 + restitution) * vn / denom;
    a.apply_impulse(-(normal * j));
    b.apply_impulse(normal * j);

    let tangent = normal.perp();
    let vt = v_rel.dot(tangent);
    if vt * vt < TANGENT_EPSILON_SQ {
        return;
    }
    let jt = -vt / denom;
    let friction = if jt.abs() <= j * static_friction {
        tangent * jt
    } else {
        tangent * (-(j * dynamic_friction) * vt.signum())
    };
    a.apply_impulse(-friction);
    b.apply_impulse(friction);
}
