//! Horizontal-plane geometry helpers.
//!
//! The arena is a Y-up world. Characters walk on the XZ plane and face
//! along their local +Z axis.

use glam::{Mat3, Quat, Vec3};
use std::f32::consts::TAU;

/// World up axis.
pub const UP: Vec3 = Vec3::Y;

/// Unit direction on the XZ plane for the given angle in radians.
#[must_use]
pub fn horizontal_direction(angle: f32) -> Vec3 {
    Vec3::new(angle.cos(), 0.0, angle.sin())
}

/// Uniformly random unit direction on the XZ plane.
#[must_use]
pub fn random_horizontal_direction(rng: &mut fastrand::Rng) -> Vec3 {
    horizontal_direction(rng.f32() * TAU)
}

/// Drops the vertical component of a vector.
#[must_use]
pub fn flatten(v: Vec3) -> Vec3 {
    Vec3::new(v.x, 0.0, v.z)
}

/// Rotation whose local +Z axis points along `forward`, keeping +Y as up.
///
/// Returns identity for a zero vector. A direction parallel to the up axis
/// uses +X as its right axis.
#[must_use]
pub fn look_rotation(forward: Vec3) -> Quat {
    let f = forward.normalize_or_zero();
    if f == Vec3::ZERO {
        return Quat::IDENTITY;
    }

    let right = UP.cross(f);
    let right = if right.length_squared() < 1e-6 {
        Vec3::X
    } else {
        right.normalize()
    };
    let up = f.cross(right);

    Quat::from_mat3(&Mat3::from_cols(right, up, f)).normalize()
}

/// Facing direction (local +Z) of a rotation.
#[must_use]
pub fn forward(rotation: Quat) -> Vec3 {
    rotation * Vec3::Z
}

/// Closest point to `p` on segment `a`..`b`, with its parameter in [0, 1].
#[must_use]
pub fn closest_point_on_segment(a: Vec3, b: Vec3, p: Vec3) -> (f32, Vec3) {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq <= f32::EPSILON {
        return (0.0, a);
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    (t, a + ab * t)
}
