//! Transform and rigid-body state shared by bots and projectiles.

use arena_common::geometry::{self, look_rotation};
use glam::{Quat, Vec3};

/// Position, facing, and transient motion of a simulated object.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Body {
    /// World position
    pub position: Vec3,
    /// Facing orientation (local +Z is forward)
    pub rotation: Quat,
    /// Linear velocity left by the physics collaborator
    pub velocity: Vec3,
    /// Angular velocity left by the physics collaborator
    pub angular_velocity: Vec3,
}

impl Default for Body {
    fn default() -> Self {
        Self::at(Vec3::ZERO)
    }
}

impl Body {
    /// Creates a body at rest at the given position, facing +Z.
    #[must_use]
    pub const fn at(position: Vec3) -> Self {
        Self {
            position,
            rotation: Quat::IDENTITY,
            velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
        }
    }

    /// Current facing direction.
    #[must_use]
    pub fn forward(&self) -> Vec3 {
        geometry::forward(self.rotation)
    }

    /// Snaps the facing to look along `direction`. Zero vectors are ignored.
    pub fn face(&mut self, direction: Vec3) {
        if direction.length_squared() > f32::EPSILON {
            self.rotation = look_rotation(direction);
        }
    }

    /// Zeroes velocity and angular velocity.
    pub fn clear_motion(&mut self) {
        self.velocity = Vec3::ZERO;
        self.angular_velocity = Vec3::ZERO;
    }

    /// Whether any transient motion remains.
    #[must_use]
    pub fn is_at_rest(&self) -> bool {
        self.velocity == Vec3::ZERO && self.angular_velocity == Vec3::ZERO
    }
}
