//! Movement executor: direction in, rotation and position out.

use arena_common::geometry::look_rotation;
use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::body::Body;

/// Directions shorter than this (squared) do not turn the agent.
pub const MIN_MOVE_DISTANCE_SQ: f32 = 0.01;

/// Per-agent speed and turn rate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotorConfig {
    /// Units per second at multiplier 1.0
    pub linear_speed: f32,
    /// Slerp rate per second toward the desired facing
    pub angular_speed: f32,
}

impl Default for MotorConfig {
    fn default() -> Self {
        Self {
            linear_speed: 3.5,
            angular_speed: 12.0,
        }
    }
}

/// Anything the movement executor can drive.
pub trait Movable {
    /// Transform being driven.
    fn body(&self) -> &Body;

    /// Transform being driven, mutably.
    fn body_mut(&mut self) -> &mut Body;

    /// Speed and turn rate.
    fn motor(&self) -> MotorConfig;

    /// Moves along `direction` for one frame.
    fn move_along(&mut self, direction: Vec3, dt: f32, global_multiplier: f32) {
        let motor = self.motor();
        move_body(self.body_mut(), &motor, direction, dt, global_multiplier);
    }
}

/// Turns `body` toward `direction` and advances it along `direction`.
///
/// The facing only changes when `direction` is at least
/// [`MIN_MOVE_DISTANCE_SQ`] long (squared), so a creeping or standing agent
/// keeps its previous facing. No obstacle checking happens here.
pub fn move_body(
    body: &mut Body,
    motor: &MotorConfig,
    direction: Vec3,
    dt: f32,
    global_multiplier: f32,
) {
    if direction.length_squared() >= MIN_MOVE_DISTANCE_SQ {
        let target = look_rotation(direction);
        let t = (motor.angular_speed * dt).clamp(0.0, 1.0);
        body.rotation = body.rotation.slerp(target, t).normalize();
    }

    body.position += direction * motor.linear_speed * global_multiplier * dt;
}
