//! Concrete behavior states: idle, patrol, attack.

use arena_common::geometry::flatten;
use arena_common::EntityHandle;
use glam::Vec3;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::behavior::{state_ref, BehaviorState, FireIntent, StateContext, Transition};
use crate::bot::Bot;
use crate::movement::Movable;

/// Timing and range parameters for the built-in states.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorTuning {
    /// Shortest idle pause in seconds
    pub idle_min: f32,
    /// Longest idle pause in seconds (exclusive)
    pub idle_max: f32,
    /// Shortest patrol leg in seconds
    pub patrol_leg_min: f32,
    /// Longest patrol leg in seconds (exclusive)
    pub patrol_leg_max: f32,
    /// Legs walked before pausing again
    pub patrol_legs: u32,
    /// Distance at which an enemy is engaged
    pub attack_range: f32,
    /// Seconds spent aiming before a throw
    pub attack_windup: f32,
}

impl Default for BehaviorTuning {
    fn default() -> Self {
        Self {
            idle_min: 0.5,
            idle_max: 2.0,
            patrol_leg_min: 1.0,
            patrol_leg_max: 3.0,
            patrol_legs: 3,
            attack_range: 6.0,
            attack_windup: 0.4,
        }
    }
}

impl BehaviorTuning {
    /// Clamps values into usable ranges.
    pub fn validate(&mut self) {
        self.idle_min = self.idle_min.max(0.0);
        self.idle_max = self.idle_max.max(self.idle_min);
        self.patrol_leg_min = self.patrol_leg_min.max(0.05);
        self.patrol_leg_max = self.patrol_leg_max.max(self.patrol_leg_min);
        self.patrol_legs = self.patrol_legs.max(1);
        self.attack_range = self.attack_range.max(0.0);
        self.attack_windup = self.attack_windup.max(0.0);
    }
}

/// Uniform sample in `[min, max)`; `min` when the range is empty.
fn sample(rng: &mut fastrand::Rng, min: f32, max: f32) -> f32 {
    if max <= min {
        return min;
    }
    min + rng.f32() * (max - min)
}

/// Stands still for a while, then looks for something to do.
#[derive(Debug, Clone)]
pub struct IdleState {
    tuning: BehaviorTuning,
    wait: f32,
    elapsed: f32,
}

impl IdleState {
    /// Creates an idle state. The wait is rolled on entry.
    #[must_use]
    pub const fn new(tuning: BehaviorTuning) -> Self {
        Self {
            tuning,
            wait: 0.0,
            elapsed: 0.0,
        }
    }
}

impl BehaviorState for IdleState {
    fn name(&self) -> &'static str {
        "idle"
    }

    fn enter(&mut self, bot: &mut Bot) {
        self.elapsed = 0.0;
        self.wait = sample(bot.rng_mut(), self.tuning.idle_min, self.tuning.idle_max);
    }

    fn execute(&mut self, bot: &mut Bot, ctx: &mut StateContext<'_>) -> Transition {
        self.elapsed += ctx.dt;
        if self.elapsed < self.wait {
            return Transition::Stay;
        }

        match ctx.nearest_enemy(bot.position(), self.tuning.attack_range, bot.id()) {
            Some(enemy) => Transition::Switch(state_ref(AttackState::new(self.tuning, enemy.id))),
            None => Transition::Switch(state_ref(PatrolState::new(self.tuning))),
        }
    }
}

/// Walks a few legs in obstacle-free random directions.
#[derive(Debug, Clone)]
pub struct PatrolState {
    tuning: BehaviorTuning,
    direction: Vec3,
    leg_remaining: f32,
    legs_walked: u32,
    walking: bool,
}

impl PatrolState {
    /// Creates a patrol state. The first leg is chosen on first execution.
    #[must_use]
    pub const fn new(tuning: BehaviorTuning) -> Self {
        Self {
            tuning,
            direction: Vec3::ZERO,
            leg_remaining: 0.0,
            legs_walked: 0,
            walking: false,
        }
    }

    /// Direction of the current leg.
    #[must_use]
    pub const fn direction(&self) -> Vec3 {
        self.direction
    }

    /// Legs completed so far.
    #[must_use]
    pub const fn legs_walked(&self) -> u32 {
        self.legs_walked
    }
}

impl BehaviorState for PatrolState {
    fn name(&self) -> &'static str {
        "patrol"
    }

    fn execute(&mut self, bot: &mut Bot, ctx: &mut StateContext<'_>) -> Transition {
        let position = bot.position();

        if let Some(enemy) = ctx.nearest_enemy(position, self.tuning.attack_range, bot.id()) {
            return Transition::Switch(state_ref(AttackState::new(self.tuning, enemy.id)));
        }

        let blocked = self.walking
            && ctx
                .selector
                .is_blocked(position, self.direction, ctx.physics, ctx.classifier);

        if !self.walking || self.leg_remaining <= 0.0 || blocked {
            if self.walking {
                self.legs_walked += 1;
                if self.legs_walked >= self.tuning.patrol_legs {
                    return Transition::Switch(state_ref(IdleState::new(self.tuning)));
                }
            }

            let steering = ctx
                .selector
                .select(position, bot.rng_mut(), ctx.physics, ctx.classifier);
            self.direction = steering.direction();
            self.leg_remaining = sample(
                bot.rng_mut(),
                self.tuning.patrol_leg_min,
                self.tuning.patrol_leg_max,
            );
            self.walking = true;
            trace!(bot = %bot.id(), attempts = steering.attempts(), "new patrol leg");
        }

        bot.move_along(self.direction, ctx.dt, ctx.globals.speed_multiplier);
        self.leg_remaining -= ctx.dt;
        Transition::Stay
    }
}

/// Turns toward a target, winds up, throws once.
#[derive(Debug, Clone)]
pub struct AttackState {
    tuning: BehaviorTuning,
    target: EntityHandle,
    windup_left: f32,
}

impl AttackState {
    /// Creates an attack on `target`.
    #[must_use]
    pub const fn new(tuning: BehaviorTuning, target: EntityHandle) -> Self {
        Self {
            tuning,
            target,
            windup_left: tuning.attack_windup,
        }
    }

    /// Who is being attacked.
    #[must_use]
    pub const fn target(&self) -> EntityHandle {
        self.target
    }
}

impl BehaviorState for AttackState {
    fn name(&self) -> &'static str {
        "attack"
    }

    fn enter(&mut self, _bot: &mut Bot) {
        self.windup_left = self.tuning.attack_windup;
    }

    fn execute(&mut self, bot: &mut Bot, ctx: &mut StateContext<'_>) -> Transition {
        let position = bot.position();
        let in_range = ctx.find(self.target).filter(|target| {
            target.position.distance_squared(position)
                <= self.tuning.attack_range * self.tuning.attack_range
        });
        let Some(target) = in_range else {
            return Transition::Switch(state_ref(IdleState::new(self.tuning)));
        };

        bot.body_mut().face(flatten(target.position - position));

        self.windup_left -= ctx.dt;
        if self.windup_left > 0.0 {
            return Transition::Stay;
        }

        ctx.intents.push(FireIntent {
            owner: bot.id(),
            position,
            rotation: bot.body().rotation,
        });
        Transition::Switch(state_ref(IdleState::new(self.tuning)))
    }
}
