//! Obstacle-avoiding direction selection.
//!
//! Random horizontal directions are sampled and probed with a sphere cast
//! until one is not blocked by a static obstacle. Hitting a character or a
//! trigger volume does not count as blocked. The search gives up after
//! `max_attempts` samples and reports a zero direction.

use arena_common::geometry::{random_horizontal_direction, UP};
use glam::Vec3;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::world::{ObstacleClassifier, PhysicsQuery};

/// Probe shape and retry bound.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SteeringConfig {
    /// Height above the agent's feet the probe starts from
    pub origin_lift: f32,
    /// Radius of the probing sphere
    pub probe_radius: f32,
    /// How far ahead the probe reaches
    pub probe_distance: f32,
    /// Samples tried before falling back
    pub max_attempts: u32,
}

impl Default for SteeringConfig {
    fn default() -> Self {
        Self {
            origin_lift: 1.0,
            probe_radius: 1.0,
            probe_distance: 2.0,
            max_attempts: 32,
        }
    }
}

/// Result of a direction search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Steering {
    /// An unblocked direction was found.
    Clear {
        /// Unit direction on the XZ plane
        direction: Vec3,
        /// Samples taken, including the accepted one
        attempts: u32,
    },
    /// Every sample was blocked.
    Fallback {
        /// Samples taken
        attempts: u32,
    },
}

impl Steering {
    /// Direction to move in; zero for a fallback.
    #[must_use]
    pub const fn direction(&self) -> Vec3 {
        match self {
            Self::Clear { direction, .. } => *direction,
            Self::Fallback { .. } => Vec3::ZERO,
        }
    }

    /// Whether the search hit its retry bound.
    #[must_use]
    pub const fn is_degraded(&self) -> bool {
        matches!(self, Self::Fallback { .. })
    }

    /// Samples taken.
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        match self {
            Self::Clear { attempts, .. } | Self::Fallback { attempts } => *attempts,
        }
    }
}

/// Picks movement directions that do not walk straight into obstacles.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectionSelector {
    config: SteeringConfig,
}

impl DirectionSelector {
    /// Creates a selector. A zero attempt bound is raised to one.
    #[must_use]
    pub fn new(mut config: SteeringConfig) -> Self {
        config.max_attempts = config.max_attempts.max(1);
        Self { config }
    }

    /// Probe shape and retry bound in use.
    #[must_use]
    pub const fn config(&self) -> &SteeringConfig {
        &self.config
    }

    /// Whether moving from `position` along `direction` runs into an obstacle.
    pub fn is_blocked(
        &self,
        position: Vec3,
        direction: Vec3,
        physics: &dyn PhysicsQuery,
        classifier: &dyn ObstacleClassifier,
    ) -> bool {
        let origin = position + UP * self.config.origin_lift;
        physics
            .probe(
                origin,
                self.config.probe_radius,
                direction,
                self.config.probe_distance,
            )
            .is_some_and(|hit| classifier.is_obstacle(hit.collider))
    }

    /// Samples random horizontal directions until one is not blocked.
    pub fn select(
        &self,
        position: Vec3,
        rng: &mut fastrand::Rng,
        physics: &dyn PhysicsQuery,
        classifier: &dyn ObstacleClassifier,
    ) -> Steering {
        for attempt in 1..=self.config.max_attempts {
            let direction = random_horizontal_direction(rng);
            if !self.is_blocked(position, direction, physics, classifier) {
                return Steering::Clear {
                    direction,
                    attempts: attempt,
                };
            }
        }

        warn!(
            attempts = self.config.max_attempts,
            x = position.x,
            z = position.z,
            "no unblocked direction found, standing still"
        );
        Steering::Fallback {
            attempts: self.config.max_attempts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::ProbeHit;
    use arena_common::ColliderId;
    use std::cell::Cell;

    /// Reports a hit on the same collider for every probe.
    struct Walled {
        collider: ColliderId,
        probes: Cell<u32>,
    }

    impl Walled {
        fn new(collider: ColliderId) -> Self {
            Self {
                collider,
                probes: Cell::new(0),
            }
        }
    }

    impl PhysicsQuery for Walled {
        fn probe(&self, origin: Vec3, _: f32, direction: Vec3, _: f32) -> Option<ProbeHit> {
            self.probes.set(self.probes.get() + 1);
            Some(ProbeHit {
                collider: self.collider,
                point: origin + direction,
                distance: 1.0,
            })
        }
    }

    struct OnlyBoundary;

    impl ObstacleClassifier for OnlyBoundary {
        fn is_obstacle(&self, collider: ColliderId) -> bool {
            collider == ColliderId::BOUNDARY
        }
    }

    /// Blocks every direction with a positive X component.
    struct EastWall;

    impl PhysicsQuery for EastWall {
        fn probe(&self, origin: Vec3, _: f32, direction: Vec3, _: f32) -> Option<ProbeHit> {
            (direction.x > 0.0).then(|| ProbeHit {
                collider: ColliderId::BOUNDARY,
                point: origin,
                distance: 0.5,
            })
        }
    }

    #[test]
    fn test_fully_blocked_terminates_with_fallback() {
        let physics = Walled::new(ColliderId::BOUNDARY);
        let selector = DirectionSelector::new(SteeringConfig {
            max_attempts: 16,
            ..SteeringConfig::default()
        });
        let mut rng = fastrand::Rng::with_seed(1);

        let steering = selector.select(Vec3::ZERO, &mut rng, &physics, &OnlyBoundary);

        assert!(steering.is_degraded());
        assert_eq!(steering.direction(), Vec3::ZERO);
        assert_eq!(steering.attempts(), 16);
        assert_eq!(physics.probes.get(), 16);
    }

    #[test]
    fn test_non_obstacle_hit_is_accepted() {
        let physics = Walled::new(ColliderId::new(5));
        let selector = DirectionSelector::default();
        let mut rng = fastrand::Rng::with_seed(2);

        let steering = selector.select(Vec3::ZERO, &mut rng, &physics, &OnlyBoundary);

        assert!(!steering.is_degraded());
        assert_eq!(steering.attempts(), 1);
        assert!((steering.direction().length() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_selected_direction_avoids_wall() {
        let selector = DirectionSelector::default();
        let mut rng = fastrand::Rng::with_seed(3);

        for _ in 0..50 {
            let steering = selector.select(Vec3::ZERO, &mut rng, &EastWall, &OnlyBoundary);
            assert!(!steering.is_degraded());
            assert!(steering.direction().x <= 0.0);
        }
    }

    #[test]
    fn test_probe_origin_is_lifted() {
        struct Recorder(Cell<Vec3>);
        impl PhysicsQuery for Recorder {
            fn probe(&self, origin: Vec3, radius: f32, _: Vec3, max: f32) -> Option<ProbeHit> {
                assert_eq!(radius, 1.0);
                assert_eq!(max, 2.0);
                self.0.set(origin);
                None
            }
        }

        let recorder = Recorder(Cell::new(Vec3::ZERO));
        let selector = DirectionSelector::default();
        assert!(!selector.is_blocked(Vec3::new(3.0, 0.0, 4.0), Vec3::X, &recorder, &OnlyBoundary));
        assert_eq!(recorder.0.get(), Vec3::new(3.0, 1.0, 4.0));
    }

    #[test]
    fn test_zero_attempt_bound_is_raised() {
        let selector = DirectionSelector::new(SteeringConfig {
            max_attempts: 0,
            ..SteeringConfig::default()
        });
        assert_eq!(selector.config().max_attempts, 1);
    }
}
