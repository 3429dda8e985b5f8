//! Reference arena geometry built from spheres.
//!
//! `SphereScene` is a small physics collaborator: a square arena bounded by
//! invisible walls and filled with spherical colliders. Each collider is
//! either a blocking obstacle (pillars, rocks) or a non-blocking trigger
//! volume. It answers sphere-cast probes and classifies what it reports.

use arena_common::ColliderId;
use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::world::{ObstacleClassifier, PhysicsQuery, ProbeHit};

/// Serializable description of one collider.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColliderSpec {
    /// Sphere center
    pub center: Vec3,
    /// Sphere radius
    pub radius: f32,
    /// Obstacle (true) or trigger volume (false)
    #[serde(default = "default_blocking")]
    pub blocking: bool,
}

const fn default_blocking() -> bool {
    true
}

#[derive(Debug, Clone, Copy)]
struct SphereCollider {
    id: ColliderId,
    center: Vec3,
    radius: f32,
    blocking: bool,
}

/// Square arena of spherical colliders.
#[derive(Debug, Clone)]
pub struct SphereScene {
    half_extent: f32,
    colliders: Vec<SphereCollider>,
}

impl SphereScene {
    /// Creates an empty arena spanning `[-half_extent, half_extent]` on X and Z.
    #[must_use]
    pub fn new(half_extent: f32) -> Self {
        Self {
            half_extent: half_extent.max(1.0),
            colliders: Vec::new(),
        }
    }

    /// Creates an arena and adds every collider in `specs`.
    #[must_use]
    pub fn from_specs(half_extent: f32, specs: &[ColliderSpec]) -> Self {
        let mut scene = Self::new(half_extent);
        for spec in specs {
            scene.add(*spec);
        }
        scene
    }

    /// Adds a collider and returns its ID.
    pub fn add(&mut self, spec: ColliderSpec) -> ColliderId {
        let id = ColliderId::new(self.colliders.len() as u32);
        self.colliders.push(SphereCollider {
            id,
            center: spec.center,
            radius: spec.radius.max(0.0),
            blocking: spec.blocking,
        });
        id
    }

    /// Half the side length of the arena.
    #[must_use]
    pub const fn half_extent(&self) -> f32 {
        self.half_extent
    }

    /// Number of colliders, walls excluded.
    #[must_use]
    pub fn collider_count(&self) -> usize {
        self.colliders.len()
    }

    fn sweep_sphere(
        collider: &SphereCollider,
        origin: Vec3,
        radius: f32,
        direction: Vec3,
        max_distance: f32,
    ) -> Option<ProbeHit> {
        let reach = collider.radius + radius;
        let offset = origin - collider.center;
        let b = offset.dot(direction);
        let c = offset.length_squared() - reach * reach;

        let distance = if c <= 0.0 {
            0.0
        } else {
            if b > 0.0 {
                return None;
            }
            let disc = b * b - c;
            if disc < 0.0 {
                return None;
            }
            -b - disc.sqrt()
        };

        if distance > max_distance {
            return None;
        }

        let at = origin + direction * distance;
        let normal = (at - collider.center).normalize_or_zero();
        Some(ProbeHit {
            collider: collider.id,
            point: collider.center + normal * collider.radius,
            distance,
        })
    }

    fn sweep_walls(&self, origin: Vec3, radius: f32, direction: Vec3, max_distance: f32)
        -> Option<ProbeHit> {
        let limit = (self.half_extent - radius).max(0.0);
        let mut nearest: Option<f32> = None;

        for (pos, dir) in [(origin.x, direction.x), (origin.z, direction.z)] {
            let t = if pos.abs() >= limit && pos * dir >= 0.0 {
                Some(0.0)
            } else if dir.abs() > f32::EPSILON {
                let wall = limit.copysign(dir);
                let t = (wall - pos) / dir;
                (t <= max_distance).then_some(t.max(0.0))
            } else {
                None
            };
            if let Some(t) = t {
                nearest = Some(nearest.map_or(t, |n| n.min(t)));
            }
        }

        nearest.map(|distance| ProbeHit {
            collider: ColliderId::BOUNDARY,
            point: origin + direction * distance,
            distance,
        })
    }
}

impl PhysicsQuery for SphereScene {
    fn probe(&self, origin: Vec3, radius: f32, direction: Vec3, max_distance: f32)
        -> Option<ProbeHit> {
        let direction = direction.normalize_or_zero();
        if direction == Vec3::ZERO {
            return None;
        }

        self.colliders
            .iter()
            .filter_map(|c| Self::sweep_sphere(c, origin, radius, direction, max_distance))
            .chain(self.sweep_walls(origin, radius, direction, max_distance))
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
    }

    fn probe_all(&self, origin: Vec3, radius: f32, direction: Vec3, max_distance: f32)
        -> Vec<ProbeHit> {
        let direction = direction.normalize_or_zero();
        if direction == Vec3::ZERO {
            return Vec::new();
        }

        let mut hits: Vec<ProbeHit> = self
            .colliders
            .iter()
            .filter_map(|c| Self::sweep_sphere(c, origin, radius, direction, max_distance))
            .chain(self.sweep_walls(origin, radius, direction, max_distance))
            .collect();
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits
    }
}

impl ObstacleClassifier for SphereScene {
    fn is_obstacle(&self, collider: ColliderId) -> bool {
        if collider == ColliderId::BOUNDARY {
            return true;
        }
        self.colliders
            .get(collider.raw() as usize)
            .is_some_and(|c| c.blocking)
    }
}
