//! Thrown projectiles and contact resolution.
//!
//! A bullet belongs to the bot that threw it. Each contact resolves to at
//! most one terminal outcome; after that the bullet is either back in the
//! pool (owner still alive) or destroyed for good (owner dead or gone).

use arena_common::geometry::{flatten, UP};
use arena_common::{ColliderId, EntityHandle, ObjectKind, WeaponId};
use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::body::Body;
use crate::events::BotEvents;
use crate::pool::{Pool, Poolable};
use crate::world::Presentation;

/// Flight parameters shared by every projectile.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectileTuning {
    /// Base speed in units per second
    pub speed: f32,
    /// Contact radius
    pub radius: f32,
    /// Launch height above the thrower's feet
    pub launch_height: f32,
    /// Seconds of flight before the projectile is retired unhit
    pub max_lifetime: f32,
}

impl Default for ProjectileTuning {
    fn default() -> Self {
        Self {
            speed: 4.0,
            radius: 0.25,
            launch_height: 1.0,
            max_lifetime: 3.0,
        }
    }
}

impl ProjectileTuning {
    /// Clamps values into usable ranges.
    pub fn validate(&mut self) {
        self.speed = self.speed.max(0.0);
        self.radius = self.radius.clamp(0.01, 5.0);
        self.launch_height = self.launch_height.max(0.0);
        self.max_lifetime = self.max_lifetime.max(0.1);
    }
}

/// Something projectiles can kill and credit.
pub trait Damageable {
    /// Whether it can still be hit.
    fn is_alive(&self) -> bool;

    /// Current level.
    fn level(&self) -> u32;

    /// Applies a killing hit. Returns false if already dead.
    fn take_hit(
        &mut self,
        killer: EntityHandle,
        presentation: &mut dyn Presentation,
        events: &mut BotEvents,
    ) -> bool;

    /// Credits a kill of a victim at `victim_level`.
    fn credit_kill(&mut self, victim_level: u32, presentation: &mut dyn Presentation);
}

/// The world as seen by contact resolution.
pub trait CombatHost {
    /// Whether `id` names a living character.
    fn is_alive(&self, id: EntityHandle) -> bool;

    /// Speed factor applied to projectiles thrown by `id`.
    fn speed_multiplier(&self, id: EntityHandle) -> f32;

    /// Hits `victim` on behalf of `killer`. Returns whether the hit killed.
    fn hit(&mut self, victim: EntityHandle, killer: EntityHandle) -> bool;

    /// Grants `owner` credit for killing `victim`.
    fn credit(&mut self, owner: EntityHandle, victim: EntityHandle);

    /// Plays the impact sound.
    fn play_hit_sound(&mut self, at: Vec3);
}

/// A thrown weapon in flight.
#[derive(Debug, Clone)]
pub struct Bullet {
    kind: ObjectKind,
    owner: EntityHandle,
    body: Body,
    direction: Vec3,
    speed: f32,
    speed_multiplier: f32,
    radius: f32,
    age: f32,
}

impl Bullet {
    /// Creates an idle bullet of the given weapon type.
    #[must_use]
    pub fn new(weapon: WeaponId, tuning: &ProjectileTuning) -> Self {
        Self {
            kind: ObjectKind::Projectile(weapon),
            owner: EntityHandle::NULL,
            body: Body::default(),
            direction: Vec3::ZERO,
            speed: tuning.speed,
            speed_multiplier: 1.0,
            radius: tuning.radius,
            age: 0.0,
        }
    }

    /// Launches the bullet from `position` along the facing of `rotation`.
    pub fn fly(&mut self, owner: EntityHandle, position: Vec3, rotation: Quat) {
        self.owner = owner;
        self.body.position = position;
        self.body.rotation = rotation;
        self.direction = flatten(self.body.forward()).normalize_or_zero();
        self.speed_multiplier = 1.0;
        self.age = 0.0;
    }

    /// Displacement over `dt` given the owner's speed factor.
    #[must_use]
    pub fn displacement(&self, dt: f32, owner_multiplier: f32) -> Vec3 {
        self.direction * self.speed * self.speed_multiplier * owner_multiplier * dt
    }

    /// Thrower.
    #[must_use]
    pub const fn owner(&self) -> EntityHandle {
        self.owner
    }

    /// Current position.
    #[must_use]
    pub const fn position(&self) -> Vec3 {
        self.body.position
    }

    /// Flight direction, fixed at launch.
    #[must_use]
    pub const fn direction(&self) -> Vec3 {
        self.direction
    }

    /// Per-bullet speed factor.
    #[must_use]
    pub const fn speed_multiplier(&self) -> f32 {
        self.speed_multiplier
    }

    /// Sets the per-bullet speed factor.
    pub fn set_speed_multiplier(&mut self, multiplier: f32) {
        self.speed_multiplier = multiplier;
    }

    /// Contact radius.
    #[must_use]
    pub const fn radius(&self) -> f32 {
        self.radius
    }

    /// Weapon type this bullet was thrown as.
    #[must_use]
    pub const fn weapon(&self) -> Option<WeaponId> {
        match self.kind {
            ObjectKind::Projectile(weapon) => Some(weapon),
            ObjectKind::Bot => None,
        }
    }

    /// Rigid body.
    #[must_use]
    pub const fn body(&self) -> &Body {
        &self.body
    }
}

impl Poolable for Bullet {
    fn kind(&self) -> ObjectKind {
        self.kind
    }

    fn body_mut(&mut self) -> &mut Body {
        &mut self.body
    }
}

/// What a moving bullet touched.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Contact {
    /// A character body
    Character {
        /// Character touched
        id: EntityHandle,
        /// Contact point
        point: Vec3,
    },
    /// Static world geometry
    Obstacle {
        /// Collider touched
        collider: ColliderId,
        /// Contact point
        point: Vec3,
    },
    /// Anything else, such as a trigger volume
    Other {
        /// Collider touched
        collider: ColliderId,
    },
}

/// How a resolved bullet left the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Release {
    /// Returned to the pool for reuse
    Pooled,
    /// Dropped permanently
    Destroyed,
}

/// Result of resolving one contact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactOutcome {
    /// Nothing happened; the bullet keeps flying
    Ignored,
    /// A character was hit
    HitCharacter {
        /// Who was hit
        victim: EntityHandle,
        /// Whether the hit killed
        fatal: bool,
        /// Whether the owner was credited
        credited: bool,
        /// What became of the bullet
        release: Release,
    },
    /// World geometry was hit
    HitObstacle {
        /// What became of the bullet
        release: Release,
    },
    /// The bullet was already released
    Stale,
}

impl ContactOutcome {
    /// Whether the bullet is no longer flying.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::Ignored)
    }
}

/// Segment swept by one bullet during [`Projectiles::advance`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sweep {
    /// Bullet handle
    pub bullet: EntityHandle,
    /// Thrower
    pub owner: EntityHandle,
    /// Start of the segment
    pub from: Vec3,
    /// End of the segment
    pub to: Vec3,
    /// Contact radius
    pub radius: f32,
}

/// Every bullet in flight, pooled by weapon type.
#[derive(Debug, Default)]
pub struct Projectiles {
    pool: Pool<Bullet>,
    tuning: ProjectileTuning,
}

impl Projectiles {
    /// Creates an empty projectile set.
    #[must_use]
    pub fn new(tuning: ProjectileTuning) -> Self {
        Self {
            pool: Pool::new(),
            tuning,
        }
    }

    /// Throws a `weapon` for `owner` from feet position `position`.
    pub fn launch(
        &mut self,
        weapon: WeaponId,
        owner: EntityHandle,
        position: Vec3,
        rotation: Quat,
    ) -> EntityHandle {
        let tuning = self.tuning;
        let handle = self
            .pool
            .acquire(ObjectKind::Projectile(weapon), || Bullet::new(weapon, &tuning));
        if let Some(bullet) = self.pool.get_mut(handle) {
            bullet.fly(owner, position + UP * tuning.launch_height, rotation);
        }
        trace!(bullet = %handle, %owner, ?weapon, "projectile launched");
        handle
    }

    /// Resolves one contact of `bullet`.
    ///
    /// Character hits run in a fixed order: impact sound, damage, bullet
    /// release, then owner credit if the owner is still alive and the hit
    /// was fatal. Touching the owner is ignored.
    pub fn resolve_contact(
        &mut self,
        bullet: EntityHandle,
        contact: Contact,
        host: &mut dyn CombatHost,
    ) -> ContactOutcome {
        let Some(owner) = self.pool.get(bullet).map(Bullet::owner) else {
            return ContactOutcome::Stale;
        };

        match contact {
            Contact::Character { id, .. } if id == owner => ContactOutcome::Ignored,
            Contact::Character { id, point } => {
                host.play_hit_sound(point);
                let fatal = host.hit(id, owner);
                let Some(release) = self.retire(bullet, &*host) else {
                    return ContactOutcome::Stale;
                };
                let credited = fatal && host.is_alive(owner);
                if credited {
                    host.credit(owner, id);
                }
                debug!(%bullet, %owner, victim = %id, fatal, ?release, "projectile hit character");
                ContactOutcome::HitCharacter {
                    victim: id,
                    fatal,
                    credited,
                    release,
                }
            },
            Contact::Obstacle { collider, .. } => match self.retire(bullet, &*host) {
                Some(release) => {
                    trace!(%bullet, collider = collider.raw(), "projectile hit obstacle");
                    ContactOutcome::HitObstacle { release }
                },
                None => ContactOutcome::Stale,
            },
            Contact::Other { .. } => ContactOutcome::Ignored,
        }
    }

    /// Returns the bullet to the pool if its owner lives, else destroys it.
    fn retire(&mut self, bullet: EntityHandle, host: &dyn CombatHost) -> Option<Release> {
        let owner = self.pool.get(bullet)?.owner();
        let result = if host.is_alive(owner) {
            self.pool.release(bullet).map(|()| Release::Pooled)
        } else {
            self.pool.destroy(bullet).map(|()| Release::Destroyed)
        };
        result.ok()
    }

    /// Moves every flying bullet and returns the swept segments.
    ///
    /// Bullets past their lifetime are retired instead of moved.
    pub fn advance(&mut self, dt: f32, host: &dyn CombatHost) -> Vec<Sweep> {
        let max_lifetime = self.tuning.max_lifetime;
        let mut sweeps = Vec::new();
        let mut expired = Vec::new();

        for handle in self.pool.handles() {
            let Some(bullet) = self.pool.get_mut(handle) else {
                continue;
            };
            bullet.age += dt;
            if bullet.age >= max_lifetime {
                expired.push(handle);
                continue;
            }

            let from = bullet.body.position;
            let to = from + bullet.displacement(dt, host.speed_multiplier(bullet.owner));
            bullet.body.position = to;
            sweeps.push(Sweep {
                bullet: handle,
                owner: bullet.owner,
                from,
                to,
                radius: bullet.radius,
            });
        }

        for handle in expired {
            if let Some(release) = self.retire(handle, host) {
                trace!(bullet = %handle, ?release, "projectile expired");
            }
        }

        sweeps
    }

    /// Looks up a bullet in flight.
    #[must_use]
    pub fn get(&self, bullet: EntityHandle) -> Option<&Bullet> {
        self.pool.get(bullet)
    }

    /// Looks up a bullet in flight mutably.
    pub fn get_mut(&mut self, bullet: EntityHandle) -> Option<&mut Bullet> {
        self.pool.get_mut(bullet)
    }

    /// Number of bullets in flight.
    #[must_use]
    pub const fn live_count(&self) -> usize {
        self.pool.live_count()
    }

    /// Number of pooled bullets of `weapon` waiting for reuse.
    #[must_use]
    pub fn free_count(&self, weapon: WeaponId) -> usize {
        self.pool.free_count(ObjectKind::Projectile(weapon))
    }

    /// Flight parameters in use.
    #[must_use]
    pub const fn tuning(&self) -> &ProjectileTuning {
        &self.tuning
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ahash::AHashSet;

    /// Minimal host: a set of living characters and a call log.
    #[derive(Default)]
    struct Host {
        alive: AHashSet<EntityHandle>,
        log: Vec<String>,
        multiplier: f32,
    }

    impl Host {
        fn with(alive: &[EntityHandle]) -> Self {
            Self {
                alive: alive.iter().copied().collect(),
                log: Vec::new(),
                multiplier: 1.0,
            }
        }
    }

    impl CombatHost for Host {
        fn is_alive(&self, id: EntityHandle) -> bool {
            self.alive.contains(&id)
        }

        fn speed_multiplier(&self, _: EntityHandle) -> f32 {
            self.multiplier
        }

        fn hit(&mut self, victim: EntityHandle, _: EntityHandle) -> bool {
            self.log.push(format!("hit {victim}"));
            self.alive.remove(&victim)
        }

        fn credit(&mut self, owner: EntityHandle, _: EntityHandle) {
            self.log.push(format!("credit {owner}"));
        }

        fn play_hit_sound(&mut self, _: Vec3) {
            self.log.push("sound".to_owned());
        }
    }

    const AXE: WeaponId = WeaponId::new(0);
    const A: EntityHandle = EntityHandle::new(0, 0);
    const B: EntityHandle = EntityHandle::new(1, 0);

    fn hit_b() -> Contact {
        Contact::Character {
            id: B,
            point: Vec3::ZERO,
        }
    }

    #[test]
    fn test_fly_resets_multiplier_and_direction() {
        let mut bullet = Bullet::new(AXE, &ProjectileTuning::default());
        bullet.set_speed_multiplier(3.0);
        bullet.fly(A, Vec3::ONE, Quat::from_rotation_y(std::f32::consts::FRAC_PI_2));

        assert_eq!(bullet.speed_multiplier(), 1.0);
        assert!((bullet.direction() - Vec3::X).length() < 1e-5);
        assert_eq!(bullet.owner(), A);
    }

    #[test]
    fn test_displacement_composes_multipliers() {
        let mut bullet = Bullet::new(AXE, &ProjectileTuning::default());
        bullet.fly(A, Vec3::ZERO, Quat::IDENTITY);
        bullet.set_speed_multiplier(0.5);
        let step = bullet.displacement(0.5, 2.0);
        assert!((step - Vec3::new(0.0, 0.0, 2.0)).length() < 1e-5);
    }

    #[test]
    fn test_owner_contact_ignored() {
        let mut projectiles = Projectiles::default();
        let mut host = Host::with(&[A, B]);
        let bullet = projectiles.launch(AXE, A, Vec3::ZERO, Quat::IDENTITY);

        let outcome = projectiles.resolve_contact(
            bullet,
            Contact::Character {
                id: A,
                point: Vec3::ZERO,
            },
            &mut host,
        );

        assert_eq!(outcome, ContactOutcome::Ignored);
        assert!(host.log.is_empty());
        assert_eq!(projectiles.live_count(), 1);
    }

    #[test]
    fn test_kill_credits_and_pools() {
        let mut projectiles = Projectiles::default();
        let mut host = Host::with(&[A, B]);
        let bullet = projectiles.launch(AXE, A, Vec3::ZERO, Quat::IDENTITY);

        let outcome = projectiles.resolve_contact(bullet, hit_b(), &mut host);

        assert_eq!(
            outcome,
            ContactOutcome::HitCharacter {
                victim: B,
                fatal: true,
                credited: true,
                release: Release::Pooled,
            }
        );
        assert_eq!(host.log, vec!["sound", "hit #1v0", "credit #0v0"]);
        assert_eq!(projectiles.free_count(AXE), 1);
        assert_eq!(projectiles.live_count(), 0);
    }

    #[test]
    fn test_dead_owner_destroys_bullet() {
        let mut projectiles = Projectiles::default();
        let mut host = Host::with(&[B]);
        let bullet = projectiles.launch(AXE, A, Vec3::ZERO, Quat::IDENTITY);

        let outcome = projectiles.resolve_contact(bullet, hit_b(), &mut host);

        assert!(matches!(
            outcome,
            ContactOutcome::HitCharacter {
                credited: false,
                release: Release::Destroyed,
                ..
            }
        ));
        assert_eq!(projectiles.free_count(AXE), 0);
        assert_eq!(projectiles.live_count(), 0);
    }

    #[test]
    fn test_obstacle_releases_without_damage() {
        let mut projectiles = Projectiles::default();
        let mut host = Host::with(&[A, B]);
        let bullet = projectiles.launch(AXE, A, Vec3::ZERO, Quat::IDENTITY);

        let outcome = projectiles.resolve_contact(
            bullet,
            Contact::Obstacle {
                collider: ColliderId::new(3),
                point: Vec3::Z,
            },
            &mut host,
        );

        assert_eq!(
            outcome,
            ContactOutcome::HitObstacle {
                release: Release::Pooled
            }
        );
        assert!(host.log.is_empty());
    }

    #[test]
    fn test_trigger_contact_ignored() {
        let mut projectiles = Projectiles::default();
        let mut host = Host::with(&[A]);
        let bullet = projectiles.launch(AXE, A, Vec3::ZERO, Quat::IDENTITY);
        let outcome = projectiles.resolve_contact(
            bullet,
            Contact::Other {
                collider: ColliderId::new(8),
            },
            &mut host,
        );
        assert_eq!(outcome, ContactOutcome::Ignored);
        assert_eq!(projectiles.live_count(), 1);
    }

    #[test]
    fn test_resolved_bullet_is_stale() {
        let mut projectiles = Projectiles::default();
        let mut host = Host::with(&[A, B]);
        let bullet = projectiles.launch(AXE, A, Vec3::ZERO, Quat::IDENTITY);
        projectiles.resolve_contact(bullet, hit_b(), &mut host);
        host.log.clear();

        let outcome = projectiles.resolve_contact(bullet, hit_b(), &mut host);
        assert_eq!(outcome, ContactOutcome::Stale);
        assert!(host.log.is_empty());
    }

    #[test]
    fn test_advance_moves_and_expires() {
        let tuning = ProjectileTuning {
            max_lifetime: 1.0,
            ..ProjectileTuning::default()
        };
        let mut projectiles = Projectiles::new(tuning);
        let host = Host::with(&[A]);
        let bullet = projectiles.launch(AXE, A, Vec3::ZERO, Quat::IDENTITY);

        let sweeps = projectiles.advance(0.5, &host);
        assert_eq!(sweeps.len(), 1);
        assert_eq!(sweeps[0].from, Vec3::new(0.0, 1.0, 0.0));
        assert!((sweeps[0].to - Vec3::new(0.0, 1.0, 2.0)).length() < 1e-5);

        assert!(projectiles.advance(0.6, &host).is_empty());
        assert!(projectiles.get(bullet).is_none());
        assert_eq!(projectiles.free_count(AXE), 1);
    }

    #[test]
    fn test_launch_reuses_pooled_bullet() {
        let mut projectiles = Projectiles::default();
        let mut host = Host::with(&[A, B]);
        let first = projectiles.launch(AXE, A, Vec3::ZERO, Quat::IDENTITY);
        projectiles.resolve_contact(
            first,
            Contact::Obstacle {
                collider: ColliderId::BOUNDARY,
                point: Vec3::ZERO,
            },
            &mut host,
        );

        let second = projectiles.launch(AXE, B, Vec3::X, Quat::IDENTITY);
        assert_eq!(second.index(), first.index());
        assert_eq!(projectiles.get(second).map(Bullet::owner), Some(B));
    }
}
