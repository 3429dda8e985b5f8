//! Interfaces to the collaborators around the bot core.
//!
//! Physics, presentation, player progress and timing are owned by other
//! systems. The core only calls into them through these traits.

use ahash::AHashMap;
use arena_common::{ColliderId, EntityHandle, ResourceHandle, WeaponId};
use glam::{Vec3, Vec4};
use tracing::trace;

/// Nearest blocking surface reported by a probe.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProbeHit {
    /// What was hit
    pub collider: ColliderId,
    /// Contact point
    pub point: Vec3,
    /// Distance travelled along the probe direction
    pub distance: f32,
}

/// Sphere-cast queries against the physical arena.
pub trait PhysicsQuery {
    /// Sweeps a sphere of `radius` from `origin` along `direction` for at
    /// most `max_distance` and reports the nearest hit.
    fn probe(&self, origin: Vec3, radius: f32, direction: Vec3, max_distance: f32)
        -> Option<ProbeHit>;

    /// Like [`PhysicsQuery::probe`] but reports every collider the sweep
    /// touches, nearest first.
    ///
    /// The default only sees the nearest hit. Worlds with overlapping
    /// trigger volumes should override it.
    fn probe_all(&self, origin: Vec3, radius: f32, direction: Vec3, max_distance: f32)
        -> Vec<ProbeHit> {
        self.probe(origin, radius, direction, max_distance)
            .into_iter()
            .collect()
    }
}

/// Distinguishes blocking world geometry from non-blocking contacts.
pub trait ObstacleClassifier {
    /// Whether `collider` is a static obstacle.
    fn is_obstacle(&self, collider: ColliderId) -> bool;
}

/// Source of per-frame elapsed time.
pub trait Clock {
    /// Seconds elapsed this frame.
    fn delta_time(&self) -> f32;
}

/// Clock that always reports the same step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedClock {
    dt: f32,
}

impl FixedClock {
    /// Creates a fixed clock. Non-positive steps are raised to 1 ms.
    #[must_use]
    pub fn new(dt: f32) -> Self {
        Self { dt: dt.max(0.001) }
    }
}

impl Default for FixedClock {
    fn default() -> Self {
        Self::new(1.0 / 60.0)
    }
}

impl Clock for FixedClock {
    fn delta_time(&self) -> f32 {
        self.dt
    }
}

/// Read access to the human player's progress.
pub trait PlayerState {
    /// The player's current level (1-based).
    fn current_level(&self) -> u32;
}

/// Plain player progress record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerProgress {
    /// Current level
    pub level: u32,
}

impl Default for PlayerProgress {
    fn default() -> Self {
        Self { level: 1 }
    }
}

impl PlayerState for PlayerProgress {
    fn current_level(&self) -> u32 {
        self.level.max(1)
    }
}

/// Process-wide simulation state read by every bot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimGlobals {
    /// Game-speed / hitstop factor applied to all motion
    pub speed_multiplier: f32,
    /// While set, no behavior state executes
    pub waiting: bool,
}

impl Default for SimGlobals {
    fn default() -> Self {
        Self {
            speed_multiplier: 1.0,
            waiting: false,
        }
    }
}

/// Scene-side resources a bot attaches while spawned, plus impact audio.
///
/// Every handle returned by an `attach_*` call must eventually be passed to
/// [`Presentation::detach`] exactly once.
pub trait Presentation {
    /// Creates the off-screen target indicator for `owner`.
    fn attach_target_indicator(&mut self, owner: EntityHandle, tint: Vec4) -> ResourceHandle;

    /// Creates the name/level tag for `owner`.
    fn attach_info_panel(&mut self, owner: EntityHandle, name: &str, level: u32)
        -> ResourceHandle;

    /// Creates the held weapon model for `owner`.
    fn attach_weapon(&mut self, owner: EntityHandle, weapon: WeaponId) -> ResourceHandle;

    /// Releases a previously attached resource.
    fn detach(&mut self, handle: ResourceHandle);

    /// Plays the projectile impact sound.
    fn play_hit_sound(&mut self, at: Vec3);
}

/// What a [`HeadlessPresentation`] handle refers to.
#[derive(Debug, Clone, PartialEq)]
pub enum AttachedResource {
    /// Target indicator
    TargetIndicator {
        /// Owning bot
        owner: EntityHandle,
        /// Normal tint
        tint: Vec4,
    },
    /// Name/level tag
    InfoPanel {
        /// Owning bot
        owner: EntityHandle,
        /// Display name
        name: String,
        /// Level shown
        level: u32,
    },
    /// Held weapon
    Weapon {
        /// Owning bot
        owner: EntityHandle,
        /// Weapon type
        weapon: WeaponId,
    },
}

impl AttachedResource {
    /// Owning bot.
    #[must_use]
    pub const fn owner(&self) -> EntityHandle {
        match self {
            Self::TargetIndicator { owner, .. }
            | Self::InfoPanel { owner, .. }
            | Self::Weapon { owner, .. } => *owner,
        }
    }
}

/// Presentation layer without a renderer: tracks attached resources so
/// leaks are observable.
#[derive(Debug, Default)]
pub struct HeadlessPresentation {
    attached: AHashMap<ResourceHandle, AttachedResource>,
    hit_sounds: Vec<Vec3>,
    stray_detaches: u32,
    last_handle: ResourceHandle,
}

impl HeadlessPresentation {
    /// Creates an empty presentation layer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn attach(&mut self, resource: AttachedResource) -> ResourceHandle {
        let handle = self.last_handle.successor();
        self.last_handle = handle;
        trace!(handle = handle.raw(), ?resource, "attached");
        self.attached.insert(handle, resource);
        handle
    }

    /// Resources currently attached to `owner`.
    #[must_use]
    pub fn attached_to(&self, owner: EntityHandle) -> Vec<&AttachedResource> {
        self.attached
            .values()
            .filter(|resource| resource.owner() == owner)
            .collect()
    }

    /// Looks up an attached resource.
    #[must_use]
    pub fn resource(&self, handle: ResourceHandle) -> Option<&AttachedResource> {
        self.attached.get(&handle)
    }

    /// Number of attached resources across all owners.
    #[must_use]
    pub fn attached_count(&self) -> usize {
        self.attached.len()
    }

    /// Positions of every impact sound played so far.
    #[must_use]
    pub fn hit_sounds(&self) -> &[Vec3] {
        &self.hit_sounds
    }

    /// Number of detach calls for handles that were not attached.
    #[must_use]
    pub const fn stray_detaches(&self) -> u32 {
        self.stray_detaches
    }
}

impl Presentation for HeadlessPresentation {
    fn attach_target_indicator(&mut self, owner: EntityHandle, tint: Vec4) -> ResourceHandle {
        self.attach(AttachedResource::TargetIndicator { owner, tint })
    }

    fn attach_info_panel(&mut self, owner: EntityHandle, name: &str, level: u32) -> ResourceHandle {
        self.attach(AttachedResource::InfoPanel {
            owner,
            name: name.to_owned(),
            level,
        })
    }

    fn attach_weapon(&mut self, owner: EntityHandle, weapon: WeaponId) -> ResourceHandle {
        self.attach(AttachedResource::Weapon { owner, weapon })
    }

    fn detach(&mut self, handle: ResourceHandle) {
        if self.attached.remove(&handle).is_none() {
            self.stray_detaches += 1;
        }
    }

    fn play_hit_sound(&mut self, at: Vec3) {
        self.hit_sounds.push(at);
    }
}
