//! The bot: a pooled combatant hosting one behavior state.
//!
//! A bot is initialized by [`Bot::begin`], which runs the ordered
//! [`SPAWN_PIPELINE`]. While alive and not paused it executes its active
//! state once per tick. [`Bot::hit`] kills it; the roster despawns it once
//! the death timer elapses.

use arena_common::{EntityHandle, ObjectKind, ResourceHandle};
use glam::{Vec3, Vec4};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::behavior::{state_ref, BehaviorSlot, StateContext, StateRef, Transition};
use crate::body::Body;
use crate::catalog::Catalog;
use crate::events::{BotEvents, Channel};
use crate::identity::{roll_level, roll_outfit, Identity, Outfit};
use crate::movement::{Movable, MotorConfig};
use crate::pool::Poolable;
use crate::projectile::Damageable;
use crate::states::{BehaviorTuning, IdleState};
use crate::world::{PlayerState, Presentation};

/// Per-bot tuning shared by every bot of a roster.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BotTuning {
    /// Speed and turn rate
    pub motor: MotorConfig,
    /// Collision radius used for projectile contacts
    pub radius: f32,
    /// Seconds between death and despawn
    pub despawn_delay: f32,
    /// Behavior state parameters
    pub behavior: BehaviorTuning,
}

impl Default for BotTuning {
    fn default() -> Self {
        Self {
            motor: MotorConfig::default(),
            radius: 0.5,
            despawn_delay: 2.0,
            behavior: BehaviorTuning::default(),
        }
    }
}

/// One step of bot initialization, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpawnStep {
    /// Clear death flag, kills, timers and seed the RNG stream
    ResetRuntime,
    /// Pick a body color
    RollColor,
    /// Pick hat, pant and accessory, or a full set
    RollOutfit,
    /// Pick a weapon and attach its model
    EquipWeapon,
    /// Attach the target indicator tinted with the body color
    AttachIndicator,
    /// Pick a display name
    AssignName,
    /// Pick a level relative to the player's
    AssignLevel,
    /// Attach the name/level tag
    AttachInfoPanel,
    /// Enter the idle state
    EnterIdle,
}

/// Order in which [`Bot::begin`] initializes a bot.
pub const SPAWN_PIPELINE: [SpawnStep; 9] = [
    SpawnStep::ResetRuntime,
    SpawnStep::RollColor,
    SpawnStep::RollOutfit,
    SpawnStep::EquipWeapon,
    SpawnStep::AttachIndicator,
    SpawnStep::AssignName,
    SpawnStep::AssignLevel,
    SpawnStep::AttachInfoPanel,
    SpawnStep::EnterIdle,
];

/// Collaborators consulted while a bot spawns.
pub struct SpawnContext<'a> {
    /// Names, colors, cosmetics, weapons
    pub catalog: &'a dyn Catalog,
    /// Player level source
    pub player: &'a dyn PlayerState,
    /// Scene-side resources
    pub presentation: &'a mut dyn Presentation,
}

/// A non-player combatant.
#[derive(Debug)]
pub struct Bot {
    id: EntityHandle,
    body: Body,
    tuning: BotTuning,
    identity: Identity,
    behavior: BehaviorSlot,
    dead: bool,
    killer: Option<EntityHandle>,
    death_timer: Option<f32>,
    kills: u32,
    target_indicator: Option<ResourceHandle>,
    info_panel: Option<ResourceHandle>,
    weapon: Option<ResourceHandle>,
    rng: fastrand::Rng,
    aggressor_entered: Channel<EntityHandle>,
    aggressor_exited: Channel<EntityHandle>,
}

impl Bot {
    /// Creates an uninitialized bot. Call [`Bot::begin`] before use.
    #[must_use]
    pub fn new(tuning: BotTuning) -> Self {
        Self {
            id: EntityHandle::NULL,
            body: Body::default(),
            tuning,
            identity: Identity::default(),
            behavior: BehaviorSlot::default(),
            dead: true,
            killer: None,
            death_timer: None,
            kills: 0,
            target_indicator: None,
            info_panel: None,
            weapon: None,
            rng: fastrand::Rng::with_seed(0),
            aggressor_entered: Channel::new("aggressor_entered"),
            aggressor_exited: Channel::new("aggressor_exited"),
        }
    }

    /// Initializes the bot for a new life at `position`.
    pub fn begin(
        &mut self,
        id: EntityHandle,
        position: Vec3,
        seed: u64,
        ctx: &mut SpawnContext<'_>,
    ) {
        self.id = id;
        self.body = Body::at(position);
        for step in SPAWN_PIPELINE {
            self.apply(step, seed, ctx);
        }
        debug!(
            bot = %self.id,
            name = %self.identity.name,
            level = self.identity.level,
            "bot spawned"
        );
    }

    fn apply(&mut self, step: SpawnStep, seed: u64, ctx: &mut SpawnContext<'_>) {
        trace!(bot = %self.id, ?step, "spawn step");
        match step {
            SpawnStep::ResetRuntime => {
                self.dead = false;
                self.killer = None;
                self.death_timer = None;
                self.kills = 0;
                self.rng = fastrand::Rng::with_seed(seed);
                self.identity = Identity::default();
            },
            SpawnStep::RollColor => {
                self.identity.color = Some(ctx.catalog.random_color(&mut self.rng));
            },
            SpawnStep::RollOutfit => {
                self.identity.outfit = roll_outfit(&mut self.rng, ctx.catalog, Outfit::default());
            },
            SpawnStep::EquipWeapon => {
                let weapon = ctx.catalog.random_weapon(&mut self.rng);
                self.identity.weapon = Some(weapon);
                let handle = ctx.presentation.attach_weapon(self.id, weapon);
                Self::replace(&mut self.weapon, handle, ctx.presentation);
            },
            SpawnStep::AttachIndicator => {
                let tint = self
                    .identity
                    .color
                    .as_ref()
                    .map_or(Vec4::ONE, |color| color.normal);
                let handle = ctx.presentation.attach_target_indicator(self.id, tint);
                Self::replace(&mut self.target_indicator, handle, ctx.presentation);
            },
            SpawnStep::AssignName => {
                self.identity.name = ctx.catalog.random_name(&mut self.rng);
            },
            SpawnStep::AssignLevel => {
                self.identity.level = roll_level(&mut self.rng, ctx.player.current_level());
            },
            SpawnStep::AttachInfoPanel => {
                let handle = ctx.presentation.attach_info_panel(
                    self.id,
                    &self.identity.name,
                    self.identity.level,
                );
                Self::replace(&mut self.info_panel, handle, ctx.presentation);
            },
            SpawnStep::EnterIdle => {
                let idle = state_ref(IdleState::new(self.tuning.behavior));
                self.change_state(Some(idle));
            },
        }
    }

    /// Stores `handle` in `slot`, detaching whatever the slot held.
    fn replace(
        slot: &mut Option<ResourceHandle>,
        handle: ResourceHandle,
        presentation: &mut dyn Presentation,
    ) {
        if let Some(previous) = slot.replace(handle) {
            presentation.detach(previous);
        }
    }

    /// Replaces the active behavior state.
    ///
    /// Passing the state already held is a no-op. Otherwise the old state
    /// exits before the new one enters.
    pub fn change_state(&mut self, next: Option<StateRef>) {
        if self.behavior.holds(next.as_ref()) {
            return;
        }

        if let Some(old) = self.behavior.take() {
            match old.try_borrow_mut() {
                Ok(mut state) => state.exit(self),
                Err(_) => warn!(bot = %self.id, "state changed from inside its own callback"),
            }
        }

        self.behavior.set(next.clone());

        if let Some(new) = next {
            match new.try_borrow_mut() {
                Ok(mut state) => {
                    trace!(bot = %self.id, state = state.name(), "entering state");
                    state.enter(self);
                },
                Err(_) => warn!(bot = %self.id, "state entered from inside its own callback"),
            }
        }
    }

    /// Runs the active state once. Returns whether it ran.
    ///
    /// Nothing runs while the bot is dead or the simulation is waiting.
    pub fn execute(&mut self, ctx: &mut StateContext<'_>) -> bool {
        if self.dead || ctx.globals.waiting {
            return false;
        }
        let Some(state) = self.behavior.current() else {
            return false;
        };

        let transition = match state.try_borrow_mut() {
            Ok(mut state) => state.execute(self, ctx),
            Err(_) => return false,
        };

        match transition {
            Transition::Stay => {},
            Transition::Switch(next) => self.change_state(Some(next)),
            Transition::Clear => self.change_state(None),
        }
        true
    }

    /// Kills the bot. Returns false if it was already dead.
    ///
    /// Marks it dead, detaches the target indicator, clears the behavior
    /// state and raises "any bot died", in that order.
    pub fn hit(
        &mut self,
        killer: EntityHandle,
        presentation: &mut dyn Presentation,
        events: &mut BotEvents,
    ) -> bool {
        if self.dead {
            trace!(bot = %self.id, "hit on a dead bot ignored");
            return false;
        }

        self.dead = true;
        self.killer = Some(killer);
        if let Some(indicator) = self.target_indicator.take() {
            presentation.detach(indicator);
        }
        self.change_state(None);
        events.any_died.emit(&self.id);
        self.death_timer = Some(self.tuning.despawn_delay);

        debug!(bot = %self.id, %killer, "bot died");
        true
    }

    /// Credits a kill of a bot at `victim_level`.
    pub fn level_up(&mut self, victim_level: u32, presentation: &mut dyn Presentation) {
        self.kills += 1;
        self.identity.level += 1;
        if self.info_panel.is_some() {
            let handle =
                presentation.attach_info_panel(self.id, &self.identity.name, self.identity.level);
            Self::replace(&mut self.info_panel, handle, presentation);
        }
        debug!(bot = %self.id, level = self.identity.level, victim_level, "level up");
    }

    /// Advances the death timer. Returns true once it has elapsed.
    pub fn tick_death(&mut self, dt: f32) -> bool {
        match self.death_timer.as_mut() {
            Some(remaining) => {
                *remaining -= dt;
                *remaining <= 0.0
            },
            None => false,
        }
    }

    /// Notifies this bot's subscribers that `aggressor` came into range.
    pub fn enter_aggressor_range(&mut self, aggressor: EntityHandle) {
        self.aggressor_entered.emit(&aggressor);
    }

    /// Notifies this bot's subscribers that `aggressor` left range.
    pub fn exit_aggressor_range(&mut self, aggressor: EntityHandle) {
        self.aggressor_exited.emit(&aggressor);
    }

    /// Per-bot "aggressor entered range" channel.
    pub fn aggressor_entered_mut(&mut self) -> &mut Channel<EntityHandle> {
        &mut self.aggressor_entered
    }

    /// Per-bot "aggressor exited range" channel.
    pub fn aggressor_exited_mut(&mut self) -> &mut Channel<EntityHandle> {
        &mut self.aggressor_exited
    }

    /// Detaches the held weapon model.
    pub fn detach_weapon(&mut self, presentation: &mut dyn Presentation) {
        if let Some(weapon) = self.weapon.take() {
            presentation.detach(weapon);
        }
    }

    /// Detaches the name tag and target indicator.
    pub fn detach_ui(&mut self, presentation: &mut dyn Presentation) {
        if let Some(panel) = self.info_panel.take() {
            presentation.detach(panel);
        }
        if let Some(indicator) = self.target_indicator.take() {
            presentation.detach(indicator);
        }
    }

    /// Takes the bot out of play ahead of pooling.
    ///
    /// A bot still alive exits its state here, under the handle it was
    /// spawned with. The death timer stops and the UI is detached.
    pub fn retire(&mut self, presentation: &mut dyn Presentation) {
        self.change_state(None);
        self.dead = true;
        self.death_timer = None;
        self.detach_ui(presentation);
    }

    /// Handle this bot was spawned under.
    #[must_use]
    pub const fn id(&self) -> EntityHandle {
        self.id
    }

    /// Transform.
    #[must_use]
    pub const fn body(&self) -> &Body {
        &self.body
    }

    /// Transform, mutably.
    pub fn body_mut(&mut self) -> &mut Body {
        &mut self.body
    }

    /// Current position.
    #[must_use]
    pub const fn position(&self) -> Vec3 {
        self.body.position
    }

    /// Name, level and looks.
    #[must_use]
    pub const fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Current level.
    #[must_use]
    pub const fn level(&self) -> u32 {
        self.identity.level
    }

    /// Tuning in use.
    #[must_use]
    pub const fn tuning(&self) -> &BotTuning {
        &self.tuning
    }

    /// Active-state slot.
    #[must_use]
    pub const fn behavior(&self) -> &BehaviorSlot {
        &self.behavior
    }

    /// Whether the bot is dead (or not yet spawned).
    #[must_use]
    pub const fn is_dead(&self) -> bool {
        self.dead
    }

    /// Who landed the killing hit.
    #[must_use]
    pub const fn killer(&self) -> Option<EntityHandle> {
        self.killer
    }

    /// Kills credited this life.
    #[must_use]
    pub const fn kills(&self) -> u32 {
        self.kills
    }

    /// Seconds until despawn, while dead.
    #[must_use]
    pub const fn death_timer(&self) -> Option<f32> {
        self.death_timer
    }

    /// Attached target indicator.
    #[must_use]
    pub const fn target_indicator(&self) -> Option<ResourceHandle> {
        self.target_indicator
    }

    /// Attached name/level tag.
    #[must_use]
    pub const fn info_panel(&self) -> Option<ResourceHandle> {
        self.info_panel
    }

    /// Attached weapon model.
    #[must_use]
    pub const fn weapon_resource(&self) -> Option<ResourceHandle> {
        self.weapon
    }

    /// This bot's random stream.
    pub fn rng_mut(&mut self) -> &mut fastrand::Rng {
        &mut self.rng
    }
}

impl Poolable for Bot {
    fn kind(&self) -> ObjectKind {
        ObjectKind::Bot
    }

    fn body_mut(&mut self) -> &mut Body {
        &mut self.body
    }
}

impl Movable for Bot {
    fn body(&self) -> &Body {
        &self.body
    }

    fn body_mut(&mut self) -> &mut Body {
        &mut self.body
    }

    fn motor(&self) -> MotorConfig {
        self.tuning.motor
    }
}

impl Damageable for Bot {
    fn is_alive(&self) -> bool {
        !self.dead
    }

    fn level(&self) -> u32 {
        self.identity.level
    }

    fn take_hit(
        &mut self,
        killer: EntityHandle,
        presentation: &mut dyn Presentation,
        events: &mut BotEvents,
    ) -> bool {
        self.hit(killer, presentation, events)
    }

    fn credit_kill(&mut self, victim_level: u32, presentation: &mut dyn Presentation) {
        self.level_up(victim_level, presentation);
    }
}
