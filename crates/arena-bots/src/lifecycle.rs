//! Bot roster: spawn, death, despawn and return-to-pool.
//!
//! Teardown always detaches presentation resources before the bot goes back
//! to the pool, and "any bot despawned" is raised once per despawn.

use arena_common::{ArenaError, ArenaResult, EntityHandle, ObjectKind};
use glam::Vec3;
use tracing::debug;

use crate::behavior::StateRef;
use crate::bot::{Bot, BotTuning, SpawnContext};
use crate::events::BotEvents;
use crate::pool::{Pool, PoolResult};
use crate::projectile::{CombatHost, Damageable};
use crate::world::Presentation;

/// Every bot, alive or dead, plus the cross-bot channels.
#[derive(Debug, Default)]
pub struct BotRoster {
    pool: Pool<Bot>,
    events: BotEvents,
    tuning: BotTuning,
}

impl BotRoster {
    /// Creates an empty roster.
    #[must_use]
    pub fn new(tuning: BotTuning) -> Self {
        Self {
            pool: Pool::new(),
            events: BotEvents::new(),
            tuning,
        }
    }

    /// Acquires a bot from the pool and initializes it at `position`.
    pub fn spawn(&mut self, position: Vec3, seed: u64, ctx: &mut SpawnContext<'_>) -> EntityHandle {
        let tuning = self.tuning;
        let handle = self.pool.acquire(ObjectKind::Bot, || Bot::new(tuning));
        if let Some(bot) = self.pool.get_mut(handle) {
            bot.begin(handle, position, seed, ctx);
        }
        handle
    }

    /// Kills `victim`. Returns false if it was already dead or is not live.
    pub fn hit(
        &mut self,
        victim: EntityHandle,
        killer: EntityHandle,
        presentation: &mut dyn Presentation,
    ) -> bool {
        match self.pool.get_mut(victim) {
            Some(bot) => bot.take_hit(killer, presentation, &mut self.events),
            None => false,
        }
    }

    /// Credits `owner` with killing `victim`.
    pub fn credit(
        &mut self,
        owner: EntityHandle,
        victim: EntityHandle,
        presentation: &mut dyn Presentation,
    ) {
        let victim_level = self.pool.get(victim).map_or(1, Damageable::level);
        if let Some(bot) = self.pool.get_mut(owner) {
            bot.credit_kill(victim_level, presentation);
        }
    }

    /// Removes a bot from play: weapon, name tag and indicator are detached,
    /// the bot returns to the pool, and "any bot despawned" is raised.
    pub fn despawn(
        &mut self,
        id: EntityHandle,
        presentation: &mut dyn Presentation,
    ) -> PoolResult<()> {
        if let Some(bot) = self.pool.get_mut(id) {
            bot.detach_weapon(presentation);
        }
        self.return_to_pool(id, presentation)?;
        self.events.any_despawned.emit(&id);
        debug!(bot = %id, "bot despawned");
        Ok(())
    }

    /// Clears the behavior state, detaches the name tag and indicator and
    /// hands the bot back to the pool, without a despawn notification.
    pub fn return_to_pool(
        &mut self,
        id: EntityHandle,
        presentation: &mut dyn Presentation,
    ) -> PoolResult<()> {
        if let Some(bot) = self.pool.get_mut(id) {
            bot.retire(presentation);
        }
        self.pool.release(id)
    }

    /// Replaces the active state of `id`.
    pub fn change_state(&mut self, id: EntityHandle, state: Option<StateRef>) -> ArenaResult<()> {
        self.get_mut(id)?.change_state(state);
        Ok(())
    }

    /// Forwards an "aggressor entered range" notification to `id`.
    pub fn enter_aggressor_range(
        &mut self,
        id: EntityHandle,
        aggressor: EntityHandle,
    ) -> ArenaResult<()> {
        self.get_mut(id)?.enter_aggressor_range(aggressor);
        Ok(())
    }

    /// Forwards an "aggressor exited range" notification to `id`.
    pub fn exit_aggressor_range(
        &mut self,
        id: EntityHandle,
        aggressor: EntityHandle,
    ) -> ArenaResult<()> {
        self.get_mut(id)?.exit_aggressor_range(aggressor);
        Ok(())
    }

    /// Advances death timers. Returns the bots due for despawn.
    pub fn tick_deaths(&mut self, dt: f32) -> Vec<EntityHandle> {
        let mut due = Vec::new();
        for handle in self.pool.handles() {
            if let Some(bot) = self.pool.get_mut(handle) {
                if bot.tick_death(dt) {
                    due.push(handle);
                }
            }
        }
        due
    }

    /// Looks up a live bot.
    #[must_use]
    pub fn get(&self, id: EntityHandle) -> Option<&Bot> {
        self.pool.get(id)
    }

    /// Looks up a live bot mutably.
    pub fn get_mut(&mut self, id: EntityHandle) -> ArenaResult<&mut Bot> {
        self.pool.get_mut(id).ok_or(ArenaError::BotNotFound(id))
    }

    /// Whether `id` names a live, not-dead bot.
    #[must_use]
    pub fn is_alive(&self, id: EntityHandle) -> bool {
        self.pool.get(id).is_some_and(Damageable::is_alive)
    }

    /// Handles of every bot in the pool's live set (including dead bots
    /// awaiting despawn).
    #[must_use]
    pub fn handles(&self) -> Vec<EntityHandle> {
        self.pool.handles()
    }

    /// Iterates over bots in the live set.
    pub fn iter(&self) -> impl Iterator<Item = (EntityHandle, &Bot)> {
        self.pool.iter()
    }

    /// Bots in the live set.
    #[must_use]
    pub const fn live_count(&self) -> usize {
        self.pool.live_count()
    }

    /// Bots alive right now.
    #[must_use]
    pub fn alive_count(&self) -> usize {
        self.pool.iter().filter(|(_, bot)| !bot.is_dead()).count()
    }

    /// Released bots waiting for reuse.
    #[must_use]
    pub fn pooled_count(&self) -> usize {
        self.pool.free_count(ObjectKind::Bot)
    }

    /// Cross-bot channels.
    #[must_use]
    pub const fn events(&self) -> &BotEvents {
        &self.events
    }

    /// Cross-bot channels, mutably (for subscribing).
    pub fn events_mut(&mut self) -> &mut BotEvents {
        &mut self.events
    }

    /// Tuning applied to newly created bots.
    #[must_use]
    pub const fn tuning(&self) -> &BotTuning {
        &self.tuning
    }
}

/// [`CombatHost`] view over a roster and the presentation layer.
pub struct RosterHost<'a> {
    /// Bots
    pub roster: &'a mut BotRoster,
    /// Scene-side resources and audio
    pub presentation: &'a mut dyn Presentation,
    /// Global speed factor
    pub speed_multiplier: f32,
}

impl CombatHost for RosterHost<'_> {
    fn is_alive(&self, id: EntityHandle) -> bool {
        self.roster.is_alive(id)
    }

    fn speed_multiplier(&self, _id: EntityHandle) -> f32 {
        self.speed_multiplier
    }

    fn hit(&mut self, victim: EntityHandle, killer: EntityHandle) -> bool {
        self.roster.hit(victim, killer, self.presentation)
    }

    fn credit(&mut self, owner: EntityHandle, victim: EntityHandle) {
        self.roster.credit(owner, victim, self.presentation);
    }

    fn play_hit_sound(&mut self, at: Vec3) {
        self.presentation.play_hit_sound(at);
    }
}
