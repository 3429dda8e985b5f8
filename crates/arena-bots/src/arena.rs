//! The arena host: owns every bot and projectile and ticks them.
//!
//! One [`Arena::tick`] runs, in order: death timers and despawns, behavior
//! execution, queued throws, projectile flight and contact resolution, and
//! finally population refill.

use arena_common::geometry::{closest_point_on_segment, UP};
use arena_common::{ArenaError, ArenaResult, EntityHandle, WeaponId};
use glam::Vec3;
use serde::Serialize;
use std::fs;
use tracing::{info, trace, warn};

use crate::behavior::{FireIntent, Sighting, StateContext, StateRef};
use crate::bot::{Bot, SpawnContext};
use crate::catalog::{Catalog, StaticCatalog};
use crate::config::ArenaConfig;
use crate::events::BotEvents;
use crate::lifecycle::{BotRoster, RosterHost};
use crate::projectile::{Contact, Projectiles, Sweep};
use crate::scene::SphereScene;
use crate::steering::DirectionSelector;
use crate::world::{
    Clock, HeadlessPresentation, ObstacleClassifier, PhysicsQuery, PlayerProgress, Presentation,
    SimGlobals,
};

/// Spawn points are drawn from this fraction of the arena when none are
/// configured.
const RANDOM_SPAWN_SPREAD: f32 = 0.8;

/// Snapshot of arena population.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ArenaCounts {
    /// Bots alive
    pub alive: usize,
    /// Bots dead and awaiting despawn
    pub dead: usize,
    /// Bots released and waiting for reuse
    pub pooled: usize,
    /// Projectiles in flight
    pub projectiles: usize,
}

/// Bots, projectiles and their collaborators.
pub struct Arena<W = SphereScene, P = HeadlessPresentation> {
    config: ArenaConfig,
    rng: fastrand::Rng,
    globals: SimGlobals,
    player: PlayerProgress,
    catalog: Box<dyn Catalog>,
    world: W,
    presentation: P,
    roster: BotRoster,
    projectiles: Projectiles,
    selector: DirectionSelector,
    intents: Vec<FireIntent>,
    spawn_cursor: usize,
    ticks: u64,
}

impl Arena<SphereScene, HeadlessPresentation> {
    /// Builds a headless arena from configuration alone.
    ///
    /// The scene comes from the configured obstacles; the catalog from
    /// `catalog_path` if set, else the built-in one.
    pub fn from_config(config: ArenaConfig) -> ArenaResult<Self> {
        let scene = SphereScene::from_specs(config.half_extent, &config.obstacles);
        let catalog = match &config.catalog_path {
            Some(path) => {
                let contents = fs::read_to_string(path)?;
                StaticCatalog::from_toml_str(&contents)?
            },
            None => StaticCatalog::builtin(),
        };
        Ok(Self::new(config, scene, HeadlessPresentation::new(), Box::new(catalog)))
    }
}

impl<W, P> Arena<W, P>
where
    W: PhysicsQuery + ObstacleClassifier,
    P: Presentation,
{
    /// Creates an empty arena. Call [`Arena::populate`] to fill it.
    pub fn new(mut config: ArenaConfig, world: W, presentation: P, catalog: Box<dyn Catalog>) -> Self {
        config.validate();
        let rng = config
            .seed
            .map_or_else(fastrand::Rng::new, fastrand::Rng::with_seed);

        info!(
            population = config.population,
            half_extent = config.half_extent,
            seed = ?config.seed,
            "arena created"
        );

        Self {
            rng,
            globals: SimGlobals {
                speed_multiplier: config.speed_multiplier,
                waiting: false,
            },
            player: PlayerProgress {
                level: config.player_level,
            },
            catalog,
            world,
            presentation,
            roster: BotRoster::new(config.bot),
            projectiles: Projectiles::new(config.projectile),
            selector: DirectionSelector::new(config.steering),
            intents: Vec::new(),
            spawn_cursor: 0,
            ticks: 0,
            config,
        }
    }

    /// Spawns bots until the configured population is in play.
    pub fn populate(&mut self) -> Vec<EntityHandle> {
        let mut spawned = Vec::new();
        while self.roster.live_count() < self.config.population {
            spawned.push(self.spawn_bot());
        }
        spawned
    }

    /// Spawns one bot at the next spawn point.
    pub fn spawn_bot(&mut self) -> EntityHandle {
        let position = self.next_spawn_position();
        self.spawn_bot_at(position)
    }

    /// Spawns one bot at `position`.
    pub fn spawn_bot_at(&mut self, position: Vec3) -> EntityHandle {
        let seed = self.rng.u64(..);
        let mut ctx = SpawnContext {
            catalog: self.catalog.as_ref(),
            player: &self.player,
            presentation: &mut self.presentation,
        };
        self.roster.spawn(position, seed, &mut ctx)
    }

    fn next_spawn_position(&mut self) -> Vec3 {
        if self.config.spawn_points.is_empty() {
            let reach = self.config.half_extent * RANDOM_SPAWN_SPREAD;
            let x = (self.rng.f32() * 2.0 - 1.0) * reach;
            let z = (self.rng.f32() * 2.0 - 1.0) * reach;
            return Vec3::new(x, 0.0, z);
        }
        let index = self.spawn_cursor % self.config.spawn_points.len();
        self.spawn_cursor += 1;
        self.config.spawn_points[index]
    }

    /// Advances the simulation by the clock's step.
    pub fn step(&mut self, clock: &dyn Clock) {
        self.tick(clock.delta_time());
    }

    /// Advances the simulation by `dt` seconds.
    pub fn tick(&mut self, dt: f32) {
        self.ticks += 1;
        trace!(tick = self.ticks, dt, "arena tick");

        for id in self.roster.tick_deaths(dt) {
            if let Err(err) = self.roster.despawn(id, &mut self.presentation) {
                warn!(bot = %id, %err, "despawn failed");
            }
        }

        self.execute_states(dt);
        self.launch_intents();
        self.fly_projectiles(dt);

        if self.config.respawn {
            self.populate();
        }
    }

    fn execute_states(&mut self, dt: f32) {
        let sightings: Vec<Sighting> = self
            .roster
            .iter()
            .filter(|(_, bot)| !bot.is_dead())
            .map(|(id, bot)| Sighting {
                id,
                position: bot.position(),
            })
            .collect();

        let mut ctx = StateContext {
            dt,
            globals: &self.globals,
            physics: &self.world,
            classifier: &self.world,
            selector: &self.selector,
            sightings: &sightings,
            intents: &mut self.intents,
        };

        for id in self.roster.handles() {
            if let Ok(bot) = self.roster.get_mut(id) {
                bot.execute(&mut ctx);
            }
        }
    }

    fn launch_intents(&mut self) {
        for intent in self.intents.drain(..) {
            let Some(bot) = self.roster.get(intent.owner).filter(|bot| !bot.is_dead()) else {
                continue;
            };
            let weapon = bot.identity().weapon.unwrap_or(WeaponId::new(0));
            self.projectiles
                .launch(weapon, intent.owner, intent.position, intent.rotation);
        }
    }

    fn fly_projectiles(&mut self, dt: f32) {
        let bot_radius = self.roster.tuning().radius;
        let launch_height = self.projectiles.tuning().launch_height;
        let mut host = RosterHost {
            roster: &mut self.roster,
            presentation: &mut self.presentation,
            speed_multiplier: self.globals.speed_multiplier,
        };

        for sweep in self.projectiles.advance(dt, &host) {
            let contacts =
                contacts_along(&sweep, &*host.roster, &self.world, bot_radius, launch_height);
            for contact in contacts {
                let outcome = self.projectiles.resolve_contact(sweep.bullet, contact, &mut host);
                if outcome.is_terminal() {
                    break;
                }
            }
        }
    }

    /// Throws the bot's weapon along its current facing.
    pub fn fire(&mut self, owner: EntityHandle) -> ArenaResult<EntityHandle> {
        let bot = self
            .roster
            .get(owner)
            .filter(|bot| !bot.is_dead())
            .ok_or(ArenaError::BotNotFound(owner))?;
        let weapon = bot.identity().weapon.unwrap_or(WeaponId::new(0));
        let (position, rotation) = (bot.position(), bot.body().rotation);
        Ok(self.projectiles.launch(weapon, owner, position, rotation))
    }

    /// Replaces the active state of `id`.
    pub fn change_state(&mut self, id: EntityHandle, state: Option<StateRef>) -> ArenaResult<()> {
        self.roster.change_state(id, state)
    }

    /// Kills `victim`. Returns false if it was already dead or is not live.
    pub fn hit(&mut self, victim: EntityHandle, killer: EntityHandle) -> bool {
        self.roster.hit(victim, killer, &mut self.presentation)
    }

    /// Despawns `id` now, without waiting for its death timer.
    pub fn despawn(&mut self, id: EntityHandle) -> ArenaResult<()> {
        self.roster
            .despawn(id, &mut self.presentation)
            .map_err(ArenaError::from)
    }

    /// Hands `id` back to the pool without a despawn notification.
    pub fn return_to_pool(&mut self, id: EntityHandle) -> ArenaResult<()> {
        self.roster
            .return_to_pool(id, &mut self.presentation)
            .map_err(ArenaError::from)
    }

    /// Tells `id` that `aggressor` came into range.
    pub fn enter_aggressor_range(
        &mut self,
        id: EntityHandle,
        aggressor: EntityHandle,
    ) -> ArenaResult<()> {
        self.roster.enter_aggressor_range(id, aggressor)
    }

    /// Tells `id` that `aggressor` left range.
    pub fn exit_aggressor_range(
        &mut self,
        id: EntityHandle,
        aggressor: EntityHandle,
    ) -> ArenaResult<()> {
        self.roster.exit_aggressor_range(id, aggressor)
    }

    /// Drops every cross-bot subscriber.
    pub fn reset_static_data(&mut self) {
        self.roster.events_mut().reset();
    }

    /// Cross-bot channels, for subscribing.
    pub fn events_mut(&mut self) -> &mut BotEvents {
        self.roster.events_mut()
    }

    /// Looks up a bot.
    #[must_use]
    pub fn bot(&self, id: EntityHandle) -> Option<&Bot> {
        self.roster.get(id)
    }

    /// Looks up a bot mutably.
    pub fn bot_mut(&mut self, id: EntityHandle) -> ArenaResult<&mut Bot> {
        self.roster.get_mut(id)
    }

    /// Every bot.
    #[must_use]
    pub const fn roster(&self) -> &BotRoster {
        &self.roster
    }

    /// Every projectile.
    #[must_use]
    pub const fn projectiles(&self) -> &Projectiles {
        &self.projectiles
    }

    /// Presentation layer.
    #[must_use]
    pub const fn presentation(&self) -> &P {
        &self.presentation
    }

    /// Physical world.
    #[must_use]
    pub const fn world(&self) -> &W {
        &self.world
    }

    /// Process-wide simulation state.
    #[must_use]
    pub const fn globals(&self) -> &SimGlobals {
        &self.globals
    }

    /// Process-wide simulation state, mutably.
    pub fn globals_mut(&mut self) -> &mut SimGlobals {
        &mut self.globals
    }

    /// Player progress, mutably.
    pub fn player_mut(&mut self) -> &mut PlayerProgress {
        &mut self.player
    }

    /// Configuration in use (validated).
    #[must_use]
    pub const fn config(&self) -> &ArenaConfig {
        &self.config
    }

    /// Ticks run so far.
    #[must_use]
    pub const fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Population snapshot.
    #[must_use]
    pub fn counts(&self) -> ArenaCounts {
        let alive = self.roster.alive_count();
        ArenaCounts {
            alive,
            dead: self.roster.live_count() - alive,
            pooled: self.roster.pooled_count(),
            projectiles: self.projectiles.live_count(),
        }
    }
}

/// Everything a bullet's sweep touched this tick, nearest first.
///
/// Living characters are tested against the segment at throwing height;
/// the owner is included and left to contact resolution to ignore.
fn contacts_along<W>(
    sweep: &Sweep,
    roster: &BotRoster,
    world: &W,
    bot_radius: f32,
    launch_height: f32,
) -> Vec<Contact>
where
    W: PhysicsQuery + ObstacleClassifier,
{
    let segment = sweep.to - sweep.from;
    let length = segment.length();
    let reach = sweep.radius + bot_radius;
    let mut found: Vec<(f32, Contact)> = Vec::new();

    for (id, bot) in roster.iter().filter(|(_, bot)| !bot.is_dead()) {
        let center = bot.position() + UP * launch_height;
        let (t, point) = closest_point_on_segment(sweep.from, sweep.to, center);
        if point.distance_squared(center) <= reach * reach {
            found.push((t * length, Contact::Character { id, point }));
        }
    }

    if length > f32::EPSILON {
        for hit in world.probe_all(sweep.from, sweep.radius, segment / length, length) {
            let contact = if world.is_obstacle(hit.collider) {
                Contact::Obstacle {
                    collider: hit.collider,
                    point: hit.point,
                }
            } else {
                Contact::Other {
                    collider: hit.collider,
                }
            };
            found.push((hit.distance, contact));
        }
    }

    found.sort_by(|a, b| a.0.total_cmp(&b.0));
    found.into_iter().map(|(_, contact)| contact).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::ColliderSpec;
    use std::cell::Cell;
    use std::rc::Rc;

    fn quiet_config() -> ArenaConfig {
        ArenaConfig {
            seed: Some(17),
            population: 0,
            respawn: false,
            ..ArenaConfig::default()
        }
    }

    #[test]
    fn test_populate_fills_to_population() {
        let config = ArenaConfig {
            population: 5,
            ..quiet_config()
        };
        let mut arena = Arena::from_config(config).expect("arena");
        assert_eq!(arena.populate().len(), 5);
        assert_eq!(arena.counts().alive, 5);
        assert_eq!(arena.presentation().attached_count(), 15);
    }

    #[test]
    fn test_spawn_points_cycle() {
        let config = ArenaConfig {
            spawn_points: vec![Vec3::X, Vec3::Z],
            ..quiet_config()
        };
        let mut arena = Arena::from_config(config).expect("arena");
        let a = arena.spawn_bot();
        let b = arena.spawn_bot();
        let c = arena.spawn_bot();
        assert_eq!(arena.bot(a).map(Bot::position), Some(Vec3::X));
        assert_eq!(arena.bot(b).map(Bot::position), Some(Vec3::Z));
        assert_eq!(arena.bot(c).map(Bot::position), Some(Vec3::X));
    }

    #[test]
    fn test_waiting_freezes_bots() {
        let mut arena = Arena::from_config(quiet_config()).expect("arena");
        let id = arena.spawn_bot_at(Vec3::ZERO);
        arena.globals_mut().waiting = true;

        for _ in 0..300 {
            arena.tick(1.0 / 60.0);
        }

        assert_eq!(arena.bot(id).map(Bot::position), Some(Vec3::ZERO));
        assert_eq!(arena.bot(id).and_then(|b| b.behavior().name()), Some("idle"));
    }

    #[test]
    fn test_dead_bot_despawns_after_delay() {
        let mut arena = Arena::from_config(quiet_config()).expect("arena");
        let a = arena.spawn_bot_at(Vec3::ZERO);
        let b = arena.spawn_bot_at(Vec3::new(10.0, 0.0, 0.0));
        arena.globals_mut().waiting = true;

        assert!(arena.hit(b, a));
        arena.tick(1.0);
        assert_eq!(arena.counts().dead, 1);
        arena.tick(1.0);
        assert!(arena.bot(b).is_none());
        assert_eq!(arena.counts().pooled, 1);
        assert!(arena.presentation().attached_to(b).is_empty());
    }

    #[test]
    fn test_respawn_refills() {
        let config = ArenaConfig {
            population: 2,
            respawn: true,
            ..quiet_config()
        };
        let mut arena = Arena::from_config(config).expect("arena");
        let ids = arena.populate();
        arena.globals_mut().waiting = true;

        arena.hit(ids[0], ids[1]);
        arena.tick(2.5);

        assert_eq!(arena.counts().alive, 2);
        assert!(arena.bot(ids[0]).is_none());
    }

    #[test]
    fn test_bullet_stops_at_obstacle() {
        let mut config = quiet_config();
        config.obstacles.push(ColliderSpec {
            center: Vec3::new(0.0, 1.0, 3.0),
            radius: 0.5,
            blocking: true,
        });
        let mut arena = Arena::from_config(config).expect("arena");
        let a = arena.spawn_bot_at(Vec3::ZERO);
        arena.globals_mut().waiting = true;
        arena.fire(a).expect("fire");

        for _ in 0..60 {
            arena.tick(1.0 / 60.0);
        }

        assert_eq!(arena.counts().projectiles, 0);
        assert!(arena.bot(a).is_some_and(|bot| !bot.is_dead()));
        assert!(arena.presentation().hit_sounds().is_empty());
    }

    #[test]
    fn test_trigger_zone_does_not_hide_obstacle() {
        let mut config = quiet_config();
        config.obstacles.push(ColliderSpec {
            center: Vec3::ZERO,
            radius: 6.0,
            blocking: false,
        });
        config.obstacles.push(ColliderSpec {
            center: Vec3::new(0.0, 1.0, 2.5),
            radius: 0.5,
            blocking: true,
        });
        let mut arena = Arena::from_config(config).expect("arena");
        let a = arena.spawn_bot_at(Vec3::ZERO);
        let b = arena.spawn_bot_at(Vec3::new(0.0, 0.0, 5.0));
        arena.globals_mut().waiting = true;
        arena.fire(a).expect("fire");

        for _ in 0..120 {
            arena.tick(1.0 / 60.0);
        }

        assert!(arena.bot(b).is_some_and(|bot| !bot.is_dead()));
        assert_eq!(arena.counts().projectiles, 0);
        assert!(arena.presentation().hit_sounds().is_empty());
    }

    #[test]
    fn test_reset_static_data_drops_subscribers() {
        let mut arena = Arena::from_config(quiet_config()).expect("arena");
        let deaths = Rc::new(Cell::new(0));
        {
            let deaths = Rc::clone(&deaths);
            arena
                .events_mut()
                .any_died
                .subscribe(move |_| deaths.set(deaths.get() + 1));
        }
        let a = arena.spawn_bot_at(Vec3::ZERO);
        let b = arena.spawn_bot_at(Vec3::X);

        arena.reset_static_data();
        arena.hit(b, a);

        assert_eq!(deaths.get(), 0);
    }

    #[test]
    fn test_free_running_simulation_is_leak_free() {
        let config = ArenaConfig {
            population: 6,
            respawn: true,
            half_extent: 8.0,
            ..quiet_config()
        };
        let mut arena = Arena::from_config(config).expect("arena");
        arena.populate();

        for _ in 0..3000 {
            arena.tick(1.0 / 30.0);
        }

        let counts = arena.counts();
        assert_eq!(counts.alive + counts.dead, 6);
        assert_eq!(arena.presentation().stray_detaches(), 0);
        for (id, bot) in arena.roster().iter() {
            let attached = arena.presentation().attached_to(id).len();
            let expected = if bot.is_dead() { 2 } else { 3 };
            assert_eq!(attached, expected, "bot {id}");
        }
        assert_eq!(
            arena.presentation().attached_count(),
            counts.alive * 3 + counts.dead * 2
        );
    }
}
