//! Run statistics collected from arena events.

use arena_bots::{Arena, ArenaCounts};
use arena_common::EntityHandle;
use serde::Serialize;
use std::cell::Cell;
use std::rc::Rc;

/// Death and despawn counters fed by the arena's event channels.
#[derive(Debug, Default, Clone)]
pub struct Tally {
    deaths: Rc<Cell<u64>>,
    despawns: Rc<Cell<u64>>,
}

impl Tally {
    /// Subscribes fresh counters to `arena`'s bot events.
    pub fn attach(arena: &mut Arena) -> Self {
        let tally = Self::default();

        let deaths = Rc::clone(&tally.deaths);
        arena
            .events_mut()
            .any_died
            .subscribe(move |_: &EntityHandle| deaths.set(deaths.get() + 1));

        let despawns = Rc::clone(&tally.despawns);
        arena
            .events_mut()
            .any_despawned
            .subscribe(move |_: &EntityHandle| despawns.set(despawns.get() + 1));

        tally
    }

    /// Deaths seen so far.
    pub fn deaths(&self) -> u64 {
        self.deaths.get()
    }

    /// Despawns seen so far.
    pub fn despawns(&self) -> u64 {
        self.despawns.get()
    }
}

/// One bot in the final standings.
#[derive(Debug, Clone, Serialize)]
pub struct BotLine {
    /// Pool handle
    pub handle: String,
    /// Display name
    pub name: String,
    /// Level at the end of the run
    pub level: u32,
    /// Kills this life
    pub kills: u32,
    /// Whether it ended the run dead
    pub dead: bool,
}

/// Printed at the end of a run.
#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    /// Ticks simulated
    pub ticks: u64,
    /// Simulated seconds
    pub seconds: f64,
    /// "Any bot died" notifications
    pub deaths: u64,
    /// "Any bot despawned" notifications
    pub despawns: u64,
    /// Population at the end
    pub counts: ArenaCounts,
    /// Bots in play, highest level first
    pub standings: Vec<BotLine>,
}

impl Summary {
    /// Collects the end-of-run summary.
    pub fn collect(arena: &Arena, tally: &Tally, ticks: u64, dt: f32) -> Self {
        let mut standings: Vec<BotLine> = arena
            .roster()
            .iter()
            .map(|(id, bot)| BotLine {
                handle: id.to_string(),
                name: bot.identity().name.clone(),
                level: bot.level(),
                kills: bot.kills(),
                dead: bot.is_dead(),
            })
            .collect();
        standings.sort_by(|a, b| b.level.cmp(&a.level).then(b.kills.cmp(&a.kills)));

        Self {
            ticks,
            seconds: ticks as f64 * f64::from(dt),
            deaths: tally.deaths(),
            despawns: tally.despawns(),
            counts: arena.counts(),
            standings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arena_bots::{ArenaConfig, Bot};

    #[test]
    fn test_tally_counts_kills_and_despawns() {
        let config = ArenaConfig {
            seed: Some(3),
            population: 2,
            respawn: false,
            ..ArenaConfig::default()
        };
        let mut arena = Arena::from_config(config).expect("arena");
        let tally = Tally::attach(&mut arena);
        let ids = arena.populate();
        arena.globals_mut().waiting = true;

        arena.hit(ids[1], ids[0]);
        for _ in 0..200 {
            arena.tick(1.0 / 60.0);
        }

        assert_eq!(tally.deaths(), 1);
        assert_eq!(tally.despawns(), 1);
        assert!(arena.bot(ids[0]).is_some_and(|bot: &Bot| !bot.is_dead()));
    }

    #[test]
    fn test_summary_sorted_by_level() {
        let config = ArenaConfig {
            seed: Some(5),
            population: 4,
            player_level: 20,
            ..ArenaConfig::default()
        };
        let mut arena = Arena::from_config(config).expect("arena");
        let tally = Tally::attach(&mut arena);
        arena.populate();

        let summary = Summary::collect(&arena, &tally, 10, 0.5);
        assert_eq!(summary.seconds, 5.0);
        assert_eq!(summary.standings.len(), 4);
        assert!(summary
            .standings
            .windows(2)
            .all(|pair| pair[0].level >= pair[1].level));

        let json = serde_json::to_string(&summary).expect("serialize");
        assert!(json.contains("\"standings\""));
    }

    #[test]
    fn test_run_from_config_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("arena.toml");
        std::fs::write(&path, "seed = 8\npopulation = 3\nrespawn = false\n").expect("write");

        let config = ArenaConfig::load_from(&path);
        assert_eq!(config.population, 3);
        let mut arena = Arena::from_config(config).expect("arena");
        let tally = Tally::attach(&mut arena);
        arena.populate();
        for _ in 0..60 {
            arena.tick(1.0 / 60.0);
        }

        let summary = Summary::collect(&arena, &tally, 60, 1.0 / 60.0);
        assert_eq!(summary.ticks, 60);
        assert_eq!(summary.counts.alive + summary.counts.dead, 3 - summary.despawns as usize);
    }
}
