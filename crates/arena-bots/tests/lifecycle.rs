//! End-to-end bot lifecycle scenarios driven through the arena host.

use arena_bots::prelude::*;
use arena_common::EntityHandle;
use glam::Vec3;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

const DT: f32 = 1.0 / 60.0;

/// Arena with bots frozen in place so only projectiles move.
fn frozen_arena() -> Arena {
    let config = ArenaConfig {
        seed: Some(2024),
        population: 0,
        respawn: false,
        ..ArenaConfig::default()
    };
    let mut arena = Arena::from_config(config).expect("arena");
    arena.globals_mut().waiting = true;
    arena
}

fn counter() -> (Rc<Cell<u32>>, impl FnMut(&EntityHandle) + 'static) {
    let count = Rc::new(Cell::new(0));
    let handle = Rc::clone(&count);
    (count, move |_: &EntityHandle| handle.set(handle.get() + 1))
}

fn weapon_of(arena: &Arena, id: EntityHandle) -> arena_common::WeaponId {
    arena
        .bot(id)
        .and_then(|bot| bot.identity().weapon)
        .expect("armed bot")
}

/// A at the origin facing +Z, B three units ahead.
fn duel(arena: &mut Arena) -> (EntityHandle, EntityHandle) {
    let a = arena.spawn_bot_at(Vec3::ZERO);
    let b = arena.spawn_bot_at(Vec3::new(0.0, 0.0, 3.0));
    (a, b)
}

#[test]
fn test_projectile_kill_credits_owner_and_pools_bullet() {
    let mut arena = frozen_arena();
    let (died, on_died) = counter();
    arena.events_mut().any_died.subscribe(on_died);
    let (a, b) = duel(&mut arena);
    let level_before = arena.bot(a).map(Bot::level).expect("live");
    let weapon = weapon_of(&arena, a);

    arena.fire(a).expect("fire");
    for _ in 0..60 {
        arena.tick(DT);
    }

    assert!(arena.bot(b).is_some_and(Bot::is_dead));
    assert_eq!(arena.bot(b).and_then(Bot::killer), Some(a));
    assert_eq!(died.get(), 1);

    let owner = arena.bot(a).expect("live");
    assert!(!owner.is_dead());
    assert_eq!(owner.kills(), 1);
    assert_eq!(owner.level(), level_before + 1);

    assert_eq!(arena.projectiles().live_count(), 0);
    assert_eq!(arena.projectiles().free_count(weapon), 1);
    assert_eq!(arena.presentation().hit_sounds().len(), 1);
}

#[test]
fn test_dead_owner_destroys_bullet() {
    let mut arena = frozen_arena();
    let (a, b) = duel(&mut arena);
    let weapon = weapon_of(&arena, a);

    arena.fire(a).expect("fire");
    assert!(arena.hit(a, b));
    for _ in 0..60 {
        arena.tick(DT);
    }

    assert!(arena.bot(b).is_some_and(Bot::is_dead));
    assert_eq!(arena.bot(a).map(Bot::kills), Some(0));
    assert_eq!(arena.projectiles().live_count(), 0);
    assert_eq!(arena.projectiles().free_count(weapon), 0);
}

#[test]
fn test_despawned_owner_destroys_bullet() {
    let mut arena = frozen_arena();
    let (a, b) = duel(&mut arena);
    let weapon = weapon_of(&arena, a);

    arena.fire(a).expect("fire");
    arena.despawn(a).expect("despawn");
    for _ in 0..60 {
        arena.tick(DT);
    }

    assert!(arena.bot(b).is_some_and(Bot::is_dead));
    assert_eq!(arena.projectiles().free_count(weapon), 0);
    assert_eq!(arena.projectiles().live_count(), 0);
}

#[test]
fn test_own_bullet_never_hurts_owner() {
    let mut arena = frozen_arena();
    let a = arena.spawn_bot_at(Vec3::ZERO);

    let bullet = arena.fire(a).expect("fire");
    for _ in 0..10 {
        arena.tick(DT);
    }

    assert!(arena.bot(a).is_some_and(|bot| !bot.is_dead()));
    assert!(arena.projectiles().get(bullet).is_some());
    assert!(arena.presentation().hit_sounds().is_empty());
}

#[test]
fn test_second_hit_does_not_renotify() {
    let mut arena = frozen_arena();
    let (died, on_died) = counter();
    arena.events_mut().any_died.subscribe(on_died);
    let (a, b) = duel(&mut arena);

    assert!(arena.hit(b, a));
    assert!(!arena.hit(b, a));
    assert_eq!(died.get(), 1);
}

#[test]
fn test_despawn_releases_everything_once() {
    let mut arena = frozen_arena();
    let (despawned, on_despawned) = counter();
    arena.events_mut().any_despawned.subscribe(on_despawned);
    let (a, b) = duel(&mut arena);

    assert_eq!(arena.presentation().attached_to(b).len(), 3);
    arena.hit(b, a);
    assert_eq!(arena.presentation().attached_to(b).len(), 2);

    let delay = arena.config().bot.despawn_delay;
    let ticks = (delay / DT).ceil() as usize + 2;
    for _ in 0..ticks {
        arena.tick(DT);
    }

    assert!(arena.bot(b).is_none());
    assert!(arena.presentation().attached_to(b).is_empty());
    assert_eq!(arena.presentation().stray_detaches(), 0);
    assert_eq!(despawned.get(), 1);
    assert_eq!(arena.presentation().attached_to(a).len(), 3);
}

#[test]
fn test_return_to_pool_skips_despawn_notification() {
    let mut arena = frozen_arena();
    let (despawned, on_despawned) = counter();
    arena.events_mut().any_despawned.subscribe(on_despawned);
    let a = arena.spawn_bot_at(Vec3::ZERO);

    arena.return_to_pool(a).expect("release");
    assert_eq!(despawned.get(), 0);
    assert_eq!(arena.counts().pooled, 1);

    let again = arena.spawn_bot_at(Vec3::ONE);
    assert_eq!(again.index(), a.index());
    assert_eq!(arena.presentation().attached_count(), 3);
}

/// Logs enter/exit calls.
struct Recorder {
    log: Rc<RefCell<Vec<&'static str>>>,
}

impl BehaviorState for Recorder {
    fn name(&self) -> &'static str {
        "recorder"
    }

    fn enter(&mut self, _bot: &mut Bot) {
        self.log.borrow_mut().push("enter");
    }

    fn execute(&mut self, _bot: &mut Bot, _ctx: &mut StateContext<'_>) -> Transition {
        Transition::Stay
    }

    fn exit(&mut self, _bot: &mut Bot) {
        self.log.borrow_mut().push("exit");
    }
}

#[test]
fn test_change_state_to_same_instance_once() {
    let mut arena = frozen_arena();
    let a = arena.spawn_bot_at(Vec3::ZERO);
    let log = Rc::new(RefCell::new(Vec::new()));
    let state = state_ref(Recorder {
        log: Rc::clone(&log),
    });

    arena.change_state(a, Some(Rc::clone(&state))).expect("live");
    arena.change_state(a, Some(Rc::clone(&state))).expect("live");
    assert_eq!(*log.borrow(), vec!["enter"]);

    arena.change_state(a, None).expect("live");
    assert_eq!(*log.borrow(), vec!["enter", "exit"]);
}

#[test]
fn test_death_clears_state_without_entering_another() {
    let mut arena = frozen_arena();
    let (a, b) = duel(&mut arena);
    let log = Rc::new(RefCell::new(Vec::new()));
    arena
        .change_state(
            b,
            Some(state_ref(Recorder {
                log: Rc::clone(&log),
            })),
        )
        .expect("live");

    arena.hit(b, a);

    assert_eq!(*log.borrow(), vec!["enter", "exit"]);
    assert!(!arena.bot(b).expect("dead but live").behavior().is_active());
}

#[test]
fn test_panicking_subscriber_does_not_block_others() {
    let mut arena = frozen_arena();
    arena
        .events_mut()
        .any_died
        .subscribe(|_| panic!("subscriber failure"));
    let (died, on_died) = counter();
    arena.events_mut().any_died.subscribe(on_died);
    let (a, b) = duel(&mut arena);

    arena.hit(b, a);
    assert_eq!(died.get(), 1);
}

/// Logs enter/exit calls with the handle of the bot they ran on.
struct HandleRecorder {
    log: Rc<RefCell<Vec<(&'static str, EntityHandle)>>>,
}

impl BehaviorState for HandleRecorder {
    fn name(&self) -> &'static str {
        "handle-recorder"
    }

    fn enter(&mut self, bot: &mut Bot) {
        self.log.borrow_mut().push(("enter", bot.id()));
    }

    fn execute(&mut self, _bot: &mut Bot, _ctx: &mut StateContext<'_>) -> Transition {
        Transition::Stay
    }

    fn exit(&mut self, bot: &mut Bot) {
        self.log.borrow_mut().push(("exit", bot.id()));
    }
}

#[test]
fn test_despawning_live_bot_exits_state_under_old_handle() {
    let mut arena = frozen_arena();
    let a = arena.spawn_bot_at(Vec3::ZERO);
    let log = Rc::new(RefCell::new(Vec::new()));
    arena
        .change_state(
            a,
            Some(state_ref(HandleRecorder {
                log: Rc::clone(&log),
            })),
        )
        .expect("live");

    arena.despawn(a).expect("despawn");
    assert_eq!(*log.borrow(), vec![("enter", a), ("exit", a)]);

    let again = arena.spawn_bot_at(Vec3::ONE);
    assert_eq!(again.index(), a.index());
    assert_eq!(*log.borrow(), vec![("enter", a), ("exit", a)]);
    assert_eq!(
        arena.bot(again).and_then(|bot| bot.behavior().name()),
        Some("idle")
    );
}

#[test]
fn test_return_to_pool_exits_state_of_live_bot() {
    let mut arena = frozen_arena();
    let a = arena.spawn_bot_at(Vec3::ZERO);
    let log = Rc::new(RefCell::new(Vec::new()));
    arena
        .change_state(
            a,
            Some(state_ref(HandleRecorder {
                log: Rc::clone(&log),
            })),
        )
        .expect("live");

    arena.return_to_pool(a).expect("release");
    assert_eq!(*log.borrow(), vec![("enter", a), ("exit", a)]);

    arena.spawn_bot_at(Vec3::ONE);
    assert_eq!(log.borrow().len(), 2);
}
