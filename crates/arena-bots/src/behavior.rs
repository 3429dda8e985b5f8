//! Behavior state machine hosted by each bot.
//!
//! A state is a strategy object with `enter`, `execute` and `exit` hooks.
//! The bot holds at most one active state. States are shared through
//! [`StateRef`] so that the host can tell "the same state again" (a no-op)
//! apart from "an equal but distinct state" (a real transition) by pointer
//! identity.
//!
//! States never call back into the host's transition logic. `execute`
//! returns a [`Transition`] and the host applies it after `execute` has
//! returned, so `exit` never runs while the same state is still executing.

use arena_common::EntityHandle;
use glam::{Quat, Vec3};
use std::cell::RefCell;
use std::rc::Rc;

use crate::bot::Bot;
use crate::steering::DirectionSelector;
use crate::world::{ObstacleClassifier, PhysicsQuery, SimGlobals};

/// Shared handle to a behavior state.
pub type StateRef = Rc<RefCell<dyn BehaviorState>>;

/// Wraps a state value into a [`StateRef`].
pub fn state_ref<S: BehaviorState + 'static>(state: S) -> StateRef {
    Rc::new(RefCell::new(state))
}

/// What the host should do after a state has executed.
pub enum Transition {
    /// Keep the current state.
    Stay,
    /// Replace the current state.
    Switch(StateRef),
    /// Leave the bot with no active state.
    Clear,
}

impl std::fmt::Debug for Transition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stay => f.write_str("Stay"),
            Self::Switch(next) => write!(f, "Switch({})", next.borrow().name()),
            Self::Clear => f.write_str("Clear"),
        }
    }
}

/// Another living character visible to a bot this tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sighting {
    /// Character handle
    pub id: EntityHandle,
    /// Position at the start of the tick
    pub position: Vec3,
}

/// A request to throw a projectile, produced by a state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FireIntent {
    /// Who throws
    pub owner: EntityHandle,
    /// Launch position (feet level)
    pub position: Vec3,
    /// Facing at launch
    pub rotation: Quat,
}

/// Everything a state may read or request during `execute`.
pub struct StateContext<'a> {
    /// Frame time in seconds
    pub dt: f32,
    /// Process-wide simulation state
    pub globals: &'a SimGlobals,
    /// Physics queries
    pub physics: &'a dyn PhysicsQuery,
    /// Obstacle classification
    pub classifier: &'a dyn ObstacleClassifier,
    /// Obstacle-avoiding direction picker
    pub selector: &'a DirectionSelector,
    /// Living characters other than the executing bot
    pub sightings: &'a [Sighting],
    /// Projectile requests collected this tick
    pub intents: &'a mut Vec<FireIntent>,
}

impl StateContext<'_> {
    /// Nearest sighting within `range` of `position`, ignoring `exclude`.
    #[must_use]
    pub fn nearest_enemy(&self, position: Vec3, range: f32, exclude: EntityHandle)
        -> Option<Sighting> {
        self.sightings
            .iter()
            .filter(|s| s.id != exclude)
            .map(|s| (s, s.position.distance_squared(position)))
            .filter(|(_, d2)| *d2 <= range * range)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(s, _)| *s)
    }

    /// Current sighting of `id`, if still alive and visible.
    #[must_use]
    pub fn find(&self, id: EntityHandle) -> Option<Sighting> {
        self.sightings.iter().find(|s| s.id == id).copied()
    }
}

/// One phase of bot decision-making.
pub trait BehaviorState {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Called once when the state becomes active.
    fn enter(&mut self, _bot: &mut Bot) {}

    /// Called once per tick while active and the bot is runnable.
    fn execute(&mut self, bot: &mut Bot, ctx: &mut StateContext<'_>) -> Transition;

    /// Called once when the state stops being active.
    fn exit(&mut self, _bot: &mut Bot) {}
}

/// The host's single active-state slot.
#[derive(Default)]
pub struct BehaviorSlot {
    current: Option<StateRef>,
}

impl std::fmt::Debug for BehaviorSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BehaviorSlot")
            .field("current", &self.name())
            .finish()
    }
}

impl BehaviorSlot {
    /// Whether `candidate` is the very state already held (or both are empty).
    #[must_use]
    pub fn holds(&self, candidate: Option<&StateRef>) -> bool {
        match (&self.current, candidate) {
            (Some(current), Some(candidate)) => Rc::ptr_eq(current, candidate),
            (None, None) => true,
            _ => false,
        }
    }

    /// Whether a state is active.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.current.is_some()
    }

    /// Name of the active state. `None` while it is mid-execution.
    #[must_use]
    pub fn name(&self) -> Option<&'static str> {
        self.current
            .as_ref()
            .and_then(|s| s.try_borrow().ok().map(|s| s.name()))
    }

    /// Clone of the active state handle.
    #[must_use]
    pub fn current(&self) -> Option<StateRef> {
        self.current.clone()
    }

    pub(crate) fn take(&mut self) -> Option<StateRef> {
        self.current.take()
    }

    pub(crate) fn set(&mut self, state: Option<StateRef>) {
        self.current = state;
    }
}
