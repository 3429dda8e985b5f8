//! # Arena Bots
//!
//! Autonomous combatants for an arena brawler.
//!
//! This crate provides the bot core and its collaborator interfaces:
//! - Behavior state machine and the idle/patrol/attack states
//! - Obstacle-avoiding direction selection
//! - Movement executor
//! - Spawn, death, despawn and pooling
//! - Projectile flight and contact resolution
//! - Multicast bot events
//! - Resource catalog, configuration, and a reference sphere scene
//! - The `Arena` host that ticks all of the above

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod arena;
pub mod behavior;
pub mod body;
pub mod bot;
pub mod catalog;
pub mod config;
pub mod events;
pub mod identity;
pub mod lifecycle;
pub mod movement;
pub mod pool;
pub mod projectile;
pub mod scene;
pub mod states;
pub mod steering;
pub mod world;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::arena::*;
    pub use crate::behavior::*;
    pub use crate::body::*;
    pub use crate::bot::*;
    pub use crate::catalog::*;
    pub use crate::config::*;
    pub use crate::events::*;
    pub use crate::identity::*;
    pub use crate::lifecycle::*;
    pub use crate::movement::*;
    pub use crate::pool::*;
    pub use crate::projectile::*;
    pub use crate::scene::*;
    pub use crate::states::*;
    pub use crate::steering::*;
    pub use crate::world::*;
}

pub use prelude::*;
