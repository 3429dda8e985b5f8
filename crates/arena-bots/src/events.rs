//! Multicast notification channels.
//!
//! Channels are synchronous and fire-and-forget: `emit` calls every
//! subscriber in subscription order and returns nothing to the emitter but
//! a delivery count. A subscriber that panics is logged and skipped; the
//! remaining subscribers still run.

use arena_common::EntityHandle;
use std::panic::{self, AssertUnwindSafe};
use tracing::warn;

/// Identifies a subscription so it can be removed later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Handler<T> = Box<dyn FnMut(&T)>;

/// A subscriber list for one kind of notification.
pub struct Channel<T> {
    name: &'static str,
    subscribers: Vec<(SubscriptionId, Handler<T>)>,
    next_id: u64,
}

impl<T> std::fmt::Debug for Channel<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Channel")
            .field("name", &self.name)
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

impl<T> Channel<T> {
    /// Creates an empty channel. `name` is only used in logs.
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            subscribers: Vec::new(),
            next_id: 0,
        }
    }

    /// Adds a subscriber.
    pub fn subscribe(&mut self, handler: impl FnMut(&T) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscribers.push((id, Box::new(handler)));
        id
    }

    /// Removes a subscriber. Returns false if it was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sub, _)| *sub != id);
        self.subscribers.len() != before
    }

    /// Notifies every subscriber. Returns how many completed normally.
    pub fn emit(&mut self, payload: &T) -> usize {
        let mut delivered = 0;
        for (id, handler) in &mut self.subscribers {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| handler(payload)));
            if outcome.is_ok() {
                delivered += 1;
            } else {
                warn!(channel = self.name, subscription = id.0, "subscriber panicked");
            }
        }
        delivered
    }

    /// Drops every subscriber.
    pub fn clear(&mut self) {
        self.subscribers.clear();
    }

    /// Number of subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Channel name used in logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }
}

/// Cross-agent notifications raised by every bot.
///
/// The payload is the handle of the bot that raised the notification.
#[derive(Debug)]
pub struct BotEvents {
    /// Raised once when a bot dies
    pub any_died: Channel<EntityHandle>,
    /// Raised once when a bot is despawned
    pub any_despawned: Channel<EntityHandle>,
}

impl Default for BotEvents {
    fn default() -> Self {
        Self::new()
    }
}

impl BotEvents {
    /// Creates the channels with no subscribers.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            any_died: Channel::new("any_bot_died"),
            any_despawned: Channel::new("any_bot_despawned"),
        }
    }

    /// Drops all subscribers. Called when a game session is reset so no
    /// handler from the previous session keeps firing.
    pub fn reset(&mut self) {
        self.any_died.clear();
        self.any_despawned.clear();
    }
}
