//! Object pool keyed by object kind.
//!
//! The pool is a generational arena. Released instances stay in their slot
//! and are queued on the free list of their [`ObjectKind`]; the next
//! `acquire` of the same kind hands the same instance back under a new
//! generation. Destroyed instances are dropped and their slot is reused
//! for fresh allocations of any kind.
//!
//! Transient motion (velocity, angular velocity) is cleared here, on
//! release, and nowhere else.

use ahash::AHashMap;
use arena_common::{ArenaError, EntityHandle, ObjectKind};
use thiserror::Error;
use tracing::{trace, warn};

use crate::body::Body;

/// Error types for pool operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PoolError {
    /// The handle was already released or destroyed
    #[error("Handle {0} is not live (double release or stale handle)")]
    NotLive(EntityHandle),
    /// The handle was never issued by this pool
    #[error("Handle {0} does not belong to this pool")]
    Unknown(EntityHandle),
}

impl From<PoolError> for ArenaError {
    fn from(err: PoolError) -> Self {
        Self::Pool(err.to_string())
    }
}

/// Result type for pool operations.
pub type PoolResult<T> = Result<T, PoolError>;

/// Objects that can live in a [`Pool`].
pub trait Poolable {
    /// Kind used to pick the free list.
    fn kind(&self) -> ObjectKind;

    /// Rigid body whose transient motion is cleared on release.
    fn body_mut(&mut self) -> &mut Body;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlotState {
    Live,
    Free,
    Destroyed,
}

#[derive(Debug)]
struct Slot<T> {
    value: Option<T>,
    kind: ObjectKind,
    generation: u32,
    state: SlotState,
}

/// Reuse registry for pooled objects.
#[derive(Debug)]
pub struct Pool<T> {
    slots: Vec<Slot<T>>,
    free: AHashMap<ObjectKind, Vec<u32>>,
    vacant: Vec<u32>,
    live: usize,
}

impl<T> Default for Pool<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Pool<T> {
    /// Creates an empty pool.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: AHashMap::new(),
            vacant: Vec::new(),
            live: 0,
        }
    }

    fn live_slot(&self, handle: EntityHandle) -> Option<&Slot<T>> {
        self.slots
            .get(handle.index() as usize)
            .filter(|slot| slot.state == SlotState::Live && slot.generation == handle.generation())
    }

    /// Returns the live instance behind `handle`.
    #[must_use]
    pub fn get(&self, handle: EntityHandle) -> Option<&T> {
        self.live_slot(handle).and_then(|slot| slot.value.as_ref())
    }

    /// Returns the live instance behind `handle` mutably.
    pub fn get_mut(&mut self, handle: EntityHandle) -> Option<&mut T> {
        self.slots
            .get_mut(handle.index() as usize)
            .filter(|slot| slot.state == SlotState::Live && slot.generation == handle.generation())
            .and_then(|slot| slot.value.as_mut())
    }

    /// Whether `handle` names a live instance.
    #[must_use]
    pub fn is_live(&self, handle: EntityHandle) -> bool {
        self.live_slot(handle).is_some()
    }

    /// Permanently drops the instance behind `handle`. It is never recycled.
    pub fn destroy(&mut self, handle: EntityHandle) -> PoolResult<()> {
        self.check_live(handle)?;
        let slot = &mut self.slots[handle.index() as usize];
        slot.value = None;
        slot.state = SlotState::Destroyed;
        self.vacant.push(handle.index());
        self.live -= 1;
        trace!(%handle, "destroyed pooled instance");
        Ok(())
    }

    fn check_live(&self, handle: EntityHandle) -> PoolResult<()> {
        let Some(slot) = self.slots.get(handle.index() as usize) else {
            warn!(%handle, "handle does not belong to this pool");
            return Err(PoolError::Unknown(handle));
        };
        let live = slot.state == SlotState::Live && slot.generation == handle.generation();
        debug_assert!(live, "pool handle {handle} released twice or stale");
        if live {
            Ok(())
        } else {
            warn!(%handle, "ignoring release of a handle that is not live");
            Err(PoolError::NotLive(handle))
        }
    }

    /// Live handles, in slot order.
    #[must_use]
    pub fn handles(&self) -> Vec<EntityHandle> {
        self.iter().map(|(handle, _)| handle).collect()
    }

    /// Iterates over live instances.
    pub fn iter(&self) -> impl Iterator<Item = (EntityHandle, &T)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            if slot.state != SlotState::Live {
                return None;
            }
            let handle = EntityHandle::new(index as u32, slot.generation);
            slot.value.as_ref().map(|value| (handle, value))
        })
    }

    /// Number of live instances.
    #[must_use]
    pub const fn live_count(&self) -> usize {
        self.live
    }

    /// Number of released instances waiting for reuse under `kind`.
    #[must_use]
    pub fn free_count(&self, kind: ObjectKind) -> usize {
        self.free.get(&kind).map_or(0, Vec::len)
    }
}

impl<T: Poolable> Pool<T> {
    /// Returns a ready-to-use instance of `kind`, recycled if one is free.
    ///
    /// `make` is only called when no released instance of this kind exists.
    pub fn acquire(&mut self, kind: ObjectKind, make: impl FnOnce() -> T) -> EntityHandle {
        self.live += 1;

        if let Some(index) = self.free.get_mut(&kind).and_then(Vec::pop) {
            let slot = &mut self.slots[index as usize];
            slot.generation = slot.generation.wrapping_add(1);
            slot.state = SlotState::Live;
            trace!(?kind, index, "recycled pooled instance");
            return EntityHandle::new(index, slot.generation);
        }

        if let Some(index) = self.vacant.pop() {
            let slot = &mut self.slots[index as usize];
            slot.value = Some(Self::make_checked(kind, make));
            slot.kind = kind;
            slot.generation = slot.generation.wrapping_add(1);
            slot.state = SlotState::Live;
            trace!(?kind, index, "allocated instance in vacant slot");
            return EntityHandle::new(index, slot.generation);
        }

        let index = u32::try_from(self.slots.len()).unwrap_or(u32::MAX - 1);
        self.slots.push(Slot {
            value: Some(Self::make_checked(kind, make)),
            kind,
            generation: 0,
            state: SlotState::Live,
        });
        trace!(?kind, index, "allocated new instance");
        EntityHandle::new(index, 0)
    }

    fn make_checked(kind: ObjectKind, make: impl FnOnce() -> T) -> T {
        let value = make();
        debug_assert_eq!(value.kind(), kind, "pool factory produced the wrong kind");
        value
    }

    /// Hands the instance back for reuse, clearing its transient motion.
    ///
    /// Releasing a handle that is not live is a programming error: it
    /// asserts in debug builds and is a logged no-op in release builds.
    pub fn release(&mut self, handle: EntityHandle) -> PoolResult<()> {
        self.check_live(handle)?;
        let slot = &mut self.slots[handle.index() as usize];
        if let Some(value) = slot.value.as_mut() {
            value.body_mut().clear_motion();
        }
        slot.state = SlotState::Free;
        self.free.entry(slot.kind).or_default().push(handle.index());
        self.live -= 1;
        trace!(%handle, kind = ?slot.kind, "released to pool");
        Ok(())
    }
}
