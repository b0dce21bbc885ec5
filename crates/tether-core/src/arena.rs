//! Generational arena for actors
//!
//! Handles are weak: holding an [`ActorId`] never keeps an actor alive, and a handle to a
//! removed actor stops resolving even after its slot is reused.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A generational actor handle. Compact u32 index + generation.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActorId {
    index: u32,
    generation: u32,
}

impl ActorId {
    /// Create a handle from raw parts (mainly for tests and wire decoding)
    pub fn from_raw(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// The slot index of this actor
    pub fn index(&self) -> u32 {
        self.index
    }

    /// The generation of this actor (incremented on slot reuse)
    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Pack into a non-zero integer, leaving 0 free to mean "no actor"
    pub fn to_bits(self) -> u128 {
        ((u128::from(self.generation) << 32) | u128::from(self.index)) + 1
    }

    /// Inverse of [`ActorId::to_bits`]
    pub fn from_bits(bits: u128) -> Option<Self> {
        if bits == 0 || bits > (u128::from(u64::MAX)) + 1 {
            return None;
        }
        let raw = bits - 1;
        Some(Self {
            index: (raw & 0xFFFF_FFFF) as u32,
            generation: ((raw >> 32) & 0xFFFF_FFFF) as u32,
        })
    }
}

impl fmt::Debug for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ActorId({}v{})", self.index, self.generation)
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

/// Errors returned by arena operations that require a live handle
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArenaError {
    #[error("actor {0} is not alive")]
    NotAlive(ActorId),

    #[error("slot for actor {0} is already occupied")]
    Occupied(ActorId),
}

struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

/// Slot storage that hands out generational [`ActorId`]s.
pub struct Arena<T> {
    slots: Vec<Slot<T>>,
    free_list: Vec<u32>,
    len: usize,
}

impl<T> Arena<T> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free_list: Vec::new(),
            len: 0,
        }
    }

    /// Insert a value, reusing a freed slot if available.
    pub fn insert(&mut self, value: T) -> ActorId {
        self.len += 1;
        if let Some(index) = self.free_list.pop() {
            let slot = &mut self.slots[index as usize];
            slot.value = Some(value);
            ActorId {
                index,
                generation: slot.generation,
            }
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                value: Some(value),
            });
            ActorId {
                index,
                generation: 0,
            }
        }
    }

    /// Insert a value under a handle allocated elsewhere, e.g. by a remote authority.
    ///
    /// Fails if the slot currently holds a live value.
    pub fn insert_at(&mut self, id: ActorId, value: T) -> Result<(), ArenaError> {
        let index = id.index as usize;
        while self.slots.len() <= index {
            let free = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                value: None,
            });
            if free != id.index {
                self.free_list.push(free);
            }
        }

        let slot = &mut self.slots[index];
        if slot.value.is_some() {
            return Err(ArenaError::Occupied(id));
        }
        slot.generation = id.generation;
        slot.value = Some(value);
        self.free_list.retain(|free| *free != id.index);
        self.len += 1;
        Ok(())
    }

    /// Remove a value. Returns it if the handle was alive.
    pub fn remove(&mut self, id: ActorId) -> Option<T> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        let value = slot.value.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free_list.push(id.index);
        self.len -= 1;
        Some(value)
    }

    /// Check if a handle still refers to a live value.
    pub fn contains(&self, id: ActorId) -> bool {
        self.get(id).is_some()
    }

    pub fn get(&self, id: ActorId) -> Option<&T> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.value.as_ref())
    }

    pub fn get_mut(&mut self, id: ActorId) -> Option<&mut T> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.value.as_mut())
    }

    /// Like [`Arena::get_mut`] but reports stale handles as an error
    pub fn try_get_mut(&mut self, id: ActorId) -> Result<&mut T, ArenaError> {
        self.get_mut(id).ok_or(ArenaError::NotAlive(id))
    }

    /// Iterate live values with their handles, in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (ActorId, &T)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.value.as_ref().map(|value| {
                (
                    ActorId {
                        index: index as u32,
                        generation: slot.generation,
                    },
                    value,
                )
            })
        })
    }

    /// Iterate live values mutably, in slot order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (ActorId, &mut T)> {
        self.slots.iter_mut().enumerate().filter_map(|(index, slot)| {
            let generation = slot.generation;
            slot.value.as_mut().map(|value| {
                (
                    ActorId {
                        index: index as u32,
                        generation,
                    },
                    value,
                )
            })
        })
    }

    /// Number of live values.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_sequential() {
        let mut arena = Arena::new();
        let a = arena.insert("a");
        let b = arena.insert("b");
        assert_eq!(a.index(), 0);
        assert_eq!(b.index(), 1);
        assert_eq!(arena.len(), 2);
        assert_eq!(arena.get(b), Some(&"b"));
    }

    #[test]
    fn stale_handle_does_not_resolve_after_reuse() {
        let mut arena = Arena::new();
        let first = arena.insert(1);
        assert_eq!(arena.remove(first), Some(1));
        let reused = arena.insert(2);
        assert_eq!(reused.index(), first.index());
        assert_ne!(reused, first);
        assert!(!arena.contains(first));
        assert_eq!(arena.get(reused), Some(&2));
        assert_eq!(arena.try_get_mut(first), Err(ArenaError::NotAlive(first)));
    }

    #[test]
    fn double_remove_fails() {
        let mut arena = Arena::new();
        let id = arena.insert(());
        assert!(arena.remove(id).is_some());
        assert!(arena.remove(id).is_none());
        assert!(arena.is_empty());
    }

    #[test]
    fn bits_round_trip() {
        let id = ActorId::from_raw(7, 3);
        assert_ne!(id.to_bits(), 0);
        assert_eq!(ActorId::from_bits(id.to_bits()), Some(id));
        assert_eq!(ActorId::from_bits(0), None);
    }

    #[test]
    fn insert_at_mirrors_remote_handles() {
        let mut arena = Arena::new();
        let remote = ActorId::from_raw(3, 2);
        arena.insert_at(remote, "mirrored").unwrap();
        assert_eq!(arena.get(remote), Some(&"mirrored"));
        assert_eq!(arena.len(), 1);
        assert_eq!(
            arena.insert_at(remote, "again"),
            Err(ArenaError::Occupied(remote))
        );

        // Gaps left below the mirrored slot are reused by local inserts.
        let local = arena.insert("local");
        assert!(local.index() < 3);
    }

    #[test]
    fn iter_skips_removed() {
        let mut arena = Arena::new();
        let a = arena.insert('a');
        let b = arena.insert('b');
        arena.remove(a);
        let live: Vec<_> = arena.iter().collect();
        assert_eq!(live, vec![(b, &'b')]);
    }
}
