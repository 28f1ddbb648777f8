//! Slot arena for ID-indexed node storage with stable handles.
//!
//! The [`SlotArena`] provides O(1) insertion, lookup, and removal by opaque
//! [`ArenaId`] keys. Removal leaves a vacant slot instead of shifting later
//! items, so an ID never silently starts referring to a different item: a
//! stale ID simply resolves to `None`.

use serde::{Deserialize, Serialize};
use std::marker::PhantomData;

/// Trait for opaque ID types used as arena keys.
///
/// Implementors must provide a bijection between `u32` indices and the ID type.
pub trait ArenaId: Copy {
    /// Creates an ID from a raw `u32` index.
    fn from_raw(index: u32) -> Self;

    /// Returns the raw `u32` index.
    fn as_raw(self) -> u32;
}

/// A dense, ID-indexed container whose slots may be vacated.
///
/// Iteration visits occupied slots in allocation order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SlotArena<I: ArenaId, T> {
    slots: Vec<Option<T>>,
    #[serde(skip)]
    _marker: PhantomData<I>,
}

impl<I: ArenaId, T> Default for SlotArena<I, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: ArenaId, T> SlotArena<I, T> {
    /// Creates a new, empty arena.
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            _marker: PhantomData,
        }
    }

    /// Allocates a new item in the arena and returns its ID.
    pub fn alloc(&mut self, item: T) -> I {
        let id = I::from_raw(self.slots.len() as u32);
        self.slots.push(Some(item));
        id
    }

    /// Returns a reference to the item with the given ID, if it is live.
    pub fn get(&self, id: I) -> Option<&T> {
        self.slots.get(id.as_raw() as usize)?.as_ref()
    }

    /// Returns a mutable reference to the item with the given ID, if it is live.
    pub fn get_mut(&mut self, id: I) -> Option<&mut T> {
        self.slots.get_mut(id.as_raw() as usize)?.as_mut()
    }

    /// Returns true if the ID refers to a live item.
    pub fn contains(&self, id: I) -> bool {
        self.get(id).is_some()
    }

    /// Vacates the slot for `id`, returning the removed item.
    pub fn remove(&mut self, id: I) -> Option<T> {
        self.slots.get_mut(id.as_raw() as usize)?.take()
    }

    /// Returns the number of live items.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Returns `true` if the arena contains no live items.
    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(|s| s.is_none())
    }

    /// Returns the number of slots ever allocated, live or vacant.
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Iterates over `(ID, &T)` pairs of live items in allocation order.
    pub fn iter(&self) -> impl Iterator<Item = (I, &T)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|item| (I::from_raw(i as u32), item)))
    }

    /// Iterates over `(ID, &mut T)` pairs of live items in allocation order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (I, &mut T)> {
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_mut().map(|item| (I::from_raw(i as u32), item)))
    }

    /// Iterates over references to live items in allocation order.
    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.slots.iter().flatten()
    }

    /// Iterates over mutable references to live items in allocation order.
    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.slots.iter_mut().flatten()
    }
}
