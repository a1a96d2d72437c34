//! Free-space index implementation

use std::collections::{BTreeMap, BTreeSet};

/// Ordered index of free slots.
///
/// Also remembers which live records are relocated bodies of redirected
/// records. Those are reachable only through their redirect and must never
/// be handed out as ids of their own.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FreeSpaceIndex {
    /// Slot id (payload offset) → capacity
    by_offset: BTreeMap<u64, u32>,

    /// (capacity, slot id), smallest first
    by_capacity: BTreeSet<(u32, u64)>,

    /// Sum of all capacities in bytes
    total_free: u64,

    /// Header offsets of relocated bodies
    relocated: BTreeSet<u64>,
}

impl FreeSpaceIndex {
    /// Create an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index from (id, capacity) pairs
    pub fn from_slots(slots: impl IntoIterator<Item = (u64, u32)>) -> Self {
        let mut index = Self::new();
        for (id, capacity) in slots {
            index.insert(id, capacity);
        }
        index
    }

    /// Register a free slot, replacing any entry already at `id`.
    ///
    /// Zero-capacity slots cannot host anything and are not recorded.
    /// Returns whether the slot was recorded.
    pub fn insert(&mut self, id: u64, capacity: u32) -> bool {
        self.remove(id);
        if capacity == 0 {
            return false;
        }

        self.by_offset.insert(id, capacity);
        self.by_capacity.insert((capacity, id));
        self.total_free += capacity as u64;
        true
    }

    /// Drop the slot at `id`, returning its capacity
    pub fn remove(&mut self, id: u64) -> Option<u32> {
        let capacity = self.by_offset.remove(&id)?;
        self.by_capacity.remove(&(capacity, id));
        self.total_free -= capacity as u64;
        Some(capacity)
    }

    /// Remove and return the smallest slot with capacity >= `required`
    pub fn take_fit(&mut self, required: u32) -> Option<(u64, u32)> {
        let (capacity, id) = *self.by_capacity.range((required, 0)..).next()?;
        self.remove(id);
        Some((id, capacity))
    }

    /// Capacity of the slot at `id`, if registered
    pub fn get(&self, id: u64) -> Option<u32> {
        self.by_offset.get(&id).copied()
    }

    pub fn contains(&self, id: u64) -> bool {
        self.by_offset.contains_key(&id)
    }

    /// Number of free slots
    pub fn len(&self) -> usize {
        self.by_offset.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_offset.is_empty()
    }

    /// Total reusable bytes
    pub fn total_free(&self) -> u64 {
        self.total_free
    }

    /// Capacity of the largest slot (0 when empty)
    pub fn largest(&self) -> u32 {
        self.by_capacity
            .iter()
            .next_back()
            .map(|(capacity, _)| *capacity)
            .unwrap_or(0)
    }

    /// All slots as (id, capacity), ordered by id
    pub fn slots(&self) -> Vec<(u64, u32)> {
        self.iter().collect()
    }

    /// Iterate slots as (id, capacity), ordered by id
    pub fn iter(&self) -> impl Iterator<Item = (u64, u32)> + '_ {
        self.by_offset.iter().map(|(&id, &capacity)| (id, capacity))
    }

    pub fn clear(&mut self) {
        self.by_offset.clear();
        self.by_capacity.clear();
        self.total_free = 0;
        self.relocated.clear();
    }

    // =========================================================================
    // Relocated Bodies
    // =========================================================================

    /// Record that the live record with its header at `offset` is the body
    /// of a redirect
    pub fn mark_relocated(&mut self, offset: u64) {
        self.relocated.insert(offset);
    }

    /// Forget a relocated body; returns whether it was known
    pub fn unmark_relocated(&mut self, offset: u64) -> bool {
        self.relocated.remove(&offset)
    }

    pub fn is_relocated(&self, offset: u64) -> bool {
        self.relocated.contains(&offset)
    }

    /// Header offsets of relocated bodies, ascending
    pub fn relocated(&self) -> impl Iterator<Item = u64> + '_ {
        self.relocated.iter().copied()
    }
}
