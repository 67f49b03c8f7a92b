//! A growable, never-shrinking circular buffer.
//!
//! Snapshots are written into a fixed arena and addressed logically, newest
//! first: index 0 is always the most recent push. When the buffer is full
//! the oldest slot is overwritten.
//!
//! ## Capacity growth
//!
//! [`RingBuffer::set_capacity`] allocates new slots immediately, but they
//! are absorbed into the live window only when the write pointer, continuing
//! from where it was, walks past the old dense region: the retained count
//! grows exactly when a push lands on the first unused slot. Until then,
//! pushes keep overwriting the oldest retained snapshot, so the historical
//! window stays contiguous instead of tearing at the resize point.

use crate::{Result, StoreError};

/// Hard per-buffer capacity ceiling. Keeps a single token's history to a
/// bounded allocation no matter what the administrative surface is asked for.
pub const MAX_CAPACITY: u16 = 8192;

/// A circular buffer of snapshots with logical newest-first indexing.
#[derive(Clone, Debug)]
pub struct RingBuffer<T> {
    /// Arena of `capacity` slots. Retained elements always occupy the dense
    /// prefix `[0, count)`.
    slots: Vec<T>,
    capacity: u16,
    /// Retained snapshots; never exceeds `capacity`.
    count: u16,
    /// Arena slot of the newest element. Meaningful only when `count > 0`.
    end: u16,
}

impl<T: Clone + Default> RingBuffer<T> {
    /// Create a buffer with the given capacity, clamped to
    /// `[1, MAX_CAPACITY]`.
    pub fn new(capacity: u16) -> Self {
        let capacity = capacity.clamp(1, MAX_CAPACITY);
        Self {
            slots: vec![T::default(); usize::from(capacity)],
            capacity,
            count: 0,
            end: 0,
        }
    }

    /// Number of retained snapshots.
    pub fn count(&self) -> u16 {
        self.count
    }

    /// Current capacity of the arena.
    pub fn capacity(&self) -> u16 {
        self.capacity
    }

    /// Whether no snapshot has been pushed yet.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Arena slot holding logical index `index` (0 = newest).
    ///
    /// The retained window is a contiguous ring segment of `count` slots
    /// ending at `end`; all logical-to-physical translation happens here.
    fn slot(&self, index: u16) -> usize {
        let count = usize::from(self.count);
        (usize::from(self.end) + count - usize::from(index)) % count
    }

    /// Read the snapshot at logical `index`: 0 is the newest, `count - 1`
    /// the oldest retained.
    ///
    /// # Errors
    ///
    /// - [`StoreError::InvalidIndex`] if `index >= count`
    pub fn get(&self, index: u16) -> Result<&T> {
        if index >= self.count {
            return Err(StoreError::InvalidIndex {
                index,
                count: self.count,
            });
        }
        Ok(&self.slots[self.slot(index)])
    }

    /// Append a snapshot, overwriting the oldest retained one when the live
    /// window is full.
    pub fn push(&mut self, item: T) {
        if self.count > 0 {
            self.end = (self.end + 1) % self.capacity;
        }
        self.slots[usize::from(self.end)] = item;
        // The window absorbs a fresh slot only when the write pointer lands
        // exactly on the first unused one; anywhere else it overwrote the
        // oldest element.
        if self.count < self.capacity && self.end == self.count {
            self.count += 1;
        }
    }

    /// Grow the arena to `new_capacity`.
    ///
    /// Retained snapshots are untouched; the added slots join the live
    /// window per the delayed-absorption rule described at module level.
    ///
    /// # Errors
    ///
    /// - [`StoreError::CapacityCannotBeDecreased`] unless strictly larger
    /// - [`StoreError::CapacityTooLarge`] above [`MAX_CAPACITY`]
    pub fn set_capacity(&mut self, new_capacity: u16) -> Result<()> {
        if new_capacity <= self.capacity {
            return Err(StoreError::CapacityCannotBeDecreased {
                current: self.capacity,
                requested: new_capacity,
            });
        }
        if new_capacity > MAX_CAPACITY {
            return Err(StoreError::CapacityTooLarge {
                requested: new_capacity,
                maximum: MAX_CAPACITY,
            });
        }
        self.slots
            .resize(usize::from(new_capacity), T::default());
        self.capacity = new_capacity;
        Ok(())
    }

    /// Read `amount` snapshots starting `offset` back from the newest,
    /// stepping `increment` further back each time. An `increment` of zero
    /// repeats the same snapshot `amount` times.
    ///
    /// # Errors
    ///
    /// - [`StoreError::InsufficientData`] unless the oldest slot the range
    ///   touches is retained
    pub fn get_range(&self, amount: u16, offset: u16, increment: u16) -> Result<Vec<T>> {
        if amount == 0 {
            return Ok(Vec::new());
        }
        let deepest =
            u32::from(offset) + u32::from(amount - 1) * u32::from(increment);
        if u32::from(self.count) <= deepest {
            return Err(StoreError::InsufficientData {
                required: deepest + 1,
                available: self.count,
            });
        }
        let mut out = Vec::with_capacity(usize::from(amount));
        for step in 0..amount {
            let index = offset + step * increment;
            out.push(self.slots[self.slot(index)].clone());
        }
        Ok(out)
    }
}
