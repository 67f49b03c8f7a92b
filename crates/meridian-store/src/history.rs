//! Per-token history keyed on top of [`RingBuffer`].
//!
//! One buffer per token, created lazily at the store's default capacity on
//! the first push. The store is passed by reference into every oracle
//! operation; there is no shared global.

use std::collections::HashMap;

use meridian_types::{short_hex, TokenId};

use crate::{Result, RingBuffer, StoreError};

/// A map of token id to ring buffer with lazy initialization.
#[derive(Clone, Debug)]
pub struct HistoryStore<T> {
    buffers: HashMap<TokenId, RingBuffer<T>>,
    default_capacity: u16,
}

impl<T: Clone + Default> HistoryStore<T> {
    /// Create a store whose buffers initialize at `default_capacity` slots.
    pub fn new(default_capacity: u16) -> Self {
        Self {
            buffers: HashMap::new(),
            default_capacity,
        }
    }

    /// Append a snapshot for `token`, initializing its buffer on first use.
    pub fn push(&mut self, token: TokenId, item: T) {
        let default_capacity = self.default_capacity;
        let buffer = self.buffers.entry(token).or_insert_with(|| {
            tracing::debug!(
                token = short_hex(&token),
                capacity = default_capacity,
                "history: buffer initialized"
            );
            RingBuffer::new(default_capacity)
        });
        buffer.push(item);
    }

    /// Read the snapshot at logical `index` (0 = newest).
    ///
    /// # Errors
    ///
    /// - [`StoreError::InvalidIndex`] when the index is past the retained
    ///   window (an uninitialized token retains nothing)
    pub fn get(&self, token: &TokenId, index: u16) -> Result<&T> {
        match self.buffers.get(token) {
            Some(buffer) => buffer.get(index),
            None => Err(StoreError::InvalidIndex { index, count: 0 }),
        }
    }

    /// The newest snapshot for `token`, if any.
    pub fn latest(&self, token: &TokenId) -> Option<&T> {
        self.buffers.get(token).and_then(|b| b.get(0).ok())
    }

    /// Snapshots currently retained for `token`.
    pub fn count(&self, token: &TokenId) -> u16 {
        self.buffers.get(token).map_or(0, RingBuffer::count)
    }

    /// Current capacity of the token's buffer; the default capacity when the
    /// buffer has not been initialized yet.
    pub fn capacity(&self, token: &TokenId) -> u16 {
        self.buffers
            .get(token)
            .map_or(self.default_capacity, RingBuffer::capacity)
    }

    /// Range read with the semantics of [`RingBuffer::get_range`].
    ///
    /// # Errors
    ///
    /// - [`StoreError::InsufficientData`] when the range reaches past the
    ///   retained window
    pub fn get_range(
        &self,
        token: &TokenId,
        amount: u16,
        offset: u16,
        increment: u16,
    ) -> Result<Vec<T>> {
        match self.buffers.get(token) {
            Some(buffer) => buffer.get_range(amount, offset, increment),
            None if amount == 0 => Ok(Vec::new()),
            None => Err(StoreError::InsufficientData {
                required: u32::from(offset) + u32::from(amount - 1) * u32::from(increment) + 1,
                available: 0,
            }),
        }
    }

    /// Grow the capacity of the token's buffer, initializing it first if
    /// needed. Returns `(old, new)` capacity so callers can emit the
    /// corresponding capacity event.
    ///
    /// # Errors
    ///
    /// - [`StoreError::CapacityCannotBeDecreased`] unless strictly larger
    /// - [`StoreError::CapacityTooLarge`] above [`crate::MAX_CAPACITY`]
    pub fn set_capacity(&mut self, token: TokenId, new_capacity: u16) -> Result<(u16, u16)> {
        let default_capacity = self.default_capacity;
        let buffer = self
            .buffers
            .entry(token)
            .or_insert_with(|| RingBuffer::new(default_capacity));
        let old = buffer.capacity();
        buffer.set_capacity(new_capacity)?;
        tracing::debug!(
            token = short_hex(&token),
            old_capacity = old,
            new_capacity,
            "history: capacity increased"
        );
        Ok((old, new_capacity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOKEN_A: TokenId = [0xaa; 20];
    const TOKEN_B: TokenId = [0xbb; 20];

    #[test]
    fn test_lazy_initialization() {
        let mut store: HistoryStore<u64> = HistoryStore::new(3);
        assert_eq!(store.count(&TOKEN_A), 0);
        assert_eq!(store.capacity(&TOKEN_A), 3);

        store.push(TOKEN_A, 7);
        assert_eq!(store.count(&TOKEN_A), 1);
        assert_eq!(*store.get(&TOKEN_A, 0).expect("newest"), 7);
    }

    #[test]
    fn test_keys_are_independent() {
        let mut store: HistoryStore<u64> = HistoryStore::new(2);
        store.push(TOKEN_A, 1);
        store.push(TOKEN_A, 2);
        store.push(TOKEN_B, 9);

        assert_eq!(store.count(&TOKEN_A), 2);
        assert_eq!(store.count(&TOKEN_B), 1);
        assert_eq!(*store.get(&TOKEN_B, 0).expect("newest"), 9);
    }

    #[test]
    fn test_get_uninitialized_token() {
        let store: HistoryStore<u64> = HistoryStore::new(2);
        assert!(matches!(
            store.get(&TOKEN_A, 0),
            Err(StoreError::InvalidIndex { index: 0, count: 0 })
        ));
        assert!(store.latest(&TOKEN_A).is_none());
    }

    #[test]
    fn test_set_capacity_initializes_then_grows() {
        let mut store: HistoryStore<u64> = HistoryStore::new(2);
        let (old, new) = store.set_capacity(TOKEN_A, 5).expect("grow");
        assert_eq!((old, new), (2, 5));

        // The grown buffer is the one subsequent pushes land in.
        for v in 1..=5u64 {
            store.push(TOKEN_A, v);
        }
        assert_eq!(store.count(&TOKEN_A), 5);
    }

    #[test]
    fn test_get_range_uninitialized() {
        let store: HistoryStore<u64> = HistoryStore::new(2);
        assert!(matches!(
            store.get_range(&TOKEN_A, 2, 0, 1),
            Err(StoreError::InsufficientData { required: 2, available: 0 })
        ));
        assert!(store
            .get_range(&TOKEN_A, 0, 0, 0)
            .expect("empty range")
            .is_empty());
    }
}
