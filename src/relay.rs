//! Per-eye frame handoff.
//!
//! A `FrameSlot` is a bounded relay of capacity one with latest-wins
//! semantics: a producer publishing into an unconsumed slot overwrites the
//! stale frame. That is the deliberate backpressure policy — under a slow
//! consumer the freshest frame survives and older ones are dropped, and no
//! queue can grow without bound.
//!
//! The two eyes' slots are independent; nothing orders the left relay against
//! the right one, so a bounded frame-index skew between the eyes is expected.

use std::sync::{Arc, Mutex};

/// Capacity-1, latest-wins handoff between one producer and one consumer.
pub struct FrameSlot<T> {
    cell: Arc<Mutex<Option<T>>>,
}

impl<T> FrameSlot<T> {
    pub fn new() -> Self {
        Self {
            cell: Arc::new(Mutex::new(None)),
        }
    }

    /// Publish a value, overwriting any unconsumed predecessor.
    ///
    /// Returns `true` when a stale value was displaced, so producers can keep
    /// a drop counter.
    pub fn publish(&self, value: T) -> bool {
        let mut cell = self.cell.lock().expect("frame slot poisoned");
        let dropped = cell.is_some();
        *cell = Some(value);
        dropped
    }

    /// Consume the current value, leaving the slot empty.
    pub fn take(&self) -> Option<T> {
        self.cell.lock().expect("frame slot poisoned").take()
    }

    /// Whether a value is waiting. The answer may be stale by the time the
    /// caller acts on it; `take` is the authoritative operation.
    pub fn is_loaded(&self) -> bool {
        self.cell.lock().expect("frame slot poisoned").is_some()
    }
}

impl<T> Clone for FrameSlot<T> {
    fn clone(&self) -> Self {
        Self {
            cell: Arc::clone(&self.cell),
        }
    }
}

impl<T> Default for FrameSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_consumes_the_slot() {
        let slot = FrameSlot::new();
        assert!(!slot.is_loaded());
        slot.publish(1u32);
        assert!(slot.is_loaded());
        assert_eq!(slot.take(), Some(1));
        assert_eq!(slot.take(), None);
        assert!(!slot.is_loaded());
    }

    #[test]
    fn newest_frame_wins() {
        let slot = FrameSlot::new();
        assert!(!slot.publish(1u32));
        assert!(slot.publish(2));
        assert!(slot.publish(3));
        assert_eq!(slot.take(), Some(3));
    }

    #[test]
    fn clones_share_the_same_cell() {
        let producer = FrameSlot::new();
        let consumer = producer.clone();
        producer.publish("frame");
        assert_eq!(consumer.take(), Some("frame"));
        assert!(!producer.is_loaded());
    }

    #[test]
    fn slot_transfers_across_threads() {
        let slot: FrameSlot<u64> = FrameSlot::new();
        let producer = slot.clone();
        let handle = std::thread::spawn(move || {
            for i in 0..100 {
                producer.publish(i);
            }
        });
        handle.join().unwrap();
        assert_eq!(slot.take(), Some(99));
    }
}
