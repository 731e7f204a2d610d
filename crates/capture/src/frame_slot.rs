//! Per-camera frame slots
//!
//! A slot holds the most recently delivered frame of one camera. Writers
//! replace it, readers take whatever is there; neither waits for the other
//! beyond an `Arc` pointer swap.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::decode::RgbFrame;

/// Single-frame mailbox with overwrite semantics
#[derive(Debug, Default)]
pub struct FrameSlot {
    frame: Mutex<Option<Arc<RgbFrame>>>,
    sequence: AtomicU64,
}

impl FrameSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current frame (last writer wins)
    pub fn store(&self, frame: Arc<RgbFrame>) {
        *self.frame.lock().unwrap_or_else(PoisonError::into_inner) = Some(frame);
        self.sequence.fetch_add(1, Ordering::Release);
    }

    /// Latest frame, if any
    pub fn latest(&self) -> Option<Arc<RgbFrame>> {
        self.frame
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of frames stored since creation or the last reset
    pub fn sequence(&self) -> u64 {
        self.sequence.load(Ordering::Acquire)
    }

    /// Empty the slot
    pub fn clear(&self) {
        *self.frame.lock().unwrap_or_else(PoisonError::into_inner) = None;
        self.sequence.store(0, Ordering::Release);
    }
}

/// The frame slots of one session, one per configured camera
///
/// Cheap to clone; clones share the same slots.
#[derive(Debug, Clone, Default)]
pub struct FrameSlots {
    slots: Arc<[FrameSlot]>,
}

impl FrameSlots {
    /// Create `count` empty slots
    pub fn new(count: usize) -> Self {
        Self {
            slots: (0..count).map(|_| FrameSlot::new()).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&FrameSlot> {
        self.slots.get(index)
    }

    /// Latest frame of slot `index`
    pub fn latest(&self, index: usize) -> Option<Arc<RgbFrame>> {
        self.get(index).and_then(FrameSlot::latest)
    }

    /// Empty every slot
    pub fn reset(&self) {
        for slot in self.slots.iter() {
            slot.clear();
        }
    }

    /// Number of slots currently holding a frame
    pub fn filled(&self) -> usize {
        self.slots.iter().filter(|s| s.latest().is_some()).count()
    }
}
