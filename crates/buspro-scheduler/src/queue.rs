//! Min-heap of due times with FIFO tie-break.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use tokio::time::Instant;

/// One heap slot. Slots are never updated in place: a reschedule pushes a
/// new slot with a fresh sequence number and the old one goes stale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct QueueEntry {
    pub next_due: Instant,
    pub seq: u64,
    pub consumer_id: String,
}

// Reverse ordering so BinaryHeap (a max heap) yields the earliest due first,
// and on equal due times the lowest sequence first.
impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .next_due
            .cmp(&self.next_due)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Debug, Default)]
pub(crate) struct DueQueue {
    heap: BinaryHeap<QueueEntry>,
}

impl DueQueue {
    pub fn push(&mut self, consumer_id: String, next_due: Instant, seq: u64) {
        self.heap.push(QueueEntry {
            next_due,
            seq,
            consumer_id,
        });
    }

    /// Pop the head if it is due at `now`, discarding stale slots on the way.
    ///
    /// `is_live` decides whether a slot still describes its item.
    pub fn pop_due<F>(&mut self, now: Instant, is_live: F) -> Option<QueueEntry>
    where
        F: Fn(&QueueEntry) -> bool,
    {
        while let Some(head) = self.heap.peek() {
            if !is_live(head) {
                self.heap.pop();
                continue;
            }
            if head.next_due > now {
                return None;
            }
            return self.heap.pop();
        }
        None
    }

    /// Drop every stale slot.
    pub fn compact<F>(&mut self, is_live: F)
    where
        F: Fn(&QueueEntry) -> bool,
    {
        self.heap.retain(|entry| is_live(entry));
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }
}
