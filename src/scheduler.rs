/// Deterministic event scheduler.
///
/// A `BinaryHeap` over reversed-`Ord` events acts as a min-heap keyed by
/// `(scheduled_at, event_id)`. Event ids grow monotonically, so events
/// scheduled for the same instant fire in the order they were scheduled.
/// That is what keeps a batch of messages in construction order.
///
/// Cancellation is synchronous: removed events are gone from the heap
/// before the cancelling call returns.

use std::collections::BinaryHeap;

use crate::event::{Event, EventId, EventIdGen, EventType};
use crate::time::VirtualTime;

#[derive(Debug, Clone, Default)]
pub struct Scheduler {
    queue: BinaryHeap<Event>,
    id_gen: EventIdGen,
}

impl Scheduler {
    pub fn new() -> Self {
        Scheduler {
            queue: BinaryHeap::new(),
            id_gen: EventIdGen::new(),
        }
    }

    /// Schedule `payload` at `at`. Returns the id assigned to it.
    pub fn schedule(&mut self, at: VirtualTime, payload: EventType) -> EventId {
        let id = self.id_gen.next_id();
        self.queue.push(Event::new(id, at, payload));
        id
    }

    /// Pop the next event (earliest time, lowest id).
    pub fn pop_next(&mut self) -> Option<Event> {
        self.queue.pop()
    }

    /// Pop the next event only if it is due at or before `deadline`.
    pub fn pop_due(&mut self, deadline: VirtualTime) -> Option<Event> {
        if self.queue.peek()?.scheduled_at > deadline {
            return None;
        }
        self.queue.pop()
    }

    pub fn peek_next(&self) -> Option<&Event> {
        self.queue.peek()
    }

    /// Remove every pending event whose payload matches `pred`.
    /// Returns how many were removed.
    pub fn cancel_where<F>(&mut self, mut pred: F) -> usize
    where
        F: FnMut(&EventType) -> bool,
    {
        let before = self.queue.len();
        self.queue.retain(|e| !pred(&e.payload));
        before - self.queue.len()
    }

    /// Remove one pending event by id. Returns whether it was pending.
    pub fn cancel(&mut self, id: EventId) -> bool {
        let before = self.queue.len();
        self.queue.retain(|e| e.id != id);
        before != self.queue.len()
    }

    /// Drop everything pending. Ids keep counting up.
    pub fn clear(&mut self) {
        self.queue.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Whether any pending event matches `pred`.
    pub fn any_pending<F>(&self, mut pred: F) -> bool
    where
        F: FnMut(&EventType) -> bool,
    {
        self.queue.iter().any(|e| pred(&e.payload))
    }
}
