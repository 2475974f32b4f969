/// Scheduled callbacks.
///
/// Every deferred effect in the engine is an `Event` sitting in the
/// scheduler's heap: the next step of an election, a heartbeat tick, or
/// one staggered heartbeat send. Payloads carry only ids and drafts,
/// never roster snapshots, so a handler always re-reads the live
/// [`ProcessSet`](crate::process::ProcessSet) when it fires. Each payload
/// names its owner (a session or a heartbeat cycle) so that owner's
/// events can be cancelled as a group.

use crate::message::Outgoing;
use crate::orchestrator::SessionId;
use crate::time::VirtualTime;
use std::cmp::Ordering;

// ── Event ID ──────────────────────────────────────────────────────────

/// Strictly increasing event identifier; breaks ties between events
/// scheduled at the same instant, in creation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct EventId(u64);

impl EventId {
    #[inline]
    pub fn new(raw: u64) -> Self {
        EventId(raw)
    }

    #[inline]
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "E#{}", self.0)
    }
}

/// Monotonic event-ID generator. One per scheduler.
#[derive(Debug, Clone, Default)]
pub struct EventIdGen {
    next: u64,
}

impl EventIdGen {
    pub fn new() -> Self {
        EventIdGen { next: 0 }
    }

    pub fn next_id(&mut self) -> EventId {
        let id = EventId(self.next);
        self.next += 1;
        id
    }

    pub fn peek(&self) -> EventId {
        EventId(self.next)
    }
}

// ── Payloads ──────────────────────────────────────────────────────────

/// One step of an election session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum ElectionStep {
    /// Emit one protocol message (re-validated at fire time).
    Send(Outgoing),
    /// Response deadline: pick the winner and start announcing.
    Declare,
    /// Announcements are out; close the session.
    Finish,
}

/// What a scheduled event does when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum EventType {
    /// A step belonging to election `session`.
    Election { session: SessionId, step: ElectionStep },

    /// Periodic liveness check of heartbeat cycle `cycle`.
    HeartbeatTick { cycle: u64 },

    /// One staggered heartbeat send from a tick of cycle `cycle`.
    Heartbeat { cycle: u64, draft: Outgoing },
}

impl EventType {
    /// Whether this event belongs to election `id`.
    pub fn is_for_session(&self, id: SessionId) -> bool {
        matches!(self, EventType::Election { session, .. } if *session == id)
    }

    /// Whether this event belongs to the heartbeat monitor.
    pub fn is_heartbeat(&self) -> bool {
        matches!(self, EventType::HeartbeatTick { .. } | EventType::Heartbeat { .. })
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventType::Election { session, step } => match step {
                ElectionStep::Send(draft) => write!(f, "{}:Send({})", session, draft),
                ElectionStep::Declare => write!(f, "{}:Declare", session),
                ElectionStep::Finish => write!(f, "{}:Finish", session),
            },
            EventType::HeartbeatTick { cycle } => write!(f, "Tick(#{})", cycle),
            EventType::Heartbeat { cycle, draft } => {
                write!(f, "Heartbeat(#{}, {} → {})", cycle, draft.from, draft.to)
            }
        }
    }
}

// ── Event ─────────────────────────────────────────────────────────────

/// A scheduled callback, ordered by `(scheduled_at, id)`.
#[derive(Debug, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct Event {
    pub id: EventId,
    pub scheduled_at: VirtualTime,
    pub payload: EventType,
}

impl Event {
    pub fn new(id: EventId, scheduled_at: VirtualTime, payload: EventType) -> Self {
        Event {
            id,
            scheduled_at,
            payload,
        }
    }
}

/// Reversed so `BinaryHeap` pops the smallest `(scheduled_at, id)` first.
impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .scheduled_at
            .cmp(&self.scheduled_at)
            .then_with(|| other.id.cmp(&self.id))
    }
}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::MessageKind;
    use crate::process::ProcessId;

    #[test]
    fn test_ordering_by_time_then_id() {
        let tick = EventType::HeartbeatTick { cycle: 1 };
        let e1 = Event::new(EventId::new(5), VirtualTime::from_millis(10), tick);
        let e2 = Event::new(EventId::new(1), VirtualTime::from_millis(20), tick);
        let e3 = Event::new(EventId::new(6), VirtualTime::from_millis(10), tick);
        // Reversed: "greater" pops first.
        assert!(e1 > e2);
        assert!(e1 > e3);
    }

    #[test]
    fn test_ownership_predicates() {
        let s = SessionId::new(2);
        let send = EventType::Election {
            session: s,
            step: ElectionStep::Send(Outgoing::new(
                MessageKind::Election,
                ProcessId::new(1),
                ProcessId::new(2),
            )),
        };
        assert!(send.is_for_session(s));
        assert!(!send.is_for_session(SessionId::new(3)));
        assert!(!send.is_heartbeat());
        assert!(EventType::HeartbeatTick { cycle: 0 }.is_heartbeat());
    }

    #[test]
    fn test_display() {
        let e = EventType::Election { session: SessionId::new(4), step: ElectionStep::Declare };
        assert_eq!(e.to_string(), "S#4:Declare");
        assert_eq!(EventType::HeartbeatTick { cycle: 2 }.to_string(), "Tick(#2)");
    }
}
