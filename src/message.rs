/// Protocol messages.
///
/// The election rules produce [`Outgoing`] drafts: just a kind and two
/// endpoints, with no identity and no timing. The engine stamps a draft
/// into an immutable [`Message`] at the moment it is emitted, drawing the
/// id from an injectable [`MessageIdGen`] and the display duration from
/// [`MessageDurations`](crate::config::MessageDurations).

use crate::config::MessageDurations;
use crate::process::ProcessId;
use crate::time::VirtualTime;

// ── Kind ──────────────────────────────────────────────────────────────

/// The three Bully message kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serialize", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum MessageKind {
    /// "I am calling an election; anyone higher, answer."
    Election,
    /// "I am higher and alive; stand down."
    Ok,
    /// "I am the leader." Also used for heartbeats.
    Coordinator,
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageKind::Election => write!(f, "ELECTION"),
            MessageKind::Ok => write!(f, "OK"),
            MessageKind::Coordinator => write!(f, "COORDINATOR"),
        }
    }
}

// ── Message ID ────────────────────────────────────────────────────────

/// Unique message identifier, rendered as `msg-<n>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct MessageId(u64);

impl MessageId {
    #[inline]
    pub fn new(raw: u64) -> Self {
        MessageId(raw)
    }

    #[inline]
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "msg-{}", self.0)
    }
}

/// Monotonic message-id source.
///
/// Owned by the simulator. Tests can start it anywhere with
/// [`MessageIdGen::starting_at`] to get reproducible ids.
#[derive(Debug, Clone, Default)]
pub struct MessageIdGen {
    next: u64,
}

impl MessageIdGen {
    pub fn new() -> Self {
        MessageIdGen { next: 0 }
    }

    pub fn starting_at(start: u64) -> Self {
        MessageIdGen { next: start }
    }

    pub fn next_id(&mut self) -> MessageId {
        let id = MessageId(self.next);
        self.next += 1;
        id
    }
}

// ── Outgoing ──────────────────────────────────────────────────────────

/// A message the rules say should be sent, not yet stamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct Outgoing {
    pub kind: MessageKind,
    pub from: ProcessId,
    pub to: ProcessId,
}

impl Outgoing {
    pub fn new(kind: MessageKind, from: ProcessId, to: ProcessId) -> Self {
        Outgoing { kind, from, to }
    }
}

impl std::fmt::Display for Outgoing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({} → {})", self.kind, self.from, self.to)
    }
}

// ── Message ───────────────────────────────────────────────────────────

/// One emitted protocol or heartbeat message. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct Message {
    pub id: MessageId,
    pub kind: MessageKind,
    pub from: ProcessId,
    pub to: ProcessId,
    pub created_at: VirtualTime,
    /// How long the renderer should keep it on screen, in milliseconds.
    pub visible_duration: u64,
    pub is_heartbeat: bool,
    /// Overlap priority for the renderer; higher draws on top.
    pub priority: u8,
}

impl Message {
    /// Stamp a draft.
    pub fn stamp(
        id: MessageId,
        draft: Outgoing,
        created_at: VirtualTime,
        is_heartbeat: bool,
        durations: &MessageDurations,
    ) -> Self {
        Message {
            id,
            kind: draft.kind,
            from: draft.from,
            to: draft.to,
            created_at,
            visible_duration: durations.for_kind(draft.kind, is_heartbeat),
            is_heartbeat,
            priority: priority_of(draft.kind, is_heartbeat),
        }
    }

    /// The draft this message was stamped from.
    pub fn outgoing(&self) -> Outgoing {
        Outgoing::new(self.kind, self.from, self.to)
    }

    /// The instant the renderer may discard it.
    pub fn expires_at(&self) -> VirtualTime {
        self.created_at.plus(self.visible_duration)
    }
}

fn priority_of(kind: MessageKind, is_heartbeat: bool) -> u8 {
    if is_heartbeat {
        return 1;
    }
    match kind {
        MessageKind::Election => 3,
        MessageKind::Ok | MessageKind::Coordinator => 2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_gen_is_monotonic() {
        let mut ids = MessageIdGen::starting_at(7);
        assert_eq!(ids.next_id().to_string(), "msg-7");
        assert_eq!(ids.next_id().to_string(), "msg-8");
    }

    #[test]
    fn test_stamp_uses_kind_durations_and_priorities() {
        let durations = MessageDurations::default();
        let draft = Outgoing::new(MessageKind::Election, ProcessId::new(1), ProcessId::new(2));
        let m = Message::stamp(MessageId::new(0), draft, VirtualTime::from_millis(100), false, &durations);
        assert_eq!(m.visible_duration, 3000);
        assert_eq!(m.priority, 3);
        assert_eq!(m.expires_at(), VirtualTime::from_millis(3100));
        assert_eq!(m.outgoing(), draft);

        let hb = Outgoing::new(MessageKind::Coordinator, ProcessId::new(5), ProcessId::new(1));
        let m = Message::stamp(MessageId::new(1), hb, VirtualTime::ZERO, true, &durations);
        assert_eq!(m.visible_duration, 1000);
        assert_eq!(m.priority, 1);
    }

    #[test]
    fn test_outgoing_display() {
        let o = Outgoing::new(MessageKind::Ok, ProcessId::new(4), ProcessId::new(1));
        assert_eq!(o.to_string(), "OK(P4 → P1)");
    }
}
