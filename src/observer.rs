//! The callback contract between the engine and its collaborators.
//!
//! Renderers, log windows, and tests all implement [`ElectionObserver`].
//! Every method has a no-op default, so a collaborator overrides only
//! what it consumes. [`Recorder`] keeps everything it is told and is what
//! the tests, the demo binary, and the wasm façade use.

use crate::eventlog::{LogBuffer, LogCategory};
use crate::message::{Message, MessageKind};
use crate::process::ProcessId;
use crate::time::VirtualTime;

/// Receives engine output, in emission order, on the engine's thread.
pub trait ElectionObserver {
    /// One protocol or heartbeat message was emitted.
    fn on_message(&mut self, _message: &Message) {}

    /// A protocol milestone.
    fn on_log(&mut self, _at: VirtualTime, _text: &str, _category: LogCategory) {}

    /// An election session finished. Fires exactly once per session.
    fn on_election_complete(&mut self, _leader: ProcessId) {}

    /// The authoritative leader changed, possibly to nobody.
    fn on_leader_changed(&mut self, _leader: Option<ProcessId>) {}
}

/// Discards everything.
impl ElectionObserver for () {}

// ── Recorder ──────────────────────────────────────────────────────────

/// An observer that remembers everything.
///
/// Messages, completions, and leader changes are kept in full; log lines
/// go to a bounded [`LogBuffer`].
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    pub messages: Vec<Message>,
    pub logs: LogBuffer,
    pub completions: Vec<ProcessId>,
    pub leader_changes: Vec<Option<ProcessId>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// A recorder whose log keeps only the trailing `entries` lines.
    pub fn with_log_retention(entries: usize) -> Self {
        Recorder {
            logs: LogBuffer::with_capacity(entries),
            ..Self::default()
        }
    }

    /// Protocol messages of one kind, heartbeats excluded.
    pub fn protocol_messages(&self, kind: MessageKind) -> Vec<&Message> {
        self.messages
            .iter()
            .filter(|m| m.kind == kind && !m.is_heartbeat)
            .collect()
    }

    pub fn heartbeats(&self) -> Vec<&Message> {
        self.messages.iter().filter(|m| m.is_heartbeat).collect()
    }

    /// `(kind, from, to)` of every protocol message, in emission order.
    pub fn protocol_edges(&self) -> Vec<(MessageKind, u64, u64)> {
        self.messages
            .iter()
            .filter(|m| !m.is_heartbeat)
            .map(|m| (m.kind, m.from.raw(), m.to.raw()))
            .collect()
    }

    /// Take the messages recorded so far, leaving the list empty.
    pub fn drain_messages(&mut self) -> Vec<Message> {
        std::mem::take(&mut self.messages)
    }

    /// Forget everything recorded so far.
    pub fn clear(&mut self) {
        self.messages.clear();
        self.logs.clear();
        self.completions.clear();
        self.leader_changes.clear();
    }

    /// Whether nothing at all has been recorded.
    pub fn is_silent(&self) -> bool {
        self.messages.is_empty()
            && self.logs.is_empty()
            && self.completions.is_empty()
            && self.leader_changes.is_empty()
    }
}

impl ElectionObserver for Recorder {
    fn on_message(&mut self, message: &Message) {
        self.messages.push(message.clone());
    }

    fn on_log(&mut self, at: VirtualTime, text: &str, category: LogCategory) {
        self.logs.push(at, category, text);
    }

    fn on_election_complete(&mut self, leader: ProcessId) {
        self.completions.push(leader);
    }

    fn on_leader_changed(&mut self, leader: Option<ProcessId>) {
        self.leader_changes.push(leader);
    }
}
