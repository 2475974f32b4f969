/// The mutable view handed to event handlers.
///
/// `EngineContext` borrows every piece of engine state a handler may
/// touch for the duration of one dispatch: the clock reading, the
/// scheduler, the live roster, the observer, and the message-id source.
/// Handlers never hold any of these across dispatches, so each one sees
/// the roster as it is *now*.

use crate::config::ElectionConfig;
use crate::event::{EventId, EventType};
use crate::eventlog::LogCategory;
use crate::message::{Message, MessageIdGen, Outgoing};
use crate::observer::ElectionObserver;
use crate::process::{ProcessId, ProcessSet};
use crate::scheduler::Scheduler;
use crate::time::VirtualTime;

pub struct EngineContext<'a> {
    pub(crate) now: VirtualTime,
    pub(crate) scheduler: &'a mut Scheduler,
    pub(crate) processes: &'a mut ProcessSet,
    pub(crate) observer: &'a mut dyn ElectionObserver,
    pub(crate) message_ids: &'a mut MessageIdGen,
    pub(crate) config: &'a ElectionConfig,
}

impl<'a> EngineContext<'a> {
    #[inline]
    pub fn now(&self) -> VirtualTime {
        self.now
    }

    /// The live roster.
    #[inline]
    pub fn processes(&self) -> &ProcessSet {
        self.processes
    }

    #[inline]
    pub fn config(&self) -> &ElectionConfig {
        self.config
    }

    // ── Scheduling ────────────────────────────────────────────

    /// Schedule `payload` to fire `delay` ms from now.
    pub fn schedule_after(&mut self, delay: u64, payload: EventType) -> EventId {
        self.scheduler.schedule(self.now.plus(delay), payload)
    }

    /// Cancel every pending event whose payload matches `pred`.
    pub fn cancel_where<F>(&mut self, pred: F) -> usize
    where
        F: FnMut(&EventType) -> bool,
    {
        self.scheduler.cancel_where(pred)
    }

    // ── Output ────────────────────────────────────────────────

    /// Stamp `draft` and hand it to the observer.
    pub fn emit(&mut self, draft: Outgoing, is_heartbeat: bool) -> Message {
        let message = Message::stamp(
            self.message_ids.next_id(),
            draft,
            self.now,
            is_heartbeat,
            &self.config.durations,
        );
        tracing::debug!(
            at = self.now.millis(),
            id = %message.id,
            heartbeat = is_heartbeat,
            "emit {}",
            draft
        );
        self.observer.on_message(&message);
        message
    }

    /// Report a milestone to the observer and mirror it to tracing.
    pub fn log(&mut self, text: impl AsRef<str>, category: LogCategory) {
        let text = text.as_ref();
        match category {
            LogCategory::Failure => {
                tracing::warn!(at = self.now.millis(), category = %category, "{}", text)
            }
            _ => tracing::info!(at = self.now.millis(), category = %category, "{}", text),
        }
        self.observer.on_log(self.now, text, category);
    }

    // ── Leadership ────────────────────────────────────────────

    /// Record `leader` in the roster. Notifies the observer if that
    /// changed anything. Returns `false` if the roster refused it.
    pub fn set_leader(&mut self, leader: ProcessId) -> bool {
        match self.processes.set_leader(leader) {
            Ok(previous) => {
                if previous != Some(leader) {
                    self.observer.on_leader_changed(Some(leader));
                }
                true
            }
            Err(e) => {
                tracing::warn!(at = self.now.millis(), "cannot record leader: {}", e);
                false
            }
        }
    }

    /// Forget the leader, notifying the observer if there was one.
    pub fn clear_leader(&mut self) {
        if self.processes.clear_leader().is_some() {
            self.observer.on_leader_changed(None);
        }
    }

    /// Tell the observer the leader changed outside `set_leader` and
    /// `clear_leader`, e.g. by a toggle or a roster swap.
    pub fn notify_leader(&mut self, leader: Option<ProcessId>) {
        self.observer.on_leader_changed(leader);
    }

    pub fn notify_complete(&mut self, leader: ProcessId) {
        self.observer.on_election_complete(leader);
    }
}
