//! Election orchestration.
//!
//! Turns the Bully rules into a paced, multi-round protocol run. One
//! session at a time:
//!
//! ```text
//!   Idle ──start──▶ Running ──Declare──▶ Settling ──Finish──▶ Idle
//!                      │                                      ▲
//!                      └──────────── clear_session ───────────┘
//! ```
//!
//! The highest active process always wins Bully, so the orchestrator
//! does not recurse through every intermediate sub-election. It plays
//! the initiator's round (ELECTION fan-out, then the OK replies), then up
//! to `cascade_hops` rounds from the next intermediate processes, and
//! then has the winner announce itself. The plan is built from the
//! roster at start. Each step re-checks the live roster when it fires,
//! and the winner is re-read at the deadline.

use crate::config::ElectionConfig;
use crate::context::EngineContext;
use crate::error::{BullyError, BullyResult};
use crate::event::{ElectionStep, EventId, EventType};
use crate::eventlog::LogCategory;
use crate::message::{MessageKind, Outgoing};
use crate::process::{ProcessId, ProcessSet};
use crate::rules;
use crate::scheduler::Scheduler;
use crate::time::VirtualTime;

// ── Identifiers & states ──────────────────────────────────────────────

/// Identifies one election session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct SessionId(u64);

impl SessionId {
    #[inline]
    pub fn new(raw: u64) -> Self {
        SessionId(raw)
    }

    #[inline]
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "S#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum OrchestratorState {
    Idle,
    /// Election and OK traffic is being played out.
    Running,
    /// Winner declared; COORDINATOR announcements are going out.
    Settling,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum SessionStatus {
    /// Created; the initiator has not sent anything yet.
    Pending,
    /// The initiator's ELECTION messages are out.
    AwaitingResponses,
    /// The deadline passed without a single OK reaching the initiator.
    TimedOut,
    Completed,
}

/// The one in-flight election.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct ElectionSession {
    pub id: SessionId,
    pub initiator: ProcessId,
    pub status: SessionStatus,
    pub started_at: VirtualTime,
    /// Highest active process when the session started.
    pub expected_winner: ProcessId,
    /// The scheduled response deadline, until it fires.
    pub pending_timeout: Option<EventId>,
    pub elections_sent: usize,
    pub oks_received: usize,
    pub winner: Option<ProcessId>,
}

// ── Plan ──────────────────────────────────────────────────────────────

/// Paced protocol traffic for one session, as offsets from its start.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionPlan {
    pub sends: Vec<(u64, Outgoing)>,
    /// Offset of the response deadline, right after the last send.
    pub deadline: u64,
}

/// Lay out the traffic an election from `initiator` shows before
/// `winner` announces itself.
///
/// Each round is one sender's ELECTION fan-out followed by the OK replies
/// to it. The first round belongs to the initiator. Every further round
/// belongs to the next active process above the previous sender that is
/// still below the winner, up to `cascade_hops` extra rounds.
pub fn plan_session(
    snapshot: &ProcessSet,
    config: &ElectionConfig,
    initiator: ProcessId,
    winner: ProcessId,
) -> SessionPlan {
    let mut plan = SessionPlan::default();
    let mut offset = 0u64;
    let mut sender = initiator;
    let mut round = rules::start_election(initiator, snapshot);
    let mut hops_left = config.cascade_hops;

    while !round.is_empty() {
        for draft in &round {
            plan.sends.push((offset, *draft));
            offset = offset.saturating_add(config.election_spacing);
        }
        for draft in &round {
            let ok = rules::respond_to_election(draft.to, sender, snapshot)
                .into_iter()
                .find(|o| o.kind == MessageKind::Ok);
            if let Some(ok) = ok {
                plan.sends.push((offset, ok));
                offset = offset.saturating_add(config.ok_spacing);
            }
        }

        if hops_left == 0 {
            break;
        }
        hops_left -= 1;

        let Some(next) = snapshot.next_active_above(sender).filter(|id| *id < winner) else {
            break;
        };
        round = rules::respond_to_election(next, sender, snapshot)
            .into_iter()
            .filter(|o| o.kind == MessageKind::Election)
            .collect();
        sender = next;
    }

    plan.deadline = offset;
    plan
}

// ── Orchestrator ──────────────────────────────────────────────────────

/// Runs at most one election session at a time.
#[derive(Debug, Clone)]
pub struct ElectionOrchestrator {
    state: OrchestratorState,
    session: Option<ElectionSession>,
    last_session: Option<ElectionSession>,
    next_session: u64,
    completed: u64,
}

impl ElectionOrchestrator {
    pub fn new() -> Self {
        ElectionOrchestrator {
            state: OrchestratorState::Idle,
            session: None,
            last_session: None,
            next_session: 0,
            completed: 0,
        }
    }

    pub fn state(&self) -> OrchestratorState {
        self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == OrchestratorState::Idle
    }

    /// The in-flight session, if any.
    pub fn session(&self) -> Option<&ElectionSession> {
        self.session.as_ref()
    }

    /// The most recently completed session.
    pub fn last_session(&self) -> Option<&ElectionSession> {
        self.last_session.as_ref()
    }

    pub fn completed_sessions(&self) -> u64 {
        self.completed
    }

    /// Start an election from `initiator`, or from the lowest active
    /// process when `None`.
    ///
    /// Effects arrive later, through scheduled steps. Fails without side
    /// effects if a session is in flight, if the initiator is unknown or
    /// inactive, or if no process is active. The last case is also logged.
    pub fn start_election(
        &mut self,
        ctx: &mut EngineContext,
        initiator: Option<ProcessId>,
    ) -> BullyResult<SessionId> {
        if let Some(active) = &self.session {
            tracing::debug!(session = %active.id, "election request rejected, session in flight");
            return Err(BullyError::ElectionAlreadyInProgress { active: active.id });
        }

        let Some(expected_winner) = ctx.processes().highest_active() else {
            ctx.log("No active processes - no leader to elect", LogCategory::Failure);
            return Err(BullyError::NoActiveProcesses);
        };

        let initiator = match initiator {
            Some(id) if !ctx.processes().contains(id) => {
                return Err(BullyError::UnknownProcess(id));
            }
            Some(id) if !ctx.processes().is_active(id) => {
                return Err(BullyError::ProcessInactive(id));
            }
            Some(id) => id,
            None => ctx.processes().lowest_active().unwrap_or(expected_winner),
        };

        let id = SessionId(self.next_session);
        self.next_session += 1;

        ctx.log(
            format!("Election started by Process {}", initiator),
            LogCategory::Election,
        );

        let plan = plan_session(ctx.processes(), ctx.config(), initiator, expected_winner);
        if plan.sends.is_empty() {
            ctx.log(
                format!("Process {} has no higher active peer", initiator),
                LogCategory::Election,
            );
        }
        for (offset, draft) in &plan.sends {
            ctx.schedule_after(
                *offset,
                EventType::Election {
                    session: id,
                    step: ElectionStep::Send(*draft),
                },
            );
        }
        let deadline = ctx.schedule_after(
            plan.deadline,
            EventType::Election {
                session: id,
                step: ElectionStep::Declare,
            },
        );

        tracing::debug!(
            session = %id,
            %initiator,
            %expected_winner,
            sends = plan.sends.len(),
            deadline_ms = plan.deadline,
            "election planned"
        );

        self.session = Some(ElectionSession {
            id,
            initiator,
            status: SessionStatus::Pending,
            started_at: ctx.now(),
            expected_winner,
            pending_timeout: Some(deadline),
            elections_sent: 0,
            oks_received: 0,
            winner: None,
        });
        self.state = OrchestratorState::Running;
        Ok(id)
    }

    /// Dispatch one scheduled step. Steps of any other session are ignored.
    pub fn on_step(&mut self, ctx: &mut EngineContext, session: SessionId, step: ElectionStep) {
        if self.session.as_ref().map(|s| s.id) != Some(session) {
            tracing::debug!(%session, "ignoring step of a finished session");
            return;
        }
        match step {
            ElectionStep::Send(draft) => self.send(ctx, draft),
            ElectionStep::Declare => self.declare(ctx),
            ElectionStep::Finish => self.finish(ctx),
        }
    }

    /// Cancel the in-flight session and every step it still has pending.
    /// Returns the cancelled session's id.
    pub fn clear_session(&mut self, scheduler: &mut Scheduler) -> Option<SessionId> {
        let session = self.session.take()?;
        let deadline = session.pending_timeout.map_or(false, |t| scheduler.cancel(t));
        let cancelled = scheduler.cancel_where(|p| p.is_for_session(session.id));
        self.state = OrchestratorState::Idle;
        tracing::debug!(session = %session.id, deadline, cancelled, "session cleared");
        Some(session.id)
    }

    // ── Steps ─────────────────────────────────────────────────

    fn send(&mut self, ctx: &mut EngineContext, draft: Outgoing) {
        let Some(session) = self.session.as_mut() else {
            return;
        };

        let live = ctx.processes();
        if !live.is_active(draft.from) || !live.contains(draft.to) {
            tracing::debug!(session = %session.id, "skipping {}: endpoint gone", draft);
            return;
        }

        ctx.emit(draft, false);
        match draft.kind {
            MessageKind::Election if draft.from == session.initiator => {
                session.elections_sent += 1;
                if session.status == SessionStatus::Pending {
                    session.status = SessionStatus::AwaitingResponses;
                }
            }
            MessageKind::Ok if draft.to == session.initiator => session.oks_received += 1,
            _ => {}
        }

        let category = match draft.kind {
            MessageKind::Coordinator => LogCategory::Leader,
            MessageKind::Election | MessageKind::Ok => LogCategory::Election,
        };
        ctx.log(
            format!("Process {} sent {} to Process {}", draft.from, draft.kind, draft.to),
            category,
        );
    }

    fn declare(&mut self, ctx: &mut EngineContext) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        session.pending_timeout = None;
        let initiator = session.initiator;

        if session.status == SessionStatus::AwaitingResponses && session.oks_received == 0 {
            session.status = SessionStatus::TimedOut;
            ctx.log(
                format!("Process {} received no OK before the deadline", initiator),
                LogCategory::Election,
            );
        }

        let live = ctx.processes();
        let winner = if session.status == SessionStatus::TimedOut
            && live.is_active(initiator)
            && rules::should_self_proclaim(initiator, live)
        {
            Some(initiator)
        } else {
            live.highest_active()
        };

        let Some(winner) = winner else {
            ctx.log(
                format!("Election by Process {} abandoned: no active processes remain", initiator),
                LogCategory::Failure,
            );
            ctx.clear_leader();
            self.session = None;
            self.state = OrchestratorState::Idle;
            return;
        };

        if winner != session.expected_winner {
            tracing::debug!(
                session = %session.id,
                expected = %session.expected_winner,
                actual = %winner,
                "roster changed during election"
            );
        }
        session.winner = Some(winner);
        let session_id = session.id;

        ctx.set_leader(winner);
        ctx.log(format!("Process {} elected as leader", winner), LogCategory::Leader);

        let spacing = ctx.config().coordinator_spacing;
        let announcements = rules::announce_coordinator(winner, ctx.processes());
        for (i, draft) in announcements.iter().enumerate() {
            ctx.schedule_after(
                spacing.saturating_mul(i as u64),
                EventType::Election {
                    session: session_id,
                    step: ElectionStep::Send(*draft),
                },
            );
        }
        ctx.schedule_after(
            spacing.saturating_mul(announcements.len() as u64),
            EventType::Election {
                session: session_id,
                step: ElectionStep::Finish,
            },
        );
        self.state = OrchestratorState::Settling;
    }

    fn finish(&mut self, ctx: &mut EngineContext) {
        let fallen = self
            .session
            .as_ref()
            .and_then(|s| s.winner)
            .filter(|w| !ctx.processes().is_active(*w));
        if let Some(winner) = fallen {
            ctx.log(
                format!("Process {} failed before the election completed", winner),
                LogCategory::Failure,
            );
            self.declare(ctx);
            return;
        }

        let Some(mut session) = self.session.take() else {
            return;
        };
        session.status = SessionStatus::Completed;
        self.state = OrchestratorState::Idle;
        self.completed += 1;

        if let Some(winner) = session.winner {
            ctx.log(
                format!("Election complete: {} is the coordinator", winner),
                LogCategory::Leader,
            );
            ctx.notify_complete(winner);
        }
        self.last_session = Some(session);
    }
}

impl Default for ElectionOrchestrator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::MessageIdGen;
    use crate::observer::Recorder;

    fn pid(n: u64) -> ProcessId {
        ProcessId::new(n)
    }

    /// Just enough engine to drive the orchestrator on its own.
    struct Harness {
        now: VirtualTime,
        scheduler: Scheduler,
        processes: ProcessSet,
        recorder: Recorder,
        ids: MessageIdGen,
        config: ElectionConfig,
    }

    impl Harness {
        fn new(ids: &[u64]) -> Self {
            Harness {
                now: VirtualTime::ZERO,
                scheduler: Scheduler::new(),
                processes: ProcessSet::from_ids(ids.iter().copied()).unwrap(),
                recorder: Recorder::new(),
                ids: MessageIdGen::new(),
                config: ElectionConfig::default(),
            }
        }

        fn ctx(&mut self) -> EngineContext<'_> {
            EngineContext {
                now: self.now,
                scheduler: &mut self.scheduler,
                processes: &mut self.processes,
                observer: &mut self.recorder,
                message_ids: &mut self.ids,
                config: &self.config,
            }
        }

        fn start(&mut self, orch: &mut ElectionOrchestrator, initiator: Option<u64>) -> BullyResult<SessionId> {
            let mut ctx = self.ctx();
            orch.start_election(&mut ctx, initiator.map(pid))
        }

        fn run(&mut self, orch: &mut ElectionOrchestrator) {
            while let Some(event) = self.scheduler.pop_next() {
                self.now = event.scheduled_at;
                if let EventType::Election { session, step } = event.payload {
                    let mut ctx = self.ctx();
                    orch.on_step(&mut ctx, session, step);
                }
            }
        }
    }

    #[test]
    fn test_plan_orders_rounds() {
        let set = ProcessSet::from_ids([1, 2, 3, 4, 5]).unwrap();
        let config = ElectionConfig::default().with_cascade_hops(0);
        let plan = plan_session(&set, &config, pid(1), pid(5));

        let edges: Vec<_> = plan
            .sends
            .iter()
            .map(|(_, o)| (o.kind, o.from.raw(), o.to.raw()))
            .collect();
        assert_eq!(
            edges,
            vec![
                (MessageKind::Election, 1, 2),
                (MessageKind::Election, 1, 3),
                (MessageKind::Election, 1, 4),
                (MessageKind::Election, 1, 5),
                (MessageKind::Ok, 2, 1),
                (MessageKind::Ok, 3, 1),
                (MessageKind::Ok, 4, 1),
                (MessageKind::Ok, 5, 1),
            ]
        );
        let offsets: Vec<_> = plan.sends.iter().map(|(t, _)| *t).collect();
        assert_eq!(offsets, vec![0, 150, 300, 450, 600, 700, 800, 900]);
        assert_eq!(plan.deadline, 1000);
    }

    #[test]
    fn test_plan_cascade_is_bounded_by_hops() {
        let set = ProcessSet::from_ids([1, 2, 3, 4, 5, 6]).unwrap();
        let count_senders = |hops: usize| {
            let config = ElectionConfig::default().with_cascade_hops(hops);
            let plan = plan_session(&set, &config, pid(1), pid(6));
            let mut senders: Vec<_> = plan
                .sends
                .iter()
                .filter(|(_, o)| o.kind == MessageKind::Election)
                .map(|(_, o)| o.from.raw())
                .collect();
            senders.dedup();
            senders
        };
        assert_eq!(count_senders(0), vec![1]);
        assert_eq!(count_senders(1), vec![1, 2]);
        assert_eq!(count_senders(2), vec![1, 2, 3]);
        // Hops stop below the winner.
        assert_eq!(count_senders(10), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_plan_for_top_process_is_empty() {
        let set = ProcessSet::from_ids([1, 2, 3]).unwrap();
        let plan = plan_session(&set, &ElectionConfig::default(), pid(3), pid(3));
        assert!(plan.sends.is_empty());
        assert_eq!(plan.deadline, 0);
    }

    #[test]
    fn test_full_session_elects_highest() {
        let mut h = Harness::new(&[1, 2, 3, 4, 5]);
        let mut orch = ElectionOrchestrator::new();
        h.start(&mut orch, Some(2)).unwrap();
        assert_eq!(orch.state(), OrchestratorState::Running);
        h.run(&mut orch);

        assert!(orch.is_idle());
        assert_eq!(h.recorder.completions, vec![pid(5)]);
        assert_eq!(orch.completed_sessions(), 1);
        let last = orch.last_session().unwrap();
        assert_eq!(last.status, SessionStatus::Completed);
        assert_eq!(last.oks_received, 3);
        assert_eq!(last.elections_sent, 3);
    }

    #[test]
    fn test_second_start_is_rejected() {
        let mut h = Harness::new(&[1, 2, 3]);
        let mut orch = ElectionOrchestrator::new();
        let first = h.start(&mut orch, Some(1)).unwrap();
        assert_eq!(
            h.start(&mut orch, Some(2)),
            Err(BullyError::ElectionAlreadyInProgress { active: first })
        );
        h.run(&mut orch);
        assert_eq!(h.recorder.completions, vec![pid(3)]);
    }

    #[test]
    fn test_rejects_unknown_and_inactive_initiators() {
        let mut h = Harness::new(&[1, 2, 3]);
        h.processes.toggle(pid(2));
        let mut orch = ElectionOrchestrator::new();
        assert_eq!(h.start(&mut orch, Some(9)), Err(BullyError::UnknownProcess(pid(9))));
        assert_eq!(h.start(&mut orch, Some(2)), Err(BullyError::ProcessInactive(pid(2))));
        assert!(orch.is_idle());
        assert!(h.scheduler.is_empty());
    }

    #[test]
    fn test_no_active_processes_logs_and_refuses() {
        let mut h = Harness::new(&[1, 2]);
        h.processes.toggle(pid(1));
        h.processes.toggle(pid(2));
        let mut orch = ElectionOrchestrator::new();
        assert_eq!(h.start(&mut orch, None), Err(BullyError::NoActiveProcesses));
        assert!(orch.session().is_none());
        assert!(h.recorder.logs.contains("No active processes"));
        h.run(&mut orch);
        assert!(h.recorder.completions.is_empty());
    }

    #[test]
    fn test_timeout_when_every_responder_dies() {
        let mut h = Harness::new(&[1, 2, 3]);
        let mut orch = ElectionOrchestrator::new();
        h.start(&mut orch, Some(1)).unwrap();

        // Let both ELECTIONs out, then kill the responders before any OK.
        for _ in 0..2 {
            let e = h.scheduler.pop_next().unwrap();
            h.now = e.scheduled_at;
            if let EventType::Election { session, step } = e.payload {
                let mut ctx = h.ctx();
                orch.on_step(&mut ctx, session, step);
            }
        }
        h.processes.toggle(pid(2));
        h.processes.toggle(pid(3));
        h.run(&mut orch);

        let last = orch.last_session().unwrap();
        assert_eq!(last.oks_received, 0);
        assert_eq!(last.winner, Some(pid(1)));
        assert!(h.recorder.logs.contains("received no OK"));
        assert_eq!(h.recorder.completions, vec![pid(1)]);
        assert_eq!(h.processes.leader(), Some(pid(1)));
    }

    #[test]
    fn test_clear_session_cancels_pending_steps() {
        let mut h = Harness::new(&[1, 2, 3, 4]);
        let mut orch = ElectionOrchestrator::new();
        let id = h.start(&mut orch, Some(1)).unwrap();
        assert!(!h.scheduler.is_empty());
        let deadline = orch.session().and_then(|s| s.pending_timeout).unwrap();

        assert_eq!(orch.clear_session(&mut h.scheduler), Some(id));
        assert!(!h.scheduler.cancel(deadline));
        assert!(orch.is_idle());
        assert!(h.scheduler.is_empty());
        h.run(&mut orch);
        assert!(h.recorder.completions.is_empty());
        assert!(orch.clear_session(&mut h.scheduler).is_none());
    }

    #[test]
    fn test_winner_failing_while_settling_is_replaced() {
        let mut h = Harness::new(&[1, 2, 3]);
        let mut orch = ElectionOrchestrator::new();
        h.start(&mut orch, Some(1)).unwrap();
        assert!(orch.session().and_then(|s| s.pending_timeout).is_some());

        while orch.state() != OrchestratorState::Settling {
            let e = h.scheduler.pop_next().unwrap();
            h.now = e.scheduled_at;
            if let EventType::Election { session, step } = e.payload {
                let mut ctx = h.ctx();
                orch.on_step(&mut ctx, session, step);
            }
        }
        assert_eq!(orch.session().and_then(|s| s.pending_timeout), None);
        assert_eq!(h.processes.leader(), Some(pid(3)));

        h.processes.toggle(pid(3));
        h.run(&mut orch);

        assert!(h.recorder.logs.contains("Process P3 failed before the election completed"));
        assert_eq!(h.recorder.completions, vec![pid(2)]);
        assert_eq!(h.processes.leader(), Some(pid(2)));
        assert_eq!(orch.last_session().and_then(|s| s.winner), Some(pid(2)));
    }

    #[test]
    fn test_abandoned_when_everyone_dies() {
        let mut h = Harness::new(&[1, 2]);
        let mut orch = ElectionOrchestrator::new();
        h.start(&mut orch, Some(1)).unwrap();
        h.processes.toggle(pid(1));
        h.processes.toggle(pid(2));
        h.run(&mut orch);

        assert!(orch.is_idle());
        assert!(h.recorder.completions.is_empty());
        assert!(h.recorder.logs.contains("abandoned"));
        assert_eq!(h.processes.leader(), None);
    }
}
