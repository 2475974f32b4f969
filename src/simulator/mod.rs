/// The election engine's single entry point.
///
/// `BullySimulator` owns every piece of engine state (the roster, the
/// scheduler, the orchestrator, the heartbeat monitor) and the virtual
/// clock that drives them. Hosts call the inbound operations, then move
/// time forward with [`step`](BullySimulator::step),
/// [`advance_by`](BullySimulator::advance_by) or
/// [`run_until_settled`](BullySimulator::run_until_settled). All output
/// goes to the observer `O`.
///
/// Everything runs on the caller's thread. Nothing happens between
/// calls, so an inbound operation is never interleaved with a
/// scheduled step.

use crate::config::ElectionConfig;
use crate::context::EngineContext;
use crate::error::{BullyError, BullyResult};
use crate::event::{Event, EventType};
use crate::eventlog::LogCategory;
use crate::heartbeat::HeartbeatMonitor;
use crate::message::MessageIdGen;
use crate::observer::{ElectionObserver, Recorder};
use crate::orchestrator::{ElectionOrchestrator, SessionId};
use crate::process::{ProcessId, ProcessSet};
use crate::scheduler::Scheduler;
use crate::time::VirtualTime;


pub struct BullySimulator<O: ElectionObserver = Recorder> {
    config: ElectionConfig,
    processes: ProcessSet,
    scheduler: Scheduler,
    orchestrator: ElectionOrchestrator,
    heartbeat: HeartbeatMonitor,
    message_ids: MessageIdGen,
    observer: O,
    now: VirtualTime,
    events_processed: u64,
}

impl BullySimulator<Recorder> {
    /// A simulator that records everything, with a log window sized by
    /// `config.log_retention`.
    pub fn recording(config: ElectionConfig) -> BullyResult<Self> {
        let recorder = Recorder::with_log_retention(config.log_retention);
        Self::with_config(config, recorder)
    }
}

impl<O: ElectionObserver> BullySimulator<O> {
    /// Default configuration: processes 1 to 5, P5 leading, heartbeat stopped.
    pub fn new(observer: O) -> BullyResult<Self> {
        Self::with_config(ElectionConfig::default(), observer)
    }

    pub fn with_config(config: ElectionConfig, observer: O) -> BullyResult<Self> {
        config.validate()?;
        let processes = ProcessSet::from_ids(config.default_roster.iter().copied())?;
        tracing::debug!(roster = ?config.default_roster, "simulator created");
        Ok(BullySimulator {
            config,
            processes,
            scheduler: Scheduler::new(),
            orchestrator: ElectionOrchestrator::new(),
            heartbeat: HeartbeatMonitor::new(),
            message_ids: MessageIdGen::new(),
            observer,
            now: VirtualTime::ZERO,
            events_processed: 0,
        })
    }

    /// Borrow the engine state for one dispatch, alongside the two
    /// components that own scheduled work.
    fn split(&mut self) -> (EngineContext<'_>, &mut ElectionOrchestrator, &mut HeartbeatMonitor) {
        let ctx = EngineContext {
            now: self.now,
            scheduler: &mut self.scheduler,
            processes: &mut self.processes,
            observer: &mut self.observer,
            message_ids: &mut self.message_ids,
            config: &self.config,
        };
        (ctx, &mut self.orchestrator, &mut self.heartbeat)
    }

    // ── Inbound operations ────────────────────────────────────

    /// Replace the roster. The highest id becomes leader, any in-flight
    /// election is cancelled and queued heartbeats are dropped. Rejected
    /// rosters (empty, duplicate or zero ids) change nothing.
    pub fn configure(&mut self, ids: &[u64]) -> BullyResult<()> {
        let previous = self.processes.leader();
        self.processes.configure(ids.iter().copied())?;

        self.orchestrator.clear_session(&mut self.scheduler);
        self.heartbeat.cancel_sends(&mut self.scheduler);

        let listed = ids.iter().map(u64::to_string).collect::<Vec<_>>().join(", ");
        let (mut ctx, _, _) = self.split();
        ctx.log(
            format!("System reconfigured with nodes: [{}]", listed),
            LogCategory::Info,
        );
        let leader = ctx.processes().leader();
        if leader != previous {
            ctx.notify_leader(leader);
        }
        Ok(())
    }

    /// Flip a process between active and inactive. Returns the new state.
    ///
    /// While heartbeat monitoring runs, a recovered process that outranks
    /// the leader (or finds no leader at all) starts an election. If one is
    /// already in flight, the next heartbeat tick starts it instead.
    pub fn toggle(&mut self, id: ProcessId) -> BullyResult<bool> {
        let monitoring = self.heartbeat.is_running();
        let (mut ctx, orchestrator, _) = self.split();

        let Some(toggled) = ctx.processes.toggle(id) else {
            return Err(BullyError::UnknownProcess(id));
        };

        if toggled.now_active {
            ctx.log(format!("Process {} recovered", id), LogCategory::Recovery);
        } else {
            ctx.log(format!("Process {} failed", id), LogCategory::Failure);
        }
        if toggled.lost_leadership {
            ctx.notify_leader(None);
        }

        if toggled.now_active && monitoring {
            let outranks = ctx.processes().live_leader().map_or(true, |leader| id > leader);
            if outranks {
                if let Err(e) = orchestrator.start_election(&mut ctx, Some(id)) {
                    tracing::debug!(%id, "recovery election not started: {}", e);
                }
            }
        }
        Ok(toggled.now_active)
    }

    /// Start an election from `initiator`, or from the lowest active
    /// process.
    pub fn start_election(&mut self, initiator: Option<ProcessId>) -> BullyResult<SessionId> {
        let (mut ctx, orchestrator, _) = self.split();
        orchestrator.start_election(&mut ctx, initiator)
    }

    /// Stop everything and restore the default roster. Calling it twice
    /// leaves the same state as calling it once.
    pub fn reset(&mut self) -> BullyResult<()> {
        let roster = ProcessSet::from_ids(self.config.default_roster.iter().copied())?;
        let previous = self.processes.leader();

        self.orchestrator.clear_session(&mut self.scheduler);
        self.heartbeat.halt(&mut self.scheduler);
        self.scheduler.clear();
        self.processes = roster;

        let (mut ctx, _, _) = self.split();
        ctx.log("System reset - all processes restored", LogCategory::Info);
        let leader = ctx.processes().leader();
        if leader != previous {
            ctx.notify_leader(leader);
        }
        Ok(())
    }

    /// Start or stop heartbeat monitoring. Returns whether it changed.
    pub fn set_running(&mut self, running: bool) -> bool {
        let (mut ctx, _, heartbeat) = self.split();
        heartbeat.set_running(&mut ctx, running)
    }

    // ── Time ──────────────────────────────────────────────────

    /// Fire the next pending event, moving the clock to it.
    pub fn step(&mut self) -> Option<Event> {
        let event = self.scheduler.pop_next()?;
        self.now = self.now.max(event.scheduled_at);
        self.dispatch(&event);
        Some(event)
    }

    /// Fire everything due within the next `ms` ms. Returns how many
    /// events fired.
    pub fn advance_by(&mut self, ms: u64) -> u64 {
        self.advance_to(self.now.plus(ms))
    }

    /// Fire everything due at or before `deadline`, then move the clock
    /// there. Returns how many events fired.
    pub fn advance_to(&mut self, deadline: VirtualTime) -> u64 {
        let mut fired = 0;
        while let Some(event) = self.scheduler.pop_due(deadline) {
            self.now = self.now.max(event.scheduled_at);
            self.dispatch(&event);
            fired += 1;
        }
        self.now = self.now.max(deadline);
        fired
    }

    /// Step until no election is in flight, firing at most `max_events`.
    /// Returns how many events fired.
    pub fn run_until_settled(&mut self, max_events: u64) -> u64 {
        let mut fired = 0;
        while !self.orchestrator.is_idle() && fired < max_events {
            if self.step().is_none() {
                break;
            }
            fired += 1;
        }
        fired
    }

    fn dispatch(&mut self, event: &Event) {
        self.events_processed += 1;
        tracing::trace!(at = event.scheduled_at.millis(), "dispatch {}", event.payload);

        let (mut ctx, orchestrator, heartbeat) = self.split();
        match event.payload {
            EventType::Election { session, step } => orchestrator.on_step(&mut ctx, session, step),
            EventType::HeartbeatTick { cycle } => heartbeat.on_tick(&mut ctx, orchestrator, cycle),
            EventType::Heartbeat { cycle, draft } => heartbeat.on_send(&mut ctx, cycle, draft),
        }
    }

    // ── Inspection ────────────────────────────────────────────

    pub fn now(&self) -> VirtualTime {
        self.now
    }

    pub fn processes(&self) -> &ProcessSet {
        &self.processes
    }

    pub fn leader(&self) -> Option<ProcessId> {
        self.processes.leader()
    }

    pub fn config(&self) -> &ElectionConfig {
        &self.config
    }

    pub fn orchestrator(&self) -> &ElectionOrchestrator {
        &self.orchestrator
    }

    pub fn heartbeat(&self) -> &HeartbeatMonitor {
        &self.heartbeat
    }

    pub fn is_running(&self) -> bool {
        self.heartbeat.is_running()
    }

    pub fn is_settled(&self) -> bool {
        self.orchestrator.is_idle()
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    pub fn observer_mut(&mut self) -> &mut O {
        &mut self.observer
    }

    pub fn into_observer(self) -> O {
        self.observer
    }

    pub fn pending_events(&self) -> usize {
        self.scheduler.len()
    }

    /// When the next pending event is due.
    pub fn next_due(&self) -> Option<VirtualTime> {
        self.scheduler.peek_next().map(|e| e.scheduled_at)
    }

    pub fn events_processed(&self) -> u64 {
        self.events_processed
    }
}
