/// Leader liveness monitoring.
///
/// While running, the monitor ticks every `heartbeat_period` ms. A tick
/// with a live leader fans out staggered heartbeats from it. A tick with
/// no live leader and no election in flight has the lowest active
/// process start one. A tick that finds an active process above the
/// leader, with no election in flight, has that process take over.
///
/// Each start bumps the cycle counter and every scheduled heartbeat
/// event carries its cycle. Events from an older cycle are ignored.

use crate::context::EngineContext;
use crate::event::EventType;
use crate::eventlog::LogCategory;
use crate::message::Outgoing;
use crate::orchestrator::ElectionOrchestrator;
use crate::rules;
use crate::scheduler::Scheduler;
use crate::time::VirtualTime;

#[derive(Debug, Clone, Default)]
pub struct HeartbeatMonitor {
    running: bool,
    cycle: u64,
    last_heartbeat: Option<VirtualTime>,
    ticks: u64,
    detections: u64,
}

impl HeartbeatMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Current cycle. Increments on every start.
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    /// When the last heartbeat batch went out (or monitoring started).
    pub fn last_heartbeat(&self) -> Option<VirtualTime> {
        self.last_heartbeat
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// How many ticks found the leader missing and started an election.
    pub fn detections(&self) -> u64 {
        self.detections
    }

    /// Start or stop monitoring. Returns whether anything changed.
    pub fn set_running(&mut self, ctx: &mut EngineContext, running: bool) -> bool {
        if self.running == running {
            return false;
        }
        self.running = running;

        if running {
            self.cycle += 1;
            self.last_heartbeat = Some(ctx.now());
            let period = ctx.config().heartbeat_period;
            ctx.schedule_after(period, EventType::HeartbeatTick { cycle: self.cycle });
            ctx.log(
                "Simulation started - heartbeat monitoring active",
                LogCategory::Info,
            );
        } else {
            let cancelled = ctx.cancel_where(EventType::is_heartbeat);
            tracing::debug!(cycle = self.cycle, cancelled, "heartbeat stopped");
            ctx.log(
                "Simulation paused - heartbeat monitoring stopped",
                LogCategory::Info,
            );
        }
        true
    }

    /// Stop without logging and drop every pending heartbeat event.
    pub fn halt(&mut self, scheduler: &mut Scheduler) {
        self.running = false;
        self.last_heartbeat = None;
        scheduler.cancel_where(EventType::is_heartbeat);
    }

    /// Drop queued heartbeat sends but keep ticking.
    pub fn cancel_sends(&mut self, scheduler: &mut Scheduler) -> usize {
        scheduler.cancel_where(|p| matches!(p, EventType::Heartbeat { .. }))
    }

    /// One periodic check. The next tick is scheduled before anything
    /// else happens.
    pub fn on_tick(
        &mut self,
        ctx: &mut EngineContext,
        orchestrator: &mut ElectionOrchestrator,
        cycle: u64,
    ) {
        if !self.running || cycle != self.cycle {
            tracing::debug!(cycle, current = self.cycle, "stale heartbeat tick");
            return;
        }
        self.ticks += 1;
        let period = ctx.config().heartbeat_period;
        ctx.schedule_after(period, EventType::HeartbeatTick { cycle });

        if let Some(leader) = ctx.processes().live_leader() {
            let spacing = ctx.config().heartbeat_spacing;
            let drafts = rules::heartbeat(leader, ctx.processes());
            for (i, draft) in drafts.iter().enumerate() {
                ctx.schedule_after(
                    spacing.saturating_mul(i as u64),
                    EventType::Heartbeat { cycle, draft: *draft },
                );
            }
            self.last_heartbeat = Some(ctx.now());
            if !drafts.is_empty() {
                ctx.log(
                    format!("Leader {} sending heartbeat to {} processes", leader, drafts.len()),
                    LogCategory::Info,
                );
            }

            // A process that came back above the leader while an election
            // was running, or while monitoring was stopped.
            let Some(top) = ctx.processes().highest_active() else {
                return;
            };
            if top > leader && orchestrator.is_idle() {
                ctx.log(
                    format!("Process {} outranks leader {}, initiating election", top, leader),
                    LogCategory::Election,
                );
                if let Err(e) = orchestrator.start_election(ctx, Some(top)) {
                    tracing::warn!(initiator = %top, "takeover election not started: {}", e);
                }
            }
            return;
        }

        if !orchestrator.is_idle() {
            return;
        }
        let Some(initiator) = ctx.processes().lowest_active() else {
            return;
        };

        self.detections += 1;
        ctx.log(
            format!("Leader failure detected! Process {} initiating election", initiator),
            LogCategory::Failure,
        );
        if let Err(e) = orchestrator.start_election(ctx, Some(initiator)) {
            tracing::warn!(%initiator, "failure election not started: {}", e);
        }
    }

    /// Emit one staggered heartbeat, if its sender still leads and its
    /// receiver is still up.
    pub fn on_send(&mut self, ctx: &mut EngineContext, cycle: u64, draft: Outgoing) {
        if !self.running || cycle != self.cycle {
            return;
        }
        let live = ctx.processes();
        if live.live_leader() != Some(draft.from) || !live.is_active(draft.to) {
            tracing::debug!("skipping heartbeat {}", draft);
            return;
        }
        ctx.emit(draft, true);
    }
}
