/// Inspection API for hosts.
///
/// Point-in-time snapshots of the engine and descriptions of single
/// steps, shaped for a renderer or a log window. With the `serialize`
/// feature both can be exported as JSON strings, which is what the wasm
/// façade hands to JavaScript.

use crate::event::EventType;
use crate::observer::ElectionObserver;
use crate::orchestrator::{OrchestratorState, SessionStatus};
use crate::process::Process;
use crate::simulator::BullySimulator;

#[cfg(feature = "serialize")]
use crate::error::{BullyError, BullyResult};

// ── StepResult ────────────────────────────────────────────────────────

/// What a single [`BullySimulator::step_described`] call did.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct StepResult {
    pub event_id: u64,
    /// Virtual time of the event, in ms.
    pub time: u64,
    pub description: String,
    /// Events processed so far, this one included.
    pub total_events: u64,
}

// ── Snapshot ──────────────────────────────────────────────────────────

/// The in-flight election, as a host sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct SessionSummary {
    pub id: u64,
    pub initiator: u64,
    pub status: SessionStatus,
    pub started_at: u64,
    pub oks_received: usize,
    pub winner: Option<u64>,
}

/// Everything a renderer needs to draw the current state.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct SystemSnapshot {
    pub now: u64,
    pub processes: Vec<Process>,
    pub leader: Option<u64>,
    pub active_count: usize,
    pub running: bool,
    pub last_heartbeat: Option<u64>,
    pub state: OrchestratorState,
    pub session: Option<SessionSummary>,
    pub completed_elections: u64,
    pub pending_events: usize,
    pub events_processed: u64,
}

impl<O: ElectionObserver> BullySimulator<O> {
    /// Fire the next event and describe it. `None` if nothing is pending.
    pub fn step_described(&mut self) -> Option<StepResult> {
        let event = self.step()?;
        Some(StepResult {
            event_id: event.id.raw(),
            time: event.scheduled_at.millis(),
            description: describe_event(&event.payload),
            total_events: self.events_processed(),
        })
    }

    pub fn snapshot(&self) -> SystemSnapshot {
        let orchestrator = self.orchestrator();
        SystemSnapshot {
            now: self.now().millis(),
            processes: self.processes().iter().cloned().collect(),
            leader: self.leader().map(|id| id.raw()),
            active_count: self.processes().active_count(),
            running: self.is_running(),
            last_heartbeat: self.heartbeat().last_heartbeat().map(|t| t.millis()),
            state: orchestrator.state(),
            session: orchestrator.session().map(|s| SessionSummary {
                id: s.id.raw(),
                initiator: s.initiator.raw(),
                status: s.status,
                started_at: s.started_at.millis(),
                oks_received: s.oks_received,
                winner: s.winner.map(|w| w.raw()),
            }),
            completed_elections: orchestrator.completed_sessions(),
            pending_events: self.pending_events(),
            events_processed: self.events_processed(),
        }
    }

    /// [`snapshot`](Self::snapshot) as pretty-printed JSON.
    #[cfg(feature = "serialize")]
    pub fn snapshot_json(&self) -> BullyResult<String> {
        serde_json::to_string_pretty(&self.snapshot())
            .map_err(|e| BullyError::Serialization(e.to_string()))
    }
}

/// Human-readable description of a scheduled event.
pub fn describe_event(payload: &EventType) -> String {
    match payload {
        EventType::Election { session, step } => {
            use crate::event::ElectionStep;
            match step {
                ElectionStep::Send(draft) => format!("{}: {} {} → {}", session, draft.kind, draft.from, draft.to),
                ElectionStep::Declare => format!("{}: deadline, declare winner", session),
                ElectionStep::Finish => format!("{}: announcements done", session),
            }
        }
        EventType::HeartbeatTick { cycle } => format!("heartbeat tick (cycle {})", cycle),
        EventType::Heartbeat { draft, .. } => format!("HEARTBEAT {} → {}", draft.from, draft.to),
    }
}

#[cfg(test)]
mod tests {
    use crate::observer::Recorder;
    use crate::orchestrator::OrchestratorState;
    use crate::process::ProcessId;
    use crate::simulator::BullySimulator;

    #[test]
    fn test_snapshot_tracks_session() {
        let mut sim = BullySimulator::new(Recorder::new()).unwrap();
        let snap = sim.snapshot();
        assert_eq!(snap.processes.len(), 5);
        assert_eq!(snap.leader, Some(5));
        assert_eq!(snap.active_count, 5);
        assert_eq!(snap.last_heartbeat, None);
        assert_eq!(snap.state, OrchestratorState::Idle);
        assert!(snap.session.is_none());

        sim.start_election(Some(ProcessId::new(3))).unwrap();
        let snap = sim.snapshot();
        assert_eq!(snap.state, OrchestratorState::Running);
        assert_eq!(snap.session.as_ref().map(|s| s.initiator), Some(3));
        assert!(snap.pending_events > 0);

        sim.run_until_settled(1_000);
        let snap = sim.snapshot();
        assert_eq!(snap.completed_elections, 1);
        assert!(snap.session.is_none());
    }

    #[test]
    fn test_step_described() {
        let mut sim = BullySimulator::new(Recorder::new()).unwrap();
        assert!(sim.step_described().is_none());

        sim.start_election(Some(ProcessId::new(4))).unwrap();
        let step = sim.step_described().unwrap();
        assert_eq!(step.time, 0);
        assert_eq!(step.total_events, 1);
        assert_eq!(step.description, "S#0: ELECTION P4 → P5");
    }

    #[cfg(feature = "serialize")]
    #[test]
    fn test_snapshot_json_shape() {
        let sim = BullySimulator::new(Recorder::new()).unwrap();
        let json = sim.snapshot_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["leader"], 5);
        assert_eq!(value["processes"].as_array().map(|a| a.len()), Some(5));
        assert_eq!(value["state"], "Idle");
    }
}
