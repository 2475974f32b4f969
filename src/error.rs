//! Error types for the election engine.
//!
//! Nothing here is fatal. Every variant describes a request that was
//! refused and left the engine exactly as it was; the worst reachable
//! state is "no leader", which is a normal, representable state.

use crate::orchestrator::SessionId;
use crate::process::ProcessId;

/// Every way an inbound request to the engine can be refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BullyError {
    // ── Roster ────────────────────────────────────────────

    /// The roster or engine configuration was rejected. Nothing was applied.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A process id was referenced but is not in the roster.
    #[error("process {0} is not in the roster")]
    UnknownProcess(ProcessId),

    /// The process exists but is currently inactive.
    #[error("process {0} is inactive")]
    ProcessInactive(ProcessId),

    // ── Elections ─────────────────────────────────────────

    /// A session is already running; the new request was dropped.
    #[error("election {active} is already in progress")]
    ElectionAlreadyInProgress { active: SessionId },

    /// No process is active, so there is nobody to elect.
    #[error("no active processes, no leader to elect")]
    NoActiveProcesses,

    // ── Host boundary ─────────────────────────────────────

    /// A snapshot or log could not be serialized for the host.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Convenience alias for `Result<T, BullyError>`.
pub type BullyResult<T> = Result<T, BullyError>;
