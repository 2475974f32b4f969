//! # Bully — Deterministic Leader Election Engine
//!
//! An implementation of the Bully algorithm for a fixed roster of
//! processes, with heartbeat-based failure detection. No async, no
//! threads, no wall-clock time. A virtual millisecond clock paces every
//! message, so hosts (a browser animation loop, a CLI, a test) decide
//! when time moves.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────┐
//! │          BullySimulator          │ ← inbound ops + clock
//! │  ┌────────────────────────────┐  │
//! │  │   ElectionOrchestrator     │  │ ← one session at a time
//! │  │   HeartbeatMonitor         │  │ ← periodic liveness check
//! │  └────────────────────────────┘  │
//! │  ┌────────────┐ ┌─────────────┐  │
//! │  │ Scheduler  │ │ ProcessSet  │  │ ← min-heap / live roster
//! │  └────────────┘ └─────────────┘  │
//! │  ┌────────────┐                  │
//! │  │   rules    │                  │ ← pure Bully message rules
//! │  └────────────┘                  │
//! └────────────────┬─────────────────┘
//!                  ▼
//!          ElectionObserver            ← messages, logs, completions
//! ```
//!
//! ## Example
//!
//! ```
//! use bully::{BullySimulator, ElectionConfig, ProcessId};
//!
//! let mut sim = BullySimulator::recording(ElectionConfig::default()).unwrap();
//! sim.set_running(true);
//! sim.toggle(ProcessId::new(5)).unwrap();   // the leader fails
//! sim.advance_by(4_000);                   // two heartbeat periods
//!
//! assert_eq!(sim.leader(), Some(ProcessId::new(4)));
//! assert_eq!(sim.observer().completions, vec![ProcessId::new(4)]);
//! ```

pub mod api;
pub mod config;
pub mod context;
pub mod error;
pub mod event;
pub mod eventlog;
pub mod heartbeat;
pub mod message;
pub mod observer;
pub mod orchestrator;
pub mod process;
pub mod rules;
pub mod scheduler;
pub mod simulator;
pub mod time;
pub mod wasm;

// Re-exports for convenience.
pub use api::{SessionSummary, StepResult, SystemSnapshot};
pub use config::{ElectionConfig, MessageDurations};
pub use context::EngineContext;
pub use error::{BullyError, BullyResult};
pub use event::{ElectionStep, Event, EventId, EventType};
pub use eventlog::{LogBuffer, LogCategory, LogEntry, DEFAULT_LOG_RETENTION};
pub use heartbeat::HeartbeatMonitor;
pub use message::{Message, MessageId, MessageIdGen, MessageKind, Outgoing};
pub use observer::{ElectionObserver, Recorder};
pub use orchestrator::{
    ElectionOrchestrator, ElectionSession, OrchestratorState, SessionId, SessionStatus,
};
pub use process::{Process, ProcessId, ProcessSet, Toggled};
pub use scheduler::Scheduler;
pub use simulator::BullySimulator;
pub use time::VirtualTime;
