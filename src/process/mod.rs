//! The process roster.
//!
//! [`ProcessSet`] is the single authoritative record of which processes
//! exist, which are active, and which one leads. Only its own methods
//! mutate it; the election rules read it, and the orchestrator and the
//! heartbeat monitor read it again at every fire time.
//!
//! | Sub-module | Contents |
//! |---|---|
//! | [`id`] | [`ProcessId`] newtype |
//! | [`set`] | [`Process`], [`ProcessSet`], [`ActiveIds`], [`Toggled`] |

pub mod id;
pub mod set;

pub use id::ProcessId;
pub use set::{ActiveIds, Process, ProcessSet, Toggled};
