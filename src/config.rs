//! Engine configuration.
//!
//! Pacing values only shape how traffic is spread out for observers;
//! correctness never depends on them. All durations are milliseconds of
//! virtual time.
//!
//! # Example
//! ```rust
//! use bully::config::ElectionConfig;
//!
//! let config = ElectionConfig::default()
//!     .with_cascade_hops(2)
//!     .with_heartbeat_period(1_000)
//!     .with_default_roster(vec![1, 2, 3]);
//! assert!(config.validate().is_ok());
//! ```

use crate::error::{BullyError, BullyResult};
use crate::message::MessageKind;

/// How long each kind of message stays visible to the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct MessageDurations {
    pub election: u64,
    pub ok: u64,
    pub coordinator: u64,
    pub heartbeat: u64,
}

impl MessageDurations {
    pub fn for_kind(&self, kind: MessageKind, is_heartbeat: bool) -> u64 {
        if is_heartbeat {
            return self.heartbeat;
        }
        match kind {
            MessageKind::Election => self.election,
            MessageKind::Ok => self.ok,
            MessageKind::Coordinator => self.coordinator,
        }
    }
}

impl Default for MessageDurations {
    fn default() -> Self {
        MessageDurations {
            election: 3_000,
            ok: 2_500,
            coordinator: 2_000,
            heartbeat: 1_000,
        }
    }
}

/// Everything tunable about one engine instance.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serialize", serde(default))]
pub struct ElectionConfig {
    /// Gap between consecutive ELECTION sends.
    pub election_spacing: u64,
    /// Gap between consecutive OK replies.
    pub ok_spacing: u64,
    /// Gap between consecutive COORDINATOR announcements.
    pub coordinator_spacing: u64,
    /// Number of intermediate processes whose own election round is
    /// replayed between the initiator's round and the announcement.
    /// `0` shows the initiator's round only.
    pub cascade_hops: usize,
    /// Heartbeat monitor tick period.
    pub heartbeat_period: u64,
    /// Gap between consecutive heartbeat sends within one tick.
    pub heartbeat_spacing: u64,
    pub durations: MessageDurations,
    /// Trailing window kept by [`LogBuffer`](crate::eventlog::LogBuffer).
    pub log_retention: usize,
    /// Roster used at start-up and restored by `reset`.
    pub default_roster: Vec<u64>,
}

impl Default for ElectionConfig {
    fn default() -> Self {
        ElectionConfig {
            election_spacing: 150,
            ok_spacing: 100,
            coordinator_spacing: 100,
            cascade_hops: 1,
            heartbeat_period: 2_000,
            heartbeat_spacing: 100,
            durations: MessageDurations::default(),
            log_retention: crate::eventlog::DEFAULT_LOG_RETENTION,
            default_roster: vec![1, 2, 3, 4, 5],
        }
    }
}

impl ElectionConfig {
    // ── Builders ──────────────────────────────────────────────

    pub fn with_spacing(mut self, election: u64, ok: u64, coordinator: u64) -> Self {
        self.election_spacing = election;
        self.ok_spacing = ok;
        self.coordinator_spacing = coordinator;
        self
    }

    pub fn with_cascade_hops(mut self, hops: usize) -> Self {
        self.cascade_hops = hops;
        self
    }

    pub fn with_heartbeat_period(mut self, period: u64) -> Self {
        self.heartbeat_period = period;
        self
    }

    pub fn with_heartbeat_spacing(mut self, spacing: u64) -> Self {
        self.heartbeat_spacing = spacing;
        self
    }

    pub fn with_durations(mut self, durations: MessageDurations) -> Self {
        self.durations = durations;
        self
    }

    pub fn with_log_retention(mut self, entries: usize) -> Self {
        self.log_retention = entries;
        self
    }

    pub fn with_default_roster(mut self, ids: Vec<u64>) -> Self {
        self.default_roster = ids;
        self
    }

    // ── Validation ────────────────────────────────────────────

    /// Reject configurations the engine cannot run with.
    pub fn validate(&self) -> BullyResult<()> {
        if self.heartbeat_period == 0 {
            return Err(BullyError::InvalidConfig(
                "heartbeat period must be non-zero".into(),
            ));
        }
        if self.log_retention == 0 {
            return Err(BullyError::InvalidConfig(
                "log retention must keep at least one entry".into(),
            ));
        }
        crate::process::ProcessSet::from_ids(self.default_roster.iter().copied())?;
        Ok(())
    }

    #[cfg(feature = "serialize")]
    pub fn from_json(json: &str) -> BullyResult<Self> {
        let config: ElectionConfig =
            serde_json::from_str(json).map_err(|e| BullyError::Serialization(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(ElectionConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_period_rejected() {
        let c = ElectionConfig::default().with_heartbeat_period(0);
        assert!(matches!(c.validate(), Err(BullyError::InvalidConfig(_))));
    }

    #[test]
    fn test_bad_default_roster_rejected() {
        let c = ElectionConfig::default().with_default_roster(vec![3, 3]);
        assert!(matches!(c.validate(), Err(BullyError::InvalidConfig(_))));
        let c = ElectionConfig::default().with_default_roster(vec![]);
        assert!(c.validate().is_err());
    }

    #[test]
    fn test_durations_for_kind() {
        let d = MessageDurations::default();
        assert_eq!(d.for_kind(MessageKind::Ok, false), 2_500);
        assert_eq!(d.for_kind(MessageKind::Coordinator, false), 2_000);
        assert_eq!(d.for_kind(MessageKind::Coordinator, true), 1_000);
    }

    #[cfg(feature = "serialize")]
    #[test]
    fn test_from_json_fills_defaults() {
        let c = ElectionConfig::from_json(r#"{"cascade_hops": 3, "default_roster": [2, 4]}"#).unwrap();
        assert_eq!(c.cascade_hops, 3);
        assert_eq!(c.default_roster, vec![2, 4]);
        assert_eq!(c.heartbeat_period, 2_000);
    }
}
