//! The Bully algorithm's message-generation rules.
//!
//! Pure functions over a roster snapshot: no timing, no mutation, no
//! message identity. For a fixed snapshot and fixed inputs they always
//! return the same drafts, in ascending order of the id that varies.
//! Pacing those drafts out over time is the orchestrator's job.

use crate::message::{MessageKind, Outgoing};
use crate::process::{ProcessId, ProcessSet};

/// ELECTION drafts from `initiator` to every active process with a
/// higher id.
///
/// Empty if the initiator is unknown or inactive, and empty if nobody
/// higher is active. The second case means the initiator should
/// proclaim itself leader right away.
pub fn start_election(initiator: ProcessId, snapshot: &ProcessSet) -> Vec<Outgoing> {
    if !snapshot.is_active(initiator) {
        return Vec::new();
    }
    snapshot
        .active_ids()
        .filter(|id| *id > initiator)
        .map(|target| Outgoing::new(MessageKind::Election, initiator, target))
        .collect()
}

/// What `receiver` sends after an ELECTION from `sender`: an OK back to
/// the sender, followed by its own election round.
///
/// Empty if the receiver is inactive.
pub fn respond_to_election(
    receiver: ProcessId,
    sender: ProcessId,
    snapshot: &ProcessSet,
) -> Vec<Outgoing> {
    if !snapshot.is_active(receiver) {
        return Vec::new();
    }
    let mut out = vec![Outgoing::new(MessageKind::Ok, receiver, sender)];
    out.extend(start_election(receiver, snapshot));
    out
}

/// COORDINATOR drafts from `leader` to every other active process.
///
/// Empty if the leader is inactive.
pub fn announce_coordinator(leader: ProcessId, snapshot: &ProcessSet) -> Vec<Outgoing> {
    if !snapshot.is_active(leader) {
        return Vec::new();
    }
    snapshot
        .active_ids()
        .filter(|id| *id != leader)
        .map(|target| Outgoing::new(MessageKind::Coordinator, leader, target))
        .collect()
}

/// Heartbeat drafts. Heartbeats travel as COORDINATOR messages; the
/// caller flags them as heartbeats when stamping.
pub fn heartbeat(leader: ProcessId, snapshot: &ProcessSet) -> Vec<Outgoing> {
    announce_coordinator(leader, snapshot)
}

/// True iff no active process has an id strictly greater than
/// `process`. Applied when an election deadline passes with no OK.
pub fn should_self_proclaim(process: ProcessId, snapshot: &ProcessSet) -> bool {
    !snapshot.active_ids().any(|id| id > process)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid(n: u64) -> ProcessId {
        ProcessId::new(n)
    }

    fn roster(ids: &[u64]) -> ProcessSet {
        ProcessSet::from_ids(ids.iter().copied()).unwrap()
    }

    fn edges(out: &[Outgoing]) -> Vec<(MessageKind, u64, u64)> {
        out.iter().map(|o| (o.kind, o.from.raw(), o.to.raw())).collect()
    }

    #[test]
    fn test_start_election_targets_higher_active() {
        let mut set = roster(&[1, 2, 3, 4, 5]);
        set.toggle(pid(4));
        let out = start_election(pid(2), &set);
        assert_eq!(
            edges(&out),
            vec![(MessageKind::Election, 2, 3), (MessageKind::Election, 2, 5)]
        );
    }

    #[test]
    fn test_start_election_from_top_is_empty() {
        let set = roster(&[1, 2, 3]);
        assert!(start_election(pid(3), &set).is_empty());
    }

    #[test]
    fn test_start_election_from_inactive_or_unknown_is_empty() {
        let mut set = roster(&[1, 2, 3]);
        set.toggle(pid(1));
        assert!(start_election(pid(1), &set).is_empty());
        assert!(start_election(pid(42), &set).is_empty());
    }

    #[test]
    fn test_respond_to_election_acks_then_cascades() {
        let set = roster(&[1, 2, 3, 4]);
        let out = respond_to_election(pid(2), pid(1), &set);
        assert_eq!(
            edges(&out),
            vec![
                (MessageKind::Ok, 2, 1),
                (MessageKind::Election, 2, 3),
                (MessageKind::Election, 2, 4),
            ]
        );
    }

    #[test]
    fn test_respond_from_inactive_is_empty() {
        let mut set = roster(&[1, 2]);
        set.toggle(pid(2));
        assert!(respond_to_election(pid(2), pid(1), &set).is_empty());
    }

    #[test]
    fn test_announce_coordinator_skips_inactive_and_self() {
        let mut set = roster(&[1, 2, 3, 4]);
        set.toggle(pid(2));
        let out = announce_coordinator(pid(4), &set);
        assert_eq!(
            edges(&out),
            vec![(MessageKind::Coordinator, 4, 1), (MessageKind::Coordinator, 4, 3)]
        );

        set.toggle(pid(4));
        assert!(announce_coordinator(pid(4), &set).is_empty());
    }

    #[test]
    fn test_should_self_proclaim() {
        let mut set = roster(&[1, 2, 3]);
        assert!(!should_self_proclaim(pid(2), &set));
        assert!(should_self_proclaim(pid(3), &set));
        set.toggle(pid(3));
        assert!(should_self_proclaim(pid(2), &set));
    }

    #[test]
    fn test_rules_are_deterministic() {
        let set = roster(&[9, 3, 7, 1]);
        assert_eq!(start_election(pid(1), &set), start_election(pid(1), &set));
        assert_eq!(announce_coordinator(pid(9), &set), heartbeat(pid(9), &set));
    }

    #[test]
    fn test_every_draft_has_distinct_endpoints() {
        let set = roster(&[1, 2, 3, 4, 5]);
        for id in set.ids() {
            let all = start_election(id, &set)
                .into_iter()
                .chain(announce_coordinator(id, &set))
                .chain(respond_to_election(id, pid(1), &set).into_iter().skip(1));
            for o in all {
                assert_ne!(o.from, o.to, "self-addressed draft {}", o);
                assert!(set.contains(o.from) && set.contains(o.to));
            }
        }
    }
}
