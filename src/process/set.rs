//! The roster: every process and the leadership record.

use std::collections::{btree_map, BTreeMap};

use crate::error::{BullyError, BullyResult};

use super::id::ProcessId;

// ── Process ───────────────────────────────────────────────────────────

/// Liveness and leadership of one process.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct Process {
    pub id: ProcessId,
    pub is_active: bool,
    pub is_leader: bool,
}

impl Process {
    fn fresh(id: ProcessId) -> Self {
        Process {
            id,
            is_active: true,
            is_leader: false,
        }
    }

    /// Display label, e.g. `"P3"`.
    pub fn label(&self) -> String {
        self.id.to_string()
    }
}

/// What a successful [`ProcessSet::toggle`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Toggled {
    pub id: ProcessId,
    /// Liveness after the flip.
    pub now_active: bool,
    /// The process led before the flip and lost leadership because of it.
    pub lost_leadership: bool,
}

// ── ProcessSet ────────────────────────────────────────────────────────

/// The authoritative roster.
///
/// Processes are kept in ascending id order so every query and every
/// rule built on top of it is deterministic. At most one process has
/// `is_leader` set, and it always agrees with [`ProcessSet::leader`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessSet {
    processes: BTreeMap<ProcessId, Process>,
    leader: Option<ProcessId>,
}

impl ProcessSet {
    /// Build a roster from raw ids. All processes start active and the
    /// highest id leads.
    ///
    /// Fails with [`BullyError::InvalidConfig`] on an empty list, a zero
    /// id, or a repeated id.
    pub fn from_ids<I>(ids: I) -> BullyResult<Self>
    where
        I: IntoIterator<Item = u64>,
    {
        let mut processes = BTreeMap::new();
        for raw in ids {
            let id = ProcessId::new(raw);
            if !id.is_valid() {
                return Err(BullyError::InvalidConfig(format!(
                    "process ids must be positive, got {}",
                    raw
                )));
            }
            if processes.insert(id, Process::fresh(id)).is_some() {
                return Err(BullyError::InvalidConfig(format!(
                    "duplicate process id {}",
                    raw
                )));
            }
        }

        let mut set = ProcessSet {
            processes,
            leader: None,
        };
        let top = set
            .highest_active()
            .ok_or_else(|| BullyError::InvalidConfig("roster is empty".into()))?;
        set.mark_leader(Some(top));
        Ok(set)
    }

    /// Replace the roster. On error the current roster is untouched.
    pub fn configure<I>(&mut self, ids: I) -> BullyResult<()>
    where
        I: IntoIterator<Item = u64>,
    {
        *self = ProcessSet::from_ids(ids)?;
        Ok(())
    }

    /// Flip liveness of `id`. Returns `None` (and changes nothing) if the
    /// id is unknown.
    ///
    /// Deactivating the leader clears leadership; nobody leads until an
    /// election settles it.
    pub fn toggle(&mut self, id: ProcessId) -> Option<Toggled> {
        let process = self.processes.get_mut(&id)?;
        process.is_active = !process.is_active;
        let now_active = process.is_active;

        let lost_leadership = !now_active && self.leader == Some(id);
        if lost_leadership {
            self.mark_leader(None);
        }

        Some(Toggled {
            id,
            now_active,
            lost_leadership,
        })
    }

    /// Record `id` as the leader. Returns the previous leader.
    pub fn set_leader(&mut self, id: ProcessId) -> BullyResult<Option<ProcessId>> {
        let process = self
            .processes
            .get(&id)
            .ok_or(BullyError::UnknownProcess(id))?;
        if !process.is_active {
            return Err(BullyError::ProcessInactive(id));
        }
        let previous = self.leader;
        self.mark_leader(Some(id));
        Ok(previous)
    }

    /// Forget the leader. Returns whoever led before.
    pub fn clear_leader(&mut self) -> Option<ProcessId> {
        let previous = self.leader;
        self.mark_leader(None);
        previous
    }

    fn mark_leader(&mut self, leader: Option<ProcessId>) {
        for process in self.processes.values_mut() {
            process.is_leader = Some(process.id) == leader;
        }
        self.leader = leader;
    }

    // ── Queries ───────────────────────────────────────────────

    /// The recorded leader, active or not.
    pub fn leader(&self) -> Option<ProcessId> {
        self.leader
    }

    /// The recorded leader, only if it is still active.
    pub fn live_leader(&self) -> Option<ProcessId> {
        self.leader.filter(|id| self.is_active(*id))
    }

    /// Greatest active id, or `None` when every process is down.
    pub fn highest_active(&self) -> Option<ProcessId> {
        self.active_ids().next_back()
    }

    /// Smallest active id, the default election initiator.
    pub fn lowest_active(&self) -> Option<ProcessId> {
        self.active_ids().next()
    }

    /// The smallest active id strictly greater than `id`.
    pub fn next_active_above(&self, id: ProcessId) -> Option<ProcessId> {
        self.processes
            .range((std::ops::Bound::Excluded(id), std::ops::Bound::Unbounded))
            .find(|(_, p)| p.is_active)
            .map(|(pid, _)| *pid)
    }

    /// Lazily iterate active ids in ascending order.
    ///
    /// The iterator is finite and `Clone`; calling this again restarts it.
    pub fn active_ids(&self) -> ActiveIds<'_> {
        ActiveIds {
            inner: self.processes.values(),
        }
    }

    pub fn get(&self, id: ProcessId) -> Option<&Process> {
        self.processes.get(&id)
    }

    pub fn contains(&self, id: ProcessId) -> bool {
        self.processes.contains_key(&id)
    }

    /// `false` for unknown ids.
    pub fn is_active(&self, id: ProcessId) -> bool {
        self.processes.get(&id).is_some_and(|p| p.is_active)
    }

    /// All processes in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = &Process> {
        self.processes.values()
    }

    /// All ids in ascending order.
    pub fn ids(&self) -> Vec<ProcessId> {
        self.processes.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.processes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }

    pub fn active_count(&self) -> usize {
        self.active_ids().count()
    }
}

// ── ActiveIds ─────────────────────────────────────────────────────────

/// Iterator over active process ids, ascending. See [`ProcessSet::active_ids`].
#[derive(Debug, Clone)]
pub struct ActiveIds<'a> {
    inner: btree_map::Values<'a, ProcessId, Process>,
}

impl Iterator for ActiveIds<'_> {
    type Item = ProcessId;

    fn next(&mut self) -> Option<ProcessId> {
        self.inner.by_ref().find(|p| p.is_active).map(|p| p.id)
    }
}

impl DoubleEndedIterator for ActiveIds<'_> {
    fn next_back(&mut self) -> Option<ProcessId> {
        self.inner.by_ref().rev().find(|p| p.is_active).map(|p| p.id)
    }
}
