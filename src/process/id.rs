//! Process ids: copyable, totally ordered process identifiers.

/// Identifier of one simulated process.
///
/// The Bully algorithm ranks processes by this value: the highest active
/// id always wins. Zero is representable but never accepted into a
/// roster (ids are positive).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct ProcessId(u64);

impl ProcessId {
    #[inline]
    pub fn new(id: u64) -> Self {
        ProcessId(id)
    }

    #[inline]
    pub fn raw(self) -> u64 {
        self.0
    }

    /// Whether this id may appear in a roster.
    #[inline]
    pub fn is_valid(self) -> bool {
        self.0 > 0
    }
}

impl std::fmt::Display for ProcessId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "P{}", self.0)
    }
}
