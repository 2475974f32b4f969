/// Virtual time for the election engine.
///
/// One tick is one millisecond of simulated time. Time advances only
/// when the simulator is told to advance it; nothing in the crate reads
/// the wall clock, so every run is reproducible.

/// A point on the simulated millisecond timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct VirtualTime(u64);

impl VirtualTime {
    /// The instant the simulator starts at.
    pub const ZERO: VirtualTime = VirtualTime(0);

    #[inline]
    pub fn from_millis(ms: u64) -> Self {
        VirtualTime(ms)
    }

    #[inline]
    pub fn millis(self) -> u64 {
        self.0
    }

    /// The instant `delay_ms` after `self`. Saturates at the end of time.
    #[inline]
    pub fn plus(self, delay_ms: u64) -> VirtualTime {
        VirtualTime(self.0.saturating_add(delay_ms))
    }

    /// Milliseconds elapsed since `earlier`, or `None` if `earlier` is
    /// actually later than `self`.
    #[inline]
    pub fn since(self, earlier: VirtualTime) -> Option<u64> {
        self.0.checked_sub(earlier.0)
    }
}

impl std::fmt::Display for VirtualTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "t={}ms", self.0)
    }
}
