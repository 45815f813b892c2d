//! Riff - a multi-stem musical loop with fixed tempo and bar structure
//!
//! Riffs are immutable once published: an external resolver builds them with
//! fully decoded stem data and precomputed timing, then pushes them into the
//! engine's pending-riff queue. Ownership is shared through
//! [`basedrop::Shared`] so that the last reference dropped on the render
//! thread defers the (potentially large) deallocation to the collector
//! thread instead of freeing inside the callback.

mod stem;
mod timing;

pub use stem::Stem;
pub use timing::{RiffProgression, RiffTiming};

use basedrop::Shared;

use crate::types::{Sample, NUM_STEMS};

/// Shared riff reference, safe to drop on the render thread
pub type RiffPtr = Shared<Riff>;

/// Shared stem reference, owned by the external stem cache
pub type StemPtr = Shared<Stem>;

/// Outcome of resolving a riff's stems and timing
///
/// Only riffs that resolved successfully may ever be promoted to the live
/// slot; anything else is discarded at acceptance time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// All stems fetched and timing computed
    Success,
    /// One or more stems could not be retrieved
    StemFetchFailed,
    /// Timing metadata was inconsistent or absent
    TimingInvalid,
}

/// One multi-stem loop, ready to mix
pub struct Riff {
    /// Timing facts, fixed at resolve time
    pub timing: RiffTiming,
    /// Per-stem linear mix gain
    pub stem_gains: [Sample; NUM_STEMS],
    /// Per-stem playback-rate multiplier (1.0 = no stretch)
    pub stem_time_scales: [Sample; NUM_STEMS],
    /// Stem references; `None` slots render as silence
    pub stems: [Option<StemPtr>; NUM_STEMS],
    /// Resolve outcome; gates promotion to the live slot
    pub sync_state: SyncState,
}

impl Riff {
    /// Whether this riff resolved fully and may become the live riff
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.sync_state == SyncState::Success
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::gc::gc_handle;

    #[test]
    fn test_riff_validity_gate() {
        let riff = Riff {
            timing: RiffTiming {
                bpm: 120.0,
                quarter_beats: 4,
                bar_count: 1,
                length_in_samples: 8,
                samples_per_bar: 8,
                seconds_per_bar: 2.0,
                longest_stem_in_bars: 1,
            },
            stem_gains: [1.0; NUM_STEMS],
            stem_time_scales: [1.0; NUM_STEMS],
            stems: std::array::from_fn(|_| None),
            sync_state: SyncState::StemFetchFailed,
        };
        assert!(!riff.is_valid());

        let shared = RiffPtr::new(&gc_handle(), riff);
        assert_eq!(shared.sync_state, SyncState::StemFetchFailed);
    }
}
