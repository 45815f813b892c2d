//! Stem - a single looping audio track belonging to a riff
//!
//! Stems are produced by an external cache collaborator with their sample
//! data already decoded. A riff references up to [`NUM_STEMS`](crate::types::NUM_STEMS)
//! of them; the cache may mark a stem failed at any point (eviction, decode
//! fault), after which it renders as silence and contributes no beat or
//! energy signal.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::types::Sample;

/// A single stem: planar left/right sample data plus per-sample analysis
pub struct Stem {
    /// Planar channel data, [left, right], equal lengths
    channels: [Vec<Sample>; 2],
    /// Total sample count of one stem loop
    sample_count: u32,
    /// Packed per-sample beat bitfield, one bit per sample, 64 samples per word
    beat_bits: Vec<u64>,
    /// Per-sample energy, same length as the channel data
    energy: Vec<Sample>,
    /// Set by the owning cache when the stem becomes unusable
    failed: AtomicBool,
}

impl Stem {
    /// Build a stem from planar channel data
    ///
    /// Panics if channel lengths differ. Beat and energy data default to
    /// empty (no beats, zero energy); the cache fills them via
    /// [`Stem::with_analysis`] when analysis has run.
    pub fn from_channels(left: Vec<Sample>, right: Vec<Sample>) -> Self {
        assert_eq!(left.len(), right.len(), "stem channel lengths must match");
        let sample_count = left.len() as u32;
        let beat_words = (left.len() + 63) / 64;
        Self {
            channels: [left, right],
            sample_count,
            beat_bits: vec![0; beat_words],
            energy: vec![0.0; sample_count as usize],
            failed: AtomicBool::new(false),
        }
    }

    /// Attach per-sample beat positions and energy data
    ///
    /// `beat_samples` lists sample indices carrying a beat onset; `energy`
    /// must match the channel length (truncated/zero-padded otherwise).
    pub fn with_analysis(mut self, beat_samples: &[u32], mut energy: Vec<Sample>) -> Self {
        for &beat in beat_samples {
            let idx = beat as usize;
            if idx < self.sample_count as usize {
                self.beat_bits[idx >> 6] |= 1u64 << (idx & 63);
            }
        }
        energy.resize(self.sample_count as usize, 0.0);
        self.energy = energy;
        self
    }

    /// Total sample count of one stem loop
    #[inline]
    pub fn sample_count(&self) -> u32 {
        self.sample_count
    }

    /// Whether the owning cache has marked this stem unusable
    #[inline]
    pub fn has_failed(&self) -> bool {
        self.failed.load(Ordering::Relaxed)
    }

    /// Mark this stem unusable; it renders as silence from now on
    pub fn mark_failed(&self) {
        self.failed.store(true, Ordering::Relaxed);
    }

    /// Left/right amplitude at a sample index (caller guarantees bounds)
    #[inline]
    pub fn frame_at(&self, idx: usize) -> (Sample, Sample) {
        (self.channels[0][idx], self.channels[1][idx])
    }

    /// Whether the sample at `idx` carries a beat onset
    #[inline]
    pub fn has_beat_at(&self, idx: usize) -> bool {
        (self.beat_bits[idx >> 6] >> (idx & 63)) & 1 != 0
    }

    /// Energy value at a sample index
    #[inline]
    pub fn energy_at(&self, idx: usize) -> Sample {
        self.energy[idx]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stem_basics() {
        let stem = Stem::from_channels(vec![0.5; 100], vec![-0.5; 100]);
        assert_eq!(stem.sample_count(), 100);
        assert!(!stem.has_failed());
        assert_eq!(stem.frame_at(42), (0.5, -0.5));
        assert!(!stem.has_beat_at(0));
        assert_eq!(stem.energy_at(0), 0.0);
    }

    #[test]
    fn test_beat_bits_packing() {
        let stem = Stem::from_channels(vec![0.0; 200], vec![0.0; 200])
            .with_analysis(&[0, 63, 64, 130], vec![0.25; 200]);

        assert!(stem.has_beat_at(0));
        assert!(stem.has_beat_at(63));
        assert!(stem.has_beat_at(64));
        assert!(stem.has_beat_at(130));
        assert!(!stem.has_beat_at(1));
        assert!(!stem.has_beat_at(129));
        assert_eq!(stem.energy_at(199), 0.25);
    }

    #[test]
    fn test_mark_failed() {
        let stem = Stem::from_channels(vec![0.0; 10], vec![0.0; 10]);
        stem.mark_failed();
        assert!(stem.has_failed());
    }

    #[test]
    fn test_out_of_range_beats_ignored() {
        let stem = Stem::from_channels(vec![0.0; 10], vec![0.0; 10])
            .with_analysis(&[5, 5000], vec![]);
        assert!(stem.has_beat_at(5));
        assert_eq!(stem.energy_at(9), 0.0);
    }
}
