//! Lock-free mixer state for observer threads
//!
//! The render thread writes these atomics at the end of every block; a UI or
//! any other observer reads them without taking a lock. All operations use
//! `Ordering::Relaxed` since only visibility is needed, not synchronization
//! with other memory operations.

use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU32, AtomicU64, Ordering};

use crate::types::NUM_STEMS;

/// Lock-free playback/recording state published by the render thread
pub struct MixerAtomics {
    /// Riff playback percentage, f64 bits
    pub percentage: AtomicU64,
    /// Bar index within the riff loop
    pub bar: AtomicI32,
    /// Quarter-beat segment within the bar
    pub bar_segment: AtomicI32,
    /// Crossfade progress in [0, 1), f32 bits
    pub transition: AtomicU32,
    /// Current riff tempo, f64 bits (for downstream plugin time info)
    pub tempo: AtomicU64,
    /// Current riff time-signature numerator
    pub time_sig_numerator: AtomicU32,
    /// Bars repeated since the last transition or recording start
    pub repeat_bar: AtomicU32,
    /// Bar index capture paused on; -1 while unpaused
    pub paused_on_bar: AtomicI32,
    /// Whether repetition compression is holding capture
    pub repcom_paused: AtomicBool,
    /// Whether the multitrack recorder is actively writing
    pub recording: AtomicBool,
    /// Whether a recording start/stop request is still in flight
    pub in_flux: AtomicBool,
    /// Aggregate storage used by the multitrack writers, bytes
    pub storage_bytes: AtomicU64,
    /// Per-stem beat hits since the meter last consumed them, one bit per stem
    pub beat_mask: AtomicU32,
    /// Set when >= 3 stems hit a beat within one block
    pub consensus_hit: AtomicBool,
    /// Per-stem energy, f32 bits
    pub stem_energy: [AtomicU32; NUM_STEMS],
}

impl MixerAtomics {
    pub fn new() -> Self {
        Self {
            percentage: AtomicU64::new(0),
            bar: AtomicI32::new(0),
            bar_segment: AtomicI32::new(0),
            transition: AtomicU32::new(0),
            tempo: AtomicU64::new(0),
            time_sig_numerator: AtomicU32::new(4),
            repeat_bar: AtomicU32::new(0),
            paused_on_bar: AtomicI32::new(-1),
            repcom_paused: AtomicBool::new(false),
            recording: AtomicBool::new(false),
            in_flux: AtomicBool::new(false),
            storage_bytes: AtomicU64::new(0),
            beat_mask: AtomicU32::new(0),
            consensus_hit: AtomicBool::new(false),
            stem_energy: std::array::from_fn(|_| AtomicU32::new(0)),
        }
    }

    /// Riff playback percentage (lock-free)
    #[inline]
    pub fn playback_percentage(&self) -> f64 {
        f64::from_bits(self.percentage.load(Ordering::Relaxed))
    }

    #[inline]
    pub(crate) fn set_playback_percentage(&self, value: f64) {
        self.percentage.store(value.to_bits(), Ordering::Relaxed);
    }

    /// Bar index within the riff loop (lock-free)
    #[inline]
    pub fn playback_bar(&self) -> i32 {
        self.bar.load(Ordering::Relaxed)
    }

    /// Quarter-beat segment within the bar (lock-free)
    #[inline]
    pub fn playback_bar_segment(&self) -> i32 {
        self.bar_segment.load(Ordering::Relaxed)
    }

    /// Crossfade progress in [0, 1) (lock-free)
    #[inline]
    pub fn transition_value(&self) -> f32 {
        f32::from_bits(self.transition.load(Ordering::Relaxed))
    }

    #[inline]
    pub(crate) fn set_transition_value(&self, value: f32) {
        self.transition.store(value.to_bits(), Ordering::Relaxed);
    }

    /// Current riff tempo in BPM (lock-free)
    #[inline]
    pub fn tempo_bpm(&self) -> f64 {
        f64::from_bits(self.tempo.load(Ordering::Relaxed))
    }

    #[inline]
    pub(crate) fn set_tempo_bpm(&self, value: f64) {
        self.tempo.store(value.to_bits(), Ordering::Relaxed);
    }

    /// Bars repeated since the last transition or recording start (lock-free)
    #[inline]
    pub fn bar_repetitions(&self) -> u32 {
        self.repeat_bar.load(Ordering::Relaxed)
    }

    /// Bar index capture paused on, -1 while unpaused (lock-free)
    #[inline]
    pub fn bar_paused_on(&self) -> i32 {
        self.paused_on_bar.load(Ordering::Relaxed)
    }

    /// Whether the recorder is actively writing (lock-free)
    #[inline]
    pub fn is_recording_active(&self) -> bool {
        self.recording.load(Ordering::Relaxed)
    }

    /// Whether a recording start/stop request is still in flight (lock-free)
    #[inline]
    pub fn is_in_flux(&self) -> bool {
        self.in_flux.load(Ordering::Relaxed)
    }

    /// Per-stem energy value (lock-free)
    #[inline]
    pub fn stem_energy(&self, stem: usize) -> f32 {
        f32::from_bits(self.stem_energy[stem].load(Ordering::Relaxed))
    }

    #[inline]
    pub(crate) fn set_stem_energy(&self, stem: usize, value: f32) {
        self.stem_energy[stem].store(value.to_bits(), Ordering::Relaxed);
    }

    /// OR per-block beat hits into the mask consumed by the meter
    #[inline]
    pub(crate) fn merge_beat_mask(&self, mask: u32) {
        self.beat_mask.fetch_or(mask, Ordering::Relaxed);
    }

    /// Consume the accumulated beat mask (meter thread)
    #[inline]
    pub fn take_beat_mask(&self) -> u32 {
        self.beat_mask.swap(0, Ordering::Relaxed)
    }

    /// Consume the consensus-beat flag (meter thread)
    #[inline]
    pub fn take_consensus_hit(&self) -> bool {
        self.consensus_hit.swap(false, Ordering::Relaxed)
    }
}

impl Default for MixerAtomics {
    fn default() -> Self {
        Self::new()
    }
}
