//! Per-stem beat pulse metering for display threads
//!
//! The render thread flags beat hits in [`MixerAtomics`]; a display thread
//! calls [`StemBeatMeter::update`] once per frame to consume them and decay
//! the visible pulses toward rest.

use crate::engine::atomics::MixerAtomics;
use crate::types::NUM_STEMS;

/// Pulses decay toward a slight negative floor so they visibly settle at zero
/// rather than asymptotically hovering above it.
const PULSE_FLOOR: f32 = -0.1;

/// Default decay rate, tuned for roughly quarter-second pulse tails
pub const DEFAULT_BEAT_DECAY_RATE: f32 = 4.0;

/// Display-thread view of stem beat activity
pub struct StemBeatMeter {
    pulses: [f32; NUM_STEMS],
    energy: [f32; NUM_STEMS],
    consensus: f32,
    decay_rate: f32,
}

impl StemBeatMeter {
    pub fn new() -> Self {
        Self::with_decay_rate(DEFAULT_BEAT_DECAY_RATE)
    }

    pub fn with_decay_rate(decay_rate: f32) -> Self {
        Self {
            pulses: [0.0; NUM_STEMS],
            energy: [0.0; NUM_STEMS],
            consensus: 0.0,
            decay_rate,
        }
    }

    /// Consume pending beat hits and advance the decay by `delta_seconds`
    pub fn update(&mut self, delta_seconds: f32, atomics: &MixerAtomics) {
        let mask = atomics.take_beat_mask();
        for stem in 0..NUM_STEMS {
            if mask & (1 << stem) != 0 {
                self.pulses[stem] = 1.0;
            }
            self.energy[stem] = atomics.stem_energy(stem);
        }
        if atomics.take_consensus_hit() {
            self.consensus = 1.0;
        }

        let step = delta_seconds * self.decay_rate;
        for pulse in &mut self.pulses {
            *pulse += (PULSE_FLOOR - *pulse) * step;
            *pulse = pulse.clamp(0.0, 1.0);
        }
        self.consensus += (PULSE_FLOOR - self.consensus) * step;
        self.consensus = self.consensus.clamp(0.0, 1.0);
    }

    /// Beat pulse for one stem, 1.0 on hit decaying to 0.0
    #[inline]
    pub fn pulse(&self, stem: usize) -> f32 {
        self.pulses[stem]
    }

    /// Most recent energy reading for one stem
    #[inline]
    pub fn energy(&self, stem: usize) -> f32 {
        self.energy[stem]
    }

    /// Pulse fired when at least three stems hit a beat together
    #[inline]
    pub fn consensus(&self) -> f32 {
        self.consensus
    }
}

impl Default for StemBeatMeter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pulse_fires_and_decays() {
        let atomics = MixerAtomics::new();
        let mut meter = StemBeatMeter::new();

        atomics.merge_beat_mask(0b10);
        meter.update(0.0, &atomics);
        assert_eq!(meter.pulse(1), 1.0);
        assert_eq!(meter.pulse(0), 0.0);

        let before = meter.pulse(1);
        meter.update(0.05, &atomics);
        assert!(meter.pulse(1) < before);
        assert!(meter.pulse(1) > 0.0);
    }

    #[test]
    fn test_pulse_settles_at_zero() {
        let atomics = MixerAtomics::new();
        let mut meter = StemBeatMeter::new();

        atomics.merge_beat_mask(0b1);
        meter.update(0.0, &atomics);
        for _ in 0..400 {
            meter.update(0.016, &atomics);
        }
        assert_eq!(meter.pulse(0), 0.0);
    }

    #[test]
    fn test_consensus_pulse() {
        let atomics = MixerAtomics::new();
        let mut meter = StemBeatMeter::new();

        atomics.consensus_hit
            .store(true, std::sync::atomic::Ordering::Relaxed);
        meter.update(0.0, &atomics);
        assert_eq!(meter.consensus(), 1.0);
    }
}
