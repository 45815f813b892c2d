//! Riff timing model
//!
//! Read-only timing facts for a riff plus the pure mapping from an absolute
//! sample position to where that lands inside the riff (percentage, bar,
//! segment within the bar). The mix engine recomputes this once per block for
//! the observability surface; trigger-point evaluation inside the per-sample
//! loop tracks bar edges incrementally instead.

/// Timing facts for a riff, fixed at resolve time
#[derive(Debug, Clone, PartialEq)]
pub struct RiffTiming {
    /// Tempo in beats per minute
    pub bpm: f64,
    /// Quarter-beats per bar (time signature numerator over 4)
    pub quarter_beats: u32,
    /// Number of bars in one riff loop
    pub bar_count: i32,
    /// Total loop length in samples
    pub length_in_samples: u32,
    /// Length of one bar in samples
    pub samples_per_bar: u32,
    /// Length of one bar in seconds
    pub seconds_per_bar: f64,
    /// Longest stem in the riff, measured in bars; the repetition threshold
    pub longest_stem_in_bars: u32,
}

/// Position within a riff derived from an absolute sample position
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RiffProgression {
    /// Fraction of the riff loop played, in [0, 1)
    pub percentage: f64,
    /// Bar index within the loop, in [0, bar_count)
    pub bar: i32,
    /// Quarter-beat segment within the bar, in [0, quarter_beats)
    pub bar_segment: i32,
}

impl RiffTiming {
    /// Map an absolute sample position into riff-local progression
    ///
    /// Pure function of the timing facts; returns the default (all zero)
    /// progression for degenerate zero-length timing.
    pub fn progression_at_sample(&self, sample_position: u64) -> RiffProgression {
        if self.length_in_samples == 0 || self.samples_per_bar == 0 {
            return RiffProgression::default();
        }

        let riff_sample = sample_position % u64::from(self.length_in_samples);
        let percentage = riff_sample as f64 / f64::from(self.length_in_samples);

        let bar = (riff_sample / u64::from(self.samples_per_bar)) as i32;
        let sample_in_bar = riff_sample % u64::from(self.samples_per_bar);
        let bar_segment =
            (sample_in_bar * u64::from(self.quarter_beats) / u64::from(self.samples_per_bar)) as i32;

        RiffProgression {
            percentage,
            bar,
            bar_segment,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timing() -> RiffTiming {
        RiffTiming {
            bpm: 120.0,
            quarter_beats: 4,
            bar_count: 4,
            length_in_samples: 1600,
            samples_per_bar: 400,
            seconds_per_bar: 2.0,
            longest_stem_in_bars: 4,
        }
    }

    #[test]
    fn test_progression_at_loop_start() {
        let p = timing().progression_at_sample(0);
        assert_eq!(p.percentage, 0.0);
        assert_eq!(p.bar, 0);
        assert_eq!(p.bar_segment, 0);
    }

    #[test]
    fn test_progression_wraps_at_loop_length() {
        // one full loop later, progression is identical
        let t = timing();
        assert_eq!(t.progression_at_sample(100), t.progression_at_sample(1700));
    }

    #[test]
    fn test_progression_bar_and_segment() {
        let t = timing();

        // 950 samples in: bar 2 (800..1200), 150 into the bar
        let p = t.progression_at_sample(950);
        assert_eq!(p.bar, 2);
        // 150/400 of the bar, 4 segments per bar -> segment 1
        assert_eq!(p.bar_segment, 1);
        assert!((p.percentage - 950.0 / 1600.0).abs() < 1e-12);
    }

    #[test]
    fn test_progression_last_sample_stays_in_range() {
        let t = timing();
        let p = t.progression_at_sample(1599);
        assert!(p.percentage < 1.0);
        assert_eq!(p.bar, 3);
        assert_eq!(p.bar_segment, 3);
    }

    #[test]
    fn test_zero_length_timing_is_degenerate() {
        let mut t = timing();
        t.length_in_samples = 0;
        assert_eq!(t.progression_at_sample(1234), RiffProgression::default());
    }
}
