//! Repetition compression ("repcom") for multitrack capture
//!
//! When a bar has looped unchanged for as long as the riff's longest stem,
//! continuing to write it to disk captures nothing new. Repcom pauses the
//! multitrack writes at the exact sample offset of the triggering bar edge
//! and resumes, again sample-exact, when genuinely new content arrives (a
//! riff transition). The audible mix is unaffected; repeated bars are simply
//! compressed out of the captured files.
//!
//! The controller is a 4-state machine driven from the render loop. The two
//! fragment states live for exactly one block: they carry the sub-range of
//! that block to write, and collapse to `Paused`/`Unpaused` at the end of
//! the commit step.

use super::config::RepComConfig;

/// Sentinel meaning "to the end of whatever block is being committed"
const SAMPLE_COUNT_MAX: u32 = u32::MAX;

/// Repcom pause/resume state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepComState {
    /// Full blocks are written
    Unpaused,
    /// This block writes only `[0, sample_end)`, then capture pauses
    SampleFragmentAndPause,
    /// Writes are fully suppressed
    Paused,
    /// This block writes only `[sample_start, end)`, then capture resumes
    SampleFragmentAndResume,
}

/// How much of the current block the recorder should commit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WritePlan {
    /// Write the whole block
    Full,
    /// Write `count` samples starting at `start`
    Fragment { start: u32, count: u32 },
    /// Write nothing
    Skip,
}

/// The repetition-compression controller
pub struct RepComController {
    config: RepComConfig,
    state: RepComState,
    /// Bars seen since the last transition or recording start
    repeat_bar: u32,
    /// Bar index capture paused on; -1 while unpaused
    paused_on_bar: i32,
    sample_start: u32,
    sample_end: u32,
}

impl RepComController {
    pub fn new() -> Self {
        Self {
            config: RepComConfig::default(),
            state: RepComState::Unpaused,
            repeat_bar: 0,
            paused_on_bar: -1,
            sample_start: 0,
            sample_end: SAMPLE_COUNT_MAX,
        }
    }

    /// Replace the configuration (command application step only)
    pub fn set_config(&mut self, config: RepComConfig) {
        self.config = config;
    }

    #[inline]
    pub fn enabled(&self) -> bool {
        self.config.enable
    }

    #[inline]
    pub fn state(&self) -> RepComState {
        self.state
    }

    /// Whether capture is currently held (any state other than unpaused)
    #[inline]
    pub fn is_paused(&self) -> bool {
        self.enabled() && self.state != RepComState::Unpaused
    }

    /// Bars repeated since the last transition or recording start
    #[inline]
    pub fn repeat_bar(&self) -> u32 {
        self.repeat_bar
    }

    /// Bar index capture paused on; -1 while unpaused
    #[inline]
    pub fn paused_on_bar(&self) -> i32 {
        self.paused_on_bar
    }

    /// Reset the repetition counter (riff exchange, recording start)
    pub fn reset_repeats(&mut self) {
        self.repeat_bar = 0;
    }

    /// Full reset on recording disarm
    pub fn reset(&mut self) {
        self.state = RepComState::Unpaused;
        self.repeat_bar = 0;
        self.paused_on_bar = -1;
        self.sample_start = 0;
        self.sample_end = SAMPLE_COUNT_MAX;
    }

    /// A paused capture only resumes for a transition landing on the bar it
    /// paused on; transitions on other bars are held back by the caller
    #[inline]
    pub fn blocks_transition_on(&self, bar: i32) -> bool {
        self.is_paused() && self.paused_on_bar != bar
    }

    /// New content has begun at `new_start_sample` within the current block
    /// (a riff transition was accepted); resume a paused capture from there
    pub fn notify_new_activity(&mut self, new_start_sample: u32) {
        debug_assert!(self.state != RepComState::SampleFragmentAndResume);
        if self.state == RepComState::Paused {
            log::debug!("[repcom] unpause on new activity @ {new_start_sample}");

            self.sample_start = new_start_sample;
            self.sample_end = SAMPLE_COUNT_MAX;
            self.state = RepComState::SampleFragmentAndResume;
        }
    }

    /// A bar edge was crossed while recording; count the repetition and pause
    /// capture at `sample_offset` if the bar has repeated past the longest
    /// stem with no transition pending
    pub fn on_recorded_bar_edge(
        &mut self,
        bar: i32,
        sample_offset: u32,
        longest_stem_in_bars: u32,
        transition_idle: bool,
    ) {
        self.repeat_bar += 1;

        let trigger_pause = self.enabled() && self.repeat_bar >= longest_stem_in_bars;

        if trigger_pause && self.state == RepComState::Unpaused && transition_idle {
            log::debug!("[repcom] pausing @ bar {bar}, sample offset {sample_offset}");

            self.paused_on_bar = bar;
            self.sample_start = 0;
            self.sample_end = sample_offset;
            self.state = RepComState::SampleFragmentAndPause;
        }
    }

    /// How much of a `samples_to_write`-sized block should be committed
    pub fn write_plan(&self, samples_to_write: u32) -> WritePlan {
        if !self.enabled() {
            return WritePlan::Full;
        }
        match self.state {
            RepComState::Unpaused => WritePlan::Full,
            RepComState::Paused => WritePlan::Skip,
            RepComState::SampleFragmentAndPause | RepComState::SampleFragmentAndResume => {
                // bounds never exceed the block
                let end = self.sample_end.min(samples_to_write);
                let start = self.sample_start.min(end);
                WritePlan::Fragment {
                    start,
                    count: end - start,
                }
            }
        }
    }

    /// Applied at the end of the commit step: fragment states collapse into
    /// their settled successors one block after they were triggered
    pub fn end_of_commit(&mut self) {
        if self.state == RepComState::SampleFragmentAndPause {
            self.state = RepComState::Paused;
        }
        if self.state == RepComState::SampleFragmentAndResume {
            self.state = RepComState::Unpaused;
            self.paused_on_bar = -1;
        }

        self.sample_start = 0;
        self.sample_end = SAMPLE_COUNT_MAX;
    }
}

impl Default for RepComController {
    fn default() -> Self {
        Self::new()
    }
}
