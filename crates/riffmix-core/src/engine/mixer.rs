//! The riff mix engine
//!
//! [`RiffMixer`] owns the render side of the engine: it pulls pending riffs
//! and control commands off the lock-free queues, runs the sample-accurate
//! mix loop over the eight stem lanes, crossfades between the live riff and
//! an incoming one, and commits the lanes to the multitrack recorder.
//!
//! `render` is called from the audio callback with an absolute sample
//! position maintained by the caller. Nothing in here allocates, locks or
//! touches the filesystem; riff and sink memory freed here is deferred to
//! the collector thread via `basedrop`.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use crate::riff::{Riff, RiffPtr, StemPtr};
use crate::types::{Sample, StereoBuffer, StereoSample, MAX_BUFFER_SIZE, NUM_STEMS};

use super::atomics::MixerAtomics;
use super::command::EngineCommand;
use super::config::{BlendTime, ProgressionConfig, TriggerPoint};
use super::recorder::MultitrackRecorder;
use super::repcom::RepComController;

/// One stem's mix parameters, unpacked from a riff for the sample loop
struct MixLane {
    gain: Sample,
    stretch: Sample,
    stem: Option<StemPtr>,
}

impl MixLane {
    /// Resolve the stem sample at `riff_sample`, applying time-stretch and
    /// gain. Returns the sample plus its beat flag and energy reading.
    /// Missing or failed stems resolve to silence.
    #[inline]
    fn sample_at(&self, riff_sample: u32) -> (StereoSample, bool, Sample) {
        match self.stem.as_deref() {
            Some(stem) if !stem.has_failed() && stem.sample_count() > 0 => {
                let mut idx = u64::from(riff_sample);
                if self.stretch != 1.0 {
                    // truncating, non-interpolating stretch
                    idx = (idx as f64 * f64::from(self.stretch)) as u64;
                }
                let idx = (idx % u64::from(stem.sample_count())) as usize;

                let (left, right) = stem.frame_at(idx);
                (
                    StereoSample::new(left * self.gain, right * self.gain),
                    stem.has_beat_at(idx),
                    stem.energy_at(idx),
                )
            }
            _ => (StereoSample::silence(), false, 0.0),
        }
    }
}

/// A riff's lanes unpacked for the sample loop, with the loop-relative
/// position of the block start precomputed
struct LaneSet {
    riff_len: u32,
    wrapped_start: u32,
    lanes: [MixLane; NUM_STEMS],
}

impl LaneSet {
    fn unpack(riff: &Riff, sample_position: u64) -> Option<Self> {
        let riff_len = riff.timing.length_in_samples;
        if riff_len == 0 {
            return None;
        }
        Some(Self {
            riff_len,
            wrapped_start: (sample_position % u64::from(riff_len)) as u32,
            lanes: std::array::from_fn(|stem| MixLane {
                gain: riff.stem_gains[stem],
                stretch: riff.stem_time_scales[stem],
                stem: riff.stems[stem].clone(),
            }),
        })
    }

    /// Loop-relative sample index for offset `offset` into the block
    #[inline]
    fn riff_sample(&self, offset: u32) -> u32 {
        ((u64::from(self.wrapped_start) + u64::from(offset)) % u64::from(self.riff_len)) as u32
    }
}

/// Render-thread half of the engine
pub struct RiffMixer {
    sample_rate: u32,

    commands: rtrb::Consumer<EngineCommand>,
    riff_queue: rtrb::Consumer<RiffPtr>,

    riff_current: Option<RiffPtr>,
    riff_next: Option<RiffPtr>,
    transition_value: f32,
    transition_rate: f64,

    progression: ProgressionConfig,
    repcom: RepComController,
    recorder: MultitrackRecorder,

    playback_percentage: f64,
    playback_bar: i32,
    playback_bar_segment: i32,

    mix_lanes: [StereoBuffer; NUM_STEMS],
    stem_has_beat: [bool; NUM_STEMS],
    stem_energy: [Sample; NUM_STEMS],

    atomics: Arc<MixerAtomics>,
}

impl RiffMixer {
    pub(crate) fn new(
        sample_rate: u32,
        commands: rtrb::Consumer<EngineCommand>,
        riff_queue: rtrb::Consumer<RiffPtr>,
        atomics: Arc<MixerAtomics>,
    ) -> Self {
        Self {
            sample_rate,
            commands,
            riff_queue,
            riff_current: None,
            riff_next: None,
            transition_value: 0.0,
            transition_rate: 0.0,
            progression: ProgressionConfig::default(),
            repcom: RepComController::new(),
            recorder: MultitrackRecorder::new(),
            playback_percentage: 0.0,
            playback_bar: 0,
            playback_bar_segment: 0,
            mix_lanes: std::array::from_fn(|_| StereoBuffer::silence(MAX_BUFFER_SIZE)),
            stem_has_beat: [false; NUM_STEMS],
            stem_energy: [0.0; NUM_STEMS],
            atomics,
        }
    }

    /// Render one block of `output.len()` samples starting at the absolute
    /// `sample_position`, mixing at `output_gain`
    pub fn render(&mut self, output: &mut StereoBuffer, output_gain: f32, sample_position: u64) {
        let samples_to_write = output.len() as u32;
        debug_assert!(output.len() <= MAX_BUFFER_SIZE);

        let block_seconds = f64::from(samples_to_write) / f64::from(self.sample_rate);

        self.apply_pending_command();

        // in arbitrary mode, check all the time to see if we could be switching
        if self.progression.trigger_point == TriggerPoint::Arbitrary {
            self.check_for_next_riff();
        }

        // advance an active transition; promote the next riff once it completes
        if self.riff_next.is_some() {
            self.transition_value += (block_seconds * self.transition_rate) as f32;

            if self.transition_value >= 1.0 {
                log::debug!("[blend] completed");
                self.exchange_live_riff();
            }
        }

        // nothing to play: emit silence and hard cut to the first riff to arrive
        let playable = self
            .riff_current
            .as_ref()
            .is_some_and(|riff| riff.timing.length_in_samples > 0);
        if !playable {
            output.fill_silence();

            self.playback_percentage = 0.0;
            self.playback_bar = 0;
            self.playback_bar_segment = 0;

            if self.check_for_next_riff() {
                log::debug!("[blend] hard cut to first riff");
                if self.riff_next.is_some() {
                    self.exchange_live_riff();
                }
                self.repcom.notify_new_activity(0);
            }

            self.publish_atomics();
            return;
        }

        let Some(current) = self.riff_current.clone() else {
            return;
        };

        let progression = current.timing.progression_at_sample(sample_position);
        self.playback_percentage = progression.percentage;
        self.playback_bar = progression.bar;
        self.playback_bar_segment = progression.bar_segment;

        self.atomics.set_tempo_bpm(current.timing.bpm);
        self.atomics
            .time_sig_numerator
            .store(current.timing.quarter_beats, Ordering::Relaxed);

        for lane in self.mix_lanes.iter_mut() {
            lane.set_len_from_capacity(samples_to_write as usize);
        }
        self.stem_has_beat = [false; NUM_STEMS];
        self.stem_energy = [0.0; NUM_STEMS];

        let Some(mut foreground) = LaneSet::unpack(&current, sample_position) else {
            return;
        };
        let mut transitional = if self.transition_value > 0.0 {
            self.riff_next
                .as_ref()
                .and_then(|next| LaneSet::unpack(next, sample_position))
        } else {
            None
        };

        // bar geometry is pinned for the block; a mid-block hard cut swaps
        // the lane data but bar tracking resets from the new riff next block
        let segment_len = u64::from(current.timing.samples_per_bar.max(1));
        let bar_count = current.timing.bar_count.max(1);
        let longest_stem_in_bars = current.timing.longest_stem_in_bars;
        let mut segment_cursor = sample_position % segment_len;

        for offset in 0..samples_to_write {
            while segment_cursor >= segment_len {
                segment_cursor -= segment_len;

                self.playback_bar += 1;
                if self.playback_bar >= bar_count {
                    self.playback_bar = 0;
                }
            }
            let segment_sample = segment_cursor;
            segment_cursor += 1;

            if segment_sample == 0 {
                let is_even_bar = (self.playback_bar & 1) == 0;
                let should_trigger = match self.progression.trigger_point {
                    TriggerPoint::AnyBarStart => true,
                    TriggerPoint::AnyEvenBarStart => is_even_bar,
                    TriggerPoint::NextRiffStart => self.playback_bar == 0,
                    TriggerPoint::Arbitrary => false,
                };

                if should_trigger
                    && !self.repcom.blocks_transition_on(self.playback_bar)
                    && self.check_for_next_riff()
                {
                    // the live riff may have changed (hard cut); re-unpack
                    if let Some(riff) = self.riff_current.as_deref() {
                        if let Some(lanes) = LaneSet::unpack(riff, sample_position) {
                            foreground = lanes;
                        }
                    }
                    transitional = if self.transition_value > 0.0 {
                        self.riff_next
                            .as_ref()
                            .and_then(|next| LaneSet::unpack(next, sample_position))
                    } else {
                        None
                    };
                    self.repcom.notify_new_activity(offset);
                }

                if self.recorder.is_recording() {
                    let transition_idle =
                        self.riff_next.is_none() && self.transition_value == 0.0;
                    self.repcom.on_recorded_bar_edge(
                        self.playback_bar,
                        offset,
                        longest_stem_in_bars,
                        transition_idle,
                    );
                }
            }

            // resolved after the bar-edge handling so that a hard cut at
            // this offset indexes into the freshly unpacked lanes
            let riff_sample = foreground.riff_sample(offset);

            // multitrack recording waits for the start of the riff loop
            if riff_sample == 0 && self.recorder.begin_on_riff_edge() {
                self.repcom.reset_repeats();
                self.atomics.recording.store(true, Ordering::Relaxed);
                self.atomics.in_flux.store(false, Ordering::Relaxed);
            }

            for (stem, lane) in foreground.lanes.iter().enumerate() {
                let (sample, has_beat, energy) = lane.sample_at(riff_sample);
                self.stem_has_beat[stem] |= has_beat;
                self.stem_energy[stem] = self.stem_energy[stem].max(energy);
                self.mix_lanes[stem][offset as usize] = sample;
            }

            if self.transition_value > 0.0 {
                if let Some(transitional) = transitional.as_ref() {
                    let next_sample = transitional.riff_sample(offset);
                    for (stem, lane) in transitional.lanes.iter().enumerate() {
                        // a missing stem blends down to silence, not a skip
                        let (target, _, _) = lane.sample_at(next_sample);
                        let mixed = self.mix_lanes[stem][offset as usize];
                        self.mix_lanes[stem][offset as usize] =
                            mixed.lerp(target, self.transition_value);
                    }
                }
            }
        }

        let mut beat_mask = 0u32;
        let mut simultaneous_beats = 0;
        for stem in 0..NUM_STEMS {
            if self.stem_has_beat[stem] {
                beat_mask |= 1 << stem;
                simultaneous_beats += 1;
            }
            self.atomics.set_stem_energy(stem, self.stem_energy[stem]);
        }
        self.atomics.merge_beat_mask(beat_mask);
        if simultaneous_beats >= 3 {
            self.atomics.consensus_hit.store(true, Ordering::Relaxed);
        }

        self.commit(output, output_gain, samples_to_write);
        self.publish_atomics();
    }

    /// Downmix the lanes into the output and append them to the recorder
    fn commit(&mut self, output: &mut StereoBuffer, output_gain: f32, samples_to_write: u32) {
        output.fill_silence();
        for lane in self.mix_lanes.iter() {
            output.add_scaled(lane, output_gain);
        }

        if self.recorder.is_recording() {
            let plan = self.repcom.write_plan(samples_to_write);
            self.recorder.commit(&self.mix_lanes, plan);
            self.atomics
                .storage_bytes
                .store(self.recorder.storage_usage(), Ordering::Relaxed);
        }

        self.repcom.end_of_commit();
    }

    /// Drain at most one command per block, before the riff queue is touched
    fn apply_pending_command(&mut self) {
        let Ok(command) = self.commands.pop() else {
            return;
        };
        match command {
            EngineCommand::BeginRecording { sinks } => {
                self.recorder.arm(sinks);
            }
            EngineCommand::StopRecording => {
                self.recorder.disarm();
                self.repcom.reset();
                self.atomics.recording.store(false, Ordering::Relaxed);
                self.atomics.in_flux.store(false, Ordering::Relaxed);
                self.atomics.storage_bytes.store(0, Ordering::Relaxed);
            }
            EngineCommand::UpdateProgression(config) => {
                self.progression = config;
            }
            EngineCommand::UpdateRepCom(config) => {
                // the control surface rejects this while recording
                debug_assert!(!self.recorder.is_recording());
                self.repcom.set_config(config);
            }
        }
    }

    /// Try to dequeue a pending riff into the next slot. Returns true only
    /// when a new riff was accepted by this call, either staged for blending
    /// or hard-cut straight into the live slot.
    fn check_for_next_riff(&mut self) -> bool {
        if self.riff_next.is_some() || self.transition_value != 0.0 {
            return false;
        }

        let Ok(mut candidate) = self.riff_queue.pop() else {
            return false;
        };

        // greedy mode skips ahead to the most recently enqueued riff
        if self.progression.greedy_mode {
            let mut skipped = 0u32;
            while let Ok(newer) = self.riff_queue.pop() {
                candidate = newer;
                skipped += 1;
            }
            if skipped > 0 {
                log::debug!("[blend] greedy mode skipped {skipped} queued riffs");
            }
        }

        log::debug!("[blend] dequeued new riff");

        if !candidate.is_valid() {
            log::error!("[blend] new riff invalid, ignoring it");
            return false;
        }

        if self.progression.blend_time == BlendTime::Zero {
            log::debug!("[blend] hard cut");
            self.riff_next = Some(candidate);
            self.exchange_live_riff();
        } else {
            // blend rate measured against the incoming riff's bar length
            self.transition_rate = 1.0
                / (candidate.timing.seconds_per_bar * self.progression.blend_time.bar_multiplier());
            self.riff_next = Some(candidate);
        }
        true
    }

    /// Swap the next riff into the live slot
    fn exchange_live_riff(&mut self) {
        self.riff_current = self.riff_next.take();
        self.transition_value = 0.0;
        self.repcom.reset_repeats();
    }

    #[cfg(test)]
    pub(crate) fn transition_value(&self) -> f32 {
        self.transition_value
    }

    /// Push the per-block observability snapshot
    fn publish_atomics(&self) {
        let atomics = &self.atomics;
        atomics.set_playback_percentage(self.playback_percentage);
        atomics.bar.store(self.playback_bar, Ordering::Relaxed);
        atomics
            .bar_segment
            .store(self.playback_bar_segment, Ordering::Relaxed);
        atomics.set_transition_value(self.transition_value);
        atomics
            .repeat_bar
            .store(self.repcom.repeat_bar(), Ordering::Relaxed);
        atomics
            .paused_on_bar
            .store(self.repcom.paused_on_bar(), Ordering::Relaxed);
        atomics
            .repcom_paused
            .store(self.repcom.is_paused(), Ordering::Relaxed);
    }
}
