//! Control-thread surface of the mix engine
//!
//! The handle owns the producer ends of the command and riff queues plus a
//! shared view of the mixer atomics. Everything here is safe to call from a
//! UI or control thread; filesystem work (opening the multitrack writers)
//! happens here so the render thread never blocks on it.

use std::path::Path;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use crate::riff::RiffPtr;

use super::atomics::MixerAtomics;
use super::command::{EngineCommand, MultitrackSinks};
use super::config::{ProgressionConfig, RepComConfig};
use super::error::{EngineError, EngineResult};
use super::sink::{StemSink, WavStemSink};
use crate::types::NUM_STEMS;

/// Control-thread handle to a [`RiffMixer`]
///
/// [`RiffMixer`]: super::RiffMixer
pub struct MixerHandle {
    commands: rtrb::Producer<EngineCommand>,
    riffs: rtrb::Producer<RiffPtr>,
    atomics: Arc<MixerAtomics>,
    sample_rate: u32,
}

impl MixerHandle {
    pub(crate) fn new(
        commands: rtrb::Producer<EngineCommand>,
        riffs: rtrb::Producer<RiffPtr>,
        atomics: Arc<MixerAtomics>,
        sample_rate: u32,
    ) -> Self {
        Self {
            commands,
            riffs,
            atomics,
            sample_rate,
        }
    }

    /// Enqueue a resolved riff for the engine to blend to.
    /// Returns false if the pending queue is full.
    pub fn enqueue_riff(&mut self, riff: RiffPtr) -> bool {
        match self.riffs.push(riff) {
            Ok(()) => true,
            Err(_) => {
                log::warn!("[blend] pending riff queue is full, riff dropped");
                false
            }
        }
    }

    /// Replace the progression configuration at the next block boundary
    pub fn update_progression(&mut self, config: ProgressionConfig) -> EngineResult<()> {
        self.commands
            .push(EngineCommand::UpdateProgression(config))
            .map_err(|_| EngineError::CommandQueueFull)
    }

    /// Replace the repetition-compression configuration at the next block
    /// boundary; rejected while a recording is underway
    pub fn update_repcom(&mut self, config: RepComConfig) -> EngineResult<()> {
        if self.is_recording() {
            return Err(EngineError::RecordingInProgress);
        }
        self.commands
            .push(EngineCommand::UpdateRepCom(config))
            .map_err(|_| EngineError::CommandQueueFull)
    }

    /// Open one WAV writer per stem under `output_path` and hand them to the
    /// engine; capture begins at the next riff-loop edge
    pub fn begin_recording(&mut self, output_path: &Path, file_prefix: &str) -> EngineResult<()> {
        if self.is_recording() {
            return Err(EngineError::AlreadyRecording);
        }

        let mut sinks: Vec<Box<dyn StemSink>> = Vec::with_capacity(NUM_STEMS);
        for stem in 0..NUM_STEMS {
            let file = output_path.join(format!("{file_prefix}riffmix_channel{stem}.wav"));
            sinks.push(Box::new(WavStemSink::create(&file, self.sample_rate)?));
        }
        let sinks: Box<MultitrackSinks> = match sinks.try_into() {
            Ok(array) => Box::new(array),
            Err(_) => unreachable!(),
        };

        self.commands
            .push(EngineCommand::BeginRecording { sinks })
            .map_err(|_| EngineError::CommandQueueFull)?;
        self.atomics.in_flux.store(true, Ordering::Relaxed);
        Ok(())
    }

    /// Ask the engine to stop recording; the writers are finalized on the
    /// collector thread once the render thread releases them
    pub fn stop_recording(&mut self) -> EngineResult<()> {
        if !self.is_recording() {
            return Err(EngineError::NotRecording);
        }
        self.commands
            .push(EngineCommand::StopRecording)
            .map_err(|_| EngineError::CommandQueueFull)?;
        self.atomics.in_flux.store(true, Ordering::Relaxed);
        Ok(())
    }

    /// Recording is underway, or a start/stop request is still in flight
    pub fn is_recording(&self) -> bool {
        self.atomics.is_recording_active() || self.atomics.is_in_flux()
    }

    /// Bytes written by the multitrack writers so far; zero when idle
    pub fn recording_data_usage(&self) -> u64 {
        if !self.is_recording() {
            return 0;
        }
        self.atomics.storage_bytes.load(Ordering::Relaxed)
    }

    /// Status blurb for the recording indicator, if capture is not simply
    /// rolling
    pub fn flux_state(&self) -> Option<&'static str> {
        if self.atomics.repcom_paused.load(Ordering::Relaxed) {
            return Some("[PAUSED]");
        }
        if self.atomics.is_in_flux() {
            return Some("Awaiting Loop Start");
        }
        None
    }

    /// Shared observability surface (playback position, transition, meters)
    pub fn atomics(&self) -> &Arc<MixerAtomics> {
        &self.atomics
    }

    /// Riff playback percentage, in [0, 1)
    pub fn playback_percentage(&self) -> f64 {
        self.atomics.playback_percentage()
    }

    /// Bar index within the live riff loop
    pub fn playback_bar(&self) -> i32 {
        self.atomics.playback_bar()
    }

    /// Quarter-beat segment within the current bar
    pub fn playback_bar_segment(&self) -> i32 {
        self.atomics.playback_bar_segment()
    }

    /// Crossfade progress toward the next riff, in [0, 1)
    pub fn transition_value(&self) -> f32 {
        self.atomics.transition_value()
    }

    /// Bars repeated since the last transition or recording start
    pub fn bar_repetitions(&self) -> u32 {
        self.atomics.bar_repetitions()
    }

    /// Bar index capture paused on; -1 while unpaused
    pub fn bar_paused_on(&self) -> i32 {
        self.atomics.bar_paused_on()
    }
}

#[cfg(test)]
mod tests {
    use super::super::create_mixer;
    use super::*;
    use crate::engine::config::{BlendTime, TriggerPoint};
    use crate::types::StereoBuffer;

    #[test]
    fn test_stop_without_start_is_rejected() {
        let (mut handle, _mixer) = create_mixer(48_000);
        assert!(matches!(
            handle.stop_recording(),
            Err(EngineError::NotRecording)
        ));
    }

    #[test]
    fn test_begin_recording_creates_stem_files() {
        let dir = std::env::temp_dir().join("riffmix-handle-test");
        std::fs::create_dir_all(&dir).unwrap();

        let (mut handle, mut mixer) = create_mixer(48_000);
        handle.begin_recording(&dir, "take1_").unwrap();

        // request is in flight until the render thread reaches a loop edge
        assert!(handle.is_recording());
        assert_eq!(handle.flux_state(), Some("Awaiting Loop Start"));
        for stem in 0..NUM_STEMS {
            assert!(dir.join(format!("take1_riffmix_channel{stem}.wav")).exists());
        }

        // double start and mid-recording repcom changes are rejected
        assert!(matches!(
            handle.begin_recording(&dir, "take2_"),
            Err(EngineError::AlreadyRecording)
        ));
        assert!(matches!(
            handle.update_repcom(RepComConfig { enable: true }),
            Err(EngineError::RecordingInProgress)
        ));

        handle.stop_recording().unwrap();

        // one command drains per block: arm, then disarm
        let mut output = StereoBuffer::silence(64);
        mixer.render(&mut output, 1.0, 0);
        mixer.render(&mut output, 1.0, 64);
        assert!(!handle.is_recording());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_config_commands_enqueue() {
        let (mut handle, _mixer) = create_mixer(48_000);
        handle
            .update_progression(ProgressionConfig {
                trigger_point: TriggerPoint::NextRiffStart,
                blend_time: BlendTime::EightBars,
                greedy_mode: true,
            })
            .unwrap();
        handle.update_repcom(RepComConfig { enable: true }).unwrap();
    }
}
