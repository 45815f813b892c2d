//! Riff mix engine - blending, recording, repetition compression
//!
//! The engine is split across a render half and a control half:
//! - RiffMixer: sample-accurate mix loop, run from the audio callback
//! - MixerHandle: control-thread surface (riffs, config, recording)
//! - MultitrackRecorder / StemSink: gapless per-stem disk capture
//! - RepComController: pause/resume compression of repeated bars
//! - MixerAtomics / StemBeatMeter: lock-free observability

mod atomics;
mod command;
mod config;
mod error;
mod handle;
mod meter;
mod mixer;
mod recorder;
mod repcom;
mod sink;

pub mod gc;

pub use atomics::MixerAtomics;
pub use command::{EngineCommand, MultitrackSinks, COMMAND_QUEUE_CAPACITY, RIFF_QUEUE_CAPACITY};
pub use config::{BlendTime, ProgressionConfig, RepComConfig, TriggerPoint};
pub use error::{EngineError, EngineResult};
pub use handle::MixerHandle;
pub use meter::StemBeatMeter;
pub use mixer::RiffMixer;
pub use recorder::MultitrackRecorder;
pub use repcom::{RepComController, RepComState, WritePlan};
pub use sink::{StemSink, WavStemSink};

use std::sync::Arc;

/// Build a connected mixer pair: the render half for the audio callback and
/// the control half for everything else
pub fn create_mixer(sample_rate: u32) -> (MixerHandle, RiffMixer) {
    let (command_tx, command_rx) = command::command_channel();
    let (riff_tx, riff_rx) = command::riff_channel();
    let atomics = Arc::new(MixerAtomics::new());

    let handle = MixerHandle::new(command_tx, riff_tx, atomics.clone(), sample_rate);
    let mixer = RiffMixer::new(sample_rate, command_rx, riff_rx, atomics);
    (handle, mixer)
}
