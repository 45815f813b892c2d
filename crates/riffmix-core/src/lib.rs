//! Riffmix Core - real-time riff-blending mix engine
//!
//! Plays multi-stem looping riffs with sample-accurate transitions between
//! them, optional gapless multitrack disk capture, and repetition
//! compression of the captured audio. The render half runs inside an audio
//! callback; everything else talks to it through lock-free queues and
//! atomics.

pub mod databus;
pub mod engine;
pub mod riff;
pub mod types;

pub use types::*;
