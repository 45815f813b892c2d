//! Engine control-surface error types
//!
//! Nothing on the render path produces these; they cover the producer-side
//! calls (recording control, configuration updates, riff enqueue).

use thiserror::Error;

/// Errors that can occur on the engine control surface
#[derive(Error, Debug)]
pub enum EngineError {
    /// Begin requested while a recording is active or still in flux
    #[error("Multitrack recording is already active")]
    AlreadyRecording,

    /// Stop requested while no recording is active
    #[error("No multitrack recording to stop")]
    NotRecording,

    /// Repetition-compression configuration changed mid-recording
    #[error("Cannot change repetition compression while recording is underway")]
    RecordingInProgress,

    /// Failed to create a multitrack output file
    #[error("Failed to create multitrack writer: {0}")]
    WriterCreate(#[from] hound::Error),

    /// The command queue to the render thread is full
    #[error("Engine command queue is full")]
    CommandQueueFull,
}

/// Result type for engine control operations
pub type EngineResult<T> = Result<T, EngineError>;
