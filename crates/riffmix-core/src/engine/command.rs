//! Lock-free queues feeding the render thread
//!
//! Two single-producer/single-consumer `rtrb` ring buffers cross the thread
//! boundary: one carries discrete control commands, the other carries newly
//! resolved riffs. Both sides are wait-free; the render thread treats "queue
//! empty" as a perfectly normal state and never waits.
//!
//! Commands carry owned payloads. Configuration values travel by value and
//! recording sinks travel as an already-open boxed array, so nothing the
//! render thread receives can dangle across the thread boundary.

use crate::riff::RiffPtr;
use crate::types::NUM_STEMS;

use super::config::{ProgressionConfig, RepComConfig};
use super::sink::StemSink;

/// The set of per-stem sink writers for one multitrack capture session
pub type MultitrackSinks = [Box<dyn StemSink>; NUM_STEMS];

/// Commands sent from the control thread to the render thread
///
/// At most one command is drained per render block, always before the riff
/// queue is inspected, so a configuration change and a riff transition
/// arriving together cannot tear within a block.
pub enum EngineCommand {
    /// Arm multitrack recording; capture begins at the next riff-loop edge.
    /// The sinks are created (files opened) on the control thread and boxed
    /// so the command itself stays pointer-sized.
    BeginRecording { sinks: Box<MultitrackSinks> },
    /// Disarm multitrack recording immediately; sinks are dropped on the
    /// render thread, finalizing their files
    StopRecording,
    /// Replace the progression configuration wholesale
    UpdateProgression(ProgressionConfig),
    /// Replace the repetition-compression configuration wholesale.
    /// The control surface rejects this while recording is active.
    UpdateRepCom(RepComConfig),
}

/// Capacity of the command queue
///
/// Control traffic is sparse (a handful of commands per user gesture); 64
/// gives generous headroom while keeping the ring buffer tiny.
pub const COMMAND_QUEUE_CAPACITY: usize = 64;

/// Capacity of the pending-riff queue
///
/// Riffs arrive at jam pace (seconds apart); the queue only grows beyond a
/// couple of entries when blends are configured slower than riffs arrive.
pub const RIFF_QUEUE_CAPACITY: usize = 64;

/// Create the command channel (producer/consumer pair)
pub fn command_channel() -> (rtrb::Producer<EngineCommand>, rtrb::Consumer<EngineCommand>) {
    rtrb::RingBuffer::new(COMMAND_QUEUE_CAPACITY)
}

/// Create the pending-riff channel (producer/consumer pair)
pub fn riff_channel() -> (rtrb::Producer<RiffPtr>, rtrb::Consumer<RiffPtr>) {
    rtrb::RingBuffer::new(RIFF_QUEUE_CAPACITY)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_channel_roundtrip() {
        let (mut tx, mut rx) = command_channel();

        tx.push(EngineCommand::UpdateProgression(ProgressionConfig::default()))
            .unwrap();

        let cmd = rx.pop().unwrap();
        assert!(matches!(cmd, EngineCommand::UpdateProgression(_)));
    }

    #[test]
    fn test_command_channel_empty() {
        let (_tx, mut rx) = command_channel();
        assert!(rx.pop().is_err());
    }

    #[test]
    fn test_command_size() {
        // Keep EngineCommand small for cache-efficient ring buffer slots;
        // the recording sinks are boxed so the largest variant is a pointer
        // plus the discriminant.
        let size = std::mem::size_of::<EngineCommand>();
        assert!(size <= 16, "EngineCommand is {} bytes, expected <= 16", size);
    }
}
