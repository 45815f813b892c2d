//! Gapless multitrack capture of the eight mix lanes
//!
//! Sinks are created on the control thread and handed over by command so the
//! render thread never touches the filesystem. Recording does not start the
//! moment the sinks arrive; the recorder waits for the next riff loop edge so
//! every captured file begins on a loop boundary.

use crate::engine::command::MultitrackSinks;
use crate::engine::repcom::WritePlan;
use crate::types::{StereoBuffer, NUM_STEMS};

/// Render-side owner of the per-stem recording sinks
pub struct MultitrackRecorder {
    sinks: Option<Box<MultitrackSinks>>,
    waiting_for_riff_edge: bool,
    recording: bool,
}

impl MultitrackRecorder {
    pub fn new() -> Self {
        Self {
            sinks: None,
            waiting_for_riff_edge: false,
            recording: false,
        }
    }

    /// Take ownership of freshly created sinks and wait for the loop edge
    pub fn arm(&mut self, sinks: Box<MultitrackSinks>) {
        if self.sinks.is_some() {
            log::error!("[multitrack] begin request while already armed, ignoring");
            return;
        }
        self.sinks = Some(sinks);
        self.waiting_for_riff_edge = true;
        self.recording = false;
    }

    /// Stop capture and drop the sinks, finalizing the output files
    pub fn disarm(&mut self) {
        if self.recording || self.waiting_for_riff_edge {
            log::info!("[multitrack] stopping recording");
        }
        self.sinks = None;
        self.waiting_for_riff_edge = false;
        self.recording = false;
    }

    /// Called at a riff loop edge; starts capture if sinks are waiting.
    /// Returns true on the edge that actually begins recording.
    pub fn begin_on_riff_edge(&mut self) -> bool {
        if !self.waiting_for_riff_edge {
            return false;
        }
        self.waiting_for_riff_edge = false;
        self.recording = true;
        log::info!("[multitrack] recording started at riff edge");
        true
    }

    #[inline]
    pub fn is_recording(&self) -> bool {
        self.recording
    }

    #[inline]
    pub fn is_armed(&self) -> bool {
        self.sinks.is_some()
    }

    /// Append the rendered lanes to the sinks, honoring the repcom plan
    pub fn commit(&mut self, lanes: &[StereoBuffer; NUM_STEMS], plan: WritePlan) {
        debug_assert!(self.recording);
        let Some(sinks) = self.sinks.as_mut() else {
            return;
        };
        match plan {
            WritePlan::Skip => {}
            WritePlan::Full => {
                for (sink, lane) in sinks.iter_mut().zip(lanes.iter()) {
                    sink.append(lane.as_slice());
                }
            }
            WritePlan::Fragment { start, count } => {
                log::debug!("[repcom] fragment write, {count} samples from offset {start}");
                let start = start as usize;
                let end = start + count as usize;
                for (sink, lane) in sinks.iter_mut().zip(lanes.iter()) {
                    sink.append(&lane.as_slice()[start..end]);
                }
            }
        }
    }

    /// Total bytes written across all sinks
    pub fn storage_usage(&self) -> u64 {
        match self.sinks.as_ref() {
            Some(sinks) => sinks.iter().map(|s| s.storage_usage()).sum(),
            None => 0,
        }
    }
}

impl Default for MultitrackRecorder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::sink::{MemorySink, StemSink};
    use crate::types::StereoSample;

    fn memory_sinks() -> (Box<MultitrackSinks>, Vec<MemorySink>) {
        let handles: Vec<MemorySink> = (0..NUM_STEMS).map(|_| MemorySink::new()).collect();
        let sinks: Vec<Box<dyn StemSink>> = handles
            .iter()
            .map(|s| Box::new(s.clone()) as Box<dyn StemSink>)
            .collect();
        let sinks: Box<MultitrackSinks> = match sinks.try_into() {
            Ok(array) => Box::new(array),
            Err(_) => unreachable!(),
        };
        (sinks, handles)
    }

    fn lanes_with_value(value: f32, len: usize) -> [StereoBuffer; NUM_STEMS] {
        std::array::from_fn(|_| {
            let mut buffer = StereoBuffer::silence(len);
            for sample in buffer.as_mut_slice() {
                *sample = StereoSample::new(value, value);
            }
            buffer
        })
    }

    #[test]
    fn test_waits_for_riff_edge_before_recording() {
        let (sinks, _handles) = memory_sinks();
        let mut recorder = MultitrackRecorder::new();
        recorder.arm(sinks);
        assert!(!recorder.is_recording());
        assert!(recorder.is_armed());

        assert!(recorder.begin_on_riff_edge());
        assert!(recorder.is_recording());

        // only the first edge transitions
        assert!(!recorder.begin_on_riff_edge());
    }

    #[test]
    fn test_commit_plans() {
        let (sinks, handles) = memory_sinks();
        let mut recorder = MultitrackRecorder::new();
        recorder.arm(sinks);
        recorder.begin_on_riff_edge();

        let lanes = lanes_with_value(0.5, 16);
        recorder.commit(&lanes, WritePlan::Full);
        recorder.commit(&lanes, WritePlan::Skip);
        recorder.commit(&lanes, WritePlan::Fragment { start: 4, count: 3 });

        for handle in &handles {
            assert_eq!(handle.written(), 19);
        }
    }

    #[test]
    fn test_disarm_finalizes_sinks() {
        let (sinks, handles) = memory_sinks();
        let mut recorder = MultitrackRecorder::new();
        recorder.arm(sinks);
        recorder.begin_on_riff_edge();
        let lanes = lanes_with_value(1.0, 8);
        recorder.commit(&lanes, WritePlan::Full);
        assert_eq!(recorder.storage_usage(), NUM_STEMS as u64 * 8 * 8);

        recorder.disarm();
        assert!(!recorder.is_recording());
        assert!(!recorder.is_armed());
        for handle in &handles {
            assert!(handle.is_finalized());
        }
    }
}
