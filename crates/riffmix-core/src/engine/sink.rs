//! Per-stem sample sinks for multitrack capture
//!
//! The recorder hands each stem's samples to one of eight independent sink
//! writers. Sinks are created on the control thread (file open happens there)
//! and shipped to the render thread through the command queue, already open;
//! the render thread only appends and, on stop, drops them to finalize.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use crate::types::StereoSample;

use super::error::EngineResult;

/// A sample sink consuming one stem channel of the multitrack capture
///
/// Append failures must be swallowed locally (log and go quiet); the render
/// thread cannot propagate errors.
pub trait StemSink: Send {
    /// Append a run of stereo samples to the sink
    fn append(&mut self, samples: &[StereoSample]);

    /// Bytes of storage consumed so far
    fn storage_usage(&self) -> u64;
}

/// WAV-file stem sink (32-bit float stereo)
pub struct WavStemSink {
    writer: Option<hound::WavWriter<BufWriter<File>>>,
    bytes_written: u64,
}

/// Size of the RIFF/fmt/data headers ahead of the sample payload
const WAV_HEADER_BYTES: u64 = 44;

impl WavStemSink {
    /// Create a sink writing to `path` at the given sample rate
    pub fn create(path: &Path, sample_rate: u32) -> EngineResult<Self> {
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let writer = hound::WavWriter::create(path, spec)?;
        Ok(Self {
            writer: Some(writer),
            bytes_written: WAV_HEADER_BYTES,
        })
    }
}

impl StemSink for WavStemSink {
    fn append(&mut self, samples: &[StereoSample]) {
        let Some(writer) = self.writer.as_mut() else {
            return;
        };

        for sample in samples {
            if writer.write_sample(sample.left).is_err()
                || writer.write_sample(sample.right).is_err()
            {
                log::error!("multitrack WAV write failed, disabling sink");
                self.writer = None;
                return;
            }
        }
        self.bytes_written += samples.len() as u64 * 2 * std::mem::size_of::<f32>() as u64;
    }

    fn storage_usage(&self) -> u64 {
        self.bytes_written
    }
}

impl Drop for WavStemSink {
    fn drop(&mut self) {
        // finalize patches the WAV length headers; dropping the hound writer
        // would do the same but silently discards errors
        if let Some(writer) = self.writer.take() {
            if let Err(err) = writer.finalize() {
                log::error!("failed to finalize multitrack WAV: {err}");
            }
        }
    }
}

/// In-memory sink used by engine tests to observe exactly which samples the
/// recorder committed; the captured data stays reachable through the shared
/// handle after the sink itself moves into the engine
#[cfg(test)]
#[derive(Clone)]
pub(crate) struct MemorySink {
    pub samples: std::sync::Arc<std::sync::Mutex<Vec<StereoSample>>>,
    pub finalized: std::sync::Arc<std::sync::atomic::AtomicBool>,
}

#[cfg(test)]
impl MemorySink {
    pub fn new() -> Self {
        Self {
            samples: std::sync::Arc::new(std::sync::Mutex::new(Vec::new())),
            finalized: std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false)),
        }
    }

    pub fn written(&self) -> usize {
        self.samples.lock().unwrap().len()
    }

    pub fn captured(&self) -> Vec<StereoSample> {
        self.samples.lock().unwrap().clone()
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized.load(std::sync::atomic::Ordering::Relaxed)
    }
}

#[cfg(test)]
impl StemSink for MemorySink {
    fn append(&mut self, samples: &[StereoSample]) {
        self.samples.lock().unwrap().extend_from_slice(samples);
    }

    fn storage_usage(&self) -> u64 {
        self.samples.lock().unwrap().len() as u64 * 2 * std::mem::size_of::<f32>() as u64
    }
}

#[cfg(test)]
impl Drop for MemorySink {
    fn drop(&mut self) {
        self.finalized
            .store(true, std::sync::atomic::Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wav_sink_roundtrip() {
        let dir = std::env::temp_dir().join("riffmix-sink-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("stem0.wav");

        let mut sink = WavStemSink::create(&path, 48000).unwrap();
        let frames = [
            StereoSample::new(0.5, -0.5),
            StereoSample::new(0.25, -0.25),
        ];
        sink.append(&frames);
        assert_eq!(
            sink.storage_usage(),
            WAV_HEADER_BYTES + frames.len() as u64 * 8
        );
        drop(sink);

        let mut reader = hound::WavReader::open(&path).unwrap();
        let read: Vec<f32> = reader.samples::<f32>().map(|s| s.unwrap()).collect();
        assert_eq!(read, vec![0.5, -0.5, 0.25, -0.25]);

        std::fs::remove_file(&path).ok();
    }
}
