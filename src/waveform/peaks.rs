use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use gstreamer as gst;
use gstreamer::prelude::*;
use gstreamer_app as gst_app;
use gstreamer_pbutils as gst_pbutils;
use tracing::debug;

use crate::player::gst_media::path_to_file_uri;

/// Analysis sample rate for peak extraction. Mono F32 at 8 kHz keeps the
/// decode cheap while leaving plenty of resolution above the densest zoom
/// (5 × 40 px/sec = 200 columns/sec → 40 samples per column).
pub const PEAK_SAMPLE_RATE: u32 = 8000;

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The owner disposed this decode while it was in flight. Expected under
    /// rapid asset/zoom switching; callers suppress it.
    #[error("decode cancelled")]
    Cancelled,
    #[error("could not probe media: {0}")]
    Discover(String),
    #[error("could not build decode pipeline: {0}")]
    Pipeline(String),
    #[error("decode thread terminated without a result")]
    Worker,
}

/// Min/max peak columns for one renderer instance, one column per pixel at
/// the density the instance was created with.
#[derive(Debug, Clone)]
pub struct PeakData {
    pub columns: Vec<(f32, f32)>,
    pub duration: f64,
    pub px_per_sec: f32,
}

/// Shared cancel flag observed by the decode job between appsink pulls.
#[derive(Clone)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Handle to an in-flight decode: cancel flag, result channel, detached
/// worker thread. Dropping the handle cancels the decode.
pub struct DecodeHandle {
    cancel: Arc<AtomicBool>,
    rx: Receiver<Result<PeakData, DecodeError>>,
    done: bool,
}

impl DecodeHandle {
    pub fn spawn<F>(job: F) -> Self
    where
        F: FnOnce(&CancelToken) -> Result<PeakData, DecodeError> + Send + 'static,
    {
        let cancel = Arc::new(AtomicBool::new(false));
        let token = CancelToken(cancel.clone());
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let _ = tx.send(job(&token));
        });
        Self {
            cancel,
            rx,
            done: false,
        }
    }

    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    /// Non-blocking: the result, once, when the worker finishes.
    pub fn try_result(&mut self) -> Option<Result<PeakData, DecodeError>> {
        if self.done {
            return None;
        }
        match self.rx.try_recv() {
            Ok(result) => {
                self.done = true;
                Some(result)
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                self.done = true;
                Some(Err(DecodeError::Worker))
            }
        }
    }
}

impl Drop for DecodeHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Decode the file's audio into min/max peak columns at `px_per_sec`.
/// Runs on the decode thread; checks the cancel token between pulls.
pub fn decode_peaks(
    path: &Path,
    px_per_sec: f32,
    token: &CancelToken,
) -> Result<PeakData, DecodeError> {
    let uri = path_to_file_uri(path);
    let probed_duration = probe_duration(&uri);

    let desc = format!(
        "uridecodebin uri=\"{uri}\" ! audioconvert ! audioresample ! \
         appsink name=peaks sync=false \
         caps=\"audio/x-raw,format=F32LE,channels=1,rate={PEAK_SAMPLE_RATE}\""
    );
    let pipeline = gst::parse::launch(&desc)
        .map_err(|err| DecodeError::Pipeline(err.to_string()))?
        .downcast::<gst::Pipeline>()
        .map_err(|_| DecodeError::Pipeline("not a pipeline".into()))?;
    let sink = pipeline
        .by_name("peaks")
        .and_then(|e| e.downcast::<gst_app::AppSink>().ok())
        .ok_or_else(|| DecodeError::Pipeline("appsink not found".into()))?;

    pipeline
        .set_state(gst::State::Playing)
        .map_err(|err| DecodeError::Pipeline(format!("could not start decode: {err}")))?;

    let samples_per_column = ((PEAK_SAMPLE_RATE as f32 / px_per_sec).round() as usize).max(1);
    let mut accumulator = PeakAccumulator::new(samples_per_column);
    let mut total_samples: usize = 0;

    let result = loop {
        if token.cancelled() {
            break Err(DecodeError::Cancelled);
        }
        match sink.try_pull_sample(gst::ClockTime::from_mseconds(100)) {
            Some(sample) => {
                let Some(buffer) = sample.buffer() else {
                    continue;
                };
                let Ok(map) = buffer.map_readable() else {
                    continue;
                };
                for chunk in map.as_slice().chunks_exact(4) {
                    accumulator.push(bytemuck::pod_read_unaligned::<f32>(chunk));
                    total_samples += 1;
                }
            }
            None => {
                if sink.is_eos() {
                    let columns = accumulator.finish();
                    let duration = probed_duration
                        .unwrap_or(total_samples as f64 / PEAK_SAMPLE_RATE as f64);
                    debug!(
                        "decoded {} peak columns over {duration:.2}s at {px_per_sec} px/sec",
                        columns.len()
                    );
                    break Ok(PeakData {
                        columns,
                        duration,
                        px_per_sec,
                    });
                }
            }
        }
    };

    let _ = pipeline.set_state(gst::State::Null);
    result
}

/// Probe the asset duration ahead of the decode.
fn probe_duration(uri: &str) -> Option<f64> {
    let discoverer = gst_pbutils::Discoverer::new(gst::ClockTime::from_seconds(5)).ok()?;
    let info = discoverer.discover_uri(uri).ok()?;
    info.duration().map(|d| d.nseconds() as f64 / 1e9)
}

/// Bins incoming samples into min/max pairs, one per output column.
struct PeakAccumulator {
    samples_per_column: usize,
    min: f32,
    max: f32,
    filled: usize,
    columns: Vec<(f32, f32)>,
}

impl PeakAccumulator {
    fn new(samples_per_column: usize) -> Self {
        Self {
            samples_per_column: samples_per_column.max(1),
            min: f32::INFINITY,
            max: f32::NEG_INFINITY,
            filled: 0,
            columns: Vec::new(),
        }
    }

    fn push(&mut self, sample: f32) {
        self.min = self.min.min(sample);
        self.max = self.max.max(sample);
        self.filled += 1;
        if self.filled == self.samples_per_column {
            self.flush();
        }
    }

    fn flush(&mut self) {
        if self.filled > 0 {
            self.columns.push((self.min, self.max));
            self.min = f32::INFINITY;
            self.max = f32::NEG_INFINITY;
            self.filled = 0;
        }
    }

    fn finish(mut self) -> Vec<(f32, f32)> {
        self.flush();
        self.columns
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accumulator_bins_min_max_per_column() {
        let mut acc = PeakAccumulator::new(4);
        for &s in &[0.1, -0.5, 0.3, 0.2, /* next column */ -0.1, 0.9, 0.0, -0.9] {
            acc.push(s);
        }
        let columns = acc.finish();
        assert_eq!(columns, vec![(-0.5, 0.3), (-0.9, 0.9)]);
    }

    #[test]
    fn test_accumulator_flushes_partial_final_column() {
        let mut acc = PeakAccumulator::new(4);
        for &s in &[0.1, -0.5, 0.3, 0.2, 0.7, -0.2] {
            acc.push(s);
        }
        let columns = acc.finish();
        assert_eq!(columns.len(), 2);
        assert_eq!(columns[1], (-0.2, 0.7));
    }

    #[test]
    fn test_decode_handle_delivers_result_once() {
        let mut handle = DecodeHandle::spawn(|_token| {
            Ok(PeakData {
                columns: vec![(-1.0, 1.0)],
                duration: 1.0,
                px_per_sec: 40.0,
            })
        });

        let mut result = None;
        for _ in 0..100 {
            result = handle.try_result();
            if result.is_some() {
                break;
            }
            thread::sleep(std::time::Duration::from_millis(5));
        }
        let peaks = result.expect("worker finished").expect("decode ok");
        assert_eq!(peaks.columns.len(), 1);
        assert!(handle.try_result().is_none());
    }

    #[test]
    fn test_cancel_reaches_the_worker() {
        let (started_tx, started_rx) = mpsc::channel();
        let mut handle = DecodeHandle::spawn(move |token| {
            started_tx.send(()).ok();
            while !token.cancelled() {
                thread::sleep(std::time::Duration::from_millis(1));
            }
            Err(DecodeError::Cancelled)
        });
        started_rx
            .recv_timeout(std::time::Duration::from_secs(1))
            .expect("worker started");

        handle.cancel();
        let mut result = None;
        for _ in 0..200 {
            result = handle.try_result();
            if result.is_some() {
                break;
            }
            thread::sleep(std::time::Duration::from_millis(5));
        }
        assert!(matches!(result, Some(Err(DecodeError::Cancelled))));
    }
}
