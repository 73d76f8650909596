use std::collections::VecDeque;
use std::path::Path;

use gstreamer as gst;
use gstreamer::prelude::*;
use tracing::{debug, error, warn};

use crate::player::media::{MediaElement, MediaEvent};

#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("could not create playback pipeline: {0}")]
    Pipeline(String),
}

/// Playbin-backed media element. Play/pause/ended notifications come from the
/// bus; progress ticks are synthesized from position queries each poll while
/// playing. Video frames are discarded (fakesink): the practice loop is
/// driven by audio, and rendering frames is chrome this engine does not own.
pub struct GstMedia {
    playbin: gst::Element,
    bus: gst::Bus,
    pending: VecDeque<MediaEvent>,
    last_tick: Option<f64>,
    playing: bool,
}

impl GstMedia {
    pub fn new() -> Result<Self, MediaError> {
        let playbin = gst::ElementFactory::make("playbin")
            .name("woodshed-playbin")
            .build()
            .map_err(|err| MediaError::Pipeline(err.to_string()))?;
        if let Ok(video_sink) = gst::ElementFactory::make("fakesink")
            .property("sync", true)
            .build()
        {
            playbin.set_property("video-sink", &video_sink);
        }
        let bus = playbin
            .bus()
            .ok_or_else(|| MediaError::Pipeline("pipeline has no bus".into()))?;
        Ok(Self {
            playbin,
            bus,
            pending: VecDeque::new(),
            last_tick: None,
            playing: false,
        })
    }

    /// Point the pipeline at a new file and preroll it paused. Any previous
    /// asset is torn down first.
    pub fn set_source(&mut self, path: &Path) -> Result<(), MediaError> {
        let uri = path_to_file_uri(path);
        debug!("loading media from {uri}");
        let _ = self.playbin.set_state(gst::State::Null);
        self.pending.clear();
        self.last_tick = None;
        self.playing = false;
        self.playbin.set_property("uri", &uri);
        self.playbin
            .set_state(gst::State::Paused)
            .map_err(|err| MediaError::Pipeline(format!("could not preroll {uri}: {err}")))?;
        Ok(())
    }

    fn drain_bus(&mut self) {
        while let Some(msg) = self.bus.pop() {
            match msg.view() {
                gst::MessageView::Eos(_) => {
                    self.playing = false;
                    self.pending.push_back(MediaEvent::Ended);
                }
                gst::MessageView::StateChanged(changed) => {
                    if msg.src() == Some(self.playbin.upcast_ref::<gst::Object>()) {
                        match changed.current() {
                            gst::State::Playing => {
                                if !self.playing {
                                    self.playing = true;
                                    self.pending.push_back(MediaEvent::Play);
                                }
                            }
                            gst::State::Paused => {
                                // Preroll also passes through Paused; only a
                                // stop of actual playback is a notification.
                                if self.playing {
                                    self.playing = false;
                                    self.pending.push_back(MediaEvent::Pause);
                                }
                            }
                            _ => {}
                        }
                    }
                }
                gst::MessageView::Error(err) => {
                    error!(
                        "playback error: {} ({})",
                        err.error(),
                        err.debug().map(|d| d.to_string()).unwrap_or_default()
                    );
                    if self.playing {
                        self.playing = false;
                        self.pending.push_back(MediaEvent::Pause);
                    }
                }
                _ => {}
            }
        }
    }
}

impl MediaElement for GstMedia {
    fn play(&mut self) {
        if let Err(err) = self.playbin.set_state(gst::State::Playing) {
            error!("could not start playback: {err}");
        }
    }

    fn pause(&mut self) {
        if let Err(err) = self.playbin.set_state(gst::State::Paused) {
            error!("could not pause playback: {err}");
        }
    }

    fn seek(&mut self, seconds: f64) {
        let target = gst::ClockTime::from_nseconds((seconds.max(0.0) * 1e9) as u64);
        if let Err(err) = self
            .playbin
            .seek_simple(gst::SeekFlags::FLUSH | gst::SeekFlags::ACCURATE, target)
        {
            warn!("seek to {seconds:.3}s failed: {err}");
        }
        // The flush invalidates the cached tick; the next position query
        // reflects the new playhead.
        self.last_tick = None;
    }

    fn position(&self) -> Option<f64> {
        self.playbin
            .query_position::<gst::ClockTime>()
            .map(clock_time_to_secs)
    }

    fn duration(&self) -> Option<f64> {
        self.playbin
            .query_duration::<gst::ClockTime>()
            .map(clock_time_to_secs)
    }

    fn poll_event(&mut self) -> Option<MediaEvent> {
        self.drain_bus();
        if let Some(event) = self.pending.pop_front() {
            return Some(event);
        }
        // A tick is emitted whenever the playhead moved, which also covers a
        // seek while paused (the host-element behavior the sync relies on).
        if let Some(pos) = self.position() {
            if self.last_tick.is_none_or(|t| (pos - t).abs() > 1e-3) {
                self.last_tick = Some(pos);
                return Some(MediaEvent::TimeUpdate(pos));
            }
        }
        None
    }
}

impl Drop for GstMedia {
    fn drop(&mut self) {
        let _ = self.playbin.set_state(gst::State::Null);
    }
}

fn clock_time_to_secs(t: gst::ClockTime) -> f64 {
    t.nseconds() as f64 / 1e9
}

// Helper to convert a path to a file URI for GStreamer
#[cfg(windows)]
pub fn path_to_file_uri(path: &Path) -> String {
    let abs = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    // Remove UNC prefix if present
    let mut s = abs.to_string_lossy().replace("\\", "/");
    if let Some(stripped) = s.strip_prefix("//?/") {
        s = stripped.to_string();
    }
    format!("file:///{}", s)
}

#[cfg(not(windows))]
pub fn path_to_file_uri(path: &Path) -> String {
    let abs = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    format!("file://{}", abs.display())
}
