use std::path::Path;

use tracing::{debug, warn};

use crate::types::markers::AbRange;
use crate::waveform::peaks::{DecodeError, DecodeHandle, PeakData, decode_peaks};

/// Pixel density at zoom 1. The content width of the waveform view is
/// `duration × BASE_PX_PER_SEC × zoom`.
pub const BASE_PX_PER_SEC: f32 = 40.0;

/// The highlighted span between the A and B markers, in seconds. Visual
/// only: dragging happens on the marker handles, never on the region itself.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Region {
    pub start: f64,
    pub end: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AdapterEvent {
    /// Decode finished; the duration is now known.
    Ready { duration: f64 },
}

enum InstanceState {
    Loading(DecodeHandle),
    Ready(PeakData),
    Failed,
}

/// One renderer instance: decoded (or in-flight) peaks at a fixed pixel
/// density, the cursor projection, and the single region. Dropping the
/// instance cancels an in-flight decode.
pub struct WaveformInstance {
    px_per_sec: f32,
    state: InstanceState,
    cursor: f64,
    region: Option<Region>,
}

impl WaveformInstance {
    pub fn px_per_sec(&self) -> f32 {
        self.px_per_sec
    }

    pub fn peaks(&self) -> Option<&PeakData> {
        match &self.state {
            InstanceState::Ready(peaks) => Some(peaks),
            _ => None,
        }
    }

    pub fn duration(&self) -> Option<f64> {
        self.peaks().map(|p| p.duration)
    }

    /// Cursor position as a fraction of the track.
    pub fn cursor_fraction(&self) -> f64 {
        self.cursor
    }

    pub fn region(&self) -> Option<Region> {
        self.region
    }
}

/// Owns the single live renderer instance and its lifecycle. Loading (or
/// re-zooming) disposes the previous instance first; a decode cancelled by
/// that disposal is expected and never surfaces as an error.
#[derive(Default)]
pub struct WaveformViewAdapter {
    instance: Option<WaveformInstance>,
}

impl WaveformViewAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start decoding `path` at the zoom-scaled density. Replaces (and
    /// thereby cancels) any prior instance, loading or ready.
    pub fn load(&mut self, path: &Path, zoom: f32) {
        let px_per_sec = BASE_PX_PER_SEC * zoom;
        let path = path.to_path_buf();
        self.install(
            px_per_sec,
            DecodeHandle::spawn(move |token| decode_peaks(&path, px_per_sec, token)),
        );
    }

    /// Zoom requires a reload at the new density. Markers live in the marker
    /// model in seconds, so their time-space positions survive the reload.
    pub fn set_zoom(&mut self, path: &Path, zoom: f32) {
        self.load(path, zoom);
    }

    fn install(&mut self, px_per_sec: f32, handle: DecodeHandle) {
        self.dispose();
        self.instance = Some(WaveformInstance {
            px_per_sec,
            state: InstanceState::Loading(handle),
            cursor: 0.0,
            region: None,
        });
    }

    pub fn dispose(&mut self) {
        if let Some(instance) = self.instance.take() {
            if matches!(instance.state, InstanceState::Loading(_)) {
                debug!("disposing waveform instance mid-decode");
            }
        }
    }

    /// Advance the decode. Returns `Ready` exactly once per instance.
    pub fn poll(&mut self) -> Option<AdapterEvent> {
        let instance = self.instance.as_mut()?;
        let InstanceState::Loading(handle) = &mut instance.state else {
            return None;
        };
        match handle.try_result()? {
            Ok(peaks) => {
                let duration = peaks.duration;
                instance.state = InstanceState::Ready(peaks);
                Some(AdapterEvent::Ready { duration })
            }
            Err(DecodeError::Cancelled) => {
                // Normal consequence of rapid asset/zoom switching.
                debug!("waveform decode cancelled");
                instance.state = InstanceState::Failed;
                None
            }
            Err(err) => {
                // The waveform simply stays absent; playback is unaffected.
                warn!("waveform decode failed: {err}");
                instance.state = InstanceState::Failed;
                None
            }
        }
    }

    /// Replace the highlighted region with one spanning the given range.
    pub fn set_region(&mut self, range: AbRange) {
        if let Some(instance) = self.instance.as_mut() {
            instance.region = Some(Region {
                start: range.a,
                end: range.b,
            });
        }
    }

    /// Project the media playhead onto the cursor. Not a seek.
    pub fn set_cursor(&mut self, fraction: f64) {
        if let Some(instance) = self.instance.as_mut() {
            instance.cursor = fraction.clamp(0.0, 1.0);
        }
    }

    pub fn instance(&self) -> Option<&WaveformInstance> {
        self.instance.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        matches!(
            self.instance.as_ref().map(|i| &i.state),
            Some(InstanceState::Loading(_))
        )
    }

    pub fn is_failed(&self) -> bool {
        matches!(
            self.instance.as_ref().map(|i| &i.state),
            Some(InstanceState::Failed)
        )
    }

    pub fn duration(&self) -> Option<f64> {
        self.instance.as_ref().and_then(|i| i.duration())
    }
}

/// Scroll offset that frames the range in the middle of the viewport:
/// convert both bounds to absolute pixel offsets, take their midpoint, and
/// clamp the resulting left edge to zero.
pub fn center_scroll_offset(
    range: AbRange,
    duration: f64,
    scroll_width: f32,
    viewport_width: f32,
) -> f32 {
    if duration <= 0.0 {
        return 0.0;
    }
    let left = range.a / duration * scroll_width as f64;
    let right = range.b / duration * scroll_width as f64;
    let center = (left + right) / 2.0;
    (center - viewport_width as f64 / 2.0).max(0.0) as f32
}

/// Pointer position as a fraction of the full content width, mapped to time.
/// The mapping spans the whole track, not the visible scrolled part, and the
/// result is stored verbatim (no snapping, no rounding).
pub fn time_at_fraction(fraction: f64, duration: f64) -> f64 {
    fraction.clamp(0.0, 1.0) * duration.max(0.0)
}
