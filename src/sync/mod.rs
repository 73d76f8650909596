//! Bridge between the two clock domains: the media element's playhead and
//! the waveform view's cursor/scroll position.
//!
//! Each time-change signal carries its origin in the variant itself, and each
//! origin flows in exactly one direction: playback progress only ever moves
//! the waveform cursor, user seeks on the waveform only ever move the media
//! playhead. A cursor move is never re-interpreted as a seek, so the two
//! clocks cannot ping-pong.

/// A time-change signal, tagged with where it originated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TimeSignal {
    /// The media element's clock advanced (a progress tick).
    MediaProgress { seconds: f64 },
    /// The user seeked on the waveform (click or scrub), as a fraction of the
    /// full track.
    UserSeek { fraction: f64 },
}

/// What the caller should apply in response to a routed signal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SyncAction {
    /// Move the waveform cursor to this fraction of the track.
    MoveCursor { fraction: f64 },
    /// Set the media element's playhead to this absolute time.
    SeekMedia { seconds: f64 },
}

/// Routes time signals between the media element and the waveform view.
#[derive(Debug, Default)]
pub struct TimelineSync {
    duration: Option<f64>,
}

impl TimelineSync {
    pub fn new() -> Self {
        Self::default()
    }

    /// Duration becomes known at decode-ready and is cleared when a new asset
    /// starts loading. Without it no conversion is possible and every signal
    /// is dropped.
    pub fn set_duration(&mut self, duration: Option<f64>) {
        self.duration = duration.filter(|d| *d > 0.0);
    }

    pub fn route(&self, signal: TimeSignal) -> Option<SyncAction> {
        let duration = self.duration?;
        match signal {
            TimeSignal::MediaProgress { seconds } => Some(SyncAction::MoveCursor {
                fraction: (seconds / duration).clamp(0.0, 1.0),
            }),
            TimeSignal::UserSeek { fraction } => Some(SyncAction::SeekMedia {
                seconds: fraction.clamp(0.0, 1.0) * duration,
            }),
        }
    }
}
