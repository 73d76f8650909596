/// Notifications from the media backend, drained one at a time each frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MediaEvent {
    /// Playback actually started (backend state change, not our request).
    Play,
    /// Playback actually stopped, whatever stopped it.
    Pause,
    /// The media reached its natural end.
    Ended,
    /// The playhead advanced to this time, in seconds.
    TimeUpdate(f64),
}

/// The seam between the loop engine and the concrete playback backend.
///
/// Contract for `seek`: it flushes. A `TimeUpdate` observed before the seek
/// must never be delivered after it; the next tick reflects the new position.
/// The loop controller relies on this so that a tick that was already past
/// the B marker cannot fire a second loop restart after the jump back to A.
pub trait MediaElement {
    fn play(&mut self);
    fn pause(&mut self);
    /// Flushing seek to an absolute time in seconds.
    fn seek(&mut self, seconds: f64);
    /// Current playhead in seconds, if the backend can report one.
    fn position(&self) -> Option<f64>;
    /// Duration in seconds, once known.
    fn duration(&self) -> Option<f64>;
    /// Drain the next pending notification, if any.
    fn poll_event(&mut self) -> Option<MediaEvent>;
}
