use tracing::debug;

use crate::player::media::{MediaElement, MediaEvent};
use crate::types::markers::AbRange;

/// How close to the end of the track "at end" means when deciding whether a
/// free play should rewind first.
const END_EPSILON: f64 = 0.05;

/// What the controller surfaced while draining media notifications.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControllerEvent {
    /// The playhead is now at this time; forward to the view sync.
    Progress(f64),
    /// Derived play/pause state changed (from media notifications only).
    PlayingChanged(bool),
}

/// The loop subscription. Owned by the `PlayingLooped` state variant:
/// acquired when the loop engages, dropped on every exit path. A progress
/// tick that arrives after an exit finds no watch and does nothing.
#[derive(Debug, Clone, Copy)]
struct LoopWatch {
    a: f64,
    b: f64,
}

impl LoopWatch {
    fn new(range: AbRange) -> Self {
        Self {
            a: range.a,
            b: range.b,
        }
    }
}

#[derive(Debug)]
enum PlayState {
    Paused,
    PlayingFree,
    PlayingLooped(LoopWatch),
}

/// Owns the media element and enforces the A/B loop during playback.
pub struct PlaybackController<M: MediaElement> {
    media: M,
    state: PlayState,
    /// Derived from media notifications, never from our own requests, so it
    /// stays truthful when playback stops by other means (end of track,
    /// backend-initiated pause).
    is_playing: bool,
}

impl<M: MediaElement> PlaybackController<M> {
    pub fn new(media: M) -> Self {
        Self {
            media,
            state: PlayState::Paused,
            is_playing: false,
        }
    }

    pub fn media_mut(&mut self) -> &mut M {
        &mut self.media
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn position(&self) -> Option<f64> {
        self.media.position()
    }

    /// Toggle between playing and paused. `duration` is the decoded asset
    /// duration; without one every transport command is a no-op.
    ///
    /// Starting playback engages the loop whenever `a < b` (including the
    /// full-range pair left by clearing the markers): seek to `a`, play, and
    /// install the watch. Otherwise play free, rewinding only when the
    /// playhead already sits at the end of the track.
    pub fn toggle_play_pause(&mut self, range: AbRange, duration: Option<f64>) {
        let Some(duration) = duration else { return };
        if self.is_playing {
            self.media.pause();
            self.state = PlayState::Paused;
            return;
        }
        if range.loop_active() {
            debug!("starting looped playback over {:.3}..{:.3}", range.a, range.b);
            self.media.seek(range.a);
            self.media.play();
            self.state = PlayState::PlayingLooped(LoopWatch::new(range));
        } else {
            if let Some(pos) = self.media.position() {
                if pos + END_EPSILON >= duration {
                    self.media.seek(0.0);
                }
            }
            self.media.play();
            self.state = PlayState::PlayingFree;
        }
    }

    /// User seek to an absolute time (waveform click, routed through the
    /// synchronizer). Does not disturb an active loop watch; if the target is
    /// past B the next progress tick snaps back to A.
    pub fn seek(&mut self, seconds: f64, duration: Option<f64>) {
        if duration.is_none() {
            return;
        }
        self.media.seek(seconds.max(0.0));
    }

    pub fn jump_to_start(&mut self, duration: Option<f64>) {
        self.seek(0.0, duration);
    }

    pub fn jump_to_end(&mut self, duration: Option<f64>) {
        if let Some(duration) = duration {
            self.media.seek(duration);
        }
    }

    /// A or B moved. In the looped state the old watch is torn down first;
    /// if the new range still loops, jump to its start and install a fresh
    /// watch, otherwise keep playing free.
    pub fn on_markers_changed(&mut self, range: AbRange) {
        if !matches!(self.state, PlayState::PlayingLooped(_)) {
            return;
        }
        self.state = PlayState::PlayingFree;
        if range.loop_active() {
            self.media.seek(range.a);
            self.state = PlayState::PlayingLooped(LoopWatch::new(range));
        } else {
            debug!("markers no longer loop, continuing free");
        }
    }

    /// New asset: drop any watch and derived state before the backend loads.
    pub fn reset(&mut self) {
        self.state = PlayState::Paused;
        self.is_playing = false;
    }

    /// Drain media notifications and enforce the loop invariant.
    pub fn update(&mut self) -> Vec<ControllerEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.media.poll_event() {
            match event {
                MediaEvent::TimeUpdate(t) => {
                    if let PlayState::PlayingLooped(watch) = &self.state {
                        if t >= watch.b {
                            let a = watch.a;
                            debug!("loop boundary {:.3} reached at {t:.3}", watch.b);
                            // Flushing seek; ticks observed before it are gone.
                            self.media.seek(a);
                            events.push(ControllerEvent::Progress(a));
                            continue;
                        }
                    }
                    events.push(ControllerEvent::Progress(t));
                }
                MediaEvent::Play => {
                    if !self.is_playing {
                        self.is_playing = true;
                        events.push(ControllerEvent::PlayingChanged(true));
                    }
                }
                MediaEvent::Pause => {
                    if self.is_playing {
                        self.is_playing = false;
                        events.push(ControllerEvent::PlayingChanged(false));
                    }
                    self.state = PlayState::Paused;
                }
                MediaEvent::Ended => {
                    if let PlayState::PlayingLooped(watch) = &self.state {
                        // B at (or past) the track end: restart instead of stopping.
                        let a = watch.a;
                        self.media.seek(a);
                        self.media.play();
                        events.push(ControllerEvent::Progress(a));
                    } else {
                        if self.is_playing {
                            self.is_playing = false;
                            events.push(ControllerEvent::PlayingChanged(false));
                        }
                        self.state = PlayState::Paused;
                    }
                }
            }
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// Scripted media element. Seeks flush queued ticks, mirroring the
    /// `MediaElement` contract.
    struct FakeMedia {
        queue: VecDeque<MediaEvent>,
        position: f64,
        duration: Option<f64>,
        playing: bool,
        seeks: Vec<f64>,
    }

    impl FakeMedia {
        fn new(duration: f64) -> Self {
            Self {
                queue: VecDeque::new(),
                position: 0.0,
                duration: Some(duration),
                playing: false,
                seeks: Vec::new(),
            }
        }

        fn push_tick(&mut self, t: f64) {
            self.queue.push_back(MediaEvent::TimeUpdate(t));
        }
    }

    impl MediaElement for FakeMedia {
        fn play(&mut self) {
            self.playing = true;
            self.queue.push_back(MediaEvent::Play);
        }

        fn pause(&mut self) {
            self.playing = false;
            self.queue.push_back(MediaEvent::Pause);
        }

        fn seek(&mut self, seconds: f64) {
            self.seeks.push(seconds);
            self.position = seconds;
            self.queue
                .retain(|ev| !matches!(ev, MediaEvent::TimeUpdate(_)));
        }

        fn position(&self) -> Option<f64> {
            Some(self.position)
        }

        fn duration(&self) -> Option<f64> {
            self.duration
        }

        fn poll_event(&mut self) -> Option<MediaEvent> {
            self.queue.pop_front()
        }
    }

    fn range(a: f64, b: f64) -> AbRange {
        AbRange { a, b }
    }

    #[test]
    fn test_play_with_loop_seeks_to_a_and_installs_watch() {
        let mut ctl = PlaybackController::new(FakeMedia::new(60.0));
        ctl.toggle_play_pause(range(10.0, 20.0), Some(60.0));

        assert_eq!(ctl.media.seeks, vec![10.0]);
        assert!(ctl.media.playing);
        let events = ctl.update();
        assert!(events.contains(&ControllerEvent::PlayingChanged(true)));
        assert!(ctl.is_playing());
    }

    #[test]
    fn test_loop_restart_fires_exactly_once_at_boundary() {
        let mut ctl = PlaybackController::new(FakeMedia::new(60.0));
        ctl.toggle_play_pause(range(10.0, 20.0), Some(60.0));
        ctl.update();
        ctl.media.seeks.clear();

        ctl.media.push_tick(19.9);
        ctl.media.push_tick(20.0);
        ctl.media.push_tick(20.1);
        let events = ctl.update();

        // One seek back to A; the 20.1 tick was flushed by it.
        assert_eq!(ctl.media.seeks, vec![10.0]);
        let progress: Vec<f64> = events
            .iter()
            .filter_map(|ev| match ev {
                ControllerEvent::Progress(t) => Some(*t),
                _ => None,
            })
            .collect();
        assert_eq!(progress, vec![19.9, 10.0]);
        assert!(ctl.media.playing, "restart must not pause playback");
    }

    #[test]
    fn test_cleared_markers_loop_over_full_track() {
        let mut ctl = PlaybackController::new(FakeMedia::new(60.0));
        // clear() leaves {0, duration}.
        ctl.toggle_play_pause(range(0.0, 60.0), Some(60.0));
        assert_eq!(ctl.media.seeks, vec![0.0]);
        ctl.update();
        ctl.media.seeks.clear();

        // Reaching the natural end restarts at A instead of pausing.
        ctl.media.queue.push_back(MediaEvent::Ended);
        ctl.update();
        assert_eq!(ctl.media.seeks, vec![0.0]);
        assert!(ctl.media.playing);
        assert!(ctl.is_playing());
    }

    #[test]
    fn test_shrinking_b_mid_loop_reseeks_and_moves_boundary() {
        let mut ctl = PlaybackController::new(FakeMedia::new(60.0));
        ctl.toggle_play_pause(range(0.0, 20.0), Some(60.0));
        ctl.update();
        ctl.media.seeks.clear();

        ctl.on_markers_changed(range(0.0, 5.0));
        assert_eq!(ctl.media.seeks, vec![0.0], "jump to the new loop start");
        ctl.media.seeks.clear();

        // The next boundary is 5, not 20.
        ctl.media.push_tick(5.1);
        ctl.update();
        assert_eq!(ctl.media.seeks, vec![0.0]);
    }

    #[test]
    fn test_inverting_markers_mid_loop_degrades_to_free_play() {
        let mut ctl = PlaybackController::new(FakeMedia::new(60.0));
        ctl.toggle_play_pause(range(10.0, 20.0), Some(60.0));
        ctl.update();
        ctl.media.seeks.clear();

        // A dragged past B: no error, no auto-correction, playback continues.
        ctl.on_markers_changed(range(30.0, 20.0));
        assert!(ctl.media.seeks.is_empty());
        assert!(ctl.media.playing);

        // Old boundary no longer fires.
        ctl.media.push_tick(25.0);
        ctl.update();
        assert!(ctl.media.seeks.is_empty());
    }

    #[test]
    fn test_pause_tears_down_the_watch() {
        let mut ctl = PlaybackController::new(FakeMedia::new(60.0));
        ctl.toggle_play_pause(range(10.0, 20.0), Some(60.0));
        ctl.update();
        ctl.media.seeks.clear();

        ctl.toggle_play_pause(range(10.0, 20.0), Some(60.0));
        ctl.update();
        assert!(!ctl.is_playing());

        // A straggler tick past B is a no-op once the watch is gone.
        ctl.media.push_tick(25.0);
        ctl.update();
        assert!(ctl.media.seeks.is_empty());
    }

    #[test]
    fn test_free_play_resumes_unless_at_end() {
        let mut ctl = PlaybackController::new(FakeMedia::new(60.0));
        ctl.media.position = 30.0;

        // Inverted range: free play, resume from the current position.
        ctl.toggle_play_pause(range(20.0, 10.0), Some(60.0));
        assert!(ctl.media.seeks.is_empty());
        assert!(ctl.media.playing);
        ctl.update();

        ctl.toggle_play_pause(range(20.0, 10.0), Some(60.0));
        ctl.update();

        // At the end of the track a fresh free play rewinds first.
        ctl.media.position = 60.0;
        ctl.toggle_play_pause(range(20.0, 10.0), Some(60.0));
        assert_eq!(ctl.media.seeks, vec![0.0]);
    }

    #[test]
    fn test_transport_is_a_noop_without_an_asset() {
        let mut media = FakeMedia::new(0.0);
        media.duration = None;
        let mut ctl = PlaybackController::new(media);

        ctl.toggle_play_pause(range(0.0, 0.0), None);
        ctl.seek(5.0, None);
        ctl.jump_to_start(None);
        ctl.jump_to_end(None);

        assert!(!ctl.media.playing);
        assert!(ctl.media.seeks.is_empty());
    }

    #[test]
    fn test_is_playing_follows_external_stops() {
        let mut ctl = PlaybackController::new(FakeMedia::new(60.0));
        ctl.toggle_play_pause(range(20.0, 10.0), Some(60.0));
        ctl.update();
        assert!(ctl.is_playing());

        // Backend paused on its own (not through this controller).
        ctl.media.queue.push_back(MediaEvent::Pause);
        let events = ctl.update();
        assert!(events.contains(&ControllerEvent::PlayingChanged(false)));
        assert!(!ctl.is_playing());

        // Natural end while free also lands in Paused.
        ctl.media.queue.push_back(MediaEvent::Play);
        ctl.update();
        ctl.media.queue.push_back(MediaEvent::Ended);
        ctl.update();
        assert!(!ctl.is_playing());
    }
}
