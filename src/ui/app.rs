use std::time::Duration;

use eframe::egui;
use tracing::{error, info};

use crate::player::controller::{ControllerEvent, PlaybackController};
use crate::player::gst_media::GstMedia;
use crate::sync::{SyncAction, TimeSignal, TimelineSync};
use crate::types::markers::Marker;
use crate::types::prefs::Prefs;
use crate::types::session::{LoopSession, MAX_ZOOM, MIN_ZOOM};
use crate::ui::waveform_widget::{WaveformEvent, WaveformState, WaveformWidget, format_time};
use crate::waveform::adapter::{AdapterEvent, WaveformViewAdapter};

const MEDIA_EXTENSIONS: &[&str] = &[
    "mp4", "mov", "mkv", "webm", "mp3", "wav", "ogg", "flac", "m4a",
];

pub struct WoodshedApp {
    session: LoopSession,
    controller: PlaybackController<GstMedia>,
    waveform: WaveformViewAdapter,
    sync: TimelineSync,
    waveform_state: WaveformState,
    prefs: Prefs,
    /// Zoom the current waveform instance was decoded at; reloads happen when
    /// the slider settles on a different value.
    loaded_zoom: f32,
}

impl WoodshedApp {
    pub fn new(media: GstMedia, prefs: Prefs) -> Self {
        let zoom = prefs.zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        Self {
            session: LoopSession::new(zoom),
            controller: PlaybackController::new(media),
            waveform: WaveformViewAdapter::new(),
            sync: TimelineSync::new(),
            waveform_state: WaveformState::default(),
            prefs,
            loaded_zoom: zoom,
        }
    }

    fn open_file(&mut self) {
        let mut dialog = rfd::FileDialog::new().add_filter("Media", MEDIA_EXTENSIONS);
        if let Some(dir) = &self.prefs.last_dir {
            dialog = dialog.set_directory(dir);
        }
        let Some(path) = dialog.pick_file() else {
            return;
        };
        if let Some(parent) = path.parent() {
            self.prefs.last_dir = Some(parent.to_path_buf());
            self.prefs.save();
        }
        info!("opening {}", path.display());

        // Tear down the previous asset's loop watch and duration before the
        // backend switches over; the new duration arrives at decode-ready.
        self.controller.reset();
        self.sync.set_duration(None);
        if let Err(err) = self.controller.media_mut().set_source(&path) {
            error!("could not load {}: {err}", path.display());
            self.waveform.dispose();
            return;
        }
        self.session.begin_asset(path.clone());
        self.waveform.load(&path, self.session.zoom());
        self.waveform_state = WaveformState::default();
    }

    /// A or B moved: refresh the region overlay and let the controller
    /// re-arm (or drop) its loop watch.
    fn apply_marker_change(&mut self) {
        let range = self.session.markers.range();
        self.waveform.set_region(range);
        self.controller.on_markers_changed(range);
    }

    fn apply_zoom(&mut self) {
        if (self.session.zoom() - self.loaded_zoom).abs() < f32::EPSILON {
            return;
        }
        self.loaded_zoom = self.session.zoom();
        self.prefs.zoom = self.loaded_zoom;
        self.prefs.save();
        let Some(path) = self.session.asset.as_ref().map(|a| a.path.clone()) else {
            return;
        };
        self.waveform.set_zoom(&path, self.loaded_zoom);
        // Markers are stored in seconds, so the region survives the reload.
        self.waveform.set_region(self.session.markers.range());
    }

    fn handle_waveform_events(&mut self, events: Vec<WaveformEvent>, duration: Option<f64>) {
        for event in events {
            match event {
                WaveformEvent::Seek(fraction) => {
                    // User-originated: flows to the media element only; the
                    // cursor follows on the next progress tick.
                    if let Some(SyncAction::SeekMedia { seconds }) =
                        self.sync.route(TimeSignal::UserSeek { fraction })
                    {
                        self.controller.seek(seconds, duration);
                    }
                }
                WaveformEvent::MarkerDragged { marker, time } => {
                    let before = self.session.markers.range();
                    self.session.set_marker(marker, time);
                    if self.session.markers.range() != before {
                        self.apply_marker_change();
                    }
                }
                WaveformEvent::DragReleased => {}
                WaveformEvent::Centered => self.session.acknowledge_center(),
            }
        }
    }
}

impl eframe::App for WoodshedApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Waveform decode progress. A fresh asset installs its duration and
        // the full-range markers; a zoom reload only refreshes the overlay.
        if let Some(AdapterEvent::Ready { duration }) = self.waveform.poll() {
            if self.session.duration().is_none() {
                info!("asset ready, duration {duration:.2}s");
                self.session.markers.set_duration(duration);
                self.sync.set_duration(Some(duration));
            }
            self.waveform.set_region(self.session.markers.range());
        }

        // Media notifications: loop enforcement happens inside the
        // controller; progress is projected onto the waveform cursor.
        for event in self.controller.update() {
            match event {
                ControllerEvent::Progress(seconds) => {
                    if let Some(SyncAction::MoveCursor { fraction }) =
                        self.sync.route(TimeSignal::MediaProgress { seconds })
                    {
                        self.waveform.set_cursor(fraction);
                    }
                }
                ControllerEvent::PlayingChanged(_) => {}
            }
        }

        let duration = self.session.duration();
        let has_asset = duration.is_some();

        egui::TopBottomPanel::top("file_panel").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading("Woodshed");
                ui.separator();
                if ui.button("Open…").clicked() {
                    self.open_file();
                }
                match &self.session.asset {
                    Some(asset) => ui.label(asset.name.as_str()),
                    None => ui.label("No file loaded"),
                };
                if let Some(total) = self.waveform.duration() {
                    ui.label(egui::RichText::new(format_time(total)).monospace());
                }
            });
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            let events = WaveformWidget::new(
                &self.waveform,
                self.session.markers.range(),
                &mut self.waveform_state,
            )
            .center_request(self.session.center_request())
            .show(ui);
            self.handle_waveform_events(events, duration);

            ui.add_space(6.0);

            // Marker row
            ui.horizontal(|ui| {
                if ui
                    .add_enabled(has_asset, egui::Button::new("Set A"))
                    .clicked()
                {
                    if let Some(pos) = self.controller.position() {
                        self.session.set_marker(Marker::A, pos);
                        self.apply_marker_change();
                    }
                }
                let range = self.session.markers.range();
                ui.label(
                    egui::RichText::new(format!(
                        "{} - {}",
                        format_time(range.a),
                        format_time(range.b)
                    ))
                    .monospace(),
                );
                if ui
                    .add_enabled(has_asset, egui::Button::new("Set B"))
                    .clicked()
                {
                    if let Some(pos) = self.controller.position() {
                        self.session.set_marker(Marker::B, pos);
                        self.apply_marker_change();
                        self.session.request_center();
                    }
                }
                if ui
                    .add_enabled(has_asset, egui::Button::new("Clear A/B"))
                    .clicked()
                {
                    self.session.clear_markers();
                    self.apply_marker_change();
                }
                if ui
                    .add_enabled(has_asset, egui::Button::new("Center A/B"))
                    .clicked()
                {
                    self.session.request_center();
                }
            });

            // Transport row
            ui.horizontal(|ui| {
                if ui.add_enabled(has_asset, egui::Button::new("⏮")).clicked() {
                    self.controller.jump_to_start(duration);
                }
                let play_label = if self.controller.is_playing() {
                    "⏸"
                } else {
                    "▶"
                };
                if ui
                    .add_enabled(has_asset, egui::Button::new(play_label))
                    .clicked()
                {
                    self.controller
                        .toggle_play_pause(self.session.markers.range(), duration);
                }
                if ui.add_enabled(has_asset, egui::Button::new("⏭")).clicked() {
                    self.controller.jump_to_end(duration);
                }
                ui.separator();

                let mut zoom = self.session.zoom();
                let response = ui.add_enabled(
                    has_asset,
                    egui::Slider::new(&mut zoom, MIN_ZOOM..=MAX_ZOOM).text("Zoom"),
                );
                if response.changed() {
                    self.session.set_zoom(zoom);
                }
                // Re-decoding is heavy; wait until the gesture settles.
                if response.drag_stopped() || (response.changed() && !response.dragged()) {
                    self.apply_zoom();
                }

                if let Some(pos) = self.controller.position() {
                    ui.label(egui::RichText::new(format_time(pos)).monospace());
                }
            });
        });

        if self.controller.is_playing() || self.waveform.is_loading() {
            ctx.request_repaint_after(Duration::from_millis(16));
        }
    }
}
