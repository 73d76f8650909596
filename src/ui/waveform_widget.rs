use eframe::egui;

use crate::types::markers::{AbRange, Marker};
use crate::waveform::adapter::{WaveformViewAdapter, center_scroll_offset, time_at_fraction};

pub const WAVEFORM_HEIGHT: f32 = 96.0;
const RULER_HEIGHT: f32 = 22.0;
const HANDLE_GRAB_WIDTH: f32 = 14.0;

const WAVE_COLOR: egui::Color32 = egui::Color32::from_rgb(209, 213, 219);
const CURSOR_COLOR: egui::Color32 = egui::Color32::from_rgb(21, 128, 61);
const MARKER_A_COLOR: egui::Color32 = egui::Color32::from_rgb(22, 163, 74);
const MARKER_B_COLOR: egui::Color32 = egui::Color32::from_rgb(21, 128, 61);

/// Widget state that persists between frames.
#[derive(Default)]
pub struct WaveformState {
    /// Horizontal scroll position in pixels, read back from the scroll area.
    pub scroll_x: f32,
    /// Live marker drag, pointer-down to release.
    pub drag: Option<DragSession>,
}

#[derive(Debug, Clone)]
pub struct DragSession {
    pub marker: Marker,
    pub pointer_origin: egui::Pos2,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WaveformEvent {
    /// User clicked the waveform: seek to this fraction of the track.
    Seek(f64),
    /// Live drag update for one marker handle.
    MarkerDragged { marker: Marker, time: f64 },
    /// The pointer was released (anywhere), ending the drag session.
    DragReleased,
    /// The one-shot centering request has been carried out.
    Centered,
}

/// Scrollable waveform view: time ruler, peak columns, A/B region overlay,
/// draggable marker handles, and the playhead cursor projection.
pub struct WaveformWidget<'a> {
    adapter: &'a WaveformViewAdapter,
    markers: AbRange,
    state: &'a mut WaveformState,
    center_request: Option<AbRange>,
}

impl<'a> WaveformWidget<'a> {
    pub fn new(
        adapter: &'a WaveformViewAdapter,
        markers: AbRange,
        state: &'a mut WaveformState,
    ) -> Self {
        Self {
            adapter,
            markers,
            state,
            center_request: None,
        }
    }

    pub fn center_request(mut self, request: Option<AbRange>) -> Self {
        self.center_request = request;
        self
    }

    pub fn show(self, ui: &mut egui::Ui) -> Vec<WaveformEvent> {
        let mut events = Vec::new();

        let Some(instance) = self.adapter.instance() else {
            placeholder(ui, "No media loaded");
            return events;
        };
        let Some(peaks) = instance.peaks() else {
            let text = if self.adapter.is_failed() {
                "Waveform unavailable"
            } else {
                "Decoding waveform…"
            };
            placeholder(ui, text);
            return events;
        };
        let duration = peaks.duration;
        if duration <= 0.0 {
            placeholder(ui, "Waveform unavailable");
            return events;
        }

        let px_per_sec = instance.px_per_sec();
        let viewport_width = ui.available_width();
        let content_width = (duration as f32 * px_per_sec).max(viewport_width);
        let total_height = RULER_HEIGHT + WAVEFORM_HEIGHT;

        let mut scroll_area = egui::ScrollArea::horizontal()
            .auto_shrink([false; 2])
            .max_height(total_height);
        if let Some(range) = self.center_request {
            let offset = center_scroll_offset(range, duration, content_width, viewport_width);
            scroll_area = scroll_area.scroll_offset(egui::vec2(offset, 0.0));
            events.push(WaveformEvent::Centered);
        }

        let scroll_x = self.state.scroll_x;
        let output = scroll_area.show(ui, |ui| {
            ui.set_min_size(egui::vec2(content_width, total_height));

            let content_rect = egui::Rect::from_min_size(
                ui.min_rect().min,
                egui::vec2(content_width, total_height),
            );
            let ruler_rect = egui::Rect::from_min_size(
                content_rect.min,
                egui::vec2(content_width, RULER_HEIGHT),
            );
            let wave_rect = egui::Rect::from_min_max(
                content_rect.left_top() + egui::vec2(0.0, RULER_HEIGHT),
                content_rect.right_bottom(),
            );

            let painter = ui.painter_at(content_rect);
            painter.rect_filled(wave_rect, 0.0, egui::Color32::from_gray(24));

            draw_ruler(&painter, ruler_rect, px_per_sec, scroll_x, viewport_width);

            // Region overlay behind the peaks; visual only, never interactive.
            if let Some(region) = instance.region() {
                let x1 = time_to_x(region.start, duration, content_rect);
                let x2 = time_to_x(region.end, duration, content_rect);
                if x2 > x1 {
                    painter.rect_filled(
                        egui::Rect::from_min_max(
                            egui::pos2(x1, wave_rect.top()),
                            egui::pos2(x2, wave_rect.bottom()),
                        ),
                        0.0,
                        egui::Color32::from_rgba_unmultiplied(34, 197, 94, 76),
                    );
                }
            }

            draw_peaks(
                &painter,
                wave_rect,
                &peaks.columns,
                scroll_x,
                viewport_width,
            );

            // Playhead cursor: a projection of the media clock, not a widget.
            let cursor_x =
                content_rect.left() + instance.cursor_fraction() as f32 * content_rect.width();
            painter.line_segment(
                [
                    egui::pos2(cursor_x, wave_rect.top()),
                    egui::pos2(cursor_x, wave_rect.bottom()),
                ],
                egui::Stroke::new(2.0, CURSOR_COLOR),
            );

            // Marker handles.
            let handles = [
                (Marker::A, self.markers.a, MARKER_A_COLOR, "A"),
                (Marker::B, self.markers.b, MARKER_B_COLOR, "B"),
            ];
            let handle_rects = handles.map(|(_, time, _, _)| {
                egui::Rect::from_center_size(
                    egui::pos2(time_to_x(time, duration, content_rect), wave_rect.center().y),
                    egui::vec2(HANDLE_GRAB_WIDTH, WAVEFORM_HEIGHT),
                )
            });

            // Click on the waveform body seeks. Allocated before the handles
            // so the handles stay on top and keep their drags.
            let body_response = ui.allocate_rect(wave_rect, egui::Sense::click());
            if body_response.clicked() && self.state.drag.is_none() {
                if let Some(pos) = body_response.interact_pointer_pos() {
                    if !handle_rects.iter().any(|r| r.contains(pos)) {
                        let fraction =
                            ((pos.x - content_rect.left()) / content_rect.width()) as f64;
                        events.push(WaveformEvent::Seek(fraction.clamp(0.0, 1.0)));
                    }
                }
            }

            for ((marker, time, color, label), handle_rect) in handles.into_iter().zip(handle_rects)
            {
                let x = time_to_x(time, duration, content_rect);
                painter.line_segment(
                    [
                        egui::pos2(x, wave_rect.top()),
                        egui::pos2(x, wave_rect.bottom()),
                    ],
                    egui::Stroke::new(2.0, color),
                );
                let tab_rect = egui::Rect::from_center_size(
                    egui::pos2(x, wave_rect.top() + 10.0),
                    egui::vec2(14.0, 16.0),
                );
                painter.rect_filled(tab_rect, 3.0, color);
                painter.text(
                    tab_rect.center(),
                    egui::Align2::CENTER_CENTER,
                    label,
                    egui::FontId::proportional(11.0),
                    egui::Color32::WHITE,
                );

                let response = ui.allocate_rect(handle_rect, egui::Sense::click_and_drag());
                if response.drag_started() && self.state.drag.is_none() {
                    self.state.drag = Some(DragSession {
                        marker,
                        pointer_origin: response
                            .interact_pointer_pos()
                            .unwrap_or(handle_rect.center()),
                    });
                }
            }

            // Live drag: pointer x over the full content width maps to time
            // over the full duration, clamped at the track edges.
            if let Some(session) = &self.state.drag {
                if let Some(pos) = ui.input(|i| i.pointer.latest_pos()) {
                    // A press without movement leaves the marker untouched.
                    if pos != session.pointer_origin {
                        let fraction =
                            ((pos.x - content_rect.left()) / content_rect.width()) as f64;
                        events.push(WaveformEvent::MarkerDragged {
                            marker: session.marker,
                            time: time_at_fraction(fraction, duration),
                        });
                    }
                }
                // Releases are observed globally, wherever the pointer is.
                if ui.input(|i| i.pointer.any_released()) {
                    self.state.drag = None;
                    events.push(WaveformEvent::DragReleased);
                }
            }
        });

        self.state.scroll_x = output.state.offset.x;
        events
    }
}

fn placeholder(ui: &mut egui::Ui, text: &str) {
    let (rect, _) = ui.allocate_exact_size(
        egui::vec2(ui.available_width(), RULER_HEIGHT + WAVEFORM_HEIGHT),
        egui::Sense::hover(),
    );
    ui.painter().rect_filled(rect, 4.0, egui::Color32::from_gray(24));
    ui.painter().text(
        rect.center(),
        egui::Align2::CENTER_CENTER,
        text,
        egui::FontId::proportional(14.0),
        egui::Color32::GRAY,
    );
}

fn time_to_x(time: f64, duration: f64, content_rect: egui::Rect) -> f32 {
    content_rect.left() + (time / duration) as f32 * content_rect.width()
}

fn draw_peaks(
    painter: &egui::Painter,
    wave_rect: egui::Rect,
    columns: &[(f32, f32)],
    scroll_x: f32,
    viewport_width: f32,
) {
    let center_y = wave_rect.center().y;
    let half = wave_rect.height() / 2.0;

    // One column per pixel; only the visible window is worth painting.
    let first = scroll_x.max(0.0) as usize;
    let last = ((scroll_x + viewport_width).ceil() as usize + 1).min(columns.len());
    for (i, &(min, max)) in columns
        .iter()
        .enumerate()
        .take(last)
        .skip(first.min(columns.len()))
    {
        let x = wave_rect.left() + i as f32 + 0.5;
        let y1 = center_y - max.clamp(-1.0, 1.0) * half * 0.9;
        let y2 = center_y - min.clamp(-1.0, 1.0) * half * 0.9;
        painter.line_segment(
            [egui::pos2(x, y1), egui::pos2(x, y2.max(y1 + 1.0))],
            egui::Stroke::new(1.0, WAVE_COLOR),
        );
    }
}

fn draw_ruler(
    painter: &egui::Painter,
    ruler_rect: egui::Rect,
    px_per_sec: f32,
    scroll_x: f32,
    viewport_width: f32,
) {
    painter.rect_filled(ruler_rect, 0.0, egui::Color32::from_gray(40));

    // Tick intervals track the zoom-scaled density.
    let (major_interval, minor_interval) = if px_per_sec > 200.0 {
        (1.0, 0.1)
    } else if px_per_sec > 50.0 {
        (5.0, 1.0)
    } else {
        (10.0, 5.0)
    };

    let start_time = (scroll_x.max(0.0) / px_per_sec) as f64;
    let end_time = ((scroll_x + viewport_width) / px_per_sec) as f64;

    let mut time = (start_time / minor_interval).floor() * minor_interval;
    while time <= end_time {
        let x = ruler_rect.left() + time as f32 * px_per_sec;
        painter.line_segment(
            [
                egui::pos2(x, ruler_rect.bottom() - 4.0),
                egui::pos2(x, ruler_rect.bottom()),
            ],
            egui::Stroke::new(1.0, egui::Color32::from_gray(120)),
        );
        time += minor_interval;
    }

    let mut time = (start_time / major_interval).floor() * major_interval;
    while time <= end_time {
        let x = ruler_rect.left() + time as f32 * px_per_sec;
        painter.line_segment(
            [
                egui::pos2(x, ruler_rect.bottom() - 10.0),
                egui::pos2(x, ruler_rect.bottom()),
            ],
            egui::Stroke::new(2.0, egui::Color32::WHITE),
        );
        painter.text(
            egui::pos2(x + 2.0, ruler_rect.center().y - 2.0),
            egui::Align2::LEFT_CENTER,
            format!("{:.1}s", time),
            egui::FontId::proportional(10.0),
            egui::Color32::WHITE,
        );
        time += major_interval;
    }
}

// Helper function to format time as MM:SS.mmm
pub fn format_time(seconds: f64) -> String {
    let minutes = (seconds / 60.0) as i32;
    let secs = seconds % 60.0;
    format!("{:02}:{:06.3}", minutes, secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(0.0), "00:00.000");
        assert_eq!(format_time(75.5), "01:15.500");
        assert_eq!(format_time(600.25), "10:00.250");
    }
}
