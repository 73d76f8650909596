use std::path::PathBuf;

use crate::types::markers::{AbRange, Marker, MarkerModel};

pub const MIN_ZOOM: f32 = 1.0;
pub const MAX_ZOOM: f32 = 5.0;

/// The media file currently loaded into the session.
#[derive(Debug, Clone)]
pub struct LoadedAsset {
    pub path: PathBuf,
    pub name: String,
}

impl LoadedAsset {
    pub fn new(path: PathBuf) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());
        Self { path, name }
    }
}

/// LoopSession groups everything the UI reads and mutates between frames:
/// the marker model, the zoom factor, the loaded asset, and the one-shot
/// center request. Playback state lives in the controller; decoded peaks live
/// in the waveform adapter.
#[derive(Debug)]
pub struct LoopSession {
    pub markers: MarkerModel,
    zoom: f32,
    pub asset: Option<LoadedAsset>,
    /// Some(range) while a "center the view on A/B" request is outstanding.
    /// The waveform widget performs the scroll once and the request is then
    /// acknowledged; repeated frames must not re-trigger the scroll.
    center_request: Option<AbRange>,
}

impl LoopSession {
    pub fn new(zoom: f32) -> Self {
        Self {
            markers: MarkerModel::new(),
            zoom: zoom.clamp(MIN_ZOOM, MAX_ZOOM),
            asset: None,
            center_request: None,
        }
    }

    /// Duration of the loaded asset, once the waveform decode has reported it.
    pub fn duration(&self) -> Option<f64> {
        let d = self.markers.duration();
        (d > 0.0).then_some(d)
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn set_zoom(&mut self, zoom: f32) {
        self.zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
    }

    pub fn set_marker(&mut self, marker: Marker, t: f64) {
        self.markers.set(marker, t);
    }

    pub fn clear_markers(&mut self) {
        self.markers.clear();
    }

    /// Begin a new asset: markers and any pending center request are dropped;
    /// the duration becomes known again when the decode reports ready.
    pub fn begin_asset(&mut self, path: PathBuf) {
        self.asset = Some(LoadedAsset::new(path));
        self.markers = MarkerModel::new();
        self.center_request = None;
    }

    pub fn request_center(&mut self) {
        self.center_request = Some(self.markers.range());
    }

    pub fn center_request(&self) -> Option<AbRange> {
        self.center_request
    }

    pub fn acknowledge_center(&mut self) {
        self.center_request = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zoom_clamped_to_supported_range() {
        let mut session = LoopSession::new(1.0);
        session.set_zoom(0.2);
        assert_eq!(session.zoom(), MIN_ZOOM);
        session.set_zoom(9.0);
        assert_eq!(session.zoom(), MAX_ZOOM);
        session.set_zoom(2.5);
        assert_eq!(session.zoom(), 2.5);
    }

    #[test]
    fn test_center_request_is_one_shot() {
        let mut session = LoopSession::new(1.0);
        session.markers.set_duration(60.0);
        session.set_marker(Marker::A, 10.0);
        session.set_marker(Marker::B, 20.0);

        assert!(session.center_request().is_none());
        session.request_center();
        let req = session.center_request().expect("request outstanding");
        assert_eq!(req, AbRange { a: 10.0, b: 20.0 });

        session.acknowledge_center();
        assert!(session.center_request().is_none());
    }

    #[test]
    fn test_begin_asset_resets_markers_and_requests() {
        let mut session = LoopSession::new(1.0);
        session.markers.set_duration(60.0);
        session.set_marker(Marker::A, 5.0);
        session.request_center();

        session.begin_asset(PathBuf::from("/music/take2.flac"));
        assert_eq!(session.asset.as_ref().unwrap().name, "take2.flac");
        assert!(session.duration().is_none());
        assert!(session.center_request().is_none());
    }
}
