mod player;
mod sync;
mod types;
mod ui;
mod waveform;

use anyhow::Context;
use gstreamer as gst;
use tracing_subscriber::EnvFilter;

use crate::player::gst_media::GstMedia;
use crate::types::prefs::Prefs;
use crate::ui::app::WoodshedApp;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("woodshed=info")),
        )
        .init();
    gst::init().context("could not initialize GStreamer")?;

    let prefs = Prefs::load();
    let media = GstMedia::new()?;
    let app = WoodshedApp::new(media, prefs);

    let native_options = eframe::NativeOptions::default();
    eframe::run_native(
        "Woodshed",
        native_options,
        Box::new(|_cc| Ok(Box::new(app))),
    )
    .map_err(|err| anyhow::anyhow!("could not start UI: {err}"))?;
    Ok(())
}
