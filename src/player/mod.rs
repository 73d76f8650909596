pub mod controller;
pub mod gst_media;
pub mod media;
