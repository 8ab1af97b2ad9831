use std::path::PathBuf;

use dataman_core::DisplaySink;
use image::RgbaImage;
use slint::{Rgba8Pixel, SharedPixelBuffer, Weak};

use crate::ResultWindow;

/// Pushes results into the Slint window
pub struct SlintSink {
    window: Weak<ResultWindow>,
}

impl SlintSink {
    pub fn new(window: Weak<ResultWindow>) -> Self {
        Self { window }
    }
}

impl DisplaySink for SlintSink {
    fn show_image(&mut self, image: &RgbaImage) {
        if let Some(w) = self.window.upgrade() {
            let buffer = SharedPixelBuffer::<Rgba8Pixel>::clone_from_slice(
                image.as_raw(),
                image.width(),
                image.height(),
            );
            w.set_result_image(slint::Image::from_rgba8(buffer));
            tracing::debug!("[SLINT] Image {}x{}", image.width(), image.height());
        }
    }

    fn show_text(&mut self, text: &str) {
        if let Some(w) = self.window.upgrade() {
            w.set_read_string(text.into());
        }
    }

    fn show_status(&mut self, status: &str) {
        if let Some(w) = self.window.upgrade() {
            w.set_status(status.into());
        }
    }
}

/// Logs results; optionally keeps the last image on disk
pub struct HeadlessSink {
    snapshot_path: Option<PathBuf>,
}

impl HeadlessSink {
    pub fn new(snapshot_path: Option<PathBuf>) -> Self {
        Self { snapshot_path }
    }
}

impl DisplaySink for HeadlessSink {
    fn show_image(&mut self, image: &RgbaImage) {
        let Some(path) = &self.snapshot_path else {
            tracing::debug!("Result image {}x{}", image.width(), image.height());
            return;
        };

        match image.save(path) {
            Ok(()) => tracing::debug!("Result image written to {}", path.display()),
            Err(e) => tracing::warn!("Failed to write {}: {}", path.display(), e),
        }
    }

    fn show_text(&mut self, text: &str) {
        tracing::info!("Read string: {text}");
    }

    fn show_status(&mut self, status: &str) {
        tracing::info!("{status}");
    }
}
