use image::RgbaImage;

use crate::assembler::AssembledResult;

/// Something that can show a result image and read string
pub trait DisplaySink {
    fn show_image(&mut self, image: &RgbaImage);

    fn show_text(&mut self, text: &str);

    /// Connection or diagnostic line, optional for sinks
    fn show_status(&mut self, _status: &str) {}
}

/// What is currently on screen. Lives on the display thread.
#[derive(Debug, Default)]
pub struct DisplayState {
    image: Option<RgbaImage>,
    text: String,
    frames: u64,
}

impl DisplayState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn image(&self) -> Option<&RgbaImage> {
        self.image.as_ref()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Number of images shown so far
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Show an assembled result. The previous bitmap is released before the
    /// new one is stored; text is only replaced when the result carries some.
    /// Returns false when there was nothing to show.
    pub fn apply(&mut self, assembled: AssembledResult, sink: &mut dyn DisplaySink) -> bool {
        if assembled.is_empty() {
            return false;
        }

        if let Some(image) = assembled.image {
            if let Some(previous) = self.image.take() {
                tracing::trace!("Releasing previous frame {:?}", previous.dimensions());
                drop(previous);
            }

            sink.show_image(&image);
            self.image = Some(image);
            self.frames += 1;
        }

        if let Some(text) = assembled.text {
            sink.show_text(&text);
            self.text = text;
        }

        true
    }
}
