use dataman_types::{ComplexResult, ResultType, ResultTypes, SharedComplexResult};
use image::RgbaImage;

use crate::error::AssembleError;
use crate::graphics::ResultGraphics;
use crate::imaging::{decode_image, resize_to_fit};
use crate::read_string::read_string_from_xml;
use crate::session::SessionStatus;

/// A text-carrying result item, kept in arrival order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextEntry {
    Xml(String),
    Plain(String),
}

/// Owned copy of a complex result, split by kind.
///
/// Taking the snapshot is the only step done under the result's lock;
/// decoding, scaling and painting all work on the copy.
#[derive(Debug, Clone, Default)]
pub struct ResultSnapshot {
    pub images: Vec<Vec<u8>>,
    pub graphics: Vec<String>,
    pub texts: Vec<TextEntry>,
    /// Kinds present in the complex result
    pub collected: ResultTypes,
    /// Cycle id of the last text item, -1 without one
    pub result_id: i32,
}

impl ResultSnapshot {
    pub fn capture(shared: &SharedComplexResult) -> Self {
        let guard = shared
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Self::from_complex(&guard)
    }

    pub fn from_complex(complex: &ComplexResult) -> Self {
        let mut snapshot = ResultSnapshot {
            result_id: -1,
            ..Default::default()
        };

        for simple in &complex.simple_results {
            snapshot.collected |= simple.result_type().mask();

            match simple.result_type() {
                ResultType::Image => snapshot.images.push(simple.data.clone()),
                ResultType::ImageGraphics => snapshot.graphics.push(simple.data_as_string()),
                ResultType::ReadXml => {
                    snapshot.texts.push(TextEntry::Xml(simple.data_as_string()));
                    snapshot.result_id = simple.id.id;
                }
                ResultType::ReadString => {
                    snapshot.texts.push(TextEntry::Plain(simple.data_as_string()));
                    snapshot.result_id = simple.id.id;
                }
            }
        }

        snapshot
    }
}

/// What gets shown for one complex result
#[derive(Debug, Clone, Default)]
pub struct AssembledResult {
    pub image: Option<RgbaImage>,
    pub text: Option<String>,
    pub result_id: i32,
    pub collected: ResultTypes,
}

impl AssembledResult {
    pub fn is_empty(&self) -> bool {
        self.image.is_none() && self.text.is_none()
    }
}

/// Turns complex results into a display image and read string
#[derive(Debug, Clone)]
pub struct ResultAssembler {
    display_size: (u32, u32),
}

impl ResultAssembler {
    pub fn new(display_size: (u32, u32)) -> Self {
        Self {
            display_size: (display_size.0.max(1), display_size.1.max(1)),
        }
    }

    /// Assemble a snapshot. Failures never propagate: a broken image yields
    /// no image, broken XML yields an empty read string.
    pub fn assemble(&self, snapshot: &ResultSnapshot, session: &SessionStatus) -> AssembledResult {
        let image = match self.compose_image(snapshot) {
            Ok(image) => image,
            Err(e) => {
                tracing::debug!("Skipping result image: {e}");
                None
            }
        };

        let text = self.resolve_text(snapshot, session);

        tracing::info!(
            "Complex result arrived: resultId = {}, read result = {:?}",
            snapshot.result_id,
            text
        );

        AssembledResult {
            image,
            text,
            result_id: snapshot.result_id,
            collected: snapshot.collected,
        }
    }

    /// First image of the snapshot, fitted to the display region with every
    /// overlay painted on it in arrival order. Later images are ignored.
    pub fn compose_image(&self, snapshot: &ResultSnapshot) -> Result<Option<RgbaImage>, AssembleError> {
        let Some(bytes) = snapshot.images.first() else {
            return Ok(None);
        };

        let source = decode_image(bytes)?;
        let mut fitted = resize_to_fit(&source, self.display_size);

        if snapshot.images.len() > 1 {
            tracing::debug!("Ignoring {} extra images", snapshot.images.len() - 1);
        }

        let target = fitted.dimensions();
        let source_size = (source.width(), source.height());

        for svg in &snapshot.graphics {
            match ResultGraphics::parse(svg, target, source_size) {
                Ok(graphics) => graphics.paint(&mut fitted),
                Err(e) => tracing::debug!("Skipping image graphics: {}", AssembleError::from(e)),
            }
        }

        Ok(Some(fitted))
    }

    /// Read string of the snapshot; text items are applied in arrival order
    /// so the last one wins. XML items are only decoded while the session is
    /// connected.
    pub fn resolve_text(&self, snapshot: &ResultSnapshot, session: &SessionStatus) -> Option<String> {
        let mut text = None;

        for entry in &snapshot.texts {
            match entry {
                TextEntry::Plain(value) => text = Some(value.clone()),
                TextEntry::Xml(xml) => match self.decode_xml(xml, session) {
                    Ok(value) => text = Some(value),
                    Err(AssembleError::NotConnected) => {
                        tracing::debug!("Session not connected, read XML left undecoded");
                    }
                    Err(e) => {
                        tracing::debug!("Unreadable result XML: {e}");
                        text = Some(String::new());
                    }
                },
            }
        }

        text
    }

    fn decode_xml(&self, xml: &str, session: &SessionStatus) -> Result<String, AssembleError> {
        let encoding = session.text_encoding().ok_or(AssembleError::NotConnected)?;
        read_string_from_xml(xml, encoding)
    }
}
