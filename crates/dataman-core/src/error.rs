use crate::graphics::GraphicsError;

/// Reasons a part of a complex result could not be assembled.
///
/// None of these reach the display: the assembler turns them into a missing
/// image or an empty read string.
#[derive(Debug, thiserror::Error)]
pub enum AssembleError {
    #[error("Image decode error: {0}")]
    ImageDecode(#[from] image::ImageError),

    #[error("Result XML error: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error("Base64 error: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Image graphics error: {0}")]
    Graphics(#[from] GraphicsError),

    #[error("Session is not connected")]
    NotConnected,
}
