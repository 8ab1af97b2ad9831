use image::imageops::FilterType;
use image::{DynamicImage, RgbaImage};

use crate::error::AssembleError;

/// Decode image bytes as sent by the reader (bmp, png or jpeg)
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage, AssembleError> {
    Ok(image::load_from_memory(bytes)?)
}

/// Largest size with the aspect ratio of `image` that fits in `region`.
/// Images are scaled up as well as down; no side goes below one pixel.
pub fn fit_size(image: (u32, u32), region: (u32, u32)) -> (u32, u32) {
    let (width, height) = (image.0.max(1) as f64, image.1.max(1) as f64);
    let (max_width, max_height) = (region.0.max(1) as f64, region.1.max(1) as f64);

    let scale = (max_width / width).min(max_height / height);

    let fitted_width = (width * scale).round().clamp(1.0, max_width) as u32;
    let fitted_height = (height * scale).round().clamp(1.0, max_height) as u32;

    (fitted_width, fitted_height)
}

/// Resize `image` to fit `region`, returning an RGBA bitmap ready for painting
pub fn resize_to_fit(image: &DynamicImage, region: (u32, u32)) -> RgbaImage {
    let (width, height) = fit_size((image.width(), image.height()), region);

    if (width, height) == (image.width(), image.height()) {
        return image.to_rgba8();
    }

    image.resize_exact(width, height, FilterType::Triangle).to_rgba8()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba};
    use std::io::Cursor;

    #[test]
    fn test_fit_keeps_aspect_ratio() {
        assert_eq!(fit_size((1280, 960), (640, 480)), (640, 480));
        assert_eq!(fit_size((1280, 480), (640, 480)), (640, 240));
        assert_eq!(fit_size((300, 600), (640, 480)), (240, 480));
    }

    #[test]
    fn test_fit_scales_up_small_images() {
        assert_eq!(fit_size((64, 48), (640, 480)), (640, 480));
    }

    #[test]
    fn test_fit_never_collapses() {
        assert_eq!(fit_size((10_000, 1), (100, 100)), (100, 1));
        assert_eq!(fit_size((0, 0), (100, 50)), (50, 50));
    }

    #[test]
    fn test_decode_and_resize() {
        let source = RgbaImage::from_pixel(40, 20, Rgba([10, 20, 30, 255]));
        let mut bytes = Vec::new();
        source
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();

        let decoded = decode_image(&bytes).unwrap();
        let fitted = resize_to_fit(&decoded, (100, 100));
        assert_eq!(fitted.dimensions(), (100, 50));
        let pixel = fitted.get_pixel(50, 25);
        for (got, want) in pixel.0.iter().zip([10u8, 20, 30, 255]) {
            assert!(got.abs_diff(want) <= 1, "{:?}", pixel);
        }
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            decode_image(b"definitely not an image"),
            Err(AssembleError::ImageDecode(_))
        ));
    }
}
