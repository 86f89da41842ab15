use image::{imageops::FilterType, DynamicImage};
use std::io::Cursor;

use super::format::ImageFormat;
use super::{vector, ConvertError, Result};
use crate::state::data::Payload;

/// Largest edge the ICO container can hold
const ICO_MAX_EDGE: u32 = 256;

/// Decode a payload into a bitmap.
///
/// SVG payloads are rasterized straight at the target size so they stay
/// sharp; everything else is decoded at its own size.
pub fn decode(input: &Payload, width: u32, height: u32) -> Result<DynamicImage> {
    if input.is_empty() {
        return Err(ConvertError::EmptyInput);
    }

    if input.format() == Some(ImageFormat::Svg) || looks_like_svg(&input.bytes) {
        return vector::rasterize(&input.bytes, width, height);
    }

    Ok(image::load_from_memory(&input.bytes)?)
}

/// Draw `image` onto a `width` x `height` surface, stretching to fill it
pub fn draw(image: &DynamicImage, width: u32, height: u32) -> Result<DynamicImage> {
    if width == 0 || height == 0 {
        return Err(ConvertError::InvalidSize(width, height));
    }

    if image.width() == width && image.height() == height {
        return Ok(image.clone());
    }

    Ok(image.resize_exact(width, height, FilterType::Triangle))
}

/// Encode a bitmap into `format`
pub fn encode(image: &DynamicImage, format: ImageFormat) -> Result<Payload> {
    let encoder = format
        .encoder()
        .ok_or(ConvertError::UnsupportedOutput(format))?;

    // Match the pixel layouts each encoder accepts
    let surface = match format {
        ImageFormat::Jpeg => DynamicImage::ImageRgb8(image.to_rgb8()),
        // The ICO container holds at most 256x256; shrink to fit, keeping the aspect ratio
        ImageFormat::Ico if image.width() > ICO_MAX_EDGE || image.height() > ICO_MAX_EDGE => {
            DynamicImage::ImageRgba8(
                image
                    .resize(ICO_MAX_EDGE, ICO_MAX_EDGE, FilterType::Triangle)
                    .to_rgba8(),
            )
        }
        _ => DynamicImage::ImageRgba8(image.to_rgba8()),
    };

    let mut bytes = Cursor::new(Vec::new());
    surface
        .write_to(&mut bytes, encoder)
        .map_err(|e| ConvertError::Encode {
            format,
            reason: e.to_string(),
        })?;

    Ok(Payload::new(format.mime_type(), bytes.into_inner()))
}

/// Full pipeline for one item: decode, draw at the target size, encode
pub fn convert(input: &Payload, format: ImageFormat, width: u32, height: u32) -> Result<Payload> {
    let decoded = decode(input, width, height)?;
    let surface = draw(&decoded, width, height)?;
    encode(&surface, format)
}

fn looks_like_svg(bytes: &[u8]) -> bool {
    let head = &bytes[..bytes.len().min(512)];
    let head = String::from_utf8_lossy(head);
    let head = head.trim_start_matches('\u{feff}').trim_start();
    head.starts_with("<svg") || (head.starts_with("<?xml") && head.contains("<svg"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn png_payload(width: u32, height: u32) -> Payload {
        let image = RgbaImage::from_pixel(width, height, Rgba([0, 128, 255, 255]));
        encode(&DynamicImage::ImageRgba8(image), ImageFormat::Png).unwrap()
    }

    #[test]
    fn test_convert_resizes_and_reencodes() {
        let input = png_payload(8, 4);
        let output = convert(&input, ImageFormat::Jpeg, 16, 16).unwrap();
        assert_eq!(output.mime, "image/jpeg");

        let decoded = image::load_from_memory(&output.bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (16, 16));
        assert_eq!(
            image::guess_format(&output.bytes).unwrap(),
            image::ImageFormat::Jpeg
        );
    }

    #[test]
    fn test_every_output_format_encodes() {
        let input = png_payload(4, 4);
        for format in ImageFormat::OUTPUTS {
            let output = convert(&input, format, 32, 32).unwrap();
            assert_eq!(output.mime, format.mime_type());
            assert!(!output.bytes.is_empty());
        }
    }

    #[test]
    fn test_svg_input_is_rasterized() {
        let svg = Payload::new(
            "image/svg+xml",
            br#"<svg xmlns="http://www.w3.org/2000/svg" width="4" height="4"><rect width="4" height="4" fill="blue"/></svg>"#.to_vec(),
        );
        let output = convert(&svg, ImageFormat::Png, 12, 6).unwrap();
        let decoded = image::load_from_memory(&output.bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (12, 6));
    }

    #[test]
    fn test_svg_sniffed_without_mime() {
        let svg = Payload::new(
            "application/octet-stream",
            b"<?xml version=\"1.0\"?>\n<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"2\" height=\"2\"/>".to_vec(),
        );
        assert!(decode(&svg, 2, 2).is_ok());
    }

    #[test]
    fn test_errors() {
        assert!(matches!(
            decode(&Payload::new("image/png", Vec::new()), 1, 1),
            Err(ConvertError::EmptyInput)
        ));
        assert!(matches!(
            decode(&Payload::new("image/png", vec![1, 2, 3]), 1, 1),
            Err(ConvertError::Decode(_))
        ));
        assert!(matches!(
            convert(&png_payload(2, 2), ImageFormat::Svg, 2, 2),
            Err(ConvertError::UnsupportedOutput(ImageFormat::Svg))
        ));
    }

    #[test]
    fn test_large_icon_is_fit_inside_limit() {
        let output = convert(&png_payload(2, 2), ImageFormat::Ico, 500, 250).unwrap();
        assert_eq!(output.mime, "image/x-icon");

        let decoded = image::load_from_memory_with_format(&output.bytes, image::ImageFormat::Ico).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (256, 128));
    }
}
