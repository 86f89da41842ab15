/// SVG rasterization
///
/// Renders SVG markup into an RGBA bitmap with resvg, the native stand-in
/// for drawing an SVG `<img>` into a canvas.
use image::{DynamicImage, RgbaImage};
use resvg::{tiny_skia, usvg};

use super::{ConvertError, Result};

/// Intrinsic size of an SVG document in pixels (from width/height or viewBox)
pub fn intrinsic_size(svg_data: &[u8]) -> Result<(u32, u32)> {
    let tree = usvg::Tree::from_data(svg_data, &usvg::Options::default())?;
    let size = tree.size();
    Ok((
        size.width().round().max(1.0) as u32,
        size.height().round().max(1.0) as u32,
    ))
}

/// Rasterize an SVG document, stretched to exactly `width` x `height`
pub fn rasterize(svg_data: &[u8], width: u32, height: u32) -> Result<DynamicImage> {
    if width == 0 || height == 0 {
        return Err(ConvertError::InvalidSize(width, height));
    }

    let tree = usvg::Tree::from_data(svg_data, &usvg::Options::default())?;

    let svg_size = tree.size();
    let sx = width as f32 / svg_size.width();
    let sy = height as f32 / svg_size.height();

    let mut pixmap =
        tiny_skia::Pixmap::new(width, height).ok_or(ConvertError::Surface(width, height))?;
    resvg::render(
        &tree,
        tiny_skia::Transform::from_scale(sx, sy),
        &mut pixmap.as_mut(),
    );

    // tiny-skia stores premultiplied RGBA
    let mut data = pixmap.take();
    for px in data.chunks_exact_mut(4) {
        let a = px[3];
        if a > 0 && a < 255 {
            let alpha = a as f32 / 255.0;
            px[0] = (px[0] as f32 / alpha).round().min(255.0) as u8;
            px[1] = (px[1] as f32 / alpha).round().min(255.0) as u8;
            px[2] = (px[2] as f32 / alpha).round().min(255.0) as u8;
        }
    }

    let image = RgbaImage::from_raw(width, height, data).ok_or(ConvertError::Surface(width, height))?;
    Ok(DynamicImage::ImageRgba8(image))
}
