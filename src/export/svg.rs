use log::info;

use super::naming::svg_export_file_name;
use super::Result;
use crate::convert::format::ImageFormat;
use crate::convert::{raster, vector};

/// Formats the SVG editor can export to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SvgExportFormat {
    #[default]
    Svg,
    Png,
    Jpeg,
}

impl SvgExportFormat {
    pub const ALL: [SvgExportFormat; 3] = [
        SvgExportFormat::Svg,
        SvgExportFormat::Png,
        SvgExportFormat::Jpeg,
    ];

    pub fn extension(self) -> &'static str {
        match self {
            SvgExportFormat::Svg => "svg",
            SvgExportFormat::Png => "png",
            SvgExportFormat::Jpeg => "jpg",
        }
    }

    fn raster_format(self) -> Option<ImageFormat> {
        match self {
            SvgExportFormat::Svg => None,
            SvgExportFormat::Png => Some(ImageFormat::Png),
            SvgExportFormat::Jpeg => Some(ImageFormat::Jpeg),
        }
    }
}

impl std::fmt::Display for SvgExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SvgExportFormat::Svg => write!(f, "SVG"),
            SvgExportFormat::Png => write!(f, "PNG"),
            SvgExportFormat::Jpeg => write!(f, "JPEG"),
        }
    }
}

/// Output size of a rasterized export
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportSize {
    /// Intrinsic size times a factor
    Scale(u32),
    /// Explicit pixel size
    Exact(u32, u32),
}

impl ExportSize {
    pub const SCALES: [u32; 3] = [1, 2, 4];

    fn resolve(self, intrinsic: (u32, u32)) -> (u32, u32) {
        match self {
            ExportSize::Scale(factor) => {
                let factor = factor.max(1);
                (intrinsic.0.saturating_mul(factor), intrinsic.1.saturating_mul(factor))
            }
            ExportSize::Exact(w, h) => (w.max(1), h.max(1)),
        }
    }
}

impl Default for ExportSize {
    fn default() -> Self {
        ExportSize::Scale(1)
    }
}

/// A finished export, ready to be saved
#[derive(Debug, Clone, PartialEq)]
pub struct SvgExport {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Export edited markup.
///
/// `Svg` returns the markup unchanged; raster formats render it first.
pub fn export_svg(markup: &str, format: SvgExportFormat, size: ExportSize) -> Result<SvgExport> {
    let file_name = svg_export_file_name(format.extension());

    let Some(target) = format.raster_format() else {
        return Ok(SvgExport {
            file_name,
            bytes: markup.as_bytes().to_vec(),
        });
    };

    let (width, height) = size.resolve(vector::intrinsic_size(markup.as_bytes())?);
    let bitmap = vector::rasterize(markup.as_bytes(), width, height)?;
    let payload = raster::encode(&bitmap, target)?;

    info!("🖼️  Exported SVG as {} at {}x{}", format, width, height);
    Ok(SvgExport {
        file_name,
        bytes: payload.bytes,
    })
}

/// Run the export on tokio's blocking pool
pub async fn export_svg_async(
    markup: String,
    format: SvgExportFormat,
    size: ExportSize,
) -> std::result::Result<SvgExport, String> {
    tokio::task::spawn_blocking(move || export_svg(&markup, format, size).map_err(|e| e.to_string()))
        .await
        .map_err(|e| format!("Task join error: {}", e))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::ExportError;

    const SQUARE: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="10" height="8"><rect width="10" height="8" fill="#00ff00"/></svg>"##;

    #[test]
    fn test_svg_export_is_unchanged_markup() {
        let export = export_svg(SQUARE, SvgExportFormat::Svg, ExportSize::Scale(4)).unwrap();
        assert_eq!(export.file_name, "modified-svg.svg");
        assert_eq!(export.bytes, SQUARE.as_bytes());
    }

    #[test]
    fn test_png_export_scales_intrinsic_size() {
        let export = export_svg(SQUARE, SvgExportFormat::Png, ExportSize::Scale(2)).unwrap();
        assert_eq!(export.file_name, "modified-svg.png");

        let decoded = image::load_from_memory(&export.bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (20, 16));
        assert_eq!(decoded.to_rgba8().get_pixel(5, 5).0, [0, 255, 0, 255]);
    }

    #[test]
    fn test_jpeg_export_exact_size() {
        let export = export_svg(SQUARE, SvgExportFormat::Jpeg, ExportSize::Exact(33, 12)).unwrap();
        assert_eq!(export.file_name, "modified-svg.jpg");

        let decoded = image::load_from_memory(&export.bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (33, 12));
    }

    #[tokio::test]
    async fn test_export_on_worker() {
        let export = export_svg_async(SQUARE.to_string(), SvgExportFormat::Png, ExportSize::Scale(1))
            .await
            .unwrap();
        let decoded = image::load_from_memory(&export.bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (10, 8));
    }

    #[test]
    fn test_scale_saturates_instead_of_overflowing() {
        assert_eq!(ExportSize::Scale(4).resolve((10, 8)), (40, 32));
        assert_eq!(ExportSize::Scale(0).resolve((10, 8)), (10, 8));
        assert_eq!(
            ExportSize::Scale(4).resolve((u32::MAX / 2, 3)),
            (u32::MAX, 12)
        );

        let result = export_svg(SQUARE, SvgExportFormat::Png, ExportSize::Scale(u32::MAX));
        assert!(matches!(result, Err(ExportError::Convert(_))));
    }

    #[test]
    fn test_broken_markup_fails_raster_export() {
        let result = export_svg("<svg", SvgExportFormat::Png, ExportSize::default());
        assert!(matches!(result, Err(ExportError::Convert(_))));
    }
}
