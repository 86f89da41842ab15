/// Conversion engine
///
/// This module handles:
/// - Decoding raster inputs and rasterizing SVG inputs (raster.rs, vector.rs)
/// - Drawing the decoded bitmap onto a surface of the target size
/// - Re-encoding the surface into the requested output format
/// - Moving whole batches onto a blocking worker

pub mod format;
pub mod raster;
pub mod vector;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("input is empty")]
    EmptyInput,

    #[error("cannot produce {0} output")]
    UnsupportedOutput(format::ImageFormat),

    #[error("invalid target size {0}x{1}")]
    InvalidSize(u32, u32),

    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("failed to parse SVG: {0}")]
    Svg(#[from] resvg::usvg::Error),

    #[error("failed to allocate a {0}x{1} surface")]
    Surface(u32, u32),

    #[error("failed to encode {format}: {reason}")]
    Encode {
        format: format::ImageFormat,
        reason: String,
    },
}

pub type Result<T> = std::result::Result<T, ConvertError>;
