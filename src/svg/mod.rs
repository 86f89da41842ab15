//! SVG document model.
//!
//! - [`document`]: token tree with id synthesis and attribute rewriting
//! - [`paint`]: helpers for reading paint values (swatches, hex colors)

pub mod document;
pub mod paint;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SvgError {
    #[error("XML parse error at position {position}: {reason}")]
    Parse { position: u64, reason: String },

    #[error("document has no <svg> root element")]
    NoSvgRoot,

    #[error("failed to serialize document: {0}")]
    Serialize(String),
}

pub type Result<T> = std::result::Result<T, SvgError>;
