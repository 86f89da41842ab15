/// Export and packaging
///
/// This module handles:
/// - Output file naming (naming.rs)
/// - Zip archives of converted images (archive.rs)
/// - SVG editor exports: markup or rasterized (svg.rs)
/// - Writing files chosen through the native save dialog

pub mod archive;
pub mod naming;
pub mod svg;

use log::info;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::convert::ConvertError;
use crate::svg::SvgError;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("nothing to export")]
    NothingToExport,

    #[error("failed to build archive: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Svg(#[from] SvgError),

    #[error(transparent)]
    Convert(#[from] ConvertError),
}

pub type Result<T> = std::result::Result<T, ExportError>;

/// Ask the user where to save `bytes`, suggesting `file_name`.
///
/// Returns the chosen path, or None when the dialog was cancelled.
pub fn save_with_dialog(file_name: &str, bytes: &[u8]) -> Result<Option<PathBuf>> {
    let mut dialog = rfd::FileDialog::new()
        .set_title("Save As")
        .set_file_name(file_name);
    if let Some(downloads) = dirs::download_dir() {
        dialog = dialog.set_directory(downloads);
    }

    match dialog.save_file() {
        Some(path) => {
            write_file(&path, bytes)?;
            Ok(Some(path))
        }
        None => Ok(None),
    }
}

pub fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    std::fs::write(path, bytes).map_err(|source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    info!("💾 Saved {} ({} bytes)", path.display(), bytes.len());
    Ok(())
}
