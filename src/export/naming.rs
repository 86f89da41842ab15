//! Output file names.

use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::path::Path;

/// Prefix of bulk-download archives
pub const ARCHIVE_PREFIX: &str = "converted-images";

/// Base name of SVG editor exports
pub const SVG_EXPORT_BASE: &str = "modified-svg";

/// `<stem>.<ext>` of the source file, or `<millis>.<ext>` when it has no name
pub fn output_file_name(source_name: &str, extension: &str, now: DateTime<Utc>) -> String {
    let stem = Path::new(source_name.trim())
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| now.timestamp_millis().to_string());
    format!("{}.{}", stem, extension)
}

/// `<prefix>_<timestamp>.zip`
pub fn archive_file_name(now: DateTime<Utc>) -> String {
    format!("{}_{}.zip", ARCHIVE_PREFIX, now.format("%Y%m%d-%H%M%S"))
}

pub fn svg_export_file_name(extension: &str) -> String {
    format!("{}.{}", SVG_EXPORT_BASE, extension)
}

/// Makes names unique inside one archive by appending ` (n)` before the extension
#[derive(Debug, Default)]
pub struct UniqueNames {
    taken: HashSet<String>,
}

impl UniqueNames {
    pub fn claim(&mut self, name: String) -> String {
        if self.taken.insert(name.clone()) {
            return name;
        }

        let path = Path::new(&name);
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        let ext = path.extension().map(|e| e.to_string_lossy().to_string());

        let mut n = 2;
        loop {
            let candidate = match &ext {
                Some(ext) => format!("{} ({}).{}", stem, n, ext),
                None => format!("{} ({})", stem, n),
            };
            if self.taken.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }
}
