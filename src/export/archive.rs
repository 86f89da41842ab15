use chrono::{DateTime, Utc};
use log::{info, warn};
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::naming::{output_file_name, UniqueNames};
use super::{ExportError, Result};
use crate::state::data::{ImageItem, ItemId};

/// One file inside the archive
#[derive(Debug, Clone, PartialEq)]
pub struct ArchiveEntry {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Entries for the selected items that have been converted, in list order.
///
/// Each entry is named `<source stem>.<output extension>`.
pub fn entries_for(items: &[ImageItem], selected: &[ItemId], now: DateTime<Utc>) -> Vec<ArchiveEntry> {
    let mut names = UniqueNames::default();

    items
        .iter()
        .filter(|item| selected.contains(&item.id))
        .filter_map(|item| {
            let output = item.output.as_ref()?;
            let extension = output.format().map(|f| f.extension()).unwrap_or("bin");
            Some(ArchiveEntry {
                name: names.claim(output_file_name(&item.file_name, extension, now)),
                bytes: output.bytes.clone(),
            })
        })
        .collect()
}

/// Pack entries into a deflated zip
pub fn build_archive(entries: &[ArchiveEntry]) -> Result<Vec<u8>> {
    if entries.is_empty() {
        return Err(ExportError::NothingToExport);
    }

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for entry in entries {
        writer.start_file(entry.name.as_str(), options)?;
        writer.write_all(&entry.bytes).map_err(|source| ExportError::Io {
            path: entry.name.clone().into(),
            source,
        })?;
    }

    let bytes = writer.finish()?.into_inner();
    info!("📦 Built archive with {} entries ({} bytes)", entries.len(), bytes.len());
    Ok(bytes)
}

/// Build the archive on tokio's blocking pool
pub async fn build_archive_async(entries: Vec<ArchiveEntry>) -> std::result::Result<Vec<u8>, String> {
    tokio::task::spawn_blocking(move || build_archive(&entries).map_err(|e| e.to_string()))
        .await
        .map_err(|e| {
            warn!("⚠️  Archive worker failed: {}", e);
            format!("Task join error: {}", e)
        })?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::data::Payload;
    use chrono::TimeZone;
    use std::io::Read;

    fn item(id: ItemId, name: &str, output: Option<(&str, &[u8])>) -> ImageItem {
        ImageItem {
            id,
            input: Payload::new("image/png", vec![1]),
            output: output.map(|(mime, bytes)| Payload::new(mime, bytes.to_vec())),
            file_name: name.to_string(),
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap()
    }

    #[test]
    fn test_archive_has_one_entry_per_selected_item() {
        let items = vec![
            item(1, "cat.png", Some(("image/webp", b"cat"))),
            item(2, "dog.jpeg", Some(("image/webp", b"dog"))),
            item(3, "bird.gif", Some(("image/webp", b"bird"))),
            item(4, "fish.bmp", None),
        ];

        let entries = entries_for(&items, &[1, 3, 4], now());
        assert_eq!(entries.len(), 2);

        let bytes = build_archive(&entries).unwrap();
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), 2);

        let mut names = Vec::new();
        for i in 0..archive.len() {
            let mut file = archive.by_index(i).unwrap();
            let mut content = Vec::new();
            file.read_to_end(&mut content).unwrap();
            names.push((file.name().to_string(), content));
        }
        assert_eq!(
            names,
            vec![
                ("cat.webp".to_string(), b"cat".to_vec()),
                ("bird.webp".to_string(), b"bird".to_vec()),
            ]
        );
    }

    #[test]
    fn test_duplicate_names_stay_distinct() {
        let items = vec![
            item(1, "a.png", Some(("image/png", b"1"))),
            item(2, "a.jpg", Some(("image/png", b"2"))),
            item(3, "", Some(("image/png", b"3"))),
        ];
        let entries = entries_for(&items, &[1, 2, 3], now());
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "a.png".to_string(),
                "a (2).png".to_string(),
                format!("{}.png", now().timestamp_millis())
            ]
        );

        let archive = zip::ZipArchive::new(Cursor::new(build_archive(&entries).unwrap())).unwrap();
        assert_eq!(archive.len(), 3);
    }

    #[test]
    fn test_empty_selection() {
        let items = vec![item(1, "a.png", Some(("image/png", b"1")))];
        assert!(entries_for(&items, &[], now()).is_empty());
        assert!(matches!(build_archive(&[]), Err(ExportError::NothingToExport)));
    }

    #[tokio::test]
    async fn test_build_archive_async() {
        let entries = vec![ArchiveEntry {
            name: "x.png".into(),
            bytes: vec![1, 2, 3],
        }];
        let bytes = build_archive_async(entries).await.unwrap();
        assert_eq!(zip::ZipArchive::new(Cursor::new(bytes)).unwrap().len(), 1);

        assert!(build_archive_async(Vec::new()).await.is_err());
    }
}
