/// Input acquisition
///
/// Turns local files, dropped files, folders and remote URLs into payloads
/// the image converter can take as work items.
use log::{info, warn};
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;
use walkdir::WalkDir;

use crate::convert::format::ImageFormat;
use crate::state::data::Payload;

#[derive(Debug, Error)]
pub enum AcquireError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid URL {0:?}: {1}")]
    InvalidUrl(String, url::ParseError),

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server answered {0}")]
    Status(u16),

    #[error("malformed data URI")]
    DataUri,

    #[error("{0} is not a supported image file")]
    Unsupported(String),

    #[error("{0} is empty")]
    Empty(String),
}

pub type Result<T> = std::result::Result<T, AcquireError>;

/// Content ready to become a work item
#[derive(Debug, Clone, PartialEq)]
pub struct Acquired {
    pub payload: Payload,
    pub file_name: String,
}

/// Result of a folder import
#[derive(Debug, Clone, Default)]
pub struct FolderImport {
    pub files: Vec<Acquired>,
    pub skipped_count: usize,
}

/// Read one local file. The MIME type comes from the extension.
pub fn read_file(path: &Path) -> Result<Acquired> {
    let file_name = path
        .file_name()
        .unwrap_or_default()
        .to_string_lossy()
        .to_string();

    let format = path
        .extension()
        .and_then(|ext| ext.to_str())
        .and_then(ImageFormat::from_extension)
        .ok_or_else(|| AcquireError::Unsupported(file_name.clone()))?;

    let bytes = std::fs::read(path).map_err(|source| AcquireError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    if bytes.is_empty() {
        return Err(AcquireError::Empty(file_name));
    }

    Ok(Acquired {
        payload: Payload::new(format.mime_type(), bytes),
        file_name,
    })
}

/// Read several files, logging and skipping the ones that fail
pub async fn read_files(paths: Vec<PathBuf>) -> Vec<Acquired> {
    tokio::task::spawn_blocking(move || {
        paths
            .iter()
            .filter_map(|path| match read_file(path) {
                Ok(acquired) => Some(acquired),
                Err(e) => {
                    warn!("⚠️  Skipping {}: {}", path.display(), e);
                    None
                }
            })
            .collect()
    })
    .await
    .unwrap_or_else(|e| {
        warn!("⚠️  File reader failed: {}", e);
        Vec::new()
    })
}

/// Import every supported image below `folder`
/// Runs in a background thread to avoid blocking the UI
pub async fn import_folder(folder: PathBuf) -> FolderImport {
    tokio::task::spawn_blocking(move || import_folder_blocking(&folder))
        .await
        .unwrap_or_else(|e| {
            warn!("⚠️  Folder import failed: {}", e);
            FolderImport::default()
        })
}

fn import_folder_blocking(folder: &Path) -> FolderImport {
    let mut import = FolderImport::default();

    info!("🔍 Scanning folder: {}", folder.display());

    // Walk the directory tree recursively
    for entry in WalkDir::new(folder)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();

        // Only process files (not directories)
        if !path.is_file() {
            continue;
        }

        // Only files whose extension names a supported format
        let supported = path
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(ImageFormat::from_extension)
            .is_some();
        if !supported {
            continue;
        }

        match read_file(path) {
            Ok(acquired) => import.files.push(acquired),
            Err(e) => {
                warn!("⚠️  Error importing {}: {}", path.display(), e);
                import.skipped_count += 1;
            }
        }
    }

    info!(
        "✅ Folder scan complete: {} images, {} skipped",
        import.files.len(),
        import.skipped_count
    );
    import
}

/// URL of the relay endpoint that fetches `target` for us
pub fn relay_url(endpoint: &str, target: &str) -> Result<Url> {
    let base = format!("{}/proxy", endpoint.trim_end_matches('/'));
    Url::parse_with_params(&base, &[("url", target)])
        .map_err(|e| AcquireError::InvalidUrl(base, e))
}

/// Fetch a remote image once.
///
/// `data:` URIs are decoded locally. SVG inputs go through the relay; the
/// raw markup is stored, rasterization happens with the rest of the batch.
pub async fn fetch_url(target: &str, input_format: ImageFormat, endpoint: &str) -> Result<Acquired> {
    let target = target.trim();

    if target.starts_with("data:") {
        let payload = Payload::from_data_uri(target).ok_or(AcquireError::DataUri)?;
        return Ok(Acquired {
            payload,
            file_name: String::new(),
        });
    }

    let parsed = Url::parse(target).map_err(|e| AcquireError::InvalidUrl(target.to_string(), e))?;
    let request_url = if input_format.is_vector() {
        relay_url(endpoint, parsed.as_str())?
    } else {
        parsed.clone()
    };

    info!("🌐 Fetching {}", request_url);
    let response = reqwest::get(request_url).await?;
    if !response.status().is_success() {
        return Err(AcquireError::Status(response.status().as_u16()));
    }

    let header_mime = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    let bytes = response.bytes().await?.to_vec();

    let file_name = file_name_from_url(&parsed);
    if bytes.is_empty() {
        return Err(AcquireError::Empty(target.to_string()));
    }

    Ok(Acquired {
        payload: Payload::new(resolve_mime(header_mime.as_deref(), &file_name, input_format), bytes),
        file_name,
    })
}

/// Last path segment of a URL, empty when there is none
fn file_name_from_url(url: &Url) -> String {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            percent_encoding::percent_decode_str(segment)
                .decode_utf8_lossy()
                .into_owned()
        })
        .unwrap_or_default()
}

/// Prefer a known Content-Type, then the URL's extension, then the declared input format
fn resolve_mime(header: Option<&str>, file_name: &str, input_format: ImageFormat) -> String {
    let from_header = header.and_then(ImageFormat::from_mime);
    let from_name = Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .and_then(ImageFormat::from_extension);

    from_header
        .or(from_name)
        .unwrap_or(input_format)
        .mime_type()
        .to_string()
}
