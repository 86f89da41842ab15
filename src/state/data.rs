/// Shared data structures for the application state
///
/// These structs represent the data model that flows between
/// the state containers, the conversion engine and the UI layer.
use base64::{engine::general_purpose::STANDARD, Engine as _};
use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};

use crate::convert::format::ImageFormat;

/// Identifier of an image work item, unique within one container
pub type ItemId = u64;

/// An encoded blob that knows its own MIME type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl Payload {
    pub fn new(mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            mime: mime.into(),
            bytes,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Format implied by the MIME type, if it is one we know
    pub fn format(&self) -> Option<ImageFormat> {
        ImageFormat::from_mime(&self.mime)
    }

    /// Parse a `data:` URI. Both base64 and plain (percent-encoded) bodies are accepted.
    pub fn from_data_uri(uri: &str) -> Option<Self> {
        let rest = uri.strip_prefix("data:")?;
        let (header, body) = rest.split_once(',')?;

        let (mime, is_base64) = match header.strip_suffix(";base64") {
            Some(mime) => (mime, true),
            None => (header, false),
        };
        let mime = if mime.is_empty() { "text/plain" } else { mime };

        let bytes = if is_base64 {
            STANDARD.decode(body.trim()).ok()?
        } else {
            percent_decode_str(body).collect::<Vec<u8>>()
        };

        Some(Self::new(mime, bytes))
    }
}

/// Represents a single image tracked by the converter
#[derive(Debug, Clone, PartialEq)]
pub struct ImageItem {
    /// Unique container-generated ID
    pub id: ItemId,
    /// Source content as ingested
    pub input: Payload,
    /// Converted content (None until a batch has converted this item)
    pub output: Option<Payload>,
    /// Source file name, empty when the item came from a nameless source
    pub file_name: String,
}

/// Where new work items come from
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum InputMode {
    Url,
    #[default]
    File,
}

/// Which paint attribute color operations target
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum EditMode {
    #[default]
    Fill,
    Stroke,
}

impl EditMode {
    pub fn attribute(self) -> &'static str {
        match self {
            EditMode::Fill => "fill",
            EditMode::Stroke => "stroke",
        }
    }
}

/// One graphical element of the loaded SVG document
#[derive(Debug, Clone, PartialEq)]
pub struct ElementRecord {
    pub id: String,
    /// Local tag name (path, circle, ...)
    pub tag: String,
    /// Handle of the element inside the parsed document
    pub node: usize,
    pub original_fill: Option<String>,
    pub original_stroke: Option<String>,
    pub current_fill: Option<String>,
    pub current_stroke: Option<String>,
}

impl ElementRecord {
    /// Current color under the given edit mode
    pub fn color(&self, mode: EditMode) -> Option<&str> {
        match mode {
            EditMode::Fill => self.current_fill.as_deref(),
            EditMode::Stroke => self.current_stroke.as_deref(),
        }
    }

    pub fn set_color(&mut self, mode: EditMode, color: Option<String>) {
        match mode {
            EditMode::Fill => self.current_fill = color,
            EditMode::Stroke => self.current_stroke = color,
        }
    }

    pub fn is_modified(&self) -> bool {
        self.current_fill != self.original_fill || self.current_stroke != self.original_stroke
    }
}
