/// Conversion parameters for the image converter
///
/// This struct stores the user's choices for the next batch.
/// It is serialized to JSON and stored in the settings table,
/// so the last used parameters come back on the next launch.

use serde::{Deserialize, Serialize};

use super::data::InputMode;
use crate::convert::format::ImageFormat;

/// Quick size buttons: (width, height, label)
pub const SIZE_PRESETS: [(u32, u32, &str); 5] = [
    (640, 480, "640 × 480"),
    (800, 600, "800 × 600"),
    (1024, 768, "1024 × 768"),
    (1280, 720, "1280 × 720 (HD)"),
    (1920, 1080, "1920 × 1080 (Full HD)"),
];

/// All parameters of an image conversion batch
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct ConversionParams {
    /// Format the user declares the inputs to be in
    /// - Filters the file picker
    /// - `svg` routes URL ingestion through the relay
    pub input_format: ImageFormat,

    /// Format every item is re-encoded to
    /// - Never `svg`
    /// - Never equal to `input_format`
    pub output_format: ImageFormat,

    /// Target surface width in pixels (>= 1)
    pub width: u32,

    /// Target surface height in pixels (>= 1)
    pub height: u32,

    /// How new items are acquired
    pub input_mode: InputMode,
}

impl Default for ConversionParams {
    fn default() -> Self {
        Self {
            input_format: ImageFormat::Svg,
            output_format: ImageFormat::Png,
            width: 500,
            height: 500,
            input_mode: InputMode::File,
        }
    }
}

impl ConversionParams {
    /// Convert to JSON string for settings storage
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse from JSON string (from settings storage), repairing invalid combinations
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let mut params: Self = serde_json::from_str(json)?;
        params.normalize();
        Ok(params)
    }

    /// Enforce the invariants: non-zero size, output is a real output
    /// format and differs from the input.
    ///
    /// Returns true when something had to change.
    pub fn normalize(&mut self) -> bool {
        let before = *self;

        self.width = self.width.max(1);
        self.height = self.height.max(1);
        if self.output_format.is_vector() || self.output_format == self.input_format {
            self.output_format = ImageFormat::first_alternative(self.input_format);
        }

        before != *self
    }
}
