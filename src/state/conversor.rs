use log::{info, warn};

use super::data::{ImageItem, InputMode, ItemId, Payload};
use super::edit::ConversionParams;
use crate::convert::{self, format::ImageFormat};

/// Result of converting one item
#[derive(Debug, Clone)]
pub struct ConversionOutcome {
    pub id: ItemId,
    /// Encoded output, or the reason the item was skipped
    pub result: Result<Payload, String>,
}

/// Counts reported after a batch completes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConversionSummary {
    pub converted: usize,
    pub failed: usize,
    pub skipped: usize,
}

/// A snapshot of the work to do, detached from the container so it can
/// run on a blocking worker
#[derive(Debug, Clone)]
pub struct ConversionBatch {
    jobs: Vec<(ItemId, String, Payload)>,
    format: ImageFormat,
    width: u32,
    height: u32,
    skipped: usize,
}

impl ConversionBatch {
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    /// Items left out because they have no input
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Convert every job, strictly one after another.
    ///
    /// Only one decoded bitmap is alive at a time. A failing item is logged
    /// and reported, it never stops the batch.
    pub fn run(self) -> Vec<ConversionOutcome> {
        let total = self.jobs.len();
        info!(
            "🔄 Converting {} image(s) to {} at {}x{}",
            total, self.format, self.width, self.height
        );

        let mut outcomes = Vec::with_capacity(total);
        for (index, (id, file_name, input)) in self.jobs.into_iter().enumerate() {
            let result = convert::raster::convert(&input, self.format, self.width, self.height)
                .map_err(|e| {
                    warn!("⚠️  Failed to convert {} ({}/{}): {}", file_name, index + 1, total, e);
                    e.to_string()
                });
            outcomes.push(ConversionOutcome { id, result });
        }

        outcomes
    }

    /// Run the batch on tokio's blocking pool
    pub async fn run_async(self) -> Vec<ConversionOutcome> {
        let ids: Vec<ItemId> = self.jobs.iter().map(|(id, _, _)| *id).collect();
        match tokio::task::spawn_blocking(move || self.run()).await {
            Ok(outcomes) => outcomes,
            Err(e) => {
                warn!("⚠️  Conversion worker failed: {}", e);
                ids.into_iter()
                    .map(|id| ConversionOutcome {
                        id,
                        result: Err(format!("Task join error: {}", e)),
                    })
                    .collect()
            }
        }
    }
}

/// State container for the image converter
///
/// Owns the work items and the conversion parameters. Presentation code
/// reads through the accessors and mutates only through the methods here.
#[derive(Debug, Default)]
pub struct ImageConversor {
    items: Vec<ImageItem>,
    params: ConversionParams,
    converting: bool,
    next_id: ItemId,
}

impl ImageConversor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a container with restored parameters
    pub fn with_params(mut params: ConversionParams) -> Self {
        params.normalize();
        Self {
            params,
            ..Self::default()
        }
    }

    pub fn items(&self) -> &[ImageItem] {
        &self.items
    }

    pub fn item(&self, id: ItemId) -> Option<&ImageItem> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn params(&self) -> &ConversionParams {
        &self.params
    }

    pub fn is_converting(&self) -> bool {
        self.converting
    }

    /// Add a new work item and return its id
    pub fn add_item(&mut self, input: Payload, file_name: impl Into<String>) -> ItemId {
        self.next_id += 1;
        let id = self.next_id;
        let file_name = file_name.into();

        info!("➕ Added {} ({} bytes, {})", file_name, input.bytes.len(), input.mime);
        self.items.push(ImageItem {
            id,
            input,
            output: None,
            file_name,
        });
        id
    }

    /// Remove one item. Returns false when no item had this id.
    pub fn remove_item(&mut self, id: ItemId) -> bool {
        let before = self.items.len();
        self.items.retain(|item| item.id != id);
        before != self.items.len()
    }

    pub fn clear_all(&mut self) {
        self.items.clear();
    }

    /// Snapshot the items that need converting and raise the converting flag.
    ///
    /// Returns None if a batch is already running or no item has input.
    pub fn begin_conversion(&mut self) -> Option<ConversionBatch> {
        if self.converting || self.items.is_empty() {
            return None;
        }

        let mut skipped = 0;
        let mut jobs = Vec::new();
        for item in &self.items {
            if item.input.is_empty() {
                skipped += 1;
                continue;
            }
            jobs.push((item.id, item.file_name.clone(), item.input.clone()));
        }

        if jobs.is_empty() {
            return None;
        }

        self.converting = true;
        Some(ConversionBatch {
            jobs,
            format: self.params.output_format,
            width: self.params.width,
            height: self.params.height,
            skipped,
        })
    }

    /// Write batch results back and lower the converting flag.
    ///
    /// Outcomes for items removed while the batch ran are dropped.
    pub fn finish_conversion(&mut self, outcomes: Vec<ConversionOutcome>) -> ConversionSummary {
        let mut summary = ConversionSummary::default();

        for outcome in outcomes {
            let Some(item) = self.items.iter_mut().find(|item| item.id == outcome.id) else {
                continue;
            };
            match outcome.result {
                Ok(output) => {
                    item.output = Some(output);
                    summary.converted += 1;
                }
                Err(_) => summary.failed += 1,
            }
        }

        self.converting = false;
        info!(
            "✅ Conversion complete: {} converted, {} failed",
            summary.converted, summary.failed
        );
        summary
    }

    /// Convert every item with input, in place, on the calling thread
    #[allow(dead_code)]
    pub fn convert_all(&mut self) -> ConversionSummary {
        let Some(batch) = self.begin_conversion() else {
            return ConversionSummary::default();
        };
        let skipped = batch.skipped;
        let outcomes = batch.run();
        let mut summary = self.finish_conversion(outcomes);
        summary.skipped = skipped;
        summary
    }

    // ========== Parameter setters ==========

    pub fn set_input_format(&mut self, format: ImageFormat) {
        self.params.input_format = format;
        self.params.normalize();
    }

    /// Set the output format. Picking the input format (or `svg`) reselects
    /// the first other output format instead.
    pub fn set_output_format(&mut self, format: ImageFormat) {
        self.params.output_format = format;
        self.params.normalize();
    }

    pub fn set_width(&mut self, width: u32) {
        self.params.width = width.max(1);
    }

    pub fn set_height(&mut self, height: u32) {
        self.params.height = height.max(1);
    }

    pub fn set_size(&mut self, width: u32, height: u32) {
        self.set_width(width);
        self.set_height(height);
    }

    /// Switch acquisition mode. Opening a mode invalidates the current batch.
    pub fn set_input_mode(&mut self, mode: InputMode) {
        self.clear_all();
        self.params.input_mode = mode;
    }

    /// Output formats the user may pick given the current input format
    pub fn output_choices(&self) -> Vec<ImageFormat> {
        ImageFormat::OUTPUTS
            .iter()
            .copied()
            .filter(|format| *format != self.params.input_format)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, Rgba, RgbaImage};

    fn png(width: u32, height: u32) -> Payload {
        let image = RgbaImage::from_pixel(width, height, Rgba([10, 20, 30, 255]));
        convert::raster::encode(&DynamicImage::ImageRgba8(image), ImageFormat::Png).unwrap()
    }

    #[test]
    fn test_add_remove_clear() {
        let mut conversor = ImageConversor::new();
        let a = conversor.add_item(png(2, 2), "a.png");
        let b = conversor.add_item(png(2, 2), "b.png");
        assert_ne!(a, b);
        assert_eq!(conversor.items().len(), 2);

        assert!(conversor.remove_item(a));
        assert!(!conversor.remove_item(a));
        assert_eq!(conversor.items()[0].id, b);

        conversor.clear_all();
        assert!(conversor.items().is_empty());
    }

    #[test]
    fn test_convert_all_writes_outputs_and_keeps_inputs() {
        for format in ImageFormat::OUTPUTS {
            let mut conversor = ImageConversor::new();
            conversor.set_input_format(ImageFormat::Bmp);
            conversor.set_output_format(format);
            conversor.set_size(16, 8);

            let input = png(4, 4);
            let id = conversor.add_item(input.clone(), "photo.png");
            let expected = if format == ImageFormat::Bmp {
                ImageFormat::first_alternative(ImageFormat::Bmp)
            } else {
                format
            };

            let summary = conversor.convert_all();
            assert_eq!(summary.converted, 1);

            let item = conversor.item(id).unwrap();
            assert_eq!(item.input, input);
            let output = item.output.as_ref().unwrap();
            assert_eq!(output.mime, expected.mime_type());
            assert!(!conversor.is_converting());
        }
    }

    #[test]
    fn test_icon_output_at_default_size() {
        let mut conversor = ImageConversor::new();
        conversor.set_input_format(ImageFormat::Png);
        conversor.set_output_format(ImageFormat::Ico);
        assert_eq!(conversor.params().width, 500);
        assert_eq!(conversor.params().height, 500);

        let id = conversor.add_item(png(4, 4), "logo.png");
        let summary = conversor.convert_all();
        assert_eq!(summary.converted, 1);
        assert_eq!(summary.failed, 0);

        let output = conversor.item(id).unwrap().output.as_ref().unwrap();
        assert_eq!(output.mime, "image/x-icon");
    }

    #[test]
    fn test_batch_reports_items_without_input() {
        let mut conversor = ImageConversor::new();
        conversor.set_output_format(ImageFormat::Jpeg);
        conversor.add_item(Payload::new("image/png", Vec::new()), "empty.png");
        conversor.add_item(png(2, 2), "a.png");

        let batch = conversor.begin_conversion().unwrap();
        assert_eq!((batch.len(), batch.skipped()), (1, 1));
    }

    #[test]
    fn test_failed_item_does_not_abort_batch() {
        let mut conversor = ImageConversor::new();
        conversor.set_output_format(ImageFormat::Jpeg);
        let bad = conversor.add_item(Payload::new("image/png", vec![0, 1, 2, 3]), "bad.png");
        let empty = conversor.add_item(Payload::new("image/png", Vec::new()), "empty.png");
        let good = conversor.add_item(png(3, 3), "good.png");

        let summary = conversor.convert_all();
        assert_eq!(
            summary,
            ConversionSummary {
                converted: 1,
                failed: 1,
                skipped: 1
            }
        );
        assert!(conversor.item(bad).unwrap().output.is_none());
        assert!(conversor.item(empty).unwrap().output.is_none());
        assert!(conversor.item(good).unwrap().output.is_some());
    }

    #[test]
    fn test_no_reentrant_batches() {
        let mut conversor = ImageConversor::new();
        conversor.add_item(png(2, 2), "a.png");

        let batch = conversor.begin_conversion().unwrap();
        assert!(conversor.is_converting());
        assert!(conversor.begin_conversion().is_none());

        let outcomes = batch.run();
        conversor.finish_conversion(outcomes);
        assert!(!conversor.is_converting());
    }

    #[test]
    fn test_outcomes_for_removed_items_are_dropped() {
        let mut conversor = ImageConversor::new();
        let a = conversor.add_item(png(2, 2), "a.png");
        let b = conversor.add_item(png(2, 2), "b.png");

        let batch = conversor.begin_conversion().unwrap();
        conversor.remove_item(a);
        let summary = conversor.finish_conversion(batch.run());

        assert_eq!(summary.converted, 1);
        assert!(conversor.item(b).unwrap().output.is_some());
    }

    #[test]
    fn test_empty_container_converts_nothing() {
        let mut conversor = ImageConversor::new();
        assert_eq!(conversor.convert_all(), ConversionSummary::default());
        assert!(!conversor.is_converting());
    }

    #[test]
    fn test_output_equal_to_input_is_reselected() {
        let mut conversor = ImageConversor::new();
        conversor.set_input_format(ImageFormat::Png);
        assert_eq!(conversor.params().output_format, ImageFormat::Jpeg);

        conversor.set_output_format(ImageFormat::Png);
        assert_eq!(conversor.params().output_format, ImageFormat::Jpeg);

        conversor.set_output_format(ImageFormat::Svg);
        assert_eq!(conversor.params().output_format, ImageFormat::Jpeg);

        conversor.set_input_format(ImageFormat::Jpeg);
        assert_eq!(conversor.params().output_format, ImageFormat::Png);
        assert!(!conversor.output_choices().contains(&ImageFormat::Jpeg));
    }

    #[test]
    fn test_mode_switch_clears_items() {
        let mut conversor = ImageConversor::new();
        conversor.add_item(png(2, 2), "a.png");
        conversor.set_input_mode(InputMode::Url);
        assert!(conversor.items().is_empty());
        assert_eq!(conversor.params().input_mode, InputMode::Url);
    }

    #[test]
    fn test_size_is_at_least_one() {
        let mut conversor = ImageConversor::new();
        conversor.set_size(0, 0);
        assert_eq!((conversor.params().width, conversor.params().height), (1, 1));
    }

    #[tokio::test]
    async fn test_run_async() {
        let mut conversor = ImageConversor::new();
        let id = conversor.add_item(png(2, 2), "a.png");
        let batch = conversor.begin_conversion().unwrap();
        let outcomes = batch.run_async().await;
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].id, id);
        assert!(outcomes[0].result.is_ok());
    }
}
