/// Image converter tab
///
/// Parameters on top, acquisition controls below, then the work items as a
/// wrapping grid of thumbnails with their converted counterparts.
use iced::widget::{
    button, checkbox, column, container, horizontal_rule, image, pick_list, row, scrollable, svg,
    text, text_input, Row, Space,
};
use iced::{Alignment, Element, Length, Theme};
use iced_aw::Wrap;
use std::collections::{BTreeSet, HashMap};

use crate::convert::format::ImageFormat;
use crate::state::conversor::ImageConversor;
use crate::state::data::{ImageItem, InputMode, ItemId, Payload};
use crate::state::edit::SIZE_PRESETS;
use crate::Message;

const THUMBNAIL_SIZE: f32 = 140.0;

/// A render handle for one payload
#[derive(Debug, Clone)]
pub enum Thumbnail {
    Raster(image::Handle),
    Vector(svg::Handle),
}

impl Thumbnail {
    pub fn from_payload(payload: &Payload) -> Self {
        if payload.format().is_some_and(ImageFormat::is_vector) {
            Thumbnail::Vector(svg::Handle::from_memory(payload.bytes.clone()))
        } else {
            Thumbnail::Raster(image::Handle::from_bytes(payload.bytes.clone()))
        }
    }

    fn view(&self) -> Element<'_, Message> {
        match self {
            Thumbnail::Raster(handle) => image(handle.clone())
                .width(THUMBNAIL_SIZE)
                .height(THUMBNAIL_SIZE)
                .into(),
            Thumbnail::Vector(handle) => svg(handle.clone())
                .width(THUMBNAIL_SIZE)
                .height(THUMBNAIL_SIZE)
                .into(),
        }
    }
}

#[derive(Debug, Clone)]
struct ItemThumbnails {
    input: Thumbnail,
    output: Option<Thumbnail>,
}

/// Render handles per work item, built once instead of on every frame
#[derive(Debug, Default)]
pub struct ThumbnailCache {
    entries: HashMap<ItemId, ItemThumbnails>,
}

impl ThumbnailCache {
    /// Add handles for new items and forget removed ones
    pub fn sync(&mut self, items: &[ImageItem]) {
        self.entries.retain(|id, _| items.iter().any(|item| item.id == *id));
        for item in items {
            self.entries.entry(item.id).or_insert_with(|| ItemThumbnails {
                input: Thumbnail::from_payload(&item.input),
                output: item.output.as_ref().map(Thumbnail::from_payload),
            });
        }
    }

    /// Rebuild the output handles after a batch
    pub fn refresh_outputs(&mut self, items: &[ImageItem]) {
        self.sync(items);
        for item in items {
            if let Some(entry) = self.entries.get_mut(&item.id) {
                entry.output = item.output.as_ref().map(Thumbnail::from_payload);
            }
        }
    }
}

/// View state of the tab that is not part of the conversion container
#[derive(Debug, Default)]
pub struct ImageTabState {
    pub url_input: String,
    pub width_input: String,
    pub height_input: String,
    pub fetching: bool,
    pub zipping: bool,
    /// Items ticked for the bulk download
    pub selection: BTreeSet<ItemId>,
    pub thumbnails: ThumbnailCache,
}

impl ImageTabState {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width_input: width.to_string(),
            height_input: height.to_string(),
            ..Self::default()
        }
    }

    /// Drop selections of items that no longer exist or lost their output
    pub fn prune_selection(&mut self, items: &[ImageItem]) {
        self.selection.retain(|id| {
            items
                .iter()
                .any(|item| item.id == *id && item.output.is_some())
        });
    }

    pub fn selected_ids(&self) -> Vec<ItemId> {
        self.selection.iter().copied().collect()
    }
}

pub fn view<'a>(conversor: &'a ImageConversor, state: &'a ImageTabState) -> Element<'a, Message> {
    let params = conversor.params();

    // ========== Parameters ==========
    let formats = row![
        text("From").size(14),
        pick_list(
            ImageFormat::INPUTS,
            Some(params.input_format),
            Message::InputFormatSelected
        ),
        text("To").size(14),
        pick_list(
            conversor.output_choices(),
            Some(params.output_format),
            Message::OutputFormatSelected
        ),
    ]
    .spacing(10)
    .align_y(Alignment::Center);

    let size = row![
        text("Width").size(14),
        text_input("500", &state.width_input)
            .on_input(Message::WidthChanged)
            .width(80),
        text("Height").size(14),
        text_input("500", &state.height_input)
            .on_input(Message::HeightChanged)
            .width(80),
    ]
    .spacing(10)
    .align_y(Alignment::Center);

    let presets = Row::with_children(SIZE_PRESETS.iter().map(|(w, h, label)| {
        button(text(*label).size(12))
            .on_press(Message::PresetPicked(*w, *h))
            .style(button::secondary)
            .into()
    }))
    .spacing(6);

    // ========== Acquisition ==========
    let mode_toggle = row![
        mode_button("Files", InputMode::File, params.input_mode),
        mode_button("URL", InputMode::Url, params.input_mode),
    ]
    .spacing(6);

    let acquisition: Element<Message> = match params.input_mode {
        InputMode::File => row![
            button("Choose Files").on_press(Message::PickFiles).padding(8),
            button("Import Folder").on_press(Message::ImportFolder).padding(8),
            text("or drop files onto the window").size(13),
        ]
        .spacing(10)
        .align_y(Alignment::Center)
        .into(),
        InputMode::Url => {
            let fetch = button(if state.fetching { "Fetching..." } else { "Fetch" })
                .on_press_maybe((!state.fetching && !state.url_input.trim().is_empty()).then_some(Message::FetchUrl))
                .padding(8);
            row![
                text_input("https://example.com/image.svg or data: URI", &state.url_input)
                    .on_input(Message::UrlChanged)
                    .on_submit(Message::FetchUrl)
                    .width(Length::Fill),
                fetch,
            ]
            .spacing(10)
            .align_y(Alignment::Center)
            .into()
        }
    };

    // ========== Actions ==========
    let converting = conversor.is_converting();
    let has_items = !conversor.items().is_empty();
    let converted_count = conversor
        .items()
        .iter()
        .filter(|item| item.output.is_some())
        .count();

    let actions = row![
        button(if converting { "Converting..." } else { "Convert All" })
            .on_press_maybe((has_items && !converting).then_some(Message::Convert))
            .padding(8),
        button("Select Converted")
            .on_press_maybe((converted_count > 0).then_some(Message::SelectAllConverted))
            .style(button::secondary)
            .padding(8),
        button(text(if state.zipping {
            "Zipping...".to_string()
        } else {
            format!("Download Selected ({})", state.selection.len())
        }))
        .on_press_maybe((!state.zipping && !state.selection.is_empty()).then_some(Message::DownloadSelected))
        .padding(8),
        button("Clear All")
            .on_press_maybe(has_items.then_some(Message::ClearAll))
            .style(button::danger)
            .padding(8),
    ]
    .spacing(10);

    // ========== Work items ==========
    let grid: Element<Message> = if has_items {
        Wrap::with_elements(
            conversor
                .items()
                .iter()
                .map(|item| item_card(item, state))
                .collect(),
        )
        .spacing(12.0)
        .line_spacing(12.0)
        .into()
    } else {
        container(text("No images yet").size(16))
            .padding(40)
            .center_x(Length::Fill)
            .into()
    };

    column![
        formats,
        size,
        presets,
        horizontal_rule(1),
        mode_toggle,
        acquisition,
        actions,
        scrollable(grid).height(Length::Fill),
    ]
    .spacing(12)
    .padding(16)
    .into()
}

fn mode_button(label: &str, mode: InputMode, current: InputMode) -> Element<'_, Message> {
    button(text(label))
        .on_press(Message::InputModeChanged(mode))
        .style(if mode == current {
            button::primary as fn(&Theme, button::Status) -> button::Style
        } else {
            button::secondary
        })
        .into()
}

fn item_card<'a>(item: &'a ImageItem, state: &'a ImageTabState) -> Element<'a, Message> {
    let thumbnails = state.thumbnails.entries.get(&item.id);

    let input: Element<Message> = match thumbnails {
        Some(entry) => entry.input.view(),
        None => Space::new(THUMBNAIL_SIZE, THUMBNAIL_SIZE).into(),
    };

    let output: Element<Message> = match thumbnails.and_then(|entry| entry.output.as_ref()) {
        Some(thumbnail) => thumbnail.view(),
        None => container(text("Not converted").size(12))
            .width(THUMBNAIL_SIZE)
            .height(THUMBNAIL_SIZE)
            .center_x(THUMBNAIL_SIZE)
            .center_y(THUMBNAIL_SIZE)
            .into(),
    };

    let name = if item.file_name.is_empty() {
        "(unnamed)"
    } else {
        item.file_name.as_str()
    };

    let mut controls = row![].spacing(6).align_y(Alignment::Center);
    if item.output.is_some() {
        let id = item.id;
        controls = controls
            .push(checkbox("", state.selection.contains(&id)).on_toggle(move |on| Message::ToggleSelected(id, on)))
            .push(button(text("Download").size(12)).on_press(Message::DownloadItem(id)));
    }
    controls = controls.push(
        button(text("Remove").size(12))
            .on_press(Message::RemoveItem(item.id))
            .style(button::danger),
    );

    container(
        column![
            row![input, output].spacing(6),
            text(name).size(12),
            text(format!("{} · {} KB", item.input.mime, item.input.bytes.len() / 1024)).size(11),
            controls,
        ]
        .spacing(6),
    )
    .padding(8)
    .style(container::rounded_box)
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: ItemId, output: bool) -> ImageItem {
        ImageItem {
            id,
            input: Payload::new("image/png", vec![1, 2, 3]),
            output: output.then(|| Payload::new("image/webp", vec![4])),
            file_name: format!("{}.png", id),
        }
    }

    #[test]
    fn test_thumbnail_cache_follows_items() {
        let mut cache = ThumbnailCache::default();
        cache.sync(&[item(1, false), item(2, false)]);
        assert_eq!(cache.entries.len(), 2);

        cache.sync(&[item(2, false)]);
        assert!(cache.entries.contains_key(&2));
        assert!(!cache.entries.contains_key(&1));

        cache.refresh_outputs(&[item(2, true)]);
        assert!(cache.entries[&2].output.is_some());
    }

    #[test]
    fn test_svg_payload_gets_vector_thumbnail() {
        let payload = Payload::new("image/svg+xml", b"<svg/>".to_vec());
        assert!(matches!(Thumbnail::from_payload(&payload), Thumbnail::Vector(_)));
    }

    #[test]
    fn test_prune_selection() {
        let mut state = ImageTabState::new(10, 20);
        assert_eq!(state.width_input, "10");
        state.selection.extend([1, 2, 3]);

        state.prune_selection(&[item(1, true), item(2, false)]);
        assert_eq!(state.selected_ids(), vec![1]);
    }
}
