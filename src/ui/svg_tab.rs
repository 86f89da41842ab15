/// SVG color editor tab
///
/// Left column: the live preview and the element list.
/// Right column: color picker, swatches, history, batch toggle and export.
use iced::widget::{
    button, checkbox, column, container, horizontal_rule, pick_list, row, scrollable, svg, text,
    text_input, Column, Row, Space,
};
use iced::{Alignment, Background, Border, Color, Element, Length, Theme};
use iced_aw::Wrap;

use super::preview::LivePreview;
use crate::export::svg::{ExportSize, SvgExportFormat};
use crate::state::data::{EditMode, ElementRecord};
use crate::state::editor::SvgEditor;
use crate::svg::paint::{parse_hex, COMMON_COLORS, DEFAULT_PICKER_COLOR, TRANSPARENT};
use crate::Message;

const SWATCH_SIZE: f32 = 22.0;

/// View state of the editor tab that is not part of the editor itself
#[derive(Debug, Clone)]
pub struct SvgTabState {
    /// Text of the color picker; may hold a partial value while typing
    pub picker: String,
    /// Latest history received from the broadcast
    pub history: Vec<String>,
    pub export_format: SvgExportFormat,
    pub export_scale: u32,
    pub custom_width: String,
    pub custom_height: String,
    pub exporting: bool,
}

impl Default for SvgTabState {
    fn default() -> Self {
        Self {
            picker: DEFAULT_PICKER_COLOR.to_string(),
            history: Vec::new(),
            export_format: SvgExportFormat::default(),
            export_scale: 1,
            custom_width: String::new(),
            custom_height: String::new(),
            exporting: false,
        }
    }
}

impl SvgTabState {
    /// Point the picker at the selected element's color
    pub fn follow_selection(&mut self, editor: &SvgEditor) {
        self.picker = editor
            .selected_color()
            .unwrap_or(DEFAULT_PICKER_COLOR)
            .to_string();
    }

    /// Explicit size when both custom fields hold a positive number, else the scale
    pub fn export_size(&self) -> ExportSize {
        let width = self.custom_width.trim().parse::<u32>().ok().filter(|w| *w > 0);
        let height = self.custom_height.trim().parse::<u32>().ok().filter(|h| *h > 0);
        match (width, height) {
            (Some(w), Some(h)) => ExportSize::Exact(w, h),
            _ => ExportSize::Scale(self.export_scale),
        }
    }
}

pub fn view<'a>(
    editor: &'a SvgEditor,
    preview: &LivePreview,
    state: &'a SvgTabState,
) -> Element<'a, Message> {
    let open = button("Open SVG").on_press(Message::PickSvg).padding(8);

    if !editor.is_loaded() {
        return container(
            column![
                text("Open an SVG file or drop one onto the window").size(16),
                open,
            ]
            .spacing(16)
            .align_x(Alignment::Center),
        )
        .center_x(Length::Fill)
        .center_y(Length::Fill)
        .into();
    }

    // ========== Left: preview and elements ==========
    let preview_view: Element<Message> = match preview.handle() {
        Some(handle) => svg(handle.clone())
            .width(Length::Fill)
            .height(320)
            .into(),
        None => text("Preview unavailable").into(),
    };

    let mode = editor.edit_mode();
    let modes = row![
        mode_button("Fill", EditMode::Fill, mode),
        mode_button("Stroke", EditMode::Stroke, mode),
    ]
    .spacing(6);

    let selected_id = editor.selected().map(|e| e.id.as_str());
    let elements = Column::with_children(
        editor
            .elements()
            .iter()
            .map(|element| element_row(element, mode, selected_id == Some(element.id.as_str()))),
    )
    .spacing(2);

    let left = column![
        open,
        container(preview_view).padding(8).style(container::rounded_box),
        modes,
        text(format!("{} elements", editor.elements().len())).size(13),
        scrollable(elements).height(Length::Fill),
    ]
    .spacing(10)
    .width(Length::FillPortion(3));

    // ========== Right: colors ==========
    let picker = row![
        swatch_box(Some(&state.picker)),
        text_input("#rrggbb", &state.picker)
            .on_input(Message::PickerChanged)
            .width(120),
        button(text("Transparent").size(12))
            .on_press(Message::SwatchPicked(TRANSPARENT.to_string()))
            .style(button::secondary),
    ]
    .spacing(8)
    .align_y(Alignment::Center);

    let common = swatch_grid(COMMON_COLORS.iter().map(|c| c.to_string()));

    let history: Element<Message> = if state.history.is_empty() {
        text("No recent colors").size(12).into()
    } else {
        swatch_grid(state.history.iter().cloned())
    };

    let similar = editor.similar_to_selected().len();
    let batch = column![
        text(format!("{} other element(s) share this {}", similar, mode.attribute())).size(13),
        checkbox("Apply to all similar", editor.apply_to_all()).on_toggle(Message::ApplyToAllToggled),
    ]
    .spacing(6);

    // ========== Right: export ==========
    let scales = Row::with_children(ExportSize::SCALES.iter().map(|scale| {
        let scale = *scale;
        button(text(format!("{}×", scale)).size(12))
            .on_press(Message::ExportScalePicked(scale))
            .style(if scale == state.export_scale {
                button::primary as fn(&Theme, button::Status) -> button::Style
            } else {
                button::secondary
            })
            .into()
    }))
    .spacing(6);

    let export = column![
        row![
            pick_list(
                SvgExportFormat::ALL,
                Some(state.export_format),
                Message::ExportFormatSelected
            ),
            scales,
        ]
        .spacing(8)
        .align_y(Alignment::Center),
        row![
            text_input("width", &state.custom_width)
                .on_input(Message::ExportWidthChanged)
                .width(80),
            text_input("height", &state.custom_height)
                .on_input(Message::ExportHeightChanged)
                .width(80),
        ]
        .spacing(8),
        button(if state.exporting { "Exporting..." } else { "Export" })
            .on_press_maybe((!state.exporting).then_some(Message::ExportSvg))
            .padding(8),
    ]
    .spacing(8);

    let right = column![
        text("Color").size(16),
        picker,
        common,
        text("Recent").size(14),
        history,
        batch,
        button("Reset All")
            .on_press(Message::ResetAll)
            .style(button::danger)
            .padding(8),
        horizontal_rule(1),
        text("Export").size(16),
        export,
    ]
    .spacing(10)
    .width(Length::FillPortion(2));

    row![left, right].spacing(20).padding(16).into()
}

fn mode_button(label: &str, mode: EditMode, current: EditMode) -> Element<'_, Message> {
    button(text(label))
        .on_press(Message::EditModeChanged(mode))
        .style(if mode == current {
            button::primary as fn(&Theme, button::Status) -> button::Style
        } else {
            button::secondary
        })
        .into()
}

fn element_row(element: &ElementRecord, mode: EditMode, selected: bool) -> Element<'_, Message> {
    let color = element.color(mode);
    let label = row![
        swatch_box(color),
        text(format!("<{}> {}", element.tag, element.id)).size(13),
        Space::with_width(Length::Fill),
        text(color.unwrap_or("(none)")).size(12),
    ]
    .spacing(8)
    .align_y(Alignment::Center);

    button(label)
        .on_press(Message::SelectElement(element.id.clone()))
        .width(Length::Fill)
        .style(if selected {
            button::primary as fn(&Theme, button::Status) -> button::Style
        } else {
            button::text
        })
        .into()
}

fn swatch_grid<'a>(colors: impl Iterator<Item = String>) -> Element<'a, Message> {
    Wrap::with_elements(
        colors
            .map(|color| {
                button(swatch_box(Some(&color)))
                    .on_press(Message::SwatchPicked(color))
                    .padding(2)
                    .style(button::text)
                    .into()
            })
            .collect(),
    )
    .spacing(4.0)
    .line_spacing(4.0)
    .into()
}

/// A small filled square; checkered grey for values that are not hex colors
fn swatch_box<'a>(color: Option<&str>) -> Element<'a, Message> {
    let fill = color.and_then(parse_hex).map(|[r, g, b]| Color::from_rgb8(r, g, b));

    container(Space::new(SWATCH_SIZE, SWATCH_SIZE))
        .style(move |_theme: &Theme| container::Style {
            background: Some(Background::Color(
                fill.unwrap_or(Color::from_rgba(0.5, 0.5, 0.5, 0.3)),
            )),
            border: Border {
                color: Color::from_rgb(0.4, 0.4, 0.4),
                width: 1.0,
                radius: 3.0.into(),
            },
            ..container::Style::default()
        })
        .into()
}
