use chrono::Utc;
use iced::futures::stream::{self, Stream};
use iced::widget::{button, column, container, horizontal_rule, row, text};
use iced::{event, window, Element, Length, Size, Subscription, Task, Theme};
use log::{error, info, warn};
use rfd::FileDialog;
use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;
use tokio::sync::broadcast;

mod acquire;
mod config;
mod convert;
mod export;
mod state;
mod svg;
mod ui;

use acquire::{Acquired, FolderImport};
use config::AppConfig;
use convert::format::ImageFormat;
use export::svg::{SvgExport, SvgExportFormat};
use state::conversor::{ConversionOutcome, ImageConversor};
use state::data::{EditMode, InputMode, ItemId};
use state::editor::SvgEditor;
use state::history::{ColorHistory, Debounce, HistoryBroadcast, HISTORY_DEBOUNCE};
use state::library::Library;
use ui::chrome::WindowControl;
use ui::image_tab::ImageTabState;
use ui::preview::LivePreview;
use ui::svg_tab::SvgTabState;
use ui::Tab;

const TITLE: &str = "Conversor";

/// Main application state
struct Conversor {
    config: AppConfig,
    /// Settings database; None when neither the file nor a fallback could be opened
    library: Option<Library>,
    tab: Tab,

    // Image converter
    conversor: ImageConversor,
    image_tab: ImageTabState,

    // SVG editor
    editor: SvgEditor,
    preview: Rc<RefCell<LivePreview>>,
    svg_tab: SvgTabState,
    history: ColorHistory,
    history_feed: HistoryBroadcast,
    debounce: Debounce,
    /// Color waiting for the debounce to settle before it enters the history
    pending_color: Option<String>,

    /// Status message to display to the user
    status: String,
}

/// Application messages (events)
#[derive(Debug, Clone)]
pub enum Message {
    TabSelected(Tab),
    Window(WindowControl),
    FileDropped(PathBuf),

    // ========== Image converter ==========
    InputFormatSelected(ImageFormat),
    OutputFormatSelected(ImageFormat),
    WidthChanged(String),
    HeightChanged(String),
    PresetPicked(u32, u32),
    InputModeChanged(InputMode),
    UrlChanged(String),
    FetchUrl,
    UrlFetched(Result<Acquired, String>),
    PickFiles,
    ImportFolder,
    FilesLoaded(Vec<Acquired>),
    FolderImported(FolderImport),
    RemoveItem(ItemId),
    ClearAll,
    Convert,
    ConversionFinished(Vec<ConversionOutcome>),
    ToggleSelected(ItemId, bool),
    SelectAllConverted,
    DownloadItem(ItemId),
    DownloadSelected,
    ArchiveBuilt(Result<Vec<u8>, String>),

    // ========== SVG editor ==========
    PickSvg,
    SvgLoaded(Result<String, String>),
    SelectElement(String),
    EditModeChanged(EditMode),
    PickerChanged(String),
    SwatchPicked(String),
    ApplyToAllToggled(bool),
    ResetAll,
    FlushHistory(u64),
    HistoryChanged(Vec<String>),
    ExportFormatSelected(SvgExportFormat),
    ExportScalePicked(u32),
    ExportWidthChanged(String),
    ExportHeightChanged(String),
    ExportSvg,
    SvgExported(Result<SvgExport, String>),
}

impl Conversor {
    /// Create a new instance of the application
    fn new() -> (Self, Task<Message>) {
        let config = AppConfig::from_env();
        info!("🎨 {} starting, relay at {}", TITLE, config.backend_endpoint);

        // The app works without persistence; fall back to a throwaway store
        let library = match Library::open(&config.db_path()) {
            Ok(library) => Some(library),
            Err(e) => {
                error!("❌ Failed to open settings database: {}", e);
                Library::open_in_memory()
                    .map_err(|e| error!("❌ In-memory settings unavailable: {}", e))
                    .ok()
            }
        };

        if let Some(path) = library.as_ref().and_then(Library::path) {
            info!("📚 Settings database at {}", path.display());
        }

        let params = library
            .as_ref()
            .map(|l| {
                l.load_params().unwrap_or_else(|e| {
                    warn!("⚠️  Ignoring stored parameters: {}", e);
                    Default::default()
                })
            })
            .unwrap_or_default();
        let history = library
            .as_ref()
            .map(|l| {
                l.load_history().unwrap_or_else(|e| {
                    warn!("⚠️  Ignoring stored color history: {}", e);
                    ColorHistory::new()
                })
            })
            .unwrap_or_default();

        let preview = Rc::new(RefCell::new(LivePreview::default()));
        let mut editor = SvgEditor::new();
        editor.attach_preview(Box::new(preview.clone()));

        let svg_tab = SvgTabState {
            history: history.colors().to_vec(),
            ..SvgTabState::default()
        };

        (
            Conversor {
                config,
                library,
                tab: Tab::default(),
                image_tab: ImageTabState::new(params.width, params.height),
                conversor: ImageConversor::with_params(params),
                editor,
                preview,
                svg_tab,
                history,
                history_feed: HistoryBroadcast::new(),
                debounce: Debounce::default(),
                pending_color: None,
                status: "Ready.".to_string(),
            },
            Task::none(),
        )
    }

    /// Handle application messages and update state
    fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::TabSelected(tab) => {
                self.tab = tab;
                Task::none()
            }
            Message::Window(control) => control.task(),
            Message::FileDropped(path) => self.file_dropped(path),

            // ========== Image converter ==========
            Message::InputFormatSelected(format) => {
                self.conversor.set_input_format(format);
                self.persist_params();
                Task::none()
            }
            Message::OutputFormatSelected(format) => {
                self.conversor.set_output_format(format);
                self.persist_params();
                Task::none()
            }
            Message::WidthChanged(value) => {
                if let Ok(width) = value.trim().parse::<u32>() {
                    self.conversor.set_width(width);
                    self.persist_params();
                }
                self.image_tab.width_input = value;
                Task::none()
            }
            Message::HeightChanged(value) => {
                if let Ok(height) = value.trim().parse::<u32>() {
                    self.conversor.set_height(height);
                    self.persist_params();
                }
                self.image_tab.height_input = value;
                Task::none()
            }
            Message::PresetPicked(width, height) => {
                self.conversor.set_size(width, height);
                self.image_tab.width_input = width.to_string();
                self.image_tab.height_input = height.to_string();
                self.persist_params();
                Task::none()
            }
            Message::InputModeChanged(mode) => {
                self.conversor.set_input_mode(mode);
                self.items_changed();
                self.persist_params();
                Task::none()
            }
            Message::UrlChanged(value) => {
                self.image_tab.url_input = value;
                Task::none()
            }
            Message::FetchUrl => {
                let target = self.image_tab.url_input.trim().to_string();
                if target.is_empty() || self.image_tab.fetching {
                    return Task::none();
                }
                self.image_tab.fetching = true;
                self.status = format!("Fetching {}...", target);

                let input_format = self.conversor.params().input_format;
                let endpoint = self.config.backend_endpoint.clone();
                Task::perform(
                    async move {
                        acquire::fetch_url(&target, input_format, &endpoint)
                            .await
                            .map_err(|e| e.to_string())
                    },
                    Message::UrlFetched,
                )
            }
            Message::UrlFetched(result) => {
                self.image_tab.fetching = false;
                match result {
                    Ok(acquired) => {
                        self.add_acquired(vec![acquired]);
                        self.image_tab.url_input.clear();
                    }
                    Err(e) => {
                        warn!("⚠️  Fetch failed: {}", e);
                        self.status = format!("❌ Fetch failed: {}", e);
                    }
                }
                Task::none()
            }
            Message::PickFiles => {
                let input_format = self.conversor.params().input_format;
                let all: Vec<&str> = ImageFormat::INPUTS.iter().map(|f| f.extension()).collect();
                let files = FileDialog::new()
                    .set_title("Select Images")
                    .add_filter(input_format.to_string(), &[input_format.extension()])
                    .add_filter("All supported images", &all[..])
                    .pick_files();

                match files {
                    Some(paths) if !paths.is_empty() => {
                        self.status = format!("Reading {} file(s)...", paths.len());
                        Task::perform(acquire::read_files(paths), Message::FilesLoaded)
                    }
                    _ => Task::none(),
                }
            }
            Message::ImportFolder => {
                // Show the native folder picker dialog
                let folder = FileDialog::new()
                    .set_title("Select Folder with Images")
                    .pick_folder();

                if let Some(folder_path) = folder {
                    self.status = format!("Importing from {}...", folder_path.display());
                    return Task::perform(acquire::import_folder(folder_path), Message::FolderImported);
                }

                Task::none()
            }
            Message::FilesLoaded(files) => {
                self.add_acquired(files);
                Task::none()
            }
            Message::FolderImported(import) => {
                let added = import.files.len();
                self.add_acquired(import.files);
                self.status = format!(
                    "✅ Import complete! Added {} images, skipped {}.",
                    added, import.skipped_count
                );
                Task::none()
            }
            Message::RemoveItem(id) => {
                self.conversor.remove_item(id);
                self.items_changed();
                Task::none()
            }
            Message::ClearAll => {
                self.conversor.clear_all();
                self.items_changed();
                self.status = "Cleared.".to_string();
                Task::none()
            }
            Message::Convert => match self.conversor.begin_conversion() {
                Some(batch) => {
                    self.status = match batch.skipped() {
                        0 => format!("Converting {} image(s)...", batch.len()),
                        skipped => format!(
                            "Converting {} image(s), skipping {} without input...",
                            batch.len(),
                            skipped
                        ),
                    };
                    Task::perform(batch.run_async(), Message::ConversionFinished)
                }
                None => Task::none(),
            },
            Message::ConversionFinished(outcomes) => {
                let summary = self.conversor.finish_conversion(outcomes);
                self.image_tab.thumbnails.refresh_outputs(self.conversor.items());
                self.image_tab.prune_selection(self.conversor.items());
                self.status = if summary.failed > 0 {
                    format!(
                        "Converted {} image(s), {} failed.",
                        summary.converted, summary.failed
                    )
                } else {
                    format!("✅ Converted {} image(s).", summary.converted)
                };
                Task::none()
            }
            Message::ToggleSelected(id, selected) => {
                if selected {
                    self.image_tab.selection.insert(id);
                } else {
                    self.image_tab.selection.remove(&id);
                }
                Task::none()
            }
            Message::SelectAllConverted => {
                let converted = self
                    .conversor
                    .items()
                    .iter()
                    .filter(|item| item.output.is_some())
                    .map(|item| item.id);
                self.image_tab.selection.extend(converted);
                Task::none()
            }
            Message::DownloadItem(id) => {
                let Some((file_name, bytes)) = self.conversor.item(id).and_then(|item| {
                    let output = item.output.as_ref()?;
                    let extension = output
                        .format()
                        .unwrap_or(self.conversor.params().output_format)
                        .extension();
                    Some((
                        export::naming::output_file_name(&item.file_name, extension, Utc::now()),
                        output.bytes.clone(),
                    ))
                }) else {
                    return Task::none();
                };
                self.save(&file_name, &bytes);
                Task::none()
            }
            Message::DownloadSelected => {
                if self.image_tab.zipping {
                    return Task::none();
                }
                let entries = export::archive::entries_for(
                    self.conversor.items(),
                    &self.image_tab.selected_ids(),
                    Utc::now(),
                );
                if entries.is_empty() {
                    return Task::none();
                }

                self.image_tab.zipping = true;
                self.status = format!("Zipping {} file(s)...", entries.len());
                Task::perform(
                    export::archive::build_archive_async(entries),
                    Message::ArchiveBuilt,
                )
            }
            Message::ArchiveBuilt(result) => {
                self.image_tab.zipping = false;
                match result {
                    Ok(bytes) => {
                        let file_name = export::naming::archive_file_name(Utc::now());
                        self.save(&file_name, &bytes);
                    }
                    Err(e) => {
                        error!("❌ Archive failed: {}", e);
                        self.status = format!("❌ Archive failed: {}", e);
                        rfd::MessageDialog::new()
                            .set_level(rfd::MessageLevel::Error)
                            .set_title("Download failed")
                            .set_description(format!("Could not build the archive: {}", e))
                            .set_buttons(rfd::MessageButtons::Ok)
                            .show();
                    }
                }
                Task::none()
            }

            // ========== SVG editor ==========
            Message::PickSvg => {
                let file = FileDialog::new()
                    .set_title("Open SVG")
                    .add_filter("SVG", &["svg"])
                    .pick_file();
                match file {
                    Some(path) => read_svg(path),
                    None => Task::none(),
                }
            }
            Message::SvgLoaded(Ok(markup)) => {
                self.load_svg(&markup);
                Task::none()
            }
            Message::SvgLoaded(Err(e)) => {
                warn!("⚠️  {}", e);
                self.status = format!("❌ {}", e);
                Task::none()
            }
            Message::SelectElement(id) => {
                if self.editor.select(&id) {
                    self.follow_selection();
                    if self.history.record(self.editor.selected_color()) {
                        self.persist_history();
                    }
                }
                Task::none()
            }
            Message::EditModeChanged(mode) => {
                self.editor.set_edit_mode(mode);
                self.follow_selection();
                self.note_document_colors();
                Task::none()
            }
            Message::PickerChanged(value) => {
                let valid = svg::paint::parse_hex(value.trim()).is_some();
                let color = value.trim().to_string();
                self.svg_tab.picker = value;
                if valid {
                    return self.apply_color(color);
                }
                Task::none()
            }
            Message::SwatchPicked(color) => {
                self.svg_tab.picker = color.clone();
                self.apply_color(color)
            }
            Message::ApplyToAllToggled(enabled) => {
                self.editor.set_apply_to_all(enabled);
                self.refresh_preview();
                Task::none()
            }
            Message::ResetAll => {
                self.editor.reset_all();
                self.refresh_preview();
                self.svg_tab.follow_selection(&self.editor);
                self.status = "Colors reset.".to_string();
                Task::none()
            }
            Message::FlushHistory(token) => {
                if !self.debounce.is_current(token) {
                    return Task::none();
                }
                if let Some(color) = self.pending_color.take() {
                    if self.history.record(Some(&color)) {
                        self.persist_history();
                    }
                }
                Task::none()
            }
            Message::HistoryChanged(colors) => {
                self.svg_tab.history = colors;
                Task::none()
            }
            Message::ExportFormatSelected(format) => {
                self.svg_tab.export_format = format;
                Task::none()
            }
            Message::ExportScalePicked(scale) => {
                self.svg_tab.export_scale = scale;
                self.svg_tab.custom_width.clear();
                self.svg_tab.custom_height.clear();
                Task::none()
            }
            Message::ExportWidthChanged(value) => {
                self.svg_tab.custom_width = value;
                Task::none()
            }
            Message::ExportHeightChanged(value) => {
                self.svg_tab.custom_height = value;
                Task::none()
            }
            Message::ExportSvg => {
                if self.svg_tab.exporting {
                    return Task::none();
                }
                let markup = match self.editor.export_markup() {
                    Some(Ok(markup)) => markup,
                    Some(Err(e)) => {
                        error!("❌ Export failed: {}", e);
                        self.status = format!("❌ Export failed: {}", e);
                        return Task::none();
                    }
                    None => return Task::none(),
                };

                self.svg_tab.exporting = true;
                Task::perform(
                    export::svg::export_svg_async(
                        markup,
                        self.svg_tab.export_format,
                        self.svg_tab.export_size(),
                    ),
                    Message::SvgExported,
                )
            }
            Message::SvgExported(result) => {
                self.svg_tab.exporting = false;
                match result {
                    Ok(export) => self.save(&export.file_name, &export.bytes),
                    Err(e) => {
                        error!("❌ Export failed: {}", e);
                        self.status = format!("❌ Export failed: {}", e);
                    }
                }
                Task::none()
            }
        }
    }

    /// Build the user interface
    fn view(&self) -> Element<Message> {
        let tabs = row![
            tab_button("Image Converter", Tab::Images, self.tab),
            tab_button("SVG Color Editor", Tab::Svg, self.tab),
        ]
        .spacing(6)
        .padding([0, 12]);

        let body = match self.tab {
            Tab::Images => ui::image_tab::view(&self.conversor, &self.image_tab),
            Tab::Svg => ui::svg_tab::view(&self.editor, &self.preview.borrow(), &self.svg_tab),
        };

        let content = column![
            ui::chrome::header(TITLE),
            tabs,
            horizontal_rule(1),
            container(body).height(Length::Fill),
            horizontal_rule(1),
            container(text(&self.status).size(14)).padding([4, 12]),
        ];

        container(content)
            .width(Length::Fill)
            .height(Length::Fill)
            .into()
    }

    fn subscription(&self) -> Subscription<Message> {
        let drops = event::listen_with(|event, _status, _window| match event {
            iced::Event::Window(window::Event::FileDropped(path)) => Some(Message::FileDropped(path)),
            _ => None,
        });

        let history = Subscription::run_with_id(
            "color-history",
            history_updates(self.history_feed.subscribe()),
        );

        Subscription::batch([drops, history])
    }

    /// Set the application theme
    fn theme(&self) -> Theme {
        Theme::Dark
    }

    // ========== Helpers ==========

    fn file_dropped(&mut self, path: PathBuf) -> Task<Message> {
        match self.tab {
            Tab::Svg => read_svg(path),
            Tab::Images if self.conversor.params().input_mode == InputMode::File => {
                if path.is_dir() {
                    self.status = format!("Importing from {}...", path.display());
                    Task::perform(acquire::import_folder(path), Message::FolderImported)
                } else {
                    Task::perform(acquire::read_files(vec![path]), Message::FilesLoaded)
                }
            }
            Tab::Images => {
                info!("Ignoring dropped file while in URL mode: {}", path.display());
                Task::none()
            }
        }
    }

    fn add_acquired(&mut self, files: Vec<Acquired>) {
        let count = files.len();
        for acquired in files {
            self.conversor.add_item(acquired.payload, acquired.file_name);
        }
        self.items_changed();
        if count > 0 {
            self.status = format!("Added {} image(s).", count);
        }
    }

    fn items_changed(&mut self) {
        self.image_tab.thumbnails.sync(self.conversor.items());
        self.image_tab.prune_selection(self.conversor.items());
    }

    fn load_svg(&mut self, markup: &str) {
        match self.editor.load(markup) {
            Ok(count) => {
                if let Some(normalized) = self.editor.markup() {
                    self.preview.borrow_mut().reload(normalized);
                }
                self.follow_selection();
                self.note_document_colors();

                self.status = format!("Loaded SVG with {} elements.", count);
            }
            Err(e) => {
                warn!("⚠️  Could not load SVG: {}", e);
                self.status = format!("❌ Could not load SVG: {}", e);
            }
        }
    }

    /// Recolor the selection and schedule the history write
    fn apply_color(&mut self, color: String) -> Task<Message> {
        if self.editor.recolor_selected(&color) == 0 {
            return Task::none();
        }
        self.refresh_preview();

        self.pending_color = Some(color);
        let token = self.debounce.schedule();
        Task::perform(
            state::history::settle(token, HISTORY_DEBOUNCE),
            Message::FlushHistory,
        )
    }

    /// Point the picker and the preview outline at the selected element
    fn follow_selection(&mut self) {
        self.svg_tab.follow_selection(&self.editor);
        let selected = self.editor.selected().map(|e| e.id.as_str());
        self.preview.borrow_mut().set_highlight(selected);
        self.refresh_preview();
    }

    /// Record the selected color, then add the document's colors under the
    /// active edit mode. Written at once, not debounced.
    fn note_document_colors(&mut self) {
        let recorded = self.history.record(self.editor.selected_color());
        let seeded = self.history.seed(self.editor.active_colors());
        if recorded || seeded {
            self.persist_history();
        }
    }

    fn refresh_preview(&mut self) {
        self.editor.sync_preview();
        self.preview.borrow_mut().refresh();
    }

    fn persist_params(&self) {
        if let Some(library) = &self.library {
            if let Err(e) = library.save_params(self.conversor.params()) {
                warn!("⚠️  Failed to save parameters: {}", e);
            }
        }
    }

    fn persist_history(&self) {
        if let Some(library) = &self.library {
            if let Err(e) = library.save_history(&self.history) {
                warn!("⚠️  Failed to save color history: {}", e);
            }
        }
        self.history_feed.publish(&self.history);
    }

    fn save(&mut self, file_name: &str, bytes: &[u8]) {
        match export::save_with_dialog(file_name, bytes) {
            Ok(Some(path)) => self.status = format!("💾 Saved {}", path.display()),
            Ok(None) => {}
            Err(e) => {
                error!("❌ Save failed: {}", e);
                self.status = format!("❌ Save failed: {}", e);
            }
        }
    }
}

fn tab_button(label: &str, tab: Tab, current: Tab) -> Element<'_, Message> {
    button(text(label))
        .on_press(Message::TabSelected(tab))
        .style(if tab == current {
            button::primary as fn(&Theme, button::Status) -> button::Style
        } else {
            button::text
        })
        .into()
}

/// Read an SVG file off the UI thread
fn read_svg(path: PathBuf) -> Task<Message> {
    Task::perform(
        async move {
            tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| format!("Failed to read {}: {}", path.display(), e))
        },
        Message::SvgLoaded,
    )
}

/// Messages for every history change published after subscribing
fn history_updates(receiver: broadcast::Receiver<Vec<String>>) -> impl Stream<Item = Message> {
    stream::unfold(receiver, |mut receiver| async move {
        loop {
            match receiver.recv().await {
                Ok(colors) => return Some((Message::HistoryChanged(colors), receiver)),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("⚠️  History feed skipped {} update(s)", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    })
}

fn main() -> iced::Result {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    iced::application(TITLE, Conversor::update, Conversor::view)
        .theme(Conversor::theme)
        .subscription(Conversor::subscription)
        .window(window::Settings {
            size: Size::new(1280.0, 820.0),
            min_size: Some(Size::new(900.0, 600.0)),
            decorations: false,
            ..window::Settings::default()
        })
        .centered()
        .run_with(Conversor::new)
}
