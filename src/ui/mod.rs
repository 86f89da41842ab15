/// User interface module
///
/// Views over the state containers:
/// - Window chrome header and controls (chrome.rs)
/// - Image converter tab (image_tab.rs)
/// - SVG color editor tab (svg_tab.rs)
/// - Live SVG preview patched by the editor (preview.rs)

pub mod chrome;
pub mod image_tab;
pub mod preview;
pub mod svg_tab;

/// Top-level tabs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tab {
    #[default]
    Images,
    Svg,
}
