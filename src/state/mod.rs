/// State management module
///
/// This module handles all application state, including:
/// - Shared data structures (data.rs)
/// - Conversion parameters and their normalization (edit.rs)
/// - The image conversion work list (conversor.rs)
/// - The SVG color editor and its live preview contract (editor.rs)
/// - Similarity-based batch recolor (similarity.rs)
/// - Color history, its fan-out and debounced persistence (history.rs)
/// - The settings database (library.rs)

pub mod conversor;
pub mod data;
pub mod edit;
pub mod editor;
pub mod history;
pub mod library;
pub mod similarity;
