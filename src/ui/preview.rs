/// Live SVG preview
///
/// Keeps its own parsed copy of the document. The editor patches it through
/// `PreviewSink`; `refresh` re-serializes once per update so the view gets a
/// new handle only when something actually changed. The selected element
/// is outlined in the rendered copy only.
use iced::widget::svg;
use log::{debug, warn};

use crate::state::editor::{AttributeUpdate, PreviewSink};
use crate::svg::document::SvgDocument;

/// Outline color for the selected element
pub const HIGHLIGHT_COLOR: &str = "#ff9800";

#[derive(Default)]
pub struct LivePreview {
    document: Option<SvgDocument>,
    handle: Option<svg::Handle>,
    /// Id of the element outlined in the render
    highlight: Option<String>,
    dirty: bool,
    #[cfg(test)]
    rendered: Option<String>,
}

impl LivePreview {
    /// Replace the previewed document
    pub fn reload(&mut self, markup: &str) {
        match SvgDocument::parse(markup) {
            Ok(document) => {
                self.document = Some(document);
                self.dirty = true;
                self.refresh();
            }
            Err(e) => {
                warn!("⚠️  Preview could not parse document: {}", e);
                self.clear();
            }
        }
    }

    pub fn clear(&mut self) {
        self.document = None;
        self.handle = None;
        self.dirty = false;
    }

    /// Outline `id` in the next render, or nothing for `None`
    pub fn set_highlight(&mut self, id: Option<&str>) {
        if self.highlight.as_deref() != id {
            self.highlight = id.map(str::to_string);
            self.dirty = true;
        }
    }

    /// Rebuild the render handle if any attribute changed since the last call
    pub fn refresh(&mut self) {
        if !self.dirty {
            return;
        }
        self.dirty = false;

        let Some(document) = self.document.as_ref() else {
            return;
        };
        let rendered = match self.highlight.as_deref() {
            Some(id) => document.to_markup_outlined(id, HIGHLIGHT_COLOR),
            None => document.to_markup(),
        };
        match rendered {
            Ok(markup) => {
                #[cfg(test)]
                {
                    self.rendered = Some(markup.clone());
                }
                self.handle = Some(svg::Handle::from_memory(markup.into_bytes()));
            }
            Err(e) => warn!("⚠️  Preview serialization failed: {}", e),
        }
    }

    pub fn handle(&self) -> Option<&svg::Handle> {
        self.handle.as_ref()
    }

    #[cfg(test)]
    fn rendered(&self) -> Option<&str> {
        self.rendered.as_deref()
    }

    /// Current value of an attribute as the preview sees it
    #[cfg(test)]
    fn attribute(&self, id: &str, name: &str) -> Option<String> {
        let document = self.document.as_ref()?;
        let node = document.node_of(id)?;
        document.attribute(node, name).map(str::to_string)
    }
}

impl PreviewSink for LivePreview {
    fn apply(&mut self, update: &AttributeUpdate) {
        let Some(document) = self.document.as_mut() else {
            return;
        };
        let current = document
            .node_of(&update.id)
            .and_then(|node| document.attribute(node, update.attribute));
        if current == update.value.as_deref() {
            return;
        }
        if document.set_attribute_by_id(&update.id, update.attribute, update.value.as_deref()) {
            self.dirty = true;
        } else {
            debug!("Preview has no element {}", update.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::editor::SvgEditor;
    use std::cell::RefCell;
    use std::rc::Rc;

    const DRAWING: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 4 4"><rect width="2" height="2" fill="#ff0000"/><circle id="dot" cx="3" cy="3" r="1" fill="#ff0000"/></svg>"##;

    #[test]
    fn test_editor_drives_preview() {
        let preview = Rc::new(RefCell::new(LivePreview::default()));
        let mut editor = SvgEditor::new();
        editor.attach_preview(Box::new(preview.clone()));

        editor.load(DRAWING).unwrap();
        preview.borrow_mut().reload(editor.markup().unwrap());
        editor.sync_preview();
        assert!(preview.borrow().handle().is_some());

        editor.set_color("dot", "#0000ff");
        assert_eq!(preview.borrow().attribute("dot", "fill").as_deref(), Some("#0000ff"));
        assert_eq!(
            preview.borrow().attribute("svg-element-0", "fill").as_deref(),
            Some("#ff0000")
        );

        editor.reset_all();
        editor.sync_preview();
        assert_eq!(preview.borrow().attribute("dot", "fill").as_deref(), Some("#ff0000"));
    }

    #[test]
    fn test_refresh_only_when_dirty() {
        let mut preview = LivePreview::default();
        preview.reload(DRAWING);
        assert!(!preview.dirty);

        preview.apply(&AttributeUpdate {
            id: "dot".into(),
            attribute: "fill",
            value: Some("#ff0000".into()),
        });
        assert!(!preview.dirty);

        preview.apply(&AttributeUpdate {
            id: "dot".into(),
            attribute: "stroke",
            value: Some("#000000".into()),
        });
        assert!(preview.dirty);
        preview.refresh();
        assert!(!preview.dirty);
    }

    #[test]
    fn test_selection_is_outlined_only_in_preview() {
        let preview = Rc::new(RefCell::new(LivePreview::default()));
        let mut editor = SvgEditor::new();
        editor.attach_preview(Box::new(preview.clone()));
        editor.load(DRAWING).unwrap();
        preview.borrow_mut().reload(editor.markup().unwrap());

        editor.select("dot");
        preview.borrow_mut().set_highlight(editor.selected().map(|e| e.id.as_str()));
        preview.borrow_mut().refresh();

        let rendered = preview.borrow().rendered().unwrap().to_string();
        assert!(rendered.contains(r##"<circle cx="3" cy="3" r="1" fill="none" stroke="#ff9800""##));
        assert_eq!(rendered.matches(HIGHLIGHT_COLOR).count(), 1);
        assert_eq!(editor.element("dot").unwrap().current_fill.as_deref(), Some("#ff0000"));
        assert!(!editor.export_markup().unwrap().unwrap().contains(HIGHLIGHT_COLOR));

        preview.borrow_mut().set_highlight(None);
        preview.borrow_mut().refresh();
        assert!(!preview.borrow().rendered().unwrap().contains(HIGHLIGHT_COLOR));
    }

    #[test]
    fn test_bad_markup_clears_preview() {
        let mut preview = LivePreview::default();
        preview.reload(DRAWING);
        preview.reload("<svg");
        assert!(preview.handle().is_none());
    }
}
