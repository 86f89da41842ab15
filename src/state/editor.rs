use log::{debug, info};
use std::cell::RefCell;
use std::rc::Rc;

use super::data::{EditMode, ElementRecord};
use super::similarity::{similar_elements, BatchRecolor};
use crate::svg::{document::SvgDocument, Result as SvgResult};

/// One attribute write destined for a preview
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeUpdate {
    pub id: String,
    pub attribute: &'static str,
    /// None removes the attribute
    pub value: Option<String>,
}

/// A rendered view of the document that can be patched in place.
///
/// The editor writes color changes straight into the attached sink so the
/// preview updates without a full reload. That write is an optimization:
/// [`SvgEditor::sync_preview`] reconciles the sink from record state after
/// every change, so a sink that drops a direct write still converges.
pub trait PreviewSink {
    fn apply(&mut self, update: &AttributeUpdate);
}

impl<T: PreviewSink> PreviewSink for Rc<RefCell<T>> {
    fn apply(&mut self, update: &AttributeUpdate) {
        self.borrow_mut().apply(update);
    }
}

/// State container for the SVG color editor
#[derive(Default)]
pub struct SvgEditor {
    /// Normalized markup (ids synthesized), the source of every export
    markup: Option<String>,
    elements: Vec<ElementRecord>,
    selected: Option<String>,
    edit_mode: EditMode,
    batch: BatchRecolor,
    preview: Option<Box<dyn PreviewSink>>,
    /// Bumped on every record-list change
    revision: u64,
    synced_revision: u64,
}

impl std::fmt::Debug for SvgEditor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SvgEditor")
            .field("elements", &self.elements.len())
            .field("selected", &self.selected)
            .field("edit_mode", &self.edit_mode)
            .field("revision", &self.revision)
            .finish()
    }
}

impl SvgEditor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a document, replacing every record.
    ///
    /// On a parse error the current document is left untouched.
    pub fn load(&mut self, markup: &str) -> SvgResult<usize> {
        let document = SvgDocument::parse(markup)?;

        let elements: Vec<ElementRecord> = document
            .graphical_elements()
            .map(|element| {
                let fill = document.attribute(element.node, "fill").map(str::to_string);
                let stroke = document.attribute(element.node, "stroke").map(str::to_string);
                ElementRecord {
                    id: element.id.to_string(),
                    tag: element.tag.to_string(),
                    node: element.node,
                    original_fill: fill.clone(),
                    original_stroke: stroke.clone(),
                    current_fill: fill,
                    current_stroke: stroke,
                }
            })
            .collect();

        self.markup = Some(document.to_markup()?);
        self.selected = elements.first().map(|e| e.id.clone());
        self.elements = elements;
        self.batch = BatchRecolor::default();
        self.bump();

        info!("🎨 Loaded SVG with {} graphical elements", self.elements.len());
        Ok(self.elements.len())
    }

    pub fn is_loaded(&self) -> bool {
        self.markup.is_some()
    }

    /// Normalized markup of the loaded document
    pub fn markup(&self) -> Option<&str> {
        self.markup.as_deref()
    }

    pub fn elements(&self) -> &[ElementRecord] {
        &self.elements
    }

    pub fn element(&self, id: &str) -> Option<&ElementRecord> {
        self.elements.iter().find(|e| e.id == id)
    }

    pub fn selected(&self) -> Option<&ElementRecord> {
        self.selected.as_deref().and_then(|id| self.element(id))
    }

    pub fn select(&mut self, id: &str) -> bool {
        if self.element(id).is_some() {
            self.selected = Some(id.to_string());
            true
        } else {
            false
        }
    }

    pub fn edit_mode(&self) -> EditMode {
        self.edit_mode
    }

    pub fn set_edit_mode(&mut self, mode: EditMode) {
        self.edit_mode = mode;
    }

    /// Current color of the selected element under the active mode
    pub fn selected_color(&self) -> Option<&str> {
        self.selected().and_then(|e| e.color(self.edit_mode))
    }

    /// Current colors under the active mode, in document order
    pub fn active_colors(&self) -> impl Iterator<Item = &str> + '_ {
        self.elements.iter().filter_map(move |e| e.color(self.edit_mode))
    }

    // ========== Preview ==========

    /// Hand the editor the preview it should keep in sync
    pub fn attach_preview(&mut self, preview: Box<dyn PreviewSink>) {
        self.preview = Some(preview);
        self.synced_revision = 0;
    }

    /// Reconcile the attached preview from record state.
    ///
    /// Does nothing when the preview already reflects the latest revision.
    pub fn sync_preview(&mut self) {
        if self.synced_revision == self.revision {
            return;
        }
        let Some(preview) = self.preview.as_mut() else {
            return;
        };

        for element in &self.elements {
            for (attribute, value) in [
                ("fill", &element.current_fill),
                ("stroke", &element.current_stroke),
            ] {
                preview.apply(&AttributeUpdate {
                    id: element.id.clone(),
                    attribute,
                    value: value.clone(),
                });
            }
        }
        self.synced_revision = self.revision;
    }

    fn write_preview(&mut self, updates: &[AttributeUpdate]) {
        if let Some(preview) = self.preview.as_mut() {
            for update in updates {
                debug!("Preview write {} {}={:?}", update.id, update.attribute, update.value);
                preview.apply(update);
            }
        }
    }

    fn bump(&mut self) {
        self.revision += 1;
    }

    // ========== Color operations ==========

    /// Set the active attribute of one element
    pub fn set_color(&mut self, id: &str, color: &str) -> bool {
        self.set_color_for_many(&[id.to_string()], color) > 0
    }

    /// Set the active attribute of several elements. Returns how many matched.
    pub fn set_color_for_many(&mut self, ids: &[String], color: &str) -> usize {
        let mode = self.edit_mode;
        let mut updates = Vec::new();

        for element in self.elements.iter_mut().filter(|e| ids.contains(&e.id)) {
            element.set_color(mode, Some(color.to_string()));
            updates.push(AttributeUpdate {
                id: element.id.clone(),
                attribute: mode.attribute(),
                value: Some(color.to_string()),
            });
        }

        if updates.is_empty() {
            return 0;
        }
        self.bump();
        self.write_preview(&updates);
        updates.len()
    }

    /// Restore every element's fill and stroke to the loaded values
    pub fn reset_all(&mut self) {
        let mut updates = Vec::new();

        for element in self.elements.iter_mut().filter(|e| e.is_modified()) {
            if element.current_fill != element.original_fill {
                element.current_fill = element.original_fill.clone();
                updates.push(AttributeUpdate {
                    id: element.id.clone(),
                    attribute: "fill",
                    value: element.original_fill.clone(),
                });
            }
            if element.current_stroke != element.original_stroke {
                element.current_stroke = element.original_stroke.clone();
                updates.push(AttributeUpdate {
                    id: element.id.clone(),
                    attribute: "stroke",
                    value: element.original_stroke.clone(),
                });
            }
        }

        if !updates.is_empty() {
            self.bump();
            self.write_preview(&updates);
        }
    }

    /// Re-parse the stored markup, apply every record's current paint and
    /// serialize. None when no document is loaded.
    pub fn export_markup(&self) -> Option<SvgResult<String>> {
        let markup = self.markup.as_deref()?;
        Some(self.render_markup(markup))
    }

    fn render_markup(&self, markup: &str) -> SvgResult<String> {
        let mut document = SvgDocument::parse(markup)?;
        for element in &self.elements {
            if let Some(node) = document.node_of(&element.id) {
                document.set_attribute(node, "fill", element.current_fill.as_deref());
                document.set_attribute(node, "stroke", element.current_stroke.as_deref());
            }
        }
        document.to_markup()
    }

    // ========== Batch recolor ==========

    /// Similarity set of the selected element under the active mode
    pub fn similar_to_selected(&self) -> Vec<String> {
        match self.selected.as_deref() {
            Some(id) => similar_elements(&self.elements, id, self.edit_mode),
            None => Vec::new(),
        }
    }

    pub fn apply_to_all(&self) -> bool {
        self.batch.is_enabled()
    }

    /// Toggle "apply to all". Enabling pushes the selected color onto the
    /// current similarity set right away.
    pub fn set_apply_to_all(&mut self, enabled: bool) {
        self.batch.set_enabled(enabled);
        if !enabled {
            return;
        }

        let Some(color) = self.selected_color().map(str::to_string) else {
            return;
        };
        let cohort = self.similar_to_selected();
        if !cohort.is_empty() {
            self.set_color_for_many(&cohort, &color);
            info!("Applied {} {} to {} elements", self.edit_mode.attribute(), color, cohort.len());
        }
        self.batch.record_applied(&color);
    }

    /// Recolor the selected element and, when "apply to all" is on, the
    /// elements that shared its color right before this change.
    ///
    /// Returns the number of elements changed. Re-applying the color that
    /// was just mirrored onto the cohort changes nothing.
    pub fn recolor_selected(&mut self, color: &str) -> usize {
        let Some(selected) = self.selected.clone() else {
            return 0;
        };
        if self.batch.is_repeat(color) && self.selected_color() == Some(color) {
            debug!("Skipping repeated {} {}", self.edit_mode.attribute(), color);
            return 0;
        }

        if !self.batch.is_enabled() {
            return usize::from(self.set_color(&selected, color));
        }

        let targets = self.batch.targets(&self.elements, &selected, self.edit_mode);
        let changed = self.set_color_for_many(&targets, color);
        self.batch.record_applied(color);
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DRAWING: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 10 10">
<path id="a" d="M0 0h1v1z" fill="#ff0000" stroke="#000000"/>
<path d="M1 1h1v1z" fill="#ff0000"/>
<circle id="c" cx="5" cy="5" r="1" fill="#00ff00"/>
<rect width="1" height="1"/>
</svg>"##;

    /// Preview double that applies writes to its own document
    struct DocumentPreview {
        document: SvgDocument,
        writes: usize,
    }

    impl PreviewSink for DocumentPreview {
        fn apply(&mut self, update: &AttributeUpdate) {
            self.writes += 1;
            self.document
                .set_attribute_by_id(&update.id, update.attribute, update.value.as_deref());
        }
    }

    fn loaded() -> SvgEditor {
        let mut editor = SvgEditor::new();
        assert_eq!(editor.load(DRAWING).unwrap(), 4);
        editor
    }

    fn fills(editor: &SvgEditor) -> Vec<Option<String>> {
        editor.elements().iter().map(|e| e.current_fill.clone()).collect()
    }

    #[test]
    fn test_load_captures_originals_and_selects_first() {
        let editor = loaded();
        let ids: Vec<_> = editor.elements().iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "svg-element-1", "c", "svg-element-3"]);
        assert_eq!(editor.selected().unwrap().id, "a");
        assert_eq!(editor.element("svg-element-3").unwrap().original_fill, None);
        assert!(editor.markup().unwrap().contains(r#"id="svg-element-1""#));
    }

    #[test]
    fn test_load_failure_keeps_previous_document() {
        let mut editor = loaded();
        assert!(editor.load("<svg><path></svg>").is_err());
        assert_eq!(editor.elements().len(), 4);
    }

    #[test]
    fn test_set_color_respects_edit_mode() {
        let mut editor = loaded();
        assert!(editor.set_color("a", "#123456"));
        editor.set_edit_mode(EditMode::Stroke);
        assert!(editor.set_color("c", "blue"));
        assert!(!editor.set_color("missing", "blue"));

        let a = editor.element("a").unwrap();
        assert_eq!(a.current_fill.as_deref(), Some("#123456"));
        assert_eq!(a.current_stroke.as_deref(), Some("#000000"));
        let c = editor.element("c").unwrap();
        assert_eq!(c.current_fill.as_deref(), Some("#00ff00"));
        assert_eq!(c.current_stroke.as_deref(), Some("blue"));
    }

    #[test]
    fn test_set_color_for_many() {
        let mut editor = loaded();
        let ids = vec!["a".to_string(), "c".to_string(), "nope".to_string()];
        assert_eq!(editor.set_color_for_many(&ids, "#111111"), 2);
        assert_eq!(editor.element("c").unwrap().current_fill.as_deref(), Some("#111111"));
    }

    #[test]
    fn test_reset_all_is_idempotent() {
        let mut editor = loaded();
        let original = fills(&editor);

        editor.set_color("a", "#abcdef");
        editor.set_color("svg-element-3", "#abcdef");
        editor.set_edit_mode(EditMode::Stroke);
        editor.set_color("c", "#abcdef");

        editor.reset_all();
        let once: Vec<_> = editor.elements().to_vec();
        assert_eq!(fills(&editor), original);
        assert!(editor.elements().iter().all(|e| !e.is_modified()));

        editor.reset_all();
        assert_eq!(editor.elements(), &once[..]);
    }

    #[test]
    fn test_export_applies_and_removes_attributes() {
        let mut editor = loaded();
        editor.set_color("svg-element-1", "#0000ff");
        editor.elements[0].current_stroke = None;

        let markup = editor.export_markup().unwrap().unwrap();
        assert!(markup.contains(r##"<path d="M1 1h1v1z" fill="#0000ff" id="svg-element-1"/>"##));
        assert!(!markup.contains(r##"stroke="#000000""##));
        assert!(markup.contains(r#"<rect width="1" height="1" id="svg-element-3"/>"#));
    }

    #[test]
    fn test_export_reimport_keeps_ids() {
        let mut editor = loaded();
        editor.set_color("a", "#010101");
        let markup = editor.export_markup().unwrap().unwrap();

        let mut reloaded = SvgEditor::new();
        assert_eq!(reloaded.load(&markup).unwrap(), editor.elements().len());
        let ids = |e: &SvgEditor| e.elements().iter().map(|r| r.id.clone()).collect::<Vec<_>>();
        assert_eq!(ids(&editor), ids(&reloaded));
        assert_eq!(reloaded.element("a").unwrap().original_fill.as_deref(), Some("#010101"));
    }

    #[test]
    fn test_export_without_document() {
        assert!(SvgEditor::new().export_markup().is_none());
    }

    #[test]
    fn test_direct_preview_writes_and_sync() {
        let mut editor = loaded();
        let preview = Rc::new(RefCell::new(DocumentPreview {
            document: SvgDocument::parse(editor.markup().unwrap()).unwrap(),
            writes: 0,
        }));
        editor.attach_preview(Box::new(preview.clone()));

        editor.set_color("c", "#fedcba");
        {
            let preview = preview.borrow();
            let node = preview.document.node_of("c").unwrap();
            assert_eq!(preview.document.attribute(node, "fill"), Some("#fedcba"));
            assert_eq!(preview.writes, 1);
        }

        editor.sync_preview();
        let after_sync = preview.borrow().writes;
        assert_eq!(after_sync, 1 + 2 * editor.elements().len());

        // Nothing changed since the last sync
        editor.sync_preview();
        assert_eq!(preview.borrow().writes, after_sync);

        editor.reset_all();
        let preview = preview.borrow();
        let node = preview.document.node_of("c").unwrap();
        assert_eq!(preview.document.attribute(node, "fill"), Some("#00ff00"));
    }

    #[test]
    fn test_sync_repairs_missed_writes() {
        let mut editor = loaded();
        editor.set_color("a", "#222222");

        let preview = Rc::new(RefCell::new(DocumentPreview {
            document: SvgDocument::parse(editor.markup().unwrap()).unwrap(),
            writes: 0,
        }));
        editor.attach_preview(Box::new(preview.clone()));
        editor.sync_preview();

        let preview = preview.borrow();
        let node = preview.document.node_of("a").unwrap();
        assert_eq!(preview.document.attribute(node, "fill"), Some("#222222"));
    }

    #[test]
    fn test_recolor_selected_with_apply_to_all() {
        let mut editor = loaded();
        assert_eq!(editor.similar_to_selected(), vec!["svg-element-1"]);

        // Off: only the selection changes
        assert_eq!(editor.recolor_selected("#333333"), 1);
        assert_eq!(
            editor.element("svg-element-1").unwrap().current_fill.as_deref(),
            Some("#ff0000")
        );
        assert!(editor.similar_to_selected().is_empty());

        editor.set_color("a", "#ff0000");
        editor.set_apply_to_all(true);
        assert_eq!(editor.recolor_selected("#444444"), 2);
        assert_eq!(fills(&editor)[1].as_deref(), Some("#444444"));
        assert_eq!(editor.batch.last_applied(), Some("#444444"));

        // Cohort is recomputed from colors at the moment of the change
        editor.set_color("c", "#444444");
        assert_eq!(editor.recolor_selected("#555555"), 3);
    }

    #[test]
    fn test_repeated_batch_color_is_skipped() {
        let mut editor = loaded();
        editor.set_apply_to_all(true);
        assert_eq!(editor.recolor_selected("#666666"), 2);
        let revision = editor.revision;

        assert_eq!(editor.recolor_selected("#666666"), 0);
        assert_eq!(editor.revision, revision);

        // A different selection with another color is not a repeat
        editor.select("c");
        assert_eq!(editor.recolor_selected("#666666"), 1);
        assert_eq!(fills(&editor)[2].as_deref(), Some("#666666"));
    }

    #[test]
    fn test_select_unknown_id() {
        let mut editor = loaded();
        assert!(!editor.select("zzz"));
        assert!(editor.select("c"));
        assert_eq!(editor.selected_color(), Some("#00ff00"));
    }
}
