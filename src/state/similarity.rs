//! Similarity sets: elements sharing the selected element's current color.

use super::data::{EditMode, ElementRecord};

/// Ids of the other records whose current color under `mode` equals the
/// selected record's, by exact string comparison.
///
/// An absent color matches other absent colors; `none` and `transparent`
/// are ordinary keys.
pub fn similar_elements(records: &[ElementRecord], selected: &str, mode: EditMode) -> Vec<String> {
    let Some(target) = records.iter().find(|r| r.id == selected) else {
        return Vec::new();
    };
    let color = target.color(mode);

    records
        .iter()
        .filter(|r| r.id != selected && r.color(mode) == color)
        .map(|r| r.id.clone())
        .collect()
}

/// The "apply to all" toggle.
///
/// While enabled, recoloring the selected element also recolors its
/// similarity set as computed right before the change.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchRecolor {
    apply_to_all: bool,
    last_applied: Option<String>,
}

impl BatchRecolor {
    pub fn is_enabled(&self) -> bool {
        self.apply_to_all
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.apply_to_all = enabled;
        if !enabled {
            self.last_applied = None;
        }
    }

    /// Last color mirrored onto a cohort
    pub fn last_applied(&self) -> Option<&str> {
        self.last_applied.as_deref()
    }

    /// True when `color` was already mirrored onto the cohort
    pub fn is_repeat(&self, color: &str) -> bool {
        self.apply_to_all && self.last_applied() == Some(color)
    }

    pub(crate) fn record_applied(&mut self, color: &str) {
        self.last_applied = Some(color.to_string());
    }

    /// Targets for a color change of `selected`: the element itself plus,
    /// when enabled, its current cohort
    pub fn targets(&self, records: &[ElementRecord], selected: &str, mode: EditMode) -> Vec<String> {
        let mut ids = vec![selected.to_string()];
        if self.apply_to_all {
            ids.extend(similar_elements(records, selected, mode));
        }
        ids
    }
}
