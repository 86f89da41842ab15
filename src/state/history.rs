//! Recently used colors.

use std::time::Duration;
use tokio::sync::broadcast;

use crate::svg::paint::is_visible_color;

/// Most colors kept in the history
pub const MAX_HISTORY_COLORS: usize = 12;

/// Settings key the history is persisted under
pub const HISTORY_KEY: &str = "svg-color-history";

/// How long color edits must pause before the history is written
pub const HISTORY_DEBOUNCE: Duration = Duration::from_millis(300);

/// Bounded most-recent-first list of colors, without duplicates
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColorHistory {
    colors: Vec<String>,
}

impl ColorHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from stored colors, dropping invisible values, duplicates and overflow
    pub fn from_colors(colors: Vec<String>) -> Self {
        let mut history = Self::new();
        history.seed(colors.iter().map(String::as_str));
        history
    }

    pub fn colors(&self) -> &[String] {
        &self.colors
    }

    /// Move `color` to the front. Absent, `none` and `transparent` values
    /// are ignored. Returns true when the list changed.
    pub fn record(&mut self, color: Option<&str>) -> bool {
        if !is_visible_color(color) {
            return false;
        }
        let Some(color) = color else { return false };

        if self.colors.first().map(String::as_str) == Some(color) {
            return false;
        }

        self.colors.retain(|c| c != color);
        self.colors.insert(0, color.to_string());
        self.colors.truncate(MAX_HISTORY_COLORS);
        true
    }

    /// Append colors not present yet, keeping the existing order.
    /// Returns true when the list changed.
    pub fn seed<'a>(&mut self, colors: impl IntoIterator<Item = &'a str>) -> bool {
        let mut changed = false;
        for color in colors {
            if self.colors.len() >= MAX_HISTORY_COLORS {
                break;
            }
            if is_visible_color(Some(color)) && !self.colors.iter().any(|c| c == color) {
                self.colors.push(color.to_string());
                changed = true;
            }
        }
        changed
    }
}

/// Fan-out of history changes to every open view
#[derive(Debug, Clone)]
pub struct HistoryBroadcast {
    sender: broadcast::Sender<Vec<String>>,
}

impl Default for HistoryBroadcast {
    fn default() -> Self {
        Self::new()
    }
}

impl HistoryBroadcast {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(16);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Vec<String>> {
        self.sender.subscribe()
    }

    /// Publish the new list. Returns how many subscribers received it.
    pub fn publish(&self, history: &ColorHistory) -> usize {
        self.sender.send(history.colors().to_vec()).unwrap_or(0)
    }
}

/// Trailing-edge debounce driven by generation tokens.
///
/// Each `schedule` invalidates earlier tokens; only the token of the last
/// call is still current once the delay has passed.
#[derive(Debug, Clone, Copy, Default)]
pub struct Debounce {
    generation: u64,
}

impl Debounce {
    pub fn schedule(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    pub fn is_current(&self, token: u64) -> bool {
        token == self.generation
    }
}

/// Sleep for the debounce delay, then hand the token back
pub async fn settle(token: u64, delay: Duration) -> u64 {
    tokio::time::sleep(delay).await;
    token
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_moves_to_front_without_duplicates() {
        let mut history = ColorHistory::new();
        assert!(history.record(Some("#111")));
        assert!(history.record(Some("#222")));
        assert!(history.record(Some("#111")));
        assert!(!history.record(Some("#111")));
        assert_eq!(history.colors(), ["#111", "#222"]);
    }

    #[test]
    fn test_record_ignores_invisible_values() {
        let mut history = ColorHistory::new();
        assert!(!history.record(None));
        assert!(!history.record(Some("none")));
        assert!(!history.record(Some("transparent")));
        assert!(history.colors().is_empty());
    }

    #[test]
    fn test_capacity() {
        let mut history = ColorHistory::new();
        for i in 0..20 {
            history.record(Some(&format!("#{:06x}", i)));
        }
        assert_eq!(history.colors().len(), MAX_HISTORY_COLORS);
        assert_eq!(history.colors()[0], "#000013");

        assert!(!history.seed(["#abcdef"]));
        assert_eq!(history.colors().len(), MAX_HISTORY_COLORS);
    }

    #[test]
    fn test_seed_appends_unseen() {
        let mut history = ColorHistory::from_colors(vec!["#111".into(), "none".into()]);
        assert_eq!(history.colors(), ["#111"]);
        assert!(history.seed(["#111", "#222", "transparent", "#222"]));
        assert_eq!(history.colors(), ["#111", "#222"]);
    }

    #[test]
    fn test_broadcast() {
        let broadcast = HistoryBroadcast::new();
        let mut first = broadcast.subscribe();
        let mut second = broadcast.subscribe();

        let mut history = ColorHistory::new();
        history.record(Some("#abc"));
        assert_eq!(broadcast.publish(&history), 2);
        assert_eq!(first.try_recv().unwrap(), vec!["#abc".to_string()]);
        assert_eq!(second.try_recv().unwrap(), vec!["#abc".to_string()]);
    }

    #[test]
    fn test_selection_and_active_mode_feed_history() {
        use crate::state::{data::EditMode, editor::SvgEditor};

        let mut editor = SvgEditor::new();
        editor
            .load(r##"<svg><path fill="#111111" stroke="#eeeeee"/><circle fill="#222222"/></svg>"##)
            .unwrap();

        let mut history = ColorHistory::new();
        assert!(history.seed(editor.active_colors()));
        assert_eq!(history.colors(), ["#111111", "#222222"]);

        // Selecting moves that element's color to the front
        editor.select("svg-element-1");
        assert!(history.record(editor.selected_color()));
        assert_eq!(history.colors(), ["#222222", "#111111"]);

        // Stroke colors only come in once stroke mode is active
        editor.set_edit_mode(EditMode::Stroke);
        assert!(!history.record(editor.selected_color()));
        assert!(history.seed(editor.active_colors()));
        assert_eq!(history.colors(), ["#222222", "#111111", "#eeeeee"]);
    }

    #[test]
    fn test_publish_without_subscribers() {
        assert_eq!(HistoryBroadcast::new().publish(&ColorHistory::new()), 0);
    }

    #[tokio::test]
    async fn test_debounce_keeps_only_last_token() {
        let mut debounce = Debounce::default();
        let first = debounce.schedule();
        let second = debounce.schedule();

        let (a, b) = tokio::join!(
            settle(first, Duration::from_millis(5)),
            settle(second, Duration::from_millis(5))
        );
        assert!(!debounce.is_current(a));
        assert!(debounce.is_current(b));
    }
}
