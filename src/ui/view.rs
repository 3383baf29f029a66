use crossterm::event::KeyEvent;
use ratatui::prelude::*;

use super::renderfns::StatusMessage;

/// A keyboard shortcut hint for display in the header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShortcutInfo {
  pub key: String,
  pub label: &'static str,
  pub priority: u8, // Lower = shown first
}

impl ShortcutInfo {
  pub fn new(key: impl Into<String>, label: &'static str) -> Self {
    Self {
      key: key.into(),
      label,
      priority: 100,
    }
  }

  pub fn with_priority(mut self, priority: u8) -> Self {
    self.priority = priority;
    self
  }
}

/// Actions that a view can request in response to user input
pub enum ViewAction {
  /// No action needed
  None,
  /// Leave the current view (go back)
  Pop,
}

/// Trait for view behavior
///
/// Views handle their own input modes (search, prompts, etc.) and return
/// actions for the App to execute: App → View → Components.
///
/// Views that load data asynchronously own their `CachedQuery`/`Query` and
/// poll them in `tick()`.
pub trait View {
  /// Handle a key event, returning an action for App to execute
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction;

  /// Render the view to the frame
  fn render(&mut self, frame: &mut Frame, area: Rect);

  /// Get the breadcrumb label for this view
  fn breadcrumb_label(&self) -> String;

  /// Called on each tick to allow views to poll async work
  fn tick(&mut self) {}

  /// Whether the view is capturing text input, so global keys like `:`
  /// and `q` go to the view instead
  fn is_capturing_input(&self) -> bool {
    false
  }

  /// Latest message for the footer
  fn status(&self) -> Option<&StatusMessage> {
    None
  }

  /// Get keyboard shortcuts to display in the header
  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("q", "back").with_priority(90),
    ]
  }
}
