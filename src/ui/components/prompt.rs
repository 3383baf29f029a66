use super::input::{InputResult, TextInput};
use super::KeyResult;
use crossterm::event::KeyEvent;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

/// Events emitted by the prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptEvent {
  /// Value entered for the row action bound to `key`
  Submitted { key: char, value: String },
  Cancelled,
}

/// Centered single-line prompt asking for a row action's input
/// (a grade, a block name, a fee amount)
#[derive(Debug, Clone, Default)]
pub struct Prompt {
  active: bool,
  key: char,
  title: String,
  hint: String,
  input: TextInput,
}

impl Prompt {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_active(&self) -> bool {
    self.active
  }

  /// Open the prompt for the action bound to `key`, prefilled with `initial`
  pub fn show(&mut self, key: char, title: impl Into<String>, hint: impl Into<String>, initial: &str) {
    self.active = true;
    self.key = key;
    self.title = title.into();
    self.hint = hint.into();
    self.input.set_value(initial);
  }

  pub fn hide(&mut self) {
    self.active = false;
    self.input.clear();
  }

  /// Handle a key event
  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<PromptEvent> {
    if !self.active {
      return KeyResult::NotHandled;
    }

    match self.input.handle_key(key) {
      InputResult::Submitted(value) => {
        let action = self.key;
        self.hide();
        KeyResult::Event(PromptEvent::Submitted { key: action, value })
      }
      InputResult::Cancelled => {
        self.hide();
        KeyResult::Event(PromptEvent::Cancelled)
      }
      // Modal: swallow everything else
      InputResult::Consumed | InputResult::NotHandled => KeyResult::Handled,
    }
  }

  /// Render the prompt overlay if active
  pub fn render_overlay(&self, frame: &mut Frame, area: Rect) {
    if !self.active {
      return;
    }

    let width = (area.width * 60 / 100).clamp(30.min(area.width), 64);
    let height = 4u16.min(area.height);
    let x = area.x + area.width.saturating_sub(width) / 2;
    let y = area.y + area.height.saturating_sub(height) / 2;
    let overlay_area = Rect::new(x, y, width, height);

    frame.render_widget(Clear, overlay_area);

    let block = Block::default()
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Yellow))
      .title(format!(" {} ", self.title));

    let inner = block.inner(overlay_area);
    frame.render_widget(block, overlay_area);

    let lines = vec![
      Line::from(vec![
        Span::styled("> ", Style::default().fg(Color::Yellow)),
        Span::raw(self.input.value()),
        Span::styled("_", Style::default().fg(Color::Yellow)),
      ]),
      Line::from(Span::styled(
        self.hint.as_str(),
        Style::default().fg(Color::DarkGray),
      )),
    ];
    frame.render_widget(Paragraph::new(lines), inner);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crossterm::event::{KeyCode, KeyModifiers};

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  #[test]
  fn test_inactive_prompt_passes_keys_through() {
    let mut prompt = Prompt::new();
    assert_eq!(prompt.handle_key(key(KeyCode::Char('e'))), KeyResult::NotHandled);
  }

  #[test]
  fn test_submit_reports_action_key() {
    let mut prompt = Prompt::new();
    prompt.show('e', "Edit grade", "1.00 to 5.00", "2.50");
    prompt.handle_key(key(KeyCode::Backspace));
    prompt.handle_key(key(KeyCode::Char('5')));

    assert_eq!(
      prompt.handle_key(key(KeyCode::Enter)),
      KeyResult::Event(PromptEvent::Submitted {
        key: 'e',
        value: "2.55".to_string()
      })
    );
    assert!(!prompt.is_active());
  }

  #[test]
  fn test_escape_cancels() {
    let mut prompt = Prompt::new();
    prompt.show('b', "Assign block", "e.g. BSIT-1A", "");
    assert_eq!(prompt.handle_key(key(KeyCode::Tab)), KeyResult::Handled);
    assert_eq!(
      prompt.handle_key(key(KeyCode::Esc)),
      KeyResult::Event(PromptEvent::Cancelled)
    );
  }
}
