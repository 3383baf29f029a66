use super::KeyResult;
use crate::ui::renderfns::truncate;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

/// Events emitted by the filter bar
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterBarEvent {
  /// A different category is now shown
  CategoryChanged,
  /// The shown category's filter should become this value (`None` = All)
  ValueChanged(Option<String>),
}

/// Tab strip for the categorical filters of a list page.
///
/// `f` cycles through the page's categories (and finally hides the bar);
/// PageUp/PageDown step through "All" and the category's distinct values.
/// The bar holds no filter state itself: values come from the records and
/// the current selection from the page's `ListQuery`.
#[derive(Debug, Clone)]
pub struct FilterBar<C> {
  categories: Vec<(C, &'static str)>,
  current: Option<usize>,
}

impl<C: Copy> FilterBar<C> {
  pub fn new(categories: Vec<(C, &'static str)>) -> Self {
    Self {
      categories,
      current: None,
    }
  }

  pub fn is_active(&self) -> bool {
    self.current.is_some()
  }

  /// Category currently shown
  pub fn category(&self) -> Option<C> {
    self.current.map(|i| self.categories[i].0)
  }

  fn label(&self) -> Option<&'static str> {
    self.current.map(|i| self.categories[i].1)
  }

  /// Show the next category, hiding the bar after the last one
  pub fn cycle_category(&mut self) {
    self.current = match self.current {
      None if !self.categories.is_empty() => Some(0),
      Some(i) if i + 1 < self.categories.len() => Some(i + 1),
      _ => None,
    };
  }

  /// Handle a key event given the shown category's values and selection
  pub fn handle_key(
    &mut self,
    key: KeyEvent,
    values: &[String],
    selected: Option<&str>,
  ) -> KeyResult<FilterBarEvent> {
    match key.code {
      KeyCode::Char('f') => {
        self.cycle_category();
        KeyResult::Event(FilterBarEvent::CategoryChanged)
      }
      KeyCode::PageUp if self.is_active() => {
        KeyResult::Event(FilterBarEvent::ValueChanged(step(values, selected, -1)))
      }
      KeyCode::PageDown if self.is_active() => {
        KeyResult::Event(FilterBarEvent::ValueChanged(step(values, selected, 1)))
      }
      _ => KeyResult::NotHandled,
    }
  }

  /// Render the filter bar
  pub fn render(&self, frame: &mut Frame, area: Rect, values: &[String], selected: Option<&str>) {
    let Some(label) = self.label() else {
      return;
    };

    let tab_style = |is_selected: bool| {
      if is_selected {
        Style::default().fg(Color::Black).bg(Color::Cyan)
      } else {
        Style::default().fg(Color::Gray)
      }
    };

    let mut spans = vec![
      Span::styled(format!("[{}] ", label), Style::default().fg(Color::Yellow)),
      Span::styled(" All ", tab_style(selected.is_none())),
    ];

    for value in values {
      spans.push(Span::styled("│", Style::default().fg(Color::DarkGray)));
      spans.push(Span::styled(
        format!(" {} ", truncate(value, 18)),
        tab_style(selected == Some(value.as_str())),
      ));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
  }
}

/// Move through "All" followed by `values`, wrapping at both ends
fn step(values: &[String], selected: Option<&str>, direction: i32) -> Option<String> {
  // 0 = All, 1.. = values
  let total = values.len() + 1;
  let position = selected
    .and_then(|s| values.iter().position(|v| v == s))
    .map(|i| i + 1)
    .unwrap_or(0);

  let next = if direction > 0 {
    (position + 1) % total
  } else {
    (position + total - 1) % total
  };

  next.checked_sub(1).map(|i| values[i].clone())
}
