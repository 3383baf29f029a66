pub mod components;
pub mod renderfns;
pub mod view;
pub mod views;

use crate::app::App;
use crate::school::Transport;
use ratatui::prelude::*;
use ratatui::widgets::TableState;
use renderfns::{draw_footer, draw_header};

/// Main draw function
pub fn draw<Tr: Transport>(frame: &mut Frame, app: &mut App<Tr>) {
  let chunks = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Length(1), // Header
      Constraint::Min(1),    // Main content
      Constraint::Length(1), // Footer
    ])
    .split(frame.area());

  let view = app.current_view();
  let (page, shortcuts) = (view.breadcrumb_label(), view.shortcuts());
  draw_header(frame, chunks[0], app.title(), &page, &shortcuts);

  app.current_view_mut().render(frame, chunks[1]);

  draw_footer(frame, chunks[2], &app.view_breadcrumb(), app.status());

  // Palette floats over the content area
  app.command().render_overlay(frame, chunks[1]);
}

/// Keep a table selection inside `0..len`, selecting the first row when
/// rows exist and nothing is selected.
pub fn ensure_valid_selection(state: &mut TableState, len: usize) {
  if len == 0 {
    state.select(None);
    return;
  }
  match state.selected() {
    Some(i) if i >= len => state.select(Some(len - 1)),
    None => state.select(Some(0)),
    _ => {}
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_ensure_valid_selection() {
    let mut state = TableState::default();
    ensure_valid_selection(&mut state, 3);
    assert_eq!(state.selected(), Some(0));

    state.select(Some(7));
    ensure_valid_selection(&mut state, 3);
    assert_eq!(state.selected(), Some(2));

    ensure_valid_selection(&mut state, 0);
    assert_eq!(state.selected(), None);
  }
}
