use crate::cache::CachedQuery;
use crate::listing::{shape, unique_values, ListQuery, SortDirection};
use crate::query::{Query, QueryState};
use crate::school::{CachedSchoolClient, SchoolClient, Transport};
use crate::ui::components::{
  FilterBar, FilterBarEvent, KeyResult, Prompt, PromptEvent, SearchEvent, SearchInput,
};
use crate::ui::ensure_valid_selection;
use crate::ui::renderfns::StatusMessage;
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Row, Table, TableState};

use super::pages::{ActionStart, PageRecord};

/// One list page per feature: cached rows shaped by search, filters, sort
/// and paging, plus the record type's row actions.
pub struct ListPageView<R: PageRecord, Tr: Transport = SchoolClient> {
  school: CachedSchoolClient<Tr>,
  query: CachedQuery<Vec<R>>,
  list: ListQuery<R>,
  table_state: TableState,
  search: SearchInput,
  filters: FilterBar<R::Category>,
  prompt: Prompt,
  /// Row the open prompt acts on
  prompt_target: Option<R>,
  action: Query<String>,
  /// Index into `R::columns()` of the sort column
  sort_column: Option<usize>,
  status: Option<StatusMessage>,
}

impl<R: PageRecord, Tr: Transport> ListPageView<R, Tr> {
  pub fn new(school: CachedSchoolClient<Tr>) -> Self {
    // Seeded synchronously from the cache, then exactly one load on mount
    let mut query = school.query::<Vec<R>>(R::FEATURE);
    query.load(false);

    Self {
      school,
      query,
      list: ListQuery::new(R::FEATURE.page_size()),
      table_state: TableState::default(),
      search: SearchInput::new(),
      filters: FilterBar::new(R::categories()),
      prompt: Prompt::new(),
      prompt_target: None,
      action: Query::new(),
      sort_column: None,
      status: None,
    }
  }

  fn records(&self) -> &[R] {
    self.query.data().map(Vec::as_slice).unwrap_or(&[])
  }

  fn page_count(&self) -> usize {
    shape(self.records(), &self.list).page_count
  }

  fn selected_record(&self) -> Option<R> {
    let view = shape(self.records(), &self.list);
    let index = self.table_state.selected().unwrap_or(0);
    view.rows.get(index).map(|r| (*r).clone())
  }

  /// Distinct values of the shown filter category and its current selection
  fn filter_values(&self) -> (Vec<String>, Option<String>) {
    match self.filters.category() {
      Some(category) => (
        unique_values(self.records(), category),
        self.list.filter_value(category).map(String::from),
      ),
      None => (Vec::new(), None),
    }
  }

  fn reset_page(&mut self) {
    self.list.page = 1;
    self.table_state.select(Some(0));
  }

  fn cycle_sort(&mut self) {
    let columns = R::columns();
    self.sort_column = match self.sort_column {
      None if !columns.is_empty() => Some(0),
      Some(i) if i + 1 < columns.len() => Some(i + 1),
      _ => None,
    };
    self.list.sort = self
      .sort_column
      .map(|i| (columns[i].sort, SortDirection::Ascending));
  }

  fn flip_sort(&mut self) {
    if let Some((column, direction)) = self.list.sort {
      self.list.sort = Some((column, direction.flip()));
    }
  }

  fn start_action(&mut self, key: char, input: &str, record: &R) {
    match record.perform(key, input, &self.school) {
      Ok(future) => {
        self.action.start(future);
        self.status = Some(StatusMessage::Info("Saving...".to_string()));
      }
      Err(message) => self.status = Some(StatusMessage::Error(message)),
    }
  }

  fn trigger(&mut self, key: char) {
    if self.action.is_running() {
      self.status = Some(StatusMessage::Info(
        "Still saving the previous change".to_string(),
      ));
      return;
    }
    let Some(record) = self.selected_record() else {
      self.status = Some(StatusMessage::Info("Select a row first".to_string()));
      return;
    };

    match record.prepare(key) {
      ActionStart::Run => self.start_action(key, "", &record),
      ActionStart::Ask {
        title,
        hint,
        initial,
      } => {
        self.prompt.show(key, title, hint, &initial);
        self.prompt_target = Some(record);
      }
      ActionStart::Unavailable(message) => self.status = Some(StatusMessage::Info(message)),
    }
  }

  fn title(&self) -> String {
    let name = R::FEATURE.title();
    if self.query.is_loading() {
      format!(" {} (loading...) ", name)
    } else if let Some(error) = self.query.error() {
      format!(" {} (error: {}) ", name, error)
    } else {
      format!(" {} ({}) ", name, self.records().len())
    }
  }

  fn render_table(&mut self, frame: &mut Frame, area: Rect) {
    let block = Block::default()
      .title(self.title())
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    let columns = R::columns();
    let view = shape(self.records(), &self.list);

    if view.rows.is_empty() {
      let content = if self.query.is_loading() {
        "Loading..."
      } else if self.query.error().is_some() {
        "Failed to load records. Press 'r' to retry."
      } else if self.records().is_empty() {
        "No records found."
      } else {
        "No records match the current search and filters."
      };
      let paragraph = Paragraph::new(content)
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    }

    let header = Row::new(columns.iter().map(|c| {
      let marker = match self.list.sort {
        Some((column, direction)) if column == c.sort => format!(" {}", direction.arrow()),
        _ => String::new(),
      };
      format!("{}{}", c.title, marker)
    }))
    .style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD));

    let rows: Vec<Row> = view.rows.iter().map(|r| Row::new(r.cells())).collect();
    let row_count = rows.len();
    let page = view.page;

    let table = Table::new(rows, columns.iter().map(|c| c.width))
      .header(header)
      .block(block)
      .row_highlight_style(
        Style::default()
          .bg(Color::DarkGray)
          .add_modifier(Modifier::BOLD),
      )
      .highlight_symbol("> ");

    // Keep the query's page in step with the clamped one
    self.list.page = page;
    ensure_valid_selection(&mut self.table_state, row_count);
    frame.render_stateful_widget(table, area, &mut self.table_state);
  }

  fn render_page_info(&self, frame: &mut Frame, area: Rect) {
    let view = shape(self.records(), &self.list);
    let mut spans = vec![Span::styled(
      format!(
        " Page {} of {} · {} of {} records",
        view.page,
        view.page_count.max(1),
        view.total_matches,
        self.records().len()
      ),
      Style::default().fg(Color::DarkGray),
    )];

    if !self.list.search.is_empty() {
      spans.push(Span::styled(
        format!("  /{}", self.list.search),
        Style::default().fg(Color::Yellow),
      ));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
  }

  // Key handling helpers for or_else chain pattern
  fn handle_overlays(&mut self, key: KeyEvent) -> Option<ViewAction> {
    match self.prompt.handle_key(key) {
      KeyResult::Event(PromptEvent::Submitted { key, value }) => {
        if let Some(record) = self.prompt_target.take() {
          self.start_action(key, &value, &record);
        }
        return Some(ViewAction::None);
      }
      KeyResult::Event(PromptEvent::Cancelled) => {
        self.prompt_target = None;
        return Some(ViewAction::None);
      }
      KeyResult::Handled => return Some(ViewAction::None),
      KeyResult::NotHandled => {}
    }

    match self.search.handle_key(key) {
      KeyResult::Event(SearchEvent::Changed(term)) => {
        self.list.search = term;
        self.reset_page();
        Some(ViewAction::None)
      }
      KeyResult::Event(SearchEvent::Submitted) | KeyResult::Handled => Some(ViewAction::None),
      KeyResult::NotHandled => None,
    }
  }

  fn handle_filters(&mut self, key: KeyEvent) -> Option<ViewAction> {
    let (values, selected) = self.filter_values();
    match self.filters.handle_key(key, &values, selected.as_deref()) {
      KeyResult::Event(FilterBarEvent::ValueChanged(value)) => {
        if let Some(category) = self.filters.category() {
          match value {
            Some(value) => self.list.set_filter(category, value),
            None => self.list.clear_filter(category),
          }
          self.reset_page();
        }
        Some(ViewAction::None)
      }
      KeyResult::Event(FilterBarEvent::CategoryChanged) | KeyResult::Handled => {
        Some(ViewAction::None)
      }
      KeyResult::NotHandled => None,
    }
  }

  fn handle_navigation(&mut self, key: KeyEvent) -> Option<ViewAction> {
    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.table_state.select_next(),
      KeyCode::Char('k') | KeyCode::Up => self.table_state.select_previous(),
      KeyCode::Char('n') | KeyCode::Right => {
        if self.list.page < self.page_count() {
          self.list.page += 1;
          self.table_state.select(Some(0));
        }
      }
      KeyCode::Char('p') | KeyCode::Left => {
        if self.list.page > 1 {
          self.list.page -= 1;
          self.table_state.select(Some(0));
        }
      }
      _ => return None,
    }
    Some(ViewAction::None)
  }

  fn handle_actions(&mut self, key: KeyEvent) -> Option<ViewAction> {
    match key.code {
      KeyCode::Char('s') => self.cycle_sort(),
      KeyCode::Char('S') => self.flip_sort(),
      KeyCode::Char('c') => {
        self.list.filters.clear();
        self.list.search.clear();
        self.search.clear();
        self.reset_page();
      }
      KeyCode::Char('r') => {
        self.query.refresh();
        self.status = Some(StatusMessage::Info("Refreshing...".to_string()));
      }
      KeyCode::Char('q') | KeyCode::Esc => return Some(ViewAction::Pop),
      KeyCode::Char(c) if R::actions().iter().any(|a| a.key == c) => self.trigger(c),
      _ => return None,
    }
    Some(ViewAction::None)
  }
}

impl<R: PageRecord, Tr: Transport> View for ListPageView<R, Tr> {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    self
      .handle_overlays(key)
      .or_else(|| self.handle_filters(key))
      .or_else(|| self.handle_navigation(key))
      .or_else(|| self.handle_actions(key))
      .unwrap_or(ViewAction::None)
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let filter_height = u16::from(self.filters.is_active());
    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([
        Constraint::Length(filter_height),
        Constraint::Min(3),
        Constraint::Length(1),
      ])
      .split(area);

    let (values, selected) = self.filter_values();
    self
      .filters
      .render(frame, chunks[0], &values, selected.as_deref());
    self.render_table(frame, chunks[1]);
    self.render_page_info(frame, chunks[2]);

    self.search.render_overlay(frame, area);
    self.prompt.render_overlay(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    R::FEATURE.title().to_string()
  }

  fn tick(&mut self) {
    self.query.poll();

    let refresh = match self.action.poll() {
      Some(QueryState::Success(message)) => {
        self.status = Some(StatusMessage::Info(message.clone()));
        true
      }
      Some(QueryState::Error(error)) => {
        self.status = Some(StatusMessage::Error(error.clone()));
        true
      }
      _ => false,
    };

    // Mutations drop the cache up front, so this is a real refetch
    if refresh {
      self.query.refresh();
    }
  }

  fn is_capturing_input(&self) -> bool {
    self.search.is_active() || self.prompt.is_active()
  }

  fn status(&self) -> Option<&StatusMessage> {
    self.status.as_ref()
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    let mut shortcuts = vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("/", "search").with_priority(20),
      ShortcutInfo::new("f", "filter").with_priority(30),
      ShortcutInfo::new("s", "sort").with_priority(40),
      ShortcutInfo::new("r", "refresh").with_priority(50),
    ];
    shortcuts.extend(
      R::actions()
        .into_iter()
        .map(|a| ShortcutInfo::new(a.key, a.label).with_priority(60)),
    );
    shortcuts
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::now_millis;
  use crate::config::CacheConfig;
  use crate::school::fake::FakeTransport;
  use crate::school::types::{Enrollment, PaymentCategory, PaymentRecord, StudentBalance};
  use crate::store::{KeyValueStore, MemoryStore};
  use crossterm::event::KeyModifiers;
  use ratatui::backend::TestBackend;
  use ratatui::Terminal;
  use serde_json::{json, Value};
  use std::sync::Arc;
  use std::time::Duration;

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  fn seed(store: &MemoryStore, name: &str, payload: Value, age_ms: i64) {
    store
      .set(&format!("{}Data", name), &payload.to_string())
      .unwrap();
    store
      .set(
        &format!("{}Timestamp", name),
        &(now_millis() - age_ms).to_string(),
      )
      .unwrap();
  }

  fn school(transport: &FakeTransport, store: &Arc<MemoryStore>) -> CachedSchoolClient<FakeTransport> {
    CachedSchoolClient::new(transport.clone(), store.clone(), CacheConfig::default())
  }

  fn screen<V: View>(view: &mut V) -> String {
    let mut terminal = Terminal::new(TestBackend::new(100, 16)).unwrap();
    terminal
      .draw(|frame| view.render(frame, frame.area()))
      .unwrap();

    let buffer = terminal.backend().buffer();
    let width = buffer.area.width as usize;
    buffer
      .content()
      .chunks(width)
      .map(|row| row.iter().map(|cell| cell.symbol()).collect::<String>())
      .collect::<Vec<_>>()
      .join("\n")
  }

  async fn settle<R: PageRecord>(view: &mut ListPageView<R, FakeTransport>) {
    for _ in 0..50 {
      view.tick();
      if view.query.in_flight() == 0 && !view.action.is_running() {
        return;
      }
      tokio::time::sleep(Duration::from_millis(5)).await;
    }
  }

  fn balances() -> Value {
    json!([
      {"student_id": 1, "student_name": "Smith, John", "balance": 500,
       "semester": "1st", "program_name": "BSIT"},
      {"student_id": 2, "student_name": "Reyes, Ana", "balance": "0.00",
       "semester": "1st", "program_name": "BSED"}
    ])
  }

  fn payments(count: usize) -> Value {
    Value::Array(
      (1..=count)
        .map(|i| {
          json!({
            "id": i, "student_id": i, "student_name": format!("Student {:02}", i),
            "amount": 100 * i, "reference_number": format!("OR-{:04}", i),
            "payment_method": if i % 2 == 0 { "GCash" } else { "Cash" },
            "payment_date": "2024-08-01", "status": "Pending"
          })
        })
        .collect(),
    )
  }

  #[tokio::test]
  async fn test_fresh_cache_paints_without_loading() {
    let store = Arc::new(MemoryStore::new());
    let transport = FakeTransport::new();
    seed(&store, "studentBalances", balances(), 10_000);
    transport.reply_after(
      "/api/student-balances",
      Duration::from_millis(20),
      Ok(balances()),
    );

    let mut view = ListPageView::<StudentBalance, _>::new(school(&transport, &store));
    let text = screen(&mut view);
    assert!(text.contains("Smith, John"));
    assert!(text.contains("₱500.00"));
    assert!(text.contains("With Balance"));
    assert!(text.contains("Fully Paid"));
    assert!(!text.contains("loading"));

    settle(&mut view).await;
    assert!(!screen(&mut view).contains("loading"));
    assert_eq!(transport.calls_to("/api/student-balances"), 1);
  }

  #[tokio::test]
  async fn test_cold_cache_shows_loading_until_fetch_lands() {
    let store = Arc::new(MemoryStore::new());
    let transport = FakeTransport::new();
    transport.reply_after(
      "/api/student-balances",
      Duration::from_millis(20),
      Ok(balances()),
    );

    let mut view = ListPageView::<StudentBalance, _>::new(school(&transport, &store));
    assert!(screen(&mut view).contains("loading"));

    settle(&mut view).await;
    let text = screen(&mut view);
    assert!(!text.contains("loading"));
    assert!(text.contains("Reyes, Ana"));
    assert!(store.get("studentBalancesData").is_some());
  }

  #[tokio::test]
  async fn test_search_filter_and_paging() {
    let store = Arc::new(MemoryStore::new());
    let transport = FakeTransport::new();
    seed(&store, "payments", payments(25), 1_000);

    let mut view = ListPageView::<PaymentRecord, _>::new(school(&transport, &store));
    assert_eq!(view.page_count(), 3);

    view.handle_key(key(KeyCode::Char('n')));
    view.handle_key(key(KeyCode::Char('n')));
    view.handle_key(key(KeyCode::Char('n')));
    assert_eq!(view.list.page, 3);
    assert!(screen(&mut view).contains("Student 25"));

    // Filter tab "Status" shows first; step to its only value
    view.handle_key(key(KeyCode::Char('f')));
    view.handle_key(key(KeyCode::PageDown));
    assert_eq!(view.list.filter_value(PaymentCategory::Status), Some("Pending"));
    assert_eq!(view.list.page, 1);

    view.handle_key(key(KeyCode::Char('/')));
    for c in "student 1".chars() {
      view.handle_key(key(KeyCode::Char(c)));
    }
    view.handle_key(key(KeyCode::Enter));
    let text = screen(&mut view);
    assert!(text.contains("Student 10"));
    assert!(!text.contains("Student 20"));
    assert!(text.contains("10 of 25 records"));

    view.handle_key(key(KeyCode::Char('c')));
    assert!(view.list.filters.is_empty());
    assert!(view.list.search.is_empty());
  }

  #[tokio::test]
  async fn test_sort_cycles_columns() {
    let store = Arc::new(MemoryStore::new());
    let transport = FakeTransport::new();
    seed(&store, "payments", payments(3), 1_000);

    let mut view = ListPageView::<PaymentRecord, _>::new(school(&transport, &store));
    view.handle_key(key(KeyCode::Char('s')));
    view.handle_key(key(KeyCode::Char('s')));
    assert!(screen(&mut view).contains("Name ▲"));

    view.handle_key(key(KeyCode::Char('S')));
    view.table_state.select(Some(0));
    assert_eq!(view.selected_record().unwrap().student_name, "Student 03");
  }

  #[tokio::test]
  async fn test_verify_action_refreshes_page() {
    let store = Arc::new(MemoryStore::new());
    let transport = FakeTransport::new();
    seed(&store, "payments", payments(1), 1_000);

    let mut verified = payments(1);
    verified[0]["status"] = json!("Verified");
    // Background reconcile on mount, then the refetch after verifying
    transport.reply("/api/payments", payments(1));
    transport.reply("/api/payments", verified);

    let mut view = ListPageView::<PaymentRecord, _>::new(school(&transport, &store));
    settle(&mut view).await;

    view.handle_key(key(KeyCode::Char('v')));
    assert!(view.action.is_running());
    settle(&mut view).await;

    assert_eq!(transport.calls_to("/api/payments/1/verify"), 1);
    assert_eq!(transport.calls_to("/api/payments"), 2);
    assert_eq!(
      view.status(),
      Some(&StatusMessage::Info("Payment OR-0001 verified".to_string()))
    );
    assert!(view.records()[0].is_verified());

    // Verified rows are not sent again
    view.handle_key(key(KeyCode::Char('v')));
    assert!(!view.action.is_running());
    assert_eq!(transport.calls_to("/api/payments/1/verify"), 1);
  }

  #[tokio::test]
  async fn test_prompt_captures_input() {
    let store = Arc::new(MemoryStore::new());
    let transport = FakeTransport::new();
    seed(
      &store,
      "enrollments",
      json!([{
        "id": 12, "student_id": 1, "student_name": "Smith, John",
        "program_name": "BSIT", "year_level": "1st Year", "semester": "1st",
        "school_year": "2024-2025", "status": "Pending"
      }]),
      1_000,
    );

    let mut view = ListPageView::<Enrollment, _>::new(school(&transport, &store));
    view.handle_key(key(KeyCode::Char('b')));
    assert!(view.is_capturing_input());

    // 'q' is text while the prompt is open
    for c in "BSIT-1Q".chars() {
      assert!(matches!(view.handle_key(key(KeyCode::Char(c))), ViewAction::None));
    }
    view.handle_key(key(KeyCode::Enter));
    assert!(!view.is_capturing_input());
    settle(&mut view).await;

    let call = transport
      .calls()
      .into_iter()
      .find(|c| c.path == "/api/enrollments/12/block")
      .unwrap();
    assert_eq!(call.body, Some(json!({"block": "BSIT-1Q"})));
  }
}
