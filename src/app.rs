use crate::commands::{self, Target};
use crate::config::Config;
use crate::event::{Event, EventHandler};
use crate::school::types::{
  Course, DocumentRequest, Enrollment, GradeRecord, PaymentRecord, Program, Student,
  StudentBalance, TuitionFee,
};
use crate::school::{CachedSchoolClient, Feature, SchoolClient, Transport};
use crate::ui;
use crate::ui::components::{CommandEvent, CommandInput, KeyResult};
use crate::ui::renderfns::StatusMessage;
use crate::ui::view::{View, ViewAction};
use crate::ui::views::{ListPageView, RegistrationView};
use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{
  disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use std::io::stdout;
use std::time::Duration;
use tracing::{debug, info};

/// Main application state
pub struct App<Tr: Transport = SchoolClient> {
  /// Page or wizard filling the content area
  view: Box<dyn View>,

  /// `:` command palette
  command: CommandInput,

  /// Header title (config title or API host)
  title: String,

  school: CachedSchoolClient<Tr>,

  /// App-level message, e.g. an unknown command
  status: Option<StatusMessage>,

  should_quit: bool,
}

impl<Tr: Transport> App<Tr> {
  pub fn new(config: &Config, school: CachedSchoolClient<Tr>, start: Option<Target>) -> Self {
    let root = start
      .or_else(|| config.default_page.as_deref().and_then(resolve_page))
      .unwrap_or(Target::Page(Feature::StudentBalances));

    let view = Self::build(&school, root)
      .unwrap_or_else(|| Self::page(school.clone(), Feature::StudentBalances));

    Self {
      view,
      command: CommandInput::new(),
      title: config.display_title(),
      school,
      status: None,
      should_quit: false,
    }
  }

  pub async fn run(&mut self) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let mut events = EventHandler::new(Duration::from_millis(250));
    let result = self.event_loop(&mut terminal, &mut events).await;

    // Restore the terminal even when the loop failed
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
  }

  async fn event_loop<B: Backend>(
    &mut self,
    terminal: &mut Terminal<B>,
    events: &mut EventHandler,
  ) -> Result<()> {
    while !self.should_quit {
      terminal.draw(|frame| ui::draw(frame, self))?;

      match events.next().await {
        Some(event) => self.handle_event(event),
        None => break,
      }
    }
    Ok(())
  }

  fn handle_event(&mut self, event: Event) {
    match event {
      Event::Key(key) => self.handle_key(key),
      Event::Resize => {}
      Event::Tick => {}
    }
    // Poll async work on every event so results land during typing bursts
    self.view.tick();
  }

  /// Replace the current view with the target's; `Quit` exits instead
  fn open(&mut self, target: Target) {
    match Self::build(&self.school, target) {
      Some(view) => {
        info!(view = %view.breadcrumb_label(), "Opening view");
        self.view = view;
      }
      None => self.should_quit = true,
    }
  }

  fn build(school: &CachedSchoolClient<Tr>, target: Target) -> Option<Box<dyn View>> {
    match target {
      Target::Page(feature) => Some(Self::page(school.clone(), feature)),
      Target::Register => Some(Box::new(RegistrationView::new(school.clone()))),
      Target::Quit => None,
    }
  }

  fn page(school: CachedSchoolClient<Tr>, feature: Feature) -> Box<dyn View> {
    match feature {
      Feature::Students => Box::new(ListPageView::<Student, Tr>::new(school)),
      Feature::StudentBalances => Box::new(ListPageView::<StudentBalance, Tr>::new(school)),
      Feature::Payments => Box::new(ListPageView::<PaymentRecord, Tr>::new(school)),
      Feature::Enrollments => Box::new(ListPageView::<Enrollment, Tr>::new(school)),
      Feature::Courses => Box::new(ListPageView::<Course, Tr>::new(school)),
      Feature::Grades => Box::new(ListPageView::<GradeRecord, Tr>::new(school)),
      Feature::TuitionFees => Box::new(ListPageView::<TuitionFee, Tr>::new(school)),
      Feature::Programs => Box::new(ListPageView::<Program, Tr>::new(school)),
      Feature::DocumentRequests => Box::new(ListPageView::<DocumentRequest, Tr>::new(school)),
    }
  }

  fn handle_key(&mut self, key: KeyEvent) {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
      self.should_quit = true;
      return;
    }

    if self.command.is_active() || !self.view.is_capturing_input() {
      match self.command.handle_key(key) {
        KeyResult::Event(CommandEvent::Run(command)) => {
          debug!(command = command.name, "Command");
          self.status = None;
          self.open(command.target);
          return;
        }
        KeyResult::Event(CommandEvent::Unknown(input)) => {
          self.status = Some(StatusMessage::Error(format!("Unknown command: {}", input)));
          return;
        }
        KeyResult::Event(CommandEvent::Cancelled) | KeyResult::Handled => return,
        KeyResult::NotHandled => {}
      }
    }

    let action = self.view.handle_key(key);
    self.status = None;

    // Pages are opened from the palette, so leaving one quits
    if let ViewAction::Pop = action {
      self.should_quit = true;
    }
  }

  pub fn current_view(&self) -> &dyn View {
    self.view.as_ref()
  }

  pub fn current_view_mut(&mut self) -> &mut dyn View {
    self.view.as_mut()
  }

  pub fn command(&self) -> &CommandInput {
    &self.command
  }

  pub fn title(&self) -> &str {
    &self.title
  }

  /// App-level message first, then the current view's
  pub fn status(&self) -> Option<&StatusMessage> {
    self.status.as_ref().or_else(|| self.view.status())
  }

  pub fn view_breadcrumb(&self) -> Vec<String> {
    vec![self.view.breadcrumb_label()]
  }
}

/// Resolve a start page given as a command name, alias or cache key
pub fn resolve_page(name: &str) -> Option<Target> {
  match commands::find(name).map(|c| c.target) {
    Some(Target::Quit) => None,
    Some(target) => Some(target),
    None => Feature::from_name(name).map(Target::Page),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::CacheConfig;
  use crate::school::fake::FakeTransport;
  use crate::store::MemoryStore;
  use ratatui::backend::TestBackend;
  use std::sync::Arc;

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  fn config() -> Config {
    Config::parse("api:\n  base_url: \"https://portal.example.edu\"\n").unwrap()
  }

  fn app(start: Option<Target>) -> App<FakeTransport> {
    let school = CachedSchoolClient::new(
      FakeTransport::new(),
      Arc::new(MemoryStore::new()),
      CacheConfig::default(),
    );
    App::new(&config(), school, start)
  }

  fn run_command(app: &mut App<FakeTransport>, command: &str) {
    app.handle_key(key(KeyCode::Char(':')));
    for c in command.chars() {
      app.handle_key(key(KeyCode::Char(c)));
    }
    app.handle_key(key(KeyCode::Enter));
  }

  #[tokio::test]
  async fn test_default_root_page() {
    let app = app(None);
    assert_eq!(app.view_breadcrumb(), vec!["Student Balances"]);
    assert_eq!(app.title(), "portal.example.edu");
  }

  #[tokio::test]
  async fn test_page_argument_wins() {
    let app = app(Some(Target::Page(Feature::Grades)));
    assert_eq!(app.view_breadcrumb(), vec!["Grades"]);
  }

  #[tokio::test]
  async fn test_command_replaces_root() {
    let mut app = app(None);
    run_command(&mut app, "docs");
    assert_eq!(app.view_breadcrumb(), vec!["Document Requests"]);

    run_command(&mut app, "register");
    assert_eq!(app.view_breadcrumb(), vec!["Registration"]);
  }

  #[tokio::test]
  async fn test_unknown_command_reports_error() {
    let mut app = app(None);
    run_command(&mut app, "zzz");
    assert_eq!(
      app.status(),
      Some(&StatusMessage::Error("Unknown command: zzz".to_string()))
    );
    assert_eq!(app.view_breadcrumb(), vec!["Student Balances"]);
  }

  #[tokio::test]
  async fn test_registration_keeps_colon_as_text() {
    let mut app = app(None);
    run_command(&mut app, "register");
    app.handle_key(key(KeyCode::Char(':')));
    assert!(!app.command().is_active());
  }

  #[tokio::test]
  async fn test_back_and_ctrl_c_quit() {
    let mut popped = app(None);
    popped.handle_key(key(KeyCode::Char('q')));
    assert!(popped.should_quit);

    let mut interrupted = app(None);
    interrupted.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
    assert!(interrupted.should_quit);
  }

  #[tokio::test]
  async fn test_quit_command_and_quit_start() {
    let mut quitting = app(None);
    run_command(&mut quitting, "quit");
    assert!(quitting.should_quit);

    // Quit is not a page; startup falls back to the default one
    let started = app(Some(Target::Quit));
    assert_eq!(started.view_breadcrumb(), vec!["Student Balances"]);
    assert!(!started.should_quit);
  }

  #[tokio::test]
  async fn test_draw_full_frame() {
    let mut app = app(Some(Target::Page(Feature::Payments)));
    let mut terminal = Terminal::new(TestBackend::new(140, 20)).unwrap();
    terminal.draw(|frame| ui::draw(frame, &mut app)).unwrap();

    let text: String = terminal
      .backend()
      .buffer()
      .content()
      .iter()
      .map(|cell| cell.symbol())
      .collect();
    assert!(text.contains("OLSHCOnnect"));
    assert!(text.contains("<v> verify"));
    assert!(text.contains("Payments"));
  }

  #[test]
  fn test_resolve_page() {
    assert_eq!(resolve_page("bal"), Some(Target::Page(Feature::StudentBalances)));
    assert_eq!(resolve_page("tuitionFees"), Some(Target::Page(Feature::TuitionFees)));
    assert_eq!(resolve_page("register"), Some(Target::Register));
    assert_eq!(resolve_page("quit"), None);
    assert_eq!(resolve_page("nope"), None);
  }
}
