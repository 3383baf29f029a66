use crate::query::{Query, QueryState};
use crate::registration::{
  password_strength, rules_for, Check, FieldRule, PasswordStrength, RegistrationWizard, Step,
};
use crate::school::{CachedSchoolClient, SchoolClient, Transport};
use crate::ui::components::{InputResult, TextInput};
use crate::ui::renderfns::StatusMessage;
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};

/// Student self-registration, one wizard step at a time
pub struct RegistrationView<Tr: Transport = SchoolClient> {
  school: CachedSchoolClient<Tr>,
  wizard: RegistrationWizard,
  /// Index of the focused field within the current step
  focus: usize,
  input: TextInput,
  submit: Query<Option<String>>,
  status: Option<StatusMessage>,
}

fn is_secret(rule: &FieldRule) -> bool {
  rule
    .checks
    .iter()
    .any(|c| matches!(c, Check::StrongPassword | Check::Matches(_)))
}

fn hint(rule: &FieldRule) -> Option<String> {
  rule.checks.iter().find_map(|check| match check {
    Check::OneOf(options) => Some(options.join(" / ")),
    Check::Date => Some("YYYY-MM-DD".to_string()),
    Check::Phone => Some("09XXXXXXXXX".to_string()),
    _ => None,
  })
}

fn strength_color(strength: PasswordStrength) -> Color {
  match strength {
    PasswordStrength::Weak => Color::Red,
    PasswordStrength::Fair => Color::Yellow,
    PasswordStrength::Good => Color::Cyan,
    PasswordStrength::Strong => Color::Green,
  }
}

impl<Tr: Transport> RegistrationView<Tr> {
  pub fn new(school: CachedSchoolClient<Tr>) -> Self {
    Self {
      school,
      wizard: RegistrationWizard::new(),
      focus: 0,
      input: TextInput::new(),
      submit: Query::new(),
      status: None,
    }
  }

  fn fields(&self) -> Vec<&'static FieldRule> {
    rules_for(self.wizard.step()).collect()
  }

  fn focused(&self) -> Option<&'static FieldRule> {
    self.fields().get(self.focus).copied()
  }

  /// Move focus and load the field's value into the editor
  fn focus_on(&mut self, index: usize) {
    self.focus = index;
    let value = self
      .focused()
      .map(|rule| self.wizard.form().get(rule.field).to_string())
      .unwrap_or_default();
    self.input.set_value(&value);
  }

  /// Focus the first field with an error on the current step
  fn focus_first_error(&mut self) {
    let index = self
      .fields()
      .iter()
      .position(|rule| self.wizard.error_for(rule.field).is_some())
      .unwrap_or(0);
    self.focus_on(index);
  }

  fn cycle_focus(&mut self, forward: bool) {
    let count = self.fields().len();
    if count == 0 {
      return;
    }
    let next = if forward {
      (self.focus + 1) % count
    } else {
      (self.focus + count - 1) % count
    };
    self.focus_on(next);
  }

  fn advance(&mut self) {
    if !self.wizard.is_last_step() {
      if self.wizard.next() {
        self.status = None;
        self.focus_on(0);
      } else {
        self.focus_first_error();
      }
      return;
    }

    if self.submit.is_running() {
      return;
    }

    match self.wizard.submit() {
      Ok(submission) => {
        let school = self.school.clone();
        self
          .submit
          .start(async move { school.register_student(&submission).await });
        self.status = Some(StatusMessage::Info("Submitting registration...".to_string()));
      }
      Err(error) => {
        self.status = Some(StatusMessage::Error(error.to_string()));
        self.focus_first_error();
      }
    }
  }

  fn render_fields(&self, frame: &mut Frame, area: Rect) {
    let step = self.wizard.step();
    let block = Block::default()
      .title(format!(
        " Registration · Step {} of {}: {} ",
        step.number(),
        Step::ALL.len(),
        step.title()
      ))
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    let mut lines = Vec::new();
    for (index, rule) in self.fields().into_iter().enumerate() {
      let focused = index == self.focus;
      let secret = is_secret(rule);
      let required = rule.checks.contains(&Check::Required);

      let value = if focused {
        self.input.display(secret)
      } else if secret {
        "*".repeat(self.wizard.form().get(rule.field).chars().count())
      } else {
        self.wizard.form().get(rule.field).to_string()
      };

      let label_style = if focused {
        Style::default().fg(Color::Yellow).bold()
      } else {
        Style::default().fg(Color::Gray)
      };

      let mut spans = vec![
        Span::styled(if focused { "> " } else { "  " }, label_style),
        Span::styled(
          format!("{:<18}", format!("{}{}", rule.label, if required { " *" } else { "" })),
          label_style,
        ),
        Span::raw(value),
      ];
      if focused {
        spans.push(Span::styled("_", Style::default().fg(Color::Yellow)));
        if let Some(hint) = hint(rule) {
          spans.push(Span::styled(format!("   {}", hint), Style::default().fg(Color::DarkGray)));
        }
      }
      lines.push(Line::from(spans));

      if let Some(error) = self.wizard.error_for(rule.field) {
        lines.push(Line::from(Span::styled(
          format!("{:20}{}", "", error),
          Style::default().fg(Color::Red),
        )));
      }

      if rule.checks.contains(&Check::StrongPassword) {
        let password = self.wizard.form().get(rule.field);
        if !password.is_empty() {
          let strength = password_strength(password);
          lines.push(Line::from(vec![
            Span::raw(format!("{:20}", "")),
            Span::styled("Strength: ", Style::default().fg(Color::DarkGray)),
            Span::styled(strength.label(), Style::default().fg(strength_color(strength))),
          ]));
        }
      }
    }

    lines.push(Line::default());
    let enter = if self.wizard.is_last_step() {
      "Enter: submit"
    } else {
      "Enter: next step"
    };
    lines.push(Line::from(Span::styled(
      format!("  Tab/Shift-Tab: move   {}   Esc: back", enter),
      Style::default().fg(Color::DarkGray),
    )));

    frame.render_widget(Paragraph::new(lines).block(block), area);
  }
}

impl<Tr: Transport> View for RegistrationView<Tr> {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Tab | KeyCode::Down => self.cycle_focus(true),
      KeyCode::BackTab | KeyCode::Up => self.cycle_focus(false),
      KeyCode::Enter => self.advance(),
      KeyCode::Esc => {
        if !self.wizard.back() {
          return ViewAction::Pop;
        }
        self.status = None;
        self.focus_on(0);
      }
      _ => {
        if self.input.handle_key(key) == InputResult::Consumed {
          if let Some(rule) = self.focused() {
            self.wizard.set(rule.field, self.input.value());
          }
        }
      }
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    self.render_fields(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    "Registration".to_string()
  }

  fn tick(&mut self) {
    let done = match self.submit.poll() {
      Some(QueryState::Success(number)) => {
        let message = match number {
          Some(number) => format!("Registered. Student number {}", number),
          None => "Registration submitted".to_string(),
        };
        self.status = Some(StatusMessage::Info(message));
        true
      }
      Some(QueryState::Error(error)) => {
        self.status = Some(StatusMessage::Error(error.clone()));
        false
      }
      _ => false,
    };

    if done {
      self.wizard = RegistrationWizard::new();
      self.focus_on(0);
    }
  }

  fn is_capturing_input(&self) -> bool {
    true
  }

  fn status(&self) -> Option<&StatusMessage> {
    self.status.as_ref()
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new("Tab", "next field").with_priority(10),
      ShortcutInfo::new("Enter", "continue").with_priority(20),
      ShortcutInfo::new("Esc", "back").with_priority(30),
    ]
  }
}
