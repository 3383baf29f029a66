//! How each record type appears on its list page: columns, filter tabs and
//! the row actions it supports.

use ratatui::layout::Constraint;
use ratatui::style::{Color, Style};
use ratatui::widgets::Cell;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::cache::BoxFuture;
use crate::listing::Listable;
use crate::school::types::*;
use crate::school::{CachedSchoolClient, Feature, Transport};
use crate::ui::renderfns::{format_currency, status_color, truncate};

/// One table column; every column sorts by its own key
#[derive(Debug, Clone, Copy)]
pub struct ColumnSpec<C> {
  pub title: &'static str,
  pub width: Constraint,
  pub sort: C,
}

fn col<C>(title: &'static str, width: Constraint, sort: C) -> ColumnSpec<C> {
  ColumnSpec { title, width, sort }
}

/// A key bound to an operation on the selected row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowAction {
  pub key: char,
  pub label: &'static str,
}

/// What to do when a row action key is pressed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionStart {
  /// Run straight away
  Run,
  /// Ask for input first
  Ask {
    title: String,
    hint: &'static str,
    initial: String,
  },
  /// The action does not apply to this row
  Unavailable(String),
}

/// A record type with its own list page.
pub trait PageRecord:
  Listable + Clone + Send + Sync + Serialize + DeserializeOwned + 'static
{
  const FEATURE: Feature;

  fn columns() -> Vec<ColumnSpec<Self::Column>>;

  /// Filter tabs, in `f` cycling order
  fn categories() -> Vec<(Self::Category, &'static str)>;

  /// Table cells, one per column
  fn cells(&self) -> Vec<Cell<'static>>;

  fn actions() -> Vec<RowAction> {
    Vec::new()
  }

  fn prepare(&self, _key: char) -> ActionStart {
    ActionStart::Run
  }

  /// Build the request for `key`. The future resolves to a message for the
  /// footer; `Err` rejects the input without sending anything.
  fn perform<Tr: Transport>(
    &self,
    key: char,
    _input: &str,
    _school: &CachedSchoolClient<Tr>,
  ) -> Result<BoxFuture<String>, String> {
    Err(format!("No action bound to '{}'", key))
  }
}

fn text(value: &str, max: usize) -> Cell<'static> {
  Cell::from(truncate(value, max))
}

fn status(value: &str) -> Cell<'static> {
  Cell::from(value.to_string()).style(Style::default().fg(status_color(value)))
}

fn money(amount: f64) -> Cell<'static> {
  Cell::from(format_currency(amount))
}

fn dim(value: &str) -> Cell<'static> {
  Cell::from(value.to_string()).style(Style::default().fg(Color::DarkGray))
}

// ---------------------------------------------------------------------------

impl PageRecord for Student {
  const FEATURE: Feature = Feature::Students;

  fn columns() -> Vec<ColumnSpec<StudentColumn>> {
    vec![
      col("Student No.", Constraint::Length(12), StudentColumn::Number),
      col("Name", Constraint::Min(24), StudentColumn::Name),
      col("Program", Constraint::Length(10), StudentColumn::Program),
      col("Year", Constraint::Length(9), StudentColumn::YearLevel),
      col("Status", Constraint::Length(12), StudentColumn::Status),
    ]
  }

  fn categories() -> Vec<(StudentCategory, &'static str)> {
    vec![
      (StudentCategory::Program, "Program"),
      (StudentCategory::YearLevel, "Year"),
      (StudentCategory::Status, "Status"),
    ]
  }

  fn cells(&self) -> Vec<Cell<'static>> {
    vec![
      Cell::from(self.student_number.clone()).style(Style::default().fg(Color::Cyan)),
      text(&self.display_name(), 40),
      text(&self.program_name, 10),
      text(&self.year_level, 9),
      status(&self.status),
    ]
  }

  fn actions() -> Vec<RowAction> {
    vec![RowAction {
      key: 'd',
      label: "request document",
    }]
  }

  fn prepare(&self, _key: char) -> ActionStart {
    ActionStart::Ask {
      title: format!("Document request for {}", self.display_name()),
      hint: "type; purpose",
      initial: String::new(),
    }
  }

  fn perform<Tr: Transport>(
    &self,
    key: char,
    input: &str,
    school: &CachedSchoolClient<Tr>,
  ) -> Result<BoxFuture<String>, String> {
    if key != 'd' {
      return Err(format!("No action bound to '{}'", key));
    }

    let (document_type, purpose) = match input.split_once(';') {
      Some((document_type, purpose)) => (document_type.trim(), purpose.trim()),
      None => (input.trim(), ""),
    };
    if document_type.is_empty() {
      return Err("Document type is required".to_string());
    }

    let request = NewDocumentRequest {
      student_id: self.id,
      document_type: document_type.to_string(),
      purpose: purpose.to_string(),
    };
    let school = school.clone();
    Ok(Box::pin(async move {
      school
        .request_document(&request)
        .await
        .map(|()| format!("Requested {}", request.document_type))
    }))
  }
}

impl PageRecord for StudentBalance {
  const FEATURE: Feature = Feature::StudentBalances;

  fn columns() -> Vec<ColumnSpec<BalanceColumn>> {
    vec![
      col("Name", Constraint::Min(24), BalanceColumn::Name),
      col("Program", Constraint::Length(10), BalanceColumn::Program),
      col("Semester", Constraint::Length(9), BalanceColumn::Semester),
      col("Balance", Constraint::Length(16), BalanceColumn::Balance),
      col("Status", Constraint::Length(14), BalanceColumn::Status),
    ]
  }

  fn categories() -> Vec<(BalanceCategory, &'static str)> {
    vec![
      (BalanceCategory::Status, "Status"),
      (BalanceCategory::Program, "Program"),
      (BalanceCategory::Semester, "Semester"),
    ]
  }

  fn cells(&self) -> Vec<Cell<'static>> {
    vec![
      text(&self.student_name, 40),
      text(&self.program_name, 10),
      text(&self.semester, 9),
      money(self.balance),
      status(self.status().label()),
    ]
  }
}

impl PageRecord for PaymentRecord {
  const FEATURE: Feature = Feature::Payments;

  fn columns() -> Vec<ColumnSpec<PaymentColumn>> {
    vec![
      col("Date", Constraint::Length(11), PaymentColumn::Date),
      col("Name", Constraint::Min(22), PaymentColumn::Name),
      col("Reference", Constraint::Length(14), PaymentColumn::Reference),
      col("Method", Constraint::Length(10), PaymentColumn::Method),
      col("Amount", Constraint::Length(14), PaymentColumn::Amount),
      col("Status", Constraint::Length(10), PaymentColumn::Status),
    ]
  }

  fn categories() -> Vec<(PaymentCategory, &'static str)> {
    vec![
      (PaymentCategory::Status, "Status"),
      (PaymentCategory::Method, "Method"),
    ]
  }

  fn cells(&self) -> Vec<Cell<'static>> {
    vec![
      dim(&self.payment_date),
      text(&self.student_name, 36),
      text(&self.reference_number, 14),
      text(&self.payment_method, 10),
      money(self.amount),
      status(&self.status),
    ]
  }

  fn actions() -> Vec<RowAction> {
    vec![RowAction {
      key: 'v',
      label: "verify",
    }]
  }

  fn prepare(&self, _key: char) -> ActionStart {
    if self.is_verified() {
      ActionStart::Unavailable("Payment already verified".to_string())
    } else {
      ActionStart::Run
    }
  }

  fn perform<Tr: Transport>(
    &self,
    key: char,
    _input: &str,
    school: &CachedSchoolClient<Tr>,
  ) -> Result<BoxFuture<String>, String> {
    if key != 'v' {
      return Err(format!("No action bound to '{}'", key));
    }

    let school = school.clone();
    let id = self.id;
    let reference = self.reference_number.clone();
    Ok(Box::pin(async move {
      school
        .verify_payment(id)
        .await
        .map(|()| format!("Payment {} verified", reference))
    }))
  }
}

impl PageRecord for Enrollment {
  const FEATURE: Feature = Feature::Enrollments;

  fn columns() -> Vec<ColumnSpec<EnrollmentColumn>> {
    vec![
      col("Name", Constraint::Min(24), EnrollmentColumn::Name),
      col("Program", Constraint::Length(10), EnrollmentColumn::Program),
      col("Year", Constraint::Length(9), EnrollmentColumn::YearLevel),
      col("Semester", Constraint::Length(9), EnrollmentColumn::Semester),
      col("Block", Constraint::Length(10), EnrollmentColumn::Block),
      col("Status", Constraint::Length(10), EnrollmentColumn::Status),
    ]
  }

  fn categories() -> Vec<(EnrollmentCategory, &'static str)> {
    vec![
      (EnrollmentCategory::Status, "Status"),
      (EnrollmentCategory::Program, "Program"),
      (EnrollmentCategory::YearLevel, "Year"),
      (EnrollmentCategory::Semester, "Semester"),
    ]
  }

  fn cells(&self) -> Vec<Cell<'static>> {
    vec![
      text(&self.student_name, 40),
      text(&self.program_name, 10),
      text(&self.year_level, 9),
      text(&self.semester, 9),
      match &self.block {
        Some(block) => text(block, 10),
        None => dim("-"),
      },
      status(&self.status),
    ]
  }

  fn actions() -> Vec<RowAction> {
    vec![
      RowAction {
        key: 'v',
        label: "verify",
      },
      RowAction {
        key: 'b',
        label: "block",
      },
    ]
  }

  fn prepare(&self, key: char) -> ActionStart {
    match key {
      'v' if self.status.eq_ignore_ascii_case("enrolled") => {
        ActionStart::Unavailable(format!("{} is already enrolled", self.student_name))
      }
      'b' => ActionStart::Ask {
        title: format!("Block for {}", self.student_name),
        hint: "e.g. BSIT-1A",
        initial: self.block.clone().unwrap_or_default(),
      },
      _ => ActionStart::Run,
    }
  }

  fn perform<Tr: Transport>(
    &self,
    key: char,
    input: &str,
    school: &CachedSchoolClient<Tr>,
  ) -> Result<BoxFuture<String>, String> {
    let school = school.clone();
    let id = self.id;
    let name = self.student_name.clone();

    match key {
      'v' => Ok(Box::pin(async move {
        school
          .verify_enrollment(id)
          .await
          .map(|()| format!("Enrollment of {} verified", name))
      })),
      'b' => {
        let block = input.trim().to_string();
        if block.is_empty() {
          return Err("Block name is required".to_string());
        }
        Ok(Box::pin(async move {
          school
            .assign_block(id, &block)
            .await
            .map(|()| format!("{} assigned to {}", name, block))
        }))
      }
      _ => Err(format!("No action bound to '{}'", key)),
    }
  }
}

impl PageRecord for Course {
  const FEATURE: Feature = Feature::Courses;

  fn columns() -> Vec<ColumnSpec<CourseColumn>> {
    vec![
      col("Code", Constraint::Length(10), CourseColumn::Code),
      col("Description", Constraint::Min(30), CourseColumn::Description),
      col("Units", Constraint::Length(6), CourseColumn::Units),
      col("Program", Constraint::Length(10), CourseColumn::Program),
      col("Year", Constraint::Length(9), CourseColumn::YearLevel),
      col("Semester", Constraint::Length(9), CourseColumn::Semester),
    ]
  }

  fn categories() -> Vec<(CourseCategory, &'static str)> {
    vec![
      (CourseCategory::Program, "Program"),
      (CourseCategory::YearLevel, "Year"),
      (CourseCategory::Semester, "Semester"),
    ]
  }

  fn cells(&self) -> Vec<Cell<'static>> {
    vec![
      Cell::from(self.code.clone()).style(Style::default().fg(Color::Cyan)),
      text(&self.description, 50),
      Cell::from(format!("{}", self.units)),
      text(&self.program_name, 10),
      text(&self.year_level, 9),
      text(&self.semester, 9),
    ]
  }
}

impl PageRecord for GradeRecord {
  const FEATURE: Feature = Feature::Grades;

  fn columns() -> Vec<ColumnSpec<GradeColumn>> {
    vec![
      col("Name", Constraint::Min(22), GradeColumn::Name),
      col("Course", Constraint::Min(24), GradeColumn::Course),
      col("Semester", Constraint::Length(9), GradeColumn::Semester),
      col("Grade", Constraint::Length(6), GradeColumn::Grade),
      col("Remarks", Constraint::Length(11), GradeColumn::Remarks),
    ]
  }

  fn categories() -> Vec<(GradeCategory, &'static str)> {
    vec![
      (GradeCategory::Course, "Course"),
      (GradeCategory::Semester, "Semester"),
      (GradeCategory::Remarks, "Remarks"),
    ]
  }

  fn cells(&self) -> Vec<Cell<'static>> {
    vec![
      text(&self.student_name, 36),
      Cell::from(truncate(
        &format!("{} {}", self.course_code, self.course_description),
        40,
      )),
      text(&self.semester, 9),
      match self.grade {
        Some(grade) => Cell::from(format!("{:.2}", grade)),
        None => dim("-"),
      },
      status(self.remarks()),
    ]
  }

  fn actions() -> Vec<RowAction> {
    vec![RowAction {
      key: 'e',
      label: "edit grade",
    }]
  }

  fn prepare(&self, _key: char) -> ActionStart {
    ActionStart::Ask {
      title: format!("{} · {}", self.student_name, self.course_code),
      hint: "1.00 to 5.00",
      initial: self.grade.map(|g| format!("{:.2}", g)).unwrap_or_default(),
    }
  }

  fn perform<Tr: Transport>(
    &self,
    key: char,
    input: &str,
    school: &CachedSchoolClient<Tr>,
  ) -> Result<BoxFuture<String>, String> {
    if key != 'e' {
      return Err(format!("No action bound to '{}'", key));
    }

    let entry = GradeEntry::parse(self.id, input)?;
    let school = school.clone();
    let course = self.course_code.clone();
    Ok(Box::pin(async move {
      school
        .save_grades(&[entry])
        .await
        .map(|()| format!("Grade saved for {}", course))
    }))
  }
}

impl PageRecord for TuitionFee {
  const FEATURE: Feature = Feature::TuitionFees;

  fn columns() -> Vec<ColumnSpec<FeeColumn>> {
    vec![
      col("Program", Constraint::Min(12), FeeColumn::Program),
      col("Year", Constraint::Length(9), FeeColumn::YearLevel),
      col("Semester", Constraint::Length(9), FeeColumn::Semester),
      col("Per Unit", Constraint::Length(12), FeeColumn::PerUnit),
      col("Misc", Constraint::Length(12), FeeColumn::Misc),
      col("Lab", Constraint::Length(12), FeeColumn::Lab),
    ]
  }

  fn categories() -> Vec<(FeeCategory, &'static str)> {
    vec![
      (FeeCategory::Program, "Program"),
      (FeeCategory::YearLevel, "Year"),
      (FeeCategory::Semester, "Semester"),
    ]
  }

  fn cells(&self) -> Vec<Cell<'static>> {
    vec![
      text(&self.program_name, 24),
      text(&self.year_level, 9),
      text(&self.semester, 9),
      money(self.tuition_per_unit),
      money(self.misc_fee),
      money(self.lab_fee),
    ]
  }

  fn actions() -> Vec<RowAction> {
    vec![RowAction {
      key: 'e',
      label: "edit rate",
    }]
  }

  fn prepare(&self, _key: char) -> ActionStart {
    ActionStart::Ask {
      title: format!("Per-unit rate, {} {}", self.program_name, self.year_level),
      hint: "amount in pesos",
      initial: format!("{:.2}", self.tuition_per_unit),
    }
  }

  fn perform<Tr: Transport>(
    &self,
    key: char,
    input: &str,
    school: &CachedSchoolClient<Tr>,
  ) -> Result<BoxFuture<String>, String> {
    if key != 'e' {
      return Err(format!("No action bound to '{}'", key));
    }

    let rate: f64 = input
      .trim()
      .replace(',', "")
      .parse()
      .map_err(|_| format!("'{}' is not an amount", input.trim()))?;
    if !rate.is_finite() || rate < 0.0 {
      return Err("Rate must be zero or more".to_string());
    }

    let fee = TuitionFee {
      tuition_per_unit: rate,
      ..self.clone()
    };
    let school = school.clone();
    Ok(Box::pin(async move {
      school.update_tuition_fee(&fee).await.map(|()| {
        format!(
          "{} rate set to {}",
          fee.program_name,
          format_currency(fee.tuition_per_unit)
        )
      })
    }))
  }
}

impl PageRecord for Program {
  const FEATURE: Feature = Feature::Programs;

  fn columns() -> Vec<ColumnSpec<ProgramColumn>> {
    vec![
      col("Code", Constraint::Length(10), ProgramColumn::Code),
      col("Name", Constraint::Min(30), ProgramColumn::Name),
      col("Major", Constraint::Length(20), ProgramColumn::Major),
      col("Department", Constraint::Length(20), ProgramColumn::Department),
    ]
  }

  fn categories() -> Vec<(ProgramCategory, &'static str)> {
    vec![(ProgramCategory::Department, "Department")]
  }

  fn cells(&self) -> Vec<Cell<'static>> {
    let optional = |value: &Option<String>| match value {
      Some(v) => text(v, 20),
      None => dim("-"),
    };
    vec![
      Cell::from(self.code.clone()).style(Style::default().fg(Color::Cyan)),
      text(&self.name, 50),
      optional(&self.major),
      optional(&self.department),
    ]
  }
}

impl PageRecord for DocumentRequest {
  const FEATURE: Feature = Feature::DocumentRequests;

  fn columns() -> Vec<ColumnSpec<DocumentColumn>> {
    vec![
      col("Requested", Constraint::Length(11), DocumentColumn::Requested),
      col("Name", Constraint::Min(22), DocumentColumn::Name),
      col("Document", Constraint::Min(24), DocumentColumn::Document),
      col("Status", Constraint::Length(17), DocumentColumn::Status),
    ]
  }

  fn categories() -> Vec<(DocumentCategory, &'static str)> {
    vec![
      (DocumentCategory::Status, "Status"),
      (DocumentCategory::Document, "Document"),
    ]
  }

  fn cells(&self) -> Vec<Cell<'static>> {
    vec![
      dim(&truncate(&self.requested_at, 10)),
      text(&self.student_name, 36),
      text(&self.document_type, 36),
      status(&self.status),
    ]
  }

  fn actions() -> Vec<RowAction> {
    vec![RowAction {
      key: 'x',
      label: "advance status",
    }]
  }

  fn prepare(&self, _key: char) -> ActionStart {
    match self.stage() {
      Some(DocumentStatus::Released) => {
        ActionStart::Unavailable("Document already released".to_string())
      }
      Some(_) => ActionStart::Run,
      None => ActionStart::Unavailable(format!("Unknown status '{}'", self.status)),
    }
  }

  fn perform<Tr: Transport>(
    &self,
    key: char,
    _input: &str,
    school: &CachedSchoolClient<Tr>,
  ) -> Result<BoxFuture<String>, String> {
    if key != 'x' {
      return Err(format!("No action bound to '{}'", key));
    }

    let next = self
      .stage()
      .and_then(DocumentStatus::next)
      .ok_or_else(|| "Document already released".to_string())?;
    let school = school.clone();
    let id = self.id;
    Ok(Box::pin(async move {
      school
        .update_document_status(id, next)
        .await
        .map(|()| format!("Request #{} is now {}", id, next.label()))
    }))
  }
}
