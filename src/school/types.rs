//! Records returned by the school API.
//!
//! Field names follow the API's snake_case JSON. Amount fields accept both
//! JSON numbers and numeric strings since decimal columns are serialized as
//! strings by some endpoints.

use serde::{Deserialize, Deserializer, Serialize};
use std::cmp::Ordering;

use crate::listing::{cmp_f64, cmp_ignore_case, Listable};

fn de_amount<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
  D: Deserializer<'de>,
{
  #[derive(Deserialize)]
  #[serde(untagged)]
  enum Amount {
    Number(f64),
    Text(String),
  }

  match Amount::deserialize(deserializer)? {
    Amount::Number(n) => Ok(n),
    Amount::Text(s) => s
      .trim()
      .replace(',', "")
      .parse()
      .map_err(|_| serde::de::Error::custom(format!("invalid amount: {}", s))),
  }
}

fn de_opt_amount<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
  D: Deserializer<'de>,
{
  #[derive(Deserialize)]
  struct Wrapper(#[serde(deserialize_with = "de_amount")] f64);

  Ok(Option::<Wrapper>::deserialize(deserializer)?.map(|Wrapper(n)| n))
}

// ---------------------------------------------------------------------------
// Students
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
  pub id: i64,
  pub student_number: String,
  pub last_name: String,
  pub first_name: String,
  #[serde(default)]
  pub middle_name: Option<String>,
  pub email: String,
  pub program_name: String,
  pub year_level: String,
  pub status: String,
}

impl Student {
  /// "Last, First M."
  pub fn display_name(&self) -> String {
    match self.middle_name.as_deref().and_then(|m| m.chars().next()) {
      Some(initial) => format!("{}, {} {}.", self.last_name, self.first_name, initial),
      None => format!("{}, {}", self.last_name, self.first_name),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StudentColumn {
  Number,
  Name,
  Program,
  YearLevel,
  Status,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StudentCategory {
  Program,
  YearLevel,
  Status,
}

impl Listable for Student {
  type Column = StudentColumn;
  type Category = StudentCategory;

  fn search_fields(&self) -> Vec<&str> {
    vec![
      self.last_name.as_str(),
      self.first_name.as_str(),
      self.student_number.as_str(),
      self.email.as_str(),
    ]
  }

  fn category_value(&self, category: StudentCategory) -> Option<&str> {
    match category {
      StudentCategory::Program => Some(&self.program_name),
      StudentCategory::YearLevel => Some(&self.year_level),
      StudentCategory::Status => Some(&self.status),
    }
  }

  fn compare(&self, other: &Self, column: StudentColumn) -> Ordering {
    match column {
      StudentColumn::Number => self.student_number.cmp(&other.student_number),
      StudentColumn::Name => cmp_ignore_case(&self.display_name(), &other.display_name()),
      StudentColumn::Program => cmp_ignore_case(&self.program_name, &other.program_name),
      StudentColumn::YearLevel => self.year_level.cmp(&other.year_level),
      StudentColumn::Status => self.status.cmp(&other.status),
    }
  }
}

// ---------------------------------------------------------------------------
// Balances
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentBalance {
  pub student_id: i64,
  pub student_name: String,
  #[serde(deserialize_with = "de_amount")]
  pub balance: f64,
  pub semester: String,
  pub program_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceStatus {
  WithBalance,
  FullyPaid,
}

impl BalanceStatus {
  pub fn label(self) -> &'static str {
    match self {
      BalanceStatus::WithBalance => "With Balance",
      BalanceStatus::FullyPaid => "Fully Paid",
    }
  }
}

impl StudentBalance {
  pub fn status(&self) -> BalanceStatus {
    if self.balance > 0.0 {
      BalanceStatus::WithBalance
    } else {
      BalanceStatus::FullyPaid
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceColumn {
  Name,
  Program,
  Semester,
  Balance,
  Status,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceCategory {
  Semester,
  Program,
  Status,
}

impl Listable for StudentBalance {
  type Column = BalanceColumn;
  type Category = BalanceCategory;

  fn search_fields(&self) -> Vec<&str> {
    vec![self.student_name.as_str()]
  }

  fn category_value(&self, category: BalanceCategory) -> Option<&str> {
    match category {
      BalanceCategory::Semester => Some(&self.semester),
      BalanceCategory::Program => Some(&self.program_name),
      BalanceCategory::Status => Some(self.status().label()),
    }
  }

  fn compare(&self, other: &Self, column: BalanceColumn) -> Ordering {
    match column {
      BalanceColumn::Name => cmp_ignore_case(&self.student_name, &other.student_name),
      BalanceColumn::Program => cmp_ignore_case(&self.program_name, &other.program_name),
      BalanceColumn::Semester => self.semester.cmp(&other.semester),
      BalanceColumn::Balance => cmp_f64(self.balance, other.balance),
      BalanceColumn::Status => self.status().label().cmp(other.status().label()),
    }
  }
}

// ---------------------------------------------------------------------------
// Payments
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRecord {
  pub id: i64,
  pub student_id: i64,
  pub student_name: String,
  #[serde(deserialize_with = "de_amount")]
  pub amount: f64,
  pub reference_number: String,
  pub payment_method: String,
  pub payment_date: String,
  pub status: String,
}

impl PaymentRecord {
  pub fn is_verified(&self) -> bool {
    self.status.eq_ignore_ascii_case("verified")
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentColumn {
  Date,
  Name,
  Reference,
  Method,
  Amount,
  Status,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentCategory {
  Method,
  Status,
}

impl Listable for PaymentRecord {
  type Column = PaymentColumn;
  type Category = PaymentCategory;

  fn search_fields(&self) -> Vec<&str> {
    vec![self.student_name.as_str(), self.reference_number.as_str()]
  }

  fn category_value(&self, category: PaymentCategory) -> Option<&str> {
    match category {
      PaymentCategory::Method => Some(&self.payment_method),
      PaymentCategory::Status => Some(&self.status),
    }
  }

  fn compare(&self, other: &Self, column: PaymentColumn) -> Ordering {
    match column {
      PaymentColumn::Date => self.payment_date.cmp(&other.payment_date),
      PaymentColumn::Name => cmp_ignore_case(&self.student_name, &other.student_name),
      PaymentColumn::Reference => self.reference_number.cmp(&other.reference_number),
      PaymentColumn::Method => self.payment_method.cmp(&other.payment_method),
      PaymentColumn::Amount => cmp_f64(self.amount, other.amount),
      PaymentColumn::Status => self.status.cmp(&other.status),
    }
  }
}

// ---------------------------------------------------------------------------
// Enrollments
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enrollment {
  pub id: i64,
  pub student_id: i64,
  pub student_name: String,
  pub program_name: String,
  pub year_level: String,
  pub semester: String,
  pub school_year: String,
  pub status: String,
  #[serde(default)]
  pub block: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrollmentColumn {
  Name,
  Program,
  YearLevel,
  Semester,
  Block,
  Status,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrollmentCategory {
  Program,
  YearLevel,
  Semester,
  Status,
}

impl Listable for Enrollment {
  type Column = EnrollmentColumn;
  type Category = EnrollmentCategory;

  fn search_fields(&self) -> Vec<&str> {
    vec![self.student_name.as_str(), self.school_year.as_str()]
  }

  fn category_value(&self, category: EnrollmentCategory) -> Option<&str> {
    match category {
      EnrollmentCategory::Program => Some(&self.program_name),
      EnrollmentCategory::YearLevel => Some(&self.year_level),
      EnrollmentCategory::Semester => Some(&self.semester),
      EnrollmentCategory::Status => Some(&self.status),
    }
  }

  fn compare(&self, other: &Self, column: EnrollmentColumn) -> Ordering {
    match column {
      EnrollmentColumn::Name => cmp_ignore_case(&self.student_name, &other.student_name),
      EnrollmentColumn::Program => cmp_ignore_case(&self.program_name, &other.program_name),
      EnrollmentColumn::YearLevel => self.year_level.cmp(&other.year_level),
      EnrollmentColumn::Semester => self.semester.cmp(&other.semester),
      EnrollmentColumn::Block => self.block.cmp(&other.block),
      EnrollmentColumn::Status => self.status.cmp(&other.status),
    }
  }
}

// ---------------------------------------------------------------------------
// Courses
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
  pub id: i64,
  pub code: String,
  pub description: String,
  #[serde(deserialize_with = "de_amount")]
  pub units: f64,
  pub program_name: String,
  pub year_level: String,
  pub semester: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CourseColumn {
  Code,
  Description,
  Units,
  Program,
  YearLevel,
  Semester,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CourseCategory {
  Program,
  YearLevel,
  Semester,
}

impl Listable for Course {
  type Column = CourseColumn;
  type Category = CourseCategory;

  fn search_fields(&self) -> Vec<&str> {
    vec![self.code.as_str(), self.description.as_str()]
  }

  fn category_value(&self, category: CourseCategory) -> Option<&str> {
    match category {
      CourseCategory::Program => Some(&self.program_name),
      CourseCategory::YearLevel => Some(&self.year_level),
      CourseCategory::Semester => Some(&self.semester),
    }
  }

  fn compare(&self, other: &Self, column: CourseColumn) -> Ordering {
    match column {
      CourseColumn::Code => cmp_ignore_case(&self.code, &other.code),
      CourseColumn::Description => cmp_ignore_case(&self.description, &other.description),
      CourseColumn::Units => cmp_f64(self.units, other.units),
      CourseColumn::Program => cmp_ignore_case(&self.program_name, &other.program_name),
      CourseColumn::YearLevel => self.year_level.cmp(&other.year_level),
      CourseColumn::Semester => self.semester.cmp(&other.semester),
    }
  }
}

// ---------------------------------------------------------------------------
// Grades
// ---------------------------------------------------------------------------

/// Lowest passing grade on the 1.00 to 5.00 scale.
pub const PASSING_GRADE: f64 = 3.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeRecord {
  pub id: i64,
  pub student_id: i64,
  pub student_name: String,
  pub course_code: String,
  pub course_description: String,
  pub semester: String,
  #[serde(default, deserialize_with = "de_opt_amount")]
  pub grade: Option<f64>,
}

impl GradeRecord {
  pub fn remarks(&self) -> &'static str {
    match self.grade {
      None => "Incomplete",
      Some(g) if g <= PASSING_GRADE => "Passed",
      Some(_) => "Failed",
    }
  }
}

/// One line of a grade sheet submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeEntry {
  pub grade_id: i64,
  pub grade: f64,
}

impl GradeEntry {
  /// Parse a grade typed by the user; must be on the 1.00 to 5.00 scale.
  pub fn parse(grade_id: i64, input: &str) -> Result<Self, String> {
    let grade: f64 = input
      .trim()
      .parse()
      .map_err(|_| format!("'{}' is not a number", input.trim()))?;
    if !(1.0..=5.0).contains(&grade) {
      return Err("Grade must be between 1.00 and 5.00".to_string());
    }
    Ok(Self { grade_id, grade })
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GradeColumn {
  Name,
  Course,
  Semester,
  Grade,
  Remarks,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GradeCategory {
  Course,
  Semester,
  Remarks,
}

impl Listable for GradeRecord {
  type Column = GradeColumn;
  type Category = GradeCategory;

  fn search_fields(&self) -> Vec<&str> {
    vec![
      self.student_name.as_str(),
      self.course_code.as_str(),
      self.course_description.as_str(),
    ]
  }

  fn category_value(&self, category: GradeCategory) -> Option<&str> {
    match category {
      GradeCategory::Course => Some(&self.course_code),
      GradeCategory::Semester => Some(&self.semester),
      GradeCategory::Remarks => Some(self.remarks()),
    }
  }

  fn compare(&self, other: &Self, column: GradeColumn) -> Ordering {
    match column {
      GradeColumn::Name => cmp_ignore_case(&self.student_name, &other.student_name),
      GradeColumn::Course => cmp_ignore_case(&self.course_code, &other.course_code),
      GradeColumn::Semester => self.semester.cmp(&other.semester),
      // Ungraded rows sort last
      GradeColumn::Grade => match (self.grade, other.grade) {
        (Some(a), Some(b)) => cmp_f64(a, b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
      },
      GradeColumn::Remarks => self.remarks().cmp(other.remarks()),
    }
  }
}

// ---------------------------------------------------------------------------
// Tuition fees
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TuitionFee {
  pub id: i64,
  pub program_name: String,
  pub year_level: String,
  pub semester: String,
  #[serde(deserialize_with = "de_amount")]
  pub tuition_per_unit: f64,
  #[serde(deserialize_with = "de_amount")]
  pub misc_fee: f64,
  #[serde(deserialize_with = "de_amount")]
  pub lab_fee: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeeColumn {
  Program,
  YearLevel,
  Semester,
  PerUnit,
  Misc,
  Lab,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeeCategory {
  Program,
  YearLevel,
  Semester,
}

impl Listable for TuitionFee {
  type Column = FeeColumn;
  type Category = FeeCategory;

  fn search_fields(&self) -> Vec<&str> {
    vec![self.program_name.as_str()]
  }

  fn category_value(&self, category: FeeCategory) -> Option<&str> {
    match category {
      FeeCategory::Program => Some(&self.program_name),
      FeeCategory::YearLevel => Some(&self.year_level),
      FeeCategory::Semester => Some(&self.semester),
    }
  }

  fn compare(&self, other: &Self, column: FeeColumn) -> Ordering {
    match column {
      FeeColumn::Program => cmp_ignore_case(&self.program_name, &other.program_name),
      FeeColumn::YearLevel => self.year_level.cmp(&other.year_level),
      FeeColumn::Semester => self.semester.cmp(&other.semester),
      FeeColumn::PerUnit => cmp_f64(self.tuition_per_unit, other.tuition_per_unit),
      FeeColumn::Misc => cmp_f64(self.misc_fee, other.misc_fee),
      FeeColumn::Lab => cmp_f64(self.lab_fee, other.lab_fee),
    }
  }
}

// ---------------------------------------------------------------------------
// Programs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
  pub id: i64,
  pub code: String,
  pub name: String,
  #[serde(default)]
  pub major: Option<String>,
  #[serde(default)]
  pub department: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgramColumn {
  Code,
  Name,
  Major,
  Department,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgramCategory {
  Department,
}

impl Listable for Program {
  type Column = ProgramColumn;
  type Category = ProgramCategory;

  fn search_fields(&self) -> Vec<&str> {
    let mut fields = vec![self.code.as_str(), self.name.as_str()];
    if let Some(major) = &self.major {
      fields.push(major);
    }
    fields
  }

  fn category_value(&self, category: ProgramCategory) -> Option<&str> {
    match category {
      ProgramCategory::Department => self.department.as_deref(),
    }
  }

  fn compare(&self, other: &Self, column: ProgramColumn) -> Ordering {
    match column {
      ProgramColumn::Code => cmp_ignore_case(&self.code, &other.code),
      ProgramColumn::Name => cmp_ignore_case(&self.name, &other.name),
      ProgramColumn::Major => self.major.cmp(&other.major),
      ProgramColumn::Department => self.department.cmp(&other.department),
    }
  }
}

// ---------------------------------------------------------------------------
// Document requests
// ---------------------------------------------------------------------------

/// Processing stages of a document request, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentStatus {
  Pending,
  Processing,
  Ready,
  Released,
}

impl DocumentStatus {
  pub const ALL: [DocumentStatus; 4] = [
    DocumentStatus::Pending,
    DocumentStatus::Processing,
    DocumentStatus::Ready,
    DocumentStatus::Released,
  ];

  pub fn label(self) -> &'static str {
    match self {
      DocumentStatus::Pending => "Pending",
      DocumentStatus::Processing => "Processing",
      DocumentStatus::Ready => "Ready for Pickup",
      DocumentStatus::Released => "Released",
    }
  }

  pub fn parse(s: &str) -> Option<Self> {
    Self::ALL
      .into_iter()
      .find(|status| status.label().eq_ignore_ascii_case(s.trim()))
  }

  /// Next stage, `None` once released.
  pub fn next(self) -> Option<Self> {
    match self {
      DocumentStatus::Pending => Some(DocumentStatus::Processing),
      DocumentStatus::Processing => Some(DocumentStatus::Ready),
      DocumentStatus::Ready => Some(DocumentStatus::Released),
      DocumentStatus::Released => None,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRequest {
  pub id: i64,
  pub student_id: i64,
  pub student_name: String,
  pub document_type: String,
  #[serde(default)]
  pub purpose: String,
  pub status: String,
  pub requested_at: String,
}

impl DocumentRequest {
  pub fn stage(&self) -> Option<DocumentStatus> {
    DocumentStatus::parse(&self.status)
  }
}

/// Body of a new document request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewDocumentRequest {
  pub student_id: i64,
  pub document_type: String,
  pub purpose: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentColumn {
  Requested,
  Name,
  Document,
  Status,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentCategory {
  Document,
  Status,
}

impl Listable for DocumentRequest {
  type Column = DocumentColumn;
  type Category = DocumentCategory;

  fn search_fields(&self) -> Vec<&str> {
    vec![
      self.student_name.as_str(),
      self.document_type.as_str(),
      self.purpose.as_str(),
    ]
  }

  fn category_value(&self, category: DocumentCategory) -> Option<&str> {
    match category {
      DocumentCategory::Document => Some(&self.document_type),
      DocumentCategory::Status => Some(&self.status),
    }
  }

  fn compare(&self, other: &Self, column: DocumentColumn) -> Ordering {
    match column {
      DocumentColumn::Requested => self.requested_at.cmp(&other.requested_at),
      DocumentColumn::Name => cmp_ignore_case(&self.student_name, &other.student_name),
      DocumentColumn::Document => cmp_ignore_case(&self.document_type, &other.document_type),
      DocumentColumn::Status => {
        let rank = |r: &DocumentRequest| r.stage().map(|s| s as u8).unwrap_or(u8::MAX);
        rank(self).cmp(&rank(other))
      }
    }
  }
}
