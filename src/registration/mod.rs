//! Student self-registration: a four-step wizard over one validation table.
//!
//! The same [`RULES`] drive per-step validation (`next`) and the final
//! submit guard, so the two cannot disagree.

mod rules;
mod security;

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use tracing::warn;

pub use rules::{rule, rules_for, validate_all, validate_step, Check, FieldError, FieldRule, RULES};
pub use security::{password_strength, PasswordStrength};

/// Hidden field that people never see and bots tend to fill in.
pub const HONEYPOT_FIELD: &str = "website";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Step {
  Personal,
  Contact,
  Academic,
  Account,
}

impl Step {
  pub const ALL: [Step; 4] = [Step::Personal, Step::Contact, Step::Academic, Step::Account];

  pub fn title(self) -> &'static str {
    match self {
      Step::Personal => "Personal Information",
      Step::Contact => "Contact Details",
      Step::Academic => "Academic Information",
      Step::Account => "Account Setup",
    }
  }

  /// 1-indexed position, for "Step 2 of 4".
  pub fn number(self) -> usize {
    self as usize + 1
  }

  pub fn next(self) -> Option<Step> {
    Self::ALL.get(self as usize + 1).copied()
  }

  pub fn prev(self) -> Option<Step> {
    (self as usize).checked_sub(1).map(|i| Self::ALL[i])
  }
}

/// Raw form values keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrationForm {
  values: BTreeMap<String, String>,
}

impl RegistrationForm {
  /// Value of a field, empty when unset.
  pub fn get(&self, field: &str) -> &str {
    self.values.get(field).map(String::as_str).unwrap_or("")
  }

  pub fn set(&mut self, field: &str, value: impl Into<String>) {
    self.values.insert(field.to_string(), value.into());
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationError {
  /// One or more fields failed validation
  Invalid(Vec<FieldError>),
  /// The honeypot was filled in
  Rejected,
}

impl fmt::Display for RegistrationError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      RegistrationError::Invalid(errors) => match errors.as_slice() {
        [only] => write!(f, "{}", only.message),
        _ => write!(f, "{} fields need attention", errors.len()),
      },
      RegistrationError::Rejected => write!(f, "Registration could not be submitted"),
    }
  }
}

impl std::error::Error for RegistrationError {}

/// Validated, trimmed registration data as sent to the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RegistrationSubmission {
  fields: BTreeMap<&'static str, String>,
}

impl RegistrationSubmission {
  pub fn get(&self, field: &str) -> Option<&str> {
    self.fields.get(field).map(String::as_str)
  }
}

/// Multi-step registration state.
#[derive(Debug, Clone, Default)]
pub struct RegistrationWizard {
  form: RegistrationForm,
  step: Option<Step>,
  errors: Vec<FieldError>,
}

impl RegistrationWizard {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn step(&self) -> Step {
    self.step.unwrap_or(Step::Personal)
  }

  pub fn form(&self) -> &RegistrationForm {
    &self.form
  }

  pub fn set(&mut self, field: &str, value: impl Into<String>) {
    self.form.set(field, value);
  }

  /// Errors from the last `next` or `submit`.
  #[cfg(test)]
  pub fn errors(&self) -> &[FieldError] {
    &self.errors
  }

  pub fn error_for(&self, field: &str) -> Option<&str> {
    self
      .errors
      .iter()
      .find(|e| e.field == field)
      .map(|e| e.message.as_str())
  }

  pub fn is_last_step(&self) -> bool {
    self.step().next().is_none()
  }

  /// Validate the current step and advance if it is clean.
  /// Returns whether the step changed.
  pub fn next(&mut self) -> bool {
    self.errors = validate_step(&self.form, self.step());
    if !self.errors.is_empty() {
      return false;
    }
    match self.step().next() {
      Some(next) => {
        self.step = Some(next);
        true
      }
      None => false,
    }
  }

  /// Go back one step. Never validates.
  pub fn back(&mut self) -> bool {
    match self.step().prev() {
      Some(prev) => {
        self.step = Some(prev);
        self.errors.clear();
        true
      }
      None => false,
    }
  }

  /// Validate everything and build the submission.
  ///
  /// On validation failure the wizard moves to the earliest step with an
  /// error.
  pub fn submit(&mut self) -> Result<RegistrationSubmission, RegistrationError> {
    if !self.form.get(HONEYPOT_FIELD).is_empty() {
      warn!("Registration rejected: honeypot field filled");
      return Err(RegistrationError::Rejected);
    }

    self.errors = validate_all(&self.form);
    if let Some(first) = self.errors.first() {
      if let Some(rule) = rule(first.field) {
        self.step = Some(rule.step);
      }
      return Err(RegistrationError::Invalid(self.errors.clone()));
    }

    let fields = RULES
      .iter()
      .filter(|rule| !rule.checks.iter().any(|c| matches!(c, Check::Matches(_))))
      .filter_map(|rule| {
        let value = match rule.field {
          "password" => self.form.get(rule.field).to_string(),
          _ => self.form.get(rule.field).trim().to_string(),
        };
        (!value.is_empty()).then_some((rule.field, value))
      })
      .collect();

    Ok(RegistrationSubmission { fields })
  }
}
