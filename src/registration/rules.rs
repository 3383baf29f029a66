//! Declarative validation table shared by per-step and final validation.

use chrono::{Local, NaiveDate};

use super::security::{
  contains_sql_injection, contains_xss, is_valid_email, is_valid_person_name, is_valid_phone,
  password_strength, PasswordStrength,
};
use super::{RegistrationForm, Step};

/// A single check on a field value. Checks other than `Required` are
/// skipped for empty values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Check {
  Required,
  MinLen(usize),
  MaxLen(usize),
  PersonName,
  Email,
  Phone,
  /// `YYYY-MM-DD`, not in the future
  Date,
  OneOf(&'static [&'static str]),
  StrongPassword,
  /// Must equal the named field
  Matches(&'static str),
  /// No script or SQL injection markers
  Safe,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldRule {
  pub field: &'static str,
  pub label: &'static str,
  pub step: Step,
  pub checks: &'static [Check],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
  pub field: &'static str,
  pub message: String,
}

pub const SEXES: &[&str] = &["Male", "Female"];
pub const YEAR_LEVELS: &[&str] = &["1st Year", "2nd Year", "3rd Year", "4th Year"];
pub const SEMESTERS: &[&str] = &["1st", "2nd", "Summer"];
pub const STUDENT_TYPES: &[&str] = &["New", "Transferee", "Returnee"];

use Check::*;

pub const RULES: &[FieldRule] = &[
  // Personal
  FieldRule {
    field: "last_name",
    label: "Last name",
    step: Step::Personal,
    checks: &[Required, MaxLen(50), PersonName, Safe],
  },
  FieldRule {
    field: "first_name",
    label: "First name",
    step: Step::Personal,
    checks: &[Required, MaxLen(50), PersonName, Safe],
  },
  FieldRule {
    field: "middle_name",
    label: "Middle name",
    step: Step::Personal,
    checks: &[MaxLen(50), PersonName, Safe],
  },
  FieldRule {
    field: "birth_date",
    label: "Birth date",
    step: Step::Personal,
    checks: &[Required, Date],
  },
  FieldRule {
    field: "sex",
    label: "Sex",
    step: Step::Personal,
    checks: &[Required, OneOf(SEXES)],
  },
  // Contact
  FieldRule {
    field: "email",
    label: "Email",
    step: Step::Contact,
    checks: &[Required, MaxLen(100), Email, Safe],
  },
  FieldRule {
    field: "contact_number",
    label: "Contact number",
    step: Step::Contact,
    checks: &[Required, Phone],
  },
  FieldRule {
    field: "address",
    label: "Address",
    step: Step::Contact,
    checks: &[Required, MinLen(5), MaxLen(200), Safe],
  },
  FieldRule {
    field: "guardian_name",
    label: "Guardian name",
    step: Step::Contact,
    checks: &[Required, MaxLen(100), PersonName, Safe],
  },
  FieldRule {
    field: "guardian_contact",
    label: "Guardian contact",
    step: Step::Contact,
    checks: &[Required, Phone],
  },
  // Academic
  FieldRule {
    field: "program",
    label: "Program",
    step: Step::Academic,
    checks: &[Required, MaxLen(100), Safe],
  },
  FieldRule {
    field: "year_level",
    label: "Year level",
    step: Step::Academic,
    checks: &[Required, OneOf(YEAR_LEVELS)],
  },
  FieldRule {
    field: "semester",
    label: "Semester",
    step: Step::Academic,
    checks: &[Required, OneOf(SEMESTERS)],
  },
  FieldRule {
    field: "student_type",
    label: "Student type",
    step: Step::Academic,
    checks: &[Required, OneOf(STUDENT_TYPES)],
  },
  FieldRule {
    field: "previous_school",
    label: "Previous school",
    step: Step::Academic,
    checks: &[MaxLen(150), Safe],
  },
  // Account
  FieldRule {
    field: "username",
    label: "Username",
    step: Step::Account,
    checks: &[Required, MinLen(4), MaxLen(30), Safe],
  },
  FieldRule {
    field: "password",
    label: "Password",
    step: Step::Account,
    checks: &[Required, MinLen(8), StrongPassword],
  },
  FieldRule {
    field: "confirm_password",
    label: "Confirm password",
    step: Step::Account,
    checks: &[Required, Matches("password")],
  },
];

/// Rules for one step, in display order.
pub fn rules_for(step: Step) -> impl Iterator<Item = &'static FieldRule> {
  RULES.iter().filter(move |rule| rule.step == step)
}

pub fn rule(field: &str) -> Option<&'static FieldRule> {
  RULES.iter().find(|rule| rule.field == field)
}

/// Validate the fields of one step.
pub fn validate_step(form: &RegistrationForm, step: Step) -> Vec<FieldError> {
  rules_for(step)
    .filter_map(|rule| check_field(form, rule))
    .collect()
}

/// Validate every field, in step order.
pub fn validate_all(form: &RegistrationForm) -> Vec<FieldError> {
  RULES
    .iter()
    .filter_map(|rule| check_field(form, rule))
    .collect()
}

/// First failing check for a field, if any.
fn check_field(form: &RegistrationForm, rule: &FieldRule) -> Option<FieldError> {
  let raw = form.get(rule.field);
  // Passwords are compared untrimmed
  let secret = rule
    .checks
    .iter()
    .any(|c| matches!(c, StrongPassword | Matches(_)));
  let value = if secret { raw } else { raw.trim() };

  let message = if value.is_empty() {
    rule
      .checks
      .contains(&Required)
      .then(|| format!("{} is required", rule.label))
  } else {
    rule
      .checks
      .iter()
      .find_map(|check| failure(form, rule, *check, value))
  };

  message.map(|message| FieldError {
    field: rule.field,
    message,
  })
}

fn failure(form: &RegistrationForm, rule: &FieldRule, check: Check, value: &str) -> Option<String> {
  let label = rule.label;
  let ok = match check {
    Required => true,
    MinLen(n) => value.chars().count() >= n,
    MaxLen(n) => value.chars().count() <= n,
    PersonName => is_valid_person_name(value),
    Email => is_valid_email(value),
    Phone => is_valid_phone(value),
    Date => NaiveDate::parse_from_str(value, "%Y-%m-%d")
      .map(|date| date <= Local::now().date_naive())
      .unwrap_or(false),
    OneOf(options) => options.contains(&value),
    StrongPassword => password_strength(value) >= PasswordStrength::Good,
    Matches(other) => form.get(other) == value,
    Safe => !contains_xss(value) && !contains_sql_injection(value),
  };

  if ok {
    return None;
  }

  Some(match check {
    Required => format!("{} is required", label),
    MinLen(n) => format!("{} must be at least {} characters", label, n),
    MaxLen(n) => format!("{} must be at most {} characters", label, n),
    PersonName => format!(
      "{} may only contain letters, spaces, periods, apostrophes and hyphens",
      label
    ),
    Email => "Enter a valid email address".to_string(),
    Phone => format!("{} must be a mobile number like 09XXXXXXXXX or +639XXXXXXXXX", label),
    Date => format!("{} must be a past date in YYYY-MM-DD format", label),
    OneOf(options) => format!("{} must be one of: {}", label, options.join(", ")),
    StrongPassword => format!(
      "Password is too weak ({}); mix upper and lower case, digits and symbols",
      password_strength(value).label()
    ),
    Matches(other) => {
      let other_label = rule_label(other);
      format!("{} does not match {}", label, other_label.to_lowercase())
    }
    Safe => format!("{} contains characters that are not allowed", label),
  })
}

fn rule_label(field: &str) -> &str {
  rule(field).map(|r| r.label).unwrap_or(field)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::registration::tests::valid_form;

  #[test]
  fn test_every_step_has_rules() {
    for step in Step::ALL {
      assert!(rules_for(step).count() > 0, "{:?} has no rules", step);
    }
  }

  #[test]
  fn test_valid_form_passes() {
    let form = valid_form();
    assert!(validate_all(&form).is_empty(), "{:?}", validate_all(&form));
  }

  #[test]
  fn test_required_fields_reported_per_step() {
    let form = RegistrationForm::default();
    let errors = validate_step(&form, Step::Personal);
    let fields: Vec<&str> = errors.iter().map(|e| e.field).collect();
    // middle_name is optional
    assert_eq!(fields, vec!["last_name", "first_name", "birth_date", "sex"]);
    assert_eq!(errors[0].message, "Last name is required");
  }

  #[test]
  fn test_whitespace_only_counts_as_empty() {
    let mut form = valid_form();
    form.set("address", "   ");
    let errors = validate_step(&form, Step::Contact);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].message, "Address is required");
  }

  #[test]
  fn test_step_and_aggregate_agree() {
    let mut form = valid_form();
    form.set("email", "not-an-email");
    form.set("password", "short");
    form.set("sex", "Other");

    let mut per_step: Vec<FieldError> = Step::ALL
      .into_iter()
      .flat_map(|step| validate_step(&form, step))
      .collect();
    let mut aggregate = validate_all(&form);
    per_step.sort_by_key(|e| e.field);
    aggregate.sort_by_key(|e| e.field);
    assert_eq!(per_step, aggregate);
    assert_eq!(aggregate.len(), 4); // confirm_password no longer matches
  }

  #[test]
  fn test_first_failing_check_wins() {
    let mut form = valid_form();
    form.set("last_name", "<script>x</script>");
    let errors = validate_step(&form, Step::Personal);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].message.contains("may only contain letters"));
  }

  #[test]
  fn test_safe_check_on_free_text() {
    let mut form = valid_form();
    form.set("address", "Purok 1'; DROP TABLE students; --");
    let errors = validate_step(&form, Step::Contact);
    assert_eq!(errors[0].field, "address");
    assert_eq!(
      errors[0].message,
      "Address contains characters that are not allowed"
    );
  }

  #[test]
  fn test_future_birth_date_rejected() {
    let mut form = valid_form();
    form.set("birth_date", "2999-01-01");
    assert_eq!(validate_step(&form, Step::Personal)[0].field, "birth_date");

    form.set("birth_date", "2004-02-30");
    assert_eq!(validate_step(&form, Step::Personal)[0].field, "birth_date");
  }

  #[test]
  fn test_password_confirmation() {
    let mut form = valid_form();
    form.set("confirm_password", "Different1!");
    let errors = validate_step(&form, Step::Account);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].message, "Confirm password does not match password");
  }

  #[test]
  fn test_weak_password_message() {
    let mut form = valid_form();
    form.set("password", "password");
    form.set("confirm_password", "password");
    let errors = validate_step(&form, Step::Account);
    assert_eq!(errors[0].field, "password");
    assert!(errors[0].message.contains("(Weak)"));
  }
}
