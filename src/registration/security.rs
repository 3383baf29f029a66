//! Pattern checks applied to registration input.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
  static ref XSS_PATTERNS: Vec<Regex> = [
    r"(?i)<\s*script",
    r"(?i)javascript\s*:",
    r"(?i)vbscript\s*:",
    r"(?i)\bon[a-z]+\s*=",
    r"(?i)<\s*iframe",
    r"(?i)<\s*img[^>]*\bonerror",
    r"(?i)<\s*(object|embed)\b",
    r"(?i)data\s*:\s*text/html",
  ]
  .iter()
  .filter_map(|p| Regex::new(p).ok())
  .collect();

  static ref SQLI_PATTERNS: Vec<Regex> = [
    r"(?i)'\s*or\s*'?\w+'?\s*=\s*'?\w+",
    r"(?i)\bor\s+1\s*=\s*1\b",
    r"(?i)\bunion\s+(all\s+)?select\b",
    r"(?i);\s*(drop|delete|truncate|alter|insert|update)\s",
    r"'\s*--",
    r"--\s*$",
    r"/\*.*\*/",
  ]
  .iter()
  .filter_map(|p| Regex::new(p).ok())
  .collect();

  static ref PHONE: Regex = Regex::new(r"^(09\d{9}|\+639\d{9})$").expect("valid phone regex");
  static ref EMAIL: Regex = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex");
  static ref PERSON_NAME: Regex =
    Regex::new(r"^\p{L}[\p{L} .'\-]*$").expect("valid name regex");
}

/// Script injection markers such as `<script` or inline event handlers.
pub fn contains_xss(input: &str) -> bool {
  XSS_PATTERNS.iter().any(|re| re.is_match(input))
}

/// SQL injection markers such as `' or '1'='1` or `union select`.
pub fn contains_sql_injection(input: &str) -> bool {
  SQLI_PATTERNS.iter().any(|re| re.is_match(input))
}

/// Philippine mobile number, `09XXXXXXXXX` or `+639XXXXXXXXX`.
/// Spaces and dashes are ignored.
pub fn is_valid_phone(input: &str) -> bool {
  let compact: String = input
    .chars()
    .filter(|c| !c.is_whitespace() && *c != '-')
    .collect();
  PHONE.is_match(&compact)
}

pub fn is_valid_email(input: &str) -> bool {
  EMAIL.is_match(input)
}

/// Letters, spaces, periods, apostrophes and hyphens, starting with a letter.
pub fn is_valid_person_name(input: &str) -> bool {
  PERSON_NAME.is_match(input)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PasswordStrength {
  Weak,
  Fair,
  Good,
  Strong,
}

impl PasswordStrength {
  pub fn label(self) -> &'static str {
    match self {
      PasswordStrength::Weak => "Weak",
      PasswordStrength::Fair => "Fair",
      PasswordStrength::Good => "Good",
      PasswordStrength::Strong => "Strong",
    }
  }
}

/// Score 0-5: one point each for length >= 8, length >= 12, mixed case,
/// a digit and a symbol. Passwords under 8 characters score at most 1.
pub fn password_score(password: &str) -> u8 {
  let len = password.chars().count();
  let has_lower = password.chars().any(|c| c.is_lowercase());
  let has_upper = password.chars().any(|c| c.is_uppercase());
  let has_digit = password.chars().any(|c| c.is_ascii_digit());
  let has_symbol = password
    .chars()
    .any(|c| !c.is_alphanumeric() && !c.is_whitespace());

  let score = [len >= 8, len >= 12, has_lower && has_upper, has_digit, has_symbol]
    .iter()
    .filter(|met| **met)
    .count() as u8;

  if len < 8 {
    score.min(1)
  } else {
    score
  }
}

pub fn password_strength(password: &str) -> PasswordStrength {
  match password_score(password) {
    0 | 1 => PasswordStrength::Weak,
    2 => PasswordStrength::Fair,
    3 => PasswordStrength::Good,
    _ => PasswordStrength::Strong,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_xss_detection() {
    assert!(contains_xss("<script>alert(1)</script>"));
    assert!(contains_xss("< SCRIPT src=x>"));
    assert!(contains_xss("javascript:alert(1)"));
    assert!(contains_xss("<div onmouseover=\"steal()\">"));
    assert!(contains_xss("<img src=x onerror=alert(1)>"));
    assert!(contains_xss("<iframe src=//evil>"));

    assert!(!contains_xss("Bonifacio St., Online Village"));
    assert!(!contains_xss("Dela Cruz"));
  }

  #[test]
  fn test_sql_injection_detection() {
    assert!(contains_sql_injection("' or '1'='1"));
    assert!(contains_sql_injection("admin' --"));
    assert!(contains_sql_injection("x UNION SELECT password FROM users"));
    assert!(contains_sql_injection("a; DROP TABLE students"));
    assert!(contains_sql_injection("1 or 1=1"));

    assert!(!contains_sql_injection("O'Brien"));
    assert!(!contains_sql_injection("Purok 3, Brgy. San Isidro"));
    assert!(!contains_sql_injection("Select Subdivision"));
  }

  #[test]
  fn test_phone_numbers() {
    assert!(is_valid_phone("09171234567"));
    assert!(is_valid_phone("0917-123-4567"));
    assert!(is_valid_phone("+63 917 123 4567"));

    assert!(!is_valid_phone("0917123456"));
    assert!(!is_valid_phone("08171234567"));
    assert!(!is_valid_phone("+63 817 123 4567"));
    assert!(!is_valid_phone("(0917) 123-4567"));
  }

  #[test]
  fn test_email_and_names() {
    assert!(is_valid_email("juan.delacruz@olshco.edu.ph"));
    assert!(!is_valid_email("juan@"));
    assert!(!is_valid_email("juan delacruz@mail.com"));

    assert!(is_valid_person_name("Dela Cruz"));
    assert!(is_valid_person_name("Peñaflor"));
    assert!(is_valid_person_name("O'Neil-Santos Jr."));
    assert!(!is_valid_person_name("J0hn"));
    assert!(!is_valid_person_name("-Ana"));
  }

  #[test]
  fn test_password_scoring() {
    assert_eq!(password_score(""), 0);
    assert_eq!(password_score("Ab1!"), 1);
    assert_eq!(password_score("password"), 1);
    assert_eq!(password_score("Password"), 2);
    assert_eq!(password_score("Password1"), 3);
    assert_eq!(password_score("Password1!"), 4);
    assert_eq!(password_score("LongerPassword1!"), 5);
  }

  #[test]
  fn test_password_strength_levels() {
    assert_eq!(password_strength("abc"), PasswordStrength::Weak);
    assert_eq!(password_strength("Password"), PasswordStrength::Fair);
    assert_eq!(password_strength("Password1"), PasswordStrength::Good);
    assert_eq!(password_strength("Password1!"), PasswordStrength::Strong);
    assert!(PasswordStrength::Good > PasswordStrength::Fair);
  }
}
