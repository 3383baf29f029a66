//! Command palette catalogue and autocomplete

use crate::school::Feature;

/// What a command opens
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
  Page(Feature),
  Register,
  Quit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
  pub name: &'static str,
  pub aliases: &'static [&'static str],
  pub description: &'static str,
  pub target: Target,
}

/// All available commands
pub const COMMANDS: &[Command] = &[
  Command {
    name: "students",
    aliases: &["st", "student"],
    description: "Student records",
    target: Target::Page(Feature::Students),
  },
  Command {
    name: "balances",
    aliases: &["bal", "balance", "studentbalances"],
    description: "Outstanding student balances",
    target: Target::Page(Feature::StudentBalances),
  },
  Command {
    name: "payments",
    aliases: &["pay", "payment"],
    description: "Payments awaiting verification",
    target: Target::Page(Feature::Payments),
  },
  Command {
    name: "enrollments",
    aliases: &["en", "enroll", "enrollment"],
    description: "Enrollment applications and blocks",
    target: Target::Page(Feature::Enrollments),
  },
  Command {
    name: "courses",
    aliases: &["co", "course", "subjects"],
    description: "Course catalogue",
    target: Target::Page(Feature::Courses),
  },
  Command {
    name: "grades",
    aliases: &["gr", "grade"],
    description: "Grade sheets",
    target: Target::Page(Feature::Grades),
  },
  Command {
    name: "fees",
    aliases: &["tuition", "tuitionfees"],
    description: "Tuition fee schedule",
    target: Target::Page(Feature::TuitionFees),
  },
  Command {
    name: "programs",
    aliases: &["pr", "program"],
    description: "Degree programs",
    target: Target::Page(Feature::Programs),
  },
  Command {
    name: "documents",
    aliases: &["doc", "docs", "requests"],
    description: "Document requests",
    target: Target::Page(Feature::DocumentRequests),
  },
  Command {
    name: "register",
    aliases: &["reg", "signup"],
    description: "New student registration",
    target: Target::Register,
  },
  Command {
    name: "quit",
    aliases: &["q", "exit"],
    description: "Exit OLSHCOnnect",
    target: Target::Quit,
  },
];

/// Exact lookup by name or alias
pub fn find(input: &str) -> Option<&'static Command> {
  let input = input.trim().to_lowercase();
  COMMANDS
    .iter()
    .find(|cmd| cmd.name == input || cmd.aliases.contains(&input.as_str()))
}

/// Get autocomplete suggestions for a given input
pub fn get_suggestions(input: &str) -> Vec<&'static Command> {
  let input_lower = input.trim().to_lowercase();

  if input_lower.is_empty() {
    return COMMANDS.iter().collect();
  }

  let mut matches: Vec<(&Command, u32)> = COMMANDS
    .iter()
    .filter_map(|cmd| {
      let aliases = cmd.aliases;
      let rank = if cmd.name == input_lower {
        0
      } else if aliases.contains(&input_lower.as_str()) {
        1
      } else if cmd.name.starts_with(&input_lower) {
        2
      } else if aliases.iter().any(|a| a.starts_with(&input_lower)) {
        3
      } else if cmd.name.contains(&input_lower) {
        4
      } else if aliases.iter().any(|a| a.contains(&input_lower)) {
        5
      } else {
        return None;
      };
      Some((cmd, rank))
    })
    .collect();

  // Stable, so equal ranks keep catalogue order
  matches.sort_by_key(|(_, rank)| *rank);

  matches.into_iter().map(|(cmd, _)| cmd).collect()
}
