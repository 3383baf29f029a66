use ratatui::prelude::Color;

/// Truncate a string to a maximum number of characters, adding "..." if truncated
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    s.to_string()
  } else {
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", kept)
  }
}

/// Peso amount with thousands separators and two decimals, e.g. `₱12,500.00`.
/// Negative amounts put the sign before the symbol.
pub fn format_currency(amount: f64) -> String {
  let cents = (amount.abs() * 100.0).round() as u64;
  let whole = (cents / 100).to_string();
  let fraction = cents % 100;

  let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
  for (i, digit) in whole.chars().enumerate() {
    if i > 0 && (whole.len() - i) % 3 == 0 {
      grouped.push(',');
    }
    grouped.push(digit);
  }

  let sign = if amount < 0.0 && cents > 0 { "-" } else { "" };
  format!("{}₱{}.{:02}", sign, grouped, fraction)
}

/// Display color for a record status or badge
pub fn status_color(status: &str) -> Color {
  match status {
    "Verified" | "Enrolled" | "Fully Paid" | "Released" | "Passed" | "Ready for Pickup" => {
      Color::Green
    }
    "Pending" | "Processing" | "With Balance" | "Incomplete" => Color::Yellow,
    "Failed" | "Rejected" | "Cancelled" | "Dropped" => Color::Red,
    _ => Color::White,
  }
}
