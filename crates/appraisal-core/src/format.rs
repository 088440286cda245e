//! Value formatting for the report template

use chrono::NaiveDate;

const SOURCE_PREFIX: &str = "Источник информации";

/// `DD.MM.YYYY`
pub fn format_date(date: NaiveDate) -> String {
    date.format("%d.%m.%Y").to_string()
}

/// Two decimals with a space as the thousands separator: `1234.5` -> `1 234.50`
pub fn format_currency(value: f64) -> String {
    let fixed = format!("{:.2}", value.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(' ');
        }
        grouped.push(ch);
    }

    let sign = if value < 0.0 && fixed.bytes().any(|b| b.is_ascii_digit() && b != b'0') {
        "-"
    } else {
        ""
    };
    format!("{}{}.{}", sign, grouped, frac_part)
}

/// Wrap a source citation as `Источник информации: (text)` unless it
/// already starts with that prefix or is already parenthesized.
/// Blank input stays blank.
pub fn format_source(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    let already_prefixed = trimmed.to_lowercase().starts_with(&SOURCE_PREFIX.to_lowercase());
    let parenthesized = trimmed.starts_with('(') && trimmed.ends_with(')');
    if already_prefixed || parenthesized {
        trimmed.to_string()
    } else {
        format!("{}: ({})", SOURCE_PREFIX, trimmed)
    }
}
