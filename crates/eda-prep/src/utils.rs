//! Shared utilities for the preprocessing engine.
//!
//! Text parsing helpers used by ingestion, type inference and conversion.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;

// =============================================================================
// String Parsing Utilities
// =============================================================================

// Thousands-grouped numbers such as "1,234" or "-12,345.50".
static GROUPED_NUMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[+-]?\d{1,3}(,\d{3})+(\.\d+)?$").expect("Invalid regex: grouped number")
});

/// Common boolean true representations.
pub const BOOLEAN_TRUE_VALUES: [&str; 4] = ["true", "yes", "t", "y"];

/// Common boolean false representations.
pub const BOOLEAN_FALSE_VALUES: [&str; 4] = ["false", "no", "f", "n"];

/// Check if a raw value matches one of the configured missing markers.
///
/// Whitespace-only values always count as missing.
pub fn is_na_marker(value: &str, na_values: &[String]) -> bool {
    let trimmed = value.trim();
    trimmed.is_empty() || na_values.iter().any(|marker| marker == trimmed)
}

/// Try to parse a string as a finite number.
///
/// Accepts plain float syntax and thousands-grouped numbers. `NaN` and
/// infinities are rejected.
///
/// # Example
///
/// ```rust
/// use eda_prep::utils::parse_number;
///
/// assert_eq!(parse_number(" 2.5 "), Some(2.5));
/// assert_eq!(parse_number("1,234.5"), Some(1234.5));
/// assert_eq!(parse_number("abc"), None);
/// assert_eq!(parse_number("NaN"), None);
/// ```
pub fn parse_number(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }

    let parsed = match trimmed.parse::<f64>() {
        Ok(v) => v,
        Err(_) if GROUPED_NUMBER.is_match(trimmed) => trimmed.replace(',', "").parse().ok()?,
        Err(_) => return None,
    };

    parsed.is_finite().then_some(parsed)
}

/// Parse a boolean literal (`true/false`, `yes/no`, `t/f`, `y/n`, any case).
pub fn parse_bool(s: &str) -> Option<bool> {
    let lower = s.trim().to_ascii_lowercase();
    if BOOLEAN_TRUE_VALUES.contains(&lower.as_str()) {
        Some(true)
    } else if BOOLEAN_FALSE_VALUES.contains(&lower.as_str()) {
        Some(false)
    } else {
        None
    }
}

/// Parse a datetime with the first matching `strftime` pattern.
///
/// Date-only patterns produce a datetime at midnight.
pub fn parse_datetime<S: AsRef<str>>(s: &str, formats: &[S]) -> Option<NaiveDateTime> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }

    formats.iter().find_map(|format| {
        let format = format.as_ref();
        NaiveDateTime::parse_from_str(trimmed, format)
            .ok()
            .or_else(|| {
                NaiveDate::parse_from_str(trimmed, format)
                    .ok()
                    .map(|d| d.and_time(NaiveTime::MIN))
            })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number("42"), Some(42.0));
        assert_eq!(parse_number("-3.5e2"), Some(-350.0));
        assert_eq!(parse_number("12,345"), Some(12345.0));
        assert_eq!(parse_number("1,23"), None);
        assert_eq!(parse_number("inf"), None);
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_number("12 apples"), None);
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool(" no "), Some(false));
        assert_eq!(parse_bool("1"), None);
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn test_is_na_marker() {
        let markers = vec!["NULL".to_string(), "nan".to_string()];
        assert!(is_na_marker("NULL", &markers));
        assert!(is_na_marker("  ", &markers));
        assert!(!is_na_marker("null", &markers));
        assert!(!is_na_marker("0", &markers));
    }

    #[test]
    fn test_parse_datetime_formats() {
        let formats = ["%Y-%m-%d", "%Y/%m/%d %H:%M:%S"];
        let date = parse_datetime("2024-01-31", &formats).unwrap();
        assert_eq!(date.format("%Y-%m-%d %H:%M:%S").to_string(), "2024-01-31 00:00:00");

        let datetime = parse_datetime("2024/01/31 08:15:00", &formats).unwrap();
        assert_eq!(datetime.format("%H:%M").to_string(), "08:15");

        assert!(parse_datetime("31.01.2024", &formats).is_none());
        assert!(parse_datetime("2024-02-30", &formats).is_none());
    }
}
