//! Lenient cell coercion. Every function here degrades to `None` or zero
//! instead of failing: edited spreadsheets are messy.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

/// Marker the export uses for "no value".
pub const PLACEHOLDER: &str = "--";

const DATE_FORMATS: &[&str] = &[
	"%Y-%m-%d",
	"%Y/%m/%d",
	"%m/%d/%Y",
	"%m/%d/%y",
	"%b %d, %Y",
	"%B %d, %Y",
	"%d-%b-%y",
	"%d-%b-%Y",
];

const DATETIME_FORMATS: &[&str] = &[
	"%Y-%m-%d %H:%M:%S",
	"%Y-%m-%dT%H:%M:%S",
	"%m/%d/%Y %H:%M:%S",
	"%m/%d/%Y %H:%M",
	"%b %d, %Y %H:%M:%S",
];

/// Parses a currency amount such as `1,234.50`, `$12.00`, `-$3.10` or
/// `(3.10)`. Blank cells, the `--` placeholder and junk give `None`.
pub fn parse_amount(raw: &str) -> Option<f64> {
	let s = raw.trim();
	if s.is_empty() || s == PLACEHOLDER {
		return None;
	}

	let (negative_paren, s) = match s.strip_prefix('(').and_then(|x| x.strip_suffix(')')) {
		Some(inner) => (true, inner.trim()),
		None => (false, s),
	};

	let s = s.strip_prefix("US").unwrap_or(s);
	let cleaned: String = s
		.chars()
		.filter(|c| !matches!(c, '$' | ',' | ' ' | '\u{00A0}'))
		.collect();
	if cleaned.is_empty() {
		return None;
	}

	let value = cleaned.parse::<f64>().ok().filter(|v| v.is_finite())?;
	Some(if negative_paren { -value.abs() } else { value })
}

pub fn amount_or_zero(raw: &str) -> f64 {
	parse_amount(raw).unwrap_or(0.0)
}

/// Non-negative integer count. Fractions are rounded, anything else is zero.
pub fn parse_quantity(raw: &str) -> u32 {
	match parse_amount(raw) {
		Some(v) if v > 0.0 && v < u32::MAX as f64 => v.round() as u32,
		_ => 0,
	}
}

/// Parses the date part of a creation timestamp, trying the layouts seen in
/// marketplace exports and spreadsheet round trips.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
	let s = raw.trim();
	if s.is_empty() || s == PLACEHOLDER {
		return None;
	}

	if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
		return Some(dt.date_naive());
	}
	for fmt in DATETIME_FORMATS {
		if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
			return Some(dt.date());
		}
	}
	for fmt in DATE_FORMATS {
		if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
			return Some(d);
		}
	}
	None
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_parse_amount_formats() {
		assert_eq!(parse_amount("1234.5"), Some(1234.5));
		assert_eq!(parse_amount(" 1,234.50 "), Some(1234.5));
		assert_eq!(parse_amount("$12.00"), Some(12.0));
		assert_eq!(parse_amount("-$3.10"), Some(-3.1));
		assert_eq!(parse_amount("$-3.10"), Some(-3.1));
		assert_eq!(parse_amount("(3.10)"), Some(-3.1));
		assert_eq!(parse_amount("US $7.25"), Some(7.25));
	}

	#[test]
	fn test_parse_amount_rejects_placeholders() {
		assert_eq!(parse_amount("--"), None);
		assert_eq!(parse_amount(""), None);
		assert_eq!(parse_amount("   "), None);
		assert_eq!(parse_amount("abc"), None);
		assert_eq!(parse_amount("NaN"), None);
		assert_eq!(parse_amount("inf"), None);
		assert_eq!(amount_or_zero("--"), 0.0);
	}

	#[test]
	fn test_parse_quantity() {
		assert_eq!(parse_quantity("3"), 3);
		assert_eq!(parse_quantity("2.0"), 2);
		assert_eq!(parse_quantity("-1"), 0);
		assert_eq!(parse_quantity("lots"), 0);
	}

	#[test]
	fn test_parse_date_formats() {
		let expected = NaiveDate::from_ymd_opt(2024, 1, 5);
		assert_eq!(parse_date("2024-01-05"), expected);
		assert_eq!(parse_date("2024-01-05 13:45:00"), expected);
		assert_eq!(parse_date("2024/01/05"), expected);
		assert_eq!(parse_date("01/05/2024"), expected);
		assert_eq!(parse_date("Jan 05, 2024"), expected);
		assert_eq!(parse_date("January 05, 2024"), expected);
		assert_eq!(parse_date("05-Jan-24"), expected);
		assert_eq!(parse_date("2024-01-05T08:00:00-07:00"), expected);
	}

	#[test]
	fn test_parse_date_invalid() {
		assert_eq!(parse_date("--"), None);
		assert_eq!(parse_date(""), None);
		assert_eq!(parse_date("2024-13-01"), None);
		assert_eq!(parse_date("yesterday"), None);
	}
}
