//! Formatters for `{{ value | format }}`. A value a formatter cannot interpret is returned as is.
use crate::expression::FormatSpec;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use std::fmt::Write;

/// Tried in order; the first one that parses wins.
const DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
];
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y"];

pub fn apply(format: &FormatSpec, value: &str) -> String {
    match format {
        FormatSpec::Uppercase => value.to_uppercase(),
        FormatSpec::Lowercase => value.to_lowercase(),
        FormatSpec::Title => title_case(value),
        FormatSpec::Date(pattern) => format_date(value, pattern),
        FormatSpec::Number(decimals) => format_number(value, *decimals),
        FormatSpec::Currency(symbol) => format_currency(value, symbol),
        FormatSpec::Unknown(name) => {
            tracing::debug!(format = %name, "unknown format, value left unchanged");
            value.to_string()
        }
    }
}

/// Uppercases the first letter of every run of letters and lowercases the rest.
pub fn title_case(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut in_word = false;
    for c in value.chars() {
        if c.is_alphabetic() {
            if in_word {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(c);
            in_word = false;
        }
    }
    out
}

pub fn parse_date_time(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if let Ok(date_time) = DateTime::parse_from_rfc3339(value) {
        return Some(date_time.naive_local());
    }
    DATE_TIME_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(value, f).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|f| NaiveDate::parse_from_str(value, f).ok())
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

pub fn format_date(value: &str, pattern: &str) -> String {
    let Some(date_time) = parse_date_time(value) else {
        return value.to_string();
    };
    let mut out = String::new();
    // an invalid pattern surfaces as a formatting error rather than a panic
    if write!(out, "{}", date_time.format(pattern)).is_err() {
        tracing::debug!(pattern, "invalid date pattern");
        return value.to_string();
    }
    out
}

fn parse_number(value: &str) -> Option<f64> {
    value.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}

/// At most [`FormatSpec::MAX_DECIMALS`] decimals.
pub fn format_number(value: &str, decimals: usize) -> String {
    let decimals = decimals.min(FormatSpec::MAX_DECIMALS);
    match parse_number(value) {
        Some(number) => format!("{number:.decimals$}"),
        None => value.to_string(),
    }
}

/// `$1,234.50`; the sign goes after the symbol.
pub fn format_currency(value: &str, symbol: &str) -> String {
    let Some(number) = parse_number(value) else {
        return value.to_string();
    };
    let fixed = format!("{:.2}", number.abs());
    let (integer, fraction) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    let sign = if number < 0.0 && fixed != "0.00" { "-" } else { "" };
    format!("{symbol}{sign}{}.{fraction}", group_thousands(integer))
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
