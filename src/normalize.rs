//! Conversion of raw page tokens into canonical values.
//!
//! Every function here is total: malformed or missing input produces a
//! documented default instead of an error.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, TimeZone, Utc};
use lazy_regex::regex;
use serde::{Deserialize, Serialize};

pub const MIN_RATING: f64 = 0.0;
pub const MAX_RATING: f64 = 5.0;

/// Default for a rating that was found but could not be read.
pub const UNKNOWN_RATING: f64 = 0.0;

/// Best-guess default used where a review always carries a rating but the
/// markup hides it.
pub const GUESSED_RATING: f64 = 3.0;

const MAX_FALLBACK_DAYS: i64 = 365_000;

const FULL_DATE_FORMATS: &[&str] = &["%B %d, %Y", "%B %d %Y", "%d %B %Y", "%m/%d/%Y", "%Y-%m-%d"];
const MONTH_YEAR_FORMATS: &[&str] = &["%B %Y", "%B, %Y", "%m/%Y"];

/// A rating as it appears on a page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RawRating<'a> {
    /// Human readable text such as `4.5 of 5 bubbles` or `4 star rating`.
    Text(&'a str),
    /// Ten times the rating embedded in a token, e.g. `bubble_45`.
    Tenths(&'a str),
    /// Number of repeated star elements.
    Count(usize),
    Missing,
}

pub fn normalize_rating(raw: RawRating<'_>, default: f64) -> f64 {
    let value = match raw {
        RawRating::Text(text) => rating_from_text(text),
        RawRating::Tenths(token) => rating_from_tenths(token),
        RawRating::Count(count) => Some(count as f64),
        RawRating::Missing => None,
    };

    match value {
        Some(v) if v.is_finite() => v.clamp(MIN_RATING, MAX_RATING),
        _ => default,
    }
}

fn rating_from_text(text: &str) -> Option<f64> {
    let text = text.trim();
    if let Some(caps) = regex!(r"(\d+(?:[.,]\d+)?)\s*(?:of|/|out of)\s*5\b").captures(text) {
        return parse_decimal(&caps[1]);
    }
    regex!(r"^(\d+(?:[.,]\d+)?)")
        .captures(text)
        .and_then(|caps| parse_decimal(&caps[1]))
}

fn rating_from_tenths(token: &str) -> Option<f64> {
    regex!(r"\d+")
        .find_iter(token)
        .last()
        .and_then(|m| m.as_str().parse::<u32>().ok())
        .map(|tenths| f64::from(tenths) / 10.0)
}

fn parse_decimal(s: &str) -> Option<f64> {
    s.replace(',', ".").parse().ok()
}

/// Parses one of the known calendar formats. Month-year values resolve to the
/// first day of the month.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let text = strip_date_label(raw)?;

    FULL_DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(&text, fmt).ok())
        .or_else(|| {
            let first_of_month = format!("1 {}", text);
            MONTH_YEAR_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(&first_of_month, &format!("%d {}", fmt)).ok())
        })
}

fn strip_date_label(raw: &str) -> Option<String> {
    let mut text = raw.trim();
    if text.is_empty() || text.to_lowercase().contains("date of") {
        return None;
    }
    if let Some((_, rest)) = text.split_once("wrote a review") {
        text = rest.trim();
    }
    if let Some(rest) = text.strip_prefix("Reviewed") {
        text = rest.trim();
    }
    let text = regex!(r"\s+").replace_all(text, " ");
    Some(text.trim_end_matches('.').to_string())
}

/// Date of a record at position `ordinal` in its batch.
///
/// A parsed calendar date is placed at UTC midnight, whatever the offset of
/// `now`. Unparseable or missing input falls back to `now - ordinal days`,
/// which keeps undated records of one batch ordered and distinct.
pub fn normalize_date(
    raw: Option<&str>,
    now: DateTime<FixedOffset>,
    ordinal: usize,
) -> DateTime<FixedOffset> {
    raw.and_then(parse_date)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|midnight| Utc.from_utc_datetime(&midnight).into())
        .unwrap_or_else(|| {
            let days = i64::try_from(ordinal)
                .unwrap_or(MAX_FALLBACK_DAYS)
                .min(MAX_FALLBACK_DAYS);
            now - Duration::days(days)
        })
}

/// Leading integer of a free text counter such as `12 helpful votes`.
pub fn normalize_count(raw: Option<&str>) -> u32 {
    raw.and_then(|s| s.split_whitespace().next())
        .map(|token| token.replace(',', ""))
        .and_then(|token| {
            let digits: String = token.chars().take_while(char::is_ascii_digit).collect();
            digits.parse().ok()
        })
        .unwrap_or(0)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub street: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
}

/// Splits `street, city, REGION POSTAL[, country]`. Missing segments are empty.
pub fn decompose_address(raw: &str) -> Address {
    let parts: Vec<&str> = raw.split(',').map(str::trim).collect();
    let mut region = parts
        .get(2)
        .map(|s| s.split_whitespace().collect::<Vec<_>>())
        .unwrap_or_default()
        .into_iter();

    Address {
        street: parts.first().map(ToString::to_string).unwrap_or_default(),
        city: parts.get(1).map(ToString::to_string).unwrap_or_default(),
        state: region.next().map(ToString::to_string).unwrap_or_default(),
        postal_code: region.collect::<Vec<_>>().join(" "),
    }
}

/// Identifier from a profile reference, e.g. `/user_details?userid=abc` -> `abc`.
pub fn normalize_identifier(raw: Option<&str>) -> String {
    raw.map(|s| s.rsplit('=').next().unwrap_or(s).trim().to_string())
        .unwrap_or_default()
}

pub fn collapse_whitespace(raw: &str) -> String {
    regex!(r"\s+").replace_all(raw.trim(), " ").into_owned()
}
