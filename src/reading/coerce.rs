//! Type and unit coercion for raw cells.
//!
//! Dates are tried against a fixed list of patterns in priority order; the first
//! pattern that matches *and* yields a real calendar date wins. Anything else is
//! `None`, never an error.

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;

use super::grid::Cell;

static WEEKDAY_DAY_MONTH_YEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b([a-z]+day),\s*(\d{1,2})\s+([a-z]+)\s+(\d{4})\b").unwrap());
static DAY_MONTH_YEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(\d{1,2})\s+([a-z]+)\s+(\d{4})\b").unwrap());
static YEAR_M_MONTH: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d{4})M(\d{1,2})$").unwrap());
static BARE_YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d{4})(?:\.0+)?$").unwrap());
static DAY_SLASH_MONTH_YEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,2})/(\d{1,2})/(\d{4})(?:\s.*)?$").unwrap());
static ISO_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4})-(\d{1,2})-(\d{1,2})(?:[ T].*)?$").unwrap());

/// The calendar day a bare `"YYYY"` token resolves to.
///
/// Sources disagree: annual Stats NZ series report at year end, the migrant series
/// at the end of April, NIWA climate years at the start of the year.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearAnchor {
    pub month: u32,
    pub day: u32,
}

impl YearAnchor {
    pub const JAN_1: YearAnchor = YearAnchor { month: 1, day: 1 };
    pub const DEC_31: YearAnchor = YearAnchor { month: 12, day: 31 };
    pub const APR_30: YearAnchor = YearAnchor { month: 4, day: 30 };

    pub fn date(&self, year: i32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(year, self.month, self.day)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Day(NaiveDate),
    Month { year: i32, month: u32 },
    Quarter { year: i32, quarter: u32 },
    Year { year: i32, anchor: YearAnchor },
}

impl Period {
    /// Resolves to first-of-month, first-of-quarter, the anchored day, or the day itself.
    pub fn date(&self) -> Option<NaiveDate> {
        match *self {
            Period::Day(d) => Some(d),
            Period::Month { year, month } => NaiveDate::from_ymd_opt(year, month, 1),
            Period::Quarter { year, quarter } if (1..=4).contains(&quarter) => {
                NaiveDate::from_ymd_opt(year, (quarter - 1) * 3 + 1, 1)
            }
            Period::Quarter { .. } => None,
            Period::Year { year, anchor } => anchor.date(year),
        }
    }

    pub fn year(&self) -> i32 {
        match *self {
            Period::Day(d) => d.year(),
            Period::Month { year, .. } | Period::Quarter { year, .. } | Period::Year { year, .. } => {
                year
            }
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Period::Day(_) => "Daily",
            Period::Month { .. } => "Monthly",
            Period::Quarter { .. } => "Quarterly",
            Period::Year { .. } => "Annual",
        }
    }
}

/// Quarter `offset` counted from Q1 of `epoch_year` (offset 0).
pub fn quarter_from_offset(epoch_year: i32, offset: usize) -> Period {
    Period::Quarter {
        year: epoch_year + (offset / 4) as i32,
        quarter: (offset % 4) as u32 + 1,
    }
}

pub fn quarter_of(date: NaiveDate) -> u32 {
    (date.month() - 1) / 3 + 1
}

pub fn month_number(name: &str) -> Option<u32> {
    let lower = name.trim().to_lowercase();
    let month = match lower.get(..3)? {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    // Reject words that merely start like a month ("marine", "decade").
    const NAMES: [&str; 12] = [
        "january", "february", "march", "april", "may", "june", "july", "august",
        "september", "october", "november", "december",
    ];
    let full = NAMES[month as usize - 1];
    (lower.len() == 3 || lower == "sept" || lower == full).then_some(month)
}

fn ymd(year: &str, month: u32, day: &str) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year.parse().ok()?, month, day.parse().ok()?)
}

/// Parses a textual period token. See [`parse_date`] for the pattern order.
pub fn parse_period(raw: &str, anchor: YearAnchor) -> Option<Period> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Some(c) = WEEKDAY_DAY_MONTH_YEAR.captures(s) {
        if let Some(d) = month_number(&c[3]).and_then(|m| ymd(&c[4], m, &c[2])) {
            return Some(Period::Day(d));
        }
    }
    if let Some(c) = DAY_MONTH_YEAR.captures(s) {
        if let Some(d) = month_number(&c[2]).and_then(|m| ymd(&c[3], m, &c[1])) {
            return Some(Period::Day(d));
        }
    }
    if let Some(c) = YEAR_M_MONTH.captures(s) {
        let year = c[1].parse().ok()?;
        let month = c[2].parse().ok()?;
        if (1..=12).contains(&month) {
            return Some(Period::Month { year, month });
        }
    }
    if let Some(c) = BARE_YEAR.captures(s) {
        let year = c[1].parse().ok()?;
        if anchor.date(year).is_some() {
            return Some(Period::Year { year, anchor });
        }
    }
    if let Some(c) = DAY_SLASH_MONTH_YEAR.captures(s) {
        if let Some(d) = c[2].parse().ok().and_then(|m| ymd(&c[3], m, &c[1])) {
            return Some(Period::Day(d));
        }
    }
    if let Some(c) = ISO_DATE.captures(s) {
        if let Some(d) = c[2].parse().ok().and_then(|m| ymd(&c[1], m, &c[3])) {
            return Some(Period::Day(d));
        }
    }

    None
}

/// Parses a date, trying in order:
/// `"<weekday>, <day> <month> <year>"`, `"<day> <month> <year>"`, `"<year>M<month>"`,
/// bare `"<year>"` (resolved with `anchor`), `"<day>/<month>/<year>"`, ISO `"YYYY-MM-DD"`.
pub fn parse_date(raw: &str, anchor: YearAnchor) -> Option<NaiveDate> {
    parse_period(raw, anchor).and_then(|p| p.date())
}

pub fn coerce_period(cell: &Cell, anchor: YearAnchor) -> Option<Period> {
    match cell {
        Cell::Empty => None,
        Cell::DateTime(dt) => Some(Period::Day(dt.date())),
        Cell::Number(n) if n.fract() == 0.0 && (1000.0..10000.0).contains(n) => Some(Period::Year {
            year: *n as i32,
            anchor,
        }),
        Cell::Number(_) => None,
        Cell::Text(s) => parse_period(s, anchor),
    }
}

pub fn coerce_date(cell: &Cell, anchor: YearAnchor) -> Option<NaiveDate> {
    coerce_period(cell, anchor).and_then(|p| p.date())
}

const DATETIME_FORMATS: [&str; 6] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%d/%m/%Y %I:%M %p",
];

/// Parses a timestamp; a plain date resolves to midnight.
pub fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    let s = raw.trim();
    DATETIME_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
        .or_else(|| parse_date(s, YearAnchor::JAN_1).and_then(|d| d.and_hms_opt(0, 0, 0)))
}

/// Strips every character that is not a digit or a decimal point, then parses.
///
/// An empty remainder is `None`, not zero. The sign is stripped too, so this is
/// only for quantities that cannot be negative (money, GWh, counts).
pub fn clean_numeric(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse().ok()
}

/// Numeric cell value under the same strip rule as [`clean_numeric`]: workbook
/// numbers lose their sign too, so text and number cells agree and coercing an
/// already-coerced value is a no-op.
pub fn coerce_number(cell: &Cell) -> Option<f64> {
    match cell {
        Cell::Number(n) if n.is_finite() => Some(n.abs()),
        Cell::Text(s) => clean_numeric(s),
        _ => None,
    }
}

/// Plain signed parse for coordinates and temperatures; `NULL`, `-` and `..` are null.
pub fn parse_measure(raw: &str) -> Option<f64> {
    let s = raw.trim();
    if s.is_empty() || s.eq_ignore_ascii_case("null") || s == "-" || s == ".." {
        return None;
    }
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

// -- Tests -------------------------------------------------------------------
