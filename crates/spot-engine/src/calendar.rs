//! Calendar primitives shared by the date and period resolvers.
//!
//! A [`DateSpan`] is an inclusive pair of calendar days that is always
//! ordered (`start <= end`). Month-word tables live here so the resolvers,
//! the multi-period expander and month-intent detection agree on the same
//! vocabulary.

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::error::{EngineError, Result};

/// Earliest day the single-date rules accept, and the boundary below which
/// a resolved period is rejected as pre-epoch.
pub const DATE_MIN_GUARD: NaiveDate = match NaiveDate::from_ymd_opt(2010, 1, 1) {
    Some(d) => d,
    None => panic!("2010-01-01 is a valid date"),
};

/// Regex alternation of every accepted month spelling.
///
/// Full names come before abbreviations and `sept` before `sep` so the
/// leftmost alternative is the longest spelling at any position.
pub const MONTH_WORDS: &str = "(january|february|march|april|may|june|july|august|september|october|november|december|jan|feb|mar|apr|jun|jul|aug|sept|sep|oct|nov|dec)";

/// An inclusive, ordered range of calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct DateSpan {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateSpan {
    /// Build a span, swapping the bounds when they arrive inverted.
    pub fn new(a: NaiveDate, b: NaiveDate) -> Self {
        if a <= b {
            Self { start: a, end: b }
        } else {
            Self { start: b, end: a }
        }
    }

    pub fn day(d: NaiveDate) -> Self {
        Self { start: d, end: d }
    }

    pub fn is_single_day(&self) -> bool {
        self.start == self.end
    }

    pub fn is_same_month(&self) -> bool {
        self.start.year() == self.end.year() && self.start.month() == self.end.month()
    }

    /// True when the span covers exactly the calendar month of its start.
    pub fn is_whole_month(&self) -> bool {
        let first = first_of_month(self.start);
        match last_day_of_month(self.start.year(), self.start.month()) {
            Some(last) => self.start == first && self.end == last,
            None => false,
        }
    }

    pub fn starts_before_guard(&self) -> bool {
        self.start < DATE_MIN_GUARD
    }
}

/// Parse a month name or abbreviation (lowercase) to its number.
pub fn month_number(s: &str) -> Option<u32> {
    match s {
        "january" | "jan" => Some(1),
        "february" | "feb" => Some(2),
        "march" | "mar" => Some(3),
        "april" | "apr" => Some(4),
        "may" => Some(5),
        "june" | "jun" => Some(6),
        "july" | "jul" => Some(7),
        "august" | "aug" => Some(8),
        "september" | "sept" | "sep" => Some(9),
        "october" | "oct" => Some(10),
        "november" | "nov" => Some(11),
        "december" | "dec" => Some(12),
        _ => None,
    }
}

/// Expand a one- or two-digit year to the 2000s; longer years pass through.
pub fn expand_year(y: i32) -> i32 {
    if y < 100 {
        y + 2000
    } else {
        y
    }
}

pub fn first_of_month(d: NaiveDate) -> NaiveDate {
    d.with_day(1).unwrap_or(d)
}

pub fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    let (ny, nm) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(ny, nm, 1)?.pred_opt()
}

/// The whole calendar month `year-month` as a span.
pub fn month_span(year: i32, month: u32) -> Result<DateSpan> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| EngineError::InvalidDate(format!("{year}-{month:02}")))?;
    let last = last_day_of_month(year, month)
        .ok_or_else(|| EngineError::InvalidDate(format!("{year}-{month:02}")))?;
    Ok(DateSpan {
        start: first,
        end: last,
    })
}

/// Render a day the way every report does: `15 Aug 2025`.
pub fn dmy(d: NaiveDate) -> String {
    d.format("%d %b %Y").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_span_swaps_inverted_bounds() {
        let span = DateSpan::new(d(2025, 8, 15), d(2025, 8, 10));
        assert_eq!(span.start, d(2025, 8, 10));
        assert_eq!(span.end, d(2025, 8, 15));
    }

    #[test]
    fn test_month_span_february_leap_year() {
        let span = month_span(2024, 2).unwrap();
        assert_eq!(span.end, d(2024, 2, 29));
        let span = month_span(2025, 2).unwrap();
        assert_eq!(span.end, d(2025, 2, 28));
    }

    #[test]
    fn test_month_span_december_rolls_year() {
        let span = month_span(2024, 12).unwrap();
        assert_eq!(span.start, d(2024, 12, 1));
        assert_eq!(span.end, d(2024, 12, 31));
    }

    #[test]
    fn test_month_span_invalid_month() {
        let err = month_span(2024, 13).unwrap_err();
        assert!(err.to_string().contains("2024-13"), "got: {err}");
    }

    #[test]
    fn test_whole_month_detection() {
        assert!(month_span(2025, 8).unwrap().is_whole_month());
        assert!(!DateSpan::new(d(2025, 8, 1), d(2025, 8, 30)).is_whole_month());
        assert!(!DateSpan::new(d(2025, 8, 1), d(2025, 9, 30)).is_whole_month());
    }

    #[test]
    fn test_month_number_spellings() {
        assert_eq!(month_number("sept"), Some(9));
        assert_eq!(month_number("sep"), Some(9));
        assert_eq!(month_number("may"), Some(5));
        assert_eq!(month_number("mayday"), None);
    }

    #[test]
    fn test_expand_year() {
        assert_eq!(expand_year(25), 2025);
        assert_eq!(expand_year(2024), 2024);
    }

    #[test]
    fn test_dmy_format() {
        assert_eq!(dmy(d(2025, 8, 5)), "05 Aug 2025");
    }
}
