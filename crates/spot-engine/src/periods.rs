//! Multi-period expansion: the same month across several years.
//!
//! Recognizes `November 2022, 2023, 2024` (one month word, many years) and
//! `Nov 2022, Nov 2023` (month repeated per year). Each distinct
//! `(year, month)` becomes one whole-month [`DateSpan`]. Must run before
//! [`crate::dates::parse_date_or_range`], which would otherwise take the
//! first `Month YYYY` and drop the rest.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::calendar::{month_number, month_span, DateSpan, MONTH_WORDS};

/// Accepted year window for expanded periods.
const YEAR_RANGE: std::ops::RangeInclusive<i32> = 2000..=2100;

/// One month word and year followed by more years joined by commas or `and`.
/// Group 1 captures a day number directly before the month; such matches
/// belong to an explicit date, not a month list.
static MONTH_YEAR_LIST_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)(?:\b(\d{{1,2}})\s+)?\b{MONTH_WORDS}\s+(\d{{4}})\b(?:(?:\s*,\s*(?:and\s+)?|\s+and\s+)\d{{4}}\b)+"
    ))
    .expect("month-year list pattern compiles")
});

static MONTH_YEAR_PAIR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(?i)(?:\b(\d{{1,2}})\s+)?\b{MONTH_WORDS}\s+(\d{{4}})\b"))
        .expect("month-year pair pattern compiles")
});

static FOUR_DIGIT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\d{4}\b").expect("valid"));

/// Collects whole-month spans, dropping repeats of a `(year, month)` pair.
#[derive(Default)]
struct PeriodSet {
    seen: HashSet<(i32, u32)>,
    spans: Vec<DateSpan>,
}

impl PeriodSet {
    fn push(&mut self, year: i32, month: u32) {
        if !YEAR_RANGE.contains(&year) || !self.seen.insert((year, month)) {
            return;
        }
        if let Ok(span) = month_span(year, month) {
            self.spans.push(span);
        }
    }

    fn into_multi(self) -> Option<Vec<DateSpan>> {
        (self.spans.len() > 1).then_some(self.spans)
    }
}

/// Expand a multi-year month query into one span per `(year, month)`.
///
/// Returns an empty list unless more than one distinct period was found, in
/// which case the caller falls through to the single-period resolver.
///
/// # Examples
///
/// ```
/// use spot_engine::periods::parse_multi_year_months;
///
/// let periods = parse_multi_year_months("November 2022, 2023, 2024");
/// assert_eq!(periods.len(), 3);
/// assert_eq!(periods[1].start.to_string(), "2023-11-01");
/// assert_eq!(periods[1].end.to_string(), "2023-11-30");
/// ```
pub fn parse_multi_year_months(text: &str) -> Vec<DateSpan> {
    let s = text.to_lowercase();
    if let Some(spans) = month_with_year_list(&s).or_else(|| repeated_month_years(&s)) {
        debug!(periods = spans.len(), "multi-period query");
        return spans;
    }
    Vec::new()
}

fn month_with_year_list(s: &str) -> Option<Vec<DateSpan>> {
    let caps = MONTH_YEAR_LIST_RE
        .captures_iter(s)
        .find(|c| c.get(1).is_none())?;
    let month = month_number(caps.get(2)?.as_str())?;
    let mut set = PeriodSet::default();
    for year in FOUR_DIGIT_RE.find_iter(caps.get(0)?.as_str()) {
        if let Ok(y) = year.as_str().parse() {
            set.push(y, month);
        }
    }
    set.into_multi()
}

fn repeated_month_years(s: &str) -> Option<Vec<DateSpan>> {
    let mut set = PeriodSet::default();
    for caps in MONTH_YEAR_PAIR_RE.captures_iter(s) {
        if caps.get(1).is_some() {
            continue;
        }
        let Some(month) = caps.get(2).and_then(|m| month_number(m.as_str())) else {
            continue;
        };
        if let Some(year) = caps.get(3).and_then(|m| m.as_str().parse().ok()) {
            set.push(year, month);
        }
    }
    set.into_multi()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn pairs(text: &str) -> Vec<(NaiveDate, NaiveDate)> {
        parse_multi_year_months(text)
            .into_iter()
            .map(|s| (s.start, s.end))
            .collect()
    }

    #[test]
    fn test_month_once_many_years() {
        assert_eq!(
            pairs("November 2022, 2023, 2024"),
            vec![
                (d(2022, 11, 1), d(2022, 11, 30)),
                (d(2023, 11, 1), d(2023, 11, 30)),
                (d(2024, 11, 1), d(2024, 11, 30)),
            ]
        );
    }

    #[test]
    fn test_month_once_with_and() {
        assert_eq!(pairs("dam nov 2022, 2023, and 2024").len(), 3);
        assert_eq!(pairs("feb 2023 and 2024").len(), 2);
    }

    #[test]
    fn test_leap_february_across_years() {
        let spans = pairs("feb 2023, 2024");
        assert_eq!(spans[0].1, d(2023, 2, 28));
        assert_eq!(spans[1].1, d(2024, 2, 29));
    }

    #[test]
    fn test_month_repeated_per_year() {
        assert_eq!(
            pairs("Nov 2022, Nov 2023"),
            vec![(d(2022, 11, 1), d(2022, 11, 30)), (d(2023, 11, 1), d(2023, 11, 30))]
        );
    }

    #[test]
    fn test_different_months_repeated() {
        assert_eq!(
            pairs("aug 2024 vs sep 2025"),
            vec![(d(2024, 8, 1), d(2024, 8, 31)), (d(2025, 9, 1), d(2025, 9, 30))]
        );
    }

    #[test]
    fn test_duplicates_suppressed_first_wins() {
        assert_eq!(pairs("nov 2022, nov 2022, nov 2023").len(), 2);
    }

    #[test]
    fn test_duplicate_only_is_single_period() {
        assert!(pairs("nov 2022, 2022").is_empty());
        assert!(pairs("Nov 2022, November 2022").is_empty());
    }

    #[test]
    fn test_single_month_is_not_multi() {
        assert!(pairs("aug 2025").is_empty());
        assert!(pairs("10-15 aug 2025").is_empty());
    }

    #[test]
    fn test_explicit_dates_are_not_month_lists() {
        assert!(pairs("10 Aug 2024 to 15 Sep 2025").is_empty());
        assert!(pairs("from 1 nov 2022 to 30 nov 2023").is_empty());
    }

    #[test]
    fn test_years_outside_window_ignored() {
        assert!(pairs("nov 1999, 2023").is_empty());
    }
}
