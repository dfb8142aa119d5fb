//! Date and range resolution.
//!
//! [`parse_date_or_range`] runs a fixed cascade of matchers, most specific
//! first, and the first matcher that produces a valid calendar span wins.
//! All matchers take the caller's `today` as an explicit anchor; nothing here
//! reads the system clock.
//!
//! # Cascade
//!
//! 1. Relative keywords: `yesterday`, `today`, `this month`, `last month`
//! 2. Cross-month range with one trailing year: `24 Sep to 24 Oct 2025`
//! 3. Full explicit range: `10 Aug 2024 to 15 Sep 2025`
//! 4. Same-month day range: `10-15 Aug [2025]`
//! 5. Numeric range: `01/08/2025 to 15/08/2025`, then ISO `2025-08-01 to 2025-08-15`
//! 6. Single numeric date: `15/08/2025`, then ISO `2025-08-15` (guarded)
//! 7. Day with month word: `15 Aug [2025]` (guarded)
//! 8. Month and year: `Aug 2025`, then ISO `2025-08` (guarded)
//! 9. Phrased year: `in 2024`, `for 2024`, `full year 2024`

use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use tracing::trace;

use crate::calendar::{
    expand_year, first_of_month, month_number, month_span, DateSpan, DATE_MIN_GUARD,
    MONTH_WORDS,
};

static YESTERDAY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\byesterday\b").expect("valid"));
static TODAY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\btoday\b").expect("valid"));
static THIS_MONTH_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bthis month\b").expect("valid"));
static LAST_MONTH_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\blast month\b").expect("valid"));

static CROSS_MONTH_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"\b(?:from\s+)?(\d{{1,2}})\s+{MONTH_WORDS}\s+(?:to|until|till|-)\s+(\d{{1,2}})\s+{MONTH_WORDS}\s+(\d{{2,4}})\b"
    ))
    .expect("cross-month pattern compiles")
});

static FULL_RANGE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"\b(?:from\s*)?(\d{{1,2}})\s+{MONTH_WORDS}\s+(\d{{2,4}})\s*(?:to|-)\s*(\d{{1,2}})\s+{MONTH_WORDS}\s+(\d{{2,4}})\b"
    ))
    .expect("full range pattern compiles")
});

static DAY_RANGE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"\b(\d{{1,2}})\s*(?:to|-)\s*(\d{{1,2}})\s+{MONTH_WORDS}(?:\s+(\d{{2,4}}))?\b"
    ))
    .expect("day range pattern compiles")
});

static NUMERIC_RANGE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(\d{1,2})[/-](\d{1,2})[/-](\d{2,4})\s*(?:to|-)\s*(\d{1,2})[/-](\d{1,2})[/-](\d{2,4})\b",
    )
    .expect("numeric range pattern compiles")
});

static ISO_RANGE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(\d{4})-(\d{1,2})-(\d{1,2})\s*(?:to|-)\s*(\d{4})-(\d{1,2})-(\d{1,2})\b")
        .expect("iso range pattern compiles")
});

static NUMERIC_DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(\d{1,2})[/-](\d{1,2})[/-](\d{2,4})\b").expect("numeric date pattern compiles")
});

static ISO_DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(\d{4})-(\d{1,2})-(\d{1,2})\b").expect("iso date pattern compiles")
});

static DAY_MONTH_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"\b(\d{{1,2}})\s+{MONTH_WORDS}(?:\s+(\d{{2,4}}))?\b"))
        .expect("day-month pattern compiles")
});

static MONTH_YEAR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"\b{MONTH_WORDS}\s+(\d{{2,4}})\b")).expect("month-year pattern compiles")
});

/// `YYYY-MM` not followed by a day component.
static ISO_MONTH_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(20\d{2})-(0[1-9]|1[0-2])(?:$|[^-\d])").expect("iso month pattern compiles")
});

static YEAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(20\d{2})\b").expect("valid"));
static YEAR_PHRASE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(in|for|year|full\s+year)\b").expect("valid"));

static MONTH_WORD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"(?i)\b{MONTH_WORDS}\b")).expect("valid"));

/// Resolve the first date or date range expressed in `text`.
///
/// `text` should already have passed through [`crate::normalize::normalize`].
/// Returns `None` when no rule matches; callers must then ask the user for a
/// date rather than pick one. Returned spans are always ordered.
///
/// Ranges are not checked against [`DATE_MIN_GUARD`]; single-date and
/// month rules skip candidates before it and let the cascade continue.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use spot_engine::dates::parse_date_or_range;
///
/// let today = NaiveDate::from_ymd_opt(2025, 6, 15).unwrap();
/// let span = parse_date_or_range("10-15 Aug 2025", today).unwrap();
/// assert_eq!(span.start, NaiveDate::from_ymd_opt(2025, 8, 10).unwrap());
/// assert_eq!(span.end, NaiveDate::from_ymd_opt(2025, 8, 15).unwrap());
/// ```
pub fn parse_date_or_range(text: &str, today: NaiveDate) -> Option<DateSpan> {
    let s = text.to_lowercase();
    let s = s.trim();

    try_relative(s, today)
        .or_else(|| try_cross_month_range(s))
        .or_else(|| try_full_range(s))
        .or_else(|| try_same_month_day_range(s, today))
        .or_else(|| try_numeric_range(s))
        .or_else(|| try_iso_range(s))
        .or_else(|| try_numeric_date(s))
        .or_else(|| try_iso_date(s))
        .or_else(|| try_day_month(s, today))
        .or_else(|| try_month_year(s))
        .or_else(|| try_iso_month(s))
        .or_else(|| try_phrased_year(s))
}

/// Whether the user asked for a calendar month as such.
///
/// True when the span is one whole month and a month word appears in the
/// text, or when the text carries an explicit `YYYY-MM` token.
pub fn is_month_intent(text: &str, span: &DateSpan) -> bool {
    let has_month_word = MONTH_WORD_RE.is_match(text);
    (span.is_whole_month() && has_month_word) || ISO_MONTH_RE.is_match(text)
}

// ── Matchers ────────────────────────────────────────────────────────────────

fn try_relative(s: &str, today: NaiveDate) -> Option<DateSpan> {
    if YESTERDAY_RE.is_match(s) {
        let d = today.pred_opt()?;
        return Some(DateSpan::day(d));
    }
    if TODAY_RE.is_match(s) {
        return Some(DateSpan::day(today));
    }
    if THIS_MONTH_RE.is_match(s) {
        return month_span(today.year(), today.month()).ok();
    }
    if LAST_MONTH_RE.is_match(s) {
        let prev = first_of_month(today).pred_opt()?;
        return month_span(prev.year(), prev.month()).ok();
    }
    None
}

fn try_cross_month_range(s: &str) -> Option<DateSpan> {
    let c = CROSS_MONTH_RE.captures(s)?;
    let year = expand_year(int(&c, 5)?);
    let start = ymd(year, month(&c, 2)?, uint(&c, 1)?)?;
    let end = ymd(year, month(&c, 4)?, uint(&c, 3)?)?;
    trace!(rule = "cross_month", %start, %end);
    Some(DateSpan::new(start, end))
}

fn try_full_range(s: &str) -> Option<DateSpan> {
    let c = FULL_RANGE_RE.captures(s)?;
    let start = ymd(expand_year(int(&c, 3)?), month(&c, 2)?, uint(&c, 1)?)?;
    let end = ymd(expand_year(int(&c, 6)?), month(&c, 5)?, uint(&c, 4)?)?;
    trace!(rule = "full_range", %start, %end);
    Some(DateSpan::new(start, end))
}

fn try_same_month_day_range(s: &str, today: NaiveDate) -> Option<DateSpan> {
    let c = DAY_RANGE_RE.captures(s)?;
    let year = match c.get(4) {
        Some(m) => expand_year(m.as_str().parse().ok()?),
        None => today.year(),
    };
    let mon = month(&c, 3)?;
    let (d1, d2) = (uint(&c, 1)?, uint(&c, 2)?);
    let start = ymd(year, mon, d1.min(d2))?;
    let end = ymd(year, mon, d1.max(d2))?;
    trace!(rule = "same_month_days", %start, %end);
    Some(DateSpan::new(start, end))
}

fn try_numeric_range(s: &str) -> Option<DateSpan> {
    let c = NUMERIC_RANGE_RE.captures(s)?;
    let start = ymd(expand_year(int(&c, 3)?), uint(&c, 2)?, uint(&c, 1)?)?;
    let end = ymd(expand_year(int(&c, 6)?), uint(&c, 5)?, uint(&c, 4)?)?;
    trace!(rule = "numeric_range", %start, %end);
    Some(DateSpan::new(start, end))
}

fn try_iso_range(s: &str) -> Option<DateSpan> {
    let c = ISO_RANGE_RE.captures(s)?;
    let start = ymd(int(&c, 1)?, uint(&c, 2)?, uint(&c, 3)?)?;
    let end = ymd(int(&c, 4)?, uint(&c, 5)?, uint(&c, 6)?)?;
    trace!(rule = "iso_range", %start, %end);
    Some(DateSpan::new(start, end))
}

fn try_numeric_date(s: &str) -> Option<DateSpan> {
    let c = NUMERIC_DATE_RE.captures(s)?;
    let d = ymd(expand_year(int(&c, 3)?), uint(&c, 2)?, uint(&c, 1)?)?;
    guarded_day(d, "numeric_date")
}

fn try_iso_date(s: &str) -> Option<DateSpan> {
    let c = ISO_DATE_RE.captures(s)?;
    let d = ymd(int(&c, 1)?, uint(&c, 2)?, uint(&c, 3)?)?;
    guarded_day(d, "iso_date")
}

fn try_day_month(s: &str, today: NaiveDate) -> Option<DateSpan> {
    let c = DAY_MONTH_RE.captures(s)?;
    let year = match c.get(3) {
        Some(m) => expand_year(m.as_str().parse().ok()?),
        None => today.year(),
    };
    let d = ymd(year, month(&c, 2)?, uint(&c, 1)?)?;
    guarded_day(d, "day_month")
}

fn try_month_year(s: &str) -> Option<DateSpan> {
    let c = MONTH_YEAR_RE.captures(s)?;
    let span = month_span(expand_year(int(&c, 2)?), month(&c, 1)?).ok()?;
    guarded_span(span, "month_year")
}

fn try_iso_month(s: &str) -> Option<DateSpan> {
    let c = ISO_MONTH_RE.captures(s)?;
    let span = month_span(int(&c, 1)?, uint(&c, 2)?).ok()?;
    guarded_span(span, "iso_month")
}

fn try_phrased_year(s: &str) -> Option<DateSpan> {
    let c = YEAR_RE.captures(s)?;
    if !YEAR_PHRASE_RE.is_match(s) {
        return None;
    }
    let year = int(&c, 1)?;
    let span = DateSpan::new(ymd(year, 1, 1)?, ymd(year, 12, 31)?);
    trace!(rule = "phrased_year", year);
    Some(span)
}

// ── Helpers ─────────────────────────────────────────────────────────────────

fn guarded_day(d: NaiveDate, rule: &'static str) -> Option<DateSpan> {
    if d < DATE_MIN_GUARD {
        trace!(rule, %d, "below minimum date, skipping");
        return None;
    }
    trace!(rule, %d);
    Some(DateSpan::day(d))
}

fn guarded_span(span: DateSpan, rule: &'static str) -> Option<DateSpan> {
    if span.starts_before_guard() {
        trace!(rule, start = %span.start, "below minimum date, skipping");
        return None;
    }
    trace!(rule, start = %span.start, end = %span.end);
    Some(span)
}

fn ymd(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, day)
}

fn int(c: &Captures<'_>, i: usize) -> Option<i32> {
    c.get(i)?.as_str().parse().ok()
}

fn uint(c: &Captures<'_>, i: usize) -> Option<u32> {
    c.get(i)?.as_str().parse().ok()
}

fn month(c: &Captures<'_>, i: usize) -> Option<u32> {
    month_number(c.get(i)?.as_str())
}
