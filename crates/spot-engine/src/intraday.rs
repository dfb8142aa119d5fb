//! Time-of-day resolution: hour blocks and quarter slots.
//!
//! Hour block `b` (1–24) covers `[(b-1)*60, b*60)` minutes of the delivery
//! day and quarter slot `s` (1–96) covers `[(s-1)*15, s*15)`. The end of the
//! day is written `24:00`, never `00:00`.
//!
//! Extraction runs independently of the date resolvers, on text with every
//! date phrase blanked out, in this order:
//!
//! 1. Explicit clock ranges (`08:00 to 18:00`, `8am-6pm`, `18:00 to 24`),
//!    converted to hour blocks and quarter slots at the same time.
//! 2. Ranges qualified by a trailing unit: `10 to 12 hrs`, `5-12 blocks`.
//! 3. Bare ranges (`10 to 12`), only when no clock range was found; hour
//!    blocks unless block/slot wording is present or the upper bound
//!    exceeds 24.

use std::ops::RangeInclusive;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::Serialize;
use tracing::trace;

use crate::calendar::MONTH_WORDS;
use crate::query::{Granularity, Selection, HOUR_BLOCKS, QUARTER_SLOTS};

const MINUTES_PER_DAY: u32 = 24 * 60;

static CLOCK_RANGE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(?:from\s*)?(\d{1,2})(?::(\d{2}))?\s*(am|pm)?\s*(?:to|till|until|-)\s*(\d{1,2})(?::(\d{2}))?\s*(am|pm)?\b",
    )
    .expect("clock range pattern compiles")
});

static HOUR_UNIT_RANGE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(\d{1,2})\s*(?:to|-)\s*(\d{1,2})\s*(?:hours?|hrs?)\b")
        .expect("hour unit range pattern compiles")
});

static SLOT_UNIT_RANGE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(\d{1,2})\s*(?:to|-)\s*(\d{1,2})\s*(?:blocks?|slots?|quarters?)\b")
        .expect("slot unit range pattern compiles")
});

static BARE_RANGE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(\d{1,2})\s*(?:to|-)\s*(\d{1,2})\b").expect("bare range pattern compiles")
});

static QUARTER_WORDS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(blocks?|slots?|quarters?)\b").expect("valid"));
static HOUR_WORDS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(hours?|hrs?)\b").expect("valid"));
static FULL_DAY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(full day|all 24|entire day|whole day)\b").expect("valid"));

/// Date phrases blanked before any intraday matching so day numbers are
/// never read as hours.
static DATE_PHRASE_RES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"\b\d{4}-\d{1,2}(?:-\d{1,2})?\b".to_string(),
        r"\b\d{1,2}[/-]\d{1,2}[/-]\d{2,4}\b".to_string(),
        format!(
            r"\b(?:\d{{1,2}}\s*(?:to|-)\s*)?(?:\d{{1,2}}\s+)?{MONTH_WORDS}\b(?:\s+\d{{2,4}}(?:$|[^:\d]))?"
        ),
    ]
    .iter()
    .map(|p| Regex::new(p).expect("date phrase pattern compiles"))
    .collect()
});

// ── Formatting ──────────────────────────────────────────────────────────────

/// `HH:MM` for a minute offset into the delivery day; 1440 is `24:00`.
pub fn fmt_hhmm(total_min: u32) -> String {
    if total_min == MINUTES_PER_DAY {
        return "24:00".to_string();
    }
    let h = (total_min / 60) % 24;
    let m = total_min % 60;
    format!("{h:02}:{m:02}")
}

/// Clock window of hour block `b`, e.g. block 9 is `08:00–09:00`.
pub fn hour_block_window(b: u8) -> String {
    let b = u32::from(b);
    format!("{}–{}", fmt_hhmm(b.saturating_sub(1) * 60), fmt_hhmm(b * 60))
}

/// Clock window of quarter slot `s`, e.g. slot 33 is `08:00–08:15`.
pub fn slot_window(s: u8) -> String {
    let s = u32::from(s);
    format!("{}–{}", fmt_hhmm(s.saturating_sub(1) * 15), fmt_hhmm(s * 15))
}

/// Collapse indices into sorted, disjoint, inclusive `(lo, hi)` runs.
///
/// # Examples
///
/// ```
/// use spot_engine::intraday::compress_ranges;
///
/// assert_eq!(compress_ranges(&[5, 3, 4, 9, 10, 3]), vec![(3, 5), (9, 10)]);
/// assert!(compress_ranges(&[]).is_empty());
/// ```
pub fn compress_ranges(indices: &[u8]) -> Vec<(u8, u8)> {
    let mut sorted = indices.to_vec();
    sorted.sort_unstable();
    sorted.dedup();

    let mut out = Vec::new();
    let mut iter = sorted.into_iter();
    let Some(first) = iter.next() else {
        return out;
    };
    let (mut lo, mut prev) = (first, first);
    for x in iter {
        if u16::from(x) == u16::from(prev) + 1 {
            prev = x;
        } else {
            out.push((lo, prev));
            lo = x;
            prev = x;
        }
    }
    out.push((lo, prev));
    out
}

/// Duration label for a contiguous block span, e.g. `08:00–18:00 (10 hrs)`.
///
/// Absent bounds or the full `1..=24` span render as the whole day.
pub fn format_duration(block_start: Option<u8>, block_end: Option<u8>) -> String {
    match (block_start, block_end) {
        (Some(lo), Some(hi)) if !(lo == 1 && hi == HOUR_BLOCKS) && lo > 0 && hi > 0 => {
            let hours = (i32::from(hi) - i32::from(lo) + 1).max(1);
            format!("{:02}:00–{:02}:00 ({hours} hrs)", lo - 1, hi)
        }
        _ => "00:00–24:00 (24 hrs)".to_string(),
    }
}

// ── Extraction ──────────────────────────────────────────────────────────────

/// Intraday selection extracted from one message.
///
/// `hours` and `quarters` are both filled from the same clock spans so the
/// caller can use whichever `granularity` selects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimeRanges {
    pub hours: Vec<u8>,
    pub quarters: Vec<u8>,
    pub granularity: Granularity,
}

/// One explicit clock range kept apart from the others.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimeGroup {
    /// Clock span as typed, in 24-hour form, e.g. `09:00–11:00`.
    pub label: String,
    pub selection: Selection,
}

/// A clock span `H1[:M1][am|pm] to H2[:M2][am|pm]` in 24-hour terms.
#[derive(Debug, Clone, Copy)]
struct ClockRange {
    h1: u32,
    m1: u32,
    h2: u32,
    m2: u32,
    /// Right bound typed as a bare `24` (or `24:00`): end of day.
    ends_at_midnight: bool,
}

impl ClockRange {
    /// Build from a [`CLOCK_RANGE_RE`] match; `None` when neither side
    /// carries minutes or an am/pm marker, which makes it a bare range.
    fn from_captures(c: &Captures<'_>) -> Option<Self> {
        let marked = [2, 3, 5, 6].iter().any(|&i| c.get(i).is_some());
        if !marked {
            return None;
        }
        let num = |i: usize| -> Option<u32> {
            match c.get(i) {
                Some(m) => m.as_str().parse().ok(),
                None => Some(0),
            }
        };
        let (h1_raw, m1, h2_raw, m2) = (num(1)?, num(2)?, num(4)?, num(5)?);
        let a1 = c.get(3).map(|m| m.as_str());
        let a2 = c.get(6).map(|m| m.as_str());
        Some(Self {
            h1: to_24h(h1_raw, a1),
            m1,
            h2: to_24h(h2_raw, a2),
            m2,
            ends_at_midnight: h2_raw == 24 && a2.is_none() && m2 == 0,
        })
    }

    fn has_minutes(&self) -> bool {
        self.m1 > 0 || self.m2 > 0
    }

    /// Hour blocks touched by the span; a partial first hour is excluded and
    /// a partial last hour is included.
    fn hour_blocks(&self) -> RangeInclusive<u32> {
        let start = (self.h1 + 1 + u32::from(self.m1 > 0)).min(24);
        let end = if self.ends_at_midnight {
            24
        } else if self.m2 == 0 {
            self.h2.max(1)
        } else {
            (self.h2 + 1).min(24)
        };
        start..=end
    }

    /// Quarter slots wholly inside the span.
    fn quarter_slots(&self) -> RangeInclusive<u32> {
        let start = ((self.h1 * 60 + self.m1 + 14) / 15 + 1).clamp(1, 96);
        let end = if self.ends_at_midnight {
            96
        } else {
            ((self.h2 * 60 + self.m2) / 15).clamp(1, 96)
        };
        start..=end
    }

    fn label(&self) -> String {
        let end = if self.ends_at_midnight {
            MINUTES_PER_DAY
        } else {
            self.h2 * 60 + self.m2
        };
        format!("{}–{}", fmt_hhmm(self.h1 * 60 + self.m1), fmt_hhmm(end))
    }
}

/// 12-hour to 24-hour, clamped into `0..=23`.
fn to_24h(h: u32, ampm: Option<&str>) -> u32 {
    let h = match ampm {
        Some("pm") => h % 12 + 12,
        Some(_) => h % 12,
        None => h,
    };
    h.min(23)
}

fn push_range(out: &mut Vec<u8>, range: RangeInclusive<u32>) {
    out.extend(range.filter_map(|i| u8::try_from(i).ok()));
}

/// Lowercase the text and blank out every date phrase.
fn strip_dates(text: &str) -> String {
    DATE_PHRASE_RES
        .iter()
        .fold(text.to_lowercase(), |s, re| re.replace_all(&s, " ").into_owned())
}

fn clock_ranges(clean: &str) -> Vec<ClockRange> {
    CLOCK_RANGE_RE
        .captures_iter(clean)
        .filter_map(|c| ClockRange::from_captures(&c))
        .collect()
}

fn finalize(mut v: Vec<u8>, max: u8) -> Vec<u8> {
    v.retain(|i| (1..=max).contains(i));
    v.sort_unstable();
    v.dedup();
    v
}

/// Extract the merged intraday selection from `text`.
///
/// Granularity: quarter when block/slot/quarter wording appears or any clock
/// bound has non-zero minutes; otherwise quarter only when slots alone were
/// extracted, else hour. Nothing extracted means the full day in hours.
///
/// # Examples
///
/// ```
/// use spot_engine::intraday::parse_ranges;
/// use spot_engine::query::Granularity;
///
/// let r = parse_ranges("08:00 to 18:00");
/// assert_eq!(r.hours, (9..=18).collect::<Vec<u8>>());
/// assert_eq!(r.quarters, (33..=72).collect::<Vec<u8>>());
/// assert_eq!(r.granularity, Granularity::Hour);
/// ```
pub fn parse_ranges(text: &str) -> TimeRanges {
    let s = text.to_lowercase();
    let clean = strip_dates(&s);

    let mut hours: Vec<u8> = Vec::new();
    let mut quarters: Vec<u8> = Vec::new();

    let mut prefer_quarter = QUARTER_WORDS_RE.is_match(&s);
    let prefer_hour = HOUR_WORDS_RE.is_match(&s);

    if FULL_DAY_RE.is_match(&s) {
        push_range(&mut hours, 1..=24);
    }

    let clocks = clock_ranges(&clean);
    let any_minute_nonzero = clocks.iter().any(ClockRange::has_minutes);
    for clock in &clocks {
        trace!(label = %clock.label(), "clock range");
        push_range(&mut hours, clock.hour_blocks());
        push_range(&mut quarters, clock.quarter_slots());
    }

    for c in HOUR_UNIT_RANGE_RE.captures_iter(&clean) {
        let (Some(a), Some(b)) = (cap_u32(&c, 1), cap_u32(&c, 2)) else {
            continue;
        };
        let h1 = a.min(23);
        let h2 = b.min(24);
        let start = (h1 + 1).min(24);
        let end = if h2 == 24 { 24 } else { h2.clamp(1, 24) };
        push_range(&mut hours, start..=end);
    }

    for c in SLOT_UNIT_RANGE_RE.captures_iter(&clean) {
        let (Some(a), Some(b)) = (cap_u32(&c, 1), cap_u32(&c, 2)) else {
            continue;
        };
        let (lo, hi) = (a.min(b).max(1), a.max(b).min(96));
        push_range(&mut quarters, lo..=hi);
        prefer_quarter = true;
    }

    if clocks.is_empty() {
        let rest = SLOT_UNIT_RANGE_RE.replace_all(&clean, " ");
        let rest = HOUR_UNIT_RANGE_RE.replace_all(&rest, " ");
        for c in BARE_RANGE_RE.captures_iter(&rest) {
            let (Some(a), Some(b)) = (cap_u32(&c, 1), cap_u32(&c, 2)) else {
                continue;
            };
            let (lo, hi) = (a.min(b), a.max(b));
            if prefer_quarter || hi > 24 {
                push_range(&mut quarters, lo.max(1)..=hi.min(96));
            } else {
                push_range(&mut hours, lo.max(1)..=hi.min(24));
            }
        }
    }

    let hours = finalize(hours, HOUR_BLOCKS);
    let quarters = finalize(quarters, QUARTER_SLOTS);

    let granularity = if prefer_quarter || any_minute_nonzero {
        Granularity::Quarter
    } else if prefer_hour || !hours.is_empty() || quarters.is_empty() {
        Granularity::Hour
    } else {
        Granularity::Quarter
    };

    TimeRanges {
        hours,
        quarters,
        granularity,
    }
}

/// Extract every explicit clock range as its own selection.
///
/// `09:00–11:00 and 14:00–16:00` yields two groups instead of one merged
/// set. All groups share one granularity: quarter when block/slot wording is
/// present or any bound has non-zero minutes, otherwise hour, in which case
/// the quarter-slot view of each span is dropped. Empty and repeated groups
/// are skipped.
pub fn extract_explicit_time_groups(text: &str) -> Vec<TimeGroup> {
    let s = text.to_lowercase();
    let clocks = clock_ranges(&strip_dates(&s));
    let quarter = QUARTER_WORDS_RE.is_match(&s) || clocks.iter().any(ClockRange::has_minutes);

    let mut groups: Vec<TimeGroup> = Vec::new();
    for clock in &clocks {
        let mut indices = Vec::new();
        let selection = if quarter {
            push_range(&mut indices, clock.quarter_slots());
            Selection::Slots(finalize(indices, QUARTER_SLOTS))
        } else {
            push_range(&mut indices, clock.hour_blocks());
            Selection::Hours(finalize(indices, HOUR_BLOCKS))
        };
        if selection.indices().is_empty() || groups.iter().any(|g| g.selection == selection) {
            continue;
        }
        groups.push(TimeGroup {
            label: clock.label(),
            selection,
        });
    }
    groups
}

fn cap_u32(c: &Captures<'_>, i: usize) -> Option<u32> {
    c.get(i)?.as_str().parse().ok()
}
