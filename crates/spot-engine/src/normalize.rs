//! Input canonicalization and the keyword detectors that run on it.
//!
//! [`normalize`] is total and idempotent. Every later stage works on its
//! output, so the rewrites here are ordered: dashes are unified first, then
//! range phrases are folded to `to`, then `<month>-<yy>` shorthands become
//! four-digit years.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::calendar::MONTH_WORDS;
use crate::query::{Exchange, Market, Stat};

/// Dash-like characters folded to ASCII `-` (en/em dash, hyphen variants, minus).
const DASHES: &[char] = &['\u{2013}', '\u{2014}', '\u{2010}', '\u{2011}', '\u{2012}', '\u{2212}'];

/// Upper bound on rewrite passes; real input reaches a fixed point in one or two.
const MAX_PASSES: usize = 8;

static WHITESPACE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("whitespace pattern compiles"));

static BETWEEN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bbetween\s+(\S.*?)\s+and\s+(\S.*?)\b").expect("between pattern compiles")
});

static TO_SYNONYM_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(upto|through|till|until)\b").expect("to-synonym pattern compiles")
});

static MONTH_SHORT_YEAR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(?i)\b{MONTH_WORDS}\s*[-']\s*(\d{{2}})\b"))
        .expect("month short-year pattern compiles")
});

static GDAM_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(gdam|green day\.?\s*-?\s*ahead)\b").expect("gdam pattern compiles")
});

static EXCHANGE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(mcx|nse)\b").expect("exchange pattern compiles"));

static VWAP_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(vwap|weighted)\b").expect("vwap pattern compiles"));
static DAILY_AVG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bdaily\s+(avg|average)\b").expect("daily avg pattern compiles"));
static LIST_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(list|table|rows|detailed)\b").expect("list pattern compiles"));
static TWAP_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(avg|average|mean|twap)\b").expect("twap pattern compiles"));

fn normalize_pass(text: &str) -> String {
    let s: String = text
        .trim()
        .chars()
        .map(|c| if DASHES.contains(&c) { '-' } else { c })
        .collect();
    let s = WHITESPACE_RE.replace_all(&s, " ");
    let s = BETWEEN_RE.replace_all(&s, "${1} to ${2}");
    let s = TO_SYNONYM_RE.replace_all(&s, "to");
    let s = MONTH_SHORT_YEAR_RE.replace_all(&s, "${1} 20${2}");
    s.trim().to_string()
}

/// Canonicalize free text for the resolvers.
///
/// Unifies dashes, collapses whitespace, rewrites `between A and B` to
/// `A to B`, folds `upto`/`through`/`till`/`until` to `to` and expands
/// `Aug-25` / `Aug'25` to `Aug 2025`. Never fails.
///
/// # Examples
///
/// ```
/// use spot_engine::normalize::normalize;
///
/// assert_eq!(normalize("between 10  and 12 hrs"), "10 to 12 hrs");
/// assert_eq!(normalize("DAM Aug-25"), "DAM Aug 2025");
/// assert_eq!(normalize("1 Aug \u{2013} 5 Aug 2025"), "1 Aug - 5 Aug 2025");
/// ```
pub fn normalize(text: &str) -> String {
    let mut current = normalize_pass(text);
    for _ in 1..MAX_PASSES {
        let next = normalize_pass(&current);
        if next == current {
            break;
        }
        current = next;
    }
    current
}

/// GDAM when the text names the green market, otherwise DAM.
pub fn parse_market(text: &str) -> Market {
    if GDAM_RE.is_match(text) {
        Market::Gdam
    } else {
        Market::Dam
    }
}

/// Requested statistic; the first keyword family that matches wins.
pub fn parse_stat(text: &str, default: Stat) -> Stat {
    let s = text.to_lowercase();
    if VWAP_RE.is_match(&s) {
        Stat::Vwap
    } else if DAILY_AVG_RE.is_match(&s) {
        Stat::DailyAvg
    } else if LIST_RE.is_match(&s) {
        Stat::List
    } else if TWAP_RE.is_match(&s) {
        Stat::Twap
    } else {
        default
    }
}

/// Derivative exchange named in the text, if any.
pub fn parse_exchange(text: &str) -> Option<Exchange> {
    EXCHANGE_RE
        .captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}
