//! The canonical query descriptor.
//!
//! [`canonicalize`] is the single gate between parsing and everything
//! downstream: a [`QuerySpec`] carries an ordered date span, exactly one
//! intraday selection matching its granularity, a known market and a known
//! statistic. Aggregation and rendering consume nothing else.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::Serialize;

use crate::calendar::DateSpan;
use crate::error::EngineError;

pub const HOUR_BLOCKS: u8 = 24;
pub const QUARTER_SLOTS: u8 = 96;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Market {
    Dam,
    Gdam,
}

impl Market {
    pub fn as_str(&self) -> &'static str {
        match self {
            Market::Dam => "DAM",
            Market::Gdam => "GDAM",
        }
    }

    /// Anything that is not literally GDAM is the day-ahead market.
    pub fn normalize(label: &str) -> Self {
        if label.trim().eq_ignore_ascii_case("gdam") {
            Market::Gdam
        } else {
            Market::Dam
        }
    }
}

impl fmt::Display for Market {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Market {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dam" => Ok(Market::Dam),
            "gdam" => Ok(Market::Gdam),
            other => Err(EngineError::InvalidMarket(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stat {
    List,
    Twap,
    Vwap,
    DailyAvg,
}

impl Stat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stat::List => "list",
            Stat::Twap => "twap",
            Stat::Vwap => "vwap",
            Stat::DailyAvg => "daily_avg",
        }
    }

    /// Unknown labels become [`Stat::List`].
    pub fn normalize(label: &str) -> Self {
        label.parse().unwrap_or(Stat::List)
    }
}

impl fmt::Display for Stat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stat {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "list" => Ok(Stat::List),
            "twap" => Ok(Stat::Twap),
            "vwap" => Ok(Stat::Vwap),
            "daily_avg" => Ok(Stat::DailyAvg),
            other => Err(EngineError::InvalidStat(other.to_string())),
        }
    }
}

/// Derivative exchange a companion fetch can be restricted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Exchange {
    Mcx,
    Nse,
}

impl Exchange {
    pub fn as_str(&self) -> &'static str {
        match self {
            Exchange::Mcx => "MCX",
            Exchange::Nse => "NSE",
        }
    }
}

impl fmt::Display for Exchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Exchange {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mcx" => Ok(Exchange::Mcx),
            "nse" => Ok(Exchange::Nse),
            other => Err(EngineError::InvalidExchange(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    Hour,
    Quarter,
}

/// The intraday part of a query: hour blocks 1–24 or quarter slots 1–96,
/// sorted and de-duplicated. Exactly one is ever present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "granularity", content = "indices", rename_all = "snake_case")]
pub enum Selection {
    #[serde(rename = "hour")]
    Hours(Vec<u8>),
    #[serde(rename = "quarter")]
    Slots(Vec<u8>),
}

impl Selection {
    pub fn granularity(&self) -> Granularity {
        match self {
            Selection::Hours(_) => Granularity::Hour,
            Selection::Slots(_) => Granularity::Quarter,
        }
    }

    pub fn indices(&self) -> &[u8] {
        match self {
            Selection::Hours(v) | Selection::Slots(v) => v,
        }
    }

    pub fn is_full_day(&self) -> bool {
        match self {
            Selection::Hours(v) => v.len() == HOUR_BLOCKS as usize,
            Selection::Slots(v) => v.len() == QUARTER_SLOTS as usize,
        }
    }
}

/// Immutable, validated description of one spot-price query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuerySpec {
    pub market: Market,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub selection: Selection,
    pub stat: Stat,
    /// Reserved; always `ALL`.
    pub area: &'static str,
}

impl QuerySpec {
    pub fn granularity(&self) -> Granularity {
        self.selection.granularity()
    }

    pub fn span(&self) -> DateSpan {
        DateSpan::new(self.start_date, self.end_date)
    }

    pub fn hours(&self) -> Option<&[u8]> {
        match &self.selection {
            Selection::Hours(v) => Some(v),
            Selection::Slots(_) => None,
        }
    }

    pub fn slots(&self) -> Option<&[u8]> {
        match &self.selection {
            Selection::Slots(v) => Some(v),
            Selection::Hours(_) => None,
        }
    }
}

/// Keep in-bounds indices, sorted and de-duplicated; an empty result
/// becomes the whole day `1..=max`.
fn clean_indices(indices: &[u8], max: u8) -> Vec<u8> {
    let mut out: Vec<u8> = indices
        .iter()
        .copied()
        .filter(|i| (1..=max).contains(i))
        .collect();
    out.sort_unstable();
    out.dedup();
    if out.is_empty() {
        (1..=max).collect()
    } else {
        out
    }
}

/// Merge a resolved period, intraday selection, market and statistic into a
/// [`QuerySpec`].
///
/// Returns `None` when either date is missing. Inverted dates are swapped,
/// the market label is folded to DAM/GDAM, an empty selection defaults to
/// the full day and an unknown statistic becomes `list`.
pub fn canonicalize(
    market: &str,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    granularity: Granularity,
    hours: &[u8],
    slots: &[u8],
    stat: &str,
) -> Option<QuerySpec> {
    let span = DateSpan::new(start?, end?);
    let selection = match granularity {
        Granularity::Hour => Selection::Hours(clean_indices(hours, HOUR_BLOCKS)),
        Granularity::Quarter => Selection::Slots(clean_indices(slots, QUARTER_SLOTS)),
    };
    Some(QuerySpec {
        market: Market::normalize(market),
        start_date: span.start,
        end_date: span.end,
        selection,
        stat: Stat::normalize(stat),
        area: "ALL",
    })
}
