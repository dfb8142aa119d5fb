//! Derivative companion data attached to each spot period.
//!
//! The shape of the resolved range decides what is fetched:
//!
//! | Range                         | Fetch                                      |
//! |-------------------------------|--------------------------------------------|
//! | single day                    | as-of daily close on that day              |
//! | same month, or month intent   | daily close on the end day, filtered to the end day's contract month; expiry close of that month when none |
//! | across months                 | as-of daily close on the end day           |
//!
//! Planning and row filtering live here; fetching is the caller's job.

use std::collections::HashSet;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use tracing::debug;

use crate::calendar::{first_of_month, DateSpan};
use crate::rows::{DerivDailyRow, DerivExpiryRow};

/// What to fetch for one period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CompanionPlan {
    /// Nearest prior-or-equal close on `day`; shown even when empty.
    SingleDay { day: NaiveDate },
    /// Close on `day` for the contract month starting `month`, else that
    /// month's expiry close.
    ContractMonth { day: NaiveDate, month: NaiveDate },
    /// Nearest prior-or-equal close on the last day of a multi-month range;
    /// omitted when empty.
    AsOfEnd { day: NaiveDate },
}

impl CompanionPlan {
    /// The trading day the daily-close fetch targets.
    pub fn target_day(&self) -> NaiveDate {
        match *self {
            CompanionPlan::SingleDay { day }
            | CompanionPlan::ContractMonth { day, .. }
            | CompanionPlan::AsOfEnd { day } => day,
        }
    }
}

/// Choose the companion fetch for a resolved span.
pub fn select_companion(span: &DateSpan, month_intent: bool) -> CompanionPlan {
    let plan = if span.is_single_day() {
        CompanionPlan::SingleDay { day: span.start }
    } else if span.is_same_month() || month_intent {
        CompanionPlan::ContractMonth {
            day: span.end,
            month: first_of_month(span.end),
        }
    } else {
        CompanionPlan::AsOfEnd { day: span.end }
    };
    debug!(?plan, "companion plan");
    plan
}

/// Keep the first row per exchange, preserving order.
pub fn first_per_exchange(rows: Vec<DerivDailyRow>) -> Vec<DerivDailyRow> {
    let mut seen = HashSet::new();
    rows.into_iter()
        .filter(|r| seen.insert(r.exchange.clone()))
        .collect()
}

/// Rows whose contract month is `month`'s calendar month, first per exchange.
pub fn filter_contract_month(rows: Vec<DerivDailyRow>, month: NaiveDate) -> Vec<DerivDailyRow> {
    let matching = rows
        .into_iter()
        .filter(|r| {
            r.contract_month.year() == month.year() && r.contract_month.month() == month.month()
        })
        .collect();
    first_per_exchange(matching)
}

/// Fetched companion data, ready to render.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CompanionData {
    /// As-of daily closes for `requested`.
    DailyClose {
        requested: NaiveDate,
        rows: Vec<DerivDailyRow>,
        /// Render a placeholder when `rows` is empty instead of omitting
        /// the block.
        show_empty: bool,
    },
    /// Daily closes of the contract month starting `month`.
    ContractMonth {
        month: NaiveDate,
        rows: Vec<DerivDailyRow>,
    },
    /// Expiry closes of the contract month starting `month`.
    Expiry {
        month: NaiveDate,
        rows: Vec<DerivExpiryRow>,
    },
}

/// How the used trading dates relate to the requested day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClosedNote {
    /// Every row is from the requested day.
    Open,
    /// Every row carries the same earlier close date.
    LastClose(NaiveDate),
    /// Exchanges fell back to different earlier days.
    PerExchange,
}

/// Classify the used trading dates of `rows` against `requested`.
pub fn closed_note(requested: NaiveDate, rows: &[DerivDailyRow]) -> ClosedNote {
    let used: HashSet<NaiveDate> = rows.iter().map(|r| r.used_trading_date).collect();
    match used.len() {
        0 => ClosedNote::Open,
        1 => match used.into_iter().next() {
            Some(d) if d != requested => ClosedNote::LastClose(d),
            _ => ClosedNote::Open,
        },
        _ => ClosedNote::PerExchange,
    }
}
