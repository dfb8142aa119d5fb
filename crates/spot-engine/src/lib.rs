//! # spot-engine
//!
//! Deterministic resolution of free-text electricity spot-price questions.
//!
//! Turns a message like `GDAM 10-15 Aug 2025 08:00 to 18:00 vwap` into a
//! validated [`QuerySpec`], aggregates the rows a store returns for it, and
//! renders the Markdown reply. Nothing here reads the clock or does I/O:
//! every relative phrase is resolved against an explicit `today`.
//!
//! ## Modules
//!
//! - [`normalize`] — input canonicalization, market/stat/exchange keywords
//! - [`dates`] — single date or date range, first matching rule wins
//! - [`periods`] — one month across several years
//! - [`intraday`] — hour blocks (1–24) and quarter slots (1–96)
//! - [`query`] — the canonical [`QuerySpec`] and its gate [`canonicalize`]
//! - [`rows`] — typed store rows
//! - [`aggregate`] — TWAP, VWAP, daily averages
//! - [`companion`] — which derivative data accompanies a period
//! - [`render`] — Markdown sections and fixed user messages
//! - [`calendar`] — month tables and [`DateSpan`]
//! - [`error`] — Error types

pub mod aggregate;
pub mod calendar;
pub mod companion;
pub mod dates;
pub mod error;
pub mod intraday;
pub mod normalize;
pub mod periods;
pub mod query;
pub mod render;
pub mod rows;

pub use aggregate::{daily_averages, money, scheduled_energy_mwh, twap, vwap};
pub use calendar::{DateSpan, DATE_MIN_GUARD};
pub use companion::{select_companion, CompanionData, CompanionPlan};
pub use dates::{is_month_intent, parse_date_or_range};
pub use error::EngineError;
pub use intraday::{
    compress_ranges, extract_explicit_time_groups, format_duration, hour_block_window,
    parse_ranges, slot_window, TimeGroup, TimeRanges,
};
pub use normalize::{normalize, parse_exchange, parse_market, parse_stat};
pub use periods::parse_multi_year_months;
pub use query::{canonicalize, Exchange, Granularity, Market, QuerySpec, Selection, Stat};
pub use rows::{DerivDailyRow, DerivExpiryRow, HourlyRow, PricePoint, QuarterRow, SpotRows};
