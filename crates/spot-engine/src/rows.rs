//! Row shapes returned by the price store.
//!
//! Prices are ₹/MWh as stored; presentation converts to ₹/kWh. A missing
//! price means the interval was not cleared and is skipped by every
//! aggregate.

use chrono::NaiveDate;
use serde::Serialize;

use crate::intraday::{hour_block_window, slot_window};

/// One hour block of one delivery day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourlyRow {
    pub delivery_date: NaiveDate,
    /// 1–24.
    pub block_index: u8,
    pub price_rs_per_mwh: Option<f64>,
    pub scheduled_mw: Option<f64>,
    pub duration_min: Option<f64>,
}

/// One 15-minute slot of one delivery day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuarterRow {
    pub delivery_date: NaiveDate,
    /// 1–96.
    pub slot_index: u8,
    pub price_rs_per_mwh: Option<f64>,
    pub scheduled_mw: Option<f64>,
    pub duration_min: Option<f64>,
}

/// Daily settlement of a derivative contract, possibly carried forward from
/// an earlier trading day when the market was closed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivDailyRow {
    pub exchange: String,
    pub commodity: String,
    /// The day that was asked for.
    pub trading_date: NaiveDate,
    /// The day whose close is reported; earlier than `trading_date` on
    /// market holidays.
    pub used_trading_date: NaiveDate,
    /// First day of the contract month.
    pub contract_month: NaiveDate,
    pub close_price_rs_per_mwh: Option<f64>,
}

impl DerivDailyRow {
    /// Whether the close was carried forward from an earlier day.
    pub fn is_carried_forward(&self) -> bool {
        self.used_trading_date != self.trading_date
    }
}

/// Final settlement of a monthly contract on its expiry day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivExpiryRow {
    pub exchange: String,
    pub commodity: String,
    pub expiry_date: NaiveDate,
    pub expiry_close: Option<f64>,
}

/// Spot rows of one query, in fetch order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "granularity", content = "rows", rename_all = "snake_case")]
pub enum SpotRows {
    Hourly(Vec<HourlyRow>),
    Quarter(Vec<QuarterRow>),
}

impl SpotRows {
    pub fn len(&self) -> usize {
        match self {
            SpotRows::Hourly(v) => v.len(),
            SpotRows::Quarter(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A priced interval the aggregator can weigh.
pub trait PricePoint {
    fn delivery_date(&self) -> NaiveDate;
    /// Block or slot number within the delivery day.
    fn index(&self) -> u8;
    fn price(&self) -> Option<f64>;
    fn scheduled_mw(&self) -> Option<f64>;
    fn duration_min(&self) -> Option<f64>;
    /// Interval length used when `duration_min` is missing.
    fn default_duration(&self) -> f64;
    /// Clock window of the interval, `HH:MM–HH:MM`.
    fn window(&self) -> String;

    /// Weight in minutes. A missing duration means the full interval; a
    /// reported one is used as is, with negatives counting as zero.
    fn minutes(&self) -> f64 {
        match self.duration_min() {
            Some(d) => d.max(0.0),
            None => self.default_duration(),
        }
    }
}

impl PricePoint for HourlyRow {
    fn delivery_date(&self) -> NaiveDate {
        self.delivery_date
    }
    fn index(&self) -> u8 {
        self.block_index
    }
    fn price(&self) -> Option<f64> {
        self.price_rs_per_mwh
    }
    fn scheduled_mw(&self) -> Option<f64> {
        self.scheduled_mw
    }
    fn duration_min(&self) -> Option<f64> {
        self.duration_min
    }
    fn default_duration(&self) -> f64 {
        60.0
    }
    fn window(&self) -> String {
        hour_block_window(self.block_index)
    }
}

impl PricePoint for QuarterRow {
    fn delivery_date(&self) -> NaiveDate {
        self.delivery_date
    }
    fn index(&self) -> u8 {
        self.slot_index
    }
    fn price(&self) -> Option<f64> {
        self.price_rs_per_mwh
    }
    fn scheduled_mw(&self) -> Option<f64> {
        self.scheduled_mw
    }
    fn duration_min(&self) -> Option<f64> {
        self.duration_min
    }
    fn default_duration(&self) -> f64 {
        15.0
    }
    fn window(&self) -> String {
        slot_window(self.slot_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_minutes_default_only_when_missing() {
        let mut h = HourlyRow {
            delivery_date: d(2025, 8, 1),
            block_index: 1,
            price_rs_per_mwh: Some(4000.0),
            scheduled_mw: None,
            duration_min: None,
        };
        assert_eq!(h.minutes(), 60.0);
        h.duration_min = Some(0.0);
        assert_eq!(h.minutes(), 0.0);
        h.duration_min = Some(30.0);
        assert_eq!(h.minutes(), 30.0);

        let q = QuarterRow {
            delivery_date: d(2025, 8, 1),
            slot_index: 5,
            price_rs_per_mwh: None,
            scheduled_mw: None,
            duration_min: None,
        };
        assert_eq!(q.minutes(), 15.0);
        assert_eq!(q.index(), 5);
        assert_eq!(q.window(), "01:00–01:15");
    }

    #[test]
    fn test_carried_forward_close() {
        let row = DerivDailyRow {
            exchange: "MCX".into(),
            commodity: "ELECDMBL".into(),
            trading_date: d(2025, 8, 10),
            used_trading_date: d(2025, 8, 8),
            contract_month: d(2025, 8, 1),
            close_price_rs_per_mwh: Some(4100.0),
        };
        assert!(row.is_carried_forward());
    }
}
