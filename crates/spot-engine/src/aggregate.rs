//! Price aggregation over spot rows.
//!
//! Inputs are ₹/MWh; every average is returned in ₹/kWh. `None` always
//! means "no data" and must never be rendered as zero.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::rows::PricePoint;

const MWH_TO_KWH: f64 = 1000.0;

/// Placeholder for an absent value.
pub const NO_DATA: &str = "—";

/// Duration-weighted mean price in ₹/kWh.
///
/// Rows without a price are skipped. `None` when nothing priced remains or
/// the total duration is zero.
pub fn twap<R: PricePoint>(rows: &[R]) -> Option<f64> {
    weighted_mean(rows, |r| r.minutes())
}

/// Schedule × duration weighted mean price in ₹/kWh.
///
/// Falls back to [`twap`] when the summed schedule weight is zero, e.g. when
/// no scheduled volume was reported.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use spot_engine::aggregate::{twap, vwap};
/// use spot_engine::rows::HourlyRow;
///
/// let day = NaiveDate::from_ymd_opt(2025, 8, 1).unwrap();
/// let row = |b, p| HourlyRow {
///     delivery_date: day,
///     block_index: b,
///     price_rs_per_mwh: Some(p),
///     scheduled_mw: None,
///     duration_min: Some(60.0),
/// };
/// let rows = [row(1, 3000.0), row(2, 5000.0)];
/// assert_eq!(vwap(&rows), twap(&rows));
/// assert_eq!(twap(&rows), Some(4.0));
/// ```
pub fn vwap<R: PricePoint>(rows: &[R]) -> Option<f64> {
    weighted_mean(rows, |r| r.scheduled_mw().unwrap_or(0.0) * r.minutes()).or_else(|| twap(rows))
}

fn weighted_mean<R, W>(rows: &[R], weight: W) -> Option<f64>
where
    R: PricePoint,
    W: Fn(&R) -> f64,
{
    let (num, den) = rows
        .iter()
        .filter_map(|r| r.price().map(|p| (p, weight(r))))
        .fold((0.0, 0.0), |(num, den), (p, w)| (num + p * w, den + w));
    if den == 0.0 {
        None
    } else {
        Some(num / den / MWH_TO_KWH)
    }
}

/// TWAP per delivery date, ascending by date. Dates with no priced rows are
/// omitted.
pub fn daily_averages<R: PricePoint>(rows: &[R]) -> Vec<(NaiveDate, f64)> {
    let mut by_day: BTreeMap<NaiveDate, Vec<&R>> = BTreeMap::new();
    for r in rows {
        by_day.entry(r.delivery_date()).or_default().push(r);
    }
    by_day
        .into_iter()
        .filter_map(|(day, rs)| {
            let (num, den) = rs
                .iter()
                .filter_map(|r| r.price().map(|p| (p, r.minutes())))
                .fold((0.0, 0.0), |(num, den), (p, w)| (num + p * w, den + w));
            (den > 0.0).then(|| (day, num / den / MWH_TO_KWH))
        })
        .collect()
}

/// Scheduled energy in MWh: Σ schedule × duration / 60.
pub fn scheduled_energy_mwh<R: PricePoint>(rows: &[R]) -> f64 {
    rows.iter()
        .map(|r| r.scheduled_mw().unwrap_or(0.0) * r.minutes() / 60.0)
        .sum()
}

/// ₹ with four decimals, or [`NO_DATA`].
pub fn money(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() => format!("₹{v:.4}"),
        _ => NO_DATA.to_string(),
    }
}

/// ₹/MWh stored price as ₹/kWh.
pub fn per_kwh(rs_per_mwh: Option<f64>) -> Option<f64> {
    rs_per_mwh.map(|p| p / MWH_TO_KWH)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rows::{HourlyRow, QuarterRow};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn hourly(day: NaiveDate, b: u8, price: Option<f64>, mw: Option<f64>) -> HourlyRow {
        HourlyRow {
            delivery_date: day,
            block_index: b,
            price_rs_per_mwh: price,
            scheduled_mw: mw,
            duration_min: Some(60.0),
        }
    }

    fn approx(a: Option<f64>, b: f64) -> bool {
        a.is_some_and(|a| (a - b).abs() < 1e-9)
    }

    #[test]
    fn test_twap_empty_is_none() {
        let rows: Vec<HourlyRow> = Vec::new();
        assert_eq!(twap(&rows), None);
        assert_eq!(vwap(&rows), None);
    }

    #[test]
    fn test_twap_weights_by_duration() {
        let day = d(2025, 8, 1);
        let rows = vec![
            QuarterRow {
                delivery_date: day,
                slot_index: 1,
                price_rs_per_mwh: Some(2000.0),
                scheduled_mw: None,
                duration_min: Some(15.0),
            },
            QuarterRow {
                delivery_date: day,
                slot_index: 2,
                price_rs_per_mwh: Some(6000.0),
                scheduled_mw: None,
                duration_min: Some(45.0),
            },
        ];
        assert!(approx(twap(&rows), 5.0));
    }

    #[test]
    fn test_twap_skips_unpriced_rows() {
        let day = d(2025, 8, 1);
        let rows = vec![hourly(day, 1, Some(4000.0), None), hourly(day, 2, None, None)];
        assert!(approx(twap(&rows), 4.0));
        let unpriced = vec![hourly(day, 1, None, Some(10.0))];
        assert_eq!(twap(&unpriced), None);
    }

    #[test]
    fn test_zero_total_duration_is_no_data() {
        let day = d(2025, 8, 1);
        let mut row = hourly(day, 1, Some(4000.0), Some(100.0));
        row.duration_min = Some(0.0);
        assert_eq!(twap(&[row.clone()]), None);
        assert_eq!(vwap(&[row.clone()]), None);
        assert!(daily_averages(&[row]).is_empty());
    }

    #[test]
    fn test_zero_duration_row_carries_no_weight() {
        let day = d(2025, 8, 1);
        let mut skipped = hourly(day, 1, Some(9000.0), None);
        skipped.duration_min = Some(0.0);
        let rows = vec![skipped, hourly(day, 2, Some(4000.0), None)];
        assert!(approx(twap(&rows), 4.0));
    }

    #[test]
    fn test_vwap_weights_by_schedule() {
        let day = d(2025, 8, 1);
        let rows = vec![
            hourly(day, 1, Some(3000.0), Some(100.0)),
            hourly(day, 2, Some(6000.0), Some(200.0)),
        ];
        assert!(approx(vwap(&rows), 5.0));
        assert!(approx(twap(&rows), 4.5));
    }

    #[test]
    fn test_vwap_falls_back_to_twap_on_zero_schedule() {
        let day = d(2025, 8, 1);
        let rows = vec![
            hourly(day, 1, Some(3000.0), Some(0.0)),
            hourly(day, 2, Some(6000.0), None),
        ];
        assert_eq!(vwap(&rows), twap(&rows));
    }

    #[test]
    fn test_daily_averages_sorted_by_date() {
        let rows = vec![
            hourly(d(2025, 8, 2), 1, Some(5000.0), None),
            hourly(d(2025, 8, 1), 1, Some(3000.0), None),
            hourly(d(2025, 8, 1), 2, Some(5000.0), None),
            hourly(d(2025, 8, 3), 1, None, None),
        ];
        let avgs = daily_averages(&rows);
        assert_eq!(avgs.len(), 2);
        assert_eq!(avgs[0].0, d(2025, 8, 1));
        assert!((avgs[0].1 - 4.0).abs() < 1e-9);
        assert_eq!(avgs[1].0, d(2025, 8, 2));
    }

    #[test]
    fn test_scheduled_energy() {
        let day = d(2025, 8, 1);
        let rows = vec![hourly(day, 1, Some(1.0), Some(120.0)), hourly(day, 2, Some(1.0), None)];
        assert!((scheduled_energy_mwh(&rows) - 120.0).abs() < 1e-9);
    }

    #[test]
    fn test_money_formatting() {
        assert_eq!(money(Some(4.5)), "₹4.5000");
        assert_eq!(money(Some(3.123456)), "₹3.1235");
        assert_eq!(money(None), "—");
        assert_eq!(money(Some(f64::NAN)), "—");
    }
}
