use std::collections::BTreeSet;

use chrono::{Days, NaiveDate};
use proptest::prelude::*;

use spot_engine::aggregate::{twap, vwap};
use spot_engine::intraday::{compress_ranges, hour_block_window, parse_ranges};
use spot_engine::normalize::normalize;
use spot_engine::rows::HourlyRow;
use spot_engine::{parse_date_or_range, DATE_MIN_GUARD};

const VOCABULARY: &[&str] = &[
    "between", "and", "to", "till", "until", "upto", "through", "10", "15", "aug", "Aug-25",
    "sept'24", "08:00", "\u{2013}", "\u{2014}", "-", "  ", "\t", "yesterday", "2025", "GDAM",
];

fn phrase() -> impl Strategy<Value = String> {
    prop::collection::vec(prop::sample::select(VOCABULARY), 0..8).prop_map(|words| words.join(" "))
}

fn day_since_guard() -> impl Strategy<Value = NaiveDate> {
    (0u64..7000).prop_map(|n| DATE_MIN_GUARD + Days::new(n))
}

proptest! {
    #[test]
    fn prop_compress_ranges_partitions_input(indices in prop::collection::vec(1u8..=96, 0..60)) {
        let runs = compress_ranges(&indices);
        for pair in runs.windows(2) {
            // Sorted, disjoint and not adjacent.
            prop_assert!(u16::from(pair[0].1) + 1 < u16::from(pair[1].0));
        }
        prop_assert!(runs.iter().all(|&(lo, hi)| lo <= hi));
        let expanded: BTreeSet<u8> = runs.iter().flat_map(|&(lo, hi)| lo..=hi).collect();
        let input: BTreeSet<u8> = indices.into_iter().collect();
        prop_assert_eq!(expanded, input);
    }

    #[test]
    fn prop_normalize_is_idempotent(text in phrase()) {
        let once = normalize(&text);
        prop_assert_eq!(normalize(&once), once);
    }

    #[test]
    fn prop_normalize_is_idempotent_on_ascii(text in "[ -~]{0,40}") {
        let once = normalize(&text);
        prop_assert_eq!(normalize(&once), once);
    }

    #[test]
    fn prop_vwap_equals_twap_without_schedule(
        prices in prop::collection::vec((0.0f64..20000.0, 1.0f64..120.0, prop::bool::ANY), 1..30)
    ) {
        let day = NaiveDate::from_ymd_opt(2025, 8, 1).unwrap();
        let rows: Vec<HourlyRow> = prices
            .iter()
            .enumerate()
            .map(|(i, &(price, minutes, zero))| HourlyRow {
                delivery_date: day,
                block_index: (i % 24) as u8 + 1,
                price_rs_per_mwh: Some(price),
                scheduled_mw: if zero { Some(0.0) } else { None },
                duration_min: Some(minutes),
            })
            .collect();
        prop_assert_eq!(vwap(&rows), twap(&rows));
    }

    #[test]
    fn prop_numeric_ranges_are_ordered(a in day_since_guard(), b in day_since_guard()) {
        let today = NaiveDate::from_ymd_opt(2025, 6, 15).unwrap();
        let text = format!("{} to {}", a.format("%d/%m/%Y"), b.format("%d/%m/%Y"));
        let span = parse_date_or_range(&text, today).unwrap();
        prop_assert!(span.start <= span.end);
        prop_assert_eq!(span.start, a.min(b));
        prop_assert_eq!(span.end, a.max(b));
    }

    #[test]
    fn prop_single_dates_respect_guard(a in day_since_guard()) {
        let today = NaiveDate::from_ymd_opt(2025, 6, 15).unwrap();
        let span = parse_date_or_range(&a.format("%d/%m/%Y").to_string(), today).unwrap();
        prop_assert!(span.start >= DATE_MIN_GUARD);
        prop_assert_eq!(span.start, a);
        prop_assert_eq!(span.end, a);
    }

    #[test]
    fn prop_whole_hour_clock_ranges(h1 in 0u8..24, len in 1u8..=24) {
        let h2 = (h1 + len).min(24);
        prop_assume!(h2 > h1);
        let text = format!("{h1:02}:00 to {h2:02}:00");
        let r = parse_ranges(&text);
        prop_assert_eq!(r.hours, (h1 + 1..=h2).collect::<Vec<u8>>());
        prop_assert_eq!(r.quarters, (h1 * 4 + 1..=h2 * 4).collect::<Vec<u8>>());
    }
}

#[test]
fn hour_block_windows_match_minute_bounds() {
    for b in 1u8..=24 {
        let expected = format!("{:02}:00–{:02}:00", b - 1, b);
        assert_eq!(hour_block_window(b), expected);
    }
    assert!(hour_block_window(24).ends_with("24:00"));
}
