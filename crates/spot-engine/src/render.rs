//! Markdown presentation of spot sections, derivative companions and the
//! fixed user messages.

use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::aggregate::{daily_averages, money, per_kwh, twap, vwap};
use crate::calendar::{dmy, last_day_of_month};
use crate::companion::{closed_note, ClosedNote, CompanionData};
use crate::intraday::{compress_ranges, fmt_hhmm};
use crate::query::{QuerySpec, Selection, Stat};
use crate::rows::{DerivDailyRow, DerivExpiryRow, PricePoint, SpotRows};

/// Tables longer than this show only their head and tail.
pub const TABLE_ROW_LIMIT: usize = 120;
const TABLE_EDGE_ROWS: usize = 60;

pub const PROGRESS_INTERPRETING: &str = "💭 Interpreting …";
pub const PROGRESS_QUERYING: &str = "🧮 Querying …";

pub const USAGE_HINT: &str = "I couldn't find a valid date or period. Try one of:\n\
- `15/08/2025`\n- `10–15 Aug 2025`\n- `Aug 2025`\n- `this month`, `yesterday`\n\n\
Also include hours or blocks:\n- `08:00–18:00`, `10 to 12 hrs`, or `blocks 5–12`";

pub const PRE_EPOCH_MESSAGE: &str = "Date appears invalid (before 2010). Please try again.";

pub const MULTI_PERIOD_FAILURE: &str =
    "Could not process your multi-period query. Please try one period at a time.";

pub const GENERIC_FAILURE: &str = "⚠️ Temporary data connection issue. Please try again.";

pub const DISCLAIMER_FOOTER: &str = "\n\n---\n\n\
**Primary Service:** MCX/NSE Derivative Market Analysis | **Complementary:** DAM/GDAM/RTM Spot Data  \n\
*For research purposes only • Not financial advice • Consult licensed professionals*\n\n\
© 2025 Energy Minds Power Solutions Pvt. Ltd.\n";

const SECTION_SEPARATOR: &str = "\n\n---\n\n";

static GDAM_TOKEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bGDAM\b").expect("valid"));

/// Human labels for an intraday selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionLabel {
    /// Clock windows joined by ` + `, e.g. `08:00–10:00 + 14:00–16:00`.
    pub times: String,
    /// Index runs joined by `, `, e.g. `9–10, 15–16`.
    pub indices: String,
    pub count: usize,
}

pub fn label_selection(selection: &Selection) -> SelectionLabel {
    let minutes_per_index = match selection {
        Selection::Hours(_) => 60,
        Selection::Slots(_) => 15,
    };
    let runs = compress_ranges(selection.indices());
    let times = runs
        .iter()
        .map(|&(lo, hi)| {
            format!(
                "{}–{}",
                fmt_hhmm(u32::from(lo).saturating_sub(1) * minutes_per_index),
                fmt_hhmm(u32::from(hi) * minutes_per_index)
            )
        })
        .collect::<Vec<_>>()
        .join(" + ");
    let indices = runs
        .iter()
        .map(|&(lo, hi)| if lo == hi { lo.to_string() } else { format!("{lo}–{hi}") })
        .collect::<Vec<_>>()
        .join(", ");
    let count = runs.iter().map(|&(lo, hi)| usize::from(hi - lo) + 1).sum();
    SelectionLabel {
        times,
        indices,
        count,
    }
}

pub fn render_title(spec: &QuerySpec) -> String {
    format!(
        "## Spot Market ({}) — {} to {}",
        spec.market,
        dmy(spec.start_date),
        dmy(spec.end_date)
    )
}

pub fn render_summary_card(spec: &QuerySpec) -> String {
    let label = label_selection(&spec.selection);
    let (count_label, index_label) = match &spec.selection {
        s @ Selection::Hours(_) => (
            if s.is_full_day() { "24 hrs".to_string() } else { format!("{} hrs", label.count) },
            format!("blocks {}", label.indices),
        ),
        s @ Selection::Slots(_) => (
            if s.is_full_day() { "24 hrs".to_string() } else { format!("{}×15min", label.count) },
            format!("slots {}", label.indices),
        ),
    };
    format!(
        "## Summary\n\n\
         | **Parameter** | **Value** |\n\
         |:--|:--|\n\
         | **Market** | {} |\n\
         | **Period** | {} to {} |\n\
         | **Duration** | {} ({count_label}) |\n\
         | **Selection** | {index_label} |\n",
        spec.market,
        dmy(spec.start_date),
        dmy(spec.end_date),
        label.times,
    )
}

pub fn kpi_label(stat: Stat) -> &'static str {
    match stat {
        Stat::Vwap => "Average price (VWAP)",
        Stat::DailyAvg => "Daily average",
        Stat::Twap | Stat::List => "Average price",
    }
}

pub fn render_kpi(stat: Stat, value: Option<f64>) -> String {
    format!("**{}: {} /kWh**", kpi_label(stat), money(value))
}

fn render_row_table<R: PricePoint>(rows: &[R], header: &str) -> String {
    if rows.is_empty() {
        return "_No rows._".to_string();
    }
    let shown: Vec<&R> = if rows.len() > TABLE_ROW_LIMIT {
        rows[..TABLE_EDGE_ROWS]
            .iter()
            .chain(&rows[rows.len() - TABLE_EDGE_ROWS..])
            .collect()
    } else {
        rows.iter().collect()
    };

    let mut lines = vec![header.to_string()];
    if rows.len() > TABLE_ROW_LIMIT {
        lines.push(format!(
            "_Showing first {TABLE_EDGE_ROWS} and last {TABLE_EDGE_ROWS} of {n} rows (total {n})._",
            n = rows.len()
        ));
    }
    for r in shown {
        let price = per_kwh(r.price()).map_or_else(|| "—".to_string(), |p| format!("{p:.4}"));
        lines.push(format!(
            "| {} | {} | {:>2} | {} | {:.2} |",
            dmy(r.delivery_date()),
            r.window(),
            r.index(),
            price,
            r.scheduled_mw().unwrap_or(0.0)
        ));
    }
    lines.join("\n")
}

pub fn render_hourly_table<R: PricePoint>(rows: &[R]) -> String {
    render_row_table(
        rows,
        "| Date | Hour (HH:MM–HH:MM) | Block | Price (₹/kWh) | Sched MW |\n|---|---|---:|---:|---:|",
    )
}

pub fn render_quarter_table<R: PricePoint>(rows: &[R]) -> String {
    render_row_table(
        rows,
        "| Date | Slot (HH:MM–HH:MM) | Slot # | Price (₹/kWh) | Sched MW |\n|---|---|---:|---:|---:|",
    )
}

pub fn render_daily_avg_table<R: PricePoint>(rows: &[R]) -> String {
    let mut lines = vec![
        "| Date | Daily Avg (₹/kWh) |".to_string(),
        "|---|---:|".to_string(),
    ];
    for (day, avg) in daily_averages(rows) {
        lines.push(format!("| {} | {} |", dmy(day), money(Some(avg))));
    }
    lines.join("\n")
}

fn render_body<R: PricePoint>(stat: Stat, rows: &[R], table: fn(&[R]) -> String) -> String {
    let value = match stat {
        Stat::Vwap => vwap(rows),
        _ => twap(rows),
    };
    let kpi = render_kpi(stat, value);
    match stat {
        Stat::DailyAvg => format!("{kpi}\n\n{}", render_daily_avg_table(rows)),
        Stat::List => format!("{kpi}\n\n{}", table(rows)),
        Stat::Twap | Stat::Vwap => kpi,
    }
}

/// Title, summary card, KPI and the statistic's table for one query.
pub fn render_spot_section(spec: &QuerySpec, rows: &SpotRows) -> String {
    let body = match rows {
        SpotRows::Hourly(rs) => render_body(spec.stat, rs, render_hourly_table),
        SpotRows::Quarter(rs) => render_body(spec.stat, rs, render_quarter_table),
    };
    format!(
        "{}\n\n{}\n{body}",
        render_title(spec),
        render_summary_card(spec)
    )
}

fn deriv_daily_line(r: &DerivDailyRow) -> String {
    let tag = if r.is_carried_forward() {
        format!(" ({})", dmy(r.used_trading_date))
    } else {
        String::new()
    };
    format!(
        "- **{} • {} • {}** → {} /kWh{tag}",
        r.exchange,
        r.commodity,
        r.contract_month.format("%b %Y"),
        money(per_kwh(r.close_price_rs_per_mwh))
    )
}

/// As-of daily closes for `requested`, with a note when the market was
/// closed that day.
pub fn render_daily_close(requested: NaiveDate, rows: &[DerivDailyRow]) -> String {
    let heading = format!("### **Derivative Market (MCX/NSE)** — {}", dmy(requested));
    if rows.is_empty() {
        return format!("{heading}\n\nN/A (no derivative data before Jul 2025).");
    }
    let note = match closed_note(requested, rows) {
        ClosedNote::Open => String::new(),
        ClosedNote::LastClose(used) => format!(
            "\n*Market closed on {} — showing last close on {}*\n",
            dmy(requested),
            dmy(used)
        ),
        ClosedNote::PerExchange => "\n*Market closed — showing last close per exchange*\n".to_string(),
    };
    let mut lines = vec![format!("{heading}\n{note}")];
    lines.extend(rows.iter().map(deriv_daily_line));
    lines.join("\n")
}

fn month_label(month: NaiveDate) -> String {
    let last = last_day_of_month(month.year(), month.month()).unwrap_or(month);
    format!("{} to {}", dmy(month), dmy(last))
}

/// Daily closes of one contract month.
pub fn render_contract_month(month: NaiveDate, rows: &[DerivDailyRow]) -> String {
    let mut lines = vec![format!(
        "### ⭐ **Derivative Market — {} (Daily Close)**\n",
        month.format("%b %Y")
    )];
    lines.extend(rows.iter().map(|r| {
        format!(
            "- **{} • {}** → {} /kWh (on {})",
            r.exchange,
            r.commodity,
            money(per_kwh(r.close_price_rs_per_mwh)),
            dmy(r.used_trading_date)
        )
    }));
    lines.join("\n")
}

/// Expiry closes of one contract month.
pub fn render_expiry(month: NaiveDate, rows: &[DerivExpiryRow]) -> String {
    let label = month_label(month);
    if rows.is_empty() {
        return format!("### ⭐ **Derivative Market — {label}**\n\n_Expiry not available yet._");
    }
    let mut lines = vec![format!(
        "### ⭐ **Derivative Market — {label} (Expiry Close)**\n"
    )];
    lines.extend(rows.iter().map(|r| {
        format!(
            "- **{} • {}** → {} /kWh (on {})",
            r.exchange,
            r.commodity,
            money(per_kwh(r.expiry_close)),
            dmy(r.expiry_date)
        )
    }));
    lines.join("\n")
}

/// Companion block, or `None` when it should be omitted.
pub fn render_companion(data: &CompanionData) -> Option<String> {
    match data {
        CompanionData::DailyClose {
            requested,
            rows,
            show_empty,
        } => (*show_empty || !rows.is_empty()).then(|| render_daily_close(*requested, rows)),
        CompanionData::ContractMonth { month, rows } => Some(render_contract_month(*month, rows)),
        CompanionData::Expiry { month, rows } => Some(render_expiry(*month, rows)),
    }
}

/// Join sections with horizontal rules.
pub fn join_sections<S: AsRef<str>>(sections: &[S]) -> String {
    sections
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(SECTION_SEPARATOR)
}

/// Mark every standalone `GDAM` token.
pub fn highlight_gdam(text: &str) -> String {
    GDAM_TOKEN_RE.replace_all(text, "🟢 **GDAM**").into_owned()
}

/// Final reply: highlighted body plus the disclaimer footer.
pub fn finish_reply(body: &str) -> String {
    format!("{}{DISCLAIMER_FOOTER}", highlight_gdam(body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{canonicalize, Granularity};
    use crate::rows::{HourlyRow, QuarterRow};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn spec(stat: &str, gran: Granularity, hours: &[u8], slots: &[u8]) -> QuerySpec {
        canonicalize("dam", Some(d(2025, 8, 10)), Some(d(2025, 8, 15)), gran, hours, slots, stat).unwrap()
    }

    fn hourly(day: NaiveDate, b: u8, price: f64) -> HourlyRow {
        HourlyRow {
            delivery_date: day,
            block_index: b,
            price_rs_per_mwh: Some(price),
            scheduled_mw: Some(100.0),
            duration_min: Some(60.0),
        }
    }

    #[test]
    fn test_label_selection_hours() {
        let label = label_selection(&Selection::Hours(vec![9, 10, 15, 16]));
        assert_eq!(label.times, "08:00–10:00 + 14:00–16:00");
        assert_eq!(label.indices, "9–10, 15–16");
        assert_eq!(label.count, 4);
    }

    #[test]
    fn test_label_selection_slots() {
        let label = label_selection(&Selection::Slots(vec![96]));
        assert_eq!(label.times, "23:45–24:00");
        assert_eq!(label.indices, "96");
        assert_eq!(label.count, 1);
    }

    #[test]
    fn test_label_selection_block_zero_does_not_underflow() {
        let label = label_selection(&Selection::Hours(vec![0]));
        assert_eq!(label.times, "00:00–00:00");
        assert_eq!(label.count, 1);
    }

    #[test]
    fn test_title() {
        let s = spec("twap", Granularity::Hour, &[], &[]);
        assert_eq!(render_title(&s), "## Spot Market (DAM) — 10 Aug 2025 to 15 Aug 2025");
    }

    #[test]
    fn test_summary_card_full_day() {
        let card = render_summary_card(&spec("twap", Granularity::Hour, &[], &[]));
        assert!(card.contains("| **Market** | DAM |"));
        assert!(card.contains("| **Period** | 10 Aug 2025 to 15 Aug 2025 |"));
        assert!(card.contains("| **Duration** | 00:00–24:00 (24 hrs) |"));
        assert!(card.contains("| **Selection** | blocks 1–24 |"));
    }

    #[test]
    fn test_summary_card_partial_slots() {
        let card = render_summary_card(&spec("twap", Granularity::Quarter, &[], &[33, 34, 35, 36]));
        assert!(card.contains("| **Duration** | 08:00–09:00 (4×15min) |"));
        assert!(card.contains("slots 33–36"));
    }

    #[test]
    fn test_kpi_placeholder_when_empty() {
        assert_eq!(render_kpi(Stat::Twap, None), "**Average price: — /kWh**");
        assert_eq!(render_kpi(Stat::Vwap, Some(4.25)), "**Average price (VWAP): ₹4.2500 /kWh**");
    }

    #[test]
    fn test_hourly_table_rows() {
        let table = render_hourly_table(&[hourly(d(2025, 8, 10), 9, 4123.4)]);
        assert!(table.starts_with("| Date | Hour (HH:MM–HH:MM) | Block |"));
        assert!(table.ends_with("| 10 Aug 2025 | 08:00–09:00 |  9 | 4.1234 | 100.00 |"));
    }

    #[test]
    fn test_table_empty() {
        let rows: Vec<QuarterRow> = Vec::new();
        assert_eq!(render_quarter_table(&rows), "_No rows._");
    }

    #[test]
    fn test_table_truncates_long_results() {
        let day = d(2025, 8, 10);
        let rows: Vec<HourlyRow> = (0..130).map(|i| hourly(day, (i % 24 + 1) as u8, 4000.0)).collect();
        let table = render_hourly_table(&rows);
        assert!(table.contains("_Showing first 60 and last 60 of 130 rows (total 130)._"));
        // header (2 lines) + note + 120 rows
        assert_eq!(table.lines().count(), 123);
    }

    #[test]
    fn test_spot_section_list_stat_has_table() {
        let s = spec("list", Granularity::Hour, &[9], &[]);
        let out = render_spot_section(&s, &SpotRows::Hourly(vec![hourly(d(2025, 8, 10), 9, 4000.0)]));
        assert!(out.starts_with("## Spot Market (DAM)"));
        assert!(out.contains("**Average price: ₹4.0000 /kWh**"));
        assert!(out.contains("| 10 Aug 2025 | 08:00–09:00 |"));
    }

    #[test]
    fn test_spot_section_daily_avg() {
        let s = spec("daily_avg", Granularity::Hour, &[], &[]);
        let rows = vec![hourly(d(2025, 8, 10), 1, 3000.0), hourly(d(2025, 8, 11), 1, 5000.0)];
        let out = render_spot_section(&s, &SpotRows::Hourly(rows));
        assert!(out.contains("**Daily average: ₹4.0000 /kWh**"));
        assert!(out.contains("| 10 Aug 2025 | ₹3.0000 |"));
        assert!(out.contains("| 11 Aug 2025 | ₹5.0000 |"));
    }

    #[test]
    fn test_spot_section_twap_no_rows() {
        let s = spec("twap", Granularity::Quarter, &[], &[]);
        let out = render_spot_section(&s, &SpotRows::Quarter(Vec::new()));
        assert!(out.ends_with("**Average price: — /kWh**"));
    }

    fn deriv(exchange: &str, used: NaiveDate) -> DerivDailyRow {
        DerivDailyRow {
            exchange: exchange.into(),
            commodity: "ELECDMBL".into(),
            trading_date: d(2025, 8, 10),
            used_trading_date: used,
            contract_month: d(2025, 8, 1),
            close_price_rs_per_mwh: Some(4100.0),
        }
    }

    #[test]
    fn test_daily_close_empty_placeholder() {
        let out = render_daily_close(d(2025, 6, 1), &[]);
        assert!(out.contains("N/A (no derivative data before Jul 2025)."));
    }

    #[test]
    fn test_daily_close_market_closed_note() {
        let out = render_daily_close(d(2025, 8, 10), &[deriv("MCX", d(2025, 8, 8))]);
        assert!(out.contains("*Market closed on 10 Aug 2025 — showing last close on 08 Aug 2025*"));
        assert!(out.contains("- **MCX • ELECDMBL • Aug 2025** → ₹4.1000 /kWh (08 Aug 2025)"));
    }

    #[test]
    fn test_daily_close_tag_only_when_carried_forward() {
        let mut row = deriv("MCX", d(2025, 8, 8));
        row.trading_date = d(2025, 8, 8);
        let out = render_daily_close(d(2025, 8, 10), &[row]);
        assert!(out.ends_with("- **MCX • ELECDMBL • Aug 2025** → ₹4.1000 /kWh"));
    }

    #[test]
    fn test_daily_close_per_exchange_note() {
        let out = render_daily_close(
            d(2025, 8, 10),
            &[deriv("MCX", d(2025, 8, 8)), deriv("NSE", d(2025, 8, 7))],
        );
        assert!(out.contains("*Market closed — showing last close per exchange*"));
    }

    #[test]
    fn test_expiry_rendering() {
        let empty = render_expiry(d(2025, 9, 1), &[]);
        assert!(empty.contains("01 Sep 2025 to 30 Sep 2025"));
        assert!(empty.ends_with("_Expiry not available yet._"));
        let out = render_expiry(
            d(2025, 8, 1),
            &[DerivExpiryRow {
                exchange: "NSE".into(),
                commodity: "ELEC".into(),
                expiry_date: d(2025, 8, 28),
                expiry_close: Some(3870.0),
            }],
        );
        assert!(out.contains("(Expiry Close)"));
        assert!(out.contains("- **NSE • ELEC** → ₹3.8700 /kWh (on 28 Aug 2025)"));
    }

    #[test]
    fn test_cross_month_companion_omitted_when_empty() {
        let data = CompanionData::DailyClose {
            requested: d(2025, 8, 5),
            rows: Vec::new(),
            show_empty: false,
        };
        assert_eq!(render_companion(&data), None);
    }

    #[test]
    fn test_highlight_gdam_tokens_only() {
        assert_eq!(highlight_gdam("GDAM vs DAM"), "🟢 **GDAM** vs DAM");
        assert_eq!(highlight_gdam("GDAMX"), "GDAMX");
    }

    #[test]
    fn test_finish_reply_appends_footer_once() {
        let out = finish_reply("## Spot Market (GDAM)");
        assert!(out.starts_with("## Spot Market (🟢 **GDAM**)"));
        assert!(out.ends_with("© 2025 Energy Minds Power Solutions Pvt. Ltd.\n"));
        assert!(out.contains("DAM/GDAM/RTM"));
    }

    #[test]
    fn test_join_sections() {
        assert_eq!(join_sections(&["a", "b"]), "a\n\n---\n\nb");
    }
}
