//! Message planning: everything the handler decides before touching the
//! store. Pure, so the `parse` subcommand can print it as JSON.

use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;

use spot_engine::{
    canonicalize, extract_explicit_time_groups, is_month_intent, normalize,
    parse_date_or_range, parse_exchange, parse_market, parse_multi_year_months, parse_ranges,
    parse_stat, select_companion, CompanionPlan, DateSpan, Exchange, Market, QuerySpec, Selection,
    Stat,
};

/// Literal inputs that bypass parsing and return the usage summary.
pub fn is_stats_command(text: &str) -> bool {
    let t = text.trim();
    t.eq_ignore_ascii_case("/stats") || t.eq_ignore_ascii_case("stats")
}

/// One period of a query: its spot sections and its derivative companion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodPlan {
    pub span: DateSpan,
    /// One query per explicit clock range, or a single merged query.
    pub queries: Vec<QuerySpec>,
    pub companion: CompanionPlan,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Plan {
    Stats,
    /// No date or period could be resolved.
    Unparsed { normalized: String },
    /// The resolved period starts before 2010-01-01.
    PreEpoch { normalized: String, start: NaiveDate },
    Query {
        normalized: String,
        market: Market,
        stat: Stat,
        exchange: Option<Exchange>,
        multi_period: bool,
        periods: Vec<PeriodPlan>,
    },
}

/// Decide what a message asks for, resolving relative phrases against
/// `today`.
pub fn plan_message(text: &str, today: NaiveDate, default_stat: Stat) -> Plan {
    if is_stats_command(text) {
        return Plan::Stats;
    }
    let s = normalize(text);
    let market = parse_market(&s);
    let stat = parse_stat(&s, default_stat);
    let exchange = parse_exchange(&s);

    let multi = parse_multi_year_months(&s);
    let (multi_period, spans) = if multi.is_empty() {
        let Some(span) = parse_date_or_range(&s, today) else {
            return Plan::Unparsed { normalized: s };
        };
        if span.starts_before_guard() {
            return Plan::PreEpoch {
                normalized: s,
                start: span.start,
            };
        }
        (false, vec![span])
    } else {
        let kept: Vec<DateSpan> = multi
            .into_iter()
            .filter(|span| {
                let keep = !span.starts_before_guard();
                if !keep {
                    debug!(start = %span.start, "pre-2010 period dropped");
                }
                keep
            })
            .collect();
        (true, kept)
    };

    let periods = spans
        .into_iter()
        .map(|span| plan_period(&s, span, market, stat))
        .collect();

    Plan::Query {
        normalized: s,
        market,
        stat,
        exchange,
        multi_period,
        periods,
    }
}

fn plan_period(s: &str, span: DateSpan, market: Market, stat: Stat) -> PeriodPlan {
    let spec_for = |selection: &Selection| match selection {
        Selection::Hours(h) => canonicalize(
            market.as_str(),
            Some(span.start),
            Some(span.end),
            selection.granularity(),
            h,
            &[],
            stat.as_str(),
        ),
        Selection::Slots(q) => canonicalize(
            market.as_str(),
            Some(span.start),
            Some(span.end),
            selection.granularity(),
            &[],
            q,
            stat.as_str(),
        ),
    };

    let groups = extract_explicit_time_groups(s);
    let queries: Vec<QuerySpec> = if groups.len() >= 2 {
        debug!(groups = groups.len(), "separate time groups");
        groups.iter().filter_map(|g| spec_for(&g.selection)).collect()
    } else {
        let r = parse_ranges(s);
        canonicalize(
            market.as_str(),
            Some(span.start),
            Some(span.end),
            r.granularity,
            &r.hours,
            &r.quarters,
            stat.as_str(),
        )
        .into_iter()
        .collect()
    };

    PeriodPlan {
        span,
        queries,
        companion: select_companion(&span, is_month_intent(s, &span)),
    }
}
