//! The price store: four read-only stored-procedure calls.
//!
//! Rows are decoded into `FromRow` records with explicit casts in SQL and
//! converted to engine rows here, so nothing past this module sees a
//! loosely typed column.

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::debug;

use spot_engine::intraday::compress_ranges;
use spot_engine::{
    DerivDailyRow, DerivExpiryRow, Exchange, HourlyRow, Market, QuarterRow, QuerySpec, Selection,
    SpotRows,
};

use crate::config::{Config, CONNECT_TIMEOUT};
use crate::error::{DeskError, Result};

/// Inclusive block or slot bounds; `None` asks for the whole day.
pub type IndexRange = Option<(u8, u8)>;

#[async_trait]
pub trait PriceStore: Send + Sync {
    async fn fetch_hourly(
        &self,
        market: Market,
        start: NaiveDate,
        end: NaiveDate,
        blocks: IndexRange,
    ) -> Result<Vec<HourlyRow>>;

    async fn fetch_quarter(
        &self,
        market: Market,
        start: NaiveDate,
        end: NaiveDate,
        slots: IndexRange,
    ) -> Result<Vec<QuarterRow>>;

    /// Close on the nearest trading day at or before `target_day`, per
    /// exchange and contract.
    async fn fetch_deriv_daily_fallback(
        &self,
        target_day: NaiveDate,
        exchange: Option<Exchange>,
    ) -> Result<Vec<DerivDailyRow>>;

    async fn fetch_deriv_month_expiry(
        &self,
        month_first: NaiveDate,
        exchange: Option<Exchange>,
    ) -> Result<Vec<DerivExpiryRow>>;
}

/// Fetch the spot rows for `spec`: one call per contiguous run of its
/// selection, concatenated in run order. A full-day selection is a single
/// unbounded call.
pub async fn fetch_spot_rows(store: &dyn PriceStore, spec: &QuerySpec) -> Result<SpotRows> {
    let ranges: Vec<IndexRange> = if spec.selection.is_full_day() {
        vec![None]
    } else {
        compress_ranges(spec.selection.indices())
            .into_iter()
            .map(Some)
            .collect()
    };
    debug!(market = %spec.market, calls = ranges.len(), "fetching spot rows");

    let rows = match &spec.selection {
        Selection::Hours(_) => {
            let mut rows = Vec::new();
            for r in ranges {
                rows.extend(
                    store
                        .fetch_hourly(spec.market, spec.start_date, spec.end_date, r)
                        .await?,
                );
            }
            SpotRows::Hourly(rows)
        }
        Selection::Slots(_) => {
            let mut rows = Vec::new();
            for r in ranges {
                rows.extend(
                    store
                        .fetch_quarter(spec.market, spec.start_date, spec.end_date, r)
                        .await?,
                );
            }
            SpotRows::Quarter(rows)
        }
    };
    debug!(rows = rows.len(), "spot rows fetched");
    Ok(rows)
}

// ── Postgres ────────────────────────────────────────────────────────────────

const HOURLY_SQL: &str = "SELECT delivery_date::date AS delivery_date, \
     block_index::int4 AS block_index, \
     price_avg_rs_per_mwh::float8 AS price_avg_rs_per_mwh, \
     scheduled_mw_sum::float8 AS scheduled_mw_sum, \
     duration_min::float8 AS duration_min \
     FROM public.rpc_get_hourly_prices_range($1, $2, $3, $4, $5)";

const QUARTER_SQL: &str = "SELECT delivery_date::date AS delivery_date, \
     slot_index::int4 AS slot_index, \
     price_rs_per_mwh::float8 AS price_rs_per_mwh, \
     scheduled_mw::float8 AS scheduled_mw, \
     duration_min::float8 AS duration_min \
     FROM public.rpc_get_quarter_prices_range($1, $2, $3, $4, $5)";

const DERIV_DAILY_SQL: &str = "SELECT exchange::text AS exchange, \
     commodity::text AS commodity, \
     trading_date::date AS trading_date, \
     used_trading_date::date AS used_trading_date, \
     contract_month::date AS contract_month, \
     close_price_rs_per_mwh::float8 AS close_price_rs_per_mwh \
     FROM public.rpc_deriv_daily_with_fallback($1, $2)";

const DERIV_EXPIRY_SQL: &str = "SELECT exchange::text AS exchange, \
     commodity::text AS commodity, \
     expiry_date::date AS expiry_date, \
     expiry_close::float8 AS expiry_close \
     FROM public.rpc_deriv_expiry_for_month($1, $2)";

#[derive(Debug, sqlx::FromRow)]
struct HourlyRecord {
    delivery_date: NaiveDate,
    block_index: i32,
    price_avg_rs_per_mwh: Option<f64>,
    scheduled_mw_sum: Option<f64>,
    duration_min: Option<f64>,
}

#[derive(Debug, sqlx::FromRow)]
struct QuarterRecord {
    delivery_date: NaiveDate,
    slot_index: i32,
    price_rs_per_mwh: Option<f64>,
    scheduled_mw: Option<f64>,
    duration_min: Option<f64>,
}

#[derive(Debug, sqlx::FromRow)]
struct DerivDailyRecord {
    exchange: String,
    commodity: String,
    trading_date: NaiveDate,
    used_trading_date: NaiveDate,
    contract_month: NaiveDate,
    close_price_rs_per_mwh: Option<f64>,
}

#[derive(Debug, sqlx::FromRow)]
struct DerivExpiryRecord {
    exchange: String,
    commodity: String,
    expiry_date: NaiveDate,
    expiry_close: Option<f64>,
}

fn index_in(value: i32, max: u8, what: &str) -> Result<u8> {
    u8::try_from(value)
        .ok()
        .filter(|i| (1..=max).contains(i))
        .ok_or_else(|| DeskError::RowDecode(format!("{what} out of range: {value}")))
}

impl TryFrom<HourlyRecord> for HourlyRow {
    type Error = DeskError;

    fn try_from(r: HourlyRecord) -> Result<Self> {
        Ok(Self {
            delivery_date: r.delivery_date,
            block_index: index_in(r.block_index, 24, "block_index")?,
            price_rs_per_mwh: r.price_avg_rs_per_mwh,
            scheduled_mw: r.scheduled_mw_sum,
            duration_min: r.duration_min,
        })
    }
}

impl TryFrom<QuarterRecord> for QuarterRow {
    type Error = DeskError;

    fn try_from(r: QuarterRecord) -> Result<Self> {
        Ok(Self {
            delivery_date: r.delivery_date,
            slot_index: index_in(r.slot_index, 96, "slot_index")?,
            price_rs_per_mwh: r.price_rs_per_mwh,
            scheduled_mw: r.scheduled_mw,
            duration_min: r.duration_min,
        })
    }
}

impl From<DerivDailyRecord> for DerivDailyRow {
    fn from(r: DerivDailyRecord) -> Self {
        Self {
            exchange: r.exchange,
            commodity: r.commodity,
            trading_date: r.trading_date,
            used_trading_date: r.used_trading_date,
            contract_month: r.contract_month,
            close_price_rs_per_mwh: r.close_price_rs_per_mwh,
        }
    }
}

impl From<DerivExpiryRecord> for DerivExpiryRow {
    fn from(r: DerivExpiryRecord) -> Self {
        Self {
            exchange: r.exchange,
            commodity: r.commodity,
            expiry_date: r.expiry_date,
            expiry_close: r.expiry_close,
        }
    }
}

/// Postgres-backed store. Each fetch holds one pooled connection for the
/// duration of its query and returns it on drop, error paths included.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Build a lazily connecting pool; nothing touches the network until the
    /// first fetch.
    pub fn new(cfg: &Config) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(4)
            .acquire_timeout(CONNECT_TIMEOUT)
            .connect_lazy_with(cfg.connect_options()?);
        Ok(Self { pool })
    }
}

fn bounds(range: IndexRange) -> (Option<i32>, Option<i32>) {
    match range {
        Some((lo, hi)) => (Some(i32::from(lo)), Some(i32::from(hi))),
        None => (None, None),
    }
}

#[async_trait]
impl PriceStore for PgStore {
    async fn fetch_hourly(
        &self,
        market: Market,
        start: NaiveDate,
        end: NaiveDate,
        blocks: IndexRange,
    ) -> Result<Vec<HourlyRow>> {
        let (lo, hi) = bounds(blocks);
        let mut conn = self.pool.acquire().await?;
        let records: Vec<HourlyRecord> = sqlx::query_as(HOURLY_SQL)
            .bind(market.as_str())
            .bind(start)
            .bind(end)
            .bind(lo)
            .bind(hi)
            .fetch_all(&mut *conn)
            .await?;
        debug!(%market, %start, %end, ?blocks, rows = records.len(), "hourly rows");
        records.into_iter().map(HourlyRow::try_from).collect()
    }

    async fn fetch_quarter(
        &self,
        market: Market,
        start: NaiveDate,
        end: NaiveDate,
        slots: IndexRange,
    ) -> Result<Vec<QuarterRow>> {
        let (lo, hi) = bounds(slots);
        let mut conn = self.pool.acquire().await?;
        let records: Vec<QuarterRecord> = sqlx::query_as(QUARTER_SQL)
            .bind(market.as_str())
            .bind(start)
            .bind(end)
            .bind(lo)
            .bind(hi)
            .fetch_all(&mut *conn)
            .await?;
        debug!(%market, %start, %end, ?slots, rows = records.len(), "quarter rows");
        records.into_iter().map(QuarterRow::try_from).collect()
    }

    async fn fetch_deriv_daily_fallback(
        &self,
        target_day: NaiveDate,
        exchange: Option<Exchange>,
    ) -> Result<Vec<DerivDailyRow>> {
        let mut conn = self.pool.acquire().await?;
        let records: Vec<DerivDailyRecord> = sqlx::query_as(DERIV_DAILY_SQL)
            .bind(exchange.map(|e| e.as_str()))
            .bind(target_day)
            .fetch_all(&mut *conn)
            .await?;
        debug!(%target_day, ?exchange, rows = records.len(), "derivative daily rows");
        Ok(records.into_iter().map(DerivDailyRow::from).collect())
    }

    async fn fetch_deriv_month_expiry(
        &self,
        month_first: NaiveDate,
        exchange: Option<Exchange>,
    ) -> Result<Vec<DerivExpiryRow>> {
        let mut conn = self.pool.acquire().await?;
        let records: Vec<DerivExpiryRecord> = sqlx::query_as(DERIV_EXPIRY_SQL)
            .bind(exchange.map(|e| e.as_str()))
            .bind(month_first)
            .fetch_all(&mut *conn)
            .await?;
        debug!(%month_first, ?exchange, rows = records.len(), "derivative expiry rows");
        Ok(records.into_iter().map(DerivExpiryRow::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_hourly_record_conversion() {
        let row = HourlyRow::try_from(HourlyRecord {
            delivery_date: d(2025, 8, 1),
            block_index: 9,
            price_avg_rs_per_mwh: Some(4100.0),
            scheduled_mw_sum: Some(250.5),
            duration_min: Some(60.0),
        })
        .unwrap();
        assert_eq!(row.block_index, 9);
        assert_eq!(row.scheduled_mw, Some(250.5));
    }

    #[test]
    fn test_out_of_range_index_rejected_at_boundary() {
        let err = QuarterRow::try_from(QuarterRecord {
            delivery_date: d(2025, 8, 1),
            slot_index: 97,
            price_rs_per_mwh: None,
            scheduled_mw: None,
            duration_min: None,
        })
        .unwrap_err();
        assert!(matches!(err, DeskError::RowDecode(_)));
        assert!(index_in(-1, 24, "block_index").is_err());
        assert!(index_in(0, 24, "block_index").is_err());
    }

    #[test]
    fn test_bounds() {
        assert_eq!(bounds(None), (None, None));
        assert_eq!(bounds(Some((5, 12))), (Some(5), Some(12)));
    }
}
