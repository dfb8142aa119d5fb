//! Per-message flow: plan, fetch, render, reply.
//!
//! Each message runs as one task and does its work sequentially. Periods
//! and time groups are isolated from each other: a failure in one is logged
//! and the rest still render. Anything that escapes becomes the generic
//! failure reply; the progress message is hidden on every path.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tracing::{error, info, warn};

use spot_engine::companion::filter_contract_month;
use spot_engine::render::{
    finish_reply, join_sections, render_companion, render_spot_section, DISCLAIMER_FOOTER,
    GENERIC_FAILURE, MULTI_PERIOD_FAILURE, PRE_EPOCH_MESSAGE, PROGRESS_INTERPRETING,
    PROGRESS_QUERYING, USAGE_HINT,
};
use spot_engine::{CompanionData, CompanionPlan, Exchange, QuerySpec, Stat};

use crate::analytics::{Event, Recorder};
use crate::config::Config;
use crate::error::Result;
use crate::plan::{plan_message, PeriodPlan, Plan};
use crate::store::{fetch_spot_rows, PriceStore};
use crate::transport::{progress_hide, progress_start, progress_update, ChatTransport};

type Today = Arc<dyn Fn() -> NaiveDate + Send + Sync>;

pub struct Desk {
    store: Arc<dyn PriceStore>,
    transport: Arc<dyn ChatTransport>,
    recorder: Arc<dyn Recorder>,
    author: String,
    default_stat: Stat,
    today: Today,
}

impl Desk {
    pub fn new(
        cfg: &Config,
        store: Arc<dyn PriceStore>,
        transport: Arc<dyn ChatTransport>,
        recorder: Arc<dyn Recorder>,
    ) -> Self {
        let tz = cfg.market_tz;
        Self {
            store,
            transport,
            recorder,
            author: cfg.assistant_author.clone(),
            default_stat: cfg.default_stat,
            today: Arc::new(move || Utc::now().with_timezone(&tz).date_naive()),
        }
    }

    /// Pin "today" instead of reading the market-zone clock.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Arc::new(move || today);
        self
    }

    pub fn start_session(&self) {
        self.recorder.session_started();
    }

    /// Handle one incoming message. Only a failure to send the final reply
    /// is returned.
    pub async fn on_message(&self, text: &str) -> Result<()> {
        self.recorder.message_received();
        let today = (self.today)();
        let plan = plan_message(text, today, self.default_stat);

        if let Plan::Stats = plan {
            self.transport
                .send(&self.author, &self.recorder.summary())
                .await?;
            return Ok(());
        }

        let transport = self.transport.as_ref();
        let progress = progress_start(transport, &self.author, PROGRESS_INTERPRETING).await;
        progress_update(transport, progress, PROGRESS_QUERYING).await;

        let reply = match self.answer(plan).await {
            Ok(reply) => reply,
            Err(e) => {
                error!(error = %e, "message failed");
                self.recorder.record(Event::Failed);
                GENERIC_FAILURE.to_string()
            }
        };

        progress_hide(transport, progress).await;
        self.transport.send(&self.author, &reply).await?;
        Ok(())
    }

    async fn answer(&self, plan: Plan) -> Result<String> {
        match plan {
            Plan::Stats => Ok(self.recorder.summary()),
            Plan::Unparsed { normalized } => {
                info!(%normalized, "no date or period");
                self.recorder.record(Event::Unparsed);
                Ok(USAGE_HINT.to_string())
            }
            Plan::PreEpoch { start, .. } => {
                info!(%start, "pre-2010 period rejected");
                self.recorder.record(Event::PreEpoch);
                Ok(PRE_EPOCH_MESSAGE.to_string())
            }
            Plan::Query {
                normalized,
                market,
                stat,
                exchange,
                multi_period,
                periods,
            } => {
                info!(%normalized, %market, %stat, periods = periods.len(), "query");
                let body = if multi_period {
                    let blocks = self.render_periods(&periods, exchange).await;
                    if blocks.is_empty() {
                        self.recorder.record(Event::Failed);
                        return Ok(format!("{MULTI_PERIOD_FAILURE}{DISCLAIMER_FOOTER}"));
                    }
                    join_sections(&blocks)
                } else {
                    let mut sections = Vec::new();
                    for period in &periods {
                        sections.extend(self.render_period(period, exchange).await?);
                    }
                    join_sections(&sections)
                };
                self.recorder.record(Event::Query {
                    market,
                    stat,
                    periods: periods.len(),
                });
                Ok(finish_reply(&body))
            }
        }
    }

    /// Render every period, skipping the ones that fail.
    async fn render_periods(&self, periods: &[PeriodPlan], exchange: Option<Exchange>) -> Vec<String> {
        let mut blocks = Vec::new();
        for period in periods {
            match self.render_period(period, exchange).await {
                Ok(sections) if !sections.is_empty() => blocks.push(join_sections(&sections)),
                Ok(_) => {}
                Err(e) => warn!(start = %period.span.start, error = %e, "period skipped"),
            }
        }
        blocks
    }

    /// Spot sections of one period followed by its companion block.
    async fn render_period(&self, period: &PeriodPlan, exchange: Option<Exchange>) -> Result<Vec<String>> {
        let mut sections = Vec::new();
        if period.queries.len() > 1 {
            let mut last_err = None;
            for spec in &period.queries {
                match self.spot_section(spec).await {
                    Ok(section) => sections.push(section),
                    Err(e) => {
                        warn!(selection = ?spec.selection, error = %e, "time group skipped");
                        last_err = Some(e);
                    }
                }
            }
            if let (true, Some(e)) = (sections.is_empty(), last_err) {
                return Err(e);
            }
        } else {
            for spec in &period.queries {
                sections.push(self.spot_section(spec).await?);
            }
        }

        let companion = self.fetch_companion(period.companion, exchange).await?;
        sections.extend(render_companion(&companion));
        Ok(sections)
    }

    async fn spot_section(&self, spec: &QuerySpec) -> Result<String> {
        let rows = fetch_spot_rows(self.store.as_ref(), spec).await?;
        if rows.is_empty() {
            info!(start = %spec.start_date, end = %spec.end_date, "no spot rows");
        }
        Ok(render_spot_section(spec, &rows))
    }

    async fn fetch_companion(
        &self,
        plan: CompanionPlan,
        exchange: Option<Exchange>,
    ) -> Result<CompanionData> {
        Ok(match plan {
            CompanionPlan::SingleDay { day } => CompanionData::DailyClose {
                requested: day,
                rows: self.store.fetch_deriv_daily_fallback(day, exchange).await?,
                show_empty: true,
            },
            CompanionPlan::ContractMonth { day, month } => {
                let daily = self.store.fetch_deriv_daily_fallback(day, exchange).await?;
                let rows = filter_contract_month(daily, month);
                if rows.is_empty() {
                    CompanionData::Expiry {
                        month,
                        rows: self.store.fetch_deriv_month_expiry(month, exchange).await?,
                    }
                } else {
                    CompanionData::ContractMonth { month, rows }
                }
            }
            CompanionPlan::AsOfEnd { day } => CompanionData::DailyClose {
                requested: day,
                rows: self.store.fetch_deriv_daily_fallback(day, exchange).await?,
                show_empty: false,
            },
        })
    }
}
