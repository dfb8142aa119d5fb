//! Usage analytics, injected into the handler as a [`Recorder`].

use std::collections::BTreeMap;

use parking_lot::Mutex;
use serde::Serialize;

use spot_engine::{Market, Stat};

/// Something the handler reports once per message outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Query {
        market: Market,
        stat: Stat,
        periods: usize,
    },
    Unparsed,
    PreEpoch,
    Failed,
}

pub trait Recorder: Send + Sync {
    fn session_started(&self);
    fn message_received(&self);
    fn record(&self, event: Event);
    /// Markdown summary for `/stats`.
    fn summary(&self) -> String;
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct Counters {
    pub sessions: u64,
    pub messages: u64,
    pub queries: u64,
    pub multi_period: u64,
    pub unparsed: u64,
    pub pre_epoch: u64,
    pub failures: u64,
    pub by_market: BTreeMap<String, u64>,
    pub by_stat: BTreeMap<String, u64>,
}

#[derive(Debug, Default)]
pub struct InMemoryRecorder {
    counters: Mutex<Counters>,
}

impl InMemoryRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Counters {
        self.counters.lock().clone()
    }
}

impl Recorder for InMemoryRecorder {
    fn session_started(&self) {
        self.counters.lock().sessions += 1;
    }

    fn message_received(&self) {
        self.counters.lock().messages += 1;
    }

    fn record(&self, event: Event) {
        let mut c = self.counters.lock();
        match event {
            Event::Query {
                market,
                stat,
                periods,
            } => {
                c.queries += 1;
                if periods > 1 {
                    c.multi_period += 1;
                }
                *c.by_market.entry(market.to_string()).or_default() += 1;
                *c.by_stat.entry(stat.to_string()).or_default() += 1;
            }
            Event::Unparsed => c.unparsed += 1,
            Event::PreEpoch => c.pre_epoch += 1,
            Event::Failed => c.failures += 1,
        }
    }

    fn summary(&self) -> String {
        let c = self.snapshot();
        let mut lines = vec![
            "## Usage".to_string(),
            String::new(),
            "| **Metric** | **Count** |".to_string(),
            "|:--|--:|".to_string(),
            format!("| Sessions | {} |", c.sessions),
            format!("| Messages | {} |", c.messages),
            format!("| Queries | {} |", c.queries),
            format!("| Multi-period queries | {} |", c.multi_period),
            format!("| Unparsed | {} |", c.unparsed),
            format!("| Pre-2010 rejections | {} |", c.pre_epoch),
            format!("| Failures | {} |", c.failures),
        ];
        for (market, n) in &c.by_market {
            lines.push(format!("| Market {market} | {n} |"));
        }
        for (stat, n) in &c.by_stat {
            lines.push(format!("| Stat {stat} | {n} |"));
        }
        lines.join("\n")
    }
}
