use std::io::Write;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use spot_desk::{plan_message, BufferedTransport, Config, Desk, InMemoryRecorder, PgStore};
use spot_engine::Stat;

#[derive(Parser)]
#[command(name = "spot-desk")]
#[command(about = "Answer DAM/GDAM spot-price questions in plain English", long_about = None)]
struct Cli {
    /// Log filter, overrides LOG_LEVEL
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Statistic when the message names none, overrides DEFAULT_STAT
    #[arg(long, global = true)]
    default_stat: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Read one question per line from stdin and answer each
    Chat,

    /// Answer a single question
    Ask {
        /// The question, e.g. "GDAM 10-15 Aug 2025 08:00 to 18:00 vwap"
        text: String,
    },

    /// Show how a question would be resolved, without touching the database
    Parse {
        text: String,

        /// Anchor for relative phrases (YYYY-MM-DD); defaults to today in MARKET_TZ
        #[arg(long)]
        today: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let mut cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };
    if let Some(level) = &cli.log_level {
        cfg.log_level = level.clone();
    }

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli, cfg).await {
        error!("Fatal error: {e:#}");
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli, mut cfg: Config) -> Result<()> {
    if let Some(stat) = &cli.default_stat {
        cfg.default_stat = stat
            .parse::<Stat>()
            .with_context(|| format!("invalid --default-stat {stat}"))?;
    }

    match cli.command {
        Command::Parse { text, today } => {
            let today = match today {
                Some(s) => NaiveDate::parse_from_str(&s, "%Y-%m-%d")
                    .with_context(|| format!("invalid --today {s}, expected YYYY-MM-DD"))?,
                None => cfg.today(),
            };
            let plan = plan_message(&text, today, cfg.default_stat);
            println!("{}", serde_json::to_string_pretty(&plan)?);
            Ok(())
        }
        Command::Ask { text } => {
            let (desk, transport) = build_desk(&cfg)?;
            desk.start_session();
            answer(&desk, &transport, &text).await
        }
        Command::Chat => {
            let (desk, transport) = build_desk(&cfg)?;
            desk.start_session();
            info!(author = %cfg.assistant_author, "chat session started");

            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            while let Some(line) = lines.next_line().await? {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                if matches!(line, "exit" | "quit") {
                    break;
                }
                answer(&desk, &transport, line).await?;
            }
            Ok(())
        }
    }
}

fn build_desk(cfg: &Config) -> Result<(Desk, Arc<BufferedTransport>)> {
    let store = PgStore::new(cfg).context("building price store")?;
    let transport = Arc::new(BufferedTransport::new());
    let desk = Desk::new(
        cfg,
        Arc::new(store),
        transport.clone(),
        Arc::new(InMemoryRecorder::new()),
    );
    Ok((desk, transport))
}

async fn answer(desk: &Desk, transport: &BufferedTransport, text: &str) -> Result<()> {
    desk.on_message(text).await?;
    let mut out = std::io::stdout().lock();
    for msg in transport.take_visible() {
        writeln!(out, "{}\n", msg.content)?;
    }
    out.flush()?;
    Ok(())
}
