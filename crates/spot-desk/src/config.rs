use std::str::FromStr;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use sqlx::postgres::{PgConnectOptions, PgSslMode};

use spot_engine::Stat;

use crate::error::{DeskError, Result};

/// Connection timeout for every store fetch.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

pub const DEFAULT_DB_PORT: u16 = 5432;
pub const DEFAULT_SSL_MODE: &str = "require";
pub const DEFAULT_MARKET_TZ: &str = "Asia/Kolkata";
pub const DEFAULT_AUTHOR: &str = "Energy Minds";

/// Where the price store lives: a full URL or the split `DB_*` variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DbTarget {
    Url(String),
    Parts {
        host: String,
        port: u16,
        name: String,
        user: String,
        password: String,
        ssl_mode: String,
    },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub db: DbTarget,
    /// Statistic used when the message names none (DEFAULT_STAT).
    pub default_stat: Stat,
    /// Zone whose calendar day is "today" for relative phrases (MARKET_TZ).
    pub market_tz: Tz,
    /// Author shown on replies (ASSISTANT_AUTHOR).
    pub assistant_author: String,
    pub log_level: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup<F>(var: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let db = match var("DATABASE_URL").filter(|s| !s.trim().is_empty()) {
            Some(url) => DbTarget::Url(url),
            None => DbTarget::Parts {
                host: var("DB_HOST").unwrap_or_else(|| "localhost".to_string()),
                port: var("DB_PORT")
                    .or_else(|| var("PGPORT"))
                    .map(|p| {
                        p.trim().parse::<u16>().map_err(|_| {
                            DeskError::Config("DB_PORT must be a valid port number".to_string())
                        })
                    })
                    .transpose()?
                    .unwrap_or(DEFAULT_DB_PORT),
                name: var("DB_NAME").unwrap_or_else(|| "postgres".to_string()),
                user: var("DB_USER").unwrap_or_else(|| "postgres".to_string()),
                password: var("DB_PASSWORD").unwrap_or_default(),
                ssl_mode: var("DB_SSLMODE").unwrap_or_else(|| DEFAULT_SSL_MODE.to_string()),
            },
        };

        let market_tz_name = var("MARKET_TZ").unwrap_or_else(|| DEFAULT_MARKET_TZ.to_string());
        let market_tz = Tz::from_str(market_tz_name.trim()).map_err(|_| {
            DeskError::Config(format!("MARKET_TZ is not an IANA zone: {market_tz_name}"))
        })?;

        Ok(Self {
            db,
            default_stat: var("DEFAULT_STAT")
                .and_then(|s| s.parse().ok())
                .unwrap_or(Stat::Twap),
            market_tz,
            assistant_author: var("ASSISTANT_AUTHOR").unwrap_or_else(|| DEFAULT_AUTHOR.to_string()),
            log_level: var("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }

    /// Connection options for the price store.
    pub fn connect_options(&self) -> Result<PgConnectOptions> {
        match &self.db {
            DbTarget::Url(url) => PgConnectOptions::from_str(url).map_err(DeskError::from),
            DbTarget::Parts {
                host,
                port,
                name,
                user,
                password,
                ssl_mode,
            } => {
                let ssl = PgSslMode::from_str(ssl_mode).map_err(|_| {
                    DeskError::Config(format!("DB_SSLMODE is not a valid mode: {ssl_mode}"))
                })?;
                Ok(PgConnectOptions::new()
                    .host(host)
                    .port(*port)
                    .database(name)
                    .username(user)
                    .password(password)
                    .ssl_mode(ssl))
            }
        }
    }

    /// Today's date in the market's zone.
    pub fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.market_tz).date_naive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn test_defaults() {
        let cfg = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(cfg.default_stat, Stat::Twap);
        assert_eq!(cfg.market_tz, chrono_tz::Asia::Kolkata);
        assert_eq!(cfg.assistant_author, DEFAULT_AUTHOR);
        assert_eq!(cfg.log_level, "info");
        match cfg.db {
            DbTarget::Parts { port, ssl_mode, .. } => {
                assert_eq!(port, 5432);
                assert_eq!(ssl_mode, "require");
            }
            DbTarget::Url(_) => panic!("expected split settings"),
        }
    }

    #[test]
    fn test_database_url_wins() {
        let cfg = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://u:p@db:5433/prices"),
            ("DB_HOST", "ignored"),
        ]))
        .unwrap();
        assert_eq!(cfg.db, DbTarget::Url("postgres://u:p@db:5433/prices".to_string()));
        assert!(cfg.connect_options().is_ok());
    }

    #[test]
    fn test_pgport_fallback() {
        let cfg = Config::from_lookup(lookup(&[("PGPORT", "6543")])).unwrap();
        assert!(matches!(cfg.db, DbTarget::Parts { port: 6543, .. }));
    }

    #[test]
    fn test_invalid_port_is_config_error() {
        let err = Config::from_lookup(lookup(&[("DB_PORT", "abc")])).unwrap_err();
        assert!(matches!(err, DeskError::Config(_)));
    }

    #[test]
    fn test_invalid_default_stat_falls_back_to_twap() {
        let cfg = Config::from_lookup(lookup(&[("DEFAULT_STAT", "median")])).unwrap();
        assert_eq!(cfg.default_stat, Stat::Twap);
        let cfg = Config::from_lookup(lookup(&[("DEFAULT_STAT", "vwap")])).unwrap();
        assert_eq!(cfg.default_stat, Stat::Vwap);
    }

    #[test]
    fn test_invalid_market_tz() {
        let err = Config::from_lookup(lookup(&[("MARKET_TZ", "Mars/Olympus")])).unwrap_err();
        assert!(err.to_string().contains("MARKET_TZ"));
    }

    #[test]
    fn test_invalid_ssl_mode() {
        let cfg = Config::from_lookup(lookup(&[("DB_SSLMODE", "sometimes")])).unwrap();
        assert!(cfg.connect_options().is_err());
    }
}
