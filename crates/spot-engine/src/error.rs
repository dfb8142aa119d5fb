//! Error types for spot-engine operations.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("Invalid market: {0}")]
    InvalidMarket(String),

    #[error("Invalid statistic: {0}")]
    InvalidStat(String),

    #[error("Invalid exchange: {0}")]
    InvalidExchange(String),

    #[error("Invalid date: {0}")]
    InvalidDate(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;
