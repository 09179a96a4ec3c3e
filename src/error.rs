//! Leaderboard errors

use crate::ranking::CustomerId;
use rust_decimal::Decimal;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LeaderboardError {
    /// Caller-visible invalid argument; nothing was enqueued
    #[error("score delta {delta} is outside [-{limit}, {limit}]")]
    DeltaOutOfRange { delta: Decimal, limit: Decimal },

    #[error("score for customer {customer_id} overflows the decimal range")]
    ScoreOverflow { customer_id: CustomerId },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to read config file {path}: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl LeaderboardError {
    /// True for errors caused by the request itself rather than the server
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            LeaderboardError::DeltaOutOfRange { .. } | LeaderboardError::ScoreOverflow { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, LeaderboardError>;
