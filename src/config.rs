//! Leaderboard configuration
//!
//! Loaded from an optional TOML file, then overridden by environment
//! variables, then validated.
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | LEADERBOARD_CONFIG | - | Path to a TOML config file |
//! | LEADERBOARD_BIND_ADDR | 127.0.0.1:7380 | Listen address |
//! | LEADERBOARD_MAX_LEVEL | 16 | Highest skip list level (0-based) |
//! | LEADERBOARD_PROMOTION_PROBABILITY | 0.5 | Level promotion probability |
//! | LEADERBOARD_RNG_SEED | - | Fixed seed for level draws |
//! | LEADERBOARD_DRAIN_INTERVAL_MS | 100 | Batch drain period |
//! | LEADERBOARD_CACHE_TTL_MS | 30000 | Rank-range cache expiry |
//! | LEADERBOARD_CACHE_MAX_ENTRIES | 10000 | Rank-range cache capacity |
//! | LEADERBOARD_LOG_FORMAT | text | `text` or `json` |

use crate::error::{LeaderboardError, Result};
use crate::ranking::SKIPLIST_MAXLEVEL_MAX;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

pub const CONFIG_PATH_ENV: &str = "LEADERBOARD_CONFIG";

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = LeaderboardError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(LeaderboardError::InvalidConfig(format!(
                "unknown log format '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeaderboardConfig {
    pub bind_addr: String,
    pub max_level: usize,
    pub promotion_probability: f64,
    /// Fixed seed for level draws (None = entropy)
    pub rng_seed: Option<u64>,
    pub drain_interval_ms: u64,
    pub cache_ttl_ms: u64,
    pub cache_max_entries: usize,
    pub log_format: LogFormat,
}

impl Default for LeaderboardConfig {
    fn default() -> Self {
        LeaderboardConfig {
            bind_addr: "127.0.0.1:7380".to_string(),
            max_level: 16,
            promotion_probability: 0.5,
            rng_seed: None,
            drain_interval_ms: 100,
            cache_ttl_ms: 30_000,
            cache_max_entries: 10_000,
            log_format: LogFormat::Text,
        }
    }
}

impl LeaderboardConfig {
    /// Load from `LEADERBOARD_CONFIG` (if set), apply env overrides, validate.
    pub fn load() -> Result<Self> {
        let mut config = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => Self::from_file(path)?,
            Err(_) => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML file. Missing fields take their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents =
            std::fs::read_to_string(path).map_err(|source| LeaderboardError::ConfigIo {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Override fields from `LEADERBOARD_*` variables as seen through `lookup`
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = lookup("LEADERBOARD_BIND_ADDR") {
            self.bind_addr = addr;
        }
        if let Some(v) = lookup("LEADERBOARD_MAX_LEVEL") {
            self.max_level = parse_var("LEADERBOARD_MAX_LEVEL", &v)?;
        }
        if let Some(v) = lookup("LEADERBOARD_PROMOTION_PROBABILITY") {
            self.promotion_probability = parse_var("LEADERBOARD_PROMOTION_PROBABILITY", &v)?;
        }
        if let Some(v) = lookup("LEADERBOARD_RNG_SEED") {
            self.rng_seed = Some(parse_var("LEADERBOARD_RNG_SEED", &v)?);
        }
        if let Some(v) = lookup("LEADERBOARD_DRAIN_INTERVAL_MS") {
            self.drain_interval_ms = parse_var("LEADERBOARD_DRAIN_INTERVAL_MS", &v)?;
        }
        if let Some(v) = lookup("LEADERBOARD_CACHE_TTL_MS") {
            self.cache_ttl_ms = parse_var("LEADERBOARD_CACHE_TTL_MS", &v)?;
        }
        if let Some(v) = lookup("LEADERBOARD_CACHE_MAX_ENTRIES") {
            self.cache_max_entries = parse_var("LEADERBOARD_CACHE_MAX_ENTRIES", &v)?;
        }
        if let Some(v) = lookup("LEADERBOARD_LOG_FORMAT") {
            self.log_format = v.parse()?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_level == 0 || self.max_level > SKIPLIST_MAXLEVEL_MAX {
            return Err(LeaderboardError::InvalidConfig(format!(
                "max_level must be in 1..={}, got {}",
                SKIPLIST_MAXLEVEL_MAX, self.max_level
            )));
        }
        // NaN fails both comparisons
        if !(self.promotion_probability > 0.0 && self.promotion_probability < 1.0) {
            return Err(LeaderboardError::InvalidConfig(format!(
                "promotion_probability must be in (0, 1), got {}",
                self.promotion_probability
            )));
        }
        if self.drain_interval_ms == 0 {
            return Err(LeaderboardError::InvalidConfig(
                "drain_interval_ms must be positive".to_string(),
            ));
        }
        if self.cache_ttl_ms == 0 {
            return Err(LeaderboardError::InvalidConfig(
                "cache_ttl_ms must be positive".to_string(),
            ));
        }
        if self.cache_max_entries == 0 {
            return Err(LeaderboardError::InvalidConfig(
                "cache_max_entries must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn drain_interval(&self) -> Duration {
        Duration::from_millis(self.drain_interval_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }
}

fn parse_var<T: FromStr>(name: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| {
        LeaderboardError::InvalidConfig(format!("{} has invalid value '{}'", name, value))
    })
}
