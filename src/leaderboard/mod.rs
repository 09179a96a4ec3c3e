//! Leaderboard service layer
//!
//! - `UpdateBatcher`: pending-mutation queue drained under exclusive access
//! - `LeaderboardService`: validation, score computation and queries
//! - `ResultCache`: get-or-compute cache with fixed expiry
//! - `DrainTask` / `CacheJanitor`: periodic background actors

mod batcher;
mod cache;
mod service;
mod tasks;

pub use batcher::{DrainReport, PendingMutation, UpdateBatcher};
pub use cache::{CacheStats, ResultCache};
pub use service::{LeaderboardService, RangeCache, RankWindow, SCORE_DELTA_MAX};
pub use tasks::{CacheJanitor, DrainTask};
