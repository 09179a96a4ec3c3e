pub mod config;
pub mod error;
pub mod leaderboard;
pub mod observability;
pub mod ranking;
pub mod server;

pub use config::{LeaderboardConfig, LogFormat};
pub use error::{LeaderboardError, Result};
pub use leaderboard::{CacheJanitor, DrainTask, LeaderboardService, UpdateBatcher};
pub use ranking::{CustomerId, LeaderboardEntry, RankedSkipList};
pub use server::LeaderboardServer;
