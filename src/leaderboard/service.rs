//! Leaderboard service façade
//!
//! Validates score deltas, queues new absolute scores through the
//! [`UpdateBatcher`], and serves rank-range and neighbor queries under
//! shared access to the skip list. Rank-range results go through a
//! short-lived [`ResultCache`] that writes never invalidate.

use super::batcher::{DrainReport, UpdateBatcher};
use super::cache::ResultCache;
use crate::config::LeaderboardConfig;
use crate::error::{LeaderboardError, Result};
use crate::ranking::{CustomerId, LeaderboardEntry, RankedSkipList};
use parking_lot::RwLock;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tracing::{trace, warn};

/// Largest accepted absolute delta per update
pub const SCORE_DELTA_MAX: i64 = 1000;

/// Cache key for a rank-range query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RankWindow {
    pub start: usize,
    pub end: usize,
}

pub type RangeCache = ResultCache<RankWindow, Vec<LeaderboardEntry>>;

/// Cheap to clone; clones share the same state.
#[derive(Clone)]
pub struct LeaderboardService {
    skiplist: Arc<RwLock<RankedSkipList>>,
    batcher: Arc<UpdateBatcher>,
    cache: Arc<RangeCache>,
}

impl LeaderboardService {
    pub fn new(config: &LeaderboardConfig) -> Self {
        let skiplist = RankedSkipList::with_params(
            config.max_level,
            config.promotion_probability,
            config.rng_seed,
        );
        Self::with_skiplist(skiplist, config.cache_ttl(), config.cache_max_entries)
    }

    pub fn with_skiplist(skiplist: RankedSkipList, cache_ttl: Duration, cache_max_entries: usize) -> Self {
        let skiplist = Arc::new(RwLock::new(skiplist));
        LeaderboardService {
            batcher: Arc::new(UpdateBatcher::new(skiplist.clone())),
            cache: Arc::new(ResultCache::new(cache_ttl, cache_max_entries)),
            skiplist,
        }
    }

    /// Add `delta` to the customer's score and return the new absolute
    /// score. The skip list catches up on the next drain.
    pub fn update_score(&self, customer_id: CustomerId, delta: Decimal) -> Result<Decimal> {
        let limit = Decimal::from(SCORE_DELTA_MAX);
        if delta < -limit || delta > limit {
            warn!(customer_id, %delta, "rejected out-of-range score delta");
            return Err(LeaderboardError::DeltaOutOfRange { delta, limit });
        }

        let score = self.batcher.enqueue_with(customer_id, |current| {
            current
                .checked_add(delta)
                .ok_or(LeaderboardError::ScoreOverflow { customer_id })
        })?;

        trace!(customer_id, %delta, %score, "queued score update");
        Ok(score)
    }

    /// Entries ranked `start..=end`, possibly served from cache.
    pub fn get_by_rank_range(&self, start: usize, end: usize) -> Vec<LeaderboardEntry> {
        let key = RankWindow { start, end };
        self.cache
            .get_or_compute(key, || self.skiplist.read().range_by_rank(start, end))
    }

    /// Up to `high` better-ranked entries, the customer, then up to `low`
    /// worse-ranked entries. Empty for an unknown customer.
    pub fn get_neighbors(&self, customer_id: CustomerId, high: usize, low: usize) -> Vec<LeaderboardEntry> {
        self.skiplist.read().neighbors(customer_id, high, low)
    }

    /// Applied (drained) entry for a customer
    pub fn get_customer(&self, customer_id: CustomerId) -> Option<LeaderboardEntry> {
        self.skiplist
            .read()
            .get(customer_id)
            .map(|node| node.to_entry())
    }

    /// Number of customers applied to the leaderboard
    pub fn len(&self) -> usize {
        self.skiplist.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.skiplist.read().is_empty()
    }

    /// Run one drain cycle now
    pub fn drain(&self) -> DrainReport {
        self.batcher.drain()
    }

    pub fn batcher(&self) -> &Arc<UpdateBatcher> {
        &self.batcher
    }

    pub fn cache(&self) -> &Arc<RangeCache> {
        &self.cache
    }
}
