//! Ranked node and the plain entry record handed out to readers

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Customer identity. Unique per entry.
pub type CustomerId = i64;

/// A node in the ranked skip list
///
/// `forward[i]` is the arena slot of the next node at level `i`, for
/// `i in 0..=level`. `backward` links the base layer in reverse.
#[derive(Clone, Debug)]
pub struct RankedNode {
    pub(crate) customer_id: CustomerId,
    pub(crate) score: Decimal,
    pub(crate) rank: usize,
    pub(crate) forward: Vec<Option<usize>>,
    pub(crate) backward: Option<usize>,
}

impl RankedNode {
    pub(crate) fn new(customer_id: CustomerId, score: Decimal, level: usize) -> Self {
        RankedNode {
            customer_id,
            score,
            rank: 0,
            forward: vec![None; level + 1],
            backward: None,
        }
    }

    pub fn customer_id(&self) -> CustomerId {
        self.customer_id
    }

    pub fn score(&self) -> Decimal {
        self.score
    }

    /// 1-based position under [`compare_entries`]
    pub fn rank(&self) -> usize {
        self.rank
    }

    /// Highest level this node is threaded into (0-based)
    pub fn level(&self) -> usize {
        self.forward.len() - 1
    }

    pub fn to_entry(&self) -> LeaderboardEntry {
        LeaderboardEntry {
            customer_id: self.customer_id,
            score: self.score,
            rank: self.rank,
        }
    }
}

/// Materialized copy of a node, safe to hold after the lock is released
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub customer_id: CustomerId,
    pub score: Decimal,
    pub rank: usize,
}

/// Leaderboard order: score descending, then customer id ascending.
///
/// Returns `Less` when `(score1, id1)` ranks ahead of `(score2, id2)`.
#[inline]
pub fn compare_entries(
    score1: Decimal,
    id1: CustomerId,
    score2: Decimal,
    id2: CustomerId,
) -> Ordering {
    score2.cmp(&score1).then_with(|| id1.cmp(&id2))
}
