//! Ranked Skip List
//!
//! A probabilistic ordered structure keeping leaderboard entries sorted by
//! score (descending) with customer id as tie-break. Every node carries its
//! 1-based rank, refreshed by a full base-layer walk after each mutation.
//!
//! Nodes live in an arena addressed by slot; slot 0 is the header sentinel.
//! The base layer is doubly linked so neighbor queries can walk toward
//! better ranks.

use super::node::{compare_entries, CustomerId, LeaderboardEntry, RankedNode};
use ahash::AHashMap;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rust_decimal::Decimal;
use std::cmp::Ordering;

/// Upper bound for the configurable `max_level`
pub const SKIPLIST_MAXLEVEL_MAX: usize = 32;
pub const DEFAULT_MAX_LEVEL: usize = 16;
pub const DEFAULT_PROMOTION_PROBABILITY: f64 = 0.5;

const HEADER: usize = 0;

type UpdateVector = [usize; SKIPLIST_MAXLEVEL_MAX + 1];

/// What an upsert did to the list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    Inserted,
    /// Score changed; node was re-threaded at its new position
    Updated,
    /// Same score as before
    Unchanged,
}

/// Counters for a batch of upserts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpsertStats {
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
}

impl UpsertStats {
    fn record(&mut self, outcome: Upsert) {
        match outcome {
            Upsert::Inserted => self.inserted += 1,
            Upsert::Updated => self.updated += 1,
            Upsert::Unchanged => self.unchanged += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.inserted + self.updated + self.unchanged
    }
}

#[derive(Clone, Debug)]
pub struct RankedSkipList {
    /// All nodes (index 0 is header). Nodes are never removed.
    nodes: Vec<RankedNode>,
    /// customer id -> arena slot
    index: AHashMap<CustomerId, usize>,
    /// Last node of the base layer
    tail: Option<usize>,
    /// Highest populated level (0-based)
    level: usize,
    max_level: usize,
    promotion_probability: f64,
    rng: ChaCha8Rng,
}

impl Default for RankedSkipList {
    fn default() -> Self {
        Self::new()
    }
}

impl RankedSkipList {
    pub fn new() -> Self {
        Self::with_params(DEFAULT_MAX_LEVEL, DEFAULT_PROMOTION_PROBABILITY, None)
    }

    /// Build a list with explicit structural parameters.
    ///
    /// A `seed` makes level draws reproducible; `None` seeds from entropy.
    pub fn with_params(max_level: usize, promotion_probability: f64, seed: Option<u64>) -> Self {
        debug_assert!(
            max_level <= SKIPLIST_MAXLEVEL_MAX,
            "Precondition violated: max_level {} exceeds {}",
            max_level,
            SKIPLIST_MAXLEVEL_MAX
        );
        debug_assert!(
            promotion_probability > 0.0 && promotion_probability < 1.0,
            "Precondition violated: promotion probability {} not in (0, 1)",
            promotion_probability
        );

        let max_level = max_level.min(SKIPLIST_MAXLEVEL_MAX);
        let rng = match seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };

        RankedSkipList {
            nodes: vec![RankedNode::new(0, Decimal::ZERO, max_level)],
            index: AHashMap::new(),
            tail: None,
            level: 0,
            max_level,
            promotion_probability,
            rng,
        }
    }

    /// Geometric level draw, capped at `max_level`
    fn random_level(&mut self) -> usize {
        let mut level = 0;
        while level < self.max_level && self.rng.gen::<f64>() < self.promotion_probability {
            level += 1;
        }
        level
    }

    /// For each level, the last node strictly ahead of `(score, customer_id)`
    fn find_update(&self, score: Decimal, customer_id: CustomerId) -> UpdateVector {
        let mut update = [HEADER; SKIPLIST_MAXLEVEL_MAX + 1];
        let mut x = HEADER;

        for i in (0..=self.level).rev() {
            while let Some(fwd) = self.nodes[x].forward[i] {
                let fwd_node = &self.nodes[fwd];
                if compare_entries(fwd_node.score, fwd_node.customer_id, score, customer_id)
                    == Ordering::Less
                {
                    x = fwd;
                } else {
                    break;
                }
            }
            update[i] = x;
        }

        update
    }

    /// Thread `slot` in after `update[i]` on every level it participates in
    fn link(&mut self, slot: usize, update: &UpdateVector) {
        let node_level = self.nodes[slot].level();

        for (i, &prev) in update.iter().enumerate().take(node_level + 1) {
            let old_forward = self.nodes[prev].forward[i];
            self.nodes[slot].forward[i] = old_forward;
            self.nodes[prev].forward[i] = Some(slot);
        }

        self.nodes[slot].backward = if update[0] == HEADER {
            None
        } else {
            Some(update[0])
        };

        match self.nodes[slot].forward[0] {
            Some(next) => self.nodes[next].backward = Some(slot),
            None => self.tail = Some(slot),
        }
    }

    /// Splice `slot` out of every level. The node keeps its level.
    fn unlink(&mut self, slot: usize, update: &UpdateVector) {
        let node_level = self.nodes[slot].level();
        let next = self.nodes[slot].forward[0];

        for (i, &prev) in update.iter().enumerate().take(node_level + 1) {
            if self.nodes[prev].forward[i] == Some(slot) {
                let old_forward = self.nodes[slot].forward[i];
                self.nodes[prev].forward[i] = old_forward;
            }
            self.nodes[slot].forward[i] = None;
        }

        let backward = self.nodes[slot].backward;
        match next {
            Some(next) => self.nodes[next].backward = backward,
            None => self.tail = backward,
        }
        self.nodes[slot].backward = None;
    }

    /// Insert or update without refreshing ranks.
    ///
    /// Callers must run [`recompute_ranks`](Self::recompute_ranks) before the
    /// list is observed again.
    pub(crate) fn upsert_unranked(&mut self, customer_id: CustomerId, score: Decimal) -> Upsert {
        if let Some(&slot) = self.index.get(&customer_id) {
            let old_score = self.nodes[slot].score;
            if old_score == score {
                // Equal value, possibly different scale: keep the latest form
                self.nodes[slot].score = score;
                return Upsert::Unchanged;
            }

            let update = self.find_update(old_score, customer_id);
            debug_assert_eq!(
                self.nodes[update[0]].forward[0],
                Some(slot),
                "Invariant violated: customer {} not found at its indexed position",
                customer_id
            );
            self.unlink(slot, &update);

            self.nodes[slot].score = score;
            let update = self.find_update(score, customer_id);
            self.link(slot, &update);
            return Upsert::Updated;
        }

        let update = self.find_update(score, customer_id);
        let new_level = self.random_level();
        if new_level > self.level {
            // update[] already points at the header above the old level
            self.level = new_level;
        }

        let slot = self.nodes.len();
        self.nodes.push(RankedNode::new(customer_id, score, new_level));
        self.link(slot, &update);
        self.index.insert(customer_id, slot);
        Upsert::Inserted
    }

    /// Insert a new customer or move an existing one to its new score,
    /// then refresh every rank.
    pub fn insert_or_update(&mut self, customer_id: CustomerId, score: Decimal) -> Upsert {
        let outcome = self.upsert_unranked(customer_id, score);
        self.recompute_ranks();
        self.verify_invariants();
        outcome
    }

    /// Apply a sequence of upserts in order, refreshing ranks once at the end.
    pub fn apply_all<I>(&mut self, mutations: I) -> UpsertStats
    where
        I: IntoIterator<Item = (CustomerId, Decimal)>,
    {
        let mut stats = UpsertStats::default();
        for (customer_id, score) in mutations {
            stats.record(self.upsert_unranked(customer_id, score));
        }
        if stats.total() > 0 {
            self.recompute_ranks();
            self.verify_invariants();
        }
        stats
    }

    /// Walk the base layer assigning ranks 1, 2, 3, ...
    pub fn recompute_ranks(&mut self) {
        let mut current = self.nodes[HEADER].forward[0];
        let mut rank = 1;

        while let Some(idx) = current {
            let node = &mut self.nodes[idx];
            node.rank = rank;
            current = node.forward[0];
            rank += 1;
        }
    }

    /// Point lookup by customer id
    pub fn get(&self, customer_id: CustomerId) -> Option<&RankedNode> {
        self.index.get(&customer_id).map(|&slot| &self.nodes[slot])
    }

    pub fn score_of(&self, customer_id: CustomerId) -> Option<Decimal> {
        self.get(customer_id).map(|node| node.score)
    }

    /// Entries with rank in `[start, end]` (inclusive, 1-based).
    ///
    /// A `start` of 0 is treated as 1; `end` is clamped to the list length.
    pub fn range_by_rank(&self, start: usize, end: usize) -> Vec<LeaderboardEntry> {
        let start = start.max(1);
        if start > end || start > self.len() {
            return Vec::new();
        }

        let end = end.min(self.len());
        self.iter()
            .skip(start - 1)
            .take(end - start + 1)
            .map(RankedNode::to_entry)
            .collect()
    }

    /// Up to `high` better-ranked entries, the customer itself, then up to
    /// `low` worse-ranked entries, in rank order.
    ///
    /// Returns an empty sequence for an unknown customer.
    pub fn neighbors(&self, customer_id: CustomerId, high: usize, low: usize) -> Vec<LeaderboardEntry> {
        let Some(&slot) = self.index.get(&customer_id) else {
            return Vec::new();
        };

        let rank = self.nodes[slot].rank;
        let above = high.min(rank.saturating_sub(1));
        let below = low.min(self.len().saturating_sub(rank));
        let mut result = Vec::with_capacity(above + below + 1);

        let mut current = self.nodes[slot].backward;
        for _ in 0..high {
            let Some(idx) = current else { break };
            result.push(self.nodes[idx].to_entry());
            current = self.nodes[idx].backward;
        }
        result.reverse();

        result.push(self.nodes[slot].to_entry());

        let mut current = self.nodes[slot].forward[0];
        for _ in 0..low {
            let Some(idx) = current else { break };
            result.push(self.nodes[idx].to_entry());
            current = self.nodes[idx].forward[0];
        }

        result
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Highest populated level (0-based)
    pub fn level(&self) -> usize {
        self.level
    }

    pub fn max_level(&self) -> usize {
        self.max_level
    }

    pub fn promotion_probability(&self) -> f64 {
        self.promotion_probability
    }

    /// Iterate nodes from rank 1 downward
    pub fn iter(&self) -> RankedIter<'_> {
        RankedIter {
            list: self,
            current: self.nodes[HEADER].forward[0],
        }
    }

    /// Iterate nodes from the last rank upward
    pub fn iter_rev(&self) -> RankedRevIter<'_> {
        RankedRevIter {
            list: self,
            current: self.tail,
        }
    }

    /// Check every structural invariant, reporting the first violation.
    pub fn check_invariants(&self) -> Result<(), String> {
        let len = self.len();
        if self.nodes.len() != len + 1 {
            return Err(format!(
                "Arena size {} does not match {} indexed customers",
                self.nodes.len(),
                len
            ));
        }

        for (&customer_id, &slot) in &self.index {
            if self.nodes[slot].customer_id != customer_id {
                return Err(format!(
                    "Index maps customer {} to slot {} holding customer {}",
                    customer_id, slot, self.nodes[slot].customer_id
                ));
            }
        }

        // Base layer: ordering, ranks, back links, tail
        let mut prev: Option<usize> = None;
        let mut current = self.nodes[HEADER].forward[0];
        let mut count = 0;
        while let Some(idx) = current {
            count += 1;
            if count > len {
                return Err("Cycle detected on level 0".to_string());
            }
            let node = &self.nodes[idx];
            if node.rank != count {
                return Err(format!(
                    "Customer {} has rank {}, expected {}",
                    node.customer_id, node.rank, count
                ));
            }
            if node.backward != prev {
                return Err(format!(
                    "Customer {} back link {:?} does not match predecessor {:?}",
                    node.customer_id, node.backward, prev
                ));
            }
            prev = Some(idx);
            current = node.forward[0];
        }
        if count != len {
            return Err(format!("Level 0 holds {} nodes, expected {}", count, len));
        }
        if self.tail != prev {
            return Err(format!("Tail {:?} is not the last node {:?}", self.tail, prev));
        }

        // Every level strictly ordered, every linked node tall enough
        for level in 0..=self.max_level {
            let mut x = HEADER;
            let mut steps = 0;
            while let Some(fwd) = self.nodes[x].forward[level] {
                steps += 1;
                if steps > len {
                    return Err(format!("Cycle detected on level {}", level));
                }
                let fwd_node = &self.nodes[fwd];
                if fwd_node.level() < level {
                    return Err(format!(
                        "Customer {} linked at level {} above its height {}",
                        fwd_node.customer_id,
                        level,
                        fwd_node.level()
                    ));
                }
                if x != HEADER {
                    let node = &self.nodes[x];
                    if compare_entries(node.score, node.customer_id, fwd_node.score, fwd_node.customer_id)
                        != Ordering::Less
                    {
                        return Err(format!(
                            "Level {} out of order: customer {} before customer {}",
                            level, node.customer_id, fwd_node.customer_id
                        ));
                    }
                }
                x = fwd;
            }
            if level > self.level && steps > 0 {
                return Err(format!(
                    "Level {} populated above current level {}",
                    level, self.level
                ));
            }
        }

        Ok(())
    }

    /// VOPR: Verify all invariants hold for this list
    #[cfg(debug_assertions)]
    fn verify_invariants(&self) {
        if let Err(violation) = self.check_invariants() {
            panic!("Invariant violated: {}", violation);
        }
    }

    #[cfg(not(debug_assertions))]
    #[inline(always)]
    fn verify_invariants(&self) {}
}

pub struct RankedIter<'a> {
    list: &'a RankedSkipList,
    current: Option<usize>,
}

impl<'a> Iterator for RankedIter<'a> {
    type Item = &'a RankedNode;

    fn next(&mut self) -> Option<Self::Item> {
        let idx = self.current?;
        let node = &self.list.nodes[idx];
        self.current = node.forward[0];
        Some(node)
    }
}

pub struct RankedRevIter<'a> {
    list: &'a RankedSkipList,
    current: Option<usize>,
}

impl<'a> Iterator for RankedRevIter<'a> {
    type Item = &'a RankedNode;

    fn next(&mut self) -> Option<Self::Item> {
        let idx = self.current?;
        let node = &self.list.nodes[idx];
        self.current = node.backward;
        Some(node)
    }
}
