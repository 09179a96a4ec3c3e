//! Deterministic Simulation Testing for the ranked skip list
//!
//! VOPR-style harness that enables:
//! - Deterministic random operation generation
//! - Comparison against a sorted model after each operation
//! - Seed-based reproducibility for debugging
//!
//! ## Usage
//!
//! ```rust,ignore
//! for seed in 0..100 {
//!     let mut harness = SkipListDSTHarness::with_seed(seed);
//!     harness.run(500);
//!     assert!(harness.result().is_success(), "Seed {} failed", seed);
//! }
//! ```

use super::node::{compare_entries, CustomerId, LeaderboardEntry};
use super::skiplist::{RankedSkipList, Upsert};
use ahash::AHashMap;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rust_decimal::Decimal;

/// Configuration for skip list DST
#[derive(Debug, Clone)]
pub struct SkipListDSTConfig {
    /// Random seed for reproducibility
    pub seed: u64,
    /// Number of distinct customers (bounded key space)
    pub num_customers: i64,
    /// Probability that an operation is a batch instead of a single upsert
    pub batch_prob: f64,
    /// Largest batch size
    pub max_batch: usize,
    /// Scores are drawn from [-max_score, max_score] with two decimals
    pub max_score: i64,
    pub max_level: usize,
    pub promotion_probability: f64,
}

impl Default for SkipListDSTConfig {
    fn default() -> Self {
        SkipListDSTConfig {
            seed: 0,
            num_customers: 100,
            batch_prob: 0.2,
            max_batch: 16,
            max_score: 1000,
            max_level: 16,
            promotion_probability: 0.5,
        }
    }
}

impl SkipListDSTConfig {
    pub fn new(seed: u64) -> Self {
        SkipListDSTConfig {
            seed,
            ..Default::default()
        }
    }

    /// Few customers, narrow scores: mostly updates and ties
    pub fn small_keyspace(seed: u64) -> Self {
        SkipListDSTConfig {
            seed,
            num_customers: 8,
            max_score: 5,
            ..Default::default()
        }
    }

    /// Many customers: mostly inserts, taller lists
    pub fn large_keyspace(seed: u64) -> Self {
        SkipListDSTConfig {
            seed,
            num_customers: 5000,
            batch_prob: 0.4,
            max_batch: 64,
            ..Default::default()
        }
    }
}

/// Operation type for logging
#[derive(Debug, Clone)]
pub enum SkipListOp {
    Upsert { customer_id: CustomerId, score: Decimal },
    Batch { mutations: Vec<(CustomerId, Decimal)> },
}

/// Result of a skip list DST run
#[derive(Debug, Clone)]
pub struct SkipListDSTResult {
    pub seed: u64,
    pub total_operations: u64,
    pub inserts: u64,
    pub updates: u64,
    pub batches: u64,
    /// Invariant violations found (with operation context)
    pub invariant_violations: Vec<String>,
    /// Last operation before failure (if any)
    pub last_op: Option<SkipListOp>,
}

impl SkipListDSTResult {
    pub fn new(seed: u64) -> Self {
        SkipListDSTResult {
            seed,
            total_operations: 0,
            inserts: 0,
            updates: 0,
            batches: 0,
            invariant_violations: Vec::new(),
            last_op: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.invariant_violations.is_empty()
    }

    pub fn summary(&self) -> String {
        format!(
            "Seed {}: {} ops ({} inserts, {} updates, {} batches), {} violations",
            self.seed,
            self.total_operations,
            self.inserts,
            self.updates,
            self.batches,
            self.invariant_violations.len()
        )
    }
}

/// DST harness for RankedSkipList
pub struct SkipListDSTHarness {
    config: SkipListDSTConfig,
    rng: ChaCha8Rng,
    list: RankedSkipList,
    /// Expected score per customer
    model: AHashMap<CustomerId, Decimal>,
    result: SkipListDSTResult,
}

impl SkipListDSTHarness {
    pub fn new(config: SkipListDSTConfig) -> Self {
        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        let list = RankedSkipList::with_params(
            config.max_level,
            config.promotion_probability,
            Some(config.seed.wrapping_add(1)),
        );
        SkipListDSTHarness {
            result: SkipListDSTResult::new(config.seed),
            config,
            rng,
            list,
            model: AHashMap::new(),
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self::new(SkipListDSTConfig::new(seed))
    }

    fn random_customer(&mut self) -> CustomerId {
        self.rng.gen_range(0..self.config.num_customers)
    }

    fn random_score(&mut self) -> Decimal {
        let bound = self.config.max_score * 100;
        Decimal::new(self.rng.gen_range(-bound..=bound), 2)
    }

    fn run_single_op(&mut self) {
        if self.rng.gen_bool(self.config.batch_prob) {
            let size = self.rng.gen_range(1..=self.config.max_batch);
            let mutations: Vec<_> = (0..size)
                .map(|_| (self.random_customer(), self.random_score()))
                .collect();
            self.result.last_op = Some(SkipListOp::Batch {
                mutations: mutations.clone(),
            });

            let stats = self.list.apply_all(mutations.iter().copied());
            for (customer_id, score) in mutations {
                self.model.insert(customer_id, score);
            }
            self.result.inserts += stats.inserted as u64;
            self.result.updates += stats.updated as u64;
            self.result.batches += 1;
        } else {
            let customer_id = self.random_customer();
            let score = self.random_score();
            self.result.last_op = Some(SkipListOp::Upsert { customer_id, score });

            match self.list.insert_or_update(customer_id, score) {
                Upsert::Inserted => self.result.inserts += 1,
                Upsert::Updated => self.result.updates += 1,
                Upsert::Unchanged => {}
            }
            self.model.insert(customer_id, score);
        }

        self.result.total_operations += 1;

        if let Err(violation) = self.check_invariants() {
            self.result.invariant_violations.push(format!(
                "Op #{}: {:?} - {}",
                self.result.total_operations, self.result.last_op, violation
            ));
        }
    }

    /// The model sorted into leaderboard order, with ranks
    fn expected_entries(&self) -> Vec<LeaderboardEntry> {
        let mut sorted: Vec<_> = self.model.iter().map(|(&id, &score)| (id, score)).collect();
        sorted.sort_by(|a, b| compare_entries(a.1, a.0, b.1, b.0));
        sorted
            .into_iter()
            .enumerate()
            .map(|(i, (customer_id, score))| LeaderboardEntry {
                customer_id,
                score,
                rank: i + 1,
            })
            .collect()
    }

    fn check_invariants(&mut self) -> Result<(), String> {
        // Invariant 1: structure (links, levels, ranks, index)
        self.list.check_invariants()?;

        // Invariant 2: content and order match the model exactly
        let expected = self.expected_entries();
        let actual = self.list.range_by_rank(1, usize::MAX);
        if actual != expected {
            let first_diff = actual
                .iter()
                .zip(&expected)
                .position(|(a, e)| a != e)
                .unwrap_or(actual.len().min(expected.len()));
            return Err(format!(
                "Order mismatch at position {} (actual len {}, expected len {})",
                first_diff,
                actual.len(),
                expected.len()
            ));
        }

        // Invariant 3: point lookups agree with the model
        for (&customer_id, &score) in &self.model {
            match self.list.score_of(customer_id) {
                Some(s) if s == score => {}
                other => {
                    return Err(format!(
                        "Customer {} lookup returned {:?}, expected {}",
                        customer_id, other, score
                    ));
                }
            }
        }

        // Invariant 4: a random neighbor window matches the model slice
        if !expected.is_empty() {
            let pick = self.rng.gen_range(0..expected.len());
            let high = self.rng.gen_range(0..4);
            let low = self.rng.gen_range(0..4);
            let window = self.list.neighbors(expected[pick].customer_id, high, low);
            let from = pick.saturating_sub(high);
            let to = (pick + low + 1).min(expected.len());
            if window.as_slice() != &expected[from..to] {
                return Err(format!(
                    "Neighbor window for customer {} (high {}, low {}) mismatched",
                    expected[pick].customer_id, high, low
                ));
            }
        }

        Ok(())
    }

    /// Run specified number of operations
    pub fn run(&mut self, operations: usize) {
        for _ in 0..operations {
            self.run_single_op();

            // Stop early if we hit a violation
            if !self.result.invariant_violations.is_empty() {
                break;
            }
        }
    }

    pub fn result(&self) -> &SkipListDSTResult {
        &self.result
    }

    pub fn list(&self) -> &RankedSkipList {
        &self.list
    }
}

/// Run a batch of DST tests with different seeds
pub fn run_skiplist_batch(
    start_seed: u64,
    num_seeds: usize,
    ops_per_seed: usize,
    config_fn: fn(u64) -> SkipListDSTConfig,
) -> Vec<SkipListDSTResult> {
    (0..num_seeds)
        .map(|i| {
            let seed = start_seed + i as u64;
            let mut harness = SkipListDSTHarness::new(config_fn(seed));
            harness.run(ops_per_seed);
            harness.result().clone()
        })
        .collect()
}

/// Summarize batch results
pub fn summarize_batch(results: &[SkipListDSTResult]) -> String {
    let total = results.len();
    let passed = results.iter().filter(|r| r.is_success()).count();
    let failed = total - passed;
    let total_ops: u64 = results.iter().map(|r| r.total_operations).sum();

    let mut summary = format!(
        "Skip List DST Summary\n\
         =====================\n\
         Seeds: {} total, {} passed, {} failed\n\
         Total operations: {}\n",
        total, passed, failed, total_ops
    );

    if failed > 0 {
        summary.push_str("\nFailed seeds:\n");
        for result in results.iter().filter(|r| !r.is_success()) {
            summary.push_str(&format!("  Seed {}: {}\n", result.seed, result.summary()));
            for violation in &result.invariant_violations {
                summary.push_str(&format!("    - {}\n", violation));
            }
        }
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skiplist_dst_single_seed() {
        let mut harness = SkipListDSTHarness::with_seed(12345);
        harness.run(200);
        let result = harness.result();
        println!("{}", result.summary());
        assert!(result.is_success(), "Seed 12345 failed: {:?}", result.invariant_violations);
    }

    #[test]
    fn test_skiplist_dst_small_keyspace_exercises_updates() {
        let mut harness = SkipListDSTHarness::new(SkipListDSTConfig::small_keyspace(42));
        harness.run(300);
        let result = harness.result();
        assert!(result.is_success(), "{:?}", result.invariant_violations);
        assert!(result.updates > 50, "Should have many updates: {}", result.summary());
        assert!(harness.list().len() <= 8);
    }

    #[test]
    fn test_skiplist_dst_10_seeds() {
        let results = run_skiplist_batch(0, 10, 200, SkipListDSTConfig::new);
        let summary = summarize_batch(&results);
        println!("{}", summary);

        let passed = results.iter().filter(|r| r.is_success()).count();
        assert_eq!(passed, 10, "All 10 seeds should pass");
    }
}
