//! Ranked Skip List Deterministic Simulation Tests
//!
//! VOPR-style tests for RankedSkipList with multiple seeds. Each run checks
//! ordering, rank density, link symmetry and lookups against a sorted model
//! after every operation.

use leaderboard::ranking::{
    run_skiplist_batch, summarize_batch, SkipListDSTConfig, SkipListDSTHarness,
};

// =============================================================================
// Standard Configuration Tests - 100 Seeds
// =============================================================================

#[test]
fn test_skiplist_dst_100_seeds_standard() {
    let results = run_skiplist_batch(0, 100, 200, SkipListDSTConfig::new);
    let summary = summarize_batch(&results);
    println!("{}", summary);

    let passed = results.iter().filter(|r| r.is_success()).count();
    assert_eq!(passed, 100, "All 100 seeds should pass with standard config");
}

#[test]
fn test_skiplist_dst_100_seeds_small_keyspace() {
    // Small keyspace = constant re-threading and score ties
    let results = run_skiplist_batch(1000, 100, 200, SkipListDSTConfig::small_keyspace);
    let summary = summarize_batch(&results);
    println!("{}", summary);

    let passed = results.iter().filter(|r| r.is_success()).count();
    assert_eq!(passed, 100, "All 100 seeds should pass with small keyspace");
}

#[test]
fn test_skiplist_dst_20_seeds_large_keyspace() {
    let results = run_skiplist_batch(2000, 20, 200, SkipListDSTConfig::large_keyspace);
    let summary = summarize_batch(&results);
    println!("{}", summary);

    let passed = results.iter().filter(|r| r.is_success()).count();
    assert_eq!(passed, 20, "All 20 seeds should pass with large keyspace");
}

// =============================================================================
// Edge Case Tests
// =============================================================================

#[test]
fn test_skiplist_dst_single_customer() {
    let config = SkipListDSTConfig {
        seed: 555,
        num_customers: 1,
        ..Default::default()
    };
    let mut harness = SkipListDSTHarness::new(config);
    harness.run(300);
    let result = harness.result();
    println!("Single customer: {}", result.summary());
    assert!(result.is_success(), "{:?}", result.invariant_violations);
    assert_eq!(harness.list().len(), 1);
}

#[test]
fn test_skiplist_dst_all_ties() {
    // Every score identical: order is purely by customer id
    let config = SkipListDSTConfig {
        seed: 31337,
        num_customers: 64,
        max_score: 0,
        ..Default::default()
    };
    let mut harness = SkipListDSTHarness::new(config);
    harness.run(500);
    let result = harness.result();
    assert!(result.is_success(), "{:?}", result.invariant_violations);

    let ids: Vec<_> = harness.list().iter().map(|n| n.customer_id()).collect();
    let mut sorted = ids.clone();
    sorted.sort();
    assert_eq!(ids, sorted);
}

#[test]
fn test_skiplist_dst_flat_list() {
    // max_level 1 with low promotion: nearly a plain linked list
    let config = SkipListDSTConfig {
        seed: 4242,
        max_level: 1,
        promotion_probability: 0.05,
        ..Default::default()
    };
    let mut harness = SkipListDSTHarness::new(config);
    harness.run(400);
    assert!(harness.result().is_success(), "{:?}", harness.result().invariant_violations);
    assert!(harness.list().level() <= 1);
}

#[test]
fn test_skiplist_dst_tall_list() {
    let config = SkipListDSTConfig {
        seed: 8080,
        num_customers: 2000,
        max_level: 32,
        promotion_probability: 0.75,
        ..Default::default()
    };
    let mut harness = SkipListDSTHarness::new(config);
    harness.run(300);
    assert!(harness.result().is_success(), "{:?}", harness.result().invariant_violations);
}

// =============================================================================
// Determinism Tests
// =============================================================================

#[test]
fn test_skiplist_dst_deterministic() {
    let seed = 12345;

    let mut h1 = SkipListDSTHarness::with_seed(seed);
    h1.run(300);
    let mut h2 = SkipListDSTHarness::with_seed(seed);
    h2.run(300);

    let r1 = h1.result();
    let r2 = h2.result();
    assert_eq!(r1.total_operations, r2.total_operations);
    assert_eq!(r1.inserts, r2.inserts);
    assert_eq!(r1.updates, r2.updates);
    assert_eq!(r1.batches, r2.batches);

    let levels1: Vec<_> = h1.list().iter().map(|n| (n.customer_id(), n.level())).collect();
    let levels2: Vec<_> = h2.list().iter().map(|n| (n.customer_id(), n.level())).collect();
    assert_eq!(levels1, levels2, "Same seed must build the same structure");
}
