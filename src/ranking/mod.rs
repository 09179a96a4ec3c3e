//! Ranked ordered-set engine
//!
//! - `RankedNode`: one customer's score record plus its skip links
//! - `RankedSkipList`: ordered storage with dense 1-based ranks
//! - `SkipListDSTHarness`: seeded random-operation harness with invariant checks

mod node;
mod skiplist;
mod skiplist_dst;

pub use node::{compare_entries, CustomerId, LeaderboardEntry, RankedNode};
pub use skiplist::{
    RankedIter, RankedRevIter, RankedSkipList, Upsert, UpsertStats, DEFAULT_MAX_LEVEL,
    DEFAULT_PROMOTION_PROBABILITY, SKIPLIST_MAXLEVEL_MAX,
};
pub use skiplist_dst::{
    run_skiplist_batch, summarize_batch, SkipListDSTConfig, SkipListDSTHarness, SkipListDSTResult,
    SkipListOp,
};
