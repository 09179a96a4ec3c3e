//! Update batcher
//!
//! Queues absolute-score mutations and applies them to the skip list in
//! FIFO batches under exclusive access.
//!
//! ## Lock order
//!
//! ```text
//! pending (Mutex) ──► skiplist (RwLock)
//! ```
//!
//! Both `enqueue_with` and `drain` take the pending mutex first. A drain
//! holds it only long enough to acquire the write lock and swap the queue
//! out, so projected scores never disagree with what a reader of the skip
//! list would see once the batch lands.

use crate::ranking::{CustomerId, RankedSkipList, UpsertStats};
use ahash::AHashMap;
use parking_lot::{Mutex, RwLock};
use rust_decimal::Decimal;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::debug;

/// An absolute score waiting to be applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingMutation {
    pub customer_id: CustomerId,
    pub score: Decimal,
}

#[derive(Default)]
struct PendingState {
    queue: VecDeque<PendingMutation>,
    /// Latest queued score per customer
    projected: AHashMap<CustomerId, Decimal>,
}

impl PendingState {
    fn push(&mut self, mutation: PendingMutation) {
        self.projected.insert(mutation.customer_id, mutation.score);
        self.queue.push_back(mutation);
    }
}

/// Outcome of one drain cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Mutations taken off the queue
    pub applied: usize,
    pub stats: UpsertStats,
}

pub struct UpdateBatcher {
    skiplist: Arc<RwLock<RankedSkipList>>,
    pending: Mutex<PendingState>,
}

impl UpdateBatcher {
    pub fn new(skiplist: Arc<RwLock<RankedSkipList>>) -> Self {
        UpdateBatcher {
            skiplist,
            pending: Mutex::new(PendingState::default()),
        }
    }

    /// Queue an absolute score. Multiple entries per customer may coexist;
    /// the last one enqueued wins when drained.
    pub fn enqueue(&self, customer_id: CustomerId, score: Decimal) {
        self.pending.lock().push(PendingMutation { customer_id, score });
    }

    /// Read the customer's projected score, derive a new one and queue it as
    /// one atomic step.
    ///
    /// The projected score is the latest queued score for the customer, or
    /// its applied score, or zero. Nothing is queued if `compute` fails.
    pub fn enqueue_with<F, E>(&self, customer_id: CustomerId, compute: F) -> Result<Decimal, E>
    where
        F: FnOnce(Decimal) -> Result<Decimal, E>,
    {
        let mut pending = self.pending.lock();

        let current = match pending.projected.get(&customer_id) {
            Some(&score) => score,
            None => self
                .skiplist
                .read()
                .score_of(customer_id)
                .unwrap_or(Decimal::ZERO),
        };

        let score = compute(current)?;
        pending.push(PendingMutation { customer_id, score });
        Ok(score)
    }

    /// Latest score for the customer as seen by writers (queued or applied)
    pub fn projected_score(&self, customer_id: CustomerId) -> Option<Decimal> {
        let pending = self.pending.lock();
        match pending.projected.get(&customer_id) {
            Some(&score) => Some(score),
            None => self.skiplist.read().score_of(customer_id),
        }
    }

    pub fn pending_len(&self) -> usize {
        self.pending.lock().queue.len()
    }

    /// Apply every mutation queued at the start of this call, in FIFO order,
    /// under exclusive access. Mutations enqueued meanwhile wait for the
    /// next cycle.
    pub fn drain(&self) -> DrainReport {
        let mut pending = self.pending.lock();
        if pending.queue.is_empty() {
            return DrainReport::default();
        }

        let mut skiplist = self.skiplist.write();
        let batch = std::mem::take(&mut pending.queue);
        pending.projected.clear();
        drop(pending);

        let applied = batch.len();
        let stats = skiplist.apply_all(batch.into_iter().map(|m| (m.customer_id, m.score)));
        let size = skiplist.len();
        drop(skiplist);

        debug!(
            applied,
            inserted = stats.inserted,
            updated = stats.updated,
            size,
            "drained update batch"
        );

        DrainReport { applied, stats }
    }

    /// Recompute every rank under exclusive access.
    ///
    /// Restores dense ranks after a drain was interrupted between relinking
    /// and its rank walk.
    pub fn refresh_ranks(&self) {
        self.skiplist.write().recompute_ranks();
    }

    #[cfg(test)]
    pub(crate) fn skiplist(&self) -> &Arc<RwLock<RankedSkipList>> {
        &self.skiplist
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batcher() -> (Arc<RwLock<RankedSkipList>>, UpdateBatcher) {
        let skiplist = Arc::new(RwLock::new(RankedSkipList::with_params(16, 0.5, Some(3))));
        let batcher = UpdateBatcher::new(skiplist.clone());
        (skiplist, batcher)
    }

    #[test]
    fn test_enqueue_is_invisible_until_drain() {
        let (skiplist, batcher) = batcher();
        batcher.enqueue(1, Decimal::from(10));

        assert_eq!(batcher.pending_len(), 1);
        assert!(skiplist.read().is_empty());

        let report = batcher.drain();
        assert_eq!(report.applied, 1);
        assert_eq!(report.stats.inserted, 1);
        assert_eq!(batcher.pending_len(), 0);
        assert_eq!(skiplist.read().score_of(1), Some(Decimal::from(10)));
    }

    #[test]
    fn test_later_mutation_wins() {
        let (skiplist, batcher) = batcher();
        batcher.enqueue(1, Decimal::from(10));
        batcher.enqueue(1, Decimal::from(30));
        batcher.enqueue(1, Decimal::from(20));
        batcher.drain();

        let list = skiplist.read();
        assert_eq!(list.score_of(1), Some(Decimal::from(20)));
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_drain_empty_queue_is_noop() {
        let (skiplist, batcher) = batcher();
        batcher.enqueue(5, Decimal::from(1));
        batcher.drain();
        let before = skiplist.read().range_by_rank(1, 10);

        assert_eq!(batcher.drain(), DrainReport::default());
        assert_eq!(batcher.drain(), DrainReport::default());
        assert_eq!(skiplist.read().range_by_rank(1, 10), before);
    }

    #[test]
    fn test_enqueue_with_sees_queued_score() {
        let (_skiplist, batcher) = batcher();
        let add = |delta: i64| move |current: Decimal| Ok::<_, ()>(current + Decimal::from(delta));

        assert_eq!(batcher.enqueue_with(1, add(10)), Ok(Decimal::from(10)));
        assert_eq!(batcher.enqueue_with(1, add(10)), Ok(Decimal::from(20)));
        batcher.drain();
        assert_eq!(batcher.enqueue_with(1, add(-5)), Ok(Decimal::from(15)));
        assert_eq!(batcher.projected_score(1), Some(Decimal::from(15)));
    }

    #[test]
    fn test_failed_compute_enqueues_nothing() {
        let (_skiplist, batcher) = batcher();
        let result = batcher.enqueue_with(1, |_| Err::<Decimal, _>("rejected"));
        assert_eq!(result, Err("rejected"));
        assert_eq!(batcher.pending_len(), 0);
        assert_eq!(batcher.projected_score(1), None);
    }

    #[test]
    fn test_concurrent_increments_are_not_lost() {
        let (skiplist, batcher) = batcher();
        let batcher = Arc::new(batcher);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let batcher = batcher.clone();
                std::thread::spawn(move || {
                    for i in 0..100 {
                        batcher
                            .enqueue_with(1, |current| Ok::<_, ()>(current + Decimal::ONE))
                            .unwrap();
                        if i % 25 == 0 {
                            batcher.drain();
                        }
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        batcher.drain();

        assert_eq!(skiplist.read().score_of(1), Some(Decimal::from(800)));
    }
}
