//! Periodic background actors: batch drain and cache eviction

use super::batcher::{DrainReport, UpdateBatcher};
use super::service::RangeCache;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Drains the update queue on a fixed period until cancelled.
///
/// On cancellation one final drain applies whatever is still queued.
pub struct DrainTask {
    batcher: Arc<UpdateBatcher>,
    period: Duration,
}

impl DrainTask {
    pub fn new(batcher: Arc<UpdateBatcher>, period: Duration) -> Self {
        DrainTask { batcher, period }
    }

    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(cancel))
    }

    pub async fn run(self, cancel: CancellationToken) {
        let mut tick = interval(self.period);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut cycles: u64 = 0;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tick.tick() => {
                    self.drain_once();
                    cycles += 1;
                }
            }
        }

        let last = self.drain_once();
        info!(
            cycles,
            final_batch = last.map(|r| r.applied).unwrap_or(0),
            "drain task stopped"
        );
    }

    fn drain_once(&self) -> Option<DrainReport> {
        self.contain(|| self.batcher.drain())
    }

    /// Run one cycle. A panic is logged and swallowed so the next tick
    /// retries; locks are released during unwinding and ranks are rebuilt,
    /// since the batch may have stopped before its rank walk.
    fn contain<F>(&self, cycle: F) -> Option<DrainReport>
    where
        F: FnOnce() -> DrainReport,
    {
        match catch_unwind(AssertUnwindSafe(cycle)) {
            Ok(report) => Some(report),
            Err(_) => {
                error!("drain cycle panicked, batch dropped; retrying on next tick");
                if catch_unwind(AssertUnwindSafe(|| self.batcher.refresh_ranks())).is_err() {
                    error!("rank refresh after failed drain panicked");
                }
                None
            }
        }
    }
}

/// Evicts expired rank-range results on a fixed period, like a TTL manager.
pub struct CacheJanitor {
    cache: Arc<RangeCache>,
    period: Duration,
}

impl CacheJanitor {
    pub fn new(cache: Arc<RangeCache>, period: Duration) -> Self {
        CacheJanitor { cache, period }
    }

    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(cancel))
    }

    pub async fn run(self, cancel: CancellationToken) {
        let mut tick = interval(self.period);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tick.tick() => {
                    let evicted = self.cache.evict_expired();
                    debug!(evicted, "cache janitor checked for expired results");
                }
            }
        }
    }
}
