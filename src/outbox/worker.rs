use std::time::Duration;

use chrono::Utc;
use tracing::{debug, warn};

use crate::store::StoreError;

use super::store::OutboxStore;
use super::transport::Transport;

/// Counters from one or more drain passes.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DrainResult {
    /// Stale `Processing` rows requeued by the recovery sweep.
    pub recovered: usize,
    pub claimed: usize,
    pub delivered: usize,
    pub released: usize,
    pub failed: usize,
}

impl DrainResult {
    fn absorb(&mut self, other: DrainResult) {
        self.recovered += other.recovered;
        self.claimed += other.claimed;
        self.delivered += other.delivered;
        self.released += other.released;
        self.failed += other.failed;
    }
}

/// Drains pending outbox events to a transport.
///
/// Each drain pass first requeues orphaned `Processing` rows whose lease
/// expired (crash recovery), then claims pending events oldest-first and
/// attempts delivery. A delivery failure bumps `retry_count`; past the
/// ceiling the event goes to `Failed` and stops retrying.
pub struct OutboxWorker<T> {
    transport: T,
    worker_id: String,
    batch_size: usize,
    lease: Duration,
    max_retries: u32,
}

impl<T> OutboxWorker<T> {
    pub fn new(transport: T) -> Self {
        OutboxWorker {
            transport,
            worker_id: format!("worker-{}", std::process::id()),
            batch_size: 100,
            lease: Duration::from_secs(60),
            max_retries: 3,
        }
    }

    /// Set the worker ID (recorded on claimed rows for lease tracking).
    pub fn with_worker_id(mut self, id: impl Into<String>) -> Self {
        self.worker_id = id.into();
        self
    }

    /// Set the maximum number of events claimed per pass.
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    /// Set the lease duration for claimed rows.
    pub fn with_lease(mut self, lease: Duration) -> Self {
        self.lease = lease;
        self
    }

    /// Set the retry ceiling; an event whose failure count exceeds it is
    /// dead-lettered.
    pub fn with_max_retries(mut self, max: u32) -> Self {
        self.max_retries = max;
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }
}

impl<T: Transport> OutboxWorker<T> {
    /// Run one drain pass against the store.
    pub fn drain<S: OutboxStore>(&mut self, store: &S) -> Result<DrainResult, StoreError> {
        let mut result = DrainResult::default();
        let now = Utc::now();

        result.recovered = store.requeue_stale(now)?;
        if result.recovered > 0 {
            warn!(
                recovered = result.recovered,
                worker = %self.worker_id,
                "requeued stale outbox leases"
            );
        }

        let claimed = store.claim_batch(&self.worker_id, self.batch_size, self.lease, now)?;
        result.claimed = claimed.len();

        for record in claimed {
            match self.transport.send(&record.topic(), &record.payload) {
                Ok(()) => {
                    store.mark_processed(record.id, Utc::now())?;
                    result.delivered += 1;
                    debug!(event = %record.id, topic = %record.topic(), "outbox event delivered");
                }
                Err(err) => {
                    let message = err.to_string();
                    if record.retry_count + 1 > self.max_retries {
                        store.fail(record.id, &message)?;
                        result.failed += 1;
                        warn!(
                            event = %record.id,
                            retries = record.retry_count + 1,
                            error = %message,
                            "outbox event dead-lettered"
                        );
                    } else {
                        store.release(record.id, &message)?;
                        result.released += 1;
                        debug!(event = %record.id, error = %message, "outbox event released for retry");
                    }
                }
            }
        }

        Ok(result)
    }

    /// Drain repeatedly until a pass claims nothing. Released events are
    /// retried on subsequent passes, so with a transport that eventually
    /// succeeds (or a finite retry ceiling) this terminates with no event
    /// left `Pending` or `Processing`.
    pub fn drain_until_idle<S: OutboxStore>(&mut self, store: &S) -> Result<DrainResult, StoreError> {
        let mut total = DrainResult::default();
        loop {
            let pass = self.drain(store)?;
            let progressed = pass.claimed > 0 || pass.recovered > 0;
            total.absorb(pass);
            if !progressed {
                return Ok(total);
            }
        }
    }
}
