use std::time::Duration;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::store::StoreError;

use super::record::{OutboxRecord, OutboxStatus};

/// Storage-side operations the drain loop needs.
///
/// Claiming marks a row `Processing` with a lease stamped `leased_until`;
/// the transition itself is the mutual-exclusion point, so two workers can
/// never process the same event concurrently. `requeue_stale` is the crash
/// recovery path: `Processing` rows whose lease expired go back to `Pending`
/// without counting a delivery failure.
pub trait OutboxStore {
    /// Record a standalone publish obligation (outside an entity commit).
    fn enqueue(&self, record: OutboxRecord) -> Result<(), StoreError>;

    /// Claim up to `limit` pending events, oldest first, marking each
    /// `Processing` with a lease of `lease` from `now`.
    fn claim_batch(
        &self,
        worker_id: &str,
        limit: usize,
        lease: Duration,
        now: DateTime<Utc>,
    ) -> Result<Vec<OutboxRecord>, StoreError>;

    /// Confirmed delivery: `Processing → Processed`, stamping `processed_at`.
    fn mark_processed(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), StoreError>;

    /// Failed delivery with retries left: `Processing → Pending`, bumping
    /// `retry_count` and recording the error.
    fn release(&self, id: Uuid, error: &str) -> Result<(), StoreError>;

    /// Failed delivery past the retry ceiling: `Processing → Failed`
    /// (terminal, operator-visible), bumping `retry_count`.
    fn fail(&self, id: Uuid, error: &str) -> Result<(), StoreError>;

    /// Requeue `Processing` rows whose lease expired before `now`. Returns
    /// how many were recovered.
    fn requeue_stale(&self, now: DateTime<Utc>) -> Result<usize, StoreError>;

    fn get_event(&self, id: Uuid) -> Result<Option<OutboxRecord>, StoreError>;

    fn events_with_status(&self, status: OutboxStatus) -> Result<Vec<OutboxRecord>, StoreError>;

    fn pending_count(&self) -> Result<usize, StoreError> {
        Ok(self.events_with_status(OutboxStatus::Pending)?.len())
    }
}
