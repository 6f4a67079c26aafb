use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::engine::BitemporalEngine;
use crate::outbox::{OutboxRecord, OutboxStatus, OutboxStore};
use crate::temporal::Bitemporal;

use super::error::StoreError;
use super::version_store::{VersionStore, VersionWrite};

struct MemoryState<T> {
    streams: HashMap<String, Vec<T>>,
    outbox: Vec<OutboxRecord>,
}

/// In-memory store holding version streams and outbox rows under one lock.
///
/// Holding both under the same `RwLock` is what makes `commit` a single
/// durability scope: the version write and the events describing it land
/// together or not at all. Clones share storage, so a background worker can
/// hold its own handle.
pub struct MemoryStore<T> {
    state: Arc<RwLock<MemoryState<T>>>,
}

impl<T> Clone for MemoryStore<T> {
    fn clone(&self) -> Self {
        MemoryStore {
            state: Arc::clone(&self.state),
        }
    }
}

impl<T> Default for MemoryStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> MemoryStore<T> {
    pub fn new() -> Self {
        MemoryStore {
            state: Arc::new(RwLock::new(MemoryState {
                streams: HashMap::new(),
                outbox: Vec::new(),
            })),
        }
    }
}

impl<T: Bitemporal> MemoryStore<T> {
    fn latest_in(stream: &[T]) -> u32 {
        stream.iter().map(|v| v.stamp().version).max().unwrap_or(0)
    }

    /// Highest open version in the stream, if any row is still open.
    fn open_in(stream: &[T]) -> Option<u32> {
        stream
            .iter()
            .filter(|v| v.stamp().is_open())
            .map(|v| v.stamp().version)
            .max()
    }
}

impl<T: Bitemporal> VersionStore<T> for MemoryStore<T> {
    fn get_all_versions(&self, business_key: &str) -> Result<Vec<T>, StoreError> {
        let state = self
            .state
            .read()
            .map_err(|_| StoreError::LockPoisoned("read versions"))?;
        let mut versions = state
            .streams
            .get(business_key)
            .cloned()
            .unwrap_or_default();
        versions.sort_by_key(|v| v.stamp().version);
        Ok(versions)
    }

    fn find<F>(&self, predicate: F) -> Result<Vec<T>, StoreError>
    where
        F: Fn(&T) -> bool,
    {
        let state = self
            .state
            .read()
            .map_err(|_| StoreError::LockPoisoned("find"))?;
        Ok(state
            .streams
            .values()
            .flatten()
            .filter(|v| predicate(v))
            .cloned()
            .collect())
    }

    fn business_keys(&self) -> Result<Vec<String>, StoreError> {
        let state = self
            .state
            .read()
            .map_err(|_| StoreError::LockPoisoned("keys"))?;
        let mut keys: Vec<String> = state.streams.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }

    fn commit(&self, write: VersionWrite<T>, events: Vec<OutboxRecord>) -> Result<T, StoreError> {
        let mut state = self
            .state
            .write()
            .map_err(|_| StoreError::LockPoisoned("commit"))?;

        let persisted = match write {
            VersionWrite::Create(version) => {
                let key = version.business_key().to_string();
                let stream = state.streams.entry(key.clone()).or_default();
                if let Some(actual) = Self::open_in(stream) {
                    return Err(StoreError::ConcurrentWrite {
                        business_key: key,
                        expected: 0,
                        actual,
                    });
                }
                // Version 1 on an empty stream, or latest + 1 when reviving
                // a retired key whose rows are all closed.
                let actual = Self::latest_in(stream);
                if version.stamp().version != actual + 1 {
                    return Err(StoreError::ConcurrentWrite {
                        business_key: key,
                        expected: version.stamp().version,
                        actual,
                    });
                }
                stream.push(version.clone());
                version
            }
            VersionWrite::Supersede {
                expected_version,
                close_on,
                successor,
            } => {
                let key = successor.business_key().to_string();
                let stream = state
                    .streams
                    .get_mut(&key)
                    .ok_or_else(|| StoreError::NoCurrentVersion(key.clone()))?;
                let actual =
                    Self::open_in(stream).ok_or_else(|| StoreError::NoCurrentVersion(key.clone()))?;
                if actual != expected_version {
                    return Err(StoreError::ConcurrentWrite {
                        business_key: key,
                        expected: expected_version,
                        actual,
                    });
                }
                // Close every open row: a correction shares the open interval
                // of the row it fixes and must end with it.
                for open in stream.iter_mut().filter(|v| v.stamp().is_open()) {
                    BitemporalEngine::end_validity(open.stamp_mut(), close_on);
                }
                stream.push(successor.clone());
                successor
            }
            VersionWrite::Close {
                business_key,
                expected_version,
                close_on,
            } => {
                let stream = state
                    .streams
                    .get_mut(&business_key)
                    .ok_or_else(|| StoreError::NoCurrentVersion(business_key.clone()))?;
                let actual = Self::open_in(stream)
                    .ok_or_else(|| StoreError::NoCurrentVersion(business_key.clone()))?;
                if actual != expected_version {
                    return Err(StoreError::ConcurrentWrite {
                        business_key,
                        expected: expected_version,
                        actual,
                    });
                }
                for open in stream.iter_mut().filter(|v| v.stamp().is_open()) {
                    BitemporalEngine::end_validity(open.stamp_mut(), close_on);
                }
                stream
                    .iter()
                    .find(|v| v.stamp().version == actual)
                    .cloned()
                    .ok_or(StoreError::NoCurrentVersion(business_key))?
            }
            VersionWrite::Correct(correction) => {
                let key = correction.business_key().to_string();
                let stream = state
                    .streams
                    .get_mut(&key)
                    .ok_or_else(|| StoreError::NoCurrentVersion(key.clone()))?;
                let actual = Self::latest_in(stream);
                if correction.stamp().version != actual + 1 {
                    return Err(StoreError::ConcurrentWrite {
                        business_key: key,
                        expected: correction.stamp().version,
                        actual,
                    });
                }
                stream.push(correction.clone());
                correction
            }
        };

        state.outbox.extend(events);
        Ok(persisted)
    }
}

impl<T: Bitemporal> OutboxStore for MemoryStore<T> {
    fn enqueue(&self, record: OutboxRecord) -> Result<(), StoreError> {
        let mut state = self
            .state
            .write()
            .map_err(|_| StoreError::LockPoisoned("enqueue"))?;
        state.outbox.push(record);
        Ok(())
    }

    fn claim_batch(
        &self,
        worker_id: &str,
        limit: usize,
        lease: Duration,
        now: DateTime<Utc>,
    ) -> Result<Vec<OutboxRecord>, StoreError> {
        let mut state = self
            .state
            .write()
            .map_err(|_| StoreError::LockPoisoned("claim"))?;

        let mut pending: Vec<&mut OutboxRecord> = state
            .outbox
            .iter_mut()
            .filter(|r| r.is_pending())
            .collect();
        pending.sort_by_key(|r| r.created_at);

        let leased_until = now + chrono::Duration::seconds(lease.as_secs() as i64);
        let mut claimed = Vec::new();
        for record in pending.into_iter().take(limit) {
            record.status = OutboxStatus::Processing;
            record.claimed_by = Some(worker_id.to_string());
            record.leased_until = Some(leased_until);
            claimed.push(record.clone());
        }
        Ok(claimed)
    }

    fn mark_processed(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), StoreError> {
        self.with_event(id, "processed", |record| {
            record.status = OutboxStatus::Processed;
            record.processed_at = Some(at);
            record.claimed_by = None;
            record.leased_until = None;
        })
    }

    fn release(&self, id: Uuid, error: &str) -> Result<(), StoreError> {
        self.with_event(id, "release", |record| {
            record.status = OutboxStatus::Pending;
            record.retry_count += 1;
            record.error_message = Some(error.to_string());
            record.claimed_by = None;
            record.leased_until = None;
        })
    }

    fn fail(&self, id: Uuid, error: &str) -> Result<(), StoreError> {
        self.with_event(id, "fail", |record| {
            record.status = OutboxStatus::Failed;
            record.retry_count += 1;
            record.error_message = Some(error.to_string());
            record.claimed_by = None;
            record.leased_until = None;
        })
    }

    fn requeue_stale(&self, now: DateTime<Utc>) -> Result<usize, StoreError> {
        let mut state = self
            .state
            .write()
            .map_err(|_| StoreError::LockPoisoned("requeue"))?;
        let mut recovered = 0;
        for record in state.outbox.iter_mut() {
            if record.lease_expired(now) {
                // A crashed worker is not a delivery failure; retry_count
                // stays untouched.
                record.status = OutboxStatus::Pending;
                record.claimed_by = None;
                record.leased_until = None;
                recovered += 1;
            }
        }
        Ok(recovered)
    }

    fn get_event(&self, id: Uuid) -> Result<Option<OutboxRecord>, StoreError> {
        let state = self
            .state
            .read()
            .map_err(|_| StoreError::LockPoisoned("get event"))?;
        Ok(state.outbox.iter().find(|r| r.id == id).cloned())
    }

    fn events_with_status(&self, status: OutboxStatus) -> Result<Vec<OutboxRecord>, StoreError> {
        let state = self
            .state
            .read()
            .map_err(|_| StoreError::LockPoisoned("list events"))?;
        Ok(state
            .outbox
            .iter()
            .filter(|r| r.status == status)
            .cloned()
            .collect())
    }
}

impl<T: Bitemporal> MemoryStore<T> {
    fn with_event(
        &self,
        id: Uuid,
        operation: &'static str,
        apply: impl FnOnce(&mut OutboxRecord),
    ) -> Result<(), StoreError> {
        let mut state = self
            .state
            .write()
            .map_err(|_| StoreError::LockPoisoned(operation))?;
        let record = state
            .outbox
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(StoreError::UnknownEvent(id))?;
        apply(record);
        Ok(())
    }
}
