use std::fmt;

use chrono::{NaiveDate, Utc};
use tracing::{debug, info};

use crate::diff::{ChangeKind, DiffDetector};
use crate::engine::BitemporalEngine;
use crate::error::FailureCode;
use crate::model::RefEntity;
use crate::outbox::OutboxRecord;
use crate::store::{StoreError, VersionStore, VersionWrite};
use crate::temporal::Bitemporal;

pub const EVENT_CREATED: &str = "VersionCreated";
pub const EVENT_SUPERSEDED: &str = "VersionSuperseded";
pub const EVENT_CORRECTED: &str = "VersionCorrected";
pub const EVENT_RETIRED: &str = "VersionRetired";

#[derive(Debug)]
pub enum IngestError {
    Store(StoreError),
    /// Optimistic retries exhausted for one business key.
    Conflict {
        business_key: String,
        attempts: u32,
    },
    /// The candidate failed structural validation (empty business key).
    Validation(String),
    /// The event envelope could not be serialized.
    Serialize(String),
    /// A correction targeted a key with no versions.
    UnknownKey(String),
}

impl fmt::Display for IngestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IngestError::Store(err) => write!(f, "store error: {}", err),
            IngestError::Conflict {
                business_key,
                attempts,
            } => write!(
                f,
                "write conflict on {} after {} attempts",
                business_key, attempts
            ),
            IngestError::Validation(message) => write!(f, "validation failed: {}", message),
            IngestError::Serialize(message) => write!(f, "event serialization failed: {}", message),
            IngestError::UnknownKey(key) => write!(f, "no versions recorded for {}", key),
        }
    }
}

impl std::error::Error for IngestError {}

impl From<StoreError> for IngestError {
    fn from(err: StoreError) -> Self {
        IngestError::Store(err)
    }
}

impl From<serde_json::Error> for IngestError {
    fn from(err: serde_json::Error) -> Self {
        IngestError::Serialize(err.to_string())
    }
}

/// Outcome of applying one candidate record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IngestOutcome {
    pub business_key: String,
    pub kind: ChangeKind,
    /// Version now authoritative for the key.
    pub version: u32,
}

/// One failed record in a batch pass.
#[derive(Clone, Debug)]
pub struct IngestFailure {
    pub business_key: String,
    pub code: FailureCode,
    pub message: String,
}

/// Result of a batch ingest pass: both lists, never all-or-nothing.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub successes: Vec<IngestOutcome>,
    pub failures: Vec<IngestFailure>,
}

/// Applies candidate records from an external feed: diff against the current
/// version, then create / supersede / skip, enqueueing the matching domain
/// event in the same commit. Write races are retried with a fresh read up to
/// a bounded attempt count.
pub struct Ingestor<S> {
    store: S,
    recorded_by: String,
    max_attempts: u32,
}

impl<S> Ingestor<S> {
    pub fn new(store: S, recorded_by: impl Into<String>) -> Self {
        Ingestor {
            store,
            recorded_by: recorded_by.into(),
            max_attempts: 3,
        }
    }

    /// Set the bound on optimistic-conflict retries per record.
    pub fn with_max_attempts(mut self, max: u32) -> Self {
        self.max_attempts = max.max(1);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

impl<S> Ingestor<S> {
    /// Apply one candidate effective today.
    pub fn apply<T>(
        &self,
        candidate: &T,
        change_request_id: Option<&str>,
    ) -> Result<IngestOutcome, IngestError>
    where
        T: RefEntity,
        S: VersionStore<T>,
    {
        self.apply_on(candidate, change_request_id, Utc::now().date_naive())
    }

    /// Apply one candidate with an explicit effective date.
    pub fn apply_on<T>(
        &self,
        candidate: &T,
        change_request_id: Option<&str>,
        today: NaiveDate,
    ) -> Result<IngestOutcome, IngestError>
    where
        T: RefEntity,
        S: VersionStore<T>,
    {
        let key = candidate.natural_key();
        if key.is_empty() {
            return Err(IngestError::Validation("empty business key".to_string()));
        }

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.try_apply(candidate, &key, change_request_id, today) {
                Err(IngestError::Store(StoreError::ConcurrentWrite { .. }))
                    if attempt < self.max_attempts =>
                {
                    debug!(business_key = %key, attempt, "write conflict, retrying with fresh read");
                }
                Err(IngestError::Store(StoreError::ConcurrentWrite { .. })) => {
                    return Err(IngestError::Conflict {
                        business_key: key,
                        attempts: attempt,
                    });
                }
                other => return other,
            }
        }
    }

    fn try_apply<T>(
        &self,
        candidate: &T,
        key: &str,
        change_request_id: Option<&str>,
        today: NaiveDate,
    ) -> Result<IngestOutcome, IngestError>
    where
        T: RefEntity,
        S: VersionStore<T>,
    {
        let current = self.store.get_current_on(key, today)?;
        let change_request_id = change_request_id.map(str::to_string);

        match DiffDetector::detect(candidate, current.as_ref()) {
            ChangeKind::NoChange => {
                let version = current.map(|c| c.stamp().version).unwrap_or(0);
                Ok(IngestOutcome {
                    business_key: key.to_string(),
                    kind: ChangeKind::NoChange,
                    version,
                })
            }
            ChangeKind::Create => {
                // A key with closed history but no current version is a
                // retired entity reappearing in the feed: reopen it at the
                // next version number instead of starting over at 1.
                let history = self.store.get_all_versions(key)?;
                let fresh = match BitemporalEngine::latest_version(&history) {
                    Some(latest) => {
                        let mut lineage = candidate.clone();
                        *lineage.stamp_mut() = latest.stamp().clone();
                        BitemporalEngine::new_version(
                            &lineage,
                            today,
                            &self.recorded_by,
                            change_request_id,
                        )
                    }
                    None => BitemporalEngine::first_version(
                        candidate.clone(),
                        key,
                        today,
                        &self.recorded_by,
                        change_request_id,
                    ),
                };
                let event = OutboxRecord::domain_event(&fresh, EVENT_CREATED)?;
                let persisted = self.store.commit(VersionWrite::Create(fresh), vec![event])?;
                info!(business_key = %key, version = persisted.stamp().version, "created version");
                Ok(IngestOutcome {
                    business_key: key.to_string(),
                    kind: ChangeKind::Create,
                    version: persisted.stamp().version,
                })
            }
            ChangeKind::Update => {
                // Detect guarantees current is present on the Update path.
                let current = current.ok_or_else(|| {
                    IngestError::Store(StoreError::NoCurrentVersion(key.to_string()))
                })?;

                // Successor carries the candidate's business fields with the
                // current version's lineage.
                let mut lineage = candidate.clone();
                *lineage.stamp_mut() = current.stamp().clone();
                let successor = BitemporalEngine::new_version(
                    &lineage,
                    today,
                    &self.recorded_by,
                    change_request_id,
                );

                let changed = DiffDetector::changed_fields(candidate, &current);
                let event = OutboxRecord::domain_event(&successor, EVENT_SUPERSEDED)?;
                let persisted = self.store.commit(
                    VersionWrite::Supersede {
                        expected_version: current.stamp().version,
                        close_on: today,
                        successor,
                    },
                    vec![event],
                )?;
                info!(business_key = %key, fields = ?changed, version = persisted.stamp().version, "superseded version");
                Ok(IngestOutcome {
                    business_key: key.to_string(),
                    kind: ChangeKind::Update,
                    version: persisted.stamp().version,
                })
            }
        }
    }

    /// Record a retroactive correction of the latest version: `fix` mutates
    /// the cloned fields, the validity interval stays verbatim.
    pub fn correct<T, F>(
        &self,
        business_key: &str,
        change_request_id: Option<&str>,
        fix: F,
    ) -> Result<T, IngestError>
    where
        T: RefEntity,
        S: VersionStore<T>,
        F: Fn(&mut T),
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let versions = self.store.get_all_versions(business_key)?;
            let latest = BitemporalEngine::latest_version(&versions)
                .ok_or_else(|| IngestError::UnknownKey(business_key.to_string()))?;

            let mut correction = BitemporalEngine::new_correction(
                latest,
                &self.recorded_by,
                change_request_id.map(str::to_string),
            );
            fix(&mut correction);

            let event = OutboxRecord::domain_event(&correction, EVENT_CORRECTED)?;
            match self
                .store
                .commit(VersionWrite::Correct(correction), vec![event])
            {
                Ok(persisted) => {
                    info!(business_key, version = persisted.stamp().version, "recorded correction");
                    return Ok(persisted);
                }
                Err(StoreError::ConcurrentWrite { .. }) if attempt < self.max_attempts => continue,
                Err(StoreError::ConcurrentWrite { .. }) => {
                    return Err(IngestError::Conflict {
                        business_key: business_key.to_string(),
                        attempts: attempt,
                    });
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// Retire an entity: close its current version on `close_on` without a
    /// successor, leaving the key with zero open rows. A later candidate for
    /// the same key reopens it at the next version number.
    pub fn retire<T>(
        &self,
        business_key: &str,
        change_request_id: Option<&str>,
        close_on: NaiveDate,
    ) -> Result<T, IngestError>
    where
        T: RefEntity,
        S: VersionStore<T>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let current = self
                .store
                .get_current_on(business_key, close_on)?
                .filter(|c| c.stamp().is_open())
                .ok_or_else(|| IngestError::UnknownKey(business_key.to_string()))?;

            // The event carries the row as it will look once closed.
            let mut closed = current.clone();
            BitemporalEngine::end_validity(closed.stamp_mut(), close_on);
            closed.stamp_mut().change_request_id = change_request_id.map(str::to_string);
            let event = OutboxRecord::domain_event(&closed, EVENT_RETIRED)?;

            match self.store.commit(
                VersionWrite::Close {
                    business_key: business_key.to_string(),
                    expected_version: current.stamp().version,
                    close_on,
                },
                vec![event],
            ) {
                Ok(persisted) => {
                    info!(business_key, version = persisted.stamp().version, "retired entity");
                    return Ok(persisted);
                }
                Err(StoreError::ConcurrentWrite { .. }) if attempt < self.max_attempts => continue,
                Err(StoreError::ConcurrentWrite { .. }) => {
                    return Err(IngestError::Conflict {
                        business_key: business_key.to_string(),
                        attempts: attempt,
                    });
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// Apply a batch of candidates. Per-record failures are collected with
    /// machine-readable codes; with `fail_fast` the first unexpected error
    /// aborts and propagates instead.
    pub fn apply_batch<T>(
        &self,
        candidates: &[T],
        change_request_id: Option<&str>,
        today: NaiveDate,
        fail_fast: bool,
    ) -> Result<BatchReport, IngestError>
    where
        T: RefEntity,
        S: VersionStore<T>,
    {
        let mut report = BatchReport::default();

        for candidate in candidates {
            let key = candidate.natural_key();
            match self.apply_on(candidate, change_request_id, today) {
                Ok(outcome) => report.successes.push(outcome),
                Err(err) => {
                    if fail_fast {
                        return Err(err);
                    }
                    let code = match &err {
                        IngestError::Validation(_) => FailureCode::ValidationFailed,
                        IngestError::Conflict { .. } => FailureCode::Conflict,
                        _ => FailureCode::Internal,
                    };
                    report.failures.push(IngestFailure {
                        business_key: key,
                        code,
                        message: err.to_string(),
                    });
                }
            }
        }

        Ok(report)
    }
}
