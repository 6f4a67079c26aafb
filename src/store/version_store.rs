use chrono::{NaiveDate, Utc};

use crate::outbox::OutboxRecord;
use crate::temporal::Bitemporal;
use crate::timeline::Timeline;

use super::error::StoreError;

/// A single atomic mutation of one version stream.
///
/// `Supersede` is the close-old/open-new pair as one unit: two concurrent
/// updates that both read the same current version cannot both commit,
/// because the expected version is checked inside the store's write lock.
#[derive(Clone, Debug)]
pub enum VersionWrite<T> {
    /// First version of a new logical entity (`version` must be 1).
    Create(T),
    /// Close the open version at `close_on` and append its successor.
    Supersede {
        expected_version: u32,
        close_on: NaiveDate,
        successor: T,
    },
    /// Close the open version at `close_on` with no successor, leaving the
    /// key with zero open rows. A later `Create` for the same key reopens it
    /// at the next version number.
    Close {
        business_key: String,
        expected_version: u32,
        close_on: NaiveDate,
    },
    /// Append a retroactive correction without closing anything. Correcting
    /// an open row leaves a second open row for the key: the interval must
    /// survive verbatim, so the corrected row is NOT closed here. Reads
    /// resolve to the highest version and `Supersede` closes every open row,
    /// which keeps the duplicate interval from ever becoming authoritative.
    Correct(T),
}

/// Append-only storage for all versions of all entities of one type.
///
/// Lookup misses are `Ok(None)` / empty vectors, never errors. `commit`
/// applies the version write and the outbox events it describes in one
/// durability scope: a failed commit leaves neither behind.
pub trait VersionStore<T: Bitemporal> {
    /// All versions for a business key, in version order. Empty if unknown.
    fn get_all_versions(&self, business_key: &str) -> Result<Vec<T>, StoreError>;

    /// All versions (across keys) matching a predicate.
    fn find<F>(&self, predicate: F) -> Result<Vec<T>, StoreError>
    where
        F: Fn(&T) -> bool;

    /// Every known business key.
    fn business_keys(&self) -> Result<Vec<String>, StoreError>;

    /// Apply one version write plus its outbox events atomically, returning
    /// the persisted version.
    fn commit(&self, write: VersionWrite<T>, events: Vec<OutboxRecord>) -> Result<T, StoreError>;

    /// The authoritative version on `as_of`: highest version number among
    /// rows whose validity interval contains the date.
    fn get_current_on(&self, business_key: &str, as_of: NaiveDate) -> Result<Option<T>, StoreError> {
        let versions = self.get_all_versions(business_key)?;
        Ok(versions
            .into_iter()
            .filter(|v| v.stamp().is_valid_on(as_of))
            .max_by_key(|v| v.stamp().version))
    }

    /// The authoritative version today.
    fn get_current(&self, business_key: &str) -> Result<Option<T>, StoreError> {
        self.get_current_on(business_key, Utc::now().date_naive())
    }

    /// The full timeline for a business key.
    fn timeline(&self, business_key: &str) -> Result<Timeline<T>, StoreError> {
        Ok(Timeline::new(self.get_all_versions(business_key)?))
    }
}
