use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use crate::temporal::{Bitemporal, BitemporalStamp};

/// Pure version-construction and validity-filtering operations.
///
/// The engine performs no I/O. Anything date-sensitive takes the date
/// explicitly so callers (and tests) control the clock; the ingest path
/// passes `Utc::now().date_naive()`.
pub struct BitemporalEngine;

impl BitemporalEngine {
    /// Build the first version of a new logical entity from a bare record.
    ///
    /// The record's existing stamp is discarded and replaced with a fresh
    /// version-1 stamp valid from `effective`.
    pub fn first_version<T: Bitemporal>(
        mut record: T,
        business_key: impl Into<String>,
        effective: NaiveDate,
        recorded_by: &str,
        change_request_id: Option<String>,
    ) -> T {
        *record.stamp_mut() =
            BitemporalStamp::first(business_key, effective, recorded_by, change_request_id);
        record
    }

    /// Build the successor of `current`: all business fields copied, version
    /// bumped, valid from `effective` with an open end.
    ///
    /// The caller is responsible for closing `current` at `effective` and
    /// persisting both rows as one atomic unit.
    pub fn new_version<T: Bitemporal>(
        current: &T,
        effective: NaiveDate,
        recorded_by: &str,
        change_request_id: Option<String>,
    ) -> T {
        let mut next = current.clone();
        let stamp = next.stamp_mut();
        stamp.identity = Uuid::new_v4();
        stamp.version += 1;
        stamp.valid_from = effective;
        stamp.valid_to = None;
        stamp.recorded_at = Utc::now();
        stamp.recorded_by = recorded_by.to_string();
        stamp.change_request_id = change_request_id;
        stamp.is_correction = false;
        next
    }

    /// Build a correction of `current`: a retroactive fix that keeps the
    /// corrected row's validity interval verbatim and does not imply a
    /// real-world change on any date.
    pub fn new_correction<T: Bitemporal>(
        current: &T,
        recorded_by: &str,
        change_request_id: Option<String>,
    ) -> T {
        let mut correction = current.clone();
        let stamp = correction.stamp_mut();
        stamp.identity = Uuid::new_v4();
        stamp.version += 1;
        stamp.recorded_at = Utc::now();
        stamp.recorded_by = recorded_by.to_string();
        stamp.change_request_id = change_request_id;
        stamp.is_correction = true;
        correction
    }

    /// Close a version's validity at `end`. Only tightens: an interval that
    /// already ends on or before `end` is left untouched.
    pub fn end_validity(stamp: &mut BitemporalStamp, end: NaiveDate) {
        match stamp.valid_to {
            Some(existing) if existing <= end => {}
            _ => stamp.valid_to = Some(end),
        }
    }

    /// Versions whose validity interval contains `today`.
    pub fn current_versions<T: Bitemporal>(all: &[T], today: NaiveDate) -> Vec<&T> {
        Self::versions_as_of(all, today)
    }

    /// Point-in-time query: versions valid on `as_of`.
    pub fn versions_as_of<T: Bitemporal>(all: &[T], as_of: NaiveDate) -> Vec<&T> {
        all.iter().filter(|v| v.stamp().is_valid_on(as_of)).collect()
    }

    /// The version with the highest version number, if any.
    pub fn latest_version<T: Bitemporal>(versions: &[T]) -> Option<&T> {
        versions.iter().max_by_key(|v| v.stamp().version)
    }
}
