use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Shared bitemporal metadata embedded by composition in every versioned
/// reference-data entity.
///
/// Two timelines are tracked independently:
/// - *valid time*: the half-open interval `[valid_from, valid_to)` during
///   which this version is the authoritative real-world truth
///   (`valid_to = None` means still valid), and
/// - *recorded time*: `recorded_at`, when the version was written.
///
/// Rows are append-only. A row is never mutated after being written, except
/// to set `valid_to` when a successor closes it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BitemporalStamp {
    /// Unique per version row, not per logical entity.
    pub identity: Uuid,
    /// Stable natural key shared across all versions of one logical entity.
    pub business_key: String,
    /// Starts at 1, monotonically increasing per business key.
    pub version: u32,
    pub valid_from: NaiveDate,
    pub valid_to: Option<NaiveDate>,
    pub recorded_at: DateTime<Utc>,
    pub recorded_by: String,
    /// Correlates a batch of versions to one originating change.
    pub change_request_id: Option<String>,
    /// True when this version retroactively fixes a past interval without
    /// representing a new real-world change.
    pub is_correction: bool,
}

impl BitemporalStamp {
    /// Stamp for the first version of a new logical entity.
    pub fn first(
        business_key: impl Into<String>,
        valid_from: NaiveDate,
        recorded_by: impl Into<String>,
        change_request_id: Option<String>,
    ) -> Self {
        BitemporalStamp {
            identity: Uuid::new_v4(),
            business_key: business_key.into(),
            version: 1,
            valid_from,
            valid_to: None,
            recorded_at: Utc::now(),
            recorded_by: recorded_by.into(),
            change_request_id,
            is_correction: false,
        }
    }

    /// Placeholder stamp for a freshly ingested candidate record that has not
    /// been versioned yet. `version` 0 marks it as never persisted; the
    /// ingest path replaces the whole stamp before any write.
    pub fn draft(business_key: impl Into<String>) -> Self {
        BitemporalStamp {
            identity: Uuid::new_v4(),
            business_key: business_key.into(),
            version: 0,
            valid_from: NaiveDate::default(),
            valid_to: None,
            recorded_at: Utc::now(),
            recorded_by: String::new(),
            change_request_id: None,
            is_correction: false,
        }
    }

    /// Whether `date` falls inside the half-open interval `[valid_from, valid_to)`.
    pub fn is_valid_on(&self, date: NaiveDate) -> bool {
        if date < self.valid_from {
            return false;
        }
        match self.valid_to {
            Some(end) => date < end,
            None => true,
        }
    }

    /// Whether the interval is still open (`valid_to` unset).
    pub fn is_open(&self) -> bool {
        self.valid_to.is_none()
    }

    /// Whether this version overlaps the closed date range `[start, end]`.
    pub fn overlaps(&self, start: NaiveDate, end: NaiveDate) -> bool {
        if end < self.valid_from {
            return false;
        }
        match self.valid_to {
            // Half-open interval: a version ending on `start` does not cover it.
            Some(close) => start < close,
            None => true,
        }
    }
}

/// Implemented by every concrete reference-data entity type.
///
/// The `Clone` bound is the version-cloning contract: the engine copies all
/// business fields by cloning the whole entity and then replaces the embedded
/// stamp, so no per-field copy code (and no runtime type inspection) is ever
/// needed.
pub trait Bitemporal: Clone {
    fn stamp(&self) -> &BitemporalStamp;
    fn stamp_mut(&mut self) -> &mut BitemporalStamp;

    fn business_key(&self) -> &str {
        &self.stamp().business_key
    }

    fn version(&self) -> u32 {
        self.stamp().version
    }
}
