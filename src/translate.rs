use std::collections::{BTreeSet, HashMap};
use std::fmt;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::FailureCode;
use crate::model::CodeMapping;
use crate::store::{StoreError, VersionStore};
use crate::temporal::Bitemporal;

/// One translation lookup.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationRequest {
    pub from_system: String,
    pub from_code: String,
    pub to_system: String,
    pub as_of: Option<NaiveDate>,
}

impl TranslationRequest {
    pub fn new(
        from_system: impl Into<String>,
        from_code: impl Into<String>,
        to_system: impl Into<String>,
    ) -> Self {
        TranslationRequest {
            from_system: from_system.into(),
            from_code: from_code.into(),
            to_system: to_system.into(),
            as_of: None,
        }
    }

    pub fn as_of(mut self, date: NaiveDate) -> Self {
        self.as_of = Some(date);
        self
    }

    fn validate(&self) -> Result<(), String> {
        if self.from_system.is_empty() || self.from_code.is_empty() || self.to_system.is_empty() {
            return Err("from_system, from_code and to_system are required".to_string());
        }
        Ok(())
    }
}

/// An error that aborts a fail-fast batch.
#[derive(Debug)]
pub enum TranslateError {
    Store(StoreError),
    /// A request failed structural validation.
    Validation {
        request: TranslationRequest,
        message: String,
    },
}

impl fmt::Display for TranslateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TranslateError::Store(err) => write!(f, "store error: {}", err),
            TranslateError::Validation { request, message } => write!(
                f,
                "invalid request {}:{} into {}: {}",
                request.from_system, request.from_code, request.to_system, message
            ),
        }
    }
}

impl std::error::Error for TranslateError {}

impl From<StoreError> for TranslateError {
    fn from(err: StoreError) -> Self {
        TranslateError::Store(err)
    }
}

/// A resolved request in a batch.
#[derive(Clone, Debug)]
pub struct TranslationMatch {
    pub request: TranslationRequest,
    pub mapping: CodeMapping,
}

/// A failed request in a batch, with its machine-readable code.
#[derive(Clone, Debug)]
pub struct TranslationFailure {
    pub request: TranslationRequest,
    pub code: FailureCode,
    pub message: String,
}

/// Result of a batch translation: both lists, never all-or-nothing.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub successes: Vec<TranslationMatch>,
    pub failures: Vec<TranslationFailure>,
}

/// Deprecation verdict for a resolved mapping, with non-deprecated
/// alternatives for the same source triple.
#[derive(Clone, Debug)]
pub struct DeprecationReport {
    pub mapping: CodeMapping,
    pub is_deprecated: bool,
    pub deprecation_reason: Option<String>,
    pub alternative_codes: Vec<String>,
}

/// Pure query surface answering "what does code X in system A mean in
/// system B as of date D".
///
/// Reads the version store only; results are safe to cache keyed by
/// `(from_system, from_code, to_system, as_of)`. A missing mapping is an
/// empty result, never an error.
pub struct TranslationResolver<S> {
    store: S,
}

impl<S: VersionStore<CodeMapping>> TranslationResolver<S> {
    pub fn new(store: S) -> Self {
        TranslationResolver { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Resolve a single code, valid now or on `as_of`. With several matching
    /// mappings the highest confidence wins; ties break to the most recent
    /// `valid_from`, then the highest version.
    pub fn translate(
        &self,
        from_system: &str,
        from_code: &str,
        to_system: &str,
        as_of: Option<NaiveDate>,
    ) -> Result<Option<CodeMapping>, StoreError> {
        let date = as_of.unwrap_or_else(|| Utc::now().date_naive());
        let rows = self.store.find(|m| {
            m.matches_source(from_system, from_code, to_system) && m.stamp().is_valid_on(date)
        })?;

        Ok(effective_rows(rows).into_iter().max_by(|a, b| {
            (a.confidence, a.stamp().valid_from, a.stamp().version)
                .cmp(&(b.confidence, b.stamp().valid_from, b.stamp().version))
        }))
    }

    /// Resolve each request independently. With `fail_fast`, the first
    /// validation or store error aborts the whole batch; a `NO_MAPPING` miss
    /// is a soft failure and is captured per item either way.
    pub fn translate_batch(
        &self,
        requests: &[TranslationRequest],
        fail_fast: bool,
    ) -> Result<BatchOutcome, TranslateError> {
        let mut outcome = BatchOutcome::default();

        for request in requests {
            if let Err(message) = request.validate() {
                if fail_fast {
                    return Err(TranslateError::Validation {
                        request: request.clone(),
                        message,
                    });
                }
                outcome.failures.push(TranslationFailure {
                    request: request.clone(),
                    code: FailureCode::ValidationFailed,
                    message,
                });
                continue;
            }

            let resolved = self.translate(
                &request.from_system,
                &request.from_code,
                &request.to_system,
                request.as_of,
            );
            match resolved {
                Ok(Some(mapping)) => outcome.successes.push(TranslationMatch {
                    request: request.clone(),
                    mapping,
                }),
                Ok(None) => outcome.failures.push(TranslationFailure {
                    request: request.clone(),
                    code: FailureCode::NoMapping,
                    message: format!(
                        "no mapping for {}:{} into {}",
                        request.from_system, request.from_code, request.to_system
                    ),
                }),
                Err(err) => {
                    if fail_fast {
                        return Err(err.into());
                    }
                    outcome.failures.push(TranslationFailure {
                        request: request.clone(),
                        code: FailureCode::Internal,
                        message: err.to_string(),
                    });
                }
            }
        }

        Ok(outcome)
    }

    /// All current mappings targeting `to_code` in `to_system`, optionally
    /// constrained to one source system. Sorted by confidence, highest first.
    pub fn reverse_translate(
        &self,
        to_system: &str,
        to_code: &str,
        from_system: Option<&str>,
    ) -> Result<Vec<CodeMapping>, StoreError> {
        let today = Utc::now().date_naive();
        let rows = self.store.find(|m| {
            m.to_system == to_system
                && m.to_code == to_code
                && from_system.map_or(true, |fs| m.from_system == fs)
                && m.stamp().is_valid_on(today)
        })?;

        let mut current = effective_rows(rows);
        current.sort_by(|a, b| b.confidence.cmp(&a.confidence));
        Ok(current)
    }

    /// Resolve a mapping and, if it is deprecated, list non-deprecated
    /// target codes for the same `(from_system, from_code, to_system)`.
    pub fn check_deprecation(
        &self,
        from_system: &str,
        from_code: &str,
        to_system: &str,
    ) -> Result<Option<DeprecationReport>, StoreError> {
        let Some(mapping) = self.translate(from_system, from_code, to_system, None)? else {
            return Ok(None);
        };

        let alternative_codes = if mapping.is_deprecated {
            let today = Utc::now().date_naive();
            let rows = self.store.find(|m| {
                m.matches_source(from_system, from_code, to_system)
                    && !m.is_deprecated
                    && m.stamp().is_valid_on(today)
            })?;
            let mut codes: Vec<String> = effective_rows(rows)
                .into_iter()
                .filter(|m| m.to_code != mapping.to_code)
                .map(|m| m.to_code)
                .collect();
            codes.sort();
            codes.dedup();
            codes
        } else {
            Vec::new()
        };

        Ok(Some(DeprecationReport {
            is_deprecated: mapping.is_deprecated,
            deprecation_reason: mapping.deprecation_reason.clone(),
            alternative_codes,
            mapping,
        }))
    }

    /// Every coding system referenced by a currently valid mapping, sorted.
    pub fn list_code_systems(&self) -> Result<Vec<String>, StoreError> {
        let today = Utc::now().date_naive();
        let rows = self
            .store
            .find(|m| m.stamp().is_valid_on(today))?;

        let mut systems = BTreeSet::new();
        for mapping in effective_rows(rows) {
            systems.insert(mapping.from_system);
            systems.insert(mapping.to_system);
        }
        Ok(systems.into_iter().collect())
    }
}

/// Collapse rows to one effective row per business key: the highest version
/// wins, so a correction shadows the row it fixes.
fn effective_rows(rows: Vec<CodeMapping>) -> Vec<CodeMapping> {
    let mut by_key: HashMap<String, CodeMapping> = HashMap::new();
    for row in rows {
        match by_key.get(row.business_key()) {
            Some(existing) if existing.stamp().version >= row.stamp().version => {}
            _ => {
                by_key.insert(row.business_key().to_string(), row);
            }
        }
    }
    by_key.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RefEntity;
    use crate::store::{MemoryStore, VersionWrite};
    use crate::temporal::BitemporalStamp;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn seed(store: &MemoryStore<CodeMapping>, mapping: CodeMapping, from: NaiveDate) {
        let mut mapping = mapping;
        let key = mapping.natural_key();
        *mapping.stamp_mut() = BitemporalStamp::first(key, from, "seed", None);
        store.commit(VersionWrite::Create(mapping), vec![]).unwrap();
    }

    #[test]
    fn confidence_tie_break() {
        let store = MemoryStore::new();
        seed(
            &store,
            CodeMapping::record("ISO3166-1", "USA", "CBP-COUNTRY5", "US").with_confidence(80),
            d(2020, 1, 1),
        );
        seed(
            &store,
            CodeMapping::record("ISO3166-1", "USA", "CBP-COUNTRY5", "USX").with_confidence(100),
            d(2020, 1, 1),
        );

        let resolver = TranslationResolver::new(store);
        let hit = resolver
            .translate("ISO3166-1", "USA", "CBP-COUNTRY5", None)
            .unwrap()
            .unwrap();
        assert_eq!(hit.to_code, "USX");
        assert_eq!(hit.confidence, 100);
    }

    #[test]
    fn equal_confidence_prefers_recent_valid_from() {
        let store = MemoryStore::new();
        seed(
            &store,
            CodeMapping::record("A", "1", "B", "old").with_confidence(90),
            d(2019, 1, 1),
        );
        seed(
            &store,
            CodeMapping::record("A", "1", "B", "new").with_confidence(90),
            d(2023, 1, 1),
        );

        let resolver = TranslationResolver::new(store);
        let hit = resolver.translate("A", "1", "B", None).unwrap().unwrap();
        assert_eq!(hit.to_code, "new");
    }

    #[test]
    fn as_of_respects_validity() {
        let store = MemoryStore::new();
        seed(
            &store,
            CodeMapping::record("A", "1", "B", "2"),
            d(2022, 1, 1),
        );

        let resolver = TranslationResolver::new(store);
        assert!(resolver
            .translate("A", "1", "B", Some(d(2021, 6, 1)))
            .unwrap()
            .is_none());
        assert!(resolver
            .translate("A", "1", "B", Some(d(2022, 6, 1)))
            .unwrap()
            .is_some());
    }

    #[test]
    fn miss_is_empty_not_error() {
        let resolver = TranslationResolver::new(MemoryStore::<CodeMapping>::new());
        assert_eq!(resolver.translate("A", "1", "B", None).unwrap(), None);
    }
}
