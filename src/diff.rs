use serde::{Deserialize, Serialize};

/// Outcome of comparing a candidate record against the current version.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeKind {
    NoChange,
    Create,
    Update,
}

/// Field-level comparator implemented per entity type.
///
/// Implementations expose only business-meaningful fields — never identity,
/// version, or recorded metadata. Values are reported as `Option<String>`;
/// the detector treats `None` and the empty string as equal, so entity types
/// do not each re-implement null/empty normalization.
pub trait BusinessFields {
    fn business_fields(&self) -> Vec<(&'static str, Option<String>)>;
}

/// Decides whether a candidate record warrants a new version.
pub struct DiffDetector;

impl DiffDetector {
    /// Compare `candidate` against the current authoritative version.
    ///
    /// No current version means the entity is new (`Create`). An unchanged
    /// candidate is `NoChange` so re-ingesting the same feed is idempotent.
    pub fn detect<T: BusinessFields>(candidate: &T, current: Option<&T>) -> ChangeKind {
        match current {
            None => ChangeKind::Create,
            Some(current) => {
                if Self::changed_fields(candidate, current).is_empty() {
                    ChangeKind::NoChange
                } else {
                    ChangeKind::Update
                }
            }
        }
    }

    /// Names of the business fields that differ between two records.
    pub fn changed_fields<T: BusinessFields>(a: &T, b: &T) -> Vec<&'static str> {
        let left = a.business_fields();
        let right = b.business_fields();
        debug_assert_eq!(
            left.iter().map(|(n, _)| n).collect::<Vec<_>>(),
            right.iter().map(|(n, _)| n).collect::<Vec<_>>(),
            "business_fields must be stable per entity type"
        );

        left.into_iter()
            .zip(right)
            .filter(|((_, a), (_, b))| normalize(a) != normalize(b))
            .map(|((name, _), _)| name)
            .collect()
    }
}

fn normalize(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}
