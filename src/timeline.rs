use std::collections::BTreeSet;

use chrono::NaiveDate;

use crate::temporal::Bitemporal;

/// Ordered per-entity version history, indexed for point-in-time queries.
///
/// Versions are sorted by `(valid_from, version)`. Where intervals overlap
/// (corrections share the interval of the row they fix), the highest version
/// number wins.
#[derive(Clone, Debug)]
pub struct Timeline<T> {
    versions: Vec<T>,
}

impl<T: Bitemporal> Timeline<T> {
    pub fn new(mut versions: Vec<T>) -> Self {
        versions.sort_by(|a, b| {
            (a.stamp().valid_from, a.stamp().version)
                .cmp(&(b.stamp().valid_from, b.stamp().version))
        });
        Timeline { versions }
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    /// All versions in `(valid_from, version)` order.
    pub fn versions(&self) -> &[T] {
        &self.versions
    }

    /// The authoritative version on `date`: the highest-version row whose
    /// validity interval contains it.
    pub fn version_on(&self, date: NaiveDate) -> Option<&T> {
        self.versions
            .iter()
            .filter(|v| v.stamp().is_valid_on(date))
            .max_by_key(|v| v.stamp().version)
    }

    /// Versions whose validity interval overlaps the closed range `[start, end]`.
    pub fn versions_between(&self, start: NaiveDate, end: NaiveDate) -> Vec<&T> {
        self.versions
            .iter()
            .filter(|v| v.stamp().overlaps(start, end))
            .collect()
    }

    /// Sorted distinct set of every validity boundary (`valid_from` and
    /// `valid_to`) in the history. Drives audit views and change
    /// visualization.
    pub fn change_points(&self) -> Vec<NaiveDate> {
        let mut points = BTreeSet::new();
        for v in &self.versions {
            points.insert(v.stamp().valid_from);
            if let Some(end) = v.stamp().valid_to {
                points.insert(end);
            }
        }
        points.into_iter().collect()
    }
}
