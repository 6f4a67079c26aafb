//! Concrete reference-data entity types.
//!
//! Every type embeds a [`BitemporalStamp`](crate::BitemporalStamp) by
//! composition and implements [`Bitemporal`], [`BusinessFields`] (the diff
//! comparator's view of its fields), and [`RefEntity`] (naming for outbox
//! topics and envelopes).

mod carrier;
mod country;
mod mapping;
mod port;

pub use carrier::Carrier;
pub use country::Country;
pub use mapping::{CodeMapping, MappingType};
pub use port::Port;

use serde::Serialize;

use crate::diff::BusinessFields;
use crate::temporal::Bitemporal;

/// A reference-data aggregate: versionable, diffable, publishable.
pub trait RefEntity: Bitemporal + BusinessFields + Serialize {
    /// Plural kebab-case aggregate name; the outbox topic is
    /// `reference-data.{AGGREGATE_TYPE}`.
    const AGGREGATE_TYPE: &'static str;

    /// The natural business key derived from the record's own fields.
    fn natural_key(&self) -> String;
}
