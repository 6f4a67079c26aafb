//! Bitemporal reference data engine.
//!
//! Maintains authoritative, versioned reference data (country codes, ports,
//! carriers, code crosswalks) that never loses history: every change
//! produces a new dated version, any past state is reconstructible, every
//! committed change is durably queued for publication, and codes translate
//! across coding systems with temporal validity and confidence ranking.

mod diff;
mod engine;
mod error;
mod ingest;
mod model;
mod outbox;
mod store;
mod temporal;
mod timeline;
mod translate;

pub use diff::{BusinessFields, ChangeKind, DiffDetector};
pub use engine::BitemporalEngine;
pub use error::FailureCode;
pub use ingest::{
    BatchReport, IngestError, IngestFailure, IngestOutcome, Ingestor, EVENT_CORRECTED,
    EVENT_CREATED, EVENT_RETIRED, EVENT_SUPERSEDED,
};
pub use model::{Carrier, CodeMapping, Country, MappingType, Port, RefEntity};
#[cfg(feature = "emitter")]
pub use outbox::LocalEmitterTransport;
pub use outbox::{
    DrainResult, EventEnvelope, LogTransport, LogTransportError, OutboxRecord, OutboxStatus,
    OutboxStore, OutboxWorker, OutboxWorkerThread, Transport, WorkerStats, DEFAULT_POLL_INTERVAL,
};
pub use store::{MemoryStore, StoreError, VersionStore, VersionWrite};
pub use temporal::{Bitemporal, BitemporalStamp};
pub use timeline::Timeline;
pub use translate::{
    BatchOutcome, DeprecationReport, TranslateError, TranslationFailure, TranslationMatch,
    TranslationRequest, TranslationResolver,
};

#[cfg(feature = "emitter")]
pub use event_emitter_rs::EventEmitter;
