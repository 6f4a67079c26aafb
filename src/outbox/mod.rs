//! Transactional outbox: durable publish obligations recorded with the data
//! change they describe, drained asynchronously with retry, dead-lettering,
//! and crash recovery.

mod record;
mod store;
mod thread;
mod transport;
mod worker;

pub use record::{EventEnvelope, OutboxRecord, OutboxStatus};
pub use store::OutboxStore;
pub use thread::{OutboxWorkerThread, WorkerStats, DEFAULT_POLL_INTERVAL};
#[cfg(feature = "emitter")]
pub use transport::LocalEmitterTransport;
pub use transport::{LogTransport, LogTransportError, Transport};
pub use worker::{DrainResult, OutboxWorker};
