mod support;

use std::time::Duration;

use chrono::{NaiveDate, Utc};
use refdata::{
    Country, Ingestor, LogTransport, MemoryStore, OutboxRecord, OutboxStatus, OutboxStore,
    OutboxWorker, OutboxWorkerThread,
};
use support::{DeadTransport, FlakyTransport};

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn store_with_event() -> (MemoryStore<Country>, OutboxRecord) {
    let store: MemoryStore<Country> = MemoryStore::new();
    let record = OutboxRecord::new("US", "countries", "VersionCreated", r#"{"code":"US"}"#);
    store.enqueue(record.clone()).unwrap();
    (store, record)
}

#[test]
fn fails_twice_then_succeeds_within_ceiling() {
    let (store, record) = store_with_event();
    let mut worker = OutboxWorker::new(FlakyTransport::failing(2)).with_max_retries(3);

    let total = worker.drain_until_idle(&store).unwrap();
    assert_eq!(total.delivered, 1);
    assert_eq!(total.released, 2);
    assert_eq!(total.failed, 0);

    let finished = store.get_event(record.id).unwrap().unwrap();
    assert_eq!(finished.status, OutboxStatus::Processed);
    assert_eq!(finished.retry_count, 2);
    assert!(finished.processed_at.is_some());
    assert_eq!(worker.transport().delivered_count(), 1);
}

#[test]
fn dead_letters_past_retry_ceiling() {
    let (store, record) = store_with_event();
    let mut worker = OutboxWorker::new(DeadTransport).with_max_retries(3);

    let total = worker.drain_until_idle(&store).unwrap();
    assert_eq!(total.delivered, 0);
    assert_eq!(total.released, 3);
    assert_eq!(total.failed, 1);

    let dead = store.get_event(record.id).unwrap().unwrap();
    assert_eq!(dead.status, OutboxStatus::Failed);
    assert_eq!(dead.retry_count, 4);
    assert_eq!(dead.error_message.as_deref(), Some("broker unreachable"));

    // Terminal: another drain pass never touches it.
    let idle = worker.drain(&store).unwrap();
    assert_eq!(idle.claimed, 0);
}

#[test]
fn stale_lease_is_recovered_and_redelivered() {
    let (store, record) = store_with_event();

    // Simulate a worker that claimed the event and crashed before delivery.
    let crashed_at = Utc::now() - chrono::Duration::seconds(120);
    let claimed = store
        .claim_batch("crashed-worker", 10, Duration::from_secs(60), crashed_at)
        .unwrap();
    assert_eq!(claimed.len(), 1);
    assert_eq!(
        store.get_event(record.id).unwrap().unwrap().status,
        OutboxStatus::Processing
    );

    // A fresh worker's drain pass requeues and delivers it.
    let mut worker = OutboxWorker::new(FlakyTransport::reliable());
    let result = worker.drain(&store).unwrap();
    assert_eq!(result.recovered, 1);
    assert_eq!(result.delivered, 1);
    assert_eq!(
        store.get_event(record.id).unwrap().unwrap().status,
        OutboxStatus::Processed
    );
}

#[test]
fn exactly_once_effective_with_reliable_transport() {
    let store: MemoryStore<Country> = MemoryStore::new();
    let ingestor = Ingestor::new(store.clone(), "loader");
    for (code, name) in [("US", "United States"), ("FR", "France"), ("DE", "Germany")] {
        ingestor
            .apply_on(&Country::record(code, name), None, d(2024, 1, 1))
            .unwrap();
    }
    assert_eq!(store.pending_count().unwrap(), 3);

    let mut worker = OutboxWorker::new(FlakyTransport::reliable());
    worker.drain_until_idle(&store).unwrap();

    assert_eq!(store.pending_count().unwrap(), 0);
    assert_eq!(
        store.events_with_status(OutboxStatus::Processed).unwrap().len(),
        3
    );
    // Every event reached the consumer exactly once.
    assert_eq!(worker.transport().delivered_count(), 3);
    let delivered = worker.transport().delivered.lock().unwrap();
    assert!(delivered
        .iter()
        .all(|(topic, _)| topic == "reference-data.countries"));
}

#[test]
fn per_aggregate_delivery_follows_creation_order() {
    let store: MemoryStore<Country> = MemoryStore::new();
    let ingestor = Ingestor::new(store.clone(), "loader");
    ingestor
        .apply_on(&Country::record("US", "United States"), None, d(2024, 1, 1))
        .unwrap();
    ingestor
        .apply_on(
            &Country::record("US", "United States of America"),
            None,
            d(2024, 2, 1),
        )
        .unwrap();

    let mut worker = OutboxWorker::new(FlakyTransport::reliable());
    worker.drain_until_idle(&store).unwrap();

    let delivered = worker.transport().delivered.lock().unwrap();
    assert_eq!(delivered.len(), 2);
    assert!(delivered[0].1.contains("VersionCreated"));
    assert!(delivered[1].1.contains("VersionSuperseded"));
}

#[test]
fn background_thread_drains_and_stops() {
    let store: MemoryStore<Country> = MemoryStore::new();
    for i in 0..5 {
        store
            .enqueue(OutboxRecord::new(
                format!("K{}", i),
                "countries",
                "VersionCreated",
                "{}",
            ))
            .unwrap();
    }

    let buffer = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
    let worker = OutboxWorker::new(LogTransport::with_buffer(buffer.clone()));
    let thread =
        OutboxWorkerThread::spawn_with_interval(worker, store.clone(), Duration::from_millis(10));

    // Wait for the drain loop to catch up.
    let deadline = std::time::Instant::now() + Duration::from_secs(5);
    while store.pending_count().unwrap() > 0 && std::time::Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(10));
    }

    let stats = thread.stop();
    assert_eq!(stats.delivered, 5);
    assert!(stats.polls >= 1);
    assert_eq!(buffer.lock().unwrap().len(), 5);
}
