//! Background thread that periodically drains the outbox.

use std::sync::mpsc::{channel, Sender, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::debug;

use super::store::OutboxStore;
use super::transport::Transport;
use super::worker::OutboxWorker;

/// Default interval between drain passes.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Cumulative statistics from a worker thread's lifetime.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WorkerStats {
    pub polls: usize,
    pub recovered: usize,
    pub delivered: usize,
    pub released: usize,
    pub failed: usize,
}

/// Owns a background thread running [`OutboxWorker::drain`] on a fixed
/// interval.
///
/// The store handle must be `Clone + Send`; for [`MemoryStore`](crate::MemoryStore)
/// cloning shares the underlying storage. Dropping the handle signals the
/// thread to stop without joining; call [`stop`](Self::stop) to join and
/// collect stats.
pub struct OutboxWorkerThread {
    stop_tx: Sender<()>,
    handle: Option<JoinHandle<WorkerStats>>,
}

impl OutboxWorkerThread {
    /// Spawn a drain loop with the default 5-second poll interval.
    pub fn spawn<S, T>(worker: OutboxWorker<T>, store: S) -> Self
    where
        S: OutboxStore + Send + 'static,
        T: Transport + Send + 'static,
    {
        Self::spawn_with_interval(worker, store, DEFAULT_POLL_INTERVAL)
    }

    /// Spawn a drain loop polling at `poll_interval`.
    pub fn spawn_with_interval<S, T>(
        mut worker: OutboxWorker<T>,
        store: S,
        poll_interval: Duration,
    ) -> Self
    where
        S: OutboxStore + Send + 'static,
        T: Transport + Send + 'static,
    {
        let (stop_tx, stop_rx) = channel();

        let handle = thread::spawn(move || {
            let mut stats = WorkerStats::default();

            loop {
                match stop_rx.try_recv() {
                    Ok(()) | Err(TryRecvError::Disconnected) => break,
                    Err(TryRecvError::Empty) => {}
                }

                stats.polls += 1;
                match worker.drain(&store) {
                    Ok(result) => {
                        stats.recovered += result.recovered;
                        stats.delivered += result.delivered;
                        stats.released += result.released;
                        stats.failed += result.failed;
                    }
                    Err(err) => {
                        // Store trouble is not fatal to the loop; the next
                        // poll retries.
                        debug!(error = %err, "outbox drain pass failed");
                    }
                }

                // Bounded sleep so a stop signal is honored promptly.
                match stop_rx.recv_timeout(poll_interval) {
                    Ok(()) | Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => break,
                    Err(std::sync::mpsc::RecvTimeoutError::Timeout) => {}
                }
            }

            stats
        });

        OutboxWorkerThread {
            stop_tx,
            handle: Some(handle),
        }
    }

    /// Signal the thread to stop, join it, and return its statistics.
    pub fn stop(mut self) -> WorkerStats {
        let _ = self.stop_tx.send(());
        if let Some(handle) = self.handle.take() {
            handle.join().unwrap_or_default()
        } else {
            WorkerStats::default()
        }
    }

    /// Signal the thread to stop without waiting for it.
    pub fn signal_stop(&self) {
        let _ = self.stop_tx.send(());
    }
}

impl Drop for OutboxWorkerThread {
    fn drop(&mut self) {
        let _ = self.stop_tx.send(());
        // No join on drop; the thread winds down on its own.
    }
}
