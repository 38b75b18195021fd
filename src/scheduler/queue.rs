use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};

use crate::scheduler::record::Record;

/// Create a bounded work queue with room for `capacity` records.
///
/// The sender half belongs to the producer; dropping it closes the queue.
/// The receiver half is cloned into every worker.
pub fn work_queue(capacity: usize) -> (mpsc::Sender<Record>, WorkQueue) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (tx, WorkQueue::new(rx))
}

/// Shared consumer side of the work queue.
///
/// Workers take turns receiving from a single channel, so each record goes to
/// exactly one worker and records leave the queue in the order they were sent.
#[derive(Debug, Clone)]
pub struct WorkQueue {
    rx: Arc<Mutex<mpsc::Receiver<Record>>>,
}

impl WorkQueue {
    fn new(rx: mpsc::Receiver<Record>) -> Self {
        Self {
            rx: Arc::new(Mutex::new(rx)),
        }
    }

    /// Wait for the next record. Returns `None` once the queue is closed and
    /// drained.
    pub async fn next(&self) -> Option<Record> {
        // The guard lives only for this receive; processing happens unlocked.
        let mut rx = self.rx.lock().await;
        rx.recv().await
    }
}
