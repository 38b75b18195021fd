use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::Instrument;

use crate::diagnostics::Diagnostics;
use crate::error::{DispatchError, Result};
use crate::output::OutputSink;
use crate::scheduler::WorkQueue;
use crate::worker::invocation::InvocationRunner;

/// Completion signal one worker sends when the queue is closed and drained.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerReport {
    pub worker_id: usize,
    /// Records taken off the queue
    pub processed: u64,
    pub succeeded: u64,
    pub failed: u64,
}

impl WorkerReport {
    pub fn new(worker_id: usize) -> Self {
        Self {
            worker_id,
            ..Default::default()
        }
    }
}

/// Fixed number of workers sharing one work queue.
pub struct WorkerPool {
    jobs: usize,
    invoker: InvocationRunner,
    diagnostics: Arc<dyn Diagnostics>,
}

impl WorkerPool {
    pub fn new(jobs: usize, invoker: InvocationRunner, diagnostics: Arc<dyn Diagnostics>) -> Self {
        Self {
            jobs: jobs.max(1),
            invoker,
            diagnostics,
        }
    }

    pub fn jobs(&self) -> usize {
        self.jobs
    }

    /// Spawn every worker and return the handle that collects their
    /// completion signals.
    ///
    /// Each worker loops on `queue` until it reports closed-and-drained,
    /// processing one record at a time, then sends exactly one
    /// [`WorkerReport`]. A worker also stops early once `sink` is closed by
    /// an output error.
    pub fn spawn(self, queue: WorkQueue, sink: OutputSink) -> Completion {
        let (done_tx, done_rx) = mpsc::channel(self.jobs);

        for worker_id in 0..self.jobs {
            let queue = queue.clone();
            let sink = sink.clone();
            let invoker = self.invoker.clone();
            let diagnostics = self.diagnostics.clone();
            let done_tx = done_tx.clone();
            let span = tracing::debug_span!("worker", worker_id);

            tokio::spawn(
                async move {
                    let report = work(worker_id, queue, invoker, sink, diagnostics.as_ref()).await;
                    diagnostics.worker_finished(&report);
                    // Capacity equals the worker count, so this never waits.
                    let _ = done_tx.send(report).await;
                }
                .instrument(span),
            );
        }

        Completion {
            rx: done_rx,
            expected: self.jobs,
        }
    }
}

async fn work(
    worker_id: usize,
    queue: WorkQueue,
    invoker: InvocationRunner,
    sink: OutputSink,
    diagnostics: &dyn Diagnostics,
) -> WorkerReport {
    let mut report = WorkerReport::new(worker_id);

    loop {
        let next = tokio::select! {
            biased;
            _ = sink.closed() => None,
            record = queue.next() => record,
        };
        let Some(record) = next else {
            break;
        };
        report.processed += 1;
        diagnostics.worker_received(worker_id, &record);

        match invoker.invoke(worker_id, &record).await {
            Ok(output) => {
                report.succeeded += 1;
                if !sink.write(output).await {
                    break;
                }
            }
            // Already reported by the invoker; the record simply has no output.
            Err(_) => report.failed += 1,
        }
    }

    if sink.is_closed() {
        diagnostics.worker_stopped(worker_id);
    }

    report
}

/// Receiving end of the completion signals.
#[derive(Debug)]
pub struct Completion {
    rx: mpsc::Receiver<WorkerReport>,
    expected: usize,
}

impl Completion {
    /// Block until every worker has signalled, returning reports ordered by
    /// worker id.
    ///
    /// If a worker task dies without signalling, the channel closes early and
    /// [`DispatchError::WorkerLost`] is returned instead of waiting forever.
    pub async fn wait(mut self) -> Result<Vec<WorkerReport>> {
        let mut reports = Vec::with_capacity(self.expected);
        while reports.len() < self.expected {
            match self.rx.recv().await {
                Some(report) => reports.push(report),
                None => {
                    return Err(DispatchError::WorkerLost {
                        expected: self.expected,
                        missing: self.expected - reports.len(),
                    })
                }
            }
        }
        reports.sort_by_key(|r| r.worker_id);
        Ok(reports)
    }
}
