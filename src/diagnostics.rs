//! Diagnostic events emitted by the producer, workers and output writer.
//!
//! Components receive an `Arc<dyn Diagnostics>` instead of logging through
//! global state, so the binary can route events to `tracing` while tests can
//! record or discard them.
//!
//! - [`TracingDiagnostics`]: structured `tracing` events (used by the binary)
//! - [`NoopDiagnostics`]: discards everything
//!
//! Every method has an empty default body; implementors override only the
//! events they care about.

use std::ffi::OsString;
use std::time::Duration;

use crate::config::DispatchConfig;
use crate::error::InvocationError;
use crate::scheduler::Record;
use crate::worker::WorkerReport;

pub trait Diagnostics: Send + Sync {
    fn dispatch_started(&self, _config: &DispatchConfig) {}

    fn record_read(&self, _record: &Record) {}

    /// The line at `seq` is not valid UTF-8. It is still passed on unchanged.
    fn invalid_utf8(&self, _seq: u64) {}

    fn input_finished(&self, _records: u64) {}

    fn input_failed(&self, _records: u64, _error: &std::io::Error) {}

    fn worker_received(&self, _worker_id: usize, _record: &Record) {}

    fn invocation_started(
        &self,
        _worker_id: usize,
        _argv: &[OsString],
        _timeout: Option<Duration>,
    ) {
    }

    fn invocation_succeeded(
        &self,
        _worker_id: usize,
        _record: &Record,
        _bytes: usize,
        _elapsed: Duration,
    ) {
    }

    fn invocation_failed(&self, _worker_id: usize, _record: &Record, _error: &InvocationError) {}

    fn output_failed(&self, _error: &std::io::Error) {}

    /// The worker quit before the queue was drained because output failed.
    fn worker_stopped(&self, _worker_id: usize) {}

    fn worker_finished(&self, _report: &WorkerReport) {}
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopDiagnostics;

impl Diagnostics for NoopDiagnostics {}

/// Forwards events to the `tracing` subscriber installed by the binary.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn dispatch_started(&self, config: &DispatchConfig) {
        tracing::info!(
            jobs = config.jobs.get(),
            timeout = ?config.timeout,
            command = %config.command,
            "Starting dispatch"
        );
    }

    fn record_read(&self, record: &Record) {
        tracing::trace!(seq = record.seq(), record = %record, "Record read");
    }

    fn invalid_utf8(&self, seq: u64) {
        tracing::debug!(seq, "Input line is not valid UTF-8, passing raw bytes");
    }

    fn input_finished(&self, records: u64) {
        tracing::debug!(records, "Input exhausted, closing work queue");
    }

    fn input_failed(&self, records: u64, error: &std::io::Error) {
        tracing::error!(records, error = %error, "Input read failed, no further records");
    }

    fn worker_received(&self, worker_id: usize, record: &Record) {
        tracing::debug!(worker_id, seq = record.seq(), "Worker received work");
    }

    fn invocation_started(&self, worker_id: usize, argv: &[OsString], timeout: Option<Duration>) {
        match timeout {
            Some(timeout) => {
                tracing::debug!(worker_id, ?argv, ?timeout, "Executing with timeout")
            }
            None => tracing::debug!(worker_id, ?argv, "Executing"),
        }
    }

    fn invocation_succeeded(
        &self,
        worker_id: usize,
        record: &Record,
        bytes: usize,
        elapsed: Duration,
    ) {
        tracing::debug!(
            worker_id,
            seq = record.seq(),
            bytes,
            elapsed_ms = millis(elapsed),
            "Invocation completed"
        );
    }

    fn invocation_failed(&self, worker_id: usize, record: &Record, error: &InvocationError) {
        tracing::warn!(
            worker_id,
            seq = record.seq(),
            record = %record,
            kind = %error.kind(),
            error = %error,
            "Invocation failed"
        );
    }

    fn output_failed(&self, error: &std::io::Error) {
        tracing::error!(error = %error, "Output write failed, stopping dispatch");
    }

    fn worker_stopped(&self, worker_id: usize) {
        tracing::debug!(worker_id, "Output closed, worker stopping");
    }

    fn worker_finished(&self, report: &WorkerReport) {
        tracing::debug!(
            worker_id = report.worker_id,
            processed = report.processed,
            failed = report.failed,
            "Worker done"
        );
    }
}

/// Whole milliseconds, saturating at `u64::MAX`.
fn millis(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}
