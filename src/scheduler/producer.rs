use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::diagnostics::Diagnostics;
use crate::scheduler::queue::{work_queue, WorkQueue};
use crate::scheduler::record::Record;

/// What the producer did before it closed the queue.
#[derive(Debug, Default)]
pub struct ProducerReport {
    /// Records published to the queue
    pub records: u64,
    /// Set when reading stopped on an I/O error rather than end-of-stream
    pub error: Option<std::io::Error>,
}

/// Splits an input stream into [`Record`]s, one per line.
pub struct LineProducer<R> {
    reader: BufReader<R>,
    diagnostics: Arc<dyn Diagnostics>,
}

impl<R> LineProducer<R>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    pub fn new(reader: R, diagnostics: Arc<dyn Diagnostics>) -> Self {
        Self {
            reader: BufReader::new(reader),
            diagnostics,
        }
    }

    /// Start producing on a background task, returning the consumer side of a
    /// queue with room for `capacity` records.
    pub fn spawn(self, capacity: usize) -> (WorkQueue, JoinHandle<ProducerReport>) {
        let (tx, queue) = work_queue(capacity);
        let handle = tokio::spawn(self.run(tx));
        (queue, handle)
    }

    /// Publish every line to `tx`, waiting whenever the queue is full.
    ///
    /// `tx` is dropped on return, which closes the queue. A read error ends
    /// production the same way end-of-stream does, but is kept in the report.
    /// Production also ends when the consumer side of the queue is gone.
    pub async fn run(mut self, tx: mpsc::Sender<Record>) -> ProducerReport {
        let mut report = ProducerReport::default();
        let mut buf = Vec::new();

        loop {
            buf.clear();
            let read = tokio::select! {
                read = self.reader.read_until(b'\n', &mut buf) => read,
                // Stop waiting on a quiet input once every worker has quit.
                _ = tx.closed() => break,
            };
            match read {
                Ok(0) => {
                    self.diagnostics.input_finished(report.records);
                    break;
                }
                Ok(_) => {
                    let seq = report.records + 1;
                    let line = trim_terminator(&buf);
                    if std::str::from_utf8(line).is_err() {
                        self.diagnostics.invalid_utf8(seq);
                    }
                    let record = Record::new(seq, line);
                    self.diagnostics.record_read(&record);
                    if tx.send(record).await.is_err() {
                        // Every worker is gone; nobody is left to consume.
                        break;
                    }
                    report.records = seq;
                }
                Err(e) => {
                    self.diagnostics.input_failed(report.records, &e);
                    report.error = Some(e);
                    break;
                }
            }
        }

        report
    }

}

/// Strip a trailing `\n` or `\r\n`.
fn trim_terminator(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}
