//! Serialized output stream.
//!
//! Workers never touch the output stream directly. Each successful invocation
//! hands its captured bytes to an [`OutputSink`]; a single [`OutputWriter`]
//! task writes them one block at a time, so blocks from different workers may
//! interleave with each other but never within each other.

use std::sync::Arc;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::diagnostics::Diagnostics;

/// Cloneable handle workers use to submit output blocks.
#[derive(Debug, Clone)]
pub struct OutputSink {
    tx: mpsc::Sender<Vec<u8>>,
}

impl OutputSink {
    /// Queue one complete block. Waits while the writer is behind.
    ///
    /// Returns `false` once the writer has stopped accepting blocks after an
    /// output error.
    pub async fn write(&self, block: Vec<u8>) -> bool {
        if block.is_empty() {
            return !self.is_closed();
        }
        self.tx.send(block).await.is_ok()
    }

    /// True after the output stream has failed.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Resolves once the output stream has failed.
    pub async fn closed(&self) {
        self.tx.closed().await
    }
}

/// Totals from the writer task.
#[derive(Debug, Default)]
pub struct OutputReport {
    pub blocks: u64,
    pub bytes: u64,
    /// First write error; later blocks were discarded
    pub error: Option<std::io::Error>,
}

/// Owns the output stream and writes blocks in arrival order.
pub struct OutputWriter<W> {
    writer: W,
    diagnostics: Arc<dyn Diagnostics>,
}

impl<W> OutputWriter<W>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    pub fn new(writer: W, diagnostics: Arc<dyn Diagnostics>) -> Self {
        Self {
            writer,
            diagnostics,
        }
    }

    /// Start the writer task. It finishes after the last [`OutputSink`] clone
    /// is dropped and every queued block has been handled.
    pub fn spawn(self, capacity: usize) -> (OutputSink, JoinHandle<OutputReport>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let handle = tokio::spawn(self.run(rx));
        (OutputSink { tx }, handle)
    }

    async fn run(mut self, mut rx: mpsc::Receiver<Vec<u8>>) -> OutputReport {
        let mut report = OutputReport::default();

        while let Some(block) = rx.recv().await {
            if report.error.is_some() {
                // Blocks queued before the close are dropped.
                continue;
            }
            match self.write_block(&block).await {
                Ok(()) => {
                    report.blocks += 1;
                    report.bytes += block.len() as u64;
                }
                Err(e) => {
                    self.diagnostics.output_failed(&e);
                    report.error = Some(e);
                    // Senders see the close and stop producing work.
                    rx.close();
                }
            }
        }

        if report.error.is_none() {
            if let Err(e) = self.writer.shutdown().await {
                self.diagnostics.output_failed(&e);
                report.error = Some(e);
            }
        }

        report
    }

    async fn write_block(&mut self, block: &[u8]) -> std::io::Result<()> {
        self.writer.write_all(block).await?;
        self.writer.flush().await
    }
}
