use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};

use crate::config::DispatchConfig;
use crate::diagnostics::{Diagnostics, TracingDiagnostics};
use crate::error::{DispatchError, Result};
use crate::output::{OutputReport, OutputWriter};
use crate::scheduler::LineProducer;
use crate::worker::{CommandExecutor, InvocationRunner, ProcessRunner, WorkerPool, WorkerReport};

/// Outcome of one dispatch run.
#[derive(Debug)]
pub struct DispatchSummary {
    /// Records read from the input
    pub records: u64,
    pub succeeded: u64,
    pub failed: u64,
    /// One report per worker, ordered by worker id
    pub workers: Vec<WorkerReport>,
    pub output: OutputReport,
    /// Set when input reading stopped on an I/O error
    pub input_error: Option<std::io::Error>,
}

impl DispatchSummary {
    /// True when the input was read to its end and all output was written.
    /// Individual invocation failures do not count.
    pub fn is_clean(&self) -> bool {
        self.input_error.is_none() && self.output.error.is_none()
    }

    /// Turn a surfaced input or output error into a [`DispatchError`].
    pub fn into_result(mut self) -> Result<Self> {
        if let Some(e) = self.input_error.take() {
            return Err(DispatchError::Input(e));
        }
        if let Some(e) = self.output.error.take() {
            return Err(DispatchError::Output(e));
        }
        Ok(self)
    }
}

/// Wires producer, work queue, worker pool and output writer together.
pub struct Dispatcher {
    config: DispatchConfig,
    runner: Arc<dyn ProcessRunner>,
    diagnostics: Arc<dyn Diagnostics>,
}

impl Dispatcher {
    pub fn new(config: DispatchConfig) -> Self {
        Self {
            config,
            runner: Arc::new(CommandExecutor::new()),
            diagnostics: Arc::new(TracingDiagnostics),
        }
    }

    /// Replace the process primitive.
    pub fn with_runner(mut self, runner: Arc<dyn ProcessRunner>) -> Self {
        self.runner = runner;
        self
    }

    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn Diagnostics>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Run every line of `input` through the worker pool, writing successful
    /// output to `output`.
    ///
    /// Returns once all `jobs` workers have signalled completion and the
    /// output has been flushed.
    ///
    /// # Errors
    ///
    /// Only [`DispatchError::WorkerLost`] and [`DispatchError::Join`] are
    /// returned here. Input and output errors are carried in the summary;
    /// see [`DispatchSummary::into_result`].
    pub async fn run<R, W>(self, input: R, output: W) -> Result<DispatchSummary>
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let Self {
            config,
            runner,
            diagnostics,
        } = self;
        let jobs = config.jobs.get();
        diagnostics.dispatch_started(&config);

        let (queue, producer) = LineProducer::new(input, diagnostics.clone()).spawn(jobs);
        let (sink, writer) = OutputWriter::new(output, diagnostics.clone()).spawn(jobs);

        let invoker = InvocationRunner::new(
            Arc::new(config.command),
            config.timeout,
            runner,
            diagnostics.clone(),
        );
        let completion = WorkerPool::new(jobs, invoker, diagnostics).spawn(queue, sink);

        let workers = completion.wait().await?;
        let input = producer.await?;
        let output = writer.await?;

        Ok(DispatchSummary {
            records: input.records,
            succeeded: workers.iter().map(|w| w.succeeded).sum(),
            failed: workers.iter().map(|w| w.failed).sum(),
            workers,
            output,
            input_error: input.error,
        })
    }
}
