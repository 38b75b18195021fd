use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::CommandTemplate;
use crate::diagnostics::Diagnostics;
use crate::error::InvocationError;
use crate::scheduler::Record;
use crate::worker::executor::ProcessRunner;

/// Executes the command template once per record.
///
/// Cheap to clone; every worker holds its own copy sharing the same template,
/// process runner and diagnostics sink.
#[derive(Clone)]
pub struct InvocationRunner {
    command: Arc<CommandTemplate>,
    timeout: Option<Duration>,
    runner: Arc<dyn ProcessRunner>,
    diagnostics: Arc<dyn Diagnostics>,
}

impl InvocationRunner {
    pub fn new(
        command: Arc<CommandTemplate>,
        timeout: Option<Duration>,
        runner: Arc<dyn ProcessRunner>,
        diagnostics: Arc<dyn Diagnostics>,
    ) -> Self {
        Self {
            command,
            timeout,
            runner,
            diagnostics,
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Run the template with `record` appended as the last argument.
    ///
    /// Failures are reported to the diagnostics sink and returned, never
    /// escalated.
    pub async fn invoke(
        &self,
        worker_id: usize,
        record: &Record,
    ) -> Result<Vec<u8>, InvocationError> {
        let argv = self.command.argv_for(record);
        self.diagnostics
            .invocation_started(worker_id, &argv, self.timeout);

        let started = Instant::now();
        let result = self.runner.run(&argv, self.timeout).await;

        match &result {
            Ok(output) => self.diagnostics.invocation_succeeded(
                worker_id,
                record,
                output.len(),
                started.elapsed(),
            ),
            Err(e) => self.diagnostics.invocation_failed(worker_id, record, e),
        }

        result
    }
}
