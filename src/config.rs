use std::ffi::OsString;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{DispatchError, Result};
use crate::scheduler::Record;

/// Program name plus fixed leading arguments, shared read-only by all workers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTemplate {
    tokens: Vec<String>,
}

impl CommandTemplate {
    pub fn new<I, S>(tokens: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tokens: Vec<String> = tokens.into_iter().map(Into::into).collect();
        if tokens.is_empty() {
            return Err(DispatchError::EmptyCommand);
        }
        Ok(Self { tokens })
    }

    pub fn program(&self) -> &str {
        &self.tokens[0]
    }

    pub fn args(&self) -> &[String] {
        &self.tokens[1..]
    }

    /// Full argument vector for one invocation: the template with the record
    /// appended as the final argument, byte for byte.
    pub fn argv_for(&self, record: &Record) -> Vec<OsString> {
        let mut argv = Vec::with_capacity(self.tokens.len() + 1);
        argv.extend(self.tokens.iter().map(OsString::from));
        argv.push(record.to_os_string());
        argv
    }
}

impl std::fmt::Display for CommandTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.tokens.join(" "))
    }
}

/// Number of logical CPUs, falling back to one when it cannot be determined.
pub fn default_jobs() -> NonZeroUsize {
    std::thread::available_parallelism().unwrap_or(NonZeroUsize::MIN)
}

/// Settings for one dispatch run.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Worker count; also the work queue capacity
    pub jobs: NonZeroUsize,
    /// Per-invocation wall-clock bound. `None` means unbounded.
    pub timeout: Option<Duration>,
    pub command: CommandTemplate,
}

impl DispatchConfig {
    pub fn new(command: CommandTemplate) -> Self {
        Self {
            jobs: default_jobs(),
            timeout: None,
            command,
        }
    }

    pub fn with_jobs(mut self, jobs: NonZeroUsize) -> Self {
        self.jobs = jobs;
        self
    }

    /// A zero duration disables the bound.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = if timeout.is_zero() { None } else { Some(timeout) };
        self
    }

    pub fn with_timeout_secs(self, secs: u64) -> Self {
        self.with_timeout(Duration::from_secs(secs))
    }
}

/// Logging setup for the binary.
#[derive(Debug, Clone, Default)]
pub struct LogConfig {
    /// Emit diagnostics to stderr
    pub debug: bool,
    /// Also write a full TRACE-level event log to this file
    pub trace_file: Option<PathBuf>,
}
