use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Why a single invocation produced no output.
///
/// None of these are fatal: the worker that hit one logs it and moves on to
/// its next record.
#[derive(Error, Debug)]
pub enum InvocationError {
    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Command exited with {}{}", exit_label(.code), stderr_suffix(.stderr))]
    Exit { code: Option<i32>, stderr: String },

    #[error("Command timed out after {0:?}")]
    Timeout(Duration),

    #[error("I/O error while collecting output: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse classification of an [`InvocationError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Spawn,
    Exit,
    Timeout,
    Io,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureKind::Spawn => write!(f, "spawn"),
            FailureKind::Exit => write!(f, "exit"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Io => write!(f, "io"),
        }
    }
}

impl InvocationError {
    pub fn kind(&self) -> FailureKind {
        match self {
            InvocationError::Spawn { .. } => FailureKind::Spawn,
            InvocationError::Exit { .. } => FailureKind::Exit,
            InvocationError::Timeout(_) => FailureKind::Timeout,
            InvocationError::Io(_) => FailureKind::Io,
        }
    }
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "termination by signal".to_string(),
    }
}

fn stderr_suffix(stderr: &str) -> String {
    if stderr.is_empty() {
        String::new()
    } else {
        format!(": {}", stderr)
    }
}

/// Errors that stop (or taint) a whole dispatch run.
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("No command given")]
    EmptyCommand,

    #[error("Cannot create trace file {path}: {source}")]
    TraceFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read input: {0}")]
    Input(#[source] std::io::Error),

    #[error("Failed to write output: {0}")]
    Output(#[source] std::io::Error),

    #[error("Worker pool lost {missing} of {expected} workers before they finished")]
    WorkerLost { expected: usize, missing: usize },

    #[error("Task join error: {0}")]
    Join(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, DispatchError>;
