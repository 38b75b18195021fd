//! Consumer side of the pipeline: the worker pool and process execution.
//!
//! - **Pool**: a fixed number of tasks pulling records off the shared queue
//! - **Invocation**: the command template plus one record, optionally bounded
//! - **Execution**: the process primitive that spawns, captures and kills
//!
//! # Components
//!
//! - [`WorkerPool`]: spawns the workers and hands back a [`Completion`]
//! - [`InvocationRunner`]: builds the argument vector and reports outcomes
//! - [`ProcessRunner`]: narrow seam over process execution
//! - [`CommandExecutor`]: the `tokio::process` implementation
//!
//! # Execution Flow
//!
//! 1. A worker waits on [`WorkQueue::next`](crate::scheduler::WorkQueue::next)
//! 2. [`InvocationRunner::invoke`] appends the record to the template
//! 3. [`CommandExecutor`] runs it, killing it if the deadline passes
//! 4. Output goes to the [`OutputSink`](crate::output::OutputSink); failures
//!    go to diagnostics only
//! 5. On closed-and-drained the worker sends its [`WorkerReport`]

pub mod executor;
pub mod invocation;
pub mod pool;

pub use executor::{CommandExecutor, ProcessRunner};
pub use invocation::InvocationRunner;
pub use pool::{Completion, WorkerPool, WorkerReport};
