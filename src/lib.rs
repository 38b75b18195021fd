pub mod config;
pub mod diagnostics;
pub mod dispatcher;
pub mod error;
pub mod logging;
pub mod output;
pub mod scheduler;
pub mod worker;

pub use dispatcher::{DispatchSummary, Dispatcher};
