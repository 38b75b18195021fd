//! Subscriber setup for the binary.
//!
//! Two independent layers:
//!
//! - stderr, filtered by `RUST_LOG` when set, otherwise `debug` for this crate
//!   with `-d` and silent without it
//! - an optional trace file receiving every event and span close at TRACE
//!   level, regardless of `-d`

use std::fs::File;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::{
    filter::LevelFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

use crate::config::LogConfig;
use crate::error::{DispatchError, Result};

/// Default stderr directive when `RUST_LOG` is unset.
pub fn default_directive(debug: bool) -> &'static str {
    if debug {
        "parallel_lite=debug"
    } else {
        "off"
    }
}

/// Create (or truncate) the trace output file.
pub fn open_trace_file(path: &Path) -> Result<File> {
    File::create(path).map_err(|source| DispatchError::TraceFile {
        path: path.to_path_buf(),
        source,
    })
}

/// Install the global subscriber. Must run before any work starts; a trace
/// file that cannot be created is reported here.
pub fn init(config: &LogConfig) -> Result<()> {
    let stderr_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(config.debug)));
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(stderr_filter);

    let trace_layer = match &config.trace_file {
        Some(path) => {
            let file = open_trace_file(path)?;
            Some(
                fmt::layer()
                    .with_writer(Mutex::new(file))
                    .with_ansi(false)
                    .with_thread_ids(true)
                    .with_span_events(FmtSpan::CLOSE)
                    .with_filter(LevelFilter::TRACE),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(trace_layer)
        .init();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiet_unless_debug() {
        assert_eq!(default_directive(false), "off");
        assert_eq!(default_directive(true), "parallel_lite=debug");
    }

    #[test]
    fn trace_file_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trace.log");
        open_trace_file(&path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn trace_file_in_missing_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("trace.log");
        let err = open_trace_file(&path).unwrap_err();
        match err {
            DispatchError::TraceFile { path: p, .. } => assert_eq!(p, path),
            other => panic!("unexpected error: {other}"),
        }
    }
}
