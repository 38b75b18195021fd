use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use parallel_lite::config::{default_jobs, CommandTemplate, DispatchConfig, LogConfig};
use parallel_lite::error::Result;
use parallel_lite::{logging, Dispatcher};

/// Run a command once per line of standard input, several at a time.
///
/// Each input line is appended as the final argument to COMMAND. Output of
/// every successful invocation is written to stdout as one block; failures
/// produce no output and are only logged.
#[derive(Parser, Debug)]
#[command(name = "parallel-lite")]
#[command(version)]
struct Args {
    /// Run N jobs in parallel [default: number of logical CPUs]
    #[arg(short = 'j', long = "jobs", value_name = "N")]
    jobs: Option<NonZeroUsize>,

    /// Maximum execution time for each job, in seconds (0 = no limit)
    #[arg(short = 't', long = "timeout", value_name = "SECS", default_value_t = 0)]
    timeout: u64,

    /// Write a full event trace to this file
    #[arg(long = "trace", value_name = "PATH")]
    trace: Option<PathBuf>,

    /// Enable debug output on stderr
    #[arg(short = 'd', long = "debug")]
    debug: bool,

    /// Program and fixed leading arguments
    #[arg(
        value_name = "COMMAND",
        required = true,
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    command: Vec<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("parallel-lite: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<()> {
    logging::init(&LogConfig {
        debug: args.debug,
        trace_file: args.trace,
    })?;

    let command = CommandTemplate::new(args.command)?;
    let config = DispatchConfig::new(command)
        .with_jobs(args.jobs.unwrap_or_else(default_jobs))
        .with_timeout_secs(args.timeout);

    let summary = Dispatcher::new(config)
        .run(tokio::io::stdin(), tokio::io::stdout())
        .await?
        .into_result()?;

    tracing::info!(
        records = summary.records,
        succeeded = summary.succeeded,
        failed = summary.failed,
        bytes = summary.output.bytes,
        "Dispatch finished"
    );

    Ok(())
}
