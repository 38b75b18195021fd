use std::ffi::OsString;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};

use crate::error::InvocationError;

/// Runs one external process to completion.
///
/// `argv[0]` is the program, the rest are its arguments. On success the
/// complete standard output is returned; spawn failure, non-zero exit and an
/// elapsed deadline are all errors.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    async fn run(
        &self,
        argv: &[OsString],
        deadline: Option<Duration>,
    ) -> Result<Vec<u8>, InvocationError>;
}

/// [`ProcessRunner`] backed by `tokio::process`.
///
/// Children get a null stdin, and their stdout and stderr are captured. A
/// child that outlives its deadline is killed and reaped before `run` returns.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandExecutor;

impl CommandExecutor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ProcessRunner for CommandExecutor {
    async fn run(
        &self,
        argv: &[OsString],
        deadline: Option<Duration>,
    ) -> Result<Vec<u8>, InvocationError> {
        let (program, args) = argv.split_first().ok_or_else(|| InvocationError::Spawn {
            program: String::new(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty command line"),
        })?;

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| InvocationError::Spawn {
                program: program.to_string_lossy().into_owned(),
                source,
            })?;

        let collected = match deadline {
            Some(limit) => {
                let bounded = tokio::time::timeout(limit, collect(&mut child)).await;
                match bounded {
                    Ok(collected) => collected,
                    Err(_) => {
                        // SIGKILL, then wait for the exit so nothing is left behind.
                        // An error here means the child already exited on its own.
                        let _ = child.kill().await;
                        return Err(InvocationError::Timeout(limit));
                    }
                }
            }
            None => collect(&mut child).await,
        };

        let (status, stdout, stderr) = collected?;
        if status.success() {
            Ok(stdout)
        } else {
            Err(InvocationError::Exit {
                code: status.code(),
                stderr: String::from_utf8_lossy(&stderr).trim_end().to_string(),
            })
        }
    }
}

/// Drain both pipes while waiting for exit, so a chatty child cannot block on
/// a full pipe.
async fn collect(child: &mut Child) -> std::io::Result<(ExitStatus, Vec<u8>, Vec<u8>)> {
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    let (stdout, stderr, status) =
        tokio::try_join!(read_all(stdout), read_all(stderr), child.wait())?;
    Ok((status, stdout, stderr))
}

async fn read_all<R: AsyncRead + Unpin>(pipe: Option<R>) -> std::io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        pipe.read_to_end(&mut buf).await?;
    }
    Ok(buf)
}
