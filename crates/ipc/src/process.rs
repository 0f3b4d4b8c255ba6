//! Command executor backed by `tokio::process`
//!
//! Each call spawns one process, reads stdout and stderr concurrently and
//! records every chunk both in its own stream buffer and in a combined buffer
//! in arrival order. No timeout is applied here; callers that need one race
//! the future against a timer, and dropping it kills the child.

use std::io;
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::sync::Semaphore;

use akv_core::{CommandRunner, CommandSpec, Error, RawOutput, Result};

const CHUNK_SIZE: usize = 8192;

/// Spawns the external tool, optionally capping how many run at once
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner {
    limit: Option<Arc<Semaphore>>,
}

impl ProcessRunner {
    /// Runner with no cap on concurrent processes
    pub fn new() -> Self {
        Self::default()
    }

    /// Runner that lets at most `max` processes run at the same time; further
    /// calls wait for a slot before spawning
    pub fn with_max_concurrency(max: usize) -> Self {
        Self {
            limit: Some(Arc::new(Semaphore::new(max.max(1)))),
        }
    }

    /// Free process slots, or `None` when uncapped
    pub fn available_slots(&self) -> Option<usize> {
        self.limit.as_ref().map(|s| s.available_permits())
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<RawOutput> {
        let launch_error = |source: io::Error| Error::Launch {
            program: spec.program().to_string(),
            source,
        };

        let _permit = match &self.limit {
            Some(limit) => Some(
                limit
                    .clone()
                    .acquire_owned()
                    .await
                    .map_err(|e| launch_error(io::Error::other(e)))?,
            ),
            None => None,
        };

        tracing::debug!(command = %spec.redacted(), "Spawning process");
        let mut child = Command::new(spec.program())
            .args(spec.argv())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(launch_error)?;

        let streams = capture(child.stdout.take(), child.stderr.take()).await?;
        let status = child.wait().await?;

        tracing::debug!(
            program = spec.program(),
            exit_code = ?status.code(),
            stdout_bytes = streams.stdout.len(),
            stderr_bytes = streams.stderr.len(),
            "Process exited"
        );

        Ok(RawOutput::new(
            &String::from_utf8_lossy(&streams.combined),
            String::from_utf8_lossy(&streams.stdout).into_owned(),
            String::from_utf8_lossy(&streams.stderr).into_owned(),
            status.code(),
        ))
    }
}

#[derive(Debug, Default)]
struct Streams {
    combined: Vec<u8>,
    stdout: Vec<u8>,
    stderr: Vec<u8>,
}

async fn capture<O, E>(mut stdout: Option<O>, mut stderr: Option<E>) -> io::Result<Streams>
where
    O: AsyncRead + Unpin,
    E: AsyncRead + Unpin,
{
    let mut streams = Streams::default();
    let mut out_chunk = [0u8; CHUNK_SIZE];
    let mut err_chunk = [0u8; CHUNK_SIZE];
    let mut out_open = stdout.is_some();
    let mut err_open = stderr.is_some();

    while out_open || err_open {
        tokio::select! {
            read = read_chunk(&mut stdout, &mut out_chunk), if out_open => {
                let n = read?;
                if n == 0 {
                    out_open = false;
                } else {
                    tracing::trace!(bytes = n, "stdout chunk");
                    streams.stdout.extend_from_slice(&out_chunk[..n]);
                    streams.combined.extend_from_slice(&out_chunk[..n]);
                }
            }
            read = read_chunk(&mut stderr, &mut err_chunk), if err_open => {
                let n = read?;
                if n == 0 {
                    err_open = false;
                } else {
                    tracing::trace!(bytes = n, "stderr chunk");
                    streams.stderr.extend_from_slice(&err_chunk[..n]);
                    streams.combined.extend_from_slice(&err_chunk[..n]);
                }
            }
        }
    }

    Ok(streams)
}

async fn read_chunk<R: AsyncRead + Unpin>(stream: &mut Option<R>, buf: &mut [u8]) -> io::Result<usize> {
    match stream {
        Some(stream) => stream.read(buf).await,
        None => Ok(0),
    }
}
