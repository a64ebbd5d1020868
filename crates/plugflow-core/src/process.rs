//! Child process execution with a deadline and cooperative cancellation.
//!
//! Used by COMMAND steps and by script-backed agents. stdout and stderr are
//! drained concurrently so a chatty child never blocks on a full pipe. On
//! timeout or cancellation the child is killed and reaped before returning.

use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

/// Captured output of a finished child.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    /// `-1` when the child was terminated by a signal.
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("failed to spawn process: {0}")]
    Spawn(std::io::Error),

    #[error("process timed out after {0:?}")]
    TimedOut(Duration),

    #[error("process cancelled")]
    Cancelled,

    #[error("process I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Render a duration as seconds: `300` for whole values, `0.2` otherwise.
pub fn format_secs(d: Duration) -> String {
    if d.subsec_nanos() == 0 {
        d.as_secs().to_string()
    } else {
        format!("{:.1}", d.as_secs_f64())
    }
}

/// Run `cmd` to completion, feeding `stdin` if given.
///
/// Returns [`ProcessError::TimedOut`] once `timeout` elapses and
/// [`ProcessError::Cancelled`] as soon as `cancel` fires; in both cases the
/// child has been killed.
pub async fn run_with_deadline(
    mut cmd: Command,
    stdin: Option<Vec<u8>>,
    timeout: Duration,
    cancel: &CancellationToken,
) -> Result<ProcessOutput, ProcessError> {
    if cancel.is_cancelled() {
        return Err(ProcessError::Cancelled);
    }

    cmd.stdin(if stdin.is_some() { Stdio::piped() } else { Stdio::null() })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = cmd.spawn().map_err(ProcessError::Spawn)?;

    let writer = match (stdin, child.stdin.take()) {
        (Some(bytes), Some(mut pipe)) => Some(tokio::spawn(async move {
            // A child that exits without reading stdin closes the pipe; ignore that.
            let _ = pipe.write_all(&bytes).await;
            let _ = pipe.shutdown().await;
        })),
        _ => None,
    };

    let mut stdout_pipe = child.stdout.take();
    let mut stdout_reader = tokio::spawn(async move {
        let mut buf = Vec::new();
        if let Some(pipe) = stdout_pipe.as_mut() {
            let _ = pipe.read_to_end(&mut buf).await;
        }
        buf
    });
    let mut stderr_pipe = child.stderr.take();
    let mut stderr_reader = tokio::spawn(async move {
        let mut buf = Vec::new();
        if let Some(pipe) = stderr_pipe.as_mut() {
            let _ = pipe.read_to_end(&mut buf).await;
        }
        buf
    });

    // The deadline covers draining the pipes too: a background descendant
    // can keep stdout open after the shell itself has exited.
    let outcome = tokio::select! {
        finished = async {
            let status = child.wait().await?;
            let stdout = (&mut stdout_reader).await.unwrap_or_default();
            let stderr = (&mut stderr_reader).await.unwrap_or_default();
            Ok::<_, std::io::Error>((status, stdout, stderr))
        } => finished.map_err(ProcessError::from),
        _ = tokio::time::sleep(timeout) => Err(ProcessError::TimedOut(timeout)),
        _ = cancel.cancelled() => Err(ProcessError::Cancelled),
    };

    let (status, stdout, stderr) = match outcome {
        Ok(done) => done,
        Err(e) => {
            if let Err(kill_err) = child.kill().await {
                tracing::debug!("[Process] Failed to kill child: {}", kill_err);
            }
            stdout_reader.abort();
            stderr_reader.abort();
            if let Some(w) = writer {
                w.abort();
            }
            return Err(e);
        }
    };

    if let Some(w) = writer {
        let _ = w.await;
    }

    Ok(ProcessOutput {
        exit_code: status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&stdout).into_owned(),
        stderr: String::from_utf8_lossy(&stderr).into_owned(),
    })
}
