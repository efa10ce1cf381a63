//! Spawning and terminating engine processes.
//!
//! Each channel owns exactly one [`ProcessHandle`]. The child is started with
//! piped stdin/stdout and `kill_on_drop`, and [`ProcessHandle::terminate`] can
//! be called any number of times from shutdown paths.

use std::path::Path;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tracing::{debug, info, warn};

use crate::error::{AhkError, Result};

/// A spawned engine process whose stdio has been handed to a channel.
#[derive(Debug)]
pub struct ProcessHandle {
    label: &'static str,
    pid: Option<u32>,
    child: Mutex<Child>,
    terminated: AtomicBool,
}

/// The streams taken from a freshly spawned process.
#[derive(Debug)]
pub struct ProcessIo {
    pub stdin: ChildStdin,
    pub stdout: ChildStdout,
}

impl ProcessHandle {
    /// Launch `executable` with a single script argument.
    ///
    /// Stderr of the child is forwarded to the log.
    pub fn spawn(
        label: &'static str,
        executable: &Path,
        script: &Path,
    ) -> Result<(Self, ProcessIo)> {
        let mut command = Command::new(executable);
        command
            .arg(script)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = command
            .spawn()
            .map_err(|e| AhkError::process_spawn(executable.display().to_string(), e))?;

        let pid = child.id();
        info!(
            process = label,
            pid,
            executable = %executable.display(),
            script = %script.display(),
            "spawned engine process"
        );

        let missing = |stream: &str| {
            AhkError::process_spawn(
                executable.display().to_string(),
                std::io::Error::other(format!("failed to capture {}", stream)),
            )
        };
        let stdin = child.stdin.take().ok_or_else(|| missing("stdin"))?;
        let stdout = child.stdout.take().ok_or_else(|| missing("stdout"))?;
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(async move {
                let mut reader = BufReader::new(stderr);
                let mut buf = Vec::new();
                while let Ok(Some(line)) = read_output_line(&mut reader, &mut buf).await {
                    warn!(process = label, stderr = %line, "engine stderr output");
                }
            });
        }

        let handle = Self {
            label,
            pid,
            child: Mutex::new(child),
            terminated: AtomicBool::new(false),
        };
        Ok((handle, ProcessIo { stdin, stdout }))
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::Acquire)
    }

    /// Kill the process unless it is already gone. Safe to call repeatedly.
    pub fn terminate(&self) {
        if self.terminated.swap(true, Ordering::AcqRel) {
            return;
        }

        let mut child = self
            .child
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        match child.try_wait() {
            Ok(Some(status)) => {
                debug!(process = self.label, ?status, "engine process already exited");
            }
            Ok(None) => match child.start_kill() {
                Ok(()) => info!(process = self.label, pid = self.pid, "terminated engine process"),
                Err(e) => warn!(process = self.label, error = %e, "failed to kill engine process"),
            },
            Err(e) => warn!(process = self.label, error = %e, "failed to query engine process"),
        }
    }
}

/// Read one line of engine output, without its line terminator.
///
/// The engine writes in the system code page, so bytes that are not valid
/// UTF-8 are replaced rather than failing the read. Returns `None` only at
/// end of stream.
pub(crate) async fn read_output_line<R>(
    reader: &mut R,
    buf: &mut Vec<u8>,
) -> std::io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    buf.clear();
    if reader.read_until(b'\n', buf).await? == 0 {
        return Ok(None);
    }
    while matches!(buf.last(), Some(b'\n' | b'\r')) {
        buf.pop();
    }
    Ok(Some(String::from_utf8_lossy(buf).into_owned()))
}

#[cfg(test)]
mod line_tests {
    use super::*;

    #[tokio::test]
    async fn test_read_output_line_decodes_lossily() {
        let mut reader: &[u8] = b"caf\xe9\r\nplain\nlast";
        let mut buf = Vec::new();
        assert_eq!(
            read_output_line(&mut reader, &mut buf).await.unwrap(),
            Some("caf\u{FFFD}".to_string())
        );
        assert_eq!(
            read_output_line(&mut reader, &mut buf).await.unwrap(),
            Some("plain".to_string())
        );
        assert_eq!(
            read_output_line(&mut reader, &mut buf).await.unwrap(),
            Some("last".to_string())
        );
        assert_eq!(read_output_line(&mut reader, &mut buf).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_read_output_line_keeps_empty_lines() {
        let mut reader: &[u8] = b"\n";
        let mut buf = Vec::new();
        assert_eq!(
            read_output_line(&mut reader, &mut buf).await.unwrap(),
            Some(String::new())
        );
        assert_eq!(read_output_line(&mut reader, &mut buf).await.unwrap(), None);
    }
}
