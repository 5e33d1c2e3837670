//! Subprocess execution for download attempts
//!
//! [`ProcessRunner`] is the seam between the orchestrator and the operating
//! system; [`YtDlpRunner`] is the real implementation, tests substitute stubs.

use crate::downloader::progress::DownloadProgress;
use crate::utils::error::AspError;
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command as AsyncCommand;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, trace, warn};

/// Result of one finished subprocess
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProcessOutput {
    pub success: bool,
    pub exit_code: Option<i32>,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn ok() -> Self {
        Self {
            success: true,
            exit_code: Some(0),
            stderr: String::new(),
        }
    }

    pub fn failed(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            success: false,
            exit_code: Some(exit_code),
            stderr: stderr.into(),
        }
    }
}

/// Runs a program to completion.
///
/// An `Err` means the process could not be started at all; a non-zero exit is
/// reported through [`ProcessOutput::success`].
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    async fn run(
        &self,
        program: &Path,
        args: &[String],
        progress: Option<mpsc::Sender<DownloadProgress>>,
    ) -> Result<ProcessOutput, AspError>;
}

/// Runs yt-dlp through `tokio::process`, streaming its output line by line
#[derive(Debug, Clone, Default)]
pub struct YtDlpRunner;

#[async_trait]
impl ProcessRunner for YtDlpRunner {
    async fn run(
        &self,
        program: &Path,
        args: &[String],
        progress: Option<mpsc::Sender<DownloadProgress>>,
    ) -> Result<ProcessOutput, AspError> {
        debug!("Spawning {} {:?}", program.display(), args);

        let mut child = AsyncCommand::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| AspError::Spawn {
                program: program.display().to_string(),
                source,
            })?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        // stdout carries the [download] progress lines
        let stdout_task = async {
            let Some(stdout) = stdout else { return };
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                match DownloadProgress::parse_line(&line) {
                    Some(p) => {
                        if let Some(tx) = &progress {
                            // A slow or vanished consumer must not stall the pipe
                            if let Err(TrySendError::Full(_)) = tx.try_send(p) {
                                trace!("Progress channel full, dropping update");
                            }
                        }
                    }
                    None => debug!("[yt-dlp] {}", line),
                }
            }
        };

        let stderr_task = async {
            let mut captured = String::new();
            let Some(stderr) = stderr else { return captured };
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if line.contains("ERROR:") {
                    warn!("[yt-dlp] {}", line);
                } else {
                    debug!("[yt-dlp stderr] {}", line);
                }
                captured.push_str(&line);
                captured.push('\n');
            }
            captured
        };

        let ((), captured) = futures::join!(stdout_task, stderr_task);
        let status = child.wait().await?;
        debug!("{} exited with {:?}", program.display(), status.code());

        Ok(ProcessOutput {
            success: status.success(),
            exit_code: status.code(),
            stderr: captured,
        })
    }
}
