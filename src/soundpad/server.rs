//! Lifecycle of the bundled Soundpad helper process

use crate::utils::bundle_paths::BinaryLocator;
use crate::utils::error::AspError;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command as AsyncCommand};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Owns at most one running helper process
pub struct SoundpadServer {
    executable: Option<PathBuf>,
    child: Mutex<Option<Child>>,
}

impl SoundpadServer {
    /// `None` locates the helper through [`BinaryLocator::soundpad_server`]
    pub fn new(executable: Option<PathBuf>) -> Self {
        Self {
            executable,
            child: Mutex::new(None),
        }
    }

    pub fn locate(&self) -> Option<PathBuf> {
        self.executable
            .clone()
            .or_else(|| BinaryLocator::soundpad_server().locate())
    }

    /// Start the helper if it is not already running
    pub async fn start(&self) -> Result<(), AspError> {
        let mut guard = self.child.lock().await;
        if let Some(child) = guard.as_mut() {
            if matches!(child.try_wait(), Ok(None)) {
                debug!("Soundpad server already running");
                return Ok(());
            }
        }

        let executable = self
            .locate()
            .ok_or_else(|| AspError::Soundpad("Soundpad server executable not found".to_string()))?;
        let workdir = executable.parent().unwrap_or_else(|| Path::new("."));

        info!("Starting Soundpad server: {}", executable.display());
        let mut child = AsyncCommand::new(&executable)
            .arg("--headless")
            .current_dir(workdir)
            .env("PYTHONIOENCODING", "utf-8")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| AspError::Spawn {
                program: executable.display().to_string(),
                source,
            })?;

        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(forward_output(stdout, false));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward_output(stderr, true));
        }

        *guard = Some(child);
        Ok(())
    }

    /// Stop the helper; does nothing when it is not running
    pub async fn stop(&self) -> Result<(), AspError> {
        let Some(mut child) = self.child.lock().await.take() else {
            return Ok(());
        };
        if !matches!(child.try_wait(), Ok(None)) {
            return Ok(());
        }

        info!("Stopping Soundpad server");
        #[cfg(windows)]
        {
            // Kill the whole tree, the helper spawns children of its own
            if let Some(pid) = child.id() {
                let status = AsyncCommand::new("taskkill")
                    .args(["/pid", &pid.to_string(), "/f", "/t"])
                    .status()
                    .await?;
                if status.success() {
                    let _ = child.wait().await;
                    return Ok(());
                }
                warn!("taskkill failed with {:?}, killing directly", status.code());
            }
        }

        child.kill().await?;
        Ok(())
    }

    /// Whether the helper is alive; reaps it if it has exited
    pub async fn is_running(&self) -> bool {
        let mut guard = self.child.lock().await;
        match guard.as_mut().map(|child| child.try_wait()) {
            Some(Ok(None)) => true,
            Some(Ok(Some(status))) => {
                debug!("Soundpad server exited with {:?}", status.code());
                *guard = None;
                false
            }
            Some(Err(e)) => {
                warn!("Cannot query Soundpad server: {}", e);
                *guard = None;
                false
            }
            None => false,
        }
    }
}

async fn forward_output<R: AsyncRead + Unpin>(reader: R, is_stderr: bool) {
    let mut lines = BufReader::new(reader).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if is_stderr {
            warn!("[soundpad-server] {}", line);
        } else {
            debug!("[soundpad-server] {}", line);
        }
    }
}
