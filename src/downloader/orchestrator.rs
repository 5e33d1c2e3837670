//! Download orchestration: scratch staging, the retry ladder and placement

use crate::downloader::attempts::{audio_attempt, build_args, default_ladder, AttemptPolicy};
use crate::downloader::dialog::SaveDialog;
use crate::downloader::job::{DownloadJob, DownloadOutcome};
use crate::downloader::progress::DownloadProgress;
use crate::downloader::runner::{ProcessRunner, YtDlpRunner};
use crate::downloader::scratch::{move_into_place, ScratchDir};
use crate::utils::bundle_paths::BinaryLocator;
use crate::utils::error::AspError;
use crate::utils::platform;
use path_absolutize::Absolutize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Reason reported once every attempt of the ladder has failed
pub const ALL_ATTEMPTS_FAILED: &str = "All download attempts failed";

/// Drives one [`DownloadJob`] from spawn to final placement.
///
/// Holds no per-job state, so one orchestrator can serve concurrent jobs.
pub struct DownloadOrchestrator {
    ytdlp: PathBuf,
    ffmpeg: Option<PathBuf>,
    runner: Arc<dyn ProcessRunner>,
    ladder: Vec<AttemptPolicy>,
    scratch_root: PathBuf,
}

impl DownloadOrchestrator {
    pub fn new(ytdlp: PathBuf, runner: Arc<dyn ProcessRunner>) -> Self {
        Self {
            ytdlp,
            ffmpeg: None,
            runner,
            ladder: default_ladder(),
            scratch_root: platform::scratch_root(),
        }
    }

    /// Locate yt-dlp and ffmpeg on this machine and use the real runner
    pub fn detect() -> Result<Self, AspError> {
        let ytdlp = BinaryLocator::ytdlp()
            .locate()
            .ok_or(AspError::YtDlpNotFound)?;
        let ffmpeg = BinaryLocator::ffmpeg().locate();
        if ffmpeg.is_none() {
            warn!("ffmpeg not found, merging and conversion will rely on yt-dlp defaults");
        }
        info!("Using yt-dlp at {}", ytdlp.display());
        Ok(Self::new(ytdlp, Arc::new(YtDlpRunner)).with_ffmpeg(ffmpeg))
    }

    pub fn with_ffmpeg(mut self, ffmpeg: Option<PathBuf>) -> Self {
        self.ffmpeg = ffmpeg;
        self
    }

    pub fn with_ladder(mut self, ladder: Vec<AttemptPolicy>) -> Self {
        self.ladder = ladder;
        self
    }

    pub fn with_scratch_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.scratch_root = root.into();
        self
    }

    pub fn ytdlp_path(&self) -> &Path {
        &self.ytdlp
    }

    pub fn scratch_root(&self) -> &Path {
        &self.scratch_root
    }

    /// Attempts that will be tried for `job`, in order
    pub fn attempts_for(&self, job: &DownloadJob) -> Vec<AttemptPolicy> {
        if job.container.is_audio() {
            vec![audio_attempt()]
        } else {
            self.ladder.clone()
        }
    }

    pub async fn run(&self, job: &DownloadJob, dialog: &dyn SaveDialog) -> DownloadOutcome {
        self.run_with_progress(job, dialog, None).await
    }

    /// Run the job to a terminal outcome, forwarding progress if asked to
    pub async fn run_with_progress(
        &self,
        job: &DownloadJob,
        dialog: &dyn SaveDialog,
        progress: Option<mpsc::Sender<DownloadProgress>>,
    ) -> DownloadOutcome {
        let url = job.source_url.trim();
        if url.is_empty() {
            return DownloadOutcome::failed("No video URL provided");
        }

        if let Err(e) = tokio::fs::create_dir_all(&job.output_directory).await {
            error!(
                "Cannot create output directory {}: {}",
                job.output_directory.display(),
                e
            );
            return DownloadOutcome::failed(
                AspError::filesystem(&job.output_directory, e).to_string(),
            );
        }

        // Dropped on every return below, which removes the directory
        let scratch = match ScratchDir::create(&self.scratch_root, job.id).await {
            Ok(scratch) => scratch,
            Err(e) => return DownloadOutcome::failed(e.to_string()),
        };

        let produced = match self.run_attempts(job, &scratch, progress).await {
            Ok(path) => path,
            Err(outcome) => return outcome,
        };

        let file_name = match produced.file_name() {
            Some(name) => name.to_owned(),
            None => return DownloadOutcome::failed("Produced file has no name"),
        };
        let suggested = job.output_directory.join(file_name);

        let destination = if job.use_scratch_then_prompt {
            match dialog.choose_destination(&suggested).await {
                Some(path) => path,
                None => {
                    info!("Save dialog dismissed for job {}", job.id);
                    return DownloadOutcome::CancelledByUser;
                }
            }
        } else {
            suggested
        };

        if let Err(e) = move_into_place(&produced, &destination).await {
            error!("Failed to place {}: {}", destination.display(), e);
            return DownloadOutcome::failed(e.to_string());
        }

        let absolute = destination
            .absolutize()
            .map(|p| p.into_owned())
            .unwrap_or(destination);
        info!("Job {} completed: {}", job.id, absolute.display());
        DownloadOutcome::Completed(absolute)
    }

    async fn run_attempts(
        &self,
        job: &DownloadJob,
        scratch: &ScratchDir,
        progress: Option<mpsc::Sender<DownloadProgress>>,
    ) -> Result<PathBuf, DownloadOutcome> {
        let attempts = self.attempts_for(job);
        let extension = job.container.extension();
        let mut stderr_log = String::new();

        for (index, policy) in attempts.iter().enumerate() {
            info!(
                "Job {}: attempt {}/{} ({}, {})",
                job.id,
                index + 1,
                attempts.len(),
                policy.label,
                if policy.touches_video() { "re-encoding video" } else { "copying video" }
            );
            let args = build_args(job, policy, scratch.path(), self.ffmpeg.as_deref());

            let output = match self.runner.run(&self.ytdlp, &args, progress.clone()).await {
                Ok(output) => output,
                Err(e) => {
                    error!("Job {}: {}", job.id, e);
                    return Err(DownloadOutcome::Failed {
                        reason: e.to_string(),
                        stderr: stderr_log,
                    });
                }
            };
            stderr_log.push_str(&output.stderr);

            if !output.success {
                warn!(
                    "Job {}: attempt '{}' exited with {:?}",
                    job.id, policy.label, output.exit_code
                );
                continue;
            }

            match scratch.find_output(extension).await {
                Ok(Some(path)) => {
                    debug!("Job {}: produced {}", job.id, path.display());
                    return Ok(path);
                }
                Ok(None) => warn!(
                    "Job {}: attempt '{}' produced no .{} file",
                    job.id, policy.label, extension
                ),
                Err(e) => warn!("Job {}: cannot read scratch directory: {}", job.id, e),
            }
        }

        Err(DownloadOutcome::Failed {
            reason: ALL_ATTEMPTS_FAILED.to_string(),
            stderr: stderr_log,
        })
    }
}
