//! Download jobs and their outcomes

use crate::formats::{selector_for, ResolvedFormat};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use uuid::Uuid;

/// Target container of a download
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Container {
    Mp3,
    #[default]
    Mp4,
}

impl Container {
    pub fn extension(&self) -> &'static str {
        match self {
            Container::Mp3 => "mp3",
            Container::Mp4 => "mp4",
        }
    }

    pub fn is_audio(&self) -> bool {
        matches!(self, Container::Mp3)
    }
}

impl fmt::Display for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Quality preset used when no explicit format was chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    Low,
    #[default]
    Medium,
    High,
}

impl Quality {
    /// Get string representation for display
    pub fn as_str(&self) -> &'static str {
        match self {
            Quality::Low => "low",
            Quality::Medium => "medium",
            Quality::High => "high",
        }
    }

    /// Height cap for the preset, `None` for unbounded
    pub fn max_height(&self) -> Option<u32> {
        match self {
            Quality::Low => Some(480),
            Quality::Medium => Some(720),
            Quality::High => None,
        }
    }
}

impl FromStr for Quality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" | "480" | "480p" => Ok(Quality::Low),
            "medium" | "720" | "720p" => Ok(Quality::Medium),
            "high" | "best" => Ok(Quality::High),
            other => Err(format!("Unknown quality '{}' (expected low, medium or high)", other)),
        }
    }
}

/// A user-initiated download request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadJob {
    pub id: Uuid,
    pub source_url: String,
    pub output_directory: PathBuf,
    pub container: Container,
    pub quality: Quality,
    /// None lets the quality preset pick the format
    pub chosen_format_id: Option<String>,
    /// The chosen format already muxes an audio track
    #[serde(default)]
    pub chosen_has_audio: bool,
    /// Stage in scratch, then ask where to save
    pub use_scratch_then_prompt: bool,
    pub created_at: DateTime<Utc>,
}

impl DownloadJob {
    pub fn new(source_url: impl Into<String>, output_directory: impl Into<PathBuf>) -> Self {
        Self {
            id: Uuid::new_v4(),
            source_url: source_url.into(),
            output_directory: output_directory.into(),
            container: Container::default(),
            quality: Quality::default(),
            chosen_format_id: None,
            chosen_has_audio: false,
            use_scratch_then_prompt: false,
            created_at: Utc::now(),
        }
    }

    pub fn container(mut self, container: Container) -> Self {
        self.container = container;
        self
    }

    pub fn quality(mut self, quality: Quality) -> Self {
        self.quality = quality;
        self
    }

    /// Choose a format by id alone; its audio is assumed to be separate
    pub fn format_id(mut self, format_id: Option<String>) -> Self {
        self.chosen_format_id = format_id.filter(|id| !id.trim().is_empty());
        self.chosen_has_audio = false;
        self
    }

    /// Choose one of the options produced by the format resolver
    pub fn format(mut self, format: &ResolvedFormat) -> Self {
        self.chosen_format_id = Some(format.format_id.clone());
        self.chosen_has_audio = format.has_audio;
        self
    }

    pub fn prompt_for_destination(mut self, prompt: bool) -> Self {
        self.use_scratch_then_prompt = prompt;
        self
    }

    /// yt-dlp format selector for this job
    pub fn format_selector(&self) -> String {
        if self.container.is_audio() {
            return "bestaudio/best".to_string();
        }
        if let Some(id) = &self.chosen_format_id {
            return selector_for(id, self.chosen_has_audio);
        }
        match self.quality.max_height() {
            Some(h) => format!("bv[height<={h}]+ba/b[height<={h}]"),
            None => "bv+ba/b".to_string(),
        }
    }
}

/// Externally observable job state; attempts are not exposed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobState {
    Idle,
    Probing,
    Ready,
    Downloading,
    Completed,
    CancelledByUser,
    Failed,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::Completed | JobState::CancelledByUser | JobState::Failed
        )
    }
}

/// Terminal result of a job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DownloadOutcome {
    /// Absolute path of the produced file
    Completed(PathBuf),
    CancelledByUser,
    Failed { reason: String, stderr: String },
}

impl DownloadOutcome {
    pub fn failed(reason: impl Into<String>) -> Self {
        DownloadOutcome::Failed {
            reason: reason.into(),
            stderr: String::new(),
        }
    }

    pub fn state(&self) -> JobState {
        match self {
            DownloadOutcome::Completed(_) => JobState::Completed,
            DownloadOutcome::CancelledByUser => JobState::CancelledByUser,
            DownloadOutcome::Failed { .. } => JobState::Failed,
        }
    }

    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            DownloadOutcome::Completed(path) => Some(path),
            _ => None,
        }
    }
}

impl fmt::Display for DownloadOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DownloadOutcome::Completed(path) => write!(f, "Saved to {}", path.display()),
            DownloadOutcome::CancelledByUser => f.write_str("Download cancelled"),
            DownloadOutcome::Failed { reason, stderr } if stderr.trim().is_empty() => {
                f.write_str(reason)
            }
            DownloadOutcome::Failed { reason, stderr } => {
                write!(f, "{}: {}", reason, stderr.trim())
            }
        }
    }
}
