use crate::downloader::{DownloadJob, DownloadOutcome, DownloadProgress};
use crate::extractor::VideoDetails;
use crate::utils::config::Settings;
use std::path::PathBuf;
use uuid::Uuid;

/// Commands sent from the front end to the backend
#[derive(Debug, Clone)]
pub enum BackendCommand {
    FetchVideoInfo {
        url: String,
        request_id: u64,
    },
    StartDownload(DownloadJob),
    AddToSoundpad {
        path: PathBuf,
    },
    SoundpadStatus,
    ValidatePath {
        path: String,
    },
    OpenPath {
        path: String,
    },
    ListFiles {
        path: String,
    },
    UpdateSettings(Settings),
    // System
    Shutdown,
}

/// Events sent from the backend to the front end
#[derive(Debug, Clone)]
pub enum BackendEvent {
    // Metadata
    VideoInfo {
        request_id: u64,
        result: Result<VideoDetails, String>,
    },

    // Download life-cycle
    DownloadStarted {
        job_id: Uuid,
    },
    DownloadProgress {
        job_id: Uuid,
        progress: DownloadProgress,
    },
    DownloadFinished {
        job_id: Uuid,
        outcome: DownloadOutcome,
    },

    // Soundpad
    SoundpadAdded {
        path: PathBuf,
        result: Result<(), String>,
    },
    /// A completed download could not be forwarded to Soundpad
    SoundpadWarning(String),
    SoundpadStatus(bool),

    // Filesystem helpers
    PathValidated {
        path: String,
        valid: bool,
    },
    PathOpened {
        path: String,
        opened: bool,
    },
    FilesListed {
        path: String,
        result: Result<Vec<String>, String>,
    },

    SettingsSaved(Result<(), String>),

    // System
    /// A command was rejected before any work started
    Error(String),
}
