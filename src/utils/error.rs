//! Error handling for asploader

use thiserror::Error;

/// Main error type for asploader
#[derive(Debug, Error)]
pub enum AspError {
    #[error("yt-dlp not found. Please install yt-dlp")]
    YtDlpNotFound,

    #[error("Failed to extract video info: {0}")]
    ExtractionError(String),

    #[error("Download failed: {0}")]
    DownloadError(String),

    #[error("Failed to launch {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Filesystem error at {path}: {source}")]
    Filesystem {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    Soundpad(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Operation failed: {0}")]
    OperationFailed(String),
}

impl AspError {
    /// Wrap an IO error with the path it happened on
    pub fn filesystem(path: impl AsRef<std::path::Path>, source: std::io::Error) -> Self {
        AspError::Filesystem {
            path: path.as_ref().display().to_string(),
            source,
        }
    }
}
