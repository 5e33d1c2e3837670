//! asploader library

pub mod backend;
pub mod downloader;
pub mod extractor;
pub mod formats;
pub mod proxy;
pub mod soundpad;
pub mod utils;

// Re-export main types for easier use
pub use downloader::{
    Container, DownloadJob, DownloadOrchestrator, DownloadOutcome, DownloadProgress, Quality,
};
pub use extractor::{Extractor, VideoDetails, YtDlpExtractor};
pub use formats::{resolve_formats, ResolvedFormat, StreamVariant};
pub use utils::{AspError, Settings, SettingsStore};
