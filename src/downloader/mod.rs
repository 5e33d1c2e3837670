//! Download orchestration module

pub mod attempts;
pub mod dialog;
pub mod job;
pub mod orchestrator;
pub mod progress;
pub mod runner;
pub mod scratch;

// Re-export for convenience
pub use attempts::{default_ladder, AttemptPolicy};
pub use dialog::{AcceptSuggested, SaveDialog, TerminalSaveDialog};
pub use job::{Container, DownloadJob, DownloadOutcome, JobState, Quality};
pub use orchestrator::{DownloadOrchestrator, ALL_ATTEMPTS_FAILED};
pub use progress::DownloadProgress;
pub use runner::{ProcessOutput, ProcessRunner, YtDlpRunner};
