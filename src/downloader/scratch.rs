//! Job-scoped scratch directories and moving results out of them

use crate::utils::error::AspError;
use lazy_static::lazy_static;
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

lazy_static! {
    /// yt-dlp intermediates such as `title.f137.mp4` or `title.temp.mp4`
    static ref INTERMEDIATE: Regex = Regex::new(r"\.(f\d+|temp)\.[^.]+$").unwrap();
}

const PARTIAL_SUFFIXES: [&str; 2] = [".part", ".ytdl"];
const THUMBNAIL_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "webp"];

/// A temporary directory owned by one job.
///
/// The directory is removed when the guard is dropped, on every exit path.
#[derive(Debug)]
pub struct ScratchDir {
    path: PathBuf,
}

impl ScratchDir {
    /// Create `<root>/<job id>`
    pub async fn create(root: &Path, job_id: Uuid) -> Result<Self, AspError> {
        let path = root.join(job_id.to_string());
        tokio::fs::create_dir_all(&path)
            .await
            .map_err(|e| AspError::filesystem(&path, e))?;
        debug!("Created scratch directory {}", path.display());
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Find the produced file with the target extension
    pub async fn find_output(&self, extension: &str) -> Result<Option<PathBuf>, AspError> {
        let mut entries = tokio::fs::read_dir(&self.path)
            .await
            .map_err(|e| AspError::filesystem(&self.path, e))?;

        let mut names = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| AspError::filesystem(&self.path, e))?
        {
            if entry.file_type().await.map(|t| t.is_file()).unwrap_or(false) {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }

        Ok(select_output(&names, extension).map(|name| self.path.join(name)))
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        match std::fs::remove_dir_all(&self.path) {
            Ok(()) => debug!("Removed scratch directory {}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                "Failed to remove scratch directory {}: {}",
                self.path.display(),
                e
            ),
        }
    }
}

fn extension_of(name: &str) -> Option<String> {
    Path::new(name)
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
}

/// True for files that are never a finished download
pub fn is_artifact(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    PARTIAL_SUFFIXES.iter().any(|s| lower.ends_with(s))
        || extension_of(&lower).is_some_and(|e| THUMBNAIL_EXTENSIONS.contains(&e.as_str()))
        || INTERMEDIATE.is_match(&lower)
}

/// Pick the output among the scratch directory's file names.
///
/// Names are compared in sorted order so the choice does not depend on the
/// directory listing order; more than one candidate is logged.
pub fn select_output(names: &[String], extension: &str) -> Option<String> {
    let wanted = extension.to_ascii_lowercase();
    let mut candidates: Vec<&String> = names
        .iter()
        .filter(|name| !is_artifact(name))
        .filter(|name| extension_of(name).as_deref() == Some(wanted.as_str()))
        .collect();
    candidates.sort();

    if candidates.len() > 1 {
        warn!(
            "{} files match .{} in scratch directory, taking {}",
            candidates.len(),
            extension,
            candidates[0]
        );
    }
    candidates.first().map(|name| name.to_string())
}

/// Move `source` to `destination`, replacing an existing file there
pub async fn move_into_place(source: &Path, destination: &Path) -> Result<(), AspError> {
    if let Some(parent) = destination.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| AspError::filesystem(parent, e))?;
    }

    if tokio::fs::try_exists(destination).await.unwrap_or(false) {
        debug!("Overwriting existing file {}", destination.display());
        tokio::fs::remove_file(destination)
            .await
            .map_err(|e| AspError::filesystem(destination, e))?;
    }

    if let Err(e) = tokio::fs::rename(source, destination).await {
        // rename fails across filesystems (temp dir on another mount)
        debug!("rename failed ({}), falling back to copy", e);
        tokio::fs::copy(source, destination)
            .await
            .map_err(|e| AspError::filesystem(destination, e))?;
        tokio::fs::remove_file(source)
            .await
            .map_err(|e| AspError::filesystem(source, e))?;
    }
    Ok(())
}
