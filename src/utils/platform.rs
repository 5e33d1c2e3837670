//! Platform-specific utilities for asploader
//!
//! This module provides cross-platform abstractions for:
//! - Application directories (config, scratch)
//! - Path handling (`~` expansion, validation, listing)
//! - System integration (revealing files in the OS file browser)

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Returns the configuration directory
/// - macOS: ~/Library/Application Support/asploader
/// - Windows: %APPDATA%\asploader
/// - Linux: ~/.config/asploader
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("asploader")
}

/// Returns the default download directory
/// - All platforms: ~/Downloads/asp-downloads
pub fn default_download_dir() -> PathBuf {
    dirs::download_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join("Downloads")))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("asp-downloads")
}

/// Root under which each download job creates its own scratch directory
pub fn scratch_root() -> PathBuf {
    std::env::temp_dir().join("asploader")
}

/// Expand a leading `~` to the user's home directory
pub fn expand_tilde(path: &str) -> PathBuf {
    if path == "~" {
        return dirs::home_dir().unwrap_or_else(|| PathBuf::from(path));
    }
    if let Some(rest) = path
        .strip_prefix("~/")
        .or_else(|| path.strip_prefix("~\\"))
    {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

/// True when `path` (after `~` expansion) is an existing directory
pub fn validate_path(path: &str) -> bool {
    if path.trim().is_empty() {
        return false;
    }
    let expanded = expand_tilde(path);
    std::fs::metadata(&expanded)
        .map(|m| m.is_dir())
        .unwrap_or(false)
}

/// Reveal a file or directory in the OS file browser.
///
/// Returns `false` when the path does not exist or the opener failed.
pub fn open_path(path: &str) -> bool {
    let expanded = expand_tilde(path);
    if !expanded.exists() {
        debug!("Refusing to open missing path {:?}", expanded);
        return false;
    }
    match open::that(&expanded) {
        Ok(()) => true,
        Err(e) => {
            warn!("Failed to open {:?}: {}", expanded, e);
            false
        }
    }
}

/// List the regular files directly inside `path`, sorted by name
pub fn list_files_in_path(path: &str) -> Result<Vec<String>> {
    let expanded = expand_tilde(path);
    let entries = std::fs::read_dir(&expanded)
        .with_context(|| format!("Failed to read directory {}", expanded.display()))?;

    let mut files: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect();
    files.sort();
    Ok(files)
}

/// Platform-specific executable extension
pub fn exe_extension() -> &'static str {
    #[cfg(target_os = "windows")]
    {
        ".exe"
    }
    #[cfg(not(target_os = "windows"))]
    {
        ""
    }
}

/// Check if a file is executable
pub fn is_executable(path: &Path) -> bool {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        if let Ok(metadata) = std::fs::metadata(path) {
            // Any executable bit set
            return metadata.is_file() && metadata.permissions().mode() & 0o111 != 0;
        }
        false
    }

    #[cfg(not(unix))]
    {
        path.is_file()
    }
}
