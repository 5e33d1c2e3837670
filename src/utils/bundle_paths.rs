//! Bundled / system binary path resolution
//!
//! yt-dlp, ffmpeg and the Soundpad helper can live in several places depending
//! on how the application was launched:
//! - packaged builds ship them in a `resources` directory next to the executable
//!   (or `Contents/Resources/bin` inside a macOS `.app` bundle)
//! - development builds rely on whatever is resolvable on PATH
//!
//! Every lookup is expressed as an ordered list of [`Candidate`]s; the first
//! candidate that yields an existing executable wins.

use crate::utils::platform::{exe_extension, expand_tilde, is_executable};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// One place a binary may live
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Candidate {
    /// Path taken from an environment variable, if set
    EnvVar(String),
    /// `<exe dir>/<name>`
    AdjacentToExe,
    /// `<exe dir>/<relative dir>/<name>`
    BundledResources(PathBuf),
    /// `<App>.app/Contents/Resources/bin/<name>`
    MacBundle,
    /// Lookup through PATH
    SystemPath,
    /// Well-known package manager locations
    CommonInstallDirs,
    /// `<current dir>/<relative dir>/<name>`
    WorkingDir(PathBuf),
    /// An explicit path
    Fixed(PathBuf),
}

impl Candidate {
    /// Resolve this candidate for `binary` (name without extension)
    pub fn resolve(&self, binary: &str) -> Option<PathBuf> {
        let file_name = format!("{}{}", binary, exe_extension());
        let path = match self {
            Candidate::EnvVar(var) => {
                let value = std::env::var(var).ok()?;
                if value.trim().is_empty() {
                    return None;
                }
                expand_tilde(value.trim())
            }
            Candidate::AdjacentToExe => exe_dir()?.join(&file_name),
            Candidate::BundledResources(rel) => exe_dir()?.join(rel).join(&file_name),
            Candidate::MacBundle => {
                let dir = exe_dir()?;
                if !dir.ends_with("MacOS") {
                    return None;
                }
                dir.parent()?.join("Resources").join("bin").join(&file_name)
            }
            Candidate::SystemPath => which::which(&file_name).ok()?,
            Candidate::CommonInstallDirs => {
                return common_install_dirs()
                    .into_iter()
                    .map(|dir| dir.join(&file_name))
                    .find(|p| is_executable(p));
            }
            Candidate::WorkingDir(rel) => std::env::current_dir().ok()?.join(rel).join(&file_name),
            Candidate::Fixed(path) => path.clone(),
        };

        debug!("Checking {:?} candidate: {:?}", self, path);
        if is_executable(&path) {
            Some(path)
        } else {
            None
        }
    }
}

/// Ordered candidate chain for one binary
#[derive(Debug, Clone)]
pub struct BinaryLocator {
    binary: String,
    candidates: Vec<Candidate>,
}

impl BinaryLocator {
    pub fn new(binary: impl Into<String>, candidates: Vec<Candidate>) -> Self {
        Self {
            binary: binary.into(),
            candidates,
        }
    }

    /// yt-dlp: env override, bundled resources, macOS bundle, next to the executable, PATH,
    /// then package manager locations
    pub fn ytdlp() -> Self {
        Self::new(
            "yt-dlp",
            vec![
                Candidate::EnvVar("ASPLOADER_YTDLP".to_string()),
                Candidate::BundledResources(PathBuf::from("resources").join("bin")),
                Candidate::BundledResources(PathBuf::from("resources")),
                Candidate::MacBundle,
                Candidate::AdjacentToExe,
                Candidate::SystemPath,
                Candidate::CommonInstallDirs,
            ],
        )
    }

    /// ffmpeg, looked up the same way as yt-dlp
    pub fn ffmpeg() -> Self {
        Self::new(
            "ffmpeg",
            vec![
                Candidate::EnvVar("ASPLOADER_FFMPEG".to_string()),
                Candidate::BundledResources(PathBuf::from("resources").join("bin")),
                Candidate::MacBundle,
                Candidate::AdjacentToExe,
                Candidate::SystemPath,
                Candidate::CommonInstallDirs,
            ],
        )
    }

    /// The Soundpad helper: packaged resources first, then the development tree
    pub fn soundpad_server() -> Self {
        let rel = PathBuf::from("soundpad-server");
        Self::new(
            "asp-server",
            vec![
                Candidate::EnvVar("ASPLOADER_SOUNDPAD_SERVER".to_string()),
                Candidate::BundledResources(PathBuf::from("resources").join(&rel)),
                Candidate::BundledResources(rel.clone()),
                Candidate::WorkingDir(rel),
            ],
        )
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    /// Return the first candidate that resolves to an existing executable
    pub fn locate(&self) -> Option<PathBuf> {
        for candidate in &self.candidates {
            if let Some(path) = candidate.resolve(&self.binary) {
                info!("✓ Using {} from {:?}: {}", self.binary, candidate, path.display());
                return Some(path);
            }
        }
        warn!("✗ {} not found in any candidate location", self.binary);
        None
    }
}

fn exe_dir() -> Option<PathBuf> {
    let exe = std::env::current_exe().ok()?;
    exe.parent().map(Path::to_path_buf)
}

fn common_install_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![
        // macOS Homebrew (Apple Silicon)
        PathBuf::from("/opt/homebrew/bin"),
        // macOS Homebrew (Intel)
        PathBuf::from("/usr/local/bin"),
        PathBuf::from("/usr/bin"),
        PathBuf::from("/Library/Frameworks/Python.framework/Versions/Current/bin"),
    ];
    if let Some(home) = dirs::home_dir() {
        dirs.push(home.join(".local").join("bin"));
    }
    dirs
}
