//! Application configuration
//!
//! Settings are one JSON document, read once at startup and rewritten on
//! every change. Sections missing from the file take their defaults; a file
//! that cannot be parsed is replaced by the defaults.

use crate::downloader::{Container, Quality};
use crate::utils::platform::{config_dir, default_download_dir, expand_tilde};
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const DEFAULT_SOUNDPAD_PORT: u16 = 8844;
pub const DEFAULT_PROXY_PORT: u16 = 8855;

/// Application settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub appearance: AppearanceSettings,
    pub downloads: DownloadSettings,
    pub soundpad: SoundpadSettings,
    pub proxy: ProxySettings,
    pub last_used: LastUsed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppearanceSettings {
    pub theme: String,
}

impl Default for AppearanceSettings {
    fn default() -> Self {
        Self {
            theme: "system".to_string(),
        }
    }
}

/// A named download folder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadPath {
    pub name: String,
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadSettings {
    pub paths: Vec<DownloadPath>,
    /// Name of the active entry in `paths`
    pub active: Option<String>,
}

impl Default for DownloadSettings {
    fn default() -> Self {
        Self {
            paths: vec![DownloadPath {
                name: "Default".to_string(),
                path: default_download_dir().to_string_lossy().into_owned(),
            }],
            active: Some("Default".to_string()),
        }
    }
}

impl DownloadSettings {
    /// The active download folder with `~` expanded.
    ///
    /// Falls back to the first entry, then to the platform default.
    pub fn active_path(&self) -> PathBuf {
        self.active
            .as_deref()
            .and_then(|name| self.paths.iter().find(|p| p.name == name))
            .or_else(|| self.paths.first())
            .map(|p| expand_tilde(&p.path))
            .unwrap_or_else(default_download_dir)
    }

    /// Add a path entry, replacing any entry with the same name
    pub fn add_path(&mut self, name: &str, path: &str) {
        let entry = DownloadPath {
            name: name.to_string(),
            path: path.to_string(),
        };
        match self.paths.iter_mut().find(|p| p.name == name) {
            Some(existing) => *existing = entry,
            None => self.paths.push(entry),
        }
        if self.active.is_none() {
            self.active = Some(name.to_string());
        }
    }

    /// Mark a path entry as active
    pub fn use_path(&mut self, name: &str) -> Result<()> {
        if !self.paths.iter().any(|p| p.name == name) {
            return Err(anyhow!("No download path named '{}'", name));
        }
        self.active = Some(name.to_string());
        Ok(())
    }

    /// Remove a path entry; the first remaining entry becomes active if needed
    pub fn remove_path(&mut self, name: &str) -> Result<()> {
        let before = self.paths.len();
        self.paths.retain(|p| p.name != name);
        if self.paths.len() == before {
            return Err(anyhow!("No download path named '{}'", name));
        }
        if self.active.as_deref() == Some(name) {
            self.active = self.paths.first().map(|p| p.name.clone());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SoundpadSettings {
    pub enabled: bool,
    pub port: u16,
}

impl Default for SoundpadSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            port: DEFAULT_SOUNDPAD_PORT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxySettings {
    pub port: u16,
}

impl Default for ProxySettings {
    fn default() -> Self {
        Self {
            port: DEFAULT_PROXY_PORT,
        }
    }
}

/// Last quality/container the user picked
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LastUsed {
    pub quality: Quality,
    pub container: Container,
}

/// Reads and writes [`Settings`] as a single JSON file
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<config dir>/settings.json`
    pub fn default_location() -> Self {
        Self::new(config_dir().join("settings.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load settings, merging with defaults, and write the merged result back
    pub fn load(&self) -> Result<Settings> {
        let settings = match std::fs::read_to_string(&self.path) {
            Ok(raw) => match serde_json::from_str::<Settings>(&raw) {
                Ok(parsed) => parsed,
                Err(e) => {
                    warn!(
                        "Failed to parse settings at {}: {}. Resetting to defaults",
                        self.path.display(),
                        e
                    );
                    Settings::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No settings at {}, using defaults", self.path.display());
                Settings::default()
            }
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read {}", self.path.display()))
            }
        };

        self.save(&settings)?;
        Ok(settings)
    }

    /// Persist the full settings document
    pub fn save(&self, settings: &Settings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(settings).context("Failed to serialize settings")?;
        std::fs::write(&self.path, json)
            .with_context(|| format!("Failed to write {}", self.path.display()))?;
        Ok(())
    }

    /// Load, apply `update_fn`, save, and return the new settings
    pub fn update(&self, update_fn: impl FnOnce(&mut Settings) -> Result<()>) -> Result<Settings> {
        let mut settings = self.load()?;
        update_fn(&mut settings)?;
        self.save(&settings)?;
        Ok(settings)
    }

    /// Overwrite the stored settings with the defaults
    pub fn reset(&self) -> Result<Settings> {
        let settings = Settings::default();
        self.save(&settings)?;
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let settings = Settings::default();
        assert_eq!(settings.appearance.theme, "system");
        assert!(!settings.soundpad.enabled);
        assert_eq!(settings.soundpad.port, 8844);
        assert_eq!(settings.proxy.port, 8855);
        assert_eq!(settings.downloads.paths.len(), 1);
        assert!(settings.downloads.active_path().ends_with("asp-downloads"));
    }

    #[test]
    fn test_missing_file_writes_defaults() {
        let temp = TempDir::new().unwrap();
        let store = SettingsStore::new(temp.path().join("nested").join("settings.json"));

        let settings = store.load().unwrap();
        assert_eq!(settings, Settings::default());
        assert!(store.path().exists(), "defaults should be written back");
    }

    #[test]
    fn test_partial_file_merges_with_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("settings.json");
        std::fs::write(&path, r#"{"soundpad": {"enabled": true}}"#).unwrap();

        let settings = SettingsStore::new(&path).load().unwrap();
        assert!(settings.soundpad.enabled);
        assert_eq!(settings.soundpad.port, DEFAULT_SOUNDPAD_PORT);
        assert_eq!(settings.appearance.theme, "system");

        let rewritten = std::fs::read_to_string(&path).unwrap();
        assert!(rewritten.contains("appearance"));
    }

    #[test]
    fn test_corrupt_file_resets() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("settings.json");
        std::fs::write(&path, "{not json").unwrap();

        let settings = SettingsStore::new(&path).load().unwrap();
        assert_eq!(settings, Settings::default());
        let rewritten: Settings =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(rewritten, Settings::default());
    }

    #[test]
    fn test_update_persists() {
        let temp = TempDir::new().unwrap();
        let store = SettingsStore::new(temp.path().join("settings.json"));

        store
            .update(|s| {
                s.downloads.add_path("Music", "/tmp/music");
                s.downloads.use_path("Music")?;
                s.last_used.container = Container::Mp3;
                Ok(())
            })
            .unwrap();

        let reloaded = store.load().unwrap();
        assert_eq!(reloaded.downloads.active.as_deref(), Some("Music"));
        assert_eq!(reloaded.downloads.active_path(), PathBuf::from("/tmp/music"));
        assert_eq!(reloaded.last_used.container, Container::Mp3);
    }

    #[test]
    fn test_path_entries() {
        let mut downloads = DownloadSettings {
            paths: Vec::new(),
            active: None,
        };
        downloads.add_path("A", "/a");
        downloads.add_path("B", "/b");
        assert_eq!(downloads.active.as_deref(), Some("A"));

        downloads.add_path("A", "/a2");
        assert_eq!(downloads.paths.len(), 2);
        assert_eq!(downloads.active_path(), PathBuf::from("/a2"));

        assert!(downloads.use_path("missing").is_err());
        downloads.remove_path("A").unwrap();
        assert_eq!(downloads.active.as_deref(), Some("B"));
        assert!(downloads.remove_path("A").is_err());
    }
}
