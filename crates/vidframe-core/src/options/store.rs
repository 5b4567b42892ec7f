use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::OptionsError;
use crate::capture::DEFAULT_MIN_FRAME_INTERVAL_MILLIS;

/// Everything vidframe persists between runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    /// Frames to capture per video.
    pub frame_count: u32,
    pub min_frame_interval_millis: u64,
    /// Overrides the `ffmpeg` found on PATH.
    pub ffmpeg_path: Option<PathBuf>,
    /// Overrides the `ffprobe` found on PATH.
    pub ffprobe_path: Option<PathBuf>,
    /// Number of frames per row on a contact sheet.
    pub sheet_columns: u32,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            frame_count: 4,
            min_frame_interval_millis: DEFAULT_MIN_FRAME_INTERVAL_MILLIS,
            ffmpeg_path: None,
            ffprobe_path: None,
            sheet_columns: 4,
        }
    }
}

/// A JSON file holding [`Preferences`].
#[derive(Debug, Clone)]
pub struct PreferencesStore {
    path: PathBuf,
}

impl PreferencesStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The per-user store under the platform config directory.
    pub fn user_default() -> Self {
        Self::new(default_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the stored preferences. An absent file yields the defaults.
    pub fn read(&self) -> Result<Preferences, OptionsError> {
        if !self.path.exists() {
            debug!(path = ?self.path, "no preferences file, using defaults");
            return Ok(Preferences::default());
        }

        let content = std::fs::read_to_string(&self.path).map_err(|source| OptionsError::Io {
            path: self.path.clone(),
            source,
        })?;
        let prefs = serde_json::from_str(&content).map_err(|source| OptionsError::Parse {
            path: self.path.clone(),
            source,
        })?;

        debug!(path = ?self.path, "loaded preferences");
        Ok(prefs)
    }

    pub fn write(&self, prefs: &Preferences) -> Result<(), OptionsError> {
        let io_err = |source: std::io::Error| OptionsError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(io_err)?;
            }
        }

        let content = serde_json::to_string_pretty(prefs).map_err(|source| OptionsError::Parse {
            path: self.path.clone(),
            source,
        })?;
        std::fs::write(&self.path, content).map_err(io_err)?;

        info!(path = ?self.path, "preferences written");
        Ok(())
    }

    /// Read, apply `edit`, and write back. Nothing is written if `edit` left
    /// the preferences as they were.
    pub fn update(&self, edit: impl FnOnce(&mut Preferences)) -> Result<Preferences, OptionsError> {
        let current = self.read()?;
        let mut prefs = current.clone();
        edit(&mut prefs);

        if prefs == current {
            debug!(path = ?self.path, "preferences unchanged, skipping write");
            return Ok(prefs);
        }

        self.write(&prefs)?;
        Ok(prefs)
    }
}

fn default_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("vidframe")
        .join("preferences.json")
}
