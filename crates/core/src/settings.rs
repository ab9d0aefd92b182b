use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("failed to read settings {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse settings {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to write settings {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid settings: {0}")]
    Invalid(String),
}

/// Run configuration, persisted as a flat JSON object.
///
/// Missing fields take their default, so older files keep loading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Store detected encodings instead of only recognizing them.
    pub training: bool,
    /// Input video, relative to the video directory.
    pub video_name: String,
    /// Sampling stride: every `fps`-th frame is run through detection.
    pub fps: u32,
    /// Report recognized faces as they are found.
    pub show: bool,
    /// Write an annotated snapshot of every frame with detections.
    pub save_detection: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            training: false,
            video_name: "a.mp4".to_string(),
            fps: 2,
            show: true,
            save_detection: false,
        }
    }
}

impl Settings {
    /// Reads settings from `path`. `Ok(None)` means the file does not exist.
    pub fn load(path: &Path) -> Result<Option<Self>, SettingsError> {
        let json = match fs::read_to_string(path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(SettingsError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        serde_json::from_str(&json)
            .map(Some)
            .map_err(|source| SettingsError::Parse {
                path: path.to_path_buf(),
                source,
            })
    }

    pub fn load_or_default(path: &Path) -> Result<Self, SettingsError> {
        match Self::load(path)? {
            Some(settings) => Ok(settings),
            None => {
                log::info!("No settings at {}, using defaults", path.display());
                Ok(Self::default())
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        let write_err = |source| SettingsError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|e| SettingsError::Write {
            path: path.to_path_buf(),
            source: e.into(),
        })?;
        fs::write(path, json).map_err(write_err)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.fps < 1 {
            return Err(SettingsError::Invalid("fps must be at least 1".into()));
        }
        if self.video_name.trim().is_empty() {
            return Err(SettingsError::Invalid("video name is empty".into()));
        }
        Ok(())
    }
}
