//! Launcher settings (settings.json).

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_RAM_MB: u32 = 4096;

/// Persisted launcher settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LauncherConfig {
    #[serde(default)]
    pub java_path: String,
    #[serde(rename = "ram", default = "default_ram")]
    pub ram_mb: u32,
    /// External installer program used to install and launch game versions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installer: Option<String>,
}

fn default_ram() -> u32 {
    DEFAULT_RAM_MB
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            java_path: String::new(),
            ram_mb: DEFAULT_RAM_MB,
            installer: None,
        }
    }
}

impl LauncherConfig {
    /// Load settings; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::ReadFailed {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        serde_json::from_str(&content).map_err(ConfigError::ParseFailed)
    }

    /// Overwrite the settings file, pretty-printed with 4-space indentation.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let mut out = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut out, formatter);
        self.serialize(&mut ser).map_err(ConfigError::SerializeFailed)?;
        std::fs::write(path, out).map_err(|source| ConfigError::WriteFailed {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "settings saved");
        Ok(())
    }

    /// Java executable to run, falling back to `java` on PATH.
    pub fn java(&self) -> &str {
        if self.java_path.trim().is_empty() {
            "java"
        } else {
            self.java_path.trim()
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read settings {path:?}: {source}")]
    ReadFailed { path: PathBuf, source: std::io::Error },
    #[error("Failed to parse settings: {0}")]
    ParseFailed(serde_json::Error),
    #[error("Failed to serialize settings: {0}")]
    SerializeFailed(serde_json::Error),
    #[error("Failed to write settings {path:?}: {source}")]
    WriteFailed { path: PathBuf, source: std::io::Error },
}
