//! Path resolution for launcher state and game data.
//!
//! Uses env vars when set, otherwise the working directory and the
//! platform-standard game directory.

use std::path::{Path, PathBuf};

pub const SETTINGS_FILE: &str = "settings.json";
pub const SERVERS_FILE: &str = "servers_list.json";
pub const SERVERS_DIR: &str = "servers";

/// Resolved paths for launcher files and directories.
#[derive(Debug, Clone)]
pub struct Paths {
    pub base_dir: PathBuf,
    pub game_dir: PathBuf,
}

impl Paths {
    /// Resolve paths from environment, falling back to cwd and the platform default.
    pub fn resolve() -> Self {
        let base_dir = resolve_path("CRAFTDECK_HOME", Some(PathBuf::from(".")), ".");
        let game_dir = resolve_path("CRAFTDECK_GAME_DIR", default_game_dir(), "~/.minecraft");
        Self { base_dir, game_dir }
    }

    /// Same layout under explicit roots.
    pub fn with_roots(base_dir: impl Into<PathBuf>, game_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            game_dir: game_dir.into(),
        }
    }

    /// Create the game, mods and servers directories if missing.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.game_dir)?;
        std::fs::create_dir_all(self.mods_dir())?;
        std::fs::create_dir_all(self.servers_dir())?;
        Ok(())
    }

    pub fn settings_file(&self) -> PathBuf {
        self.base_dir.join(SETTINGS_FILE)
    }

    pub fn servers_file(&self) -> PathBuf {
        self.base_dir.join(SERVERS_FILE)
    }

    /// Root under which each managed server gets `<name>/`.
    pub fn servers_dir(&self) -> PathBuf {
        self.base_dir.join(SERVERS_DIR)
    }

    pub fn server_dir(&self, name: &str) -> PathBuf {
        self.servers_dir().join(name)
    }

    pub fn game_dir(&self) -> &Path {
        &self.game_dir
    }

    /// Installed game versions (one directory per version id).
    pub fn versions_dir(&self) -> PathBuf {
        self.game_dir.join("versions")
    }

    pub fn mods_dir(&self) -> PathBuf {
        self.game_dir.join("mods")
    }
}

#[cfg(windows)]
fn default_game_dir() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join(".minecraft"))
}

#[cfg(target_os = "macos")]
fn default_game_dir() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("minecraft"))
}

#[cfg(not(any(windows, target_os = "macos")))]
fn default_game_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|p| p.join(".minecraft"))
}

fn resolve_path(env_var: &str, default: Option<PathBuf>, fallback: &str) -> PathBuf {
    if let Ok(val) = std::env::var(env_var) {
        let trimmed = val.trim();
        if !trimmed.is_empty() {
            return expand_tilde(trimmed);
        }
    }
    default.unwrap_or_else(|| expand_tilde(fallback))
}

fn expand_tilde(path: &str) -> PathBuf {
    let expanded = shellexpand::tilde(path);
    PathBuf::from(expanded.as_ref())
}
