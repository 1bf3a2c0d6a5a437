//! Game launch session. Installation and command building belong to an
//! external installer behind [`GameInstaller`].

use std::path::{Path, PathBuf};
use std::process::Command;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::LauncherConfig;
use crate::fetch::Fetcher;
use crate::paths::Paths;

/// Identity and runtime options handed to the installer's command builder.
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    pub username: String,
    pub session_id: String,
    pub token: String,
    pub java_path: String,
    pub ram_mb: u32,
}

/// Installer progress event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallProgress {
    Status(String),
    Step { current: u64, max: u64 },
}

pub trait GameInstaller {
    fn install(
        &self,
        version_id: &str,
        game_dir: &Path,
        progress: &mut dyn FnMut(InstallProgress),
    ) -> Result<(), LaunchError>;

    fn build_command(
        &self,
        version_id: &str,
        game_dir: &Path,
        options: &LaunchOptions,
    ) -> Result<Vec<String>, LaunchError>;
}

/// Delegates to an external installer program:
/// `<prog> install <version> <dir>` and
/// `<prog> command <version> <dir> <username> <session> <token> --java <path> --ram <mb>`,
/// the latter printing one argv element per line.
#[derive(Debug, Clone)]
pub struct ExternalInstaller {
    program: PathBuf,
}

impl ExternalInstaller {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn from_config(config: &LauncherConfig) -> Option<Self> {
        config
            .installer
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(Self::new)
    }
}

impl GameInstaller for ExternalInstaller {
    fn install(
        &self,
        version_id: &str,
        game_dir: &Path,
        progress: &mut dyn FnMut(InstallProgress),
    ) -> Result<(), LaunchError> {
        progress(InstallProgress::Status(format!("installing {version_id}")));
        let status = Command::new(&self.program)
            .arg("install")
            .arg(version_id)
            .arg(game_dir)
            .status()
            .map_err(LaunchError::InstallerFailed)?;
        if !status.success() {
            return Err(LaunchError::InstallerExit(status.code()));
        }
        progress(InstallProgress::Step { current: 1, max: 1 });
        Ok(())
    }

    fn build_command(
        &self,
        version_id: &str,
        game_dir: &Path,
        options: &LaunchOptions,
    ) -> Result<Vec<String>, LaunchError> {
        let output = Command::new(&self.program)
            .arg("command")
            .arg(version_id)
            .arg(game_dir)
            .arg(&options.username)
            .arg(&options.session_id)
            .arg(&options.token)
            .arg("--java")
            .arg(&options.java_path)
            .arg("--ram")
            .arg(options.ram_mb.to_string())
            .output()
            .map_err(LaunchError::InstallerFailed)?;
        if !output.status.success() {
            return Err(LaunchError::InstallerExit(output.status.code()));
        }
        let argv: Vec<String> = String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect();
        if argv.is_empty() {
            return Err(LaunchError::EmptyCommand);
        }
        Ok(argv)
    }
}

/// Runs installed versions through a [`GameInstaller`].
pub struct Launcher<'a> {
    installer: Option<&'a dyn GameInstaller>,
    game_dir: PathBuf,
    config: &'a LauncherConfig,
}

impl<'a> Launcher<'a> {
    pub fn new(installer: Option<&'a dyn GameInstaller>, paths: &Paths, config: &'a LauncherConfig) -> Self {
        Self {
            installer,
            game_dir: paths.game_dir().to_path_buf(),
            config,
        }
    }

    /// Options for a session; an empty username gets a generated one.
    pub fn options(&self, username: &str) -> LaunchOptions {
        let username = match username.trim() {
            "" => random_username(),
            name => name.to_string(),
        };
        LaunchOptions {
            username,
            session_id: uuid::Uuid::new_v4().to_string(),
            token: String::new(),
            java_path: self.config.java().to_string(),
            ram_mb: self.config.ram_mb,
        }
    }

    /// Install, build the command and run the game, waiting for it to exit.
    pub fn launch(
        &self,
        version_id: &str,
        username: &str,
        progress: &mut dyn FnMut(InstallProgress),
    ) -> Result<std::process::ExitStatus, LaunchError> {
        let installer = self.installer.ok_or(LaunchError::NoInstaller)?;
        let options = self.options(username);

        installer.install(version_id, &self.game_dir, progress)?;
        let argv = installer.build_command(version_id, &self.game_dir, &options)?;
        let (program, args) = argv.split_first().ok_or(LaunchError::EmptyCommand)?;

        info!(version = version_id, username = %options.username, "launching game");
        debug!(?argv, "game command");
        Command::new(program)
            .args(args)
            .current_dir(&self.game_dir)
            .status()
            .map_err(LaunchError::SpawnFailed)
    }
}

/// Remote version ids followed by locally installed ones not in the manifest.
/// A failed manifest fetch still yields the local list.
pub fn list_versions(fetcher: &Fetcher, paths: &Paths) -> Vec<String> {
    let mut ids: Vec<String> = match fetcher.version_manifest() {
        Ok(manifest) => manifest.versions.into_iter().map(|v| v.id).collect(),
        Err(e) => {
            warn!(error = %e, "version manifest unavailable");
            Vec::new()
        }
    };
    for local in installed_versions(&paths.versions_dir()) {
        if !ids.contains(&local) {
            ids.push(local);
        }
    }
    ids
}

fn installed_versions(versions_dir: &Path) -> Vec<String> {
    let Ok(entries) = std::fs::read_dir(versions_dir) else {
        return Vec::new();
    };
    let mut names: Vec<String> = entries
        .flatten()
        .filter(|e| e.path().is_dir())
        .filter_map(|e| e.file_name().into_string().ok())
        .collect();
    names.sort();
    names
}

fn random_username() -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!("Player{}", &id[..6])
}

/// Open a directory in the platform file browser without waiting.
pub fn open_folder(path: &Path) -> std::io::Result<()> {
    let path = std::fs::canonicalize(path)?;
    let program = if cfg!(windows) {
        "explorer"
    } else if cfg!(target_os = "macos") {
        "open"
    } else {
        "xdg-open"
    };
    Command::new(program).arg(&path).spawn()?;
    Ok(())
}

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("No game installer configured (set \"installer\" in settings.json)")]
    NoInstaller,
    #[error("Failed to run installer: {0}")]
    InstallerFailed(std::io::Error),
    #[error("Installer exited with status {0:?}")]
    InstallerExit(Option<i32>),
    #[error("Installer produced an empty launch command")]
    EmptyCommand,
    #[error("Failed to start game: {0}")]
    SpawnFailed(std::io::Error),
}
