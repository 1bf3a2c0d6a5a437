//! Managed server instances: on-disk layout, creation, toggles, start and delete.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::fetch::{FetchError, Fetcher, ProgressSink};
use crate::models::{ServerCore, ServerRecord};
use crate::paths::Paths;
use crate::registry::{RegistryError, ServerRegistry};

pub const JAR_FILE: &str = "server.jar";
pub const EULA_FILE: &str = "eula.txt";
pub const PROPERTIES_FILE: &str = "server.properties";

#[cfg(windows)]
pub const START_SCRIPT: &str = "start.bat";
#[cfg(not(windows))]
pub const START_SCRIPT: &str = "start.sh";

/// Settings for a new managed server.
#[derive(Debug, Clone)]
pub struct ServerSpec {
    pub name: String,
    pub port: String,
    pub version: String,
    pub core: String,
    /// Java executable written into the start script.
    pub java: String,
    /// Heap size passed as -Xmx/-Xms.
    pub heap: String,
}

impl ServerSpec {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            port: "25565".into(),
            version: "1.20.4".into(),
            core: "Paper".into(),
            java: "java".into(),
            heap: "2G".into(),
        }
    }
}

/// The control files of one managed server directory.
#[derive(Debug, Clone)]
pub struct ServerLayout {
    dir: PathBuf,
}

impl ServerLayout {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn for_server(paths: &Paths, name: &str) -> Self {
        Self::new(paths.server_dir(name))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn jar(&self) -> PathBuf {
        self.dir.join(JAR_FILE)
    }

    pub fn eula(&self) -> PathBuf {
        self.dir.join(EULA_FILE)
    }

    pub fn properties(&self) -> PathBuf {
        self.dir.join(PROPERTIES_FILE)
    }

    pub fn start_script(&self) -> PathBuf {
        self.dir.join(START_SCRIPT)
    }

    /// Flip `eula=`. Content containing "false" (any case) is the false
    /// state; anything else, including a missing file, counts as true.
    pub fn toggle_eula(&self) -> Result<bool, ServerError> {
        let path = self.eula();
        let current = read_or_empty(&path)?;
        let new_value = current.to_lowercase().contains("false");
        write_file(&path, &format!("eula={new_value}\n"))?;
        info!(server = %self.dir.display(), eula = new_value, "eula toggled");
        Ok(new_value)
    }

    /// Flip `online-mode` in server.properties, keeping every other key in
    /// its original order. An absent key counts as "true".
    pub fn toggle_online_mode(&self) -> Result<bool, ServerError> {
        let path = self.properties();
        let mut props = Properties::parse(&read_or_empty(&path)?);
        let current = props.get("online-mode").unwrap_or("true");
        let new_value = current != "true";
        props.set("online-mode", if new_value { "true" } else { "false" });
        write_file(&path, &props.render())?;
        info!(server = %self.dir.display(), online_mode = new_value, "online-mode toggled");
        Ok(new_value)
    }

    /// Launch the start script detached, with the server directory as cwd.
    /// The child gets no stdin and its own process group (its own console on
    /// Windows), and is neither waited on nor tracked.
    pub fn start(&self) -> Result<u32, ServerError> {
        let script = self.start_script();
        if !script.is_file() {
            return Err(ServerError::MissingStartScript(script));
        }
        let child = script_command()
            .current_dir(&self.dir)
            .stdin(Stdio::null())
            .spawn()
            .map_err(ServerError::SpawnFailed)?;
        let pid = child.id();
        info!(server = %self.dir.display(), pid, "server started");
        Ok(pid)
    }

    /// Remove the directory tree. A missing directory is not an error.
    pub fn remove(&self) -> Result<(), ServerError> {
        match std::fs::remove_dir_all(&self.dir) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(ServerError::RemoveFailed {
                path: self.dir.clone(),
                source,
            }),
        }
    }
}

#[cfg(windows)]
fn script_command() -> Command {
    use std::os::windows::process::CommandExt;
    const CREATE_NEW_CONSOLE: u32 = 0x0000_0010;

    let mut cmd = Command::new("cmd.exe");
    cmd.args(["/k", START_SCRIPT]).creation_flags(CREATE_NEW_CONSOLE);
    cmd
}

#[cfg(unix)]
fn script_command() -> Command {
    use std::os::unix::process::CommandExt;

    let mut cmd = Command::new("sh");
    cmd.arg(START_SCRIPT).process_group(0);
    cmd
}

#[cfg(not(any(unix, windows)))]
fn script_command() -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg(START_SCRIPT);
    cmd
}

/// Create a managed server: directory, jar, start script, eula, properties,
/// then the registry entry. On a failed download the directory is left
/// behind as-is.
pub fn create(
    paths: &Paths,
    registry: &ServerRegistry,
    fetcher: &Fetcher,
    spec: &ServerSpec,
    progress: &mut dyn ProgressSink,
) -> Result<ServerRecord, ServerError> {
    validate_name(&spec.name)?;
    if registry.load()?.iter().any(|s| s.name == spec.name) {
        return Err(RegistryError::DuplicateName(spec.name.clone()).into());
    }

    let layout = ServerLayout::for_server(paths, &spec.name);
    std::fs::create_dir_all(layout.dir()).map_err(|source| ServerError::CreateDir {
        path: layout.dir().to_path_buf(),
        source,
    })?;

    let url = fetcher.resolve_server_jar(&spec.core, &spec.version)?;
    fetcher.stream_to_file(&url, &layout.jar(), progress)?;
    // resolve_server_jar already rejected unknown cores
    let core: ServerCore = spec.core.parse().unwrap_or_default();

    write_file(&layout.start_script(), &start_script(&spec.java, &spec.heap))?;
    mark_executable(&layout.start_script())?;
    write_file(&layout.eula(), "eula=false\n")?;
    write_file(
        &layout.properties(),
        &format!("server-port={}\nonline-mode=true\n", spec.port),
    )?;

    let record = ServerRecord::managed(&spec.name, &spec.port, &spec.version, core);
    registry.add(record.clone())?;
    info!(name = %spec.name, core = %core, version = %spec.version, "managed server created");
    Ok(record)
}

/// Unregister the server at `index`; managed servers also lose their directory.
/// Unmanaged entries never touch the filesystem.
pub fn delete(paths: &Paths, registry: &ServerRegistry, index: usize) -> Result<ServerRecord, ServerError> {
    let record = registry.remove(index)?;
    if record.managed {
        let layout = ServerLayout::for_server(paths, &record.name);
        if let Err(e) = layout.remove() {
            warn!(error = %e, "server directory left behind");
        }
    }
    Ok(record)
}

fn validate_name(name: &str) -> Result<(), ServerError> {
    let trimmed = name.trim();
    if trimmed.is_empty()
        || trimmed == "."
        || trimmed == ".."
        || trimmed.contains(['/', '\\'])
    {
        return Err(ServerError::InvalidName(name.to_string()));
    }
    Ok(())
}

#[cfg(windows)]
fn start_script(java: &str, heap: &str) -> String {
    format!("@echo off\n\"{java}\" -Xmx{heap} -Xms{heap} -jar {JAR_FILE} nogui\npause\n")
}

#[cfg(not(windows))]
fn start_script(java: &str, heap: &str) -> String {
    format!("#!/bin/sh\nexec \"{java}\" -Xmx{heap} -Xms{heap} -jar {JAR_FILE} nogui\n")
}

#[cfg(unix)]
fn mark_executable(path: &Path) -> Result<(), ServerError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
        .map_err(|source| ServerError::WriteFailed {
            path: path.to_path_buf(),
            source,
        })
}

#[cfg(not(unix))]
fn mark_executable(_path: &Path) -> Result<(), ServerError> {
    Ok(())
}

fn read_or_empty(path: &Path) -> Result<String, ServerError> {
    match std::fs::read_to_string(path) {
        Ok(s) => Ok(s),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "control file missing, treating as empty");
            Ok(String::new())
        }
        Err(source) => Err(ServerError::ReadFailed {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn write_file(path: &Path, content: &str) -> Result<(), ServerError> {
    std::fs::write(path, content).map_err(|source| ServerError::WriteFailed {
        path: path.to_path_buf(),
        source,
    })
}

/// `key=value` lines in file order. Lines without `=` are dropped; a repeated
/// key keeps its first position and takes the last value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Properties {
    entries: Vec<(String, String)>,
}

impl Properties {
    pub fn parse(content: &str) -> Self {
        let mut props = Self::default();
        for line in content.lines() {
            if let Some((k, v)) = line.trim().split_once('=') {
                props.set(k, v);
            }
        }
        props
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn set(&mut self, key: &str, value: &str) {
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value.to_string(),
            None => self.entries.push((key.to_string(), value.to_string())),
        }
    }

    pub fn render(&self) -> String {
        self.entries
            .iter()
            .map(|(k, v)| format!("{k}={v}\n"))
            .collect()
    }
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Invalid server name {0:?}")]
    InvalidName(String),
    #[error("Failed to create directory {path:?}: {source}")]
    CreateDir { path: PathBuf, source: std::io::Error },
    #[error("Server download failed: {0}")]
    Fetch(#[from] FetchError),
    #[error("Failed to read {path:?}: {source}")]
    ReadFailed { path: PathBuf, source: std::io::Error },
    #[error("Failed to write {path:?}: {source}")]
    WriteFailed { path: PathBuf, source: std::io::Error },
    #[error("Start script not found: {0:?}")]
    MissingStartScript(PathBuf),
    #[error("Failed to launch server: {0}")]
    SpawnFailed(std::io::Error),
    #[error("Failed to remove {path:?}: {source}")]
    RemoveFailed { path: PathBuf, source: std::io::Error },
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn layout_with(files: &[(&str, &str)]) -> (tempfile::TempDir, ServerLayout) {
        let tmp = tempfile::tempdir().unwrap();
        for (name, content) in files {
            std::fs::write(tmp.path().join(name), content).unwrap();
        }
        let layout = ServerLayout::new(tmp.path());
        (tmp, layout)
    }

    #[test]
    fn online_mode_toggle_is_its_own_inverse() {
        let original = "motd=Hello=World\nserver-port=25566\nonline-mode=true\nmax-players=20\n";
        let (_tmp, layout) = layout_with(&[(PROPERTIES_FILE, original)]);

        assert_eq!(layout.toggle_online_mode().unwrap(), false);
        let flipped = std::fs::read_to_string(layout.properties()).unwrap();
        assert_eq!(flipped, "motd=Hello=World\nserver-port=25566\nonline-mode=false\nmax-players=20\n");

        assert_eq!(layout.toggle_online_mode().unwrap(), true);
        assert_eq!(std::fs::read_to_string(layout.properties()).unwrap(), original);
    }

    #[test]
    fn online_mode_defaults_to_true_when_absent() {
        let (_tmp, layout) = layout_with(&[(PROPERTIES_FILE, "# comment\nserver-port=25565\n")]);
        assert_eq!(layout.toggle_online_mode().unwrap(), false);
        assert_eq!(
            std::fs::read_to_string(layout.properties()).unwrap(),
            "server-port=25565\nonline-mode=false\n"
        );
    }

    #[test]
    fn online_mode_without_file_creates_it() {
        let (_tmp, layout) = layout_with(&[]);
        assert_eq!(layout.toggle_online_mode().unwrap(), false);
        assert_eq!(std::fs::read_to_string(layout.properties()).unwrap(), "online-mode=false\n");
    }

    #[test]
    fn eula_toggle_is_its_own_inverse() {
        let (_tmp, layout) = layout_with(&[(EULA_FILE, "eula=false\n")]);
        assert_eq!(layout.toggle_eula().unwrap(), true);
        assert_eq!(std::fs::read_to_string(layout.eula()).unwrap(), "eula=true\n");
        assert_eq!(layout.toggle_eula().unwrap(), false);
        assert_eq!(std::fs::read_to_string(layout.eula()).unwrap(), "eula=false\n");
    }

    #[test]
    fn eula_false_detection_is_loose() {
        for content in ["  EULA=FALSE  \n", "#generated\neula = False", "false"] {
            let (_tmp, layout) = layout_with(&[(EULA_FILE, content)]);
            assert!(layout.toggle_eula().unwrap(), "content {content:?}");
        }
        for content in ["eula=true\n", "garbage", ""] {
            let (_tmp, layout) = layout_with(&[(EULA_FILE, content)]);
            assert!(!layout.toggle_eula().unwrap(), "content {content:?}");
        }
    }

    #[test]
    fn start_without_script_fails() {
        let (_tmp, layout) = layout_with(&[]);
        assert!(matches!(layout.start(), Err(ServerError::MissingStartScript(_))));
    }

    /// Polls for `file` under `dir`, written last by the script.
    #[cfg(unix)]
    fn wait_for(dir: &Path, file: &str) {
        for _ in 0..100 {
            if dir.join(file).exists() {
                return;
            }
            std::thread::sleep(std::time::Duration::from_millis(50));
        }
        panic!("{file} never appeared in {}", dir.display());
    }

    #[cfg(unix)]
    #[test]
    fn start_runs_detached_in_server_dir() {
        let script = "#!/bin/sh\n\
            pwd -P > cwd.txt\n\
            ps -o pgid= -p $$ > pgid.txt\n\
            echo $$ > pid.txt\n\
            if read line; then echo \"$line\" > stdin.txt; else : > stdin.txt; fi\n\
            touch done\n";
        let (tmp, layout) = layout_with(&[(START_SCRIPT, script)]);

        let pid = layout.start().unwrap();
        wait_for(tmp.path(), "done");

        let read = |name: &str| std::fs::read_to_string(tmp.path().join(name)).unwrap().trim().to_string();
        assert_eq!(
            std::path::PathBuf::from(read("cwd.txt")),
            std::fs::canonicalize(tmp.path()).unwrap()
        );
        assert_eq!(read("pid.txt"), pid.to_string());
        // leader of its own group, so not in ours
        assert_eq!(read("pgid.txt"), pid.to_string());
        assert_eq!(read("stdin.txt"), "");
    }

    #[test]
    fn remove_missing_dir_is_ok() {
        let tmp = tempfile::tempdir().unwrap();
        let layout = ServerLayout::new(tmp.path().join("gone"));
        layout.remove().unwrap();
    }

    #[test]
    fn names_that_escape_the_servers_root_are_rejected() {
        for name in ["", "  ", "..", "a/b", "a\\b"] {
            assert!(matches!(validate_name(name), Err(ServerError::InvalidName(_))), "{name:?}");
        }
        validate_name("survival-1").unwrap();
    }

    #[test]
    fn properties_keep_first_position_for_repeats() {
        let props = Properties::parse("a=1\nb=2\na=3\nno equals here\n");
        assert_eq!(props.render(), "a=3\nb=2\n");
    }
}
