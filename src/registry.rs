//! Server registry (servers_list.json).

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::models::ServerRecord;
use crate::paths::Paths;
use crate::selection::{self, SelectionError};

/// Ordered list of known servers. Every call re-reads the file, so an index
/// shown by one listing addresses the same record in the next call.
#[derive(Debug, Clone)]
pub struct ServerRegistry {
    path: PathBuf,
}

impl ServerRegistry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn open(paths: &Paths) -> Self {
        Self::new(paths.servers_file())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load all records. A missing file is an empty registry.
    pub fn load(&self) -> Result<Vec<ServerRecord>, RegistryError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(RegistryError::ReadFailed(e)),
        };
        serde_json::from_str(&content).map_err(RegistryError::ParseFailed)
    }

    /// Overwrite the whole file, pretty-printed, non-ASCII kept as UTF-8.
    pub fn save(&self, servers: &[ServerRecord]) -> Result<(), RegistryError> {
        let output = serde_json::to_string_pretty(servers).map_err(RegistryError::SerializeFailed)?;
        std::fs::write(&self.path, output).map_err(RegistryError::WriteFailed)?;
        debug!(path = %self.path.display(), count = servers.len(), "registry saved");
        Ok(())
    }

    /// Append a record and persist.
    pub fn add(&self, record: ServerRecord) -> Result<(), RegistryError> {
        let mut servers = self.load()?;
        if servers.iter().any(|s| s.name == record.name) {
            return Err(RegistryError::DuplicateName(record.name));
        }
        info!(name = %record.name, address = %record.address, "server registered");
        servers.push(record);
        self.save(&servers)
    }

    /// Record at 0-based `index` in persisted order.
    pub fn select(&self, index: usize) -> Result<ServerRecord, RegistryError> {
        let servers = self.load()?;
        Ok(selection::pick(&servers, index)?.clone())
    }

    /// Pop the record at `index` and persist the remainder.
    pub fn remove(&self, index: usize) -> Result<ServerRecord, RegistryError> {
        let mut servers = self.load()?;
        selection::pick(&servers, index)?;
        let removed = servers.remove(index);
        self.save(&servers)?;
        info!(name = %removed.name, "server unregistered");
        Ok(removed)
    }
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Failed to read server list: {0}")]
    ReadFailed(std::io::Error),
    #[error("Failed to parse server list: {0}")]
    ParseFailed(serde_json::Error),
    #[error("Failed to serialize server list: {0}")]
    SerializeFailed(serde_json::Error),
    #[error("Failed to write server list: {0}")]
    WriteFailed(std::io::Error),
    #[error("A server named {0:?} already exists")]
    DuplicateName(String),
    #[error(transparent)]
    Selection(#[from] SelectionError),
}
