//! Data structures for local state files and upstream catalog responses.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use tracing::warn;

/// Entry in `servers_list.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerRecord {
    pub name: String,
    /// `host:port`
    #[serde(rename = "ip")]
    pub address: String,
    #[serde(default)]
    pub managed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Unknown core names read as `None` instead of failing the whole file.
    #[serde(default, deserialize_with = "lenient_core", skip_serializing_if = "Option::is_none")]
    pub core: Option<ServerCore>,
}

fn lenient_core<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<ServerCore>, D::Error> {
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|name| match name.parse() {
        Ok(core) => Some(core),
        Err(e) => {
            warn!(error = %e, "ignoring server core");
            None
        }
    }))
}

impl ServerRecord {
    /// Record for a server created and owned by this launcher.
    pub fn managed(name: &str, port: &str, version: &str, core: ServerCore) -> Self {
        Self {
            name: name.to_string(),
            address: format!("localhost:{port}"),
            managed: true,
            version: Some(version.to_string()),
            core: Some(core),
        }
    }

    /// Record for a server hosted elsewhere.
    pub fn external(name: &str, address: &str) -> Self {
        Self {
            name: name.to_string(),
            address: address.to_string(),
            managed: false,
            version: None,
            core: None,
        }
    }
}

impl fmt::Display for ServerRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.name, self.address)?;
        if self.managed {
            write!(f, " (managed")?;
            if let (Some(core), Some(version)) = (&self.core, &self.version) {
                write!(f, ", {core} {version}")?;
            }
            write!(f, ")")?;
        }
        Ok(())
    }
}

/// Server software flavour.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ServerCore {
    Vanilla,
    #[default]
    Paper,
    Purpur,
}

impl ServerCore {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServerCore::Vanilla => "Vanilla",
            ServerCore::Paper => "Paper",
            ServerCore::Purpur => "Purpur",
        }
    }
}

impl fmt::Display for ServerCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raised for any core name other than vanilla/paper/purpur (any case).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported server core: {0}")]
pub struct UnknownCore(pub String);

impl FromStr for ServerCore {
    type Err = UnknownCore;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "vanilla" => Ok(ServerCore::Vanilla),
            "paper" => Ok(ServerCore::Paper),
            "purpur" => Ok(ServerCore::Purpur),
            _ => Err(UnknownCore(s.to_string())),
        }
    }
}

impl TryFrom<String> for ServerCore {
    type Error = UnknownCore;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ServerCore> for String {
    fn from(core: ServerCore) -> Self {
        core.as_str().to_string()
    }
}

/// One hit from a mod catalog search. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModCatalogEntry {
    #[serde(rename = "project_id")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
}

/// `GET /search` response.
#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub hits: Vec<ModCatalogEntry>,
}

/// One published version of a mod project (`GET /project/{id}/version`).
#[derive(Debug, Clone, Deserialize)]
pub struct ModVersion {
    #[serde(default)]
    pub version_number: Option<String>,
    #[serde(default)]
    pub files: Vec<ModFile>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ModFile {
    pub filename: String,
    pub url: String,
}

/// Per-version build list from the Paper or Purpur catalog.
#[derive(Debug, Deserialize)]
pub struct BuildList {
    pub builds: Builds,
}

/// Paper answers with a bare array, Purpur with `{ "all": [...], "latest": .. }`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Builds {
    List(Vec<serde_json::Value>),
    Grouped { all: Vec<serde_json::Value> },
}

impl Builds {
    pub fn as_slice(&self) -> &[serde_json::Value] {
        match self {
            Builds::List(v) => v,
            Builds::Grouped { all } => all,
        }
    }
}

/// Global version manifest.
#[derive(Debug, Deserialize)]
pub struct VersionManifest {
    pub versions: Vec<ManifestEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ManifestEntry {
    pub id: String,
    pub url: String,
}

impl VersionManifest {
    /// First entry whose id equals `id`.
    pub fn find(&self, id: &str) -> Option<&ManifestEntry> {
        self.versions.iter().find(|v| v.id == id)
    }
}

/// Per-version metadata document; only the server download is needed.
#[derive(Debug, Deserialize)]
pub struct VersionMeta {
    pub downloads: VersionDownloads,
}

#[derive(Debug, Deserialize)]
pub struct VersionDownloads {
    pub server: Option<DownloadRef>,
}

#[derive(Debug, Deserialize)]
pub struct DownloadRef {
    pub url: String,
}
