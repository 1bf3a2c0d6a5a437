//! Artifact fetching: resolve server jars and mod files against the upstream
//! catalogs and stream them to disk.

use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::blocking::{Client, Response};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, info};

use crate::models::{
    BuildList, ModCatalogEntry, ModFile, ModVersion, SearchResponse, ServerCore, VersionManifest,
    VersionMeta,
};

pub const CHUNK_SIZE: usize = 8192;
pub const ARCHIVE_SUFFIX: &str = ".jar";

const USER_AGENT: &str = concat!("craftdeck/", env!("CARGO_PKG_VERSION"));

/// Base URLs of the upstream catalogs.
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub mods: String,
    pub paper: String,
    pub purpur: String,
    pub vanilla_manifest: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            mods: "https://api.modrinth.com/v2".into(),
            paper: "https://api.papermc.io/v2/projects/paper".into(),
            purpur: "https://api.purpurmc.org/v2/purpur".into(),
            vanilla_manifest: "https://launchermeta.mojang.com/mc/game/version_manifest.json".into(),
        }
    }
}

impl Endpoints {
    /// All catalogs served under one root (`/mods`, `/paper`, `/purpur`,
    /// `/vanilla/version_manifest.json`).
    pub fn under(root: &str) -> Self {
        let root = root.trim_end_matches('/');
        Self {
            mods: format!("{root}/mods"),
            paper: format!("{root}/paper"),
            purpur: format!("{root}/purpur"),
            vanilla_manifest: format!("{root}/vanilla/version_manifest.json"),
        }
    }
}

/// Download progress as seen by a caller-supplied sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// Integer percentage, when the total size is known.
    Percent(u8),
    /// Raw bytes so far, when it is not.
    Bytes(u64),
}

pub trait ProgressSink {
    fn report(&mut self, progress: Progress);
}

impl<F: FnMut(Progress)> ProgressSink for F {
    fn report(&mut self, progress: Progress) {
        self(progress)
    }
}

fn build_http_client() -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(Duration::from_secs(15))
        .timeout(Duration::from_secs(600))
        .build()
}

/// HTTP client bound to a set of catalog endpoints.
pub struct Fetcher {
    client: Client,
    endpoints: Endpoints,
}

impl Fetcher {
    pub fn new(endpoints: Endpoints) -> Result<Self, FetchError> {
        let client = build_http_client().map_err(FetchError::HttpClient)?;
        Ok(Self { client, endpoints })
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Resolve a server jar download URL for `core` at `version`.
    pub fn resolve_server_jar(&self, core: &str, version: &str) -> Result<String, FetchError> {
        let core: ServerCore = core
            .parse()
            .map_err(|_| FetchError::UnsupportedCore(core.to_string()))?;
        match core {
            ServerCore::Paper => {
                let meta_url = format!("{}/versions/{}", self.endpoints.paper, version);
                let list: BuildList = self.get_json(&meta_url, &format!("Paper {version}"))?;
                let build = latest_build(&list)
                    .ok_or_else(|| FetchError::NotFound(format!("Paper {version} has no builds")))?;
                Ok(paper_download_url(&self.endpoints.paper, version, &build))
            }
            ServerCore::Purpur => {
                let meta_url = format!("{}/{}", self.endpoints.purpur, version);
                let list: BuildList = self.get_json(&meta_url, &format!("Purpur {version}"))?;
                let build = latest_build(&list)
                    .ok_or_else(|| FetchError::NotFound(format!("Purpur {version} has no builds")))?;
                Ok(purpur_download_url(&self.endpoints.purpur, version, &build))
            }
            ServerCore::Vanilla => {
                let manifest = self.version_manifest()?;
                let entry = manifest
                    .find(version)
                    .ok_or_else(|| FetchError::NotFound(format!("version {version}")))?;
                let meta: VersionMeta = self.get_json(&entry.url, &format!("version {version}"))?;
                meta.downloads
                    .server
                    .map(|s| s.url)
                    .ok_or_else(|| FetchError::NotFound(format!("server download for {version}")))
            }
        }
    }

    /// Fetch the global version manifest.
    pub fn version_manifest(&self) -> Result<VersionManifest, FetchError> {
        self.get_json(&self.endpoints.vanilla_manifest, "version manifest")
    }

    /// First `.jar` file across all published versions of a mod, in listing order.
    pub fn resolve_mod_file(&self, project_id: &str) -> Result<ModFile, FetchError> {
        let url = format!("{}/project/{}/version", self.endpoints.mods, project_id);
        let versions: Vec<ModVersion> = self.get_json(&url, &format!("project {project_id}"))?;
        first_archive(&versions)
            .cloned()
            .ok_or_else(|| FetchError::NoArchiveFound(project_id.to_string()))
    }

    /// Search the mod catalog. An empty query lists by relevance.
    pub fn search_mods(&self, query: Option<&str>, limit: usize) -> Result<Vec<ModCatalogEntry>, FetchError> {
        let url = format!("{}/search", self.endpoints.mods);
        let limit = limit.to_string();
        let mut params: Vec<(&str, &str)> = Vec::new();
        match query {
            Some(q) => params.push(("query", q)),
            None => params.push(("index", "relevance")),
        }
        params.push(("limit", limit.as_str()));

        debug!(url = %url, ?params, "GET");
        let resp = self.client.get(&url).query(&params).send()?;
        let resp = check_status(resp, "mod search")?;
        let body: SearchResponse = resp.json()?;
        Ok(body.hits)
    }

    /// Stream `url` to `dest` in fixed-size chunks, overwriting any existing
    /// file. Returns the number of bytes written.
    pub fn stream_to_file(
        &self,
        url: &str,
        dest: &Path,
        sink: &mut dyn ProgressSink,
    ) -> Result<u64, FetchError> {
        debug!(url, dest = %dest.display(), "download");
        let resp = self.client.get(url).send()?;
        let mut resp = check_status(resp, url)?;
        let total = resp.content_length().filter(|&n| n > 0);

        let mut file = File::create(dest).map_err(|e| FetchError::io(dest, e))?;
        let mut buf = [0u8; CHUNK_SIZE];
        let mut written: u64 = 0;
        loop {
            let n = resp.read(&mut buf).map_err(FetchError::Transfer)?;
            if n == 0 {
                break;
            }
            file.write_all(&buf[..n]).map_err(|e| FetchError::io(dest, e))?;
            written += n as u64;
            match total {
                Some(total) => sink.report(Progress::Percent(percent(written, total))),
                None => sink.report(Progress::Bytes(written)),
            }
        }
        file.flush().map_err(|e| FetchError::io(dest, e))?;

        info!(url, bytes = written, dest = %dest.display(), "downloaded");
        Ok(written)
    }

    fn get_json<T: DeserializeOwned>(&self, url: &str, what: &str) -> Result<T, FetchError> {
        debug!(url, "GET");
        let resp = self.client.get(url).send()?;
        let resp = check_status(resp, what)?;
        Ok(resp.json()?)
    }
}

fn check_status(resp: Response, what: &str) -> Result<Response, FetchError> {
    let status = resp.status();
    if status == StatusCode::NOT_FOUND {
        return Err(FetchError::NotFound(what.to_string()));
    }
    if !status.is_success() {
        return Err(FetchError::Status {
            url: resp.url().to_string(),
            status: status.as_u16(),
        });
    }
    Ok(resp)
}

fn percent(done: u64, total: u64) -> u8 {
    (done.saturating_mul(100) / total).min(100) as u8
}

/// Last element of the build list. Positional, not numeric max.
pub fn latest_build(list: &BuildList) -> Option<String> {
    list.builds.as_slice().last().map(|b| match b {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    })
}

pub fn paper_download_url(base: &str, version: &str, build: &str) -> String {
    format!("{base}/versions/{version}/builds/{build}/downloads/paper-{version}-{build}.jar")
}

pub fn purpur_download_url(base: &str, version: &str, build: &str) -> String {
    format!("{base}/{version}/{build}/download")
}

/// First file ending in `.jar`, scanning versions then files in listing order.
pub fn first_archive(versions: &[ModVersion]) -> Option<&ModFile> {
    versions
        .iter()
        .flat_map(|v| v.files.iter())
        .find(|f| f.filename.ends_with(ARCHIVE_SUFFIX))
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Unsupported server core: {0} (expected Paper, Purpur or Vanilla)")]
    UnsupportedCore(String),
    #[error("No .jar file published for {0}")]
    NoArchiveFound(String),
    #[error("HTTP client error: {0}")]
    HttpClient(reqwest::Error),
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Request to {url} failed: HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("Download interrupted: {0}")]
    Transfer(std::io::Error),
    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl FetchError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        FetchError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}
