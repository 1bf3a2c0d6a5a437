//! Local mod library backed by the mod catalog.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::fetch::{FetchError, Fetcher, ProgressSink, ARCHIVE_SUFFIX};
use crate::models::ModCatalogEntry;
use crate::paths::Paths;

/// Number of entries requested per listing or search.
pub const RESULT_LIMIT: usize = 10;

pub struct ModLibrary<'a> {
    fetcher: &'a Fetcher,
    mods_dir: PathBuf,
}

impl<'a> ModLibrary<'a> {
    pub fn new(fetcher: &'a Fetcher, mods_dir: impl Into<PathBuf>) -> Self {
        Self {
            fetcher,
            mods_dir: mods_dir.into(),
        }
    }

    pub fn open(fetcher: &'a Fetcher, paths: &Paths) -> Self {
        Self::new(fetcher, paths.mods_dir())
    }

    pub fn mods_dir(&self) -> &Path {
        &self.mods_dir
    }

    /// Top entries by relevance.
    pub fn list_featured(&self) -> Result<Vec<ModCatalogEntry>, ModError> {
        Ok(self.fetcher.search_mods(None, RESULT_LIMIT)?)
    }

    pub fn search(&self, query: &str) -> Result<Vec<ModCatalogEntry>, ModError> {
        Ok(self.fetcher.search_mods(Some(query), RESULT_LIMIT)?)
    }

    /// Download the first `.jar` of a project into the mods directory,
    /// replacing any file of the same name.
    pub fn download(&self, project_id: &str, progress: &mut dyn ProgressSink) -> Result<PathBuf, ModError> {
        let file = self.fetcher.resolve_mod_file(project_id)?;
        let name = Path::new(&file.filename)
            .file_name()
            .ok_or_else(|| ModError::BadFilename(file.filename.clone()))?;
        std::fs::create_dir_all(&self.mods_dir).map_err(ModError::Io)?;
        let dest = self.mods_dir.join(name);
        self.fetcher.stream_to_file(&file.url, &dest, progress)?;
        info!(project = project_id, file = %dest.display(), "mod installed");
        Ok(dest)
    }

    /// Delete every `.jar` in the mods directory. Files that cannot be removed
    /// are skipped and not counted.
    pub fn delete_all(&self) -> Result<usize, ModError> {
        self.delete_archives(|path| std::fs::remove_file(path))
    }

    fn delete_archives(
        &self,
        mut remove: impl FnMut(&Path) -> std::io::Result<()>,
    ) -> Result<usize, ModError> {
        let entries = match std::fs::read_dir(&self.mods_dir) {
            Ok(e) => e,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(ModError::Io(e)),
        };

        let mut deleted = 0;
        for entry in entries.flatten() {
            let path = entry.path();
            let is_archive = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with(ARCHIVE_SUFFIX));
            if !is_archive || !path.is_file() {
                continue;
            }
            match remove(&path) {
                Ok(()) => {
                    debug!(file = %path.display(), "removed");
                    deleted += 1;
                }
                Err(e) => warn!(file = %path.display(), error = %e, "could not remove mod"),
            }
        }
        info!(deleted, "mods cleared");
        Ok(deleted)
    }
}

#[derive(Debug, Error)]
pub enum ModError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("Catalog returned an unusable file name: {0:?}")]
    BadFilename(String),
    #[error("Mods directory error: {0}")]
    Io(std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::Endpoints;
    use pretty_assertions::assert_eq;

    #[test]
    fn failed_removals_are_skipped_and_not_counted() {
        let tmp = tempfile::tempdir().unwrap();
        for name in ["a.jar", "locked.jar", "b.jar", "readme.md"] {
            std::fs::write(tmp.path().join(name), "x").unwrap();
        }
        let fetcher = Fetcher::new(Endpoints::under("http://127.0.0.1:9")).unwrap();
        let library = ModLibrary::new(&fetcher, tmp.path());

        let deleted = library
            .delete_archives(|path| {
                if path.ends_with("locked.jar") {
                    Err(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "locked"))
                } else {
                    std::fs::remove_file(path)
                }
            })
            .unwrap();

        assert_eq!(deleted, 2);
        let mut left: Vec<_> = std::fs::read_dir(tmp.path())
            .unwrap()
            .flatten()
            .map(|e| e.file_name().into_string().unwrap())
            .collect();
        left.sort();
        assert_eq!(left, vec!["locked.jar".to_string(), "readme.md".to_string()]);
    }
}
