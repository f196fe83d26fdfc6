//! Object store access and local staging of source files.
//!
//! The pipeline only reads local paths. [`stage_files`] bridges the gap: it lists the keys under
//! a prefix and makes sure each one has a local copy in the working directory, downloading only
//! the files that are not there yet.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use glob::Pattern;
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::error::{LoadError, LoadResult};

/// Default file-name pattern for listed keys.
pub const DEFAULT_PATTERN: &str = "*.csv";

/// Minimal object store interface.
///
/// Keys are `/`-separated.
pub trait ObjectStore {
    /// Keys under `prefix` whose file name matches the store's pattern, sorted.
    fn list_files(&self, prefix: &str) -> LoadResult<Vec<String>>;

    /// Copy the object at `key` to the local file `dest`.
    fn download(&self, key: &str, dest: &Path) -> LoadResult<()>;

    /// Store the local file `local` under `key`.
    fn upload(&self, local: &Path, key: &str) -> LoadResult<()>;
}

/// [`ObjectStore`] over a directory tree.
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
    pattern: Pattern,
}

impl LocalObjectStore {
    /// A store rooted at `root` listing `*.csv` files.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            pattern: Pattern::new(DEFAULT_PATTERN).unwrap_or_default(),
        }
    }

    /// A store rooted at `root` listing files whose name matches `pattern`.
    pub fn with_pattern(root: impl Into<PathBuf>, pattern: &str) -> LoadResult<Self> {
        let pattern = Pattern::new(pattern).map_err(|source| LoadError::Pattern {
            pattern: pattern.to_owned(),
            source,
        })?;
        Ok(Self {
            root: root.into(),
            pattern,
        })
    }

    /// Filesystem path backing `key`.
    pub fn path_for(&self, key: &str) -> PathBuf {
        key.split('/')
            .filter(|part| !part.is_empty())
            .fold(self.root.clone(), |path, part| path.join(part))
    }

    fn key_for(&self, path: &Path) -> Option<String> {
        let rel = path.strip_prefix(&self.root).ok()?;
        let parts: Option<Vec<&str>> = rel.components().map(|c| c.as_os_str().to_str()).collect();
        Some(parts?.join("/"))
    }
}

impl ObjectStore for LocalObjectStore {
    fn list_files(&self, prefix: &str) -> LoadResult<Vec<String>> {
        let mut keys = Vec::new();
        for entry in WalkDir::new(&self.root).sort_by_file_name() {
            let entry = entry.map_err(|e| LoadError::ObjectStore {
                key: prefix.to_owned(),
                source: io::Error::from(e),
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let name_matches = entry
                .file_name()
                .to_str()
                .is_some_and(|name| self.pattern.matches(name));
            if !name_matches {
                continue;
            }
            if let Some(key) = self.key_for(entry.path()) {
                if key.starts_with(prefix) {
                    keys.push(key);
                }
            }
        }
        keys.sort();
        Ok(keys)
    }

    fn download(&self, key: &str, dest: &Path) -> LoadResult<()> {
        fs::copy(self.path_for(key), dest)
            .map(|_| ())
            .map_err(|source| LoadError::ObjectStore {
                key: key.to_owned(),
                source,
            })
    }

    fn upload(&self, local: &Path, key: &str) -> LoadResult<()> {
        let target = self.path_for(key);
        let store_err = |source| LoadError::ObjectStore {
            key: key.to_owned(),
            source,
        };
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(store_err)?;
        }
        fs::copy(local, &target).map(|_| ()).map_err(store_err)
    }
}

/// Make every key under `prefix` available in `working_dir`, returning local paths in key order.
///
/// A key's local path is `working_dir/<file name of key>`. Files already present are reused as
/// is. A failed download is logged and the key is left out; a failed listing is returned.
pub fn stage_files<O: ObjectStore + ?Sized>(
    store: &O,
    prefix: &str,
    working_dir: &Path,
) -> LoadResult<Vec<PathBuf>> {
    fs::create_dir_all(working_dir).map_err(|source| LoadError::Io {
        path: working_dir.to_path_buf(),
        source,
    })?;

    let keys = store.list_files(prefix)?;
    let mut staged = Vec::with_capacity(keys.len());

    for key in keys {
        let name = key.rsplit('/').next().unwrap_or(key.as_str());
        let local = working_dir.join(name);

        if local.exists() {
            info!(key = %key, path = %local.display(), "found locally");
            staged.push(local);
            continue;
        }

        info!(key = %key, "not found locally, downloading");
        match store.download(&key, &local) {
            Ok(()) => staged.push(local),
            Err(e) => warn!(key = %key, error = %e, "download failed, skipping file"),
        }
    }

    Ok(staged)
}
