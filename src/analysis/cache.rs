//! On-disk metrics cache.
//!
//! One JSON file per repository name. A file's presence means the
//! repository has been measured; entries are written to a temporary file
//! and renamed into place so readers never see partial content.

use crate::error::CacheError;
use crate::models::{LanguageMetric, LineCounts, RepositoryMetrics};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

const ENTRY_EXTENSION: &str = "json";

#[derive(Serialize)]
struct EntryRef<'a> {
    languages: &'a [LanguageMetric],
    total: &'a LineCounts,
}

#[derive(Deserialize)]
struct Entry {
    languages: Vec<LanguageMetric>,
    total: LineCounts,
}

/// Directory-backed cache of [`RepositoryMetrics`].
#[derive(Debug, Clone)]
pub struct RepositoryCache {
    dir: PathBuf,
}

impl RepositoryCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Cache directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the cache directory if needed.
    pub fn ensure_dir(&self) -> Result<(), CacheError> {
        fs::create_dir_all(&self.dir).map_err(|source| CacheError::Io {
            path: self.dir.clone(),
            source,
        })
    }

    fn entry_path(&self, name: &str) -> Result<PathBuf, CacheError> {
        if name.is_empty()
            || name == "."
            || name == ".."
            || name.contains(['/', '\\'])
        {
            return Err(CacheError::InvalidName(name.to_string()));
        }
        Ok(self.dir.join(format!("{}.{}", name, ENTRY_EXTENSION)))
    }

    /// Whether an entry exists for `name`.
    pub fn has(&self, name: &str) -> bool {
        self.entry_path(name)
            .map(|path| path.is_file())
            .unwrap_or(false)
    }

    /// Load the entry for `name`.
    pub fn load(&self, name: &str) -> Result<RepositoryMetrics, CacheError> {
        let path = self.entry_path(name)?;
        Self::read_entry(&path, name)
    }

    fn read_entry(path: &Path, name: &str) -> Result<RepositoryMetrics, CacheError> {
        let content = fs::read(path).map_err(|source| CacheError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let entry: Entry = serde_json::from_slice(&content).map_err(|source| {
            CacheError::Corrupt {
                path: path.to_path_buf(),
                source,
            }
        })?;

        Ok(RepositoryMetrics {
            name: name.to_string(),
            languages: entry.languages,
            total: entry.total,
        })
    }

    /// Store the entry for `name`, replacing any existing one atomically.
    pub fn store(&self, name: &str, metrics: &RepositoryMetrics) -> Result<(), CacheError> {
        let path = self.entry_path(name)?;
        let io_err = |source| CacheError::Io {
            path: path.clone(),
            source,
        };

        let buf = serde_json::to_vec(&EntryRef {
            languages: &metrics.languages,
            total: &metrics.total,
        })
        .map_err(|source| CacheError::Corrupt {
            path: path.clone(),
            source,
        })?;

        let mut tmp = NamedTempFile::new_in(&self.dir).map_err(io_err)?;
        tmp.write_all(&buf).map_err(io_err)?;
        tmp.as_file().sync_all().map_err(io_err)?;
        tmp.persist(&path).map_err(|source| CacheError::Persist {
            path: path.clone(),
            source,
        })?;

        debug!("Cached metrics for {} at {}", name, path.display());
        Ok(())
    }

    /// Load every entry in the cache directory, sorted by name.
    ///
    /// Unreadable entries are logged and skipped.
    pub fn load_all(&self) -> Result<Vec<RepositoryMetrics>, CacheError> {
        let entries = fs::read_dir(&self.dir).map_err(|source| CacheError::Io {
            path: self.dir.clone(),
            source,
        })?;

        let mut all = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_file()
                || path.extension().and_then(|e| e.to_str()) != Some(ENTRY_EXTENSION)
            {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };

            match Self::read_entry(&path, name) {
                Ok(metrics) => all.push(metrics),
                Err(e) => warn!("Skipping cache entry: {}", e),
            }
        }

        all.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(all)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn sample(name: &str) -> RepositoryMetrics {
        let mut raw = HashMap::new();
        raw.insert(
            "Rust".to_string(),
            LineCounts {
                files: 2,
                code: 40,
                comment: 4,
                blank: 6,
            },
        );
        raw.insert(
            "TOML".to_string(),
            LineCounts {
                files: 1,
                code: 8,
                comment: 0,
                blank: 1,
            },
        );
        RepositoryMetrics::from_counts(name, raw)
    }

    #[test]
    fn test_store_then_load() {
        let dir = TempDir::new().unwrap();
        let cache = RepositoryCache::new(dir.path());
        let metrics = sample("svc");

        assert!(!cache.has("svc"));
        cache.store("svc", &metrics).unwrap();
        assert!(cache.has("svc"));
        assert_eq!(cache.load("svc").unwrap(), metrics);
    }

    #[test]
    fn test_entry_layout() {
        let dir = TempDir::new().unwrap();
        let cache = RepositoryCache::new(dir.path());
        cache.store("svc", &sample("svc")).unwrap();

        let raw = fs::read_to_string(dir.path().join("svc.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();

        assert_eq!(value["languages"][0]["name"], "Rust");
        assert_eq!(value["languages"][0]["files"], 2);
        assert_eq!(value["total"]["code"], 48);
        assert!(value["total"].get("name").is_none());
    }

    #[test]
    fn test_store_overwrites() {
        let dir = TempDir::new().unwrap();
        let cache = RepositoryCache::new(dir.path());
        cache.store("svc", &sample("svc")).unwrap();

        let empty = RepositoryMetrics::from_counts("svc", HashMap::new());
        cache.store("svc", &empty).unwrap();

        assert_eq!(cache.load("svc").unwrap(), empty);
        // No temporary files left behind
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_load_corrupt_entry() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("bad.json"), "{not json").unwrap();
        let cache = RepositoryCache::new(dir.path());

        assert!(cache.has("bad"));
        assert!(matches!(
            cache.load("bad"),
            Err(CacheError::Corrupt { .. })
        ));
    }

    #[test]
    fn test_invalid_names() {
        let dir = TempDir::new().unwrap();
        let cache = RepositoryCache::new(dir.path());

        assert!(!cache.has(".."));
        assert!(matches!(
            cache.store("a/b", &sample("a/b")),
            Err(CacheError::InvalidName(_))
        ));
    }

    #[test]
    fn test_load_all_sorted_and_skips_bad_entries() {
        let dir = TempDir::new().unwrap();
        let cache = RepositoryCache::new(dir.path());
        cache.store("zeta", &sample("zeta")).unwrap();
        cache.store("alpha", &sample("alpha")).unwrap();
        fs::write(dir.path().join("broken.json"), "[]").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let all = cache.load_all().unwrap();
        let names: Vec<_> = all.iter().map(|m| m.name.as_str()).collect();

        assert_eq!(names, vec!["alpha", "zeta"]);
    }

    #[test]
    fn test_ensure_dir_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let cache = RepositoryCache::new(dir.path().join("nested/analyzed"));

        cache.ensure_dir().unwrap();
        cache.ensure_dir().unwrap();
        assert!(cache.dir().is_dir());
    }
}
