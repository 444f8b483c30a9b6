//! Per-repository fetch, count and cache.

use crate::analysis::cache::RepositoryCache;
use crate::error::{FetchError, ProcessError};
use crate::models::RepositoryMetrics;
use crate::repo::{is_complete_clone, repository_name, RepositoryFetcher};
use crate::scanner::CodeCounter;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// What happened to one repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// Freshly fetched and counted.
    Analyzed(RepositoryMetrics),
    /// Served from the cache without fetching.
    Cached(RepositoryMetrics),
    /// The remote has no content; nothing was stored.
    EmptyRemote,
}

impl ProcessOutcome {
    /// Metrics produced by this outcome, if any.
    pub fn metrics(&self) -> Option<&RepositoryMetrics> {
        match self {
            ProcessOutcome::Analyzed(m) | ProcessOutcome::Cached(m) => Some(m),
            ProcessOutcome::EmptyRemote => None,
        }
    }
}

/// Turns one repository location into cached metrics.
pub struct RepositoryAnalyzer {
    repos_dir: PathBuf,
    cache: RepositoryCache,
    fetcher: Arc<dyn RepositoryFetcher>,
    counter: Arc<dyn CodeCounter>,
    prune_checkouts: bool,
}

impl RepositoryAnalyzer {
    pub fn new(
        repos_dir: impl Into<PathBuf>,
        cache: RepositoryCache,
        fetcher: Arc<dyn RepositoryFetcher>,
        counter: Arc<dyn CodeCounter>,
    ) -> Self {
        Self {
            repos_dir: repos_dir.into(),
            cache,
            fetcher,
            counter,
            prune_checkouts: false,
        }
    }

    /// Delete each checkout once its metrics are cached.
    pub fn with_prune_checkouts(mut self, prune: bool) -> Self {
        self.prune_checkouts = prune;
        self
    }

    pub fn cache(&self) -> &RepositoryCache {
        &self.cache
    }

    pub fn repos_dir(&self) -> &Path {
        &self.repos_dir
    }

    /// Process one repository location.
    ///
    /// A cache hit returns immediately without fetching or counting. An
    /// empty remote is not an error and leaves no cache entry.
    pub fn process(
        &self,
        location: &str,
        cancel: &CancellationToken,
    ) -> Result<ProcessOutcome, ProcessError> {
        let name = repository_name(location)
            .ok_or_else(|| ProcessError::InvalidLocation(location.to_string()))?;

        if self.cache.has(&name) {
            debug!("Cache hit for {}", name);
            return Ok(ProcessOutcome::Cached(self.cache.load(&name)?));
        }

        if cancel.is_cancelled() {
            return Err(ProcessError::Cancelled);
        }

        let path = self.repos_dir.join(&name);
        if !is_complete_clone(&path) {
            if path.exists() {
                warn!("Discarding incomplete checkout at {}", path.display());
                fs::remove_dir_all(&path).map_err(FetchError::Io)?;
            }

            match self.fetcher.fetch_shallow(location, &path, cancel) {
                Ok(()) => {}
                Err(FetchError::EmptyRemote) => {
                    debug!("Skipping empty repository {}", location);
                    return Ok(ProcessOutcome::EmptyRemote);
                }
                Err(e) => return Err(e.into()),
            }
        }

        let counts = self.counter.count(&path, cancel)?;
        let metrics = RepositoryMetrics::from_counts(name.clone(), counts);
        self.cache.store(&name, &metrics)?;

        info!(
            "Analyzed {}: {} languages, {} lines of code",
            name,
            metrics.languages.len(),
            metrics.total.code
        );

        if self.prune_checkouts {
            if let Err(e) = fs::remove_dir_all(&path) {
                warn!("Failed to prune {}: {}", path.display(), e);
            }
        }

        Ok(ProcessOutcome::Analyzed(metrics))
    }
}
