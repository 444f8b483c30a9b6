//! Git repository cloning functionality.
//!
//! This module handles shallow-cloning repositories to a local directory
//! using the git2 library.

use crate::error::FetchError;
use git2::{Cred, FetchOptions, Progress, RemoteCallbacks, Repository};
use std::fs;
use std::path::Path;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Materializes a snapshot of a remote repository on disk.
pub trait RepositoryFetcher: Send + Sync {
    /// Fetch the latest snapshot of `location` into `destination`.
    ///
    /// Returns [`FetchError::EmptyRemote`] when the remote has no commits.
    fn fetch_shallow(
        &self,
        location: &str,
        destination: &Path,
        cancel: &CancellationToken,
    ) -> Result<(), FetchError>;
}

/// Fetcher backed by libgit2.
#[derive(Debug, Clone, Default)]
pub struct GitFetcher {
    /// Username for HTTPS authentication.
    user: Option<String>,
    /// Token used as the HTTPS password.
    token: Option<String>,
    /// Clone depth (None for full clone).
    depth: Option<i32>,
}

impl GitFetcher {
    /// Create a fetcher that performs depth-1 clones.
    pub fn new(user: Option<String>, token: Option<String>) -> Self {
        Self {
            user,
            token,
            depth: Some(1), // Shallow clone by default for speed
        }
    }

    fn fetch_options(&self, cancel: &CancellationToken) -> FetchOptions<'static> {
        let mut callbacks = RemoteCallbacks::new();

        if let Some(token) = self.token.clone() {
            let user = self
                .user
                .clone()
                .unwrap_or_else(|| "x-access-token".to_string());
            callbacks.credentials(move |_url, _username, _allowed| {
                Cred::userpass_plaintext(&user, &token)
            });
        }

        let cancel = cancel.clone();
        callbacks.transfer_progress(move |_progress: Progress<'_>| !cancel.is_cancelled());

        let mut fetch_opts = FetchOptions::new();
        fetch_opts.remote_callbacks(callbacks);

        if let Some(depth) = self.depth {
            fetch_opts.depth(depth);
        }

        fetch_opts
    }
}

impl RepositoryFetcher for GitFetcher {
    fn fetch_shallow(
        &self,
        location: &str,
        destination: &Path,
        cancel: &CancellationToken,
    ) -> Result<(), FetchError> {
        if cancel.is_cancelled() {
            return Err(FetchError::Cancelled);
        }

        debug!("Cloning {} into {}", location, destination.display());

        let mut builder = git2::build::RepoBuilder::new();
        builder.fetch_options(self.fetch_options(cancel));

        let repo = match builder.clone(location, destination) {
            Ok(repo) => repo,
            Err(source) => {
                remove_partial(destination);
                if cancel.is_cancelled() {
                    return Err(FetchError::Cancelled);
                }
                return Err(FetchError::Git {
                    location: location.to_string(),
                    source,
                });
            }
        };

        let empty = repo.is_empty().unwrap_or(false);
        drop(repo);

        if empty {
            remove_partial(destination);
            return Err(FetchError::EmptyRemote);
        }

        info!("Cloned {}", location);
        Ok(())
    }
}

/// Best-effort removal of a failed or empty checkout.
fn remove_partial(path: &Path) {
    if path.exists() {
        if let Err(e) = fs::remove_dir_all(path) {
            warn!("Failed to remove {}: {}", path.display(), e);
        }
    }
}

/// Whether `path` holds a usable checkout: a git repository whose HEAD
/// resolves to a commit.
pub fn is_complete_clone(path: &Path) -> bool {
    let Ok(repo) = Repository::open(path) else {
        return false;
    };
    let complete = repo
        .head()
        .ok()
        .and_then(|head| head.peel_to_commit().ok())
        .is_some();
    complete
}

/// Derive a repository name from its location.
///
/// Takes the last path segment (after `/` or `:`) and strips a `.git`
/// suffix. Returns `None` when nothing usable is left.
pub fn repository_name(location: &str) -> Option<String> {
    let trimmed = location.trim().trim_end_matches('/');
    let segment = trimmed
        .rsplit(|c| c == '/' || c == ':')
        .next()
        .unwrap_or(trimmed);
    let name = segment.strip_suffix(".git").unwrap_or(segment);

    match name {
        "" | "." | ".." => None,
        _ if name.contains('\\') => None,
        _ => Some(name.to_string()),
    }
}
