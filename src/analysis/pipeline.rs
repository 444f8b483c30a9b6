//! Concurrent fan-out over repository locations.
//!
//! Each location runs [`RepositoryAnalyzer::process`] on the blocking
//! thread pool. A semaphore bounds how many run at once, and
//! [`Pipeline::run`] only returns after every task has finished.

use crate::analysis::analyzer::{ProcessOutcome, RepositoryAnalyzer};
use crate::error::{FetchError, ProcessError};
use crate::repo::repository_name;
use futures::future::join_all;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Pipeline tuning.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Maximum repositories processed at once.
    pub concurrency: usize,
    /// Overall deadline after which outstanding work is cancelled.
    pub deadline: Option<Duration>,
    /// Whether to draw a progress bar on stderr.
    pub show_progress: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            concurrency: 8,
            deadline: None,
            show_progress: false,
        }
    }
}

/// Names of successfully processed repositories, shared between tasks.
#[derive(Debug, Default)]
pub struct ProcessedSet {
    names: Mutex<BTreeSet<String>>,
}

impl ProcessedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a name. Returns false if it was already present.
    pub fn insert(&self, name: impl Into<String>) -> bool {
        match self.names.lock() {
            Ok(mut names) => names.insert(name.into()),
            Err(poisoned) => poisoned.into_inner().insert(name.into()),
        }
    }

    /// Sorted copy of the recorded names.
    pub fn snapshot(&self) -> Vec<String> {
        match self.names.lock() {
            Ok(names) => names.iter().cloned().collect(),
            Err(poisoned) => poisoned.into_inner().iter().cloned().collect(),
        }
    }
}

/// A location that could not be processed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedRepository {
    pub location: String,
    pub error: String,
    pub cancelled: bool,
}

/// Result of a pipeline run.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// Repositories with metrics in the cache, sorted by name.
    pub processed: Vec<String>,
    /// Repositories skipped because the remote was empty.
    pub empty: Vec<String>,
    /// Locations that failed.
    pub failed: Vec<FailedRepository>,
    /// Distinct locations considered.
    pub total: usize,
}

/// Bounded fan-out of repository processing.
pub struct Pipeline {
    analyzer: Arc<RepositoryAnalyzer>,
    options: PipelineOptions,
    cancel: CancellationToken,
}

impl Pipeline {
    pub fn new(analyzer: RepositoryAnalyzer, options: PipelineOptions) -> Self {
        Self {
            analyzer: Arc::new(analyzer),
            options,
            cancel: CancellationToken::new(),
        }
    }

    /// Token that cancels the outstanding work of this pipeline.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Create the checkout and cache directories.
    fn ensure_dirs(&self) -> Result<(), ProcessError> {
        fs::create_dir_all(self.analyzer.repos_dir()).map_err(FetchError::Io)?;
        self.analyzer.cache().ensure_dir()?;
        Ok(())
    }

    fn progress_bar(&self, total: usize) -> ProgressBar {
        if !self.options.show_progress {
            return ProgressBar::hidden();
        }

        let pb = ProgressBar::new(total as u64);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} repositories")
            .map(|s| s.progress_chars("#>-"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        pb.set_style(style);
        pb
    }

    /// Process every location and wait for all of them.
    ///
    /// Per-repository failures are collected in the summary; only failing
    /// to create the working directories is returned as an error.
    pub async fn run(&self, locations: &[String]) -> Result<RunSummary, ProcessError> {
        self.ensure_dirs()?;

        let locations = unique_locations(locations);
        let total = locations.len();
        info!(
            "Processing {} repositories (concurrency {})",
            total, self.options.concurrency
        );

        let processed = Arc::new(ProcessedSet::new());
        let semaphore = Arc::new(Semaphore::new(self.options.concurrency.max(1)));
        let progress = self.progress_bar(total);

        let watchdog = self.options.deadline.map(|deadline| {
            let cancel = self.cancel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(deadline).await;
                warn!("Deadline of {:?} reached, cancelling outstanding work", deadline);
                cancel.cancel();
            })
        });

        let mut handles: Vec<(String, JoinHandle<Result<ProcessOutcome, ProcessError>>)> =
            Vec::with_capacity(total);
        let mut not_started = Vec::new();

        for location in locations {
            let permit = tokio::select! {
                permit = semaphore.clone().acquire_owned() => permit.ok(),
                _ = self.cancel.cancelled() => None,
            };
            let Some(permit) = permit else {
                progress.inc(1);
                not_started.push(location);
                continue;
            };

            let analyzer = Arc::clone(&self.analyzer);
            let processed = Arc::clone(&processed);
            let cancel = self.cancel.clone();
            let progress = progress.clone();
            let task_location = location.clone();

            let handle = tokio::spawn(async move {
                let _permit = permit;
                let blocking_location = task_location.clone();
                let outcome = tokio::task::spawn_blocking(move || {
                    analyzer.process(&blocking_location, &cancel)
                })
                .await
                .map_err(|e| ProcessError::Task(e.to_string()))
                .and_then(|result| result);

                match &outcome {
                    Ok(o) => {
                        if let Some(metrics) = o.metrics() {
                            processed.insert(metrics.name.clone());
                        }
                    }
                    Err(e) if e.is_cancelled() => debug!("Cancelled {}", task_location),
                    Err(e) => error!("Failed to process {}: {}", task_location, e),
                }
                progress.inc(1);
                outcome
            });
            handles.push((location, handle));
        }

        // Completion barrier
        let results = join_all(handles.into_iter().map(|(location, handle)| async move {
            let outcome = handle
                .await
                .map_err(|e| ProcessError::Task(e.to_string()))
                .and_then(|result| result);
            (location, outcome)
        }))
        .await;

        if let Some(watchdog) = watchdog {
            watchdog.abort();
        }
        progress.finish_and_clear();

        let mut summary = RunSummary {
            processed: processed.snapshot(),
            total,
            ..RunSummary::default()
        };

        for (location, outcome) in results {
            match outcome {
                Ok(ProcessOutcome::EmptyRemote) => {
                    summary
                        .empty
                        .push(repository_name(&location).unwrap_or(location));
                }
                Ok(_) => {}
                Err(e) => summary.failed.push(FailedRepository {
                    cancelled: e.is_cancelled(),
                    error: e.to_string(),
                    location,
                }),
            }
        }
        for location in not_started {
            summary.failed.push(FailedRepository {
                location,
                error: ProcessError::Cancelled.to_string(),
                cancelled: true,
            });
        }
        summary.empty.sort();

        Ok(summary)
    }
}

/// Drop locations that map to an already seen repository name.
fn unique_locations(locations: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    locations
        .iter()
        .filter(|location| {
            let key = repository_name(location).unwrap_or_else(|| location.to_string());
            let fresh = seen.insert(key);
            if !fresh {
                debug!("Skipping duplicate location {}", location);
            }
            fresh
        })
        .cloned()
        .collect()
}
