//! Fetch, count, cache and aggregate.
//!
//! [`pipeline`] fans work out over [`analyzer`], which persists results in
//! [`cache`]; [`aggregator`] folds the cached results once the pipeline is done.

pub mod aggregator;
pub mod analyzer;
pub mod cache;
pub mod pipeline;

pub use aggregator::{aggregate, reportable_repositories};
pub use analyzer::RepositoryAnalyzer;
pub use cache::RepositoryCache;
pub use pipeline::{Pipeline, PipelineOptions};
