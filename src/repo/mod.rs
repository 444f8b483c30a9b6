//! Repository discovery and checkout.

pub mod cloner;
pub mod lister;

pub use cloner::{is_complete_clone, repository_name, GitFetcher, RepositoryFetcher};
pub use lister::GitHubClient;
