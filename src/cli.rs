//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and the environment variables that
//! back the GitHub settings.

use clap::Parser;
use std::path::PathBuf;

/// orgcloc - count lines of code across a GitHub organization
///
/// Lists every repository of an organization, shallow-clones each one,
/// counts code, comment and blank lines per language, caches the results
/// and prints an organization-wide report.
///
/// Examples:
///   GITHUB_TOKEN=... orgcloc --org my-org
///   orgcloc --org my-org --concurrency 16 --format json -o report.json
///   orgcloc --org my-org --offline
///   orgcloc --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// GitHub organization to analyze
    #[arg(long, value_name = "ORG", env = "GITHUB_ORG")]
    pub org: Option<String>,

    /// GitHub access token used for the API and for cloning
    #[arg(long, value_name = "TOKEN", env = "GITHUB_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Username for HTTPS clone authentication
    #[arg(long, value_name = "USER", env = "GITHUB_USER")]
    pub user: Option<String>,

    /// GitHub API endpoint (for GitHub Enterprise)
    ///
    /// Example: https://ghe.example.com (the /api/v3 suffix is added if missing)
    #[arg(long, value_name = "URL", env = "GITHUB_ENDPOINT")]
    pub endpoint: Option<String>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .orgcloc.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Number of repositories processed concurrently
    #[arg(long, value_name = "NUM")]
    pub concurrency: Option<usize>,

    /// Overall deadline for cloning and counting, in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Directory for shallow clones
    #[arg(long, value_name = "DIR")]
    pub repos_dir: Option<PathBuf>,

    /// Directory for cached per-repository metrics
    #[arg(long, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Delete each clone once its metrics are cached
    #[arg(long)]
    pub prune: bool,

    /// Output format (text, json)
    #[arg(long, default_value = "text", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Write the report to a file instead of standard output
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Render the report from cached metrics only (no listing, no cloning)
    #[arg(long, conflicts_with = "dry_run")]
    pub offline: bool,

    /// List the repositories that would be analyzed and exit
    #[arg(long)]
    pub dry_run: bool,

    /// Generate a default .orgcloc.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Fixed-width text table (default)
    #[default]
    Text,
    /// JSON document
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.init_config {
            return Ok(());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if self.concurrency == Some(0) {
            return Err("Concurrency must be at least 1".to_string());
        }

        if self.timeout == Some(0) {
            return Err("Timeout must be at least 1 second".to_string());
        }

        if let Some(ref endpoint) = self.endpoint {
            if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
                return Err("Endpoint must start with 'http://' or 'https://'".to_string());
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
