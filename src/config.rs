//! Configuration file handling.
//!
//! This module handles loading `.orgcloc.toml` and merging it with
//! command-line arguments and environment variables. The resulting
//! [`Config`] is built once in `main` and passed down by reference.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Name of the configuration file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = ".orgcloc.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// GitHub settings.
    #[serde(default)]
    pub github: GitHubConfig,

    /// Scanner settings.
    #[serde(default)]
    pub scanner: ScannerConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Directory holding the shallow clones.
    #[serde(default = "default_repos_dir")]
    pub repos_dir: PathBuf,

    /// Directory holding the per-repository metric files.
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    /// Maximum number of repositories processed at once.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Overall deadline for the fetch/analyze phase (0 disables it).
    #[serde(default)]
    pub timeout_seconds: u64,

    /// Delete each clone once its metrics are cached.
    #[serde(default)]
    pub prune_checkouts: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            repos_dir: default_repos_dir(),
            cache_dir: default_cache_dir(),
            concurrency: default_concurrency(),
            timeout_seconds: 0,
            prune_checkouts: false,
        }
    }
}

fn default_repos_dir() -> PathBuf {
    PathBuf::from("repos")
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("analyzed")
}

fn default_concurrency() -> usize {
    8
}

/// GitHub API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubConfig {
    /// Organization whose repositories are counted.
    #[serde(default)]
    pub organization: Option<String>,

    /// API endpoint (override for GitHub Enterprise).
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Username for HTTPS clone authentication.
    #[serde(default)]
    pub user: Option<String>,

    /// Access token. Only ever taken from the environment or the CLI.
    #[serde(skip)]
    pub token: Option<String>,

    /// Repositories requested per API page.
    #[serde(default = "default_per_page")]
    pub per_page: u32,

    /// HTTP request timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            organization: None,
            endpoint: default_endpoint(),
            user: None,
            token: None,
            per_page: default_per_page(),
            request_timeout_seconds: default_request_timeout(),
        }
    }
}

fn default_endpoint() -> String {
    "https://api.github.com".to_string()
}

fn default_per_page() -> u32 {
    100
}

fn default_request_timeout() -> u64 {
    30
}

/// File scanner settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerConfig {
    /// Directory or file names to skip.
    #[serde(default = "default_excludes")]
    pub excludes: Vec<String>,

    /// Maximum file size in bytes.
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            excludes: default_excludes(),
            max_file_size: default_max_file_size(),
        }
    }
}

fn default_excludes() -> Vec<String> {
    vec![".git".to_string()]
}

fn default_max_file_size() -> u64 {
    10 * 1024 * 1024 // 10MB
}

/// Credentials and target needed to talk to GitHub.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub organization: String,
    pub token: String,
    pub user: Option<String>,
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>, ConfigError> {
        let default_path = Path::new(CONFIG_FILE_NAME);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments (and the environment variables clap maps onto them)
    /// take precedence over config file settings.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref org) = args.org {
            self.github.organization = Some(org.clone());
        }
        if let Some(ref endpoint) = args.endpoint {
            self.github.endpoint = endpoint.clone();
        }
        if let Some(ref user) = args.user {
            self.github.user = Some(user.clone());
        }
        if let Some(ref token) = args.token {
            self.github.token = Some(token.clone());
        }

        if let Some(concurrency) = args.concurrency {
            self.general.concurrency = concurrency;
        }
        if let Some(timeout) = args.timeout {
            self.general.timeout_seconds = timeout;
        }
        if let Some(ref dir) = args.repos_dir {
            self.general.repos_dir = dir.clone();
        }
        if let Some(ref dir) = args.cache_dir {
            self.general.cache_dir = dir.clone();
        }
        if args.prune {
            self.general.prune_checkouts = true;
        }
    }

    /// Check settings that do not depend on credentials.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.general.concurrency == 0 {
            return Err(ConfigError::Invalid(
                "concurrency must be at least 1".to_string(),
            ));
        }
        if !(1..=100).contains(&self.github.per_page) {
            return Err(ConfigError::Invalid(
                "github.per_page must be between 1 and 100".to_string(),
            ));
        }
        if !self.github.endpoint.starts_with("http://")
            && !self.github.endpoint.starts_with("https://")
        {
            return Err(ConfigError::Invalid(format!(
                "endpoint must start with 'http://' or 'https://': {}",
                self.github.endpoint
            )));
        }
        Ok(())
    }

    /// Resolve the credentials, failing on the first missing setting.
    pub fn credentials(&self) -> Result<Credentials, ConfigError> {
        let token = non_empty(&self.github.token).ok_or(ConfigError::Missing {
            setting: "access token",
            env: "GITHUB_TOKEN",
            flag: "token",
        })?;
        let organization = non_empty(&self.github.organization).ok_or(ConfigError::Missing {
            setting: "organization",
            env: "GITHUB_ORG",
            flag: "org",
        })?;

        Ok(Credentials {
            organization,
            token,
            user: non_empty(&self.github.user),
        })
    }

    /// Organization name for report headers, if known.
    pub fn organization(&self) -> Option<&str> {
        self.github
            .organization
            .as_deref()
            .filter(|o| !o.trim().is_empty())
    }

    /// Overall deadline for the pipeline.
    pub fn deadline(&self) -> Option<Duration> {
        match self.general.timeout_seconds {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}
