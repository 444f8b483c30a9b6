//! Line counter for checked-out repositories.
//!
//! This module walks a directory, detects each file's language and
//! classifies every line as code, comment or blank.

pub mod languages;

use crate::error::AnalysisError;
use crate::models::LineCounts;
use languages::Language;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use walkdir::WalkDir;

/// Bytes inspected when deciding whether a file is binary.
const BINARY_SNIFF_LEN: usize = 8 * 1024;

/// Counts lines per language under a directory.
pub trait CodeCounter: Send + Sync {
    fn count(
        &self,
        directory: &Path,
        cancel: &CancellationToken,
    ) -> Result<HashMap<String, LineCounts>, AnalysisError>;
}

/// Configuration for file scanning.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Directory or file names to skip (e.g., [".git", "node_modules"])
    pub excludes: Vec<String>,
    /// Maximum file size in bytes
    pub max_file_size: u64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self::from(&crate::config::ScannerConfig::default())
    }
}

impl From<&crate::config::ScannerConfig> for ScanConfig {
    fn from(config: &crate::config::ScannerConfig) -> Self {
        Self {
            excludes: config.excludes.clone(),
            max_file_size: config.max_file_size,
        }
    }
}

/// Walks a directory tree and counts lines of every recognized file.
pub struct LineCounter {
    config: ScanConfig,
}

impl LineCounter {
    /// Create a new line counter.
    pub fn new(config: ScanConfig) -> Self {
        Self { config }
    }

    /// Check if a name matches exclusion patterns.
    fn is_excluded(&self, name: &str) -> bool {
        self.config.excludes.iter().any(|pattern| name == pattern)
    }

    /// Count a single file. Returns `None` for binary content.
    fn count_file(path: &Path, language: &Language) -> std::io::Result<Option<LineCounts>> {
        let bytes = fs::read(path)?;
        let sniff = &bytes[..bytes.len().min(BINARY_SNIFF_LEN)];
        if sniff.contains(&0) {
            return Ok(None);
        }

        let content = String::from_utf8_lossy(&bytes);
        Ok(Some(classify_lines(&content, language)))
    }
}

impl CodeCounter for LineCounter {
    fn count(
        &self,
        directory: &Path,
        cancel: &CancellationToken,
    ) -> Result<HashMap<String, LineCounts>, AnalysisError> {
        if !directory.is_dir() {
            return Err(AnalysisError::NotADirectory(directory.to_path_buf()));
        }

        let mut totals: HashMap<String, LineCounts> = HashMap::new();
        let walker = WalkDir::new(directory)
            .follow_links(false)
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !self.is_excluded(&e.file_name().to_string_lossy()));

        for entry in walker {
            if cancel.is_cancelled() {
                return Err(AnalysisError::Cancelled);
            }

            let entry = match entry {
                Ok(e) => e,
                Err(e) if e.depth() == 0 => return Err(e.into()),
                Err(e) => {
                    debug!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            let Some(language) = languages::detect(entry.path()) else {
                continue;
            };

            match entry.metadata() {
                Ok(meta) if meta.len() > self.config.max_file_size => {
                    debug!("Skipping large file: {}", entry.path().display());
                    continue;
                }
                Ok(_) => {}
                Err(e) => {
                    debug!("Cannot stat {}: {}", entry.path().display(), e);
                    continue;
                }
            }

            match Self::count_file(entry.path(), language) {
                Ok(Some(counts)) => {
                    *totals.entry(language.name.to_string()).or_default() += counts;
                }
                Ok(None) => debug!("Skipping binary file: {}", entry.path().display()),
                Err(e) => debug!("Failed to read {}: {}", entry.path().display(), e),
            }
        }

        Ok(totals)
    }
}

/// Classify the lines of one file. The result always counts one file.
pub fn classify_lines(content: &str, language: &Language) -> LineCounts {
    let mut counts = LineCounts {
        files: 1,
        ..LineCounts::default()
    };
    let mut in_block: Option<&str> = None;

    for line in content.lines() {
        let trimmed = line.trim();

        if trimmed.is_empty() {
            counts.blank += 1;
            continue;
        }

        if let Some(end) = in_block {
            counts.comment += 1;
            if trimmed.contains(end) {
                in_block = None;
            }
            continue;
        }

        if let Some((start, end)) = language.block_comment {
            if let Some(rest) = trimmed.strip_prefix(start) {
                counts.comment += 1;
                if !rest.contains(end) {
                    in_block = Some(end);
                }
                continue;
            }
        }

        if language
            .line_comments
            .iter()
            .any(|marker| trimmed.starts_with(marker))
        {
            counts.comment += 1;
            continue;
        }

        counts.code += 1;

        // Code followed by the start of a block comment, e.g. `x = 1; /* note`
        if let Some((start, end)) = language.block_comment {
            if start != end {
                if let Some(idx) = find_unquoted(trimmed, start) {
                    if !trimmed[idx + start.len()..].contains(end) {
                        in_block = Some(end);
                    }
                }
            }
        }
    }

    counts
}

/// Position of `pattern` in `line`, ignoring double-quoted string spans.
fn find_unquoted(line: &str, pattern: &str) -> Option<usize> {
    let mut in_string = false;
    let mut escaped = false;

    for (idx, ch) in line.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        if ch == '"' {
            in_string = true;
            continue;
        }
        if line[idx..].starts_with(pattern) {
            return Some(idx);
        }
    }

    None
}
