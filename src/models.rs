//! Data models for the line counter.
//!
//! This module contains the metric types shared by the cache, the
//! aggregator and the report generator.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::ops::AddAssign;

/// Line and file counters for one language (or a sum of languages).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LineCounts {
    /// Number of files.
    pub files: u64,
    /// Lines of code.
    pub code: u64,
    /// Comment lines.
    pub comment: u64,
    /// Blank lines.
    pub blank: u64,
}

impl LineCounts {
    /// Returns true when every counter is zero.
    #[cfg(test)]
    pub fn is_zero(&self) -> bool {
        *self == Self::default()
    }
}

impl AddAssign for LineCounts {
    fn add_assign(&mut self, other: Self) {
        self.files += other.files;
        self.code += other.code;
        self.comment += other.comment;
        self.blank += other.blank;
    }
}

impl AddAssign<&LineCounts> for LineCounts {
    fn add_assign(&mut self, other: &LineCounts) {
        *self += *other;
    }
}

/// One language's measurement for a repository or an aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageMetric {
    /// Language name as classified by the counter.
    pub name: String,
    /// Counters for this language.
    #[serde(flatten)]
    pub counts: LineCounts,
}

impl LanguageMetric {
    pub fn new(name: impl Into<String>, counts: LineCounts) -> Self {
        Self {
            name: name.into(),
            counts,
        }
    }
}

/// Order languages by descending code lines, then ascending name.
pub fn compare_languages(a: &LanguageMetric, b: &LanguageMetric) -> Ordering {
    b.counts
        .code
        .cmp(&a.counts.code)
        .then_with(|| a.name.cmp(&b.name))
}

/// Sort languages in report order.
pub fn sort_languages(languages: &mut [LanguageMetric]) {
    languages.sort_by(compare_languages);
}

/// Metrics of a single repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryMetrics {
    /// Repository name (last path segment of its location).
    pub name: String,
    /// Languages found, sorted in report order.
    pub languages: Vec<LanguageMetric>,
    /// Sum of all language counters.
    pub total: LineCounts,
}

impl RepositoryMetrics {
    /// Build repository metrics from raw counter output.
    ///
    /// Entries without files are dropped, the remainder is sorted in report
    /// order and totalled.
    pub fn from_counts(name: impl Into<String>, counts: HashMap<String, LineCounts>) -> Self {
        let mut languages: Vec<LanguageMetric> = counts
            .into_iter()
            .filter(|(_, c)| c.files > 0)
            .map(|(lang, c)| LanguageMetric::new(lang, c))
            .collect();
        sort_languages(&mut languages);

        let mut total = LineCounts::default();
        for lang in &languages {
            total += lang.counts;
        }

        Self {
            name: name.into(),
            languages,
            total,
        }
    }

    /// Returns true when no language was found.
    pub fn is_empty(&self) -> bool {
        self.languages.is_empty()
    }
}

/// Organization-wide totals.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationAggregate {
    /// Counters per language name.
    pub per_language: BTreeMap<String, LineCounts>,
    /// Sum of every repository total.
    pub total: LineCounts,
}

impl OrganizationAggregate {
    /// Add one repository's metrics.
    pub fn add_repository(&mut self, repo: &RepositoryMetrics) {
        for lang in &repo.languages {
            *self.per_language.entry(lang.name.clone()).or_default() += lang.counts;
        }
        self.total += repo.total;
    }

    /// Merge another aggregate into this one.
    pub fn merge(&mut self, other: &OrganizationAggregate) {
        for (name, counts) in &other.per_language {
            *self.per_language.entry(name.clone()).or_default() += counts;
        }
        self.total += other.total;
    }

    /// Languages in report order.
    pub fn sorted_languages(&self) -> Vec<LanguageMetric> {
        let mut languages: Vec<LanguageMetric> = self
            .per_language
            .iter()
            .map(|(name, counts)| LanguageMetric::new(name.clone(), *counts))
            .collect();
        sort_languages(&mut languages);
        languages
    }
}
