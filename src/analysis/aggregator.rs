//! Organization-wide aggregation.
//!
//! Runs after the pipeline barrier on a single thread. Merging is
//! field-wise addition keyed by language name, so the result does not
//! depend on the order repositories are visited in.

use crate::models::{OrganizationAggregate, RepositoryMetrics};

/// Merge per-repository metrics into organization totals.
pub fn aggregate(repositories: &[RepositoryMetrics]) -> OrganizationAggregate {
    let mut org = OrganizationAggregate::default();
    for repo in repositories {
        org.add_repository(repo);
    }
    org
}

/// Repositories that contribute at least one language, sorted by name.
pub fn reportable_repositories(repositories: &[RepositoryMetrics]) -> Vec<&RepositoryMetrics> {
    let mut repos: Vec<&RepositoryMetrics> =
        repositories.iter().filter(|r| !r.is_empty()).collect();
    repos.sort_by(|a, b| a.name.cmp(&b.name));
    repos
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LineCounts;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn repo(name: &str, langs: &[(&str, u64, u64)]) -> RepositoryMetrics {
        let raw: HashMap<String, LineCounts> = langs
            .iter()
            .map(|(lang, files, code)| {
                (
                    lang.to_string(),
                    LineCounts {
                        files: *files,
                        code: *code,
                        comment: code / 4,
                        blank: code / 8,
                    },
                )
            })
            .collect();
        RepositoryMetrics::from_counts(name, raw)
    }

    fn fixture() -> Vec<RepositoryMetrics> {
        vec![
            repo("api", &[("Go", 10, 1000), ("Shell", 2, 40)]),
            repo("web", &[("TypeScript", 30, 2500), ("CSS", 4, 300), ("Go", 1, 20)]),
            repo("infra", &[("HCL", 6, 400), ("Shell", 3, 90)]),
            repo("docs", &[]),
            repo("ml", &[("Python", 12, 900), ("Markdown", 0, 0)]),
        ]
    }

    #[test]
    fn test_aggregate_sums_languages() {
        let org = aggregate(&fixture());

        assert_eq!(org.per_language["Go"].files, 11);
        assert_eq!(org.per_language["Go"].code, 1020);
        assert_eq!(org.per_language["Shell"].code, 130);
        assert!(!org.per_language.contains_key("Markdown"));
        assert_eq!(org.total.code, 1000 + 40 + 2500 + 300 + 20 + 400 + 90 + 900);
    }

    #[test]
    fn test_total_matches_language_sum() {
        let org = aggregate(&fixture());

        let mut sum = LineCounts::default();
        for counts in org.per_language.values() {
            sum += counts;
        }
        assert_eq!(sum, org.total);
    }

    #[test]
    fn test_aggregate_is_order_independent() {
        let forward = fixture();
        let mut reversed = fixture();
        reversed.reverse();
        let mut rotated = fixture();
        rotated.rotate_left(2);

        let expected = aggregate(&forward);
        assert_eq!(aggregate(&reversed), expected);
        assert_eq!(aggregate(&rotated), expected);
    }

    #[test]
    fn test_aggregate_is_additive() {
        let all = fixture();
        let expected = aggregate(&all);

        for split in 0..=all.len() {
            let (left, right) = all.split_at(split);
            let mut merged = aggregate(left);
            merged.merge(&aggregate(right));
            assert_eq!(merged, expected, "split at {}", split);
        }
    }

    #[test]
    fn test_aggregate_empty() {
        let org = aggregate(&[]);
        assert!(org.per_language.is_empty());
        assert!(org.total.is_zero());
    }

    #[test]
    fn test_reportable_repositories_skip_empty() {
        let repos = fixture();
        let names: Vec<_> = reportable_repositories(&repos)
            .iter()
            .map(|r| r.name.as_str())
            .collect();
        assert_eq!(names, vec!["api", "infra", "ml", "web"]);
    }
}
