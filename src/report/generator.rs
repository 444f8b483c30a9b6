//! Report generation.
//!
//! Renders the organization aggregate followed by one section per
//! repository, either as a fixed-width text table or as JSON.

use crate::analysis::reportable_repositories;
use crate::models::{
    sort_languages, LanguageMetric, LineCounts, OrganizationAggregate, RepositoryMetrics,
};
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;

const RULE_WIDTH: usize = 79;
const HEADER_WIDTH: usize = 28;
const COLUMNS: &str = "files          blank        comment           code";

fn rule() -> String {
    "-".repeat(RULE_WIDTH)
}

fn format_row(name: &str, counts: &LineCounts) -> String {
    format!(
        "{:<27} {:>6} {:>14} {:>14} {:>14}\n",
        name, counts.files, counts.blank, counts.comment, counts.code
    )
}

/// Generate the text report.
pub fn render_text(
    organization: &str,
    aggregate: &OrganizationAggregate,
    repositories: &[RepositoryMetrics],
) -> String {
    let mut output = String::new();
    let rule = format!("{}\n", rule());

    // Organization summary
    output.push_str(&rule);
    output.push_str(&format!(
        "{:<width$} {}\n",
        "Language",
        COLUMNS,
        width = HEADER_WIDTH
    ));
    output.push_str(&rule);
    for lang in aggregate.sorted_languages() {
        output.push_str(&format_row(&lang.name, &lang.counts));
    }
    output.push_str(&rule);
    output.push_str(&format_row("TOTAL", &aggregate.total));
    output.push_str(&rule);

    // Per-repository sections
    for repo in reportable_repositories(repositories) {
        output.push_str(&format!("{}/{}\n--\n", organization, repo.name));
        for lang in sorted(&repo.languages) {
            output.push_str(&format_row(&lang.name, &lang.counts));
        }
        output.push_str(&rule);
    }

    output
}

/// Languages in report order, whatever order they were stored in.
fn sorted(languages: &[LanguageMetric]) -> Vec<LanguageMetric> {
    let mut languages = languages.to_vec();
    sort_languages(&mut languages);
    languages
}

#[derive(Serialize)]
struct JsonReport<'a> {
    organization: &'a str,
    generated_at: DateTime<Utc>,
    languages: Vec<LanguageMetric>,
    total: LineCounts,
    repositories: Vec<&'a RepositoryMetrics>,
}

/// Generate a JSON report.
pub fn render_json(
    organization: &str,
    aggregate: &OrganizationAggregate,
    repositories: &[RepositoryMetrics],
) -> Result<String> {
    let report = JsonReport {
        organization,
        generated_at: Utc::now(),
        languages: aggregate.sorted_languages(),
        total: aggregate.total,
        repositories: reportable_repositories(repositories),
    };
    serde_json::to_string_pretty(&report).map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::aggregate;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn counts(files: u64, code: u64) -> LineCounts {
        LineCounts {
            files,
            code,
            comment: 3,
            blank: 2,
        }
    }

    fn repositories() -> Vec<RepositoryMetrics> {
        let mut web = HashMap::new();
        web.insert("Python".to_string(), counts(2, 100));
        web.insert("Rust".to_string(), counts(1, 50));

        let mut api = HashMap::new();
        api.insert("Go".to_string(), counts(3, 100));

        vec![
            RepositoryMetrics::from_counts("web", web),
            RepositoryMetrics::from_counts("empty", HashMap::new()),
            RepositoryMetrics::from_counts("api", api),
        ]
    }

    #[test]
    fn test_render_text_layout() {
        let repos = repositories();
        let text = render_text("acme", &aggregate(&repos), &repos);
        let lines: Vec<&str> = text.lines().collect();
        let rule = "-".repeat(79);

        assert_eq!(lines[0], rule);
        assert_eq!(
            lines[1],
            "Language                     files          blank        comment           code"
        );
        assert_eq!(lines[2], rule);
        assert!(lines[3].starts_with("Go "));
        assert!(lines[4].starts_with("Python "));
        assert!(lines[5].starts_with("Rust "));
        assert_eq!(lines[6], rule);
        assert_eq!(
            lines[7],
            format!("{:<27} {:>6} {:>14} {:>14} {:>14}", "TOTAL", 6, 6, 9, 250)
        );
        assert_eq!(lines[8], rule);
        assert_eq!(lines[9], "acme/api");
        assert_eq!(lines[10], "--");
    }

    #[test]
    fn test_render_text_row_format() {
        let repos = repositories();
        let text = render_text("acme", &aggregate(&repos), &repos);

        assert!(text.contains(&format!(
            "{:<27} {:>6} {:>14} {:>14} {:>14}\n",
            "Go", 3, 2, 3, 100
        )));
    }

    #[test]
    fn test_render_text_skips_empty_repositories() {
        let repos = repositories();
        let text = render_text("acme", &aggregate(&repos), &repos);

        assert!(!text.contains("acme/empty"));
        let api = text.find("acme/api").unwrap();
        let web = text.find("acme/web").unwrap();
        assert!(api < web);
    }

    #[test]
    fn test_render_text_sorts_stored_rows() {
        let unsorted = RepositoryMetrics {
            name: "legacy".to_string(),
            languages: vec![
                LanguageMetric::new("Shell", counts(1, 10)),
                LanguageMetric::new("Rust", counts(1, 300)),
                LanguageMetric::new("C", counts(1, 300)),
            ],
            total: counts(3, 610),
        };
        let repos = vec![unsorted];
        let text = render_text("acme", &aggregate(&repos), &repos);

        let section: Vec<&str> = text
            .split("acme/legacy\n--\n")
            .nth(1)
            .unwrap()
            .lines()
            .take(3)
            .map(|l| l.split_whitespace().next().unwrap())
            .collect();
        assert_eq!(section, vec!["C", "Rust", "Shell"]);
    }

    #[test]
    fn test_render_text_without_repositories() {
        let text = render_text("acme", &OrganizationAggregate::default(), &[]);
        assert_eq!(text.lines().count(), 6);
        assert!(text.contains("TOTAL"));
    }

    #[test]
    fn test_render_json() {
        let repos = repositories();
        let json = render_json("acme", &aggregate(&repos), &repos).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["organization"], "acme");
        assert!(value["generated_at"].is_string());
        assert_eq!(value["languages"][0]["name"], "Go");
        assert_eq!(value["languages"][2]["name"], "Rust");
        assert_eq!(value["total"]["code"], 250);
        assert_eq!(value["repositories"].as_array().unwrap().len(), 2);
        assert_eq!(value["repositories"][0]["name"], "api");
    }
}
