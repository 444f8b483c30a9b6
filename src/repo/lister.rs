//! GitHub organization repository listing.
//!
//! Talks to the GitHub REST API (or a GitHub Enterprise endpoint) and
//! returns the clone URL of every repository in an organization.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info};

/// Repository entry as returned by `GET /orgs/{org}/repos`.
#[derive(Debug, Deserialize)]
struct RemoteRepository {
    clone_url: String,
}

/// Minimal GitHub API client.
pub struct GitHubClient {
    http_client: reqwest::Client,
    endpoint: String,
    organization: String,
    token: String,
    per_page: u32,
}

impl GitHubClient {
    /// Create a client for one organization.
    pub fn new(
        endpoint: &str,
        organization: &str,
        token: &str,
        per_page: u32,
        timeout: Duration,
    ) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("orgcloc/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http_client,
            endpoint: api_base(endpoint),
            organization: organization.to_string(),
            token: token.to_string(),
            per_page,
        })
    }

    /// URL of one page of the organization's repository listing.
    fn page_url(&self, page: u32) -> String {
        format!(
            "{}/orgs/{}/repos?type=all&per_page={}&page={}",
            self.endpoint, self.organization, self.per_page, page
        )
    }

    /// Fetch one page of repositories.
    async fn fetch_page(&self, page: u32) -> Result<Vec<RemoteRepository>> {
        let url = self.page_url(page);
        debug!("GET {}", url);

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(&self.token)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .send()
            .await
            .with_context(|| format!("Failed to list repositories of {}", self.organization))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!(
                "Listing repositories of {} failed with {}: {}",
                self.organization,
                status,
                body.trim()
            );
        }

        response
            .json::<Vec<RemoteRepository>>()
            .await
            .with_context(|| format!("Invalid repository listing for {}", self.organization))
    }

    /// List the clone URL of every repository, following pagination.
    ///
    /// The result is de-duplicated, keeping first-seen order.
    pub async fn list_repositories(&self) -> Result<Vec<String>> {
        let mut pages = Vec::new();
        let mut page = 1;

        loop {
            let entries = self.fetch_page(page).await?;
            let last = is_last_page(entries.len(), self.per_page);
            pages.push(entries.into_iter().map(|r| r.clone_url).collect::<Vec<_>>());
            if last {
                break;
            }
            page += 1;
        }

        let locations = dedup_locations(pages.into_iter().flatten());
        info!(
            "Found {} repositories in {}",
            locations.len(),
            self.organization
        );
        Ok(locations)
    }
}

/// REST base URL for an endpoint.
///
/// GitHub Enterprise serves the API under `/api/v3`; a bare host gets that
/// suffix appended. `api.github.com` is used as given.
fn api_base(endpoint: &str) -> String {
    let base = endpoint.trim_end_matches('/');
    let host = base
        .split("://")
        .nth(1)
        .unwrap_or(base)
        .split('/')
        .next()
        .unwrap_or_default();

    if host.eq_ignore_ascii_case("api.github.com") || base.ends_with("/api/v3") {
        base.to_string()
    } else if base.ends_with("/api") {
        format!("{}/v3", base)
    } else {
        format!("{}/api/v3", base)
    }
}

/// A page shorter than the requested size is the last one.
fn is_last_page(len: usize, per_page: u32) -> bool {
    len < per_page as usize
}

/// Remove duplicate locations, keeping first-seen order.
pub fn dedup_locations(locations: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    locations
        .into_iter()
        .filter(|l| seen.insert(l.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(endpoint: &str) -> GitHubClient {
        GitHubClient::new(endpoint, "acme", "t0ken", 100, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_page_url_default_endpoint() {
        let c = client("https://api.github.com");
        assert_eq!(
            c.page_url(2),
            "https://api.github.com/orgs/acme/repos?type=all&per_page=100&page=2"
        );
    }

    #[test]
    fn test_page_url_enterprise_endpoint() {
        let c = client("https://ghe.example.com/api/v3/");
        assert_eq!(
            c.page_url(1),
            "https://ghe.example.com/api/v3/orgs/acme/repos?type=all&per_page=100&page=1"
        );
    }

    #[test]
    fn test_page_url_enterprise_bare_host() {
        let c = client("https://ghe.example.com");
        assert_eq!(
            c.page_url(1),
            "https://ghe.example.com/api/v3/orgs/acme/repos?type=all&per_page=100&page=1"
        );
    }

    #[test]
    fn test_api_base() {
        assert_eq!(api_base("https://api.github.com/"), "https://api.github.com");
        assert_eq!(api_base("https://ghe.example.com/"), "https://ghe.example.com/api/v3");
        assert_eq!(api_base("https://ghe.example.com/api/"), "https://ghe.example.com/api/v3");
        assert_eq!(api_base("https://ghe.example.com/api/v3"), "https://ghe.example.com/api/v3");
        assert_eq!(api_base("http://127.0.0.1:8080"), "http://127.0.0.1:8080/api/v3");
    }

    #[test]
    fn test_is_last_page() {
        assert!(is_last_page(0, 100));
        assert!(is_last_page(99, 100));
        assert!(!is_last_page(100, 100));
    }

    #[test]
    fn test_dedup_locations() {
        let locations = vec![
            "https://github.com/acme/a.git".to_string(),
            "https://github.com/acme/b.git".to_string(),
            "https://github.com/acme/a.git".to_string(),
        ];
        assert_eq!(
            dedup_locations(locations),
            vec![
                "https://github.com/acme/a.git".to_string(),
                "https://github.com/acme/b.git".to_string(),
            ]
        );
    }

    #[test]
    fn test_parse_listing() {
        let body = r#"[{"id": 1, "name": "a", "clone_url": "https://github.com/acme/a.git"}]"#;
        let repos: Vec<RemoteRepository> = serde_json::from_str(body).unwrap();
        assert_eq!(repos[0].clone_url, "https://github.com/acme/a.git");
    }

    /// Serve canned JSON pages on a local port, one response per connection.
    async fn serve_pages(status: u16, pages: Vec<&'static str>) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let pages = pages.clone();
                tokio::spawn(async move {
                    let mut request = Vec::new();
                    let mut buf = [0u8; 1024];
                    loop {
                        let n = socket.read(&mut buf).await.unwrap_or(0);
                        if n == 0 {
                            break;
                        }
                        request.extend_from_slice(&buf[..n]);
                        if request.windows(4).any(|w| w == b"\r\n\r\n") {
                            break;
                        }
                    }

                    let request = String::from_utf8_lossy(&request);
                    let page: usize = request
                        .split("&page=")
                        .nth(1)
                        .and_then(|rest| rest.split(|c: char| !c.is_ascii_digit()).next())
                        .and_then(|n| n.parse().ok())
                        .unwrap_or(1);
                    let body = pages.get(page - 1).copied().unwrap_or("[]");
                    let response = format!(
                        "HTTP/1.1 {} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                        status,
                        body.len(),
                        body
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                });
            }
        });

        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_list_repositories_follows_pages() {
        let endpoint = serve_pages(
            200,
            vec![
                r#"[{"clone_url": "https://github.com/acme/a.git"}, {"clone_url": "https://github.com/acme/b.git"}]"#,
                r#"[{"clone_url": "https://github.com/acme/a.git"}, {"clone_url": "https://github.com/acme/c.git"}]"#,
            ],
        )
        .await;

        let c = GitHubClient::new(&endpoint, "acme", "t0ken", 2, Duration::from_secs(5)).unwrap();
        let locations = c.list_repositories().await.unwrap();

        assert_eq!(
            locations,
            vec![
                "https://github.com/acme/a.git".to_string(),
                "https://github.com/acme/b.git".to_string(),
                "https://github.com/acme/c.git".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_list_repositories_http_error() {
        let endpoint = serve_pages(401, vec![r#"{"message": "Bad credentials"}"#]).await;

        let c = GitHubClient::new(&endpoint, "acme", "bad", 100, Duration::from_secs(5)).unwrap();
        let err = c.list_repositories().await.unwrap_err();

        assert!(err.to_string().contains("401"));
    }
}
