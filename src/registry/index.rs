//! Classic Helm repository backend
//!
//! Fetches `<repository>/index.yaml` and lists the versions recorded for a chart.

use crate::credentials::CredentialStore;
use crate::error::ResolveError;
use crate::http::{HttpClient, RequestError};
use crate::registry::{BackendKind, RepositoryBackend};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

const INDEX_ACCEPT: &str = "application/x-yaml, application/yaml, text/yaml";

/// Classic Helm repository backend
pub struct IndexBackend {
    client: HttpClient,
    credentials: Arc<CredentialStore>,
}

/// Relevant part of a repository `index.yaml`
#[derive(Debug, Deserialize)]
struct HelmIndex {
    #[serde(default)]
    entries: Option<HashMap<String, Vec<IndexEntry>>>,
}

#[derive(Debug, Deserialize)]
struct IndexEntry {
    /// Plain scalars keep their text, so `1.10` stays `1.10`
    #[serde(default)]
    version: Option<String>,
}

impl IndexBackend {
    /// Create a new index backend
    pub fn new(client: HttpClient, credentials: Arc<CredentialStore>) -> Self {
        Self {
            client,
            credentials,
        }
    }

    /// Build the index URL, defaulting to https for bare hosts
    pub fn build_url(repository: &str) -> String {
        let repository = repository.trim().trim_end_matches('/');
        if repository.starts_with("http://") || repository.starts_with("https://") {
            format!("{}/index.yaml", repository)
        } else {
            format!("https://{}/index.yaml", repository)
        }
    }
}

/// Extracts the listed versions of `chart` from an index document
fn versions_from_index(body: &str, repository: &str, chart: &str) -> Result<Vec<String>, ResolveError> {
    if looks_like_html(body) {
        return Err(ResolveError::not_helm(
            repository,
            "repository returned HTML instead of an index",
        ));
    }

    let index: HelmIndex = serde_yaml::from_str(body)
        .map_err(|e| ResolveError::invalid_response(repository, format!("failed to parse index.yaml: {}", e)))?;

    let entries = index
        .entries
        .as_ref()
        .and_then(|entries| entries.get(chart))
        .filter(|entries| !entries.is_empty())
        .ok_or_else(|| ResolveError::chart_not_found(chart, repository))?;

    Ok(entries.iter().filter_map(|entry| entry.version.clone()).collect())
}

fn looks_like_html(body: &str) -> bool {
    let head: String = body.trim_start().chars().take(16).collect::<String>().to_ascii_lowercase();
    head.starts_with("<!doctype") || head.starts_with("<html")
}

#[async_trait]
impl RepositoryBackend for IndexBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Index
    }

    async fn list_versions(
        &self,
        cancel: &CancellationToken,
        repository: &str,
        chart: &str,
    ) -> Result<Vec<String>, ResolveError> {
        let url = Self::build_url(repository);
        debug!(repo = %repository, chart = %chart, url = %url, "fetching Helm repository index");

        let credentials = self.credentials.get(repository);
        let response = self
            .client
            .get(cancel, &url, INDEX_ACCEPT, credentials)
            .await
            .map_err(|e| request_error(repository, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ResolveError::not_helm(
                repository,
                format!("repository does not provide index.yaml (status {})", status.as_u16()),
            ));
        }

        let is_html = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.contains("text/html"));
        if is_html {
            return Err(ResolveError::not_helm(
                repository,
                "repository returned HTML instead of YAML",
            ));
        }

        let body = self
            .client
            .text(cancel, response)
            .await
            .map_err(|e| request_error(repository, e))?;

        let versions = versions_from_index(&body, repository, chart)?;
        debug!(chart = %chart, count = versions.len(), "found chart versions in index");
        Ok(versions)
    }
}

fn request_error(repository: &str, error: RequestError) -> ResolveError {
    match error {
        RequestError::Cancelled => ResolveError::Cancelled,
        RequestError::Transport(e) => {
            ResolveError::unavailable(repository, format!("failed to fetch index: {}", e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    const INDEX: &str = r#"
apiVersion: v1
entries:
  nginx:
    - name: nginx
      version: 15.0.0
    - name: nginx
      version: "15.1.0"
    - name: nginx
      version: 14.2.1
  redis: []
generated: "2024-01-01T00:00:00Z"
"#;

    #[test]
    fn test_build_url() {
        assert_eq!(
            IndexBackend::build_url("https://charts.example.com/"),
            "https://charts.example.com/index.yaml"
        );
        assert_eq!(
            IndexBackend::build_url("charts.example.com/stable"),
            "https://charts.example.com/stable/index.yaml"
        );
        assert_eq!(
            IndexBackend::build_url("http://localhost:8080"),
            "http://localhost:8080/index.yaml"
        );
    }

    #[test]
    fn test_versions_from_index() {
        let versions = versions_from_index(INDEX, "repo", "nginx").unwrap();
        assert_eq!(versions, vec!["15.0.0", "15.1.0", "14.2.1"]);
    }

    #[test]
    fn test_versions_from_index_missing_chart() {
        let err = versions_from_index(INDEX, "repo", "postgres").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ChartNotFound);
    }

    #[test]
    fn test_versions_from_index_empty_chart() {
        let err = versions_from_index(INDEX, "repo", "redis").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ChartNotFound);
    }

    #[test]
    fn test_versions_from_index_no_entries() {
        let err = versions_from_index("apiVersion: v1\n", "repo", "nginx").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ChartNotFound);
    }

    #[test]
    fn test_versions_from_index_html_body() {
        let err = versions_from_index("<!DOCTYPE html><html></html>", "repo", "nginx").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotAHelmRepository);
    }

    #[test]
    fn test_versions_from_index_invalid_yaml() {
        let err = versions_from_index("entries: [unclosed", "repo", "nginx").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidResponse);
    }

    #[test]
    fn test_unquoted_version_keeps_trailing_zero() {
        let index = "entries:\n  app:\n    - version: 1.10\n    - version: 1.9\n";
        let versions = versions_from_index(index, "repo", "app").unwrap();
        assert_eq!(versions, vec!["1.10", "1.9"]);
    }
}
