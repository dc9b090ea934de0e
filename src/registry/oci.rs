//! OCI registry backend
//!
//! Lists chart tags through the Docker Registry HTTP API v2.
//! API endpoint: {scheme}://{host}/v2/{path}/{chart}/tags/list

use crate::credentials::CredentialStore;
use crate::error::ResolveError;
use crate::http::{HttpClient, RequestError};
use crate::registry::{BackendKind, RepositoryBackend};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Tags that never name a chart version
pub const EXCLUDED_TAGS: &[&str] = &["latest", "dev", "main", "master", "stable"];

/// OCI registry backend
pub struct OciBackend {
    client: HttpClient,
    credentials: Arc<CredentialStore>,
}

/// Tag list response
#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    tags: Option<Vec<String>>,
}

/// Splits a registry reference into host and repository path
///
/// `oci://ghcr.io/org/charts/` yields `("ghcr.io", "org/charts")`;
/// a bare host yields an empty path.
pub fn parse_reference(repository: &str) -> (String, String) {
    let trimmed = repository.trim();
    let trimmed = trimmed.strip_prefix("oci://").unwrap_or(trimmed);
    let trimmed = trimmed.trim_end_matches('/');
    match trimmed.split_once('/') {
        Some((host, path)) => (host.to_string(), path.to_string()),
        None => (trimmed.to_string(), String::new()),
    }
}

/// Loopback registries are reached over plain http
fn is_loopback(host: &str) -> bool {
    let name = if let Some(rest) = host.strip_prefix('[') {
        rest.split(']').next().unwrap_or(rest)
    } else if host.matches(':').count() > 1 {
        host
    } else {
        host.split(':').next().unwrap_or(host)
    };
    matches!(name, "localhost" | "127.0.0.1" | "::1")
}

impl OciBackend {
    /// Create a new OCI backend
    pub fn new(client: HttpClient, credentials: Arc<CredentialStore>) -> Self {
        Self {
            client,
            credentials,
        }
    }

    /// Build the tag-list URL for a chart
    pub fn build_url(repository: &str, chart: &str) -> String {
        let (host, path) = parse_reference(repository);
        let full_path = if path.is_empty() {
            chart.to_string()
        } else {
            format!("{}/{}", path, chart)
        };
        let scheme = if is_loopback(&host) { "http" } else { "https" };
        format!("{}://{}/v2/{}/tags/list", scheme, host, full_path)
    }
}

/// Drops tags that never name a version
fn filter_tags(tags: Vec<String>) -> Vec<String> {
    tags.into_iter()
        .filter(|tag| !EXCLUDED_TAGS.contains(&tag.as_str()))
        .collect()
}

#[async_trait]
impl RepositoryBackend for OciBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Registry
    }

    async fn list_versions(
        &self,
        cancel: &CancellationToken,
        repository: &str,
        chart: &str,
    ) -> Result<Vec<String>, ResolveError> {
        let (registry, _) = parse_reference(repository);
        let url = Self::build_url(repository, chart);
        debug!(repo = %repository, chart = %chart, url = %url, "fetching tags from OCI registry");

        let credentials = self.credentials.get(&registry);
        if let Some(creds) = credentials {
            debug!(registry = %registry, source = %creds.source, username = %creds.username, "using authentication for OCI registry");
        }

        let response = self
            .client
            .get(cancel, &url, "application/json", credentials)
            .await
            .map_err(|e| match e {
                RequestError::Cancelled => ResolveError::Cancelled,
                RequestError::Transport(e) => ResolveError::unavailable(
                    repository,
                    format!("failed to fetch tags from OCI registry: {}", e),
                ),
            })?;

        let status = response.status();
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(ResolveError::authentication(
                    registry,
                    status.as_u16(),
                    credentials.is_some(),
                ));
            }
            StatusCode::NOT_FOUND => return Err(ResolveError::chart_not_found(chart, repository)),
            StatusCode::OK => {}
            other => {
                return Err(ResolveError::unavailable(
                    repository,
                    format!("OCI registry returned status {}", other.as_u16()),
                ));
            }
        }

        let body = self.client.text(cancel, response).await.map_err(|e| match e {
            RequestError::Cancelled => ResolveError::Cancelled,
            RequestError::Transport(e) => ResolveError::unavailable(
                repository,
                format!("failed to read response body: {}", e),
            ),
        })?;

        let parsed: TagsResponse = serde_json::from_str(&body).map_err(|e| {
            ResolveError::invalid_response(repository, format!("failed to parse tags response: {}", e))
        })?;

        let tags = filter_tags(parsed.tags.unwrap_or_default());
        if tags.is_empty() {
            return Err(ResolveError::NoValidVersions);
        }

        debug!(chart = %chart, tags_count = tags.len(), "retrieved tags from OCI registry");
        Ok(tags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_reference() {
        assert_eq!(
            parse_reference("ghcr.io/myorg/charts"),
            ("ghcr.io".to_string(), "myorg/charts".to_string())
        );
        assert_eq!(
            parse_reference("oci://harbor.company.com/helm/"),
            ("harbor.company.com".to_string(), "helm".to_string())
        );
        assert_eq!(
            parse_reference("registry.example.com"),
            ("registry.example.com".to_string(), String::new())
        );
    }

    #[test]
    fn test_build_url() {
        assert_eq!(
            OciBackend::build_url("oci://ghcr.io/org/charts", "nginx"),
            "https://ghcr.io/v2/org/charts/nginx/tags/list"
        );
        assert_eq!(
            OciBackend::build_url("registry.example.com", "nginx"),
            "https://registry.example.com/v2/nginx/tags/list"
        );
        assert_eq!(
            OciBackend::build_url("localhost:5000/charts", "nginx"),
            "http://localhost:5000/v2/charts/nginx/tags/list"
        );
    }

    #[test]
    fn test_is_loopback() {
        assert!(is_loopback("localhost"));
        assert!(is_loopback("127.0.0.1:5000"));
        assert!(is_loopback("[::1]:5000"));
        assert!(!is_loopback("ghcr.io"));
        assert!(!is_loopback("localhost.example.com"));
    }

    #[test]
    fn test_filter_tags() {
        let tags = vec!["1.21.0", "1.20.0", "latest", "dev", "stable", "main", "master"]
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(filter_tags(tags), vec!["1.21.0", "1.20.0"]);
    }
}
