//! Git repository backend
//!
//! Versions are inferred from remote tags. Tags are listed without cloning;
//! reading a declared `Chart.yaml` version needs a shallow clone of HEAD.

use crate::credentials::{normalize_host, CredentialStore, Credentials};
use crate::error::ResolveError;
use crate::registry::{BackendKind, RepositoryBackend};
use crate::version::parse_lenient;
use async_trait::async_trait;
use git2::{Cred, CredentialType, Direction, FetchOptions, RemoteCallbacks};
use serde::Deserialize;
use std::cell::Cell;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Generic tag prefixes stripped after a leading `v`
const TAG_PREFIXES: &[&str] = &["release-", "chart-"];

/// Git repository backend
pub struct GitBackend {
    credentials: Arc<CredentialStore>,
}

#[derive(Debug, Deserialize)]
struct ChartMetadata {
    #[serde(default)]
    name: String,
    #[serde(default)]
    version: Option<String>,
}

/// Turns a tag name into a version string
///
/// With a chart path, tags of the form `<chart-base-name>-v1.2.3` are
/// recognized first. Otherwise a leading `v` and then `release-` or
/// `chart-` are stripped.
pub fn tag_to_version(tag: &str, chart_path: &str) -> String {
    if let Some(base) = Path::new(chart_path).file_name().and_then(|n| n.to_str()) {
        if let Some(rest) = tag.strip_prefix(base).and_then(|r| r.strip_prefix('-')) {
            return rest.strip_prefix('v').unwrap_or(rest).to_string();
        }
    }

    let mut version = tag.strip_prefix('v').unwrap_or(tag);
    for prefix in TAG_PREFIXES {
        version = version.strip_prefix(prefix).unwrap_or(version);
    }
    version.to_string()
}

/// Version strings derived from tags, invalid ones dropped
fn versions_from_tags(tags: &[String], chart_path: &str) -> Vec<String> {
    tags.iter()
        .filter_map(|tag| {
            let version = tag_to_version(tag, chart_path);
            if parse_lenient(&version).is_some() {
                Some(version)
            } else {
                debug!(tag = %tag, "skipping non-semver tag");
                None
            }
        })
        .collect()
}

/// Registers a credentials callback that answers at most once
fn auth_callbacks<'a>(
    credentials: Option<&'a Credentials>,
    requested: &'a Cell<bool>,
) -> RemoteCallbacks<'a> {
    let mut callbacks = RemoteCallbacks::new();
    callbacks.credentials(move |_url, _username, allowed| {
        if requested.replace(true) {
            return Err(git2::Error::from_str("credentials rejected"));
        }
        match credentials {
            Some(creds) if allowed.contains(CredentialType::USER_PASS_PLAINTEXT) => {
                Cred::userpass_plaintext(&creds.username, &creds.password)
            }
            _ => Err(git2::Error::from_str("no credentials configured")),
        }
    });
    callbacks
}

fn git_error(
    repository: &str,
    action: &str,
    error: git2::Error,
    auth_requested: bool,
    credentials: Option<&Credentials>,
) -> ResolveError {
    if auth_requested || error.code() == git2::ErrorCode::Auth {
        return ResolveError::authentication(normalize_host(repository), 401, credentials.is_some());
    }
    ResolveError::git(repository, format!("failed to {}: {}", action, error.message()))
}

/// Lists remote tag names, peeled duplicates removed
fn list_remote_tags(
    repository: &str,
    credentials: Option<&Credentials>,
) -> Result<Vec<String>, ResolveError> {
    let requested = Cell::new(false);
    let mut remote = git2::Remote::create_detached(repository)
        .map_err(|e| ResolveError::git(repository, e.message().to_string()))?;

    let callbacks = auth_callbacks(credentials, &requested);
    let connection = remote
        .connect_auth(Direction::Fetch, Some(callbacks), None)
        .map_err(|e| git_error(repository, "connect", e, requested.get(), credentials))?;

    let heads = connection
        .list()
        .map_err(|e| git_error(repository, "list tags", e, false, credentials))?;

    let mut tags: Vec<String> = Vec::new();
    for head in heads {
        let Some(tag) = head.name().strip_prefix("refs/tags/") else {
            continue;
        };
        let tag = tag.trim_end_matches("^{}");
        if !tags.iter().any(|t| t == tag) {
            tags.push(tag.to_string());
        }
    }
    Ok(tags)
}

fn is_local(repository: &str) -> bool {
    repository.starts_with("file://") || Path::new(repository).is_absolute()
}

/// Shallow-clones HEAD and reads `<chart_path>/Chart.yaml`
fn read_chart_version(
    repository: &str,
    chart_path: &str,
    credentials: Option<&Credentials>,
    cancel: &CancellationToken,
) -> Result<String, ResolveError> {
    let workdir = tempfile::Builder::new()
        .prefix("chartwatch-git-")
        .tempdir()
        .map_err(|e| ResolveError::git(repository, format!("failed to create temp directory: {}", e)))?;

    let requested = Cell::new(false);
    let mut callbacks = auth_callbacks(credentials, &requested);
    callbacks.transfer_progress(|_| !cancel.is_cancelled());

    let mut fetch = FetchOptions::new();
    fetch.remote_callbacks(callbacks);
    if !is_local(repository) {
        fetch.depth(1);
    }

    let clone = git2::build::RepoBuilder::new()
        .fetch_options(fetch)
        .clone(repository, workdir.path());
    if cancel.is_cancelled() {
        return Err(ResolveError::Cancelled);
    }
    clone.map_err(|e| git_error(repository, "clone repository", e, requested.get(), credentials))?;

    let chart_file = workdir.path().join(chart_path).join("Chart.yaml");
    let data = std::fs::read_to_string(&chart_file)
        .map_err(|e| ResolveError::git(repository, format!("failed to read Chart.yaml: {}", e)))?;

    declared_version(&data, repository)
}

/// Extracts the `version` field of a `Chart.yaml` document as written
fn declared_version(data: &str, repository: &str) -> Result<String, ResolveError> {
    let chart: ChartMetadata = serde_yaml::from_str(data).map_err(|e| {
        ResolveError::invalid_response(repository, format!("failed to parse Chart.yaml: {}", e))
    })?;

    let version = chart.version.unwrap_or_default();
    if version.is_empty() {
        return Err(ResolveError::invalid_response(repository, "no version found in Chart.yaml"));
    }

    debug!(repo = %repository, chart = %chart.name, version = %version, "found version from Chart.yaml");
    Ok(version)
}

impl GitBackend {
    /// Create a new git backend
    pub fn new(credentials: Arc<CredentialStore>) -> Self {
        Self { credentials }
    }

    /// Reads the version declared in `<chart_path>/Chart.yaml` at HEAD
    pub async fn read_declared_version(
        &self,
        cancel: &CancellationToken,
        repository: &str,
        chart_path: &str,
    ) -> Result<String, ResolveError> {
        debug!(repo = %repository, chart_path = %chart_path, "fetching chart version from Chart.yaml");
        let credentials = self.credentials.get(repository).cloned();
        let repo = repository.to_string();
        let path = chart_path.to_string();
        let token = cancel.clone();

        let task = tokio::task::spawn_blocking(move || {
            read_chart_version(&repo, &path, credentials.as_ref(), &token)
        });

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ResolveError::Cancelled),
            joined = task => joined.map_err(|e| ResolveError::git(repository, format!("clone task failed: {}", e)))?,
        }
    }
}

#[async_trait]
impl RepositoryBackend for GitBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Git
    }

    async fn list_versions(
        &self,
        cancel: &CancellationToken,
        repository: &str,
        chart: &str,
    ) -> Result<Vec<String>, ResolveError> {
        debug!(repo = %repository, chart_path = %chart, "fetching versions from git tags");
        let credentials = self.credentials.get(repository).cloned();
        let repo = repository.to_string();

        let task = tokio::task::spawn_blocking(move || list_remote_tags(&repo, credentials.as_ref()));

        let tags = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ResolveError::Cancelled),
            joined = task => joined
                .map_err(|e| ResolveError::git(repository, format!("tag listing task failed: {}", e)))??,
        };

        let versions = versions_from_tags(&tags, chart);
        if versions.is_empty() {
            return Err(ResolveError::NoValidVersions);
        }

        debug!(repo = %repository, total_versions = versions.len(), "found versions from git tags");
        Ok(versions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_to_version_generic() {
        assert_eq!(tag_to_version("v1.2.3", ""), "1.2.3");
        assert_eq!(tag_to_version("release-1.2.3", ""), "1.2.3");
        assert_eq!(tag_to_version("chart-1.2.3", ""), "1.2.3");
        assert_eq!(tag_to_version("vrelease-2.0.0", ""), "2.0.0");
        assert_eq!(tag_to_version("1.0.0", ""), "1.0.0");
    }

    #[test]
    fn test_tag_to_version_chart_prefix() {
        assert_eq!(tag_to_version("myapp-v1.2.3", "charts/myapp"), "1.2.3");
        assert_eq!(tag_to_version("myapp-1.2.3", "charts/myapp"), "1.2.3");
        assert_eq!(tag_to_version("v2.0.0", "charts/myapp"), "2.0.0");
        assert_eq!(tag_to_version("other-1.0.0", "charts/myapp"), "other-1.0.0");
    }

    #[test]
    fn test_versions_from_tags() {
        let tags: Vec<String> = ["v1.0.0", "myapp-v1.1.0", "nightly", "other-2.0.0", "release-0.9.0"]
            .iter()
            .map(|t| t.to_string())
            .collect();
        let versions = versions_from_tags(&tags, "charts/myapp");
        assert_eq!(versions, vec!["1.0.0", "1.1.0", "0.9.0"]);
    }

    #[test]
    fn test_declared_version_keeps_text() {
        let version = declared_version("apiVersion: v2\nname: app\nversion: 1.10\n", "repo").unwrap();
        assert_eq!(version, "1.10");

        let version = declared_version("name: app\nversion: \"2.0.0\"\n", "repo").unwrap();
        assert_eq!(version, "2.0.0");
    }

    #[test]
    fn test_declared_version_missing() {
        let err = declared_version("name: app\n", "repo").unwrap_err();
        assert!(matches!(err, ResolveError::InvalidResponse { .. }));
    }

    #[test]
    fn test_is_local() {
        assert!(is_local("file:///tmp/repo"));
        assert!(is_local("/tmp/repo"));
        assert!(!is_local("https://github.com/org/repo.git"));
    }

    #[test]
    fn test_git_error_auth_mapping() {
        let creds = Credentials {
            username: "u".to_string(),
            password: "p".to_string(),
            source: "config".to_string(),
        };
        let err = git_error(
            "https://github.com/org/repo.git",
            "connect",
            git2::Error::from_str("boom"),
            true,
            Some(&creds),
        );
        assert!(matches!(err, ResolveError::AuthenticationRejected { ref registry, .. } if registry == "github.com"));

        let err = git_error("https://github.com/org/repo.git", "connect", git2::Error::from_str("boom"), false, None);
        assert!(matches!(err, ResolveError::Git { .. }));
    }
}
