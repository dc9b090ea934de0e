//! Chart repository backends
//!
//! This module provides:
//! - Classification of repository references into backend kinds
//! - Classic Helm repository backend (`index.yaml`)
//! - OCI registry backend (Docker Registry API v2 tag listing)
//! - Git backend (remote tags, `Chart.yaml` at HEAD)
//! - `ChartResolver`, which dispatches to a backend and applies the version constraint

mod git;
mod index;
mod oci;

pub use git::{tag_to_version, GitBackend};
pub use index::IndexBackend;
pub use oci::{parse_reference, OciBackend, EXCLUDED_TAGS};

use crate::credentials::CredentialStore;
use crate::domain::{ChartSource, VersionConstraint};
use crate::error::ResolveError;
use crate::http::HttpClient;
use crate::version::{select_latest_with_constraint, ConstraintResult};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Hosts whose http(s) URLs are treated as git repositories
const GIT_HOSTS: &[&str] = &["github.com", "gitlab.com", "bitbucket.org", "gitea"];

/// Kind of repository a reference points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// Classic Helm repository serving `index.yaml`
    Index,
    /// OCI registry exposing the tag-list API
    Registry,
    /// Git repository with version tags
    Git,
}

impl BackendKind {
    /// Classifies a repository reference without any I/O
    ///
    /// Self-hosted git servers on unrecognized domains are not detected
    /// unless the reference ends in `.git` or uses the `git@` form.
    pub fn classify(repository: &str) -> Self {
        let lower = repository.trim().to_ascii_lowercase();

        if lower.ends_with(".git") || lower.starts_with("git@") {
            return BackendKind::Git;
        }

        let has_http_scheme = lower.starts_with("http://") || lower.starts_with("https://");
        if !has_http_scheme {
            return BackendKind::Registry;
        }

        if GIT_HOSTS.iter().any(|host| lower.contains(host)) {
            return BackendKind::Git;
        }

        BackendKind::Index
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Index => "index",
            BackendKind::Registry => "registry",
            BackendKind::Git => "git",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trait for chart repository backends
#[async_trait]
pub trait RepositoryBackend: Send + Sync {
    /// Get the kind of repository this backend handles
    fn kind(&self) -> BackendKind;

    /// List candidate version strings for a chart
    ///
    /// The returned strings are not yet validated as semantic versions.
    async fn list_versions(
        &self,
        cancel: &CancellationToken,
        repository: &str,
        chart: &str,
    ) -> Result<Vec<String>, ResolveError>;
}

/// Create a repository backend for the given kind
pub fn create_backend(
    kind: BackendKind,
    client: HttpClient,
    credentials: Arc<CredentialStore>,
) -> Box<dyn RepositoryBackend> {
    match kind {
        BackendKind::Index => Box::new(IndexBackend::new(client, credentials)),
        BackendKind::Registry => Box::new(OciBackend::new(client, credentials)),
        BackendKind::Git => Box::new(GitBackend::new(credentials)),
    }
}

/// Resolves the latest version of a chart under a constraint
#[async_trait]
pub trait VersionResolver: Send + Sync {
    async fn resolve(
        &self,
        cancel: &CancellationToken,
        chart: &ChartSource,
        constraint: VersionConstraint,
    ) -> Result<ConstraintResult, ResolveError>;
}

/// Dispatches a chart to its backend and selects the latest version
pub struct ChartResolver {
    index: Box<dyn RepositoryBackend>,
    registry: Box<dyn RepositoryBackend>,
    git: Box<dyn RepositoryBackend>,
}

impl ChartResolver {
    /// Create a resolver with one backend per kind
    pub fn new(client: HttpClient, credentials: Arc<CredentialStore>) -> Self {
        Self {
            index: create_backend(BackendKind::Index, client.clone(), Arc::clone(&credentials)),
            registry: create_backend(BackendKind::Registry, client.clone(), Arc::clone(&credentials)),
            git: create_backend(BackendKind::Git, client, credentials),
        }
    }

    /// Create a resolver from explicit backends
    pub fn with_backends(
        index: Box<dyn RepositoryBackend>,
        registry: Box<dyn RepositoryBackend>,
        git: Box<dyn RepositoryBackend>,
    ) -> Self {
        Self {
            index,
            registry,
            git,
        }
    }

    fn backend(&self, kind: BackendKind) -> &dyn RepositoryBackend {
        match kind {
            BackendKind::Index => self.index.as_ref(),
            BackendKind::Registry => self.registry.as_ref(),
            BackendKind::Git => self.git.as_ref(),
        }
    }
}

#[async_trait]
impl VersionResolver for ChartResolver {
    async fn resolve(
        &self,
        cancel: &CancellationToken,
        chart: &ChartSource,
        constraint: VersionConstraint,
    ) -> Result<ConstraintResult, ResolveError> {
        if cancel.is_cancelled() {
            return Err(ResolveError::Cancelled);
        }

        let kind = BackendKind::classify(&chart.repository_url);
        debug!(
            repo = %chart.repository_url,
            chart = %chart.package_name,
            backend = %kind,
            "resolving chart version"
        );

        let versions = self
            .backend(kind)
            .list_versions(cancel, &chart.repository_url, &chart.package_name)
            .await?;

        debug!(
            chart = %chart.package_name,
            candidates = versions.len(),
            "retrieved candidate versions"
        );

        select_latest_with_constraint(&versions, &chart.pinned_version, constraint)
    }
}
