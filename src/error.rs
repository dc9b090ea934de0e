//! Application error types using thiserror
//!
//! Error hierarchy:
//! - ResolveError: Issues resolving a chart version from its repository
//! - ConfigError: Issues with configuration files, environment or flags
//! - ControlPlaneError: Issues talking to the Argo CD API
//! - NotifyError: Issues delivering notifications

use std::path::PathBuf;
use thiserror::Error;

/// Application-level error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration related errors
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Control plane related errors
    #[error(transparent)]
    ControlPlane(#[from] ControlPlaneError),

    /// Chart version resolution errors
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// Notification delivery errors
    #[error(transparent)]
    Notify(#[from] NotifyError),

    /// Failed to build an HTTP client
    #[error("failed to create HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// Failed to write the report
    #[error("failed to write report: {0}")]
    Output(#[from] std::io::Error),
}

/// Payload-free classification of a [`ResolveError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    ChartNotFound,
    AuthenticationFailed,
    NoValidVersions,
    EmptyInput,
    RepositoryUnavailable,
    NotAHelmRepository,
    Cancelled,
    InvalidResponse,
    Git,
}

/// Errors raised while resolving the latest version of a chart
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// Chart is not listed by the repository
    #[error("chart '{chart}' not found in repository {repository}")]
    ChartNotFound { chart: String, repository: String },

    /// Credentials were sent and rejected
    #[error("authentication failed for {registry} (status {status}): check the credentials configured for this host")]
    AuthenticationRejected { registry: String, status: u16 },

    /// Registry demanded credentials but none are configured
    #[error("{registry} requires authentication (status {status}) but no credentials were found: configure repository_auth or CW_AUTH_* variables for this host")]
    AuthenticationRequired { registry: String, status: u16 },

    /// None of the candidates parsed as a semantic version
    #[error("no valid semantic versions found")]
    NoValidVersions,

    /// Candidate list was empty
    #[error("no versions provided")]
    EmptyInput,

    /// Network failure or unexpected status
    #[error("repository {repository} unavailable: {message}")]
    RepositoryUnavailable { repository: String, message: String },

    /// Endpoint answered, but not with a chart index
    #[error("{repository} is not a Helm repository: {message}")]
    NotAHelmRepository { repository: String, message: String },

    /// Scan was cancelled while the request was in flight
    #[error("operation cancelled")]
    Cancelled,

    /// Response body could not be decoded
    #[error("invalid response from {repository}: {message}")]
    InvalidResponse { repository: String, message: String },

    /// Clone, fetch or tag listing failed
    #[error("git operation on {repository} failed: {message}")]
    Git { repository: String, message: String },
}

impl ResolveError {
    /// Returns the error kind without its payload
    pub fn kind(&self) -> ErrorKind {
        match self {
            ResolveError::ChartNotFound { .. } => ErrorKind::ChartNotFound,
            ResolveError::AuthenticationRejected { .. }
            | ResolveError::AuthenticationRequired { .. } => ErrorKind::AuthenticationFailed,
            ResolveError::NoValidVersions => ErrorKind::NoValidVersions,
            ResolveError::EmptyInput => ErrorKind::EmptyInput,
            ResolveError::RepositoryUnavailable { .. } => ErrorKind::RepositoryUnavailable,
            ResolveError::NotAHelmRepository { .. } => ErrorKind::NotAHelmRepository,
            ResolveError::Cancelled => ErrorKind::Cancelled,
            ResolveError::InvalidResponse { .. } => ErrorKind::InvalidResponse,
            ResolveError::Git { .. } => ErrorKind::Git,
        }
    }

    /// Creates a new ChartNotFound error
    pub fn chart_not_found(chart: impl Into<String>, repository: impl Into<String>) -> Self {
        ResolveError::ChartNotFound {
            chart: chart.into(),
            repository: repository.into(),
        }
    }

    /// Creates a new RepositoryUnavailable error
    pub fn unavailable(repository: impl Into<String>, message: impl Into<String>) -> Self {
        ResolveError::RepositoryUnavailable {
            repository: repository.into(),
            message: message.into(),
        }
    }

    /// Creates a new NotAHelmRepository error
    pub fn not_helm(repository: impl Into<String>, message: impl Into<String>) -> Self {
        ResolveError::NotAHelmRepository {
            repository: repository.into(),
            message: message.into(),
        }
    }

    /// Creates a new InvalidResponse error
    pub fn invalid_response(repository: impl Into<String>, message: impl Into<String>) -> Self {
        ResolveError::InvalidResponse {
            repository: repository.into(),
            message: message.into(),
        }
    }

    /// Creates a new Git error
    pub fn git(repository: impl Into<String>, message: impl Into<String>) -> Self {
        ResolveError::Git {
            repository: repository.into(),
            message: message.into(),
        }
    }

    /// Creates the authentication error matching whether credentials were sent
    pub fn authentication(registry: impl Into<String>, status: u16, tried: bool) -> Self {
        let registry = registry.into();
        if tried {
            ResolveError::AuthenticationRejected { registry, status }
        } else {
            ResolveError::AuthenticationRequired { registry, status }
        }
    }
}

/// Errors related to configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A required setting is missing
    #[error("{field} is required")]
    MissingField { field: &'static str },

    /// Unknown version constraint
    #[error("version_constraint must be one of: 'major', 'minor', 'patch' (got: '{value}')")]
    InvalidConstraint { value: String },

    /// Unknown output format
    #[error("output_format must be one of: 'table', 'json', 'markdown' (got: '{value}')")]
    InvalidOutputFormat { value: String },

    /// Unknown notification channel
    #[error("notification_channel must be one of: 'telegram', 'email', 'slack', 'teams', 'webhook' (got: '{value}')")]
    UnknownChannel { value: String },

    /// Channel selected without its settings
    #[error("{field} is required when notification_channel is '{channel}'")]
    MissingChannelSetting {
        channel: &'static str,
        field: &'static str,
    },

    /// Failed to read the config file
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid YAML/TOML
    #[error("failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },
}

/// Errors related to the Argo CD API
#[derive(Error, Debug)]
pub enum ControlPlaneError {
    /// Login was refused or failed
    #[error("failed to authenticate with Argo CD at {server}: {message}")]
    Session { server: String, message: String },

    /// Application listing failed
    #[error("failed to list applications: {message}")]
    List { message: String },

    /// Response body could not be decoded
    #[error("invalid response from Argo CD: {message}")]
    InvalidResponse { message: String },

    /// Cancelled before the request finished
    #[error("request to Argo CD cancelled")]
    Cancelled,
}

/// Errors related to notification delivery
#[derive(Error, Debug)]
pub enum NotifyError {
    /// Endpoint answered with a non-retryable status
    #[error("failed to send message: status {status}")]
    Status { status: u16 },

    /// Every attempt failed
    #[error("failed after {attempts} attempts: {message}")]
    RetriesExhausted { attempts: u32, message: String },

    /// Transport failure outside the retry loop
    #[error("failed to send request: {message}")]
    Request { message: String },

    /// Message could not be built or the SMTP exchange failed
    #[error("failed to send email: {message}")]
    Email { message: String },

    /// Cancelled while sending or backing off
    #[error("notification cancelled")]
    Cancelled,
}
