//! Argo CD REST client
//!
//! Authenticates with `POST /api/v1/session` and lists applications with
//! `GET /api/v1/applications`. Applications are mapped into the domain
//! `Application` shape with single and multi-source specs unified.

use crate::domain::{Application, ApplicationFilter, ApplicationSource};
use crate::error::ControlPlaneError;
use crate::http::{HttpClient, RequestError};
use async_trait::async_trait;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Source of the application inventory
#[async_trait]
pub trait ApplicationLister: Send + Sync {
    async fn list_applications(
        &self,
        cancel: &CancellationToken,
        filter: &ApplicationFilter,
    ) -> Result<Vec<Application>, ControlPlaneError>;
}

/// Authenticated Argo CD API client
pub struct ArgoCdClient {
    client: HttpClient,
    base_url: Url,
    token: String,
}

#[derive(Serialize)]
struct SessionRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct SessionResponse {
    #[serde(default)]
    token: String,
}

#[derive(Debug, Deserialize)]
struct ApplicationList {
    #[serde(default)]
    items: Option<Vec<ApplicationItem>>,
}

#[derive(Debug, Deserialize)]
struct ApplicationItem {
    #[serde(default)]
    metadata: Metadata,
    #[serde(default)]
    spec: Spec,
}

#[derive(Debug, Default, Deserialize)]
struct Metadata {
    #[serde(default)]
    name: String,
    #[serde(default)]
    labels: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Default, Deserialize)]
struct Spec {
    #[serde(default)]
    project: String,
    #[serde(default)]
    source: Option<Source>,
    #[serde(default)]
    sources: Option<Vec<Source>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Source {
    #[serde(default)]
    name: String,
    #[serde(default, rename = "repoURL")]
    repo_url: String,
    #[serde(default)]
    chart: String,
    #[serde(default)]
    path: String,
    #[serde(default)]
    target_revision: String,
    #[serde(default)]
    helm: Option<serde_json::Value>,
}

impl From<Source> for ApplicationSource {
    fn from(source: Source) -> Self {
        ApplicationSource {
            name: source.name,
            repo_url: source.repo_url,
            chart: source.chart,
            path: source.path,
            target_revision: source.target_revision,
            helm: source.helm.is_some_and(|h| !h.is_null()),
        }
    }
}

impl From<ApplicationItem> for Application {
    fn from(item: ApplicationItem) -> Self {
        let mut sources: Vec<ApplicationSource> = item
            .spec
            .sources
            .unwrap_or_default()
            .into_iter()
            .map(ApplicationSource::from)
            .collect();
        if sources.is_empty() {
            sources.extend(item.spec.source.map(ApplicationSource::from));
        }

        Application {
            name: item.metadata.name,
            project: item.spec.project,
            labels: item.metadata.labels.unwrap_or_default(),
            sources,
        }
    }
}

/// Parses the server address, defaulting to https
pub fn parse_server_url(server: &str) -> Result<Url, ControlPlaneError> {
    let server = server.trim().trim_end_matches('/');
    let with_scheme = if server.starts_with("http://") || server.starts_with("https://") {
        server.to_string()
    } else {
        format!("https://{}", server)
    };
    Url::parse(&with_scheme).map_err(|e| ControlPlaneError::Session {
        server: server.to_string(),
        message: format!("invalid server URL: {}", e),
    })
}

/// Decodes an application list response body
fn parse_application_list(body: &str) -> Result<Vec<Application>, ControlPlaneError> {
    let list: ApplicationList =
        serde_json::from_str(body).map_err(|e| ControlPlaneError::InvalidResponse {
            message: format!("failed to decode application list: {}", e),
        })?;
    Ok(list
        .items
        .unwrap_or_default()
        .into_iter()
        .map(Application::from)
        .collect())
}

fn endpoint(base: &Url, path: &str) -> Url {
    let mut url = base.clone();
    let prefix = url.path().trim_end_matches('/').to_string();
    url.set_path(&format!("{}{}", prefix, path));
    url
}

impl ArgoCdClient {
    /// Creates a session and returns an authenticated client
    pub async fn connect(
        cancel: &CancellationToken,
        server: &str,
        username: &str,
        password: &str,
        insecure: bool,
    ) -> Result<Self, ControlPlaneError> {
        info!(server = %server, username = %username, insecure, "creating Argo CD API client");

        let base_url = parse_server_url(server)?;
        let session_error = |message: String| ControlPlaneError::Session {
            server: server.to_string(),
            message,
        };

        let client = HttpClient::with_insecure(insecure)
            .map_err(|e| session_error(format!("failed to create HTTP client: {}", e)))?;

        let request = client
            .inner()
            .post(endpoint(&base_url, "/api/v1/session"))
            .json(&SessionRequest { username, password });
        let response = client.send(cancel, request).await.map_err(|e| match e {
            RequestError::Cancelled => ControlPlaneError::Cancelled,
            RequestError::Transport(e) => session_error(e.to_string()),
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(session_error(format!("status {}", status.as_u16())));
        }

        let body = client.text(cancel, response).await.map_err(|e| match e {
            RequestError::Cancelled => ControlPlaneError::Cancelled,
            RequestError::Transport(e) => session_error(e.to_string()),
        })?;
        let session: SessionResponse = serde_json::from_str(&body)
            .map_err(|e| session_error(format!("invalid session response: {}", e)))?;
        if session.token.is_empty() {
            return Err(session_error("empty session token".to_string()));
        }

        info!("successfully created Argo CD API client");
        Ok(Self {
            client,
            base_url,
            token: session.token,
        })
    }

    /// Builds the listing URL for a filter
    fn list_url(&self, filter: &ApplicationFilter) -> Url {
        build_list_url(&self.base_url, filter)
    }
}

fn build_list_url(base: &Url, filter: &ApplicationFilter) -> Url {
    let mut url = endpoint(base, "/api/v1/applications");
    {
        let mut query = url.query_pairs_mut();
        for project in filter.project_query() {
            query.append_pair("projects", project);
        }
        if let Some(name) = filter.single_name() {
            query.append_pair("name", name);
        }
        if let Some(selector) = filter.label_selector() {
            query.append_pair("selector", &selector);
        }
    }
    if url.query() == Some("") {
        url.set_query(None);
    }
    url
}

#[async_trait]
impl ApplicationLister for ArgoCdClient {
    async fn list_applications(
        &self,
        cancel: &CancellationToken,
        filter: &ApplicationFilter,
    ) -> Result<Vec<Application>, ControlPlaneError> {
        let url = self.list_url(filter);
        debug!(
            projects = ?filter.projects,
            app_names = ?filter.names,
            labels = ?filter.labels,
            url = %url,
            "listing Argo CD applications"
        );

        let request = self.client.inner().get(url).bearer_auth(&self.token);
        let response = self.client.send(cancel, request).await.map_err(|e| match e {
            RequestError::Cancelled => ControlPlaneError::Cancelled,
            RequestError::Transport(e) => ControlPlaneError::List {
                message: e.to_string(),
            },
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ControlPlaneError::List {
                message: format!("status {}", status.as_u16()),
            });
        }

        let body = self.client.text(cancel, response).await.map_err(|e| match e {
            RequestError::Cancelled => ControlPlaneError::Cancelled,
            RequestError::Transport(e) => ControlPlaneError::List {
                message: e.to_string(),
            },
        })?;

        let applications: Vec<Application> = parse_application_list(&body)?
            .into_iter()
            .filter(|app| filter.matches_name(&app.name))
            .collect();

        info!(count = applications.len(), "found applications");
        Ok(applications)
    }
}
