//! Applications and source descriptors reported by the control plane

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// One source descriptor of an application
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationSource {
    /// Source name, only set on multi-source applications
    pub name: String,
    /// Repository URL or registry reference
    pub repo_url: String,
    /// Chart name for chart repositories
    pub chart: String,
    /// Path inside a git repository
    pub path: String,
    /// Pinned chart version or git revision
    pub target_revision: String,
    /// Whether the source carries Helm parameters
    pub helm: bool,
}

impl ApplicationSource {
    /// A source is chart-bearing when it names a chart or carries Helm parameters
    pub fn is_chart_bearing(&self) -> bool {
        !self.chart.is_empty() || self.helm
    }

    /// Chart name for chart repositories, falling back to the path for git-hosted charts
    pub fn package_name(&self) -> &str {
        if self.chart.is_empty() && !self.path.is_empty() {
            &self.path
        } else {
            &self.chart
        }
    }
}

/// An application deployed by the control plane
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    pub name: String,
    pub project: String,
    /// Labels attached to the application
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    /// One entry for single-source applications
    pub sources: Vec<ApplicationSource>,
}

impl Application {
    /// Creates a single-source application
    pub fn new(name: impl Into<String>, project: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            project: project.into(),
            labels: BTreeMap::new(),
            sources: Vec::new(),
        }
    }

    /// Adds a source descriptor
    pub fn with_source(mut self, source: ApplicationSource) -> Self {
        self.sources.push(source);
        self
    }

    /// Finds the chart-bearing source to check
    ///
    /// A single source is used when it is chart-bearing. Among multiple
    /// sources the one named `source_name` wins, otherwise the first
    /// chart-bearing one. Returns `None` for applications without a chart.
    pub fn chart_source(&self, source_name: &str) -> Option<ChartSource> {
        let source = match self.sources.as_slice() {
            [] => None,
            [single] => Some(single).filter(|s| s.is_chart_bearing()),
            many => {
                let named = (!source_name.is_empty())
                    .then(|| {
                        many.iter()
                            .find(|s| s.name == source_name && s.is_chart_bearing())
                    })
                    .flatten();
                if let Some(source) = named {
                    debug!(app = %self.name, source_name = %source.name, "found matching Helm source by name");
                    Some(source)
                } else {
                    let fallback = many.iter().find(|s| s.is_chart_bearing());
                    if let Some(source) = fallback {
                        debug!(app = %self.name, source_name = %source.name, "found Helm source (fallback)");
                    }
                    fallback
                }
            }
        }?;

        Some(ChartSource {
            repository_url: source.repo_url.clone(),
            package_name: source.package_name().to_string(),
            pinned_version: source.target_revision.clone(),
        })
    }
}

/// The chart reference extracted from an application source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartSource {
    pub repository_url: String,
    pub package_name: String,
    pub pinned_version: String,
}

/// Filter applied when listing applications
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationFilter {
    /// Projects to include, `*` for all
    pub projects: Vec<String>,
    /// Application names to include, `*` for all
    pub names: Vec<String>,
    /// Label selector pairs
    pub labels: BTreeMap<String, String>,
}

impl Default for ApplicationFilter {
    fn default() -> Self {
        Self {
            projects: vec!["*".to_string()],
            names: vec!["*".to_string()],
            labels: BTreeMap::new(),
        }
    }
}

impl ApplicationFilter {
    /// Projects to send to the server, empty when all are requested
    pub fn project_query(&self) -> &[String] {
        if is_wildcard(&self.projects) {
            &[]
        } else {
            &self.projects
        }
    }

    /// Single application name the server can filter on
    pub fn single_name(&self) -> Option<&str> {
        match self.names.as_slice() {
            [name] if name != "*" => Some(name),
            _ => None,
        }
    }

    /// Label selector in `k=v,k=v` form, `None` without labels
    pub fn label_selector(&self) -> Option<String> {
        if self.labels.is_empty() {
            return None;
        }
        Some(
            self.labels
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<_>>()
                .join(","),
        )
    }

    /// Client-side name check, needed when more than one name is requested
    pub fn matches_name(&self, name: &str) -> bool {
        if self.names.len() <= 1 || is_wildcard(&self.names) {
            return true;
        }
        self.names.iter().any(|n| n == name)
    }
}

fn is_wildcard(values: &[String]) -> bool {
    values.is_empty() || values.iter().any(|v| v == "*")
}
