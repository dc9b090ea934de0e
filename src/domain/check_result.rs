//! Per-application check result

use super::{ChartSource, VersionConstraint};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of checking a single application
///
/// An instance with an empty `app_name` marks an application without a
/// chart-bearing source. Such results are excluded from every count.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationCheckResult {
    pub app_name: String,
    pub project: String,
    pub chart_name: String,
    /// Version pinned in the application source
    pub current_version: String,
    /// Latest version within the constraint
    pub latest_version: String,
    pub repo_url: String,
    pub has_update: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub constraint_applied: VersionConstraint,
    pub has_update_outside_constraint: bool,
    /// Latest version ignoring the constraint
    #[serde(skip_serializing_if = "String::is_empty")]
    pub latest_version_all: String,
}

impl ApplicationCheckResult {
    /// Result for an application that has nothing to check
    pub fn not_applicable() -> Self {
        Self::default()
    }

    /// Starts a result for the given application and chart
    pub fn new(
        app_name: impl Into<String>,
        project: impl Into<String>,
        chart: &ChartSource,
        constraint: VersionConstraint,
    ) -> Self {
        Self {
            app_name: app_name.into(),
            project: project.into(),
            chart_name: chart.package_name.clone(),
            current_version: chart.pinned_version.clone(),
            repo_url: chart.repository_url.clone(),
            constraint_applied: constraint,
            ..Self::default()
        }
    }

    /// Returns true for the "no chart-bearing source" marker
    pub fn is_not_applicable(&self) -> bool {
        self.app_name.is_empty()
    }

    /// Returns true if resolution failed
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

impl fmt::Display for ApplicationCheckResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(error) = &self.error {
            write!(f, "{}: skipped ({})", self.app_name, error)
        } else if self.has_update {
            write!(
                f,
                "{}: {} {} → {}",
                self.app_name, self.chart_name, self.current_version, self.latest_version
            )
        } else {
            write!(
                f,
                "{}: {} {} (up to date)",
                self.app_name, self.chart_name, self.current_version
            )
        }
    }
}
