//! Output formatting for scan results
//!
//! This module provides:
//! - Table output for human-readable display
//! - JSON output for machine processing
//! - Markdown output for reports and pull request comments

mod json;
mod markdown;
mod table;

pub use json::JsonFormatter;
pub use markdown::MarkdownFormatter;
pub use table::{TableFormatter, VersionChangeType};

use crate::domain::CategorizedResults;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;
use std::str::FromStr;

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable table output
    #[default]
    Table,
    /// JSON output for machine processing
    Json,
    /// Markdown report
    Markdown,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Table => "table",
            OutputFormat::Json => "json",
            OutputFormat::Markdown => "markdown",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" | "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            "markdown" => Ok(OutputFormat::Markdown),
            other => Err(ConfigError::InvalidOutputFormat {
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trait for output formatters
pub trait OutputFormatter {
    /// Format and write categorized scan results
    fn format(&self, results: &CategorizedResults, writer: &mut dyn Write) -> std::io::Result<()>;
}

/// Create an output formatter for the given format
pub fn create_formatter(format: OutputFormat, color: bool) -> Box<dyn OutputFormatter> {
    match format {
        OutputFormat::Table => Box::new(TableFormatter::new(color)),
        OutputFormat::Json => Box::new(JsonFormatter::new()),
        OutputFormat::Markdown => Box::new(MarkdownFormatter::new()),
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::domain::{ApplicationCheckResult, CategorizedResults, VersionConstraint};

    pub fn sample() -> CategorizedResults {
        let update = ApplicationCheckResult {
            app_name: "web".to_string(),
            project: "default".to_string(),
            chart_name: "nginx".to_string(),
            current_version: "1.2.0".to_string(),
            latest_version: "1.5.0".to_string(),
            repo_url: "https://charts.example.com".to_string(),
            has_update: true,
            constraint_applied: VersionConstraint::Minor,
            has_update_outside_constraint: true,
            latest_version_all: "2.1.0".to_string(),
            ..Default::default()
        };
        let outside = ApplicationCheckResult {
            app_name: "cache".to_string(),
            project: "platform".to_string(),
            chart_name: "redis".to_string(),
            current_version: "7.2.0".to_string(),
            latest_version: "7.2.0".to_string(),
            repo_url: "oci://registry.example.com/charts".to_string(),
            constraint_applied: VersionConstraint::Minor,
            has_update_outside_constraint: true,
            latest_version_all: "8.0.0".to_string(),
            ..Default::default()
        };
        let current = ApplicationCheckResult {
            app_name: "queue".to_string(),
            project: "platform".to_string(),
            chart_name: "rabbitmq".to_string(),
            current_version: "12.0.0".to_string(),
            latest_version: "12.0.0".to_string(),
            repo_url: "https://charts.example.com".to_string(),
            ..Default::default()
        };
        let failed = ApplicationCheckResult {
            app_name: "db".to_string(),
            project: "default".to_string(),
            chart_name: "postgres".to_string(),
            current_version: "12.0.0".to_string(),
            repo_url: "https://charts.example.com".to_string(),
            error: Some("chart 'postgres' not found".to_string()),
            ..Default::default()
        };
        CategorizedResults::from_results(&[update, outside, current, failed])
    }
}
