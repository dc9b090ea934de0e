//! Table output formatter for human-readable display
//!
//! This module provides:
//! - Summary counts
//! - Update listing with semantic version change type (major/minor/patch)
//! - Up-to-date applications that have updates outside the constraint
//! - Skipped applications with reasons

use crate::domain::{ApplicationCheckResult, CategorizedResults};
use crate::output::OutputFormatter;
use crate::version::parse_lenient;
use colored::Colorize;
use std::io::Write;

const WIDTH: usize = 80;

/// Semantic version change type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionChangeType {
    /// Major version change (breaking)
    Major,
    /// Minor version change (features)
    Minor,
    /// Patch version change (fixes)
    Patch,
    /// Unknown or unparseable
    Unknown,
}

impl VersionChangeType {
    /// Determine the change type between two versions
    pub fn from_versions(old: &str, new: &str) -> Self {
        match (parse_lenient(old), parse_lenient(new)) {
            (Some(old), Some(new)) => {
                if new.major != old.major {
                    VersionChangeType::Major
                } else if new.minor != old.minor {
                    VersionChangeType::Minor
                } else {
                    VersionChangeType::Patch
                }
            }
            _ => VersionChangeType::Unknown,
        }
    }

    /// Get the display label with color
    pub fn colored_label(&self) -> String {
        match self {
            VersionChangeType::Major => "major".red().bold().to_string(),
            VersionChangeType::Minor => "minor".yellow().to_string(),
            VersionChangeType::Patch => "patch".green().to_string(),
            VersionChangeType::Unknown => "?".dimmed().to_string(),
        }
    }

    /// Get the plain label
    pub fn label(&self) -> &'static str {
        match self {
            VersionChangeType::Major => "major",
            VersionChangeType::Minor => "minor",
            VersionChangeType::Patch => "patch",
            VersionChangeType::Unknown => "?",
        }
    }
}

/// Table formatter for human-readable output
pub struct TableFormatter {
    /// Whether to use colors
    color: bool,
}

impl TableFormatter {
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    fn heading(&self, title: &str, writer: &mut dyn Write) -> std::io::Result<()> {
        writeln!(writer)?;
        writeln!(writer, "{}", "-".repeat(WIDTH))?;
        if self.color {
            writeln!(writer, "{}", title.bold())?;
        } else {
            writeln!(writer, "{}", title)?;
        }
        writeln!(writer, "{}", "-".repeat(WIDTH))
    }

    fn application_header(
        &self,
        result: &ApplicationCheckResult,
        writer: &mut dyn Write,
    ) -> std::io::Result<()> {
        writeln!(writer)?;
        if self.color {
            writeln!(writer, "Application: {}", result.app_name.bright_white().bold())?;
        } else {
            writeln!(writer, "Application: {}", result.app_name)?;
        }
        writeln!(writer, "  Project: {}", result.project)?;
        writeln!(writer, "  Chart: {}", result.chart_name)
    }

    fn format_update(
        &self,
        result: &ApplicationCheckResult,
        writer: &mut dyn Write,
    ) -> std::io::Result<()> {
        self.application_header(result, writer)?;
        let change = VersionChangeType::from_versions(&result.current_version, &result.latest_version);
        if self.color {
            writeln!(
                writer,
                "  Version: {} {} {} [{}]",
                result.current_version.dimmed(),
                "→".dimmed(),
                result.latest_version.bright_white().bold(),
                change.colored_label()
            )?;
        } else {
            writeln!(
                writer,
                "  Version: {} -> {} [{}]",
                result.current_version,
                result.latest_version,
                change.label()
            )?;
        }
        if result.constraint_applied.is_restrictive() {
            writeln!(writer, "  Version Constraint: {}", result.constraint_applied)?;
        }
        if result.has_update_outside_constraint && !result.latest_version_all.is_empty() {
            writeln!(
                writer,
                "  Note: Version {} available outside constraint",
                result.latest_version_all
            )?;
        }
        writeln!(writer, "  Repository: {}", result.repo_url)
    }

    fn format_outside(
        &self,
        result: &ApplicationCheckResult,
        writer: &mut dyn Write,
    ) -> std::io::Result<()> {
        self.application_header(result, writer)?;
        writeln!(writer, "  Current Version: {}", result.current_version)?;
        writeln!(
            writer,
            "  Status: Up to date within '{}' constraint",
            result.constraint_applied
        )?;
        if !result.latest_version_all.is_empty() {
            writeln!(
                writer,
                "  Note: Version {} available outside constraint",
                result.latest_version_all
            )?;
        }
        writeln!(writer, "  Repository: {}", result.repo_url)
    }

    fn format_error(
        &self,
        result: &ApplicationCheckResult,
        writer: &mut dyn Write,
    ) -> std::io::Result<()> {
        self.application_header(result, writer)?;
        writeln!(writer, "  Repository: {}", result.repo_url)?;
        let reason = result.error.as_deref().unwrap_or_default();
        if self.color {
            writeln!(writer, "  Reason: {}", reason.red())
        } else {
            writeln!(writer, "  Reason: {}", reason)
        }
    }
}

impl OutputFormatter for TableFormatter {
    fn format(&self, results: &CategorizedResults, writer: &mut dyn Write) -> std::io::Result<()> {
        let stats = &results.stats;

        writeln!(writer)?;
        writeln!(writer, "{}", "=".repeat(WIDTH))?;
        writeln!(writer, "CHARTWATCH SCAN RESULTS")?;
        writeln!(writer, "{}", "=".repeat(WIDTH))?;
        writeln!(writer)?;
        writeln!(writer, "Total applications checked: {}", stats.total)?;
        writeln!(writer)?;
        if self.color {
            writeln!(writer, "Up to date: {}", stats.up_to_date.to_string().green())?;
            writeln!(
                writer,
                "Updates available: {}",
                stats.updates_available.to_string().yellow()
            )?;
            writeln!(writer, "Skipped: {}", stats.skipped.to_string().red())?;
        } else {
            writeln!(writer, "Up to date: {}", stats.up_to_date)?;
            writeln!(writer, "Updates available: {}", stats.updates_available)?;
            writeln!(writer, "Skipped: {}", stats.skipped)?;
        }

        if !results.updates_available.is_empty() {
            self.heading("APPLICATIONS WITH UPDATES AVAILABLE:", writer)?;
            for result in &results.updates_available {
                self.format_update(result, writer)?;
            }
        }

        if !results.up_to_date_with_constraint.is_empty() {
            self.heading("UP TO DATE (with updates outside constraint):", writer)?;
            for result in &results.up_to_date_with_constraint {
                self.format_outside(result, writer)?;
            }
        }

        if !results.errors.is_empty() {
            self.heading("APPLICATIONS SKIPPED (Unable to check):", writer)?;
            for result in &results.errors {
                self.format_error(result, writer)?;
            }
        }

        writeln!(writer)?;
        writeln!(writer, "{}", "=".repeat(WIDTH))?;
        writeln!(writer)
    }
}
