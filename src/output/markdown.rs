//! Markdown output formatter

use crate::domain::{ApplicationCheckResult, CategorizedResults};
use crate::output::OutputFormatter;
use std::io::Write;

/// Markdown formatter for reports
#[derive(Default)]
pub struct MarkdownFormatter;

impl MarkdownFormatter {
    pub fn new() -> Self {
        Self
    }

    fn table_start(result: &ApplicationCheckResult, writer: &mut dyn Write) -> std::io::Result<()> {
        writeln!(writer, "### {}", result.app_name)?;
        writeln!(writer)?;
        writeln!(writer, "| Field | Value |")?;
        writeln!(writer, "|-------|-------|")?;
        writeln!(writer, "| **Project** | {} |", result.project)?;
        writeln!(writer, "| **Chart** | {} |", result.chart_name)
    }
}

impl OutputFormatter for MarkdownFormatter {
    fn format(&self, results: &CategorizedResults, writer: &mut dyn Write) -> std::io::Result<()> {
        let stats = &results.stats;
        writeln!(writer, "# Chartwatch Scan Results")?;
        writeln!(writer)?;
        writeln!(writer, "## Summary")?;
        writeln!(writer)?;
        writeln!(writer, "- **Total applications checked:** {}", stats.total)?;
        writeln!(writer, "- **Up to date:** {}", stats.up_to_date)?;
        writeln!(writer, "- **Updates available:** {}", stats.updates_available)?;
        writeln!(writer, "- **Skipped:** {}", stats.skipped)?;
        writeln!(writer)?;

        if !results.updates_available.is_empty() {
            writeln!(writer, "## Applications with Updates Available")?;
            writeln!(writer)?;
            for result in &results.updates_available {
                Self::table_start(result, writer)?;
                writeln!(writer, "| **Current Version** | {} |", result.current_version)?;
                writeln!(writer, "| **Latest Version** | {} |", result.latest_version)?;
                if result.constraint_applied.is_restrictive() {
                    writeln!(writer, "| **Version Constraint** | {} |", result.constraint_applied)?;
                }
                if result.has_update_outside_constraint && !result.latest_version_all.is_empty() {
                    writeln!(writer, "| **Latest Version (all)** | {} |", result.latest_version_all)?;
                }
                writeln!(writer, "| **Repository** | {} |", result.repo_url)?;
                writeln!(writer)?;
            }
        }

        if !results.up_to_date_with_constraint.is_empty() {
            writeln!(writer, "## Up to Date (with updates outside constraint)")?;
            writeln!(writer)?;
            for result in &results.up_to_date_with_constraint {
                Self::table_start(result, writer)?;
                writeln!(writer, "| **Current Version** | {} |", result.current_version)?;
                writeln!(
                    writer,
                    "| **Status** | Up to date within '{}' constraint |",
                    result.constraint_applied
                )?;
                if !result.latest_version_all.is_empty() {
                    writeln!(writer, "| **Latest Version (all)** | {} |", result.latest_version_all)?;
                }
                writeln!(writer, "| **Repository** | {} |", result.repo_url)?;
                writeln!(writer)?;
            }
        }

        if !results.errors.is_empty() {
            writeln!(writer, "## Applications Skipped")?;
            writeln!(writer)?;
            for result in &results.errors {
                Self::table_start(result, writer)?;
                writeln!(writer, "| **Repository** | {} |", result.repo_url)?;
                writeln!(
                    writer,
                    "| **Error** | {} |",
                    result.error.as_deref().unwrap_or_default()
                )?;
                writeln!(writer)?;
            }
        }

        Ok(())
    }
}
