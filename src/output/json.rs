//! JSON output formatter for machine processing

use crate::domain::{ApplicationCheckResult, CategorizedResults};
use crate::output::OutputFormatter;
use serde::Serialize;
use std::io::Write;

/// JSON formatter for machine-readable output
#[derive(Default)]
pub struct JsonFormatter;

impl JsonFormatter {
    pub fn new() -> Self {
        Self
    }
}

/// JSON representation of the full result
#[derive(Serialize)]
struct JsonOutput<'a> {
    summary: JsonSummary,
    updates_available: &'a [ApplicationCheckResult],
    up_to_date_with_constraint: &'a [ApplicationCheckResult],
    up_to_date: &'a [ApplicationCheckResult],
    errors: &'a [ApplicationCheckResult],
}

#[derive(Serialize)]
struct JsonSummary {
    total: usize,
    up_to_date: usize,
    updates_available: usize,
    skipped: usize,
}

impl OutputFormatter for JsonFormatter {
    fn format(&self, results: &CategorizedResults, writer: &mut dyn Write) -> std::io::Result<()> {
        let output = JsonOutput {
            summary: JsonSummary {
                total: results.stats.total,
                up_to_date: results.stats.up_to_date,
                updates_available: results.stats.updates_available,
                skipped: results.stats.skipped,
            },
            updates_available: &results.updates_available,
            up_to_date_with_constraint: &results.up_to_date_with_constraint,
            up_to_date: &results.up_to_date,
            errors: &results.errors,
        };

        serde_json::to_writer_pretty(&mut *writer, &output)?;
        writeln!(writer)
    }
}
