//! Scan statistics and categorized results
//!
//! Categorization is a single sequential pass over the collected results,
//! so it is deterministic for a given result set regardless of arrival order.

use super::ApplicationCheckResult;
use serde::{Deserialize, Serialize};

/// Counts derived from a scan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanStatistics {
    pub total: usize,
    pub up_to_date: usize,
    pub updates_available: usize,
    pub skipped: usize,
}

/// Results split into the buckets shown to the user
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorizedResults {
    pub updates_available: Vec<ApplicationCheckResult>,
    /// Up to date within the constraint, newer versions exist outside it
    pub up_to_date_with_constraint: Vec<ApplicationCheckResult>,
    pub up_to_date: Vec<ApplicationCheckResult>,
    pub errors: Vec<ApplicationCheckResult>,
    pub stats: ScanStatistics,
}

impl CategorizedResults {
    /// Categorizes raw results, dropping not-applicable markers
    pub fn from_results(results: &[ApplicationCheckResult]) -> Self {
        let mut categorized = Self::default();

        for result in results {
            if result.is_not_applicable() {
                continue;
            }

            categorized.stats.total += 1;

            if result.is_error() {
                categorized.stats.skipped += 1;
                categorized.errors.push(result.clone());
            } else if result.has_update {
                categorized.stats.updates_available += 1;
                categorized.updates_available.push(result.clone());
            } else {
                categorized.stats.up_to_date += 1;
                if result.has_update_outside_constraint {
                    categorized.up_to_date_with_constraint.push(result.clone());
                } else {
                    categorized.up_to_date.push(result.clone());
                }
            }
        }

        categorized
    }

    /// Returns true if any application has an update
    pub fn has_updates(&self) -> bool {
        self.stats.updates_available > 0
    }
}
