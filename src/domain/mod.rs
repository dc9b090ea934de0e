//! Core domain models for chartwatch
//!
//! This module contains the fundamental types used throughout the application:
//! - Applications and their source descriptors as reported by Argo CD
//! - Version constraint policy
//! - Per-application check results
//! - Scan statistics and categorized results

mod application;
mod check_result;
mod constraint;
mod summary;

pub use application::{Application, ApplicationFilter, ApplicationSource, ChartSource};
pub use check_result::ApplicationCheckResult;
pub use constraint::VersionConstraint;
pub use summary::{CategorizedResults, ScanStatistics};
