//! Scan orchestrator for checking applications concurrently
//!
//! This module provides:
//! - Chart-bearing source discovery per application
//! - A fixed pool of workers pulling from a bounded work queue
//! - Result collection through a channel with a single join point
//! - Per-application error isolation

use crate::domain::{Application, ApplicationCheckResult, VersionConstraint};
use crate::progress::Progress;
use crate::registry::VersionResolver;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument};

/// Default number of workers
pub const DEFAULT_CONCURRENCY: usize = 10;

/// Zero workers means the default
pub fn normalize_concurrency(workers: usize) -> usize {
    if workers == 0 {
        DEFAULT_CONCURRENCY
    } else {
        workers
    }
}

/// Orchestrator for scanning the application inventory
pub struct ScanOrchestrator {
    /// Resolver shared by all workers
    resolver: Arc<dyn VersionResolver>,
    /// Preferred source name for multi-source applications
    source_name: String,
    /// Constraint applied to every chart
    constraint: VersionConstraint,
    progress: Progress,
}

impl ScanOrchestrator {
    /// Create a new orchestrator
    pub fn new(
        resolver: Arc<dyn VersionResolver>,
        source_name: impl Into<String>,
        constraint: VersionConstraint,
    ) -> Self {
        Self {
            resolver,
            source_name: source_name.into(),
            constraint,
            progress: Progress::disabled(),
        }
    }

    /// Attach a progress reporter advanced once per application
    pub fn with_progress(mut self, progress: Progress) -> Self {
        self.progress = progress;
        self
    }

    /// Checks every application with at most `workers` in flight
    ///
    /// Results are in completion order, not input order.
    pub async fn scan(
        &self,
        cancel: &CancellationToken,
        applications: Vec<Application>,
        workers: usize,
    ) -> Vec<ApplicationCheckResult> {
        let workers = normalize_concurrency(workers);
        let capacity = applications.len().max(1);
        debug!(concurrency = workers, applications = applications.len(), "starting concurrent application checks");

        let (work_tx, work_rx) = mpsc::channel::<Application>(capacity);
        let (result_tx, mut result_rx) = mpsc::channel::<ApplicationCheckResult>(capacity);
        let work_rx = Arc::new(Mutex::new(work_rx));

        let mut tasks = JoinSet::new();
        for worker_id in 0..workers {
            let work_rx = Arc::clone(&work_rx);
            let result_tx = result_tx.clone();
            let resolver = Arc::clone(&self.resolver);
            let cancel = cancel.clone();
            let source_name = self.source_name.clone();
            let constraint = self.constraint;
            let progress = self.progress.clone();

            let worker = async move {
                loop {
                    let next = work_rx.lock().await.recv().await;
                    let Some(app) = next else {
                        break;
                    };
                    progress.set_message(&app.name);
                    let result =
                        check_application(resolver.as_ref(), &cancel, &app, &source_name, constraint)
                            .await;
                    progress.inc();
                    if result_tx.send(result).await.is_err() {
                        break;
                    }
                }
            };
            tasks.spawn(worker.instrument(info_span!("worker", worker_id)));
        }
        drop(result_tx);

        for app in applications {
            if work_tx.send(app).await.is_err() {
                break;
            }
        }
        drop(work_tx);

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                warn!(error = %e, "worker task failed");
            }
        }

        let mut results = Vec::with_capacity(capacity);
        while let Ok(result) = result_rx.try_recv() {
            results.push(result);
        }
        results
    }
}

/// Checks a single application
///
/// Returns the not-applicable marker when the application has no
/// chart-bearing source. Resolution failures are recorded in `error`.
pub async fn check_application(
    resolver: &dyn VersionResolver,
    cancel: &CancellationToken,
    app: &Application,
    source_name: &str,
    constraint: VersionConstraint,
) -> ApplicationCheckResult {
    info!(app_name = %app.name, project = %app.project, "processing application");

    let Some(chart) = app.chart_source(source_name) else {
        info!(app_name = %app.name, "application does not use Helm charts, skipping");
        return ApplicationCheckResult::not_applicable();
    };

    let mut result = ApplicationCheckResult::new(&app.name, &app.project, &chart, constraint);
    info!(
        app_name = %app.name,
        chart = %chart.package_name,
        chart_version = %chart.pinned_version,
        repo = %chart.repository_url,
        constraint = %constraint,
        "found Helm-based application"
    );

    let resolved = match resolver.resolve(cancel, &chart, constraint).await {
        Ok(resolved) => resolved,
        Err(e) => {
            error!(app_name = %app.name, error = %e, "failed to check Helm version");
            result.error = Some(e.to_string());
            return result;
        }
    };

    result.latest_version = resolved.latest_within_constraint;
    result.latest_version_all = resolved.latest_unconstrained;
    result.has_update_outside_constraint = resolved.has_update_outside_constraint;
    result.has_update = result.latest_version != chart.pinned_version;

    if result.has_update {
        warn!(
            app_name = %app.name,
            current_version = %result.current_version,
            latest_version = %result.latest_version,
            latest_version_all = %result.latest_version_all,
            has_update_outside_constraint = result.has_update_outside_constraint,
            "update available"
        );
    } else if result.has_update_outside_constraint {
        info!(
            app_name = %app.name,
            current_version = %result.current_version,
            latest_version_all = %result.latest_version_all,
            constraint = %constraint,
            "up to date within constraint, updates exist outside constraint"
        );
    } else {
        info!(app_name = %app.name, "application is up to date");
    }

    result
}
