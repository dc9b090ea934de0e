//! chartwatch - Helm chart update checker for Argo CD
//!
//! Lists applications from Argo CD, resolves the latest version of each
//! deployed chart, renders a report to stdout and optionally sends a
//! notification.

use anyhow::Context;
use chartwatch::argocd::{ApplicationLister, ArgoCdClient};
use chartwatch::cli::CliArgs;
use chartwatch::config::Config;
use chartwatch::configure;
use chartwatch::credentials::CredentialStore;
use chartwatch::domain::CategorizedResults;
use chartwatch::error::AppError;
use chartwatch::http::HttpClient;
use chartwatch::logging;
use chartwatch::notification::{create_notifier, notify_updates, MessageFormatter};
use chartwatch::orchestrator::ScanOrchestrator;
use chartwatch::output::{create_formatter, OutputFormat};
use chartwatch::progress::Progress;
use chartwatch::registry::ChartResolver;
use clap::Parser;
use std::io::{self, IsTerminal, Write};
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> ExitCode {
    let args = CliArgs::parse();

    if args.is_version() {
        println!("chartwatch {}", env!("CARGO_PKG_VERSION"));
        return ExitCode::SUCCESS;
    }

    let result = if args.is_configure() {
        if args.verbose {
            logging::init(args.log_format, true);
        }
        run_configure().await
    } else {
        logging::init(args.log_format, args.verbose);
        run(args).await.map_err(anyhow::Error::from)
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %format!("{:#}", e), "chartwatch failed");
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Interactive `configure` subcommand
async fn run_configure() -> anyhow::Result<()> {
    let client = HttpClient::new().context("failed to create HTTP client")?;
    configure::run(client).await
}

/// Main application logic
async fn run(args: CliArgs) -> Result<(), AppError> {
    let config = Config::load(&args)?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        argocd_url = %config.argocd_url,
        source_name = %config.source_name,
        concurrency = config.concurrency,
        constraint = %config.version_constraint,
        output_format = %config.output_format,
        "starting chartwatch"
    );

    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_signal(cancel.clone()));

    let argocd = ArgoCdClient::connect(
        &cancel,
        &config.argocd_url,
        &config.argocd_username,
        &config.argocd_password,
        config.argocd_insecure,
    )
    .await?;
    let applications = argocd.list_applications(&cancel, &config.filter).await?;
    info!(count = applications.len(), "found applications");

    let credentials = Arc::new(CredentialStore::from_env(&config.repository_auth));
    let client = HttpClient::new()?;
    let resolver = Arc::new(ChartResolver::new(client.clone(), credentials));

    let show_progress = !args.no_progress && config.output_format != OutputFormat::Json;
    let progress = Progress::start(
        show_progress,
        applications.len() as u64,
        "Checking applications",
    );
    let orchestrator =
        ScanOrchestrator::new(resolver, config.source_name.clone(), config.version_constraint)
            .with_progress(progress.clone());
    let results = orchestrator
        .scan(&cancel, applications, config.concurrency)
        .await;
    progress.finish_and_clear();

    if cancel.is_cancelled() {
        warn!("scan interrupted, reporting completed results");
    }

    let categorized = CategorizedResults::from_results(&results);
    info!(
        total = categorized.stats.total,
        updates_available = categorized.stats.updates_available,
        up_to_date = categorized.stats.up_to_date,
        skipped = categorized.stats.skipped,
        "scan complete"
    );

    let stdout = io::stdout();
    let formatter = create_formatter(config.output_format, stdout.is_terminal());
    let mut out = stdout.lock();
    formatter.format(&categorized, &mut out)?;
    out.flush()?;

    if let Some(target) = &config.notification {
        let notifier = create_notifier(target, client);
        if let Err(e) =
            notify_updates(notifier.as_ref(), &MessageFormatter::new(), &cancel, &results).await
        {
            warn!(channel = target.channel(), error = %e, "failed to send notification");
        }
    }

    Ok(())
}

/// Cancels the scan on SIGINT or SIGTERM
async fn cancel_on_signal(cancel: CancellationToken) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let (mut sigterm, mut sigint) =
            match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
                (Ok(term), Ok(int)) => (term, int),
                _ => {
                    warn!("failed to register signal handlers");
                    return;
                }
            };
        tokio::select! {
            _ = sigterm.recv() => {}
            _ = sigint.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
    }
    warn!("received shutdown signal, cancelling scan");
    cancel.cancel();
}
