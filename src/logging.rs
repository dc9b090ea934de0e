//! Tracing subscriber setup
//!
//! Logs go to stderr so stdout only carries the rendered report.

use crate::cli::LogFormat;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter from `RUST_LOG`, falling back to `info` (or `debug` when verbose)
pub fn build_filter(verbose: bool, rust_log: Option<&str>) -> EnvFilter {
    match rust_log.filter(|v| !v.trim().is_empty()) {
        Some(directives) => {
            EnvFilter::try_new(directives).unwrap_or_else(|_| EnvFilter::new(default_level(verbose)))
        }
        None => EnvFilter::new(default_level(verbose)),
    }
}

fn default_level(verbose: bool) -> &'static str {
    if verbose {
        "debug"
    } else {
        "info"
    }
}

/// Installs the global subscriber. Later calls are ignored.
pub fn init(format: LogFormat, verbose: bool) {
    let rust_log = std::env::var("RUST_LOG").ok();
    let filter = build_filter(verbose, rust_log.as_deref());
    let registry = tracing_subscriber::registry().with(filter);

    let result = match format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init(),
    };
    if result.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
