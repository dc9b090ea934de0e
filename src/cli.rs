//! CLI argument parsing module for chartwatch
//!
//! Every scan option can also be set through a `CW_`-prefixed environment
//! variable. Options left unset fall back to the config file and then to
//! built-in defaults (see [`crate::config`]).

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// One JSON object per line
    #[default]
    Json,
    /// Human readable lines
    Text,
}

/// Checks Argo CD applications for newer Helm chart versions
#[derive(Parser, Debug, Clone, Default)]
#[command(
    name = "chartwatch",
    version,
    about = "Checks Argo CD applications for newer Helm chart versions"
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Path to a config file (YAML or TOML)
    #[arg(short, long, env = "CW_CONFIG")]
    pub config: Option<PathBuf>,

    /// Argo CD server URL
    #[arg(long, env = "CW_ARGOCD_URL")]
    pub argocd_url: Option<String>,

    /// Argo CD username
    #[arg(long, env = "CW_ARGOCD_USERNAME")]
    pub argocd_username: Option<String>,

    /// Argo CD password
    #[arg(long, env = "CW_ARGOCD_PASSWORD", hide_env_values = true)]
    pub argocd_password: Option<String>,

    /// Skip TLS certificate verification for Argo CD
    #[arg(
        long,
        env = "CW_ARGOCD_INSECURE",
        num_args = 0..=1,
        default_missing_value = "true"
    )]
    pub argocd_insecure: Option<bool>,

    /// Projects to check, `*` for all (comma separated)
    #[arg(long, env = "CW_PROJECTS", value_delimiter = ',')]
    pub projects: Option<Vec<String>>,

    /// Application names to check, `*` for all (comma separated)
    #[arg(long, env = "CW_APP_NAMES", value_delimiter = ',')]
    pub app_names: Option<Vec<String>>,

    /// Label filter in `key=value,key=value` form
    #[arg(long, env = "CW_LABELS")]
    pub labels: Option<String>,

    /// Source name to check in multi-source applications
    #[arg(long, env = "CW_SOURCE_NAME")]
    pub source_name: Option<String>,

    /// Notification channel: telegram, email, slack, teams or webhook
    #[arg(long, env = "CW_NOTIFICATION_CHANNEL")]
    pub notification_channel: Option<String>,

    /// Telegram relay webhook URL
    #[arg(long, env = "CW_TELEGRAM_WEBHOOK")]
    pub telegram_webhook: Option<String>,

    /// Telegram chat id
    #[arg(long, env = "CW_TELEGRAM_CHAT_ID")]
    pub telegram_chat_id: Option<String>,

    /// Slack incoming webhook URL
    #[arg(long, env = "CW_SLACK_WEBHOOK", hide_env_values = true)]
    pub slack_webhook: Option<String>,

    /// Microsoft Teams connector URL
    #[arg(long, env = "CW_TEAMS_WEBHOOK", hide_env_values = true)]
    pub teams_webhook: Option<String>,

    /// Generic webhook URL
    #[arg(long, env = "CW_WEBHOOK_URL")]
    pub webhook_url: Option<String>,

    /// SMTP server host
    #[arg(long, env = "CW_EMAIL_SMTP_HOST")]
    pub email_smtp_host: Option<String>,

    /// SMTP server port [default: 587]
    #[arg(long, env = "CW_EMAIL_SMTP_PORT")]
    pub email_smtp_port: Option<u16>,

    /// SMTP username
    #[arg(long, env = "CW_EMAIL_SMTP_USERNAME")]
    pub email_smtp_username: Option<String>,

    /// SMTP password
    #[arg(long, env = "CW_EMAIL_SMTP_PASSWORD", hide_env_values = true)]
    pub email_smtp_password: Option<String>,

    /// Sender address
    #[arg(long, env = "CW_EMAIL_FROM")]
    pub email_from: Option<String>,

    /// Recipient addresses (comma separated)
    #[arg(long, env = "CW_EMAIL_TO", value_delimiter = ',')]
    pub email_to: Option<Vec<String>>,

    /// Use STARTTLS (or implicit TLS on port 465) [default: true]
    #[arg(
        long,
        env = "CW_EMAIL_USE_TLS",
        num_args = 0..=1,
        default_missing_value = "true"
    )]
    pub email_use_tls: Option<bool>,

    /// Number of applications checked in parallel
    #[arg(long, env = "CW_CONCURRENCY", allow_negative_numbers = true)]
    pub concurrency: Option<i64>,

    /// Version constraint: major, minor or patch
    #[arg(long, env = "CW_VERSION_CONSTRAINT")]
    pub version_constraint: Option<String>,

    /// Output format: table, json or markdown
    #[arg(short, long, env = "CW_OUTPUT_FORMAT")]
    pub output_format: Option<String>,

    /// Log format
    #[arg(short, long, value_enum, env = "CW_LOG_FORMAT", default_value_t = LogFormat::Json)]
    pub log_format: LogFormat,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Disable the progress bar
    #[arg(long)]
    pub no_progress: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Print version information
    Version,
    /// Interactively write a config file and test the notification channel
    Configure,
}

impl CliArgs {
    /// Returns true when the `version` subcommand was given
    pub fn is_version(&self) -> bool {
        matches!(self.command, Some(Command::Version))
    }

    /// Returns true when the `configure` subcommand was given
    pub fn is_configure(&self) -> bool {
        matches!(self.command, Some(Command::Configure))
    }
}
