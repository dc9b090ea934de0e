//! Interactive configuration wizard
//!
//! Walks through the Argo CD connection, application filters, general
//! settings and the notification channel, sends a test message through the
//! chosen channel and writes the answers as a YAML config file that
//! [`FileConfig::load`] reads back.

use crate::config::{notification_target, FileConfig};
use crate::error::NotifyError;
use crate::http::HttpClient;
use crate::notification::{create_notifier, NotificationTarget, DEFAULT_SMTP_PORT};
use crate::orchestrator::DEFAULT_CONCURRENCY;
use anyhow::{anyhow, bail, Context};
use inquire::validator::ValueRequiredValidator;
use inquire::{Confirm, CustomType, InquireError, Password, PasswordDisplayMode, Select, Text};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_CONFIG_PATH: &str = "config.yaml";

pub const TEST_SUBJECT: &str = "Chartwatch configuration test";
pub const TEST_MESSAGE: &str = "Chartwatch configuration test\n\n\
This message was sent by `chartwatch configure`. The notification channel works.";

const TEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Menu label and channel name
const CHANNELS: &[(&str, &str)] = &[
    ("None (console only)", ""),
    ("Telegram", "telegram"),
    ("Email", "email"),
    ("Slack", "slack"),
    ("Microsoft Teams", "teams"),
    ("Generic webhook", "webhook"),
];

/// Runs the wizard and saves the result
pub async fn run(client: HttpClient) -> anyhow::Result<()> {
    println!("\nChartwatch configuration");
    println!("{}", "=".repeat(60));

    let mut config = FileConfig::default();
    prompt_argocd(&mut config)?;
    prompt_filters(&mut config)?;
    prompt_general(&mut config)?;
    prompt_notification(&mut config)?;

    if let Some(target) = notification_target(&config)? {
        println!("\nTesting {} notification...", target.channel());
        match send_test_notification(&target, client).await {
            Ok(()) => println!("Notification test successful."),
            Err(e) => {
                println!("Notification test failed: {}", e);
                println!("The configuration can still be saved and fixed later.");
                let keep = answer(
                    Confirm::new("Save the configuration anyway?")
                        .with_default(true)
                        .prompt(),
                )?;
                if !keep {
                    bail!("configuration cancelled");
                }
            }
        }
    }

    section("Save");
    let path = answer(
        Text::new("Config file path:")
            .with_default(DEFAULT_CONFIG_PATH)
            .with_help_message("searched by default: ./config.yaml, /etc/chartwatch, ~/.chartwatch")
            .prompt(),
    )?;
    let path = PathBuf::from(path.trim());
    save(&config, &path)?;

    println!("\nConfiguration saved to {}", path.display());
    println!("Run `chartwatch` to check for updates.");
    Ok(())
}

/// Sends the fixed test message through `target`
pub async fn send_test_notification(
    target: &NotificationTarget,
    client: HttpClient,
) -> Result<(), NotifyError> {
    let cancel = CancellationToken::new();
    let notifier = create_notifier(target, client);
    match tokio::time::timeout(TEST_TIMEOUT, notifier.send(&cancel, TEST_SUBJECT, TEST_MESSAGE)).await {
        Ok(result) => result,
        Err(_) => Err(NotifyError::Request {
            message: format!("no answer within {}s", TEST_TIMEOUT.as_secs()),
        }),
    }
}

/// Writes `config` as YAML, creating parent directories
///
/// The file is readable by its owner only since it holds passwords.
pub fn save(config: &FileConfig, path: &Path) -> anyhow::Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create directory {}", dir.display()))?;
    }
    let yaml = serde_yaml::to_string(config).context("failed to serialize configuration")?;
    write_private(path, yaml.as_bytes())
        .with_context(|| format!("failed to write config file {}", path.display()))
}

#[cfg(unix)]
fn write_private(path: &Path, data: &[u8]) -> io::Result<()> {
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    file.set_permissions(fs::Permissions::from_mode(0o600))?;
    file.write_all(data)
}

#[cfg(not(unix))]
fn write_private(path: &Path, data: &[u8]) -> io::Result<()> {
    let mut file = fs::File::create(path)?;
    file.write_all(data)
}

/// Splits comma separated input, dropping blanks
pub fn split_list(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect()
}

fn section(title: &str) {
    println!("\n{}", title);
    println!("{}", "-".repeat(60));
}

fn answer<T>(result: Result<T, InquireError>) -> anyhow::Result<T> {
    match result {
        Ok(value) => Ok(value),
        Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => {
            bail!("configuration cancelled")
        }
        Err(e) => Err(anyhow!("prompt failed: {}", e)),
    }
}

fn required(message: &str, help: &str) -> anyhow::Result<String> {
    let value = answer(
        Text::new(message)
            .with_help_message(help)
            .with_validator(ValueRequiredValidator::default())
            .prompt(),
    )?;
    Ok(value.trim().to_string())
}

fn optional(message: &str) -> anyhow::Result<Option<String>> {
    let value = answer(Text::new(message).prompt())?;
    let value = value.trim();
    Ok((!value.is_empty()).then(|| value.to_string()))
}

fn secret(message: &str, mandatory: bool) -> anyhow::Result<Option<String>> {
    let mut prompt = Password::new(message)
        .without_confirmation()
        .with_display_mode(PasswordDisplayMode::Masked);
    if mandatory {
        prompt = prompt.with_validator(ValueRequiredValidator::default());
    }
    let value = answer(prompt.prompt())?;
    Ok((!value.is_empty()).then_some(value))
}

fn prompt_argocd(config: &mut FileConfig) -> anyhow::Result<()> {
    section("Argo CD connection");
    config.argocd_url = Some(required("Argo CD server URL:", "e.g. https://argocd.example.com")?);
    config.argocd_username = Some(answer(
        Text::new("Argo CD username:")
            .with_default("admin")
            .with_validator(ValueRequiredValidator::default())
            .prompt(),
    )?);
    config.argocd_password = secret("Argo CD password:", true)?;
    config.argocd_insecure = Some(answer(
        Confirm::new("Skip TLS verification?")
            .with_default(false)
            .prompt(),
    )?);
    Ok(())
}

fn prompt_filters(config: &mut FileConfig) -> anyhow::Result<()> {
    section("Application filters");
    let projects = answer(
        Text::new("Projects to check (comma separated, * for all):")
            .with_default("*")
            .prompt(),
    )?;
    let names = answer(
        Text::new("Application names to check (comma separated, * for all):")
            .with_default("*")
            .prompt(),
    )?;
    config.projects = Some(split_list(&projects));
    config.app_names = Some(split_list(&names));
    Ok(())
}

fn prompt_general(config: &mut FileConfig) -> anyhow::Result<()> {
    section("General settings");
    let constraint = answer(
        Select::new("Version constraint:", vec!["major", "minor", "patch"])
            .with_help_message("major: any update, minor: same major, patch: same major.minor")
            .prompt(),
    )?;
    let format = answer(Select::new("Output format:", vec!["table", "json", "markdown"]).prompt())?;
    let concurrency = answer(
        CustomType::<usize>::new("Concurrent workers:")
            .with_default(DEFAULT_CONCURRENCY)
            .with_error_message("enter a whole number")
            .prompt(),
    )?;

    config.version_constraint = Some(constraint.to_string());
    config.output_format = Some(format.to_string());
    config.concurrency = Some(i64::try_from(concurrency).unwrap_or(i64::MAX));
    Ok(())
}

fn prompt_notification(config: &mut FileConfig) -> anyhow::Result<()> {
    section("Notifications");
    let labels: Vec<&str> = CHANNELS.iter().map(|(label, _)| *label).collect();
    let choice = answer(Select::new("Notification channel:", labels).prompt())?;
    let channel = CHANNELS
        .iter()
        .find(|(label, _)| *label == choice)
        .map_or("", |(_, name)| *name);

    match channel {
        "telegram" => {
            config.telegram_webhook = Some(required(
                "Telegram webhook URL:",
                "https://api.telegram.org/bot<TOKEN>/sendMessage",
            )?);
            config.telegram_chat_id = Some(required("Telegram chat id:", "user or group chat id")?);
        }
        "email" => {
            config.email_smtp_host = Some(required("SMTP host:", "e.g. smtp.example.com")?);
            config.email_smtp_port = Some(answer(
                CustomType::<u16>::new("SMTP port:")
                    .with_default(DEFAULT_SMTP_PORT)
                    .with_error_message("enter a port number")
                    .prompt(),
            )?);
            config.email_smtp_username = optional("SMTP username (empty for none):")?;
            if config.email_smtp_username.is_some() {
                config.email_smtp_password = secret("SMTP password:", true)?;
            }
            config.email_from = Some(required("Sender address:", "e.g. chartwatch@example.com")?);
            let to = required(
                "Recipient addresses (comma separated):",
                "e.g. ops@example.com,dev@example.com",
            )?;
            config.email_to = Some(split_list(&to));
            config.email_use_tls = Some(answer(
                Confirm::new("Use TLS?").with_default(true).prompt(),
            )?);
        }
        "slack" => {
            config.slack_webhook = Some(required(
                "Slack webhook URL:",
                "https://hooks.slack.com/services/...",
            )?);
        }
        "teams" => {
            config.teams_webhook = Some(required(
                "Microsoft Teams webhook URL:",
                "incoming webhook connector URL",
            )?);
        }
        "webhook" => {
            config.webhook_url = Some(required("Webhook URL:", "receives {subject, message} as JSON")?);
        }
        _ => {}
    }

    if !channel.is_empty() {
        config.notification_channel = Some(channel.to_string());
    }
    Ok(())
}
