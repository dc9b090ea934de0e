//! Update notifications
//!
//! Updates are packed into bounded messages by [`MessageFormatter`] and
//! delivered through one of the supported channels:
//! - Generic JSON webhook
//! - Slack incoming webhook
//! - Microsoft Teams connector
//! - Telegram bot (through a relay webhook)
//! - SMTP email

mod email;
mod formatter;
mod slack;
mod teams;
mod telegram;
mod webhook;

pub use email::{EmailNotifier, EmailSettings, DEFAULT_SMTP_PORT};
pub use formatter::{MessageFormatter, DEFAULT_MAX_MESSAGE_LENGTH};
pub use slack::SlackNotifier;
pub use teams::TeamsNotifier;
pub use telegram::TelegramNotifier;
pub use webhook::WebhookNotifier;

use crate::domain::ApplicationCheckResult;
use crate::error::NotifyError;
use crate::http::HttpClient;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Delivery channel with its settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationTarget {
    Telegram { webhook: String, chat_id: String },
    Slack { webhook: String },
    Teams { webhook: String },
    Webhook { url: String },
    Email(EmailSettings),
}

impl NotificationTarget {
    pub fn channel(&self) -> &'static str {
        match self {
            NotificationTarget::Telegram { .. } => "telegram",
            NotificationTarget::Slack { .. } => "slack",
            NotificationTarget::Teams { .. } => "teams",
            NotificationTarget::Webhook { .. } => "webhook",
            NotificationTarget::Email(_) => "email",
        }
    }
}

/// Sends one message with a subject
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Channel name used in logs
    fn channel(&self) -> &'static str;

    async fn send(
        &self,
        cancel: &CancellationToken,
        subject: &str,
        message: &str,
    ) -> Result<(), NotifyError>;
}

/// Factory function to create the notifier for a target
pub fn create_notifier(target: &NotificationTarget, client: HttpClient) -> Box<dyn Notifier> {
    match target {
        NotificationTarget::Telegram { webhook, chat_id } => {
            Box::new(TelegramNotifier::new(client, webhook, chat_id))
        }
        NotificationTarget::Slack { webhook } => Box::new(SlackNotifier::new(client, webhook)),
        NotificationTarget::Teams { webhook } => Box::new(TeamsNotifier::new(client, webhook)),
        NotificationTarget::Webhook { url } => Box::new(WebhookNotifier::new(client, url)),
        NotificationTarget::Email(settings) => Box::new(EmailNotifier::new(settings.clone())),
    }
}

/// Subject line for message `index` (zero-based) of `total`
pub fn subject_for(index: usize, total: usize, update_count: usize) -> String {
    if total <= 1 {
        format!("Chartwatch: {} Helm chart update(s) available", update_count)
    } else {
        format!("Chartwatch [{}/{}]: {} update(s)", index + 1, total, update_count)
    }
}

/// Sends every available update, returning the number of messages delivered
///
/// Does nothing when no result carries an update. Stops at the first
/// delivery failure.
pub async fn notify_updates(
    notifier: &dyn Notifier,
    formatter: &MessageFormatter,
    cancel: &CancellationToken,
    results: &[ApplicationCheckResult],
) -> Result<usize, NotifyError> {
    let updates: Vec<ApplicationCheckResult> = results
        .iter()
        .filter(|r| r.has_update && !r.is_error())
        .cloned()
        .collect();

    if updates.is_empty() {
        debug!("no updates to notify");
        return Ok(0);
    }

    let messages = formatter.build_messages(&updates);
    let total = messages.len();
    for (i, message) in messages.iter().enumerate() {
        let subject = subject_for(i, total, updates.len());
        notifier.send(cancel, &subject, message).await?;
        debug!(part = i + 1, total, "notification part sent");
    }

    info!(
        channel = notifier.channel(),
        updates = updates.len(),
        messages = total,
        "notification sent"
    );
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingNotifier {
        sent: Mutex<Vec<(String, String)>>,
        fail: bool,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        fn channel(&self) -> &'static str {
            "recording"
        }

        async fn send(
            &self,
            _cancel: &CancellationToken,
            subject: &str,
            message: &str,
        ) -> Result<(), NotifyError> {
            if self.fail {
                return Err(NotifyError::Status { status: 400 });
            }
            self.sent
                .lock()
                .unwrap()
                .push((subject.to_string(), message.to_string()));
            Ok(())
        }
    }

    fn update(name: &str) -> ApplicationCheckResult {
        ApplicationCheckResult {
            app_name: name.to_string(),
            project: "default".to_string(),
            chart_name: "nginx".to_string(),
            current_version: "1.0.0".to_string(),
            latest_version: "1.1.0".to_string(),
            repo_url: "https://charts.example.com".to_string(),
            has_update: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_subject_single_and_multi() {
        assert_eq!(
            subject_for(0, 1, 3),
            "Chartwatch: 3 Helm chart update(s) available"
        );
        assert_eq!(subject_for(1, 4, 120), "Chartwatch [2/4]: 120 update(s)");
    }

    #[test]
    fn test_target_channel_names() {
        let target = NotificationTarget::Slack {
            webhook: "https://hooks.slack.com/x".to_string(),
        };
        assert_eq!(target.channel(), "slack");
        let target = NotificationTarget::Telegram {
            webhook: "https://relay".to_string(),
            chat_id: "42".to_string(),
        };
        assert_eq!(target.channel(), "telegram");
    }

    #[test]
    fn test_create_notifier_matches_target() {
        let client = HttpClient::new().unwrap();
        let targets = [
            NotificationTarget::Webhook { url: "https://a".to_string() },
            NotificationTarget::Teams { webhook: "https://b".to_string() },
            NotificationTarget::Email(EmailSettings {
                smtp_host: "smtp.example.com".to_string(),
                smtp_port: DEFAULT_SMTP_PORT,
                smtp_username: String::new(),
                smtp_password: String::new(),
                from: "bot@example.com".to_string(),
                to: vec!["ops@example.com".to_string()],
                use_tls: true,
            }),
        ];
        for target in &targets {
            let notifier = create_notifier(target, client.clone());
            assert_eq!(notifier.channel(), target.channel());
        }
    }

    #[tokio::test]
    async fn test_notify_skips_without_updates() {
        let notifier = RecordingNotifier::default();
        let mut current = update("web");
        current.has_update = false;
        let sent = notify_updates(
            &notifier,
            &MessageFormatter::new(),
            &CancellationToken::new(),
            &[current],
        )
        .await
        .unwrap();
        assert_eq!(sent, 0);
        assert!(notifier.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_notify_splits_and_numbers_subjects() {
        let notifier = RecordingNotifier::default();
        let updates: Vec<_> = (0..50).map(|i| update(&format!("app-{}", i))).collect();
        let formatter = MessageFormatter::with_max_length(500);

        let sent = notify_updates(&notifier, &formatter, &CancellationToken::new(), &updates)
            .await
            .unwrap();

        let recorded = notifier.sent.lock().unwrap();
        assert_eq!(recorded.len(), sent);
        assert!(sent > 1);
        assert_eq!(recorded[0].0, format!("Chartwatch [1/{}]: 50 update(s)", sent));
    }

    #[tokio::test]
    async fn test_notify_ignores_errored_results() {
        let notifier = RecordingNotifier::default();
        let mut errored = update("broken");
        errored.error = Some("timeout".to_string());
        notify_updates(
            &notifier,
            &MessageFormatter::new(),
            &CancellationToken::new(),
            &[errored, update("web")],
        )
        .await
        .unwrap();

        let recorded = notifier.sent.lock().unwrap();
        assert_eq!(recorded.len(), 1);
        assert!(!recorded[0].1.contains("broken"));
        assert_eq!(recorded[0].0, "Chartwatch: 1 Helm chart update(s) available");
    }

    #[tokio::test]
    async fn test_notify_propagates_failure() {
        let notifier = RecordingNotifier {
            fail: true,
            ..Default::default()
        };
        let err = notify_updates(
            &notifier,
            &MessageFormatter::new(),
            &CancellationToken::new(),
            &[update("web")],
        )
        .await
        .unwrap_err();
        assert!(matches!(err, NotifyError::Status { status: 400 }));
    }
}
