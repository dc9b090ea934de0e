//! Slack incoming webhook

use super::Notifier;
use crate::error::NotifyError;
use crate::http::HttpClient;
use async_trait::async_trait;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Serialize)]
struct SlackPayload {
    text: String,
}

fn payload(subject: &str, message: &str) -> SlackPayload {
    SlackPayload {
        text: format!("*{}*\n\n{}", subject, message),
    }
}

pub struct SlackNotifier {
    client: HttpClient,
    webhook: String,
}

impl SlackNotifier {
    pub fn new(client: HttpClient, webhook: impl Into<String>) -> Self {
        Self {
            client,
            webhook: webhook.into(),
        }
    }
}

#[async_trait]
impl Notifier for SlackNotifier {
    fn channel(&self) -> &'static str {
        "slack"
    }

    async fn send(
        &self,
        cancel: &CancellationToken,
        subject: &str,
        message: &str,
    ) -> Result<(), NotifyError> {
        self.client
            .post_json(cancel, &self.webhook, &payload(subject, message))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subject_is_bold() {
        let value = serde_json::to_value(payload("Updates", "web 1 -> 2")).unwrap();
        assert_eq!(value["text"], "*Updates*\n\nweb 1 -> 2");
    }
}
