//! Generic JSON webhook

use super::Notifier;
use crate::error::NotifyError;
use crate::http::HttpClient;
use async_trait::async_trait;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Serialize)]
pub(crate) struct WebhookPayload<'a> {
    pub subject: &'a str,
    pub message: &'a str,
}

/// Posts `{subject, message}` to an arbitrary endpoint
pub struct WebhookNotifier {
    client: HttpClient,
    url: String,
}

impl WebhookNotifier {
    pub fn new(client: HttpClient, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    fn channel(&self) -> &'static str {
        "webhook"
    }

    async fn send(
        &self,
        cancel: &CancellationToken,
        subject: &str,
        message: &str,
    ) -> Result<(), NotifyError> {
        let payload = WebhookPayload { subject, message };
        self.client.post_json(cancel, &self.url, &payload).await
    }
}
