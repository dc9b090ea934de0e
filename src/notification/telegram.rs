//! Telegram delivery through a relay webhook
//!
//! Delivered in a single attempt. Only status 200 counts as success.

use super::Notifier;
use crate::error::NotifyError;
use crate::http::{HttpClient, RequestError};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::debug;

#[derive(Debug, Serialize)]
struct TelegramPayload<'a> {
    chat_id: &'a str,
    text: String,
    parse_mode: &'static str,
}

fn payload<'a>(chat_id: &'a str, subject: &str, message: &str) -> TelegramPayload<'a> {
    TelegramPayload {
        chat_id,
        text: format!("*{}*\n\n{}", subject, message),
        parse_mode: "Markdown",
    }
}

pub struct TelegramNotifier {
    client: HttpClient,
    webhook: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(client: HttpClient, webhook: impl Into<String>, chat_id: impl Into<String>) -> Self {
        Self {
            client,
            webhook: webhook.into(),
            chat_id: chat_id.into(),
        }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    fn channel(&self) -> &'static str {
        "telegram"
    }

    async fn send(
        &self,
        cancel: &CancellationToken,
        subject: &str,
        message: &str,
    ) -> Result<(), NotifyError> {
        debug!(chat_id = %self.chat_id, "sending Telegram notification");
        let request = self
            .client
            .inner()
            .post(&self.webhook)
            .json(&payload(&self.chat_id, subject, message));

        let response = match self.client.send(cancel, request).await {
            Ok(response) => response,
            Err(RequestError::Cancelled) => return Err(NotifyError::Cancelled),
            Err(RequestError::Transport(e)) => {
                return Err(NotifyError::Request {
                    message: e.to_string(),
                })
            }
        };

        if response.status() != StatusCode::OK {
            return Err(NotifyError::Status {
                status: response.status().as_u16(),
            });
        }
        Ok(())
    }
}
