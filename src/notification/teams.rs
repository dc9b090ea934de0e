//! Microsoft Teams connector card

use super::Notifier;
use crate::error::NotifyError;
use crate::http::HttpClient;
use async_trait::async_trait;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

const THEME_COLOR: &str = "0078D7";

#[derive(Debug, Serialize)]
struct MessageCard<'a> {
    #[serde(rename = "@type")]
    card_type: &'static str,
    #[serde(rename = "@context")]
    context: &'static str,
    summary: &'a str,
    #[serde(rename = "themeColor")]
    theme_color: &'static str,
    title: &'a str,
    text: &'a str,
}

impl<'a> MessageCard<'a> {
    fn new(subject: &'a str, message: &'a str) -> Self {
        Self {
            card_type: "MessageCard",
            context: "https://schema.org/extensions",
            summary: subject,
            theme_color: THEME_COLOR,
            title: subject,
            text: message,
        }
    }
}

pub struct TeamsNotifier {
    client: HttpClient,
    webhook: String,
}

impl TeamsNotifier {
    pub fn new(client: HttpClient, webhook: impl Into<String>) -> Self {
        Self {
            client,
            webhook: webhook.into(),
        }
    }
}

#[async_trait]
impl Notifier for TeamsNotifier {
    fn channel(&self) -> &'static str {
        "teams"
    }

    async fn send(
        &self,
        cancel: &CancellationToken,
        subject: &str,
        message: &str,
    ) -> Result<(), NotifyError> {
        let card = MessageCard::new(subject, message);
        self.client.post_json(cancel, &self.webhook, &card).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_card_shape() {
        let value = serde_json::to_value(MessageCard::new("Subject", "Body")).unwrap();
        assert_eq!(value["@type"], "MessageCard");
        assert_eq!(value["@context"], "https://schema.org/extensions");
        assert_eq!(value["themeColor"], "0078D7");
        assert_eq!(value["summary"], "Subject");
        assert_eq!(value["title"], "Subject");
        assert_eq!(value["text"], "Body");
    }
}
