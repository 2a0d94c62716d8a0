//! WhatsApp Cloud API client.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use orderdesk_common::config::AppConfig;

use crate::error::DeliveryError;

/// Outbound text-message channel.
#[async_trait]
pub trait MessageSender: Send + Sync {
    /// Send `body` as a plain text message to the digits-only number `to`.
    async fn send_text(&self, to: &str, body: &str) -> Result<(), DeliveryError>;
}

/// Strip every non-digit character from a phone number.
///
/// `"+1 (555) 010-2000"` becomes `"15550102000"`. An empty result means the
/// customer has no usable number.
pub fn normalize_phone(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}

#[derive(Debug, Serialize)]
struct TextMessage<'a> {
    messaging_product: &'static str,
    to: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
    text: TextBody<'a>,
}

#[derive(Debug, Serialize)]
struct TextBody<'a> {
    body: &'a str,
}

impl<'a> TextMessage<'a> {
    fn new(to: &'a str, body: &'a str) -> Self {
        Self {
            messaging_product: "whatsapp",
            to,
            kind: "text",
            text: TextBody { body },
        }
    }
}

/// [`MessageSender`] backed by the WhatsApp Cloud API `messages` endpoint.
#[derive(Clone)]
pub struct WhatsAppClient {
    http: reqwest::Client,
    messages_url: String,
    token: String,
}

impl WhatsAppClient {
    /// Build a client for `messages_url` with a per-request timeout.
    pub fn new(
        messages_url: impl Into<String>,
        token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, DeliveryError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http,
            messages_url: messages_url.into(),
            token: token.into(),
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, DeliveryError> {
        Self::new(
            config.whatsapp_messages_url(),
            config.whatsapp_token.clone(),
            Duration::from_secs(config.notify_attempt_timeout_secs),
        )
    }
}

#[async_trait]
impl MessageSender for WhatsAppClient {
    async fn send_text(&self, to: &str, body: &str) -> Result<(), DeliveryError> {
        let response = self
            .http
            .post(&self.messages_url)
            .bearer_auth(&self.token)
            .json(&TextMessage::new(to, body))
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        // The Graph API explains rejections in the body; keep it for the logs.
        let body = response.text().await.unwrap_or_default();
        Err(DeliveryError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_phone_strips_formatting() {
        assert_eq!(normalize_phone("+1 (555) 010-2000"), "15550102000");
        assert_eq!(normalize_phone("62 812.3456.7890"), "6281234567890");
    }

    #[test]
    fn test_normalize_phone_without_digits_is_empty() {
        assert_eq!(normalize_phone(""), "");
        assert_eq!(normalize_phone("n/a"), "");
    }

    #[test]
    fn test_normalize_phone_ignores_non_ascii_digits() {
        // Arabic-Indic digits are not valid in a WhatsApp `to` field.
        assert_eq!(normalize_phone("٠١٢ 345"), "345");
    }

    #[test]
    fn test_text_message_wire_format() {
        let json = serde_json::to_value(TextMessage::new("15550102000", "hello")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "messaging_product": "whatsapp",
                "to": "15550102000",
                "type": "text",
                "text": { "body": "hello" }
            })
        );
    }
}
