//! Messaging transport: the `Messenger` contract and a Telegram Bot API client.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::TelegramConfig;
use crate::errors::{WatchError, WatchResult};

/// A chat plus the forum topic messages are posted into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    pub chat_id: String,
    pub thread_id: i64,
}

impl Destination {
    pub fn new(chat_id: impl Into<String>, thread_id: i64) -> Self {
        Self {
            chat_id: chat_id.into(),
            thread_id,
        }
    }
}

/// Markup dialect of an outgoing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    MarkdownV2,
    Plain,
}

impl ParseMode {
    fn as_api_value(self) -> Option<&'static str> {
        match self {
            ParseMode::MarkdownV2 => Some("MarkdownV2"),
            ParseMode::Plain => None,
        }
    }
}

/// Outbound messaging used by the job.
///
/// Delivery is fire-and-forget: `Ok(())` means the transport accepted the
/// message, nothing more.
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send_text(&self, to: &Destination, text: &str, mode: ParseMode) -> WatchResult<()>;

    async fn send_photo(
        &self,
        to: &Destination,
        image: Vec<u8>,
        caption: &str,
        mode: ParseMode,
    ) -> WatchResult<()>;
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    message_thread_id: i64,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parse_mode: Option<&'static str>,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

/// Telegram Bot API client.
#[derive(Debug, Clone)]
pub struct TelegramClient {
    http: Client,
    api_base: String,
    bot_token: String,
}

impl TelegramClient {
    pub fn new(config: &TelegramConfig) -> WatchResult<Self> {
        if config.bot_token.trim().is_empty() {
            return Err(WatchError::Config("telegram.bot_token is required".to_string()));
        }
        Ok(Self {
            http: Client::new(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            bot_token: config.bot_token.clone(),
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.bot_token, method)
    }

    async fn check(resp: reqwest::Response, method: &str) -> WatchResult<()> {
        let status = resp.status();
        let body: ApiResponse = resp.json().await.map_err(|e| {
            WatchError::Transport(format!("{method}: unreadable response (HTTP {status}): {e}"))
        })?;

        if !status.is_success() || !body.ok {
            return Err(WatchError::Transport(format!(
                "{method} failed with HTTP {status}: {}",
                body.description.unwrap_or_else(|| "no description".to_string())
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl Messenger for TelegramClient {
    async fn send_text(&self, to: &Destination, text: &str, mode: ParseMode) -> WatchResult<()> {
        let payload = SendMessageRequest {
            chat_id: &to.chat_id,
            message_thread_id: to.thread_id,
            text,
            parse_mode: mode.as_api_value(),
        };

        let resp = self
            .http
            .post(self.method_url("sendMessage"))
            .json(&payload)
            .send()
            .await?;

        Self::check(resp, "sendMessage").await?;
        debug!(chat_id = %to.chat_id, thread_id = to.thread_id, "message sent");
        Ok(())
    }

    async fn send_photo(
        &self,
        to: &Destination,
        image: Vec<u8>,
        caption: &str,
        mode: ParseMode,
    ) -> WatchResult<()> {
        let photo = Part::bytes(image)
            .file_name("qr.png")
            .mime_str("image/png")?;

        let mut form = Form::new()
            .text("chat_id", to.chat_id.clone())
            .text("message_thread_id", to.thread_id.to_string())
            .text("caption", caption.to_string())
            .part("photo", photo);
        if let Some(parse_mode) = mode.as_api_value() {
            form = form.text("parse_mode", parse_mode);
        }

        let resp = self
            .http
            .post(self.method_url("sendPhoto"))
            .multipart(form)
            .send()
            .await?;

        Self::check(resp, "sendPhoto").await?;
        debug!(chat_id = %to.chat_id, thread_id = to.thread_id, "photo sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_mode_omits_parse_mode() {
        let payload = SendMessageRequest {
            chat_id: "-100123",
            message_thread_id: 12,
            text: "hello",
            parse_mode: ParseMode::Plain.as_api_value(),
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["chat_id"], "-100123");
        assert_eq!(json["message_thread_id"], 12);
        assert!(json.get("parse_mode").is_none());

        let payload = SendMessageRequest {
            parse_mode: ParseMode::MarkdownV2.as_api_value(),
            ..payload
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["parse_mode"], "MarkdownV2");
    }

    #[test]
    fn client_requires_a_token() {
        let config = TelegramConfig {
            bot_token: "  ".to_string(),
            ..TelegramConfig::default()
        };
        assert!(matches!(TelegramClient::new(&config), Err(WatchError::Config(_))));
    }

    #[test]
    fn method_urls_embed_the_token() {
        let config = TelegramConfig {
            bot_token: "123:abc".to_string(),
            api_base: "https://api.telegram.org/".to_string(),
        };
        let client = TelegramClient::new(&config).unwrap();
        assert_eq!(
            client.method_url("sendMessage"),
            "https://api.telegram.org/bot123:abc/sendMessage"
        );
    }
}
