//! Relay client trait and the Telegram Bot API implementation.

use std::fmt;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, trace};

use crate::error::{RelayError, Result};
use crate::message::{into_messages, ApiResponse, ChatId, InboundMessage, SentPhoto, WireMessage, WireUpdate};

/// Default Bot API endpoint.
pub const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// File name used for uploaded photos.
const PHOTO_FILE_NAME: &str = "photo.png";

/// Request/response operations against the message relay.
///
/// Every method is a single round trip; polling cadence belongs to the caller.
#[async_trait]
pub trait MessageRelay: Send + Sync {
    /// Fetch messages from the relay.
    ///
    /// With `Some(id)` only messages with an update id greater than `id` are
    /// returned. With `None` the relay's whole pending mailbox is returned.
    async fn fetch_updates(&self, after: Option<i64>) -> Result<Vec<InboundMessage>>;

    /// Send a text message.
    async fn send_text(&self, recipient: ChatId, text: &str) -> Result<()>;

    /// Send a PNG photo with an optional caption.
    async fn send_photo(
        &self,
        recipient: ChatId,
        image: Vec<u8>,
        caption: Option<&str>,
    ) -> Result<SentPhoto>;
}

/// Telegram Bot API relay client.
#[derive(Clone)]
pub struct TelegramRelay {
    client: reqwest::Client,
    api_base: String,
    token: String,
}

impl fmt::Debug for TelegramRelay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramRelay")
            .field("api_base", &self.api_base)
            .field("token", &"<redacted>")
            .finish()
    }
}

impl TelegramRelay {
    /// Create a client for the given bot token.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: TELEGRAM_API_BASE.to_string(),
            token: token.into(),
        }
    }

    /// Point the client at a different API base (e.g. a local test server).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.token, method)
    }

    /// Decode a Bot API envelope, turning `ok: false` into `Rejected`.
    async fn decode<T: DeserializeOwned>(
        method: &'static str,
        response: reqwest::Response,
    ) -> Result<T> {
        let status = response.status();
        let body = response.text().await?;
        trace!(method, status = %status, body_len = body.len(), "relay response");

        let envelope: ApiResponse<T> = serde_json::from_str(&body).map_err(|e| {
            if status.is_success() {
                RelayError::Decode { method, reason: e.to_string() }
            } else {
                RelayError::Http(format!("{} returned {}", method, status))
            }
        })?;

        if !envelope.ok {
            return Err(RelayError::Rejected {
                method,
                description: envelope
                    .description
                    .unwrap_or_else(|| format!("status {}", status)),
            });
        }

        envelope.result.ok_or_else(|| RelayError::Decode {
            method,
            reason: "missing result".to_string(),
        })
    }
}

#[async_trait]
impl MessageRelay for TelegramRelay {
    async fn fetch_updates(&self, after: Option<i64>) -> Result<Vec<InboundMessage>> {
        let mut request = self.client.get(self.method_url("getUpdates"));
        if let Some(after) = after {
            request = request.query(&[("offset", after + 1)]);
        }

        let response = request.send().await?;
        let updates: Vec<WireUpdate> = Self::decode("getUpdates", response).await?;
        let messages = into_messages(updates);
        debug!(after = ?after, count = messages.len(), "fetched relay updates");
        Ok(messages)
    }

    async fn send_text(&self, recipient: ChatId, text: &str) -> Result<()> {
        let response = self
            .client
            .post(self.method_url("sendMessage"))
            .json(&json!({ "chat_id": recipient.0, "text": text }))
            .send()
            .await?;

        let _sent: WireMessage = Self::decode("sendMessage", response).await?;
        debug!(chat_id = %recipient, "text sent");
        Ok(())
    }

    async fn send_photo(
        &self,
        recipient: ChatId,
        image: Vec<u8>,
        caption: Option<&str>,
    ) -> Result<SentPhoto> {
        let photo = Part::bytes(image)
            .file_name(PHOTO_FILE_NAME)
            .mime_str("image/png")
            .map_err(|e| RelayError::InvalidPayload(e.to_string()))?;

        let mut form = Form::new()
            .text("chat_id", recipient.0.to_string())
            .part("photo", photo);
        if let Some(caption) = caption {
            form = form.text("caption", caption.to_string());
        }

        let response = self
            .client
            .post(self.method_url("sendPhoto"))
            .multipart(form)
            .send()
            .await?;

        let sent: WireMessage = Self::decode("sendPhoto", response).await?;
        let photo = sent.into_sent_photo().ok_or(RelayError::Decode {
            method: "sendPhoto",
            reason: "date out of range".to_string(),
        })?;
        debug!(chat_id = %recipient, message_id = photo.message_id, sent_at = %photo.sent_at, "photo sent");
        Ok(photo)
    }
}
