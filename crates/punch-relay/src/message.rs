//! Relay message model and Bot API wire types.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Chat identifier on the relay (user, group, or channel).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(transparent)]
pub struct ChatId(pub i64);

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A message received from the relay. Immutable once received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// Relay-assigned update id, monotonic across the bot's mailbox.
    pub id: i64,
    /// Chat the message was sent from.
    pub sender: ChatId,
    /// Message text; empty for non-text messages.
    pub text: String,
    /// Relay server timestamp (whole seconds).
    pub sent_at: DateTime<Utc>,
    /// Message id this message replies to, if it is a reply.
    pub reply_to: Option<i64>,
}

/// Acknowledgement for a photo accepted by the relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SentPhoto {
    /// Relay message id of the photo.
    pub message_id: i64,
    /// Relay server timestamp of the photo.
    pub sent_at: DateTime<Utc>,
}

/// Generic Bot API response envelope.
#[derive(Debug, Deserialize)]
pub(crate) struct ApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireUpdate {
    pub update_id: i64,
    pub message: Option<WireMessage>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireMessage {
    pub message_id: i64,
    pub chat: WireChat,
    pub text: Option<String>,
    pub date: i64,
    pub reply_to_message: Option<WireReply>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireChat {
    pub id: ChatId,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireReply {
    pub message_id: i64,
}

/// Converts a relay unix timestamp into a UTC datetime.
pub(crate) fn relay_time(secs: i64) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(secs, 0)
}

/// Converts a batch of wire updates into inbound messages.
///
/// Updates that carry no message (edits, callbacks, ...) are skipped;
/// relay order is preserved.
pub(crate) fn into_messages(updates: Vec<WireUpdate>) -> Vec<InboundMessage> {
    updates
        .into_iter()
        .filter_map(|update| {
            let message = update.message?;
            let sent_at = relay_time(message.date)?;
            Some(InboundMessage {
                id: update.update_id,
                sender: message.chat.id,
                text: message.text.unwrap_or_default(),
                sent_at,
                reply_to: message.reply_to_message.map(|r| r.message_id),
            })
        })
        .collect()
}

impl WireMessage {
    pub(crate) fn into_sent_photo(self) -> Option<SentPhoto> {
        Some(SentPhoto {
            message_id: self.message_id,
            sent_at: relay_time(self.date)?,
        })
    }
}
