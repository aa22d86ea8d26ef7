//! Message relay client for the timecard puncher.
//!
//! The relay is the Telegram Bot API, used as a shared store-and-forward
//! mailbox: the operator sends commands and CAPTCHA answers to the bot, and
//! the puncher sends challenge images, acknowledgements and screenshots back.
//!
//! There is no push channel. Consumers poll [`MessageRelay::fetch_updates`]
//! and filter the results themselves; the client never loops or retries.
//!
//! # Example
//!
//! ```no_run
//! use punch_relay::{ChatId, MessageRelay, TelegramRelay};
//!
//! # async fn demo() -> punch_relay::Result<()> {
//! let relay = TelegramRelay::new("123456:bot-token");
//! relay.send_text(ChatId(42), "hello").await?;
//!
//! for message in relay.fetch_updates(Some(0)).await? {
//!     println!("{} from {}: {}", message.id, message.sender, message.text);
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod message;

pub use client::{MessageRelay, TelegramRelay, TELEGRAM_API_BASE};
pub use error::{RelayError, Result};
pub use message::{ChatId, InboundMessage, SentPhoto};
