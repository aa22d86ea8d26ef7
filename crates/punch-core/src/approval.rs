//! Human answers for CAPTCHA challenges.
//!
//! Two channels resolve a [`Challenge`] into an answer string:
//!
//! - [`InteractiveApproval`]: show the image locally and read one line from
//!   the terminal
//! - [`RemoteApproval`]: send the image through the relay and poll the
//!   operator's chat for a reply
//!
//! The relay has no per-reader cursor and no push, so a remote answer is
//! matched to its challenge by sender, by timestamp (never earlier than the
//! moment the photo was accepted) and, when the operator uses the reply
//! feature, by the id of the challenge photo being replied to.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use punch_relay::{ChatId, InboundMessage, MessageRelay, SentPhoto};
use regex::Regex;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tokio::time::sleep;
use tracing::{debug, info, trace, warn};

use crate::challenge::Challenge;
use crate::error::{PunchError, Result};
use crate::viewer;

/// Default interval between relay polls while waiting for an answer.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Delay after a failed relay poll.
pub const DEFAULT_ERROR_BACKOFF: Duration = Duration::from_secs(10);

const PROMPT: &str = "Please enter the CAPTCHA result: ";

const CHALLENGE_CAPTION: &str = "🔐 CAPTCHA for timecard login. Reply with the number.";

/// Pattern every CAPTCHA answer must match. ASCII digits only: the portal
/// field does not accept other numerals.
fn answer_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^-?[0-9]+$").expect("answer pattern is valid"))
}

/// Which channel collects answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    Interactive,
    Remote,
}

/// Obtains a human answer for a pending challenge.
#[async_trait]
pub trait ApprovalChannel: Send + Sync {
    /// Block until an answer is available.
    async fn resolve(&self, challenge: &Challenge) -> Result<String>;

    /// Which kind of channel this is.
    fn kind(&self) -> ChannelKind;
}

/// Terminal prompt with a local image viewer.
#[derive(Debug, Default)]
pub struct InteractiveApproval;

impl InteractiveApproval {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ApprovalChannel for InteractiveApproval {
    async fn resolve(&self, challenge: &Challenge) -> Result<String> {
        if let Err(e) = viewer::open_image(challenge.local_path()) {
            warn!(error = %e, "could not open captcha image automatically");
            println!("CAPTCHA image: {}", challenge.local_path().display());
        }

        let line = tokio::task::spawn_blocking(|| -> std::result::Result<String, ReadlineError> {
            let mut editor = DefaultEditor::new()?;
            editor.readline(PROMPT)
        })
        .await
        .map_err(|e| PunchError::ApprovalAborted(e.to_string()))?;

        match line {
            Ok(answer) => Ok(answer.trim().to_string()),
            Err(ReadlineError::Interrupted) => Err(PunchError::ApprovalAborted("interrupted".to_string())),
            Err(ReadlineError::Eof) => Err(PunchError::ApprovalAborted("end of input".to_string())),
            Err(e) => Err(PunchError::ApprovalAborted(e.to_string())),
        }
    }

    fn kind(&self) -> ChannelKind {
        ChannelKind::Interactive
    }
}

/// Acceptance rule for answers to one dispatched challenge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnswerWatermark {
    /// Only this chat may answer.
    pub approver: ChatId,
    /// Relay time at which the challenge photo was accepted.
    pub dispatched_at: DateTime<Utc>,
    /// Relay message id of the challenge photo.
    pub challenge_message_id: i64,
}

impl AnswerWatermark {
    pub fn new(approver: ChatId, sent: SentPhoto) -> Self {
        Self {
            approver,
            dispatched_at: sent.sent_at,
            challenge_message_id: sent.message_id,
        }
    }

    /// The trimmed answer if `message` answers this challenge.
    pub fn accept(&self, message: &InboundMessage) -> Option<String> {
        if message.sender != self.approver || message.sent_at < self.dispatched_at {
            return None;
        }
        // A reply to some other message is about something else.
        if message.reply_to.is_some_and(|id| id != self.challenge_message_id) {
            return None;
        }
        let text = message.text.trim();
        answer_pattern().is_match(text).then(|| text.to_string())
    }
}

/// Resolve challenges through the message relay.
pub struct RemoteApproval {
    relay: Arc<dyn MessageRelay>,
    approver: ChatId,
    poll_interval: Duration,
    error_backoff: Duration,
}

impl RemoteApproval {
    pub fn new(relay: Arc<dyn MessageRelay>, approver: ChatId) -> Self {
        Self {
            relay,
            approver,
            poll_interval: DEFAULT_POLL_INTERVAL,
            error_backoff: DEFAULT_ERROR_BACKOFF,
        }
    }

    /// Sets the poll interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Sets the delay after a failed poll.
    pub fn with_error_backoff(mut self, backoff: Duration) -> Self {
        self.error_backoff = backoff;
        self
    }

    /// Send the challenge photo and return the acceptance rule for replies.
    async fn dispatch(&self, challenge: &Challenge) -> Result<AnswerWatermark> {
        let sent = self
            .relay
            .send_photo(
                self.approver,
                challenge.image_bytes().to_vec(),
                Some(CHALLENGE_CAPTION),
            )
            .await?;
        info!(
            chat_id = %self.approver,
            message_id = sent.message_id,
            dispatched_at = %sent.sent_at,
            "captcha sent, waiting for answer"
        );
        Ok(AnswerWatermark::new(self.approver, sent))
    }

    /// Poll until an acceptable answer arrives. Never gives up.
    async fn wait_for_answer(&self, watermark: AnswerWatermark) -> String {
        let mut polls: u64 = 0;
        loop {
            polls += 1;
            match self.relay.fetch_updates(None).await {
                Ok(messages) => {
                    trace!(poll = polls, count = messages.len(), "scanning for captcha answer");
                    if let Some(answer) = messages.iter().find_map(|m| watermark.accept(m)) {
                        debug!(polls, "captcha answer accepted");
                        return answer;
                    }
                    sleep(self.poll_interval).await;
                }
                Err(e) => {
                    warn!(error = %e, "error checking for captcha answer");
                    sleep(self.error_backoff).await;
                }
            }
        }
    }
}

#[async_trait]
impl ApprovalChannel for RemoteApproval {
    async fn resolve(&self, challenge: &Challenge) -> Result<String> {
        let watermark = self.dispatch(challenge).await?;
        Ok(self.wait_for_answer(watermark).await)
    }

    fn kind(&self) -> ChannelKind {
        ChannelKind::Remote
    }
}
