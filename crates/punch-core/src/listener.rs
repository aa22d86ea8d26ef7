//! Remote command listener.
//!
//! Polls the relay for operator messages and turns `pi` / `po` into punch
//! runs on the [`PunchWorker`]. Run outcomes come back on the worker's
//! report channel and are relayed to the operator.
//!
//! The relay deletes every update below the offset a reader sends. While a
//! run is in flight its approval loop reads the same mailbox without an
//! offset, so the listener holds its offset where it was when the run
//! started and skips already-seen ids locally.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, SubsecRound, Utc};
use punch_relay::{ChatId, MessageRelay};
use tokio::sync::{mpsc, watch};
use tokio::time::interval;
use tracing::{debug, info, trace, warn};

use crate::action::PunchAction;
use crate::worker::{PunchWorker, RunReport, WorkerBusy};

/// Default interval between relay polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Highest relay message id the listener has processed.
///
/// Kept in memory only. After a restart it begins at zero again and the
/// start-time filter keeps old commands from being replayed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateCursor(i64);

impl UpdateCursor {
    pub fn last(&self) -> i64 {
        self.0
    }

    /// Move past `id`. Returns false if `id` was already processed.
    pub fn advance(&mut self, id: i64) -> bool {
        if id <= self.0 {
            return false;
        }
        self.0 = id;
        true
    }
}

/// A recognized operator command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteCommand {
    PunchIn,
    PunchOut,
}

impl RemoteCommand {
    /// Parse a message body. Case and surrounding whitespace are ignored.
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim().to_lowercase().as_str() {
            "pi" => Some(RemoteCommand::PunchIn),
            "po" => Some(RemoteCommand::PunchOut),
            _ => None,
        }
    }

    pub fn action(&self) -> PunchAction {
        match self {
            RemoteCommand::PunchIn => PunchAction::In,
            RemoteCommand::PunchOut => PunchAction::Out,
        }
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            RemoteCommand::PunchIn => "pi",
            RemoteCommand::PunchOut => "po",
        }
    }
}

/// Polls the relay and dispatches operator commands.
pub struct CommandListener {
    relay: Arc<dyn MessageRelay>,
    operator: ChatId,
    started_at: DateTime<Utc>,
    cursor: UpdateCursor,
    /// Offset last sent to the relay; frozen while a run is in flight.
    confirmed: i64,
    poll_interval: Duration,
    worker: PunchWorker,
    reports: mpsc::UnboundedReceiver<RunReport>,
}

impl CommandListener {
    /// `reports` must be the receiving end of the worker's report channel.
    pub fn new(
        relay: Arc<dyn MessageRelay>,
        operator: ChatId,
        worker: PunchWorker,
        reports: mpsc::UnboundedReceiver<RunReport>,
    ) -> Self {
        Self {
            relay,
            operator,
            started_at: Utc::now().trunc_subsecs(0),
            cursor: UpdateCursor::default(),
            confirmed: 0,
            poll_interval: DEFAULT_POLL_INTERVAL,
            worker,
            reports,
        }
    }

    /// Messages sent before `at` are never acted on. Relay timestamps have
    /// whole-second precision, so `at` is truncated to the second.
    pub fn with_started_at(mut self, at: DateTime<Utc>) -> Self {
        self.started_at = at.trunc_subsecs(0);
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn cursor(&self) -> UpdateCursor {
        self.cursor
    }

    /// Run until `shutdown` turns true.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = interval(self.poll_interval);

        info!(
            operator = %self.operator,
            started_at = %self.started_at,
            poll_interval_ms = self.poll_interval.as_millis(),
            "command listener started"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.poll_once().await;
                }
                Some(report) = self.reports.recv() => {
                    self.handle_report(report).await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        debug!("listener received shutdown signal");
                        break;
                    }
                }
            }
        }

        info!("command listener stopped");
    }

    /// Fetch and process one batch. Returns how many runs were started.
    pub async fn poll_once(&mut self) -> usize {
        if !self.worker.is_busy() {
            self.confirmed = self.cursor.last();
        }
        let mut messages = match self.relay.fetch_updates(Some(self.confirmed)).await {
            Ok(messages) => messages,
            Err(e) => {
                warn!(error = %e, "failed to fetch updates");
                return 0;
            }
        };
        messages.sort_by_key(|m| m.id);

        let mut started = 0;
        for message in messages {
            if !self.cursor.advance(message.id) {
                trace!(id = message.id, "already processed");
                continue;
            }
            if message.sent_at < self.started_at {
                debug!(id = message.id, sent_at = %message.sent_at, "ignoring message from before start");
                continue;
            }
            if message.sender != self.operator {
                debug!(id = message.id, sender = %message.sender, "ignoring message from unknown sender");
                continue;
            }
            let Some(command) = RemoteCommand::parse(&message.text) else {
                trace!(id = message.id, "not a command");
                continue;
            };
            if self.submit(command).await {
                started += 1;
            }
        }
        started
    }

    async fn submit(&self, command: RemoteCommand) -> bool {
        let action = command.action();
        match self.worker.try_submit(action) {
            Ok(()) => {
                info!(%action, "punch command accepted");
                self.notify(&format!(
                    "📥 Received \"{}\" – punching {}...",
                    command.keyword(),
                    action
                ))
                .await;
                true
            }
            Err(WorkerBusy) => {
                warn!(%action, "punch already in progress, command rejected");
                self.notify(&format!(
                    "⏳ A punch is already in progress – ignoring \"{}\"",
                    command.keyword()
                ))
                .await;
                false
            }
        }
    }

    async fn handle_report(&self, report: RunReport) {
        match &report.outcome {
            Ok(result) => info!(action = %report.action, outcome = ?result.outcome, "punch reported"),
            Err(e) => warn!(action = %report.action, error = %e, "punch failed"),
        }
        self.notify(&report.message()).await;
    }

    async fn notify(&self, text: &str) {
        if let Err(e) = self.relay.send_text(self.operator, text).await {
            warn!(error = %e, "failed to notify operator");
        }
    }
}
