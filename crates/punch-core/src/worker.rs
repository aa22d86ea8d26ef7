//! Background punch runs for the command listener.
//!
//! [`PunchWorker`] runs at most one punch at a time. Each accepted run is
//! a supervised task: its result, or the panic that ended it, is sent to
//! the listener as a [`RunReport`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use punch_browser::BrowserLauncher;
use punch_relay::{ChatId, MessageRelay};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::action::{PunchAction, PunchOutcome, PunchResult};
use crate::approval::RemoteApproval;
use crate::config::PunchConfig;
use crate::error::{ConfigError, Result};
use crate::evidence::EvidenceSink;
use crate::workflow::PunchWorkflow;

/// Executes one punch.
#[async_trait]
pub trait PunchRunner: Send + Sync {
    async fn punch(&self, action: PunchAction) -> Result<PunchResult>;
}

/// Runs the full workflow with remote approval and relayed screenshots.
pub struct WorkflowRunner {
    config: PunchConfig,
    launcher: Arc<dyn BrowserLauncher>,
    relay: Arc<dyn MessageRelay>,
    operator: ChatId,
}

impl WorkflowRunner {
    /// Fails when the relay is not configured.
    pub fn new(
        config: PunchConfig,
        launcher: Arc<dyn BrowserLauncher>,
        relay: Arc<dyn MessageRelay>,
    ) -> std::result::Result<Self, ConfigError> {
        let operator = config.require_relay()?.chat_id;
        Ok(Self {
            config,
            launcher,
            relay,
            operator,
        })
    }
}

#[async_trait]
impl PunchRunner for WorkflowRunner {
    async fn punch(&self, action: PunchAction) -> Result<PunchResult> {
        let approval = Arc::new(RemoteApproval::new(Arc::clone(&self.relay), self.operator));
        let evidence = EvidenceSink::new(self.config.screenshot_dir.clone())
            .with_relay(Arc::clone(&self.relay), self.operator);
        let mut workflow = PunchWorkflow::new(&self.config, Arc::clone(&self.launcher), approval)
            .with_evidence(evidence);
        workflow.run(action).await
    }
}

/// Outcome of one background run.
#[derive(Debug)]
pub struct RunReport {
    pub action: PunchAction,
    /// The result, or the error text of a failed or panicked run.
    pub outcome: std::result::Result<PunchResult, String>,
}

impl RunReport {
    /// Message for the operator.
    pub fn message(&self) -> String {
        match &self.outcome {
            Ok(result) => match result.outcome {
                PunchOutcome::Punched => format!("✅ Punched {}", self.action),
                PunchOutcome::AlreadyPunched => format!("⛔ Already punched {}", self.action),
            },
            Err(e) => format!("💥 Punch {} failed: {}", self.action, e),
        }
    }
}

/// A run is already in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("a punch is already in progress")]
pub struct WorkerBusy;

/// Clears the busy flag when the supervising task ends, however it ends.
struct BusyGuard(Arc<AtomicBool>);

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Single-slot punch executor.
pub struct PunchWorker {
    runner: Arc<dyn PunchRunner>,
    busy: Arc<AtomicBool>,
    reports: mpsc::UnboundedSender<RunReport>,
}

impl PunchWorker {
    pub fn new(runner: Arc<dyn PunchRunner>, reports: mpsc::UnboundedSender<RunReport>) -> Self {
        Self {
            runner,
            busy: Arc::new(AtomicBool::new(false)),
            reports,
        }
    }

    /// Whether a run is in flight.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Start a run in the background, or refuse if one is in flight.
    pub fn try_submit(&self, action: PunchAction) -> std::result::Result<(), WorkerBusy> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(WorkerBusy);
        }

        let guard = BusyGuard(Arc::clone(&self.busy));
        let runner = Arc::clone(&self.runner);
        let reports = self.reports.clone();

        tokio::spawn(async move {
            let run = tokio::spawn(async move { runner.punch(action).await });

            let outcome = match run.await {
                Ok(Ok(result)) => Ok(result),
                Ok(Err(e)) => Err(e.to_string()),
                Err(join_error) => {
                    error!(%action, error = %join_error, "punch task ended abnormally");
                    if join_error.is_panic() {
                        Err("punch task panicked".to_string())
                    } else {
                        Err("punch task was cancelled".to_string())
                    }
                }
            };

            // Idle again before the listener hears about it.
            drop(guard);

            info!(%action, ok = outcome.is_ok(), "punch run finished");
            if reports.send(RunReport { action, outcome }).is_err() {
                debug!(%action, "report receiver dropped");
            }
        });

        Ok(())
    }
}
