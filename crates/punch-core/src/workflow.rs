//! Punch workflow state machine.
//!
//! One [`PunchWorkflow::run`] drives a fresh browser session through
//! login, navigation to the punch page, the idempotent punch action and
//! evidence capture:
//!
//! ```text
//! Idle → SessionStarted → LoggedIn → OnCheckinPage → ActionEvaluated → Completed
//!   └────────────┴────────────┴─────────────┴───────────────┴──→ Failed
//! ```
//!
//! Whatever happens after the session is launched, the run ends with a
//! single cleanup step that closes the session and deletes the challenge
//! file. Cleanup failures are logged and never replace the run's own error.

use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use punch_browser::{wait_hidden, wait_stable, wait_visible, BrowserLauncher, PunchPage};
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::action::{PunchAction, PunchOutcome, PunchResult};
use crate::approval::ApprovalChannel;
use crate::challenge::Challenge;
use crate::config::{Credentials, PunchConfig};
use crate::error::Result;
use crate::evidence::EvidenceSink;
use crate::portal::{self, Portal};

/// Workflow states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowState {
    Idle,
    SessionStarted,
    LoggedIn,
    OnCheckinPage,
    ActionEvaluated,
    Completed,
    Failed,
}

/// Timing knobs for page waits.
#[derive(Debug, Clone)]
pub struct WorkflowTimings {
    /// Bound for every navigation and element wait.
    pub navigation_timeout: Duration,
    /// How long a control state must hold before it is trusted.
    pub quiescence: Duration,
    /// Interval between page checks.
    pub check_step: Duration,
}

impl Default for WorkflowTimings {
    fn default() -> Self {
        Self {
            navigation_timeout: Duration::from_secs(120),
            quiescence: punch_browser::DEFAULT_QUIESCENCE,
            check_step: punch_browser::DEFAULT_CHECK_STEP,
        }
    }
}

/// Drives one punch at a time through the portal.
pub struct PunchWorkflow {
    portal: Portal,
    credentials: Credentials,
    launcher: Arc<dyn BrowserLauncher>,
    approval: Arc<dyn ApprovalChannel>,
    evidence: EvidenceSink,
    timings: WorkflowTimings,
    state: WorkflowState,
}

impl PunchWorkflow {
    /// Create a workflow from process config. Screenshots go to the
    /// configured directory without display or relay until
    /// [`with_evidence`](Self::with_evidence) says otherwise.
    pub fn new(
        config: &PunchConfig,
        launcher: Arc<dyn BrowserLauncher>,
        approval: Arc<dyn ApprovalChannel>,
    ) -> Self {
        Self {
            portal: Portal::new(config.portal_url.clone()),
            credentials: config.credentials.clone(),
            launcher,
            approval,
            evidence: EvidenceSink::new(config.screenshot_dir.clone()),
            timings: WorkflowTimings {
                navigation_timeout: config.navigation_timeout,
                ..WorkflowTimings::default()
            },
            state: WorkflowState::Idle,
        }
    }

    /// Sets where screenshots go.
    pub fn with_evidence(mut self, evidence: EvidenceSink) -> Self {
        self.evidence = evidence;
        self
    }

    /// Sets the wait timings.
    pub fn with_timings(mut self, timings: WorkflowTimings) -> Self {
        self.timings = timings;
        self
    }

    /// Current state.
    pub fn state(&self) -> WorkflowState {
        self.state
    }

    fn advance(&mut self, next: WorkflowState) {
        debug!(from = ?self.state, to = ?next, "workflow transition");
        self.state = next;
    }

    /// Run one punch.
    pub async fn run(&mut self, action: PunchAction) -> Result<PunchResult> {
        let run_id = Uuid::new_v4();
        let span = info_span!("punch", %run_id, %action);
        self.run_inner(action).instrument(span).await
    }

    async fn run_inner(&mut self, action: PunchAction) -> Result<PunchResult> {
        self.advance(WorkflowState::Idle);
        info!("starting punch run");

        let mut page = match self.launcher.launch().await {
            Ok(page) => page,
            Err(e) => {
                self.advance(WorkflowState::Failed);
                return Err(e.into());
            }
        };
        self.advance(WorkflowState::SessionStarted);

        let mut challenge: Option<Challenge> = None;
        let outcome = self.drive(page.as_ref(), action, &mut challenge).await;

        // Cleanup runs on every path; its own failures are only logged.
        if let Err(e) = page.close().await {
            warn!(error = %e, "failed to close browser session");
        }
        if let Some(challenge) = challenge.take() {
            if let Err(e) = challenge.discard() {
                warn!(error = %e, "failed to delete captcha file");
            }
        }

        match outcome {
            Ok(result) => {
                self.advance(WorkflowState::Completed);
                info!(outcome = ?result.outcome, path = %result.screenshot_path.display(), "punch run completed");
                Ok(result)
            }
            Err(e) => {
                self.advance(WorkflowState::Failed);
                warn!(error = %e, "punch run failed");
                Err(e)
            }
        }
    }

    async fn drive(
        &mut self,
        page: &dyn PunchPage,
        action: PunchAction,
        challenge: &mut Option<Challenge>,
    ) -> Result<PunchResult> {
        self.login(page, challenge).await?;
        self.advance(WorkflowState::LoggedIn);

        self.open_checkin(page).await?;
        self.advance(WorkflowState::OnCheckinPage);

        let outcome = self.evaluate_action(page, action).await?;
        self.advance(WorkflowState::ActionEvaluated);

        let screenshot_path = self.capture_evidence(page, action).await?;
        Ok(PunchResult {
            action,
            outcome,
            screenshot_path,
        })
    }

    async fn login(&self, page: &dyn PunchPage, slot: &mut Option<Challenge>) -> Result<()> {
        let t = &self.timings;
        page.goto(&self.portal.login_url()).await?;
        wait_visible(page, portal::CAPTCHA_IMAGE, t.check_step, t.navigation_timeout).await?;

        let challenge = slot.insert(Challenge::capture(page, portal::CAPTCHA_IMAGE).await?);
        let answer = self.approval.resolve(challenge).await?;
        debug!(channel = ?self.approval.kind(), "captcha answer received");

        page.type_into(portal::USERNAME_INPUT, &self.credentials.username).await?;
        page.type_into(portal::PASSWORD_INPUT, &self.credentials.password).await?;
        page.type_into(portal::CAPTCHA_INPUT, &answer).await?;
        page.click(portal::LOGIN_BUTTON).await?;

        wait_visible(page, portal::DASHBOARD, t.check_step, t.navigation_timeout).await?;
        info!("logged in");
        Ok(())
    }

    async fn open_checkin(&self, page: &dyn PunchPage) -> Result<()> {
        let t = &self.timings;
        page.goto(&self.portal.checkin_url()).await?;
        wait_visible(page, portal::CHECKIN_ROW, t.check_step, t.navigation_timeout).await?;
        Ok(())
    }

    async fn evaluate_action(&self, page: &dyn PunchPage, action: PunchAction) -> Result<PunchOutcome> {
        let t = &self.timings;
        let control = portal::control_selector(action);

        wait_visible(page, &control, t.check_step, t.navigation_timeout).await?;
        let disabled = wait_stable(page, &control, t.quiescence, t.check_step, t.navigation_timeout).await?;

        if disabled {
            info!("control disabled, already punched");
            return Ok(PunchOutcome::AlreadyPunched);
        }

        page.click(&control).await?;
        wait_visible(page, portal::CONFIRM_BUTTON, t.check_step, t.navigation_timeout).await?;
        page.click(portal::CONFIRM_BUTTON).await?;
        wait_hidden(page, portal::MESSAGE_BOX, t.check_step, t.navigation_timeout).await?;
        info!("punched successfully");
        Ok(PunchOutcome::Punched)
    }

    async fn capture_evidence(&self, page: &dyn PunchPage, action: PunchAction) -> Result<std::path::PathBuf> {
        let image = page.screenshot().await?;
        let path = self.evidence.store(&image, Local::now().naive_local(), action)?;
        self.evidence.publish(&path, image).await;
        Ok(path)
    }
}
