//! Test doubles: a scripted relay and a simulated timecard portal.

use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use punch_browser::{BrowserError, BrowserLauncher, PunchPage};
use punch_relay::{ChatId, InboundMessage, MessageRelay, RelayError, SentPhoto};

use tokio::sync::Notify;

use crate::action::{PunchAction, PunchOutcome, PunchResult};
use crate::approval::{ApprovalChannel, ChannelKind};
use crate::challenge::Challenge;
use crate::error::PunchError;
use crate::portal;
use crate::worker::PunchRunner;

pub(crate) fn message(id: i64, sender: ChatId, text: &str, sent_at: DateTime<Utc>) -> InboundMessage {
    InboundMessage {
        id,
        sender,
        text: text.to_string(),
        sent_at,
        reply_to: None,
    }
}

// ==================== Relay ====================

/// Relay returning scripted batches and recording every send.
pub(crate) struct FakeRelay {
    batches: Mutex<VecDeque<punch_relay::Result<Vec<InboundMessage>>>>,
    fetch_calls: Mutex<Vec<Option<i64>>>,
    texts: Mutex<Vec<(ChatId, String)>>,
    photos: Mutex<Vec<(ChatId, Vec<u8>, Option<String>)>>,
    photo_time: DateTime<Utc>,
    fail_photos: bool,
    next_message_id: AtomicI64,
}

impl FakeRelay {
    pub fn new() -> Self {
        Self {
            batches: Mutex::new(VecDeque::new()),
            fetch_calls: Mutex::new(Vec::new()),
            texts: Mutex::new(Vec::new()),
            photos: Mutex::new(Vec::new()),
            photo_time: Utc::now(),
            fail_photos: false,
            next_message_id: AtomicI64::new(100),
        }
    }

    pub fn with_photo_time(mut self, at: DateTime<Utc>) -> Self {
        self.photo_time = at;
        self
    }

    pub fn failing_photos(mut self) -> Self {
        self.fail_photos = true;
        self
    }

    /// Queue the result of the next fetch. Empty queue fetches return nothing.
    pub fn push_batch(&self, batch: punch_relay::Result<Vec<InboundMessage>>) {
        self.batches.lock().unwrap().push_back(batch);
    }

    pub fn fetch_calls(&self) -> Vec<Option<i64>> {
        self.fetch_calls.lock().unwrap().clone()
    }

    pub fn texts(&self) -> Vec<(ChatId, String)> {
        self.texts.lock().unwrap().clone()
    }

    pub fn photos(&self) -> Vec<(ChatId, Vec<u8>, Option<String>)> {
        self.photos.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessageRelay for FakeRelay {
    async fn fetch_updates(&self, after: Option<i64>) -> punch_relay::Result<Vec<InboundMessage>> {
        self.fetch_calls.lock().unwrap().push(after);
        self.batches
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn send_text(&self, recipient: ChatId, text: &str) -> punch_relay::Result<()> {
        self.texts.lock().unwrap().push((recipient, text.to_string()));
        Ok(())
    }

    async fn send_photo(
        &self,
        recipient: ChatId,
        image: Vec<u8>,
        caption: Option<&str>,
    ) -> punch_relay::Result<SentPhoto> {
        if self.fail_photos {
            return Err(RelayError::Rejected {
                method: "sendPhoto",
                description: "Bad Request: chat not found".to_string(),
            });
        }
        self.photos
            .lock()
            .unwrap()
            .push((recipient, image, caption.map(str::to_string)));
        Ok(SentPhoto {
            message_id: self.next_message_id.fetch_add(1, Ordering::SeqCst),
            sent_at: self.photo_time,
        })
    }
}

/// Relay with Bot API mailbox semantics: fetching with `Some(after)`
/// deletes every update at or below `after`; fetching with `None` reads
/// whatever is still pending.
pub(crate) struct BotMailbox {
    pending: Mutex<Vec<InboundMessage>>,
    failing_unscoped: AtomicUsize,
    texts: Mutex<Vec<(ChatId, String)>>,
    photo_time: DateTime<Utc>,
    next_message_id: AtomicI64,
}

impl BotMailbox {
    pub fn new(photo_time: DateTime<Utc>) -> Self {
        Self {
            pending: Mutex::new(Vec::new()),
            failing_unscoped: AtomicUsize::new(0),
            texts: Mutex::new(Vec::new()),
            photo_time,
            next_message_id: AtomicI64::new(500),
        }
    }

    /// The next `count` fetches without an offset fail.
    pub fn failing_unscoped_fetches(self, count: usize) -> Self {
        self.failing_unscoped.store(count, Ordering::SeqCst);
        self
    }

    pub fn deliver(&self, message: InboundMessage) {
        self.pending.lock().unwrap().push(message);
    }

    pub fn pending_ids(&self) -> Vec<i64> {
        self.pending.lock().unwrap().iter().map(|m| m.id).collect()
    }

    pub fn texts(&self) -> Vec<String> {
        self.texts.lock().unwrap().iter().map(|(_, t)| t.clone()).collect()
    }
}

#[async_trait]
impl MessageRelay for BotMailbox {
    async fn fetch_updates(&self, after: Option<i64>) -> punch_relay::Result<Vec<InboundMessage>> {
        match after {
            Some(after) => {
                let mut pending = self.pending.lock().unwrap();
                pending.retain(|m| m.id > after);
                Ok(pending.clone())
            }
            None => {
                let failing = self.failing_unscoped.load(Ordering::SeqCst);
                if failing > 0 {
                    self.failing_unscoped.store(failing - 1, Ordering::SeqCst);
                    return Err(RelayError::Http("connection reset".to_string()));
                }
                Ok(self.pending.lock().unwrap().clone())
            }
        }
    }

    async fn send_text(&self, recipient: ChatId, text: &str) -> punch_relay::Result<()> {
        self.texts.lock().unwrap().push((recipient, text.to_string()));
        Ok(())
    }

    async fn send_photo(
        &self,
        _recipient: ChatId,
        _image: Vec<u8>,
        _caption: Option<&str>,
    ) -> punch_relay::Result<SentPhoto> {
        Ok(SentPhoto {
            message_id: self.next_message_id.fetch_add(1, Ordering::SeqCst),
            sent_at: self.photo_time,
        })
    }
}

/// Runner that only resolves a CAPTCHA through `approval`.
pub(crate) struct ApprovingRunner<A> {
    approval: A,
    answers: Mutex<Vec<String>>,
}

impl<A: ApprovalChannel> ApprovingRunner<A> {
    pub fn new(approval: A) -> Self {
        Self {
            approval,
            answers: Mutex::new(Vec::new()),
        }
    }

    pub fn answers(&self) -> Vec<String> {
        self.answers.lock().unwrap().clone()
    }
}

#[async_trait]
impl<A: ApprovalChannel> PunchRunner for ApprovingRunner<A> {
    async fn punch(&self, action: PunchAction) -> crate::Result<PunchResult> {
        let challenge = Challenge::from_data_url(CAPTCHA_DATA_URL)?;
        let answer = self.approval.resolve(&challenge).await?;
        self.answers.lock().unwrap().push(answer);
        Ok(PunchResult {
            action,
            outcome: PunchOutcome::Punched,
            screenshot_path: PathBuf::from(format!("{}.png", action)),
        })
    }
}

// ==================== Portal ====================

pub(crate) const CAPTCHA_DATA_URL: &str = "data:image/png;base64,iVBORw0KGgo=";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Screen {
    Blank,
    Login,
    Dashboard,
    Checkin,
}

/// Observable state of the simulated portal.
#[derive(Debug)]
pub(crate) struct PortalState {
    pub screen: Screen,
    pub logged_in: bool,
    pub expected_answer: String,
    pub captcha_src: Option<String>,
    pub typed: HashMap<String, String>,
    pub in_disabled: bool,
    pub out_disabled: bool,
    pub dialog_open: bool,
    pub clicks: Vec<String>,
    pub visited: Vec<String>,
    pub screenshots: usize,
    pub closed: bool,
    pub fail_close: bool,
}

impl PortalState {
    fn new(expected_answer: &str) -> Self {
        Self {
            screen: Screen::Blank,
            logged_in: false,
            expected_answer: expected_answer.to_string(),
            captcha_src: Some(CAPTCHA_DATA_URL.to_string()),
            typed: HashMap::new(),
            in_disabled: false,
            out_disabled: false,
            dialog_open: false,
            clicks: Vec::new(),
            visited: Vec::new(),
            screenshots: 0,
            closed: false,
            fail_close: false,
        }
    }

    fn control_disabled(&self, selector: &str) -> Option<bool> {
        if selector == portal::control_selector(PunchAction::In) {
            Some(self.in_disabled)
        } else if selector == portal::control_selector(PunchAction::Out) {
            Some(self.out_disabled)
        } else {
            None
        }
    }
}

pub(crate) type SharedPortal = Arc<Mutex<PortalState>>;

pub(crate) fn portal_state(expected_answer: &str) -> SharedPortal {
    Arc::new(Mutex::new(PortalState::new(expected_answer)))
}

/// Page backed by [`PortalState`].
pub(crate) struct FakePage {
    state: SharedPortal,
}

impl FakePage {
    fn check_open(state: &PortalState) -> punch_browser::Result<()> {
        if state.closed {
            return Err(BrowserError::Cdp("page closed".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl PunchPage for FakePage {
    async fn goto(&self, url: &str) -> punch_browser::Result<()> {
        let mut state = self.state.lock().unwrap();
        Self::check_open(&state)?;
        state.visited.push(url.to_string());
        state.dialog_open = false;
        state.screen = if url.ends_with("/login") {
            Screen::Login
        } else if url.ends_with("/employee/checkIn") && state.logged_in {
            Screen::Checkin
        } else if url.ends_with("/employee/checkIn") {
            Screen::Login
        } else {
            Screen::Blank
        };
        Ok(())
    }

    async fn is_visible(&self, selector: &str) -> punch_browser::Result<bool> {
        let state = self.state.lock().unwrap();
        Self::check_open(&state)?;
        let visible = match state.screen {
            Screen::Login => match selector {
                portal::CAPTCHA_IMAGE => state.captcha_src.is_some(),
                portal::USERNAME_INPUT
                | portal::PASSWORD_INPUT
                | portal::CAPTCHA_INPUT
                | portal::LOGIN_BUTTON => true,
                _ => false,
            },
            Screen::Dashboard => selector == portal::DASHBOARD,
            Screen::Checkin => match selector {
                portal::CHECKIN_ROW => true,
                portal::MESSAGE_BOX | portal::CONFIRM_BUTTON => state.dialog_open,
                other => state.control_disabled(other).is_some(),
            },
            Screen::Blank => false,
        };
        Ok(visible)
    }

    async fn is_disabled(&self, selector: &str) -> punch_browser::Result<Option<bool>> {
        let state = self.state.lock().unwrap();
        Self::check_open(&state)?;
        if state.screen != Screen::Checkin {
            return Ok(None);
        }
        Ok(state.control_disabled(selector))
    }

    async fn image_source(&self, selector: &str) -> punch_browser::Result<Option<String>> {
        let state = self.state.lock().unwrap();
        Self::check_open(&state)?;
        if state.screen == Screen::Login && selector == portal::CAPTCHA_IMAGE {
            return Ok(state.captcha_src.clone());
        }
        Ok(None)
    }

    async fn type_into(&self, selector: &str, text: &str) -> punch_browser::Result<()> {
        let mut state = self.state.lock().unwrap();
        Self::check_open(&state)?;
        state.typed.insert(selector.to_string(), text.to_string());
        Ok(())
    }

    async fn click(&self, selector: &str) -> punch_browser::Result<()> {
        let mut state = self.state.lock().unwrap();
        Self::check_open(&state)?;
        state.clicks.push(selector.to_string());

        let screen = state.screen;
        match screen {
            Screen::Login if selector == portal::LOGIN_BUTTON => {
                let answer_ok = state.typed.get(portal::CAPTCHA_INPUT) == Some(&state.expected_answer);
                let has_credentials = state.typed.contains_key(portal::USERNAME_INPUT)
                    && state.typed.contains_key(portal::PASSWORD_INPUT);
                if answer_ok && has_credentials {
                    state.logged_in = true;
                    state.screen = Screen::Dashboard;
                }
            }
            Screen::Checkin if selector == portal::CONFIRM_BUTTON && state.dialog_open => {
                state.dialog_open = false;
            }
            Screen::Checkin => {
                if selector == portal::control_selector(PunchAction::In) && !state.in_disabled {
                    state.in_disabled = true;
                    state.dialog_open = true;
                } else if selector == portal::control_selector(PunchAction::Out) && !state.out_disabled {
                    state.out_disabled = true;
                    state.dialog_open = true;
                }
            }
            _ => {}
        }
        Ok(())
    }

    async fn screenshot(&self) -> punch_browser::Result<Vec<u8>> {
        let mut state = self.state.lock().unwrap();
        Self::check_open(&state)?;
        state.screenshots += 1;
        Ok(b"fake-screenshot".to_vec())
    }

    async fn close(&mut self) -> punch_browser::Result<()> {
        let mut state = self.state.lock().unwrap();
        state.closed = true;
        if state.fail_close {
            return Err(BrowserError::Cdp("browser already gone".to_string()));
        }
        Ok(())
    }
}

/// Launcher handing out pages over one shared portal state.
pub(crate) struct FakeLauncher {
    state: SharedPortal,
    fail: bool,
    launches: AtomicUsize,
}

impl FakeLauncher {
    pub fn new(state: SharedPortal) -> Self {
        Self {
            state,
            fail: false,
            launches: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(portal_state(""))
        }
    }

    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BrowserLauncher for FakeLauncher {
    async fn launch(&self) -> punch_browser::Result<Box<dyn PunchPage>> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(BrowserError::Launch("chrome not found".to_string()));
        }
        Ok(Box::new(FakePage {
            state: Arc::clone(&self.state),
        }))
    }
}

// ==================== Runner ====================

pub(crate) enum StubMode {
    Outcome(PunchOutcome),
    Fail,
    Panic,
}

/// Runner with a scripted ending, optionally held until released.
pub(crate) struct StubRunner {
    mode: StubMode,
    gated: bool,
    release: Notify,
    calls: Mutex<Vec<PunchAction>>,
}

impl StubRunner {
    pub fn new(mode: StubMode) -> Self {
        Self {
            mode,
            gated: false,
            release: Notify::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Each run waits for one [`release`](Self::release).
    pub fn gated(mode: StubMode) -> Self {
        Self {
            gated: true,
            ..Self::new(mode)
        }
    }

    pub fn release(&self) {
        self.release.notify_one();
    }

    pub fn calls(&self) -> Vec<PunchAction> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PunchRunner for StubRunner {
    async fn punch(&self, action: PunchAction) -> crate::Result<PunchResult> {
        self.calls.lock().unwrap().push(action);
        if self.gated {
            self.release.notified().await;
        }
        match &self.mode {
            StubMode::Outcome(outcome) => Ok(PunchResult {
                action,
                outcome: *outcome,
                screenshot_path: PathBuf::from(format!("{}.png", action)),
            }),
            StubMode::Fail => Err(PunchError::Challenge("no image".to_string())),
            StubMode::Panic => panic!("runner exploded"),
        }
    }
}

// ==================== Approval ====================

/// Approval returning a fixed answer and recording the challenge files seen.
pub(crate) struct FixedApproval {
    answer: String,
    seen: Mutex<Vec<(PathBuf, bool)>>,
}

impl FixedApproval {
    pub fn new(answer: &str) -> Self {
        Self {
            answer: answer.to_string(),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// (path, existed at resolve time) for each resolved challenge.
    pub fn seen(&self) -> Vec<(PathBuf, bool)> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl ApprovalChannel for FixedApproval {
    async fn resolve(&self, challenge: &Challenge) -> crate::Result<String> {
        let path = challenge.local_path().to_path_buf();
        let exists = path.exists();
        self.seen.lock().unwrap().push((path, exists));
        Ok(self.answer.clone())
    }

    fn kind(&self) -> ChannelKind {
        ChannelKind::Interactive
    }
}
