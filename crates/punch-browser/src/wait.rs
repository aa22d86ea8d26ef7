//! Polling waits over [`PunchPage`] checks.
//!
//! Every wait re-checks the page at a fixed step and is bounded by a timeout.
//! Time comes from `tokio::time`, so tests can run them on a paused clock.

use std::time::Duration;

use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, trace};

use crate::error::{BrowserError, Result};
use crate::page::PunchPage;

/// Default interval between page checks.
pub const DEFAULT_CHECK_STEP: Duration = Duration::from_millis(50);

/// Default time a control state must hold before it is trusted.
pub const DEFAULT_QUIESCENCE: Duration = Duration::from_millis(200);

/// Tracks how long a control has kept the same enabled/disabled state.
#[derive(Debug, Clone)]
pub struct StabilityTracker {
    window: Duration,
    last: Option<(bool, Instant)>,
}

impl StabilityTracker {
    /// Create a tracker requiring `window` of unchanged state.
    pub fn new(window: Duration) -> Self {
        Self { window, last: None }
    }

    /// Record one observation taken at `now`.
    ///
    /// `None` means the control was not found, which restarts the window.
    /// Returns the settled `disabled` value once the same state has been seen
    /// continuously for at least the window.
    pub fn observe(&mut self, disabled: Option<bool>, now: Instant) -> Option<bool> {
        let Some(disabled) = disabled else {
            self.last = None;
            return None;
        };

        match self.last {
            Some((previous, since)) if previous == disabled => {
                (now.duration_since(since) >= self.window).then_some(disabled)
            }
            _ => {
                self.last = Some((disabled, now));
                None
            }
        }
    }
}

/// Wait until `selector` is visible.
pub async fn wait_visible(
    page: &dyn PunchPage,
    selector: &str,
    step: Duration,
    limit: Duration,
) -> Result<()> {
    wait_until(page, selector, true, step, limit).await
}

/// Wait until `selector` is absent or hidden.
pub async fn wait_hidden(
    page: &dyn PunchPage,
    selector: &str,
    step: Duration,
    limit: Duration,
) -> Result<()> {
    wait_until(page, selector, false, step, limit).await
}

async fn wait_until(
    page: &dyn PunchPage,
    selector: &str,
    visible: bool,
    step: Duration,
    limit: Duration,
) -> Result<()> {
    debug!(selector, visible, "waiting for element");

    let poll = async {
        loop {
            if page.is_visible(selector).await? == visible {
                return Ok(());
            }
            sleep(step).await;
        }
    };

    timeout(limit, poll).await.map_err(|_| BrowserError::Timeout {
        what: if visible {
            format!("'{}' to become visible", selector)
        } else {
            format!("'{}' to disappear", selector)
        },
        after: limit,
    })?
}

/// Wait until the control's enabled/disabled state has settled and return
/// whether it is disabled.
///
/// A control can render disabled while the page is still loading its state,
/// so a single read is not trusted: the same value must be observed for the
/// whole quiescence window.
pub async fn wait_stable(
    page: &dyn PunchPage,
    selector: &str,
    quiescence: Duration,
    step: Duration,
    limit: Duration,
) -> Result<bool> {
    debug!(selector, quiescence_ms = quiescence.as_millis(), "waiting for stable control state");

    let poll = async {
        let mut tracker = StabilityTracker::new(quiescence);
        loop {
            let observed = page.is_disabled(selector).await?;
            trace!(selector, ?observed, "control state check");
            if let Some(disabled) = tracker.observe(observed, Instant::now()) {
                return Ok(disabled);
            }
            sleep(step).await;
        }
    };

    timeout(limit, poll).await.map_err(|_| BrowserError::Timeout {
        what: format!("'{}' to settle", selector),
        after: limit,
    })?
}
