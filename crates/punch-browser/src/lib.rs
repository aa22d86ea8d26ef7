//! Browser automation for the timecard puncher.
//!
//! - [`PunchPage`] / [`BrowserLauncher`]: the narrow page interface the punch
//!   workflow is written against
//! - [`ChromiumLauncher`]: headless Chrome over the DevTools protocol
//! - [`wait`]: visibility and control-stability waits built on page checks

pub mod chromium;
pub mod error;
pub mod page;
pub mod wait;

pub use chromium::{ChromiumLauncher, ChromiumPage, LaunchOptions};
pub use error::{BrowserError, Result};
pub use page::{BrowserLauncher, PunchPage};
pub use wait::{
    wait_hidden, wait_stable, wait_visible, StabilityTracker, DEFAULT_CHECK_STEP,
    DEFAULT_QUIESCENCE,
};
