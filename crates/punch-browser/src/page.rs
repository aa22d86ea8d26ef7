//! Browser session traits.
//!
//! The workflow drives the portal through these small primitives only, so
//! the waits in [`crate::wait`] and the punch state machine can run against
//! a simulated page in tests.

use async_trait::async_trait;

use crate::error::Result;

/// One open page in a browser session.
#[async_trait]
pub trait PunchPage: Send + Sync {
    /// Navigate to `url` and wait for the load event.
    async fn goto(&self, url: &str) -> Result<()>;

    /// Whether an element matching `selector` exists and is rendered visibly.
    async fn is_visible(&self, selector: &str) -> Result<bool>;

    /// The `disabled` property of the first match, or `None` if nothing matches.
    async fn is_disabled(&self, selector: &str) -> Result<Option<bool>>;

    /// The `src` attribute of the first matching image, if any.
    async fn image_source(&self, selector: &str) -> Result<Option<String>>;

    /// Focus the first match and type `text` into it.
    async fn type_into(&self, selector: &str, text: &str) -> Result<()>;

    /// Click the first match.
    async fn click(&self, selector: &str) -> Result<()>;

    /// Capture the viewport as PNG bytes.
    async fn screenshot(&self) -> Result<Vec<u8>>;

    /// Close the page and its browser. Safe to call more than once.
    async fn close(&mut self) -> Result<()>;
}

/// Starts browser sessions.
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    /// Launch a fresh browser and open a blank page.
    async fn launch(&self) -> Result<Box<dyn PunchPage>>;
}
