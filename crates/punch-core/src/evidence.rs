//! Screenshot evidence: archive path, storage, local display and relay.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{Datelike, Local, NaiveDateTime};
use punch_relay::{ChatId, MessageRelay};
use tracing::{info, warn};

use crate::action::PunchAction;
use crate::viewer;

/// Archive path for a screenshot taken at `at`:
/// `<root>/<year>/<month>/<YYYY-MM-DDTHH-MM>-<action>.png`.
pub fn screenshot_path(root: &Path, at: NaiveDateTime, action: PunchAction) -> PathBuf {
    root.join(format!("{:04}", at.year()))
        .join(format!("{:02}", at.month()))
        .join(format!("{}-{}.png", at.format("%Y-%m-%dT%H-%M"), action))
}

/// Where screenshots go after a run.
#[derive(Clone)]
pub struct EvidenceSink {
    root: PathBuf,
    show_locally: bool,
    relay: Option<(Arc<dyn MessageRelay>, ChatId)>,
}

impl EvidenceSink {
    /// Store screenshots under `root` without displaying or relaying them.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            show_locally: false,
            relay: None,
        }
    }

    /// Open each stored screenshot in the local viewer.
    pub fn with_local_display(mut self, show: bool) -> Self {
        self.show_locally = show;
        self
    }

    /// Also send each screenshot to `recipient` through the relay.
    pub fn with_relay(mut self, relay: Arc<dyn MessageRelay>, recipient: ChatId) -> Self {
        self.relay = Some((relay, recipient));
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write the screenshot to its archive path and return that path.
    pub fn store(&self, image: &[u8], at: NaiveDateTime, action: PunchAction) -> std::io::Result<PathBuf> {
        let path = screenshot_path(&self.root, at, action);
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::write(&path, image)?;
        info!(path = %path.display(), "screenshot saved");
        Ok(path)
    }

    /// Display and relay a stored screenshot. Failures are warnings only.
    pub async fn publish(&self, path: &Path, image: Vec<u8>) {
        if self.show_locally {
            if let Err(e) = viewer::open_image(path) {
                warn!(path = %path.display(), error = %e, "could not open screenshot automatically");
            }
        }

        if let Some((relay, recipient)) = &self.relay {
            let caption = format!("📸 Punch screenshot - {}", Local::now().format("%Y-%m-%d %H:%M:%S"));
            match relay.send_photo(*recipient, image, Some(&caption)).await {
                Ok(_) => info!(chat_id = %recipient, "screenshot relayed"),
                Err(e) => warn!(chat_id = %recipient, error = %e, "failed to relay screenshot"),
            }
        }
    }
}
