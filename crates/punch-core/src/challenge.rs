//! CAPTCHA challenge capture.
//!
//! The login page renders the CAPTCHA as an inline `data:image/...;base64,`
//! image. A [`Challenge`] holds the decoded bytes and a temp file copy for
//! local viewers. The temp file belongs to the value: dropping the challenge
//! deletes it, whichever way the run ends.

use std::io::Write;
use std::path::Path;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Utc};
use punch_browser::PunchPage;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{PunchError, Result};

/// One CAPTCHA instance, tied to a single login attempt.
#[derive(Debug)]
pub struct Challenge {
    image: Vec<u8>,
    file: NamedTempFile,
    created_at: DateTime<Utc>,
}

impl Challenge {
    /// Read the challenge image from the page and persist it.
    pub async fn capture(page: &dyn PunchPage, selector: &str) -> Result<Self> {
        let source = page
            .image_source(selector)
            .await?
            .ok_or_else(|| PunchError::Challenge(format!("no image matches '{}'", selector)))?;
        Self::from_data_url(&source)
    }

    /// Decode a `data:image/...;base64,` URL and write it to a temp file.
    pub fn from_data_url(source: &str) -> Result<Self> {
        let image = decode_data_url(source)?;

        let mut file = tempfile::Builder::new()
            .prefix("captcha-")
            .suffix(".png")
            .tempfile()?;
        file.write_all(&image)?;
        file.flush()?;

        debug!(path = %file.path().display(), bytes = image.len(), "captcha captured");
        Ok(Self {
            image,
            file,
            created_at: Utc::now(),
        })
    }

    pub fn image_bytes(&self) -> &[u8] {
        &self.image
    }

    pub fn local_path(&self) -> &Path {
        self.file.path()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Delete the temp file, reporting failures instead of ignoring them.
    pub fn discard(self) -> std::io::Result<()> {
        let path = self.file.path().to_path_buf();
        self.file.close()?;
        debug!(path = %path.display(), "captcha discarded");
        Ok(())
    }
}

fn decode_data_url(source: &str) -> Result<Vec<u8>> {
    let payload = source
        .strip_prefix("data:image/")
        .and_then(|rest| rest.split_once(";base64,"))
        .map(|(_, payload)| payload)
        .ok_or_else(|| PunchError::Challenge("image is not a base64 data URL".to_string()))?;

    let image = BASE64
        .decode(payload.trim())
        .map_err(|e| PunchError::Challenge(format!("invalid base64 image: {}", e)))?;

    if image.is_empty() {
        return Err(PunchError::Challenge("image is empty".to_string()));
    }
    Ok(image)
}
