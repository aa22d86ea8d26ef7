//! Process configuration.
//!
//! Everything is read from environment variables. Binaries call
//! [`load_env_files`] first so a `.env` file can supply them.
//!
//! # Environment Variables
//!
//! Required:
//! - `WITS_USERNAME`, `WITS_PASSWORD`: portal credentials
//!
//! Required for remote approval and the listener:
//! - `TELEGRAM_BOT_TOKEN`, `TELEGRAM_CHAT_ID`
//!
//! Optional:
//! - `PUNCH_PORTAL_URL`: portal base URL (default: `https://cbs.wits.com/`)
//! - `PUNCH_SCREENSHOT_DIR`: screenshot archive root (default: `screenshots`)
//! - `PUNCH_CHROME_PATH`: Chrome executable
//! - `PUNCH_HEADFUL`: show the browser window when `1` or `true`

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use punch_browser::LaunchOptions;
use punch_relay::ChatId;
use tracing::{debug, warn};
use url::Url;

use crate::error::ConfigError;

pub const USERNAME_ENV: &str = "WITS_USERNAME";
pub const PASSWORD_ENV: &str = "WITS_PASSWORD";
pub const BOT_TOKEN_ENV: &str = "TELEGRAM_BOT_TOKEN";
pub const CHAT_ID_ENV: &str = "TELEGRAM_CHAT_ID";
pub const PORTAL_URL_ENV: &str = "PUNCH_PORTAL_URL";
pub const SCREENSHOT_DIR_ENV: &str = "PUNCH_SCREENSHOT_DIR";
pub const CHROME_PATH_ENV: &str = "PUNCH_CHROME_PATH";
pub const HEADFUL_ENV: &str = "PUNCH_HEADFUL";

/// Default portal base URL.
pub const DEFAULT_PORTAL_URL: &str = "https://cbs.wits.com/";

/// Default screenshot archive root, relative to the working directory.
const DEFAULT_SCREENSHOT_DIR: &str = "screenshots";

/// Directory name under the user config dir holding the `.env` file.
const CONFIG_DIR_NAME: &str = "timecard-punch";

/// Load `.env` files into the process environment.
///
/// Reads `<config dir>/timecard-punch/.env` first, then `./.env`. Variables
/// already set are never overwritten. Missing files are skipped; files that
/// fail to parse are reported. Call after logging is initialized.
pub fn load_env_files() {
    if let Some(path) = dirs::config_dir().map(|d| d.join(CONFIG_DIR_NAME).join(".env")) {
        if let Err(e) = load_env_file(&path) {
            warn!(path = %path.display(), error = %e, "failed to load env file");
        }
    }
    match skip_missing(dotenvy::dotenv()) {
        Ok(Some(path)) => debug!(path = %path.display(), "loaded env file"),
        Ok(None) => {}
        Err(e) => warn!(error = %e, "failed to load .env"),
    }
}

/// Load one env file. `Ok(false)` when it does not exist.
fn load_env_file(path: &Path) -> Result<bool, dotenvy::Error> {
    skip_missing(dotenvy::from_path(path)).map(|loaded| loaded.is_some())
}

fn skip_missing<T>(result: Result<T, dotenvy::Error>) -> Result<Option<T>, dotenvy::Error> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.not_found() => Ok(None),
        Err(e) => Err(e),
    }
}

/// Portal login credentials.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Relay bot settings.
#[derive(Clone)]
pub struct RelaySettings {
    pub bot_token: String,
    /// Operator chat: the only sender whose commands and answers are accepted.
    pub chat_id: ChatId,
}

impl fmt::Debug for RelaySettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelaySettings")
            .field("bot_token", &"<redacted>")
            .field("chat_id", &self.chat_id)
            .finish()
    }
}

/// Full process configuration.
#[derive(Debug, Clone)]
pub struct PunchConfig {
    pub credentials: Credentials,
    /// `None` when the relay is not configured.
    pub relay: Option<RelaySettings>,
    pub portal_url: Url,
    pub screenshot_dir: PathBuf,
    pub chrome_path: Option<PathBuf>,
    pub headless: bool,
    /// Bound for navigation and element waits.
    pub navigation_timeout: Duration,
}

impl PunchConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through `lookup`. Blank values count as unset.
    /// Credentials are used verbatim; everything else is trimmed.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let get = |key: &str| raw(key).map(|v| v.trim().to_string());

        let username = raw(USERNAME_ENV);
        let password = raw(PASSWORD_ENV);
        let credentials = match (username, password) {
            (Some(username), Some(password)) => Credentials { username, password },
            (username, password) => {
                let mut missing = Vec::new();
                if username.is_none() {
                    missing.push(USERNAME_ENV);
                }
                if password.is_none() {
                    missing.push(PASSWORD_ENV);
                }
                return Err(ConfigError::Missing(missing));
            }
        };

        let relay = match (get(BOT_TOKEN_ENV), get(CHAT_ID_ENV)) {
            (Some(bot_token), Some(chat_id)) => {
                let chat_id = chat_id.parse::<i64>().map_err(|e| ConfigError::Invalid {
                    key: CHAT_ID_ENV,
                    reason: e.to_string(),
                })?;
                Some(RelaySettings {
                    bot_token,
                    chat_id: ChatId(chat_id),
                })
            }
            (None, None) => None,
            _ => {
                warn!(
                    "relay disabled: both {} and {} must be set",
                    BOT_TOKEN_ENV, CHAT_ID_ENV
                );
                None
            }
        };

        let portal_raw = get(PORTAL_URL_ENV).unwrap_or_else(|| DEFAULT_PORTAL_URL.to_string());
        let portal_url = parse_portal_url(&portal_raw)?;

        let screenshot_dir = get(SCREENSHOT_DIR_ENV)
            .map(|dir| PathBuf::from(shellexpand::tilde(&dir).into_owned()))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SCREENSHOT_DIR));

        let chrome_path = get(CHROME_PATH_ENV).map(|p| PathBuf::from(shellexpand::tilde(&p).into_owned()));

        let headless = !get(HEADFUL_ENV)
            .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        let config = Self {
            credentials,
            relay,
            portal_url,
            screenshot_dir,
            chrome_path,
            headless,
            navigation_timeout: Duration::from_secs(120),
        };
        debug!(?config, "configuration loaded");
        Ok(config)
    }

    /// Relay settings, or an error naming the missing variables.
    pub fn require_relay(&self) -> Result<&RelaySettings, ConfigError> {
        self.relay
            .as_ref()
            .ok_or(ConfigError::Missing(vec![BOT_TOKEN_ENV, CHAT_ID_ENV]))
    }

    /// Browser launch options derived from this config.
    pub fn launch_options(&self) -> LaunchOptions {
        LaunchOptions {
            headless: self.headless,
            chrome_path: self.chrome_path.clone(),
            request_timeout: self.navigation_timeout,
        }
    }

    /// Sets the navigation timeout.
    pub fn with_navigation_timeout(mut self, timeout: Duration) -> Self {
        self.navigation_timeout = timeout;
        self
    }
}

/// Parse the portal base, making sure relative joins stay under its path.
fn parse_portal_url(raw: &str) -> Result<Url, ConfigError> {
    let normalized = if raw.ends_with('/') {
        raw.to_string()
    } else {
        format!("{}/", raw)
    };
    let url = Url::parse(&normalized).map_err(|e| ConfigError::Invalid {
        key: PORTAL_URL_ENV,
        reason: e.to_string(),
    })?;
    if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::Invalid {
            key: PORTAL_URL_ENV,
            reason: format!("'{}' is not an http(s) base URL", raw),
        });
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_missing_credentials_are_fatal() {
        let err = PunchConfig::from_lookup(lookup(&[(PASSWORD_ENV, "pw")])).unwrap_err();
        match err {
            ConfigError::Missing(names) => assert_eq!(names, vec![USERNAME_ENV]),
            other => panic!("expected Missing, got {other:?}"),
        }

        let err = PunchConfig::from_lookup(lookup(&[(USERNAME_ENV, "  ")])).unwrap_err();
        match err {
            ConfigError::Missing(names) => assert_eq!(names, vec![USERNAME_ENV, PASSWORD_ENV]),
            other => panic!("expected Missing, got {other:?}"),
        }
    }

    #[test]
    fn test_defaults_without_relay() {
        let config =
            PunchConfig::from_lookup(lookup(&[(USERNAME_ENV, "alice"), (PASSWORD_ENV, "pw")]))
                .unwrap();

        assert_eq!(config.credentials.username, "alice");
        assert!(config.relay.is_none());
        assert_eq!(config.portal_url.as_str(), DEFAULT_PORTAL_URL);
        assert_eq!(config.screenshot_dir, PathBuf::from("screenshots"));
        assert!(config.headless);
        assert_eq!(config.navigation_timeout, Duration::from_secs(120));
        assert!(matches!(config.require_relay(), Err(ConfigError::Missing(_))));
    }

    #[test]
    fn test_partial_relay_is_disabled_not_fatal() {
        let config = PunchConfig::from_lookup(lookup(&[
            (USERNAME_ENV, "alice"),
            (PASSWORD_ENV, "pw"),
            (BOT_TOKEN_ENV, "123:abc"),
        ]))
        .unwrap();
        assert!(config.relay.is_none());
    }

    #[test]
    fn test_relay_and_overrides() {
        let config = PunchConfig::from_lookup(lookup(&[
            (USERNAME_ENV, "alice"),
            (PASSWORD_ENV, "pw"),
            (BOT_TOKEN_ENV, "123:abc"),
            (CHAT_ID_ENV, "-100200"),
            (PORTAL_URL_ENV, "https://portal.example.com/app"),
            (SCREENSHOT_DIR_ENV, "/var/punch"),
            (HEADFUL_ENV, "true"),
        ]))
        .unwrap();

        let relay = config.require_relay().unwrap();
        assert_eq!(relay.chat_id, ChatId(-100200));
        assert_eq!(config.portal_url.as_str(), "https://portal.example.com/app/");
        assert_eq!(config.screenshot_dir, PathBuf::from("/var/punch"));
        assert!(!config.headless);
        assert!(!config.launch_options().headless);
    }

    #[test]
    fn test_invalid_chat_id_and_url() {
        let err = PunchConfig::from_lookup(lookup(&[
            (USERNAME_ENV, "alice"),
            (PASSWORD_ENV, "pw"),
            (BOT_TOKEN_ENV, "123:abc"),
            (CHAT_ID_ENV, "@operator"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: CHAT_ID_ENV, .. }));

        let err = PunchConfig::from_lookup(lookup(&[
            (USERNAME_ENV, "alice"),
            (PASSWORD_ENV, "pw"),
            (PORTAL_URL_ENV, "ftp://portal"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: PORTAL_URL_ENV, .. }));
    }

    #[test]
    fn test_credentials_are_not_trimmed() {
        let config = PunchConfig::from_lookup(lookup(&[
            (USERNAME_ENV, "alice"),
            (PASSWORD_ENV, " pass word "),
            (SCREENSHOT_DIR_ENV, "  /var/punch  "),
        ]))
        .unwrap();
        assert_eq!(config.credentials.password, " pass word ");
        assert_eq!(config.screenshot_dir, PathBuf::from("/var/punch"));
    }

    #[test]
    fn test_env_file_missing_is_skipped_malformed_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!load_env_file(&dir.path().join("absent.env")).unwrap());

        let malformed = dir.path().join("bad.env");
        std::fs::write(&malformed, "THIS IS NOT AN ENV LINE\n").unwrap();
        assert!(load_env_file(&malformed).is_err());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = PunchConfig::from_lookup(lookup(&[
            (USERNAME_ENV, "alice"),
            (PASSWORD_ENV, "hunter2"),
            (BOT_TOKEN_ENV, "123:very-secret"),
            (CHAT_ID_ENV, "42"),
        ]))
        .unwrap();
        let debug = format!("{:?}", config);
        assert!(!debug.contains("hunter2"));
        assert!(!debug.contains("very-secret"));
    }
}
