//! Timecard portal layout: page URLs and element selectors.

use url::Url;

use crate::action::PunchAction;

/// Login page path, relative to the portal base.
const LOGIN_PATH: &str = "login";
/// Punch page path, relative to the portal base.
const CHECKIN_PATH: &str = "employee/checkIn";

/// Inline base64 CAPTCHA image on the login page.
pub const CAPTCHA_IMAGE: &str = r#"img[src^="data:image"]"#;
pub const USERNAME_INPUT: &str = r#"[placeholder="帳號"]"#;
pub const PASSWORD_INPUT: &str = r#"[placeholder="密碼"]"#;
pub const CAPTCHA_INPUT: &str = r#"[placeholder="驗證碼"]"#;
pub const LOGIN_BUTTON: &str = "button";
/// Rendered only after a successful login.
pub const DASHBOARD: &str = ".dashboard-container";
/// Row holding the punch-in and punch-out controls.
pub const CHECKIN_ROW: &str = ".checkin-btn-row";
/// Confirm button of the punch dialog.
pub const CONFIRM_BUTTON: &str = ".el-button--primary";
/// The punch confirmation dialog.
pub const MESSAGE_BOX: &str = ".el-message-box";

/// Resolved portal URLs.
#[derive(Debug, Clone)]
pub struct Portal {
    base: Url,
}

impl Portal {
    /// `base` must end with `/` so relative paths join underneath it.
    pub fn new(base: Url) -> Self {
        Self { base }
    }

    pub fn login_url(&self) -> String {
        self.join(LOGIN_PATH)
    }

    pub fn checkin_url(&self) -> String {
        self.join(CHECKIN_PATH)
    }

    fn join(&self, path: &str) -> String {
        self.base
            .join(path)
            .map(String::from)
            .unwrap_or_else(|_| format!("{}{}", self.base, path))
    }
}

/// Selector of the control for `action` inside the punch row.
pub fn control_selector(action: PunchAction) -> String {
    format!("{} button:nth-of-type({})", CHECKIN_ROW, action.control_position())
}
