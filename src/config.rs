//! Runner configuration

use std::path::PathBuf;
use serde::{Deserialize, Serialize};

use crate::auth::{Credentials, LoginForm};

/// Browser engine to drive through Playwright.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Browser {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl Browser {
    pub fn as_str(&self) -> &'static str {
        match self {
            Browser::Chromium => "chromium",
            Browser::Firefox => "firefox",
            Browser::Webkit => "webkit",
        }
    }
}

impl std::str::FromStr for Browser {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "chromium" => Ok(Browser::Chromium),
            "firefox" => Ok(Browser::Firefox),
            "webkit" => Ok(Browser::Webkit),
            other => Err(format!("unknown browser: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Viewport { width: 1280, height: 800 }
    }
}

/// Configuration shared by every verification run.
#[derive(Debug, Clone)]
pub struct VerifyConfig {
    /// Base URL of the application under test
    pub base_url: String,

    /// Browser viewport
    pub viewport: Viewport,

    /// Directory screenshots are written into
    pub screenshot_dir: PathBuf,

    /// Browser engine
    pub browser: Browser,

    /// Per-navigation timeout passed to `page.goto`
    pub nav_timeout_ms: u64,

    /// Deadline for the whole run script, after which the session is killed
    pub run_deadline_ms: u64,

    /// Credentials for privileged routes, if provisioned
    pub credentials: Option<Credentials>,

    /// Shape of the application's login form
    pub login_form: LoginForm,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:9002".to_string(),
            viewport: Viewport::default(),
            screenshot_dir: PathBuf::from("verification"),
            browser: Browser::Chromium,
            nav_timeout_ms: 15_000,
            run_deadline_ms: 60_000,
            credentials: None,
            login_form: LoginForm::default(),
        }
    }
}

impl VerifyConfig {
    /// Join a route onto the base URL.
    pub fn url_for(&self, route: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            route.trim_start_matches('/')
        )
    }
}
