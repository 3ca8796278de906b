//! Navigation outcome classification
//!
//! A server error manifests as observable page state, not a thrown failure,
//! so navigation is classified from structured signals (the HTTP status the
//! browser observed and the URL the page settled on) rather than from title
//! string matching. The title heuristic survives only as an advisory check.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Where a navigation ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NavigationOutcome {
    /// Page rendered without a failure signal
    Ok,
    /// 404-equivalent response; the route exists as a concept but not this target
    NotFound,
    /// 5xx response
    ServerError,
    /// Settled on the login page instead of the requested route
    RedirectedToAuth,
    /// The server could not be reached at all
    Unreachable,
}

impl NavigationOutcome {
    pub fn describe(&self) -> &'static str {
        match self {
            NavigationOutcome::Ok => "ok",
            NavigationOutcome::NotFound => "not found",
            NavigationOutcome::ServerError => "server error",
            NavigationOutcome::RedirectedToAuth => "redirected to login",
            NavigationOutcome::Unreachable => "unreachable",
        }
    }
}

/// Classify a settled navigation. `status` is what the browser observed on
/// the final response (`None` for same-document navigations), `requested`
/// and `settled` are full URLs, `login_url` is the application's login page.
pub fn classify_navigation(
    status: Option<u16>,
    requested: &str,
    settled: &str,
    login_url: &str,
) -> NavigationOutcome {
    match status {
        Some(s) if s >= 500 => NavigationOutcome::ServerError,
        Some(404) | Some(410) => NavigationOutcome::NotFound,
        _ => {
            if on_login_page(settled, login_url) && !on_login_page(requested, login_url) {
                NavigationOutcome::RedirectedToAuth
            } else {
                NavigationOutcome::Ok
            }
        }
    }
}

/// True only for the login URL itself or a sub-path/query/fragment of it;
/// routes that merely share the prefix (`/login-help`) do not count.
fn on_login_page(url: &str, login_url: &str) -> bool {
    match url.strip_prefix(login_url) {
        Some(rest) => matches!(rest.chars().next(), None | Some('/' | '?' | '#')),
        None => false,
    }
}

static ERROR_TITLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)internal server error|application error|unhandled (runtime )?exception")
        .expect("static pattern")
});

/// Heuristic: does a recorded page title look like a crash page? Advisory
/// only; classification proper is status-driven.
pub fn title_looks_like_server_error(title: &str) -> bool {
    ERROR_TITLE.is_match(title)
}
