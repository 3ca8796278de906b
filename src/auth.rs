//! Injectable authentication capability
//!
//! Privileged routes are probed first-class when credentials are provisioned
//! (flags or `PAGEPROBE_USERNAME` / `PAGEPROBE_PASSWORD`); without them the
//! runner falls back to a public substitute route instead of failing the run.

use serde::{Deserialize, Serialize};

use crate::probe::js_str;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
}

/// Where the login form lives and how to drive it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginForm {
    pub route: String,
    pub username_selector: String,
    pub password_selector: String,
    pub submit_selector: String,
}

impl Default for LoginForm {
    fn default() -> Self {
        Self {
            route: "/login".to_string(),
            username_selector: "input[name=\"email\"]".to_string(),
            password_selector: "input[name=\"password\"]".to_string(),
            submit_selector: "button[type=\"submit\"]".to_string(),
        }
    }
}

/// A concrete login step compiled into a run script.
#[derive(Debug, Clone)]
pub struct LoginStep {
    pub form: LoginForm,
    pub credentials: Credentials,
}

impl LoginStep {
    /// JS fragment that signs in before the target navigation. Runs inside
    /// the script's probe-level error handling: a broken login surfaces as an
    /// aborted run, not a harness crash.
    pub fn to_js(&self, login_url: &str, nav_timeout_ms: u64) -> String {
        let js = js_str;
        format!(
            r#"  await page.goto({url}, {{ timeout: {timeout} }});
  await page.fill({user_sel}, {user});
  await page.fill({pass_sel}, {pass});
  await page.click({submit});
  await page.waitForLoadState('networkidle');
"#,
            url = js(login_url),
            timeout = nav_timeout_ms,
            user_sel = js(&self.form.username_selector),
            user = js(&self.credentials.username),
            pass_sel = js(&self.form.password_selector),
            pass = js(&self.credentials.password),
            submit = js(&self.form.submit_selector),
        )
    }
}
