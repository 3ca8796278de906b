//! Playwright session management
//!
//! A session is one isolated browser context plus its single page, embodied
//! as a generated Node script executed as a child process. The script's
//! `try/finally` closes the browser on every exit path; the Rust side adds a
//! whole-run deadline and `kill_on_drop`, so no run ever leaves a dangling
//! browser process. Results come back as newline-delimited JSON events on
//! stdout.

use std::process::{Command, Stdio};
use std::time::Duration;
use serde::Deserialize;
use tempfile::TempDir;
use tokio::process::Command as TokioCommand;
use tracing::{debug, info, warn};

use crate::auth::LoginStep;
use crate::config::VerifyConfig;
use crate::error::{VerifyError, VerifyResult};
use crate::probe::{js_str, Probe, ProbeStatus};

/// Everything a session needs to know to drive one run.
#[derive(Debug, Clone)]
pub struct RunPlan {
    /// Full URL of the target route
    pub target_url: String,
    /// Sign in before navigating, when credentials are provisioned
    pub login: Option<LoginStep>,
    /// Element id to scroll into view before probing
    pub scroll_to: Option<String>,
    /// Probes, executed strictly in this order
    pub probes: Vec<Probe>,
}

/// One NDJSON line emitted by the run script.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ScriptEvent {
    SessionOpen,
    Navigated {
        status: Option<u16>,
        url: String,
    },
    Unreachable {
        message: String,
    },
    Probe {
        index: usize,
        status: ProbeStatus,
        #[serde(default)]
        observed: Option<serde_json::Value>,
        #[serde(default)]
        note: Option<String>,
    },
    Aborted {
        message: String,
    },
    Done,
}

/// What came back from executing a run script.
#[derive(Debug)]
pub struct ScriptRun {
    pub events: Vec<ScriptEvent>,
    pub exit_ok: bool,
    pub stderr: String,
}

/// An acquired browser session, ready to execute one run plan.
pub struct PlaywrightSession {
    config: VerifyConfig,
    scratch: TempDir,
}

impl PlaywrightSession {
    /// Launch preparation: verify the Playwright installation, create the
    /// screenshot directory, and set up a scratch dir for the run script.
    /// Failure here is fatal for the run; no probes are attempted.
    pub fn acquire(config: &VerifyConfig) -> VerifyResult<Self> {
        check_playwright_installed()?;
        std::fs::create_dir_all(&config.screenshot_dir)?;
        let scratch = TempDir::new()?;

        debug!(browser = config.browser.as_str(), "Session acquired");
        Ok(Self {
            config: config.clone(),
            scratch,
        })
    }

    /// Execute a run plan and decode its event stream. The child is bounded
    /// by the configured deadline and killed on expiry or drop.
    pub async fn execute(&self, plan: &RunPlan) -> VerifyResult<ScriptRun> {
        let script = self.build_script(plan);
        let script_path = self.scratch.path().join("run.js");
        std::fs::write(&script_path, &script)?;

        info!(url = %plan.target_url, "Navigating");
        debug!(script = %script_path.display(), "Running Playwright script");

        let mut cmd = TokioCommand::new("node");
        cmd.arg(&script_path)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = cmd
            .spawn()
            .map_err(|e| VerifyError::SessionLaunch(format!("failed to spawn node: {e}")))?;

        let deadline = Duration::from_millis(self.config.run_deadline_ms);
        let output = match tokio::time::timeout(deadline, child.wait_with_output()).await {
            Ok(result) => result?,
            Err(_) => {
                warn!(deadline_ms = self.config.run_deadline_ms, "Run script killed at deadline");
                return Err(VerifyError::Deadline(self.config.run_deadline_ms));
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        if !output.status.success() {
            debug!(%stderr, "Run script exited nonzero");
        }

        Ok(ScriptRun {
            events: decode_events(&stdout),
            exit_ok: output.status.success(),
            stderr,
        })
    }

    /// Compile a run plan into the Node script for one session.
    pub fn build_script(&self, plan: &RunPlan) -> String {
        let mut script = String::new();

        script.push_str(&format!(
            r#"const {{ chromium, firefox, webkit }} = require('playwright');

const emit = (obj) => console.log(JSON.stringify(obj));

(async () => {{
  const browser = await {browser}.launch({{ headless: true }});
  emit({{ event: "session_open" }});
  const context = await browser.newContext({{
    viewport: {{ width: {width}, height: {height} }}
  }});
  const page = await context.newPage();

  try {{
"#,
            browser = self.config.browser.as_str(),
            width = self.config.viewport.width,
            height = self.config.viewport.height,
        ));

        if let Some(login) = &plan.login {
            let login_url = self.config.url_for(&login.form.route);
            script.push_str(&login.to_js(&login_url, self.config.nav_timeout_ms));
        }

        // A connection-level failure is an inconclusive run, not a crash;
        // everything else lands as observable page state for the probes.
        script.push_str(&format!(
            r#"  let response = null;
  try {{
    response = await page.goto({url}, {{ timeout: {timeout} }});
  }} catch (err) {{
    const message = String(err && err.message || err);
    if (/ERR_CONNECTION_REFUSED|ERR_NAME_NOT_RESOLVED|ERR_CONNECTION_TIMED_OUT|ECONNREFUSED|ENOTFOUND/.test(message)) {{
      emit({{ event: "unreachable", message }});
      return;
    }}
    throw err;
  }}
  emit({{ event: "navigated", status: response ? response.status() : null, url: page.url() }});
"#,
            url = js_str(&plan.target_url),
            timeout = self.config.nav_timeout_ms,
        ));

        if let Some(id) = &plan.scroll_to {
            script.push_str(&format!(
                r#"  await page.evaluate((id) => {{ const el = document.getElementById(id); if (el) el.scrollIntoView(); }}, {id});
  await page.waitForTimeout(1000);
"#,
                id = js_str(id),
            ));
        }

        for (index, probe) in plan.probes.iter().enumerate() {
            script.push('\n');
            script.push_str(&probe.to_js(index, &self.config.screenshot_dir));
        }

        script.push_str(
            r#"
  emit({ event: "done" });
  } catch (err) {
    emit({ event: "aborted", message: String(err && err.message || err) });
    process.exitCode = 1;
  } finally {
    await browser.close();
  }
})();
"#,
        );

        script
    }
}

/// Decode the NDJSON event stream, skipping any non-event noise Playwright
/// or the page itself may print.
pub fn decode_events(stdout: &str) -> Vec<ScriptEvent> {
    stdout
        .lines()
        .filter_map(|line| serde_json::from_str::<ScriptEvent>(line.trim()).ok())
        .collect()
}

/// Check if Playwright is installed.
fn check_playwright_installed() -> VerifyResult<()> {
    let output = Command::new("npx")
        .args(["playwright", "--version"])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();

    match output {
        Ok(status) if status.success() => Ok(()),
        _ => Err(VerifyError::PlaywrightNotFound),
    }
}
