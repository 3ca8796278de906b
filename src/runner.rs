//! Run orchestration
//!
//! Drives one verification run through its state machine:
//! `INIT -> SESSION_OPEN -> NAVIGATED -> PROBING -> REPORTED -> CLOSED`.
//! A session-open failure jumps straight to `REPORTED`; `CLOSED` is terminal
//! and always reached, whatever the probes did.

use std::path::PathBuf;
use std::time::Duration;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::auth::LoginStep;
use crate::config::{VerifyConfig, Viewport};
use crate::outcome::{classify_navigation, NavigationOutcome};
use crate::playwright::{PlaywrightSession, RunPlan, ScriptEvent, ScriptRun};
use crate::probe::{Observation, Probe, ProbeResult, ProbeStatus};
use crate::routine::{fallback_probes, Routine};

/// Terminal status of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Ran to completion; individual probes may still have failed
    Completed,
    /// Could not observe the target at all (server unreachable)
    Inconclusive,
    /// Session launch failure, deadline, or unexpected script abort
    Errored,
}

/// Progress of one run. Strictly forward; `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Init,
    SessionOpen,
    Navigated,
    Probing,
    Reported,
    Closed,
}

/// How the target navigation settled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationRecord {
    pub outcome: NavigationOutcome,
    pub status: Option<u16>,
    pub settled_url: String,
}

/// One execution of one routine; created at start, consumed by the reporter.
#[derive(Debug, Clone, Serialize)]
pub struct VerificationRun {
    pub routine: String,
    pub target_url: String,
    pub viewport: Viewport,
    pub started_at: DateTime<Utc>,
    pub navigation: Option<NavigationRecord>,
    /// Probe results in execution order, never mutated after append
    pub probes: Vec<ProbeResult>,
    pub status: RunStatus,
    /// Run-level note (fatal cause, unreachable detail)
    pub note: Option<String>,
    state: RunState,
}

impl VerificationRun {
    fn new(routine: &Routine, target_url: String, viewport: Viewport) -> Self {
        Self {
            routine: routine.name.to_string(),
            target_url,
            viewport,
            started_at: Utc::now(),
            navigation: None,
            probes: Vec::new(),
            status: RunStatus::Completed,
            note: None,
            state: RunState::Init,
        }
    }

    /// Move forward in the state machine; never moves backward.
    fn advance(&mut self, state: RunState) {
        if state > self.state {
            debug!(routine = %self.routine, ?state, "Run state");
            self.state = state;
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Did any probe record a failure?
    pub fn has_failed_probes(&self) -> bool {
        self.probes.iter().any(|p| p.status == ProbeStatus::Fail)
    }
}

/// Runs verification routines one at a time; each run owns its own session.
pub struct Runner {
    config: VerifyConfig,
}

impl Runner {
    pub fn new(config: VerifyConfig) -> Self {
        Self { config }
    }

    /// Execute one routine start to finish. Never returns an error: every
    /// internal failure is folded into the run, which always reaches
    /// `Closed` with exactly one terminal status.
    pub async fn run(&self, routine: &Routine) -> VerificationRun {
        let plan = compile_plan(&self.config, routine);
        let mut run = VerificationRun::new(routine, plan.target_url.clone(), self.config.viewport);

        info!(routine = routine.name, url = %plan.target_url, "Starting verification run");

        // Cheap reachability check before paying for a browser launch.
        if let Err(cause) = self.preflight().await {
            warn!(%cause, "Application unreachable, skipping browser launch");
            run.status = RunStatus::Inconclusive;
            run.navigation = Some(NavigationRecord {
                outcome: NavigationOutcome::Unreachable,
                status: None,
                settled_url: plan.target_url.clone(),
            });
            run.note = Some(format!("server unreachable: {cause}"));
            return finalize(run);
        }

        let session = match PlaywrightSession::acquire(&self.config) {
            Ok(session) => session,
            Err(e) => {
                // Fatal: no probes are attempted.
                error!(error = %e, "Failed to open browser session");
                run.status = RunStatus::Errored;
                run.note = Some(format!("session open failed: {e}"));
                return finalize(run);
            }
        };

        match session.execute(&plan).await {
            Ok(script_run) => self.apply(&mut run, &plan, &script_run),
            Err(e) => {
                error!(error = %e, "Run script failed");
                run.status = RunStatus::Errored;
                run.note = Some(e.to_string());
            }
        }

        // Session (child process + scratch dir) is released here on every
        // path, before the run's output is finalized.
        drop(session);
        finalize(run)
    }

    /// Fold a decoded event stream into the run.
    fn apply(&self, run: &mut VerificationRun, plan: &RunPlan, script_run: &ScriptRun) {
        let login_url = self.config.url_for(&self.config.login_form.route);
        let mut saw_terminal_event = false;

        for event in &script_run.events {
            match event {
                ScriptEvent::SessionOpen => run.advance(RunState::SessionOpen),
                ScriptEvent::Navigated { status, url } => {
                    let outcome =
                        classify_navigation(*status, &plan.target_url, url, &login_url);
                    debug!(?outcome, status = ?status, settled = %url, "Navigation settled");
                    run.navigation = Some(NavigationRecord {
                        outcome,
                        status: *status,
                        settled_url: url.clone(),
                    });
                    run.advance(RunState::Navigated);
                }
                ScriptEvent::Unreachable { message } => {
                    run.status = RunStatus::Inconclusive;
                    run.navigation = Some(NavigationRecord {
                        outcome: NavigationOutcome::Unreachable,
                        status: None,
                        settled_url: plan.target_url.clone(),
                    });
                    run.note = Some(format!("server unreachable: {message}"));
                    saw_terminal_event = true;
                }
                ScriptEvent::Probe { index, status, observed, note } => {
                    run.advance(RunState::Probing);
                    let probe = plan.probes.get(*index);
                    run.probes.push(ProbeResult {
                        name: probe
                            .map(Probe::name)
                            .unwrap_or_else(|| format!("probe[{index}]")),
                        status: *status,
                        observation: observation_for(probe, observed.as_ref()),
                        note: note.clone(),
                    });
                }
                ScriptEvent::Aborted { message } => {
                    run.status = RunStatus::Errored;
                    run.note = Some(format!("aborted: {message}"));
                    saw_terminal_event = true;
                }
                ScriptEvent::Done => {
                    saw_terminal_event = true;
                }
            }
        }

        // A stream that never reached a terminal event means the script died
        // unannounced (browser launch failure, OOM kill).
        if !saw_terminal_event {
            run.status = RunStatus::Errored;
            let detail = script_run
                .stderr
                .lines()
                .next()
                .unwrap_or("run script produced no terminal event")
                .to_string();
            run.note = Some(detail);
        } else if !script_run.exit_ok && run.status == RunStatus::Completed {
            run.status = RunStatus::Errored;
            run.note = Some("run script exited nonzero".to_string());
        }
    }

    /// Test support: rebuild a run from a prerecorded event stream.
    #[cfg(test)]
    pub(crate) fn replay(
        &self,
        routine: &Routine,
        plan: &RunPlan,
        script_run: &ScriptRun,
    ) -> VerificationRun {
        let mut run =
            VerificationRun::new(routine, plan.target_url.clone(), self.config.viewport);
        self.apply(&mut run, plan, script_run);
        finalize(run)
    }

    /// One short GET against the base URL; only connection-level failures
    /// count as unreachable.
    async fn preflight(&self) -> Result<(), String> {
        let client = match reqwest::Client::builder()
            .timeout(Duration::from_secs(2))
            .build()
        {
            Ok(client) => client,
            Err(_) => return Ok(()),
        };

        match client.get(&self.config.base_url).send().await {
            Ok(_) => Ok(()),
            Err(e) if e.is_connect() || e.is_timeout() => Err(e.to_string()),
            // Any HTTP-level answer means the server is there.
            Err(_) => Ok(()),
        }
    }
}

/// Reporting data is complete; the run is closed.
fn finalize(mut run: VerificationRun) -> VerificationRun {
    run.advance(RunState::Reported);
    run.advance(RunState::Closed);
    run
}

/// Turn a routine into the concrete plan for this configuration. A protected
/// routine without credentials is rewritten onto its public fallback with a
/// reachability marker in front.
pub fn compile_plan(config: &VerifyConfig, routine: &Routine) -> RunPlan {
    if routine.protected {
        match &config.credentials {
            Some(credentials) => RunPlan {
                target_url: config.url_for(routine.route),
                login: Some(LoginStep {
                    form: config.login_form.clone(),
                    credentials: credentials.clone(),
                }),
                scroll_to: routine.scroll_to.map(str::to_string),
                probes: routine.probes.clone(),
            },
            None => RunPlan {
                target_url: config.url_for(routine.fallback_route),
                login: None,
                scroll_to: None,
                probes: fallback_probes(routine),
            },
        }
    } else {
        RunPlan {
            target_url: config.url_for(routine.route),
            login: None,
            scroll_to: routine.scroll_to.map(str::to_string),
            probes: routine.probes.clone(),
        }
    }
}

fn observation_for(probe: Option<&Probe>, observed: Option<&serde_json::Value>) -> Observation {
    use serde_json::Value;

    match (probe, observed) {
        (Some(Probe::Title), Some(Value::String(title))) => Observation::Title(title.clone()),
        (Some(Probe::Visibility { .. }), Some(Value::Bool(visible))) => {
            Observation::Visible(*visible)
        }
        (Some(Probe::Screenshot { .. }), Some(Value::String(path))) => {
            Observation::Screenshot(PathBuf::from(path))
        }
        _ => Observation::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Credentials;
    use crate::probe::Locator;
    use crate::routine;

    fn runner() -> Runner {
        Runner::new(VerifyConfig::default())
    }

    fn run_for(plan: &RunPlan) -> VerificationRun {
        let routine = routine::search();
        VerificationRun::new(&routine, plan.target_url.clone(), Viewport::default())
    }

    fn events(stream: &str) -> ScriptRun {
        ScriptRun {
            events: crate::playwright::decode_events(stream),
            exit_ok: true,
            stderr: String::new(),
        }
    }

    #[test]
    fn test_apply_completed_with_failed_probe() {
        let runner = runner();
        let plan = compile_plan(&runner.config, &routine::search());
        let mut run = run_for(&plan);

        let script_run = events(
            r#"{"event":"session_open"}
{"event":"navigated","status":200,"url":"http://localhost:9002/"}
{"event":"probe","index":0,"status":"pass","observed":true}
{"event":"probe","index":1,"status":"fail","observed":false,"note":"element absent or hidden"}
{"event":"probe","index":2,"status":"pass","observed":"verification/search_design.png"}
{"event":"probe","index":3,"status":"pass","observed":"Percetakan Mulia Jaya"}
{"event":"done"}
"#,
        );
        runner.apply(&mut run, &plan, &script_run);

        assert_eq!(run.status, RunStatus::Completed);
        assert!(run.has_failed_probes());
        // Earlier results survive a later probe's failure, in probe order.
        assert_eq!(run.probes.len(), 4);
        assert_eq!(run.probes[0].observation, Observation::Visible(true));
        assert_eq!(run.probes[1].status, ProbeStatus::Fail);
        assert_eq!(
            run.probes[2].observation,
            Observation::Screenshot(PathBuf::from("verification/search_design.png"))
        );
        assert_eq!(
            run.probes[3].observation,
            Observation::Title("Percetakan Mulia Jaya".to_string())
        );
        assert_eq!(
            run.navigation.as_ref().unwrap().outcome,
            NavigationOutcome::Ok
        );
    }

    #[test]
    fn test_apply_unreachable_is_inconclusive() {
        let runner = runner();
        let plan = compile_plan(&runner.config, &routine::detail());
        let mut run = run_for(&plan);

        let script_run = events(
            r#"{"event":"session_open"}
{"event":"unreachable","message":"net::ERR_CONNECTION_REFUSED"}
"#,
        );
        runner.apply(&mut run, &plan, &script_run);

        assert_eq!(run.status, RunStatus::Inconclusive);
        assert_eq!(
            run.navigation.as_ref().unwrap().outcome,
            NavigationOutcome::Unreachable
        );
    }

    #[test]
    fn test_apply_aborted_keeps_earlier_probes() {
        let runner = runner();
        let plan = compile_plan(&runner.config, &routine::search());
        let mut run = run_for(&plan);

        let script_run = ScriptRun {
            events: crate::playwright::decode_events(
                r#"{"event":"session_open"}
{"event":"navigated","status":200,"url":"http://localhost:9002/"}
{"event":"probe","index":0,"status":"pass","observed":true}
{"event":"aborted","message":"page crashed"}
"#,
            ),
            exit_ok: false,
            stderr: String::new(),
        };
        runner.apply(&mut run, &plan, &script_run);

        assert_eq!(run.status, RunStatus::Errored);
        assert_eq!(run.probes.len(), 1);
        assert!(run.note.as_deref().unwrap().contains("page crashed"));
    }

    #[test]
    fn test_apply_silent_death_is_errored() {
        let runner = runner();
        let plan = compile_plan(&runner.config, &routine::search());
        let mut run = run_for(&plan);

        let script_run = ScriptRun {
            events: vec![],
            exit_ok: false,
            stderr: "Error: browserType.launch: Executable doesn't exist".to_string(),
        };
        runner.apply(&mut run, &plan, &script_run);

        assert_eq!(run.status, RunStatus::Errored);
        assert!(run.note.as_deref().unwrap().contains("Executable doesn't exist"));
    }

    #[test]
    fn test_finalize_always_closes() {
        let plan = compile_plan(&VerifyConfig::default(), &routine::search());
        let run = finalize(run_for(&plan));
        assert_eq!(run.state(), RunState::Closed);

        // Closing twice is harmless; the state never moves backward.
        let run = finalize(run);
        assert_eq!(run.state(), RunState::Closed);
    }

    #[test]
    fn test_compile_plan_protected_without_credentials_falls_back() {
        let config = VerifyConfig::default();
        let plan = compile_plan(&config, &routine::edit_form());

        assert_eq!(plan.target_url, "http://localhost:9002/login");
        assert!(plan.login.is_none());
        assert!(matches!(plan.probes[0], Probe::RouteUnreachable { .. }));
    }

    #[test]
    fn test_compile_plan_protected_with_credentials_is_first_class() {
        let config = VerifyConfig {
            credentials: Some(Credentials {
                username: "admin@example.com".to_string(),
                password: "secret".to_string(),
            }),
            ..VerifyConfig::default()
        };
        let plan = compile_plan(&config, &routine::edit_form());

        assert_eq!(plan.target_url, "http://localhost:9002/products/new");
        assert!(plan.login.is_some());
        assert!(plan
            .probes
            .iter()
            .any(|p| matches!(p, Probe::Visibility { locator: Locator::Id(id) } if id == "product-form")));
    }
}
