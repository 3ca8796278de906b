//! Outcome reporting
//!
//! The sole user-visible output of a run: an ordered textual account of every
//! probe result plus the terminal status. Rendering never panics, whatever
//! state the run ended in.

use std::fmt::Write;

use crate::outcome::title_looks_like_server_error;
use crate::probe::{Observation, ProbeResult, ProbeStatus};
use crate::runner::{RunStatus, VerificationRun};

/// Render the run summary as plain text.
pub fn render(run: &VerificationRun) -> String {
    let mut out = String::new();

    let _ = writeln!(
        out,
        "== {} @ {} ==",
        run.routine,
        run.started_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    let _ = writeln!(
        out,
        "target: {} (viewport {}x{})",
        run.target_url, run.viewport.width, run.viewport.height
    );

    match &run.navigation {
        Some(nav) => {
            let status = nav
                .status
                .map(|s| s.to_string())
                .unwrap_or_else(|| "-".to_string());
            let _ = writeln!(
                out,
                "navigation: {} {} -> {}",
                status,
                nav.outcome.describe(),
                nav.settled_url
            );
        }
        None => {
            let _ = writeln!(out, "navigation: not attempted");
        }
    }

    for probe in &run.probes {
        let _ = writeln!(out, "{}", render_probe(probe));
    }

    if let Some(note) = &run.note {
        let _ = writeln!(out, "note: {note}");
    }
    let _ = writeln!(out, "status: {}", describe_status(run.status));

    out
}

/// Print the summary to stdout.
pub fn print(run: &VerificationRun) {
    print!("{}", render(run));
}

/// Machine-readable summary for `--json`.
pub fn render_json(run: &VerificationRun) -> String {
    serde_json::to_string_pretty(run).unwrap_or_else(|e| format!("{{\"error\":\"{e}\"}}"))
}

fn render_probe(probe: &ProbeResult) -> String {
    let glyph = match probe.status {
        ProbeStatus::Pass => "✓",
        ProbeStatus::Fail => "✗",
        ProbeStatus::Inconclusive => "?",
    };

    let mut line = format!("  {glyph} {}", probe.name);
    match &probe.observation {
        Observation::Title(title) => {
            let _ = write!(line, " - \"{title}\"");
            if title_looks_like_server_error(title) {
                line.push_str(" (looks like a server-error page)");
            }
        }
        Observation::Visible(true) => line.push_str(" - visible"),
        Observation::Visible(false) => line.push_str(" - not visible"),
        Observation::Screenshot(path) => {
            let _ = write!(line, " - {}", path.display());
        }
        Observation::None => {}
    }
    if let Some(note) = &probe.note {
        let _ = write!(line, " ({note})");
    }
    line
}

fn describe_status(status: RunStatus) -> &'static str {
    match status {
        RunStatus::Completed => "completed",
        RunStatus::Inconclusive => "inconclusive",
        RunStatus::Errored => "errored",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VerifyConfig;
    use crate::playwright::{decode_events, ScriptRun};
    use crate::routine;
    use crate::runner::{compile_plan, Runner};

    fn completed_run() -> VerificationRun {
        // Build a run purely from a decoded event stream; no browser needed.
        let config = VerifyConfig::default();
        let runner = Runner::new(config.clone());
        let routine = routine::search();
        let plan = compile_plan(&config, &routine);
        let script_run = ScriptRun {
            events: decode_events(
                r#"{"event":"session_open"}
{"event":"navigated","status":200,"url":"http://localhost:9002/"}
{"event":"probe","index":0,"status":"pass","observed":true}
{"event":"probe","index":1,"status":"fail","observed":false,"note":"element absent or hidden"}
{"event":"probe","index":2,"status":"pass","observed":"verification/search_design.png"}
{"event":"probe","index":3,"status":"pass","observed":"500 Internal Server Error"}
{"event":"done"}
"#,
            ),
            exit_ok: true,
            stderr: String::new(),
        };
        runner.replay(&routine, &plan, &script_run)
    }

    #[test]
    fn test_render_lists_every_probe_in_order() {
        let run = completed_run();
        let text = render(&run);

        let banner = text.find("visibility:placeholder:Banner").unwrap();
        let cari = text.find("visibility:button:Cari").unwrap();
        let shot = text.find("screenshot:search_design.png").unwrap();
        let title = text.find("✓ title").unwrap();
        assert!(banner < cari && cari < shot && shot < title);

        assert!(text.contains("✗ visibility:button:Cari - not visible"));
        assert!(text.contains("status: completed"));
    }

    #[test]
    fn test_render_flags_error_looking_title() {
        let run = completed_run();
        let text = render(&run);
        assert!(text.contains("looks like a server-error page"));
    }

    #[test]
    fn test_render_empty_errored_run_does_not_panic() {
        let config = VerifyConfig::default();
        let routine = routine::detail();
        let plan = compile_plan(&config, &routine);
        let script_run = ScriptRun {
            events: vec![],
            exit_ok: false,
            stderr: "node: command not found".to_string(),
        };
        let run = Runner::new(config).replay(&routine, &plan, &script_run);

        let text = render(&run);
        assert!(text.contains("navigation: not attempted"));
        assert!(text.contains("status: errored"));
    }

    #[test]
    fn test_json_rendering_round_trips_names() {
        let run = completed_run();
        let json = render_json(&run);
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["routine"], "search");
        assert_eq!(value["probes"].as_array().unwrap().len(), 4);
    }
}
