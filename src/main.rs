//! pageprobe: page verification runner
//!
//! One invocation performs the selected verification runs against a running
//! web application and prints each summary to stdout. Exit codes: 0 = every
//! run completed with no failed probes, 1 = failed probes or an inconclusive
//! run, 2 = a run errored (session launch failure, deadline, script abort).

use std::path::PathBuf;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use pageprobe::auth::{Credentials, LoginForm};
use pageprobe::config::{Browser, VerifyConfig, Viewport};
use pageprobe::error::{VerifyError, VerifyResult};
use pageprobe::report;
use pageprobe::routine;
use pageprobe::runner::{Runner, RunStatus, VerificationRun};

#[derive(Parser, Debug)]
#[command(name = "pageprobe")]
#[command(about = "Verify that pages of a running web app render as expected")]
struct Args {
    /// Routine to run (search, detail, edit-form); omit to run all
    #[arg(short, long)]
    routine: Option<String>,

    /// Base URL of the application under test
    #[arg(long, default_value = "http://localhost:9002", env = "PAGEPROBE_BASE_URL")]
    base_url: String,

    /// Viewport width
    #[arg(long, default_value = "1280")]
    viewport_width: u32,

    /// Viewport height
    #[arg(long, default_value = "800")]
    viewport_height: u32,

    /// Directory screenshots are written into
    #[arg(long, default_value = "verification")]
    screenshot_dir: PathBuf,

    /// Browser to use (chromium, firefox, webkit)
    #[arg(long, default_value = "chromium")]
    browser: Browser,

    /// Timeout for a single page navigation
    #[arg(long, default_value = "15000")]
    nav_timeout_ms: u64,

    /// Deadline for a whole run, after which the session is killed
    #[arg(long, default_value = "60000")]
    run_deadline_ms: u64,

    /// Route of the application's login page
    #[arg(long, default_value = "/login")]
    login_route: String,

    /// Username for privileged routes
    #[arg(long, env = "PAGEPROBE_USERNAME")]
    username: Option<String>,

    /// Password for privileged routes
    #[arg(long, env = "PAGEPROBE_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Emit machine-readable JSON summaries instead of text
    #[arg(long)]
    json: bool,
}

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("warn".parse().unwrap()))
        .init();

    let args = Args::parse();

    let rt = tokio::runtime::Runtime::new().expect("Failed to create tokio runtime");
    match rt.block_on(async_main(args)) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(2);
        }
    }
}

async fn async_main(args: Args) -> VerifyResult<i32> {
    let credentials = match (args.username, args.password) {
        (Some(username), Some(password)) => Some(Credentials { username, password }),
        _ => None,
    };

    let config = VerifyConfig {
        base_url: args.base_url,
        viewport: Viewport {
            width: args.viewport_width,
            height: args.viewport_height,
        },
        screenshot_dir: args.screenshot_dir,
        browser: args.browser,
        nav_timeout_ms: args.nav_timeout_ms,
        run_deadline_ms: args.run_deadline_ms,
        credentials,
        login_form: LoginForm {
            route: args.login_route,
            ..LoginForm::default()
        },
    };

    let routines = match &args.routine {
        Some(name) => vec![routine::by_name(name)
            .ok_or_else(|| VerifyError::UnknownRoutine(name.clone()))?],
        None => routine::all(),
    };

    let runner = Runner::new(config);
    let mut runs: Vec<VerificationRun> = Vec::new();

    // Routines are independent; run them one at a time, each with its own
    // session, and report every run whatever the previous one did.
    for routine in &routines {
        let run = runner.run(routine).await;
        if args.json {
            println!("{}", report::render_json(&run));
        } else {
            report::print(&run);
            println!();
        }
        runs.push(run);
    }

    Ok(exit_code(&runs))
}


fn exit_code(runs: &[VerificationRun]) -> i32 {
    if runs.iter().any(|r| r.status == RunStatus::Errored) {
        2
    } else if runs
        .iter()
        .any(|r| r.status == RunStatus::Inconclusive || r.has_failed_probes())
    {
        1
    } else {
        0
    }
}
