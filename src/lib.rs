//! pageprobe: headless page verification
//!
//! Drives Playwright against a running web application to check that routes
//! render without server errors, that expected UI elements are visible, and
//! to capture screenshots as evidence. Lightweight smoke verification after
//! code changes, not a full E2E suite.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     Verification Runner                      │
//! ├──────────────────────────────────────────────────────────────┤
//! │  Runner (runner.rs)                                          │
//! │    ├── compile_plan(routine) -> RunPlan                      │
//! │    ├── PlaywrightSession::acquire() ── guaranteed teardown   │
//! │    ├── session.execute(plan) -> NDJSON event stream          │
//! │    └── apply(events) -> VerificationRun                      │
//! ├──────────────────────────────────────────────────────────────┤
//! │  Probes (probe.rs)                                           │
//! │    ├── Title            - record page title verbatim         │
//! │    ├── Visibility       - placeholder / role+name / id       │
//! │    ├── Screenshot       - fixed path, overwritten per run    │
//! │    └── RouteUnreachable - privileged route, public fallback  │
//! ├──────────────────────────────────────────────────────────────┤
//! │  Outcome (outcome.rs)                                        │
//! │    └── classify: ok | not-found | server-error |             │
//! │                  redirected-to-auth | unreachable            │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! One probe's failure never stops the rest of the sequence: every probe
//! compiles to its own try/catch emitting a tagged result, and the run always
//! closes its browser session before the summary is finalized.

pub mod auth;
pub mod config;
pub mod error;
pub mod outcome;
pub mod playwright;
pub mod probe;
pub mod report;
pub mod routine;
pub mod runner;

pub use config::VerifyConfig;
pub use error::{VerifyError, VerifyResult};
pub use probe::{Locator, Probe, ProbeResult, ProbeStatus};
pub use runner::{Runner, RunStatus, VerificationRun};
