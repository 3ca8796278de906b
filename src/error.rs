//! Error types for page verification

use thiserror::Error;

#[derive(Error, Debug)]
pub enum VerifyError {
    #[error("Playwright not found. Install with: npx playwright install")]
    PlaywrightNotFound,

    #[error("Failed to launch browser session: {0}")]
    SessionLaunch(String),

    #[error("Run script exceeded deadline of {0} ms")]
    Deadline(u64),

    #[error("Unknown routine: {0}")]
    UnknownRoutine(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type VerifyResult<T> = Result<T, VerifyError>;
