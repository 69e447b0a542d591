//! Error types for session provisioning and consumption

use storefront_common::Role;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum E2eError {
    #[error(transparent)]
    Session(#[from] storefront_common::Error),

    #[error("login for {role} did not reach its success signal within {seconds}s")]
    LoginTimeout { role: Role, seconds: u64 },

    #[error("session for {role} expired: landing page redirected to {redirected_to}")]
    ExpiredSession { role: Role, redirected_to: String },

    #[error("application for {role} unreachable at {url} after {attempts} attempts")]
    AppUnreachable {
        role: Role,
        url: String,
        attempts: usize,
    },

    #[error("Playwright not found. Install with: npx playwright install")]
    PlaywrightNotFound,

    #[error("Playwright error: {0}")]
    Playwright(String),

    #[error("driver protocol error: {0}")]
    Protocol(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type E2eResult<T> = Result<T, E2eError>;
