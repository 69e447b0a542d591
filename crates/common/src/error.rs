//! Error types shared across the suite

use thiserror::Error;

use crate::role::Role;

/// Result type alias using the shared Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by configuration loading and the session-state store
#[derive(Error, Debug)]
pub enum Error {
    #[error("configuration for {role} is missing {missing}")]
    ConfigMissing { role: Role, missing: String },

    #[error("no session state for {role}; run the provisioning phase first")]
    MissingSessionState { role: Role },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),
}
