//! Storefront Common Library
//!
//! Shared primitives for the session-state fixture suite: tenant roles with
//! their login/landing contracts, credential configuration, and the
//! role-keyed session-state store.

pub mod config;
pub mod error;
pub mod role;
pub mod store;

// Re-export commonly used types
pub use config::{Credential, RoleCredential, SuiteConfig, Timeouts};
pub use error::{Error, Result};
pub use role::{FieldLocator, LoginForm, Role, SubmitLocator, SuccessIndicator};
pub use store::{SessionState, SessionStore};

/// Suite version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default session-state directory, relative to the suite working directory
pub fn default_state_dir() -> std::path::PathBuf {
    std::path::PathBuf::from(".auth")
}
