//! Storefront E2E Session Framework
//!
//! This crate provides the Rust-controlled session lifecycle for
//! browser-driven marketplace tests:
//! - Provisions one authenticated session per tenant role via Playwright
//! - Persists captured storage state to a role-keyed store
//! - Hands tests isolated, pre-authenticated page handles
//! - Invalidates state around the suite run
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 Session Suite Runner (Rust)                 │
//! ├─────────────────────────────────────────────────────────────┤
//! │  SuiteRunner                                                │
//! │    ├── invalidate_all()                                     │
//! │    ├── Provisioner::provision(role) ──► SessionStore slot   │
//! │    └── write_report() -> session-report.json                │
//! ├─────────────────────────────────────────────────────────────┤
//! │  SessionFixture (per test)                                  │
//! │    ├── acquire(role) -> SessionPage                         │
//! │    │     slot ──► seeded context ──► landing probe          │
//! │    │     login redirect? ──► ExpiredSession                 │
//! │    └── SessionPage: goto / wait_selector / text_content     │
//! │          released on every exit path                        │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod fixture;
pub mod playwright;
pub mod provision;
pub mod runner;

pub use error::{E2eError, E2eResult};
pub use fixture::{SessionFixture, SessionPage};
pub use provision::{Provisioner, RoleReport, RoleStatus};
pub use runner::{SuiteResult, SuiteRunner};
