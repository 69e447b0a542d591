//! Suite orchestration: invalidate, provision, report
//!
//! Provisioning is a strict upstream phase: the runner resets every slot,
//! logs in each role, and only then are consuming tests expected to start.
//! That ordering is what makes the slots safe for concurrent readers.

use std::path::PathBuf;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use storefront_common::{Role, SessionStore, SuiteConfig};

use crate::error::E2eResult;
use crate::playwright::PlaywrightConfig;
use crate::provision::{Provisioner, RoleReport, RoleStatus};

/// Result of a provisioning run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteResult {
    pub started_at: DateTime<Utc>,
    pub provisioned: usize,
    pub skipped: usize,
    pub failed: usize,
    pub duration_ms: u64,
    pub roles: Vec<RoleReport>,
}

/// Orchestrates the provisioning phase and its report
pub struct SuiteRunner {
    config: SuiteConfig,
    store: SessionStore,
    playwright: PlaywrightConfig,
    output_dir: PathBuf,
}

impl SuiteRunner {
    pub fn new(
        config: SuiteConfig,
        playwright: PlaywrightConfig,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        let store = SessionStore::new(&config.state_dir);
        Self {
            config,
            store,
            playwright,
            output_dir: output_dir.into(),
        }
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Provision every role
    pub async fn run(&self) -> E2eResult<SuiteResult> {
        self.run_roles(&Role::ALL).await
    }

    /// Provision a subset of roles
    pub async fn run_roles(&self, roles: &[Role]) -> E2eResult<SuiteResult> {
        let started_at = Utc::now();
        let start = Instant::now();

        // Stale state from a previous run must not leak into this one
        self.store.invalidate_all()?;

        let provisioner = Provisioner::new(
            self.config.clone(),
            self.store.clone(),
            self.playwright.clone(),
        )?;

        info!("provisioning {} role(s)...", roles.len());
        let reports = provisioner.provision_roles(roles).await;

        for report in &reports {
            match report.status {
                RoleStatus::Provisioned => {
                    info!("✓ {} ({} ms)", report.role, report.duration_ms);
                }
                RoleStatus::Skipped => {
                    info!(
                        "- {} skipped: {}",
                        report.role,
                        report.detail.as_deref().unwrap_or("unconfigured")
                    );
                }
                RoleStatus::Failed => {
                    error!(
                        "✗ {} - {}",
                        report.role,
                        report.detail.as_deref().unwrap_or("unknown error")
                    );
                }
            }
        }

        let result = summarize(started_at, start.elapsed().as_millis() as u64, reports);
        info!(
            "Provisioning: {} provisioned, {} skipped, {} failed ({} ms)",
            result.provisioned, result.skipped, result.failed, result.duration_ms
        );
        Ok(result)
    }

    /// Reset every slot once the suite has finished consuming them
    pub fn cleanup(&self) -> E2eResult<()> {
        self.store.invalidate_all()?;
        Ok(())
    }

    /// Write the provisioning report to the output directory
    pub fn write_report(&self, result: &SuiteResult) -> E2eResult<PathBuf> {
        std::fs::create_dir_all(&self.output_dir)?;
        let path = self.output_dir.join("session-report.json");
        std::fs::write(&path, serde_json::to_string_pretty(result)?)?;
        info!("report written to: {}", path.display());
        Ok(path)
    }
}

fn summarize(started_at: DateTime<Utc>, duration_ms: u64, roles: Vec<RoleReport>) -> SuiteResult {
    let provisioned = roles
        .iter()
        .filter(|r| r.status == RoleStatus::Provisioned)
        .count();
    let skipped = roles
        .iter()
        .filter(|r| r.status == RoleStatus::Skipped)
        .count();
    let failed = roles
        .iter()
        .filter(|r| r.status == RoleStatus::Failed)
        .count();

    SuiteResult {
        started_at,
        provisioned,
        skipped,
        failed,
        duration_ms,
        roles,
    }
}
