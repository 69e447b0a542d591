//! Session provisioning
//!
//! One interactive login per configured role, run as an upstream phase
//! before any consuming test. Roles are provisioned independently: a
//! failure or skip for one role never aborts the others.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use storefront_common::{Credential, Role, RoleCredential, SessionStore, SuiteConfig};

use crate::error::{E2eError, E2eResult};
use crate::playwright::{PlaywrightConfig, PlaywrightHandle};

/// Outcome of provisioning one role
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleReport {
    pub role: Role,
    pub status: RoleStatus,
    /// Skip reason or failure message
    pub detail: Option<String>,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleStatus {
    Provisioned,
    Skipped,
    Failed,
}

/// What to do with a role, settled before any browser work
enum Decision<'a> {
    Proceed(&'a Credential),
    Skip(String),
    Fail(String),
}

fn decide(role: Role, credential: &RoleCredential) -> Decision<'_> {
    match credential {
        RoleCredential::Configured(c) => Decision::Proceed(c),
        RoleCredential::Unconfigured if role.is_required() => Decision::Fail(
            storefront_common::Error::ConfigMissing {
                role,
                missing: "credentials".to_string(),
            }
            .to_string(),
        ),
        RoleCredential::Unconfigured => Decision::Skip("not configured".to_string()),
        RoleCredential::Partial { missing } => Decision::Fail(
            storefront_common::Error::ConfigMissing {
                role,
                missing: missing.join(", "),
            }
            .to_string(),
        ),
    }
}

/// Performs the one-time login per role and persists the captured state
pub struct Provisioner {
    config: SuiteConfig,
    store: SessionStore,
    playwright: PlaywrightHandle,
    http: reqwest::Client,
}

impl Provisioner {
    pub fn new(
        config: SuiteConfig,
        store: SessionStore,
        playwright: PlaywrightConfig,
    ) -> E2eResult<Self> {
        PlaywrightHandle::ensure_installed()?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(2))
            .build()?;
        Ok(Self {
            config,
            store,
            playwright: PlaywrightHandle::new(playwright),
            http,
        })
    }

    /// Provision every role, in declaration order
    pub async fn provision_all(&self) -> Vec<RoleReport> {
        self.provision_roles(&Role::ALL).await
    }

    /// Provision a subset of roles, isolating failures per role
    pub async fn provision_roles(&self, roles: &[Role]) -> Vec<RoleReport> {
        let mut reports = Vec::with_capacity(roles.len());

        for &role in roles {
            let start = Instant::now();
            let (status, detail) = match decide(role, self.config.credential(role)) {
                Decision::Skip(reason) => {
                    warn!("skipping {}: {}", role, reason);
                    (RoleStatus::Skipped, Some(reason))
                }
                Decision::Fail(message) => {
                    warn!("cannot provision {}: {}", role, message);
                    (RoleStatus::Failed, Some(message))
                }
                Decision::Proceed(credential) => {
                    match self.provision_with(role, credential).await {
                        Ok(()) => (RoleStatus::Provisioned, None),
                        Err(e) => (RoleStatus::Failed, Some(e.to_string())),
                    }
                }
            };

            reports.push(RoleReport {
                role,
                status,
                detail,
                duration_ms: start.elapsed().as_millis() as u64,
            });
        }

        reports
    }

    /// Provision a single role; the role must be fully configured
    pub async fn provision(&self, role: Role) -> E2eResult<()> {
        let credential = self.config.require(role)?.clone();
        self.provision_with(role, &credential).await
    }

    async fn provision_with(&self, role: Role, credential: &Credential) -> E2eResult<()> {
        self.wait_for_reachable(role, credential).await?;

        let state = self
            .playwright
            .capture_login_state(role, credential, self.config.login_timeout())
            .await?;

        // Overwrites any state a previous run left behind
        self.store.save(role, &state)?;
        info!("provisioned session for {}", role);
        Ok(())
    }

    /// Cheap HTTP probe before committing to a browser launch. Any HTTP
    /// response proves reachability; status codes are the login flow's
    /// concern.
    async fn wait_for_reachable(&self, role: Role, credential: &Credential) -> E2eResult<()> {
        let url = credential.url(role.login_path());
        let deadline = Instant::now() + self.config.preflight_timeout();
        let mut attempts = 0;

        while Instant::now() < deadline {
            attempts += 1;
            match self.http.get(&url).send().await {
                Ok(_) => return Ok(()),
                Err(e) => {
                    if attempts == 1 {
                        info!("waiting for {} to become reachable...", url);
                    }
                    // Connection refused is expected while the app warms up
                    if !e.is_connect() {
                        warn!("reachability probe error: {}", e);
                    }
                }
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }

        Err(E2eError::AppUnreachable {
            role,
            url,
            attempts,
        })
    }
}
