//! Per-test session consumption
//!
//! A test asks the fixture for a role; the fixture seeds a fresh isolated
//! browser context from the role's persisted slot, probes the authenticated
//! landing route, and hands back a live page. Concurrent acquisitions of the
//! same role each get their own context and never share a cookie jar. The
//! page is released on every exit path: explicitly via [`SessionPage::close`]
//! or by the drop backstop when a test body panics or times out.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use storefront_common::{Role, SessionStore, SuiteConfig};

use crate::error::{E2eError, E2eResult};
use crate::playwright::{PageSession, PlaywrightConfig, PlaywrightHandle};

/// Supplies tests with ready, authenticated pages
pub struct SessionFixture {
    config: SuiteConfig,
    store: SessionStore,
    playwright: PlaywrightHandle,
}

impl SessionFixture {
    pub fn new(config: SuiteConfig) -> Self {
        Self::with_browser(config, PlaywrightConfig::default())
    }

    pub fn with_browser(config: SuiteConfig, playwright: PlaywrightConfig) -> Self {
        let store = SessionStore::new(&config.state_dir);
        Self {
            config,
            store,
            playwright: PlaywrightHandle::new(playwright),
        }
    }

    /// Acquire an authenticated page for a role.
    ///
    /// Preconditions are checked before any browser is spawned, so a missing
    /// slot fails fast with `MissingSessionState`. A slot that no longer
    /// authenticates is surfaced as `ExpiredSession`, distinct from feature
    /// assertion failures.
    pub async fn acquire(&self, role: Role) -> E2eResult<SessionPage> {
        if !self.store.exists(role) {
            return Err(storefront_common::Error::MissingSessionState { role }.into());
        }

        let credential = self.config.require(role)?;
        let landing = credential.url(role.landing_path());
        let slot = self.store.slot_path(role);

        let session = PageSession::open(
            &self.playwright,
            &slot,
            &landing,
            self.config.landing_timeout(),
        )
        .await?;

        let settled = session.ready_url().to_string();
        if is_login_redirect(role, &settled) {
            let _ = session.close().await;
            return Err(E2eError::ExpiredSession {
                role,
                redirected_to: settled,
            });
        }

        debug!("session for {} ready at {}", role, settled);
        Ok(SessionPage {
            role,
            inner: session,
        })
    }
}

/// A live authenticated page scoped to one test
pub struct SessionPage {
    role: Role,
    inner: PageSession,
}

impl SessionPage {
    pub fn role(&self) -> Role {
        self.role
    }

    /// URL the landing probe settled on
    pub fn ready_url(&self) -> &str {
        self.inner.ready_url()
    }

    pub async fn goto(&mut self, url: &str) -> E2eResult<String> {
        self.inner.goto(url).await
    }

    pub async fn wait_selector(
        &mut self,
        selector: &str,
        timeout: std::time::Duration,
    ) -> E2eResult<()> {
        self.inner.wait_selector(selector, timeout).await
    }

    pub async fn text_content(&mut self, selector: &str) -> E2eResult<Option<String>> {
        self.inner.text_content(selector).await
    }

    pub async fn current_url(&mut self) -> E2eResult<String> {
        self.inner.current_url().await
    }

    /// Graceful release; the drop backstop covers every other exit path
    pub async fn close(self) -> E2eResult<()> {
        self.inner.close().await
    }
}

static SCHEME_AND_HOST: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z][a-zA-Z0-9+.-]*://[^/?#]*").expect("static pattern"));

/// The staleness rule: the landing probe settled on the role's login route
/// or the application's bare login page.
pub fn is_login_redirect(role: Role, final_url: &str) -> bool {
    let path = url_path(final_url).trim_end_matches('/');
    let login = role.login_path().trim_end_matches('/');
    path == login || path == "/login"
}

fn url_path(url: &str) -> &str {
    let rest = match SCHEME_AND_HOST.find(url) {
        Some(m) => &url[m.end()..],
        None => url,
    };
    let end = rest.find(['?', '#']).unwrap_or(rest.len());
    let path = &rest[..end];
    if path.is_empty() {
        "/"
    } else {
        path
    }
}
