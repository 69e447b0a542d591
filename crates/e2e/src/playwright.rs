//! Playwright browser automation
//!
//! The browser side of the suite is driven through generated node scripts.
//! Login flows run as one-shot scripts that print the captured storage state
//! as a JSON line on stdout. Consumed sessions run as a persistent driver
//! process speaking a JSON line protocol over stdin/stdout, so a test holds
//! a live page for its whole body.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command as TokioCommand};
use tracing::{debug, warn};

use storefront_common::{
    Credential, FieldLocator, Role, SessionState, SubmitLocator, SuccessIndicator,
};

use crate::error::{E2eError, E2eResult};

/// Headroom for browser launch and teardown outside the in-page waits
const LAUNCH_GRACE: Duration = Duration::from_secs(15);

/// Bound on a single driver-protocol round trip
const COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Browser {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl Browser {
    fn as_str(&self) -> &'static str {
        match self {
            Browser::Chromium => "chromium",
            Browser::Firefox => "firefox",
            Browser::Webkit => "webkit",
        }
    }

    pub fn from_name(name: &str) -> Self {
        match name {
            "firefox" => Browser::Firefox,
            "webkit" => Browser::Webkit,
            _ => Browser::Chromium,
        }
    }
}

/// Configuration for the browser layer
#[derive(Debug, Clone)]
pub struct PlaywrightConfig {
    pub browser: Browser,
    pub headless: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,
}

impl Default for PlaywrightConfig {
    fn default() -> Self {
        Self {
            browser: Browser::Chromium,
            headless: true,
            viewport_width: 1280,
            viewport_height: 720,
        }
    }
}

/// Entry point to the browser layer
#[derive(Debug, Clone)]
pub struct PlaywrightHandle {
    config: PlaywrightConfig,
}

/// Result line printed by a login script
#[derive(Debug, Deserialize)]
struct LoginFrame {
    ok: bool,
    #[serde(default)]
    phase: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default, rename = "storageState")]
    storage_state: Option<serde_json::Value>,
}

impl PlaywrightHandle {
    pub fn new(config: PlaywrightConfig) -> Self {
        Self { config }
    }

    /// Check that Playwright is installed and runnable
    pub fn ensure_installed() -> E2eResult<()> {
        let status = std::process::Command::new("npx")
            .args(["playwright", "--version"])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        match status {
            Ok(s) if s.success() => Ok(()),
            _ => Err(E2eError::PlaywrightNotFound),
        }
    }

    fn launch_js(&self) -> String {
        format!(
            "const browser = await {}.launch({{ headless: {} }});\n  \
             const context = await browser.newContext({{\n    \
             viewport: {{ width: {}, height: {} }}\n  }});\n  \
             const page = await context.newPage();",
            self.config.browser.as_str(),
            self.config.headless,
            self.config.viewport_width,
            self.config.viewport_height,
        )
    }

    /// Build the one-shot login script for a role
    pub fn login_script(&self, role: Role, credential: &Credential, timeout: Duration) -> String {
        let form = role.login_form();
        let timeout_ms = timeout.as_millis();
        let login_url = js_str(&credential.url(role.login_path()));

        let mut script = String::new();
        script.push_str("const { chromium, firefox, webkit } = require('playwright');\n\n");
        script.push_str("(async () => {\n  ");
        script.push_str(&self.launch_js());
        script.push('\n');

        // Login steps fail as phase "login"; only the success wait maps to a
        // timeout classification on the Rust side.
        script.push_str("\n  try {\n");
        script.push_str(&format!(
            "    await page.goto('{}', {{ waitUntil: 'domcontentloaded' }});\n",
            login_url
        ));
        script.push_str(&fill_js(form.email, &credential.email));
        script.push_str(&fill_js(form.password, &credential.password));
        if form.accept_privacy_prompt {
            script.push_str(
                "    const privacy = page.locator(\"(//button[@type='button'][text()='Accept'])[1]\");\n    \
                 if (await privacy.isVisible({ timeout: 2000 }).catch(() => false)) {\n      \
                 await privacy.click();\n    }\n",
            );
        }
        script.push_str(&submit_js(form.submit));
        script.push_str(
            "  } catch (error) {\n    \
             console.log(JSON.stringify({ ok: false, phase: 'login', error: error.message }));\n    \
             await browser.close();\n    \
             process.exit(1);\n  }\n",
        );

        script.push_str("\n  try {\n");
        script.push_str(&success_wait_js(role.success(), timeout_ms));
        script.push_str(
            "  } catch (error) {\n    \
             console.log(JSON.stringify({ ok: false, phase: 'success_wait', error: error.message }));\n    \
             await browser.close();\n    \
             process.exit(1);\n  }\n",
        );

        script.push_str(
            "\n  const storageState = await context.storageState();\n  \
             console.log(JSON.stringify({ ok: true, storageState }));\n  \
             await browser.close();\n})();\n",
        );

        script
    }

    /// Run the login flow and capture the authenticated storage state
    pub async fn capture_login_state(
        &self,
        role: Role,
        credential: &Credential,
        timeout: Duration,
    ) -> E2eResult<SessionState> {
        let script = self.login_script(role, credential, timeout);
        let dir = tempfile::tempdir()?;
        let script_path = dir.path().join("login.js");
        std::fs::write(&script_path, &script)?;

        debug!("running login script for {}: {}", role, script_path.display());

        let seconds = timeout.as_secs();
        let output = tokio::time::timeout(
            timeout + LAUNCH_GRACE,
            TokioCommand::new("node")
                .arg(&script_path)
                .current_dir(dir.path())
                .output(),
        )
        .await
        .map_err(|_| E2eError::LoginTimeout { role, seconds })??;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let frame = stdout
            .lines()
            .rev()
            .find_map(|line| serde_json::from_str::<LoginFrame>(line).ok());

        match frame {
            Some(frame) if frame.ok => {
                let state = frame.storage_state.ok_or_else(|| {
                    E2eError::Playwright("login script reported success without state".to_string())
                })?;
                Ok(SessionState::new(state))
            }
            Some(frame) if frame.phase.as_deref() == Some("success_wait") => {
                Err(E2eError::LoginTimeout { role, seconds })
            }
            Some(frame) => Err(E2eError::Playwright(
                frame.error.unwrap_or_else(|| "login script failed".to_string()),
            )),
            None => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                Err(E2eError::Playwright(format!(
                    "login script for {} produced no result:\nstdout: {}\nstderr: {}",
                    role, stdout, stderr
                )))
            }
        }
    }

    /// Build the persistent driver script for a consumed session
    pub fn page_script(&self, state_path: &Path, start_url: &str) -> String {
        let mut script = String::new();
        script.push_str("const readline = require('readline');\n");
        script.push_str("const { chromium, firefox, webkit } = require('playwright');\n\n");
        script.push_str("(async () => {\n  ");
        script.push_str(&format!(
            "const browser = await {}.launch({{ headless: {} }});\n  ",
            self.config.browser.as_str(),
            self.config.headless,
        ));
        script.push_str(&format!(
            "const context = await browser.newContext({{\n    \
             storageState: '{}',\n    \
             viewport: {{ width: {}, height: {} }}\n  }});\n  ",
            js_str(&state_path.to_string_lossy()),
            self.config.viewport_width,
            self.config.viewport_height,
        ));
        script.push_str("const page = await context.newPage();\n");
        script.push_str(&format!(
            "  await page.goto('{}', {{ waitUntil: 'load' }});\n",
            js_str(start_url)
        ));
        script.push_str(
            "  console.log(JSON.stringify({ event: 'ready', url: page.url() }));\n\n  \
             const rl = readline.createInterface({ input: process.stdin });\n  \
             for await (const line of rl) {\n    \
             let req;\n    \
             try { req = JSON.parse(line); } catch (e) {\n      \
             console.log(JSON.stringify({ ok: false, error: 'unparseable request' }));\n      \
             continue;\n    }\n    \
             try {\n      \
             if (req.cmd === 'goto') {\n        \
             await page.goto(req.url, { waitUntil: 'load' });\n        \
             console.log(JSON.stringify({ ok: true, url: page.url() }));\n      \
             } else if (req.cmd === 'wait_selector') {\n        \
             await page.waitForSelector(req.selector, { state: 'visible', timeout: req.timeout_ms });\n        \
             console.log(JSON.stringify({ ok: true }));\n      \
             } else if (req.cmd === 'text_content') {\n        \
             const text = await page.textContent(req.selector);\n        \
             console.log(JSON.stringify({ ok: true, text }));\n      \
             } else if (req.cmd === 'current_url') {\n        \
             console.log(JSON.stringify({ ok: true, url: page.url() }));\n      \
             } else if (req.cmd === 'close') {\n        \
             break;\n      \
             } else {\n        \
             console.log(JSON.stringify({ ok: false, error: 'unknown command: ' + req.cmd }));\n      \
             }\n    \
             } catch (error) {\n      \
             console.log(JSON.stringify({ ok: false, error: error.message }));\n    }\n  }\n\n  \
             await browser.close();\n  \
             process.exit(0);\n})();\n",
        );
        script
    }
}

/// Escape a string for embedding in single-quoted JS source
fn js_str(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('\'', "\\'")
        .replace('\n', "\\n")
}

fn fill_js(field: FieldLocator, value: &str) -> String {
    match field {
        FieldLocator::Css(selector) => format!(
            "    await page.locator('{}').fill('{}');\n",
            js_str(selector),
            js_str(value)
        ),
        FieldLocator::Labelled(name) => format!(
            "    await page.getByRole('textbox', {{ name: '{}' }}).fill('{}');\n",
            js_str(name),
            js_str(value)
        ),
    }
}

fn submit_js(submit: SubmitLocator) -> String {
    match submit {
        SubmitLocator::Css(selector) => {
            format!("    await page.locator('{}').click();\n", js_str(selector))
        }
        SubmitLocator::ButtonNamed(name) => format!(
            "    await page.getByRole('button', {{ name: '{}', exact: true }}).click();\n",
            js_str(name)
        ),
    }
}

fn success_wait_js(indicator: SuccessIndicator, timeout_ms: u128) -> String {
    match indicator {
        SuccessIndicator::UrlEndsWith(suffix) => format!(
            "    await page.waitForURL('**{}', {{ timeout: {} }});\n",
            suffix, timeout_ms
        ),
        SuccessIndicator::HeadingVisible(name) => format!(
            "    await page.getByRole('heading', {{ name: '{}' }})\
             .waitFor({{ state: 'visible', timeout: {} }});\n",
            js_str(name),
            timeout_ms
        ),
    }
}

/// A live authenticated page, backed by a persistent driver process
pub struct PageSession {
    child: Child,
    stdin: ChildStdin,
    lines: Lines<BufReader<ChildStdout>>,
    ready_url: String,
    closed: bool,
    // Holds the generated script until the driver exits
    _script_dir: tempfile::TempDir,
}

impl PageSession {
    /// Spawn a driver seeded with the persisted state and wait for its
    /// ready frame, which carries the settled landing URL.
    pub async fn open(
        handle: &PlaywrightHandle,
        state_path: &Path,
        start_url: &str,
        timeout: Duration,
    ) -> E2eResult<Self> {
        let script = handle.page_script(state_path, start_url);
        let dir = tempfile::tempdir()?;
        let script_path = dir.path().join("session.js");
        std::fs::write(&script_path, &script)?;

        debug!("spawning session driver: {}", script_path.display());

        let mut child = TokioCommand::new("node")
            .arg(&script_path)
            .current_dir(dir.path())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| E2eError::Playwright(format!("failed to spawn node: {}", e)))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| E2eError::Protocol("driver stdin unavailable".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| E2eError::Protocol("driver stdout unavailable".to_string()))?;

        let mut session = Self {
            child,
            stdin,
            lines: BufReader::new(stdout).lines(),
            ready_url: String::new(),
            closed: false,
            _script_dir: dir,
        };

        let ready = tokio::time::timeout(timeout + LAUNCH_GRACE, session.read_frame())
            .await
            .map_err(|_| {
                session.terminate();
                E2eError::Protocol(format!("driver not ready within {:?}", timeout))
            })??;

        if ready.get("event").and_then(|v| v.as_str()) != Some("ready") {
            session.terminate();
            return Err(E2eError::Protocol(format!(
                "expected ready frame, got: {}",
                ready
            )));
        }
        session.ready_url = ready
            .get("url")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();

        Ok(session)
    }

    /// URL the landing navigation settled on
    pub fn ready_url(&self) -> &str {
        &self.ready_url
    }

    async fn read_frame(&mut self) -> E2eResult<serde_json::Value> {
        while let Some(line) = self.lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str(&line) {
                Ok(frame) => return Ok(frame),
                // Anything else on stdout is driver noise
                Err(_) => debug!("ignoring driver output: {}", line),
            }
        }
        Err(E2eError::Protocol(
            "driver closed its output stream".to_string(),
        ))
    }

    async fn request(
        &mut self,
        request: serde_json::Value,
        timeout: Duration,
    ) -> E2eResult<serde_json::Value> {
        let line = serde_json::to_string(&request)?;
        self.stdin.write_all(line.as_bytes()).await?;
        self.stdin.write_all(b"\n").await?;
        self.stdin.flush().await?;

        let response = tokio::time::timeout(timeout, self.read_frame())
            .await
            .map_err(|_| {
                E2eError::Protocol(format!("no response within {:?} for {}", timeout, request))
            })??;

        if response.get("ok").and_then(|v| v.as_bool()) == Some(true) {
            Ok(response)
        } else {
            let message = response
                .get("error")
                .and_then(|v| v.as_str())
                .unwrap_or("driver reported failure");
            Err(E2eError::Playwright(message.to_string()))
        }
    }

    /// Navigate and return the settled URL
    pub async fn goto(&mut self, url: &str) -> E2eResult<String> {
        let response = self
            .request(
                serde_json::json!({ "cmd": "goto", "url": url }),
                COMMAND_TIMEOUT,
            )
            .await?;
        Ok(response
            .get("url")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string())
    }

    /// Wait for a selector to become visible
    pub async fn wait_selector(&mut self, selector: &str, timeout: Duration) -> E2eResult<()> {
        self.request(
            serde_json::json!({
                "cmd": "wait_selector",
                "selector": selector,
                "timeout_ms": timeout.as_millis() as u64,
            }),
            timeout + Duration::from_secs(5),
        )
        .await?;
        Ok(())
    }

    /// Text content of the first matching element
    pub async fn text_content(&mut self, selector: &str) -> E2eResult<Option<String>> {
        let response = self
            .request(
                serde_json::json!({ "cmd": "text_content", "selector": selector }),
                COMMAND_TIMEOUT,
            )
            .await?;
        Ok(response
            .get("text")
            .and_then(|v| v.as_str())
            .map(String::from))
    }

    /// URL the page is currently on
    pub async fn current_url(&mut self) -> E2eResult<String> {
        let response = self
            .request(serde_json::json!({ "cmd": "current_url" }), COMMAND_TIMEOUT)
            .await?;
        Ok(response
            .get("url")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string())
    }

    /// Graceful shutdown: ask the driver to close its browser, then wait
    pub async fn close(mut self) -> E2eResult<()> {
        let line = serde_json::to_string(&serde_json::json!({ "cmd": "close" }))?;
        // The driver exits without replying to close
        let _ = self.stdin.write_all(line.as_bytes()).await;
        let _ = self.stdin.write_all(b"\n").await;
        let _ = self.stdin.flush().await;

        match tokio::time::timeout(Duration::from_secs(5), self.child.wait()).await {
            Ok(_) => {}
            Err(_) => {
                warn!("session driver did not exit on close, terminating");
                self.terminate();
            }
        }
        self.closed = true;
        Ok(())
    }

    fn terminate(&mut self) {
        #[cfg(unix)]
        {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            if let Some(id) = self.child.id() {
                let _ = kill(Pid::from_raw(id as i32), Signal::SIGTERM);
            }
        }
        let _ = self.child.start_kill();
        self.closed = true;
    }
}

impl Drop for PageSession {
    fn drop(&mut self) {
        if !self.closed {
            self.terminate();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storefront_common::Credential;

    fn admin_credential() -> Credential {
        Credential {
            base_url: "https://shop.example.com".to_string(),
            email: "admin@example.com".to_string(),
            password: "p'w\\d".to_string(),
        }
    }

    #[test]
    fn login_script_targets_the_role_form() {
        let handle = PlaywrightHandle::new(PlaywrightConfig::default());
        let script = handle.login_script(
            Role::Admin,
            &admin_credential(),
            Duration::from_secs(10),
        );

        assert!(script.contains("page.goto('https://shop.example.com/admin/login'"));
        assert!(script.contains("page.locator('#login-email')"));
        assert!(script.contains("page.locator('#login-password')"));
        assert!(script.contains("button[type=\\'submit\\']"));
        assert!(script.contains("waitForURL('**/admin', { timeout: 10000 })"));
        assert!(script.contains("context.storageState()"));
    }

    #[test]
    fn login_script_escapes_credential_values() {
        let handle = PlaywrightHandle::new(PlaywrightConfig::default());
        let script = handle.login_script(
            Role::Admin,
            &admin_credential(),
            Duration::from_secs(10),
        );

        // The quote and backslash in the password must not break the script
        assert!(script.contains("fill('p\\'w\\\\d')"));
    }

    #[test]
    fn cloud_login_uses_labelled_fields_and_heading_signal() {
        let handle = PlaywrightHandle::new(PlaywrightConfig::default());
        let cred = Credential {
            base_url: "https://console.example.cloud".to_string(),
            email: "owner@example.com".to_string(),
            password: "secret".to_string(),
        };
        let script = handle.login_script(Role::CloudTenant, &cred, Duration::from_secs(10));

        assert!(script.contains("getByRole('textbox', { name: 'Email Address' })"));
        assert!(script.contains("getByRole('button', { name: 'Sign In', exact: true })"));
        assert!(script.contains("getByRole('heading', { name: 'My Stores' })"));
        // The cloud console has no privacy prompt
        assert!(!script.contains("privacy"));
    }

    #[test]
    fn login_failures_are_phased() {
        let handle = PlaywrightHandle::new(PlaywrightConfig::default());
        let script = handle.login_script(
            Role::Vendor,
            &admin_credential(),
            Duration::from_secs(10),
        );

        assert!(script.contains("phase: 'login'"));
        assert!(script.contains("phase: 'success_wait'"));
    }

    #[test]
    fn page_script_seeds_the_slot_and_reports_ready() {
        let handle = PlaywrightHandle::new(PlaywrightConfig::default());
        let script = handle.page_script(
            Path::new("/tmp/.auth/vendor.json"),
            "https://shop.example.com/vendor",
        );

        assert!(script.contains("storageState: '/tmp/.auth/vendor.json'"));
        assert!(script.contains("page.goto('https://shop.example.com/vendor'"));
        assert!(script.contains("event: 'ready'"));
        assert!(script.contains("req.cmd === 'wait_selector'"));
    }

    #[test]
    fn browser_names_parse_with_chromium_fallback() {
        assert_eq!(Browser::from_name("firefox"), Browser::Firefox);
        assert_eq!(Browser::from_name("webkit"), Browser::Webkit);
        assert_eq!(Browser::from_name("anything"), Browser::Chromium);
    }

    #[test]
    fn login_frame_parses_success_and_failure_lines() {
        let ok: LoginFrame =
            serde_json::from_str(r#"{"ok":true,"storageState":{"cookies":[]}}"#).unwrap();
        assert!(ok.ok);
        assert!(ok.storage_state.is_some());

        let failed: LoginFrame =
            serde_json::from_str(r#"{"ok":false,"phase":"success_wait","error":"Timeout"}"#)
                .unwrap();
        assert!(!failed.ok);
        assert_eq!(failed.phase.as_deref(), Some("success_wait"));
    }
}
