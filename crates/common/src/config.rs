//! Suite configuration
//!
//! Credentials come from the environment (`ADMIN_URL`, `ADMIN_EMAIL`,
//! `ADMIN_PASSWORD`, and the `VENDOR_`/`CUSTOMER_`/`CLOUD_` equivalents),
//! with an optional TOML file supplying fallback values. Per-role
//! optionality is decided exactly once here: downstream code matches on
//! [`RoleCredential`] and never re-checks individual variables.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::role::Role;

/// Slow redirect flows may need extra headroom, but never more than this.
const LOGIN_TIMEOUT_CAP_SECS: u64 = 120;

/// Login target and identity for one role
#[derive(Clone)]
pub struct Credential {
    pub base_url: String,
    pub email: String,
    pub password: String,
}

impl Credential {
    /// Join a path onto the role's base URL
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

// The secret must never reach logs or reports.
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("base_url", &self.base_url)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Per-role configuration outcome, decided once at load time
#[derive(Debug, Clone)]
pub enum RoleCredential {
    /// All fields present
    Configured(Credential),
    /// No identifier present; the role is skipped during provisioning
    Unconfigured,
    /// An identifier is present but other fields are not; provisioning
    /// records this as a configuration error for the role
    Partial { missing: Vec<&'static str> },
}

impl RoleCredential {
    fn decide(base_url: Option<String>, email: Option<String>, password: Option<String>) -> Self {
        // An absent identifier means the role is not part of this environment.
        let Some(email) = email else {
            return RoleCredential::Unconfigured;
        };

        match (base_url, password) {
            (Some(base_url), Some(password)) => RoleCredential::Configured(Credential {
                base_url,
                email,
                password,
            }),
            (base_url, password) => {
                let mut missing = Vec::new();
                if base_url.is_none() {
                    missing.push("url");
                }
                if password.is_none() {
                    missing.push("password");
                }
                RoleCredential::Partial { missing }
            }
        }
    }
}

/// Timeout bounds for remote interaction
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    /// Bound on the whole login flow, from navigation to success signal
    pub login_secs: u64,
    /// Bound on the landing-page probe when a session is consumed
    pub landing_secs: u64,
    /// Bound on the HTTP reachability preflight before a browser launch
    pub preflight_secs: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            login_secs: 10,
            landing_secs: 30,
            preflight_secs: 5,
        }
    }
}

/// Resolved suite configuration
#[derive(Debug, Clone)]
pub struct SuiteConfig {
    /// Directory holding the role-keyed session-state slots
    pub state_dir: PathBuf,
    pub timeouts: Timeouts,
    credentials: Vec<(Role, RoleCredential)>,
}

impl SuiteConfig {
    /// Resolve configuration from the process environment only
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve configuration from the environment with an optional TOML
    /// file supplying fallback values. A missing file is not an error.
    pub fn from_env_with_file(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(p) if p.exists() => FileConfig::load(p)?,
            _ => FileConfig::default(),
        };
        Ok(Self::resolve(file, |key| std::env::var(key).ok()))
    }

    /// Resolve configuration from an arbitrary key lookup. Tests use this
    /// to avoid mutating the process environment.
    pub fn from_lookup<L: Fn(&str) -> Option<String>>(lookup: L) -> Self {
        Self::resolve(FileConfig::default(), lookup)
    }

    fn resolve<L: Fn(&str) -> Option<String>>(file: FileConfig, lookup: L) -> Self {
        let mut credentials = Vec::with_capacity(Role::ALL.len());

        for role in Role::ALL {
            let from_file = file.roles.get(&role).cloned().unwrap_or_default();
            let prefix = role.env_prefix();
            let base_url = pick(&lookup, &format!("{prefix}_URL"), from_file.base_url);
            let email = pick(&lookup, &format!("{prefix}_EMAIL"), from_file.email);
            let password = pick(&lookup, &format!("{prefix}_PASSWORD"), from_file.password);
            credentials.push((role, RoleCredential::decide(base_url, email, password)));
        }

        Self {
            state_dir: file.state_dir.unwrap_or_else(crate::default_state_dir),
            timeouts: file.timeouts.unwrap_or_default(),
            credentials,
        }
    }

    /// The load-time decision for one role
    pub fn credential(&self, role: Role) -> &RoleCredential {
        self.credentials
            .iter()
            .find(|(r, _)| *r == role)
            .map(|(_, c)| c)
            .expect("every role is resolved at load time")
    }

    /// A fully configured credential, or `ConfigMissing` naming what is absent
    pub fn require(&self, role: Role) -> Result<&Credential> {
        match self.credential(role) {
            RoleCredential::Configured(c) => Ok(c),
            RoleCredential::Unconfigured => Err(Error::ConfigMissing {
                role,
                missing: "credentials".to_string(),
            }),
            RoleCredential::Partial { missing } => Err(Error::ConfigMissing {
                role,
                missing: missing.join(", "),
            }),
        }
    }

    /// Login-flow bound, clamped to the 120s ceiling
    pub fn login_timeout(&self) -> Duration {
        Duration::from_secs(self.timeouts.login_secs.min(LOGIN_TIMEOUT_CAP_SECS))
    }

    pub fn landing_timeout(&self) -> Duration {
        Duration::from_secs(self.timeouts.landing_secs)
    }

    pub fn preflight_timeout(&self) -> Duration {
        Duration::from_secs(self.timeouts.preflight_secs)
    }
}

/// Empty values behave as absent: `ADMIN_EMAIL=""` is no configuration.
fn pick<L: Fn(&str) -> Option<String>>(
    lookup: &L,
    key: &str,
    fallback: Option<String>,
) -> Option<String> {
    lookup(key)
        .filter(|v| !v.trim().is_empty())
        .or_else(|| fallback.filter(|v| !v.trim().is_empty()))
}

/// On-disk configuration file shape
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    state_dir: Option<PathBuf>,
    timeouts: Option<Timeouts>,
    roles: HashMap<Role, RoleFile>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
struct RoleFile {
    base_url: Option<String>,
    email: Option<String>,
    password: Option<String>,
}

impl FileConfig {
    fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup_from<'a>(pairs: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        move |key| {
            pairs
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
        }
    }

    #[test]
    fn fully_configured_role_resolves() {
        let config = SuiteConfig::from_lookup(lookup_from(&[
            ("ADMIN_URL", "https://shop.example.com"),
            ("ADMIN_EMAIL", "admin@example.com"),
            ("ADMIN_PASSWORD", "hunter2"),
        ]));

        let cred = config.require(Role::Admin).unwrap();
        assert_eq!(cred.base_url, "https://shop.example.com");
        assert_eq!(cred.email, "admin@example.com");
    }

    #[test]
    fn empty_identifier_means_unconfigured() {
        let config = SuiteConfig::from_lookup(lookup_from(&[
            ("CUSTOMER_URL", "https://shop.example.com"),
            ("CUSTOMER_EMAIL", ""),
            ("CUSTOMER_PASSWORD", "hunter2"),
        ]));

        assert!(matches!(
            config.credential(Role::Customer),
            RoleCredential::Unconfigured
        ));
    }

    #[test]
    fn partial_configuration_names_missing_fields() {
        let config =
            SuiteConfig::from_lookup(lookup_from(&[("VENDOR_EMAIL", "vendor@example.com")]));

        match config.credential(Role::Vendor) {
            RoleCredential::Partial { missing } => {
                assert_eq!(missing, &vec!["url", "password"]);
            }
            other => panic!("expected partial configuration, got {:?}", other),
        }

        let err = config.require(Role::Vendor).unwrap_err();
        assert!(err.to_string().contains("vendor"));
        assert!(err.to_string().contains("password"));
    }

    #[test]
    fn unset_roles_are_unconfigured() {
        let config = SuiteConfig::from_lookup(|_| None);
        for role in Role::ALL {
            assert!(matches!(
                config.credential(role),
                RoleCredential::Unconfigured
            ));
        }
    }

    #[test]
    fn environment_wins_over_file() {
        let file: FileConfig = toml::from_str(
            r#"
            [roles.admin]
            base_url = "https://staging.example.com"
            email = "file@example.com"
            password = "from-file"
            "#,
        )
        .unwrap();

        let config = SuiteConfig::resolve(
            file,
            lookup_from(&[("ADMIN_EMAIL", "env@example.com")]),
        );

        let cred = config.require(Role::Admin).unwrap();
        assert_eq!(cred.email, "env@example.com");
        assert_eq!(cred.base_url, "https://staging.example.com");
        assert_eq!(cred.password, "from-file");
    }

    #[test]
    fn file_can_configure_timeouts_and_state_dir() {
        let file: FileConfig = toml::from_str(
            r#"
            state_dir = "custom/.auth"

            [timeouts]
            login_secs = 45
            "#,
        )
        .unwrap();

        let config = SuiteConfig::resolve(file, |_| None);
        assert_eq!(config.state_dir, PathBuf::from("custom/.auth"));
        assert_eq!(config.login_timeout(), Duration::from_secs(45));
        // Unset fields keep their defaults
        assert_eq!(config.landing_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn login_timeout_is_capped() {
        let file: FileConfig = toml::from_str("[timeouts]\nlogin_secs = 600\n").unwrap();
        let config = SuiteConfig::resolve(file, |_| None);
        assert_eq!(config.login_timeout(), Duration::from_secs(120));
    }

    #[test]
    fn debug_output_redacts_the_secret() {
        let cred = Credential {
            base_url: "https://shop.example.com".to_string(),
            email: "admin@example.com".to_string(),
            password: "hunter2".to_string(),
        };
        let printed = format!("{:?}", cred);
        assert!(!printed.contains("hunter2"));
        assert!(printed.contains("admin@example.com"));
    }

    #[test]
    fn url_join_tolerates_trailing_slash() {
        let cred = Credential {
            base_url: "https://shop.example.com/".to_string(),
            email: String::new(),
            password: String::new(),
        };
        assert_eq!(cred.url("/admin/login"), "https://shop.example.com/admin/login");
    }
}
