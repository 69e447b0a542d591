//! Tenant roles and their login/landing contracts
//!
//! Each role carries the routes and page signals its login flow depends on.
//! These are properties of the application under test, fixed at compile time,
//! so tests and the provisioner never re-derive them from configuration.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A tenant identity under test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    Admin,
    Vendor,
    Customer,
    CloudTenant,
}

/// Signal that a login attempt reached the authenticated application
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuccessIndicator {
    /// The page URL settles on a path with this suffix
    UrlEndsWith(&'static str),
    /// A heading with this accessible name becomes visible
    HeadingVisible(&'static str),
}

/// How a login-form field is located
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldLocator {
    /// CSS selector
    Css(&'static str),
    /// Accessible textbox name
    Labelled(&'static str),
}

/// How the submit control is located
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitLocator {
    /// CSS selector
    Css(&'static str),
    /// Accessible button name, matched exactly
    ButtonNamed(&'static str),
}

/// Selector profile for a role's login form
#[derive(Debug, Clone, Copy)]
pub struct LoginForm {
    pub email: FieldLocator,
    pub password: FieldLocator,
    pub submit: SubmitLocator,
    /// Some tenants show a privacy-policy prompt that must be dismissed
    /// before the form will submit
    pub accept_privacy_prompt: bool,
}

impl Role {
    /// All roles, in provisioning order
    pub const ALL: [Role; 4] = [Role::Admin, Role::Vendor, Role::Customer, Role::CloudTenant];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Vendor => "vendor",
            Role::Customer => "customer",
            Role::CloudTenant => "cloud-tenant",
        }
    }

    /// File name of this role's session-state slot
    pub fn slot_name(&self) -> String {
        format!("{}.json", self.as_str())
    }

    /// Prefix of the environment variables carrying this role's credential
    pub fn env_prefix(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Vendor => "VENDOR",
            Role::Customer => "CUSTOMER",
            Role::CloudTenant => "CLOUD",
        }
    }

    /// Path of the login page, relative to the role's base URL
    pub fn login_path(&self) -> &'static str {
        match self {
            Role::Admin => "/admin/login",
            Role::Vendor => "/vendor/login",
            Role::Customer | Role::CloudTenant => "/login",
        }
    }

    /// Path of the authenticated landing page used to confirm a session
    pub fn landing_path(&self) -> &'static str {
        match self {
            Role::Admin => "/admin",
            Role::Vendor => "/vendor",
            Role::Customer => "/customers/account",
            Role::CloudTenant => "/",
        }
    }

    /// Signal that a login for this role succeeded
    pub fn success(&self) -> SuccessIndicator {
        match self {
            Role::Admin => SuccessIndicator::UrlEndsWith("/admin"),
            Role::Vendor => SuccessIndicator::UrlEndsWith("/vendor"),
            Role::Customer => SuccessIndicator::UrlEndsWith("/customers/account"),
            // The cloud console lands on a dashboard whose URL is not stable
            // across tenants; the stores heading is.
            Role::CloudTenant => SuccessIndicator::HeadingVisible("My Stores"),
        }
    }

    /// Selector profile of this role's login form
    pub fn login_form(&self) -> LoginForm {
        match self {
            Role::Admin | Role::Vendor => LoginForm {
                email: FieldLocator::Css("#login-email"),
                password: FieldLocator::Css("#login-password"),
                submit: SubmitLocator::Css("button[type='submit']"),
                accept_privacy_prompt: true,
            },
            Role::Customer => LoginForm {
                email: FieldLocator::Css("#reg-email"),
                password: FieldLocator::Css("#login-password"),
                submit: SubmitLocator::ButtonNamed("Sign in"),
                accept_privacy_prompt: true,
            },
            Role::CloudTenant => LoginForm {
                email: FieldLocator::Labelled("Email Address"),
                password: FieldLocator::Labelled("Password"),
                submit: SubmitLocator::ButtonNamed("Sign In"),
                accept_privacy_prompt: false,
            },
        }
    }

    /// Whether a suite run is expected to have this role configured.
    /// Optional roles are skipped when unconfigured; required roles are
    /// reported as failed.
    pub fn is_required(&self) -> bool {
        matches!(self, Role::Admin | Role::Vendor)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "vendor" => Ok(Role::Vendor),
            "customer" => Ok(Role::Customer),
            "cloud-tenant" | "cloud" => Ok(Role::CloudTenant),
            other => Err(format!(
                "unknown role '{}' (expected admin, vendor, customer, or cloud-tenant)",
                other
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(Role::Admin, "admin")]
    #[test_case(Role::Vendor, "vendor")]
    #[test_case(Role::Customer, "customer")]
    #[test_case(Role::CloudTenant, "cloud-tenant")]
    fn role_names_round_trip(role: Role, name: &str) {
        assert_eq!(role.as_str(), name);
        assert_eq!(name.parse::<Role>().unwrap(), role);
    }

    #[test]
    fn cloud_alias_parses() {
        assert_eq!("cloud".parse::<Role>().unwrap(), Role::CloudTenant);
    }

    #[test]
    fn unknown_role_is_rejected() {
        assert!("superadmin".parse::<Role>().is_err());
    }

    #[test]
    fn slot_names_are_distinct() {
        let mut names: Vec<String> = Role::ALL.iter().map(|r| r.slot_name()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), Role::ALL.len());
    }

    #[test]
    fn url_roles_have_url_success_signals() {
        assert_eq!(Role::Admin.success(), SuccessIndicator::UrlEndsWith("/admin"));
        assert_eq!(Role::Vendor.success(), SuccessIndicator::UrlEndsWith("/vendor"));
        assert_eq!(
            Role::CloudTenant.success(),
            SuccessIndicator::HeadingVisible("My Stores")
        );
    }

    #[test]
    fn only_storefront_roles_are_required() {
        assert!(Role::Admin.is_required());
        assert!(Role::Vendor.is_required());
        assert!(!Role::Customer.is_required());
        assert!(!Role::CloudTenant.is_required());
    }
}
