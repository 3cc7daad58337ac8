//! Configuration for dirgroup
//!
//! Settings live in `<root>/config/dirgroup.yml`, one section per
//! environment:
//!
//! ```yaml
//! development:
//!   host: localhost
//!   port: 389
//!   username: cn=admin,dc=example,dc=com
//!   password: ${LDAP_PASSWORD}
//!   base: dc=example,dc=com
//!   group_base: ou=groups,dc=example,dc=com
//!   group_member: uniquemember
//! test:
//!   host: ${LDAP_HOST:-localhost}
//!   port: 3389
//!   base: dc=example,dc=com
//!   group_base: ou=groups,dc=example,dc=com
//!   group_member: member
//! ```
//!
//! `${VAR}` and `${VAR:-default}` are substituted from the process
//! environment before the YAML is parsed.

use crate::{Error, Result};
use once_cell::sync::{Lazy, OnceCell};
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable naming the application root
pub const ROOT_ENV_VAR: &str = "DIRGROUP_ROOT";

/// Environment variable naming the settings section to load
pub const ENV_ENV_VAR: &str = "DIRGROUP_ENV";

/// Settings file, relative to the application root
pub const CONFIG_FILE: &str = "config/dirgroup.yml";

const DEFAULT_ENV: &str = "test";

static SHARED: OnceCell<DirectorySettings> = OnceCell::new();

static VARIABLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}")
        .expect("valid interpolation regex")
});

/// Directory connection and layout settings for one environment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DirectorySettings {
    /// Directory server host
    pub host: String,

    /// Directory server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Simple bind DN
    #[serde(default)]
    pub username: Option<String>,

    /// Simple bind password
    #[serde(default, skip_serializing)]
    pub password: Option<String>,

    /// Tree base DN, used for user searches
    pub base: String,

    /// Base DN under which groups live
    pub group_base: String,

    /// Attribute edited by membership changes
    /// Example: "member" or "uniquemember"
    #[serde(default = "default_group_member")]
    pub group_member: String,

    /// Upgrade the connection with STARTTLS
    #[serde(default)]
    pub start_tls: bool,

    /// Connection timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

fn default_port() -> u16 {
    389
}

fn default_group_member() -> String {
    "member".to_string()
}

fn default_timeout() -> u64 {
    10
}

impl Default for DirectorySettings {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: default_port(),
            username: None,
            password: None,
            base: String::new(),
            group_base: String::new(),
            group_member: default_group_member(),
            start_tls: false,
            timeout_seconds: default_timeout(),
        }
    }
}

impl DirectorySettings {
    /// Load the section for `env` from `<root>/config/dirgroup.yml`
    pub fn load(root: impl AsRef<Path>, env: &str) -> Result<Self> {
        let path = root.as_ref().join(CONFIG_FILE);
        debug!(path = %path.display(), env, "Loading directory settings");

        let content = std::fs::read_to_string(&path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;

        Self::from_yaml(&content, env)
    }

    /// Parse the section for `env` out of settings YAML, interpolating
    /// environment variables first
    pub fn from_yaml(content: &str, env: &str) -> Result<Self> {
        let expanded = interpolate(content, |name| std::env::var(name).ok());

        let mut environments: HashMap<String, serde_yaml::Value> = serde_yaml::from_str(&expanded)
            .map_err(|e| Error::Config(format!("Failed to parse settings: {}", e)))?;

        // Only the selected section has to be well-formed
        let section = environments
            .remove(env)
            .ok_or_else(|| Error::Config(format!("No settings for environment '{}'", env)))?;

        let settings: DirectorySettings = serde_yaml::from_value(section)
            .map_err(|e| Error::Config(format!("Invalid settings for '{}': {}", env, e)))?;

        settings.validate()?;
        Ok(settings)
    }

    /// Load using `DIRGROUP_ROOT` (default `.`) and `DIRGROUP_ENV`
    /// (default `test`)
    pub fn from_env() -> Result<Self> {
        let root = std::env::var(ROOT_ENV_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("."));
        let env = std::env::var(ENV_ENV_VAR).unwrap_or_else(|_| DEFAULT_ENV.to_string());

        Self::load(root, &env)
    }

    /// Process-wide settings, loaded with [`DirectorySettings::from_env`] on
    /// first access and immutable afterwards
    pub fn shared() -> Result<&'static DirectorySettings> {
        SHARED.get_or_try_init(Self::from_env)
    }

    /// Like [`DirectorySettings::shared`], but loads the first copy from an
    /// explicit root and environment. Later calls return the copy already
    /// loaded, whatever their arguments.
    pub fn shared_from(root: impl AsRef<Path>, env: &str) -> Result<&'static DirectorySettings> {
        SHARED.get_or_try_init(|| Self::load(root, env))
    }

    pub fn validate(&self) -> Result<()> {
        if self.host.is_empty() {
            return Err(Error::Config("host is required".into()));
        }
        if self.base.is_empty() {
            return Err(Error::Config("base is required".into()));
        }
        if self.group_base.is_empty() {
            return Err(Error::Config("group_base is required".into()));
        }
        if self.group_member.is_empty() {
            return Err(Error::Config("group_member must not be empty".into()));
        }
        Ok(())
    }

    /// URL the directory client connects to
    pub fn url(&self) -> String {
        format!("ldap://{}:{}", self.host, self.port)
    }

    /// Simple-bind credentials, present only when both halves are configured
    pub fn bind_credentials(&self) -> Option<(&str, &str)> {
        match (&self.username, &self.password) {
            (Some(user), Some(pass)) => Some((user.as_str(), pass.as_str())),
            _ => None,
        }
    }

    /// Distinguished name of the group with `code`
    pub fn group_dn(&self, code: &str) -> String {
        format!("cn={},{}", code, self.group_base)
    }
}

/// Substitute `${VAR}` and `${VAR:-default}` using `lookup`. Unset
/// variables without a default expand to an empty string; required fields
/// left empty are caught by [`DirectorySettings::validate`].
pub fn interpolate<F>(content: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    VARIABLE
        .replace_all(content, |caps: &Captures| {
            let name = &caps[1];
            match (lookup(name), caps.get(2)) {
                (Some(value), _) => value,
                (None, Some(default)) => default.as_str().to_string(),
                (None, None) => {
                    debug!(variable = name, "Unset variable in settings");
                    String::new()
                }
            }
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
development:
  host: ldap.example.com
  port: 636
  username: cn=admin,dc=example,dc=com
  password: secret
  base: dc=example,dc=com
  group_base: ou=groups,dc=example,dc=com
  group_member: uniquemember
test:
  host: localhost
  base: dc=example,dc=com
  group_base: ou=groups,dc=example,dc=com
"#;

    #[test]
    fn test_select_environment() {
        let dev = DirectorySettings::from_yaml(SAMPLE, "development").unwrap();
        assert_eq!(dev.port, 636);
        assert_eq!(dev.group_member, "uniquemember");
        assert_eq!(
            dev.bind_credentials(),
            Some(("cn=admin,dc=example,dc=com", "secret"))
        );

        let test = DirectorySettings::from_yaml(SAMPLE, "test").unwrap();
        assert_eq!(test.port, 389);
        assert_eq!(test.group_member, "member");
        assert_eq!(test.timeout_seconds, 10);
        assert!(test.bind_credentials().is_none());
    }

    #[test]
    fn test_other_sections_may_be_incomplete() {
        let yaml = format!("{}production:\n  host:\n", SAMPLE);
        let settings = DirectorySettings::from_yaml(&yaml, "test").unwrap();
        assert_eq!(settings.host, "localhost");
        assert!(DirectorySettings::from_yaml(&yaml, "production").is_err());
    }

    #[test]
    fn test_unknown_environment() {
        let err = DirectorySettings::from_yaml(SAMPLE, "production").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_bind_requires_both_halves() {
        let settings = DirectorySettings {
            username: Some("cn=admin".to_string()),
            ..Default::default()
        };
        assert!(settings.bind_credentials().is_none());
    }

    #[test]
    fn test_group_dn_and_url() {
        let settings = DirectorySettings {
            host: "ldap.example.com".to_string(),
            group_base: "ou=groups,dc=example,dc=com".to_string(),
            ..Default::default()
        };
        assert_eq!(settings.group_dn("eng"), "cn=eng,ou=groups,dc=example,dc=com");
        assert_eq!(settings.url(), "ldap://ldap.example.com:389");
    }

    #[test]
    fn test_interpolate() {
        let lookup = |name: &str| match name {
            "LDAP_HOST" => Some("ldap.internal".to_string()),
            _ => None,
        };

        let out = interpolate("host: ${LDAP_HOST}\nport: ${LDAP_PORT:-3389}", lookup);
        assert_eq!(out, "host: ldap.internal\nport: 3389");

        assert_eq!(interpolate("password: ${LDAP_PASSWORD}", lookup), "password: ");
    }

    /// Settings root private to one test and one test process
    fn write_settings(test_name: &str) -> PathBuf {
        let root = std::env::temp_dir().join(format!(
            "dirgroup-{}-{}",
            test_name,
            std::process::id()
        ));
        std::fs::create_dir_all(root.join("config")).unwrap();
        std::fs::write(root.join(CONFIG_FILE), SAMPLE).unwrap();
        root
    }

    #[test]
    fn test_load_from_root() {
        let root = write_settings("load-from-root");
        let settings = DirectorySettings::load(&root, "development").unwrap();
        assert_eq!(settings.host, "ldap.example.com");

        let err = DirectorySettings::load(root.join("missing"), "test").unwrap_err();
        assert!(err.to_string().contains("Failed to read"));

        let _ = std::fs::remove_dir_all(root);
    }

    #[test]
    fn test_shared_is_loaded_once() {
        let root = write_settings("shared-loaded-once");

        let first = DirectorySettings::shared_from(&root, "test").unwrap();
        let second = DirectorySettings::shared_from(root.join("missing"), "development").unwrap();
        let third = DirectorySettings::shared().unwrap();
        assert!(std::ptr::eq(first, second));
        assert!(std::ptr::eq(first, third));
        assert_eq!(first.group_base, "ou=groups,dc=example,dc=com");
        assert_eq!(first.port, 389);

        let _ = std::fs::remove_dir_all(root);
    }

    #[test]
    fn test_unset_required_variable_fails_validation() {
        let yaml = "test:\n  host: localhost\n  base: ${DIRGROUP_TEST_UNSET_BASE}\n  group_base: ou=groups\n";
        let err = DirectorySettings::from_yaml(yaml, "test").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_validate_rejects_missing_group_base() {
        let settings = DirectorySettings {
            base: "dc=example,dc=com".to_string(),
            ..Default::default()
        };
        assert!(settings.validate().is_err());
    }
}
