//! Startup settings, read once from the environment.
//!
//! | variable              | required        | default        |
//! |-----------------------|-----------------|----------------|
//! | `ADMIN_USERS`         | no              | empty          |
//! | `PORTAL_COOKIE_KEY`   | in production   | `dev-secret`   |
//! | `PORTAL_ENV`          | no              | `development`  |
//! | `PORTAL_DATA_DIR`     | no              | `.`            |
//! | `PORTAL_BIND_ADDR`    | no              | `0.0.0.0:8080` |
//! | `PORTAL_SESSION_DAYS` | no              | `14`           |

use std::path::PathBuf;

use thiserror::Error;

use keyportal_auth::AdminAllowlist;

pub const ADMIN_USERS_VAR: &str = "ADMIN_USERS";
pub const COOKIE_KEY_VAR: &str = "PORTAL_COOKIE_KEY";
pub const ENV_VAR: &str = "PORTAL_ENV";
pub const DATA_DIR_VAR: &str = "PORTAL_DATA_DIR";
pub const BIND_ADDR_VAR: &str = "PORTAL_BIND_ADDR";
pub const SESSION_DAYS_VAR: &str = "PORTAL_SESSION_DAYS";

const DEV_SECRET: &str = "dev-secret";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Production,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SettingsError {
    #[error("PORTAL_COOKIE_KEY must be set in production")]
    MissingSessionSecret,

    #[error("invalid {var}={value:?}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: &'static str,
    },
}

#[derive(Clone)]
pub struct Settings {
    pub environment: Environment,
    pub bind_addr: String,
    pub data_dir: PathBuf,
    pub admins: AdminAllowlist,
    pub session_secret: String,
    pub session_days: i64,
}

impl Settings {
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let environment = match var(ENV_VAR).as_deref() {
            None | Some("development") | Some("dev") => Environment::Development,
            Some("production") | Some("prod") => Environment::Production,
            Some(other) => {
                return Err(SettingsError::Invalid {
                    var: ENV_VAR,
                    value: other.to_string(),
                    reason: "expected 'development' or 'production'",
                });
            }
        };

        let session_secret = match (var(COOKIE_KEY_VAR), environment) {
            (Some(secret), _) => secret,
            (None, Environment::Production) => return Err(SettingsError::MissingSessionSecret),
            (None, Environment::Development) => {
                tracing::warn!("{} not set; using insecure dev default", COOKIE_KEY_VAR);
                DEV_SECRET.to_string()
            }
        };

        let session_days = match var(SESSION_DAYS_VAR) {
            None => 14,
            Some(raw) => match raw.parse::<i64>() {
                Ok(days) if days > 0 => days,
                _ => {
                    return Err(SettingsError::Invalid {
                        var: SESSION_DAYS_VAR,
                        value: raw,
                        reason: "expected a positive number of days",
                    });
                }
            },
        };

        let admins = AdminAllowlist::parse(&var(ADMIN_USERS_VAR).unwrap_or_default());
        if admins.is_empty() {
            tracing::info!("{} is empty; admin editor disabled", ADMIN_USERS_VAR);
        }

        Ok(Self {
            environment,
            bind_addr: var(BIND_ADDR_VAR).unwrap_or_else(|| "0.0.0.0:8080".to_string()),
            data_dir: var(DATA_DIR_VAR).map(PathBuf::from).unwrap_or_else(|| PathBuf::from(".")),
            admins,
            session_secret,
            session_days,
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }
}

impl core::fmt::Debug for Settings {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Settings")
            .field("environment", &self.environment)
            .field("bind_addr", &self.bind_addr)
            .field("data_dir", &self.data_dir)
            .field("admins", &self.admins)
            .field("session_secret", &"<redacted>")
            .field("session_days", &self.session_days)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(vars: &[(&str, &str)]) -> Result<Settings, SettingsError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn defaults_in_development() {
        let s = settings(&[]).unwrap();
        assert_eq!(s.environment, Environment::Development);
        assert_eq!(s.session_secret, DEV_SECRET);
        assert_eq!(s.session_days, 14);
        assert_eq!(s.bind_addr, "0.0.0.0:8080");
        assert!(s.admins.is_empty());
    }

    #[test]
    fn production_requires_secret() {
        assert_eq!(
            settings(&[(ENV_VAR, "production")]).unwrap_err(),
            SettingsError::MissingSessionSecret
        );
        let s = settings(&[(ENV_VAR, "production"), (COOKIE_KEY_VAR, "k")]).unwrap();
        assert!(s.is_production());
    }

    #[test]
    fn admin_list_is_parsed() {
        let s = settings(&[(ADMIN_USERS_VAR, "admin1, admin2")]).unwrap();
        assert!(s.admins.is_admin("admin1"));
        assert!(s.admins.is_admin("admin2"));
        assert!(!s.admins.is_admin("admin3"));
    }

    #[test]
    fn invalid_values_fail_fast() {
        assert!(matches!(
            settings(&[(SESSION_DAYS_VAR, "0")]),
            Err(SettingsError::Invalid { var: SESSION_DAYS_VAR, .. })
        ));
        assert!(matches!(
            settings(&[(ENV_VAR, "staging")]),
            Err(SettingsError::Invalid { var: ENV_VAR, .. })
        ));
    }

    #[test]
    fn debug_hides_secret() {
        let s = settings(&[(COOKIE_KEY_VAR, "top-secret")]).unwrap();
        assert!(!format!("{s:?}").contains("top-secret"));
    }
}
