use std::env;
use std::time::Duration;
use thiserror::Error;

use shared::{Role, SessionContext};

use crate::sync::DEFAULT_POLL_INTERVAL;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{name} must be a whole number of milliseconds, got {value:?}")]
    InvalidMillis { name: &'static str, value: String },
    #[error("{name} must be greater than zero")]
    Zero { name: &'static str },
}

/// Settings for the sync client binary.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub api_base_url: String,
    pub poll_interval: Duration,
    pub request_timeout: Duration,
    pub role: Role,
    pub user_id: Option<String>,
    pub year_group_id: Option<String>,
    /// Child-name filter applied to the derived views
    pub filter: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:3000".to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            request_timeout: Duration::from_secs(10),
            role: Role::Anonymous,
            user_id: None,
            year_group_id: None,
            filter: String::new(),
        }
    }
}

impl ClientConfig {
    /// Read `PORTAL_*` variables over the defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(url) = lookup("PORTAL_API_URL") {
            config.api_base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(raw) = lookup("PORTAL_POLL_INTERVAL_MS") {
            config.poll_interval = parse_millis("PORTAL_POLL_INTERVAL_MS", &raw)?;
        }
        if let Some(raw) = lookup("PORTAL_REQUEST_TIMEOUT_MS") {
            config.request_timeout = parse_millis("PORTAL_REQUEST_TIMEOUT_MS", &raw)?;
        }
        config.role = Role::from_token(lookup("PORTAL_ROLE").as_deref());
        config.user_id = lookup("PORTAL_USER_ID").filter(|v| !v.trim().is_empty());
        config.year_group_id = lookup("PORTAL_YEAR_GROUP_ID").filter(|v| !v.trim().is_empty());
        config.filter = lookup("PORTAL_FILTER").unwrap_or_default();

        Ok(config)
    }

    pub fn session(&self) -> SessionContext {
        SessionContext {
            role: self.role,
            user_id: self.user_id.clone(),
            year_group_id: self.year_group_id.clone(),
        }
    }
}

fn parse_millis(name: &'static str, raw: &str) -> Result<Duration, ConfigError> {
    let millis: u64 = raw.trim().parse().map_err(|_| ConfigError::InvalidMillis {
        name,
        value: raw.to_string(),
    })?;
    if millis == 0 {
        return Err(ConfigError::Zero { name });
    }
    Ok(Duration::from_millis(millis))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults_without_environment() {
        let config = ClientConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.poll_interval, Duration::from_millis(1000));
        assert_eq!(config.session(), SessionContext::anonymous());
    }

    #[test]
    fn test_teacher_session_from_environment() {
        let config = ClientConfig::from_lookup(lookup(&[
            ("PORTAL_API_URL", "http://portal.test/"),
            ("PORTAL_POLL_INTERVAL_MS", "250"),
            ("PORTAL_ROLE", "teacher"),
            ("PORTAL_USER_ID", "u-7"),
            ("PORTAL_YEAR_GROUP_ID", "year-2"),
        ]))
        .unwrap();

        assert_eq!(config.api_base_url, "http://portal.test");
        assert_eq!(config.poll_interval, Duration::from_millis(250));
        assert_eq!(config.session(), SessionContext::teacher("u-7", "year-2"));
    }

    #[test]
    fn test_rejects_bad_intervals() {
        assert_eq!(
            ClientConfig::from_lookup(lookup(&[("PORTAL_POLL_INTERVAL_MS", "0")])),
            Err(ConfigError::Zero {
                name: "PORTAL_POLL_INTERVAL_MS"
            })
        );
        assert!(matches!(
            ClientConfig::from_lookup(lookup(&[("PORTAL_REQUEST_TIMEOUT_MS", "soon")])),
            Err(ConfigError::InvalidMillis { .. })
        ));
    }

    #[test]
    fn test_unknown_role_is_anonymous() {
        for token in ["admin", "Teacher", " parent"] {
            let config = ClientConfig::from_lookup(lookup(&[("PORTAL_ROLE", token)])).unwrap();
            assert_eq!(config.role, Role::Anonymous, "{token:?}");
        }
    }
}
