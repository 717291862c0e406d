//! Dashboard and notification sections

use serde::{Deserialize, Serialize};

use super::errors::{ConfigError, ConfigResult};

/// `dashboard` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardConfig {
    #[serde(default = "default_dashboard_enabled")]
    pub enabled: bool,

    #[serde(default = "default_dashboard_host")]
    pub host: String,

    #[serde(default = "default_dashboard_port")]
    pub port: u16,
}

fn default_dashboard_enabled() -> bool {
    true
}
fn default_dashboard_host() -> String {
    "0.0.0.0".to_string()
}
fn default_dashboard_port() -> u16 {
    8080
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            enabled: default_dashboard_enabled(),
            host: default_dashboard_host(),
            port: default_dashboard_port(),
        }
    }
}

impl DashboardConfig {
    /// `host:port` to bind
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub(super) fn validate(&self) -> ConfigResult<()> {
        if self.enabled && self.port == 0 {
            return Err(ConfigError::invalid("dashboard.port must be > 0"));
        }
        Ok(())
    }
}

/// `notify` section
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotifyConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Also mail when every check passed
    #[serde(default)]
    pub on_success: bool,

    #[serde(default = "default_smtp_host")]
    pub smtp_host: String,

    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,

    /// Empty for no authentication
    #[serde(default)]
    pub smtp_user: String,

    #[serde(default, skip_serializing)]
    pub smtp_password: String,

    #[serde(default = "default_from")]
    pub from: String,

    #[serde(default)]
    pub to: Vec<String>,
}

fn default_smtp_host() -> String {
    "localhost".to_string()
}
fn default_smtp_port() -> u16 {
    25
}
fn default_from() -> String {
    "ds-repltest@localhost".to_string()
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            on_success: false,
            smtp_host: default_smtp_host(),
            smtp_port: default_smtp_port(),
            smtp_user: String::new(),
            smtp_password: String::new(),
            from: default_from(),
            to: Vec::new(),
        }
    }
}

impl NotifyConfig {
    pub(super) fn validate(&self) -> ConfigResult<()> {
        if !self.enabled {
            return Ok(());
        }
        if self.to.iter().all(|r| r.trim().is_empty()) {
            return Err(ConfigError::invalid(
                "notify.to needs at least one recipient when notify is enabled",
            ));
        }
        if self.smtp_host.trim().is_empty() {
            return Err(ConfigError::invalid("notify.smtp_host must not be empty"));
        }
        if self.smtp_port == 0 {
            return Err(ConfigError::invalid("notify.smtp_port must be > 0"));
        }
        Ok(())
    }
}

impl std::fmt::Debug for NotifyConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotifyConfig")
            .field("enabled", &self.enabled)
            .field("on_success", &self.on_success)
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("smtp_user", &self.smtp_user)
            .field("from", &self.from)
            .field("to", &self.to)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notify_needs_recipient_when_enabled() {
        let config = NotifyConfig {
            enabled: true,
            ..NotifyConfig::default()
        };
        assert!(config.validate().is_err());

        let config = NotifyConfig {
            enabled: true,
            to: vec!["ops@example.com".to_string()],
            ..NotifyConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_disabled_notify_is_not_checked() {
        assert!(NotifyConfig::default().validate().is_ok());
    }

    #[test]
    fn test_dashboard_defaults() {
        let config: DashboardConfig = serde_json::from_str("{}").unwrap();
        assert!(config.enabled);
        assert_eq!(config.port, 8080);
        assert_eq!(config.socket_addr(), "0.0.0.0:8080");
    }
}
