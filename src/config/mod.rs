//! Configuration file
//!
//! One JSON document, read and validated once before a run:
//! - `logging`: sinks and minimum level
//! - `timeout`, `timewait`, `update_timewait`: seconds
//! - `test_entry`: the canary attributes
//! - `instances`: instance → base DN → supplier → connection and consumers
//! - `dashboard`, `notify`: optional collaborators
//!
//! Map order in the file is the traversal order.

mod errors;
mod logging;
mod sections;

use std::fs;
use std::path::Path;
use std::time::Duration;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

pub use errors::{ConfigError, ConfigResult};
pub use logging::{LogType, LoggingConfig};
pub use sections::{DashboardConfig, NotifyConfig};

use crate::directory::Attributes;
use crate::topology::{ConsumerSpec, Protocol, SupplierSpec, TestEntry, Topology};
use crate::watchdog::Timings;

/// Default location of the configuration file
pub const DEFAULT_CONFIG_PATH: &str = "/etc/ds-repltest/ds-repltest.json";

const MAX_TIMEOUT_SECS: u64 = 300;
const MAX_WAIT_SECS: u64 = 3600;

/// A test entry value: one string or a list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntryValue {
    One(String),
    Many(Vec<String>),
}

impl EntryValue {
    fn to_values(&self) -> Vec<String> {
        match self {
            EntryValue::One(v) => vec![v.clone()],
            EntryValue::Many(vs) => vs.clone(),
        }
    }
}

/// One consumer of a supplier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumerConfig {
    pub host: String,

    /// Replication agreement DN; `null` when always in sync
    #[serde(default)]
    pub agreement: Option<String>,
}

/// One supplier
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplierConfig {
    #[serde(default = "default_protocol")]
    pub protocol: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Bind DN; empty for an anonymous bind
    #[serde(default)]
    pub bind: String,

    #[serde(default, skip_serializing)]
    pub pwd: String,

    #[serde(default)]
    pub consumers: Vec<ConsumerConfig>,
}

fn default_protocol() -> String {
    "ldap".to_string()
}
fn default_port() -> u16 {
    389
}

impl std::fmt::Debug for SupplierConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupplierConfig")
            .field("protocol", &self.protocol)
            .field("port", &self.port)
            .field("bind", &self.bind)
            .field("consumers", &self.consumers)
            .finish()
    }
}

/// base DN → supplier host → supplier
pub type InstanceConfig = IndexMap<String, IndexMap<String, SupplierConfig>>;

/// The configuration file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Network timeout in seconds (default 5)
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Settle wait in seconds (default 3)
    #[serde(default = "default_timewait")]
    pub timewait: u64,

    /// Wait after a forced update in seconds (default 2)
    #[serde(default = "default_update_timewait")]
    pub update_timewait: u64,

    pub test_entry: IndexMap<String, EntryValue>,

    pub instances: IndexMap<String, InstanceConfig>,

    #[serde(default)]
    pub dashboard: DashboardConfig,

    #[serde(default)]
    pub notify: NotifyConfig,
}

fn default_timeout() -> u64 {
    5
}
fn default_timewait() -> u64 {
    3
}
fn default_update_timewait() -> u64 {
    2
}

impl Config {
    /// Load and validate the configuration file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }

    /// Parse and validate a JSON document
    pub fn from_json(content: &str) -> ConfigResult<Self> {
        let config: Config = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> ConfigResult<()> {
        if self.timeout == 0 || self.timeout > MAX_TIMEOUT_SECS {
            return Err(ConfigError::invalid(format!(
                "Invalid timeout: {}. Must be between 1 and {} seconds.",
                self.timeout, MAX_TIMEOUT_SECS
            )));
        }
        for (name, value) in [("timewait", self.timewait), ("update_timewait", self.update_timewait)] {
            if value > MAX_WAIT_SECS {
                return Err(ConfigError::invalid(format!(
                    "Invalid {}: {}. Must be between 0 and {} seconds.",
                    name, value, MAX_WAIT_SECS
                )));
            }
        }

        for (instance, base_dns) in &self.instances {
            if base_dns.is_empty() {
                return Err(ConfigError::invalid(format!(
                    "instance '{}' has no base DN",
                    instance
                )));
            }
            for (base_dn, suppliers) in base_dns {
                if suppliers.is_empty() {
                    return Err(ConfigError::invalid(format!(
                        "base DN '{}' of instance '{}' has no supplier",
                        base_dn, instance
                    )));
                }
                for (host, supplier) in suppliers {
                    if supplier.port == 0 {
                        return Err(ConfigError::invalid(format!(
                            "Invalid port for supplier '{}': must be > 0",
                            host
                        )));
                    }
                }
            }
        }

        if self.topology()?.is_empty() {
            return Err(ConfigError::invalid("no instance configured"));
        }
        self.test_entry()?;
        self.logging.validate()?;
        self.dashboard.validate()?;
        self.notify.validate()?;
        Ok(())
    }

    /// The replication topology, in file order
    pub fn topology(&self) -> ConfigResult<Topology> {
        let mut topology = Topology::new();
        for (instance, base_dns) in &self.instances {
            for (base_dn, suppliers) in base_dns {
                for (host, supplier) in suppliers {
                    let protocol: Protocol = supplier.protocol.parse()?;
                    let spec = supplier.consumers.iter().fold(
                        SupplierSpec::new(protocol, host.as_str(), supplier.port)
                            .with_bind(supplier.bind.as_str(), supplier.pwd.as_str()),
                        |spec, consumer| {
                            spec.with_consumer(ConsumerSpec {
                                host: consumer.host.clone(),
                                agreement_dn: consumer.agreement.clone(),
                            })
                        },
                    );
                    topology.add_supplier(instance, base_dn, spec)?;
                }
            }
        }
        Ok(topology)
    }

    /// The canary entry
    pub fn test_entry(&self) -> ConfigResult<TestEntry> {
        let attributes: Attributes = self
            .test_entry
            .iter()
            .map(|(attr, value)| (attr.clone(), value.to_values()))
            .collect();
        Ok(TestEntry::new(attributes)?)
    }

    pub fn timings(&self) -> Timings {
        Timings::new(
            Duration::from_secs(self.timeout),
            Duration::from_secs(self.timewait),
            Duration::from_secs(self.update_timewait),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::NamingAttribute;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"{
        "logging": {"type": "stdout", "level": "INFO"},
        "timeout": 5, "timewait": 3, "update_timewait": 2,
        "test_entry": {"uid": "repltest", "cn": "Repl Test", "objectClass": ["top", "account"]},
        "instances": {
            "main": {
                "dc=example,dc=com": {
                    "ldap1.example.com": {
                        "protocol": "ldap", "port": 389,
                        "bind": "cn=Directory Manager", "pwd": "secret",
                        "consumers": [
                            {"host": "ldap2.example.com", "agreement": null},
                            {"host": "ldap3.example.com", "agreement": "cn=to-ldap3,cn=replica,cn=config"}
                        ]
                    }
                }
            }
        }
    }"#;

    fn with(patch: impl FnOnce(&mut serde_json::Value)) -> String {
        let mut value: serde_json::Value = serde_json::from_str(SAMPLE).unwrap();
        patch(&mut value);
        value.to_string()
    }

    #[test]
    fn test_load_sample() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("ds-repltest.json");
        fs::write(&path, SAMPLE).unwrap();

        let config = Config::load(&path).unwrap();
        let topology = config.topology().unwrap();
        assert_eq!(topology.supplier_count(), 1);
        assert_eq!(topology.consumer_count(), 2);

        let unit = topology.units().next().unwrap();
        assert_eq!(unit.supplier.uri(), "ldap://ldap1.example.com:389");
        assert!(!unit.supplier.consumers[0].needs_toggle());
        assert_eq!(
            unit.supplier.consumers[1].agreement_dn.as_deref(),
            Some("cn=to-ldap3,cn=replica,cn=config")
        );

        let entry = config.test_entry().unwrap();
        assert_eq!(entry.naming_attribute(), NamingAttribute::Uid);
        assert_eq!(config.timings().settle_wait, Duration::from_secs(3));
        assert!(!config.notify.enabled);
        assert!(config.dashboard.enabled);
    }

    #[test]
    fn test_missing_file() {
        let err = Config::load(Path::new("/nonexistent/ds-repltest.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            Config::from_json("{ not json").unwrap_err(),
            ConfigError::Parse(_)
        ));
    }

    #[test]
    fn test_timeout_bounds() {
        let json = with(|v| v["timeout"] = 0.into());
        assert!(matches!(Config::from_json(&json), Err(ConfigError::Invalid(_))));
        let json = with(|v| v["timeout"] = 301.into());
        assert!(Config::from_json(&json).is_err());
        let json = with(|v| v["update_timewait"] = 3601.into());
        assert!(Config::from_json(&json).is_err());
        let json = with(|v| v["timewait"] = 0.into());
        assert!(Config::from_json(&json).is_ok());
    }

    #[test]
    fn test_rejects_unknown_protocol() {
        let json = with(|v| {
            v["instances"]["main"]["dc=example,dc=com"]["ldap1.example.com"]["protocol"] = "http".into()
        });
        assert!(matches!(Config::from_json(&json), Err(ConfigError::Topology(_))));
    }

    #[test]
    fn test_rejects_port_zero() {
        let json = with(|v| {
            v["instances"]["main"]["dc=example,dc=com"]["ldap1.example.com"]["port"] = 0.into()
        });
        assert!(Config::from_json(&json).is_err());
    }

    #[test]
    fn test_rejects_empty_instances() {
        let json = with(|v| v["instances"] = serde_json::json!({}));
        assert!(Config::from_json(&json).is_err());
        let json = with(|v| v["instances"] = serde_json::json!({"main": {}}));
        assert!(Config::from_json(&json).is_err());
    }

    #[test]
    fn test_rejects_entry_without_naming_attribute() {
        let json = with(|v| v["test_entry"] = serde_json::json!({"objectClass": ["top"]}));
        let err = Config::from_json(&json).unwrap_err();
        assert!(err.to_string().contains("'cn' or 'uid'"));
    }

    #[test]
    fn test_file_order_is_traversal_order() {
        let json = r#"{
            "test_entry": {"cn": "repltest"},
            "instances": {
                "zeta": {"o=b": {"s9": {}, "s1": {}}},
                "alpha": {"o=a": {"s5": {}}}
            }
        }"#;
        let config = Config::from_json(json).unwrap();
        let order: Vec<(String, String)> = config
            .topology()
            .unwrap()
            .units()
            .map(|u| (u.instance.to_string(), u.supplier.host.clone()))
            .collect();
        assert_eq!(
            order,
            vec![
                ("zeta".to_string(), "s9".to_string()),
                ("zeta".to_string(), "s1".to_string()),
                ("alpha".to_string(), "s5".to_string()),
            ]
        );
    }

    #[test]
    fn test_defaults_applied() {
        let json = with(|v| {
            let obj = v.as_object_mut().unwrap();
            obj.remove("timeout");
            obj.remove("logging");
        });
        let config = Config::from_json(&json).unwrap();
        assert_eq!(config.timeout, 5);
        assert_eq!(config.logging.log_type, LogType::Stdout);
    }
}
