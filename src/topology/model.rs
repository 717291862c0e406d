//! Replication topology model
//!
//! Instance → base DN → supplier → ordered consumers. Order is significant:
//! the traversal visits everything in the order it was declared.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::{TopologyError, TopologyResult};

/// Connection scheme for suppliers and their consumers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    #[default]
    Ldap,
    Ldaps,
}

impl Protocol {
    pub fn scheme(&self) -> &'static str {
        match self {
            Protocol::Ldap => "ldap",
            Protocol::Ldaps => "ldaps",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.scheme())
    }
}

impl FromStr for Protocol {
    type Err = TopologyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ldap" => Ok(Protocol::Ldap),
            "ldaps" => Ok(Protocol::Ldaps),
            other => Err(TopologyError::UnknownProtocol(other.to_string())),
        }
    }
}

/// A consumer of one supplier
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConsumerSpec {
    pub host: String,
    /// Agreement DN on the supplier; `None` for an always-in-sync consumer
    pub agreement_dn: Option<String>,
}

impl ConsumerSpec {
    /// Consumer replicated in real time
    pub fn in_sync(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            agreement_dn: None,
        }
    }

    /// Consumer that needs a forced update through `agreement_dn`
    pub fn scheduled(host: impl Into<String>, agreement_dn: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            agreement_dn: Some(agreement_dn.into()),
        }
    }

    /// True when the propagation toggle has to run for this consumer
    pub fn needs_toggle(&self) -> bool {
        self.agreement_dn.is_some()
    }
}

/// A supplier and how to reach it
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct SupplierSpec {
    pub protocol: Protocol,
    pub host: String,
    pub port: u16,
    pub bind_dn: String,
    #[serde(skip_serializing)]
    pub bind_pw: String,
    pub consumers: Vec<ConsumerSpec>,
}

impl SupplierSpec {
    pub fn new(protocol: Protocol, host: impl Into<String>, port: u16) -> Self {
        Self {
            protocol,
            host: host.into(),
            port,
            bind_dn: String::new(),
            bind_pw: String::new(),
            consumers: Vec::new(),
        }
    }

    /// Set bind credentials
    pub fn with_bind(mut self, bind_dn: impl Into<String>, bind_pw: impl Into<String>) -> Self {
        self.bind_dn = bind_dn.into();
        self.bind_pw = bind_pw.into();
        self
    }

    /// Append a consumer
    pub fn with_consumer(mut self, consumer: ConsumerSpec) -> Self {
        self.consumers.push(consumer);
        self
    }

    /// URI of the supplier itself
    pub fn uri(&self) -> String {
        self.uri_for(&self.host)
    }

    /// URI of a consumer; consumers share the supplier's scheme and port
    pub fn uri_for(&self, host: &str) -> String {
        format!("{}://{}:{}", self.protocol, host, self.port)
    }

    fn validate(&self) -> TopologyResult<()> {
        if self.host.trim().is_empty() {
            return Err(TopologyError::Empty("supplier host"));
        }
        for (i, consumer) in self.consumers.iter().enumerate() {
            if consumer.host.trim().is_empty() {
                return Err(TopologyError::Empty("consumer host"));
            }
            if matches!(&consumer.agreement_dn, Some(dn) if dn.trim().is_empty()) {
                return Err(TopologyError::Empty("replication agreement DN"));
            }
            if self.consumers[..i].iter().any(|c| c.host == consumer.host) {
                return Err(TopologyError::DuplicateConsumer {
                    supplier: self.host.clone(),
                    consumer: consumer.host.clone(),
                });
            }
        }
        Ok(())
    }
}

impl fmt::Debug for SupplierSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SupplierSpec")
            .field("protocol", &self.protocol)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("bind_dn", &self.bind_dn)
            .field("consumers", &self.consumers)
            .finish()
    }
}

/// Suppliers of one base DN
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BaseDnSpec {
    pub base_dn: String,
    pub suppliers: Vec<SupplierSpec>,
}

/// Base DNs of one directory instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstanceSpec {
    pub name: String,
    pub base_dns: Vec<BaseDnSpec>,
}

/// One (instance, base DN, supplier) unit of work
#[derive(Debug, Clone, Copy)]
pub struct Unit<'a> {
    pub instance: &'a str,
    pub base_dn: &'a str,
    pub supplier: &'a SupplierSpec,
}

/// The whole replication topology
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Topology {
    pub instances: Vec<InstanceSpec>,
}

impl Topology {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a supplier, creating its instance and base DN on first use
    pub fn add_supplier(
        &mut self,
        instance: &str,
        base_dn: &str,
        supplier: SupplierSpec,
    ) -> TopologyResult<()> {
        if instance.trim().is_empty() {
            return Err(TopologyError::Empty("instance name"));
        }
        if base_dn.trim().is_empty() {
            return Err(TopologyError::Empty("base DN"));
        }
        supplier.validate()?;

        let inst = match self.instances.iter().position(|i| i.name == instance) {
            Some(pos) => &mut self.instances[pos],
            None => {
                self.instances.push(InstanceSpec {
                    name: instance.to_string(),
                    base_dns: Vec::new(),
                });
                let last = self.instances.len() - 1;
                &mut self.instances[last]
            }
        };
        let base = match inst.base_dns.iter().position(|b| b.base_dn == base_dn) {
            Some(pos) => &mut inst.base_dns[pos],
            None => {
                inst.base_dns.push(BaseDnSpec {
                    base_dn: base_dn.to_string(),
                    suppliers: Vec::new(),
                });
                let last = inst.base_dns.len() - 1;
                &mut inst.base_dns[last]
            }
        };
        if base.suppliers.iter().any(|s| s.host == supplier.host) {
            return Err(TopologyError::DuplicateSupplier {
                base_dn: base_dn.to_string(),
                supplier: supplier.host,
            });
        }
        base.suppliers.push(supplier);
        Ok(())
    }

    /// Builder form of `add_supplier`
    pub fn with_supplier(
        mut self,
        instance: &str,
        base_dn: &str,
        supplier: SupplierSpec,
    ) -> TopologyResult<Self> {
        self.add_supplier(instance, base_dn, supplier)?;
        Ok(self)
    }

    /// Every unit, in declaration order
    pub fn units(&self) -> impl Iterator<Item = Unit<'_>> {
        self.instances.iter().flat_map(|inst| {
            inst.base_dns.iter().flat_map(move |base| {
                base.suppliers.iter().map(move |supplier| Unit {
                    instance: &inst.name,
                    base_dn: &base.base_dn,
                    supplier,
                })
            })
        })
    }

    pub fn is_empty(&self) -> bool {
        self.units().next().is_none()
    }

    pub fn supplier_count(&self) -> usize {
        self.units().count()
    }

    pub fn consumer_count(&self) -> usize {
        self.units().map(|u| u.supplier.consumers.len()).sum()
    }
}
