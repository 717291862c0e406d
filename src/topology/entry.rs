//! Canary test entry
//!
//! The entry written to every supplier. Its DN is built from one naming
//! attribute: `uid` when present, otherwise `cn`.

use std::fmt;

use serde::Serialize;

use super::errors::{TopologyError, TopologyResult};
use crate::directory::{lookup, Attributes};

/// Attribute used as the relative DN of the canary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NamingAttribute {
    Uid,
    Cn,
}

impl NamingAttribute {
    pub fn as_str(&self) -> &'static str {
        match self {
            NamingAttribute::Uid => "uid",
            NamingAttribute::Cn => "cn",
        }
    }
}

impl fmt::Display for NamingAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The canary entry, immutable for a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestEntry {
    attributes: Attributes,
    naming: NamingAttribute,
    naming_value: String,
}

impl TestEntry {
    /// Validate the attribute map and pick the naming attribute
    pub fn new(attributes: Attributes) -> TopologyResult<Self> {
        let (naming, values) = [NamingAttribute::Uid, NamingAttribute::Cn]
            .into_iter()
            .find_map(|naming| lookup(&attributes, naming.as_str()).map(|v| (naming, v)))
            .ok_or(TopologyError::MissingNamingAttribute)?;

        if values.len() != 1 || values[0].trim().is_empty() {
            return Err(TopologyError::NamingValueCount {
                attribute: naming.as_str().to_string(),
                count: values.iter().filter(|v| !v.trim().is_empty()).count(),
            });
        }
        let naming_value = values[0].clone();
        if !is_plain_rdn_value(&naming_value) {
            return Err(TopologyError::UnsafeNamingValue {
                attribute: naming.as_str().to_string(),
                value: naming_value,
            });
        }

        Ok(Self {
            attributes,
            naming,
            naming_value,
        })
    }

    /// Full attribute map written on add
    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn naming_attribute(&self) -> NamingAttribute {
        self.naming
    }

    pub fn naming_value(&self) -> &str {
        &self.naming_value
    }

    /// `<naming>=<value>,<base_dn>`
    pub fn dn_for(&self, base_dn: &str) -> String {
        format!("{}={},{}", self.naming, self.naming_value, base_dn)
    }
}

/// True when `value` can sit in an RDN without RFC 4514 escaping
fn is_plain_rdn_value(value: &str) -> bool {
    const RESERVED: &[char] = &[',', '+', '=', '"', '\\', '<', '>', ';', '\0'];
    !value.starts_with(['#', ' '])
        && !value.ends_with(' ')
        && !value.contains(RESERVED)
}
