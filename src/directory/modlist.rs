//! Attribute sets and change lists
//!
//! Entries are plain attribute → values maps. A modification is described as
//! a before/after pair of attribute sets and translated into the add, delete
//! and replace operations the protocol understands.

use std::collections::BTreeMap;

/// Attribute name → values
pub type Attributes = BTreeMap<String, Vec<String>>;

/// One change in a modify request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Modification {
    /// Add values to an attribute
    Add(String, Vec<String>),
    /// Remove values; an empty list removes the whole attribute
    Delete(String, Vec<String>),
    /// Replace every value of an attribute
    Replace(String, Vec<String>),
}

impl Modification {
    /// Attribute the change applies to
    pub fn attribute(&self) -> &str {
        match self {
            Modification::Add(attr, _)
            | Modification::Delete(attr, _)
            | Modification::Replace(attr, _) => attr,
        }
    }
}

/// Build an attribute set from string slices
pub fn attributes<'a, I, V>(pairs: I) -> Attributes
where
    I: IntoIterator<Item = (&'a str, V)>,
    V: IntoIterator<Item = &'a str>,
{
    pairs
        .into_iter()
        .map(|(attr, values)| {
            (
                attr.to_string(),
                values.into_iter().map(str::to_string).collect(),
            )
        })
        .collect()
}

/// Attribute list for an add request; attributes without values are dropped
pub fn add_list(entry: &Attributes) -> Vec<(String, Vec<String>)> {
    entry
        .iter()
        .filter(|(_, values)| !values.is_empty())
        .map(|(attr, values)| (attr.clone(), values.clone()))
        .collect()
}

/// Translate a before/after pair into a change list
///
/// - attribute only in `after` → `Add`
/// - attribute only in `before` → `Delete` of the whole attribute
/// - attribute in both with a different value set → `Replace`
/// - identical value sets produce nothing
///
/// Attribute names compare case-insensitively, values compare as sets.
pub fn modify_list(before: &Attributes, after: &Attributes) -> Vec<Modification> {
    let mut changes = Vec::new();

    for (attr, new_values) in after {
        let old = lookup(before, attr);
        match old {
            Some(old_values) if !old_values.is_empty() => {
                if new_values.is_empty() {
                    changes.push(Modification::Delete(attr.clone(), Vec::new()));
                } else if !same_values(old_values, new_values) {
                    changes.push(Modification::Replace(attr.clone(), new_values.clone()));
                }
            }
            _ => {
                if !new_values.is_empty() {
                    changes.push(Modification::Add(attr.clone(), new_values.clone()));
                }
            }
        }
    }

    for (attr, old_values) in before {
        if old_values.is_empty() {
            continue;
        }
        if lookup(after, attr).is_none() {
            changes.push(Modification::Delete(attr.clone(), Vec::new()));
        }
    }

    changes
}

/// Case-insensitive attribute lookup
pub fn lookup<'a>(entry: &'a Attributes, attr: &str) -> Option<&'a Vec<String>> {
    entry
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(attr))
        .map(|(_, values)| values)
}

fn same_values(a: &[String], b: &[String]) -> bool {
    let mut a: Vec<&String> = a.iter().collect();
    let mut b: Vec<&String> = b.iter().collect();
    a.sort();
    a.dedup();
    b.sort();
    b.dedup();
    a == b
}
