//! Result tree and run report
//!
//! The tree mirrors the topology down to the supplier. Each supplier node
//! holds its own status and one boolean per consumer.

use std::fmt::Write as _;

use chrono::{DateTime, Local};
use indexmap::IndexMap;
use serde::Serialize;

/// Outcome for one supplier
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SupplierOutcome {
    /// `None` until the unit records it
    pub status: Option<bool>,
    /// Consumer host -> replicated
    pub replica: IndexMap<String, bool>,
}

impl SupplierOutcome {
    /// True when the status is set and true and every consumer replicated
    pub fn is_success(&self) -> bool {
        self.status == Some(true) && self.replica.values().all(|ok| *ok)
    }
}

type BaseDnResults = IndexMap<String, SupplierOutcome>;
type InstanceResults = IndexMap<String, BaseDnResults>;

/// instance -> base DN -> supplier -> outcome
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ResultTree {
    instances: IndexMap<String, InstanceResults>,
}

impl ResultTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Node for a supplier, created empty on first access
    pub fn supplier_mut(&mut self, instance: &str, base_dn: &str, supplier: &str) -> &mut SupplierOutcome {
        self.instances
            .entry(instance.to_string())
            .or_default()
            .entry(base_dn.to_string())
            .or_default()
            .entry(supplier.to_string())
            .or_default()
    }

    pub fn supplier(&self, instance: &str, base_dn: &str, supplier: &str) -> Option<&SupplierOutcome> {
        self.instances.get(instance)?.get(base_dn)?.get(supplier)
    }

    /// Every supplier node, in traversal order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, &str, &SupplierOutcome)> {
        self.instances.iter().flat_map(|(instance, bases)| {
            bases.iter().flat_map(move |(base_dn, suppliers)| {
                suppliers.iter().map(move |(supplier, outcome)| {
                    (instance.as_str(), base_dn.as_str(), supplier.as_str(), outcome)
                })
            })
        })
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Number of supplier nodes
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// Logical AND over every status and every replica flag
    pub fn is_success(&self) -> bool {
        self.iter().all(|(_, _, _, outcome)| outcome.is_success())
    }

    /// Indented plain text view
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        for (instance, bases) in &self.instances {
            let _ = writeln!(out, "{}", instance);
            for (base_dn, suppliers) in bases {
                let _ = writeln!(out, "\t{}", base_dn);
                for (supplier, outcome) in suppliers {
                    let _ = writeln!(out, "\t\t{}: {}", supplier, mark(outcome.status));
                    for (consumer, ok) in &outcome.replica {
                        let _ = writeln!(out, "\t\t\t{}: {}", consumer, mark(Some(*ok)));
                    }
                }
            }
        }
        out
    }
}

fn mark(status: Option<bool>) -> &'static str {
    match status {
        Some(true) => "OK",
        Some(false) => "FAIL",
        None => "NOT RUN",
    }
}

/// A finished run, handed to the presentation layer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub results: ResultTree,
    pub success: bool,
    pub finished_at: DateTime<Local>,
}

impl RunReport {
    /// Report stamped with the current local time
    pub fn new(results: ResultTree) -> Self {
        Self::at(results, Local::now())
    }

    pub fn at(results: ResultTree, finished_at: DateTime<Local>) -> Self {
        let success = results.is_success();
        Self {
            results,
            success,
            finished_at,
        }
    }

    /// One line outcome
    pub fn summary(&self) -> String {
        if self.success {
            format!(
                "Test completed successfully on {}!",
                self.finished_at.format("%a %b %e %H:%M:%S %Y")
            )
        } else {
            "FAIL. Some errors occur. Check at the log for more details.".to_string()
        }
    }

    /// Tree followed by the summary line
    pub fn render_text(&self) -> String {
        let mut out = self.results.render_text();
        out.push_str(&self.summary());
        out.push('\n');
        out
    }
}
