//! Joining the two inventories.
//!
//! A runner maps to at most one instance: the one whose private address
//! equals the runner's derived address. A runner with no match is kept
//! in the joined view but unusable for start/stop actions — the
//! instance may not exist yet or may have a different address
//! assignment, neither of which is an error.

use std::collections::HashMap;

use fleet_core::{Instance, Runner};

/// A runner associated with its backing instance, when one exists.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinedRunner {
    pub runner: Runner,
    pub instance: Option<Instance>,
}

impl JoinedRunner {
    /// Whether start/stop actions can target this runner.
    pub fn is_actionable(&self) -> bool {
        self.instance.is_some()
    }
}

/// Join runners to instances by derived address, preserving runner order.
pub fn join_runners(runners: &[Runner], instances: &[Instance]) -> Vec<JoinedRunner> {
    let by_ip: HashMap<&str, &Instance> = instances
        .iter()
        .map(|i| (i.private_ip.as_str(), i))
        .collect();

    runners
        .iter()
        .map(|r| JoinedRunner {
            runner: r.clone(),
            instance: by_ip.get(r.derived_address().as_str()).map(|i| (*i).clone()),
        })
        .collect()
}
