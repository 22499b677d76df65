//! Label state machine.
//!
//! Labels on a runner are the only state that survives across
//! invocations, so the whole lifecycle is encoded in them:
//!
//! - a *workflow label* (`<run_id>-<suffix>`) marks the runner as
//!   assigned to a specific active job run; a runner may carry several;
//! - the *stopping label* (`stopping`) marks intent to shut the runner
//!   down once idle;
//! - a *run-scoped label* (`<run_id>-<pool>`) is claimed when a
//!   reconciliation picks a runner, so the same invocation never picks
//!   it twice and a later stop invocation finds exactly the runners it
//!   started.
//!
//! Everything here is pure; mutations against the control plane live in
//! `runnerfleet-registry`.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Sentinel label marking a runner as intended for shutdown once idle.
pub const STOPPING_LABEL: &str = "stopping";

/// Pattern of a workflow label: a numeric run id, a dash, a suffix.
static WORKFLOW_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+-.+$").unwrap());

/// An explicit set of labels with set-containment semantics.
///
/// Control planes report labels as arrays; treating them as a set here
/// keeps containment and mutation behavior documented in one place
/// instead of leaning on array-search semantics at call sites.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelSet(BTreeSet<String>);

impl LabelSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, label: &str) -> bool {
        self.0.contains(label)
    }

    /// True iff every label in `other` is present here (order irrelevant).
    pub fn contains_all(&self, other: &LabelSet) -> bool {
        other.0.iter().all(|l| self.0.contains(l))
    }

    /// Insert a label. Inserting an already-present label is a no-op.
    pub fn insert(&mut self, label: impl Into<String>) {
        self.0.insert(label.into());
    }

    /// Remove a label. Removing an absent label is a no-op.
    pub fn remove(&mut self, label: &str) {
        self.0.remove(label);
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for LabelSet {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// All labels on the set matching the workflow-label pattern.
pub fn workflow_labels(labels: &LabelSet) -> Vec<&str> {
    labels.iter().filter(|l| WORKFLOW_LABEL.is_match(l)).collect()
}

pub fn has_workflow_label(labels: &LabelSet) -> bool {
    labels.iter().any(|l| WORKFLOW_LABEL.is_match(l))
}

pub fn has_stopping_label(labels: &LabelSet) -> bool {
    labels.contains(STOPPING_LABEL)
}

/// A runner can be stopped once it is marked stopping and no workflow
/// is still in flight on it.
pub fn can_be_stopped(labels: &LabelSet) -> bool {
    has_stopping_label(labels) && !has_workflow_label(labels)
}

/// Extract the numeric run id from a workflow label, if it is one.
pub fn workflow_run_id(label: &str) -> Option<u64> {
    if !WORKFLOW_LABEL.is_match(label) {
        return None;
    }
    label.split('-').next()?.parse().ok()
}

/// The run-scoped label claimed on a runner selected for this invocation.
pub fn run_scoped_label(run_id: &str, pool_label: &str) -> String {
    format!("{run_id}-{pool_label}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(items: &[&str]) -> LabelSet {
        items.iter().copied().collect()
    }

    #[test]
    fn containment_ignores_order() {
        let set = labels(&["a", "b", "c"]);
        assert!(set.contains_all(&labels(&["c", "a"])));
        assert!(set.contains_all(&labels(&[])));
        assert!(!set.contains_all(&labels(&["a", "d"])));
    }

    #[test]
    fn insert_and_remove_are_idempotent() {
        let mut set = labels(&["a"]);
        set.insert("a");
        assert_eq!(set.len(), 1);
        set.remove("missing");
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn workflow_label_pattern() {
        assert!(has_workflow_label(&labels(&["123-build"])));
        assert!(!has_workflow_label(&labels(&["build-123"])));
        assert!(!has_workflow_label(&labels(&["123-"])));
        assert!(!has_workflow_label(&labels(&["stopping", "linux-x64"])));
    }

    #[test]
    fn workflow_labels_lists_all_matches() {
        let set = labels(&["11-a", "22-b", "stopping", "linux"]);
        let mut found = workflow_labels(&set);
        found.sort();
        assert_eq!(found, vec!["11-a", "22-b"]);
    }

    // Exhaustive over the stopping × workflow combinations.
    #[test]
    fn can_be_stopped_truth_table() {
        assert!(!can_be_stopped(&labels(&[])));
        assert!(!can_be_stopped(&labels(&["123-job"])));
        assert!(can_be_stopped(&labels(&["stopping"])));
        assert!(!can_be_stopped(&labels(&["stopping", "123-job"])));
        assert!(can_be_stopped(&labels(&["stopping", "linux-x64"])));
    }

    #[test]
    fn run_id_extraction() {
        assert_eq!(workflow_run_id("123-build"), Some(123));
        assert_eq!(workflow_run_id("123-linux-x64"), Some(123));
        assert_eq!(workflow_run_id("build-123"), None);
        assert_eq!(workflow_run_id("stopping"), None);
    }

    #[test]
    fn run_scoped_label_format() {
        assert_eq!(run_scoped_label("987", "linux-x64"), "987-linux-x64");
    }
}
