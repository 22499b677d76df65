//! Shared domain types used across runnerfleet crates.
//!
//! Instances and runners are point-in-time snapshots of two independent
//! inventories: the cloud provider's compute instances and the control
//! plane's registered runners. Both are re-fetched on every poll and
//! never cached across ticks; labels held by the control plane are the
//! only durable state.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::labels::LabelSet;

/// Cloud-side identifier for a compute instance (e.g. `i-0abc123`).
pub type InstanceId = String;

/// Control-plane identifier for a registered runner.
pub type RunnerId = u64;

// ── Instance ──────────────────────────────────────────────────────

/// Power state of a compute instance as reported by the cloud provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceStatus {
    Pending,
    Running,
    Stopping,
    Stopped,
    Terminated,
}

/// Snapshot of a single compute instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    pub id: InstanceId,
    /// Private network address; the join key to a runner's derived address.
    pub private_ip: String,
    pub status: InstanceStatus,
    pub instance_type: String,
    /// Free-form labels decoded from the provider-side `labels` tag.
    pub labels: LabelSet,
}

impl Instance {
    /// Whether this instance carries the given pool label.
    pub fn has_label(&self, label: &str) -> bool {
        self.labels.contains(label)
    }
}

// ── Runner ────────────────────────────────────────────────────────

/// Connectivity state of a runner as reported by the control plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunnerStatus {
    Online,
    Offline,
}

/// Snapshot of a single registered runner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Runner {
    pub id: RunnerId,
    /// Hostname-style name; encodes the private address (see
    /// [`Runner::derived_address`]).
    pub name: String,
    pub status: RunnerStatus,
    /// Whether the control plane reports a job currently executing here.
    pub busy: bool,
    pub labels: LabelSet,
}

static NAME_PREFIX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)^ip-").unwrap());
static NAME_ORDINAL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"-\d+$").unwrap());

impl Runner {
    pub fn is_offline(&self) -> bool {
        self.status == RunnerStatus::Offline
    }

    /// Online and not executing a job. Note this alone does not make the
    /// runner stoppable; label state decides that.
    pub fn is_idle(&self) -> bool {
        self.status == RunnerStatus::Online && !self.busy
    }

    /// Private address derived from the hostname-style runner name.
    ///
    /// Strips the leading `ip-`, drops the trailing ordinal, and turns
    /// the remaining dashes into dots: `ip-10-0-1-23-0` → `10.0.1.23`.
    /// The result is the sole join key to a cloud instance; a name that
    /// does not follow the convention simply never matches.
    pub fn derived_address(&self) -> String {
        let stripped = NAME_PREFIX.replace(&self.name, "");
        let stripped = NAME_ORDINAL.replace(&stripped, "");
        stripped.replace('-', ".")
    }
}
