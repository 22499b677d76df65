//! Flow results.
//!
//! Deadline expiry is not an error here: both flows report whatever
//! progress they made, and the caller decides how loudly to complain.

use serde::Serialize;

use fleet_core::{FleetError, InstanceId};

/// Result of one start invocation.
#[derive(Debug, Clone, Serialize)]
pub struct StartReport {
    /// Target number of runners requested.
    pub requested: u32,
    /// The run-scoped label claimed on each acquired runner.
    pub label: String,
    /// Instance ids actually started and labelled, in acquisition order.
    pub acquired: Vec<InstanceId>,
    /// Whether the deadline expired before the target was met.
    pub timed_out: bool,
    /// Wall-clock seconds spent, measured from the entry time.
    pub elapsed_secs: u64,
}

impl StartReport {
    pub fn fulfilled(&self) -> bool {
        self.acquired.len() as u32 >= self.requested
    }
}

/// Result of one stop invocation.
#[derive(Debug, Clone, Serialize)]
pub struct StopReport {
    /// Target number of runners to stop; `None` means "drain".
    pub requested: Option<u32>,
    /// The run-scoped label this invocation released.
    pub label: String,
    /// Instance ids stopped and confirmed released.
    pub stopped: Vec<InstanceId>,
    pub timed_out: bool,
    /// Wall-clock seconds spent, measured from the entry time.
    pub elapsed_secs: u64,
}

/// Result of a cleanup pass.
#[derive(Debug, Clone, Serialize)]
pub struct CleanupReport {
    pub stopped: Vec<InstanceId>,
}

/// Per-candidate results of one batch, kept explicit so callers and
/// tests can see exactly which candidates failed without scraping logs.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub succeeded: Vec<InstanceId>,
    pub failures: Vec<(InstanceId, FleetError)>,
}

impl BatchOutcome {
    pub fn progressed(&self) -> bool {
        !self.succeeded.is_empty()
    }
}
