//! Startable/stoppable ranking and the idle-instance variant.

use std::collections::HashSet;

use rand::Rng;
use rand::seq::SliceRandom;

use fleet_core::labels::{self, can_be_stopped, workflow_labels};
use fleet_core::{Instance, InstanceId, InstanceStatus};
use runnerfleet_inventory::JoinedRunner;

/// Rank runners eligible to be started for this invocation.
///
/// Input is the joined view of runners already carrying the pool label.
/// Dropped: runners without a backing instance, instances in the
/// caller's exclusion set (already acquired this invocation), and
/// runners marked stopping.
///
/// The survivors are shuffled, then stably sorted: offline runners
/// before online ones, and within equal status, fewest workflow labels
/// first. The shuffle breaks remaining ties so equally eligible
/// instances all get picked over time.
pub fn startable(
    joined: &[JoinedRunner],
    exclude: &HashSet<InstanceId>,
    rng: &mut impl Rng,
) -> Vec<JoinedRunner> {
    let mut candidates: Vec<JoinedRunner> = joined
        .iter()
        .filter(|j| {
            j.instance
                .as_ref()
                .is_some_and(|i| !exclude.contains(&i.id))
        })
        .filter(|j| !labels::has_stopping_label(&j.runner.labels))
        .cloned()
        .collect();

    candidates.shuffle(rng);
    candidates.sort_by_key(|j| {
        (
            !j.runner.is_offline(),
            workflow_labels(&j.runner.labels).len(),
        )
    });
    candidates
}

/// Runners eligible to be stopped, in registry order.
pub fn stoppable(joined: &[JoinedRunner]) -> Vec<JoinedRunner> {
    joined
        .iter()
        .filter(|j| j.instance.is_some() && can_be_stopped(&j.runner.labels))
        .cloned()
        .collect()
}

/// The idle-instance variant used by stop flows that act directly on
/// running instances.
///
/// An instance is idle iff it is running, carries the target label, and
/// its address is absent from `busy_addresses` — the derived addresses
/// of runners currently reported online-and-busy. Online status alone is
/// not enough; idle means online and not busy, joined back by address.
pub fn idle_instances(
    instances: &[Instance],
    target_label: &str,
    busy_addresses: &HashSet<String>,
) -> Vec<Instance> {
    instances
        .iter()
        .filter(|i| i.status == InstanceStatus::Running)
        .filter(|i| i.has_label(target_label))
        .filter(|i| !busy_addresses.contains(&i.private_ip))
        .cloned()
        .collect()
}
