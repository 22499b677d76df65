//! Control-plane contract.

use std::collections::BTreeSet;

use async_trait::async_trait;

use fleet_core::{FleetResult, Runner, RunnerId};

/// The control-plane collaborator.
///
/// Implementations are external (an API client, or the simulator in
/// `runnerfleet-sim`). Label mutations are idempotent from the caller's
/// perspective: adding a present label or removing an absent one is not
/// an error the core needs to distinguish.
#[async_trait]
pub trait ControlPlane: Send + Sync {
    /// All runners registered with the control plane.
    async fn list_runners(&self) -> FleetResult<Vec<Runner>>;

    async fn add_label(&self, runner: RunnerId, label: &str) -> FleetResult<()>;

    async fn remove_label(&self, runner: RunnerId, label: &str) -> FleetResult<()>;

    /// Ids of workflow runs not yet in a terminal state, aggregated
    /// across all repositories in the organization.
    async fn list_active_workflow_run_ids(&self) -> FleetResult<BTreeSet<u64>>;
}
