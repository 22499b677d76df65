//! Cloud provider contract.

use async_trait::async_trait;

use fleet_core::{FleetResult, Instance, InstanceId};

/// The cloud inventory collaborator.
///
/// Implementations are external to this repository (an SDK-backed
/// client, or the in-memory simulator in `runnerfleet-sim`). All calls
/// are assumed already authenticated and scoped to the configured
/// region.
#[async_trait]
pub trait CloudProvider: Send + Sync {
    /// Describe instances. An empty `ids` slice means "all instances".
    async fn describe_instances(&self, ids: &[InstanceId]) -> FleetResult<Vec<Instance>>;

    /// Request a start for each id. Returns the ids the provider
    /// confirmed, always a subset of `ids`.
    async fn start_instances(&self, ids: &[InstanceId]) -> FleetResult<Vec<InstanceId>>;

    /// Request a stop for each id. Returns the confirmed subset.
    async fn stop_instances(&self, ids: &[InstanceId]) -> FleetResult<Vec<InstanceId>>;
}
