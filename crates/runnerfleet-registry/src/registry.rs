//! Runner queries and lifecycle label mutations.

use std::sync::Arc;

use tracing::{debug, info};

use fleet_core::labels::{
    self, STOPPING_LABEL, workflow_labels, workflow_run_id,
};
use fleet_core::{FleetResult, LabelSet, Runner, RunnerId};

use crate::plane::ControlPlane;

/// Normalized view over the control plane's runner fleet.
///
/// Listings are fresh per call. Label mutations go straight through to
/// the control plane; labels are the only durable cross-invocation
/// state.
pub struct RunnerRegistry {
    plane: Arc<dyn ControlPlane>,
}

impl RunnerRegistry {
    pub fn new(plane: Arc<dyn ControlPlane>) -> Self {
        Self { plane }
    }

    pub async fn list_runners(&self) -> FleetResult<Vec<Runner>> {
        self.plane.list_runners().await
    }

    /// Runners whose label set is a superset of `filter`.
    pub async fn runners_with_labels(&self, filter: &LabelSet) -> FleetResult<Vec<Runner>> {
        Ok(self
            .list_runners()
            .await?
            .into_iter()
            .filter(|r| r.labels.contains_all(filter))
            .collect())
    }

    /// Runners that do not carry `label`.
    pub async fn runners_without_label(&self, label: &str) -> FleetResult<Vec<Runner>> {
        Ok(self
            .list_runners()
            .await?
            .into_iter()
            .filter(|r| !r.labels.contains(label))
            .collect())
    }

    /// Runners carrying at least one workflow label.
    pub async fn runners_with_workflow_labels(&self) -> FleetResult<Vec<Runner>> {
        Ok(self
            .list_runners()
            .await?
            .into_iter()
            .filter(|r| labels::has_workflow_label(&r.labels))
            .collect())
    }

    /// Look up a single runner in a fresh listing.
    pub async fn find_runner(&self, id: RunnerId) -> FleetResult<Option<Runner>> {
        Ok(self.list_runners().await?.into_iter().find(|r| r.id == id))
    }

    pub async fn add_label(&self, runner: RunnerId, label: &str) -> FleetResult<()> {
        self.plane.add_label(runner, label).await
    }

    pub async fn remove_label(&self, runner: RunnerId, label: &str) -> FleetResult<()> {
        self.plane.remove_label(runner, label).await
    }

    /// Mark a runner as intended for shutdown once idle.
    pub async fn mark_stopping(&self, runner: RunnerId) -> FleetResult<()> {
        self.plane.add_label(runner, STOPPING_LABEL).await
    }

    /// Clear the stopping intent after a successful stop.
    pub async fn mark_stopped(&self, runner: RunnerId) -> FleetResult<()> {
        self.plane.remove_label(runner, STOPPING_LABEL).await
    }

    /// Release a run-scoped claim label.
    pub async fn release_run_label(&self, runner: RunnerId, label: &str) -> FleetResult<()> {
        self.plane.remove_label(runner, label).await
    }

    pub async fn active_workflow_run_ids(&self) -> FleetResult<std::collections::BTreeSet<u64>> {
        self.plane.list_active_workflow_run_ids().await
    }

    /// Sweep workflow labels whose run has finished.
    ///
    /// For every runner carrying a workflow label whose run id is absent
    /// from the active set, add the stopping label and remove that
    /// workflow label. This is the only place workflow labels are
    /// removed, and it must run before stop-candidate selection so that
    /// freshly idled runners become eligible in the same pass.
    ///
    /// Idempotent: with an unchanged active set, a second sweep finds no
    /// remaining expired labels and mutates nothing.
    pub async fn reconcile_expired_workflows(&self) -> FleetResult<u32> {
        let tagged = self.runners_with_workflow_labels().await?;
        let active = self.active_workflow_run_ids().await?;

        let mut swept = 0;
        for runner in &tagged {
            for label in workflow_labels(&runner.labels) {
                let expired = match workflow_run_id(label) {
                    Some(run_id) => !active.contains(&run_id),
                    None => continue,
                };
                if expired {
                    info!(
                        runner = %runner.name,
                        label,
                        "workflow finished, marking runner stopping"
                    );
                    self.mark_stopping(runner.id).await?;
                    self.plane.remove_label(runner.id, label).await?;
                    swept += 1;
                }
            }
        }

        debug!(swept, "expired-workflow sweep complete");
        Ok(swept)
    }
}
