//! Fail-soft instance listing and filtered queries.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use fleet_core::{FleetResult, Instance, InstanceId, InstanceStatus};

use crate::provider::CloudProvider;

/// Normalized view over the cloud provider's instance pool.
///
/// Every query hits the provider fresh; nothing is cached across ticks.
pub struct InstanceInventory {
    provider: Arc<dyn CloudProvider>,
}

impl InstanceInventory {
    pub fn new(provider: Arc<dyn CloudProvider>) -> Self {
        Self { provider }
    }

    /// List instances, optionally scoped to a set of ids.
    ///
    /// Fails soft: a provider error is logged and yields an empty list.
    /// The caller treats "no instances" and "provider error" the same
    /// way — nothing to act on this tick.
    pub async fn list_instances(&self, ids: &[InstanceId]) -> Vec<Instance> {
        match self.provider.describe_instances(ids).await {
            Ok(instances) => instances,
            Err(e) => {
                warn!(error = %e, "instance listing failed, treating as empty");
                Vec::new()
            }
        }
    }

    /// Map private address → instance, restricted to the given addresses.
    pub async fn instances_by_private_ip(
        &self,
        ips: &[String],
    ) -> HashMap<String, Instance> {
        let instances = self.list_instances(&[]).await;
        instances
            .into_iter()
            .filter(|i| ips.iter().any(|ip| *ip == i.private_ip))
            .map(|i| (i.private_ip.clone(), i))
            .collect()
    }

    /// Instances in `status` carrying the pool label.
    async fn with_label_and_status(
        &self,
        label: &str,
        status: InstanceStatus,
        ids: &[InstanceId],
    ) -> Vec<Instance> {
        self.list_instances(ids)
            .await
            .into_iter()
            .filter(|i| i.status == status && i.has_label(label))
            .collect()
    }

    pub async fn running_with_label(&self, label: &str, ids: &[InstanceId]) -> Vec<Instance> {
        self.with_label_and_status(label, InstanceStatus::Running, ids)
            .await
    }

    pub async fn stopped_with_label(&self, label: &str, ids: &[InstanceId]) -> Vec<Instance> {
        self.with_label_and_status(label, InstanceStatus::Stopped, ids)
            .await
    }

    /// Issue a start request. Returns the confirmed subset of `ids`;
    /// callers must count only what came back.
    pub async fn start(&self, ids: &[InstanceId]) -> FleetResult<Vec<InstanceId>> {
        let confirmed = self.provider.start_instances(ids).await?;
        debug!(requested = ids.len(), confirmed = confirmed.len(), "start issued");
        Ok(confirmed)
    }

    /// Issue a stop request. Returns the confirmed subset of `ids`.
    pub async fn stop(&self, ids: &[InstanceId]) -> FleetResult<Vec<InstanceId>> {
        let confirmed = self.provider.stop_instances(ids).await?;
        debug!(requested = ids.len(), confirmed = confirmed.len(), "stop issued");
        Ok(confirmed)
    }
}
