//! The simulated fleet state and collaborator implementations.

use std::collections::{BTreeSet, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use fleet_core::{
    FleetError, FleetResult, Instance, InstanceId, InstanceStatus, Runner, RunnerId,
    RunnerStatus,
};
use runnerfleet_inventory::CloudProvider;
use runnerfleet_registry::ControlPlane;

/// A runner/instance pair that joins the fleet later, once the start
/// counter reaches `after_starts`. Lets tests script capacity appearing
/// mid-reconciliation.
struct PendingPair {
    after_starts: u32,
    runner: Runner,
    instance: Instance,
}

#[derive(Default)]
struct SimState {
    instances: Vec<Instance>,
    runners: Vec<Runner>,
    active_runs: BTreeSet<u64>,
    /// Upcoming start_instances calls that fail outright.
    failing_start_calls: u32,
    /// Instance ids the provider never confirms on start.
    unconfirmed_starts: HashSet<InstanceId>,
    /// Instance ids whose runner claims a new job the moment a stop is
    /// issued (the selection/stop race).
    busy_on_stop: HashSet<InstanceId>,
    /// Successful instance starts so far.
    starts: u32,
    pending: Vec<PendingPair>,
}

/// In-memory fleet implementing both collaborator contracts.
#[derive(Default)]
pub struct SimFleet {
    state: Mutex<SimState>,
}

impl SimFleet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an instance and a runner joined to it by address.
    pub fn add_pair(&self, instance: Instance, runner: Runner) {
        let mut state = self.state.lock().unwrap();
        state.instances.push(instance);
        state.runners.push(runner);
    }

    pub fn add_instance(&self, instance: Instance) {
        self.state.lock().unwrap().instances.push(instance);
    }

    pub fn add_runner(&self, runner: Runner) {
        self.state.lock().unwrap().runners.push(runner);
    }

    pub fn set_active_runs(&self, runs: &[u64]) {
        self.state.lock().unwrap().active_runs = runs.iter().copied().collect();
    }

    /// Fail the next `calls` start_instances calls with a provider error.
    pub fn fail_next_starts(&self, calls: u32) {
        self.state.lock().unwrap().failing_start_calls = calls;
    }

    /// Never confirm starts for this instance id.
    pub fn never_confirm_start(&self, id: impl Into<InstanceId>) {
        self.state.lock().unwrap().unconfirmed_starts.insert(id.into());
    }

    /// When a stop is issued for this instance, its runner reports busy
    /// again instead of going offline.
    pub fn claim_on_stop(&self, id: impl Into<InstanceId>) {
        self.state.lock().unwrap().busy_on_stop.insert(id.into());
    }

    /// Join a runner/instance pair to the fleet after `after_starts`
    /// successful starts have happened.
    pub fn join_after_starts(&self, after_starts: u32, instance: Instance, runner: Runner) {
        self.state.lock().unwrap().pending.push(PendingPair {
            after_starts,
            runner,
            instance,
        });
    }

    pub fn runner(&self, id: RunnerId) -> Option<Runner> {
        self.state
            .lock()
            .unwrap()
            .runners
            .iter()
            .find(|r| r.id == id)
            .cloned()
    }

    pub fn instance(&self, id: &str) -> Option<Instance> {
        self.state
            .lock()
            .unwrap()
            .instances
            .iter()
            .find(|i| i.id == id)
            .cloned()
    }

    fn release_pending(state: &mut SimState) {
        let ready: Vec<usize> = state
            .pending
            .iter()
            .enumerate()
            .filter(|(_, p)| p.after_starts <= state.starts)
            .map(|(idx, _)| idx)
            .collect();
        for idx in ready.into_iter().rev() {
            let pair = state.pending.remove(idx);
            state.instances.push(pair.instance);
            state.runners.push(pair.runner);
        }
    }
}

#[async_trait]
impl CloudProvider for SimFleet {
    async fn describe_instances(&self, ids: &[InstanceId]) -> FleetResult<Vec<Instance>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .instances
            .iter()
            .filter(|i| ids.is_empty() || ids.contains(&i.id))
            .cloned()
            .collect())
    }

    async fn start_instances(&self, ids: &[InstanceId]) -> FleetResult<Vec<InstanceId>> {
        let mut state = self.state.lock().unwrap();
        if state.failing_start_calls > 0 {
            state.failing_start_calls -= 1;
            return Err(FleetError::Cloud("simulated start failure".to_string()));
        }

        let mut confirmed = Vec::new();
        for id in ids {
            if state.unconfirmed_starts.contains(id) {
                continue;
            }
            if let Some(instance) = state.instances.iter_mut().find(|i| i.id == *id) {
                instance.status = InstanceStatus::Running;
                confirmed.push(id.clone());
            }
        }
        state.starts += confirmed.len() as u32;
        Self::release_pending(&mut state);
        Ok(confirmed)
    }

    async fn stop_instances(&self, ids: &[InstanceId]) -> FleetResult<Vec<InstanceId>> {
        let mut state = self.state.lock().unwrap();
        let mut confirmed = Vec::new();
        for id in ids {
            let Some(idx) = state.instances.iter().position(|i| i.id == *id) else {
                continue;
            };

            if state.busy_on_stop.contains(id) {
                // A new job claimed the runner between selection and
                // stop; the runner reports busy and the instance keeps
                // running.
                let address = state.instances[idx].private_ip.clone();
                if let Some(runner) = state
                    .runners
                    .iter_mut()
                    .find(|r| r.derived_address() == address)
                {
                    runner.status = RunnerStatus::Online;
                    runner.busy = true;
                }
                confirmed.push(id.clone());
                continue;
            }

            state.instances[idx].status = InstanceStatus::Stopped;
            let address = state.instances[idx].private_ip.clone();
            if let Some(runner) = state
                .runners
                .iter_mut()
                .find(|r| r.derived_address() == address)
            {
                runner.status = RunnerStatus::Offline;
                runner.busy = false;
            }
            confirmed.push(id.clone());
        }
        Ok(confirmed)
    }
}

#[async_trait]
impl ControlPlane for SimFleet {
    async fn list_runners(&self) -> FleetResult<Vec<Runner>> {
        Ok(self.state.lock().unwrap().runners.clone())
    }

    async fn add_label(&self, runner: RunnerId, label: &str) -> FleetResult<()> {
        let mut state = self.state.lock().unwrap();
        if let Some(r) = state.runners.iter_mut().find(|r| r.id == runner) {
            r.labels.insert(label);
        }
        Ok(())
    }

    async fn remove_label(&self, runner: RunnerId, label: &str) -> FleetResult<()> {
        let mut state = self.state.lock().unwrap();
        if let Some(r) = state.runners.iter_mut().find(|r| r.id == runner) {
            r.labels.remove(label);
        }
        Ok(())
    }

    async fn list_active_workflow_run_ids(&self) -> FleetResult<BTreeSet<u64>> {
        Ok(self.state.lock().unwrap().active_runs.clone())
    }
}
