//! JSON fleet snapshots.
//!
//! A fixture seeds the simulator with instances, runners, and the set
//! of active workflow runs. Used by `fleetctl --fixture` and the
//! workspace test fixtures.

use serde::{Deserialize, Serialize};

use fleet_core::{FleetError, FleetResult, Instance, Runner};

use crate::fleet::SimFleet;

/// Serialized fleet snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FleetFixture {
    #[serde(default)]
    pub instances: Vec<Instance>,
    #[serde(default)]
    pub runners: Vec<Runner>,
    #[serde(default)]
    pub active_workflow_runs: Vec<u64>,
}

impl FleetFixture {
    pub fn from_json(json: &str) -> FleetResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| FleetError::InvalidInput(format!("bad fleet fixture: {e}")))
    }

    /// Seed a fresh simulator from this snapshot.
    pub fn into_fleet(self) -> SimFleet {
        let fleet = SimFleet::new();
        for instance in self.instances {
            fleet.add_instance(instance);
        }
        for runner in self.runners {
            fleet.add_runner(runner);
        }
        fleet.set_active_runs(&self.active_workflow_runs);
        fleet
    }
}
