//! runnerfleet-sim — a simulated fleet.
//!
//! Implements both collaborator traits (`CloudProvider`, `ControlPlane`)
//! over in-memory state, with knobs for fault injection and scripted
//! events, plus a manually driven clock. Used by the engine tests and by
//! `fleetctl --fixture`.

pub mod clock;
pub mod fixture;
pub mod fleet;

pub use clock::ManualClock;
pub use fixture::FleetFixture;
pub use fleet::SimFleet;
