//! runnerfleet-inventory — the cloud side of the fleet.
//!
//! Wraps a `CloudProvider` (the external, already-authenticated cloud
//! client) behind `InstanceInventory`, which normalizes listings into
//! fresh per-tick snapshots and joins them to runners by private
//! address. Listing fails soft: a provider error yields an empty
//! inventory, since "no instances found" and "provider unreachable"
//! both mean "nothing to act on this tick".

pub mod inventory;
pub mod join;
pub mod provider;

pub use inventory::InstanceInventory;
pub use join::{JoinedRunner, join_runners};
pub use provider::CloudProvider;
