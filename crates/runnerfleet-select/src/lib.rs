//! runnerfleet-select — candidate ranking.
//!
//! Pure functions from the joined runner/instance view to ordered
//! candidate lists. The reconciliation loop consumes from the front.

pub mod selector;

pub use selector::{idle_instances, startable, stoppable};
