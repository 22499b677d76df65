//! runnerfleet-reconcile — the reconciliation loops.
//!
//! One bounded attempt per invocation to move the actual number of
//! available runners toward a target. All state is reconstructed from
//! the two remote inventories every tick; labels held by the control
//! plane are the only state that survives across invocations, which
//! makes a crashed or re-invoked controller safe to restart.

pub mod controller;
pub mod outcome;

pub use controller::Reconciler;
pub use outcome::{BatchOutcome, CleanupReport, StartReport, StopReport};
