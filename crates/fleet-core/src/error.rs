//! Error types shared across runnerfleet crates.

use thiserror::Error;

/// Result type alias for fleet operations.
pub type FleetResult<T> = Result<T, FleetError>;

/// Errors that can occur while reconciling the fleet.
///
/// Only `InvalidInput` is fatal to an invocation. Deadline expiry is
/// reported by the flows as partial success, per-candidate action
/// failures are folded into batch outcomes, and empty candidate sets
/// just mean there is nothing to act on this tick.
#[derive(Debug, Error)]
pub enum FleetError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("deadline exceeded after {elapsed_secs}s (timeout {timeout_secs}s)")]
    Timeout {
        elapsed_secs: u64,
        timeout_secs: u64,
    },

    #[error("no eligible candidates")]
    NoEligibleCandidates,

    #[error("action failed for {id}: {reason}")]
    ActionFailed { id: String, reason: String },

    #[error("cloud provider error: {0}")]
    Cloud(String),

    #[error("control plane error: {0}")]
    ControlPlane(String),
}

impl FleetError {
    /// Whether the loop may absorb this error and continue the tick.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, FleetError::InvalidInput(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_invalid_input_is_fatal() {
        assert!(!FleetError::InvalidInput("label".to_string()).is_recoverable());
        assert!(FleetError::NoEligibleCandidates.is_recoverable());
        assert!(
            FleetError::Timeout {
                elapsed_secs: 61,
                timeout_secs: 60,
            }
            .is_recoverable()
        );
        assert!(FleetError::Cloud("throttled".to_string()).is_recoverable());
        assert!(FleetError::ControlPlane("rate limited".to_string()).is_recoverable());
    }

    #[test]
    fn messages_name_the_failing_piece() {
        let err = FleetError::ActionFailed {
            id: "i-1".to_string(),
            reason: "no capacity".to_string(),
        };
        assert_eq!(err.to_string(), "action failed for i-1: no capacity");

        let err = FleetError::Timeout {
            elapsed_secs: 61,
            timeout_secs: 60,
        };
        assert_eq!(err.to_string(), "deadline exceeded after 61s (timeout 60s)");
    }
}
