//! Invocation configuration.
//!
//! One `FleetConfig` is constructed at invocation start (from CLI args
//! and environment) and passed explicitly into every component. Core
//! logic never reads ambient/global state.

use std::time::Duration;

use crate::error::{FleetError, FleetResult};

/// Configuration for a single reconciliation invocation.
#[derive(Debug, Clone)]
pub struct FleetConfig {
    /// Cloud region the instance pool lives in. Carried for provider
    /// implementations; unused by the core algorithms.
    pub region: String,
    /// Control-plane auth token. Carried for provider implementations.
    pub auth_token: String,
    /// Pool label selecting which runners this invocation may touch.
    pub pool_label: String,
    /// Identifier of the invoking CI run; scopes the claim label.
    pub run_id: String,
    /// Wall-clock budget for one invocation.
    pub timeout: Duration,
    /// Number of runners to acquire (start) or release (stop). `None`
    /// on the stop path means "drain everything stoppable".
    pub target_count: Option<u32>,
    /// Maximum start/stop actions issued per loop iteration.
    pub block_size: u32,
    /// Backoff slept between ticks that made no progress.
    pub retry_backoff: Duration,
    /// Attempts when polling a stopped runner for idle confirmation.
    pub confirm_attempts: u32,
    /// Sleep between confirmation attempts.
    pub confirm_interval: Duration,
}

impl FleetConfig {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
    pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_secs(5);

    /// Build a config with defaults for everything but the identifying
    /// fields.
    pub fn new(
        region: impl Into<String>,
        auth_token: impl Into<String>,
        pool_label: impl Into<String>,
        run_id: impl Into<String>,
    ) -> Self {
        Self {
            region: region.into(),
            auth_token: auth_token.into(),
            pool_label: pool_label.into(),
            run_id: run_id.into(),
            timeout: Self::DEFAULT_TIMEOUT,
            target_count: None,
            block_size: 1,
            retry_backoff: Self::DEFAULT_RETRY_BACKOFF,
            confirm_attempts: 3,
            confirm_interval: Duration::from_secs(2),
        }
    }

    /// The run-scoped label this invocation claims on selected runners.
    pub fn run_label(&self) -> String {
        crate::labels::run_scoped_label(&self.run_id, &self.pool_label)
    }

    /// Validate required fields. An empty pool label or run id is fatal;
    /// everything downstream keys off them.
    pub fn validate(&self) -> FleetResult<()> {
        if self.pool_label.trim().is_empty() {
            return Err(FleetError::InvalidInput(
                "pool label is a required parameter".to_string(),
            ));
        }
        if self.run_id.trim().is_empty() {
            return Err(FleetError::InvalidInput(
                "run id is a required parameter".to_string(),
            ));
        }
        if self.block_size == 0 {
            return Err(FleetError::InvalidInput(
                "block size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = FleetConfig::new("us-east-1", "tok", "linux-x64", "987");
        assert_eq!(config.timeout, Duration::from_secs(60));
        assert_eq!(config.block_size, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn run_label_is_run_scoped() {
        let config = FleetConfig::new("us-east-1", "tok", "linux-x64", "987");
        assert_eq!(config.run_label(), "987-linux-x64");
    }

    #[test]
    fn empty_pool_label_is_fatal() {
        let config = FleetConfig::new("us-east-1", "tok", "  ", "987");
        assert!(matches!(
            config.validate(),
            Err(FleetError::InvalidInput(_))
        ));
    }

    #[test]
    fn zero_block_size_is_fatal() {
        let mut config = FleetConfig::new("us-east-1", "tok", "linux-x64", "987");
        config.block_size = 0;
        assert!(config.validate().is_err());
    }
}
