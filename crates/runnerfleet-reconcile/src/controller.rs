//! The reconciliation control loops.
//!
//! Each flow is a wall-clock-bounded loop over fresh snapshots: poll
//! both inventories, join, select candidates, act on at most one block,
//! re-poll. A block is a synchronization barrier — the loop awaits every
//! action in it before advancing the count. Transient faults (a failed
//! listing, a candidate that would not start, an empty candidate set)
//! are absorbed and retried until the deadline; only invalid input
//! aborts an invocation.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, info, warn};

use fleet_core::{
    Clock, FleetConfig, FleetError, FleetResult, Instance, InstanceId, LabelSet, RunnerId,
};
use runnerfleet_inventory::{CloudProvider, InstanceInventory, JoinedRunner, join_runners};
use runnerfleet_registry::{ControlPlane, RunnerRegistry};
use runnerfleet_select as select;

use crate::outcome::{BatchOutcome, CleanupReport, StartReport, StopReport};

/// Drives actual runner count toward the configured target.
pub struct Reconciler {
    config: FleetConfig,
    inventory: InstanceInventory,
    registry: RunnerRegistry,
    clock: Arc<dyn Clock>,
    rng: StdRng,
}

impl Reconciler {
    pub fn new(
        config: FleetConfig,
        cloud: Arc<dyn CloudProvider>,
        plane: Arc<dyn ControlPlane>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            inventory: InstanceInventory::new(cloud),
            registry: RunnerRegistry::new(plane),
            clock,
            rng: StdRng::from_entropy(),
        }
    }

    /// Seed the selection shuffle, for deterministic tests.
    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    // ── Start flow ─────────────────────────────────────────────────

    /// Acquire runners until the target count is met or the deadline
    /// expires. Partial progress at the deadline is a report, not an
    /// error.
    pub async fn start(&mut self) -> FleetResult<StartReport> {
        let entry = self.clock.now();
        self.start_from(entry, Vec::new()).await
    }

    /// Re-invocation entry point: an outer supervisor retrying after a
    /// fault passes the original entry time and the ids already
    /// acquired, so the deadline and the exclusion set carry over.
    pub async fn start_from(
        &mut self,
        entry: Duration,
        acquired: Vec<InstanceId>,
    ) -> FleetResult<StartReport> {
        self.config.validate()?;
        let target = self.config.target_count.ok_or_else(|| {
            FleetError::InvalidInput("target count is required for start".to_string())
        })?;
        let run_label = self.config.run_label();
        let deadline = entry + self.config.timeout;

        let mut acquired = acquired;
        let mut timed_out = false;

        while (acquired.len() as u32) < target {
            let now = self.clock.now();
            if now >= deadline {
                timed_out = true;
                break;
            }
            info!(
                acquired = acquired.len(),
                target,
                elapsed_secs = now.saturating_sub(entry).as_secs(),
                "start tick"
            );

            let need = target - acquired.len() as u32;
            let block = self.config.block_size.min(need) as usize;

            let exclude: HashSet<InstanceId> = acquired.iter().cloned().collect();
            let candidates = self.startable_candidates(&exclude).await;
            if candidates.is_empty() {
                debug!("no eligible start candidates this tick");
                self.clock.sleep(self.config.retry_backoff).await;
                continue;
            }

            let block = block.min(candidates.len());
            let outcome = self.start_block(&candidates[..block], &run_label).await;
            for (id, error) in &outcome.failures {
                warn!(instance = %id, error = %error, "start candidate failed");
            }
            let progressed = outcome.progressed();
            acquired.extend(outcome.succeeded);
            if !progressed {
                self.clock.sleep(self.config.retry_backoff).await;
            }
        }

        let report = StartReport {
            requested: target,
            label: run_label,
            acquired,
            timed_out,
            elapsed_secs: self.clock.now().saturating_sub(entry).as_secs(),
        };
        if report.timed_out {
            warn!(
                acquired = report.acquired.len(),
                target, "start deadline exceeded with partial progress"
            );
        } else {
            info!(acquired = report.acquired.len(), "start target met");
        }
        Ok(report)
    }

    /// Fresh snapshot of both inventories, joined and ranked.
    async fn startable_candidates(&mut self, exclude: &HashSet<InstanceId>) -> Vec<JoinedRunner> {
        let filter: LabelSet = [self.config.pool_label.as_str()].into_iter().collect();
        let runners = match self.registry.runners_with_labels(&filter).await {
            Ok(runners) => runners,
            Err(e) => {
                warn!(error = %e, "runner listing failed, skipping tick");
                return Vec::new();
            }
        };
        let instances = self.inventory.list_instances(&[]).await;
        let joined = join_runners(&runners, &instances);
        select::startable(&joined, exclude, &mut self.rng)
    }

    async fn start_block(&self, candidates: &[JoinedRunner], run_label: &str) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();
        for candidate in candidates {
            let Some(instance) = &candidate.instance else {
                continue;
            };
            match self.start_one(candidate.runner.id, instance, run_label).await {
                Ok(()) => {
                    info!(
                        instance = %instance.id,
                        runner = %candidate.runner.name,
                        "runner acquired"
                    );
                    outcome.succeeded.push(instance.id.clone());
                }
                Err(e) => outcome.failures.push((instance.id.clone(), e)),
            }
        }
        outcome
    }

    /// Start one instance and claim its runner with the run-scoped
    /// label. Either call failing leaves the candidate uncounted; it
    /// stays unexcluded and may be retried next tick.
    async fn start_one(
        &self,
        runner: RunnerId,
        instance: &Instance,
        run_label: &str,
    ) -> FleetResult<()> {
        let confirmed = self.inventory.start(std::slice::from_ref(&instance.id)).await?;
        if !confirmed.contains(&instance.id) {
            return Err(FleetError::ActionFailed {
                id: instance.id.clone(),
                reason: "provider did not confirm start".to_string(),
            });
        }
        self.registry.add_label(runner, run_label).await?;
        Ok(())
    }

    // ── Stop flow ──────────────────────────────────────────────────

    /// Release this run's claims and stop runners until the target is
    /// met (or, with no target, until nothing stoppable remains) or the
    /// deadline expires. Partial progress is never escalated to a hard
    /// failure; an over-provisioned idle fleet is the safe degraded
    /// state.
    pub async fn stop(&mut self) -> FleetResult<StopReport> {
        self.config.validate()?;
        let run_label = self.config.run_label();
        let entry = self.clock.now();
        let deadline = entry + self.config.timeout;
        let target = self.config.target_count;

        self.release_run_claims(&run_label).await;

        let mut stopped: Vec<InstanceId> = Vec::new();
        let mut timed_out = false;

        loop {
            if let Some(t) = target {
                if stopped.len() as u32 >= t {
                    break;
                }
            }
            let now = self.clock.now();
            if now >= deadline {
                timed_out = true;
                break;
            }

            // Freshly idled runners become stoppable in this same pass.
            if let Err(e) = self.registry.reconcile_expired_workflows().await {
                warn!(error = %e, "expired-workflow sweep failed this tick");
            }

            let block = match target {
                Some(t) => self.config.block_size.min(t - stopped.len() as u32) as usize,
                None => self.config.block_size as usize,
            };

            let candidates = self.stoppable_candidates(&stopped).await;
            if candidates.is_empty() {
                // Nothing stoppable by label; fall back to instances
                // idling under this run's label.
                let idle = self.idle_candidates(&run_label, &stopped).await;
                if idle.is_empty() {
                    if target.is_none() {
                        break; // Drained.
                    }
                    debug!("no eligible stop candidates this tick");
                    self.clock.sleep(self.config.retry_backoff).await;
                    continue;
                }

                let block = block.min(idle.len());
                let outcome = self.stop_instances_block(&idle[..block]).await;
                for (id, error) in &outcome.failures {
                    warn!(instance = %id, error = %error, "idle-instance stop failed");
                }
                let progressed = outcome.progressed();
                stopped.extend(outcome.succeeded);
                if !progressed {
                    self.clock.sleep(self.config.retry_backoff).await;
                }
                continue;
            }

            let block = block.min(candidates.len());
            let outcome = self.stop_block(&candidates[..block]).await;
            for (id, error) in &outcome.failures {
                warn!(instance = %id, error = %error, "stop candidate failed");
            }
            let progressed = outcome.progressed();
            stopped.extend(outcome.succeeded);
            if !progressed {
                self.clock.sleep(self.config.retry_backoff).await;
            }
        }

        let report = StopReport {
            requested: target,
            label: run_label,
            stopped,
            timed_out,
            elapsed_secs: self.clock.now().saturating_sub(entry).as_secs(),
        };
        if report.timed_out {
            warn!(
                stopped = report.stopped.len(),
                "stop deadline exceeded with partial progress"
            );
        } else {
            info!(stopped = report.stopped.len(), "stop complete");
        }
        Ok(report)
    }

    /// Sweep expired workflows, then stop everything currently
    /// stoppable in a single pass.
    pub async fn cleanup(&mut self) -> FleetResult<CleanupReport> {
        self.config.validate()?;

        if let Err(e) = self.registry.reconcile_expired_workflows().await {
            warn!(error = %e, "expired-workflow sweep failed");
        }

        let candidates = self.stoppable_candidates(&[]).await;
        let outcome = self.stop_block(&candidates).await;
        for (id, error) in &outcome.failures {
            warn!(instance = %id, error = %error, "cleanup stop failed");
        }

        info!(stopped = outcome.succeeded.len(), "cleanup complete");
        Ok(CleanupReport {
            stopped: outcome.succeeded,
        })
    }

    /// Turn this run's claims into stopping intent: runners carrying
    /// the run-scoped label get marked stopping, then the claim label is
    /// removed. Marking first means the runner is never visible without
    /// either label between the two mutations.
    async fn release_run_claims(&self, run_label: &str) {
        let filter: LabelSet = [run_label].into_iter().collect();
        let claimed = match self.registry.runners_with_labels(&filter).await {
            Ok(claimed) => claimed,
            Err(e) => {
                warn!(error = %e, "claimed-runner listing failed");
                return;
            }
        };

        for runner in claimed {
            if let Err(e) = self.registry.mark_stopping(runner.id).await {
                warn!(runner = %runner.name, error = %e, "failed to mark runner stopping");
                continue;
            }
            if let Err(e) = self.registry.release_run_label(runner.id, run_label).await {
                warn!(runner = %runner.name, error = %e, "failed to release run label");
            }
        }
    }

    async fn stoppable_candidates(&self, exclude: &[InstanceId]) -> Vec<JoinedRunner> {
        let runners = match self.registry.list_runners().await {
            Ok(runners) => runners,
            Err(e) => {
                warn!(error = %e, "runner listing failed, skipping tick");
                return Vec::new();
            }
        };
        let instances = self.inventory.list_instances(&[]).await;
        let joined = join_runners(&runners, &instances);
        select::stoppable(&joined)
            .into_iter()
            .filter(|j| {
                j.instance
                    .as_ref()
                    .is_some_and(|i| !exclude.contains(&i.id))
            })
            .collect()
    }

    /// Instances running under this run's label whose runner is not
    /// currently busy, joined back by address.
    async fn idle_candidates(&self, run_label: &str, exclude: &[InstanceId]) -> Vec<Instance> {
        let runners = match self.registry.list_runners().await {
            Ok(runners) => runners,
            Err(e) => {
                warn!(error = %e, "runner listing failed, skipping tick");
                return Vec::new();
            }
        };
        let busy: HashSet<String> = runners
            .iter()
            .filter(|r| !r.is_offline() && r.busy)
            .map(|r| r.derived_address())
            .collect();
        let instances = self.inventory.list_instances(&[]).await;
        select::idle_instances(&instances, run_label, &busy)
            .into_iter()
            .filter(|i| !exclude.contains(&i.id))
            .collect()
    }

    async fn stop_block(&self, candidates: &[JoinedRunner]) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();
        for candidate in candidates {
            let Some(instance) = &candidate.instance else {
                continue;
            };
            match self.stop_one(candidate.runner.id, instance).await {
                Ok(()) => {
                    info!(
                        instance = %instance.id,
                        runner = %candidate.runner.name,
                        "runner released"
                    );
                    outcome.succeeded.push(instance.id.clone());
                }
                Err(e) => outcome.failures.push((instance.id.clone(), e)),
            }
        }
        outcome
    }

    /// Stop one instance and confirm its runner actually let go before
    /// counting it.
    async fn stop_one(&self, runner: RunnerId, instance: &Instance) -> FleetResult<()> {
        let confirmed = self.inventory.stop(std::slice::from_ref(&instance.id)).await?;
        if !confirmed.contains(&instance.id) {
            return Err(FleetError::ActionFailed {
                id: instance.id.clone(),
                reason: "provider did not confirm stop".to_string(),
            });
        }
        if !self.confirm_runner_released(runner).await {
            // A job claimed the runner between selection and stop; the
            // stopping label stays so a later pass retries once idle.
            return Err(FleetError::ActionFailed {
                id: instance.id.clone(),
                reason: "runner reported busy after stop".to_string(),
            });
        }
        self.registry.mark_stopped(runner).await?;
        Ok(())
    }

    /// Poll the control plane until the runner reports offline or
    /// not-busy. Bounded attempts; false means "still busy".
    async fn confirm_runner_released(&self, id: RunnerId) -> bool {
        for attempt in 0..self.config.confirm_attempts {
            match self.registry.find_runner(id).await {
                // Unregistered entirely: nothing left to release.
                Ok(None) => return true,
                Ok(Some(r)) if r.is_offline() || !r.busy => return true,
                Ok(Some(_)) => {
                    debug!(runner = id, attempt, "runner still busy after stop")
                }
                Err(e) => warn!(runner = id, error = %e, "confirmation poll failed"),
            }
            self.clock.sleep(self.config.confirm_interval).await;
        }
        false
    }

    async fn stop_instances_block(&self, instances: &[Instance]) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();
        for instance in instances {
            match self.inventory.stop(std::slice::from_ref(&instance.id)).await {
                Ok(confirmed) if confirmed.contains(&instance.id) => {
                    info!(instance = %instance.id, "idle instance stopped");
                    outcome.succeeded.push(instance.id.clone());
                }
                Ok(_) => outcome.failures.push((
                    instance.id.clone(),
                    FleetError::ActionFailed {
                        id: instance.id.clone(),
                        reason: "provider did not confirm stop".to_string(),
                    },
                )),
                Err(e) => outcome.failures.push((instance.id.clone(), e)),
            }
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashSet;

    use fleet_core::{InstanceStatus, LabelSet, Runner, RunnerStatus};
    use runnerfleet_sim::{ManualClock, SimFleet};

    fn test_config(target: Option<u32>, block: u32, timeout_secs: u64) -> FleetConfig {
        let mut config = FleetConfig::new("us-east-1", "token", "linux-x64", "987");
        config.target_count = target;
        config.block_size = block;
        config.timeout = Duration::from_secs(timeout_secs);
        config
    }

    fn pair(
        n: u64,
        instance_status: InstanceStatus,
        runner_status: RunnerStatus,
        extra_labels: &[&str],
    ) -> (Instance, Runner) {
        let mut labels: LabelSet = ["linux-x64"].iter().copied().collect();
        for l in extra_labels {
            labels.insert(*l);
        }
        (
            Instance {
                id: format!("i-{n}"),
                private_ip: format!("10.0.0.{n}"),
                status: instance_status,
                instance_type: "m5.large".to_string(),
                labels: LabelSet::default(),
            },
            Runner {
                id: n,
                name: format!("ip-10-0-0-{n}-0"),
                status: runner_status,
                busy: false,
                labels,
            },
        )
    }

    fn reconciler(sim: &Arc<SimFleet>, config: FleetConfig) -> Reconciler {
        let clock = Arc::new(ManualClock::new());
        Reconciler::new(config, sim.clone(), sim.clone(), clock).with_rng_seed(42)
    }

    #[tokio::test]
    async fn start_acquires_across_blocks() {
        let sim = Arc::new(SimFleet::new());
        let (i1, r1) = pair(1, InstanceStatus::Stopped, RunnerStatus::Offline, &[]);
        sim.add_pair(i1, r1);
        let (i2, r2) = pair(2, InstanceStatus::Stopped, RunnerStatus::Offline, &[]);
        sim.add_pair(i2, r2);
        // A third pair only joins the fleet once the first block of two
        // has started.
        let (i3, r3) = pair(3, InstanceStatus::Stopped, RunnerStatus::Offline, &[]);
        sim.join_after_starts(2, i3, r3);

        let mut engine = reconciler(&sim, test_config(Some(3), 2, 60));
        let report = engine.start().await.unwrap();

        assert!(report.fulfilled());
        assert!(!report.timed_out);
        assert_eq!(report.acquired.len(), 3);
        // The exclusion set never admits a duplicate.
        let unique: HashSet<_> = report.acquired.iter().collect();
        assert_eq!(unique.len(), 3);

        for id in 1..=3 {
            let runner = sim.runner(id).unwrap();
            assert!(
                runner.labels.contains("987-linux-x64"),
                "runner {id} missing claim label"
            );
            assert_eq!(
                sim.instance(&format!("i-{id}")).unwrap().status,
                InstanceStatus::Running
            );
        }
    }

    #[tokio::test]
    async fn start_reports_partial_progress_at_deadline() {
        let sim = Arc::new(SimFleet::new());
        for n in 1..=2 {
            let (i, r) = pair(n, InstanceStatus::Stopped, RunnerStatus::Offline, &[]);
            sim.add_pair(i, r);
        }

        // Five requested, two will ever exist, one-second budget.
        let mut engine = reconciler(&sim, test_config(Some(5), 2, 1));
        let report = engine.start().await.unwrap();

        assert!(report.timed_out);
        assert!(!report.fulfilled());
        assert_eq!(report.acquired.len(), 2);
    }

    #[tokio::test]
    async fn start_retries_past_a_provider_fault() {
        let sim = Arc::new(SimFleet::new());
        let (i1, r1) = pair(1, InstanceStatus::Stopped, RunnerStatus::Offline, &[]);
        sim.add_pair(i1, r1);
        sim.fail_next_starts(1);

        let mut engine = reconciler(&sim, test_config(Some(1), 1, 60));
        let report = engine.start().await.unwrap();

        assert!(!report.timed_out);
        assert_eq!(report.acquired, vec!["i-1".to_string()]);
    }

    #[tokio::test]
    async fn start_never_counts_unconfirmed_instances() {
        let sim = Arc::new(SimFleet::new());
        let (i1, r1) = pair(1, InstanceStatus::Stopped, RunnerStatus::Offline, &[]);
        sim.add_pair(i1, r1);
        sim.never_confirm_start("i-1");

        let mut engine = reconciler(&sim, test_config(Some(1), 1, 1));
        let report = engine.start().await.unwrap();

        assert!(report.timed_out);
        assert!(report.acquired.is_empty());
        // The partially-handled candidate was never labelled.
        assert!(!sim.runner(1).unwrap().labels.contains("987-linux-x64"));
    }

    #[tokio::test]
    async fn start_from_excludes_carried_progress() {
        let sim = Arc::new(SimFleet::new());
        for n in 1..=2 {
            let (i, r) = pair(n, InstanceStatus::Stopped, RunnerStatus::Offline, &[]);
            sim.add_pair(i, r);
        }

        let mut engine = reconciler(&sim, test_config(Some(2), 2, 60));
        let report = engine
            .start_from(Duration::ZERO, vec!["i-1".to_string()])
            .await
            .unwrap();

        assert!(report.fulfilled());
        assert_eq!(report.acquired, vec!["i-1".to_string(), "i-2".to_string()]);
        // The carried id was excluded, not re-started.
        assert_eq!(sim.instance("i-1").unwrap().status, InstanceStatus::Stopped);
    }

    #[tokio::test]
    async fn start_without_target_is_invalid() {
        let sim = Arc::new(SimFleet::new());
        let mut engine = reconciler(&sim, test_config(None, 1, 60));
        assert!(matches!(
            engine.start().await,
            Err(FleetError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn empty_pool_label_is_fatal() {
        let sim = Arc::new(SimFleet::new());
        let mut config = test_config(Some(1), 1, 60);
        config.pool_label = String::new();
        let mut engine = reconciler(&sim, config);
        assert!(matches!(
            engine.start().await,
            Err(FleetError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn stop_drains_stoppable_runners() {
        let sim = Arc::new(SimFleet::new());
        let (i1, r1) = pair(1, InstanceStatus::Running, RunnerStatus::Online, &["stopping"]);
        sim.add_pair(i1, r1);

        let mut engine = reconciler(&sim, test_config(None, 1, 60));
        let report = engine.stop().await.unwrap();

        assert!(!report.timed_out);
        assert_eq!(report.stopped, vec!["i-1".to_string()]);
        let runner = sim.runner(1).unwrap();
        assert_eq!(runner.status, RunnerStatus::Offline);
        assert!(!runner.labels.contains("stopping"));
        assert_eq!(sim.instance("i-1").unwrap().status, InstanceStatus::Stopped);
    }

    #[tokio::test]
    async fn stop_sweeps_expired_workflows_in_same_pass() {
        let sim = Arc::new(SimFleet::new());
        // Run 100 has finished; run 200 is still active elsewhere.
        let (i1, r1) = pair(1, InstanceStatus::Running, RunnerStatus::Online, &["100-build"]);
        sim.add_pair(i1, r1);
        let (i2, r2) = pair(2, InstanceStatus::Running, RunnerStatus::Online, &["200-build"]);
        sim.add_pair(i2, r2);
        sim.set_active_runs(&[200]);

        let mut engine = reconciler(&sim, test_config(None, 2, 60));
        let report = engine.stop().await.unwrap();

        assert_eq!(report.stopped, vec!["i-1".to_string()]);
        // The in-flight runner kept its workflow label and its instance.
        let busy_runner = sim.runner(2).unwrap();
        assert!(busy_runner.labels.contains("200-build"));
        assert_eq!(sim.instance("i-2").unwrap().status, InstanceStatus::Running);
    }

    #[tokio::test]
    async fn stop_releases_this_runs_claims() {
        let sim = Arc::new(SimFleet::new());
        let (i1, r1) = pair(
            1,
            InstanceStatus::Running,
            RunnerStatus::Online,
            &["987-linux-x64"],
        );
        sim.add_pair(i1, r1);

        let mut engine = reconciler(&sim, test_config(None, 1, 60));
        let report = engine.stop().await.unwrap();

        assert_eq!(report.stopped, vec!["i-1".to_string()]);
        let runner = sim.runner(1).unwrap();
        assert!(!runner.labels.contains("987-linux-x64"));
        assert!(!runner.labels.contains("stopping"));
    }

    // A job claims the runner between selection and the stop
    // confirmation poll; it must not be counted.
    #[tokio::test]
    async fn stop_race_guard_discounts_reclaimed_runner() {
        let sim = Arc::new(SimFleet::new());
        let (i1, r1) = pair(1, InstanceStatus::Running, RunnerStatus::Online, &["stopping"]);
        sim.add_pair(i1, r1);
        sim.claim_on_stop("i-1");

        let mut engine = reconciler(&sim, test_config(Some(1), 1, 30));
        let report = engine.stop().await.unwrap();

        assert!(report.timed_out);
        assert!(report.stopped.is_empty());
        // Stopping intent survives for a later pass.
        assert!(sim.runner(1).unwrap().labels.contains("stopping"));
    }

    #[tokio::test]
    async fn stop_falls_back_to_idle_instances() {
        let sim = Arc::new(SimFleet::new());
        // An instance tagged with this run's label, running with no
        // registered runner behind it.
        sim.add_instance(Instance {
            id: "i-9".to_string(),
            private_ip: "10.0.0.9".to_string(),
            status: InstanceStatus::Running,
            instance_type: "m5.large".to_string(),
            labels: ["987-linux-x64"].iter().copied().collect(),
        });

        let mut engine = reconciler(&sim, test_config(Some(1), 1, 60));
        let report = engine.stop().await.unwrap();

        assert!(!report.timed_out);
        assert_eq!(report.stopped, vec!["i-9".to_string()]);
        assert_eq!(sim.instance("i-9").unwrap().status, InstanceStatus::Stopped);
    }

    #[tokio::test]
    async fn cleanup_stops_everything_stoppable() {
        let sim = Arc::new(SimFleet::new());
        let (i1, r1) = pair(1, InstanceStatus::Running, RunnerStatus::Online, &["stopping"]);
        sim.add_pair(i1, r1);
        let (i2, r2) = pair(2, InstanceStatus::Running, RunnerStatus::Online, &["stopping"]);
        sim.add_pair(i2, r2);
        // Still mid-workflow: stopping intent alone is not enough.
        let (i3, r3) = pair(
            3,
            InstanceStatus::Running,
            RunnerStatus::Online,
            &["stopping", "200-build"],
        );
        sim.add_pair(i3, r3);
        sim.set_active_runs(&[200]);

        let mut engine = reconciler(&sim, test_config(None, 1, 60));
        let report = engine.cleanup().await.unwrap();

        let stopped: HashSet<_> = report.stopped.iter().cloned().collect();
        assert_eq!(
            stopped,
            ["i-1".to_string(), "i-2".to_string()].into_iter().collect()
        );
        assert_eq!(sim.instance("i-3").unwrap().status, InstanceStatus::Running);
    }

    #[tokio::test]
    async fn cleanup_is_a_noop_when_nothing_is_stoppable() {
        let sim = Arc::new(SimFleet::new());
        let (i1, r1) = pair(1, InstanceStatus::Running, RunnerStatus::Online, &[]);
        sim.add_pair(i1, r1);

        let mut engine = reconciler(&sim, test_config(None, 1, 60));
        let report = engine.cleanup().await.unwrap();
        assert!(report.stopped.is_empty());
        assert_eq!(sim.instance("i-1").unwrap().status, InstanceStatus::Running);
    }
}
