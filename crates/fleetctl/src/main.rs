//! fleetctl — reconcile a self-hosted runner fleet.
//!
//! One invocation is one bounded reconciliation: start runners until a
//! target count is met, stop them again, or clean up after finished
//! workflows. All options arrive as CLI flags or environment variables
//! and are folded into a single `FleetConfig` up front.
//!
//! The network clients are supplied by the environment; this binary
//! drives the built-in simulator against a fleet snapshot
//! (`--fixture`). Real deployments implement `CloudProvider` and
//! `ControlPlane` against their own SDKs and reuse the engine crates
//! directly.
//!
//! # Usage
//!
//! ```text
//! fleetctl start --label linux-x64 --count 3 --block 2 \
//!     --run-id 987 --fixture fleet.json
//! ```

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use rand::SeedableRng;
use tracing::{info, warn};

use fleet_core::{FleetConfig, FleetError, SystemClock};
use runnerfleet_inventory::join_runners;
use runnerfleet_reconcile::Reconciler;
use runnerfleet_registry::ControlPlane;
use runnerfleet_select as select;
use runnerfleet_sim::{FleetFixture, SimFleet};

#[derive(Parser)]
#[command(name = "fleetctl", about = "Self-hosted runner fleet reconciler")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct CommonArgs {
    /// Cloud region the instance pool lives in.
    #[arg(long, default_value = "us-east-1")]
    region: String,

    /// Control-plane auth token.
    #[arg(long, env = "FLEET_TOKEN", default_value = "", hide_env_values = true)]
    token: String,

    /// Pool label selecting which runners this invocation may touch.
    #[arg(long)]
    label: String,

    /// Identifier of the invoking CI run; scopes the claim label.
    #[arg(long, env = "FLEET_RUN_ID")]
    run_id: String,

    /// Wall-clock budget in seconds.
    #[arg(long, default_value = "60")]
    timeout: u64,

    /// Maximum start/stop actions per loop iteration.
    #[arg(long, default_value = "1")]
    block: u32,

    /// Fleet snapshot JSON driving the built-in simulator.
    #[arg(long)]
    fixture: PathBuf,
}

#[derive(Subcommand)]
enum Command {
    /// Start runners until the target count is met.
    Start {
        #[command(flatten)]
        common: CommonArgs,

        /// Number of runners to acquire.
        #[arg(long)]
        count: u32,
    },

    /// Release this run's runners and stop them once idle.
    Stop {
        #[command(flatten)]
        common: CommonArgs,

        /// Number of runners to stop. Omit to drain everything
        /// stoppable.
        #[arg(long)]
        count: Option<u32>,
    },

    /// Sweep finished workflows and stop every idle stopping runner.
    Cleanup {
        #[command(flatten)]
        common: CommonArgs,
    },

    /// Validate config and report candidate counts without acting.
    Test {
        #[command(flatten)]
        common: CommonArgs,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,fleetctl=debug,runnerfleet=debug".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Start { common, count } => run_start(common, count).await,
        Command::Stop { common, count } => run_stop(common, count).await,
        Command::Cleanup { common } => run_cleanup(common).await,
        Command::Test { common } => run_test(common).await,
    }
}

fn build_config(common: &CommonArgs, count: Option<u32>) -> anyhow::Result<FleetConfig> {
    let mut config = FleetConfig::new(
        &common.region,
        &common.token,
        &common.label,
        &common.run_id,
    );
    config.timeout = Duration::from_secs(common.timeout);
    config.block_size = common.block;
    config.target_count = count;
    // Validate before touching any provider.
    config.validate()?;
    Ok(config)
}

fn load_fleet(common: &CommonArgs) -> anyhow::Result<Arc<SimFleet>> {
    let json = std::fs::read_to_string(&common.fixture)?;
    let fleet = FleetFixture::from_json(&json)?.into_fleet();
    Ok(Arc::new(fleet))
}

fn build_engine(common: &CommonArgs, count: Option<u32>) -> anyhow::Result<Reconciler> {
    let config = build_config(common, count)?;
    let fleet = load_fleet(common)?;
    let clock = Arc::new(SystemClock::new());
    Ok(Reconciler::new(config, fleet.clone(), fleet, clock))
}

async fn run_start(common: CommonArgs, count: u32) -> anyhow::Result<()> {
    let mut engine = build_engine(&common, Some(count))?;
    let report = engine.start().await?;

    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "action": "start",
            "requested": report.requested,
            "started": report.acquired.len(),
            "label": report.label,
            "instances": report.acquired,
            "timed_out": report.timed_out,
        }))?
    );

    if report.timed_out && report.acquired.is_empty() {
        return Err(FleetError::Timeout {
            elapsed_secs: report.elapsed_secs,
            timeout_secs: common.timeout,
        })
        .with_context(|| {
            format!(
                "was not able to start any of the {} required runners",
                report.requested
            )
        });
    }
    if report.timed_out {
        warn!(
            started = report.acquired.len(),
            requested = report.requested,
            "only started part of the requested runners"
        );
    } else {
        info!(started = report.acquired.len(), "start complete");
    }
    Ok(())
}

async fn run_stop(common: CommonArgs, count: Option<u32>) -> anyhow::Result<()> {
    let mut engine = build_engine(&common, count)?;
    let report = engine.stop().await?;

    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "action": "stop",
            "stopped": report.stopped.len(),
            "label": report.label,
            "instances": report.stopped,
            "timed_out": report.timed_out,
        }))?
    );

    // Partial progress is a safe degraded state, never a hard failure.
    if report.timed_out {
        warn!(
            stopped = report.stopped.len(),
            "stop deadline exceeded with partial progress"
        );
    } else {
        info!(stopped = report.stopped.len(), "stop complete");
    }
    Ok(())
}

async fn run_cleanup(common: CommonArgs) -> anyhow::Result<()> {
    let mut engine = build_engine(&common, None)?;
    let report = engine.cleanup().await?;

    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "action": "cleanup",
            "stopped": report.stopped.len(),
            "instances": report.stopped,
        }))?
    );

    info!(stopped = report.stopped.len(), "cleanup complete");
    Ok(())
}

/// Dry run: load the snapshot, join the two inventories, and report
/// candidate counts without issuing a single action.
async fn run_test(common: CommonArgs) -> anyhow::Result<()> {
    let config = build_config(&common, None)?;
    let fleet = load_fleet(&common)?;

    let runners = fleet.list_runners().await?;
    let inventory = runnerfleet_inventory::InstanceInventory::new(fleet.clone());
    let instances = inventory.list_instances(&[]).await;
    let running = inventory.running_with_label(&config.pool_label, &[]).await;
    let stopped = inventory.stopped_with_label(&config.pool_label, &[]).await;
    let joined = join_runners(&runners, &instances);

    let pool: Vec<_> = joined
        .iter()
        .filter(|j| j.runner.labels.contains(&config.pool_label))
        .cloned()
        .collect();
    let mut rng = rand::rngs::StdRng::from_entropy();
    let startable = select::startable(&pool, &HashSet::new(), &mut rng);
    let stoppable = select::stoppable(&joined);

    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "action": "test",
            "label": config.pool_label,
            "runners": runners.len(),
            "instances": instances.len(),
            "running": running.len(),
            "stopped": stopped.len(),
            "joined": joined.iter().filter(|j| j.is_actionable()).count(),
            "startable": startable.len(),
            "stoppable": stoppable.len(),
        }))?
    );

    info!("test complete, no actions issued");
    Ok(())
}
