//! Honeydew Worker demo
//!
//! Runs a worker against an in-process task source that hands out a fixed
//! number of simulated tasks. Some finish quickly, some fail and some
//! outlast the worker's patience. When the run ends the worker is put to
//! sleep and its counters are printed as JSON.

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::Parser;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use honeydew_worker::{
    NoTaskAvailable, Task, TaskSource, WorkerConfig, WorkerOptions, WorkerRegistry,
};

#[derive(Parser)]
#[command(name = "honeydew-worker")]
#[command(about = "Single-task polling worker demo", long_about = None)]
struct Cli {
    /// Heartbeat interval in milliseconds (overrides HONEYDEW_HEARTBEAT_INTERVAL_MS)
    #[arg(long)]
    heartbeat_interval_ms: Option<u64>,

    /// Patience in milliseconds (overrides HONEYDEW_PATIENCE_MS)
    #[arg(long)]
    patience_ms: Option<u64>,

    /// Number of simulated tasks the demo source hands out
    #[arg(long, env = "HONEYDEW_DEMO_TASKS", default_value_t = 8)]
    tasks: usize,

    /// How long to let the worker run before putting it to sleep
    #[arg(long, env = "HONEYDEW_RUN_FOR_MS", default_value_t = 3000)]
    run_for_ms: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "honeydew_worker=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let options = load_options(&cli)?;
    let config = WorkerConfig::from(options);
    info!(
        "Loaded configuration: heartbeat_interval={:?}, patience={:?}",
        config.heartbeat_interval, config.patience
    );

    let source: Arc<dyn TaskSource> = Arc::new(DemoTaskSource::new(cli.tasks, config.patience));

    let registry = WorkerRegistry::new();
    let worker = registry
        .get_instance(Some(source), options)
        .context("Failed to start worker")?;

    info!("Running for {} ms", cli.run_for_ms);
    tokio::time::sleep(Duration::from_millis(cli.run_for_ms)).await;

    worker.sleep();

    if let Some(report) = worker.last_cycle() {
        match report.error() {
            None => info!("Last cycle {} succeeded", report.id),
            Some(e) => info!("Last cycle {} ended with: {}", report.id, e),
        }
    }

    let stats = serde_json::to_string_pretty(&worker.stats()).context("Failed to encode stats")?;
    println!("{}", stats);

    Ok(())
}

/// Reads options from the environment, then applies command-line overrides
fn load_options(cli: &Cli) -> Result<WorkerOptions> {
    let mut options = WorkerOptions::from_env().context("Invalid worker environment")?;

    if let Some(ms) = cli.heartbeat_interval_ms {
        options.heartbeat_interval_ms = Some(ms);
    }
    if let Some(ms) = cli.patience_ms {
        options.patience_ms = Some(ms);
    }

    Ok(options)
}

/// Hands out a fixed number of simulated tasks, then reports none available
struct DemoTaskSource {
    total: usize,
    issued: AtomicUsize,
    patience: Duration,
}

impl DemoTaskSource {
    fn new(total: usize, patience: Duration) -> Self {
        Self {
            total,
            issued: AtomicUsize::new(0),
            patience,
        }
    }
}

#[async_trait]
impl TaskSource for DemoTaskSource {
    async fn find_task(&self) -> Result<Box<dyn Task>> {
        let n = self.issued.fetch_add(1, Ordering::SeqCst);
        if n >= self.total {
            return Err(NoTaskAvailable.into());
        }

        // Every fourth task fails, every fourth outlives the patience
        let kind = match n % 4 {
            2 => DemoKind::Fail,
            3 => DemoKind::Slow(self.patience * 2),
            _ => DemoKind::Quick(Duration::from_millis(20)),
        };

        debug!("Issuing demo task {} ({:?})", n, kind);
        Ok(Box::new(DemoTask { n, kind }))
    }
}

#[derive(Debug, Clone, Copy)]
enum DemoKind {
    Quick(Duration),
    Slow(Duration),
    Fail,
}

struct DemoTask {
    n: usize,
    kind: DemoKind,
}

#[async_trait]
impl Task for DemoTask {
    async fn execute(&self) -> Result<()> {
        match self.kind {
            DemoKind::Quick(work) | DemoKind::Slow(work) => {
                tokio::time::sleep(work).await;
                info!("Demo task {} done after {:?}", self.n, work);
                Ok(())
            }
            DemoKind::Fail => anyhow::bail!("demo task {} failed", self.n),
        }
    }
}
