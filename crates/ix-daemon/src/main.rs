//! `indexpilot`, the thin CLI surface over the supervisor.
//! Every subcommand is a few lines wiring the already-bootstrapped
//! collaborators together; none of them contain decision or safety logic of
//! their own — the entry point is treated as an external collaborator of
//! the long-lived supervisor it builds.

mod bypass;
mod pipeline;
mod supervisor;

use std::{
    path::PathBuf,
    str::FromStr,
    time::Duration,
};

use clap::{
    Parser,
    Subcommand,
};
use ix_config::Config;
use ix_errors::MainError;
use ix_gateway::ConnectionPool;
use supervisor::Supervisor;
use tracing::Level;

#[derive(Parser)]
#[command(name = "indexpilot", about = "Autonomous index-management daemon")]
struct Cli {
    /// Path to a TOML configuration file; `INDEXPILOT_*` env vars always
    /// override whatever it sets.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Bypasses the maintenance window for this invocation.
    #[arg(long, global = true)]
    emergency: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Initializes the catalog (and implicitly the lineage tables, which
    /// the gateway's migrations own) against the configured database.
    Bootstrap,
    /// Starts the supervisor: brings up every collaborator in dependency
    /// order and runs the tick loop until a termination signal drains it.
    Run,
    /// One-shot: runs the decision round and prints proposals without
    /// mutating anything.
    Analyze,
    /// Runs the decision round and executes every approved proposal.
    Apply,
    /// Forces rollback of a specific `IndexRecord` by name.
    Rollback {
        index: String,
    },
    /// Runs one lifecycle tier on demand.
    Lifecycle {
        #[command(subcommand)]
        tier: LifecycleTier,
    },
    /// Reports liveness/readiness and the safeguard counters.
    Verify,
}

#[derive(Subcommand)]
enum LifecycleTier {
    Weekly,
    Monthly,
    Tenant { id: String },
}

#[tokio::main]
async fn main() -> Result<(), MainError> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;
    let level = Level::from_str(&config.observability.log_level).unwrap_or(Level::INFO);
    let _logging_guard = ix_config::logging::init(level, config.observability.log_format);

    let result = run(cli, config).await;
    match result {
        Ok(()) => Ok(()),
        Err(e) => {
            let wrapped = MainError::from(e);
            std::process::exit(wrapped.exit_code());
        },
    }
}

async fn run(cli: Cli, config: Config) -> anyhow::Result<()> {
    match cli.command {
        Command::Bootstrap => {
            let pool = ConnectionPool::connect(&config.database).await?;
            pipeline::bootstrap_only(&pool, &config).await?;
            pool.shutdown();
        },
        Command::Run => run_supervisor(config).await?,
        Command::Analyze => {
            let supervisor = Supervisor::bootstrap(config).await?;
            let flusher = supervisor.spawn_flusher();
            let results = pipeline::run_round(&supervisor, false, cli.emergency).await?;
            print_round(&results);
            supervisor.shutdown();
            let _ = flusher.await;
        },
        Command::Apply => {
            let supervisor = Supervisor::bootstrap(config).await?;
            let flusher = supervisor.spawn_flusher();
            let results = pipeline::run_round(&supervisor, true, cli.emergency).await?;
            print_round(&results);
            supervisor.shutdown();
            let _ = flusher.await;
        },
        Command::Rollback { index } => {
            let supervisor = Supervisor::bootstrap(config).await?;
            let outcome = pipeline::force_rollback(&supervisor, &index).await?;
            println!("{outcome:?}");
            supervisor.shutdown();
        },
        Command::Lifecycle { tier } => {
            let supervisor = Supervisor::bootstrap(config).await?;
            let conn = supervisor.pool.acquire().await?;
            let live_records = ix_executor::record_store::list_active(&conn).await?;
            drop(conn);
            let cpu_pct = supervisor.cpu_sampler.sample_pct();
            let report = match tier {
                LifecycleTier::Weekly | LifecycleTier::Monthly => supervisor.lifecycle.run_heavy(&live_records, cpu_pct).await?,
                LifecycleTier::Tenant { id } => {
                    let tenant_records: Vec<_> = live_records.into_iter().filter(|r| r.scope.tenant.as_deref() == Some(id.as_str())).collect();
                    supervisor.lifecycle.run_standard(&tenant_records, cpu_pct).await?
                },
            };
            println!("{report:#?}");
            supervisor.shutdown();
        },
        Command::Verify => {
            let supervisor = Supervisor::bootstrap(config).await?;
            let timeout = Duration::from_millis(supervisor.config.observability.liveness_timeout_ms);
            let snapshot = supervisor.health.snapshot(&supervisor.counters, timeout).await;
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
            supervisor.shutdown();
        },
    }
    Ok(())
}

/// Runs the supervisor's tick loop: lifecycle tiers on their configured
/// intervals, a decision-round tick between them, until SIGINT/SIGTERM
/// requests a drain.
async fn run_supervisor(config: Config) -> anyhow::Result<()> {
    let tick_interval = Duration::from_secs(config.lifecycle.light_interval_secs.min(60));
    let supervisor = Supervisor::bootstrap(config).await?;
    let flusher = supervisor.spawn_flusher();

    let mut ticker = tokio::time::interval(tick_interval);
    let mut sigterm = signal_stream();
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if !supervisor.bypass.system_admits() {
                    tracing::debug!("supervisor: system bypass active, skipping tick");
                    continue;
                }
                if let Some(tier) = supervisor.scheduler.lock().due(std::time::Instant::now()) {
                    if let Err(e) = run_due_tier(&supervisor, tier).await {
                        tracing::warn!("lifecycle tick failed, will retry next tier: {e:#}");
                    }
                }
                if let Err(e) = pipeline::run_round(&supervisor, true, false).await {
                    tracing::warn!("decision round failed: {e:#}");
                }
                if let Err(e) = run_canary_tick(&supervisor).await {
                    tracing::warn!("canary tick failed: {e:#}");
                }
            }
            _ = sigterm.recv() => {
                tracing::info!("supervisor: termination signal received");
                break;
            }
        }
    }

    supervisor.request_shutdown();
    let _ = flusher.await;
    supervisor.shutdown();
    Ok(())
}

async fn run_due_tier(supervisor: &Supervisor, tier: ix_lifecycle::scheduler::Tier) -> anyhow::Result<()> {
    let conn = supervisor.pool.acquire().await?;
    let live_records = ix_executor::record_store::list_active(&conn).await?;
    drop(conn);
    let cpu_pct = supervisor.cpu_sampler.sample_pct();
    let report = match tier {
        ix_lifecycle::scheduler::Tier::Light => supervisor.lifecycle.run_light(&live_records).await?,
        ix_lifecycle::scheduler::Tier::Standard => supervisor.lifecycle.run_standard(&live_records, cpu_pct).await?,
        ix_lifecycle::scheduler::Tier::Heavy => supervisor.lifecycle.run_heavy(&live_records, cpu_pct).await?,
    };
    tracing::info!(?report, "lifecycle tick complete");
    Ok(())
}

/// Samples fresh traffic for every active index still under canary
/// evaluation (S5), records the outcome, and finalizes the promotion or
/// rollback once enough outcomes have accumulated. A no-op unless
/// `canary_enabled`; each tracked scope is only sampled with probability
/// `canary_pct / 100`, so this drives a fraction of real traffic through
/// the index rather than all of it.
async fn run_canary_tick(supervisor: &Supervisor) -> anyhow::Result<()> {
    if !supervisor.safety.canary_enabled() {
        return Ok(());
    }

    let conn = supervisor.pool.acquire().await?;
    let live_records = ix_executor::record_store::list_active(&conn).await?;
    drop(conn);

    for record in live_records {
        let scope_key = record.scope.key();
        if !supervisor.safety.canary.is_tracking(&scope_key) {
            continue;
        }
        if rand::random::<f64>() * 100.0 >= supervisor.safety.canary_pct() {
            continue;
        }
        let Some(baseline_cost) = supervisor.safety.canary.baseline_cost(&scope_key) else {
            continue;
        };
        let Some(column) = record.columns.first() else {
            continue;
        };
        let (table_ident, column_ident) = match (ix_gateway::identifier::Ident::new(&record.scope.table), ix_gateway::identifier::Ident::new(column)) {
            (Ok(t), Ok(c)) => (t, c),
            _ => continue,
        };
        let sample_sql = format!("select 1 from {table_ident} where {column_ident} is not null limit 1000");
        let after = match supervisor.planner.plan_analyze(&sample_sql, &[]).await {
            Ok(summary) => summary,
            Err(e) => {
                tracing::debug!(scope_key, "canary sample measurement failed: {e:#}");
                continue;
            },
        };

        let baseline = ix_domain::PlanSummary { estimated_cost: baseline_cost, ..Default::default() };
        let improved = baseline.improvement_over(&after) >= supervisor.config.decision.min_improvement_pct;

        if let Some(outcome) = supervisor.executor.record_canary_traffic(record, improved).await? {
            tracing::info!(scope_key, ?outcome, "canary verdict resolved");
        }
    }

    Ok(())
}

/// Wraps `ctrl_c` plus, on unix, SIGTERM, into one receiver the tick loop's
/// `select!` can await uniformly.
fn signal_stream() -> tokio::sync::mpsc::Receiver<()> {
    let (tx, rx) = tokio::sync::mpsc::channel(1);
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            let mut term = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()).expect("failed to install SIGTERM handler");
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {},
                _ = term.recv() => {},
            }
        }
        #[cfg(not(unix))]
        {
            let _ = tokio::signal::ctrl_c().await;
        }
        let _ = tx.send(()).await;
    });
    rx
}

fn print_round(results: &[pipeline::RoundResult]) {
    if results.is_empty() {
        println!("no candidates evaluated");
        return;
    }
    for result in results {
        println!(
            "{} {}.{}: {} — {}",
            if result.approved { "approved" } else { "rejected" },
            result.scope,
            result.field,
            result.explanation,
            result.execution.as_ref().map(|e| format!("{e:?}")).unwrap_or_default(),
        );
    }
}
