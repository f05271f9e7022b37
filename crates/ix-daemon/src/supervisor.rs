//! C12: process composition root. Builds
//! every collaborator in dependency order and holds the handles the CLI
//! subcommands and the main tick loop share.

use std::{
    sync::Arc,
    time::Duration,
};

use ix_catalog::Catalog;
use ix_config::Config;
use ix_decision::DecisionEngine;
use ix_executor::MutationExecutor;
use ix_gateway::ConnectionPool;
use ix_ingestion::Ingestion;
use ix_interceptor::QueryInterceptor;
use ix_lifecycle::{
    scheduler::TierScheduler,
    LifecycleMaintainer,
};
use ix_lineage::LineageStore;
use ix_metrics::SafeguardCounters;
use ix_observability::{
    cpu::CpuSampler,
    HealthState,
};
use ix_planner::PlanIntrospector;
use ix_safety::SafetyGates;
use parking_lot::Mutex;

use crate::bypass::BypassGates;

/// Every long-lived collaborator, wired in dependency order:
/// gateway (C1) before catalog (C2) before ingestion (C3) before
/// planner (C4) before decision/safety (C5/C6) before interceptor (C7)
/// before executor (C8) before lifecycle (C9) before lineage (C10, brought
/// up earlier here since executor and lifecycle both depend on it).
pub struct Supervisor {
    pub config: Config,
    pub pool: Arc<ConnectionPool>,
    pub catalog: Catalog,
    pub ingestion: Ingestion,
    pub planner: Arc<PlanIntrospector>,
    pub safety: Arc<SafetyGates>,
    pub lineage: Arc<LineageStore>,
    pub counters: Arc<SafeguardCounters>,
    pub executor: Arc<MutationExecutor>,
    pub lifecycle: LifecycleMaintainer,
    pub scheduler: Mutex<TierScheduler>,
    pub interceptor: Arc<QueryInterceptor>,
    pub bypass: BypassGates,
    pub health: Arc<HealthState>,
    pub decision: Mutex<DecisionEngine>,
    pub cpu_sampler: CpuSampler,
    stop: tokio::sync::watch::Sender<bool>,
    stop_rx: tokio::sync::watch::Receiver<bool>,
}

impl Supervisor {
    pub async fn bootstrap(config: Config) -> anyhow::Result<Self> {
        let pool = ConnectionPool::connect(&config.database).await?;

        let catalog = Catalog::empty();
        catalog.bootstrap(&config.catalog, Some(&pool), None).await?;

        let lineage = Arc::new(LineageStore::new(pool.clone()));
        let counters = Arc::new(SafeguardCounters::new());
        let health = Arc::new(HealthState::new(
            pool.clone(),
            Duration::from_secs(config.observability.degraded_window_secs),
            config.observability.degraded_failure_threshold,
        ));

        let ingestion = Ingestion::new(&config.ingestion);
        let planner = Arc::new(PlanIntrospector::new(pool.clone(), &config.planner));
        let safety = Arc::new(SafetyGates::new(&config.safety));

        let executor = Arc::new(MutationExecutor::new(
            pool.clone(),
            planner.clone(),
            safety.clone(),
            lineage.clone(),
            counters.clone(),
            config.executor.max_concurrent_ddl,
            config.decision.min_improvement_pct,
            config.executor.auto_rollback_enabled,
            config.executor.allow_blocking_ddl_fallback,
        ));

        let lifecycle = LifecycleMaintainer::new(pool.clone(), lineage.clone(), safety.clone(), config.lifecycle.clone());
        let scheduler = Mutex::new(TierScheduler::new(&config.lifecycle));

        let interceptor = Arc::new(QueryInterceptor::new(planner.clone(), config.interceptor.clone(), counters.clone()));

        let bypass = BypassGates::new(&config.bypass);
        let decision = Mutex::new(DecisionEngine::new(config.decision.clone()));

        let (stop, stop_rx) = tokio::sync::watch::channel(false);

        health.readiness().mark_bootstrap_complete();

        Ok(Self {
            config,
            pool,
            catalog,
            ingestion,
            planner,
            safety,
            lineage,
            counters,
            executor,
            lifecycle,
            scheduler,
            interceptor,
            bypass,
            health,
            decision,
            cpu_sampler: CpuSampler::new(),
            stop,
            stop_rx,
        })
    }

    /// Spawns the ingestion flusher and returns its join handle; the caller
    /// decides whether to also drive the tick loop in-process or leave that
    /// to a one-shot CLI subcommand.
    pub fn spawn_flusher(&self) -> tokio::task::JoinHandle<()> {
        self.ingestion.spawn_flusher(self.pool.clone(), self.config.ingestion.clone(), self.stop_rx.clone())
    }

    /// Signals every spawned task to drain and stop. Idempotent.
    pub fn request_shutdown(&self) {
        tracing::info!("supervisor: shutdown requested, draining");
        let _ = self.stop.send(true);
    }

    pub fn shutdown(&self) {
        self.request_shutdown();
        self.pool.shutdown();
    }
}
