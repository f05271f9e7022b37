//! Plan introspector.
//!
//! `plan_fast` uses a non-executing `EXPLAIN (FORMAT JSON)` for candidate
//! screening; `plan_analyze` executes via `EXPLAIN (ANALYZE, FORMAT JSON)`
//! for before/after validation. Both retry up to 3 times on
//! `TransientDbError` with exponential backoff and share an LRU+TTL cache
//! keyed by [`Fingerprint`].

pub mod cache;
pub mod parse;

use std::{
    sync::{
        atomic::{
            AtomicU64,
            Ordering,
        },
        Arc,
    },
    time::Duration,
};

use cache::PlanCache;
use ix_config::PlannerConfig;
use ix_domain::{
    Fingerprint,
    PlanSummary,
};
use ix_errors::IndexPilotError;
use ix_gateway::{
    retry::with_db_retry,
    ConnectionPool,
};
use ix_metrics::register_histogram;
use tokio_postgres::types::ToSql;

register_histogram!(PLANNER_FAST_SECONDS, "Time spent obtaining a non-executing plan");
register_histogram!(PLANNER_ANALYZE_SECONDS, "Time spent obtaining an executed plan");

pub struct PlanIntrospector {
    pool: Arc<ConnectionPool>,
    cache: PlanCache,
    retry_attempts: u32,
    retry_backoff: Duration,
    use_live_plans: bool,
    successes: AtomicU64,
    failures: AtomicU64,
}

impl PlanIntrospector {
    pub fn new(pool: Arc<ConnectionPool>, config: &PlannerConfig) -> Self {
        Self {
            pool,
            cache: PlanCache::new(config.plan_cache_size, Duration::from_secs(config.plan_cache_ttl_secs)),
            retry_attempts: config.retry_attempts,
            retry_backoff: Duration::from_millis(config.retry_backoff_ms),
            use_live_plans: config.use_live_plans,
            successes: AtomicU64::new(0),
            failures: AtomicU64::new(0),
        }
    }

    pub fn success_rate(&self) -> f64 {
        let s = self.successes.load(Ordering::Relaxed) as f64;
        let f = self.failures.load(Ordering::Relaxed) as f64;
        if s + f == 0.0 {
            return 1.0;
        }
        s / (s + f)
    }

    pub fn cache_hit_rate(&self) -> f64 {
        PlanCache::hit_rate()
    }

    /// Non-executing plan, for cheap candidate screening. Cached by
    /// `fingerprint` when provided.
    pub async fn plan_fast(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
        fingerprint: Option<Fingerprint>,
    ) -> anyhow::Result<PlanSummary> {
        self.plan(sql, params, fingerprint, false).await
    }

    /// Executed plan, for before/after measurement. Never cached: an
    /// `ANALYZE` plan reflects one execution's actual timing, not a stable
    /// property of the query shape.
    pub async fn plan_analyze(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> anyhow::Result<PlanSummary> {
        self.plan(sql, params, None, true).await
    }

    async fn plan(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
        fingerprint: Option<Fingerprint>,
        analyze: bool,
    ) -> anyhow::Result<PlanSummary> {
        if !analyze && !self.use_live_plans {
            return Err(IndexPilotError::PlanUnavailable("live plans disabled by configuration".into()).into());
        }
        if !analyze {
            if let Some(fp) = fingerprint {
                if let Some(cached) = self.cache.get(&fp) {
                    return Ok(cached);
                }
            }
        }
        let histogram = if analyze { &PLANNER_ANALYZE_SECONDS } else { &PLANNER_FAST_SECONDS };
        let _timer = ix_metrics::Timer::new(histogram);
        let explain_sql = if analyze {
            format!("explain (analyze, format json) {sql}")
        } else {
            format!("explain (format json) {sql}")
        };
        let result = with_db_retry(self.retry_attempts, self.retry_backoff, || {
            let explain_sql = explain_sql.as_str();
            async move {
                let conn = self.pool.acquire().await?;
                let row = conn
                    .query_opt(explain_sql, params)
                    .await?
                    .ok_or_else(|| anyhow::anyhow!(IndexPilotError::PlanUnavailable("no plan row returned".into())))?;
                let raw: String = row.try_get(0).map_err(|e| {
                    anyhow::anyhow!(IndexPilotError::PlanUnavailable(format!("unexpected plan row shape: {e}")))
                })?;
                parse::parse_explain_json(&raw)
            }
        })
        .await;
        match result {
            Ok(summary) => {
                self.successes.fetch_add(1, Ordering::Relaxed);
                if !analyze {
                    if let Some(fp) = fingerprint {
                        self.cache.put(fp, summary.clone());
                    }
                }
                Ok(summary)
            },
            Err(e) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                Err(e)
            },
        }
    }
}

// `PlanIntrospector` requires a live `ConnectionPool` to construct, so its
// retry/cache wiring is exercised end-to-end in `ix-executor`'s and
// `ix-decision`'s integration tests against a fake gateway; `cache` and
// `parse` above cover the parts that don't need one.
