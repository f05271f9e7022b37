//! Query interceptor.
//!
//! Sits in front of the query path and classifies a statement before it
//! reaches the database: fast-pathed if its fingerprint is on the learned
//! allow-list, rejected if on the block-list, otherwise scored from a
//! non-executing plan plus a handful of structural signals (`risk`) and
//! optionally an ML model (`scorer`). A feedback loop closes the learning
//! cycle: the caller reports back whether the query actually ran slow
//! (`record_outcome`), which reinforces the list on the side that guessed
//! wrong. Interceptor decisions never touch lineage — they are counted only
//! in `ix-metrics::SafeguardCounters` under the `"interceptor"` gate.

pub mod lists;
pub mod risk;
pub mod scorer;

use std::{
    collections::HashMap,
    sync::Arc,
};

use ix_config::InterceptorConfig;
use ix_domain::Fingerprint;
use ix_errors::IndexPilotError;
use ix_metrics::SafeguardCounters;
use ix_planner::PlanIntrospector;
use lists::LearnedList;
use parking_lot::{
    Mutex,
    RwLock,
};
use scorer::RiskScorer;
use tokio_postgres::types::ToSql;

const GATE: &str = "interceptor";

/// The outcome of [`QueryInterceptor::check`]. `admitted = false` only ever
/// happens when `InterceptorConfig::block_on_match` is set; otherwise a
/// would-have-blocked verdict is still admitted (shadow mode) with `reason`
/// set so the caller can log it.
#[derive(Debug, Clone, PartialEq)]
pub struct InterceptDecision {
    pub admitted: bool,
    pub risk_score: f64,
    pub reason: Option<String>,
}

impl InterceptDecision {
    fn allow_listed() -> Self {
        Self {
            admitted: true,
            risk_score: 0.0,
            reason: None,
        }
    }

    fn clean(risk_score: f64) -> Self {
        Self {
            admitted: true,
            risk_score,
            reason: None,
        }
    }
}

pub struct QueryInterceptor {
    planner: Arc<PlanIntrospector>,
    config: InterceptorConfig,
    allow_list: Mutex<LearnedList>,
    block_list: Mutex<LearnedList>,
    scorer: RwLock<RiskScorer>,
    counters: Arc<SafeguardCounters>,
}

impl QueryInterceptor {
    pub fn new(planner: Arc<PlanIntrospector>, config: InterceptorConfig, counters: Arc<SafeguardCounters>) -> Self {
        Self {
            allow_list: Mutex::new(LearnedList::new(config.learned_list_capacity)),
            block_list: Mutex::new(LearnedList::new(config.learned_list_capacity)),
            scorer: RwLock::new(RiskScorer::default()),
            planner,
            config,
            counters,
        }
    }

    pub fn config(&self) -> &InterceptorConfig {
        &self.config
    }

    /// The five-step allow/block/risk-score algorithm. `row_counts` is a
    /// live-row estimate per table (`pg_stat_user_tables`), kept by the
    /// caller so this never has to query the database itself beyond
    /// `planFast`.
    pub async fn check(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
        fingerprint: Fingerprint,
        row_counts: &HashMap<String, u64>,
    ) -> anyhow::Result<InterceptDecision> {
        if !self.config.enabled {
            return Ok(InterceptDecision::allow_listed());
        }

        if self.allow_list.lock().contains(&fingerprint) {
            self.counters.record_admit(GATE);
            return Ok(InterceptDecision::allow_listed());
        }

        if self.block_list.lock().contains(&fingerprint) {
            self.counters.record_deny(GATE);
            return self.reject_or_shadow(1.0, "block-list match".to_string());
        }

        let plan = match self.planner.plan_fast(sql, params, Some(fingerprint)).await {
            Ok(plan) => plan,
            Err(e) => {
                tracing::warn!(error = %e, "interceptor: plan unavailable, admitting by default");
                self.counters.record_admit(GATE);
                return Ok(InterceptDecision::clean(0.0));
            },
        };

        let signals = risk::extract(sql, &plan, row_counts, self.config.large_table_row_threshold);
        let heuristic = risk::heuristic_score(&signals, self.config.cost_ceiling);
        let risk_score = if self.config.ml_scorer_enabled {
            let ml = self.scorer.read().score(&signals, self.config.cost_ceiling);
            (heuristic + ml) / 2.0
        } else {
            heuristic
        };

        let over_cost_ceiling = self.config.cost_ceiling > 0.0 && plan.estimated_cost >= self.config.cost_ceiling;
        if risk_score >= self.config.risk_score_block_threshold || over_cost_ceiling {
            self.counters.record_deny(GATE);
            return self.reject_or_shadow(risk_score, format!("risk score {risk_score:.2} exceeded threshold"));
        }

        self.counters.record_admit(GATE);
        Ok(InterceptDecision::clean(risk_score))
    }

    fn reject_or_shadow(&self, risk_score: f64, reason: String) -> anyhow::Result<InterceptDecision> {
        if self.config.block_on_match {
            Err(IndexPilotError::QueryBlocked(reason).into())
        } else {
            Ok(InterceptDecision {
                admitted: true,
                risk_score,
                reason: Some(reason),
            })
        }
    }

    /// Closes the feedback loop: `was_slow` is the caller's observation of
    /// whether the query actually ran slow once executed. Reinforces
    /// whichever learned list the interceptor's verdict should have picked,
    /// and — if the ML scorer is enabled — folds the outcome into it. Never
    /// writes to lineage; the only durable trace is the list membership and
    /// the scorer's weights.
    pub fn record_outcome(&self, fingerprint: Fingerprint, sql: &str, plan_cost: f64, signals: Option<risk::RiskSignals>, was_slow: bool) {
        if was_slow {
            self.block_list.lock().reinforce(fingerprint);
        } else {
            self.allow_list.lock().reinforce(fingerprint);
        }
        if self.config.ml_scorer_enabled {
            if let Some(signals) = signals {
                self.scorer
                    .write()
                    .train_one_epoch(&[(signals, self.config.cost_ceiling, was_slow)]);
            }
        }
        tracing::debug!(sql_len = sql.len(), plan_cost, was_slow, "interceptor: recorded outcome");
    }

    pub fn allow_list_len(&self) -> usize {
        self.allow_list.lock().len()
    }

    pub fn block_list_len(&self) -> usize {
        self.block_list.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use ix_config::{
        DatabaseConfig,
        InterceptorConfig,
        PlannerConfig,
    };
    use ix_gateway::ConnectionPool;

    use super::*;

    // `ConnectionPool::connect` only builds the pg config and spawns the
    // idle reaper; it never dials the database until `acquire` is called.
    // Every test below either starts with `enabled = false` or pre-seeds a
    // list, so `check` never reaches the planner and the pool is never
    // dialed.
    async fn interceptor(config: InterceptorConfig) -> QueryInterceptor {
        let pool = ConnectionPool::connect(&DatabaseConfig::default()).await.unwrap();
        let planner = Arc::new(PlanIntrospector::new(pool, &PlannerConfig::default()));
        QueryInterceptor::new(planner, config, Arc::new(SafeguardCounters::new()))
    }

    fn fp(byte: u8) -> Fingerprint {
        Fingerprint([byte; 16])
    }

    #[tokio::test]
    async fn a_disabled_interceptor_admits_everything_without_counting() {
        let i = interceptor(InterceptorConfig {
            enabled: false,
            ..Default::default()
        })
        .await;
        let decision = i.check("select 1", &[], fp(1), &HashMap::new()).await.unwrap();
        assert!(decision.admitted);
        assert_eq!(i.counters.snapshot(GATE), (0, 0));
    }

    #[tokio::test]
    async fn an_allow_listed_fingerprint_is_admitted_without_planning() {
        let i = interceptor(InterceptorConfig {
            enabled: true,
            ..Default::default()
        })
        .await;
        i.allow_list.lock().reinforce(fp(1));
        let decision = i.check("select 1", &[], fp(1), &HashMap::new()).await.unwrap();
        assert!(decision.admitted);
        assert_eq!(decision.risk_score, 0.0);
        assert_eq!(i.counters.snapshot(GATE), (1, 0));
    }

    #[tokio::test]
    async fn a_block_listed_fingerprint_is_rejected_when_block_on_match_is_set() {
        let i = interceptor(InterceptorConfig {
            enabled: true,
            block_on_match: true,
            ..Default::default()
        })
        .await;
        i.block_list.lock().reinforce(fp(1));
        let err = i.check("select 1", &[], fp(1), &HashMap::new()).await.unwrap_err();
        assert!(err.downcast_ref::<IndexPilotError>().unwrap().is_control_flow());
        assert_eq!(i.counters.snapshot(GATE), (0, 1));
    }

    #[tokio::test]
    async fn a_block_listed_fingerprint_is_shadow_admitted_without_block_on_match() {
        let i = interceptor(InterceptorConfig {
            enabled: true,
            block_on_match: false,
            ..Default::default()
        })
        .await;
        i.block_list.lock().reinforce(fp(1));
        let decision = i.check("select 1", &[], fp(1), &HashMap::new()).await.unwrap();
        assert!(decision.admitted);
        assert!(decision.reason.is_some());
        assert_eq!(i.counters.snapshot(GATE), (0, 1));
    }

    #[tokio::test]
    async fn recording_a_slow_outcome_reinforces_the_block_list() {
        let i = interceptor(InterceptorConfig::default()).await;
        i.record_outcome(fp(1), "select 1", 10.0, None, true);
        assert_eq!(i.block_list_len(), 1);
        assert_eq!(i.allow_list_len(), 0);
    }

    #[tokio::test]
    async fn recording_a_fast_outcome_reinforces_the_allow_list() {
        let i = interceptor(InterceptorConfig::default()).await;
        i.record_outcome(fp(1), "select 1", 10.0, None, false);
        assert_eq!(i.allow_list_len(), 1);
        assert_eq!(i.block_list_len(), 0);
    }
}
