//! Typed configuration for the indexpilot daemon.
//!
//! A single typed, `serde`-derived record in place of dynamic configuration
//! through string/number dictionaries. Unknown keys at any level are a hard
//! `ConfigError` at startup
//! (`#[serde(deny_unknown_fields)]` on every section).
//!
//! Load order (later layers win): compiled-in defaults → optional TOML file
//! → `INDEXPILOT_SECTION__FIELD` environment variables → CLI flags applied
//! by the caller (`ix-daemon`).

pub mod env;
pub mod logging;

use std::path::Path;

use ix_errors::IndexPilotError;
use serde::{
    Deserialize,
    Serialize,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum TransportEncryption {
    Disable,
    #[default]
    Prefer,
    Require,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub name: String,
    pub user: String,
    /// Never logged or included in `Debug` output; see the manual `Debug`
    /// impl on [`Config`].
    pub password: String,
    pub transport_encryption: TransportEncryption,
    pub pool_min: usize,
    pub pool_max: usize,
    pub connect_timeout_secs: u64,
    pub statement_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 5432,
            name: "postgres".to_owned(),
            user: "postgres".to_owned(),
            password: String::new(),
            transport_encryption: TransportEncryption::default(),
            pool_min: 1,
            pool_max: 10,
            connect_timeout_secs: 10,
            statement_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum BootstrapSource {
    #[default]
    IntrospectLive,
    LoadFile,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct CatalogConfig {
    pub bootstrap_source: BootstrapSource,
    pub tenant_column: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            bootstrap_source: BootstrapSource::default(),
            tenant_column: "tenant_id".to_owned(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct IngestionConfig {
    pub buffer_size: usize,
    pub flush_interval_ms: u64,
    pub flush_batch_size: usize,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            buffer_size: 65_536,
            flush_interval_ms: 1_000,
            flush_batch_size: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct PlannerConfig {
    pub use_live_plans: bool,
    pub plan_cache_size: usize,
    pub plan_cache_ttl_secs: u64,
    pub retry_attempts: u32,
    pub retry_backoff_ms: u64,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            use_live_plans: true,
            plan_cache_size: 100,
            plan_cache_ttl_secs: 3_600,
            retry_attempts: 3,
            retry_backoff_ms: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct SizeBucketThresholds {
    pub small_max_rows: u64,
    pub medium_max_rows: u64,
    // large is anything above medium_max_rows.
}

impl Default for SizeBucketThresholds {
    fn default() -> Self {
        Self {
            small_max_rows: 10_000,
            medium_max_rows: 1_000_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct DecisionWeights {
    pub heuristic: f64,
    pub ml_utility: f64,
    pub classifier: f64,
    pub constraint: f64,
}

impl Default for DecisionWeights {
    fn default() -> Self {
        Self {
            heuristic: 0.4,
            ml_utility: 0.2,
            classifier: 0.1,
            constraint: 0.3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct ConstraintCaps {
    pub per_tenant_storage_bytes: u64,
    pub per_table_index_count: u32,
    pub max_write_overhead_pct: f64,
}

impl Default for ConstraintCaps {
    fn default() -> Self {
        Self {
            per_tenant_storage_bytes: 50 * 1024 * 1024 * 1024,
            per_table_index_count: 12,
            max_write_overhead_pct: 15.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct DecisionConfig {
    pub size_buckets: SizeBucketThresholds,
    pub small_workload_threshold: u64,
    pub small_workload_reduction_factor: f64,
    pub small_workload_max_patterns: usize,
    pub min_improvement_pct: f64,
    pub weights: DecisionWeights,
    pub constraint_caps: ConstraintCaps,
    pub test_mode: bool,
    pub test_mode_threshold_reduction: f64,
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self {
            size_buckets: SizeBucketThresholds::default(),
            small_workload_threshold: 5_000,
            small_workload_reduction_factor: 0.2,
            small_workload_max_patterns: 50,
            min_improvement_pct: 0.2,
            weights: DecisionWeights::default(),
            constraint_caps: ConstraintCaps::default(),
            test_mode: false,
            test_mode_threshold_reduction: 1.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct ExecutorConfig {
    /// Bounds `ix-executor`'s `DdlConcurrencyLimiter`.
    pub max_concurrent_ddl: usize,
    /// Drop a just-built index whose measured improvement misses the floor.
    pub auto_rollback_enabled: bool,
    /// Fall back to a blocking `CREATE INDEX` (no `CONCURRENTLY`) when the
    /// concurrent build fails and the maintenance window currently admits
    /// blocking DDL.
    pub allow_blocking_ddl_fallback: bool,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_concurrent_ddl: 2,
            auto_rollback_enabled: true,
            allow_blocking_ddl_fallback: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct MaintenanceWindow {
    /// Hours of day, 0-23, during which non-emergency gates admit.
    pub hours: Vec<u8>,
    /// Days of week, 0 (Sunday) - 6 (Saturday).
    pub days: Vec<u8>,
}

impl Default for MaintenanceWindow {
    fn default() -> Self {
        Self {
            hours: (0..24).collect(),
            days: (0..7).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct SafetyConfig {
    pub maintenance_window: MaintenanceWindow,
    pub rate_limit_tokens: u32,
    pub rate_limit_refill_per_sec: f64,
    pub rate_limit_adaptive: bool,
    pub cpu_threshold_pct: f64,
    pub cpu_cooldown_secs: u64,
    pub write_latency_p95_ceiling_ms: f64,
    pub circuit_breaker_failure_threshold: u32,
    pub circuit_breaker_cooldown_secs: u64,
    pub lock_ttl_secs: u64,
    pub canary_enabled: bool,
    pub canary_pct: f64,
    pub canary_success_threshold: f64,
    pub canary_min_samples: u32,
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            maintenance_window: MaintenanceWindow::default(),
            rate_limit_tokens: 10,
            rate_limit_refill_per_sec: 1.0,
            rate_limit_adaptive: false,
            cpu_threshold_pct: 80.0,
            cpu_cooldown_secs: 60,
            write_latency_p95_ceiling_ms: 250.0,
            circuit_breaker_failure_threshold: 3,
            circuit_breaker_cooldown_secs: 300,
            lock_ttl_secs: 600,
            canary_enabled: false,
            canary_pct: 10.0,
            canary_success_threshold: 0.9,
            canary_min_samples: 50,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct LifecycleConfig {
    pub light_interval_secs: u64,
    pub standard_interval_secs: u64,
    pub heavy_interval_secs: u64,
    pub auto_reindex: bool,
    pub bloat_threshold_pct: f64,
    pub bloat_min_size_bytes: u64,
    pub unused_index_horizon_days: u32,
    pub consolidation_enabled: bool,
    pub covering_index_analysis_enabled: bool,
    pub auto_cleanup: bool,
    pub stats_staleness_ttl_hours: u64,
    /// Wall-clock ceiling for task 14 (optional ML retraining); retraining
    /// stops mid-epoch rather than let a slow tick delay the next one.
    pub retrain_time_budget_ms: u64,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            light_interval_secs: 3_600,
            standard_interval_secs: 86_400,
            heavy_interval_secs: 604_800,
            auto_reindex: false,
            bloat_threshold_pct: 30.0,
            bloat_min_size_bytes: 64 * 1024 * 1024,
            unused_index_horizon_days: 30,
            consolidation_enabled: true,
            covering_index_analysis_enabled: true,
            auto_cleanup: false,
            stats_staleness_ttl_hours: 24,
            retrain_time_budget_ms: 5_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct InterceptorConfig {
    pub enabled: bool,
    pub block_on_match: bool,
    pub cost_ceiling: f64,
    pub risk_score_block_threshold: f64,
    pub ml_scorer_enabled: bool,
    /// Row count above which a sequential scan or missing `WHERE` is
    /// considered risky rather than incidental.
    pub large_table_row_threshold: u64,
    /// Bounded size of the learned allow-list and block-list, each.
    pub learned_list_capacity: usize,
}

impl Default for InterceptorConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            block_on_match: false,
            cost_ceiling: 100_000.0,
            risk_score_block_threshold: 0.8,
            ml_scorer_enabled: false,
            large_table_row_threshold: 100_000,
            learned_list_capacity: 10_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct BypassScope {
    pub disabled: bool,
    pub auto_recover_secs: Option<u64>,
}

impl Default for BypassScope {
    fn default() -> Self {
        Self {
            disabled: false,
            auto_recover_secs: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct BypassConfig {
    pub feature: BypassScope,
    pub module: BypassScope,
    pub system: BypassScope,
    pub startup: BypassScope,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct ObservabilityConfig {
    pub log_level: String,
    pub log_format: LogFormat,
    /// Ceiling for C1's liveness probe.
    pub liveness_timeout_ms: u64,
    /// Sliding window and failure count a component must exceed within it
    /// before `ix-observability` reports it degraded.
    pub degraded_window_secs: u64,
    pub degraded_failure_threshold: usize,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: LogFormat::default(),
            liveness_timeout_ms: 2_000,
            degraded_window_secs: 300,
            degraded_failure_threshold: 5,
        }
    }
}

#[derive(Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct Config {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub ingestion: IngestionConfig,
    #[serde(default)]
    pub planner: PlannerConfig,
    #[serde(default)]
    pub decision: DecisionConfig,
    #[serde(default)]
    pub safety: SafetyConfig,
    #[serde(default)]
    pub executor: ExecutorConfig,
    #[serde(default)]
    pub lifecycle: LifecycleConfig,
    #[serde(default)]
    pub interceptor: InterceptorConfig,
    #[serde(default)]
    pub bypass: BypassConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print the database password.
        f.debug_struct("Config")
            .field("database.host", &self.database.host)
            .field("database.port", &self.database.port)
            .field("database.name", &self.database.name)
            .field("database.password", &"<redacted>")
            .field("catalog", &self.catalog)
            .field("ingestion", &self.ingestion)
            .field("planner", &self.planner)
            .field("decision", &self.decision)
            .field("safety", &self.safety)
            .field("executor", &self.executor)
            .field("lifecycle", &self.lifecycle)
            .field("interceptor", &self.interceptor)
            .field("bypass", &self.bypass)
            .field("observability", &self.observability)
            .finish()
    }
}

impl Config {
    /// Loads config from (in increasing precedence) compiled-in defaults, an
    /// optional TOML file, and `INDEXPILOT_*` environment variables.
    pub fn load(file: Option<&Path>) -> anyhow::Result<Config> {
        let mut doc = serde_json::to_value(Config::default())?;
        if let Some(path) = file {
            let text = std::fs::read_to_string(path).map_err(|e| {
                IndexPilotError::Config(format!("cannot read {}: {e}", path.display()))
            })?;
            let file_value: toml::Value = toml::from_str(&text).map_err(|e| {
                IndexPilotError::Config(format!("cannot parse {}: {e}", path.display()))
            })?;
            let file_json = serde_json::to_value(file_value)?;
            merge_json(&mut doc, file_json);
        }
        env::apply_env_overrides(&mut doc);
        let config: Config = serde_json::from_value(doc)
            .map_err(|e| IndexPilotError::Config(format!("invalid configuration: {e}")))?;
        Ok(config)
    }
}

fn merge_json(base: &mut serde_json::Value, overlay: serde_json::Value) {
    match (base, overlay) {
        (serde_json::Value::Object(base_map), serde_json::Value::Object(overlay_map)) => {
            for (k, v) in overlay_map {
                merge_json(
                    base_map.entry(k).or_insert(serde_json::Value::Null),
                    v,
                );
            }
        },
        (base_slot, overlay_value) => *base_slot = overlay_value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_round_trip_through_serde() {
        let config = Config::default();
        let value = serde_json::to_value(&config).unwrap();
        let reparsed: Config = serde_json::from_value(value).unwrap();
        assert_eq!(reparsed.database.port, config.database.port);
    }

    #[test]
    fn unknown_top_level_key_is_rejected() {
        let doc = serde_json::json!({
            "database": { "host": "x", "port": 1, "name": "n", "user": "u", "password": "p",
                          "transport-encryption": "prefer", "pool-min": 1, "pool-max": 2,
                          "connect-timeout-secs": 1, "statement-timeout-secs": 1 },
            "unknown-section": {}
        });
        assert!(serde_json::from_value::<Config>(doc).is_err());
    }

    #[test]
    fn env_override_changes_nested_field() {
        std::env::set_var("INDEXPILOT_SAFETY__RATE_LIMIT_TOKENS", "77");
        let mut doc = serde_json::to_value(Config::default()).unwrap();
        env::apply_env_overrides(&mut doc);
        let config: Config = serde_json::from_value(doc).unwrap();
        assert_eq!(config.safety.rate_limit_tokens, 77);
        std::env::remove_var("INDEXPILOT_SAFETY__RATE_LIMIT_TOKENS");
    }
}
