//! Lineage store.
//!
//! `ix-lineage` exclusively owns writes to `MutationEvent` and
//! `AlgorithmUsage`; `ix-domain::lineage` holds only
//! the value types so `ix-decision`, `ix-safety` and `ix-executor` can build
//! a `MutationEvent` without depending on this crate's storage code.
//! Append-only: there is no update or delete path here, by construction.

pub mod insert;
pub mod query;
pub mod replay;

use std::{
    collections::HashMap,
    sync::Arc,
};

use ix_domain::{
    AlgorithmUsage,
    MutationEvent,
};
use ix_gateway::ConnectionPool;
use parking_lot::Mutex;

pub use replay::replay;

/// Owns the per-scope monotonic `seq` counter and the pooled connection used for every
/// lineage write and query. Cheap to clone-share via `Arc` at the call site;
/// the store itself is not `Clone` since the seq-counter cache must stay
/// singular per process.
pub struct LineageStore {
    pool: Arc<ConnectionPool>,
    /// Per-scope next-`seq` cache. Lazily warmed from `max(seq)` in the
    /// database on first touch so a restart resumes the same monotonic
    /// sequence rather than starting over at zero.
    seq_cache: Mutex<HashMap<String, u64>>,
}

impl LineageStore {
    pub fn new(pool: Arc<ConnectionPool>) -> Self {
        Self {
            pool,
            seq_cache: Mutex::new(HashMap::new()),
        }
    }

    /// Appends `event`, assigning it the next `seq` for `scope_key` and
    /// stamping `event.index_ref`'s scope ordering. The caller supplies a
    /// fully formed event except for `seq`, which this store alone assigns
    ///.
    pub async fn record_mutation(&self, mut event: MutationEvent, scope_key: &str) -> anyhow::Result<MutationEvent> {
        event.seq = self.next_seq(scope_key).await?;
        let conn = self.pool.acquire().await?;
        insert::insert_mutation_event(&conn, &event, scope_key).await?;
        Ok(event)
    }

    pub async fn record_algorithm_usage(&self, usage: AlgorithmUsage) -> anyhow::Result<()> {
        let conn = self.pool.acquire().await?;
        insert::insert_algorithm_usage(&conn, &usage).await
    }

    /// Full lineage for one `IndexRecord`, ordered by `seq` ascending —
    /// directly satisfies testable property 1 (lineage totality) when fed
    /// to [`replay::replay`].
    pub async fn timeline_for_index(&self, index_ref: uuid::Uuid) -> anyhow::Result<Vec<MutationEvent>> {
        let conn = self.pool.acquire().await?;
        query::timeline_for_index(&conn, index_ref).await
    }

    pub async fn explanation_for(&self, mutation_id: uuid::Uuid) -> anyhow::Result<Option<String>> {
        let conn = self.pool.acquire().await?;
        query::explanation_for(&conn, mutation_id).await
    }

    pub async fn counts_by_actor(&self) -> anyhow::Result<HashMap<String, i64>> {
        let conn = self.pool.acquire().await?;
        query::counts_by(&conn, "actor").await
    }

    pub async fn counts_by_outcome(&self) -> anyhow::Result<HashMap<String, i64>> {
        let conn = self.pool.acquire().await?;
        query::counts_by(&conn, "kind").await
    }

    pub async fn counts_by_algorithm(&self) -> anyhow::Result<HashMap<String, i64>> {
        let conn = self.pool.acquire().await?;
        query::algorithm_usage_counts(&conn).await
    }

    /// Training set for `ix-lifecycle`'s retraining task: the most recent
    /// `limit` mutations that recorded an `improvement`, newest first.
    pub async fn recent_with_improvement(&self, limit: i64) -> anyhow::Result<Vec<MutationEvent>> {
        let conn = self.pool.acquire().await?;
        query::recent_with_improvement(&conn, limit).await
    }

    /// Assigns the next `seq` for `scope_key`, warming the in-memory cache
    /// from the database's current high-water mark on first touch.
    async fn next_seq(&self, scope_key: &str) -> anyhow::Result<u64> {
        if let Some(next) = self.seq_cache.lock().get_mut(scope_key).map(|n| {
            *n += 1;
            *n
        }) {
            return Ok(next);
        }
        let conn = self.pool.acquire().await?;
        let current = query::max_seq_for_scope(&conn, scope_key).await?;
        let next = current + 1;
        self.seq_cache.lock().insert(scope_key.to_owned(), next);
        Ok(next)
    }
}

// `LineageStore` requires a live `ConnectionPool` to construct, so its
// insert/query paths are exercised in `ix-executor`'s integration tests
// against a fake gateway; `replay` below is pure and fully unit-tested here.
