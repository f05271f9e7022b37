//! Lock advisor gate: before any DDL, checks for a
//! conflicting in-flight mutation on the same scope; stale locks older than
//! a TTL are reaped. This is the mechanism behind §5's "per-scope
//! mutations are linearizable" guarantee — `ix-executor` acquires a lock
//! here before issuing DDL and releases it when the mutation completes or
//! is abandoned.
//!
//! The in-memory table below serializes DDL within one daemon process.
//! [`db`] additionally takes a Postgres advisory lock so two daemon
//! processes (or a daemon and an operator running `apply` by hand) don't
//! race on the same object; a crashed session releases its `pg_advisory_lock`
//! automatically, so the TTL reaping here only needs to cover this
//! process's own stuck in-memory entries.

use std::{
    collections::HashMap,
    time::{
        Duration,
        Instant,
    },
};

use parking_lot::Mutex;

pub struct LockAdvisor {
    ttl: Duration,
    held: Mutex<HashMap<String, Instant>>,
}

impl LockAdvisor {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            held: Mutex::new(HashMap::new()),
        }
    }

    /// Attempts to acquire the lock for `scope_key`. Reaps it first if it
    /// is stale. Returns `true` if the caller now holds it.
    pub fn try_acquire(&self, scope_key: &str) -> bool {
        let mut held = self.held.lock();
        if let Some(acquired_at) = held.get(scope_key) {
            if acquired_at.elapsed() < self.ttl {
                return false;
            }
            tracing::warn!(scope = scope_key, "reaping stale advisory lock");
        }
        held.insert(scope_key.to_owned(), Instant::now());
        true
    }

    pub fn release(&self, scope_key: &str) {
        self.held.lock().remove(scope_key);
    }

    /// Removes every lock older than the TTL without requiring a caller to
    /// attempt acquisition first; called from `ix-lifecycle`'s "expire
    /// stale advisory locks" task.
    pub fn reap_stale(&self) -> usize {
        let mut held = self.held.lock();
        let ttl = self.ttl;
        let before = held.len();
        held.retain(|_, acquired_at| acquired_at.elapsed() < ttl);
        before - held.len()
    }
}

/// Database-backed advisory lock helpers, for cross-process exclusion.
/// Uses `pg_try_advisory_lock`/`pg_advisory_unlock` keyed on a 64-bit hash
/// of the scope string; the session holding it releases automatically if
/// the connection drops, so no TTL bookkeeping is needed on this side.
pub mod db {
    use std::hash::{
        Hash,
        Hasher,
    };

    use ix_gateway::GatewayConnection;

    fn lock_key(scope_key: &str) -> i64 {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        scope_key.hash(&mut hasher);
        hasher.finish() as i64
    }

    pub async fn try_acquire(conn: &GatewayConnection<'_>, scope_key: &str) -> anyhow::Result<bool> {
        let row = conn
            .query_opt("select pg_try_advisory_lock($1)", &[&lock_key(scope_key)])
            .await?;
        Ok(row.map(|r| r.get::<_, bool>(0)).unwrap_or(false))
    }

    pub async fn release(conn: &GatewayConnection<'_>, scope_key: &str) -> anyhow::Result<()> {
        conn.query_opt("select pg_advisory_unlock($1)", &[&lock_key(scope_key)]).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquisition_of_the_same_scope_is_denied() {
        let advisor = LockAdvisor::new(Duration::from_secs(60));
        assert!(advisor.try_acquire("t1:contacts"));
        assert!(!advisor.try_acquire("t1:contacts"));
    }

    #[test]
    fn release_frees_the_scope_for_reacquisition() {
        let advisor = LockAdvisor::new(Duration::from_secs(60));
        assert!(advisor.try_acquire("t1:contacts"));
        advisor.release("t1:contacts");
        assert!(advisor.try_acquire("t1:contacts"));
    }

    #[test]
    fn stale_lock_is_reaped_on_next_acquisition_attempt() {
        let advisor = LockAdvisor::new(Duration::from_millis(5));
        assert!(advisor.try_acquire("t1:contacts"));
        std::thread::sleep(Duration::from_millis(15));
        assert!(advisor.try_acquire("t1:contacts"));
    }

    #[test]
    fn reap_stale_removes_only_expired_entries() {
        let advisor = LockAdvisor::new(Duration::from_millis(5));
        advisor.try_acquire("stale");
        std::thread::sleep(Duration::from_millis(15));
        advisor.try_acquire("fresh");
        assert_eq!(advisor.reap_stale(), 1);
        assert!(advisor.held.lock().contains_key("fresh"));
    }
}
