//! Fleet-wide DDL concurrency limit. Per-scope serialization is a separate concern, handled by
//! `ix-safety::lock_advisor` and its database-backed counterpart; this is
//! purely a cap on how many `CREATE/DROP/REINDEX` statements run at once
//! across all scopes.

use std::sync::Arc;

use tokio::sync::{
    OwnedSemaphorePermit,
    Semaphore,
};

#[derive(Clone)]
pub struct DdlConcurrencyLimiter {
    semaphore: Arc<Semaphore>,
}

impl DdlConcurrencyLimiter {
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }

    /// Waits for a free slot. The returned permit releases the slot on drop;
    /// hold it across the whole DDL statement, not just the connection
    /// checkout.
    pub async fn acquire(&self) -> anyhow::Result<OwnedSemaphorePermit> {
        Ok(self.semaphore.clone().acquire_owned().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn a_second_acquire_waits_until_the_first_permit_drops() {
        let limiter = DdlConcurrencyLimiter::new(1);
        let first = limiter.acquire().await.unwrap();
        let limiter2 = limiter.clone();
        let second = tokio::spawn(async move { limiter2.acquire().await });
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(!second.is_finished());
        drop(first);
        second.await.unwrap().unwrap();
    }
}
